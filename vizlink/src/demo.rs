// Demo files: recording and replaying episodes.
//
// A demo is a sequence of length-prefixed JSON frames (the same framing as
// the multiplayer wire protocol):
//
//   Header  once, first: configuration fingerprint and everything needed to
//           restart the episode identically (seed, start time, timeout,
//           reward settings, players).
//   Tick    once per engine tick actually played, holding the inputs of
//           every player. Frame-skipped actions are stored expanded.
//   End     once, last: tick count and total reward.
//
// A file without an `End` frame was never finalized and is refused as
// truncated. Replaying only needs the header and the inputs: the engine is
// deterministic, so restarting it with the same seed and feeding it the same
// inputs reproduces the episode whatever is rendered along the way.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use vizlink_engine::{Button, GameVariable, PlayerInput, PlayerNumber};
use vizlink_protocol::{try_read_message, write_frame};

use crate::config::{GameConfig, Mode};
use crate::error::{ConfigError, ReplayMismatchError, VizError};

pub const DEMO_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// Fingerprint
// ---------------------------------------------------------------------------

/// The parts of a configuration that must agree for two sessions to run the
/// same simulation: between a recording and its replay, and between the
/// peers of a multiplayer game.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Fingerprint {
    pub buttons: Vec<Button>,
    pub game_variables: Vec<GameVariable>,
    /// Informational; replaying a player-mode recording in a spectator mode
    /// is normal.
    pub mode: Mode,
    pub map: String,
    pub scenario_digest: u32,
    /// CRC-32 over the fields above except `mode`.
    pub digest: u32,
}

impl Fingerprint {
    pub fn new(config: &GameConfig, scenario_digest: u32) -> Self {
        let map = config.map.to_ascii_lowercase();
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(format!("{:?}", config.available_buttons).as_bytes());
        hasher.update(format!("{:?}", config.available_game_variables).as_bytes());
        hasher.update(map.as_bytes());
        hasher.update(&scenario_digest.to_le_bytes());
        Self {
            buttons: config.available_buttons.clone(),
            game_variables: config.available_game_variables.clone(),
            mode: config.mode,
            map,
            scenario_digest,
            digest: hasher.finalize(),
        }
    }

    /// Can a demo recorded under `recorded` be replayed by a session with
    /// this fingerprint?
    pub fn accepts(&self, recorded: &Fingerprint) -> Result<(), ReplayMismatchError> {
        if recorded.buttons != self.buttons {
            return Err(ReplayMismatchError::Buttons {
                recorded: recorded.buttons.clone(),
                current: self.buttons.clone(),
            });
        }
        if recorded.game_variables != self.game_variables {
            return Err(ReplayMismatchError::GameVariables {
                recorded: recorded.game_variables.clone(),
                current: self.game_variables.clone(),
            });
        }
        if recorded.map != self.map {
            return Err(ReplayMismatchError::Map {
                recorded: recorded.map.clone(),
                current: self.map.clone(),
            });
        }
        if recorded.scenario_digest != self.scenario_digest {
            return Err(ReplayMismatchError::Scenario {
                recorded: recorded.scenario_digest,
                current: self.scenario_digest,
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DemoPlayer {
    pub number: PlayerNumber,
    pub name: String,
    pub color: u8,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DemoHeader {
    pub version: u32,
    pub fingerprint: Fingerprint,
    pub seed: u64,
    pub episode_start_time: u64,
    pub episode_timeout: u64,
    pub living_reward: f64,
    pub death_penalty: f64,
    pub death_ends_episode: bool,
    pub deathmatch: bool,
    pub monsters: bool,
    /// Player whose session wrote the demo; the default replay viewpoint.
    pub recorder: PlayerNumber,
    pub players: Vec<DemoPlayer>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DemoTick {
    /// Engine tick after the inputs were applied.
    pub tick: u64,
    pub inputs: Vec<PlayerInput>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DemoEnd {
    pub ticks: u64,
    pub total_reward: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "record", rename_all = "snake_case")]
enum DemoRecord {
    Header(DemoHeader),
    Tick(DemoTick),
    End(DemoEnd),
}

// ---------------------------------------------------------------------------
// Writer
// ---------------------------------------------------------------------------

/// Appends one episode to a demo file as it is played.
pub struct DemoWriter {
    path: PathBuf,
    out: BufWriter<File>,
    ticks: u64,
    finished: bool,
}

impl DemoWriter {
    /// Create (or truncate) `path`, creating missing parent directories, and
    /// write the header.
    pub fn create(path: &Path, header: &DemoHeader) -> Result<Self, VizError> {
        let io_err = |source| ConfigError::DemoIo {
            path: path.to_path_buf(),
            source,
        };
        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir).map_err(io_err)?;
            }
        }
        let file = File::create(path).map_err(io_err)?;
        let mut writer = Self {
            path: path.to_path_buf(),
            out: BufWriter::new(file),
            ticks: 0,
            finished: false,
        };
        writer.write(&DemoRecord::Header(header.clone()))?;
        info!("recording episode to {}", path.display());
        Ok(writer)
    }

    pub fn append(&mut self, tick: u64, inputs: &[PlayerInput]) -> Result<(), VizError> {
        self.write(&DemoRecord::Tick(DemoTick {
            tick,
            inputs: inputs.to_vec(),
        }))?;
        self.ticks += 1;
        Ok(())
    }

    /// Write the end record and flush. Only the first call has an effect.
    pub fn finish(&mut self, total_reward: f64) -> Result<(), VizError> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        self.write(&DemoRecord::End(DemoEnd {
            ticks: self.ticks,
            total_reward,
        }))?;
        self.out.flush().map_err(|source| ConfigError::DemoIo {
            path: self.path.clone(),
            source,
        })?;
        debug!("demo {} finalized after {} ticks", self.path.display(), self.ticks);
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write(&mut self, record: &DemoRecord) -> Result<(), VizError> {
        let json = serde_json::to_vec(record).map_err(|e| ConfigError::DemoCorrupt {
            path: self.path.clone(),
            reason: e.to_string(),
        })?;
        write_frame(&mut self.out, &json).map_err(|source| ConfigError::DemoIo {
            path: self.path.clone(),
            source,
        })?;
        Ok(())
    }
}

impl Drop for DemoWriter {
    fn drop(&mut self) {
        if !self.finished {
            warn!("demo {} dropped without an end record", self.path.display());
        }
    }
}

// ---------------------------------------------------------------------------
// Reader
// ---------------------------------------------------------------------------

/// A fully loaded demo.
#[derive(Clone, Debug, PartialEq)]
pub struct Demo {
    pub header: DemoHeader,
    pub ticks: Vec<DemoTick>,
    pub end: DemoEnd,
}

impl Demo {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, VizError> {
        let path = path.as_ref();
        let corrupt = |reason: String| ConfigError::DemoCorrupt {
            path: path.to_path_buf(),
            reason,
        };
        let file = File::open(path).map_err(|source| ConfigError::DemoIo {
            path: path.to_path_buf(),
            source,
        })?;
        let mut reader = BufReader::new(file);

        let mut header = None;
        let mut ticks = Vec::new();
        loop {
            let frame = try_read_message(&mut reader).map_err(|e| corrupt(e.to_string()))?;
            let Some(bytes) = frame else {
                return Err(ConfigError::DemoTruncated(path.to_path_buf()).into());
            };
            let record: DemoRecord =
                serde_json::from_slice(&bytes).map_err(|e| corrupt(e.to_string()))?;
            match (record, header.is_some()) {
                (DemoRecord::Header(h), false) => header = Some(h),
                (DemoRecord::Tick(t), true) => ticks.push(t),
                (DemoRecord::End(end), true) => {
                    let Some(header) = header else {
                        return Err(corrupt("missing header".into()).into());
                    };
                    return Ok(Self { header, ticks, end });
                }
                (DemoRecord::Header(_), true) => {
                    return Err(corrupt("second header".into()).into());
                }
                (_, false) => return Err(corrupt("does not start with a header".into()).into()),
            }
        }
    }

    /// Check that a session with `current` fingerprint can replay this demo.
    pub fn check_compatible(&self, current: &Fingerprint) -> Result<(), ReplayMismatchError> {
        if self.header.version != DEMO_VERSION {
            return Err(ReplayMismatchError::Version {
                found: self.header.version,
            });
        }
        current.accepts(&self.header.fingerprint)
    }

    /// The recorded actions of one player, one entry per tick.
    pub fn actions_of(&self, player: PlayerNumber) -> Vec<Vec<f64>> {
        self.ticks
            .iter()
            .filter_map(|t| t.inputs.iter().find(|i| i.player == player))
            .map(|i| i.buttons.clone())
            .collect()
    }
}

/// Playback position within a loaded demo.
#[derive(Debug)]
pub struct Replay {
    demo: Demo,
    next: usize,
    viewpoint: PlayerNumber,
}

impl Replay {
    pub fn new(demo: Demo, viewpoint: PlayerNumber) -> Self {
        Self {
            demo,
            next: 0,
            viewpoint,
        }
    }

    pub fn header(&self) -> &DemoHeader {
        &self.demo.header
    }

    pub fn viewpoint(&self) -> PlayerNumber {
        self.viewpoint
    }

    /// Inputs of the next recorded tick.
    pub fn next_inputs(&mut self) -> Option<&[PlayerInput]> {
        let tick = self.demo.ticks.get(self.next)?;
        self.next += 1;
        Some(&tick.inputs)
    }

    pub fn is_exhausted(&self) -> bool {
        self.next >= self.demo.ticks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> GameConfig {
        let mut config = GameConfig::default();
        config.set_available_buttons(&[Button::MoveLeft, Button::MoveRight, Button::Attack]);
        config.set_available_game_variables(&[GameVariable::Ammo2]);
        config
    }

    fn header(config: &GameConfig) -> DemoHeader {
        DemoHeader {
            version: DEMO_VERSION,
            fingerprint: Fingerprint::new(config, 0xABCD),
            seed: 9,
            episode_start_time: 0,
            episode_timeout: 100,
            living_reward: -1.0,
            death_penalty: 0.0,
            death_ends_episode: true,
            deathmatch: false,
            monsters: true,
            recorder: 1,
            players: vec![DemoPlayer {
                number: 1,
                name: "P1".into(),
                color: 0,
            }],
        }
    }

    fn input(buttons: &[f64]) -> Vec<PlayerInput> {
        vec![PlayerInput {
            player: 1,
            buttons: buttons.to_vec(),
            respawn: false,
        }]
    }

    #[test]
    fn written_demo_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/ep0.demo");
        let config = config();
        let mut writer = DemoWriter::create(&path, &header(&config)).unwrap();
        writer.append(1, &input(&[1.0, 0.0, 0.0])).unwrap();
        writer.append(2, &input(&[0.0, 0.0, 1.0])).unwrap();
        writer.finish(-2.0).unwrap();
        writer.finish(99.0).unwrap();
        drop(writer);

        let demo = Demo::load(&path).unwrap();
        assert_eq!(demo.header, header(&config));
        assert_eq!(demo.end, DemoEnd { ticks: 2, total_reward: -2.0 });
        assert_eq!(
            demo.actions_of(1),
            vec![vec![1.0, 0.0, 0.0], vec![0.0, 0.0, 1.0]]
        );
        assert!(demo.actions_of(2).is_empty());
    }

    #[test]
    fn unfinished_demo_is_truncated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cut.demo");
        let mut writer = DemoWriter::create(&path, &header(&config())).unwrap();
        writer.append(1, &input(&[0.0, 0.0, 0.0])).unwrap();
        writer.out.flush().unwrap();
        writer.finished = true;
        drop(writer);

        let err = Demo::load(&path).unwrap_err();
        assert!(matches!(err, VizError::Config(ConfigError::DemoTruncated(_))));
    }

    #[test]
    fn garbage_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("junk.demo");
        let mut bytes = Vec::new();
        write_frame(&mut bytes, b"not json").unwrap();
        std::fs::write(&path, bytes).unwrap();
        let err = Demo::load(&path).unwrap_err();
        assert!(matches!(err, VizError::Config(ConfigError::DemoCorrupt { .. })));
    }

    #[test]
    fn missing_demo_is_config_error() {
        let err = Demo::load("/nonexistent/ep.demo").unwrap_err();
        assert!(matches!(err, VizError::Config(ConfigError::DemoIo { .. })));
    }

    #[test]
    fn fingerprint_ignores_mode_and_map_case() {
        let recorded = config();
        let mut replaying = config();
        replaying.set_mode(Mode::Spectator);
        replaying.set_map("MAP01");
        let a = Fingerprint::new(&recorded, 1);
        let b = Fingerprint::new(&replaying, 1);
        assert_eq!(a.digest, b.digest);
        assert_eq!(b.accepts(&a), Ok(()));
    }

    #[test]
    fn fingerprint_rejects_different_buttons() {
        let recorded = config();
        let mut replaying = config();
        replaying.add_available_button(Button::Use);
        let err = Fingerprint::new(&replaying, 1)
            .accepts(&Fingerprint::new(&recorded, 1))
            .unwrap_err();
        assert!(matches!(err, ReplayMismatchError::Buttons { .. }));
    }

    #[test]
    fn fingerprint_rejects_different_scenario() {
        let config = config();
        let err = Fingerprint::new(&config, 2)
            .accepts(&Fingerprint::new(&config, 1))
            .unwrap_err();
        assert_eq!(
            err,
            ReplayMismatchError::Scenario {
                recorded: 1,
                current: 2
            }
        );
    }

    #[test]
    fn replay_walks_ticks_in_order() {
        let config = config();
        let demo = Demo {
            header: header(&config),
            ticks: vec![
                DemoTick {
                    tick: 1,
                    inputs: input(&[1.0, 0.0, 0.0]),
                },
                DemoTick {
                    tick: 2,
                    inputs: input(&[0.0, 1.0, 0.0]),
                },
            ],
            end: DemoEnd {
                ticks: 2,
                total_reward: 0.0,
            },
        };
        let mut replay = Replay::new(demo, 1);
        assert_eq!(replay.next_inputs().unwrap()[0].buttons[0], 1.0);
        assert!(!replay.is_exhausted());
        assert_eq!(replay.next_inputs().unwrap()[0].buttons[1], 1.0);
        assert!(replay.is_exhausted());
        assert!(replay.next_inputs().is_none());
    }
}
