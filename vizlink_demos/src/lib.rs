// Shared plumbing for the example programs.
//
// Every example takes one optional positional argument, the path of a JSON
// scenario config, and falls back to a config bundled under `scenarios/`.
// The `basic` example logs its actions as CSV rows; `spectator_replay`
// plays such a log back.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use clap::Parser;
use vizlink::GameConfig;
use vizlink_engine::prng::ArenaRng;

/// Command line shared by all examples.
#[derive(Debug, Parser)]
pub struct ExampleArgs {
    /// Path to a JSON scenario configuration. Defaults to the bundled one.
    pub config: Option<PathBuf>,
}

/// A config bundled with the examples.
pub fn bundled_config(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("scenarios")
        .join(name)
}

/// Load the config named on the command line, or the bundled `default`.
pub fn load_config(args: &ExampleArgs, default: &str) -> anyhow::Result<GameConfig> {
    let path = args.config.clone().unwrap_or_else(|| bundled_config(default));
    GameConfig::from_json_file(&path)
        .with_context(|| format!("loading config {}", path.display()))
}

/// Log to stderr, `info` unless `RUST_LOG` says otherwise.
pub fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}

/// Uniform choice from a fixed set of actions.
pub struct ActionPicker {
    actions: Vec<Vec<f64>>,
    rng: ArenaRng,
}

impl ActionPicker {
    pub fn new(actions: Vec<Vec<f64>>, seed: u64) -> Self {
        Self {
            actions,
            rng: ArenaRng::new(seed),
        }
    }

    /// One-hot actions, one per button.
    pub fn one_hot(buttons: usize, seed: u64) -> Self {
        let actions = (0..buttons)
            .map(|i| (0..buttons).map(|j| if i == j { 1.0 } else { 0.0 }).collect())
            .collect();
        Self::new(actions, seed)
    }

    pub fn pick(&mut self) -> &[f64] {
        let i = self.rng.range_u64(0, self.actions.len() as u64) as usize;
        &self.actions[i]
    }
}

// ---------------------------------------------------------------------------
// Action logs
// ---------------------------------------------------------------------------

/// Writes one CSV row per applied action. Lines starting with `#` are
/// comments.
pub struct ActionLog {
    out: BufWriter<File>,
}

impl ActionLog {
    pub fn create(path: &Path) -> anyhow::Result<Self> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("creating {}", dir.display()))?;
        }
        let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
        Ok(Self {
            out: BufWriter::new(file),
        })
    }

    pub fn action(&mut self, action: &[f64]) -> anyhow::Result<()> {
        let row: Vec<String> = action.iter().map(f64::to_string).collect();
        writeln!(self.out, "{}", row.join(","))?;
        Ok(())
    }

    pub fn comment(&mut self, text: &str) -> anyhow::Result<()> {
        writeln!(self.out, "# {text}")?;
        Ok(())
    }

    pub fn flush(&mut self) -> anyhow::Result<()> {
        self.out.flush()?;
        Ok(())
    }
}

/// Read the actions of a log written by `ActionLog`.
pub fn read_action_log(path: &Path) -> anyhow::Result<Vec<Vec<f64>>> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut actions = Vec::new();
    for (n, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let row = line
            .split(',')
            .map(|cell| cell.trim().parse::<f64>())
            .collect::<Result<Vec<_>, _>>()
            .with_context(|| format!("{}:{}: bad action row", path.display(), n + 1))?;
        actions.push(row);
    }
    if actions.is_empty() {
        bail!("{} holds no actions", path.display());
    }
    Ok(actions)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_configs_load() {
        for name in ["basic.json", "deathmatch.json", "multiplayer.json"] {
            let args = ExampleArgs { config: None };
            let config = load_config(&args, name).unwrap();
            assert!(!config.available_buttons.is_empty(), "{name}");
            config.validate().unwrap();
        }
    }

    #[test]
    fn action_log_skips_comments() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log/actions.csv");
        let mut log = ActionLog::create(&path).unwrap();
        log.action(&[1.0, 0.0, 0.0]).unwrap();
        log.comment("episode 1 finished").unwrap();
        log.action(&[0.0, 0.0, 1.0]).unwrap();
        log.flush().unwrap();

        let actions = read_action_log(&path).unwrap();
        assert_eq!(actions, vec![vec![1.0, 0.0, 0.0], vec![0.0, 0.0, 1.0]]);
    }

    #[test]
    fn malformed_row_names_the_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.csv");
        std::fs::write(&path, "1,0,0\n1,x,0\n").unwrap();
        let err = read_action_log(&path).unwrap_err();
        assert!(format!("{err}").contains(":2:"));
    }

    #[test]
    fn picker_stays_in_set() {
        let mut picker = ActionPicker::one_hot(3, 9);
        for _ in 0..50 {
            let action = picker.pick();
            assert_eq!(action.iter().sum::<f64>(), 1.0);
        }
    }
}
