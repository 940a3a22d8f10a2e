// The session: one engine, one configuration, a sequence of episodes.
//
// `Session` ties the pieces together. It owns the engine exclusively and
// drives it one tick at a time:
//
//   input     pending action, spectator input, or recorded demo inputs
//   exchange  lockstep with the other peers (solo sessions answer locally)
//   advance   the engine steps once with every player's input
//   record    the inputs go to the bound demo, if any
//   reward    scripted reward delta + living reward (+ death penalty)
//   finish    timeout / death / scenario exit / replay exhausted
//   observe   the `State` is refilled in place for the next call
//
// Lifecycle: `Created` until `init`, `Running` until `close`, `Closed`
// afterwards. An engine failure moves the session to `Faulted`, where only
// `close` is accepted. A closed session can be initialized again, which
// relaunches the engine with the current configuration.
//
// Determinism: the engine is restarted with the episode seed and is only
// ever advanced with explicit inputs, so a demo (seed + inputs) replays the
// same ticks whatever the replaying session renders.

use std::path::Path;
use std::time::Duration;

use log::{error, info, warn};
use vizlink_engine::{
    Button, Engine, EpisodeSpec, GameVariable, LaunchSpec, PlayerInput, PlayerNumber, PlayerSlot,
};

use crate::action::{ActionChannel, Pacer, SpectatorInput, check_skip};
use crate::config::{GameConfig, InputSource, Mode, Pacing};
use crate::demo::{DEMO_VERSION, Demo, DemoHeader, DemoPlayer, DemoWriter, Fingerprint, Replay};
use crate::episode::{EpisodeController, FinishReason, TickOutcome};
use crate::error::{ReplayMismatchError, SessionStateError, VizError};
use crate::multiplayer::{Coordinator, NetArgs, PeerLink, Player, parse_game_args};
use crate::observation::{ObservationAssembler, State};
use crate::reward::RewardAccumulator;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Lifecycle {
    Created,
    Running,
    Closed,
    Faulted,
}

/// Where a tick's own input comes from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum TickInput {
    /// Pending action, or the spectator input in the spectator modes.
    Pending,
    /// All buttons released.
    Neutral,
}

/// Everything needed to (re)start an episode identically.
struct EpisodePlan {
    seed: u64,
    players: Vec<PlayerSlot>,
    deathmatch: bool,
    monsters: bool,
    start_time: u64,
    timeout: u64,
    living_reward: f64,
    death_penalty: f64,
    death_ends_episode: bool,
    viewpoint: PlayerNumber,
}

pub struct Session<E: Engine> {
    engine: E,
    config: GameConfig,
    lifecycle: Lifecycle,

    episode: EpisodeController,
    actions: ActionChannel,
    rewards: RewardAccumulator,
    observations: ObservationAssembler,
    last_reward: f64,
    was_dead: bool,
    /// Player whose view, variables and reward this session reports.
    viewpoint: PlayerNumber,

    spectator: Option<Box<dyn SpectatorInput>>,
    pacer: Pacer,

    net: NetArgs,
    coordinator: Coordinator,
    pending_link: Option<Box<dyn PeerLink>>,
    base_seed: u64,

    fingerprint: Option<Fingerprint>,
    recorder: Option<DemoWriter>,
    replay: Option<Replay>,
}

impl<E: Engine> Session<E> {
    pub fn new(engine: E, config: GameConfig) -> Self {
        let net = NetArgs::default();
        Self {
            engine,
            episode: EpisodeController::new(),
            actions: ActionChannel::new(config.available_buttons.len()),
            rewards: RewardAccumulator::new(config.living_reward, config.death_penalty),
            observations: ObservationAssembler::new(&config),
            last_reward: 0.0,
            was_dead: false,
            viewpoint: 1,
            spectator: None,
            pacer: Pacer::new(config.ticrate),
            coordinator: Coordinator::solo(&net.name, net.color),
            net,
            pending_link: None,
            base_seed: config.seed,
            fingerprint: None,
            recorder: None,
            replay: None,
            lifecycle: Lifecycle::Created,
            config,
        }
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Validate the configuration, launch the engine, join the multiplayer
    /// game if one is configured, and start the first episode.
    pub fn init(&mut self) -> Result<(), VizError> {
        let idle = match self.lifecycle {
            Lifecycle::Created | Lifecycle::Closed => self.lifecycle,
            Lifecycle::Running => return Err(SessionStateError::AlreadyRunning.into()),
            Lifecycle::Faulted => return Err(SessionStateError::Faulted.into()),
        };
        let result = self.try_init();
        if let Err(e) = &result {
            warn!("init failed: {e}");
            self.coordinator.leave();
            self.engine.shutdown();
            self.lifecycle = if matches!(e, VizError::EngineFatal(_)) {
                Lifecycle::Faulted
            } else {
                idle
            };
        }
        result
    }

    fn try_init(&mut self) -> Result<(), VizError> {
        self.config.validate()?;
        let net = parse_game_args(&self.config.game_args)?;

        self.engine.launch(&LaunchSpec {
            scenario: self.config.scenario_source(),
            map: self.config.map.clone(),
            buttons: self.config.available_buttons.clone(),
        })?;
        let fingerprint = Fingerprint::new(&self.config, self.engine.scenario_digest());

        let sync_timeout = Duration::from_millis(self.config.sync_timeout_ms);
        let mut coordinator = match self.pending_link.take() {
            Some(link) => Coordinator::with_link(link, None, &net.name, net.color, sync_timeout),
            None => Coordinator::connect(&net, fingerprint.digest, self.config.seed, sync_timeout)?,
        };
        self.base_seed = if coordinator.is_networked() {
            coordinator.wait_for_start(Duration::from_millis(self.config.lobby_timeout_ms))?
        } else {
            self.config.seed
        };

        self.actions = ActionChannel::new(self.config.available_buttons.len());
        self.observations = ObservationAssembler::new(&self.config);
        self.pacer = Pacer::new(self.config.ticrate);
        self.episode = EpisodeController::new();
        self.rewards = RewardAccumulator::new(self.config.living_reward, self.config.death_penalty);
        self.last_reward = 0.0;
        self.coordinator = coordinator;
        self.net = net;
        self.fingerprint = Some(fingerprint);
        self.lifecycle = Lifecycle::Running;
        info!(
            "session initialized: map {}, {} buttons, mode {:?}",
            self.config.map,
            self.config.available_buttons.len(),
            self.config.mode
        );

        let plan = self.live_plan(self.base_seed);
        self.begin_episode(plan, None, None)
    }

    /// End the session. Finishes the running episode, finalizes a bound
    /// demo, leaves the multiplayer game and shuts the engine down. Calling
    /// it again does nothing.
    pub fn close(&mut self) {
        match self.lifecycle {
            // Nothing was launched yet; the session can still be initialized.
            Lifecycle::Closed | Lifecycle::Created => return,
            Lifecycle::Running | Lifecycle::Faulted => {}
        }
        self.episode.finish(FinishReason::SessionClosed, self.engine.tick());
        if let Err(e) = self.finalize_recording() {
            warn!("could not finalize demo on close: {e}");
        }
        self.replay = None;
        self.observations.invalidate();
        self.coordinator.leave();
        self.engine.shutdown();
        self.lifecycle = Lifecycle::Closed;
        info!("session closed");
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn is_running(&self) -> bool {
        self.lifecycle == Lifecycle::Running
    }

    /// Install the multiplayer transport instead of the one `game_args`
    /// describes. Only while the session is not running.
    pub fn set_peer_link(&mut self, link: Box<dyn PeerLink>) -> Result<(), VizError> {
        if !self.is_idle() {
            return Err(SessionStateError::LinkAfterInit.into());
        }
        self.pending_link = Some(link);
        Ok(())
    }

    /// Input source for the spectator modes.
    pub fn set_spectator_input(&mut self, input: Box<dyn SpectatorInput>) {
        self.spectator = Some(input);
    }

    // -----------------------------------------------------------------------
    // Episodes
    // -----------------------------------------------------------------------

    /// Start a new episode, optionally recording it to `record_to`. Any
    /// demo bound to the previous episode is finalized first. In a
    /// multiplayer game the host decides the seed and every peer waits for
    /// the restart.
    pub fn new_episode(&mut self, record_to: Option<&Path>) -> Result<(), VizError> {
        self.ensure_running()?;
        let proposed = self
            .base_seed
            .wrapping_add(u64::from(self.episode.episodes_started()));
        let result = match self.coordinator.restart(proposed) {
            Ok(seed) => {
                let plan = self.live_plan(seed);
                self.begin_episode(plan, record_to, None)
            }
            Err(e) => Err(e),
        };
        self.guard(result)
    }

    /// Replay a recorded episode. `player` picks the viewpoint; by default
    /// it is the player who recorded the demo. The episode then advances
    /// with `advance_action` (or `make_action`, whose action is ignored).
    pub fn replay_episode(
        &mut self,
        path: impl AsRef<Path>,
        player: Option<PlayerNumber>,
    ) -> Result<(), VizError> {
        self.ensure_running()?;
        if self.coordinator.is_networked() {
            return Err(SessionStateError::Multiplayer("replay_episode").into());
        }
        let demo = Demo::load(path.as_ref())?;
        let fingerprint = self.fingerprint()?;
        demo.check_compatible(fingerprint)?;
        let header = &demo.header;
        let viewpoint = player.unwrap_or(header.recorder);
        if !header.players.iter().any(|p| p.number == viewpoint) {
            return Err(ReplayMismatchError::Player(viewpoint).into());
        }

        let plan = EpisodePlan {
            seed: header.seed,
            players: header
                .players
                .iter()
                .map(|p| PlayerSlot {
                    number: p.number,
                    name: p.name.clone(),
                    color: p.color,
                })
                .collect(),
            deathmatch: header.deathmatch,
            monsters: header.monsters,
            start_time: header.episode_start_time,
            timeout: header.episode_timeout,
            living_reward: header.living_reward,
            death_penalty: header.death_penalty,
            death_ends_episode: header.death_ends_episode,
            viewpoint,
        };
        info!(
            "replaying {} ({} ticks) as player {viewpoint}",
            path.as_ref().display(),
            demo.end.ticks
        );
        let result = self.begin_episode(plan, None, Some(Replay::new(demo, viewpoint)));
        self.guard(result)
    }

    pub fn is_episode_finished(&self) -> bool {
        self.lifecycle != Lifecycle::Running || self.episode.is_finished()
    }

    pub fn finish_reason(&self) -> Option<FinishReason> {
        self.episode.finish_reason()
    }

    /// Engine tick of the current episode, start-skip ticks included.
    pub fn get_episode_time(&self) -> u64 {
        self.engine.tick()
    }

    pub fn episode_index(&self) -> u32 {
        self.episode.index()
    }

    pub fn is_replaying(&self) -> bool {
        self.replay.is_some()
    }

    // -----------------------------------------------------------------------
    // Actions
    // -----------------------------------------------------------------------

    /// Apply `action` for `skip` ticks and return the reward they earned.
    /// On a finished episode nothing happens and the reward is 0.
    pub fn make_action(&mut self, action: &[f64], skip: u32) -> Result<f64, VizError> {
        self.ensure_running()?;
        check_skip(skip)?;
        self.actions.check(action)?;
        if self.episode.is_finished() {
            return Ok(0.0);
        }
        if self.replay.is_none() {
            self.actions.set(action)?;
        }
        let result = self.advance(skip);
        self.guard(result)
    }

    /// Set the action held by the following `advance_action` calls. Ignored
    /// while replaying.
    pub fn set_action(&mut self, action: &[f64]) -> Result<(), VizError> {
        self.ensure_running()?;
        self.actions.check(action)?;
        if self.replay.is_none() {
            self.actions.set(action)?;
        }
        Ok(())
    }

    /// Advance `skip` ticks with the pending action (or the spectator or
    /// recorded input).
    pub fn advance_action(&mut self, skip: u32) -> Result<(), VizError> {
        self.ensure_running()?;
        check_skip(skip)?;
        if self.episode.is_finished() {
            return Ok(());
        }
        let result = self.advance(skip);
        self.guard(result).map(|_| ())
    }

    /// The action applied on the last tick. Empty while replaying.
    pub fn get_last_action(&self) -> &[f64] {
        self.actions.last()
    }

    /// Reward of the last `make_action`/`advance_action` call.
    pub fn get_last_reward(&self) -> f64 {
        self.last_reward
    }

    pub fn get_total_reward(&self) -> f64 {
        self.rewards.total()
    }

    // -----------------------------------------------------------------------
    // Observation
    // -----------------------------------------------------------------------

    /// The state of the tick about to be played; `None` once the episode has
    /// finished. The borrow must end before the next tick-advancing call.
    pub fn get_state(&self) -> Option<&State> {
        if self.is_episode_finished() {
            return None;
        }
        self.observations.current()
    }

    /// The most recently assembled state, even after the episode finished.
    pub fn last_state(&self) -> Option<&State> {
        self.observations.last()
    }

    pub fn get_game_variable(&self, var: GameVariable) -> Result<f64, VizError> {
        self.ensure_running()?;
        Ok(self.engine.game_variable(self.viewpoint, var)?)
    }

    // -----------------------------------------------------------------------
    // Players
    // -----------------------------------------------------------------------

    pub fn is_player_dead(&self) -> Result<bool, VizError> {
        self.ensure_running()?;
        self.player_dead()
    }

    /// Bring a dead player back. Plays one tick with all buttons released
    /// and the respawn flag set; does nothing if the player is alive, the
    /// episode is finished, or a demo is replaying.
    pub fn respawn_player(&mut self) -> Result<(), VizError> {
        self.ensure_running()?;
        if self.replay.is_some() || self.episode.is_finished() || !self.player_dead()? {
            return Ok(());
        }
        info!("respawning player {}", self.viewpoint);
        self.actions.request_respawn();
        let result = self.play_tick(TickInput::Neutral, true);
        let reward = self.guard(result)?;
        self.last_reward = reward;
        Ok(())
    }

    /// Participants of a multiplayer game. Empty in solo sessions.
    pub fn players(&self) -> Vec<Player> {
        self.coordinator.players()
    }

    pub fn player_number(&self) -> PlayerNumber {
        self.viewpoint
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Change the configuration. Only while the session is not running; the
    /// next `init` picks it up.
    pub fn config_mut(&mut self) -> Result<&mut GameConfig, VizError> {
        if !self.is_idle() {
            return Err(SessionStateError::AlreadyRunning.into());
        }
        Ok(&mut self.config)
    }

    pub fn mode(&self) -> Mode {
        self.config.mode
    }

    pub fn available_buttons(&self) -> &[Button] {
        &self.config.available_buttons
    }

    pub fn available_game_variables(&self) -> &[GameVariable] {
        &self.config.available_game_variables
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn is_idle(&self) -> bool {
        matches!(self.lifecycle, Lifecycle::Created | Lifecycle::Closed)
    }

    fn ensure_running(&self) -> Result<(), VizError> {
        match self.lifecycle {
            Lifecycle::Running => Ok(()),
            Lifecycle::Created => Err(SessionStateError::NotInitialized.into()),
            Lifecycle::Closed => Err(SessionStateError::Closed.into()),
            Lifecycle::Faulted => Err(SessionStateError::Faulted.into()),
        }
    }

    /// Fault the session if `result` is an engine failure.
    fn guard<T>(&mut self, result: Result<T, VizError>) -> Result<T, VizError> {
        if let Err(VizError::EngineFatal(e)) = &result {
            error!("engine failure, session faulted: {e}");
            self.lifecycle = Lifecycle::Faulted;
            self.observations.invalidate();
        }
        result
    }

    fn fingerprint(&self) -> Result<&Fingerprint, VizError> {
        self.fingerprint
            .as_ref()
            .ok_or_else(|| SessionStateError::NotInitialized.into())
    }

    fn player_dead(&self) -> Result<bool, VizError> {
        Ok(self.engine.game_variable(self.viewpoint, GameVariable::Dead)? > 0.0)
    }

    /// Plan for a live (not replayed) episode from the configuration and
    /// the current roster.
    fn live_plan(&self, seed: u64) -> EpisodePlan {
        EpisodePlan {
            seed,
            players: self
                .coordinator
                .participants()
                .into_iter()
                .map(|(number, name, color)| PlayerSlot {
                    number,
                    name,
                    color,
                })
                .collect(),
            deathmatch: self.net.deathmatch,
            monsters: self.net.monsters,
            start_time: self.config.episode_start_time,
            timeout: self.config.episode_timeout,
            living_reward: self.config.living_reward,
            death_penalty: self.config.death_penalty,
            death_ends_episode: !self.coordinator.is_networked(),
            viewpoint: self.coordinator.player_number(),
        }
    }

    fn begin_episode(
        &mut self,
        plan: EpisodePlan,
        record_to: Option<&Path>,
        replay: Option<Replay>,
    ) -> Result<(), VizError> {
        self.finalize_recording()?;
        self.replay = None;
        self.observations.invalidate();

        self.engine.start_episode(&EpisodeSpec {
            seed: plan.seed,
            players: plan.players.clone(),
            deathmatch: plan.deathmatch,
            monsters: plan.monsters,
        })?;
        let width = self.config.available_buttons.len();
        let idle: Vec<PlayerInput> = plan
            .players
            .iter()
            .map(|p| PlayerInput {
                player: p.number,
                buttons: vec![0.0; width],
                respawn: false,
            })
            .collect();
        for _ in 0..plan.start_time {
            self.engine.advance(&idle)?;
        }

        self.viewpoint = plan.viewpoint;
        self.actions.reset();
        self.pacer.reset();
        self.last_reward = 0.0;
        let scripted = self.engine.scripted_reward(self.viewpoint)?;
        self.rewards.reset(plan.living_reward, plan.death_penalty, scripted);
        self.was_dead = self.player_dead()?;
        self.episode.begin(plan.seed, plan.timeout, plan.death_ends_episode);

        if let Some(path) = record_to {
            let header = DemoHeader {
                version: DEMO_VERSION,
                fingerprint: self.fingerprint()?.clone(),
                seed: plan.seed,
                episode_start_time: plan.start_time,
                episode_timeout: plan.timeout,
                living_reward: plan.living_reward,
                death_penalty: plan.death_penalty,
                death_ends_episode: plan.death_ends_episode,
                deathmatch: plan.deathmatch,
                monsters: plan.monsters,
                recorder: plan.viewpoint,
                players: plan
                    .players
                    .iter()
                    .map(|p| DemoPlayer {
                        number: p.number,
                        name: p.name.clone(),
                        color: p.color,
                    })
                    .collect(),
            };
            self.recorder = Some(DemoWriter::create(path, &header)?);
        }
        self.replay = replay;
        self.conclude_tick(true)
    }

    fn advance(&mut self, skip: u32) -> Result<f64, VizError> {
        let mut reward = 0.0;
        for i in 0..skip {
            if self.episode.is_finished() {
                break;
            }
            reward += self.play_tick(TickInput::Pending, i + 1 == skip)?;
        }
        self.last_reward = reward;
        Ok(reward)
    }

    /// Play exactly one engine tick. Returns its reward.
    fn play_tick(&mut self, input: TickInput, observe: bool) -> Result<f64, VizError> {
        let (source, pacing) = self.config.mode.tick_policy();
        if pacing == Pacing::Realtime {
            self.pacer.wait();
        }

        let inputs = if let Some(replay) = self.replay.as_mut() {
            match replay.next_inputs() {
                Some(inputs) => inputs.to_vec(),
                None => {
                    let tick = self.engine.tick();
                    self.episode.finish(FinishReason::ReplayExhausted, tick);
                    self.observations.invalidate();
                    return Ok(0.0);
                }
            }
        } else {
            let mut buttons = match input {
                TickInput::Pending => self.actions.pending().to_vec(),
                TickInput::Neutral => vec![0.0; self.actions.width()],
            };
            if input == TickInput::Pending && source == InputSource::Spectator {
                let tick = self.engine.tick() + 1;
                let offered = self
                    .spectator
                    .as_mut()
                    .and_then(|s| s.next_input(tick, &self.config.available_buttons));
                if let Some(offered) = offered {
                    self.actions.check(&offered)?;
                    buttons = offered;
                }
            }
            let respawn = self.actions.take_respawn();
            let Some(inputs) = self.coordinator.exchange(&buttons, respawn)? else {
                let tick = self.engine.tick();
                self.episode.finish(FinishReason::HostRestarted, tick);
                self.observations.invalidate();
                self.finalize_recording()?;
                return Ok(0.0);
            };
            // An input sent before a host restart is applied in place of
            // `buttons`; report what the engine actually played.
            let mine = inputs.iter().find(|i| i.player == self.viewpoint);
            self.actions.applied(mine.map_or(&buttons, |i| &i.buttons));
            inputs
        };

        self.engine.advance(&inputs)?;
        if let Some(recorder) = self.recorder.as_mut() {
            recorder.append(self.engine.tick(), &inputs)?;
        }

        let scripted = self.engine.scripted_reward(self.viewpoint)?;
        let dead = self.player_dead()?;
        let reward = self.rewards.on_tick(scripted, dead && !self.was_dead);
        self.was_dead = dead;
        if self.coordinator.is_networked() {
            self.coordinator.refresh(&self.engine.players());
        }

        self.conclude_tick(observe)?;
        Ok(reward)
    }

    /// Decide whether the episode is over and refresh the observation.
    fn conclude_tick(&mut self, observe: bool) -> Result<(), VizError> {
        let outcome = TickOutcome {
            engine_tick: self.engine.tick(),
            player_dead: self.was_dead,
            scenario_over: self.engine.episode_over(),
        };
        if self.episode.check(outcome).is_none()
            && self.replay.as_ref().is_some_and(Replay::is_exhausted)
        {
            self.episode.finish(FinishReason::ReplayExhausted, outcome.engine_tick);
        }

        if self.episode.is_finished() {
            self.observations.invalidate();
            self.finalize_recording()
        } else if observe {
            self.observations.assemble(&self.engine, self.viewpoint)
        } else {
            self.observations.invalidate();
            Ok(())
        }
    }

    fn finalize_recording(&mut self) -> Result<(), VizError> {
        match self.recorder.take() {
            Some(mut recorder) => recorder.finish(self.rewards.total()),
            None => Ok(()),
        }
    }
}

impl<E: Engine> Drop for Session<E> {
    fn drop(&mut self) {
        self.close();
    }
}
