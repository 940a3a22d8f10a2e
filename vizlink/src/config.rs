// Session configuration.
//
// `GameConfig` is a plain data struct read from JSON (`from_json_file`) or
// assembled with the builder-style setters. It is consumed by `Session::init`
// and frozen from then on: the session keeps its own copy, so later changes
// to the caller's value have no effect on a running session.
//
// Every field has a default (`#[serde(default)]`), so a config file only
// needs the fields it changes. The defaults describe the built-in "basic"
// scenario with a screen buffer and no timeout.
//
// `game_args` is free-form: the multiplayer topology flags (`-host`,
// `-join`, ...) are parsed from it by `multiplayer::topology`, and anything
// unrecognised is left for the engine.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use vizlink_engine::{
    Button, GameVariable, RenderSettings, ScenarioSource, ScreenFormat, ScreenResolution,
};

use crate::error::{ConfigError, VizError};

// ---------------------------------------------------------------------------
// Mode
// ---------------------------------------------------------------------------

/// Who supplies the per-tick input, and what paces the ticks.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Mode {
    /// The caller's action drives every tick; ticks run as fast as asked.
    #[default]
    Player,
    /// The caller's action drives every tick, paced at `ticrate`.
    AsyncPlayer,
    /// A `SpectatorInput` drives every tick; ticks run as fast as asked.
    Spectator,
    /// A `SpectatorInput` drives every tick, paced at `ticrate`.
    AsyncSpectator,
}

/// Origin of the input applied each tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputSource {
    Controller,
    Spectator,
}

/// Whether ticks wait for the wall clock.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Pacing {
    Lockstep,
    Realtime,
}

impl Mode {
    pub fn tick_policy(self) -> (InputSource, Pacing) {
        match self {
            Mode::Player => (InputSource::Controller, Pacing::Lockstep),
            Mode::AsyncPlayer => (InputSource::Controller, Pacing::Realtime),
            Mode::Spectator => (InputSource::Spectator, Pacing::Lockstep),
            Mode::AsyncSpectator => (InputSource::Spectator, Pacing::Realtime),
        }
    }
}

// ---------------------------------------------------------------------------
// Buffers
// ---------------------------------------------------------------------------

/// Which image buffers each `State` carries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BufferFlags {
    pub screen: bool,
    pub depth: bool,
    pub labels: bool,
    pub automap: bool,
}

impl Default for BufferFlags {
    fn default() -> Self {
        Self {
            screen: true,
            depth: false,
            labels: false,
            automap: false,
        }
    }
}

// ---------------------------------------------------------------------------
// GameConfig
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Scenario JSON file. `None` selects the built-in `scenario_name`.
    pub scenario_path: Option<PathBuf>,
    pub scenario_name: String,
    pub map: String,
    pub mode: Mode,

    pub available_buttons: Vec<Button>,
    pub available_game_variables: Vec<GameVariable>,

    pub buffers: BufferFlags,
    pub objects_info_enabled: bool,
    pub sectors_info_enabled: bool,
    pub screen_resolution: ScreenResolution,
    pub screen_format: ScreenFormat,
    pub render: RenderSettings,

    /// Absolute engine tick at which the episode ends; 0 disables it.
    pub episode_timeout: u64,
    /// Ticks played silently, with no input, at the start of every episode.
    pub episode_start_time: u64,
    pub living_reward: f64,
    pub death_penalty: f64,

    /// Seed of the first episode; later episodes derive theirs from it.
    pub seed: u64,
    /// Ticks per second for the realtime modes.
    pub ticrate: u32,

    pub game_args: Vec<String>,
    /// Longest wait for a lockstep tick or an episode restart.
    pub sync_timeout_ms: u64,
    /// Longest wait in `init` for the lobby to fill.
    pub lobby_timeout_ms: u64,

    // Cosmetic; accepted so existing configs load, otherwise unused.
    pub window_visible: bool,
    pub sound_enabled: bool,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            scenario_path: None,
            scenario_name: "basic".into(),
            map: "map01".into(),
            mode: Mode::Player,
            available_buttons: Vec::new(),
            available_game_variables: Vec::new(),
            buffers: BufferFlags::default(),
            objects_info_enabled: false,
            sectors_info_enabled: false,
            screen_resolution: ScreenResolution::default(),
            screen_format: ScreenFormat::default(),
            render: RenderSettings::default(),
            episode_timeout: 0,
            episode_start_time: 0,
            living_reward: 0.0,
            death_penalty: 0.0,
            seed: 0,
            ticrate: 35,
            game_args: Vec::new(),
            sync_timeout_ms: 5000,
            lobby_timeout_ms: 60_000,
            window_visible: false,
            sound_enabled: false,
        }
    }
}

impl GameConfig {
    /// Read a JSON config. Relative `scenario_path`s are resolved against the
    /// config file's directory.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, VizError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::File {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: GameConfig =
            serde_json::from_str(&text).map_err(|e| ConfigError::Parse {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        if let Some(scenario) = &config.scenario_path {
            if scenario.is_relative() {
                if let Some(dir) = path.parent() {
                    config.scenario_path = Some(dir.join(scenario));
                }
            }
        }
        Ok(config)
    }

    /// Reject configurations no engine could run. Called by `Session::init`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (i, button) in self.available_buttons.iter().enumerate() {
            if self.available_buttons[..i].contains(button) {
                return Err(ConfigError::DuplicateButton(*button));
            }
        }
        for (i, var) in self.available_game_variables.iter().enumerate() {
            if self.available_game_variables[..i].contains(var) {
                return Err(ConfigError::DuplicateGameVariable(*var));
            }
        }
        if self.ticrate == 0 {
            return Err(ConfigError::Invalid("ticrate must be positive".into()));
        }
        Ok(())
    }

    pub fn scenario_source(&self) -> ScenarioSource {
        match &self.scenario_path {
            Some(path) => ScenarioSource::File(path.clone()),
            None => ScenarioSource::Builtin(self.scenario_name.clone()),
        }
    }

    // -- Setters ----------------------------------------------------------

    pub fn set_scenario_path(&mut self, path: impl Into<PathBuf>) {
        self.scenario_path = Some(path.into());
    }

    pub fn set_scenario_name(&mut self, name: impl Into<String>) {
        self.scenario_path = None;
        self.scenario_name = name.into();
    }

    pub fn set_map(&mut self, map: impl Into<String>) {
        self.map = map.into();
    }

    pub fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
    }

    pub fn set_available_buttons(&mut self, buttons: &[Button]) {
        self.available_buttons = buttons.to_vec();
    }

    pub fn add_available_button(&mut self, button: Button) {
        self.available_buttons.push(button);
    }

    pub fn clear_available_buttons(&mut self) {
        self.available_buttons.clear();
    }

    pub fn set_available_game_variables(&mut self, vars: &[GameVariable]) {
        self.available_game_variables = vars.to_vec();
    }

    pub fn add_available_game_variable(&mut self, var: GameVariable) {
        self.available_game_variables.push(var);
    }

    pub fn clear_available_game_variables(&mut self) {
        self.available_game_variables.clear();
    }

    pub fn set_screen_resolution(&mut self, resolution: ScreenResolution) {
        self.screen_resolution = resolution;
    }

    pub fn set_screen_format(&mut self, format: ScreenFormat) {
        self.screen_format = format;
    }

    pub fn set_depth_buffer_enabled(&mut self, enabled: bool) {
        self.buffers.depth = enabled;
    }

    pub fn set_labels_buffer_enabled(&mut self, enabled: bool) {
        self.buffers.labels = enabled;
    }

    pub fn set_automap_buffer_enabled(&mut self, enabled: bool) {
        self.buffers.automap = enabled;
    }

    pub fn set_objects_info_enabled(&mut self, enabled: bool) {
        self.objects_info_enabled = enabled;
    }

    pub fn set_sectors_info_enabled(&mut self, enabled: bool) {
        self.sectors_info_enabled = enabled;
    }

    pub fn set_render_hud(&mut self, enabled: bool) {
        self.render.hud = enabled;
    }

    pub fn set_render_minimal_hud(&mut self, enabled: bool) {
        self.render.minimal_hud = enabled;
    }

    pub fn set_render_crosshair(&mut self, enabled: bool) {
        self.render.crosshair = enabled;
    }

    pub fn set_render_weapon(&mut self, enabled: bool) {
        self.render.weapon = enabled;
    }

    pub fn set_render_decals(&mut self, enabled: bool) {
        self.render.decals = enabled;
    }

    pub fn set_render_particles(&mut self, enabled: bool) {
        self.render.particles = enabled;
    }

    pub fn set_render_effects_sprites(&mut self, enabled: bool) {
        self.render.effects_sprites = enabled;
    }

    pub fn set_render_messages(&mut self, enabled: bool) {
        self.render.messages = enabled;
    }

    pub fn set_render_corpses(&mut self, enabled: bool) {
        self.render.corpses = enabled;
    }

    pub fn set_render_screen_flashes(&mut self, enabled: bool) {
        self.render.screen_flashes = enabled;
    }

    pub fn set_episode_timeout(&mut self, ticks: u64) {
        self.episode_timeout = ticks;
    }

    pub fn set_episode_start_time(&mut self, ticks: u64) {
        self.episode_start_time = ticks;
    }

    pub fn set_living_reward(&mut self, reward: f64) {
        self.living_reward = reward;
    }

    pub fn set_death_penalty(&mut self, penalty: f64) {
        self.death_penalty = penalty;
    }

    pub fn set_seed(&mut self, seed: u64) {
        self.seed = seed;
    }

    pub fn set_ticrate(&mut self, ticrate: u32) {
        self.ticrate = ticrate;
    }

    /// Append launch arguments. One call may carry several whitespace
    /// separated tokens.
    pub fn add_game_args(&mut self, args: impl Into<String>) {
        self.game_args.push(args.into());
    }

    pub fn clear_game_args(&mut self) {
        self.game_args.clear();
    }

    pub fn set_sync_timeout_ms(&mut self, ms: u64) {
        self.sync_timeout_ms = ms;
    }

    pub fn set_window_visible(&mut self, visible: bool) {
        self.window_visible = visible;
    }

    pub fn set_sound_enabled(&mut self, enabled: bool) {
        self.sound_enabled = enabled;
    }
}
