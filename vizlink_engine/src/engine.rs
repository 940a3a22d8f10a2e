// The seam between the session core and a simulation.
//
// The core never reaches into a simulation directly; it launches one,
// starts episodes, feeds it exactly one tick of inputs at a time and reads
// back variables, rewards and rendered frames. Anything that implements
// `Engine` can sit behind a session: the bundled `ArenaEngine`, or a test
// double that fails on demand.
//
// Contract:
// - `advance` steps exactly one tick with one input per player present.
// - `render` is a pure function of (world state, request). It must never
//   mutate the simulation, which is why it takes `&self`. Replays therefore
//   produce the same ticks and variables under any render settings.
// - Errors from `launch`/`start_episode` that name a resource
//   (`EngineError::is_resource_error`) are configuration problems; anything
//   else is fatal for the session.

use std::path::PathBuf;

use crate::error::EngineError;
use crate::types::{
    Button, FrameTarget, GameVariable, ObjectInfo, PlayerInput, PlayerNumber, PlayerStatus,
    RenderRequest, SectorInfo,
};

/// Where the scenario comes from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScenarioSource {
    /// A scenario compiled into the engine, by name.
    Builtin(String),
    /// A scenario file on disk.
    File(PathBuf),
}

/// Static launch parameters, fixed for the engine's lifetime.
#[derive(Clone, Debug, PartialEq)]
pub struct LaunchSpec {
    pub scenario: ScenarioSource,
    pub map: String,
    /// Button registration order; every `PlayerInput` follows it.
    pub buttons: Vec<Button>,
}

/// Seat taken by one player for an episode.
#[derive(Clone, Debug, PartialEq)]
pub struct PlayerSlot {
    pub number: PlayerNumber,
    pub name: String,
    pub color: u8,
}

/// Per-episode parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct EpisodeSpec {
    pub seed: u64,
    pub players: Vec<PlayerSlot>,
    /// Deathmatch start selection (random spot instead of seat order).
    pub deathmatch: bool,
    /// Spawn the map's monsters.
    pub monsters: bool,
}

pub trait Engine {
    /// Load resources. Called once, before anything else.
    fn launch(&mut self, spec: &LaunchSpec) -> Result<(), EngineError>;

    /// Digest of the loaded scenario; part of the session fingerprint.
    fn scenario_digest(&self) -> u32;

    /// Reset the world and spawn the given players. The tick counter
    /// restarts at zero.
    fn start_episode(&mut self, spec: &EpisodeSpec) -> Result<(), EngineError>;

    /// Step exactly one tick.
    fn advance(&mut self, inputs: &[PlayerInput]) -> Result<(), EngineError>;

    /// Ticks played since the episode started.
    fn tick(&self) -> u64;

    fn game_variable(&self, player: PlayerNumber, var: GameVariable) -> Result<f64, EngineError>;

    /// Cumulative scenario-defined reward of `player` this episode.
    fn scripted_reward(&self, player: PlayerNumber) -> Result<f64, EngineError>;

    /// The scenario's own exit condition has been met.
    fn episode_over(&self) -> bool;

    fn players(&self) -> Vec<PlayerStatus>;

    /// Draw `player`'s view into whichever targets are present.
    fn render(
        &self,
        player: PlayerNumber,
        request: &RenderRequest,
        target: FrameTarget<'_>,
    ) -> Result<(), EngineError>;

    fn objects(&self) -> Vec<ObjectInfo>;

    fn sectors(&self) -> Vec<SectorInfo>;

    /// Release resources. The engine is unusable afterwards.
    fn shutdown(&mut self);
}
