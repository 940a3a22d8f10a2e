// vizlink — the interaction and replay layer over a game engine.
//
// An agent drives a `Session`: it configures buttons, game variables and
// buffers, initializes, then loops `get_state` / `make_action` until the
// episode finishes. Episodes can be recorded to demo files and replayed
// later, and several sessions can play one game in lockstep.
//
// Module overview:
// - `session.rs`:     `Session`, lifecycle and the per-tick pipeline.
// - `config.rs`:      `GameConfig`, `Mode`, `BufferFlags`.
// - `episode.rs`:     `EpisodeController`, `FinishReason`.
// - `action.rs`:      `ActionChannel`, `SpectatorInput`, realtime `Pacer`.
// - `observation.rs`: `State` and its in-place assembly.
// - `reward.rs`:      `RewardAccumulator`.
// - `demo.rs`:        Demo file format, `Fingerprint`, writer and reader.
// - `multiplayer/`:   Topology, peer links, lockstep coordinator.
// - `error.rs`:       `VizError` and its payloads.
//
// The engine itself lives behind `vizlink_engine::Engine`; `ArenaEngine` is
// the implementation every example and test uses.

pub mod action;
pub mod config;
pub mod demo;
pub mod episode;
pub mod error;
pub mod multiplayer;
pub mod observation;
pub mod reward;
pub mod session;

pub use action::{ScriptedInput, SpectatorInput};
pub use config::{BufferFlags, GameConfig, InputSource, Mode, Pacing};
pub use demo::{Demo, DemoHeader, DemoTick, Fingerprint};
pub use episode::FinishReason;
pub use error::{
    ActionShapeError, ConfigError, NetworkSyncError, ReplayMismatchError, SessionStateError,
    VizError,
};
pub use multiplayer::{LoopbackHub, LoopbackLink, PeerLink, Player};
pub use observation::State;
pub use session::{Lifecycle, Session};

pub use vizlink_engine::{
    ArenaEngine, Buffer, Button, Engine, GameVariable, Label, LineInfo, ObjectInfo, PlayerNumber,
    RenderSettings, ScreenFormat, ScreenResolution, SectorInfo, Vec3,
};
