// vizlink_engine — the simulation behind a vizlink session.
//
// The session core treats the simulation as an external collaborator and
// talks to it only through the `Engine` trait. This crate defines that trait
// and ships `ArenaEngine`, a small deterministic arena simulation with a
// software renderer, used by the example programs and by every test that
// needs a real world to play in.
//
// Module overview:
// - `engine.rs`:   `Engine` trait, `LaunchSpec`, `EpisodeSpec`, `PlayerSlot`.
// - `types.rs`:    Buttons, game variables, screen formats, render settings,
//                  buffers, labels, objects, sectors.
// - `scenario.rs`: JSON scenario model and the built-in scenario library.
// - `world.rs`:    Episode state and the one-tick step function.
// - `render.rs`:   Screen, depth, labels and automap rendering.
// - `arena.rs`:    `ArenaEngine`, tying the above into an `Engine`.
// - `prng.rs`:     xoshiro256++ PRNG with SplitMix64 seeding.
// - `error.rs`:    `EngineError`.
//
// **Critical constraint: determinism.** Given the same scenario, map, seed
// and inputs, `ArenaEngine` reproduces the same ticks on every run. Rendering
// reads the world and never writes it.

pub mod arena;
pub mod engine;
pub mod error;
pub mod prng;
pub mod render;
pub mod scenario;
pub mod types;
pub mod world;

pub use arena::ArenaEngine;
pub use engine::{Engine, EpisodeSpec, LaunchSpec, PlayerSlot, ScenarioSource};
pub use error::EngineError;
pub use scenario::Scenario;
pub use types::*;
