// Multiplayer coordination.
//
// - `topology.rs`:    host/join/solo and player identity from `game_args`.
// - `link.rs`:        `PeerLink` transport seam, TCP (`NetClient`) and
//                     in-process (`LoopbackHub`/`LoopbackLink`).
// - `coordinator.rs`: lockstep input exchange, roster, episode restarts.

pub mod coordinator;
pub mod link;
pub mod topology;

pub use coordinator::{Coordinator, Player};
pub use link::{LoopbackHub, LoopbackLink, PeerLink};
pub use topology::{DEFAULT_PORT, NetArgs, Topology, parse_game_args};
