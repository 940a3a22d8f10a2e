// Identifier and payload types shared by the host and its peers.
//
// `PlayerNumber` is the stable per-session identity the host hands out on
// join (1-based, in join order). `PeerInput` is one player's committed input
// for one tick; the host collects one per player and broadcasts the set, so
// every peer applies exactly the same inputs in exactly the same order.

use serde::{Deserialize, Serialize};

/// Version of the wire protocol spoken by this crate. Bumped on any
/// incompatible message change; the host rejects mismatching peers.
pub const PROTOCOL_VERSION: u32 = 1;

/// Host-assigned player number. Starts at 1 for the host's own seat.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerNumber(pub u8);

/// One player's input for a single tick.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PeerInput {
    pub player: PlayerNumber,
    /// Button values in the session's button registration order.
    pub buttons: Vec<f64>,
    /// Set when the player asked to respawn on this tick.
    pub respawn: bool,
}
