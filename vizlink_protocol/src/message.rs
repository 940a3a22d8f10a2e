// Messages exchanged between peers and the host's tick authority.
//
// - `ClientMessage`: sent by every peer (including the host's own seat).
// - `ServerMessage`: sent by the tick authority.
//
// The session flow is: `Hello` → `Welcome` (or `Rejected`), lobby
// `PlayerJoined` notifications until the expected player count is reached,
// `GameStart`, then one `Input` per peer per tick answered by one `Tick`
// broadcast carrying every player's input for that tick. `NewEpisode` from
// the host restarts the episode on every peer via `EpisodeStart`.

use serde::{Deserialize, Serialize};

use crate::types::{PeerInput, PlayerNumber};

/// Messages sent by a peer to the host.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ClientMessage {
    /// Join handshake. `config_digest` is the session fingerprint digest; all
    /// peers must agree on buttons, variables and map.
    Hello {
        protocol_version: u32,
        player_name: String,
        color: u8,
        config_digest: u32,
    },
    /// Committed input for `tick`.
    Input {
        tick: u64,
        buttons: Vec<f64>,
        respawn: bool,
    },
    /// Host only: restart the episode on every peer.
    NewEpisode { seed: u64 },
    /// Leaving gracefully.
    Goodbye,
}

/// Messages sent by the host to a peer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ServerMessage {
    /// Handshake accepted.
    Welcome {
        player_number: PlayerNumber,
        players: Vec<PlayerInfo>,
        expected_players: u8,
    },
    /// Handshake rejected.
    Rejected { reason: String },
    /// Another peer joined the lobby.
    PlayerJoined { player: PlayerInfo },
    /// A peer disconnected; it no longer gates tick progress.
    PlayerLeft { player_number: PlayerNumber },
    /// Every expected player is present; peers start episode 0.
    GameStart { seed: u64, players: Vec<PlayerInfo> },
    /// The host restarted the episode.
    EpisodeStart { episode: u32, seed: u64 },
    /// All inputs for one tick, sorted by player number.
    Tick { tick: u64, inputs: Vec<PeerInput> },
}

/// Public identity of a seated player.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlayerInfo {
    pub number: PlayerNumber,
    pub name: String,
    pub color: u8,
}
