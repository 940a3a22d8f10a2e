// vizlink_protocol — wire protocol for lockstep multiplayer sessions.
//
// Shared by the host's tick authority (`vizlink_relay::server`), the join
// client (`vizlink_relay::client`) and the demo files written by `vizlink`.
// It depends on neither the engine nor the core crate.
//
// Module overview:
// - `types.rs`:    `PlayerNumber`, `PeerInput`, `PROTOCOL_VERSION`.
// - `message.rs`:  `ClientMessage` / `ServerMessage` and `PlayerInfo`.
// - `framing.rs`:  4-byte big-endian length prefix + payload, over any
//                  `Read`/`Write`; `write_message` flushes each frame,
//                  `write_frame` leaves that to buffered file writers.
//
// Messages are JSON. Framing is blocking `std::io`, which suits both TCP
// streams and files.

pub mod framing;
pub mod message;
pub mod types;

pub use framing::{
    MAX_MESSAGE_SIZE, read_message, try_read_message, write_frame, write_message,
};
pub use message::{ClientMessage, PlayerInfo, ServerMessage};
pub use types::{PROTOCOL_VERSION, PeerInput, PlayerNumber};

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn client_roundtrip(msg: &ClientMessage) {
        let json = serde_json::to_vec(msg).unwrap();
        let mut wire = Vec::new();
        write_message(&mut wire, &json).unwrap();
        let recovered_json = read_message(&mut Cursor::new(&wire)).unwrap();
        let recovered: ClientMessage = serde_json::from_slice(&recovered_json).unwrap();
        assert_eq!(&recovered, msg);
    }

    fn server_roundtrip(msg: &ServerMessage) {
        let json = serde_json::to_vec(msg).unwrap();
        let mut wire = Vec::new();
        write_message(&mut wire, &json).unwrap();
        let recovered_json = read_message(&mut Cursor::new(&wire)).unwrap();
        let recovered: ServerMessage = serde_json::from_slice(&recovered_json).unwrap();
        assert_eq!(&recovered, msg);
    }

    #[test]
    fn hello_survives_the_wire() {
        client_roundtrip(&ClientMessage::Hello {
            protocol_version: PROTOCOL_VERSION,
            player_name: "AI".into(),
            color: 3,
            config_digest: 0xCAFE_BABE,
        });
    }

    #[test]
    fn input_keeps_fractional_delta_values() {
        client_roundtrip(&ClientMessage::Input {
            tick: 17,
            buttons: vec![1.0, 0.0, -12.5],
            respawn: true,
        });
    }

    #[test]
    fn tick_broadcast_keeps_player_order() {
        server_roundtrip(&ServerMessage::Tick {
            tick: 4,
            inputs: vec![
                PeerInput {
                    player: PlayerNumber(1),
                    buttons: vec![0.0, 1.0],
                    respawn: false,
                },
                PeerInput {
                    player: PlayerNumber(2),
                    buttons: vec![1.0, 0.0],
                    respawn: false,
                },
            ],
        });
    }

    #[test]
    fn welcome_lists_seated_players() {
        server_roundtrip(&ServerMessage::Welcome {
            player_number: PlayerNumber(2),
            players: vec![
                PlayerInfo {
                    number: PlayerNumber(1),
                    name: "Host".into(),
                    color: 0,
                },
                PlayerInfo {
                    number: PlayerNumber(2),
                    name: "Guest".into(),
                    color: 4,
                },
            ],
            expected_players: 2,
        });
    }
}
