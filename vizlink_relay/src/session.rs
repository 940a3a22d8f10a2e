// Lobby and lockstep state for the host's tick authority.
//
// `HostSession` is driven by `server.rs` from a single event loop; it never
// locks. It seats players, starts the game once the expected number of
// players is present, and gates tick progress on inputs:
//
// - Lobby: `add_player` validates protocol version and config digest,
//   assigns the next `PlayerNumber`, announces the newcomer to everyone
//   already seated and sends it a `Welcome`. When the last expected seat is
//   filled, `GameStart` goes out to all.
// - Lockstep: inputs are buffered per tick. A tick is released (broadcast as
//   `Tick`) only when every connected player has submitted for it, and ticks
//   are released strictly in order. A player that disconnects stops gating
//   progress, which may immediately release buffered ticks.
// - Restart: `NewEpisode` from the host seat is echoed as `EpisodeStart`.
//
// Peers are reached through an `Outbox`: a framed TCP stream for networked
// games, or an in-process channel. Write errors to a single peer are logged
// and otherwise ignored; the transport is responsible for noticing the broken
// peer and calling `remove_player`.

use std::collections::BTreeMap;
use std::io::BufWriter;
use std::net::{Shutdown, TcpStream};
use std::sync::mpsc::Sender;

use log::{debug, info, warn};
use vizlink_protocol::framing::write_message;
use vizlink_protocol::message::{PlayerInfo, ServerMessage};
use vizlink_protocol::types::{PROTOCOL_VERSION, PeerInput, PlayerNumber};

/// Seat number of the hosting player.
pub const HOST_SEAT: PlayerNumber = PlayerNumber(1);

/// Tick authority state for one multiplayer game.
pub struct HostSession {
    expected_players: u8,
    config_digest: u32,
    seed: u64,
    players: BTreeMap<PlayerNumber, Seat>,
    next_number: u8,
    game_started: bool,
    episode: u32,

    /// Next tick to be released.
    next_tick: u64,
    /// Buffered inputs keyed by tick, then by player.
    pending: BTreeMap<u64, BTreeMap<PlayerNumber, PeerInput>>,
}

struct Seat {
    name: String,
    color: u8,
    outbox: Box<dyn Outbox>,
}

/// Delivery path from the authority to one seated peer.
pub trait Outbox: Send {
    fn deliver(&mut self, msg: &ServerMessage) -> Result<(), String>;

    /// Called when the authority goes away.
    fn close(&mut self) {}
}

/// Framed JSON over a TCP stream.
pub struct TcpOutbox {
    writer: BufWriter<TcpStream>,
}

impl TcpOutbox {
    pub fn new(stream: TcpStream) -> Self {
        Self {
            writer: BufWriter::new(stream),
        }
    }
}

impl Outbox for TcpOutbox {
    fn deliver(&mut self, msg: &ServerMessage) -> Result<(), String> {
        send_message(&mut self.writer, msg).map_err(|e| e.to_string())
    }

    // Reader threads hold clones of the stream; shutting the socket down is
    // what unblocks them and lets the peer observe that the host is gone.
    fn close(&mut self) {
        let _ = self.writer.get_ref().shutdown(Shutdown::Both);
    }
}

/// In-process delivery. Dropping the sender is how the peer observes the
/// authority going away.
impl Outbox for Sender<ServerMessage> {
    fn deliver(&mut self, msg: &ServerMessage) -> Result<(), String> {
        self.send(msg.clone())
            .map_err(|_| "peer inbox closed".to_string())
    }
}

impl HostSession {
    pub fn new(expected_players: u8, config_digest: u32, seed: u64) -> Self {
        Self {
            expected_players: expected_players.max(1),
            config_digest,
            seed,
            players: BTreeMap::new(),
            next_number: HOST_SEAT.0,
            game_started: false,
            episode: 0,
            next_tick: 0,
            pending: BTreeMap::new(),
        }
    }

    /// Seat a new player. Returns the assigned number, or the reason the
    /// handshake is refused (the caller sends `Rejected`).
    pub fn add_player(
        &mut self,
        protocol_version: u32,
        player_name: String,
        color: u8,
        config_digest: u32,
        outbox: Box<dyn Outbox>,
    ) -> Result<PlayerNumber, String> {
        if protocol_version != PROTOCOL_VERSION {
            return Err(format!(
                "protocol version {protocol_version} not supported (host speaks {PROTOCOL_VERSION})"
            ));
        }
        if config_digest != self.config_digest {
            return Err("configuration fingerprint mismatch".into());
        }
        if self.game_started {
            return Err("game already started".into());
        }
        if self.players.len() >= usize::from(self.expected_players) {
            return Err("session is full".into());
        }

        let number = PlayerNumber(self.next_number);
        self.next_number = self.next_number.saturating_add(1);

        let info = PlayerInfo {
            number,
            name: player_name.clone(),
            color,
        };
        self.broadcast(&ServerMessage::PlayerJoined {
            player: info.clone(),
        });
        self.players.insert(
            number,
            Seat {
                name: player_name,
                color,
                outbox,
            },
        );
        info!("player {} ({}) seated", number.0, info.name);

        let welcome = ServerMessage::Welcome {
            player_number: number,
            players: self.player_list(),
            expected_players: self.expected_players,
        };
        self.send_to(number, &welcome);

        if self.players.len() == usize::from(self.expected_players) {
            self.game_started = true;
            info!("all {} players present, starting game", self.expected_players);
            let start = ServerMessage::GameStart {
                seed: self.seed,
                players: self.player_list(),
            };
            self.broadcast(&start);
        }

        Ok(number)
    }

    /// Remove a player, announce it, and release any ticks that were only
    /// waiting on them.
    pub fn remove_player(&mut self, number: PlayerNumber) {
        if self.players.remove(&number).is_none() {
            return;
        }
        warn!("player {} left", number.0);
        for inputs in self.pending.values_mut() {
            inputs.remove(&number);
        }
        self.broadcast(&ServerMessage::PlayerLeft {
            player_number: number,
        });
        self.release_ready_ticks();
    }

    /// Buffer one player's input. Inputs for already released ticks and
    /// inputs before the game starts are dropped.
    pub fn submit_input(&mut self, player: PlayerNumber, tick: u64, buttons: Vec<f64>, respawn: bool) {
        if !self.game_started || !self.players.contains_key(&player) {
            return;
        }
        if tick < self.next_tick {
            debug!("dropping stale input from player {} for tick {tick}", player.0);
            return;
        }
        self.pending.entry(tick).or_default().insert(
            player,
            PeerInput {
                player,
                buttons,
                respawn,
            },
        );
        self.release_ready_ticks();
    }

    /// Host seat only: restart the episode on every peer.
    pub fn new_episode(&mut self, player: PlayerNumber, seed: u64) {
        if player != HOST_SEAT || !self.game_started {
            return;
        }
        self.episode += 1;
        self.seed = seed;
        info!("host restarted episode {} (seed {seed})", self.episode);
        self.broadcast(&ServerMessage::EpisodeStart {
            episode: self.episode,
            seed,
        });
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn is_game_started(&self) -> bool {
        self.game_started
    }

    /// Next tick waiting for inputs.
    pub fn next_tick(&self) -> u64 {
        self.next_tick
    }

    pub fn player_list(&self) -> Vec<PlayerInfo> {
        self.players
            .iter()
            .map(|(number, seat)| PlayerInfo {
                number: *number,
                name: seat.name.clone(),
                color: seat.color,
            })
            .collect()
    }

    fn release_ready_ticks(&mut self) {
        if self.players.is_empty() {
            return;
        }
        loop {
            let ready = self
                .pending
                .get(&self.next_tick)
                .is_some_and(|inputs| self.players.keys().all(|p| inputs.contains_key(p)));
            if !ready {
                break;
            }
            let inputs = self.pending.remove(&self.next_tick).unwrap_or_default();
            let msg = ServerMessage::Tick {
                tick: self.next_tick,
                inputs: inputs.into_values().collect(),
            };
            self.broadcast(&msg);
            self.next_tick += 1;
        }
    }

    fn send_to(&mut self, number: PlayerNumber, msg: &ServerMessage) {
        if let Some(seat) = self.players.get_mut(&number) {
            if let Err(e) = seat.outbox.deliver(msg) {
                warn!("write to player {} failed: {e}", number.0);
            }
        }
    }

    fn broadcast(&mut self, msg: &ServerMessage) {
        let numbers: Vec<PlayerNumber> = self.players.keys().copied().collect();
        for number in numbers {
            self.send_to(number, msg);
        }
    }
}

impl Drop for HostSession {
    fn drop(&mut self) {
        for seat in self.players.values_mut() {
            seat.outbox.close();
        }
    }
}

/// Serialize a `ServerMessage` and write it as one frame.
pub(crate) fn send_message(
    writer: &mut BufWriter<TcpStream>,
    msg: &ServerMessage,
) -> Result<(), Box<dyn std::error::Error>> {
    let json = serde_json::to_vec(msg)?;
    write_message(writer, &json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::BufReader;
    use std::net::TcpListener;

    use vizlink_protocol::framing::read_message;

    use super::*;

    fn tcp_pair() -> (TcpStream, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let client = TcpStream::connect(addr).unwrap();
        let (server, _) = listener.accept().unwrap();
        (client, server)
    }

    fn recv(reader: &mut BufReader<TcpStream>) -> ServerMessage {
        let bytes = read_message(reader).unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn seat(session: &mut HostSession, name: &str) -> (BufReader<TcpStream>, PlayerNumber) {
        let (client, server) = tcp_pair();
        let number = session
            .add_player(PROTOCOL_VERSION, name.into(), 0, 7, Box::new(TcpOutbox::new(server)))
            .unwrap();
        (BufReader::new(client), number)
    }

    #[test]
    fn first_player_is_host_seat() {
        let mut session = HostSession::new(2, 7, 42);
        let (mut reader, number) = seat(&mut session, "Host");
        assert_eq!(number, HOST_SEAT);
        match recv(&mut reader) {
            ServerMessage::Welcome {
                player_number,
                players,
                expected_players,
            } => {
                assert_eq!(player_number, HOST_SEAT);
                assert_eq!(players.len(), 1);
                assert_eq!(expected_players, 2);
            }
            other => panic!("expected Welcome, got {other:?}"),
        }
        assert!(!session.is_game_started());
    }

    #[test]
    fn digest_mismatch_rejected() {
        let mut session = HostSession::new(2, 7, 42);
        let (_client, server) = tcp_pair();
        let err = session
            .add_player(PROTOCOL_VERSION, "Bob".into(), 0, 8, Box::new(TcpOutbox::new(server)))
            .unwrap_err();
        assert_eq!(err, "configuration fingerprint mismatch");
    }

    #[test]
    fn game_starts_when_last_seat_fills() {
        let mut session = HostSession::new(2, 7, 42);
        let (mut host, _) = seat(&mut session, "Host");
        let (mut guest, guest_number) = seat(&mut session, "Guest");
        assert_eq!(guest_number, PlayerNumber(2));
        assert!(session.is_game_started());

        let _welcome = recv(&mut host);
        assert!(matches!(recv(&mut host), ServerMessage::PlayerJoined { .. }));
        assert!(matches!(
            recv(&mut host),
            ServerMessage::GameStart { seed: 42, .. }
        ));

        let _welcome = recv(&mut guest);
        match recv(&mut guest) {
            ServerMessage::GameStart { players, .. } => assert_eq!(players.len(), 2),
            other => panic!("expected GameStart, got {other:?}"),
        }
    }

    #[test]
    fn full_session_rejects_late_joiner() {
        let mut session = HostSession::new(1, 7, 42);
        let (_host, _) = seat(&mut session, "Host");
        let (_client, server) = tcp_pair();
        let err = session
            .add_player(PROTOCOL_VERSION, "Late".into(), 0, 7, Box::new(TcpOutbox::new(server)))
            .unwrap_err();
        assert_eq!(err, "game already started");
    }

    #[test]
    fn tick_released_only_when_all_inputs_arrive() {
        let mut session = HostSession::new(2, 7, 42);
        let (mut host, _) = seat(&mut session, "Host");
        let (_guest, _) = seat(&mut session, "Guest");

        session.submit_input(PlayerNumber(2), 0, vec![0.0, 1.0], false);
        assert_eq!(session.next_tick(), 0);
        session.submit_input(PlayerNumber(1), 0, vec![1.0, 0.0], false);
        assert_eq!(session.next_tick(), 1);

        let _welcome = recv(&mut host);
        let _joined = recv(&mut host);
        let _start = recv(&mut host);
        match recv(&mut host) {
            ServerMessage::Tick { tick, inputs } => {
                assert_eq!(tick, 0);
                let order: Vec<u8> = inputs.iter().map(|i| i.player.0).collect();
                assert_eq!(order, vec![1, 2]);
                assert_eq!(inputs[1].buttons, vec![0.0, 1.0]);
            }
            other => panic!("expected Tick, got {other:?}"),
        }
    }

    #[test]
    fn ticks_release_in_order() {
        let mut session = HostSession::new(1, 7, 42);
        let (_host, _) = seat(&mut session, "Host");

        session.submit_input(HOST_SEAT, 1, vec![], false);
        assert_eq!(session.next_tick(), 0, "tick 1 must wait for tick 0");
        session.submit_input(HOST_SEAT, 0, vec![], false);
        assert_eq!(session.next_tick(), 2);
    }

    #[test]
    fn departure_unblocks_waiting_tick() {
        let mut session = HostSession::new(2, 7, 42);
        let (_host, _) = seat(&mut session, "Host");
        let (_guest, guest) = seat(&mut session, "Guest");

        session.submit_input(HOST_SEAT, 0, vec![], false);
        assert_eq!(session.next_tick(), 0);
        session.remove_player(guest);
        assert_eq!(session.next_tick(), 1);
        assert_eq!(session.player_count(), 1);
    }

    #[test]
    fn only_host_restarts_episode() {
        let mut session = HostSession::new(2, 7, 42);
        let (_host, _) = seat(&mut session, "Host");
        let (mut guest, _) = seat(&mut session, "Guest");

        session.new_episode(PlayerNumber(2), 5);
        session.new_episode(HOST_SEAT, 9);

        let _welcome = recv(&mut guest);
        let _start = recv(&mut guest);
        assert!(matches!(
            recv(&mut guest),
            ServerMessage::EpisodeStart { episode: 1, seed: 9 }
        ));
    }

    #[test]
    fn channel_outbox_receives_broadcasts() {
        let mut session = HostSession::new(1, 7, 42);
        let (tx, rx) = std::sync::mpsc::channel();
        let number = session
            .add_player(PROTOCOL_VERSION, "Local".into(), 3, 7, Box::new(tx))
            .unwrap();
        session.submit_input(number, 0, vec![1.0], false);

        assert!(matches!(rx.recv().unwrap(), ServerMessage::Welcome { .. }));
        assert!(matches!(rx.recv().unwrap(), ServerMessage::GameStart { .. }));
        match rx.recv().unwrap() {
            ServerMessage::Tick { tick: 0, inputs } => assert_eq!(inputs[0].buttons, vec![1.0]),
            other => panic!("expected Tick, got {other:?}"),
        }
        drop(session);
        assert!(rx.recv().is_err(), "dropping the session closes the inbox");
    }
}
