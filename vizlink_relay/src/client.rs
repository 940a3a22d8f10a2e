// TCP client for joining a hosted game.
//
// Every peer uses this client, including the host's own seat (which connects
// to its tick authority over loopback). Architecture:
// - `connect()` performs TCP connect + Hello handshake on the calling thread,
//   then spawns a background reader thread.
// - The reader thread decodes `ServerMessage` frames into an `mpsc` channel
//   until the stream closes; dropping the sender is how `HostLost` surfaces.
// - The caller holds a `BufWriter<TcpStream>` for sending.
//
// Lockstep needs blocking waits, so besides the non-blocking `poll()` the
// client offers `recv_timeout()`, which is what the multiplayer coordinator
// uses to wait for the next `Tick` with a bounded sync timeout.

use std::io::{BufReader, BufWriter};
use std::net::TcpStream;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::debug;
use vizlink_protocol::framing::{read_message, write_message};
use vizlink_protocol::message::{ClientMessage, PlayerInfo, ServerMessage};
use vizlink_protocol::types::{PROTOCOL_VERSION, PlayerNumber};

use crate::error::NetError;

/// What the host told us when it accepted the handshake.
#[derive(Clone, Debug)]
pub struct WelcomeInfo {
    pub player_number: PlayerNumber,
    pub players: Vec<PlayerInfo>,
    pub expected_players: u8,
}

/// Joined connection to a tick authority.
pub struct NetClient {
    writer: BufWriter<TcpStream>,
    inbox: Receiver<ServerMessage>,
    _reader_thread: Option<JoinHandle<()>>,
    player_number: PlayerNumber,
}

impl NetClient {
    /// Connect, send `Hello`, and wait up to `handshake_timeout` for the
    /// host's answer.
    pub fn connect(
        addr: &str,
        player_name: &str,
        color: u8,
        config_digest: u32,
        handshake_timeout: Duration,
    ) -> Result<(Self, WelcomeInfo), NetError> {
        let stream = TcpStream::connect(addr).map_err(|source| NetError::Connect {
            addr: addr.to_string(),
            source,
        })?;
        stream.set_nodelay(true).ok();
        stream.set_read_timeout(Some(handshake_timeout)).ok();

        let reader_stream = stream
            .try_clone()
            .map_err(|e| NetError::Handshake(format!("clone failed: {e}")))?;
        let mut writer = BufWriter::new(stream);

        let hello = ClientMessage::Hello {
            protocol_version: PROTOCOL_VERSION,
            player_name: player_name.into(),
            color,
            config_digest,
        };
        send_msg(&mut writer, &hello)?;

        let mut reader = BufReader::new(reader_stream);
        let response_bytes = read_message(&mut reader)
            .map_err(|e| NetError::Handshake(format!("read Welcome failed: {e}")))?;
        let response: ServerMessage = serde_json::from_slice(&response_bytes)
            .map_err(|e| NetError::Handshake(format!("parse Welcome failed: {e}")))?;

        let welcome = match response {
            ServerMessage::Welcome {
                player_number,
                players,
                expected_players,
            } => WelcomeInfo {
                player_number,
                players,
                expected_players,
            },
            ServerMessage::Rejected { reason } => return Err(NetError::Rejected(reason)),
            other => {
                return Err(NetError::Handshake(format!(
                    "unexpected response: {other:?}"
                )));
            }
        };
        debug!("joined as player {}", welcome.player_number.0);

        reader.get_ref().set_read_timeout(None).ok();

        let (tx, rx) = mpsc::channel();
        let reader_thread = thread::spawn(move || reader_loop(reader, tx));

        Ok((
            Self {
                writer,
                inbox: rx,
                _reader_thread: Some(reader_thread),
                player_number: welcome.player_number,
            },
            welcome,
        ))
    }

    pub fn player_number(&self) -> PlayerNumber {
        self.player_number
    }

    /// Commit this peer's input for `tick`.
    pub fn send_input(&mut self, tick: u64, buttons: &[f64], respawn: bool) -> Result<(), NetError> {
        let msg = ClientMessage::Input {
            tick,
            buttons: buttons.to_vec(),
            respawn,
        };
        send_msg(&mut self.writer, &msg)
    }

    /// Ask the authority to restart the episode (honored for the host seat).
    pub fn send_new_episode(&mut self, seed: u64) -> Result<(), NetError> {
        send_msg(&mut self.writer, &ClientMessage::NewEpisode { seed })
    }

    /// Send `Goodbye`. The connection closes when the client is dropped.
    pub fn disconnect(&mut self) {
        let _ = send_msg(&mut self.writer, &ClientMessage::Goodbye);
    }

    /// Drain all queued server messages (non-blocking).
    pub fn poll(&self) -> Vec<ServerMessage> {
        let mut messages = Vec::new();
        while let Ok(msg) = self.inbox.try_recv() {
            messages.push(msg);
        }
        messages
    }

    /// Block until the next server message or until `timeout` elapses.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<ServerMessage, NetError> {
        match self.inbox.recv_timeout(timeout) {
            Ok(msg) => Ok(msg),
            Err(RecvTimeoutError::Timeout) => Err(NetError::Timeout(timeout)),
            Err(RecvTimeoutError::Disconnected) => Err(NetError::HostLost),
        }
    }
}

fn send_msg(writer: &mut BufWriter<TcpStream>, msg: &ClientMessage) -> Result<(), NetError> {
    let json = serde_json::to_vec(msg).map_err(|e| NetError::Send(e.to_string()))?;
    write_message(writer, &json).map_err(|e| NetError::Send(e.to_string()))
}

fn reader_loop(mut reader: BufReader<TcpStream>, tx: mpsc::Sender<ServerMessage>) {
    while let Ok(bytes) = read_message(&mut reader) {
        let Ok(msg) = serde_json::from_slice::<ServerMessage>(&bytes) else {
            break;
        };
        if tx.send(msg).is_err() {
            break;
        }
    }
}
