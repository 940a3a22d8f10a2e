// TCP server and event loop for the host's tick authority.
//
// Thread-per-reader with one central `mpsc` channel:
//
// - Listener thread: non-blocking `accept()` loop, forwards each new stream
//   as `InternalEvent::NewConnection`.
// - Reader threads (one per seated peer): read frames, decode
//   `ClientMessage`, forward as `MessageFrom`; on EOF, error or `Goodbye`
//   send `Disconnected` and exit.
// - Event loop thread: owns the `HostSession` and is the only writer to peer
//   streams. It wakes at least every `POLL_INTERVAL` to observe shutdown.
//
// There is no turn timer: in lockstep the tick cadence is set by the peers'
// inputs, and the session releases a tick as soon as it is complete.

use std::io::{BufReader, BufWriter};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;

use log::{debug, info, warn};
use vizlink_protocol::framing::read_message;
use vizlink_protocol::message::{ClientMessage, ServerMessage};
use vizlink_protocol::types::PlayerNumber;

use crate::session::{HostSession, TcpOutbox, send_message};

const POLL_INTERVAL: Duration = Duration::from_millis(50);
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

enum InternalEvent {
    NewConnection {
        stream: TcpStream,
    },
    MessageFrom {
        player: PlayerNumber,
        message: ClientMessage,
    },
    Disconnected {
        player: PlayerNumber,
    },
}

/// Configuration of a hosted game.
#[derive(Clone, Debug)]
pub struct HostConfig {
    /// Interface to bind, e.g. `0.0.0.0`.
    pub bind: String,
    /// Port to listen on; 0 lets the OS pick.
    pub port: u16,
    /// Total seats, including the host's own.
    pub expected_players: u8,
    /// Fingerprint digest every peer must present.
    pub config_digest: u32,
    /// Seed broadcast with `GameStart`.
    pub seed: u64,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".into(),
            port: 5029,
            expected_players: 1,
            config_digest: 0,
            seed: 0,
        }
    }
}

/// Handle to a running tick authority.
pub struct HostHandle {
    keep_running: Arc<AtomicBool>,
    thread: Option<thread::JoinHandle<()>>,
}

impl HostHandle {
    /// Stop the authority and wait for its event loop to exit.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.keep_running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for HostHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Start the tick authority on background threads. Returns the handle and
/// the bound address (useful with port 0).
pub fn start_host(config: HostConfig) -> std::io::Result<(HostHandle, SocketAddr)> {
    let listener = TcpListener::bind((config.bind.as_str(), config.port))?;
    let addr = listener.local_addr()?;
    listener.set_nonblocking(true)?;
    let keep_running = Arc::new(AtomicBool::new(true));
    let keep_running_loop = keep_running.clone();

    info!("hosting {} player(s) on {addr}", config.expected_players);
    let thread = thread::spawn(move || run_host(listener, config, keep_running_loop));

    Ok((
        HostHandle {
            keep_running,
            thread: Some(thread),
        },
        addr,
    ))
}

fn run_host(listener: TcpListener, config: HostConfig, keep_running: Arc<AtomicBool>) {
    let mut session = HostSession::new(config.expected_players, config.config_digest, config.seed);
    let (tx, rx): (Sender<InternalEvent>, Receiver<InternalEvent>) = mpsc::channel();

    let keep_running_listener = keep_running.clone();
    let tx_listener = tx.clone();
    thread::spawn(move || {
        while keep_running_listener.load(Ordering::SeqCst) {
            match listener.accept() {
                Ok((stream, peer)) => {
                    debug!("connection from {peer}");
                    stream.set_nonblocking(false).ok();
                    stream.set_nodelay(true).ok();
                    if tx_listener
                        .send(InternalEvent::NewConnection { stream })
                        .is_err()
                    {
                        break;
                    }
                }
                Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    thread::sleep(POLL_INTERVAL);
                }
                Err(e) => {
                    warn!("accept failed: {e}");
                    break;
                }
            }
        }
    });

    while keep_running.load(Ordering::SeqCst) {
        match rx.recv_timeout(POLL_INTERVAL) {
            Ok(event) => handle_event(&mut session, event, &tx, &keep_running),
            Err(mpsc::RecvTimeoutError::Timeout) => {}
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }
    info!("host stopped");
}

fn handle_event(
    session: &mut HostSession,
    event: InternalEvent,
    tx: &Sender<InternalEvent>,
    keep_running: &Arc<AtomicBool>,
) {
    match event {
        InternalEvent::NewConnection { stream } => {
            handle_new_connection(session, stream, tx, keep_running);
        }
        InternalEvent::MessageFrom { player, message } => match message {
            ClientMessage::Input {
                tick,
                buttons,
                respawn,
            } => session.submit_input(player, tick, buttons, respawn),
            ClientMessage::NewEpisode { seed } => session.new_episode(player, seed),
            ClientMessage::Hello { .. } | ClientMessage::Goodbye => {}
        },
        InternalEvent::Disconnected { player } => session.remove_player(player),
    }
}

/// Read the `Hello`, seat the peer, and spawn its reader thread. Refused
/// peers get a `Rejected` frame before the stream is dropped.
fn handle_new_connection(
    session: &mut HostSession,
    stream: TcpStream,
    tx: &Sender<InternalEvent>,
    keep_running: &Arc<AtomicBool>,
) {
    stream.set_read_timeout(Some(HANDSHAKE_TIMEOUT)).ok();
    let Ok(read_half) = stream.try_clone() else {
        return;
    };
    let mut reader = BufReader::new(read_half);

    let hello = read_message(&mut reader)
        .ok()
        .and_then(|bytes| serde_json::from_slice::<ClientMessage>(&bytes).ok());
    let Some(ClientMessage::Hello {
        protocol_version,
        player_name,
        color,
        config_digest,
    }) = hello
    else {
        warn!("peer did not open with Hello, dropping connection");
        return;
    };

    let Ok(write_half) = stream.try_clone() else {
        return;
    };
    let outbox = Box::new(TcpOutbox::new(write_half));
    match session.add_player(protocol_version, player_name, color, config_digest, outbox) {
        Ok(player) => {
            stream.set_read_timeout(None).ok();
            let tx_reader = tx.clone();
            let keep_running_reader = keep_running.clone();
            thread::spawn(move || reader_loop(reader, player, tx_reader, keep_running_reader));
        }
        Err(reason) => {
            warn!("rejecting peer: {reason}");
            let mut writer = BufWriter::new(stream);
            let _ = send_message(&mut writer, &ServerMessage::Rejected { reason });
        }
    }
}

fn reader_loop(
    mut reader: BufReader<TcpStream>,
    player: PlayerNumber,
    tx: Sender<InternalEvent>,
    keep_running: Arc<AtomicBool>,
) {
    while keep_running.load(Ordering::SeqCst) {
        let message = read_message(&mut reader)
            .ok()
            .and_then(|bytes| serde_json::from_slice::<ClientMessage>(&bytes).ok());
        match message {
            Some(ClientMessage::Goodbye) | None => {
                let _ = tx.send(InternalEvent::Disconnected { player });
                break;
            }
            Some(message) => {
                if tx.send(InternalEvent::MessageFrom { player, message }).is_err() {
                    break;
                }
            }
        }
    }
}
