// Transport seam between the coordinator and the tick authority.
//
// The coordinator speaks the `vizlink_protocol` messages; a `PeerLink`
// carries them. `NetClient` carries them over TCP to a relay host, and
// `LoopbackLink` hands them directly to an in-process `HostSession`, so
// several sessions in one process can play together without sockets.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::debug;
use vizlink_protocol::{ClientMessage, PROTOCOL_VERSION, PlayerNumber, ServerMessage};
use vizlink_relay::{HostSession, NetClient, NetError};

use crate::error::NetworkSyncError;

pub trait PeerLink: Send {
    /// Seat assigned by the authority.
    fn player_number(&self) -> PlayerNumber;

    fn send(&mut self, msg: ClientMessage) -> Result<(), NetworkSyncError>;

    /// Next message from the authority. `Err(None)` on timeout.
    fn recv_timeout(&mut self, timeout: Duration)
    -> Result<ServerMessage, Option<NetworkSyncError>>;
}

impl PeerLink for NetClient {
    fn player_number(&self) -> PlayerNumber {
        NetClient::player_number(self)
    }

    fn send(&mut self, msg: ClientMessage) -> Result<(), NetworkSyncError> {
        match msg {
            ClientMessage::Input {
                tick,
                buttons,
                respawn,
            } => self.send_input(tick, &buttons, respawn)?,
            ClientMessage::NewEpisode { seed } => self.send_new_episode(seed)?,
            ClientMessage::Goodbye => self.disconnect(),
            ClientMessage::Hello { .. } => {}
        }
        Ok(())
    }

    fn recv_timeout(
        &mut self,
        timeout: Duration,
    ) -> Result<ServerMessage, Option<NetworkSyncError>> {
        match NetClient::recv_timeout(self, timeout) {
            Ok(msg) => Ok(msg),
            Err(NetError::Timeout(_)) => Err(None),
            Err(e) => Err(Some(e.into())),
        }
    }
}

// ---------------------------------------------------------------------------
// In-process authority
// ---------------------------------------------------------------------------

/// An in-process tick authority. Each `join` seats one more peer.
#[derive(Clone)]
pub struct LoopbackHub {
    session: Arc<Mutex<HostSession>>,
}

impl LoopbackHub {
    pub fn new(expected_players: u8, config_digest: u32, seed: u64) -> Self {
        Self {
            session: Arc::new(Mutex::new(HostSession::new(
                expected_players,
                config_digest,
                seed,
            ))),
        }
    }

    pub fn join(
        &self,
        player_name: &str,
        color: u8,
        config_digest: u32,
    ) -> Result<LoopbackLink, NetworkSyncError> {
        let (tx, rx) = mpsc::channel();
        let number = self
            .lock()?
            .add_player(
                PROTOCOL_VERSION,
                player_name.to_string(),
                color,
                config_digest,
                Box::new(tx),
            )
            .map_err(NetworkSyncError::Rejected)?;
        debug!("loopback peer {} seated", number.0);
        Ok(LoopbackLink {
            number,
            hub: self.clone(),
            inbox: rx,
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HostSession>, NetworkSyncError> {
        self.session.lock().map_err(|_| NetworkSyncError::HostLost)
    }
}

pub struct LoopbackLink {
    number: PlayerNumber,
    hub: LoopbackHub,
    inbox: Receiver<ServerMessage>,
}

impl PeerLink for LoopbackLink {
    fn player_number(&self) -> PlayerNumber {
        self.number
    }

    fn send(&mut self, msg: ClientMessage) -> Result<(), NetworkSyncError> {
        let mut session = self.hub.lock()?;
        match msg {
            ClientMessage::Input {
                tick,
                buttons,
                respawn,
            } => session.submit_input(self.number, tick, buttons, respawn),
            ClientMessage::NewEpisode { seed } => session.new_episode(self.number, seed),
            ClientMessage::Goodbye => session.remove_player(self.number),
            ClientMessage::Hello { .. } => {}
        }
        Ok(())
    }

    fn recv_timeout(
        &mut self,
        timeout: Duration,
    ) -> Result<ServerMessage, Option<NetworkSyncError>> {
        match self.inbox.recv_timeout(timeout) {
            Ok(msg) => Ok(msg),
            Err(RecvTimeoutError::Timeout) => Err(None),
            Err(RecvTimeoutError::Disconnected) => Err(Some(NetworkSyncError::HostLost)),
        }
    }
}

impl Drop for LoopbackLink {
    fn drop(&mut self) {
        if let Ok(mut session) = self.hub.session.lock() {
            session.remove_player(self.number);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loopback_releases_tick_for_both_peers() {
        let hub = LoopbackHub::new(2, 1, 5);
        let mut a = hub.join("A", 0, 1).unwrap();
        let mut b = hub.join("B", 1, 1).unwrap();
        assert_eq!(a.player_number(), PlayerNumber(1));
        assert_eq!(b.player_number(), PlayerNumber(2));

        for link in [&mut a, &mut b] {
            link.send(ClientMessage::Input {
                tick: 0,
                buttons: vec![1.0],
                respawn: false,
            })
            .unwrap();
        }
        for link in [&mut a, &mut b] {
            let tick = loop {
                match link.recv_timeout(Duration::from_secs(1)).unwrap() {
                    ServerMessage::Tick { tick, inputs } => break (tick, inputs.len()),
                    _ => continue,
                }
            };
            assert_eq!(tick, (0, 2));
        }
    }

    #[test]
    fn loopback_rejects_wrong_digest() {
        let hub = LoopbackHub::new(2, 1, 5);
        let err = hub.join("A", 0, 2).err().unwrap();
        assert!(matches!(err, NetworkSyncError::Rejected(_)));
    }

    #[test]
    fn empty_inbox_times_out() {
        let hub = LoopbackHub::new(2, 1, 5);
        let mut a = hub.join("A", 0, 1).unwrap();
        let _welcome = a.recv_timeout(Duration::from_millis(10)).unwrap();
        assert!(matches!(a.recv_timeout(Duration::from_millis(10)), Err(None)));
    }
}
