// Lockstep coordination for one session.
//
// A solo coordinator answers every exchange locally with the caller's own
// input. A networked coordinator owns a `PeerLink` (and, on the hosting
// peer, the relay's `HostHandle`) and, for every tick:
//
//   1. sends `Input { tick, buttons, respawn }` for the next lockstep tick,
//   2. waits, up to the sync timeout, for the authority's `Tick` with the
//      same number, tracking `PlayerJoined`/`PlayerLeft` on the way,
//   3. hands back every player's input for that tick.
//
// Lockstep tick numbers count across episodes; they are not engine ticks.
// Episode restarts are driven by the host seat (`NewEpisode`), and every peer
// waits for the authority's `EpisodeStart` before starting its engine.
//
// Every peer sees the authority's broadcasts in the same order, so a `Tick`
// belongs to the episode started by the last `EpisodeStart` before it. An
// `EpisodeStart` that arrives while waiting for a tick ends the exchange
// without a tick; the input already sent stays in flight and is consumed by
// the first exchange of the new episode.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use log::{info, warn};
use vizlink_engine::{PlayerInput, PlayerStatus};
use vizlink_protocol::{ClientMessage, PlayerInfo, ServerMessage};
use vizlink_relay::{HOST_SEAT, HostConfig, HostHandle, NetClient, WelcomeInfo, start_host};

use crate::error::{NetworkSyncError, VizError};
use crate::multiplayer::link::PeerLink;
use crate::multiplayer::topology::{NetArgs, Topology};

/// A participant of a multiplayer game.
#[derive(Clone, Debug, PartialEq)]
pub struct Player {
    pub number: u8,
    pub name: String,
    pub color: u8,
    pub frags: i32,
    pub deaths: i32,
    pub alive: bool,
}

impl Player {
    fn from_info(info: &PlayerInfo) -> Self {
        Self {
            number: info.number.0,
            name: info.name.clone(),
            color: info.color,
            frags: 0,
            deaths: 0,
            alive: true,
        }
    }
}

pub struct Coordinator {
    link: Option<Box<dyn PeerLink>>,
    host: Option<HostHandle>,
    me: u8,
    name: String,
    color: u8,
    roster: BTreeMap<u8, Player>,
    expected: u8,
    /// Next lockstep tick to submit.
    net_tick: u64,
    /// `net_tick` whose input was sent but whose `Tick` has not arrived.
    in_flight: Option<u64>,
    /// Seed of an `EpisodeStart` received before `restart` asked for it.
    pending_restart: Option<u64>,
    sync_timeout: Duration,
}

impl Coordinator {
    pub fn solo(name: &str, color: u8) -> Self {
        Self {
            link: None,
            host: None,
            me: HOST_SEAT.0,
            name: name.to_string(),
            color,
            roster: BTreeMap::new(),
            expected: 1,
            net_tick: 0,
            in_flight: None,
            pending_restart: None,
            sync_timeout: Duration::ZERO,
        }
    }

    /// Establish the topology described by `args`: host a relay and join it,
    /// or join a remote one. Solo topologies never touch the network.
    pub fn connect(
        args: &NetArgs,
        config_digest: u32,
        seed: u64,
        sync_timeout: Duration,
    ) -> Result<Self, VizError> {
        let (link, host, welcome): (Box<dyn PeerLink>, Option<HostHandle>, WelcomeInfo) =
            match &args.topology {
                Topology::Solo => return Ok(Self::solo(&args.name, args.color)),
                Topology::Host { players, port } => {
                    let (handle, addr) = start_host(HostConfig {
                        bind: "0.0.0.0".into(),
                        port: *port,
                        expected_players: *players,
                        config_digest,
                        seed,
                    })
                    .map_err(|e| NetworkSyncError::Host(e.to_string()))?;
                    let local = format!("127.0.0.1:{}", addr.port());
                    let (client, welcome) = NetClient::connect(
                        &local,
                        &args.name,
                        args.color,
                        config_digest,
                        sync_timeout,
                    )?;
                    (Box::new(client) as Box<dyn PeerLink>, Some(handle), welcome)
                }
                Topology::Join { addr } => {
                    let (client, welcome) = NetClient::connect(
                        addr,
                        &args.name,
                        args.color,
                        config_digest,
                        sync_timeout,
                    )?;
                    (Box::new(client) as Box<dyn PeerLink>, None, welcome)
                }
            };
        let mut coordinator = Self::with_link(link, host, &args.name, args.color, sync_timeout);
        coordinator.expected = welcome.expected_players;
        coordinator.roster = welcome
            .players
            .iter()
            .map(|info| (info.number.0, Player::from_info(info)))
            .collect();
        Ok(coordinator)
    }

    pub fn with_link(
        link: Box<dyn PeerLink>,
        host: Option<HostHandle>,
        name: &str,
        color: u8,
        sync_timeout: Duration,
    ) -> Self {
        let me = link.player_number().0;
        info!("joined multiplayer game as player {me}");
        Self {
            link: Some(link),
            host,
            me,
            name: name.to_string(),
            color,
            roster: BTreeMap::new(),
            expected: 1,
            net_tick: 0,
            in_flight: None,
            pending_restart: None,
            sync_timeout,
        }
    }

    pub fn is_networked(&self) -> bool {
        self.link.is_some()
    }

    pub fn is_host(&self) -> bool {
        self.me == HOST_SEAT.0
    }

    pub fn player_number(&self) -> u8 {
        self.me
    }

    /// Who takes part in an episode, by number. A solo session has only its
    /// own player.
    pub fn participants(&self) -> Vec<(u8, String, u8)> {
        if self.link.is_none() {
            return vec![(self.me, self.name.clone(), self.color)];
        }
        self.roster
            .values()
            .map(|p| (p.number, p.name.clone(), p.color))
            .collect()
    }

    pub fn players(&self) -> Vec<Player> {
        self.roster.values().cloned().collect()
    }

    /// Block until the lobby is full. Returns the game seed.
    pub fn wait_for_start(&mut self, lobby_timeout: Duration) -> Result<u64, VizError> {
        let Some(link) = self.link.as_mut() else {
            return Ok(0);
        };
        let deadline = Instant::now() + lobby_timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let msg = match link.recv_timeout(remaining) {
                Ok(msg) => msg,
                Err(None) => {
                    return Err(NetworkSyncError::LobbyTimeout {
                        joined: self.roster.len(),
                        expected: self.expected,
                        waited: lobby_timeout,
                    }
                    .into());
                }
                Err(Some(e)) => return Err(e.into()),
            };
            match msg {
                ServerMessage::Welcome {
                    players,
                    expected_players,
                    ..
                } => {
                    self.expected = expected_players;
                    for info in &players {
                        self.roster.insert(info.number.0, Player::from_info(info));
                    }
                }
                ServerMessage::PlayerJoined { player } => {
                    info!("player {} ({}) joined", player.number.0, player.name);
                    self.roster.insert(player.number.0, Player::from_info(&player));
                }
                ServerMessage::PlayerLeft { player_number } => {
                    self.roster.remove(&player_number.0);
                }
                ServerMessage::GameStart { seed, players } => {
                    self.roster = players
                        .iter()
                        .map(|info| (info.number.0, Player::from_info(info)))
                        .collect();
                    info!("game started with {} players", self.roster.len());
                    return Ok(seed);
                }
                ServerMessage::Rejected { reason } => {
                    return Err(NetworkSyncError::Rejected(reason).into());
                }
                ServerMessage::EpisodeStart { .. } | ServerMessage::Tick { .. } => {
                    warn!("ignoring {msg:?} before game start");
                }
            }
        }
    }

    /// Play one lockstep tick: submit our input and collect everyone's.
    /// `None` when the host restarted the episode instead; the tick then
    /// belongs to the next episode.
    pub fn exchange(
        &mut self,
        buttons: &[f64],
        respawn: bool,
    ) -> Result<Option<Vec<PlayerInput>>, VizError> {
        let Some(link) = self.link.as_mut() else {
            return Ok(Some(vec![PlayerInput {
                player: self.me,
                buttons: buttons.to_vec(),
                respawn,
            }]));
        };
        if self.pending_restart.is_some() {
            return Ok(None);
        }
        let tick = self.net_tick;
        if self.in_flight != Some(tick) {
            link.send(ClientMessage::Input {
                tick,
                buttons: buttons.to_vec(),
                respawn,
            })?;
            self.in_flight = Some(tick);
        }

        let deadline = Instant::now() + self.sync_timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let msg = match link.recv_timeout(remaining) {
                Ok(msg) => msg,
                Err(None) => {
                    return Err(NetworkSyncError::TickTimeout {
                        tick,
                        waited: self.sync_timeout,
                    }
                    .into());
                }
                Err(Some(e)) => return Err(e.into()),
            };
            match msg {
                ServerMessage::Tick { tick: t, inputs } if t == tick => {
                    self.net_tick += 1;
                    self.in_flight = None;
                    return Ok(Some(
                        inputs
                            .into_iter()
                            .map(|i| PlayerInput {
                                player: i.player.0,
                                buttons: i.buttons,
                                respawn: i.respawn,
                            })
                            .collect(),
                    ));
                }
                ServerMessage::EpisodeStart { episode, seed } => {
                    info!("host restarted the game at episode {episode} (seed {seed})");
                    self.pending_restart = Some(seed);
                    return Ok(None);
                }
                other => observe(&mut self.roster, tick, other),
            }
        }
    }

    /// Start the next episode. The host seat proposes `seed`; every peer
    /// waits for the authority's `EpisodeStart` and uses its seed.
    pub fn restart(&mut self, seed: u64) -> Result<u64, VizError> {
        let is_host = self.is_host();
        let Some(link) = self.link.as_mut() else {
            return Ok(seed);
        };
        if let Some(seed) = self.pending_restart.take() {
            return Ok(seed);
        }
        if is_host {
            link.send(ClientMessage::NewEpisode { seed })?;
        }
        let deadline = Instant::now() + self.sync_timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let msg = match link.recv_timeout(remaining) {
                Ok(msg) => msg,
                Err(None) => {
                    return Err(NetworkSyncError::EpisodeTimeout(self.sync_timeout).into());
                }
                Err(Some(e)) => return Err(e.into()),
            };
            match msg {
                ServerMessage::EpisodeStart { episode, seed } => {
                    info!("host started episode {episode} (seed {seed})");
                    return Ok(seed);
                }
                // Released before the restart: it belongs to the episode
                // being abandoned.
                ServerMessage::Tick { tick, .. } if self.in_flight == Some(tick) => {
                    warn!("dropping tick {tick} of the abandoned episode");
                    self.net_tick += 1;
                    self.in_flight = None;
                }
                other => observe(&mut self.roster, self.net_tick, other),
            }
        }
    }

    /// Fold the engine's scoreboard into the roster.
    pub fn refresh(&mut self, statuses: &[PlayerStatus]) {
        for status in statuses {
            if let Some(player) = self.roster.get_mut(&status.number) {
                player.frags = status.frags;
                player.deaths = status.deaths;
                player.alive = !status.dead;
            }
        }
    }

    /// Say goodbye and stop hosting. Safe to call more than once.
    pub fn leave(&mut self) {
        if let Some(mut link) = self.link.take() {
            let _ = link.send(ClientMessage::Goodbye);
            info!("left multiplayer game");
        }
        if let Some(host) = self.host.take() {
            host.stop();
        }
    }
}

/// Handle a message that arrived while waiting for something else.
fn observe(roster: &mut BTreeMap<u8, Player>, expected_tick: u64, msg: ServerMessage) {
    match msg {
        ServerMessage::PlayerJoined { player } => {
            roster.insert(player.number.0, Player::from_info(&player));
        }
        ServerMessage::PlayerLeft { player_number } => {
            warn!("player {} left the game", player_number.0);
            roster.remove(&player_number.0);
        }
        ServerMessage::Tick { tick, .. } => {
            warn!("ignoring out-of-order tick {tick} (expected {expected_tick})");
        }
        other => warn!("ignoring unexpected {other:?}"),
    }
}

impl Drop for Coordinator {
    fn drop(&mut self) {
        self.leave();
    }
}
