// Test-only harness for multiplayer integration tests.
//
// Each peer is a real `Session<ArenaEngine>` configured with the same
// launch arguments a user would pass (`-host N -port P`, `-join addr`), so
// the full path is exercised: session → coordinator → `NetClient` → relay
// host → lockstep `Tick` → engine. Sessions block on every tick until all
// peers have submitted, so each peer runs on its own thread.
//
// The only test-specific code is the retrying `init` (a joiner may start
// before the host is listening) and the scripted per-player actions.
//
// See also: `tests/full_pipeline.rs` for the scenarios.

use std::net::TcpListener;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::debug;
use vizlink::{
    ArenaEngine, Button, GameConfig, GameVariable, NetworkSyncError, Player, Session, VizError,
};

/// How long a joiner keeps retrying while the host is not listening yet.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Pause between connection attempts.
const CONNECT_INTERVAL: Duration = Duration::from_millis(20);

/// Tick numbers and game variables of every observed state.
pub type Trace = Vec<(u64, Vec<f64>)>;

/// What one peer saw of one game.
#[derive(Debug)]
pub struct PeerReport {
    pub number: u8,
    /// One trace per episode played.
    pub episodes: Vec<Trace>,
    pub total_rewards: Vec<f64>,
    pub players: Vec<Player>,
}

/// A port nobody listens on right now.
pub fn free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind ephemeral port");
    listener.local_addr().expect("local addr").port()
}

/// Deathmatch config shared by every peer of a test game.
pub fn base_config(timeout: u64) -> GameConfig {
    let mut config = GameConfig::default();
    config.set_scenario_name("deathmatch");
    config.set_available_buttons(&[Button::TurnLeft, Button::MoveForward, Button::Attack]);
    config.set_available_game_variables(&[
        GameVariable::PlayerNumber,
        GameVariable::PlayerCount,
        GameVariable::PositionX,
        GameVariable::PositionY,
        GameVariable::Health,
    ]);
    config.set_episode_timeout(timeout);
    config.set_sync_timeout_ms(3000);
    config.lobby_timeout_ms = 10_000;
    config.add_game_args("-deathmatch");
    config
}

pub fn host_config(port: u16, players: u8, timeout: u64) -> GameConfig {
    let mut config = base_config(timeout);
    config.add_game_args(format!("-host {players} -port {port} +name Host +colorset 0"));
    config
}

pub fn join_config(port: u16, name: &str, timeout: u64) -> GameConfig {
    let mut config = base_config(timeout);
    config.add_game_args(format!("-join 127.0.0.1:{port} +name {name} +colorset 3"));
    config
}

/// `init`, retrying while the host is not accepting connections yet.
pub fn init_with_retry(session: &mut Session<ArenaEngine>) -> Result<(), VizError> {
    let start = Instant::now();
    loop {
        match session.init() {
            Err(VizError::NetworkSync(NetworkSyncError::Connect { .. }))
                if start.elapsed() < CONNECT_TIMEOUT =>
            {
                debug!("host not up yet, retrying");
                thread::sleep(CONNECT_INTERVAL);
            }
            other => return other,
        }
    }
}

/// Scripted input: walk forward, turn now and then, fire every other tick.
pub fn scripted_action(player: u8, step: u64) -> [f64; 3] {
    let turn = if (step + u64::from(player)) % 6 == 0 { 1.0 } else { 0.0 };
    [turn, 1.0, (step % 2) as f64]
}

/// Play `episodes` episodes on the current thread. Dead players respawn.
pub fn play(config: GameConfig, episodes: usize) -> Result<PeerReport, VizError> {
    let mut session = Session::new(ArenaEngine::new(), config);
    init_with_retry(&mut session)?;
    let number = session.player_number();

    let mut traces = Vec::new();
    let mut totals = Vec::new();
    for episode in 0..episodes {
        if episode > 0 {
            session.new_episode(None)?;
        }
        let mut trace = Trace::new();
        let mut step = 0;
        while let Some(state) = session.get_state() {
            trace.push((state.tick, state.game_variables.clone()));
            if session.is_player_dead()? {
                session.respawn_player()?;
            } else {
                session.make_action(&scripted_action(number, step), 1)?;
            }
            step += 1;
        }
        traces.push(trace);
        totals.push(session.get_total_reward());
    }

    let players = session.players();
    session.close();
    Ok(PeerReport {
        number,
        episodes: traces,
        total_rewards: totals,
        players,
    })
}

/// Run `play` on its own thread.
pub fn spawn_peer(config: GameConfig, episodes: usize) -> JoinHandle<Result<PeerReport, VizError>> {
    thread::spawn(move || play(config, episodes))
}
