// Several sessions in one process playing one game through a `LoopbackHub`.

use std::path::PathBuf;
use std::thread;

use std::time::Duration;

use vizlink::{
    ArenaEngine, Button, Engine, FinishReason, GameConfig, GameVariable, Lifecycle, LoopbackHub,
    NetworkSyncError, Session, SessionStateError, VizError,
};

const SEED: u64 = 4242;
const TIMEOUT: u64 = 60;

fn deathmatch_config() -> GameConfig {
    let mut config = GameConfig::default();
    config.set_scenario_name("deathmatch");
    config.set_available_buttons(&[Button::TurnLeft, Button::MoveForward, Button::Attack]);
    config.set_available_game_variables(&[
        GameVariable::PlayerNumber,
        GameVariable::PlayerCount,
        GameVariable::Health,
        GameVariable::PositionX,
        GameVariable::PositionY,
        GameVariable::FragCount,
    ]);
    config.set_episode_timeout(TIMEOUT);
    config.set_sync_timeout_ms(5000);
    config
}

type Trace = Vec<(u64, Vec<f64>)>;

struct Outcome {
    number: u8,
    trace: Trace,
    total: f64,
    roster: Vec<u8>,
}

/// Join the hub, play one recorded-or-not episode, and report what was seen.
fn play(hub: LoopbackHub, name: &str, color: u8, record_to: Option<PathBuf>) -> Outcome {
    let link = hub.join(name, color, 0).unwrap();
    let mut config = deathmatch_config();
    config.add_game_args("-deathmatch");
    let mut session = Session::new(ArenaEngine::new(), config);
    session.set_peer_link(Box::new(link)).unwrap();
    session.init().unwrap();
    let number = session.player_number();

    session.new_episode(record_to.as_deref()).unwrap();

    // Respawning a live player does nothing and plays no tick.
    assert!(!session.is_player_dead().unwrap());
    session.respawn_player().unwrap();
    assert_eq!(session.get_episode_time(), 0);

    let mut trace = Trace::new();
    let mut i = 0u64;
    while let Some(state) = session.get_state() {
        trace.push((state.tick, state.game_variables.clone()));
        if session.is_player_dead().unwrap() {
            session.respawn_player().unwrap();
        } else {
            let turning = if (i + u64::from(number)) % 5 == 0 { 1.0 } else { 0.0 };
            session.make_action(&[turning, 1.0, (i % 2) as f64], 1).unwrap();
        }
        i += 1;
    }

    assert!(matches!(
        session.replay_episode("any.lmp", None),
        Err(VizError::SessionState(SessionStateError::Multiplayer(_)))
    ));
    let roster = session.players().iter().map(|p| p.number).collect();
    Outcome {
        number,
        trace,
        total: session.get_total_reward(),
        roster,
    }
}

#[test]
fn two_peers_play_the_same_ticks_and_replay_offline() {
    let _ = env_logger::builder().is_test(true).try_init();
    let dir = tempfile::tempdir().unwrap();
    let demo = dir.path().join("dm.lmp");

    let hub = LoopbackHub::new(2, 0, SEED);
    let host = {
        let hub = hub.clone();
        let demo = demo.clone();
        thread::spawn(move || play(hub, "Host", 0, Some(demo)))
    };
    // Seat 1 goes to whoever joins first; give the host thread the head start.
    thread::sleep(Duration::from_millis(50));
    let guest = thread::spawn(move || play(hub, "Guest", 3, None));
    let host = host.join().unwrap();
    let guest = guest.join().unwrap();

    assert_eq!(host.number, 1);
    assert_eq!(guest.number, 2);
    assert_eq!(host.roster, vec![1, 2]);
    assert_eq!(guest.roster, vec![1, 2]);
    assert_eq!(host.trace.len() as u64, TIMEOUT);
    assert_eq!(guest.trace.len() as u64, TIMEOUT);
    for ((host_tick, host_vars), (guest_tick, guest_vars)) in host.trace.iter().zip(&guest.trace) {
        assert_eq!(host_tick, guest_tick);
        assert_eq!(host_vars[0], 1.0);
        assert_eq!(guest_vars[0], 2.0);
        assert_eq!(host_vars[1], 2.0);
        assert_eq!(guest_vars[1], 2.0);
    }

    // The host's demo holds both players' inputs: it replays the guest's
    // view in a solo session.
    let mut viewer = Session::new(ArenaEngine::new(), deathmatch_config());
    viewer.init().unwrap();
    viewer.replay_episode(&demo, Some(2)).unwrap();
    assert_eq!(viewer.player_number(), 2);
    let mut replayed = Trace::new();
    while let Some(state) = viewer.get_state() {
        replayed.push((state.tick, state.game_variables.clone()));
        viewer.advance_action(1).unwrap();
    }
    assert_eq!(replayed, guest.trace);
    assert_eq!(viewer.get_total_reward(), guest.total);
}

fn joined(hub: &LoopbackHub, name: &str, color: u8) -> Session<ArenaEngine> {
    let link = hub.join(name, color, 0).unwrap();
    let mut session = Session::new(ArenaEngine::new(), deathmatch_config());
    session.set_peer_link(Box::new(link)).unwrap();
    session.init().unwrap();
    session
}

/// Engine tick plus both players' positions, as the local engine sees them.
fn world_view(session: &Session<ArenaEngine>) -> (u64, Vec<f64>) {
    let engine = session.engine();
    let mut vars = Vec::new();
    for player in 1..=2 {
        for var in [GameVariable::PositionX, GameVariable::PositionY, GameVariable::Angle] {
            vars.push(engine.game_variable(player, var).unwrap());
        }
    }
    (session.get_episode_time(), vars)
}

#[test]
fn host_restart_mid_episode_moves_every_peer() {
    let _ = env_logger::builder().is_test(true).try_init();
    let hub = LoopbackHub::new(2, 0, SEED);
    let host = {
        let hub = hub.clone();
        thread::spawn(move || {
            let mut session = joined(&hub, "Host", 0);
            session.make_action(&[0.0, 1.0, 0.0], 1).unwrap();
            session.new_episode(None).unwrap();
            assert_eq!(session.episode_index(), 1);
            session.make_action(&[1.0, 1.0, 0.0], 1).unwrap();
            world_view(&session)
        })
    };
    thread::sleep(Duration::from_millis(50));
    let mut guest = joined(&hub, "Guest", 3);
    guest.make_action(&[0.0, 1.0, 0.0], 1).unwrap();

    // The host restarts while this input waits for its tick.
    assert_eq!(guest.make_action(&[0.0, 0.0, 1.0], 1).unwrap(), 0.0);
    assert!(guest.is_episode_finished());
    assert_eq!(guest.finish_reason(), Some(FinishReason::HostRestarted));
    assert!(guest.get_state().is_none());

    guest.new_episode(None).unwrap();
    assert_eq!(guest.episode_index(), 1);
    guest.make_action(&[1.0, 0.0, 0.0], 1).unwrap();
    // The tick carries the input already sent before the restart.
    assert_eq!(guest.get_last_action(), &[0.0, 0.0, 1.0]);

    let host_view = host.join().unwrap();
    assert_eq!(world_view(&guest), host_view);
    assert_eq!(host_view.0, 1);
}

#[test]
fn silent_peer_times_out_the_tick() {
    let hub = LoopbackHub::new(2, 0, SEED);
    let link = hub.join("A", 0, 0).unwrap();
    let _silent = hub.join("B", 1, 0).unwrap();

    let mut config = deathmatch_config();
    config.set_sync_timeout_ms(100);
    let mut session = Session::new(ArenaEngine::new(), config);
    session.set_peer_link(Box::new(link)).unwrap();
    session.init().unwrap();

    let err = session.make_action(&[0.0, 0.0, 0.0], 1).unwrap_err();
    assert!(matches!(
        err,
        VizError::NetworkSync(NetworkSyncError::TickTimeout { tick: 0, .. })
    ));
    assert_eq!(session.lifecycle(), Lifecycle::Running);
}

#[test]
fn incomplete_lobby_times_out_init() {
    let hub = LoopbackHub::new(3, 0, SEED);
    let link = hub.join("A", 0, 0).unwrap();

    let mut config = deathmatch_config();
    config.lobby_timeout_ms = 100;
    let mut session = Session::new(ArenaEngine::new(), config);
    session.set_peer_link(Box::new(link)).unwrap();
    let err = session.init().unwrap_err();
    assert!(matches!(
        err,
        VizError::NetworkSync(NetworkSyncError::LobbyTimeout { expected: 3, .. })
    ));
    assert_eq!(session.lifecycle(), Lifecycle::Created);
}

#[test]
fn peer_link_only_before_init() {
    let hub = LoopbackHub::new(1, 0, SEED);
    let mut session = Session::new(ArenaEngine::new(), deathmatch_config());
    session.init().unwrap();
    let link = hub.join("late", 0, 0).unwrap();
    assert!(matches!(
        session.set_peer_link(Box::new(link)),
        Err(VizError::SessionState(SessionStateError::LinkAfterInit))
    ));
}
