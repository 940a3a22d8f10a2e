// End-to-end multiplayer tests over real TCP.
//
// Each test hosts a relay from a session launched with `-host`, joins it
// from other sessions launched with `-join`, and checks what every peer
// observed. All networking uses the same code paths as the example
// programs; see `src/lib.rs` for the harness.

use std::thread;
use std::time::Duration;

use multiplayer_tests::{
    PeerReport, free_port, host_config, init_with_retry, join_config, scripted_action, spawn_peer,
};
use vizlink::{
    ArenaEngine, Button, GameVariable, NetworkSyncError, Session, SessionStateError, VizError,
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn run_pair(timeout: u64, episodes: usize) -> (PeerReport, PeerReport) {
    init_logging();
    let port = free_port();
    let host = spawn_peer(host_config(port, 2, timeout), episodes);
    let joiner = spawn_peer(join_config(port, "Joiner", timeout), episodes);
    let host = host.join().unwrap().unwrap();
    let joiner = joiner.join().unwrap().unwrap();
    (host, joiner)
}

// ---------------------------------------------------------------------------
// Test scenarios
// ---------------------------------------------------------------------------

/// Host and joiner play one episode; both see the same ticks and each other.
#[test]
fn two_peers_stay_in_lockstep() {
    let (host, joiner) = run_pair(40, 1);

    assert_eq!(host.number, 1);
    assert_eq!(joiner.number, 2);
    let (host_trace, joiner_trace) = (&host.episodes[0], &joiner.episodes[0]);
    assert_eq!(host_trace.len(), 40);
    assert_eq!(joiner_trace.len(), 40);
    for ((host_tick, host_vars), (joiner_tick, joiner_vars)) in host_trace.iter().zip(joiner_trace)
    {
        assert_eq!(host_tick, joiner_tick);
        assert_eq!(host_vars[0], 1.0, "PLAYER_NUMBER");
        assert_eq!(joiner_vars[0], 2.0, "PLAYER_NUMBER");
        assert_eq!(host_vars[1], 2.0, "PLAYER_COUNT");
        assert_eq!(joiner_vars[1], 2.0, "PLAYER_COUNT");
    }

    let names: Vec<&str> = host.players.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["Host", "Joiner"]);
    assert_eq!(joiner.players.len(), 2);
    assert_eq!(joiner.players[1].color, 3);
    for (a, b) in host.players.iter().zip(&joiner.players) {
        assert_eq!((a.number, a.frags, a.deaths), (b.number, b.frags, b.deaths));
    }
}

/// The host restarts the episode; the joiner follows with the host's seed.
#[test]
fn host_drives_episode_restarts() {
    let (host, joiner) = run_pair(25, 3);

    assert_eq!(host.episodes.len(), 3);
    assert_eq!(joiner.episodes.len(), 3);
    for (h, j) in host.episodes.iter().zip(&joiner.episodes) {
        let host_ticks: Vec<u64> = h.iter().map(|(t, _)| *t).collect();
        let joiner_ticks: Vec<u64> = j.iter().map(|(t, _)| *t).collect();
        assert_eq!(host_ticks, (1..=25).collect::<Vec<_>>());
        assert_eq!(host_ticks, joiner_ticks);
    }
}

/// A joiner whose buttons differ from the host's is turned away.
#[test]
fn mismatched_config_is_rejected() {
    init_logging();
    let port = free_port();
    let mut config = host_config(port, 2, 30);
    config.lobby_timeout_ms = 1500;
    let mut host = Session::new(ArenaEngine::new(), config);

    let joiner = thread::spawn(move || {
        let mut config = join_config(port, "Odd", 30);
        config.add_available_button(Button::TurnRight);
        let mut session = Session::new(ArenaEngine::new(), config);
        init_with_retry(&mut session)
    });

    // The host waits for a lobby that never fills.
    let err = host.init().unwrap_err();
    assert!(
        matches!(
            err,
            VizError::NetworkSync(NetworkSyncError::LobbyTimeout {
                joined: 1,
                expected: 2,
                ..
            })
        ),
        "{err:?}"
    );
    let joined = joiner.join().unwrap();
    assert!(
        matches!(
            joined,
            Err(VizError::NetworkSync(NetworkSyncError::Rejected(_)))
        ),
        "{joined:?}"
    );
}

/// A third player cannot take a seat once the game has started.
#[test]
fn late_joiner_is_rejected() {
    init_logging();
    let port = free_port();
    let host = spawn_peer(host_config(port, 2, 200), 1);
    let mut first = Session::new(ArenaEngine::new(), join_config(port, "First", 200));
    init_with_retry(&mut first).unwrap();

    let mut late = Session::new(ArenaEngine::new(), join_config(port, "Late", 200));
    let err = late.init().unwrap_err();
    assert!(matches!(
        err,
        VizError::NetworkSync(NetworkSyncError::Rejected(_))
    ));

    let mut step = 0;
    while !first.is_episode_finished() {
        if first.is_player_dead().unwrap() {
            first.respawn_player().unwrap();
        } else {
            first.make_action(&scripted_action(2, step), 1).unwrap();
        }
        step += 1;
    }
    first.close();
    host.join().unwrap().unwrap();
}

/// Losing the host surfaces as a network error on the next tick.
#[test]
fn host_loss_is_a_network_sync_error() {
    init_logging();
    let port = free_port();
    let host = thread::spawn(move || {
        let mut session = Session::new(ArenaEngine::new(), host_config(port, 2, 500));
        init_with_retry(&mut session).unwrap();
        for step in 0..5 {
            session.make_action(&scripted_action(1, step), 1).unwrap();
        }
        session.close();
    });

    let mut joiner = Session::new(ArenaEngine::new(), join_config(port, "Joiner", 500));
    init_with_retry(&mut joiner).unwrap();
    for step in 0..5 {
        joiner.make_action(&scripted_action(2, step), 1).unwrap();
    }
    host.join().unwrap();
    thread::sleep(Duration::from_millis(50));

    let err = joiner.make_action(&scripted_action(2, 5), 1).unwrap_err();
    assert!(matches!(err, VizError::NetworkSync(_)), "{err:?}");
    assert!(joiner.is_running());
    assert_eq!(
        joiner.get_game_variable(GameVariable::PlayerNumber).unwrap(),
        2.0
    );
    assert!(matches!(
        joiner.replay_episode("unused.lmp", None),
        Err(VizError::SessionState(SessionStateError::Multiplayer(_)))
    ));
}
