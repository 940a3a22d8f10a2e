// Integration smoke test for the tick authority.
//
// Starts a host on localhost, joins it with `NetClient`s and drives the
// lobby, lockstep ticks, an episode restart and a departure. No engine is
// involved; inputs are plain button vectors.

use std::time::Duration;

use vizlink_protocol::message::ServerMessage;
use vizlink_protocol::types::PlayerNumber;
use vizlink_relay::{HostConfig, NetClient, NetError, start_host};

const WAIT: Duration = Duration::from_secs(5);

fn host(expected_players: u8) -> (vizlink_relay::HostHandle, String) {
    let (handle, addr) = start_host(HostConfig {
        bind: "127.0.0.1".into(),
        port: 0,
        expected_players,
        config_digest: 0xBEEF,
        seed: 42,
    })
    .unwrap();
    (handle, format!("127.0.0.1:{}", addr.port()))
}

fn join(addr: &str, name: &str) -> NetClient {
    let (client, _) = NetClient::connect(addr, name, 0, 0xBEEF, WAIT).unwrap();
    client
}

/// Skip lobby chatter until a message matching `pred` arrives.
fn wait_for(client: &NetClient, pred: impl Fn(&ServerMessage) -> bool) -> ServerMessage {
    loop {
        let msg = client.recv_timeout(WAIT).unwrap();
        if pred(&msg) {
            return msg;
        }
    }
}

#[test]
fn two_players_advance_in_lockstep() {
    let (handle, addr) = host(2);
    let mut alice = join(&addr, "Alice");
    assert_eq!(alice.player_number(), PlayerNumber(1));
    let mut bob = join(&addr, "Bob");
    assert_eq!(bob.player_number(), PlayerNumber(2));

    for client in [&alice, &bob] {
        let start = wait_for(client, |m| matches!(m, ServerMessage::GameStart { .. }));
        assert!(matches!(start, ServerMessage::GameStart { seed: 42, .. }));
    }

    alice.send_input(0, &[1.0, 0.0], false).unwrap();
    // Nothing is released until Bob commits as well.
    assert!(matches!(
        alice.recv_timeout(Duration::from_millis(200)),
        Err(NetError::Timeout(_))
    ));
    bob.send_input(0, &[0.0, 1.0], true).unwrap();

    for client in [&alice, &bob] {
        match client.recv_timeout(WAIT).unwrap() {
            ServerMessage::Tick { tick, inputs } => {
                assert_eq!(tick, 0);
                assert_eq!(inputs.len(), 2);
                assert_eq!(inputs[0].buttons, vec![1.0, 0.0]);
                assert!(inputs[1].respawn);
            }
            other => panic!("expected Tick, got {other:?}"),
        }
    }

    alice.send_new_episode(7).unwrap();
    let restart = wait_for(&bob, |m| matches!(m, ServerMessage::EpisodeStart { .. }));
    assert!(matches!(
        restart,
        ServerMessage::EpisodeStart { episode: 1, seed: 7 }
    ));

    bob.disconnect();
    let left = wait_for(&alice, |m| matches!(m, ServerMessage::PlayerLeft { .. }));
    assert!(matches!(
        left,
        ServerMessage::PlayerLeft {
            player_number: PlayerNumber(2)
        }
    ));

    // Alone now, Alice's inputs release ticks immediately.
    alice.send_input(1, &[0.0, 0.0], false).unwrap();
    let tick = wait_for(&alice, |m| matches!(m, ServerMessage::Tick { .. }));
    assert!(matches!(tick, ServerMessage::Tick { tick: 1, .. }));

    handle.stop();
}

#[test]
fn mismatched_fingerprint_is_rejected() {
    let (handle, addr) = host(2);
    let err = NetClient::connect(&addr, "Mallory", 0, 0xDEAD, WAIT)
        .err()
        .unwrap();
    match err {
        NetError::Rejected(reason) => assert!(reason.contains("fingerprint")),
        other => panic!("expected Rejected, got {other:?}"),
    }
    handle.stop();
}

#[test]
fn stopping_host_is_observed_as_host_lost() {
    let (handle, addr) = host(1);
    let client = join(&addr, "Solo");
    let _ = wait_for(&client, |m| matches!(m, ServerMessage::GameStart { .. }));
    handle.stop();

    let mut lost = false;
    for _ in 0..10 {
        match client.recv_timeout(Duration::from_millis(500)) {
            Err(NetError::HostLost) => {
                lost = true;
                break;
            }
            Ok(_) | Err(NetError::Timeout(_)) => {}
            Err(other) => panic!("unexpected error {other:?}"),
        }
    }
    assert!(lost);
}
