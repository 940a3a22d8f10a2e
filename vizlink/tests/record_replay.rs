// Recording episodes to demo files and replaying them.

use std::path::Path;

use vizlink::{
    ArenaEngine, Button, ConfigError, Demo, FinishReason, GameConfig, GameVariable, Mode,
    ReplayMismatchError, ScreenFormat, ScreenResolution, Session, SessionStateError, VizError,
};

const ACTIONS: [[f64; 3]; 3] = [[1.0, 0.0, 1.0], [0.0, 1.0, 1.0], [0.0, 0.0, 1.0]];

fn config() -> GameConfig {
    let mut config = GameConfig::default();
    config.set_available_buttons(&[Button::MoveLeft, Button::MoveRight, Button::Attack]);
    config.set_available_game_variables(&[
        GameVariable::Ammo2,
        GameVariable::PositionX,
        GameVariable::PositionY,
        GameVariable::KillCount,
    ]);
    config.set_episode_timeout(100);
    config.set_living_reward(-1.0);
    config.set_seed(77);
    config
}

fn started(config: GameConfig) -> Session<ArenaEngine> {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut session = Session::new(ArenaEngine::new(), config);
    session.init().unwrap();
    session
}

/// Tick numbers and game variables of every state, until the episode ends.
type Trace = Vec<(u64, Vec<f64>)>;

fn record(session: &mut Session<ArenaEngine>, path: &Path) -> Trace {
    session.new_episode(Some(path)).unwrap();
    let mut trace = Trace::new();
    let mut i = 0;
    while let Some(state) = session.get_state() {
        trace.push((state.tick, state.game_variables.clone()));
        session.make_action(&ACTIONS[i % ACTIONS.len()], 1).unwrap();
        i += 1;
    }
    trace
}

fn replay(session: &mut Session<ArenaEngine>, path: &Path) -> Trace {
    session.replay_episode(path, None).unwrap();
    let mut trace = Trace::new();
    while let Some(state) = session.get_state() {
        trace.push((state.tick, state.game_variables.clone()));
        session.advance_action(1).unwrap();
        assert!(session.get_last_action().is_empty());
    }
    trace
}

#[test]
fn replay_reproduces_recorded_ticks() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("demos/basic.lmp");

    let mut recorder = started(config());
    let recorded = record(&mut recorder, &path);
    assert_eq!(recorded.len(), 100);
    assert_eq!(recorder.finish_reason(), Some(FinishReason::Timeout));
    let recorded_total = recorder.get_total_reward();

    let mut viewer_config = config();
    viewer_config.set_mode(Mode::Spectator);
    viewer_config.set_screen_resolution(ScreenResolution::Res320X240);
    viewer_config.set_screen_format(ScreenFormat::Gray8);
    viewer_config.set_depth_buffer_enabled(true);
    viewer_config.set_render_hud(true);
    viewer_config.set_seed(5);
    let mut viewer = started(viewer_config);
    let replayed = replay(&mut viewer, &path);

    assert_eq!(replayed, recorded);
    assert_eq!(viewer.get_total_reward(), recorded_total);
    assert_eq!(viewer.finish_reason(), Some(FinishReason::Timeout));
}

#[test]
fn demo_file_holds_every_tick_and_the_total() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("run.lmp");
    let mut session = started(config());
    record(&mut session, &path);

    let demo = Demo::load(&path).unwrap();
    assert_eq!(demo.header.seed, 77 + 1, "second episode of the session");
    assert_eq!(demo.header.episode_timeout, 100);
    assert_eq!(demo.ticks.len(), 100);
    assert_eq!(demo.end.ticks, 100);
    assert_eq!(demo.end.total_reward, session.get_total_reward());
    let actions = demo.actions_of(1);
    assert_eq!(actions[0], ACTIONS[0].to_vec());
    assert_eq!(actions[4], ACTIONS[1].to_vec());
}

#[test]
fn three_recorded_actions_come_back_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("three.lmp");
    let steps = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];
    let mut short = config();
    short.set_episode_timeout(3);
    let mut session = started(short);
    session.new_episode(Some(path.as_path())).unwrap();
    for step in &steps {
        session.make_action(step, 1).unwrap();
    }
    assert!(session.is_episode_finished());

    let demo = Demo::load(&path).unwrap();
    let expected: Vec<Vec<f64>> = steps.iter().map(|s| s.to_vec()).collect();
    assert_eq!(demo.actions_of(1), expected);
    assert_eq!(
        demo.ticks.iter().map(|t| t.tick).collect::<Vec<_>>(),
        vec![1, 2, 3]
    );
}

#[test]
fn new_episode_finalizes_a_partial_recording() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("partial.lmp");
    let mut session = started(config());
    session.new_episode(Some(path.as_path())).unwrap();
    session.make_action(&ACTIONS[0], 7).unwrap();
    session.new_episode(None).unwrap();

    let demo = Demo::load(&path).unwrap();
    assert_eq!(demo.ticks.len(), 7);
    assert_eq!(demo.end.total_reward, -7.0);

    // The replay runs out of inputs before the episode would have ended.
    session.replay_episode(&path, None).unwrap();
    session.advance_action(20).unwrap();
    assert_eq!(session.finish_reason(), Some(FinishReason::ReplayExhausted));
    assert_eq!(session.get_episode_time(), 7);
    assert_eq!(session.get_total_reward(), -7.0);
}

#[test]
fn close_finalizes_the_recording() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("closed.lmp");
    let mut session = started(config());
    session.new_episode(Some(path.as_path())).unwrap();
    session.make_action(&ACTIONS[2], 3).unwrap();
    session.close();

    let demo = Demo::load(&path).unwrap();
    assert_eq!(demo.ticks.len(), 3);
}

#[test]
fn start_time_is_replayed_from_the_header() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("late.lmp");
    let mut recording_config = config();
    recording_config.set_episode_start_time(10);
    let mut session = started(recording_config);
    let recorded = record(&mut session, &path);
    assert_eq!(recorded[0].0, 11);

    let mut viewer = started(config());
    assert_eq!(replay(&mut viewer, &path), recorded);
}

#[test]
fn make_action_during_replay_is_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ignored.lmp");
    let mut session = started(config());
    let recorded = record(&mut session, &path);

    session.replay_episode(&path, None).unwrap();
    assert!(session.is_replaying());
    session.set_action(&[1.0, 1.0, 0.0]).unwrap();
    session.make_action(&[0.0, 1.0, 0.0], 5).unwrap();
    let state = session.get_state().unwrap();
    assert_eq!((state.tick, state.game_variables.clone()), recorded[5]);
}

#[test]
fn replay_with_other_buttons_is_refused() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("buttons.lmp");
    let mut session = started(config());
    record(&mut session, &path);

    let mut other = config();
    other.add_available_button(Button::TurnLeft);
    let mut viewer = started(other);
    let err = viewer.replay_episode(&path, None).unwrap_err();
    assert!(matches!(
        err,
        VizError::ReplayMismatch(ReplayMismatchError::Buttons { .. })
    ));
    // The refused replay leaves the running episode alone.
    assert!(!viewer.is_replaying());
    assert!(viewer.get_state().is_some());
}

#[test]
fn replay_of_unknown_player_is_refused() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("player.lmp");
    let mut session = started(config());
    record(&mut session, &path);
    let err = session.replay_episode(&path, Some(4)).unwrap_err();
    assert!(matches!(
        err,
        VizError::ReplayMismatch(ReplayMismatchError::Player(4))
    ));
}

#[test]
fn broken_demo_files_are_config_errors() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cut.lmp");
    let mut session = started(config());
    record(&mut session, &path);

    let bytes = std::fs::read(&path).unwrap();
    std::fs::write(&path, &bytes[..bytes.len() / 2]).unwrap();
    assert!(matches!(
        session.replay_episode(&path, None),
        Err(VizError::Config(_))
    ));
    assert!(matches!(
        session.replay_episode(dir.path().join("missing.lmp"), None),
        Err(VizError::Config(ConfigError::DemoIo { .. }))
    ));
}

#[test]
fn replay_requires_a_running_session() {
    let mut session = Session::new(ArenaEngine::new(), config());
    assert!(matches!(
        session.replay_episode("nowhere.lmp", None),
        Err(VizError::SessionState(SessionStateError::NotInitialized))
    ));
}
