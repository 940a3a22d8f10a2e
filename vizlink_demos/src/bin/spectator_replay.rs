// Play back an action log written by `basic`.
//
// The logged rows are fed to a player-mode session one per tick, cycling
// back to the first row when the log runs out before the episode does.

use std::path::Path;
use std::thread;
use std::time::Duration;

use anyhow::bail;
use clap::Parser;
use vizlink::{ArenaEngine, Mode, ScreenResolution, Session};
use vizlink_demos::{ExampleArgs, init_logging, load_config, read_action_log};

const EPISODES: u32 = 3;
const LOG: &str = "log/actions.csv";

fn main() -> anyhow::Result<()> {
    init_logging();
    let args = ExampleArgs::parse();
    let mut config = load_config(&args, "basic.json")?;
    config.set_screen_resolution(ScreenResolution::Res640X480);
    config.set_mode(Mode::Player);
    config.set_window_visible(true);

    let actions = read_action_log(Path::new(LOG))?;
    let width = config.available_buttons.len();
    if let Some(row) = actions.iter().find(|row| row.len() != width) {
        bail!(
            "{LOG} holds {}-button actions, the config has {width} buttons",
            row.len()
        );
    }

    let mut session = Session::new(ArenaEngine::new(), config);
    session.init()?;
    for episode in 0..EPISODES {
        session.new_episode(None)?;
        for action in actions.iter().cycle() {
            if session.is_episode_finished() {
                break;
            }
            session.make_action(action, 1)?;
        }
        println!(
            "Episode #{}: {} ticks, total reward {}",
            episode + 1,
            session.get_episode_time(),
            session.get_total_reward()
        );
        thread::sleep(Duration::from_secs(2));
    }
    session.close();
    Ok(())
}
