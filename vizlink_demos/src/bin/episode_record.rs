// Record a few episodes of random play to demo files.
//
// Demos land in `recorded_episodes/episode<N>_rec.lmp`. Replay them with
// `episode_replay`, which may render at a different resolution and with a
// different HUD: the demo only holds the seed and the inputs.

use std::path::{Path, PathBuf};

use clap::Parser;
use vizlink::{ArenaEngine, Mode, ScreenResolution, Session};
use vizlink_demos::{ActionPicker, ExampleArgs, init_logging, load_config};

const EPISODES: u32 = 5;

fn demo_path(episode: u32) -> PathBuf {
    PathBuf::from(format!("recorded_episodes/episode{episode}_rec.lmp"))
}

fn main() -> anyhow::Result<()> {
    init_logging();
    let args = ExampleArgs::parse();
    let mut config = load_config(&args, "basic.json")?;
    config.set_episode_timeout(100);
    config.set_screen_resolution(ScreenResolution::Res320X240);
    config.set_render_hud(false);
    config.set_mode(Mode::Player);

    let mut session = Session::new(ArenaEngine::new(), config);
    session.init()?;
    let mut picker = ActionPicker::one_hot(session.available_buttons().len(), 7);

    println!("\nRECORDING EPISODES");
    println!("************************\n");
    for episode in 0..EPISODES {
        let path = demo_path(episode);
        session.new_episode(Some(path.as_path()))?;
        while !session.is_episode_finished() {
            session.make_action(picker.pick(), 1)?;
        }
        println!(
            "Episode {episode} recorded to {}: total reward {}",
            path.display(),
            session.get_total_reward()
        );
    }

    // Closing finalizes the demo bound to the running episode as well.
    session.new_episode(Some(Path::new("recorded_episodes/episodetmp_rec.lmp")))?;
    session.close();
    Ok(())
}
