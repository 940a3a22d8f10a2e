// Replay the demos written by `episode_record`.
//
// The replaying session runs in spectator mode at a higher resolution with
// the HUD on; the ticks, game variables and rewards match the recording.

use clap::Parser;
use vizlink::{ArenaEngine, Mode, ScreenResolution, Session};
use vizlink_demos::{ExampleArgs, init_logging, load_config};

const EPISODES: u32 = 5;

fn main() -> anyhow::Result<()> {
    init_logging();
    let args = ExampleArgs::parse();
    let mut config = load_config(&args, "basic.json")?;
    config.set_episode_timeout(100);
    config.set_screen_resolution(ScreenResolution::Res800X600);
    config.set_render_hud(true);
    config.set_mode(Mode::Spectator);

    let mut session = Session::new(ArenaEngine::new(), config);
    session.init()?;

    println!("\nREPLAY OF EPISODE");
    println!("************************\n");
    for episode in 0..EPISODES {
        let path = format!("recorded_episodes/episode{episode}_rec.lmp");
        session.replay_episode(&path, None)?;
        while let Some(state) = session.get_state() {
            let tick = state.tick;
            let vars = state.game_variables.clone();
            session.advance_action(1)?;
            println!(
                "State #{tick}: vars {vars:?}, reward {}",
                session.get_last_reward()
            );
        }
        println!(
            "Episode {episode} replayed ({:?}): total reward {}",
            session.finish_reason(),
            session.get_total_reward()
        );
    }
    session.close();
    Ok(())
}
