// Tour of the basic session features.
//
// Configures buffers, labels, objects and sectors on top of the loaded
// config, then plays a few episodes of random one-hot actions, printing the
// state and logging every applied action to `log/actions.csv` (the input of
// `spectator_replay`).

use std::path::Path;
use std::thread;
use std::time::Duration;

use clap::Parser;
use log::info;
use vizlink::{ArenaEngine, GameVariable, ScreenFormat, ScreenResolution, Session};
use vizlink_demos::{ActionLog, ActionPicker, ExampleArgs, init_logging, load_config};

const EPISODES: u32 = 5;

fn main() -> anyhow::Result<()> {
    init_logging();
    let args = ExampleArgs::parse();
    let mut config = load_config(&args, "basic.json")?;

    config.set_screen_resolution(ScreenResolution::Res640X480);
    config.set_screen_format(ScreenFormat::Rgb24);
    config.set_depth_buffer_enabled(true);
    config.set_labels_buffer_enabled(true);
    config.set_automap_buffer_enabled(true);
    config.set_objects_info_enabled(true);
    config.set_sectors_info_enabled(true);
    config.set_render_hud(false);
    config.set_render_minimal_hud(false);
    config.set_render_decals(false);
    config.set_render_particles(false);
    config.set_render_effects_sprites(false);
    config.set_render_messages(false);
    config.set_render_corpses(false);
    config.set_render_screen_flashes(true);

    config.clear_available_game_variables();
    config.add_available_game_variable(GameVariable::PositionX);
    config.add_available_game_variable(GameVariable::PositionY);
    config.add_available_game_variable(GameVariable::PositionZ);
    config.add_available_game_variable(GameVariable::Ammo2);

    let pause = Duration::from_secs(1) / config.ticrate.max(1);
    let mut session = Session::new(ArenaEngine::new(), config);
    session.init()?;

    let mut picker = ActionPicker::one_hot(session.available_buttons().len(), 2024);
    let mut log = ActionLog::create(Path::new("log/actions.csv"))?;

    for episode in 0..EPISODES {
        println!("Episode #{}", episode + 1);
        session.new_episode(None)?;

        while let Some(state) = session.get_state() {
            let vars = &state.game_variables;
            println!("State #{}", state.tick);
            println!("Player position: x: {}, y: {}, z: {}", vars[0], vars[1], vars[2]);
            if let Some(screen) = &state.screen_buffer {
                println!(
                    "Screen: {}x{}x{}, depth: {}, automap: {}",
                    screen.width,
                    screen.height,
                    screen.channels,
                    state.depth_buffer.is_some(),
                    state.automap_buffer.is_some()
                );
            }
            println!("Labels:");
            for label in state.labels.iter().flatten() {
                println!(
                    "  label {} object {} {} at ({:.1}, {:.1}, {:.1}) box {}x{}+{}+{}",
                    label.value,
                    label.object_id,
                    label.object_name,
                    label.position.x,
                    label.position.y,
                    label.position.z,
                    label.width,
                    label.height,
                    label.x,
                    label.y
                );
            }
            let objects = state.objects.as_ref().map_or(0, Vec::len);
            let sectors = state.sectors.as_ref().map_or(0, Vec::len);
            println!("Objects: {objects}, sectors: {sectors}");

            let reward = session.make_action(picker.pick(), 1)?;
            log.action(session.get_last_action())?;
            println!("Action: {:?}", session.get_last_action());
            println!("Reward: {reward}");
            println!("=====================");
            thread::sleep(pause);
        }

        println!("Episode finished ({:?}).", session.finish_reason());
        println!("Total reward: {}", session.get_total_reward());
        println!("************************");
        log.comment(&format!("episode {} finished", episode + 1))?;
    }
    log.flush()?;
    session.close();
    info!("actions logged to log/actions.csv");
    Ok(())
}
