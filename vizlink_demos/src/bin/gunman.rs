// Label-driven aiming.
//
// Finds the target (object 0) among the visible labels, strafes until its
// bounding box is centred on the screen, then fires.

use clap::Parser;
use vizlink::{ArenaEngine, GameVariable, Label, ScreenFormat, ScreenResolution, Session};
use vizlink_demos::{ExampleArgs, init_logging, load_config};

const EPISODES: u32 = 10;
const LEFT: [f64; 3] = [1.0, 0.0, 0.0];
const RIGHT: [f64; 3] = [0.0, 1.0, 0.0];
const SHOOT: [f64; 3] = [0.0, 0.0, 1.0];
/// Pixels off centre that still count as aimed.
const AIM_TOLERANCE: f64 = 20.0;

/// Strafe toward the label, or shoot once it is centred.
fn aim(label: &Label, screen_width: usize) -> [f64; 3] {
    let centre = f64::from(label.x) + f64::from(label.width) / 2.0;
    let dx = screen_width as f64 / 2.0 - centre;
    if dx.abs() < AIM_TOLERANCE {
        SHOOT
    } else if dx < 0.0 {
        RIGHT
    } else {
        LEFT
    }
}

fn main() -> anyhow::Result<()> {
    init_logging();
    let args = ExampleArgs::parse();
    let mut config = load_config(&args, "basic.json")?;
    config.set_render_hud(false);
    config.set_screen_resolution(ScreenResolution::Res640X480);
    config.set_screen_format(ScreenFormat::Bgr24);
    config.set_labels_buffer_enabled(true);
    config.clear_available_game_variables();
    config.add_available_game_variable(GameVariable::PositionX);
    config.add_available_game_variable(GameVariable::PositionY);
    config.add_available_game_variable(GameVariable::PositionZ);

    let mut session = Session::new(ArenaEngine::new(), config);
    session.init()?;
    if session.available_buttons().len() != 3 {
        anyhow::bail!("gunman expects the MOVE_LEFT, MOVE_RIGHT, ATTACK buttons");
    }

    for episode in 0..EPISODES {
        println!("Episode #{}", episode + 1);
        session.new_episode(None)?;
        let mut seen = std::collections::BTreeSet::new();

        while let Some(state) = session.get_state() {
            let width = state.screen_buffer.as_ref().map_or(0, |b| b.width);
            let labels = state.labels.clone().unwrap_or_default();
            println!("State #{}", state.tick);
            for label in &labels {
                seen.insert(label.object_name.clone());
                println!(
                    "  {} (object {}) box {}x{}+{}+{}",
                    label.object_name, label.object_id, label.width, label.height, label.x, label.y
                );
            }
            let action = match labels.iter().find(|l| l.object_id == 0) {
                Some(target) => aim(target, width),
                // Nothing in sight: keep strafing.
                None => LEFT,
            };
            session.make_action(&action, 1)?;
        }

        println!("Episode finished ({:?})", session.finish_reason());
        println!("Total reward: {}", session.get_total_reward());
        println!("Seen in this episode: {seen:?}");
        println!("************************");
    }
    session.close();
    Ok(())
}
