// Host a two-player deathmatch and report frags.
//
// The bundled config carries `-host 2`: the session starts a relay on the
// default port and waits for one more player to join with
// `-join <host>`. Dead players are respawned as soon as they die.

use clap::Parser;
use log::info;
use vizlink::{ArenaEngine, GameVariable, Session};
use vizlink_demos::{ExampleArgs, init_logging, load_config};

fn main() -> anyhow::Result<()> {
    init_logging();
    let args = ExampleArgs::parse();
    let config = load_config(&args, "multiplayer.json")?;

    let mut session = Session::new(ArenaEngine::new(), config);
    info!("waiting for players");
    session.init()?;

    let player = session.get_game_variable(GameVariable::PlayerNumber)?;
    let mut last_frags = 0.0;
    while !session.is_episode_finished() {
        session.advance_action(1)?;

        let frags = session.get_game_variable(GameVariable::FragCount)?;
        if frags != last_frags {
            last_frags = frags;
            println!("Player {player} has {frags} frags.");
        }
        if session.is_player_dead()? {
            println!("Player {player} died.");
            session.respawn_player()?;
        }
    }

    println!("Final scores:");
    for p in session.players() {
        println!("  {} ({}): {} frags, {} deaths", p.number, p.name, p.frags, p.deaths);
    }
    session.close();
    Ok(())
}
