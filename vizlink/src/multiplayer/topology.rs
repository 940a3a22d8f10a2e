// Multiplayer topology from launch arguments.
//
// The recognised flags follow the engine's command-line conventions:
//
//   -host N        host a game for N players in total (including the host)
//   -join ADDR     join the game hosted at ADDR (host[:port])
//   -port P        port to host on, or default port for -join (5029)
//   -netmode M     0 = peer lockstep, 1 = packet server; both map to the
//                  same lockstep relay here and only 0/1 are accepted
//   +name NAME     player name
//   +colorset C    player color, 0-7
//   -deathmatch    players score frags and respawn instead of ending
//   -nomonsters    start episodes without monsters
//
// Each `game_args` entry may hold several tokens. Tokens not listed above are
// left for the engine and ignored here.

use crate::error::ConfigError;

pub const DEFAULT_PORT: u16 = 5029;
pub const MAX_PLAYERS: u8 = 8;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Topology {
    Solo,
    Host { players: u8, port: u16 },
    Join { addr: String },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NetArgs {
    pub topology: Topology,
    pub name: String,
    pub color: u8,
    pub deathmatch: bool,
    pub monsters: bool,
    pub netmode: u8,
}

impl Default for NetArgs {
    fn default() -> Self {
        Self {
            topology: Topology::Solo,
            name: "Player".into(),
            color: 0,
            deathmatch: false,
            monsters: true,
            netmode: 0,
        }
    }
}

pub fn parse_game_args(args: &[String]) -> Result<NetArgs, ConfigError> {
    let tokens: Vec<&str> = args.iter().flat_map(|a| a.split_whitespace()).collect();
    let mut parsed = NetArgs::default();
    let mut host: Option<u8> = None;
    let mut join: Option<String> = None;
    let mut port: u16 = DEFAULT_PORT;

    let mut iter = tokens.into_iter();
    while let Some(token) = iter.next() {
        let mut value = |flag: &str| {
            iter.next()
                .ok_or_else(|| ConfigError::GameArg(format!("{flag} needs a value")))
        };
        match token {
            "-host" => {
                let n = value(token)?;
                let players = n
                    .parse::<u8>()
                    .ok()
                    .filter(|p| (1..=MAX_PLAYERS).contains(p))
                    .ok_or_else(|| {
                        ConfigError::GameArg(format!("-host {n}: expected 1 to {MAX_PLAYERS}"))
                    })?;
                host = Some(players);
            }
            "-join" => join = Some(value(token)?.to_string()),
            "-port" => {
                let p = value(token)?;
                port = p
                    .parse()
                    .map_err(|_| ConfigError::GameArg(format!("-port {p}: not a port")))?;
            }
            "-netmode" => {
                let m = value(token)?;
                parsed.netmode = match m {
                    "0" => 0,
                    "1" => 1,
                    _ => return Err(ConfigError::GameArg(format!("-netmode {m}: expected 0 or 1"))),
                };
            }
            "+name" => parsed.name = value(token)?.to_string(),
            "+colorset" => {
                let c = value(token)?;
                parsed.color = c
                    .parse::<u8>()
                    .ok()
                    .filter(|c| *c < 8)
                    .ok_or_else(|| ConfigError::GameArg(format!("+colorset {c}: expected 0 to 7")))?;
            }
            "-deathmatch" => parsed.deathmatch = true,
            "-nomonsters" => parsed.monsters = false,
            _ => {}
        }
    }

    parsed.topology = match (host, join) {
        (Some(_), Some(_)) => {
            return Err(ConfigError::GameArg("-host and -join are exclusive".into()));
        }
        (Some(players), None) => Topology::Host { players, port },
        (None, Some(addr)) => {
            let addr = if addr.contains(':') {
                addr
            } else {
                format!("{addr}:{port}")
            };
            Topology::Join { addr }
        }
        (None, None) => Topology::Solo,
    };
    Ok(parsed)
}
