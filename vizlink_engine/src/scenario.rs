// Data-driven scenario definitions for the arena engine.
//
// A `Scenario` is a JSON document naming one or more maps plus the reward
// rules and player loadout shared by all of them. Each map is an
// axis-aligned rectangular arena (walls on its boundary) subdivided into
// rectangular sectors, with thing spawns (monsters and items) and player
// start spots. The engine never uses magic numbers for game rules; it reads
// them from here.
//
// Two scenarios are built in and need no file: `basic` (one stationary
// target across the room, kill it to end the episode) and `deathmatch`
// (an item-strewn arena with eight start spots for multiplayer).
//
// `digest()` is a CRC-32 over the canonical JSON encoding. It goes into the
// session fingerprint so that a demo recorded against one scenario is never
// replayed against another.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Names accepted by `Scenario::builtin`.
pub const BUILTIN_SCENARIOS: &[&str] = &["basic", "deathmatch"];

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    #[serde(default)]
    pub rewards: RewardRules,
    #[serde(default)]
    pub loadout: PlayerLoadout,
    pub maps: Vec<MapSpec>,
}

/// Scripted reward rules. Rewards accumulate per player.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardRules {
    pub kill_reward: f64,
    /// Added for every shot that hits nothing; usually negative.
    pub miss_penalty: f64,
    pub item_reward: f64,
    pub frag_reward: f64,
    /// End the episode once every monster is dead.
    pub end_on_all_killed: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerLoadout {
    pub health: f64,
    pub armor: f64,
    /// Starting ammo per slot (`AMMO0`..`AMMO9`); missing slots are empty.
    pub ammo: Vec<f64>,
    /// Weapon slot selected at spawn. Slot 1 is melee and needs no ammo;
    /// any other slot fires hitscan and consumes ammo from the same slot.
    pub weapon: usize,
    /// World units per tick when a move button is held.
    pub move_speed: f64,
    /// Degrees per tick when a turn button is held.
    pub turn_rate: f64,
    /// Ticks between shots.
    pub attack_cooldown: u32,
    pub damage_min: f64,
    pub damage_max: f64,
}

impl Default for PlayerLoadout {
    fn default() -> Self {
        Self {
            health: 100.0,
            armor: 0.0,
            ammo: vec![0.0, 0.0, 50.0],
            weapon: 2,
            move_speed: 8.0,
            turn_rate: 5.0,
            attack_cooldown: 8,
            damage_min: 5.0,
            damage_max: 15.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MapSpec {
    pub id: String,
    /// Arena extent along x.
    pub width: f64,
    /// Arena extent along y.
    pub depth: f64,
    #[serde(default)]
    pub floor_height: f64,
    #[serde(default = "default_ceiling")]
    pub ceiling_height: f64,
    /// Rectangular sectors. An empty list means one sector covering the
    /// whole arena.
    #[serde(default)]
    pub sectors: Vec<SectorSpec>,
    #[serde(default)]
    pub things: Vec<ThingSpec>,
    pub starts: Vec<StartSpec>,
}

fn default_ceiling() -> f64 {
    128.0
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SectorSpec {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
    pub floor_height: f64,
    pub ceiling_height: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ThingSpec {
    pub kind: ThingKind,
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub angle: f64,
    /// Spawn position is jittered by up to this much along y.
    #[serde(default)]
    pub jitter: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ThingKind {
    Monster(MonsterSpec),
    Item(ItemSpec),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MonsterSpec {
    pub name: String,
    pub health: f64,
    #[serde(default = "default_monster_radius")]
    pub radius: f64,
    #[serde(default = "default_monster_height")]
    pub height: f64,
    /// Wander speed in units per tick; 0 keeps the monster in place.
    #[serde(default)]
    pub speed: f64,
    #[serde(default)]
    pub attack_damage: f64,
    /// Per-tick probability of attacking a player in range.
    #[serde(default)]
    pub attack_chance: f64,
    #[serde(default)]
    pub attack_range: f64,
}

fn default_monster_radius() -> f64 {
    20.0
}

fn default_monster_height() -> f64 {
    56.0
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ItemSpec {
    pub name: String,
    pub effect: ItemEffect,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ItemEffect {
    Health(f64),
    Armor(f64),
    Ammo { slot: usize, amount: f64 },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StartSpec {
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub angle: f64,
}

impl Scenario {
    /// Load a scenario from a JSON file.
    pub fn load(path: &Path) -> Result<Self, EngineError> {
        let text = std::fs::read_to_string(path)
            .map_err(|_| EngineError::ScenarioNotFound(path.display().to_string()))?;
        let scenario: Scenario =
            serde_json::from_str(&text).map_err(|e| EngineError::ScenarioMalformed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        scenario.validate().map_err(|reason| EngineError::ScenarioMalformed {
            path: path.to_path_buf(),
            reason,
        })?;
        Ok(scenario)
    }

    /// One of the scenarios compiled into the engine.
    pub fn builtin(name: &str) -> Result<Self, EngineError> {
        match name {
            "basic" => Ok(basic()),
            "deathmatch" => Ok(deathmatch()),
            other => Err(EngineError::ScenarioNotFound(format!("builtin:{other}"))),
        }
    }

    pub fn map(&self, id: &str) -> Result<&MapSpec, EngineError> {
        self.maps
            .iter()
            .find(|m| m.id.eq_ignore_ascii_case(id))
            .ok_or_else(|| EngineError::UnknownMap(id.to_string()))
    }

    /// CRC-32 of the canonical JSON form.
    pub fn digest(&self) -> u32 {
        let bytes = serde_json::to_vec(self).unwrap_or_default();
        crc32fast::hash(&bytes)
    }

    fn validate(&self) -> Result<(), String> {
        if self.maps.is_empty() {
            return Err("no maps".into());
        }
        for map in &self.maps {
            if map.width <= 0.0 || map.depth <= 0.0 {
                return Err(format!("map {} has a non-positive extent", map.id));
            }
            if map.starts.is_empty() {
                return Err(format!("map {} has no player starts", map.id));
            }
            if map.ceiling_height <= map.floor_height {
                return Err(format!("map {} has its ceiling below its floor", map.id));
            }
        }
        Ok(())
    }
}

impl MapSpec {
    /// Sectors with the implicit whole-arena sector filled in.
    pub fn effective_sectors(&self) -> Vec<SectorSpec> {
        if !self.sectors.is_empty() {
            return self.sectors.clone();
        }
        vec![SectorSpec {
            x1: 0.0,
            y1: 0.0,
            x2: self.width,
            y2: self.depth,
            floor_height: self.floor_height,
            ceiling_height: self.ceiling_height,
        }]
    }

    /// Floor height under `(x, y)`. Later sectors take precedence over
    /// earlier ones where they overlap.
    pub fn floor_at(&self, x: f64, y: f64) -> f64 {
        self.sectors
            .iter()
            .rev()
            .find(|s| x >= s.x1 && x <= s.x2 && y >= s.y1 && y <= s.y2)
            .map_or(self.floor_height, |s| s.floor_height)
    }
}

fn basic() -> Scenario {
    Scenario {
        name: "basic".into(),
        rewards: RewardRules {
            kill_reward: 101.0,
            miss_penalty: -5.0,
            item_reward: 0.0,
            frag_reward: 0.0,
            end_on_all_killed: true,
        },
        loadout: PlayerLoadout::default(),
        maps: vec![MapSpec {
            id: "map01".into(),
            width: 384.0,
            depth: 320.0,
            floor_height: 0.0,
            ceiling_height: 128.0,
            sectors: Vec::new(),
            things: vec![ThingSpec {
                kind: ThingKind::Monster(MonsterSpec {
                    name: "Cacodemon".into(),
                    health: 10.0,
                    radius: default_monster_radius(),
                    height: default_monster_height(),
                    speed: 0.0,
                    attack_damage: 0.0,
                    attack_chance: 0.0,
                    attack_range: 0.0,
                }),
                x: 352.0,
                y: 160.0,
                angle: 180.0,
                jitter: 120.0,
            }],
            starts: vec![StartSpec {
                x: 32.0,
                y: 160.0,
                angle: 0.0,
            }],
        }],
    }
}

fn deathmatch() -> Scenario {
    let item = |name: &str, effect: ItemEffect, x: f64, y: f64| ThingSpec {
        kind: ThingKind::Item(ItemSpec {
            name: name.into(),
            effect,
        }),
        x,
        y,
        angle: 0.0,
        jitter: 0.0,
    };
    let imp = |x: f64, y: f64| ThingSpec {
        kind: ThingKind::Monster(MonsterSpec {
            name: "DoomImp".into(),
            health: 60.0,
            radius: 20.0,
            height: 56.0,
            speed: 2.0,
            attack_damage: 3.0,
            attack_chance: 0.02,
            attack_range: 256.0,
        }),
        x,
        y,
        angle: 0.0,
        jitter: 0.0,
    };
    let starts = [
        (64.0, 64.0, 45.0),
        (448.0, 64.0, 135.0),
        (448.0, 448.0, 225.0),
        (64.0, 448.0, 315.0),
        (256.0, 32.0, 90.0),
        (480.0, 256.0, 180.0),
        (256.0, 480.0, 270.0),
        (32.0, 256.0, 0.0),
    ]
    .into_iter()
    .map(|(x, y, angle)| StartSpec { x, y, angle })
    .collect();

    Scenario {
        name: "deathmatch".into(),
        rewards: RewardRules {
            kill_reward: 0.0,
            miss_penalty: 0.0,
            item_reward: 0.0,
            frag_reward: 1.0,
            end_on_all_killed: false,
        },
        loadout: PlayerLoadout {
            ammo: vec![0.0, 0.0, 50.0, 0.0, 0.0, 0.0],
            damage_min: 10.0,
            damage_max: 30.0,
            ..PlayerLoadout::default()
        },
        maps: vec![MapSpec {
            id: "map01".into(),
            width: 512.0,
            depth: 512.0,
            floor_height: 0.0,
            ceiling_height: 160.0,
            sectors: vec![
                SectorSpec {
                    x1: 0.0,
                    y1: 0.0,
                    x2: 512.0,
                    y2: 512.0,
                    floor_height: 0.0,
                    ceiling_height: 160.0,
                },
                SectorSpec {
                    x1: 192.0,
                    y1: 192.0,
                    x2: 320.0,
                    y2: 320.0,
                    floor_height: 16.0,
                    ceiling_height: 160.0,
                },
            ],
            things: vec![
                item("Medikit", ItemEffect::Health(25.0), 256.0, 256.0),
                item("GreenArmor", ItemEffect::Armor(100.0), 128.0, 384.0),
                item("Clip", ItemEffect::Ammo { slot: 2, amount: 10.0 }, 384.0, 128.0),
                item("Clip", ItemEffect::Ammo { slot: 2, amount: 10.0 }, 128.0, 128.0),
                item("Medikit", ItemEffect::Health(25.0), 384.0, 384.0),
                imp(256.0, 128.0),
                imp(256.0, 384.0),
            ],
            starts,
        }],
    }
}
