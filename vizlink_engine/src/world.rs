// Arena world state and the one-tick step function.
//
// `World` is everything that changes during an episode: players, monsters,
// items, transient effects and the tick counter. `World::spawn` builds it
// from a map, the episode's players and a seed; `World::step` applies one
// tick of inputs. Nothing else mutates it.
//
// Step order (fixed, so every peer computes the same result):
// 1. tick counter increments;
// 2. player inputs, in ascending player number (respawn, turn, move,
//    weapon select, attack);
// 3. monsters, in spawn order (wander, then attack);
// 4. item pickups, in player number order;
// 5. expired effects and messages are dropped.
//
// Coordinates follow the usual top-down convention: x east, y north,
// angles in degrees counter-clockwise from east. Hitscan ignores pitch.
//
// **Critical constraint: determinism.** All randomness comes from the
// world's `ArenaRng`. Players live in a `BTreeMap`; monsters and items keep
// spawn order. No wall clock, no hash maps.

use std::collections::BTreeMap;

use log::debug;

use crate::engine::{EpisodeSpec, PlayerSlot};
use crate::prng::ArenaRng;
use crate::scenario::{
    ItemEffect, MapSpec, MonsterSpec, PlayerLoadout, RewardRules, StartSpec, ThingKind,
};
use crate::types::{Button, GameVariable, ObjectInfo, PlayerInput, PlayerNumber, Vec3};

pub const PLAYER_RADIUS: f64 = 16.0;
pub const PLAYER_HEIGHT: f64 = 56.0;
pub const EYE_HEIGHT: f64 = 41.0;
pub const ITEM_RADIUS: f64 = 10.0;
pub const ITEM_HEIGHT: f64 = 16.0;
const MELEE_RANGE: f64 = 64.0;
const EFFECT_TICKS: u64 = 8;
const MESSAGE_TICKS: u64 = 70;
const MAX_DECALS: usize = 32;
const WANDER_TICKS: u64 = 35;

#[derive(Clone, Debug)]
pub struct Player {
    pub id: u32,
    pub number: PlayerNumber,
    pub name: String,
    pub color: u8,
    pub pos: Vec3,
    pub vel: Vec3,
    pub angle: f64,
    pub pitch: f64,
    pub health: f64,
    pub armor: f64,
    pub ammo: [f64; 10],
    pub weapon: usize,
    pub dead: bool,
    pub cooldown: u32,
    pub kills: i32,
    pub items: i32,
    pub frags: i32,
    pub deaths: i32,
    pub hits: i32,
    pub hits_taken: i32,
    pub damage_dealt: f64,
    pub damage_taken: f64,
    pub scripted_reward: f64,
    pub last_hurt: Option<u64>,
}

#[derive(Clone, Debug)]
pub struct Monster {
    pub id: u32,
    pub spec: MonsterSpec,
    pub pos: Vec3,
    pub vel: Vec3,
    pub angle: f64,
    pub health: f64,
    pub dead: bool,
    wander_until: u64,
}

#[derive(Clone, Debug)]
pub struct Item {
    pub id: u32,
    pub name: String,
    pub effect: ItemEffect,
    pub pos: Vec3,
    pub taken: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EffectKind {
    /// Bullet puff where a shot hit a wall.
    Puff,
    /// Blood where a shot hit a body.
    Blood,
}

#[derive(Clone, Debug)]
pub struct Effect {
    pub kind: EffectKind,
    pub pos: Vec3,
    pub expires: u64,
}

/// On-screen message for one player.
#[derive(Clone, Debug)]
pub struct Message {
    pub player: PlayerNumber,
    pub text: String,
    pub expires: u64,
}

/// Something a hitscan can hit.
enum Target {
    Monster(usize),
    Player(PlayerNumber),
}

pub struct World {
    pub map: MapSpec,
    pub rules: RewardRules,
    pub loadout: PlayerLoadout,
    pub buttons: Vec<Button>,
    pub tick: u64,
    pub players: BTreeMap<PlayerNumber, Player>,
    pub monsters: Vec<Monster>,
    pub items: Vec<Item>,
    pub effects: Vec<Effect>,
    /// Wall marks left by missed shots, oldest first.
    pub decals: Vec<Vec3>,
    pub messages: Vec<Message>,
    deathmatch: bool,
    rng: ArenaRng,
}

impl World {
    pub fn spawn(
        map: &MapSpec,
        rules: &RewardRules,
        loadout: &PlayerLoadout,
        buttons: &[Button],
        spec: &EpisodeSpec,
    ) -> Self {
        let mut world = World {
            map: map.clone(),
            rules: rules.clone(),
            loadout: loadout.clone(),
            buttons: buttons.to_vec(),
            tick: 0,
            players: BTreeMap::new(),
            monsters: Vec::new(),
            items: Vec::new(),
            effects: Vec::new(),
            decals: Vec::new(),
            messages: Vec::new(),
            deathmatch: spec.deathmatch,
            rng: ArenaRng::new(spec.seed),
        };

        // Thing ids follow map order, so the first thing of a map is id 0.
        let mut next_id = 0u32;
        for thing in &map.things {
            let jitter = if thing.jitter > 0.0 {
                world.rng.range_f64(-thing.jitter, thing.jitter)
            } else {
                0.0
            };
            let (x, y) = world.clamp_xy(thing.x, thing.y + jitter, PLAYER_RADIUS);
            let pos = Vec3 {
                x,
                y,
                z: map.floor_at(x, y),
            };
            match &thing.kind {
                ThingKind::Monster(m) => {
                    if spec.monsters {
                        world.monsters.push(Monster {
                            id: next_id,
                            spec: m.clone(),
                            pos,
                            vel: Vec3::default(),
                            angle: thing.angle,
                            health: m.health,
                            dead: false,
                            wander_until: 0,
                        });
                    }
                }
                ThingKind::Item(item) => world.items.push(Item {
                    id: next_id,
                    name: item.name.clone(),
                    effect: item.effect.clone(),
                    pos,
                    taken: false,
                }),
            }
            next_id += 1;
        }

        for slot in &spec.players {
            let player = world.new_player(slot, next_id);
            next_id += 1;
            world.players.insert(slot.number, player);
        }
        world
    }

    pub fn player(&self, number: PlayerNumber) -> Option<&Player> {
        self.players.get(&number)
    }

    /// Scenario exit condition.
    pub fn all_monsters_dead(&self) -> bool {
        self.rules.end_on_all_killed
            && !self.monsters.is_empty()
            && self.monsters.iter().all(|m| m.dead)
    }

    pub fn step(&mut self, inputs: &[PlayerInput]) {
        self.tick += 1;

        let mut ordered: Vec<&PlayerInput> = inputs.iter().collect();
        ordered.sort_by_key(|i| i.player);
        for input in ordered {
            self.apply_input(input);
        }

        for index in 0..self.monsters.len() {
            self.update_monster(index);
        }

        self.pick_up_items();

        let tick = self.tick;
        self.effects.retain(|e| e.expires > tick);
        self.messages.retain(|m| m.expires > tick);
    }

    pub fn game_variable(&self, player: &Player, var: GameVariable) -> f64 {
        let flag = |b: bool| if b { 1.0 } else { 0.0 };
        match var {
            GameVariable::KillCount => f64::from(player.kills),
            GameVariable::ItemCount => f64::from(player.items),
            GameVariable::FragCount => f64::from(player.frags),
            GameVariable::DeathCount => f64::from(player.deaths),
            GameVariable::HitCount => f64::from(player.hits),
            GameVariable::HitsTaken => f64::from(player.hits_taken),
            GameVariable::DamageCount => player.damage_dealt,
            GameVariable::DamageTaken => player.damage_taken,
            GameVariable::Health => player.health,
            GameVariable::Armor => player.armor,
            GameVariable::Dead => flag(player.dead),
            GameVariable::OnGround => 1.0,
            GameVariable::AttackReady => flag(self.can_attack(player)),
            GameVariable::SelectedWeapon => player.weapon as f64,
            GameVariable::SelectedWeaponAmmo => player.ammo[player.weapon.min(9)],
            GameVariable::PositionX => player.pos.x,
            GameVariable::PositionY => player.pos.y,
            GameVariable::PositionZ => player.pos.z,
            GameVariable::Angle => player.angle,
            GameVariable::Pitch => player.pitch,
            GameVariable::Roll => 0.0,
            GameVariable::VelocityX => player.vel.x,
            GameVariable::VelocityY => player.vel.y,
            GameVariable::VelocityZ => player.vel.z,
            GameVariable::PlayerNumber => f64::from(player.number),
            GameVariable::PlayerCount => self.players.len() as f64,
            GameVariable::User1 => player.scripted_reward,
            GameVariable::User2 | GameVariable::User3 | GameVariable::User4 => 0.0,
            other => other.ammo_slot().map_or(0.0, |slot| player.ammo[slot]),
        }
    }

    /// Every object in the level, players included, in id order.
    pub fn objects(&self) -> Vec<ObjectInfo> {
        let mut out: Vec<ObjectInfo> = Vec::new();
        for m in &self.monsters {
            out.push(ObjectInfo {
                id: m.id,
                name: m.spec.name.clone(),
                position: m.pos,
                angle: m.angle,
                pitch: 0.0,
                roll: 0.0,
                velocity: m.vel,
            });
        }
        for item in self.items.iter().filter(|i| !i.taken) {
            out.push(ObjectInfo {
                id: item.id,
                name: item.name.clone(),
                position: item.pos,
                angle: 0.0,
                pitch: 0.0,
                roll: 0.0,
                velocity: Vec3::default(),
            });
        }
        for p in self.players.values() {
            out.push(ObjectInfo {
                id: p.id,
                name: "DoomPlayer".into(),
                position: p.pos,
                angle: p.angle,
                pitch: p.pitch,
                roll: 0.0,
                velocity: p.vel,
            });
        }
        out.sort_by_key(|o| o.id);
        out
    }

    /// Distance from `(x, y)` along `(dx, dy)` to the arena wall.
    pub fn wall_distance(&self, x: f64, y: f64, dx: f64, dy: f64) -> f64 {
        let mut best = f64::INFINITY;
        if dx > 1e-9 {
            best = best.min((self.map.width - x) / dx);
        } else if dx < -1e-9 {
            best = best.min(-x / dx);
        }
        if dy > 1e-9 {
            best = best.min((self.map.depth - y) / dy);
        } else if dy < -1e-9 {
            best = best.min(-y / dy);
        }
        best.max(0.0)
    }

    // -----------------------------------------------------------------------
    // Players
    // -----------------------------------------------------------------------

    fn new_player(&mut self, slot: &PlayerSlot, id: u32) -> Player {
        let mut ammo = [0.0; 10];
        for (dst, src) in ammo.iter_mut().zip(&self.loadout.ammo) {
            *dst = *src;
        }
        let mut player = Player {
            id,
            number: slot.number,
            name: slot.name.clone(),
            color: slot.color,
            pos: Vec3::default(),
            vel: Vec3::default(),
            angle: 0.0,
            pitch: 0.0,
            health: self.loadout.health,
            armor: self.loadout.armor,
            ammo,
            weapon: self.loadout.weapon.min(9),
            dead: false,
            cooldown: 0,
            kills: 0,
            items: 0,
            frags: 0,
            deaths: 0,
            hits: 0,
            hits_taken: 0,
            damage_dealt: 0.0,
            damage_taken: 0.0,
            scripted_reward: 0.0,
            last_hurt: None,
        };
        let start = self.pick_start(slot.number);
        self.place(&mut player, &start);
        player
    }

    fn pick_start(&mut self, number: PlayerNumber) -> StartSpec {
        let starts = &self.map.starts;
        let index = if self.deathmatch {
            self.rng.range_u64(0, starts.len() as u64) as usize
        } else {
            usize::from(number.saturating_sub(1)) % starts.len().max(1)
        };
        starts.get(index).cloned().unwrap_or(StartSpec {
            x: self.map.width / 2.0,
            y: self.map.depth / 2.0,
            angle: 0.0,
        })
    }

    fn place(&self, player: &mut Player, start: &StartSpec) {
        let (x, y) = self.clamp_xy(start.x, start.y, PLAYER_RADIUS);
        player.pos = Vec3 {
            x,
            y,
            z: self.map.floor_at(x, y),
        };
        player.vel = Vec3::default();
        player.angle = normalize_angle(start.angle);
        player.pitch = 0.0;
    }

    fn respawn(&mut self, number: PlayerNumber) {
        let start = self.pick_start(number);
        let loadout = self.loadout.clone();
        let Some(mut player) = self.players.remove(&number) else {
            return;
        };
        self.place(&mut player, &start);
        player.dead = false;
        player.health = loadout.health;
        player.armor = loadout.armor;
        player.ammo = [0.0; 10];
        for (dst, src) in player.ammo.iter_mut().zip(&loadout.ammo) {
            *dst = *src;
        }
        player.weapon = loadout.weapon.min(9);
        player.cooldown = 0;
        debug!("player {number} respawned at tick {}", self.tick);
        self.players.insert(number, player);
    }

    fn apply_input(&mut self, input: &PlayerInput) {
        let Some(dead) = self.players.get(&input.player).map(|p| p.dead) else {
            return;
        };
        if dead {
            if input.respawn {
                self.respawn(input.player);
            }
            return;
        }

        let pressed = |b: Button| -> f64 {
            self.buttons
                .iter()
                .position(|x| *x == b)
                .and_then(|i| input.buttons.get(i).copied())
                .unwrap_or(0.0)
        };
        let held = |b: Button| pressed(b) != 0.0;

        let speed = self.loadout.move_speed * if held(Button::Speed) { 2.0 } else { 1.0 };
        let turn = self.loadout.turn_rate;

        let mut angle_delta = 0.0;
        if held(Button::TurnLeft) {
            angle_delta += turn;
        }
        if held(Button::TurnRight) {
            angle_delta -= turn;
        }
        if held(Button::Turn180) {
            angle_delta += 180.0;
        }
        angle_delta -= pressed(Button::TurnLeftRightDelta);

        let mut pitch_delta = 0.0;
        if held(Button::LookUp) {
            pitch_delta += turn;
        }
        if held(Button::LookDown) {
            pitch_delta -= turn;
        }
        pitch_delta -= pressed(Button::LookUpDownDelta);

        let mut forward = pressed(Button::MoveForwardBackwardDelta);
        if held(Button::MoveForward) {
            forward += speed;
        }
        if held(Button::MoveBackward) {
            forward -= speed;
        }
        let mut right = pressed(Button::MoveLeftRightDelta);
        if held(Button::MoveRight) {
            right += speed;
        }
        if held(Button::MoveLeft) {
            right -= speed;
        }

        let weapon_buttons = [
            Button::SelectWeapon1,
            Button::SelectWeapon2,
            Button::SelectWeapon3,
            Button::SelectWeapon4,
            Button::SelectWeapon5,
            Button::SelectWeapon6,
            Button::SelectWeapon7,
        ];
        let selected = weapon_buttons.iter().position(|b| held(*b)).map(|i| i + 1);
        let attack = held(Button::Attack);

        let (x, y) = {
            let Some(p) = self.players.get_mut(&input.player) else {
                return;
            };
            p.angle = normalize_angle(p.angle + angle_delta);
            p.pitch = (p.pitch + pitch_delta).clamp(-89.0, 89.0);
            if let Some(slot) = selected {
                p.weapon = slot;
            }
            if p.cooldown > 0 {
                p.cooldown -= 1;
            }
            let rad = p.angle.to_radians();
            let (sin, cos) = rad.sin_cos();
            (
                p.pos.x + forward * cos + right * sin,
                p.pos.y + forward * sin - right * cos,
            )
        };
        let (x, y) = self.clamp_xy(x, y, PLAYER_RADIUS);
        let z = self.map.floor_at(x, y);
        if let Some(p) = self.players.get_mut(&input.player) {
            p.vel = Vec3 {
                x: x - p.pos.x,
                y: y - p.pos.y,
                z: z - p.pos.z,
            };
            p.pos = Vec3 { x, y, z };
        }

        if attack {
            self.fire(input.player);
        }
    }

    fn can_attack(&self, p: &Player) -> bool {
        !p.dead && p.cooldown == 0 && (p.weapon <= 1 || p.ammo[p.weapon.min(9)] >= 1.0)
    }

    fn fire(&mut self, shooter: PlayerNumber) {
        let Some(p) = self.players.get(&shooter) else {
            return;
        };
        if !self.can_attack(p) {
            return;
        }
        let melee = p.weapon <= 1;
        let origin = p.pos;
        let rad = p.angle.to_radians();
        let (dy, dx) = rad.sin_cos();

        if let Some(p) = self.players.get_mut(&shooter) {
            p.cooldown = self.loadout.attack_cooldown;
            if !melee {
                p.ammo[p.weapon.min(9)] -= 1.0;
            }
        }

        let wall = self.wall_distance(origin.x, origin.y, dx, dy);
        let reach = if melee { MELEE_RANGE.min(wall) } else { wall };
        let hit = self.trace(shooter, origin, dx, dy, reach);
        let damage = self
            .rng
            .range_f64(self.loadout.damage_min, self.loadout.damage_max)
            .floor();

        match hit {
            Some((target, dist)) => {
                let at = Vec3 {
                    x: origin.x + dx * dist,
                    y: origin.y + dy * dist,
                    z: origin.z + EYE_HEIGHT,
                };
                self.effects.push(Effect {
                    kind: EffectKind::Blood,
                    pos: at,
                    expires: self.tick + EFFECT_TICKS,
                });
                if let Some(p) = self.players.get_mut(&shooter) {
                    p.hits += 1;
                    p.damage_dealt += damage;
                }
                match target {
                    Target::Monster(index) => self.damage_monster(shooter, index, damage),
                    Target::Player(victim) => self.damage_player(victim, Some(shooter), damage),
                }
            }
            None => {
                if !melee {
                    let at = Vec3 {
                        x: origin.x + dx * wall,
                        y: origin.y + dy * wall,
                        z: origin.z + EYE_HEIGHT,
                    };
                    self.effects.push(Effect {
                        kind: EffectKind::Puff,
                        pos: at,
                        expires: self.tick + EFFECT_TICKS,
                    });
                    self.decals.push(at);
                    if self.decals.len() > MAX_DECALS {
                        self.decals.remove(0);
                    }
                }
                let penalty = self.rules.miss_penalty;
                if let Some(p) = self.players.get_mut(&shooter) {
                    p.scripted_reward += penalty;
                }
            }
        }
    }

    /// Nearest live body along the ray within `reach`.
    fn trace(
        &self,
        shooter: PlayerNumber,
        origin: Vec3,
        dx: f64,
        dy: f64,
        reach: f64,
    ) -> Option<(Target, f64)> {
        let along = |pos: Vec3, radius: f64| -> Option<f64> {
            let rx = pos.x - origin.x;
            let ry = pos.y - origin.y;
            let fwd = rx * dx + ry * dy;
            let lat = (rx * dy - ry * dx).abs();
            (fwd > 0.0 && fwd <= reach && lat <= radius).then_some(fwd)
        };

        let mut best: Option<(Target, f64)> = None;
        for (index, m) in self.monsters.iter().enumerate() {
            if m.dead {
                continue;
            }
            if let Some(d) = along(m.pos, m.spec.radius) {
                if best.as_ref().is_none_or(|(_, b)| d < *b) {
                    best = Some((Target::Monster(index), d));
                }
            }
        }
        for (number, p) in &self.players {
            if *number == shooter || p.dead {
                continue;
            }
            if let Some(d) = along(p.pos, PLAYER_RADIUS) {
                if best.as_ref().is_none_or(|(_, b)| d < *b) {
                    best = Some((Target::Player(*number), d));
                }
            }
        }
        best
    }

    fn damage_monster(&mut self, shooter: PlayerNumber, index: usize, damage: f64) {
        let killed = {
            let Some(m) = self.monsters.get_mut(index) else {
                return;
            };
            m.health -= damage;
            if m.health <= 0.0 && !m.dead {
                m.dead = true;
                m.health = 0.0;
                m.vel = Vec3::default();
                true
            } else {
                false
            }
        };
        if killed {
            let reward = self.rules.kill_reward;
            if let Some(p) = self.players.get_mut(&shooter) {
                p.kills += 1;
                p.scripted_reward += reward;
            }
            self.post_message(shooter, "Monster killed");
            debug!("player {shooter} killed monster {index} at tick {}", self.tick);
        }
    }

    fn damage_player(&mut self, victim: PlayerNumber, attacker: Option<PlayerNumber>, damage: f64) {
        let tick = self.tick;
        let died = {
            let Some(p) = self.players.get_mut(&victim) else {
                return;
            };
            if p.dead {
                return;
            }
            let absorbed = (damage / 3.0).floor().min(p.armor);
            p.armor -= absorbed;
            let taken = damage - absorbed;
            p.health -= taken;
            p.hits_taken += 1;
            p.damage_taken += taken;
            p.last_hurt = Some(tick);
            if p.health <= 0.0 {
                p.health = 0.0;
                p.dead = true;
                p.deaths += 1;
                p.vel = Vec3::default();
                true
            } else {
                false
            }
        };
        if died {
            debug!("player {victim} died at tick {tick}");
            if let Some(killer) = attacker {
                let reward = self.rules.frag_reward;
                if let Some(k) = self.players.get_mut(&killer) {
                    k.frags += 1;
                    k.scripted_reward += reward;
                }
                let text = format!("Fragged player {victim}");
                self.post_message(killer, &text);
            }
        }
    }

    fn post_message(&mut self, player: PlayerNumber, text: &str) {
        self.messages.push(Message {
            player,
            text: text.to_string(),
            expires: self.tick + MESSAGE_TICKS,
        });
    }

    // -----------------------------------------------------------------------
    // Monsters and items
    // -----------------------------------------------------------------------

    fn update_monster(&mut self, index: usize) {
        let tick = self.tick;
        let Some(m) = self.monsters.get(index) else {
            return;
        };
        if m.dead {
            return;
        }
        let spec = m.spec.clone();
        let mut angle = m.angle;
        let mut wander_until = m.wander_until;
        let mut pos = m.pos;

        if spec.speed > 0.0 {
            if tick >= wander_until {
                angle = self.rng.range_f64(0.0, 360.0);
                wander_until = tick + WANDER_TICKS;
            }
            let (sin, cos) = angle.to_radians().sin_cos();
            let (x, y) = self.clamp_xy(
                pos.x + cos * spec.speed,
                pos.y + sin * spec.speed,
                spec.radius,
            );
            pos = Vec3 {
                x,
                y,
                z: self.map.floor_at(x, y),
            };
        }

        let mut victim = None;
        if spec.attack_chance > 0.0 {
            let nearest = self
                .players
                .values()
                .filter(|p| !p.dead)
                .map(|p| (p.number, distance(p.pos, pos)))
                .filter(|(_, d)| *d <= spec.attack_range)
                .min_by(|a, b| a.1.total_cmp(&b.1));
            if let Some((number, _)) = nearest {
                if self.rng.chance(spec.attack_chance) {
                    victim = Some(number);
                }
            }
        }

        if let Some(m) = self.monsters.get_mut(index) {
            m.vel = Vec3 {
                x: pos.x - m.pos.x,
                y: pos.y - m.pos.y,
                z: pos.z - m.pos.z,
            };
            m.pos = pos;
            m.angle = normalize_angle(angle);
            m.wander_until = wander_until;
        }
        if let Some(number) = victim {
            self.damage_player(number, None, spec.attack_damage);
        }
    }

    fn pick_up_items(&mut self) {
        let numbers: Vec<PlayerNumber> = self.players.keys().copied().collect();
        for number in numbers {
            for index in 0..self.items.len() {
                let Some(p) = self.players.get(&number) else {
                    break;
                };
                let item = &self.items[index];
                if p.dead || item.taken || distance(p.pos, item.pos) > PLAYER_RADIUS + ITEM_RADIUS {
                    continue;
                }
                let effect = item.effect.clone();
                let name = item.name.clone();
                self.items[index].taken = true;
                let reward = self.rules.item_reward;
                if let Some(p) = self.players.get_mut(&number) {
                    match effect {
                        ItemEffect::Health(v) => p.health = (p.health + v).min(200.0),
                        ItemEffect::Armor(v) => p.armor = p.armor.max(v),
                        ItemEffect::Ammo { slot, amount } => {
                            if let Some(a) = p.ammo.get_mut(slot) {
                                *a += amount;
                            }
                        }
                    }
                    p.items += 1;
                    p.scripted_reward += reward;
                }
                self.post_message(number, &format!("Picked up {name}"));
            }
        }
    }

    fn clamp_xy(&self, x: f64, y: f64, radius: f64) -> (f64, f64) {
        let clamp = |v: f64, hi: f64| {
            if hi <= 2.0 * radius {
                hi / 2.0
            } else {
                v.clamp(radius, hi - radius)
            }
        };
        (clamp(x, self.map.width), clamp(y, self.map.depth))
    }
}

pub fn distance(a: Vec3, b: Vec3) -> f64 {
    ((a.x - b.x).powi(2) + (a.y - b.y).powi(2)).sqrt()
}

fn normalize_angle(a: f64) -> f64 {
    a.rem_euclid(360.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::Scenario;

    fn slot(number: PlayerNumber) -> PlayerSlot {
        PlayerSlot {
            number,
            name: format!("P{number}"),
            color: number,
        }
    }

    fn basic_world(seed: u64) -> World {
        let scenario = Scenario::builtin("basic").unwrap();
        World::spawn(
            scenario.map("map01").unwrap(),
            &scenario.rewards,
            &scenario.loadout,
            &[Button::MoveLeft, Button::MoveRight, Button::Attack],
            &EpisodeSpec {
                seed,
                players: vec![slot(1)],
                deathmatch: false,
                monsters: true,
            },
        )
    }

    fn input(player: PlayerNumber, buttons: &[f64]) -> PlayerInput {
        PlayerInput {
            player,
            buttons: buttons.to_vec(),
            respawn: false,
        }
    }

    #[test]
    fn same_seed_same_spawn() {
        let a = basic_world(5);
        let b = basic_world(5);
        assert_eq!(a.monsters[0].pos, b.monsters[0].pos);
        assert_eq!(a.monsters[0].id, 0);
    }

    #[test]
    fn strafing_moves_along_y_when_facing_east() {
        let mut w = basic_world(1);
        let start = w.players[&1].pos;
        w.step(&[input(1, &[1.0, 0.0, 0.0])]);
        let p = &w.players[&1];
        assert!((p.pos.y - (start.y + 8.0)).abs() < 1e-9, "MOVE_LEFT goes north");
        assert!((p.pos.x - start.x).abs() < 1e-9);
        assert_eq!(w.tick, 1);
    }

    #[test]
    fn miss_costs_penalty_and_ammo() {
        let mut w = basic_world(1);
        // Sidestep far enough that the target cannot be in line.
        let target_y = w.monsters[0].pos.y;
        let p = w.players.get_mut(&1).unwrap();
        p.pos.y = if target_y > 160.0 { 20.0 } else { 300.0 };
        w.step(&[input(1, &[0.0, 0.0, 1.0])]);
        let p = &w.players[&1];
        assert_eq!(p.scripted_reward, -5.0);
        assert_eq!(p.ammo[2], 49.0);
        assert_eq!(w.decals.len(), 1);
    }

    #[test]
    fn lined_up_shot_kills_and_ends() {
        let mut w = basic_world(3);
        let target_y = w.monsters[0].pos.y;
        w.players.get_mut(&1).unwrap().pos.y = target_y;
        w.step(&[input(1, &[0.0, 0.0, 1.0])]);
        // Monster health 10 against damage 5..15: at most two shots.
        for _ in 0..20 {
            if w.all_monsters_dead() {
                break;
            }
            w.step(&[input(1, &[0.0, 0.0, 1.0])]);
        }
        assert!(w.all_monsters_dead());
        let p = &w.players[&1];
        assert_eq!(p.kills, 1);
        assert_eq!(p.scripted_reward, 101.0);
    }

    #[test]
    fn dead_player_needs_respawn_flag() {
        let scenario = Scenario::builtin("deathmatch").unwrap();
        let mut w = World::spawn(
            scenario.map("map01").unwrap(),
            &scenario.rewards,
            &scenario.loadout,
            &[Button::Attack],
            &EpisodeSpec {
                seed: 9,
                players: vec![slot(1), slot(2)],
                deathmatch: true,
                monsters: false,
            },
        );
        w.damage_player(2, Some(1), 500.0);
        assert!(w.players[&2].dead);
        assert_eq!(w.players[&1].frags, 1);
        assert_eq!(w.players[&2].deaths, 1);

        w.step(&[input(1, &[0.0]), input(2, &[0.0])]);
        assert!(w.players[&2].dead);

        w.step(&[
            input(1, &[0.0]),
            PlayerInput {
                player: 2,
                buttons: vec![0.0],
                respawn: true,
            },
        ]);
        let p = &w.players[&2];
        assert!(!p.dead);
        assert_eq!(p.health, 100.0);
        assert_eq!(p.deaths, 1);
    }

    #[test]
    fn armor_absorbs_a_third() {
        let mut w = basic_world(1);
        w.players.get_mut(&1).unwrap().armor = 100.0;
        w.damage_player(1, None, 30.0);
        let p = &w.players[&1];
        assert_eq!(p.armor, 90.0);
        assert_eq!(p.health, 80.0);
    }
}
