// `ArenaEngine`: the reference `Engine` implementation.
//
// Wraps a loaded `Scenario` and the current episode's `World`. It is fully
// deterministic: the same launch spec, episode spec and input sequence give
// the same ticks, variables and rewards on every run, whatever is rendered
// in between.

use log::{debug, info};

use crate::engine::{Engine, EpisodeSpec, LaunchSpec, ScenarioSource};
use crate::error::EngineError;
use crate::render;
use crate::scenario::Scenario;
use crate::types::{
    Button, FrameTarget, GameVariable, LineInfo, ObjectInfo, PlayerInput, PlayerNumber,
    PlayerStatus, RenderRequest, SectorInfo,
};
use crate::world::World;

#[derive(Default)]
pub struct ArenaEngine {
    loaded: Option<Loaded>,
    world: Option<World>,
}

struct Loaded {
    scenario: Scenario,
    map: String,
    buttons: Vec<Button>,
    digest: u32,
}

impl ArenaEngine {
    pub fn new() -> Self {
        Self::default()
    }

    fn world(&self) -> Result<&World, EngineError> {
        self.world.as_ref().ok_or(EngineError::NotLaunched)
    }
}

impl Engine for ArenaEngine {
    fn launch(&mut self, spec: &LaunchSpec) -> Result<(), EngineError> {
        let scenario = match &spec.scenario {
            ScenarioSource::Builtin(name) => Scenario::builtin(name)?,
            ScenarioSource::File(path) => Scenario::load(path)?,
        };
        // Fail now rather than at the first episode.
        scenario.map(&spec.map)?;
        info!("arena launched: scenario {} map {}", scenario.name, spec.map);
        let digest = scenario.digest();
        self.loaded = Some(Loaded {
            scenario,
            map: spec.map.clone(),
            buttons: spec.buttons.clone(),
            digest,
        });
        self.world = None;
        Ok(())
    }

    fn scenario_digest(&self) -> u32 {
        self.loaded.as_ref().map_or(0, |l| l.digest)
    }

    fn start_episode(&mut self, spec: &EpisodeSpec) -> Result<(), EngineError> {
        let loaded = self.loaded.as_ref().ok_or(EngineError::NotLaunched)?;
        let map = loaded.scenario.map(&loaded.map)?;
        debug!(
            "episode start: seed {} players {}",
            spec.seed,
            spec.players.len()
        );
        self.world = Some(World::spawn(
            map,
            &loaded.scenario.rewards,
            &loaded.scenario.loadout,
            &loaded.buttons,
            spec,
        ));
        Ok(())
    }

    fn advance(&mut self, inputs: &[PlayerInput]) -> Result<(), EngineError> {
        let world = self.world.as_mut().ok_or(EngineError::NotLaunched)?;
        if let Some(unknown) = inputs.iter().find(|i| !world.players.contains_key(&i.player)) {
            return Err(EngineError::UnknownPlayer(unknown.player));
        }
        world.step(inputs);
        Ok(())
    }

    fn tick(&self) -> u64 {
        self.world.as_ref().map_or(0, |w| w.tick)
    }

    fn game_variable(&self, player: PlayerNumber, var: GameVariable) -> Result<f64, EngineError> {
        let world = self.world()?;
        let p = world
            .player(player)
            .ok_or(EngineError::UnknownPlayer(player))?;
        Ok(world.game_variable(p, var))
    }

    fn scripted_reward(&self, player: PlayerNumber) -> Result<f64, EngineError> {
        let world = self.world()?;
        world
            .player(player)
            .map(|p| p.scripted_reward)
            .ok_or(EngineError::UnknownPlayer(player))
    }

    fn episode_over(&self) -> bool {
        self.world.as_ref().is_some_and(World::all_monsters_dead)
    }

    fn players(&self) -> Vec<PlayerStatus> {
        let Some(world) = &self.world else {
            return Vec::new();
        };
        world
            .players
            .values()
            .map(|p| PlayerStatus {
                number: p.number,
                name: p.name.clone(),
                color: p.color,
                frags: p.frags,
                deaths: p.deaths,
                health: p.health,
                dead: p.dead,
            })
            .collect()
    }

    fn render(
        &self,
        player: PlayerNumber,
        request: &RenderRequest,
        target: FrameTarget<'_>,
    ) -> Result<(), EngineError> {
        render::render(self.world()?, player, request, target)
    }

    fn objects(&self) -> Vec<ObjectInfo> {
        self.world.as_ref().map_or_else(Vec::new, World::objects)
    }

    fn sectors(&self) -> Vec<SectorInfo> {
        let Some(world) = &self.world else {
            return Vec::new();
        };
        let (w, d) = (world.map.width, world.map.depth);
        let on_boundary = |x1: f64, y1: f64, x2: f64, y2: f64| {
            (x1 == x2 && (x1 <= 0.0 || x1 >= w)) || (y1 == y2 && (y1 <= 0.0 || y1 >= d))
        };
        world
            .map
            .effective_sectors()
            .into_iter()
            .map(|s| {
                let corners = [
                    (s.x1, s.y1, s.x2, s.y1),
                    (s.x2, s.y1, s.x2, s.y2),
                    (s.x2, s.y2, s.x1, s.y2),
                    (s.x1, s.y2, s.x1, s.y1),
                ];
                SectorInfo {
                    floor_height: s.floor_height,
                    ceiling_height: s.ceiling_height,
                    lines: corners
                        .into_iter()
                        .map(|(x1, y1, x2, y2)| LineInfo {
                            x1,
                            y1,
                            x2,
                            y2,
                            is_blocking: on_boundary(x1, y1, x2, y2),
                        })
                        .collect(),
                }
            })
            .collect()
    }

    fn shutdown(&mut self) {
        if self.loaded.take().is_some() {
            info!("arena shut down");
        }
        self.world = None;
    }
}
