// Observation assembly.
//
// After every tick the assembler asks the engine for the observed player's
// game variables and renders the enabled buffers straight into the `State`
// it owns, so buffer allocations are reused from tick to tick. Callers get a
// borrow (`Session::get_state`) that ends at the next tick-advancing call;
// keeping a state across ticks means cloning it.
//
// Optional parts are `None` unless enabled: each buffer by its flag,
// `labels` with the labels buffer, `objects`/`sectors` with their info
// flags.

use vizlink_engine::{
    Buffer, Engine, FrameTarget, GameVariable, Label, ObjectInfo, PlayerNumber, RenderRequest,
    SectorInfo,
};

use crate::config::GameConfig;
use crate::error::VizError;

/// Everything observed about one tick.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct State {
    /// Number of the tick about to be played.
    pub tick: u64,
    /// Values of the registered game variables, in registration order.
    pub game_variables: Vec<f64>,
    pub screen_buffer: Option<Buffer>,
    pub depth_buffer: Option<Buffer>,
    pub labels_buffer: Option<Buffer>,
    pub automap_buffer: Option<Buffer>,
    pub labels: Option<Vec<Label>>,
    pub objects: Option<Vec<ObjectInfo>>,
    pub sectors: Option<Vec<SectorInfo>>,
}

pub struct ObservationAssembler {
    state: State,
    request: RenderRequest,
    variables: Vec<GameVariable>,
    objects: bool,
    sectors: bool,
    /// `state` describes the current tick.
    fresh: bool,
    /// `state` has been filled at least once.
    filled: bool,
}

impl ObservationAssembler {
    pub fn new(config: &GameConfig) -> Self {
        let (width, height) = config.screen_resolution.dimensions();
        let format = config.screen_format;
        let image = |enabled: bool, channels: usize, planar: bool| {
            enabled.then(|| Buffer::new(width, height, channels, planar))
        };
        let state = State {
            tick: 0,
            game_variables: Vec::with_capacity(config.available_game_variables.len()),
            screen_buffer: image(config.buffers.screen, format.channels(), format.is_planar()),
            depth_buffer: image(config.buffers.depth, 1, false),
            labels_buffer: image(config.buffers.labels, 1, false),
            automap_buffer: image(config.buffers.automap, format.channels(), format.is_planar()),
            labels: config.buffers.labels.then(Vec::new),
            objects: None,
            sectors: None,
        };
        Self {
            state,
            request: RenderRequest {
                resolution: config.screen_resolution,
                format,
                settings: config.render.clone(),
            },
            variables: config.available_game_variables.clone(),
            objects: config.objects_info_enabled,
            sectors: config.sectors_info_enabled,
            fresh: false,
            filled: false,
        }
    }

    /// Fill the state from the engine as seen by `player`.
    pub fn assemble<E: Engine>(&mut self, engine: &E, player: PlayerNumber) -> Result<(), VizError> {
        self.fresh = false;
        let state = &mut self.state;
        state.tick = engine.tick() + 1;

        state.game_variables.clear();
        for var in &self.variables {
            state.game_variables.push(engine.game_variable(player, *var)?);
        }

        let target = FrameTarget {
            screen: state.screen_buffer.as_mut(),
            depth: state.depth_buffer.as_mut(),
            labels_buffer: state.labels_buffer.as_mut(),
            automap: state.automap_buffer.as_mut(),
            labels: state.labels.as_mut(),
        };
        engine.render(player, &self.request, target)?;

        state.objects = self.objects.then(|| engine.objects());
        state.sectors = self.sectors.then(|| engine.sectors());

        self.fresh = true;
        self.filled = true;
        Ok(())
    }

    /// The state no longer describes a playable tick.
    pub fn invalidate(&mut self) {
        self.fresh = false;
    }

    pub fn current(&self) -> Option<&State> {
        self.fresh.then_some(&self.state)
    }

    /// The most recently assembled state, even if the episode has moved on.
    pub fn last(&self) -> Option<&State> {
        self.filled.then_some(&self.state)
    }
}
