// Action channel: the pending action, its validation, and tick pacing.
//
// An action is one `f64` per registered button, in registration order.
// Binary buttons treat any non-zero value as pressed; delta buttons use the
// value as a signed magnitude. The channel holds the action that will be
// applied on the next tick (`pending`) and the one applied on the last tick
// (`last`), which is what `get_last_action` reports.
//
// In the spectator modes the per-tick input comes from a `SpectatorInput`
// instead; the pending action is the fallback when it has nothing to say.

use std::thread;
use std::time::{Duration, Instant};

use vizlink_engine::Button;

use crate::error::ActionShapeError;

/// Source of per-tick input in the spectator modes.
pub trait SpectatorInput: Send {
    /// Input for the tick about to be played (`tick` as reported in
    /// `State::tick`), or `None` to apply the pending action.
    fn next_input(&mut self, tick: u64, buttons: &[Button]) -> Option<Vec<f64>>;
}

impl<F> SpectatorInput for F
where
    F: FnMut(u64, &[Button]) -> Option<Vec<f64>> + Send,
{
    fn next_input(&mut self, tick: u64, buttons: &[Button]) -> Option<Vec<f64>> {
        self(tick, buttons)
    }
}

/// Plays a fixed list of actions, one per tick, wrapping around at the end.
#[derive(Clone, Debug)]
pub struct ScriptedInput {
    actions: Vec<Vec<f64>>,
    cursor: usize,
}

impl ScriptedInput {
    pub fn new(actions: Vec<Vec<f64>>) -> Self {
        Self { actions, cursor: 0 }
    }
}

impl SpectatorInput for ScriptedInput {
    fn next_input(&mut self, _tick: u64, _buttons: &[Button]) -> Option<Vec<f64>> {
        if self.actions.is_empty() {
            return None;
        }
        let action = self.actions[self.cursor].clone();
        self.cursor = (self.cursor + 1) % self.actions.len();
        Some(action)
    }
}

pub fn check_skip(skip: u32) -> Result<(), ActionShapeError> {
    if skip == 0 {
        Err(ActionShapeError::ZeroSkip)
    } else {
        Ok(())
    }
}

#[derive(Clone, Debug)]
pub struct ActionChannel {
    width: usize,
    pending: Vec<f64>,
    last: Vec<f64>,
    respawn: bool,
}

impl ActionChannel {
    pub fn new(width: usize) -> Self {
        Self {
            width,
            pending: vec![0.0; width],
            last: Vec::new(),
            respawn: false,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn check(&self, action: &[f64]) -> Result<(), ActionShapeError> {
        if action.len() == self.width {
            Ok(())
        } else {
            Err(ActionShapeError::Length {
                expected: self.width,
                actual: action.len(),
            })
        }
    }

    /// Replace the pending action.
    pub fn set(&mut self, action: &[f64]) -> Result<(), ActionShapeError> {
        self.check(action)?;
        self.pending.clear();
        self.pending.extend_from_slice(action);
        Ok(())
    }

    pub fn pending(&self) -> &[f64] {
        &self.pending
    }

    /// Record what was actually applied on the tick just played.
    pub fn applied(&mut self, action: &[f64]) {
        self.last.clear();
        self.last.extend_from_slice(action);
    }

    pub fn last(&self) -> &[f64] {
        &self.last
    }

    /// Forget the pending and last actions (new episode, replay).
    pub fn reset(&mut self) {
        self.pending.iter_mut().for_each(|v| *v = 0.0);
        self.last.clear();
        self.respawn = false;
    }

    pub fn request_respawn(&mut self) {
        self.respawn = true;
    }

    pub fn take_respawn(&mut self) -> bool {
        std::mem::take(&mut self.respawn)
    }
}

/// Sleeps so that consecutive ticks are at least `1 / ticrate` apart.
#[derive(Debug)]
pub struct Pacer {
    period: Duration,
    next: Option<Instant>,
}

impl Pacer {
    pub fn new(ticrate: u32) -> Self {
        Self {
            period: Duration::from_secs(1) / ticrate.max(1),
            next: None,
        }
    }

    /// Block until the next tick is due. A caller that falls behind is not
    /// made to catch up with a burst of ticks.
    pub fn wait(&mut self) {
        let now = Instant::now();
        if let Some(deadline) = self.next {
            if deadline > now {
                thread::sleep(deadline - now);
            }
        }
        let base = self.next.map_or(now, |d| d.max(now));
        self.next = Some(base + self.period);
    }

    pub fn reset(&mut self) {
        self.next = None;
    }
}
