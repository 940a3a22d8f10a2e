// Per-tick reward bookkeeping.
//
// The engine reports a cumulative, scenario-defined reward per player. The
// accumulator turns that into per-tick rewards by differencing against the
// value seen on the previous tick, then adds the living reward and, on the
// tick the player dies, the death penalty. The baseline is taken after the
// start-skip ticks, so nothing earned while skipping is counted.

#[derive(Clone, Debug, Default)]
pub struct RewardAccumulator {
    living_reward: f64,
    death_penalty: f64,
    baseline: f64,
    total: f64,
}

impl RewardAccumulator {
    pub fn new(living_reward: f64, death_penalty: f64) -> Self {
        Self {
            living_reward,
            death_penalty,
            baseline: 0.0,
            total: 0.0,
        }
    }

    /// Start a new episode from the engine's current scripted reward.
    pub fn reset(&mut self, living_reward: f64, death_penalty: f64, scripted: f64) {
        self.living_reward = living_reward;
        self.death_penalty = death_penalty;
        self.baseline = scripted;
        self.total = 0.0;
    }

    /// Account one engine tick. `died` is true only on the tick the player
    /// went from alive to dead. Returns the reward earned by that tick.
    pub fn on_tick(&mut self, scripted: f64, died: bool) -> f64 {
        let mut reward = scripted - self.baseline + self.living_reward;
        if died {
            reward -= self.death_penalty;
        }
        self.baseline = scripted;
        self.total += reward;
        reward
    }

    pub fn total(&self) -> f64 {
        self.total
    }
}
