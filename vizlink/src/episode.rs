// Episode bookkeeping: which episode is current, whether it has finished,
// and why.
//
// The controller does not touch the engine. The session asks it whether a
// tick ends the episode (`check`) and tells it when an episode starts or is
// cut short. Ticks are absolute engine ticks, so the silent start-skip ticks
// count toward the timeout.

use log::info;

/// Why an episode stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FinishReason {
    /// The engine tick reached `episode_timeout`.
    Timeout,
    /// The observed player died in a solo session.
    PlayerDied,
    /// The scenario declared itself complete.
    ScenarioExit,
    /// The session was closed mid-episode.
    SessionClosed,
    /// A replay ran out of recorded ticks.
    ReplayExhausted,
    /// The host of a multiplayer game started the next episode.
    HostRestarted,
}

/// What the engine looks like right after a tick.
#[derive(Clone, Copy, Debug, Default)]
pub struct TickOutcome {
    pub engine_tick: u64,
    pub player_dead: bool,
    pub scenario_over: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    Idle,
    Running,
    Finished(FinishReason),
}

#[derive(Debug)]
pub struct EpisodeController {
    phase: Phase,
    /// Episodes started so far in this session; the current one is
    /// `started - 1`.
    started: u32,
    timeout: u64,
    death_ends_episode: bool,
    seed: u64,
}

impl EpisodeController {
    pub fn new() -> Self {
        Self {
            phase: Phase::Idle,
            started: 0,
            timeout: 0,
            death_ends_episode: true,
            seed: 0,
        }
    }

    /// Mark a new episode as running.
    pub fn begin(&mut self, seed: u64, timeout: u64, death_ends_episode: bool) {
        self.phase = Phase::Running;
        self.started += 1;
        self.timeout = timeout;
        self.death_ends_episode = death_ends_episode;
        self.seed = seed;
        info!(
            "episode {} started (seed {seed}, timeout {timeout})",
            self.started - 1
        );
    }

    /// Decide whether the tick just played ends the episode. Returns the
    /// reason when it does; the controller is finished afterwards.
    pub fn check(&mut self, outcome: TickOutcome) -> Option<FinishReason> {
        if self.phase != Phase::Running {
            return None;
        }
        let reason = if outcome.scenario_over {
            Some(FinishReason::ScenarioExit)
        } else if outcome.player_dead && self.death_ends_episode {
            Some(FinishReason::PlayerDied)
        } else if self.timeout > 0 && outcome.engine_tick >= self.timeout {
            Some(FinishReason::Timeout)
        } else {
            None
        };
        if let Some(reason) = reason {
            self.finish(reason, outcome.engine_tick);
        }
        reason
    }

    /// Force the episode to end. Does nothing unless it is running.
    pub fn finish(&mut self, reason: FinishReason, engine_tick: u64) {
        if self.phase == Phase::Running {
            info!(
                "episode {} finished at tick {engine_tick}: {reason:?}",
                self.started.saturating_sub(1)
            );
            self.phase = Phase::Finished(reason);
        }
    }

    pub fn is_running(&self) -> bool {
        self.phase == Phase::Running
    }

    /// True once the current episode is over, and before the first one.
    pub fn is_finished(&self) -> bool {
        self.phase != Phase::Running
    }

    pub fn finish_reason(&self) -> Option<FinishReason> {
        match self.phase {
            Phase::Finished(reason) => Some(reason),
            _ => None,
        }
    }

    /// Sequence index of the current episode within the session.
    pub fn index(&self) -> u32 {
        self.started.saturating_sub(1)
    }

    pub fn episodes_started(&self) -> u32 {
        self.started
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }
}

impl Default for EpisodeController {
    fn default() -> Self {
        Self::new()
    }
}
