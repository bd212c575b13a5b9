// Scan / Move / Evade state machine.
//
// Transitions are driven exclusively by classifier output and frame
// timestamps, so replaying the same input sequence reproduces the same
// trajectory. All run state lives in SessionCounters, owned here and
// discarded with the session.

use crate::types::{
    FrameFeatures, FreeFlyParams, Hazard, MoveDir, NavState, MOVE_GRACE_FRAMES,
};
use tracing::{debug, info};

/// Mutable run state for one Free Fly session.
#[derive(Debug, Clone, Copy)]
pub struct SessionCounters {
    /// Consecutive Clear readings observed while scanning.
    pub forward_clear_streak: u32,
    /// Timestamp at which the current state was entered.
    pub state_entered_at: f64,
    /// Timestamp of the last nudge issued in Move.
    pub last_nudge_at: Option<f64>,
    /// Consecutive non-Clear readings observed while moving.
    pub caution_streak: u32,
}

impl SessionCounters {
    fn new() -> Self {
        Self {
            forward_clear_streak: 0,
            state_entered_at: 0.0,
            last_nudge_at: None,
            caution_streak: 0,
        }
    }
}

/// Which way a Caution nudge steers, away from the detected density gradient.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NudgeSide {
    Left,
    Right,
}

/// Outcome of one state-machine step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavDecision {
    pub state: NavState,
    pub hazard: Hazard,
    /// Set when a throttled lateral nudge should be applied this tick.
    pub nudge: Option<NudgeSide>,
}

pub struct Navigator {
    params: FreeFlyParams,
    state: NavState,
    counters: SessionCounters,
}

impl Navigator {
    pub fn new(params: FreeFlyParams) -> Self {
        Self {
            params,
            state: NavState::Scan,
            counters: SessionCounters::new(),
        }
    }

    pub fn state(&self) -> NavState {
        self.state
    }

    pub fn counters(&self) -> &SessionCounters {
        &self.counters
    }

    /// Advance one tick. `now_s` is the frame timestamp, not wall time.
    pub fn step(&mut self, hazard: Hazard, features: &FrameFeatures, now_s: f64) -> NavDecision {
        // Block forces Evade from any state, overriding in-flight nudges.
        if hazard == Hazard::Block {
            self.force_evade(now_s);
            return self.decision(hazard, None);
        }

        // Only Clear and Caution reach this point.
        let mut nudge = None;
        match self.state {
            NavState::Scan => {
                if hazard == Hazard::Clear {
                    self.counters.forward_clear_streak += 1;
                    if self.counters.forward_clear_streak >= self.params.forward_clear_frames {
                        self.enter(NavState::Move(MoveDir::Forward), now_s);
                    }
                } else {
                    self.counters.forward_clear_streak = 0;
                }
            }
            NavState::Move(_) => {
                if hazard == Hazard::Clear {
                    self.counters.caution_streak = 0;
                } else {
                    self.counters.caution_streak += 1;
                    if self.counters.caution_streak > MOVE_GRACE_FRAMES {
                        // The path never cleared up again: go re-establish a
                        // heading instead of inching through clutter.
                        self.enter(NavState::Scan, now_s);
                    } else {
                        nudge = self.maybe_nudge(features, now_s);
                    }
                }
            }
            NavState::Evade => {
                if hazard == Hazard::Clear {
                    self.enter(NavState::Scan, now_s);
                }
            }
        }

        self.decision(hazard, nudge)
    }

    /// Escalated sensing failure: hold an Evade posture until frames are
    /// analyzable again.
    pub fn force_evade(&mut self, now_s: f64) {
        if self.state != NavState::Evade {
            self.enter(NavState::Evade, now_s);
        }
    }

    pub fn time_in_state(&self, now_s: f64) -> f64 {
        now_s - self.counters.state_entered_at
    }

    fn maybe_nudge(&mut self, features: &FrameFeatures, now_s: f64) -> Option<NudgeSide> {
        let due = match self.counters.last_nudge_at {
            Some(t) => now_s - t >= self.params.nudge_t_s,
            None => true,
        };
        if !due {
            return None;
        }
        self.counters.last_nudge_at = Some(now_s);
        // Steer away from the denser half of the frame.
        let side = if features.edge_balance > 0.0 {
            NudgeSide::Right
        } else {
            NudgeSide::Left
        };
        debug!("nudge {:?} (edge balance {:.1})", side, features.edge_balance);
        Some(side)
    }

    fn enter(&mut self, next: NavState, now_s: f64) {
        info!(
            "nav: {:?} -> {:?} at {:.2}s",
            self.state, next, now_s
        );
        self.state = next;
        self.counters.state_entered_at = now_s;
        self.counters.forward_clear_streak = 0;
        self.counters.caution_streak = 0;
        self.counters.last_nudge_at = None;
    }

    fn decision(&self, hazard: Hazard, nudge: Option<NudgeSide>) -> NavDecision {
        NavDecision {
            state: self.state,
            hazard,
            nudge,
        }
    }
}
