// RC command generation: maps a navigation decision plus telemetry onto one
// bounded four-axis stick command. Stateless; all per-session memory lives
// in the navigator.

use crate::navigation::{NavDecision, NudgeSide};
use crate::types::{
    FreeFlyParams, Hazard, NavState, RcCommand, SafetyConfig, TelemetrySample, RC_MAX, RC_MIN,
};

pub struct CommandGenerator {
    params: FreeFlyParams,
    safety: SafetyConfig,
}

impl CommandGenerator {
    pub fn new(params: FreeFlyParams, safety: SafetyConfig) -> Self {
        Self { params, safety }
    }

    /// Build the command for one tick. The result is always within
    /// [RC_MIN, RC_MAX] on every axis regardless of configured caps.
    pub fn generate(&self, decision: &NavDecision, telemetry: &TelemetrySample) -> RcCommand {
        let p = &self.params;
        let mut cmd = RcCommand::hold();

        match decision.state {
            NavState::Scan => {
                // Rotate in place looking for an open heading.
                cmd.yaw = p.move_yw;
            }
            NavState::Move(_) => {
                // Caution halves forward speed instead of stopping outright.
                cmd.forward_back = match decision.hazard {
                    Hazard::Caution => p.move_fb / 2,
                    _ => p.move_fb,
                };
                if let Some(side) = decision.nudge {
                    cmd.left_right = match side {
                        NudgeSide::Left => -p.move_fb,
                        NudgeSide::Right => p.move_fb,
                    };
                }
            }
            NavState::Evade => {
                // Back off while turning toward a new heading.
                cmd.forward_back = -p.move_fb;
                cmd.yaw = p.move_yw / 2;
            }
        }

        cmd.up_down = self.altitude_correction(telemetry);

        // Per-maneuver caps first, then the hard RC envelope.
        cmd.left_right = cmd.left_right.clamp(-p.move_fb, p.move_fb);
        cmd.forward_back = cmd.forward_back.clamp(-p.move_fb, p.move_fb);
        cmd.up_down = cmd.up_down.clamp(-p.move_ud, p.move_ud);
        cmd.yaw = cmd.yaw.clamp(-p.move_yw, p.move_yw);

        RcCommand {
            left_right: cmd.left_right.clamp(RC_MIN, RC_MAX),
            forward_back: cmd.forward_back.clamp(RC_MIN, RC_MAX),
            up_down: cmd.up_down.clamp(RC_MIN, RC_MAX),
            yaw: cmd.yaw.clamp(RC_MIN, RC_MAX),
        }
    }

    /// Keep the drone inside the altitude band. Outside the band the
    /// correction is the full up/down cap; inside it is zero.
    fn altitude_correction(&self, telemetry: &TelemetrySample) -> i32 {
        if telemetry.height_cm < self.safety.altitude_min_cm {
            self.params.move_ud
        } else if telemetry.height_cm > self.safety.altitude_max_cm {
            -self.params.move_ud
        } else {
            0
        }
    }
}
