// Synthetic flight scenarios: scripted frame + telemetry sequences for the
// demo binary and for pipeline-level tests. No camera required.

use crate::types::{Frame, TelemetrySample};

/// One scripted tick. `frame: None` models a decoder dropout: the tick still
/// happens (telemetry keeps flowing) but no new frame arrives for it.
#[derive(Debug, Clone)]
pub struct ScenarioTick {
    pub frame: Option<Frame>,
    pub telemetry: TelemetrySample,
}

pub fn frame_from_fn(
    w: usize,
    h: usize,
    ts: f64,
    f: impl Fn(usize, usize) -> u8,
) -> Frame {
    let mut data = vec![0u8; w * h];
    for y in 0..h {
        for x in 0..w {
            data[y * w + x] = f(x, y);
        }
    }
    Frame {
        data,
        width: w,
        height: h,
        timestamp_s: ts,
    }
}

/// Featureless open air.
pub fn flat_frame(w: usize, h: usize, ts: f64) -> Frame {
    frame_from_fn(w, h, ts, |_, _| 128)
}

/// High-frequency vertical stripes: dense, sharp edges across the frame.
pub fn striped_frame(w: usize, h: usize, ts: f64) -> Frame {
    frame_from_fn(w, h, ts, |x, _| if (x / 2) % 2 == 0 { 0 } else { 255 })
}

/// A centered bright square of the given half-size; growing it across ticks
/// produces a looming signature.
pub fn square_frame(w: usize, h: usize, ts: f64, half: usize) -> Frame {
    let cx = w as i32 / 2;
    let cy = h as i32 / 2;
    frame_from_fn(w, h, ts, move |x, y| {
        let dx = (x as i32 - cx).unsigned_abs() as usize;
        let dy = (y as i32 - cy).unsigned_abs() as usize;
        if dx < half && dy < half {
            220
        } else {
            20
        }
    })
}

fn telemetry(tof_cm: Option<f32>) -> TelemetrySample {
    TelemetrySample {
        tof_cm,
        ..TelemetrySample::default()
    }
}

/// Open corridor: enough consecutive clear frames to enter and hold Move.
pub fn clear_corridor(w: usize, h: usize, fps: u32, ticks: u32) -> Vec<ScenarioTick> {
    (0..ticks)
        .map(|i| ScenarioTick {
            frame: Some(flat_frame(w, h, i as f64 / fps as f64)),
            telemetry: telemetry(Some(300.0)),
        })
        .collect()
}

/// Flight toward a wall: open air, then a growing obstacle, then ToF going
/// near-field. Ends with the obstacle gone so the evade can resolve.
pub fn wall_approach(w: usize, h: usize, fps: u32) -> Vec<ScenarioTick> {
    let dt = |i: u32| i as f64 / fps as f64;
    let mut ticks = Vec::new();

    for i in 0..8 {
        ticks.push(ScenarioTick {
            frame: Some(flat_frame(w, h, dt(i))),
            telemetry: telemetry(Some(300.0)),
        });
    }
    // Obstacle grows in view while the distance closes.
    for (n, i) in (8..16).enumerate() {
        let half = w / 12 + n * w / 24;
        let dist = 300.0 - 30.0 * n as f32;
        ticks.push(ScenarioTick {
            frame: Some(square_frame(w, h, dt(i), half)),
            telemetry: telemetry(Some(dist)),
        });
    }
    // Near-field contact: ToF alone must force evade.
    for i in 16..20 {
        ticks.push(ScenarioTick {
            frame: Some(striped_frame(w, h, dt(i))),
            telemetry: telemetry(Some(25.0)),
        });
    }
    // Turned away, open air again.
    for i in 20..30 {
        ticks.push(ScenarioTick {
            frame: Some(flat_frame(w, h, dt(i))),
            telemetry: telemetry(Some(280.0)),
        });
    }
    ticks
}

/// Decoder dropouts mid-flight: several ticks without a frame, then recovery.
pub fn sensor_dropout(w: usize, h: usize, fps: u32, gap: u32) -> Vec<ScenarioTick> {
    let dt = |i: u32| i as f64 / fps as f64;
    let mut ticks = Vec::new();

    for i in 0..6 {
        ticks.push(ScenarioTick {
            frame: Some(flat_frame(w, h, dt(i))),
            telemetry: telemetry(Some(250.0)),
        });
    }
    for _ in 0..gap {
        ticks.push(ScenarioTick {
            frame: None,
            telemetry: telemetry(None),
        });
    }
    for i in 6 + gap..12 + gap {
        ticks.push(ScenarioTick {
            frame: Some(flat_frame(w, h, dt(i))),
            telemetry: telemetry(Some(250.0)),
        });
    }
    ticks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corridor_frames_are_monotonic_in_time() {
        let ticks = clear_corridor(64, 64, 30, 10);
        assert_eq!(ticks.len(), 10);
        let stamps: Vec<f64> = ticks
            .iter()
            .map(|t| t.frame.as_ref().unwrap().timestamp_s)
            .collect();
        assert!(stamps.windows(2).all(|w| w[1] > w[0]));
    }

    #[test]
    fn wall_approach_ends_near_field_then_recovers() {
        let ticks = wall_approach(64, 64, 30);
        assert!(ticks[17].telemetry.tof_cm.unwrap() < 40.0);
        assert!(ticks.last().unwrap().telemetry.tof_cm.unwrap() > 40.0);
    }

    #[test]
    fn dropout_gap_has_no_frames() {
        let ticks = sensor_dropout(64, 64, 30, 3);
        assert!(ticks[6].frame.is_none());
        assert!(ticks[8].frame.is_none());
        assert!(ticks[9].frame.is_some());
    }
}
