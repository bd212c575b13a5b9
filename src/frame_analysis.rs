// Per-frame scalar features for the Free Fly loop: edge density, a
// Laplacian-variance focus measure, and a coarse optical-flow field reduced
// to looming / divergence scalars. Everything works on the raw luma buffer;
// normalization is per-pixel / per-cell so the fixed thresholds stay
// meaningful across frame sizes.

use crate::error::SensingError;
use crate::types::{Frame, FrameFeatures};

/// Sobel magnitude (|gx| + |gy|) above this counts as an edge pixel.
const EDGE_MAG_THRESHOLD: f32 = 96.0;
/// Side length of one flow cell in pixels.
const FLOW_CELL: usize = 8;
/// Per-cell flow vectors are clamped to this magnitude (cells per frame).
const FLOW_MAX: f32 = 4.0;
/// Frames smaller than this on either side cannot be analyzed.
const MIN_DIM: usize = 32;

const FLOW_EPS: f32 = 1.0;

struct FlowGrid {
    w: usize,
    h: usize,
    cells: Vec<f32>,
}

pub struct FrameAnalyzer {
    prev_grid: Option<FlowGrid>,
}

impl FrameAnalyzer {
    pub fn new() -> Self {
        Self { prev_grid: None }
    }

    /// Analyze one frame against the previous one. Runs exactly once per
    /// incoming frame and never waits for a better one; a bad buffer is an
    /// `AnalysisFailed` the caller degrades around.
    pub fn analyze(&mut self, frame: &Frame) -> Result<FrameFeatures, SensingError> {
        if frame.width < MIN_DIM || frame.height < MIN_DIM {
            return Err(SensingError::AnalysisFailed(format!(
                "frame too small: {}x{}",
                frame.width, frame.height
            )));
        }
        if frame.data.len() != frame.width * frame.height {
            return Err(SensingError::AnalysisFailed(format!(
                "buffer length {} does not match {}x{}",
                frame.data.len(),
                frame.width,
                frame.height
            )));
        }

        let (edge_density, edge_balance, texture_score) = edge_and_texture(frame);
        let grid = downsample(frame);

        let (flow_looming, flow_divergence) = match &self.prev_grid {
            Some(prev) if prev.w == grid.w && prev.h == grid.h => flow_scalars(prev, &grid),
            _ => (0.0, 0.0),
        };
        self.prev_grid = Some(grid);

        Ok(FrameFeatures {
            edge_density,
            texture_score,
            flow_looming,
            flow_divergence,
            edge_balance,
        })
    }

    /// Forget the previous frame, e.g. after a stream restart.
    pub fn reset(&mut self) {
        self.prev_grid = None;
    }
}

/// One pass over the interior pixels: Sobel edge counting (full frame plus
/// left/right halves) and Laplacian variance.
fn edge_and_texture(frame: &Frame) -> (f32, f32, f32) {
    let w = frame.width;
    let h = frame.height;
    let data = &frame.data;
    let px = |x: usize, y: usize| data[y * w + x] as f32;

    let mut edges: u64 = 0;
    let mut left_edges: u64 = 0;
    let mut right_edges: u64 = 0;
    let mut lap_sum: f64 = 0.0;
    let mut lap_sq_sum: f64 = 0.0;

    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let gx = (px(x + 1, y - 1) + 2.0 * px(x + 1, y) + px(x + 1, y + 1))
                - (px(x - 1, y - 1) + 2.0 * px(x - 1, y) + px(x - 1, y + 1));
            let gy = (px(x - 1, y + 1) + 2.0 * px(x, y + 1) + px(x + 1, y + 1))
                - (px(x - 1, y - 1) + 2.0 * px(x, y - 1) + px(x + 1, y - 1));
            if gx.abs() + gy.abs() > EDGE_MAG_THRESHOLD {
                edges += 1;
                if x < w / 2 {
                    left_edges += 1;
                } else {
                    right_edges += 1;
                }
            }

            let lap = 4.0 * px(x, y) - px(x - 1, y) - px(x + 1, y) - px(x, y - 1) - px(x, y + 1);
            lap_sum += lap as f64;
            lap_sq_sum += (lap * lap) as f64;
        }
    }

    let interior = ((w - 2) * (h - 2)) as f64;
    let half = (interior / 2.0).max(1.0);
    let edge_density = 100.0 * edges as f64 / interior;
    let edge_balance = 100.0 * (left_edges as f64 / half - right_edges as f64 / half);

    let mean = lap_sum / interior;
    let lap_var = (lap_sq_sum / interior - mean * mean).max(0.0);

    (edge_density as f32, edge_balance as f32, lap_var as f32)
}

/// Mean luma per FLOW_CELL x FLOW_CELL cell.
fn downsample(frame: &Frame) -> FlowGrid {
    let gw = frame.width / FLOW_CELL;
    let gh = frame.height / FLOW_CELL;
    let mut cells = vec![0.0f32; gw * gh];

    for cy in 0..gh {
        for cx in 0..gw {
            let mut sum: u32 = 0;
            for dy in 0..FLOW_CELL {
                let row = (cy * FLOW_CELL + dy) * frame.width + cx * FLOW_CELL;
                for dx in 0..FLOW_CELL {
                    sum += frame.data[row + dx] as u32;
                }
            }
            cells[cy * gw + cx] = sum as f32 / (FLOW_CELL * FLOW_CELL) as f32;
        }
    }

    FlowGrid {
        w: gw,
        h: gh,
        cells,
    }
}

/// One-step normal flow between two luma grids, reduced to two scalars:
/// mean outward (radial) component and mean positive divergence.
fn flow_scalars(prev: &FlowGrid, cur: &FlowGrid) -> (f32, f32) {
    let gw = cur.w;
    let gh = cur.h;
    if gw < 3 || gh < 3 {
        return (0.0, 0.0);
    }

    let at = |g: &FlowGrid, x: usize, y: usize| g.cells[y * gw + x];
    let mut vx = vec![0.0f32; gw * gh];
    let mut vy = vec![0.0f32; gw * gh];

    for y in 1..gh - 1 {
        for x in 1..gw - 1 {
            let gx = (at(cur, x + 1, y) - at(cur, x - 1, y)) / 2.0;
            let gy = (at(cur, x, y + 1) - at(cur, x, y - 1)) / 2.0;
            let dt = at(cur, x, y) - at(prev, x, y);
            let denom = gx * gx + gy * gy + FLOW_EPS;
            let (fx, fy) = clamp_vector((-dt * gx / denom, -dt * gy / denom), FLOW_MAX);
            vx[y * gw + x] = fx;
            vy[y * gw + x] = fy;
        }
    }

    let cx = (gw - 1) as f32 / 2.0;
    let cy = (gh - 1) as f32 / 2.0;
    let mut looming = 0.0f32;
    let mut looming_cells = 0u32;
    let mut divergence = 0.0f32;
    let mut div_cells = 0u32;

    for y in 1..gh - 1 {
        for x in 1..gw - 1 {
            let rx = x as f32 - cx;
            let ry = y as f32 - cy;
            let len = (rx * rx + ry * ry).sqrt();
            if len >= 0.5 {
                looming += (vx[y * gw + x] * rx + vy[y * gw + x] * ry) / len;
                looming_cells += 1;
            }

            if x >= 2 && x < gw - 2 && y >= 2 && y < gh - 2 {
                let div = (vx[y * gw + x + 1] - vx[y * gw + x - 1]) / 2.0
                    + (vy[(y + 1) * gw + x] - vy[(y - 1) * gw + x]) / 2.0;
                divergence += div.max(0.0);
                div_cells += 1;
            }
        }
    }

    let looming = if looming_cells > 0 {
        // Scaled so a whole-field outward drift of one cell/frame reads ~10.
        10.0 * looming / looming_cells as f32
    } else {
        0.0
    };
    let divergence = if div_cells > 0 {
        10.0 * divergence / div_cells as f32
    } else {
        0.0
    };

    (looming, divergence)
}

fn clamp_vector(v: (f32, f32), max_len: f32) -> (f32, f32) {
    let len = (v.0 * v.0 + v.1 * v.1).sqrt();
    if len <= max_len || len <= f32::EPSILON {
        v
    } else {
        let scale = max_len / len;
        (v.0 * scale, v.1 * scale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_frame(w: usize, h: usize, ts: f64, f: impl Fn(usize, usize) -> u8) -> Frame {
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

    #[test]
    fn rejects_mismatched_buffer() {
        let mut analyzer = FrameAnalyzer::new();
        let frame = Frame {
            data: vec![0u8; 10],
            width: 64,
            height: 64,
            timestamp_s: 0.0,
        };
        assert!(matches!(
            analyzer.analyze(&frame),
            Err(SensingError::AnalysisFailed(_))
        ));
    }

    #[test]
    fn rejects_tiny_frame() {
        let mut analyzer = FrameAnalyzer::new();
        let frame = make_frame(8, 8, 0.0, |_, _| 128);
        assert!(analyzer.analyze(&frame).is_err());
    }

    #[test]
    fn uniform_frame_has_no_features() {
        let mut analyzer = FrameAnalyzer::new();
        let frame = make_frame(64, 64, 0.0, |_, _| 128);
        let features = analyzer.analyze(&frame).unwrap();
        assert_eq!(features.edge_density, 0.0);
        assert_eq!(features.texture_score, 0.0);
        assert_eq!(features.flow_looming, 0.0);
    }

    #[test]
    fn stripes_read_as_dense_sharp_texture() {
        let mut analyzer = FrameAnalyzer::new();
        let frame = make_frame(64, 64, 0.0, |x, _| if (x / 2) % 2 == 0 { 0 } else { 255 });
        let features = analyzer.analyze(&frame).unwrap();
        assert!(features.edge_density > 30.0, "{}", features.edge_density);
        assert!(features.texture_score > 25.0, "{}", features.texture_score);
    }

    #[test]
    fn edge_balance_points_at_denser_side() {
        let mut analyzer = FrameAnalyzer::new();
        // Stripes only on the left half.
        let frame = make_frame(64, 64, 0.0, |x, _| {
            if x < 32 && (x / 2) % 2 == 0 {
                255
            } else {
                32
            }
        });
        let features = analyzer.analyze(&frame).unwrap();
        assert!(features.edge_balance > 0.0, "{}", features.edge_balance);
    }

    #[test]
    fn static_scene_has_no_flow() {
        let mut analyzer = FrameAnalyzer::new();
        let frame = make_frame(64, 64, 0.0, |x, y| ((x * 3 + y * 5) % 97) as u8);
        analyzer.analyze(&frame).unwrap();
        let mut second = frame.clone();
        second.timestamp_s = 0.033;
        let features = analyzer.analyze(&second).unwrap();
        assert!(features.flow_looming.abs() < 0.01);
        assert!(features.flow_divergence.abs() < 0.01);
    }

    #[test]
    fn expanding_square_looms() {
        let square = |half: usize| {
            move |x: usize, y: usize| {
                let dx = (x as i32 - 32).unsigned_abs() as usize;
                let dy = (y as i32 - 32).unsigned_abs() as usize;
                if dx < half && dy < half {
                    220
                } else {
                    20
                }
            }
        };
        let mut analyzer = FrameAnalyzer::new();
        analyzer.analyze(&make_frame(64, 64, 0.0, square(12))).unwrap();
        let features = analyzer
            .analyze(&make_frame(64, 64, 0.033, square(20)))
            .unwrap();
        assert!(features.flow_looming > 0.0, "{}", features.flow_looming);
        assert!(
            features.flow_divergence > 0.0,
            "{}",
            features.flow_divergence
        );
    }

    #[test]
    fn reset_forgets_previous_frame() {
        let mut analyzer = FrameAnalyzer::new();
        let frame = make_frame(64, 64, 0.0, |x, _| (x % 251) as u8);
        analyzer.analyze(&frame).unwrap();
        analyzer.reset();
        let features = analyzer.analyze(&frame).unwrap();
        assert_eq!(features.flow_looming, 0.0);
    }
}
