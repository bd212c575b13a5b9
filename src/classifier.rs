// Obstacle classifier: fuses the frame features with the latest ToF reading
// into a discrete hazard level. Pure function, evaluated in strict
// precedence, first match wins. Hard physical proximity (ToF) overrides
// vision; low-texture frames cannot Block on edge density alone; stale
// features cannot Block on flow.

use crate::types::{FrameFeatures, FreeFlyParams, Hazard};

pub fn classify(
    features: &FrameFeatures,
    tof_cm: Option<f32>,
    stale: bool,
    params: &FreeFlyParams,
) -> Hazard {
    let sharp = features.texture_score >= params.texture_min;

    let hazard = if matches!(tof_cm, Some(d) if d < params.tof_block_cm) {
        Hazard::Block
    } else if sharp && features.edge_density >= params.edge_block {
        Hazard::Block
    } else if !stale
        && (features.flow_looming >= params.flow_looming
            || features.flow_divergence >= params.flow_divergence)
    {
        Hazard::Block
    } else if features.edge_density >= params.edge_high {
        Hazard::Caution
    } else if features.edge_density >= params.edge_low && sharp {
        Hazard::Caution
    } else {
        Hazard::Clear
    };

    // Sensor dropout degrades conservatively: an unknown distance or a stale
    // frame is never reported as Clear.
    if hazard == Hazard::Clear && (stale || tof_cm.is_none()) {
        Hazard::Caution
    } else {
        hazard
    }
}
