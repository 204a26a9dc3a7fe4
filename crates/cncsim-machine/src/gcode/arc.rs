//! Arc discretization for G02/G03.
//!
//! Grounded on `gcodekit5-camtools::arc_expander::ArcExpander`: center/radius
//! resolution, `atan2` start/end angles, direction-aware angle delta, and
//! uniform angular sampling are all carried over. What's new is the segment
//! count itself — the teacher always samples a fixed `num_segments` (a
//! preview-quality knob); this kernel derives the count from spec.md's
//! chord-error rule (≤ 1% of radius, minimum 8 segments per full
//! revolution), since the result here is the executed machine trajectory,
//! not a rendering hint.

use std::f64::consts::PI;

/// Maximum allowed chord deviation, expressed as a fraction of radius.
const MAX_CHORD_ERROR_RATIO: f64 = 0.01;
const MIN_SEGMENTS_PER_REVOLUTION: f64 = 8.0;

/// One sampled point along the arc, in the active plane's two in-plane
/// coordinates (the third, out-of-plane axis is interpolated linearly by
/// the caller for helical motion).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArcPoint {
    pub u: f64,
    pub v: f64,
}

/// Discretize an arc from `(start_u, start_v)` to `(end_u, end_v)` around
/// `(center_u, center_v)`. Returns sampled points in travel order,
/// *excluding* the start point and *including* the end point, so callers
/// can treat each entry as the next commanded sub-target.
pub fn expand_arc(
    start_u: f64,
    start_v: f64,
    end_u: f64,
    end_v: f64,
    center_u: f64,
    center_v: f64,
    clockwise: bool,
) -> Vec<ArcPoint> {
    let radius = ((start_u - center_u).powi(2) + (start_v - center_v).powi(2)).sqrt();
    if radius <= f64::EPSILON {
        return vec![ArcPoint { u: end_u, v: end_v }];
    }

    let start_angle = (start_v - center_v).atan2(start_u - center_u);
    let end_angle = (end_v - center_v).atan2(end_u - center_u);

    let mut delta = end_angle - start_angle;
    if clockwise {
        // Clockwise: angle must decrease monotonically.
        if delta >= 0.0 {
            delta -= 2.0 * PI;
        }
    } else if delta <= 0.0 {
        delta += 2.0 * PI;
    }
    // A full-circle move (I/J/K arc with identical start/end point) keeps
    // the ± 2π magnitude rather than collapsing to zero.
    if delta.abs() < 1e-9 {
        delta = if clockwise { -2.0 * PI } else { 2.0 * PI };
    }

    let segments = segment_count(delta);
    let mut points = Vec::with_capacity(segments);
    for i in 1..=segments {
        let t = i as f64 / segments as f64;
        let angle = start_angle + delta * t;
        points.push(ArcPoint {
            u: center_u + radius * angle.cos(),
            v: center_v + radius * angle.sin(),
        });
    }
    // Snap the final sample onto the exact commanded endpoint to avoid
    // trigonometric residue leaving the block perpetually unsettled.
    if let Some(last) = points.last_mut() {
        last.u = end_u;
        last.v = end_v;
    }
    points
}

fn segment_count(total_angle: f64) -> usize {
    let theta_max = 2.0 * (1.0 - MAX_CHORD_ERROR_RATIO).acos();
    let by_chord_error = (total_angle.abs() / theta_max).ceil() as usize;
    let by_minimum = (total_angle.abs() / (2.0 * PI) * MIN_SEGMENTS_PER_REVOLUTION).ceil() as usize;
    by_chord_error.max(by_minimum).max(1)
}
