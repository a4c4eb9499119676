use constants::locomotion::CANDIDATE_AXIS_PAIRS;

/// Read one axis, zeroing readings at or below the dead zone. Missing axes
/// read as zero; readings above the dead zone pass through unscaled.
pub fn read_axis(axes: &[f32], index: usize, dead_zone: f32) -> f32 {
    let value = axes.get(index).copied().unwrap_or(0.0);
    if value.abs() <= dead_zone { 0.0 } else { value }
}

/// First non-zero reading of an (primary, fallback) axis pair.
pub fn read_axis_any(axes: &[f32], pair: [usize; 2], dead_zone: f32) -> f32 {
    let primary = read_axis(axes, pair[0], dead_zone);
    if primary != 0.0 {
        primary
    } else {
        read_axis(axes, pair[1], dead_zone)
    }
}

/// Axis layout for a platform gamepad: a movement pair and one yaw axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisMapping {
    pub move_x: usize,
    pub move_y: usize,
    pub yaw: usize,
}

impl AxisMapping {
    /// Standard-mapping layout: left stick 0/1, right stick X on 2.
    pub const STANDARD: Self = Self {
        move_x: 0,
        move_y: 1,
        yaw: 2,
    };
}

/// Guess the layout of an unknown gamepad from a snapshot of its axes.
///
/// The movement pair is the candidate (0/1, 2/3, 4/5) with the largest
/// `a² + b²`; ties keep the earlier pair. Yaw is the largest remaining
/// non-zero axis, or the conventional default when everything is at rest.
pub fn infer_axis_mapping(axes: &[f32]) -> AxisMapping {
    let magnitude = |i: usize| axes.get(i).copied().unwrap_or(0.0).abs();

    let mut pairs: Vec<([usize; 2], f32)> = CANDIDATE_AXIS_PAIRS
        .iter()
        .filter(|pair| axes.len() > pair[1])
        .map(|&pair| (pair, magnitude(pair[0]).powi(2) + magnitude(pair[1]).powi(2)))
        .collect();
    if pairs.is_empty() {
        pairs.push(([0, 1], 0.0));
    }
    // Stable sort keeps candidate order among equal scores.
    pairs.sort_by(|a, b| b.1.total_cmp(&a.1));
    let [move_x, move_y] = pairs[0].0;

    let mut yaw = None;
    let mut best = 0.0;
    for i in (0..axes.len()).filter(|&i| i != move_x && i != move_y) {
        if magnitude(i) > best {
            best = magnitude(i);
            yaw = Some(i);
        }
    }
    let yaw = yaw.unwrap_or(if [move_x, move_y] == [0, 1] { 2 } else { 0 });

    AxisMapping {
        move_x,
        move_y,
        yaw,
    }
}
