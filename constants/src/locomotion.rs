/// Planar speed the viewer configures for room walking, in metres per second.
pub const VIEWER_MOVEMENT_SPEED: f32 = 1.6;

pub const SNAP_ANGLE_DEG: f32 = 45.0;
pub const ROTATE_THRESHOLD: f32 = 0.5;
pub const ROTATE_RESET_THRESHOLD: f32 = 0.25;
pub const SMOOTH_ROTATE_SPEED_DEG: f32 = 120.0;
pub const DEAD_ZONE: f32 = 0.15;

/// XR standard gamepad layout: touchpad on 0/1, thumbstick on 2/3.
/// Each pair is (primary, secondary); the first non-zero reading wins.
pub const LEFT_X_AXES: [usize; 2] = [0, 2];
pub const LEFT_Y_AXES: [usize; 2] = [1, 3];
pub const RIGHT_X_AXES: [usize; 2] = [2, 0];
pub const RIGHT_Y_AXES: [usize; 2] = [3, 1];

/// Candidate movement pairs for platform gamepads with unknown layout.
pub const CANDIDATE_AXIS_PAIRS: [[usize; 2]; 3] = [[0, 1], [2, 3], [4, 5]];

/// Platform gamepads reporting fewer axes than this are ignored.
pub const MIN_GAMEPAD_AXES: usize = 2;
