/// Squared horizontal length below which a direction pick is rejected.
pub const MIN_DIRECTION_LENGTH_SQ: f32 = 1e-6;

/// Rays whose vertical component is below this cannot hit the floor plane.
pub const RAY_PLANE_PARALLEL_EPSILON: f32 = 1e-5;

/// Reticle and toucher marker dimensions (flat cylinder).
pub const RETICLE_RADIUS: f32 = 0.05;
pub const RETICLE_HEIGHT: f32 = 0.01;

/// Generic controller proxy used when no model is mapped for a handedness.
pub const CONTROLLER_PROXY_SIZE: f32 = 0.05;

/// Controller models keyed by handedness, relative to the asset root.
pub const CONTROLLER_MODEL_LEFT: &str = "models/controller_l.glb";
pub const CONTROLLER_MODEL_RIGHT: &str = "models/controller_r.glb";

/// Hit-test trackable types requested from the host.
pub const HIT_TEST_ENTITY_TYPES: &[&str] = &["point", "plane"];

pub const PROMPT_CENTER_TOUCH: &str = "Point the circle at the center of\n the room and tap the screen";
pub const PROMPT_CENTER_CONTROLLER: &str = "Point the ray at the floor\nand press trigger";
pub const PROMPT_DIRECTION_TOUCH: &str = "Now choose the room's direction\nand tap the screen";
pub const PROMPT_DIRECTION_CONTROLLER: &str = "Now choose the room's direction\nand press trigger";
pub const PROMPT_XR_UNSUPPORTED: &str = "WebXR is not supported on your device";
pub const PROMPT_AR_UNAVAILABLE: &str = "AR is not supported on your device";
pub const PROMPT_VR_UNAVAILABLE: &str = "VR is not supported on your device";
