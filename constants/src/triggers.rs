/// Delay before a trigger's inside state flips, in milliseconds.
pub const DEFAULT_DEBOUNCE_MS: u64 = 120;

/// Radius of the sphere carried by the camera that activates triggers.
pub const CAMERA_TRIGGER_RADIUS: f32 = 0.2;

/// Render layers declared by the apartment scene, in addition to layer 0.
pub const ROOM_LAYERS: [usize; 8] = [1, 2, 3, 4, 5, 6, 7, 8];

/// Layer objects fall back to when no trigger claims them.
pub const DEFAULT_LAYER: usize = 0;

/// Depth bias added per layer index so higher layers draw over lower ones.
pub const LAYER_DEPTH_BIAS: f32 = 1.0;
