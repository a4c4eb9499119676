use bevy::color::Color;

/// Reticle colour while idle.
pub const NEUTRAL_COLOUR: Color = Color::srgb(1.0, 1.0, 1.0);

/// Reticle colour while a select is held.
pub const CONFIRMING_COLOUR: Color = Color::srgb(0.0, 1.0, 0.0);

pub const CLEAR_COLOUR: Color = Color::srgba(0.0, 0.0, 0.0, 0.0);
pub const FALLBACK_CLEAR_COLOUR: Color = Color::srgb(0.05, 0.05, 0.05);

/// Degraded non-XR view: camera position looking at the origin.
pub const FALLBACK_CAMERA_POSITION: [f32; 3] = [0.0, 2.0, 4.0];

pub const AMBIENT_BRIGHTNESS: f32 = 400.0;

pub const UNAVAILABLE_TEXT_COLOUR: Color = Color::srgb(0.6, 0.6, 0.6);
pub const PROMPT_TEXT_COLOUR: Color = Color::srgb(1.0, 1.0, 1.0);
