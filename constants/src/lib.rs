/// Placement protocol thresholds, prompt copy and reticle sizing.
pub mod placement;

/// Default tuning for analog locomotion and snap/smooth rotation.
pub mod locomotion;

/// Trigger volume debounce, tracked actor and render layer defaults.
pub mod triggers;

/// Colours and fallback camera placement for the viewer.
pub mod render_settings;
