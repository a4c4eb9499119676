//! Room scene: anchor, splats, trigger volumes, camera and UI panels.
//!
//! The anchor exists from startup so placement and locomotion always have
//! something to move. Content under it is built from the room layout and
//! can be torn down and rebuilt without touching the anchor pose.

/// Anchor, content build/teardown and splat layer propagation.
pub mod room;

/// Prompt panels, the native start hint and the degraded view.
pub mod ui;
