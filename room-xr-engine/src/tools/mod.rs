//! Interactive behaviour layered on top of the XR session.
//!
//! ## Flow
//!
//! ```text
//! XrSessionEvent::Started
//!   └─> AppState::Placing
//!       ├─> placement: pick center, pick direction, lock
//!       └─> PlacementCompleted
//!           ├─> AppState::Exploring
//!           └─> locomotion enabled
//! Camera trigger sphere
//!   └─> triggers: debounced ownership, visibility, render layers
//! ```
//!
//! Placement only listens to input while `Placing`. Locomotion moves the
//! room anchor while `Exploring`. Triggers run whenever a room scene exists,
//! independent of the session.

/// Analog stick locomotion with XR controller and platform gamepad input.
pub mod locomotion;

/// Two-step room placement and its prompts.
pub mod placement;

/// Debounced trigger volumes owning splat visibility and layers.
pub mod triggers;
