//! Spatial helpers shared by placement, locomotion and trigger containment.
//!
//! Thin layer over `bevy::math`: ray/plane hits for controller rays, yaw
//! extraction for the room direction pick, pivoted yaw in parent space for
//! turning the room about the viewer, and sphere/box overlap for trigger
//! volumes.

/// Ray, yaw and containment functions operating on glam types.
pub mod spatial;
