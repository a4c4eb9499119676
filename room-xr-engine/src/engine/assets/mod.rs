//! Data assets loaded through the asset server.

/// Room layout: splats, trigger volumes and declared render layers.
pub mod room_layout;
