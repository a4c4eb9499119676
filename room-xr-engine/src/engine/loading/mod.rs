//! Room layout loading and scene (re)building.

/// Layout asset tracking, first build and host-requested reloads.
pub mod layout_loader;
