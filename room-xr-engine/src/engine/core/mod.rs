//! Core application setup and state management.
//!
//! Builds the app, orders the per-frame system sets and drives the
//! Loading → StartScreen → Placing → Exploring flow.

/// Application setup and plugin configuration.
///
/// Wires the host bridge, XR, placement, locomotion and trigger plugins
/// together with the room loading and UI systems.
pub mod app_setup;

/// Application states and per-frame system set ordering.
pub mod app_state;

/// Platform-specific window configuration for native and WASM builds.
pub mod window_config;
