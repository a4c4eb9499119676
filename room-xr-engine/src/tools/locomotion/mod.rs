//! Analog locomotion once the room is placed.
//!
//! The left stick walks the room anchor relative to where the camera looks,
//! the right stick yaws it around the viewer (snap or smooth). Platform
//! gamepads take over only when no XR controller reported axes this frame.

/// Dead-zone reads and gamepad layout inference.
pub mod axes;

/// Locomotion state, settings and the per-frame anchor update.
pub mod controller;

pub mod gamepads;

use bevy::prelude::*;

use crate::engine::core::app_state::{AppState, FrameSet};
use crate::xr::handle_session_events;
use controller::{
    LocomotionSettings, XrLocomotion, apply_locomotion, destroy_on_session_end,
    enable_after_placement, track_locomotion_sources,
};
use gamepads::{HostGamepadsEvent, PlatformGamepads, ingest_host_gamepads, poll_platform_gamepads};

pub struct LocomotionPlugin;

impl Plugin for LocomotionPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<LocomotionSettings>()
            .init_resource::<XrLocomotion>()
            .init_resource::<PlatformGamepads>()
            .add_event::<HostGamepadsEvent>()
            .add_systems(
                Update,
                destroy_on_session_end
                    .in_set(FrameSet::Session)
                    .after(handle_session_events),
            )
            .add_systems(
                Update,
                (
                    enable_after_placement,
                    track_locomotion_sources,
                    ingest_host_gamepads,
                    poll_platform_gamepads,
                    apply_locomotion.run_if(in_state(AppState::Exploring)),
                )
                    .chain()
                    .in_set(FrameSet::Locomotion),
            );
    }
}
