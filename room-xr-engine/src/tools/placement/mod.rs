//! Two-step room placement: pick the center, then pick the direction.
//!
//! The same protocol runs for touch AR (shared reticle driven by a viewer
//! hit-test stream), controller AR (per-controller hit-test streams) and
//! controller VR (ray against the floor plane at the anchor's height).

/// Prompt panels and their copy per stage.
pub mod prompt;

/// Pure placement state machine.
pub mod state;

/// Reticle, toucher and controller visuals plus select handling.
pub mod systems;

use bevy::prelude::*;

use crate::engine::core::app_state::{AppState, FrameSet};
use crate::xr::handle_session_events;
use prompt::{PromptCommand, apply_prompt_commands};
use state::PlacementSession;
use systems::{
    PlacementCompleted, apply_hit_test_updates, follow_controllers, handle_select_events,
    reset_placement_on_session_end, setup_placement_assets, show_initial_prompt, spawn_reticle,
    start_reticle_hit_test, visualize_controllers,
};

pub struct PlacementPlugin;

impl Plugin for PlacementPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<PlacementSession>()
            .add_event::<PromptCommand>()
            .add_event::<PlacementCompleted>()
            .add_systems(Startup, setup_placement_assets)
            .add_systems(
                OnEnter(AppState::Placing),
                (spawn_reticle, show_initial_prompt),
            )
            .add_systems(
                Update,
                (
                    start_reticle_hit_test,
                    visualize_controllers,
                    apply_hit_test_updates,
                    follow_controllers,
                    handle_select_events,
                )
                    .chain()
                    .in_set(FrameSet::Placement)
                    .run_if(in_state(AppState::Placing)),
            )
            .add_systems(
                Update,
                reset_placement_on_session_end
                    .in_set(FrameSet::Session)
                    .after(handle_session_events),
            )
            .add_systems(Update, apply_prompt_commands.in_set(FrameSet::Release));
    }
}
