//! Trigger volumes that decide which room splats are shown and on which
//! render layer.
//!
//! ## Frame flow
//!
//! ```text
//! FixedUpdate  detect_trigger_contacts   sphere vs box, raw enter/leave (Exploring only)
//! Update       register_trigger_volumes  new volumes in, removed volumes out
//!              tick_trigger_debounce     timers on Time<Real>, counts, visibility
//! PostUpdate   flush_layer_ops           one layer pass per frame
//! ```
//!
//! An object stays visible while at least one trigger claims it. Its layer
//! comes from the newest active claim; with none left it drops back to the
//! default layer.

/// Reference counts, debounced inside state and layer requests.
pub mod ownership;

/// Volume and actor components plus the systems driving them.
pub mod volumes;

use bevy::prelude::*;
use bevy::render::view::VisibilitySystems;

use crate::engine::core::app_state::AppState;
use volumes::{detect_trigger_contacts, flush_layer_ops, register_trigger_volumes, tick_trigger_debounce};

pub struct TriggerPlugin;

impl Plugin for TriggerPlugin {
    fn build(&self, app: &mut App) {
        // The room is inert until placement locks it in place.
        app.add_systems(
            FixedUpdate,
            detect_trigger_contacts.run_if(in_state(AppState::Exploring)),
        )
            .add_systems(
                Update,
                (register_trigger_volumes, tick_trigger_debounce).chain(),
            )
            .add_systems(
                PostUpdate,
                flush_layer_ops.before(VisibilitySystems::CheckVisibility),
            );
    }
}
