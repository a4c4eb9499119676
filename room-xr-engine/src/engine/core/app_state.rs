use bevy::prelude::*;

use crate::engine::loading::layout_loader::LayoutLoader;

#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Hash, States)]
pub enum AppState {
    #[default]
    Loading,
    /// Layout is built; waiting for the user to pick AR or VR.
    StartScreen,
    Placing,
    Exploring,
    /// Degraded non-XR view after a capability or session failure.
    Unavailable,
}

/// Per-frame ordering of the `Update` schedule.
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameSet {
    /// Host messages decoded into events.
    Receive,
    Session,
    Sources,
    Placement,
    Locomotion,
    /// Queued tracker releases applied to the world and host.
    Release,
    Send,
}

pub fn configure_frame_sets(app: &mut App) {
    app.configure_sets(
        Update,
        (
            FrameSet::Receive,
            FrameSet::Session,
            FrameSet::Sources,
            FrameSet::Placement,
            FrameSet::Locomotion,
            FrameSet::Release,
            FrameSet::Send,
        )
            .chain(),
    );
}

/// Leave loading once the room layout has been built into the scene.
pub fn transition_to_start_screen(
    loader: Res<LayoutLoader>,
    mut next_state: ResMut<NextState<AppState>>,
) {
    if loader.is_built() {
        info!("→ Room ready, transitioning to StartScreen state");
        next_state.set(AppState::StartScreen);
    }
}

pub fn log_state_changes(state: Res<State<AppState>>) {
    if state.is_changed() {
        debug!("App state: {:?}", state.get());
    }
}
