//! WebXR session state and input source tracking.
//!
//! The host page owns the real XR session; this module mirrors its lifecycle,
//! tracks input sources with everything registered for them, and routes
//! hit-test streams to their owners.

/// Viewer camera marker and host-driven pose updates.
pub mod camera;

/// Error taxonomy for capability, session and bridge failures.
pub mod error;


/// Input source identity, classification and host events.
pub mod input_source;

/// Session capabilities, mode and lifecycle events.
pub mod session;

/// Cancelable registrations owned per source or per session.
pub mod subscription;

/// Input source tracker with idempotent cleanup.
pub mod tracker;

use bevy::prelude::*;

use crate::engine::core::app_state::{AppState, FrameSet};
use crate::rpc::web_rpc::HostBridge;
use camera::{CameraPoseEvent, apply_camera_pose};
use error::XrError;
use hit_test::{HitTestEvent, HitTestUpdate, route_hit_test_events};
use input_source::{InputSourceEvent, SelectEvent};
use session::{XrSession, XrSessionEvent, XrUnavailableEvent, request_session};
use tracker::{InputSourceTracker, apply_tracker_releases};

pub struct XrPlugin;

impl Plugin for XrPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<XrSession>()
            .init_resource::<InputSourceTracker>()
            .add_event::<XrSessionEvent>()
            .add_event::<XrUnavailableEvent>()
            .add_event::<InputSourceEvent>()
            .add_event::<SelectEvent>()
            .add_event::<HitTestEvent>()
            .add_event::<HitTestUpdate>()
            .add_event::<CameraPoseEvent>()
            .add_systems(
                Update,
                (handle_session_events, enter_unavailable, apply_camera_pose)
                    .chain()
                    .in_set(FrameSet::Session),
            )
            .add_systems(
                Update,
                (track_input_sources, route_hit_test_events)
                    .chain()
                    .in_set(FrameSet::Sources),
            )
            .add_systems(Update, apply_tracker_releases.in_set(FrameSet::Release));
    }
}

/// Mirror host session lifecycle into [`XrSession`] and the app state.
pub fn handle_session_events(
    mut events: EventReader<XrSessionEvent>,
    mut session: ResMut<XrSession>,
    mut tracker: ResMut<InputSourceTracker>,
    mut bridge: ResMut<HostBridge>,
    mut unavailable: EventWriter<XrUnavailableEvent>,
    state: Res<State<AppState>>,
    mut next_state: ResMut<NextState<AppState>>,
) {
    for event in events.read() {
        match event {
            XrSessionEvent::Capabilities(capabilities) => {
                info!("XR capabilities: {:?}", capabilities);
                session.capabilities = *capabilities;
            }
            XrSessionEvent::StartRequested(mode) => {
                if *state.get() != AppState::StartScreen || session.is_active() {
                    debug!("Ignoring {} start request in {:?}", mode, state.get());
                    continue;
                }
                match request_session(&mut session, *mode) {
                    Ok(()) => {
                        info!("Requesting immersive {} session", mode);
                        bridge.send_notification(
                            "xr_request_session",
                            serde_json::json!({ "mode": mode }),
                        );
                    }
                    Err(reason) => {
                        unavailable.write(XrUnavailableEvent {
                            mode: Some(*mode),
                            reason,
                        });
                    }
                }
            }
            XrSessionEvent::Started(mode) => {
                info!("Immersive {} session started", mode);
                session.mode = Some(*mode);
                session.active = true;
                next_state.set(AppState::Placing);
            }
            XrSessionEvent::StartFailed(message) => {
                let reason = XrError::SessionRejected(message.clone());
                error!("{}", reason);
                session.active = false;
                unavailable.write(XrUnavailableEvent {
                    mode: session.mode,
                    reason,
                });
            }
            XrSessionEvent::Ended => {
                info!("XR session ended");
                session.active = false;
                session.hit_test_available = false;
                tracker.end_session();
                if matches!(state.get(), AppState::Placing | AppState::Exploring) {
                    next_state.set(AppState::StartScreen);
                }
            }
            XrSessionEvent::HitTestAvailable => {
                session.hit_test_available = true;
            }
        }
    }
}

/// Switch to the degraded view and tell the host why.
pub fn enter_unavailable(
    mut events: EventReader<XrUnavailableEvent>,
    mut session: ResMut<XrSession>,
    mut bridge: ResMut<HostBridge>,
    mut next_state: ResMut<NextState<AppState>>,
) {
    for event in events.read() {
        warn!("XR unavailable: {}", event.reason);
        session.unavailable = Some(event.reason.clone());
        bridge.send_notification(
            "xr_unavailable",
            serde_json::json!({
                "mode": event.mode,
                "reason": event.reason.to_string(),
            }),
        );
        next_state.set(AppState::Unavailable);
    }
}

/// Feed host input source traffic into the tracker.
pub fn track_input_sources(
    mut events: EventReader<InputSourceEvent>,
    session: Res<XrSession>,
    mut tracker: ResMut<InputSourceTracker>,
) {
    for event in events.read() {
        match event {
            InputSourceEvent::Added(descriptor) => {
                if !session.is_active() {
                    debug!("Input source {:?} added outside a session", descriptor.id);
                    continue;
                }
                let role = tracker.on_source_added(descriptor.clone());
                info!("Input source {:?} tracked as {:?}", descriptor.id, role);
            }
            InputSourceEvent::Removed(id) => {
                if tracker.on_source_removed(*id) {
                    info!("Input source {:?} removed", id);
                }
            }
            InputSourceEvent::Pose { id, pose, axes } => {
                tracker.update_pose(*id, *pose, axes.clone());
            }
        }
    }
}
