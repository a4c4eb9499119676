use std::collections::{HashMap, HashSet};

use bevy::prelude::*;

use super::input_source::{InputPose, InputRole, InputSourceDescriptor, InputSourceId};
use super::subscription::{HitTestRequestId, ListenerScope, Registration, SubscriptionSet};
use crate::rpc::web_rpc::HostBridge;

/// Where results of a hit-test stream are routed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HitTestTarget {
    /// Viewer-space stream driving the shared AR reticle.
    Reticle,
    /// Stream bound to one controller's ray.
    Source(InputSourceId),
}

/// Per-source record owned by the tracker.
#[derive(Debug)]
pub struct TrackedInputSource {
    pub descriptor: InputSourceDescriptor,
    pub role: InputRole,
    pub pose: Option<InputPose>,
    pub axes: Vec<f32>,
    pub controller: Option<Entity>,
    pub toucher: Option<Entity>,
    /// Latest point the source's ray touches (hit-test or floor plane).
    pub touch_point: Option<Vec3>,
    visualized: bool,
    hit_test_started: bool,
    subscriptions: SubscriptionSet,
}

impl TrackedInputSource {
    fn new(descriptor: InputSourceDescriptor) -> Self {
        Self {
            role: descriptor.role(),
            descriptor,
            pose: None,
            axes: Vec::new(),
            controller: None,
            toucher: None,
            touch_point: None,
            visualized: false,
            hit_test_started: false,
            subscriptions: SubscriptionSet::default(),
        }
    }

    pub fn id(&self) -> InputSourceId {
        self.descriptor.id
    }

    pub fn is_visualized(&self) -> bool {
        self.visualized
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }
}

/// Tracks XR input sources and every registration made for them.
///
/// All mutation is bookkeeping; effects that need the world (despawning
/// proxies, cancelling host hit-test streams) are queued and applied by
/// [`apply_tracker_releases`].
#[derive(Resource, Debug, Default)]
pub struct InputSourceTracker {
    sources: HashMap<InputSourceId, TrackedInputSource>,
    session: SubscriptionSet,
    reticle_hit_test_started: bool,
    listeners: HashSet<ListenerScope>,
    follows: HashSet<InputSourceId>,
    hit_tests: HashMap<HitTestRequestId, HitTestTarget>,
    /// Streams already cancelled at the host. Request ids are never reused.
    cancelled_hit_tests: HashSet<HitTestRequestId>,
    next_request: u64,
    pending_releases: Vec<Registration>,
}

impl InputSourceTracker {
    /// Start tracking a source. Repeated notifications for the same id keep
    /// the existing record.
    pub fn on_source_added(&mut self, descriptor: InputSourceDescriptor) -> InputRole {
        let id = descriptor.id;
        self.sources
            .entry(id)
            .or_insert_with(|| TrackedInputSource::new(descriptor))
            .role
    }

    /// Stop tracking a source and release everything registered for it.
    pub fn on_source_removed(&mut self, id: InputSourceId) -> bool {
        let Some(mut source) = self.sources.remove(&id) else {
            return false;
        };
        for registration in source.subscriptions.drain() {
            self.release(registration);
        }
        true
    }

    pub fn source(&self, id: InputSourceId) -> Option<&TrackedInputSource> {
        self.sources.get(&id)
    }

    pub fn sources(&self) -> impl Iterator<Item = &TrackedInputSource> {
        self.sources.values()
    }

    pub fn update_pose(&mut self, id: InputSourceId, pose: InputPose, axes: Option<Vec<f32>>) {
        if let Some(source) = self.sources.get_mut(&id) {
            source.pose = Some(pose);
            if let Some(axes) = axes {
                source.axes = axes;
            }
        }
    }

    /// Claim the right to build visual proxies for `id`. Only the first call
    /// for a tracked controller-like source returns true.
    pub fn begin_visuals(&mut self, id: InputSourceId) -> bool {
        match self.sources.get_mut(&id) {
            Some(source) if source.role.is_controller() && !source.visualized => {
                source.visualized = true;
                true
            }
            _ => false,
        }
    }

    /// Record proxy entities spawned for `id` so they are despawned on cleanup.
    pub fn attach_proxies(&mut self, id: InputSourceId, controller: Option<Entity>, toucher: Option<Entity>) {
        let Some(source) = self.sources.get_mut(&id) else {
            // Source vanished between spawn and attach.
            self.pending_releases
                .extend(controller.into_iter().chain(toucher).map(Registration::ProxyEntity));
            return;
        };
        if let Some(entity) = controller {
            source.controller = Some(entity);
            source.subscriptions.register(Registration::ProxyEntity(entity));
        }
        if let Some(entity) = toucher {
            source.toucher = Some(entity);
            source.subscriptions.register(Registration::ProxyEntity(entity));
        }
    }

    /// Have the source's proxies follow its pose each frame.
    pub fn follow(&mut self, id: InputSourceId) -> bool {
        let Some(source) = self.sources.get_mut(&id) else {
            return false;
        };
        if self.follows.insert(id) {
            source.subscriptions.register(Registration::FrameFollow(id));
        }
        true
    }

    pub fn followed(&self) -> impl Iterator<Item = &TrackedInputSource> {
        self.follows.iter().filter_map(|id| self.sources.get(id))
    }

    /// Register a select listener. Session listeners live until teardown,
    /// source listeners until that source goes away.
    pub fn listen(&mut self, scope: ListenerScope) -> bool {
        if self.listeners.contains(&scope) {
            return true;
        }
        let set = match scope {
            ListenerScope::Session => &mut self.session,
            ListenerScope::Source(id) => match self.sources.get_mut(&id) {
                Some(source) => &mut source.subscriptions,
                None => return false,
            },
        };
        set.register(Registration::SelectListener(scope));
        self.listeners.insert(scope);
        true
    }

    pub fn is_listening(&self, scope: ListenerScope) -> bool {
        self.listeners.contains(&scope)
    }

    /// Allocate a hit-test stream for `target`, at most once per target.
    pub fn begin_hit_test(&mut self, target: HitTestTarget) -> Option<HitTestRequestId> {
        let set = match target {
            HitTestTarget::Reticle => {
                if self.reticle_hit_test_started {
                    return None;
                }
                self.reticle_hit_test_started = true;
                &mut self.session
            }
            HitTestTarget::Source(id) => {
                let source = self.sources.get_mut(&id)?;
                if source.hit_test_started {
                    return None;
                }
                source.hit_test_started = true;
                &mut source.subscriptions
            }
        };
        self.next_request += 1;
        let request = HitTestRequestId(self.next_request);
        set.register(Registration::HitTestStream(request));
        self.hit_tests.insert(request, target);
        Some(request)
    }

    pub fn hit_test_target(&self, request: HitTestRequestId) -> Option<HitTestTarget> {
        self.hit_tests.get(&request).copied()
    }

    /// Forget a stream the host failed to create; nothing to cancel remotely.
    pub fn hit_test_failed(&mut self, request: HitTestRequestId) -> Option<HitTestTarget> {
        let target = self.hit_tests.remove(&request)?;
        let stream = Registration::HitTestStream(request);
        match target {
            HitTestTarget::Reticle => {
                self.session.cancel_where(|r| *r == stream);
            }
            HitTestTarget::Source(id) => {
                if let Some(source) = self.sources.get_mut(&id) {
                    source.subscriptions.cancel_where(|r| *r == stream);
                }
            }
        }
        Some(target)
    }

    /// Record that the host is told to drop `request`. Only the first call
    /// for a request returns true.
    pub fn mark_hit_test_cancelled(&mut self, request: HitTestRequestId) -> bool {
        self.cancelled_hit_tests.insert(request)
    }

    pub fn set_touch_point(&mut self, id: InputSourceId, point: Vec3) -> Option<Entity> {
        let source = self.sources.get_mut(&id)?;
        source.touch_point = Some(point);
        source.toucher
    }

    /// Release every placement registration (listeners, streams, follows,
    /// proxies). Source records stay so locomotion can keep reading axes.
    pub fn release_placement_helpers(&mut self) {
        let mut released = self.session.drain();
        for source in self.sources.values_mut() {
            released.extend(source.subscriptions.drain());
            source.controller = None;
            source.toucher = None;
            source.touch_point = None;
        }
        for registration in released {
            self.release(registration);
        }
    }

    /// Session end: release everything and forget all sources.
    pub fn end_session(&mut self) {
        self.release_placement_helpers();
        self.sources.clear();
        self.reticle_hit_test_started = false;
    }

    /// Drain releases that need world or host access.
    pub fn take_releases(&mut self) -> Vec<Registration> {
        std::mem::take(&mut self.pending_releases)
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub fn follow_count(&self) -> usize {
        self.follows.len()
    }

    pub fn hit_test_count(&self) -> usize {
        self.hit_tests.len()
    }

    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    fn release(&mut self, registration: Registration) {
        match registration {
            Registration::SelectListener(scope) => {
                if !self.listeners.remove(&scope) {
                    debug!("Select listener {:?} already released", scope);
                }
            }
            Registration::FrameFollow(id) => {
                self.follows.remove(&id);
            }
            Registration::HitTestStream(request) => {
                if self.hit_tests.remove(&request).is_some() {
                    self.pending_releases.push(registration);
                }
            }
            Registration::ProxyEntity(_) => self.pending_releases.push(registration),
        }
    }
}

/// Apply queued releases: despawn proxies and cancel host hit-test streams.
/// Each release is independent, a missing entity or stream does not stop
/// the rest.
pub fn apply_tracker_releases(
    mut tracker: ResMut<InputSourceTracker>,
    mut commands: Commands,
    mut bridge: ResMut<HostBridge>,
) {
    for registration in tracker.take_releases() {
        match registration {
            Registration::ProxyEntity(entity) => {
                commands.entity(entity).try_despawn();
            }
            Registration::HitTestStream(request) => {
                if tracker.mark_hit_test_cancelled(request) {
                    bridge.send_notification(
                        "hit_test_cancel",
                        serde_json::json!({ "request": request.0 }),
                    );
                }
            }
            Registration::SelectListener(_) | Registration::FrameFollow(_) => {}
        }
    }
}
