use bevy::ecs::system::SystemParam;
use bevy::prelude::*;
use constants::placement::{
    CONTROLLER_MODEL_LEFT, CONTROLLER_MODEL_RIGHT, CONTROLLER_PROXY_SIZE, RETICLE_HEIGHT,
    RETICLE_RADIUS,
};
use constants::render_settings::{CONFIRMING_COLOUR, NEUTRAL_COLOUR};

use super::prompt::{PromptCommand, PromptPanel, prompt_text};
use super::state::{PlacementHit, PlacementOutcome, PlacementSession, PlacementStage};
use crate::engine::core::app_state::AppState;
use crate::engine::math::spatial::{ray_plane_intersection, yaw_rotation};
use crate::engine::scene::room::{RoomAnchor, RoomContent};
use crate::rpc::web_rpc::HostBridge;
use crate::xr::hit_test::{HitTestUpdate, request_hit_test};
use crate::xr::input_source::{Handedness, InputSourceId, SelectEvent, SelectPhase, TargetRayMode};
use crate::xr::session::{XrMode, XrSession, XrSessionEvent};
use crate::xr::subscription::ListenerScope;
use crate::xr::tracker::{HitTestTarget, InputSourceTracker};

/// Shared AR reticle following the viewer hit-test stream.
#[derive(Component, Debug, Default)]
pub struct Reticle {
    pub last_hit: Option<Vec3>,
}

/// Marker showing where a controller's ray touches.
#[derive(Component, Debug)]
pub struct Toucher {
    pub source: InputSourceId,
}

/// Controller model or box proxy following a source pose.
#[derive(Component, Debug)]
pub struct ControllerProxy {
    pub source: InputSourceId,
}

/// Raised once the room is anchored and oriented.
#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct PlacementCompleted {
    pub yaw_degrees: f32,
}

#[derive(Resource)]
pub struct PlacementAssets {
    marker_mesh: Handle<Mesh>,
    controller_mesh: Handle<Mesh>,
    neutral: Handle<StandardMaterial>,
    confirming: Handle<StandardMaterial>,
}

pub fn setup_placement_assets(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    commands.insert_resource(PlacementAssets {
        marker_mesh: meshes.add(Cylinder::new(RETICLE_RADIUS, RETICLE_HEIGHT)),
        controller_mesh: meshes.add(Cuboid::from_length(CONTROLLER_PROXY_SIZE)),
        neutral: materials.add(StandardMaterial {
            base_color: NEUTRAL_COLOUR,
            unlit: true,
            ..default()
        }),
        confirming: materials.add(StandardMaterial {
            base_color: CONFIRMING_COLOUR,
            unlit: true,
            ..default()
        }),
    });
}

pub fn spawn_reticle(
    mut commands: Commands,
    assets: Option<Res<PlacementAssets>>,
    existing: Query<(), With<Reticle>>,
) {
    if !existing.is_empty() {
        return;
    }
    let Some(assets) = assets else {
        warn!("Placement assets missing, no reticle spawned");
        return;
    };
    commands.spawn((
        Name::new("reticle"),
        Reticle::default(),
        Mesh3d(assets.marker_mesh.clone()),
        MeshMaterial3d(assets.neutral.clone()),
        Transform::default(),
        Visibility::Hidden,
    ));
}

/// VR goes straight to the controller prompt; AR waits for hit testing.
pub fn show_initial_prompt(session: Res<XrSession>, mut prompts: EventWriter<PromptCommand>) {
    if session.is_mode(XrMode::Vr) {
        prompts.write(PromptCommand::show(
            PromptPanel::Screen3d,
            prompt_text(PlacementStage::AwaitingCenter, true),
        ));
    }
}

/// Once AR hit testing is available, start the viewer stream for the reticle.
pub fn start_reticle_hit_test(
    session: Res<XrSession>,
    placement: Res<PlacementSession>,
    mut tracker: ResMut<InputSourceTracker>,
    mut bridge: ResMut<HostBridge>,
    mut prompts: EventWriter<PromptCommand>,
) {
    if placement.is_locked() || !session.is_mode(XrMode::Ar) || !session.hit_test_available {
        return;
    }
    if request_hit_test(&mut tracker, &mut bridge, HitTestTarget::Reticle).is_some() {
        prompts.write(PromptCommand::show(
            PromptPanel::Screen2d,
            prompt_text(placement.stage(), false),
        ));
    }
}

/// Build visuals for controller-like sources that have none yet.
///
/// AR asks for a per-controller hit-test stream (the toucher appears once it
/// is ready). VR spawns the model and toucher right away and intersects the
/// ray with the floor plane every frame.
#[allow(clippy::too_many_arguments)]
pub fn visualize_controllers(
    mut commands: Commands,
    session: Res<XrSession>,
    placement: Res<PlacementSession>,
    mut tracker: ResMut<InputSourceTracker>,
    mut bridge: ResMut<HostBridge>,
    assets: Option<Res<PlacementAssets>>,
    asset_server: Option<Res<AssetServer>>,
    mut reticles: Query<&mut Visibility, With<Reticle>>,
    mut prompts: EventWriter<PromptCommand>,
) {
    if placement.is_locked() {
        return;
    }

    let pending: Vec<(InputSourceId, Handedness)> = tracker
        .sources()
        .filter(|source| source.role.is_controller() && !source.is_visualized())
        .map(|source| (source.id(), source.role.handedness()))
        .collect();

    for (id, handedness) in pending {
        if !tracker.begin_visuals(id) {
            continue;
        }

        for mut visibility in &mut reticles {
            *visibility = Visibility::Hidden;
        }
        prompts.write(PromptCommand::Hide(PromptPanel::Screen2d));
        prompts.write(PromptCommand::show(
            PromptPanel::Screen3d,
            prompt_text(placement.stage(), true),
        ));

        if session.is_mode(XrMode::Ar) {
            request_hit_test(&mut tracker, &mut bridge, HitTestTarget::Source(id));
            continue;
        }

        let Some(assets) = assets.as_deref() else {
            warn!("Placement assets missing, controller {:?} has no visuals", id);
            continue;
        };
        let controller =
            spawn_controller_model(&mut commands, assets, asset_server.as_deref(), id, handedness);
        let toucher = spawn_toucher(&mut commands, assets, id);
        tracker.attach_proxies(id, Some(controller), Some(toucher));
        tracker.follow(id);
        tracker.listen(ListenerScope::Source(id));
        info!("Controller {:?} ({:?}) visualised", id, handedness);
    }
}

fn spawn_toucher(commands: &mut Commands, assets: &PlacementAssets, source: InputSourceId) -> Entity {
    commands
        .spawn((
            Name::new(format!("toucher {}", source.0)),
            Toucher { source },
            Mesh3d(assets.marker_mesh.clone()),
            MeshMaterial3d(assets.neutral.clone()),
            Transform::default(),
            Visibility::Inherited,
        ))
        .id()
}

fn spawn_controller_model(
    commands: &mut Commands,
    assets: &PlacementAssets,
    asset_server: Option<&AssetServer>,
    source: InputSourceId,
    handedness: Handedness,
) -> Entity {
    let model = match handedness {
        Handedness::Left => Some(CONTROLLER_MODEL_LEFT),
        Handedness::Right => Some(CONTROLLER_MODEL_RIGHT),
        Handedness::None => None,
    };

    let mut entity = commands.spawn((
        Name::new(format!("controller {}", source.0)),
        ControllerProxy { source },
        Transform::default(),
        Visibility::Inherited,
    ));
    match (model, asset_server) {
        (Some(path), Some(server)) => {
            entity.insert(SceneRoot(
                server.load(GltfAssetLabel::Scene(0).from_asset(path)),
            ));
        }
        _ => {
            entity.insert((
                Mesh3d(assets.controller_mesh.clone()),
                MeshMaterial3d(assets.neutral.clone()),
            ));
        }
    }
    entity.id()
}

/// Move the reticle and touchers to the latest hits; register select
/// listeners once their streams are ready.
pub fn apply_hit_test_updates(
    mut commands: Commands,
    mut updates: EventReader<HitTestUpdate>,
    placement: Res<PlacementSession>,
    mut tracker: ResMut<InputSourceTracker>,
    assets: Option<Res<PlacementAssets>>,
    mut reticles: Query<(&mut Reticle, &mut Transform, &mut Visibility)>,
    mut touchers: Query<&mut Transform, (With<Toucher>, Without<Reticle>)>,
) {
    for update in updates.read() {
        if placement.is_locked() {
            continue;
        }
        match *update {
            HitTestUpdate::Ready(HitTestTarget::Reticle) => {
                tracker.listen(ListenerScope::Session);
            }
            HitTestUpdate::Ready(HitTestTarget::Source(id)) => {
                if !tracker.source(id).is_some_and(|source| source.toucher.is_none()) {
                    continue;
                }
                let Some(assets) = assets.as_deref() else {
                    warn!("Placement assets missing, controller {:?} has no toucher", id);
                    continue;
                };
                let toucher = spawn_toucher(&mut commands, assets, id);
                tracker.attach_proxies(id, None, Some(toucher));
                tracker.listen(ListenerScope::Source(id));
            }
            HitTestUpdate::Hit {
                target: HitTestTarget::Reticle,
                position,
                rotation,
            } => {
                let controller_active = tracker.sources().any(|source| source.is_visualized());
                for (mut reticle, mut transform, mut visibility) in &mut reticles {
                    reticle.last_hit = Some(position);
                    transform.translation = position;
                    transform.rotation = rotation;
                    if !controller_active {
                        *visibility = Visibility::Inherited;
                    }
                }
            }
            HitTestUpdate::Hit {
                target: HitTestTarget::Source(id),
                position,
                rotation,
            } => {
                let Some(toucher) = tracker.set_touch_point(id, position) else {
                    continue;
                };
                if let Ok(mut transform) = touchers.get_mut(toucher) {
                    transform.translation = position;
                    transform.rotation = rotation;
                }
            }
        }
    }
}

/// Per-frame follow for VR controllers: proxies track the pose and the
/// toucher sits where the ray meets the floor at the anchor's height.
pub fn follow_controllers(
    session: Res<XrSession>,
    placement: Res<PlacementSession>,
    mut tracker: ResMut<InputSourceTracker>,
    anchors: Query<&GlobalTransform, With<RoomAnchor>>,
    mut proxies: Query<&mut Transform, Or<(With<ControllerProxy>, With<Toucher>)>>,
) {
    if !session.is_active() {
        return;
    }
    let plane_y = anchors
        .single()
        .map(|anchor| anchor.translation().y)
        .unwrap_or(0.0);

    let followed: Vec<_> = tracker
        .followed()
        .filter_map(|source| source.pose.map(|pose| (source.id(), pose, source.controller)))
        .collect();

    for (id, pose, controller) in followed {
        if let Some(mut transform) = controller.and_then(|entity| proxies.get_mut(entity).ok()) {
            transform.translation = pose.origin;
            transform.rotation = pose.rotation;
        }

        if placement.is_locked() {
            continue;
        }
        let Some(hit) = ray_plane_intersection(pose.origin, pose.direction, plane_y) else {
            continue;
        };
        if let Some(toucher) = tracker.set_touch_point(id, hit) {
            if let Ok(mut transform) = proxies.get_mut(toucher) {
                transform.translation = hit;
            }
        }
    }
}

/// Entities placement moves, reveals or recolours.
#[derive(SystemParam)]
pub struct PlacementScene<'w, 's> {
    anchors: Query<'w, 's, &'static mut Transform, With<RoomAnchor>>,
    content: Query<'w, 's, &'static mut Visibility, (With<RoomContent>, Without<Reticle>)>,
    reticles: Query<'w, 's, (Entity, &'static mut Reticle, &'static mut Visibility), Without<RoomContent>>,
    markers: Query<'w, 's, &'static mut MeshMaterial3d<StandardMaterial>, Or<(With<Reticle>, With<Toucher>)>>,
    assets: Option<Res<'w, PlacementAssets>>,
}

impl PlacementScene<'_, '_> {
    fn set_feedback(&mut self, entity: Option<Entity>, confirming: bool) {
        let Some(assets) = self.assets.as_deref() else {
            return;
        };
        let Some(mut material) = entity.and_then(|entity| self.markers.get_mut(entity).ok()) else {
            return;
        };
        material.0 = if confirming {
            assets.confirming.clone()
        } else {
            assets.neutral.clone()
        };
    }

    fn move_anchor(&mut self, position: Vec3) {
        for mut transform in &mut self.anchors {
            transform.translation = position;
        }
    }

    fn orient_anchor(&mut self, yaw_degrees: f32) {
        for mut transform in &mut self.anchors {
            transform.rotation = yaw_rotation(yaw_degrees);
        }
    }

    fn set_content_visible(&mut self, visible: bool) {
        for mut visibility in &mut self.content {
            *visibility = if visible {
                Visibility::Inherited
            } else {
                Visibility::Hidden
            };
        }
    }

    fn hide_reticle(&mut self) {
        for (_, _, mut visibility) in &mut self.reticles {
            *visibility = Visibility::Hidden;
        }
    }

    fn forget_reticle_hit(&mut self) {
        for (_, mut reticle, _) in &mut self.reticles {
            reticle.last_hit = None;
        }
    }
}

/// What a select from a given source refers to.
struct SelectTarget {
    point: Option<Vec3>,
    feedback: Option<Entity>,
    controller: bool,
}

fn resolve_select_target(
    tracker: &InputSourceTracker,
    reticle: Option<(Entity, &Reticle)>,
    source: InputSourceId,
) -> Option<SelectTarget> {
    let tracked = tracker.source(source)?;
    if tracker.is_listening(ListenerScope::Source(source)) {
        return Some(SelectTarget {
            point: tracked.touch_point,
            feedback: tracked.toucher,
            controller: true,
        });
    }
    // Session selects only count for screen taps; gaze sources never place.
    if tracked.descriptor.target_ray_mode == TargetRayMode::Screen
        && tracker.is_listening(ListenerScope::Session)
    {
        return Some(SelectTarget {
            point: reticle.and_then(|(_, reticle)| reticle.last_hit),
            feedback: reticle.map(|(entity, _)| entity),
            controller: false,
        });
    }
    None
}

/// Drive the placement state machine from select gestures.
#[allow(clippy::too_many_arguments)]
pub fn handle_select_events(
    mut selects: EventReader<SelectEvent>,
    mut placement: ResMut<PlacementSession>,
    mut tracker: ResMut<InputSourceTracker>,
    mut scene: PlacementScene,
    mut prompts: EventWriter<PromptCommand>,
    mut completed: EventWriter<PlacementCompleted>,
    mut bridge: ResMut<HostBridge>,
    mut next_state: ResMut<NextState<AppState>>,
) {
    for select in selects.read() {
        if placement.is_locked() {
            continue;
        }
        let reticle = scene
            .reticles
            .iter()
            .next()
            .map(|(entity, reticle, _)| (entity, reticle));
        let Some(target) = resolve_select_target(&tracker, reticle, select.source) else {
            continue;
        };

        match select.phase {
            SelectPhase::Start => scene.set_feedback(target.feedback, true),
            SelectPhase::End => scene.set_feedback(target.feedback, false),
            SelectPhase::Select => {
                let Some(position) = target.point else {
                    debug!("Select from {:?} before any touch point", select.source);
                    continue;
                };

                match placement.advance(PlacementHit::at(position)) {
                    PlacementOutcome::CenterPicked(center) => {
                        info!("Room center picked at {:?}", center);
                        scene.move_anchor(center);
                        let panel = if target.controller {
                            PromptPanel::Screen3d
                        } else {
                            PromptPanel::Screen2d
                        };
                        prompts.write(PromptCommand::show(
                            panel,
                            prompt_text(PlacementStage::AwaitingDirection, target.controller),
                        ));
                    }
                    PlacementOutcome::DegenerateDirection => {
                        debug!("Direction pick too close to the center, ignored");
                    }
                    PlacementOutcome::Locked { yaw_degrees } => {
                        info!("Room placed, facing {:.1}°", yaw_degrees);
                        scene.orient_anchor(yaw_degrees);
                        scene.set_content_visible(true);
                        scene.hide_reticle();
                        tracker.release_placement_helpers();
                        prompts.write(PromptCommand::Hide(PromptPanel::Screen2d));
                        prompts.write(PromptCommand::Hide(PromptPanel::Screen3d));
                        completed.write(PlacementCompleted { yaw_degrees });
                        bridge.send_notification(
                            "placement_completed",
                            serde_json::json!({ "yaw_degrees": yaw_degrees }),
                        );
                        next_state.set(AppState::Exploring);
                    }
                    PlacementOutcome::Ignored => {}
                }
            }
        }
    }
}

/// A new session places the room from scratch.
pub fn reset_placement_on_session_end(
    mut events: EventReader<XrSessionEvent>,
    mut placement: ResMut<PlacementSession>,
    mut scene: PlacementScene,
    mut prompts: EventWriter<PromptCommand>,
) {
    let ended = events
        .read()
        .filter(|event| matches!(event, XrSessionEvent::Ended))
        .count()
        > 0;
    if !ended {
        return;
    }

    *placement = PlacementSession::default();
    scene.set_content_visible(false);
    scene.hide_reticle();
    scene.forget_reticle_hit();
    prompts.write(PromptCommand::Hide(PromptPanel::Screen2d));
    prompts.write(PromptCommand::Hide(PromptPanel::Screen3d));
    debug!("Placement reset for the next session");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xr::input_source::InputSourceDescriptor;
    use bevy::state::app::StatesPlugin;

    fn app() -> App {
        let mut app = App::new();
        app.add_plugins((MinimalPlugins, StatesPlugin))
            .insert_state(AppState::Placing)
            .init_resource::<PlacementSession>()
            .init_resource::<InputSourceTracker>()
            .init_resource::<HostBridge>()
            .add_event::<SelectEvent>()
            .add_event::<PromptCommand>()
            .add_event::<PlacementCompleted>()
            .add_systems(Update, handle_select_events);
        app
    }

    fn add_source(app: &mut App, id: u32, mode: TargetRayMode, hand: Handedness) -> InputSourceId {
        let id = InputSourceId(id);
        app.world_mut()
            .resource_mut::<InputSourceTracker>()
            .on_source_added(InputSourceDescriptor {
                id,
                handedness: hand,
                target_ray_mode: mode,
                profiles: Vec::new(),
            });
        id
    }

    fn select_at(app: &mut App, source: InputSourceId, point: Option<Vec3>) {
        if let Some(point) = point {
            app.world_mut()
                .resource_mut::<InputSourceTracker>()
                .set_touch_point(source, point);
        }
        app.world_mut().send_event(SelectEvent {
            source,
            phase: SelectPhase::Select,
        });
        app.update();
    }

    #[test]
    fn controller_picks_center_then_direction() {
        let mut app = app();
        let anchor = app.world_mut().spawn((RoomAnchor, Transform::default())).id();
        let content = app.world_mut().spawn((RoomContent, Visibility::Hidden)).id();
        let source = add_source(&mut app, 1, TargetRayMode::TrackedPointer, Handedness::Right);
        app.world_mut()
            .resource_mut::<InputSourceTracker>()
            .listen(ListenerScope::Source(source));

        select_at(&mut app, source, Some(Vec3::ZERO));
        assert_eq!(
            app.world().resource::<PlacementSession>().stage(),
            PlacementStage::AwaitingDirection
        );

        select_at(&mut app, source, Some(Vec3::new(1.0, 0.0, 1.0)));
        let placement = app.world().resource::<PlacementSession>();
        assert!(placement.is_locked());

        let rotation = app.world().get::<Transform>(anchor).unwrap().rotation;
        let (yaw, _, _) = rotation.to_euler(EulerRot::YXZ);
        assert!((yaw.to_degrees() - 45.0).abs() < 1e-3);
        assert_eq!(app.world().get::<Visibility>(content), Some(&Visibility::Inherited));
        assert_eq!(app.world().resource::<InputSourceTracker>().listener_count(), 0);

        let completed: Vec<_> = app
            .world_mut()
            .resource_mut::<Events<PlacementCompleted>>()
            .drain()
            .collect();
        assert_eq!(completed.len(), 1);
        assert!(
            app.world()
                .resource::<HostBridge>()
                .pending_notifications()
                .iter()
                .any(|n| n.method == "placement_completed")
        );

        // Further selects are ignored once locked.
        select_at(&mut app, source, Some(Vec3::new(-3.0, 0.0, 0.0)));
        assert_eq!(
            app.world().resource::<PlacementSession>().center(),
            Some(Vec3::ZERO)
        );
    }

    #[test]
    fn direction_on_center_keeps_waiting() {
        let mut app = app();
        let anchor = app.world_mut().spawn((RoomAnchor, Transform::default())).id();
        let source = add_source(&mut app, 1, TargetRayMode::TrackedPointer, Handedness::Left);
        app.world_mut()
            .resource_mut::<InputSourceTracker>()
            .listen(ListenerScope::Source(source));

        select_at(&mut app, source, Some(Vec3::new(0.5, 0.0, 0.5)));
        select_at(&mut app, source, Some(Vec3::new(0.5, 1.0, 0.5)));

        assert_eq!(
            app.world().resource::<PlacementSession>().stage(),
            PlacementStage::AwaitingDirection
        );
        let transform = app.world().get::<Transform>(anchor).unwrap();
        assert_eq!(transform.translation, Vec3::new(0.5, 0.0, 0.5));
        assert_eq!(transform.rotation, Quat::IDENTITY);
    }

    #[test]
    fn selects_without_listener_or_hit_are_ignored() {
        let mut app = app();
        let touch = add_source(&mut app, 2, TargetRayMode::Screen, Handedness::None);
        // No session listener registered yet.
        select_at(&mut app, touch, Some(Vec3::ZERO));
        assert_eq!(
            app.world().resource::<PlacementSession>().stage(),
            PlacementStage::AwaitingCenter
        );

        // Listener registered but the reticle has not seen a hit.
        app.world_mut()
            .resource_mut::<InputSourceTracker>()
            .listen(ListenerScope::Session);
        app.world_mut().spawn((Reticle::default(), Visibility::Hidden));
        select_at(&mut app, touch, None);
        assert_eq!(
            app.world().resource::<PlacementSession>().stage(),
            PlacementStage::AwaitingCenter
        );
    }

    #[test]
    fn gaze_select_does_not_use_the_reticle() {
        let mut app = app();
        app.world_mut().spawn((RoomAnchor, Transform::default()));
        let gaze = add_source(&mut app, 3, TargetRayMode::Gaze, Handedness::None);
        app.world_mut()
            .resource_mut::<InputSourceTracker>()
            .listen(ListenerScope::Session);
        app.world_mut().spawn((
            Reticle {
                last_hit: Some(Vec3::new(0.0, 0.0, -2.0)),
            },
            Visibility::Inherited,
        ));

        select_at(&mut app, gaze, None);
        assert_eq!(
            app.world().resource::<PlacementSession>().stage(),
            PlacementStage::AwaitingCenter
        );
    }

    #[test]
    fn screen_tap_uses_reticle_hit() {
        let mut app = app();
        app.world_mut().spawn((RoomAnchor, Transform::default()));
        let touch = add_source(&mut app, 2, TargetRayMode::Screen, Handedness::None);
        app.world_mut()
            .resource_mut::<InputSourceTracker>()
            .listen(ListenerScope::Session);
        app.world_mut().spawn((
            Reticle {
                last_hit: Some(Vec3::new(0.0, 0.0, -2.0)),
            },
            Visibility::Inherited,
        ));

        select_at(&mut app, touch, None);
        assert_eq!(
            app.world().resource::<PlacementSession>().center(),
            Some(Vec3::new(0.0, 0.0, -2.0))
        );
    }
}
