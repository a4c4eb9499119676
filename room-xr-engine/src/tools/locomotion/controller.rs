use std::collections::{HashMap, HashSet};

use bevy::prelude::*;
use constants::locomotion::{
    DEAD_ZONE, LEFT_X_AXES, LEFT_Y_AXES, RIGHT_X_AXES, RIGHT_Y_AXES, ROTATE_RESET_THRESHOLD,
    ROTATE_THRESHOLD, SMOOTH_ROTATE_SPEED_DEG, SNAP_ANGLE_DEG, VIEWER_MOVEMENT_SPEED,
};

use super::axes::{AxisMapping, infer_axis_mapping, read_axis, read_axis_any};
use super::gamepads::{GamepadSnapshot, PlatformGamepads};
use crate::engine::math::spatial::{
    camera_relative_translation, world_vector_to_parent, yaw_about_pivot,
};
use crate::engine::scene::room::RoomAnchor;
use crate::tools::placement::systems::PlacementCompleted;
use crate::xr::camera::XrCamera;
use crate::xr::input_source::{Handedness, InputSourceEvent, InputSourceId};
use crate::xr::session::{XrSession, XrSessionEvent};
use crate::xr::tracker::InputSourceTracker;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YawMode {
    Snap,
    Smooth,
}

/// Point the room yaws around.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationPivot {
    /// Live camera position; the viewer stays put relative to the room.
    AroundCamera,
    AnchorOrigin,
}

/// Axis indices for XR controller gamepads, each a (primary, fallback) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XrAxesRemap {
    pub left_x: [usize; 2],
    pub left_y: [usize; 2],
    pub right_x: [usize; 2],
    pub right_y: [usize; 2],
}

impl Default for XrAxesRemap {
    fn default() -> Self {
        Self {
            left_x: LEFT_X_AXES,
            left_y: LEFT_Y_AXES,
            right_x: RIGHT_X_AXES,
            right_y: RIGHT_Y_AXES,
        }
    }
}

#[derive(Resource, Debug, Clone)]
pub struct LocomotionSettings {
    /// Metres per second.
    pub speed: f32,
    pub yaw_mode: YawMode,
    pub snap_angle_deg: f32,
    pub rotate_threshold: f32,
    pub rotate_reset_threshold: f32,
    /// Degrees per second at full deflection.
    pub smooth_speed_deg: f32,
    pub dead_zone: f32,
    pub pivot: RotationPivot,
    pub gamepad_fallback: bool,
    pub gamepad_index: usize,
    pub remap: XrAxesRemap,
    /// Skips layout inference for platform gamepads.
    pub explicit_mapping: Option<AxisMapping>,
}

impl Default for LocomotionSettings {
    fn default() -> Self {
        Self {
            speed: VIEWER_MOVEMENT_SPEED,
            yaw_mode: YawMode::Snap,
            snap_angle_deg: SNAP_ANGLE_DEG,
            rotate_threshold: ROTATE_THRESHOLD,
            rotate_reset_threshold: ROTATE_RESET_THRESHOLD,
            smooth_speed_deg: SMOOTH_ROTATE_SPEED_DEG,
            dead_zone: DEAD_ZONE,
            pivot: RotationPivot::AroundCamera,
            gamepad_fallback: true,
            gamepad_index: 0,
            remap: XrAxesRemap::default(),
            explicit_mapping: None,
        }
    }
}

/// Snap-turn state with hysteresis: after firing, the axis has to come
/// back inside the reset threshold before it can fire again.
#[derive(Debug, Default, Clone, Copy)]
pub struct SnapRotation {
    last_sign: f32,
}

impl SnapRotation {
    /// Returns the turn direction (+1 / -1) when a snap fires.
    pub fn update(&mut self, axis: f32, fire: f32, reset: f32) -> Option<f32> {
        if (self.last_sign > 0.0 && axis < reset) || (self.last_sign < 0.0 && axis > -reset) {
            self.last_sign = 0.0;
        }
        if self.last_sign == 0.0 && axis.abs() > fire {
            self.last_sign = axis.signum();
            return Some(self.last_sign);
        }
        None
    }
}

/// One thing the anchor should do this frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LocomotionStep {
    /// Sign-corrected stick direction, rotated into camera space on apply.
    Move(Vec2),
    Yaw(f32),
}

/// Analog locomotion for the placed room.
#[derive(Resource, Debug, Default)]
pub struct XrLocomotion {
    enabled: bool,
    /// Per-frame update and add/remove tracking are live.
    registered: bool,
    controllers: HashSet<InputSourceId>,
    snap: SnapRotation,
    mappings: HashMap<String, AxisMapping>,
}

impl XrLocomotion {
    pub fn enable(&mut self) {
        self.enabled = true;
        self.registered = true;
        info!("Locomotion enabled");
    }

    pub fn disable(&mut self) {
        self.enabled = false;
        info!("Locomotion disabled");
    }

    /// Drop every registration; a later `enable` starts from scratch.
    pub fn destroy(&mut self) {
        self.enabled = false;
        self.registered = false;
        self.controllers.clear();
        self.mappings.clear();
        self.snap = SnapRotation::default();
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_registered(&self) -> bool {
        self.registered
    }

    pub fn controller_count(&self) -> usize {
        self.controllers.len()
    }

    pub fn on_source_added(&mut self, id: InputSourceId) {
        if self.registered {
            self.controllers.insert(id);
        }
    }

    pub fn on_source_removed(&mut self, id: InputSourceId) {
        self.controllers.remove(&id);
    }

    pub fn tracks(&self, id: InputSourceId) -> bool {
        self.controllers.contains(&id)
    }

    /// Cached layout for a platform gamepad; inferred on first sight.
    pub fn mapping_for(&mut self, pad: &GamepadSnapshot, explicit: Option<AxisMapping>) -> AxisMapping {
        if let Some(mapping) = explicit {
            return mapping;
        }
        *self.mappings.entry(pad.id.clone()).or_insert_with(|| {
            let mapping = infer_axis_mapping(&pad.axes);
            info!(
                "Gamepad '{}' ({} axes): move {:?}, yaw {}",
                pad.id,
                pad.axes.len(),
                [mapping.move_x, mapping.move_y],
                mapping.yaw
            );
            mapping
        })
    }

    fn rotation_from_axis(&mut self, settings: &LocomotionSettings, axis: f32, dt: f32) -> Option<f32> {
        match settings.yaw_mode {
            YawMode::Smooth => (axis != 0.0).then(|| axis * settings.smooth_speed_deg * dt),
            YawMode::Snap => self
                .snap
                .update(axis, settings.rotate_threshold, settings.rotate_reset_threshold)
                .map(|sign| sign * settings.snap_angle_deg),
        }
    }

    /// Turn one frame of analog input into anchor steps.
    ///
    /// XR controllers win: left hand moves, right hand yaws. Platform
    /// gamepads are read only when no XR controller supplied axes.
    pub fn frame_steps(
        &mut self,
        settings: &LocomotionSettings,
        xr_sources: &[(Handedness, &[f32])],
        fallback: Option<&GamepadSnapshot>,
        dt: f32,
    ) -> Vec<LocomotionStep> {
        let mut steps = Vec::new();
        let dz = settings.dead_zone;
        let mut consumed = false;

        for (handedness, axes) in xr_sources {
            if axes.is_empty() {
                continue;
            }
            match handedness {
                Handedness::Left => {
                    let x = -read_axis_any(axes, settings.remap.left_x, dz);
                    let y = -read_axis_any(axes, settings.remap.left_y, dz);
                    steps.push(LocomotionStep::Move(Vec2::new(x, y)));
                    consumed = true;
                }
                Handedness::Right => {
                    let x = read_axis_any(axes, settings.remap.right_x, dz);
                    if let Some(degrees) = self.rotation_from_axis(settings, x, dt) {
                        steps.push(LocomotionStep::Yaw(degrees));
                    }
                    consumed = true;
                }
                Handedness::None => {}
            }
        }

        if consumed || !settings.gamepad_fallback {
            return steps;
        }
        let Some(pad) = fallback else {
            return steps;
        };

        let mapping = self.mapping_for(pad, settings.explicit_mapping);
        let x = -read_axis(&pad.axes, mapping.move_x, dz);
        let y = -read_axis(&pad.axes, mapping.move_y, dz);
        steps.push(LocomotionStep::Move(Vec2::new(x, y)));
        let yaw = read_axis(&pad.axes, mapping.yaw, dz);
        if let Some(degrees) = self.rotation_from_axis(settings, yaw, dt) {
            steps.push(LocomotionStep::Yaw(degrees));
        }
        steps
    }
}

/// Hand-off from placement: start walking once the room is placed.
pub fn enable_after_placement(
    mut events: EventReader<PlacementCompleted>,
    mut locomotion: ResMut<XrLocomotion>,
    tracker: Res<InputSourceTracker>,
) {
    if events.read().last().is_none() {
        return;
    }
    locomotion.enable();
    for source in tracker.sources() {
        locomotion.on_source_added(source.id());
    }
}

pub fn track_locomotion_sources(
    mut events: EventReader<InputSourceEvent>,
    mut locomotion: ResMut<XrLocomotion>,
) {
    for event in events.read() {
        match event {
            InputSourceEvent::Added(descriptor) => locomotion.on_source_added(descriptor.id),
            InputSourceEvent::Removed(id) => locomotion.on_source_removed(*id),
            InputSourceEvent::Pose { .. } => {}
        }
    }
}

/// Apply one frame of locomotion to the room anchor.
#[allow(clippy::too_many_arguments)]
pub fn apply_locomotion(
    time: Res<Time>,
    session: Res<XrSession>,
    settings: Res<LocomotionSettings>,
    mut locomotion: ResMut<XrLocomotion>,
    tracker: Res<InputSourceTracker>,
    gamepads: Res<PlatformGamepads>,
    cameras: Query<&GlobalTransform, With<XrCamera>>,
    globals: Query<&GlobalTransform, Without<RoomAnchor>>,
    mut anchors: Query<(&mut Transform, Option<&ChildOf>), With<RoomAnchor>>,
) {
    if !locomotion.is_registered() || !locomotion.is_enabled() || !session.is_active() {
        return;
    }
    let Ok(camera) = cameras.single() else {
        return;
    };
    let Ok((mut transform, child_of)) = anchors.single_mut() else {
        return;
    };

    let sources: Vec<(Handedness, &[f32])> = tracker
        .sources()
        .filter(|source| source.role.is_controller() && locomotion.tracks(source.id()))
        .map(|source| (source.role.handedness(), source.axes.as_slice()))
        .collect();
    let fallback = gamepads.select(settings.gamepad_index);

    let dt = time.delta_secs();
    let steps = locomotion.frame_steps(&settings, &sources, fallback, dt);
    if steps.is_empty() {
        return;
    }

    let parent = child_of.and_then(|child_of| globals.get(child_of.parent()).ok());
    let forward = *camera.forward();
    let pivot = camera.translation();

    for step in steps {
        match step {
            LocomotionStep::Move(input) => {
                if let Some(delta) = camera_relative_translation(input, forward, settings.speed, dt) {
                    transform.translation += world_vector_to_parent(delta, parent);
                }
            }
            LocomotionStep::Yaw(degrees) => match settings.pivot {
                RotationPivot::AroundCamera => {
                    *transform = yaw_about_pivot(&transform, parent, pivot, degrees);
                }
                RotationPivot::AnchorOrigin => {
                    transform.rotate_local_y(degrees.to_radians());
                }
            },
        }
    }
}

/// Session end tears locomotion down with everything else.
pub fn destroy_on_session_end(
    mut events: EventReader<XrSessionEvent>,
    mut locomotion: ResMut<XrLocomotion>,
) {
    let ended = events
        .read()
        .filter(|event| matches!(event, XrSessionEvent::Ended))
        .count()
        > 0;
    if ended && locomotion.is_registered() {
        locomotion.destroy();
        info!("Locomotion torn down with the session");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xr::input_source::{InputSourceDescriptor, TargetRayMode};

    const DT: f32 = 0.1;

    fn pad(id: &str, axes: &[f32]) -> GamepadSnapshot {
        GamepadSnapshot {
            id: id.to_string(),
            axes: axes.to_vec(),
        }
    }

    #[test]
    fn snap_hysteresis_waits_for_reset() {
        let mut snap = SnapRotation::default();
        let fired: Vec<_> = [0.6, 0.7, 0.9, 0.3, 0.2, 0.6, -0.8, -0.6, -0.1, -0.6]
            .into_iter()
            .map(|axis| snap.update(axis, 0.5, 0.25))
            .collect();
        assert_eq!(
            fired,
            vec![
                Some(1.0),
                None,
                None,
                None,
                None,
                Some(1.0),
                Some(-1.0),
                None,
                None,
                Some(-1.0)
            ]
        );
    }

    #[test]
    fn left_hand_moves_with_negated_axes() {
        let mut locomotion = XrLocomotion::default();
        let settings = LocomotionSettings::default();
        let axes = [0.0, 0.0, 0.0, -1.0];
        let steps = locomotion.frame_steps(&settings, &[(Handedness::Left, axes.as_slice())], None, DT);
        assert_eq!(steps, vec![LocomotionStep::Move(Vec2::new(0.0, 1.0))]);
    }

    #[test]
    fn right_hand_snaps_once_per_push() {
        let mut locomotion = XrLocomotion::default();
        let settings = LocomotionSettings::default();
        let axes = [0.0, 0.0, -0.9, 0.0];
        let first = locomotion.frame_steps(&settings, &[(Handedness::Right, axes.as_slice())], None, DT);
        let second = locomotion.frame_steps(&settings, &[(Handedness::Right, axes.as_slice())], None, DT);
        assert_eq!(first, vec![LocomotionStep::Yaw(-45.0)]);
        assert!(second.is_empty());
    }

    #[test]
    fn smooth_yaw_scales_with_time() {
        let mut locomotion = XrLocomotion::default();
        let settings = LocomotionSettings {
            yaw_mode: YawMode::Smooth,
            ..default()
        };
        let axes = [0.0, 0.0, 0.5, 0.0];
        let steps = locomotion.frame_steps(&settings, &[(Handedness::Right, axes.as_slice())], None, DT);
        let [LocomotionStep::Yaw(degrees)] = steps.as_slice() else {
            panic!("expected a yaw step, got {:?}", steps);
        };
        assert!((degrees - 0.5 * 120.0 * DT).abs() < 1e-4);
    }

    #[test]
    fn gamepad_fallback_only_without_xr_axes() {
        let mut locomotion = XrLocomotion::default();
        let settings = LocomotionSettings::default();
        let gamepad = pad("pad", &[0.0, -0.8, 0.0, 0.0]);
        let xr_axes = [0.0, 0.0, 0.0, 0.0];

        let with_xr = locomotion.frame_steps(
            &settings,
            &[(Handedness::Left, xr_axes.as_slice())],
            Some(&gamepad),
            DT,
        );
        assert_eq!(with_xr, vec![LocomotionStep::Move(Vec2::ZERO)]);

        let without_xr = locomotion.frame_steps(&settings, &[], Some(&gamepad), DT);
        assert_eq!(without_xr, vec![LocomotionStep::Move(Vec2::new(0.0, 0.8))]);

        let disabled = LocomotionSettings {
            gamepad_fallback: false,
            ..default()
        };
        assert!(locomotion.frame_steps(&disabled, &[], Some(&gamepad), DT).is_empty());
    }

    #[test]
    fn mapping_is_cached_per_gamepad_and_override_wins() {
        let mut locomotion = XrLocomotion::default();
        let first = locomotion.mapping_for(&pad("a", &[0.0, 0.0, 0.7, 0.7]), None);
        // Same id, different snapshot: the cached layout sticks.
        let again = locomotion.mapping_for(&pad("a", &[0.9, 0.9, 0.0, 0.0]), None);
        assert_eq!(first, again);
        assert_eq!((first.move_x, first.move_y), (2, 3));

        let other = locomotion.mapping_for(&pad("b", &[0.9, 0.9, 0.0, 0.0]), None);
        assert_eq!((other.move_x, other.move_y), (0, 1));

        let explicit = AxisMapping { move_x: 4, move_y: 5, yaw: 0 };
        assert_eq!(locomotion.mapping_for(&pad("a", &[0.0; 6]), Some(explicit)), explicit);
    }

    #[test]
    fn destroy_releases_tracking() {
        let mut locomotion = XrLocomotion::default();
        locomotion.on_source_added(InputSourceId(1));
        assert_eq!(locomotion.controller_count(), 0);

        locomotion.enable();
        locomotion.on_source_added(InputSourceId(1));
        assert!(locomotion.tracks(InputSourceId(1)));

        locomotion.destroy();
        locomotion.destroy();
        assert!(!locomotion.is_registered());
        assert_eq!(locomotion.controller_count(), 0);
        locomotion.on_source_added(InputSourceId(2));
        assert_eq!(locomotion.controller_count(), 0);
    }

    #[test]
    fn snap_turn_pivots_around_camera() {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins)
            .init_resource::<LocomotionSettings>()
            .init_resource::<XrLocomotion>()
            .init_resource::<InputSourceTracker>()
            .init_resource::<PlatformGamepads>()
            .insert_resource(XrSession {
                active: true,
                ..default()
            })
            .add_systems(Update, apply_locomotion);

        let camera_transform = Transform::from_xyz(0.5, 1.6, 0.0).looking_to(Vec3::NEG_Z, Vec3::Y);
        app.world_mut()
            .spawn((XrCamera, camera_transform, GlobalTransform::from(camera_transform)));
        let anchor = app
            .world_mut()
            .spawn((RoomAnchor, Transform::from_xyz(0.0, 0.0, -2.0)))
            .id();

        let source = InputSourceId(1);
        {
            let mut tracker = app.world_mut().resource_mut::<InputSourceTracker>();
            tracker.on_source_added(InputSourceDescriptor {
                id: source,
                handedness: Handedness::Right,
                target_ray_mode: TargetRayMode::TrackedPointer,
                profiles: Vec::new(),
            });
            tracker.update_pose(source, default(), Some(vec![0.0, 0.0, 0.9, 0.0]));
        }
        {
            let mut locomotion = app.world_mut().resource_mut::<XrLocomotion>();
            locomotion.enable();
            locomotion.on_source_added(source);
        }

        let before = app.world().get::<Transform>(anchor).copied().unwrap();
        app.update();
        let after = app.world().get::<Transform>(anchor).copied().unwrap();

        let (yaw, _, _) = after.rotation.to_euler(EulerRot::YXZ);
        assert!((yaw.to_degrees() - 45.0).abs() < 1e-3);

        let camera = camera_transform.translation;
        let in_room_before = before.compute_affine().inverse().transform_point3(camera);
        let in_room_after = after.compute_affine().inverse().transform_point3(camera);
        assert!(in_room_before.abs_diff_eq(in_room_after, 1e-4));
    }
}
