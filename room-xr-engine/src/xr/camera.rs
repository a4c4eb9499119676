use bevy::prelude::*;

/// The viewer camera driven by the host's headset / phone pose.
#[derive(Component)]
pub struct XrCamera;

/// Viewer pose for this frame, in world space.
#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct CameraPoseEvent {
    pub position: Vec3,
    pub forward: Vec3,
}

/// Apply the latest host viewer pose to the XR camera.
pub fn apply_camera_pose(
    mut events: EventReader<CameraPoseEvent>,
    mut cameras: Query<&mut Transform, With<XrCamera>>,
) {
    let Some(pose) = events.read().last() else {
        return;
    };
    let Ok(mut transform) = cameras.single_mut() else {
        return;
    };

    transform.translation = pose.position;
    if pose.forward.length_squared() > f32::EPSILON {
        transform.look_to(pose.forward, Vec3::Y);
    }
}
