use bevy::prelude::*;
use constants::placement::{MIN_DIRECTION_LENGTH_SQ, RAY_PLANE_PARALLEL_EPSILON};

/// Intersect a ray with the horizontal plane `y = plane_y`.
///
/// Rays running (nearly) parallel to the plane, or pointing away from it,
/// have no usable hit.
pub fn ray_plane_intersection(origin: Vec3, direction: Vec3, plane_y: f32) -> Option<Vec3> {
    let dy = direction.y;
    if dy.abs() < RAY_PLANE_PARALLEL_EPSILON {
        return None;
    }
    let t = (plane_y - origin.y) / dy;
    if t <= 0.0 {
        return None;
    }
    Some(origin + direction * t)
}

/// Vector from `from` to `to` with the vertical component dropped.
pub fn horizontal_direction(from: Vec3, to: Vec3) -> Vec3 {
    let mut dir = to - from;
    dir.y = 0.0;
    dir
}

/// Yaw in degrees that faces along `dir` on the XZ plane, `atan2(x, z)`.
/// Returns `None` for a degenerate (near zero length) direction.
pub fn yaw_from_direction(dir: Vec3) -> Option<f32> {
    let flat = Vec3::new(dir.x, 0.0, dir.z);
    if flat.length_squared() < MIN_DIRECTION_LENGTH_SQ {
        return None;
    }
    let flat = flat.normalize();
    Some(flat.x.atan2(flat.z).to_degrees())
}

/// Rotation equivalent to euler angles (0, yaw, 0).
pub fn yaw_rotation(yaw_degrees: f32) -> Quat {
    Quat::from_rotation_y(yaw_degrees.to_radians())
}

/// Convert a world-space direction into the parent space of an entity.
pub fn world_vector_to_parent(vector: Vec3, parent: Option<&GlobalTransform>) -> Vec3 {
    match parent {
        Some(parent) => parent.affine().inverse().transform_vector3(vector),
        None => vector,
    }
}

/// Yaw `local` by `degrees` about a world-space pivot.
///
/// The world yaw is re-expressed in the parent's frame
/// (`parent⁻¹ · yaw · parent`) and the pivot is projected into parent space,
/// so the pivot keeps the same position relative to the rotated entity.
pub fn yaw_about_pivot(
    local: &Transform,
    parent: Option<&GlobalTransform>,
    pivot_world: Vec3,
    degrees: f32,
) -> Transform {
    let yaw_world = yaw_rotation(degrees);

    let (parent_rotation, pivot_local) = match parent {
        Some(parent) => (
            parent.rotation(),
            parent.affine().inverse().transform_point3(pivot_world),
        ),
        None => (Quat::IDENTITY, pivot_world),
    };
    let yaw_local = parent_rotation.inverse() * yaw_world * parent_rotation;

    let relative = local.translation - pivot_local;
    let mut rotated = *local;
    rotated.translation = pivot_local + yaw_local * relative;
    rotated.rotation = (yaw_local * local.rotation).normalize();
    rotated
}

/// Planar translation for the room anchor, relative to where the camera faces.
///
/// `input` is the (already sign-corrected) stick direction; only its
/// direction is used, magnitude comes from `speed * dt`.
pub fn camera_relative_translation(
    input: Vec2,
    camera_forward: Vec3,
    speed: f32,
    dt: f32,
) -> Option<Vec3> {
    if input == Vec2::ZERO {
        return None;
    }
    let stick = input.normalize();

    let facing = Vec2::new(camera_forward.x, camera_forward.z);
    if facing.length_squared() == 0.0 {
        return None;
    }
    let facing = facing.normalize();

    let angle = facing.x.atan2(facing.y) - std::f32::consts::FRAC_PI_2;
    let (sin, cos) = angle.sin_cos();
    let x = stick.x * sin - stick.y * cos;
    let z = stick.y * sin + stick.x * cos;
    Some(Vec3::new(x * speed * dt, 0.0, z * speed * dt))
}

/// Sphere against an oriented box given by its transform and half extents.
pub fn sphere_overlaps_box(
    center: Vec3,
    radius: f32,
    box_transform: &GlobalTransform,
    half_extents: Vec3,
) -> bool {
    let local = box_transform.affine().inverse().transform_point3(center);
    let closest = local.clamp(-half_extents, half_extents);
    closest.distance_squared(local) <= radius * radius
}
