use std::time::Duration;

use bevy::prelude::*;
use bevy::render::view::RenderLayers;

use super::ownership::{TriggerId, TriggerOwnership, TriggerTarget};
use crate::engine::math::spatial::sphere_overlaps_box;

/// Box volume that claims room objects while the actor is inside it.
#[derive(Component, Debug, Clone)]
pub struct TriggerVolume {
    pub label: String,
    pub half_extents: Vec3,
    pub targets: Vec<TriggerTarget>,
    pub debounce: Duration,
    /// Actor overlap seen on the last fixed step.
    touching: bool,
}

impl TriggerVolume {
    pub fn new(
        label: impl Into<String>,
        half_extents: Vec3,
        targets: Vec<TriggerTarget>,
        debounce: Duration,
    ) -> Self {
        Self {
            label: label.into(),
            half_extents,
            targets,
            debounce,
            touching: false,
        }
    }

    pub fn is_touching(&self) -> bool {
        self.touching
    }
}

/// The only thing trigger volumes react to: a sphere riding on the camera.
#[derive(Component, Debug, Clone, Copy)]
pub struct TriggerActor {
    pub radius: f32,
}

pub fn register_trigger_volumes(
    ownership: Option<ResMut<TriggerOwnership>>,
    volumes: Query<(Entity, &TriggerVolume)>,
    mut removed: RemovedComponents<TriggerVolume>,
) {
    let Some(mut ownership) = ownership else {
        removed.clear();
        return;
    };
    for entity in removed.read() {
        ownership.unregister(TriggerId(entity));
    }
    for (entity, volume) in &volumes {
        let id = TriggerId(entity);
        if !ownership.is_registered(id) {
            ownership.register(id, volume.label.clone(), volume.targets.clone(), volume.debounce);
            debug!("Trigger '{}' registered with {} targets", volume.label, volume.targets.len());
        }
    }
}

/// Sphere-vs-box containment with edge detection, one raw enter or leave
/// per change.
pub fn detect_trigger_contacts(
    ownership: Option<ResMut<TriggerOwnership>>,
    actors: Query<(&GlobalTransform, &TriggerActor)>,
    mut volumes: Query<(Entity, &GlobalTransform, &mut TriggerVolume)>,
) {
    let Some(mut ownership) = ownership else {
        return;
    };
    for (entity, transform, mut volume) in &mut volumes {
        let id = TriggerId(entity);
        if !ownership.is_registered(id) {
            continue;
        }
        let overlapping = actors.iter().any(|(actor_transform, actor)| {
            sphere_overlaps_box(
                actor_transform.translation(),
                actor.radius,
                transform,
                volume.half_extents,
            )
        });
        if overlapping == volume.touching {
            continue;
        }
        volume.touching = overlapping;
        if overlapping {
            ownership.on_enter(id);
        } else {
            ownership.on_leave(id);
        }
    }
}

/// Debounce runs on real time so it is independent of the fixed tick.
pub fn tick_trigger_debounce(
    time: Res<Time<Real>>,
    ownership: Option<ResMut<TriggerOwnership>>,
    mut objects: Query<&mut Visibility>,
) {
    let Some(mut ownership) = ownership else {
        return;
    };
    ownership.tick(time.delta());

    for (object, visible) in ownership.take_visibility_changes() {
        let Ok(mut visibility) = objects.get_mut(object) else {
            continue;
        };
        *visibility = if visible {
            Visibility::Inherited
        } else {
            Visibility::Hidden
        };
    }
}

/// Apply the frame's layer operations in one go.
pub fn flush_layer_ops(
    ownership: Option<ResMut<TriggerOwnership>>,
    mut layers: Query<&mut RenderLayers>,
) {
    let Some(mut ownership) = ownership else {
        return;
    };
    for (object, layer) in ownership.flush() {
        if let Ok(mut current) = layers.get_mut(object) {
            *current = RenderLayers::layer(layer);
            debug!("Object {object:?} moved to layer {layer}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use constants::triggers::DEFAULT_LAYER;

    fn app() -> App {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins)
            .insert_resource(TriggerOwnership::new(1..=8))
            .add_systems(
                Update,
                (
                    register_trigger_volumes,
                    detect_trigger_contacts,
                    tick_trigger_debounce,
                    flush_layer_ops,
                )
                    .chain(),
            );
        app
    }

    fn spawn_room(app: &mut App) -> (Entity, Entity, Entity) {
        let world = app.world_mut();
        let object = world
            .spawn((Visibility::Hidden, RenderLayers::layer(DEFAULT_LAYER)))
            .id();
        let volume = world
            .spawn((
                GlobalTransform::from(Transform::from_xyz(0.0, 1.0, 0.0)),
                TriggerVolume::new(
                    "kitchen",
                    Vec3::new(1.0, 4.0, 1.0),
                    vec![TriggerTarget { object, layer: 3 }],
                    Duration::ZERO,
                ),
            ))
            .id();
        let actor = world
            .spawn((
                GlobalTransform::from(Transform::from_xyz(0.0, 1.6, 0.0)),
                TriggerActor { radius: 0.2 },
            ))
            .id();
        (object, volume, actor)
    }

    #[test]
    fn actor_inside_volume_shows_and_layers_target() {
        let mut app = app();
        let (object, volume, actor) = spawn_room(&mut app);
        app.update();

        assert!(app.world().get::<TriggerVolume>(volume).unwrap().is_touching());
        assert_eq!(app.world().get::<Visibility>(object), Some(&Visibility::Inherited));
        assert_eq!(app.world().get::<RenderLayers>(object), Some(&RenderLayers::layer(3)));

        *app.world_mut().get_mut::<GlobalTransform>(actor).unwrap() =
            GlobalTransform::from(Transform::from_xyz(5.0, 1.6, 0.0));
        app.update();

        assert_eq!(app.world().get::<Visibility>(object), Some(&Visibility::Hidden));
        assert_eq!(
            app.world().get::<RenderLayers>(object),
            Some(&RenderLayers::layer(DEFAULT_LAYER))
        );
    }

    #[test]
    fn despawned_volume_releases_its_claims() {
        let mut app = app();
        let (object, volume, _) = spawn_room(&mut app);
        app.update();
        assert_eq!(app.world().resource::<TriggerOwnership>().count(object), 1);

        app.world_mut().despawn(volume);
        app.update();

        let ownership = app.world().resource::<TriggerOwnership>();
        assert_eq!(ownership.trigger_count(), 0);
        assert_eq!(ownership.count(object), 0);
        assert_eq!(app.world().get::<Visibility>(object), Some(&Visibility::Hidden));
    }

    #[test]
    fn systems_idle_without_a_room() {
        let mut app = app();
        app.world_mut().remove_resource::<TriggerOwnership>();
        let (object, volume, _) = spawn_room(&mut app);
        app.update();

        assert!(!app.world().get::<TriggerVolume>(volume).unwrap().is_touching());
        assert_eq!(app.world().get::<Visibility>(object), Some(&Visibility::Hidden));
    }
}
