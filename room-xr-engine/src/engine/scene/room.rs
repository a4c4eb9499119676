use std::collections::HashMap;
use std::time::Duration;

use bevy::prelude::*;
use bevy::render::view::RenderLayers;
use constants::render_settings::{AMBIENT_BRIGHTNESS, CLEAR_COLOUR};
use constants::triggers::{CAMERA_TRIGGER_RADIUS, DEFAULT_LAYER, LAYER_DEPTH_BIAS, ROOM_LAYERS};

use crate::engine::assets::room_layout::RoomLayout;
use crate::tools::triggers::ownership::{TriggerOwnership, TriggerTarget};
use crate::tools::triggers::volumes::{TriggerActor, TriggerVolume};
use crate::xr::camera::XrCamera;

/// Root the placement protocol positions and locomotion moves.
#[derive(Component, Debug, Default)]
pub struct RoomAnchor;

/// Everything the layout spawned; hidden until placement locks.
#[derive(Component, Debug, Default)]
pub struct RoomContent;

/// One splat of the room.
#[derive(Component, Debug, Clone)]
pub struct Splat {
    pub name: String,
}

/// Host asked for the room to be rebuilt from its layout.
#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct RoomReloadEvent;

/// Layers the viewer camera renders: the default plus every room layer.
pub fn camera_layers() -> RenderLayers {
    let layers: Vec<usize> = std::iter::once(DEFAULT_LAYER).chain(ROOM_LAYERS).collect();
    RenderLayers::from_layers(&layers)
}

/// Viewer camera with the trigger sphere riding on it.
pub fn spawn_viewer_camera(mut commands: Commands) {
    commands
        .spawn((
            Name::new("Camera"),
            XrCamera,
            Camera3d::default(),
            Camera {
                clear_color: ClearColorConfig::Custom(CLEAR_COLOUR),
                ..default()
            },
            Projection::Perspective(PerspectiveProjection {
                fov: 45f32.to_radians(),
                far: 1000.0,
                ..default()
            }),
            Transform::from_xyz(0.0, 1.6, 0.0),
            camera_layers(),
        ))
        .with_children(|parent| {
            parent.spawn((
                Name::new("CameraTrigger"),
                TriggerActor {
                    radius: CAMERA_TRIGGER_RADIUS,
                },
                Transform::default(),
            ));
        });

    commands.insert_resource(AmbientLight {
        brightness: AMBIENT_BRIGHTNESS,
        ..default()
    });
}

/// Room anchor with its light. Content is attached later by the loader.
pub fn spawn_room_anchor(mut commands: Commands) {
    commands
        .spawn((
            Name::new("Root"),
            RoomAnchor,
            Transform::default(),
            Visibility::Inherited,
        ))
        .with_children(|parent| {
            parent.spawn((
                DirectionalLight {
                    shadows_enabled: false,
                    ..default()
                },
                Transform::from_rotation(Quat::from_euler(
                    EulerRot::YXZ,
                    0.0,
                    (-130f32).to_radians(),
                    (-220f32).to_radians(),
                )),
            ));
        });
}

/// Spawn splats and trigger volumes under the anchor and install a fresh
/// ownership context for them.
pub fn build_room(
    commands: &mut Commands,
    server: &AssetServer,
    anchor: Entity,
    layout: &RoomLayout,
    visible: bool,
) -> Entity {
    let content = commands
        .spawn((
            Name::new(layout.name.clone()),
            RoomContent,
            Transform::default(),
            if visible {
                Visibility::Inherited
            } else {
                Visibility::Hidden
            },
            ChildOf(anchor),
        ))
        .id();

    let splat_group = commands
        .spawn((
            Name::new("Splats"),
            Transform::from_rotation(layout.splat_group_rotation()),
            Visibility::Inherited,
            ChildOf(content),
        ))
        .id();

    let mut splats = HashMap::new();
    for splat in &layout.splats {
        let entity = commands
            .spawn((
                Name::new(splat.name.clone()),
                Splat {
                    name: splat.name.clone(),
                },
                SceneRoot(server.load(GltfAssetLabel::Scene(0).from_asset(splat.path.clone()))),
                Transform::from_translation(Vec3::from_array(splat.position)),
                Visibility::Inherited,
                RenderLayers::layer(DEFAULT_LAYER),
                ChildOf(splat_group),
            ))
            .id();
        splats.insert(splat.name.as_str(), entity);
    }

    let trigger_group = commands
        .spawn((
            Name::new("Triggers"),
            Transform::default(),
            Visibility::Inherited,
            ChildOf(content),
        ))
        .id();

    for trigger in &layout.triggers {
        let targets = layout
            .resolved_targets(trigger)
            .into_iter()
            .filter_map(|target| {
                splats.get(target.splat).map(|&object| TriggerTarget {
                    object,
                    layer: target.layer,
                })
            })
            .collect();
        commands.spawn((
            Name::new(trigger.name.clone()),
            TriggerVolume::new(
                trigger.name.clone(),
                Vec3::from_array(trigger.half_extents),
                targets,
                Duration::from_millis(trigger.debounce_ms),
            ),
            Transform::from_translation(Vec3::from_array(trigger.position)),
            ChildOf(trigger_group),
        ));
    }

    commands.insert_resource(TriggerOwnership::new(layout.layers.iter().copied()));
    info!(
        "Room '{}' built: {} splats, {} triggers",
        layout.name,
        layout.splats.len(),
        layout.triggers.len()
    );
    content
}

/// Despawn the room content and drop its ownership context.
pub fn teardown_room(commands: &mut Commands, content: Entity) {
    commands.entity(content).try_despawn();
    commands.remove_resource::<TriggerOwnership>();
}

/// Per-layer copies of scene materials.
///
/// `RenderLayers` only decides which cameras see an entity, and the viewer
/// camera sees every room layer. Draw order comes from the material: a copy
/// on layer `n` carries `n * LAYER_DEPTH_BIAS` extra depth bias, which also
/// moves it forward in the transparent sort.
#[derive(Default)]
pub struct LayerMaterials {
    variants: HashMap<(AssetId<StandardMaterial>, usize), Handle<StandardMaterial>>,
    base_of: HashMap<AssetId<StandardMaterial>, Handle<StandardMaterial>>,
}

impl LayerMaterials {
    /// Material to use for `current` on `layer`. Returns `None` while the
    /// base material is not loaded yet.
    pub fn variant(
        &mut self,
        materials: &mut Assets<StandardMaterial>,
        current: &Handle<StandardMaterial>,
        layer: usize,
    ) -> Option<Handle<StandardMaterial>> {
        let base = self
            .base_of
            .get(&current.id())
            .cloned()
            .unwrap_or_else(|| current.clone());
        if layer == DEFAULT_LAYER {
            return Some(base);
        }
        if let Some(handle) = self.variants.get(&(base.id(), layer)) {
            return Some(handle.clone());
        }

        let mut material = materials.get(&base)?.clone();
        material.depth_bias += layer as f32 * LAYER_DEPTH_BIAS;
        let handle = materials.add(material);
        self.base_of.insert(handle.id(), base.clone());
        self.variants.insert((base.id(), layer), handle.clone());
        Some(handle)
    }
}

/// Carry each splat's render layer down to the meshes its scene spawned and
/// swap their materials for the layer's variant.
pub fn propagate_splat_layers(
    mut commands: Commands,
    splats: Query<(Entity, &RenderLayers), With<Splat>>,
    children: Query<&Children>,
    mut meshes: Query<
        (Option<&RenderLayers>, Option<&mut MeshMaterial3d<StandardMaterial>>),
        (With<Mesh3d>, Without<Splat>),
    >,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut layered: Local<LayerMaterials>,
) {
    for (splat, layers) in &splats {
        let layer = layers.iter().max().unwrap_or(DEFAULT_LAYER);
        for descendant in children.iter_descendants(splat) {
            let Ok((current, material)) = meshes.get_mut(descendant) else {
                continue;
            };
            if current != Some(layers) {
                commands.entity(descendant).insert(layers.clone());
            }
            let Some(mut material) = material else {
                continue;
            };
            let Some(wanted) = layered.variant(&mut materials, &material.0, layer) else {
                continue;
            };
            if material.0 != wanted {
                material.0 = wanted;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy::ecs::system::RunSystemOnce;

    fn layout() -> RoomLayout {
        serde_json::from_value(serde_json::json!({
            "name": "flat",
            "splats": [
                { "name": "Kitchen", "path": "room/Kitchen.glb", "position": [0.0, 0.0, 0.0] },
                { "name": "Toilet", "path": "room/Toilet.glb", "position": [2.0, 0.0, 0.0] }
            ],
            "triggers": [{
                "name": "Kitchen_Trigger",
                "position": [0.0, 1.0, 0.0],
                "half_extents": [1.0, 4.0, 1.0],
                "targets": [{ "splat": "Kitchen" }, { "splat": "Toilet" }]
            }]
        }))
        .unwrap()
    }

    #[test]
    fn camera_sees_every_room_layer() {
        let layers = camera_layers();
        for layer in std::iter::once(DEFAULT_LAYER).chain(ROOM_LAYERS) {
            assert!(layers.intersects(&RenderLayers::layer(layer)));
        }
    }

    #[test]
    fn build_and_teardown_scope_the_ownership_context() {
        let mut app = App::new();
        app.add_plugins((MinimalPlugins, AssetPlugin::default()))
            .init_asset::<Scene>();
        let anchor = app.world_mut().spawn(RoomAnchor).id();
        let layout = layout();

        let content = app
            .world_mut()
            .run_system_once(move |mut commands: Commands, server: Res<AssetServer>| {
                build_room(&mut commands, &server, anchor, &layout, false)
            })
            .unwrap();

        let world = app.world_mut();
        assert!(world.contains_resource::<TriggerOwnership>());
        assert_eq!(world.get::<Visibility>(content), Some(&Visibility::Hidden));
        let volumes: Vec<TriggerVolume> = world
            .query::<&TriggerVolume>()
            .iter(world)
            .cloned()
            .collect();
        assert_eq!(volumes.len(), 1);
        let layers: Vec<usize> = volumes[0].targets.iter().map(|t| t.layer).collect();
        assert_eq!(layers, vec![1, 2]);

        app.world_mut()
            .run_system_once(move |mut commands: Commands| teardown_room(&mut commands, content))
            .unwrap();
        let world = app.world_mut();
        assert!(!world.contains_resource::<TriggerOwnership>());
        assert_eq!(world.query::<&Splat>().iter(world).count(), 0);
        assert!(world.get_entity(anchor).is_ok());
    }

    #[test]
    fn splat_meshes_follow_the_layer_draw_order() {
        let mut app = App::new();
        app.add_plugins((MinimalPlugins, AssetPlugin::default()))
            .init_asset::<StandardMaterial>()
            .add_systems(Update, propagate_splat_layers);
        let base = app
            .world_mut()
            .resource_mut::<Assets<StandardMaterial>>()
            .add(StandardMaterial::default());
        let splat = app
            .world_mut()
            .spawn((
                Splat {
                    name: "Kitchen".into(),
                },
                RenderLayers::layer(3),
            ))
            .id();
        let mesh = app
            .world_mut()
            .spawn((
                Mesh3d(Handle::default()),
                MeshMaterial3d(base.clone()),
                ChildOf(splat),
            ))
            .id();

        app.update();
        let world = app.world();
        assert_eq!(world.get::<RenderLayers>(mesh), Some(&RenderLayers::layer(3)));
        let biased = world.get::<MeshMaterial3d<StandardMaterial>>(mesh).unwrap().0.clone();
        assert_ne!(biased, base);
        let materials = world.resource::<Assets<StandardMaterial>>();
        assert_eq!(materials.get(&biased).unwrap().depth_bias, 3.0 * LAYER_DEPTH_BIAS);
        assert_eq!(materials.get(&base).unwrap().depth_bias, 0.0);

        *app.world_mut().get_mut::<RenderLayers>(splat).unwrap() = RenderLayers::layer(DEFAULT_LAYER);
        app.update();
        let world = app.world();
        assert_eq!(
            world.get::<RenderLayers>(mesh),
            Some(&RenderLayers::layer(DEFAULT_LAYER))
        );
        assert_eq!(world.get::<MeshMaterial3d<StandardMaterial>>(mesh).unwrap().0, base);
    }
}
