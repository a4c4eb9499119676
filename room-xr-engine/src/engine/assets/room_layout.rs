use bevy::prelude::*;
use constants::triggers::{DEFAULT_DEBOUNCE_MS, ROOM_LAYERS};
use serde::{Deserialize, Serialize};

use crate::tools::triggers::ownership::LayerId;

/// One splat of the room, placed under the splat group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplatDefinition {
    pub name: String,
    pub path: String,
    pub position: [f32; 3],
}

/// A splat a trigger claims. Without an explicit layer the target at
/// index `i` asks for layer `i + 1`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerTargetDefinition {
    pub splat: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layer: Option<LayerId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerDefinition {
    pub name: String,
    pub position: [f32; 3],
    pub half_extents: [f32; 3],
    pub targets: Vec<TriggerTargetDefinition>,
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

fn default_debounce_ms() -> u64 {
    DEFAULT_DEBOUNCE_MS
}

fn default_layers() -> Vec<LayerId> {
    ROOM_LAYERS.to_vec()
}

/// Room layout as a Bevy asset, loaded from `*.room.json`.
#[derive(Asset, Debug, Clone, Serialize, Deserialize, TypePath, Resource)]
pub struct RoomLayout {
    pub name: String,
    #[serde(default = "default_layers")]
    pub layers: Vec<LayerId>,
    /// Euler angles in degrees applied to the splat group.
    #[serde(default)]
    pub splat_rotation: [f32; 3],
    pub splats: Vec<SplatDefinition>,
    pub triggers: Vec<TriggerDefinition>,
}

/// A trigger target after splat lookup and layer defaulting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget<'a> {
    pub splat: &'a str,
    pub layer: LayerId,
}

impl RoomLayout {
    pub fn splat(&self, name: &str) -> Option<&SplatDefinition> {
        self.splats.iter().find(|splat| splat.name == name)
    }

    /// Targets of a trigger with their layers filled in. Names that match
    /// no splat are dropped with a warning.
    pub fn resolved_targets<'a>(&'a self, trigger: &'a TriggerDefinition) -> Vec<ResolvedTarget<'a>> {
        trigger
            .targets
            .iter()
            .enumerate()
            .filter_map(|(index, target)| {
                if self.splat(&target.splat).is_none() {
                    warn!(
                        "Trigger '{}' targets unknown splat '{}'",
                        trigger.name, target.splat
                    );
                    return None;
                }
                Some(ResolvedTarget {
                    splat: target.splat.as_str(),
                    layer: target.layer.unwrap_or(index + 1),
                })
            })
            .collect()
    }

    pub fn splat_group_rotation(&self) -> Quat {
        let [x, y, z] = self.splat_rotation;
        Quat::from_euler(
            EulerRot::YXZ,
            y.to_radians(),
            x.to_radians(),
            z.to_radians(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> RoomLayout {
        serde_json::from_value(serde_json::json!({
            "name": "test",
            "splats": [
                { "name": "Kitchen", "path": "room/Kitchen.glb", "position": [0.0, 0.0, 0.0] },
                { "name": "Toilet", "path": "room/Toilet.glb", "position": [1.0, 0.0, 0.0] }
            ],
            "triggers": [{
                "name": "Kitchen_Trigger",
                "position": [0.0, 1.0, 0.0],
                "half_extents": [1.0, 4.0, 1.0],
                "targets": [
                    { "splat": "Kitchen" },
                    { "splat": "Attic" },
                    { "splat": "Toilet", "layer": 7 }
                ]
            }]
        }))
        .unwrap()
    }

    #[test]
    fn defaults_fill_layers_and_debounce() {
        let layout = layout();
        assert_eq!(layout.layers, ROOM_LAYERS.to_vec());
        assert_eq!(layout.triggers[0].debounce_ms, DEFAULT_DEBOUNCE_MS);
        assert_eq!(layout.splat_rotation, [0.0; 3]);
    }

    #[test]
    fn targets_default_to_index_plus_one() {
        let layout = layout();
        let targets = layout.resolved_targets(&layout.triggers[0]);
        assert_eq!(
            targets,
            vec![
                ResolvedTarget { splat: "Kitchen", layer: 1 },
                ResolvedTarget { splat: "Toilet", layer: 7 },
            ]
        );
    }
}
