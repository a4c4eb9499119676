use bevy::prelude::*;
use constants::locomotion::MIN_GAMEPAD_AXES;
use serde::Deserialize;

/// Axes of one platform gamepad, in browser `Gamepad.axes` layout
/// (stick Y positive when pulled back).
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GamepadSnapshot {
    pub id: String,
    #[serde(default)]
    pub axes: Vec<f32>,
}

/// Gamepad list pushed by the host page.
#[derive(Event, Debug, Clone, PartialEq)]
pub struct HostGamepadsEvent(pub Vec<GamepadSnapshot>);

/// Latest platform gamepad readings used by the locomotion fallback.
#[derive(Resource, Debug, Default)]
pub struct PlatformGamepads {
    pads: Vec<GamepadSnapshot>,
    /// The host feeds gamepads itself; local polling stays off.
    host_fed: bool,
}

impl PlatformGamepads {
    pub fn set(&mut self, pads: Vec<GamepadSnapshot>) {
        self.pads = pads;
    }

    /// Pad at `index` among those with enough axes, else the first one.
    pub fn select(&self, index: usize) -> Option<&GamepadSnapshot> {
        let usable: Vec<&GamepadSnapshot> = self
            .pads
            .iter()
            .filter(|pad| pad.axes.len() >= MIN_GAMEPAD_AXES)
            .collect();
        usable.get(index).or(usable.first()).copied()
    }
}

pub fn ingest_host_gamepads(
    mut events: EventReader<HostGamepadsEvent>,
    mut gamepads: ResMut<PlatformGamepads>,
) {
    if let Some(event) = events.read().last() {
        gamepads.set(event.0.clone());
        gamepads.host_fed = true;
    }
}

/// Read connected gamepads through Bevy's input layer.
#[cfg(not(target_arch = "wasm32"))]
pub fn poll_platform_gamepads(
    pads: Query<(Entity, &Gamepad, Option<&Name>)>,
    mut gamepads: ResMut<PlatformGamepads>,
) {
    if gamepads.host_fed {
        return;
    }
    let snapshots = pads
        .iter()
        .map(|(entity, gamepad, name)| {
            let read = |axis: GamepadAxis| gamepad.get(axis).unwrap_or(0.0);
            GamepadSnapshot {
                id: name.map_or_else(|| format!("gamepad-{}", entity.index()), |n| n.to_string()),
                axes: vec![
                    read(GamepadAxis::LeftStickX),
                    -read(GamepadAxis::LeftStickY),
                    read(GamepadAxis::RightStickX),
                    -read(GamepadAxis::RightStickY),
                    read(GamepadAxis::LeftZ),
                    read(GamepadAxis::RightZ),
                ],
            }
        })
        .collect();
    gamepads.set(snapshots);
}

/// Read `navigator.getGamepads()` directly.
#[cfg(target_arch = "wasm32")]
pub fn poll_platform_gamepads(mut gamepads: ResMut<PlatformGamepads>) {
    use wasm_bindgen::JsCast;

    if gamepads.host_fed {
        return;
    }
    let Some(window) = web_sys::window() else {
        return;
    };
    let Ok(list) = window.navigator().get_gamepads() else {
        return;
    };

    let snapshots = list
        .iter()
        .filter_map(|value| value.dyn_into::<web_sys::Gamepad>().ok())
        .map(|pad| GamepadSnapshot {
            id: pad.id(),
            axes: pad
                .axes()
                .iter()
                .map(|axis| axis.as_f64().unwrap_or(0.0) as f32)
                .collect(),
        })
        .collect();
    gamepads.set(snapshots);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pad(id: &str, axes: &[f32]) -> GamepadSnapshot {
        GamepadSnapshot {
            id: id.to_string(),
            axes: axes.to_vec(),
        }
    }

    #[test]
    fn select_skips_pads_without_enough_axes() {
        let mut gamepads = PlatformGamepads::default();
        gamepads.set(vec![pad("wheel", &[0.3]), pad("stick", &[0.0, 0.0]), pad("pad", &[0.0; 4])]);
        assert_eq!(gamepads.select(0).unwrap().id, "stick");
        assert_eq!(gamepads.select(1).unwrap().id, "pad");
        assert_eq!(gamepads.select(5).unwrap().id, "stick");

        gamepads.set(vec![pad("wheel", &[0.3])]);
        assert!(gamepads.select(0).is_none());
    }

    #[test]
    fn host_snapshots_replace_local_readings() {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins)
            .init_resource::<PlatformGamepads>()
            .add_event::<HostGamepadsEvent>()
            .add_systems(Update, ingest_host_gamepads);
        app.world_mut()
            .send_event(HostGamepadsEvent(vec![pad("host", &[0.5, 0.0])]));
        app.update();

        let gamepads = app.world().resource::<PlatformGamepads>();
        assert!(gamepads.host_fed);
        assert_eq!(gamepads.select(0).unwrap().axes, vec![0.5, 0.0]);
    }
}
