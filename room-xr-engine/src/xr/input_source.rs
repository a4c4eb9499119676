use bevy::prelude::*;
use serde::{Deserialize, Serialize};

/// Opaque host handle for a controller, hand or screen-tap ray.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InputSourceId(pub u32);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Handedness {
    Left,
    Right,
    #[default]
    None,
}

/// WebXR `targetRayMode`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TargetRayMode {
    Gaze,
    TrackedPointer,
    #[default]
    Screen,
}

/// How an input source takes part in placement and locomotion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputRole {
    Controller(Handedness),
    ScreenTouch,
}

impl InputRole {
    pub fn is_controller(&self) -> bool {
        matches!(self, Self::Controller(_))
    }

    pub fn handedness(&self) -> Handedness {
        match self {
            Self::Controller(hand) => *hand,
            Self::ScreenTouch => Handedness::None,
        }
    }
}

/// A source is controller-like when it is a tracked pointer or reports a hand.
pub fn classify(mode: TargetRayMode, handedness: Handedness) -> InputRole {
    match (mode, handedness) {
        (_, Handedness::Left | Handedness::Right) => InputRole::Controller(handedness),
        (TargetRayMode::TrackedPointer, hand) => InputRole::Controller(hand),
        _ => InputRole::ScreenTouch,
    }
}

/// Everything the host tells us when a source appears.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputSourceDescriptor {
    pub id: InputSourceId,
    #[serde(default)]
    pub handedness: Handedness,
    #[serde(default)]
    pub target_ray_mode: TargetRayMode,
    #[serde(default)]
    pub profiles: Vec<String>,
}

impl InputSourceDescriptor {
    pub fn role(&self) -> InputRole {
        classify(self.target_ray_mode, self.handedness)
    }
}

/// Live ray of an input source in world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InputPose {
    pub origin: Vec3,
    pub direction: Vec3,
    pub rotation: Quat,
}

impl Default for InputPose {
    fn default() -> Self {
        Self {
            origin: Vec3::ZERO,
            direction: Vec3::NEG_Z,
            rotation: Quat::IDENTITY,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectPhase {
    Start,
    Select,
    End,
}

/// Input source lifecycle and per-frame pose/axes updates from the host.
#[derive(Event, Debug, Clone, PartialEq)]
pub enum InputSourceEvent {
    Added(InputSourceDescriptor),
    Removed(InputSourceId),
    Pose {
        id: InputSourceId,
        pose: InputPose,
        axes: Option<Vec<f32>>,
    },
}

/// select / selectstart / selectend for one source.
#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct SelectEvent {
    pub source: InputSourceId,
    pub phase: SelectPhase,
}
