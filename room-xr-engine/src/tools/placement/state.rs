use bevy::prelude::*;

use crate::engine::math::spatial::{horizontal_direction, yaw_from_direction};

/// Where the two-step placement protocol currently is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum PlacementStage {
    #[default]
    AwaitingCenter,
    AwaitingDirection,
    Locked,
}

impl PlacementStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AwaitingCenter => "awaiting_center",
            Self::AwaitingDirection => "awaiting_direction",
            Self::Locked => "locked",
        }
    }
}

/// A confirmed selection point, from a hit test or the floor plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacementHit {
    pub position: Vec3,
    pub rotation: Quat,
}

impl PlacementHit {
    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            rotation: Quat::IDENTITY,
        }
    }
}

/// What a single `advance` call did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlacementOutcome {
    /// Already locked; the selection changes nothing.
    Ignored,
    CenterPicked(Vec3),
    /// Direction point sits on top of the center; stays in `AwaitingDirection`.
    DegenerateDirection,
    Locked { yaw_degrees: f32 },
}

/// Placement progress for the current XR session.
#[derive(Resource, Debug, Default, Clone)]
pub struct PlacementSession {
    stage: PlacementStage,
    center: Option<Vec3>,
    yaw_degrees: Option<f32>,
}

impl PlacementSession {
    /// Feed one confirmed selection into the state machine.
    pub fn advance(&mut self, hit: PlacementHit) -> PlacementOutcome {
        match self.stage {
            PlacementStage::Locked => PlacementOutcome::Ignored,
            PlacementStage::AwaitingCenter => {
                self.center = Some(hit.position);
                self.stage = PlacementStage::AwaitingDirection;
                PlacementOutcome::CenterPicked(hit.position)
            }
            PlacementStage::AwaitingDirection => {
                let Some(center) = self.center else {
                    return PlacementOutcome::Ignored;
                };
                let direction = horizontal_direction(center, hit.position);
                let Some(yaw_degrees) = yaw_from_direction(direction) else {
                    return PlacementOutcome::DegenerateDirection;
                };
                self.yaw_degrees = Some(yaw_degrees);
                self.stage = PlacementStage::Locked;
                PlacementOutcome::Locked { yaw_degrees }
            }
        }
    }

    pub fn stage(&self) -> PlacementStage {
        self.stage
    }

    pub fn center(&self) -> Option<Vec3> {
        self.center
    }

    pub fn yaw_degrees(&self) -> Option<f32> {
        self.yaw_degrees
    }

    pub fn is_locked(&self) -> bool {
        self.stage == PlacementStage::Locked
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn center_then_diagonal_direction_locks_at_45_degrees() {
        let mut session = PlacementSession::default();
        assert_eq!(
            session.advance(PlacementHit::at(Vec3::ZERO)),
            PlacementOutcome::CenterPicked(Vec3::ZERO)
        );
        assert_eq!(session.stage(), PlacementStage::AwaitingDirection);

        let PlacementOutcome::Locked { yaw_degrees } = session.advance(PlacementHit::at(Vec3::new(1.0, 0.0, 1.0)))
        else {
            panic!("expected lock");
        };
        assert!((yaw_degrees - 45.0).abs() < 1e-4);
        assert!(session.is_locked());
    }

    #[test]
    fn direction_on_top_of_center_is_ignored() {
        let mut session = PlacementSession::default();
        session.advance(PlacementHit::at(Vec3::new(2.0, 0.0, -1.0)));
        assert_eq!(
            session.advance(PlacementHit::at(Vec3::new(2.0, 3.0, -1.0))),
            PlacementOutcome::DegenerateDirection
        );
        assert_eq!(session.stage(), PlacementStage::AwaitingDirection);
        assert_eq!(session.yaw_degrees(), None);
        assert_eq!(session.center(), Some(Vec3::new(2.0, 0.0, -1.0)));
    }

    #[test]
    fn selections_after_lock_change_nothing() {
        let mut session = PlacementSession::default();
        session.advance(PlacementHit::at(Vec3::ZERO));
        session.advance(PlacementHit::at(Vec3::Z));
        let center = session.center();
        let yaw = session.yaw_degrees();

        assert_eq!(session.advance(PlacementHit::at(Vec3::X * 5.0)), PlacementOutcome::Ignored);
        assert_eq!(session.center(), center);
        assert_eq!(session.yaw_degrees(), yaw);
        assert_eq!(yaw, Some(0.0));
    }

    #[test]
    fn hit_height_does_not_affect_yaw() {
        let mut session = PlacementSession::default();
        session.advance(PlacementHit::at(Vec3::new(0.0, 0.0, 0.0)));
        let PlacementOutcome::Locked { yaw_degrees } =
            session.advance(PlacementHit::at(Vec3::new(-1.0, 0.8, 0.0)))
        else {
            panic!("expected lock");
        };
        assert!((yaw_degrees + 90.0).abs() < 1e-4);
    }
}
