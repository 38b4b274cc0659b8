//! Per-stand motion state.
//!
//! A stand is always in exactly one [`StandMotion`] phase; commands from the
//! owning unit replace the phase and the per-tick executor in [`motion`]
//! advances it.

mod motion;

use glam::{Quat, Vec3};
use phalanx_core::{
    Flank, Highlight, RankFile, StandId, StandPhase, StandSnapshot, FACING_THRESHOLD_DEGREES,
};

use crate::geometry::{facing_angle_degrees, look_rotation, Footprint};

pub(crate) use motion::{NonFiniteTransform, Step};

#[derive(Clone, Copy, Debug, PartialEq)]
enum StandMotion {
    Idle,
    Rotating { destination: Vec3, facing: Quat },
    Translating { destination: Vec3 },
    Wheeling { pivot: Vec3, flank: Flank },
    ManualMoving { heading: Vec3 },
}

#[derive(Clone, Debug)]
pub(crate) struct Stand {
    id: StandId,
    slot: RankFile,
    footprint: Footprint,
    motion: StandMotion,
    speed: f32,
    sockets: Vec<Vec3>,
    highlight: Option<Highlight>,
}

impl Stand {
    pub(crate) fn new(id: StandId, slot: RankFile, footprint: Footprint, sockets: Vec<Vec3>) -> Self {
        Self {
            id,
            slot,
            footprint,
            motion: StandMotion::Idle,
            speed: 0.0,
            sockets,
            highlight: None,
        }
    }

    pub(crate) fn id(&self) -> StandId {
        self.id
    }

    pub(crate) fn slot(&self) -> RankFile {
        self.slot
    }

    pub(crate) fn footprint(&self) -> &Footprint {
        &self.footprint
    }

    pub(crate) fn phase(&self) -> StandPhase {
        match self.motion {
            StandMotion::Idle => StandPhase::Idle,
            StandMotion::Rotating { .. } => StandPhase::Rotating,
            StandMotion::Translating { .. } => StandPhase::Translating,
            StandMotion::Wheeling { .. } => StandPhase::Wheeling,
            StandMotion::ManualMoving { .. } => StandPhase::ManualMoving,
        }
    }

    /// Point the stand is travelling to, if any.
    pub(crate) fn destination(&self) -> Option<Vec3> {
        match self.motion {
            StandMotion::Rotating { destination, .. } | StandMotion::Translating { destination } => {
                Some(destination)
            }
            _ => None,
        }
    }

    pub(crate) fn wheel_pivot(&self) -> Option<Vec3> {
        match self.motion {
            StandMotion::Wheeling { pivot, .. } => Some(pivot),
            _ => None,
        }
    }

    pub(crate) fn is_manual_moving(&self) -> bool {
        matches!(self.motion, StandMotion::ManualMoving { .. })
    }

    pub(crate) fn is_facing_destination(&self) -> bool {
        self.destination().is_some_and(|destination| {
            facing_angle_degrees(self.footprint.rotation, destination - self.footprint.position)
                < FACING_THRESHOLD_DEGREES
        })
    }

    /// Starts a point move: turn toward `destination`, then translate.
    pub(crate) fn move_to(&mut self, destination: Vec3, speed: f32) {
        let facing = look_rotation(destination - self.footprint.position)
            .unwrap_or(self.footprint.rotation);
        self.speed = speed;
        self.motion = StandMotion::Rotating {
            destination,
            facing,
        };
    }

    /// Starts orbiting `pivot`, turning toward `flank`.
    pub(crate) fn wheel(&mut self, pivot: Vec3, flank: Flank, speed: f32) {
        self.speed = speed;
        self.motion = StandMotion::Wheeling { pivot, flank };
    }

    pub(crate) fn stop_wheel(&mut self) {
        if matches!(self.motion, StandMotion::Wheeling { .. }) {
            self.motion = StandMotion::Idle;
        }
    }

    /// Starts following a stand-local heading with no end point.
    pub(crate) fn manual_move(&mut self, heading: Vec3, speed: f32) {
        self.speed = speed;
        self.motion = StandMotion::ManualMoving { heading };
    }

    /// Drops the manual heading and any pending destination. A wheel in
    /// progress is left alone.
    pub(crate) fn stop_manual_move(&mut self) {
        if !matches!(self.motion, StandMotion::Wheeling { .. }) {
            self.motion = StandMotion::Idle;
        }
    }

    pub(crate) fn halt(&mut self) {
        self.motion = StandMotion::Idle;
    }

    pub(crate) fn apply_highlight(&mut self, highlight: Highlight) {
        self.highlight = Some(highlight);
    }

    pub(crate) fn clear_highlight(&mut self) {
        self.highlight = None;
    }

    pub(crate) fn snapshot(&self) -> StandSnapshot {
        StandSnapshot {
            id: self.id,
            slot: self.slot,
            position: self.footprint.position,
            rotation: self.footprint.rotation,
            edge_length: self.footprint.edge_length,
            phase: self.phase(),
            destination: self.destination(),
            wheel_pivot: self.wheel_pivot(),
            manual_moving: self.is_manual_moving(),
            speed: self.speed,
            model_positions: self
                .sockets
                .iter()
                .map(|socket| self.footprint.position + self.footprint.rotation * *socket)
                .collect(),
            highlight: self.highlight,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use phalanx_core::{HighlightIntensity, HighlightShape, HighlightStyle};

    fn stand_at_origin() -> Stand {
        Stand::new(
            StandId::new(1),
            RankFile::PIVOT,
            Footprint::new(Vec3::ZERO, Quat::IDENTITY, 2.0),
            vec![Vec3::new(0.3, 0.0, 0.3)],
        )
    }

    #[test]
    fn new_stand_is_idle() {
        let stand = stand_at_origin();
        assert_eq!(stand.phase(), StandPhase::Idle);
        assert_eq!(stand.destination(), None);
        assert_eq!(stand.wheel_pivot(), None);
        assert!(!stand.is_manual_moving());
        assert!(!stand.is_facing_destination());
    }

    #[test]
    fn move_enters_rotating_with_destination() {
        let mut stand = stand_at_origin();
        stand.move_to(Vec3::new(10.0, 0.0, 0.0), 3.0);
        assert_eq!(stand.phase(), StandPhase::Rotating);
        assert_eq!(stand.destination(), Some(Vec3::new(10.0, 0.0, 0.0)));
        assert!(!stand.is_facing_destination());
        assert_eq!(stand.snapshot().speed, 3.0);
    }

    #[test]
    fn move_straight_ahead_is_already_facing() {
        let mut stand = stand_at_origin();
        stand.move_to(Vec3::new(0.5, 0.0, 10.0), 3.0);
        assert!(stand.is_facing_destination());
    }

    #[test]
    fn commands_replace_each_other() {
        let mut stand = stand_at_origin();
        stand.move_to(Vec3::new(10.0, 0.0, 0.0), 3.0);
        stand.manual_move(Vec3::Z, 3.0);
        assert!(stand.is_manual_moving());
        assert_eq!(stand.destination(), None);

        stand.wheel(Vec3::new(-1.0, 0.0, 1.0), Flank::Left, 3.0);
        assert!(!stand.is_manual_moving());
        assert_eq!(stand.wheel_pivot(), Some(Vec3::new(-1.0, 0.0, 1.0)));

        stand.stop_manual_move();
        assert_eq!(stand.phase(), StandPhase::Wheeling);
        stand.stop_wheel();
        assert_eq!(stand.phase(), StandPhase::Idle);
    }

    #[test]
    fn stop_wheel_leaves_point_moves_alone() {
        let mut stand = stand_at_origin();
        stand.move_to(Vec3::new(0.0, 0.0, 10.0), 3.0);
        stand.stop_wheel();
        assert_eq!(stand.phase(), StandPhase::Rotating);
        stand.stop_manual_move();
        assert_eq!(stand.phase(), StandPhase::Idle);
    }

    #[test]
    fn snapshot_places_models_in_world_space() {
        let mut stand = stand_at_origin();
        let highlight = Highlight {
            style: HighlightStyle::Friendly,
            intensity: HighlightIntensity::Ghost,
            shape: HighlightShape::Square,
            extent: 1.5,
        };
        stand.apply_highlight(highlight);
        let snapshot = stand.snapshot();
        assert_eq!(snapshot.model_positions, vec![Vec3::new(0.3, 0.0, 0.3)]);
        assert_eq!(snapshot.highlight, Some(highlight));
        stand.clear_highlight();
        assert_eq!(stand.snapshot().highlight, None);
    }
}
