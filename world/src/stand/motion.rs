//! Per-tick stand motion.

use glam::{Quat, Vec3};
use phalanx_core::{SurfaceHeight, MOVEMENT_THRESHOLD};
use tracing::trace;

use super::{Stand, StandMotion};
use crate::geometry::{flatten, look_rotation, planar_distance};

/// Outcome of advancing a stand by one tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Step {
    /// Nothing to do this tick.
    Idle,
    /// The stand moved or turned and still has work left.
    InMotion,
    /// The stand came within the movement threshold of its destination.
    Arrived,
}

/// The stand's position or rotation is not a finite value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct NonFiniteTransform;

impl Stand {
    /// Advances the stand's transform by `dt` seconds.
    ///
    /// `wheel_speed` is the unit's wheel rate in degrees per second.
    pub(crate) fn advance(&mut self, dt: f32, wheel_speed: f32) -> Result<Step, NonFiniteTransform> {
        if !self.footprint.position.is_finite() || !self.footprint.rotation.is_finite() {
            return Err(NonFiniteTransform);
        }

        let step = match self.motion {
            StandMotion::Idle => Step::Idle,
            StandMotion::Rotating {
                destination,
                facing,
            } => self.rotate_toward(destination, facing, dt),
            StandMotion::Translating { destination } => self.translate_toward(destination, dt),
            StandMotion::ManualMoving { heading } => {
                let world_heading = flatten(self.footprint.rotation * heading);
                self.footprint.position += world_heading * self.speed * dt;
                Step::InMotion
            }
            StandMotion::Wheeling { pivot, flank } => {
                let degrees = wheel_speed * dt * flank.sign();
                let turn = Quat::from_rotation_y(degrees.to_radians());
                self.footprint.position = pivot + turn * (self.footprint.position - pivot);
                self.footprint.rotation = (turn * self.footprint.rotation).normalize();
                Step::InMotion
            }
        };

        Ok(step)
    }

    fn rotate_toward(&mut self, destination: Vec3, facing: Quat, dt: f32) -> Step {
        if planar_distance(self.footprint.position, destination) < MOVEMENT_THRESHOLD {
            self.motion = StandMotion::Idle;
            return Step::Arrived;
        }

        if self.is_facing_destination() {
            trace!(stand = self.id.get(), "facing destination, translating");
            self.motion = StandMotion::Translating { destination };
            return self.translate_toward(destination, dt);
        }

        let blend = (self.speed * dt).clamp(0.0, 1.0);
        self.footprint.rotation = self.footprint.rotation.slerp(facing, blend).normalize();
        Step::InMotion
    }

    fn translate_toward(&mut self, destination: Vec3, dt: f32) -> Step {
        let to_destination = flatten(destination - self.footprint.position);
        let distance = to_destination.length();
        if distance < MOVEMENT_THRESHOLD {
            self.motion = StandMotion::Idle;
            return Step::Arrived;
        }

        let travel = self.speed * dt;
        if travel >= distance {
            self.footprint.position.x = destination.x;
            self.footprint.position.z = destination.z;
        } else {
            self.footprint.position += to_destination / distance * travel;
        }

        if let Some(heading) = look_rotation(to_destination) {
            let blend = (self.speed * dt).clamp(0.0, 1.0);
            self.footprint.rotation = self.footprint.rotation.slerp(heading, blend).normalize();
        }

        if planar_distance(self.footprint.position, destination) < MOVEMENT_THRESHOLD {
            self.motion = StandMotion::Idle;
            return Step::Arrived;
        }

        Step::InMotion
    }

    /// Rests the stand on the highest surface point under its centre or corners.
    pub(crate) fn reconcile_height(&mut self, surface: &dyn SurfaceHeight) {
        let centre = self.footprint.position;
        let highest = self
            .footprint
            .corners()
            .into_iter()
            .chain(std::iter::once(centre))
            .map(|point| surface.sample_height(point.x, point.z))
            .fold(f32::NEG_INFINITY, f32::max);

        if highest.is_finite() {
            self.footprint.position.y = highest;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{facing_angle_degrees, yaw_rotation, Footprint};
    use phalanx_core::{Flank, FlatSurface, RankFile, StandId, StandPhase, FACING_THRESHOLD_DEGREES};

    const DT: f32 = 1.0 / 60.0;

    fn stand_facing(yaw_degrees: f32) -> Stand {
        Stand::new(
            StandId::new(1),
            RankFile::PIVOT,
            Footprint::new(Vec3::ZERO, yaw_rotation(yaw_degrees), 2.0),
            Vec::new(),
        )
    }

    fn run_until_idle(stand: &mut Stand, limit: usize) -> usize {
        for tick in 0..limit {
            let step = stand.advance(DT, 30.0).expect("finite");
            if step == Step::Arrived || step == Step::Idle {
                return tick;
            }
        }
        limit
    }

    #[test]
    fn rotation_completes_before_translation() {
        let mut stand = stand_facing(0.0);
        let destination = Vec3::new(20.0, 0.0, 0.0);
        stand.move_to(destination, 3.0);

        for _ in 0..10_000 {
            let before = stand.footprint().position;
            let angle_before = facing_angle_degrees(stand.footprint().rotation, destination - before);
            let _ = stand.advance(DT, 30.0).expect("finite");
            if angle_before >= FACING_THRESHOLD_DEGREES {
                assert_eq!(stand.footprint().position, before, "moved while still turning");
            }
            if stand.phase() == StandPhase::Translating {
                return;
            }
        }
        panic!("stand never started translating");
    }

    #[test]
    fn translating_stand_arrives_and_stays_put() {
        let mut stand = stand_facing(0.0);
        let destination = Vec3::new(0.0, 0.0, 6.0);
        stand.move_to(destination, 3.0);

        let ticks = run_until_idle(&mut stand, 10_000);
        assert!(ticks < 10_000);
        assert_eq!(stand.phase(), StandPhase::Idle);
        assert!(planar_distance(stand.footprint().position, destination) < MOVEMENT_THRESHOLD);

        let settled = stand.footprint().position;
        for _ in 0..30 {
            assert_eq!(stand.advance(DT, 30.0), Ok(Step::Idle));
        }
        assert_eq!(stand.footprint().position, settled);
    }

    #[test]
    fn translation_is_linear_at_speed() {
        let mut stand = stand_facing(0.0);
        stand.move_to(Vec3::new(0.0, 0.0, 100.0), 4.0);
        let _ = stand.advance(0.5, 30.0).expect("finite");
        assert!((stand.footprint().position.z - 2.0).abs() < 1e-4);
        let _ = stand.advance(0.5, 30.0).expect("finite");
        assert!((stand.footprint().position.z - 4.0).abs() < 1e-4);
    }

    #[test]
    fn destination_within_threshold_arrives_immediately() {
        let mut stand = stand_facing(90.0);
        stand.move_to(Vec3::new(0.0, 0.0, -0.2), 3.0);
        assert_eq!(stand.advance(DT, 30.0), Ok(Step::Arrived));
        assert_eq!(stand.footprint().position, Vec3::ZERO);
    }

    #[test]
    fn manual_move_follows_local_heading() {
        let mut stand = stand_facing(90.0);
        stand.manual_move(Vec3::Z, 2.0);
        for _ in 0..10 {
            assert_eq!(stand.advance(0.1, 30.0), Ok(Step::InMotion));
        }
        let position = stand.footprint().position;
        assert!((position.x - 2.0).abs() < 1e-3);
        assert!(position.z.abs() < 1e-3);
        assert!(stand.is_manual_moving());
    }

    #[test]
    fn wheeling_orbits_pivot_and_turns_facing() {
        let mut stand = stand_facing(0.0);
        let pivot = stand.footprint().upper_corner(Flank::Right);
        stand.wheel(pivot, Flank::Right, 3.0);
        // 90 degrees at 30 degrees per second.
        for _ in 0..30 {
            let _ = stand.advance(0.1, 30.0).expect("finite");
        }
        let footprint = *stand.footprint();
        let radius = Vec3::ZERO.distance(pivot);
        assert!((footprint.position.distance(pivot) - radius).abs() < 1e-3);
        assert!(footprint.forward().abs_diff_eq(Vec3::X, 1e-3));
        assert!(footprint.position.abs_diff_eq(Vec3::new(0.0, 0.0, 2.0), 1e-3));
    }

    #[test]
    fn left_wheel_turns_the_other_way() {
        let mut stand = stand_facing(0.0);
        let pivot = stand.footprint().upper_corner(Flank::Left);
        stand.wheel(pivot, Flank::Left, 3.0);
        for _ in 0..30 {
            let _ = stand.advance(0.1, 30.0).expect("finite");
        }
        assert!(stand.footprint().forward().abs_diff_eq(Vec3::NEG_X, 1e-3));
    }

    #[test]
    fn non_finite_transform_is_reported() {
        let mut stand = Stand::new(
            StandId::new(1),
            RankFile::PIVOT,
            Footprint::new(Vec3::new(f32::NAN, 0.0, 0.0), Quat::IDENTITY, 2.0),
            Vec::new(),
        );
        stand.move_to(Vec3::new(0.0, 0.0, 5.0), 3.0);
        assert_eq!(stand.advance(DT, 30.0), Err(NonFiniteTransform));
    }

    #[test]
    fn height_follows_highest_sample_even_when_idle() {
        let mut stand = stand_facing(0.0);
        stand.reconcile_height(&FlatSurface::at(4.0));
        assert_eq!(stand.footprint().position.y, 4.0);

        let slope = |x: f32, _z: f32| x * 0.5;
        stand.reconcile_height(&slope);
        // Corners reach one unit to the right of centre.
        assert!((stand.footprint().position.y - 0.5).abs() < 1e-5);
    }
}
