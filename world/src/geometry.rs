//! Rank-and-file geometry.
//!
//! Pure functions that turn a stand's slot inside its unit into a world
//! offset from the pivot stand, and a clicked board position into the point
//! each stand should travel to. Stand bases are square; a stand's forward
//! axis is `rotation * +Z` and its right axis is `rotation * +X`.

use glam::{Quat, Vec3};
use phalanx_core::{Flank, FormationError, HighlightShape, RankFile, UnitKind, UnitProfile};
use tracing::error;

/// Edge length of the stand base that has a known model layout.
const SOCKETED_STAND_EDGE: f32 = 2.5;
const SOCKET_EDGE_TOLERANCE: f32 = 0.001;
/// Socket offset of a four-model layout as a fraction of the stand edge.
const FOUR_MODEL_SOCKET: f32 = 0.3;

/// Square stand base placed in the world.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Footprint {
    /// World position of the base centre.
    pub position: Vec3,
    /// World rotation of the base.
    pub rotation: Quat,
    /// Edge length of the square base.
    pub edge_length: f32,
}

impl Footprint {
    /// Creates a footprint from its centre, rotation and edge length.
    #[must_use]
    pub const fn new(position: Vec3, rotation: Quat, edge_length: f32) -> Self {
        Self {
            position,
            rotation,
            edge_length,
        }
    }

    /// Direction the stand faces.
    #[must_use]
    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::Z
    }

    /// Direction to the stand's right.
    #[must_use]
    pub fn right(&self) -> Vec3 {
        self.rotation * Vec3::X
    }

    /// Front corner of the base on the requested flank.
    #[must_use]
    pub fn upper_corner(&self, flank: Flank) -> Vec3 {
        upper_corner(self, flank)
    }

    /// The four corners of the base: front-left, front-right, back-right, back-left.
    #[must_use]
    pub fn corners(&self) -> [Vec3; 4] {
        let half = self.edge_length / 2.0;
        let forward = self.forward() * half;
        let right = self.right() * half;
        [
            self.position + forward - right,
            self.position + forward + right,
            self.position - forward + right,
            self.position - forward - right,
        ]
    }
}

/// Offset of the stand in `slot` from the pivot stand.
///
/// The pivot slot always yields zero, with or without a pivot footprint.
/// Every other slot is measured along the pivot's right axis (files) and
/// backward axis (ranks), each step being one stand edge plus `spacing`.
pub fn formation_offset(
    pivot: Option<&Footprint>,
    slot: RankFile,
    spacing: f32,
) -> Result<Vec3, FormationError> {
    if !slot.is_valid() {
        return Err(FormationError::InvalidSlot { slot });
    }

    if slot.is_pivot() {
        return Ok(Vec3::ZERO);
    }

    let Some(pivot) = pivot.filter(|pivot| pivot.rotation.is_finite()) else {
        error!(?slot, "formation offset requested without a pivot stand");
        return Err(FormationError::MissingPivot { slot });
    };

    let file_position = slot.file_position();
    let files = file_position.unsigned_abs() as f32;
    let mut offset = Vec3::ZERO;
    if file_position != 0 {
        let direction = if file_position > 0 {
            pivot.right()
        } else {
            -pivot.right()
        };
        offset += direction * (pivot.edge_length * files + spacing * files);
    }

    let ranks = slot.ranks_back() as f32;
    if ranks > 0.0 {
        offset += -pivot.forward() * (pivot.edge_length * ranks + spacing * ranks);
    }

    Ok(offset)
}

/// Centre position a stand travels to for a clicked board position.
///
/// The click marks where the pivot's front edge should stop, so the result
/// is pulled back half an edge along the stand's forward axis.
#[must_use]
pub fn move_target(raw_click: Vec3, offset: Vec3, rotation: Quat, edge_length: f32) -> Vec3 {
    let forward = rotation * Vec3::Z;
    (raw_click + offset) - forward * (edge_length / 2.0)
}

/// Front corner of a stand's base on the requested flank.
#[must_use]
pub fn upper_corner(footprint: &Footprint, flank: Flank) -> Vec3 {
    let side = footprint.right() * flank.sign();
    footprint.position + (side + footprint.forward()) * (footprint.edge_length / 2.0)
}

/// File of the outermost front-rank stand on `flank` for a rank `width` wide.
///
/// Left ends are the highest even file, right ends the highest odd file
/// above 1; a single-stand rank is both ends.
#[must_use]
pub fn end_file(width: u32, flank: Flank) -> u32 {
    match flank {
        Flank::Left if width >= 2 => width - width % 2,
        Flank::Right if width >= 3 => width - (1 - width % 2),
        _ => 1,
    }
}

/// Rotation about the vertical axis by `degrees`.
#[must_use]
pub fn yaw_rotation(degrees: f32) -> Quat {
    Quat::from_rotation_y(degrees.to_radians())
}

/// Rotation that faces along the horizontal part of `direction`.
#[must_use]
pub fn look_rotation(direction: Vec3) -> Option<Quat> {
    let planar = flatten(direction);
    if !planar.is_finite() || planar.length_squared() <= f32::EPSILON {
        return None;
    }
    Some(Quat::from_rotation_y(planar.x.atan2(planar.z)))
}

/// Horizontal angle in degrees between a rotation's forward axis and `to_target`.
#[must_use]
pub fn facing_angle_degrees(rotation: Quat, to_target: Vec3) -> f32 {
    let forward = flatten(rotation * Vec3::Z);
    let target = flatten(to_target);
    if forward.length_squared() <= f32::EPSILON || target.length_squared() <= f32::EPSILON {
        return 0.0;
    }
    forward.angle_between(target).to_degrees()
}

/// Distance between two points ignoring height.
#[must_use]
pub fn planar_distance(a: Vec3, b: Vec3) -> f32 {
    flatten(b - a).length()
}

/// Drops the vertical component of a vector.
#[must_use]
pub fn flatten(vector: Vec3) -> Vec3 {
    Vec3::new(vector.x, 0.0, vector.z)
}

/// Stand-local positions of the models mounted on a stand.
///
/// Only the 2.5 edge base has a known layout: four models sit in its
/// quadrants, `0.3` of the edge from the centre along each axis, and a
/// single model sits in the centre. Other edges carry no sockets.
pub fn stand_sockets(edge_length: f32, models: u32) -> Result<Vec<Vec3>, FormationError> {
    if (edge_length - SOCKETED_STAND_EDGE).abs() >= SOCKET_EDGE_TOLERANCE {
        return Ok(Vec::new());
    }

    match models {
        4 => {
            let offset = FOUR_MODEL_SOCKET * edge_length;
            Ok(vec![
                Vec3::new(offset, 0.0, offset),
                Vec3::new(-offset, 0.0, offset),
                Vec3::new(-offset, 0.0, -offset),
                Vec3::new(offset, 0.0, -offset),
            ])
        }
        1 => Ok(vec![Vec3::ZERO]),
        _ => Err(FormationError::UnsupportedStandLayout {
            edge_length,
            models,
        }),
    }
}

/// Outline shape and extent drawn under a stand of the given unit.
pub fn highlight_shape(
    profile: &UnitProfile,
    stands_visible: bool,
) -> Result<(HighlightShape, f32), FormationError> {
    match (profile.kind, stands_visible) {
        (UnitKind::Infantry, true) => Ok((HighlightShape::Square, profile.selection_stand_extent)),
        (UnitKind::Infantry, false) => Ok((HighlightShape::Circle, profile.selection_model_extent)),
        (kind, _) => {
            error!(?kind, "no highlight lookup for unit kind");
            Err(FormationError::UnsupportedUnitKind { kind })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use phalanx_core::Faction;

    const EPSILON: f32 = 1e-4;

    fn pivot_at_origin(edge_length: f32) -> Footprint {
        Footprint::new(Vec3::ZERO, Quat::IDENTITY, edge_length)
    }

    fn assert_close(actual: Vec3, expected: Vec3) {
        assert!(
            actual.abs_diff_eq(expected, EPSILON),
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn pivot_slot_has_no_offset_for_any_spacing() {
        for spacing in [0.0, 0.5, 1.0, 7.25] {
            let pivot = pivot_at_origin(2.0);
            assert_eq!(
                formation_offset(Some(&pivot), RankFile::PIVOT, spacing),
                Ok(Vec3::ZERO)
            );
            assert_eq!(
                formation_offset(None, RankFile::PIVOT, spacing),
                Ok(Vec3::ZERO)
            );
        }
    }

    #[test]
    fn single_row_offsets_match_worked_example() {
        let pivot = pivot_at_origin(2.0);
        let expected = [
            (1, Vec3::ZERO),
            (2, Vec3::new(-3.0, 0.0, 0.0)),
            (3, Vec3::new(3.0, 0.0, 0.0)),
            (4, Vec3::new(-6.0, 0.0, 0.0)),
            (5, Vec3::new(6.0, 0.0, 0.0)),
        ];
        for (file, offset) in expected {
            let actual = formation_offset(Some(&pivot), RankFile::new(1, file), 1.0)
                .expect("offset");
            assert_close(actual, offset);
        }
    }

    #[test]
    fn even_files_go_left_and_odd_files_go_right() {
        let pivot = pivot_at_origin(2.0);
        let mut previous_left = 0.0;
        for file in [2, 4, 6] {
            let offset = formation_offset(Some(&pivot), RankFile::new(1, file), 0.5).expect("offset");
            assert!(offset.x < 0.0);
            assert!(offset.x.abs() > previous_left);
            previous_left = offset.x.abs();
        }
        let mut previous_right = 0.0;
        for file in [3, 5, 7] {
            let offset = formation_offset(Some(&pivot), RankFile::new(1, file), 0.5).expect("offset");
            assert!(offset.x > 0.0);
            assert!(offset.x > previous_right);
            previous_right = offset.x;
        }
    }

    #[test]
    fn each_rank_steps_back_one_edge_plus_spacing() {
        let pivot = pivot_at_origin(2.0);
        for file in [1, 2, 3] {
            let mut previous = formation_offset(Some(&pivot), RankFile::new(1, file), 0.75)
                .expect("offset");
            for rank in 2..=5 {
                let offset = formation_offset(Some(&pivot), RankFile::new(rank, file), 0.75)
                    .expect("offset");
                assert!((previous.z - offset.z - 2.75).abs() < EPSILON);
                assert!((previous.x - offset.x).abs() < EPSILON);
                previous = offset;
            }
        }
    }

    #[test]
    fn offsets_follow_pivot_rotation() {
        let pivot = Footprint::new(Vec3::new(10.0, 0.0, 10.0), yaw_rotation(90.0), 2.0);
        // Facing +X puts the right flank toward -Z and the rear toward -X.
        let right = formation_offset(Some(&pivot), RankFile::new(1, 3), 1.0).expect("offset");
        assert_close(right, Vec3::new(0.0, 0.0, -3.0));
        let behind = formation_offset(Some(&pivot), RankFile::new(2, 1), 1.0).expect("offset");
        assert_close(behind, Vec3::new(-3.0, 0.0, 0.0));
    }

    #[test]
    fn non_pivot_offset_without_pivot_is_rejected() {
        let slot = RankFile::new(1, 2);
        assert_eq!(
            formation_offset(None, slot, 1.0),
            Err(FormationError::MissingPivot { slot })
        );
        let broken = Footprint::new(Vec3::ZERO, Quat::from_xyzw(f32::NAN, 0.0, 0.0, 1.0), 2.0);
        assert!(formation_offset(Some(&broken), slot, 1.0).is_err());
    }

    #[test]
    fn zero_indices_are_rejected() {
        let slot = RankFile::new(0, 1);
        assert_eq!(
            formation_offset(None, slot, 1.0),
            Err(FormationError::InvalidSlot { slot })
        );
    }

    #[test]
    fn move_target_aligns_front_edge_with_click() {
        let target = move_target(Vec3::new(10.0, 0.0, 10.0), Vec3::ZERO, Quat::IDENTITY, 2.0);
        assert_close(target, Vec3::new(10.0, 0.0, 9.0));

        let flanker = move_target(
            Vec3::new(10.0, 0.0, 10.0),
            Vec3::new(-3.0, 0.0, 0.0),
            Quat::IDENTITY,
            2.0,
        );
        assert_close(flanker, Vec3::new(7.0, 0.0, 9.0));
    }

    #[test]
    fn upper_corners_sit_on_front_edge() {
        let footprint = pivot_at_origin(2.0);
        assert_close(footprint.upper_corner(Flank::Left), Vec3::new(-1.0, 0.0, 1.0));
        assert_close(footprint.upper_corner(Flank::Right), Vec3::new(1.0, 0.0, 1.0));
        let corners = footprint.corners();
        assert_close(corners[0], Vec3::new(-1.0, 0.0, 1.0));
        assert_close(corners[2], Vec3::new(1.0, 0.0, -1.0));
    }

    #[test]
    fn end_files_follow_parity() {
        assert_eq!(end_file(5, Flank::Left), 4);
        assert_eq!(end_file(5, Flank::Right), 5);
        assert_eq!(end_file(4, Flank::Left), 4);
        assert_eq!(end_file(4, Flank::Right), 3);
        assert_eq!(end_file(2, Flank::Left), 2);
        assert_eq!(end_file(2, Flank::Right), 1);
        assert_eq!(end_file(1, Flank::Left), 1);
        assert_eq!(end_file(1, Flank::Right), 1);
    }

    #[test]
    fn look_rotation_faces_direction() {
        let rotation = look_rotation(Vec3::new(1.0, 5.0, 0.0)).expect("rotation");
        assert_close(rotation * Vec3::Z, Vec3::X);
        assert!(look_rotation(Vec3::new(0.0, 3.0, 0.0)).is_none());
        assert!(look_rotation(Vec3::new(f32::NAN, 0.0, 1.0)).is_none());
        assert!(look_rotation(Vec3::new(0.0, 0.0, f32::INFINITY)).is_none());
        assert!(facing_angle_degrees(rotation, Vec3::X) < EPSILON);
        assert!((facing_angle_degrees(Quat::IDENTITY, Vec3::X) - 90.0).abs() < 1e-3);
    }

    #[test]
    fn sockets_exist_only_for_known_layouts() {
        let quadrants = stand_sockets(2.5, 4).expect("sockets");
        assert_eq!(quadrants.len(), 4);
        assert!(quadrants[0].abs_diff_eq(Vec3::new(0.75, 0.0, 0.75), EPSILON));
        assert!(quadrants[2].abs_diff_eq(Vec3::new(-0.75, 0.0, -0.75), EPSILON));
        assert_eq!(stand_sockets(2.5, 1).expect("sockets"), vec![Vec3::ZERO]);
        assert!(stand_sockets(2.0, 7).expect("sockets").is_empty());
        assert_eq!(
            stand_sockets(2.5, 3),
            Err(FormationError::UnsupportedStandLayout {
                edge_length: 2.5,
                models: 3
            })
        );
    }

    #[test]
    fn highlight_lookup_supports_infantry_only() {
        let mut profile = UnitProfile {
            faction: Faction::new("Arturia"),
            kind: UnitKind::Infantry,
            walk_speed: 3.0,
            run_speed: 6.0,
            wheel_speed: 20.0,
            stand_size: 2.5,
            models_per_stand: 4,
            spacing: 0.25,
            full_rank: 5,
            selection_stand_extent: 1.5,
            selection_model_extent: 0.5,
        };
        assert_eq!(
            highlight_shape(&profile, true),
            Ok((HighlightShape::Square, 1.5))
        );
        assert_eq!(
            highlight_shape(&profile, false),
            Ok((HighlightShape::Circle, 0.5))
        );
        profile.kind = UnitKind::Cavalry;
        assert_eq!(
            highlight_shape(&profile, true),
            Err(FormationError::UnsupportedUnitKind {
                kind: UnitKind::Cavalry
            })
        );
    }
}
