//! Unit formation controller.
//!
//! A unit owns its stands and fans every order out to them. Stand offsets
//! are always measured from the pivot stand, which is created first and
//! kept at index 0.

use glam::Vec3;
use phalanx_core::{
    Event, Flank, FormationError, Highlight, HighlightIntensity, HighlightStyle, RankFile, StandId,
    SurfaceHeight, UnitId, UnitProfile, UnitSnapshot,
};
use tracing::{debug, error, warn};

use crate::{
    geometry::{
        end_file, formation_offset, highlight_shape, move_target, stand_sockets, yaw_rotation,
        Footprint,
    },
    stand::{NonFiniteTransform, Stand, Step},
    WorldError,
};

/// Placement of a freshly mustered unit.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Muster {
    pub(crate) stand_count: u32,
    pub(crate) horizontal_stand_count: u32,
    pub(crate) location: Vec3,
    pub(crate) yaw_degrees: f32,
    pub(crate) stands_visible: bool,
}

#[derive(Debug)]
pub(crate) struct Unit {
    id: UnitId,
    name: String,
    profile: UnitProfile,
    horizontal_stand_count: u32,
    stands: Vec<Stand>,
    stands_visible: bool,
    diagnostics: bool,
    awaiting_arrival: bool,
}

impl Unit {
    /// Lays out `muster.stand_count` stands in row-major order.
    ///
    /// Stand identifiers are assigned sequentially from `first_stand_id`.
    pub(crate) fn initialize(
        id: UnitId,
        name: String,
        profile: UnitProfile,
        muster: Muster,
        first_stand_id: u32,
    ) -> Result<Self, WorldError> {
        if muster.stand_count == 0 {
            error!(unit = id.get(), "unit mustered without stands");
            return Err(WorldError::EmptyUnit { unit: id });
        }
        if muster.horizontal_stand_count == 0 {
            error!(unit = id.get(), "unit mustered with a zero-width rank");
            return Err(WorldError::InvalidFormationWidth { unit: id });
        }

        let sockets = stand_sockets(profile.stand_size, profile.models_per_stand)?;
        let pivot = Footprint::new(
            muster.location,
            yaw_rotation(muster.yaw_degrees),
            profile.stand_size,
        );

        let mut stands = Vec::with_capacity(muster.stand_count as usize);
        let mut rank = 1;
        let mut file = 0;
        for index in 0..muster.stand_count {
            file += 1;
            if file > muster.horizontal_stand_count {
                file = 1;
                rank += 1;
            }
            let slot = RankFile::new(rank, file);
            let offset = formation_offset(Some(&pivot), slot, profile.spacing)?;
            let footprint = Footprint::new(pivot.position + offset, pivot.rotation, pivot.edge_length);
            stands.push(Stand::new(
                StandId::new(first_stand_id + index),
                slot,
                footprint,
                sockets.clone(),
            ));
        }

        debug!(
            unit = id.get(),
            stands = stands.len(),
            ranks = rank,
            "unit mustered"
        );

        Ok(Self {
            id,
            name,
            profile,
            horizontal_stand_count: muster.horizontal_stand_count,
            stands,
            stands_visible: muster.stands_visible,
            diagnostics: false,
            awaiting_arrival: false,
        })
    }

    pub(crate) fn id(&self) -> UnitId {
        self.id
    }

    pub(crate) fn stand_count(&self) -> usize {
        self.stands.len()
    }

    /// The rank 1, file 1 stand.
    pub(crate) fn pivot(&self) -> Option<&Stand> {
        self.stands.first()
    }

    pub(crate) fn set_diagnostics(&mut self, enabled: bool) {
        self.diagnostics = enabled;
    }

    /// Orders every stand to the point matching `raw_destination` and
    /// returns the computed destinations, pivot first.
    ///
    /// Every destination is computed before any stand is touched, so a
    /// rejected order leaves the unit as it was.
    pub(crate) fn move_to(
        &mut self,
        raw_destination: Vec3,
        running: bool,
    ) -> Result<Vec<Vec3>, WorldError> {
        if !raw_destination.is_finite() {
            error!(unit = self.id.get(), %raw_destination, "rejected move destination");
            return Err(FormationError::InvalidDestination {
                destination: raw_destination,
            }
            .into());
        }
        let pivot = *self
            .pivot()
            .ok_or(WorldError::EmptyUnit { unit: self.id })?
            .footprint();
        let speed = self.profile.speed(running);
        let spacing = self.profile.spacing;

        let destinations = self
            .stands
            .iter()
            .map(|stand| {
                let offset = formation_offset(Some(&pivot), stand.slot(), spacing)?;
                let footprint = stand.footprint();
                Ok(move_target(
                    raw_destination,
                    offset,
                    footprint.rotation,
                    footprint.edge_length,
                ))
            })
            .collect::<Result<Vec<_>, FormationError>>()?;

        for (stand, destination) in self.stands.iter_mut().zip(&destinations) {
            stand.move_to(*destination, speed);
        }
        self.awaiting_arrival = true;
        Ok(destinations)
    }

    /// Front-rank stand at the requested end of the unit.
    pub(crate) fn end_stand(&self, flank: Flank) -> Option<&Stand> {
        let width = self
            .horizontal_stand_count
            .min(u32::try_from(self.stands.len()).unwrap_or(u32::MAX));
        let slot = RankFile::new(1, end_file(width, flank));
        self.stands.iter().find(|stand| stand.slot() == slot)
    }

    /// Upper-left corner of the left end stand and upper-right corner of the
    /// right end stand.
    pub(crate) fn wheel_points(&self) -> Result<(Vec3, Vec3), WorldError> {
        let empty = WorldError::EmptyUnit { unit: self.id };
        let left = self.end_stand(Flank::Left).ok_or(empty.clone())?;
        let right = self.end_stand(Flank::Right).ok_or(empty)?;
        Ok((
            left.footprint().upper_corner(Flank::Left),
            right.footprint().upper_corner(Flank::Right),
        ))
    }

    /// Wheels every stand around the shared corner on the requested side.
    pub(crate) fn wheel(&mut self, direction: Vec3, running: bool) -> Result<(Vec3, Vec3), WorldError> {
        let flank = Flank::from_wheel_vector(direction).map_err(|err| {
            error!(unit = self.id.get(), %direction, "rejected wheel direction");
            err
        })?;
        let (left, right) = self.wheel_points()?;
        let pivot = match flank {
            Flank::Left => left,
            Flank::Right => right,
        };
        let speed = self.profile.speed(running);
        for stand in &mut self.stands {
            stand.wheel(pivot, flank, speed);
        }
        self.awaiting_arrival = false;
        Ok((left, right))
    }

    pub(crate) fn stop_wheel(&mut self) {
        for stand in &mut self.stands {
            stand.stop_wheel();
        }
    }

    pub(crate) fn manual_move(&mut self, direction: Vec3, running: bool) -> Result<(), WorldError> {
        if !direction.is_finite() {
            error!(unit = self.id.get(), %direction, "rejected manual move direction");
            return Err(FormationError::InvalidDirection { direction }.into());
        }
        let speed = self.profile.speed(running);
        for stand in &mut self.stands {
            stand.manual_move(direction, speed);
        }
        self.awaiting_arrival = false;
        Ok(())
    }

    pub(crate) fn stop_manual_move(&mut self) {
        for stand in &mut self.stands {
            stand.stop_manual_move();
        }
        self.awaiting_arrival = false;
    }

    pub(crate) fn halt(&mut self) {
        for stand in &mut self.stands {
            stand.halt();
        }
        self.awaiting_arrival = false;
    }

    /// Highlights every stand and reports each one to renderers.
    pub(crate) fn highlight(
        &mut self,
        style: HighlightStyle,
        intensity: HighlightIntensity,
        out_events: &mut Vec<Event>,
    ) -> Result<(), FormationError> {
        let (shape, extent) = highlight_shape(&self.profile, self.stands_visible)?;
        let highlight = Highlight {
            style,
            intensity,
            shape,
            extent,
        };
        for stand in &mut self.stands {
            stand.apply_highlight(highlight);
            let footprint = stand.footprint();
            out_events.push(Event::StandHighlighted {
                unit: self.id,
                stand: stand.id(),
                position: footprint.position,
                rotation: footprint.rotation,
                highlight,
            });
        }
        Ok(())
    }

    pub(crate) fn clear_highlight(&mut self, out_events: &mut Vec<Event>) {
        for stand in &mut self.stands {
            stand.clear_highlight();
        }
        out_events.push(Event::HighlightCleared { unit: self.id });
    }

    /// Advances every stand by `dt` seconds and rests them on `surface`.
    ///
    /// A stand with a broken transform is skipped; the rest of the unit
    /// still moves.
    pub(crate) fn tick(&mut self, dt: f32, surface: &dyn SurfaceHeight, out_events: &mut Vec<Event>) {
        let wheel_speed = self.profile.wheel_speed;
        for stand in &mut self.stands {
            match stand.advance(dt, wheel_speed) {
                Ok(Step::Arrived) => out_events.push(Event::StandArrived {
                    unit: self.id,
                    stand: stand.id(),
                }),
                Ok(Step::Idle | Step::InMotion) => {}
                Err(NonFiniteTransform) => {
                    warn!(
                        unit = self.id.get(),
                        stand = stand.id().get(),
                        "skipping stand with a non-finite transform"
                    );
                    continue;
                }
            }
            stand.reconcile_height(surface);
        }

        if self.awaiting_arrival && self.stands.iter().all(|stand| stand.destination().is_none()) {
            self.awaiting_arrival = false;
            debug!(unit = self.id.get(), name = %self.name, "unit arrived");
            out_events.push(Event::UnitArrived { unit: self.id });
        }

        if self.diagnostics {
            if let Some(pivot) = self.pivot() {
                out_events.push(Event::UnitLocationChanged {
                    unit: self.id,
                    position: pivot.footprint().position,
                });
            }
        }
    }

    pub(crate) fn snapshot(&self) -> UnitSnapshot {
        UnitSnapshot {
            id: self.id,
            name: self.name.clone(),
            faction: self.profile.faction.clone(),
            stands: self.stands.iter().map(Stand::snapshot).collect(),
        }
    }
}
