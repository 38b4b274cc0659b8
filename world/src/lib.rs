#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative battlefield state for the Phalanx formation engine.
//!
//! The world owns every unit and its stands. Callers mutate it only through
//! [`apply`] and observe it through the [`query`] module and the events
//! `apply` pushes.

pub mod geometry;
mod stand;
mod unit;

use std::fmt;

use phalanx_core::{Command, Event, FlatSurface, FormationError, SurfaceHeight, UnitId};
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::unit::{Muster, Unit};

/// Failures raised while applying a command.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum WorldError {
    /// A formation precondition was violated.
    #[error(transparent)]
    Formation(#[from] FormationError),
    /// A unit with the same identifier already exists.
    #[error("unit {unit:?} already exists")]
    DuplicateUnit {
        /// Offending identifier.
        unit: UnitId,
    },
    /// A unit was mustered without any stands.
    #[error("unit {unit:?} needs at least one stand")]
    EmptyUnit {
        /// Offending identifier.
        unit: UnitId,
    },
    /// A unit was mustered with zero stands per rank.
    #[error("unit {unit:?} needs at least one stand per rank")]
    InvalidFormationWidth {
        /// Offending identifier.
        unit: UnitId,
    },
}

/// Represents the authoritative battlefield state.
pub struct World {
    units: Vec<Unit>,
    surface: Box<dyn SurfaceHeight>,
    next_stand_id: u32,
    tick_index: u64,
}

impl World {
    /// Creates an empty battlefield on level ground at height zero.
    #[must_use]
    pub fn new() -> Self {
        Self::with_surface(FlatSurface::default())
    }

    /// Creates an empty battlefield resting stands on the provided surface.
    #[must_use]
    pub fn with_surface(surface: impl SurfaceHeight + 'static) -> Self {
        Self {
            units: Vec::new(),
            surface: Box::new(surface),
            next_stand_id: 0,
            tick_index: 0,
        }
    }

    fn unit_mut(&mut self, unit: UnitId) -> Option<&mut Unit> {
        let found = self.units.iter_mut().find(|candidate| candidate.id() == unit);
        if found.is_none() {
            warn!(unit = unit.get(), "command addressed to unknown unit");
        }
        found
    }

    fn unit_index(&self, unit: UnitId) -> Option<usize> {
        self.units.iter().position(|candidate| candidate.id() == unit)
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for World {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("World")
            .field("units", &self.units)
            .field("next_stand_id", &self.next_stand_id)
            .field("tick_index", &self.tick_index)
            .finish_non_exhaustive()
    }
}

/// Applies the provided command to the world, mutating state deterministically.
///
/// Commands addressed to a unit that does not exist are logged and ignored.
/// Precondition violations are returned as errors and leave the world
/// unchanged.
pub fn apply(
    world: &mut World,
    command: Command,
    out_events: &mut Vec<Event>,
) -> Result<(), WorldError> {
    match command {
        Command::Tick { dt } => {
            world.tick_index = world.tick_index.saturating_add(1);
            out_events.push(Event::TimeAdvanced { dt });

            let seconds = dt.as_secs_f32();
            let surface = world.surface.as_ref();
            for unit in &mut world.units {
                unit.tick(seconds, surface, out_events);
            }
        }
        Command::SpawnUnit {
            unit,
            name,
            profile,
            stand_count,
            horizontal_stand_count,
            location,
            yaw_degrees,
            stands_visible,
        } => {
            if world.unit_index(unit).is_some() {
                error!(unit = unit.get(), "unit identifier already in use");
                return Err(WorldError::DuplicateUnit { unit });
            }

            let mut spawned = Unit::initialize(
                unit,
                name,
                profile,
                Muster {
                    stand_count,
                    horizontal_stand_count,
                    location,
                    yaw_degrees,
                    stands_visible,
                },
                world.next_stand_id,
            )?;
            spawned.tick(0.0, world.surface.as_ref(), &mut Vec::new());

            let created = u32::try_from(spawned.stand_count()).unwrap_or(u32::MAX);
            world.next_stand_id = world.next_stand_id.saturating_add(created);
            world.units.push(spawned);
            out_events.push(Event::UnitSpawned {
                unit,
                stand_count: created,
            });
        }
        Command::RemoveUnit { unit } => match world.unit_index(unit) {
            Some(index) => {
                let _ = world.units.remove(index);
                debug!(unit = unit.get(), "unit removed");
                out_events.push(Event::UnitRemoved { unit });
            }
            None => warn!(unit = unit.get(), "remove addressed to unknown unit"),
        },
        Command::MoveUnit {
            unit,
            destination,
            running,
        } => {
            if let Some(target) = world.unit_mut(unit) {
                let positions = target.move_to(destination, running)?;
                debug!(unit = unit.get(), %destination, running, "unit ordered to move");
                out_events.push(Event::DestinationPreview { unit, positions });
            }
        }
        Command::WheelUnit {
            unit,
            direction,
            running,
        } => {
            if let Some(target) = world.unit_mut(unit) {
                let (left, right) = target.wheel(direction, running)?;
                debug!(unit = unit.get(), %direction, running, "unit ordered to wheel");
                out_events.push(Event::WheelPointsComputed { unit, left, right });
            }
        }
        Command::StopWheel { unit } => {
            if let Some(target) = world.unit_mut(unit) {
                target.stop_wheel();
            }
        }
        Command::ManualMoveUnit {
            unit,
            direction,
            running,
        } => {
            if let Some(target) = world.unit_mut(unit) {
                target.manual_move(direction, running)?;
            }
        }
        Command::StopManualMove { unit } => {
            if let Some(target) = world.unit_mut(unit) {
                target.stop_manual_move();
            }
        }
        Command::HaltUnit { unit } => {
            if let Some(target) = world.unit_mut(unit) {
                target.halt();
            }
        }
        Command::HighlightUnit {
            unit,
            style,
            intensity,
        } => {
            if let Some(target) = world.unit_mut(unit) {
                target.highlight(style, intensity, out_events)?;
            }
        }
        Command::ClearHighlight { unit } => {
            if let Some(target) = world.unit_mut(unit) {
                target.clear_highlight(out_events);
            }
        }
        Command::SetDiagnostics { unit, enabled } => {
            if let Some(target) = world.unit_mut(unit) {
                target.set_diagnostics(enabled);
            }
        }
        Command::SetUnitLocation { unit, .. } => {
            error!(unit = unit.get(), "unit placement is not supported");
            return Err(FormationError::NotImplemented {
                operation: "set unit location",
            }
            .into());
        }
        Command::SetUnitRotation { unit, .. } => {
            error!(unit = unit.get(), "unit rotation is not supported");
            return Err(FormationError::NotImplemented {
                operation: "set unit rotation",
            }
            .into());
        }
    }

    Ok(())
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use glam::Vec3;
    use phalanx_core::{UnitId, UnitSnapshot, UnitView};

    use super::World;

    /// Captures a read-only view of every unit on the battlefield.
    #[must_use]
    pub fn unit_view(world: &World) -> UnitView {
        UnitView::from_snapshots(world.units.iter().map(|unit| unit.snapshot()).collect())
    }

    /// Captures a single unit, if it exists.
    #[must_use]
    pub fn unit(world: &World, unit: UnitId) -> Option<UnitSnapshot> {
        world
            .units
            .iter()
            .find(|candidate| candidate.id() == unit)
            .map(|candidate| candidate.snapshot())
    }

    /// World position of a unit's pivot stand.
    #[must_use]
    pub fn pivot_location(world: &World, unit: UnitId) -> Option<Vec3> {
        world
            .units
            .iter()
            .find(|candidate| candidate.id() == unit)
            .and_then(|candidate| candidate.pivot())
            .map(|pivot| pivot.footprint().position)
    }

    /// Number of ticks applied since the world was created.
    #[must_use]
    pub fn tick_index(world: &World) -> u64 {
        world.tick_index
    }
}
