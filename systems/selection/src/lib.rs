#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Selection and command routing.
//!
//! Tracks which unit is selected and which one is ghost highlighted under
//! the pointer, turns player [`Input`] into unit-addressed [`Command`]
//! values, and publishes selection notifications for presenters.

use phalanx_core::{
    Command, Event, Faction, HighlightIntensity, HighlightStyle, Input, MouseButton, UnitId,
    UnitView,
};
use thiserror::Error;
use tracing::{debug, error, warn};

/// Failures raised while routing player input.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum RoutingError {
    /// The input is recognised but has no handling yet.
    #[error("{input} is not implemented")]
    NotImplemented {
        /// Name of the unhandled input.
        input: &'static str,
    },
}

/// Pure system that owns the selection state.
#[derive(Debug)]
pub struct Selection {
    player_faction: Faction,
    selected: Option<UnitId>,
    ghost: Option<UnitId>,
}

impl Selection {
    /// Creates a router with nothing selected for the given player faction.
    #[must_use]
    pub fn new(player_faction: Faction) -> Self {
        Self {
            player_faction,
            selected: None,
            ghost: None,
        }
    }

    /// Unit that currently receives orders.
    #[must_use]
    pub fn selected(&self) -> Option<UnitId> {
        self.selected
    }

    /// Unit currently ghost highlighted under the pointer.
    #[must_use]
    pub fn ghost(&self) -> Option<UnitId> {
        self.ghost
    }

    /// Consumes world events and player inputs, emitting world commands and
    /// selection notifications.
    ///
    /// World events are processed first so that removed units are forgotten
    /// before any input refers to them. Every input is routed even when an
    /// earlier one fails; the first failure is returned once the batch is
    /// done.
    ///
    /// Selection and ghost state follow the routed [`Command::HighlightUnit`]
    /// and do not depend on whether the world accepts the highlight. A unit
    /// whose kind has no outline is still selected and still receives orders.
    pub fn handle(
        &mut self,
        inputs: &[Input],
        world_events: &[Event],
        units: &UnitView,
        out_commands: &mut Vec<Command>,
        out_events: &mut Vec<Event>,
    ) -> Result<(), RoutingError> {
        for event in world_events {
            self.observe(event, out_events);
        }

        let mut first_failure = None;
        for input in inputs {
            if let Err(failure) = self.route(input, units, out_commands, out_events) {
                warn!(%failure, "input could not be routed");
                if first_failure.is_none() {
                    first_failure = Some(failure);
                }
            }
        }

        first_failure.map_or(Ok(()), Err)
    }

    fn observe(&mut self, event: &Event, out_events: &mut Vec<Event>) {
        match event {
            Event::UnitLocationChanged { unit, position } if self.selected == Some(*unit) => {
                out_events.push(Event::SelectedUnitLocationChanged {
                    location: Some(*position),
                });
            }
            Event::UnitRemoved { unit } => {
                if self.ghost == Some(*unit) {
                    self.ghost = None;
                }
                if self.selected == Some(*unit) {
                    self.selected = None;
                    out_events.push(Event::SelectedUnitLocationChanged { location: None });
                }
            }
            _ => {}
        }
    }

    fn route(
        &mut self,
        input: &Input,
        units: &UnitView,
        out_commands: &mut Vec<Command>,
        out_events: &mut Vec<Event>,
    ) -> Result<(), RoutingError> {
        match *input {
            Input::PointerOverPiece {
                unit,
                button,
                modifier,
                ..
            } => match button {
                Some(MouseButton::Primary) => self.select(unit, units, out_commands, out_events),
                Some(MouseButton::Secondary) => {
                    self.deselect(out_commands, out_events);
                    if !modifier {
                        self.ghost_select(unit, units, out_commands);
                    }
                }
                Some(MouseButton::Middle) | None => {
                    if !modifier {
                        self.ghost_select(unit, units, out_commands);
                    }
                }
            },
            Input::PointerOverBoard {
                world_position,
                button,
            } => {
                self.clear_ghost(out_commands);
                if let Some(button) = button {
                    out_events.push(Event::BoardClicked { world_position });
                    if matches!(button, MouseButton::Primary | MouseButton::Secondary) {
                        self.deselect(out_commands, out_events);
                    }
                }
            }
            Input::PointerOverTerrain { world_position } => {
                error!(%world_position, "terrain hover has no handling");
                return Err(RoutingError::NotImplemented {
                    input: "pointer over terrain",
                });
            }
            Input::MoveTo {
                destination,
                running,
            } => self.order(out_commands, |unit| Command::MoveUnit {
                unit,
                destination,
                running,
            }),
            Input::Wheel { direction, running } => self.order(out_commands, |unit| {
                Command::WheelUnit {
                    unit,
                    direction,
                    running,
                }
            }),
            Input::StopWheel => self.order(out_commands, |unit| Command::StopWheel { unit }),
            Input::ManualMove { direction, running } => self.order(out_commands, |unit| {
                Command::ManualMoveUnit {
                    unit,
                    direction,
                    running,
                }
            }),
            Input::StopManualMove => {
                self.order(out_commands, |unit| Command::StopManualMove { unit })
            }
            Input::SelectUnit { unit } => self.select(unit, units, out_commands, out_events),
            Input::Deselect => self.deselect(out_commands, out_events),
        }

        Ok(())
    }

    fn order(&self, out_commands: &mut Vec<Command>, command: impl FnOnce(UnitId) -> Command) {
        match self.selected {
            Some(unit) => out_commands.push(command(unit)),
            None => warn!("order issued with no unit selected"),
        }
    }

    fn style_for(&self, unit: UnitId, units: &UnitView) -> Option<HighlightStyle> {
        let snapshot = units.get(unit)?;
        Some(if snapshot.faction == self.player_faction {
            HighlightStyle::Friendly
        } else {
            HighlightStyle::Enemy
        })
    }

    fn select(
        &mut self,
        unit: UnitId,
        units: &UnitView,
        out_commands: &mut Vec<Command>,
        out_events: &mut Vec<Event>,
    ) {
        if self.selected == Some(unit) {
            return;
        }

        let Some(style) = self.style_for(unit, units) else {
            warn!(unit = unit.get(), "cannot select unknown unit");
            return;
        };

        if let Some(ghost) = self.ghost.take() {
            if ghost != unit {
                out_commands.push(Command::ClearHighlight { unit: ghost });
            }
        }
        if let Some(previous) = self.selected.take() {
            out_commands.push(Command::ClearHighlight { unit: previous });
        }

        out_commands.push(Command::HighlightUnit {
            unit,
            style,
            intensity: HighlightIntensity::Full,
        });
        self.selected = Some(unit);
        debug!(unit = unit.get(), "unit selected");

        let location = units
            .get(unit)
            .and_then(|snapshot| snapshot.pivot())
            .map(|pivot| pivot.position);
        out_events.push(Event::SelectedUnitLocationChanged { location });
    }

    fn deselect(&mut self, out_commands: &mut Vec<Command>, out_events: &mut Vec<Event>) {
        match self.selected.take() {
            Some(previous) => {
                out_commands.push(Command::ClearHighlight { unit: previous });
                debug!(unit = previous.get(), "unit deselected");
            }
            None => warn!("deselect requested with nothing selected"),
        }
        out_events.push(Event::SelectedUnitLocationChanged { location: None });
    }

    fn ghost_select(&mut self, unit: UnitId, units: &UnitView, out_commands: &mut Vec<Command>) {
        if self.ghost == Some(unit) {
            return;
        }
        self.clear_ghost(out_commands);
        if self.selected == Some(unit) {
            return;
        }

        let Some(style) = self.style_for(unit, units) else {
            warn!(unit = unit.get(), "cannot ghost select unknown unit");
            return;
        };
        out_commands.push(Command::HighlightUnit {
            unit,
            style,
            intensity: HighlightIntensity::Ghost,
        });
        self.ghost = Some(unit);
    }

    fn clear_ghost(&mut self, out_commands: &mut Vec<Command>) {
        if let Some(ghost) = self.ghost.take() {
            out_commands.push(Command::ClearHighlight { unit: ghost });
        }
    }
}
