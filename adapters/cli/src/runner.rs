//! Headless battle loop.

use std::{fmt, time::Duration};

use anyhow::{Context, Result};
use phalanx_core::{Command, Event, Faction, Input, UnitSnapshot};
use phalanx_rendering::{present, DevConsole, OutlineLayer};
use phalanx_system_selection::Selection;
use phalanx_world::{self as world, query, World};
use tracing::{debug, info, warn};

use crate::scenario::Scenario;

/// Final state of a simulated battle.
#[derive(Debug)]
pub(crate) struct Report {
    pub(crate) ticks: u64,
    pub(crate) units: Vec<UnitSnapshot>,
    pub(crate) console: Vec<String>,
    pub(crate) outlined_stands: usize,
    pub(crate) rejected: usize,
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Simulated {} ticks", self.ticks)?;
        for unit in &self.units {
            writeln!(
                f,
                "Unit {} \"{}\" ({})",
                unit.id.get(),
                unit.name,
                unit.faction.name()
            )?;
            for stand in &unit.stands {
                writeln!(
                    f,
                    "  rank {} file {}: {:.2} {:.2} {:.2} {:?}",
                    stand.slot.rank(),
                    stand.slot.file(),
                    stand.position.x,
                    stand.position.y,
                    stand.position.z,
                    stand.phase
                )?;
            }
        }
        writeln!(f, "Outlined stands: {}", self.outlined_stands)?;
        writeln!(f, "Rejected orders: {}", self.rejected)?;
        for line in &self.console {
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}

/// Musters the scenario's units and plays its script for `ticks` ticks.
pub(crate) fn run(scenario: &Scenario, ticks: u64, tick_ms: u64) -> Result<Report> {
    let mut world = World::with_surface(scenario.terrain);
    let mut selection = Selection::new(Faction::new(scenario.player_faction.as_str()));
    let mut outlines = OutlineLayer::new();
    let mut console = DevConsole::new();
    let mut rejected = 0;

    let mut pending = Vec::new();
    for entry in &scenario.units {
        let profile = scenario
            .profiles
            .get(&entry.profile)
            .cloned()
            .with_context(|| format!("unit {} has no profile", entry.id))?;
        let width = entry.width.unwrap_or(profile.full_rank);
        world::apply(
            &mut world,
            Command::SpawnUnit {
                unit: entry.unit_id(),
                name: entry.name.clone(),
                profile,
                stand_count: entry.stands,
                horizontal_stand_count: width,
                location: entry.location,
                yaw_degrees: entry.yaw_degrees,
                stands_visible: entry.stands_visible,
            },
            &mut pending,
        )
        .with_context(|| format!("failed to muster unit {}", entry.id))?;

        if entry.diagnostics {
            world::apply(
                &mut world,
                Command::SetDiagnostics {
                    unit: entry.unit_id(),
                    enabled: true,
                },
                &mut pending,
            )?;
        }
    }
    info!(units = scenario.units.len(), ticks, tick_ms, "battle mustered");

    let dt = Duration::from_millis(tick_ms);
    for tick in 0..ticks {
        let view = query::unit_view(&world);
        let mut commands = Vec::new();
        let mut notifications = Vec::new();

        let inputs: Vec<Input> = scenario.inputs_at(tick).collect();
        if !inputs.is_empty() {
            debug!(tick, ?inputs, "scripted inputs");
        }
        if let Err(error) =
            selection.handle(&inputs, &pending, &view, &mut commands, &mut notifications)
        {
            warn!(tick, %error, "input rejected");
            rejected += 1;
        }

        let mut events = Vec::new();
        for command in commands {
            if let Err(error) = world::apply(&mut world, command, &mut events) {
                warn!(tick, %error, "order rejected");
                rejected += 1;
            }
        }
        world::apply(&mut world, Command::Tick { dt }, &mut events)?;

        present(&events, &mut outlines)?;
        console.observe(&notifications);
        console.observe(&events);
        log_arrivals(tick, &events);
        pending = events;
    }

    Ok(Report {
        ticks,
        units: query::unit_view(&world).into_vec(),
        console: console.lines(),
        outlined_stands: outlines.len(),
        rejected,
    })
}

fn log_arrivals(tick: u64, events: &[Event]) {
    for event in events {
        if let Event::UnitArrived { unit } = event {
            info!(tick, unit = unit.get(), "unit arrived");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use phalanx_core::{HighlightIntensity, StandPhase};

    const SCENARIO: &str = r#"
player_faction = "Arturia"

[profiles.spearmen]
faction = "Arturia"
kind = "infantry"
walk_speed = 3.0
run_speed = 6.0
wheel_speed = 30.0
stand_size = 2.0
models_per_stand = 1
spacing = 1.0
full_rank = 3

[profiles.raiders]
faction = "Vastmark"
kind = "cavalry"
walk_speed = 5.0
run_speed = 9.0
wheel_speed = 45.0
stand_size = 2.0
models_per_stand = 1
spacing = 1.0
full_rank = 2

[[units]]
id = 1
name = "Spearmen"
profile = "spearmen"
stands = 6
location = [0.0, 0.0, 0.0]
diagnostics = true

[[units]]
id = 2
name = "Raiders"
profile = "raiders"
stands = 2
location = [-30.0, 0.0, 0.0]

[[script]]
tick = 0
action = "click"
unit = 1

[[script]]
tick = 1
action = "move_to"
destination = [0.0, 0.0, 10.0]
running = true

[[script]]
tick = 2
action = "terrain_hover"
position = [4.0, 0.0, 4.0]

[[script]]
tick = 3
action = "hover"
unit = 2
"#;

    #[test]
    fn scripted_battle_moves_the_selected_unit() {
        let scenario = Scenario::parse(SCENARIO).expect("scenario");
        let report = run(&scenario, 300, 16).expect("run");

        let spearmen = &report.units[0];
        assert_eq!(spearmen.name, "Spearmen");
        let pivot = spearmen.pivot().expect("pivot");
        assert!(pivot.position.distance(Vec3::new(0.0, 0.0, 9.0)) < 0.5);
        assert!(spearmen
            .stands
            .iter()
            .all(|stand| stand.phase == StandPhase::Idle));
        assert!(spearmen.stands.iter().all(|stand| stand
            .highlight
            .is_some_and(|highlight| highlight.intensity == HighlightIntensity::Full)));

        // Terrain hover is unsupported and cavalry cannot be highlighted.
        assert_eq!(report.rejected, 2);
        assert_eq!(report.outlined_stands, 6);
        assert!(report.console[0].starts_with("Selected unit location: [0"));
        assert!(report.to_string().contains("Unit 2 \"Raiders\" (Vastmark)"));
    }

    #[test]
    fn empty_script_leaves_units_in_place() {
        let scenario = Scenario::parse(SCENARIO).expect("scenario");
        let mut quiet = scenario.clone();
        quiet.script.clear();
        let report = run(&quiet, 10, 16).expect("run");
        assert_eq!(report.rejected, 0);
        assert_eq!(report.outlined_stands, 0);
        assert_eq!(report.console[0], "Selected unit location: <none>");
        assert_eq!(
            report.units[1].pivot().map(|stand| stand.position),
            Some(Vec3::new(-30.0, 0.0, 0.0))
        );
    }
}
