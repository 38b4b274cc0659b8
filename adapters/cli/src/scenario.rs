//! Battle scenarios loaded from TOML.

use std::{collections::BTreeMap, fs, path::Path};

use anyhow::{bail, Context, Result};
use glam::Vec3;
use phalanx_core::{Flank, Input, MouseButton, SurfaceHeight, UnitId, UnitProfile};
use serde::Deserialize;

const DEFAULT_TICKS: u64 = 600;
const DEFAULT_TICK_MS: u64 = 16;

/// Complete battle description.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct Scenario {
    /// Faction whose units are highlighted as friendly.
    pub(crate) player_faction: String,
    /// Number of ticks to simulate.
    #[serde(default = "default_ticks")]
    pub(crate) ticks: u64,
    /// Simulated milliseconds per tick.
    #[serde(default = "default_tick_ms")]
    pub(crate) tick_ms: u64,
    /// Ground the stands rest on.
    #[serde(default)]
    pub(crate) terrain: Terrain,
    /// Unit profiles keyed by name.
    pub(crate) profiles: BTreeMap<String, UnitProfile>,
    /// Units placed at the start of the battle.
    #[serde(default)]
    pub(crate) units: Vec<UnitEntry>,
    /// Player inputs keyed by the tick they are issued on.
    #[serde(default)]
    pub(crate) script: Vec<ScriptStep>,
}

impl Scenario {
    /// Reads and validates a scenario file.
    pub(crate) fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read scenario {}", path.display()))?;
        let scenario = Self::parse(&text)
            .with_context(|| format!("failed to parse scenario {}", path.display()))?;
        Ok(scenario)
    }

    /// Parses and validates scenario text.
    pub(crate) fn parse(text: &str) -> Result<Self> {
        let scenario: Self = toml::from_str(text)?;
        scenario.validate()?;
        Ok(scenario)
    }

    fn validate(&self) -> Result<()> {
        for unit in &self.units {
            if !self.profiles.contains_key(&unit.profile) {
                bail!(
                    "unit {} references unknown profile `{}`",
                    unit.id,
                    unit.profile
                );
            }
        }
        if self.tick_ms == 0 {
            bail!("tick_ms must be positive");
        }
        Ok(())
    }

    /// Inputs scripted for the provided tick, in file order.
    pub(crate) fn inputs_at(&self, tick: u64) -> impl Iterator<Item = Input> + '_ {
        self.script
            .iter()
            .filter(move |step| step.tick == tick)
            .map(|step| step.action.to_input())
    }
}

fn default_ticks() -> u64 {
    DEFAULT_TICKS
}

fn default_tick_ms() -> u64 {
    DEFAULT_TICK_MS
}

fn default_true() -> bool {
    true
}

/// Height field under the battlefield.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub(crate) enum Terrain {
    /// Level ground.
    Flat {
        /// Ground height.
        #[serde(default)]
        height: f32,
    },
    /// A single ridge running along the Z axis.
    Ridge {
        /// Height of the crest above the surrounding ground.
        height: f32,
        /// X coordinate of the crest.
        crest_x: f32,
        /// Distance from the crest to the foot of each slope.
        half_width: f32,
    },
}

impl Default for Terrain {
    fn default() -> Self {
        Self::Flat { height: 0.0 }
    }
}

impl SurfaceHeight for Terrain {
    fn sample_height(&self, x: f32, _z: f32) -> f32 {
        match *self {
            Self::Flat { height } => height,
            Self::Ridge {
                height,
                crest_x,
                half_width,
            } => {
                if half_width <= 0.0 {
                    return 0.0;
                }
                let falloff = 1.0 - (x - crest_x).abs() / half_width;
                height * falloff.max(0.0)
            }
        }
    }
}

/// Unit placed at the start of the battle.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct UnitEntry {
    pub(crate) id: u32,
    pub(crate) name: String,
    pub(crate) profile: String,
    pub(crate) stands: u32,
    /// Stands per rank; falls back to the profile's full rank.
    pub(crate) width: Option<u32>,
    pub(crate) location: Vec3,
    #[serde(default)]
    pub(crate) yaw_degrees: f32,
    #[serde(default = "default_true")]
    pub(crate) stands_visible: bool,
    #[serde(default)]
    pub(crate) diagnostics: bool,
}

impl UnitEntry {
    pub(crate) fn unit_id(&self) -> UnitId {
        UnitId::new(self.id)
    }
}

/// One scripted input.
#[derive(Clone, Debug, Deserialize)]
pub(crate) struct ScriptStep {
    pub(crate) tick: u64,
    #[serde(flatten)]
    pub(crate) action: ScriptAction,
}

/// Player action as written in scenario files.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub(crate) enum ScriptAction {
    Hover {
        unit: u32,
        #[serde(default)]
        modifier: bool,
    },
    Click {
        unit: u32,
        #[serde(default = "primary")]
        button: MouseButton,
    },
    BoardHover {
        position: Vec3,
    },
    BoardClick {
        position: Vec3,
        #[serde(default = "primary")]
        button: MouseButton,
    },
    TerrainHover {
        position: Vec3,
    },
    MoveTo {
        destination: Vec3,
        #[serde(default)]
        running: bool,
    },
    Wheel {
        toward: Flank,
        #[serde(default)]
        running: bool,
    },
    StopWheel,
    ManualMove {
        direction: Vec3,
        #[serde(default)]
        running: bool,
    },
    StopManualMove,
    Select {
        unit: u32,
    },
    Deselect,
}

fn primary() -> MouseButton {
    MouseButton::Primary
}

impl ScriptAction {
    pub(crate) fn to_input(self) -> Input {
        match self {
            Self::Hover { unit, modifier } => Input::PointerOverPiece {
                unit: UnitId::new(unit),
                world_position: Vec3::ZERO,
                button: None,
                modifier,
            },
            Self::Click { unit, button } => Input::PointerOverPiece {
                unit: UnitId::new(unit),
                world_position: Vec3::ZERO,
                button: Some(button),
                modifier: false,
            },
            Self::BoardHover { position } => Input::PointerOverBoard {
                world_position: position,
                button: None,
            },
            Self::BoardClick { position, button } => Input::PointerOverBoard {
                world_position: position,
                button: Some(button),
            },
            Self::TerrainHover { position } => Input::PointerOverTerrain {
                world_position: position,
            },
            Self::MoveTo {
                destination,
                running,
            } => Input::MoveTo {
                destination,
                running,
            },
            Self::Wheel { toward, running } => Input::Wheel {
                direction: toward.local_vector(),
                running,
            },
            Self::StopWheel => Input::StopWheel,
            Self::ManualMove { direction, running } => Input::ManualMove { direction, running },
            Self::StopManualMove => Input::StopManualMove,
            Self::Select { unit } => Input::SelectUnit {
                unit: UnitId::new(unit),
            },
            Self::Deselect => Input::Deselect,
        }
    }
}
