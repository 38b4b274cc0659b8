#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Phalanx formation engine.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative world, and pure systems. Adapters translate raw player
//! intent into [`Input`] values, the selection system routes those inputs to
//! the unit they address as [`Command`] values, the world executes commands
//! via its `apply` entry point and then broadcasts [`Event`] values for
//! systems and presenters to react to.

use std::time::Duration;

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Angle in degrees a stand must be within of its destination bearing before
/// it starts translating.
pub const FACING_THRESHOLD_DEGREES: f32 = 12.0;

/// Planar distance at which a translating stand counts as arrived.
pub const MOVEMENT_THRESHOLD: f32 = 0.5;

/// Unique identifier assigned to a unit within a battle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnitId(u32);

impl UnitId {
    /// Creates a new unit identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Unique identifier assigned to a stand by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StandId(u32);

impl StandId {
    /// Creates a new stand identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Position of a stand inside its unit's block.
///
/// Both indices are one based. Rank 1 is the front row. File 1 is the centre
/// column; even files sit left of centre and odd files above 1 sit right of
/// centre, so a five-wide rank reads `4 2 1 3 5` from left to right.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RankFile {
    rank: u32,
    file: u32,
}

impl RankFile {
    /// The pivot slot every other offset is measured from.
    pub const PIVOT: Self = Self { rank: 1, file: 1 };

    /// Creates a slot from one-based rank and file indices.
    #[must_use]
    pub const fn new(rank: u32, file: u32) -> Self {
        Self { rank, file }
    }

    /// One-based row index, 1 being the front rank.
    #[must_use]
    pub const fn rank(&self) -> u32 {
        self.rank
    }

    /// One-based column index, 1 being the centre file.
    #[must_use]
    pub const fn file(&self) -> u32 {
        self.file
    }

    /// Reports whether the slot is the unit's pivot (rank 1, file 1).
    #[must_use]
    pub const fn is_pivot(&self) -> bool {
        self.rank == 1 && self.file == 1
    }

    /// Reports whether both indices are one based.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.rank >= 1 && self.file >= 1
    }

    /// Signed column displacement from the centre file.
    ///
    /// Even files map to `-(file / 2)` (left), odd files map to
    /// `(file - 1) / 2` (right), and the centre file maps to zero.
    #[must_use]
    pub const fn file_position(&self) -> i32 {
        let file = self.file as i32;
        if file % 2 == 0 {
            -(file / 2)
        } else {
            (file - 1) / 2
        }
    }

    /// Number of ranks behind the front rank.
    #[must_use]
    pub const fn ranks_back(&self) -> u32 {
        self.rank.saturating_sub(1)
    }
}

/// One of the two ends of a unit's front rank.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Flank {
    /// The left end, reached through even files.
    Left,
    /// The right end, reached through odd files.
    Right,
}

impl Flank {
    /// Interprets a raw wheel direction vector.
    ///
    /// Only the exact left (`-X`) and right (`+X`) unit vectors are accepted.
    pub fn from_wheel_vector(direction: Vec3) -> Result<Self, FormationError> {
        if direction == Vec3::NEG_X {
            Ok(Self::Left)
        } else if direction == Vec3::X {
            Ok(Self::Right)
        } else {
            Err(FormationError::InvalidWheelDirection { direction })
        }
    }

    /// Unit vector pointing toward this flank in stand-local space.
    #[must_use]
    pub const fn local_vector(self) -> Vec3 {
        match self {
            Self::Left => Vec3::NEG_X,
            Self::Right => Vec3::X,
        }
    }

    /// Sign applied to right-pointing quantities for this flank.
    #[must_use]
    pub const fn sign(self) -> f32 {
        match self {
            Self::Left => -1.0,
            Self::Right => 1.0,
        }
    }
}

/// Broad category of a unit, used by presentation lookups.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitKind {
    /// Foot soldiers on square stands.
    Infantry,
    /// Mounted troops.
    Cavalry,
    /// Crewed war machines.
    Artillery,
}

/// Side a unit fights for.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Faction(String);

impl Faction {
    /// Creates a faction from its display name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Display name of the faction.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.0
    }
}

/// Read-only per-unit data consumed by the formation engine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UnitProfile {
    /// Faction the unit belongs to.
    pub faction: Faction,
    /// Category of troops in the unit.
    pub kind: UnitKind,
    /// Translation speed in world units per second when walking.
    pub walk_speed: f32,
    /// Translation speed in world units per second when running.
    pub run_speed: f32,
    /// Wheel rate in degrees per second.
    pub wheel_speed: f32,
    /// Edge length of a stand's square base.
    pub stand_size: f32,
    /// Number of miniatures mounted on each stand.
    pub models_per_stand: u32,
    /// Gap inserted between adjacent stand edges.
    pub spacing: f32,
    /// Stands per full rank.
    pub full_rank: u32,
    /// Highlight extent drawn around a visible stand.
    #[serde(default = "default_stand_extent")]
    pub selection_stand_extent: f32,
    /// Highlight extent drawn under models when the stand itself is hidden.
    #[serde(default = "default_model_extent")]
    pub selection_model_extent: f32,
}

impl UnitProfile {
    /// Speed used for a command issued at a walk or a run.
    #[must_use]
    pub fn speed(&self, running: bool) -> f32 {
        if running {
            self.run_speed
        } else {
            self.walk_speed
        }
    }
}

fn default_stand_extent() -> f32 {
    1.5
}

fn default_model_extent() -> f32 {
    0.5
}

/// Whether a highlighted unit is on the player's side.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HighlightStyle {
    /// Unit belongs to the player's faction.
    Friendly,
    /// Unit belongs to any other faction.
    Enemy,
}

/// Strength of a highlight.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HighlightIntensity {
    /// Committed selection.
    Full,
    /// Transient hover preview.
    Ghost,
}

/// Outline drawn under a stand.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HighlightShape {
    /// Square following the stand base.
    Square,
    /// Circle under each model.
    Circle,
}

/// Complete description of a stand highlight handed to renderers.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Highlight {
    /// Friend or foe colouring.
    pub style: HighlightStyle,
    /// Full selection or ghost preview.
    pub intensity: HighlightIntensity,
    /// Outline shape.
    pub shape: HighlightShape,
    /// Orthographic half-size of the outline.
    pub extent: f32,
}

/// Mouse buttons reported by pointer inputs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MouseButton {
    /// Default left click.
    Primary,
    /// Default right click.
    Secondary,
    /// Default middle click.
    Middle,
}

/// Player intent gathered by adapters and routed by the selection system.
#[derive(Clone, Debug, PartialEq)]
pub enum Input {
    /// Pointer hovers or clicks a unit.
    PointerOverPiece {
        /// Unit under the pointer.
        unit: UnitId,
        /// World position of the hit.
        world_position: Vec3,
        /// Button pressed this frame, if any.
        button: Option<MouseButton>,
        /// Whether a modifier key is held.
        modifier: bool,
    },
    /// Pointer hovers or clicks the empty board.
    PointerOverBoard {
        /// World position of the hit.
        world_position: Vec3,
        /// Button pressed this frame, if any.
        button: Option<MouseButton>,
    },
    /// Pointer hovers raw terrain outside the board.
    PointerOverTerrain {
        /// World position of the hit.
        world_position: Vec3,
    },
    /// Orders the selected unit to move so its pivot's front edge lands here.
    MoveTo {
        /// Clicked board position.
        destination: Vec3,
        /// Whether to run rather than walk.
        running: bool,
    },
    /// Starts wheeling the selected unit.
    Wheel {
        /// Raw direction vector; must be exactly left or right.
        direction: Vec3,
        /// Whether to run rather than walk.
        running: bool,
    },
    /// Stops wheeling the selected unit.
    StopWheel,
    /// Starts nudging the selected unit along a local heading.
    ManualMove {
        /// Stand-local heading.
        direction: Vec3,
        /// Whether to run rather than walk.
        running: bool,
    },
    /// Stops nudging the selected unit.
    StopManualMove,
    /// Selects the unit with the provided identifier.
    SelectUnit {
        /// Unit to select.
        unit: UnitId,
    },
    /// Clears the current selection.
    Deselect,
}

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Advances the simulation clock by the provided delta time.
    Tick {
        /// Duration of simulated time that elapsed since the previous tick.
        dt: Duration,
    },
    /// Creates a unit and lays out its stands in row-major order.
    SpawnUnit {
        /// Identifier to assign to the unit.
        unit: UnitId,
        /// Display name.
        name: String,
        /// Static data for the unit.
        profile: UnitProfile,
        /// Total number of stands.
        stand_count: u32,
        /// Stands per rank before wrapping to the next rank.
        horizontal_stand_count: u32,
        /// Position of the pivot stand.
        location: Vec3,
        /// Initial facing as a rotation about the vertical axis, in degrees.
        yaw_degrees: f32,
        /// Whether the stand bases are drawn.
        stands_visible: bool,
    },
    /// Removes a unit and all of its stands.
    RemoveUnit {
        /// Unit to remove.
        unit: UnitId,
    },
    /// Moves a unit so its pivot's front edge lands on the destination.
    MoveUnit {
        /// Unit to move.
        unit: UnitId,
        /// Raw clicked position.
        destination: Vec3,
        /// Whether to run rather than walk.
        running: bool,
    },
    /// Wheels a unit around one end of its front rank.
    WheelUnit {
        /// Unit to wheel.
        unit: UnitId,
        /// Raw direction vector; must be exactly left or right.
        direction: Vec3,
        /// Whether to run rather than walk.
        running: bool,
    },
    /// Stops a wheel in progress.
    StopWheel {
        /// Unit to stop.
        unit: UnitId,
    },
    /// Nudges a unit along a stand-local heading.
    ManualMoveUnit {
        /// Unit to move.
        unit: UnitId,
        /// Stand-local heading.
        direction: Vec3,
        /// Whether to run rather than walk.
        running: bool,
    },
    /// Stops a manual move in progress.
    StopManualMove {
        /// Unit to stop.
        unit: UnitId,
    },
    /// Cancels every pending motion on a unit.
    HaltUnit {
        /// Unit to halt.
        unit: UnitId,
    },
    /// Highlights every stand of a unit.
    HighlightUnit {
        /// Unit to highlight.
        unit: UnitId,
        /// Friend or foe colouring.
        style: HighlightStyle,
        /// Full selection or ghost preview.
        intensity: HighlightIntensity,
    },
    /// Removes every highlight from a unit.
    ClearHighlight {
        /// Unit to clear.
        unit: UnitId,
    },
    /// Toggles the per-tick pivot location feed for a unit.
    SetDiagnostics {
        /// Unit to configure.
        unit: UnitId,
        /// Whether location events are emitted.
        enabled: bool,
    },
    /// Teleports a unit. Not supported yet.
    SetUnitLocation {
        /// Unit to place.
        unit: UnitId,
        /// New pivot location.
        location: Vec3,
    },
    /// Turns a unit in place. Not supported yet.
    SetUnitRotation {
        /// Unit to turn.
        unit: UnitId,
        /// New facing, in degrees about the vertical axis.
        yaw_degrees: f32,
    },
}

/// Events broadcast by the world and systems after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Indicates that the simulation clock advanced.
    TimeAdvanced {
        /// Duration of simulated time that elapsed in the tick.
        dt: Duration,
    },
    /// Confirms that a unit and its stands were created.
    UnitSpawned {
        /// Identifier of the new unit.
        unit: UnitId,
        /// Number of stands created.
        stand_count: u32,
    },
    /// Confirms that a unit was removed.
    UnitRemoved {
        /// Identifier of the removed unit.
        unit: UnitId,
    },
    /// Reports the pivot stand's position for a unit with diagnostics on.
    UnitLocationChanged {
        /// Unit being reported.
        unit: UnitId,
        /// World position of the pivot stand.
        position: Vec3,
    },
    /// Lists every stand's computed destination after a move order.
    DestinationPreview {
        /// Unit that was ordered to move.
        unit: UnitId,
        /// One destination per stand, pivot first.
        positions: Vec<Vec3>,
    },
    /// Reports the two pivot points computed for a wheel order.
    WheelPointsComputed {
        /// Unit that was ordered to wheel.
        unit: UnitId,
        /// Upper-left corner of the leftmost front-rank stand.
        left: Vec3,
        /// Upper-right corner of the rightmost front-rank stand.
        right: Vec3,
    },
    /// Reports that a stand reached its destination.
    StandArrived {
        /// Unit owning the stand.
        unit: UnitId,
        /// Stand that arrived.
        stand: StandId,
    },
    /// Reports that every stand of a moving unit reached its destination.
    UnitArrived {
        /// Unit that arrived.
        unit: UnitId,
    },
    /// Asks renderers to highlight a stand.
    StandHighlighted {
        /// Unit owning the stand.
        unit: UnitId,
        /// Highlighted stand.
        stand: StandId,
        /// World position of the stand.
        position: Vec3,
        /// World rotation of the stand.
        rotation: Quat,
        /// Highlight to draw.
        highlight: Highlight,
    },
    /// Asks renderers to remove every highlight of a unit.
    HighlightCleared {
        /// Unit whose highlights are removed.
        unit: UnitId,
    },
    /// Reports the selected unit's pivot location, or `None` when cleared.
    SelectedUnitLocationChanged {
        /// Pivot location of the selected unit.
        location: Option<Vec3>,
    },
    /// Reports where the pointer last clicked the board.
    BoardClicked {
        /// Clicked world position.
        world_position: Vec3,
    },
}

/// Motion phase a stand is currently in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StandPhase {
    /// No pending motion.
    Idle,
    /// Turning to face a destination before translating.
    Rotating,
    /// Translating toward a destination.
    Translating,
    /// Orbiting a wheel pivot point.
    Wheeling,
    /// Following a manual heading.
    ManualMoving,
}

/// Immutable representation of a single stand used for queries.
#[derive(Clone, Debug, PartialEq)]
pub struct StandSnapshot {
    /// Identifier assigned to the stand.
    pub id: StandId,
    /// Slot occupied inside the unit.
    pub slot: RankFile,
    /// World position of the stand centre.
    pub position: Vec3,
    /// World rotation of the stand.
    pub rotation: Quat,
    /// Edge length of the stand base.
    pub edge_length: f32,
    /// Current motion phase.
    pub phase: StandPhase,
    /// Pending destination, if any.
    pub destination: Option<Vec3>,
    /// Point the stand orbits while wheeling.
    pub wheel_pivot: Option<Vec3>,
    /// Whether the stand follows a manual heading.
    pub manual_moving: bool,
    /// Speed chosen by the last command.
    pub speed: f32,
    /// World positions of the models mounted on the stand.
    pub model_positions: Vec<Vec3>,
    /// Highlight currently applied to the stand.
    pub highlight: Option<Highlight>,
}

/// Immutable representation of a single unit used for queries.
#[derive(Clone, Debug, PartialEq)]
pub struct UnitSnapshot {
    /// Identifier assigned to the unit.
    pub id: UnitId,
    /// Display name.
    pub name: String,
    /// Faction the unit belongs to.
    pub faction: Faction,
    /// Stands in creation order; the pivot stand comes first.
    pub stands: Vec<StandSnapshot>,
}

impl UnitSnapshot {
    /// The pivot stand, if the unit has any stands.
    #[must_use]
    pub fn pivot(&self) -> Option<&StandSnapshot> {
        self.stands.first()
    }

    /// Finds the stand occupying the provided slot.
    #[must_use]
    pub fn stand_at(&self, slot: RankFile) -> Option<&StandSnapshot> {
        self.stands.iter().find(|stand| stand.slot == slot)
    }

    /// Reports whether every stand is idle.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.stands
            .iter()
            .all(|stand| stand.phase == StandPhase::Idle)
    }
}

/// Read-only snapshot describing every unit on the battlefield.
#[derive(Clone, Debug, Default)]
pub struct UnitView {
    snapshots: Vec<UnitSnapshot>,
}

impl UnitView {
    /// Creates a new unit view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<UnitSnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id);
        Self { snapshots }
    }

    /// Iterator over the captured unit snapshots in identifier order.
    pub fn iter(&self) -> impl Iterator<Item = &UnitSnapshot> {
        self.snapshots.iter()
    }

    /// Looks up a unit by identifier.
    #[must_use]
    pub fn get(&self, unit: UnitId) -> Option<&UnitSnapshot> {
        self.snapshots
            .binary_search_by_key(&unit, |snapshot| snapshot.id)
            .ok()
            .and_then(|index| self.snapshots.get(index))
    }

    /// Consumes the view, yielding the underlying snapshots.
    #[must_use]
    pub fn into_vec(self) -> Vec<UnitSnapshot> {
        self.snapshots
    }
}

/// Supplies the height of the supporting surface under a point.
pub trait SurfaceHeight {
    /// Height of the surface at the provided world X/Z coordinates.
    fn sample_height(&self, x: f32, z: f32) -> f32;
}

impl<F> SurfaceHeight for F
where
    F: Fn(f32, f32) -> f32,
{
    fn sample_height(&self, x: f32, z: f32) -> f32 {
        self(x, z)
    }
}

/// Level surface at a fixed height.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FlatSurface {
    height: f32,
}

impl FlatSurface {
    /// Creates a level surface at the provided height.
    #[must_use]
    pub const fn at(height: f32) -> Self {
        Self { height }
    }
}

impl SurfaceHeight for FlatSurface {
    fn sample_height(&self, _x: f32, _z: f32) -> f32 {
        self.height
    }
}

/// Precondition failures raised by formation geometry and unit commands.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum FormationError {
    /// A non-pivot offset was requested without a pivot stand to measure from.
    #[error("offset requested for {slot:?} but no pivot stand is available")]
    MissingPivot {
        /// Slot whose offset was requested.
        slot: RankFile,
    },
    /// A rank or file index was zero.
    #[error("rank and file indices are one based, got {slot:?}")]
    InvalidSlot {
        /// Offending slot.
        slot: RankFile,
    },
    /// A wheel was requested with something other than the left or right vector.
    #[error("wheel direction must be exactly left or right, got {direction}")]
    InvalidWheelDirection {
        /// Offending direction.
        direction: Vec3,
    },
    /// A move was ordered toward a point that is not finite.
    #[error("move destination must be finite, got {destination}")]
    InvalidDestination {
        /// Offending destination.
        destination: Vec3,
    },
    /// A manual move heading was not finite.
    #[error("manual move direction must be finite, got {direction}")]
    InvalidDirection {
        /// Offending direction.
        direction: Vec3,
    },
    /// No model layout exists for the stand size and model count.
    #[error("stand of edge {edge_length} does not support {models} models")]
    UnsupportedStandLayout {
        /// Stand edge length.
        edge_length: f32,
        /// Requested model count.
        models: u32,
    },
    /// No highlight lookup exists for the unit kind.
    #[error("highlights are not supported for {kind:?} units")]
    UnsupportedUnitKind {
        /// Offending unit kind.
        kind: UnitKind,
    },
    /// The operation exists but has no implementation yet.
    #[error("{operation} is not implemented")]
    NotImplemented {
        /// Name of the missing operation.
        operation: &'static str,
    },
}
