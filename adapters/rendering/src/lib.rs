#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Shared rendering contracts for Phalanx adapters.

use std::{collections::BTreeMap, error::Error, fmt};

use anyhow::Result as AnyResult;
use glam::{Quat, Vec3};
use phalanx_core::{
    Event, Highlight, HighlightIntensity, HighlightShape, HighlightStyle, StandId, UnitId,
};

/// How far a ghost highlight is lightened toward white.
const GHOST_LIGHTEN: f32 = 0.6;

/// RGBA color used when presenting frames.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
    /// Red channel intensity in the range 0.0..=1.0.
    pub red: f32,
    /// Green channel intensity in the range 0.0..=1.0.
    pub green: f32,
    /// Blue channel intensity in the range 0.0..=1.0.
    pub blue: f32,
    /// Alpha channel intensity in the range 0.0..=1.0.
    pub alpha: f32,
}

impl Color {
    /// Creates a new color from floating point channels.
    #[must_use]
    pub const fn new(red: f32, green: f32, blue: f32, alpha: f32) -> Self {
        Self {
            red,
            green,
            blue,
            alpha,
        }
    }

    /// Creates an opaque color from byte RGB values.
    #[must_use]
    pub const fn from_rgb_u8(red: u8, green: u8, blue: u8) -> Self {
        Self {
            red: red as f32 / 255.0,
            green: green as f32 / 255.0,
            blue: blue as f32 / 255.0,
            alpha: 1.0,
        }
    }

    /// Returns a new color lightened towards white by the provided amount.
    #[must_use]
    pub fn lighten(self, amount: f32) -> Self {
        let amount = amount.clamp(0.0, 1.0);

        Self {
            red: lighten_channel(self.red, amount),
            green: lighten_channel(self.green, amount),
            blue: lighten_channel(self.blue, amount),
            alpha: self.alpha,
        }
    }

    /// Color used to outline a stand with the provided style and intensity.
    #[must_use]
    pub fn for_highlight(style: HighlightStyle, intensity: HighlightIntensity) -> Self {
        let base = match style {
            HighlightStyle::Friendly => Self::from_rgb_u8(46, 160, 67),
            HighlightStyle::Enemy => Self::from_rgb_u8(200, 40, 40),
        };
        match intensity {
            HighlightIntensity::Full => base,
            HighlightIntensity::Ghost => base.lighten(GHOST_LIGHTEN),
        }
    }
}

fn lighten_channel(channel: f32, amount: f32) -> f32 {
    channel + (1.0 - channel) * amount
}

/// Outline drawn under a single stand.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StandOutline {
    /// Unit owning the stand.
    pub unit: UnitId,
    /// Outlined stand.
    pub stand: StandId,
    /// World position of the stand centre.
    pub position: Vec3,
    /// World rotation of the stand.
    pub rotation: Quat,
    /// Outline shape.
    pub shape: HighlightShape,
    /// Orthographic half-size of the outline.
    pub extent: f32,
    /// Outline color.
    pub color: Color,
}

impl StandOutline {
    fn from_highlight(
        unit: UnitId,
        stand: StandId,
        position: Vec3,
        rotation: Quat,
        highlight: Highlight,
    ) -> Self {
        Self {
            unit,
            stand,
            position,
            rotation,
            shape: highlight.shape,
            extent: highlight.extent,
            color: Color::for_highlight(highlight.style, highlight.intensity),
        }
    }
}

/// Capability implemented by backends that draw stand highlights.
pub trait HighlightRenderer {
    /// Draws or replaces the outline under a stand.
    fn apply_highlight(&mut self, outline: StandOutline) -> AnyResult<()>;

    /// Removes every outline drawn for the unit.
    fn clear_highlight(&mut self, unit: UnitId) -> AnyResult<()>;
}

/// Forwards highlight events to the renderer in order.
pub fn present<R>(events: &[Event], renderer: &mut R) -> AnyResult<()>
where
    R: HighlightRenderer + ?Sized,
{
    for event in events {
        match *event {
            Event::StandHighlighted {
                unit,
                stand,
                position,
                rotation,
                highlight,
            } => renderer.apply_highlight(StandOutline::from_highlight(
                unit, stand, position, rotation, highlight,
            ))?,
            Event::HighlightCleared { unit } | Event::UnitRemoved { unit } => {
                renderer.clear_highlight(unit)?
            }
            _ => {}
        }
    }
    Ok(())
}

/// In-memory highlight layer keyed by stand.
#[derive(Clone, Debug, Default)]
pub struct OutlineLayer {
    outlines: BTreeMap<StandId, StandOutline>,
}

impl OutlineLayer {
    /// Creates an empty layer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Outlines currently drawn, in stand order.
    pub fn iter(&self) -> impl Iterator<Item = &StandOutline> {
        self.outlines.values()
    }

    /// Number of outlined stands.
    #[must_use]
    pub fn len(&self) -> usize {
        self.outlines.len()
    }

    /// Reports whether nothing is outlined.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.outlines.is_empty()
    }
}

impl HighlightRenderer for OutlineLayer {
    fn apply_highlight(&mut self, outline: StandOutline) -> AnyResult<()> {
        if !outline.extent.is_finite() || outline.extent <= 0.0 {
            return Err(RenderingError::InvalidExtent {
                extent: outline.extent,
            }
            .into());
        }
        let _ = self.outlines.insert(outline.stand, outline);
        Ok(())
    }

    fn clear_highlight(&mut self, unit: UnitId) -> AnyResult<()> {
        self.outlines.retain(|_, outline| outline.unit != unit);
        Ok(())
    }
}

/// Developer overlay fed from world and selection events.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DevConsole {
    selected_location: Option<Vec3>,
    last_click: Option<Vec3>,
    destination_preview: Vec<Vec3>,
    wheel_points: Option<(Vec3, Vec3)>,
}

impl DevConsole {
    /// Creates an empty console.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Updates the console from the provided events.
    pub fn observe(&mut self, events: &[Event]) {
        for event in events {
            match event {
                Event::SelectedUnitLocationChanged { location } => {
                    self.selected_location = *location;
                }
                Event::BoardClicked { world_position } => self.last_click = Some(*world_position),
                Event::DestinationPreview { positions, .. } => {
                    self.destination_preview.clone_from(positions);
                }
                Event::WheelPointsComputed { left, right, .. } => {
                    self.wheel_points = Some((*left, *right));
                }
                _ => {}
            }
        }
    }

    /// Pivot location of the selected unit, if any.
    #[must_use]
    pub fn selected_location(&self) -> Option<Vec3> {
        self.selected_location
    }

    /// Destinations from the latest move order.
    #[must_use]
    pub fn destination_preview(&self) -> &[Vec3] {
        &self.destination_preview
    }

    /// Text lines describing the current console state.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        let mut lines = vec![
            format!(
                "Selected unit location: {}",
                describe(self.selected_location)
            ),
            format!("Mouse click position: {}", describe(self.last_click)),
        ];
        if let Some((left, right)) = self.wheel_points {
            lines.push(format!("Wheel points: left {left} right {right}"));
        }
        for (index, position) in self.destination_preview.iter().enumerate() {
            lines.push(format!("Destination {index}: {position}"));
        }
        lines
    }
}

fn describe(position: Option<Vec3>) -> String {
    position.map_or_else(|| "<none>".to_owned(), |position| position.to_string())
}

/// Errors raised by the bundled renderers.
#[derive(Debug, PartialEq)]
pub enum RenderingError {
    /// Outline extents must be positive and finite.
    InvalidExtent {
        /// Provided extent that failed validation.
        extent: f32,
    },
}

impl fmt::Display for RenderingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidExtent { extent } => {
                write!(f, "outline extent must be positive (received {extent})")
            }
        }
    }
}

impl Error for RenderingError {}

#[cfg(test)]
mod tests {
    use super::*;

    fn highlighted(unit: u32, stand: u32, intensity: HighlightIntensity, extent: f32) -> Event {
        Event::StandHighlighted {
            unit: UnitId::new(unit),
            stand: StandId::new(stand),
            position: Vec3::new(stand as f32, 0.0, 0.0),
            rotation: Quat::IDENTITY,
            highlight: Highlight {
                style: HighlightStyle::Friendly,
                intensity,
                shape: HighlightShape::Square,
                extent,
            },
        }
    }

    #[test]
    fn ghost_colors_are_lighter_than_full() {
        let full = Color::for_highlight(HighlightStyle::Enemy, HighlightIntensity::Full);
        let ghost = Color::for_highlight(HighlightStyle::Enemy, HighlightIntensity::Ghost);
        assert!(ghost.green > full.green);
        assert!(ghost.blue > full.blue);
        assert_eq!(ghost.alpha, full.alpha);
    }

    #[test]
    fn present_applies_and_clears_per_unit() {
        let mut layer = OutlineLayer::new();
        present(
            &[
                highlighted(1, 0, HighlightIntensity::Full, 1.5),
                highlighted(1, 1, HighlightIntensity::Full, 1.5),
                highlighted(2, 2, HighlightIntensity::Ghost, 1.5),
            ],
            &mut layer,
        )
        .expect("present");
        assert_eq!(layer.len(), 3);

        present(
            &[Event::HighlightCleared {
                unit: UnitId::new(1),
            }],
            &mut layer,
        )
        .expect("present");
        let remaining: Vec<StandId> = layer.iter().map(|outline| outline.stand).collect();
        assert_eq!(remaining, vec![StandId::new(2)]);

        present(
            &[Event::UnitRemoved {
                unit: UnitId::new(2),
            }],
            &mut layer,
        )
        .expect("present");
        assert!(layer.is_empty());
    }

    #[test]
    fn degenerate_extent_is_rejected() {
        let mut layer = OutlineLayer::new();
        let error = present(&[highlighted(1, 0, HighlightIntensity::Full, 0.0)], &mut layer)
            .expect_err("zero extent");
        assert_eq!(
            error.downcast_ref::<RenderingError>(),
            Some(&RenderingError::InvalidExtent { extent: 0.0 })
        );
    }

    #[test]
    fn console_reports_none_until_something_is_selected() {
        let mut console = DevConsole::new();
        assert_eq!(
            console.lines(),
            vec![
                "Selected unit location: <none>".to_owned(),
                "Mouse click position: <none>".to_owned(),
            ]
        );

        console.observe(&[
            Event::SelectedUnitLocationChanged {
                location: Some(Vec3::new(1.0, 0.0, 2.0)),
            },
            Event::DestinationPreview {
                unit: UnitId::new(1),
                positions: vec![Vec3::ZERO, Vec3::X],
            },
            Event::WheelPointsComputed {
                unit: UnitId::new(1),
                left: Vec3::NEG_X,
                right: Vec3::X,
            },
        ]);
        assert_eq!(console.selected_location(), Some(Vec3::new(1.0, 0.0, 2.0)));
        assert_eq!(console.destination_preview(), &[Vec3::ZERO, Vec3::X]);
        assert_eq!(console.lines().len(), 5);

        console.observe(&[Event::SelectedUnitLocationChanged { location: None }]);
        assert_eq!(console.selected_location(), None);
        assert_eq!(console.lines()[0], "Selected unit location: <none>");
    }
}
