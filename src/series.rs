// Series builder: selection + table -> series descriptors

use serde::Serialize;
use tracing::debug;

use crate::data::Table;
use crate::error::{ChartError, ChartResult};
use crate::palette::{palette_color, PastelColor};
use crate::selection::{ChartKind, SelectionState, MAX_Y_COLUMNS};
use crate::units::extract_unit;

/// Which Y axis a series is plotted against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AxisSide {
    Primary,
    Secondary,
}

/// How the points of a series are drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RenderMode {
    /// Connected points with markers.
    #[serde(rename = "lines+markers")]
    LinesMarkers,
    /// Markers only.
    #[serde(rename = "markers")]
    Markers,
    /// Connected lines without markers.
    #[serde(rename = "lines")]
    Lines,
}

impl RenderMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RenderMode::LinesMarkers => "lines+markers",
            RenderMode::Markers => "markers",
            RenderMode::Lines => "lines",
        }
    }

    pub fn draws_lines(&self) -> bool {
        matches!(self, RenderMode::LinesMarkers | RenderMode::Lines)
    }

    pub fn draws_markers(&self) -> bool {
        matches!(self, RenderMode::LinesMarkers | RenderMode::Markers)
    }
}

impl From<ChartKind> for RenderMode {
    // `Bar` is drawn as plain connected lines, not as bars.
    fn from(kind: ChartKind) -> Self {
        match kind {
            ChartKind::Line => RenderMode::LinesMarkers,
            ChartKind::Scatter => RenderMode::Markers,
            ChartKind::Bar => RenderMode::Lines,
        }
    }
}

/// Hover label for one series: `"<column>: <value> <unit>"`, or without the
/// unit when the column label has none.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HoverTemplate {
    pub column: String,
    pub unit: Option<String>,
}

impl HoverTemplate {
    pub fn new(column: &str, unit: Option<&str>) -> Self {
        Self {
            column: column.to_string(),
            unit: unit.map(str::to_string),
        }
    }

    /// Template with a `%{y}` placeholder for the value.
    pub fn template(&self) -> String {
        match &self.unit {
            Some(unit) => format!("{}: %{{y}} {}", self.column, unit),
            None => format!("{}: %{{y}}", self.column),
        }
    }
}

/// Everything needed to draw one Y column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesDescriptor {
    pub column: String,
    pub axis: AxisSide,
    pub color: PastelColor,
    pub mode: RenderMode,
    pub unit: Option<String>,
    pub hover: HoverTemplate,
}

/// Axis titles resolved from the selection.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct AxisTitles {
    pub x: String,
    pub primary: Option<String>,
    /// Present only when a series sits on the secondary axis.
    pub secondary: Option<String>,
}

/// Output of the series builder.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct SeriesPlan {
    pub descriptors: Vec<SeriesDescriptor>,
    pub axis_titles: AxisTitles,
}

impl SeriesPlan {
    /// True when no Y column is selected and the caller should show a prompt.
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    pub fn has_secondary_axis(&self) -> bool {
        self.axis_titles.secondary.is_some()
    }
}

/// Axis for the series at `index` out of `count` honored Y columns.
///
/// Only the second of exactly two series goes to the secondary axis, and
/// only when the dual-axis flag is set.
pub fn assign_axis(index: usize, count: usize, dual_axis: bool) -> AxisSide {
    if dual_axis && count == MAX_Y_COLUMNS && index == 1 {
        AxisSide::Secondary
    } else {
        AxisSide::Primary
    }
}

/// Build series descriptors for the current selection.
///
/// An empty plan (not an error) is returned when no Y column is selected.
/// Every referenced column must exist in the table.
pub fn build_series(table: &Table, selection: &SelectionState) -> ChartResult<SeriesPlan> {
    let y_columns = selection.honored_y_columns();
    if y_columns.is_empty() {
        debug!("no Y column selected");
        return Ok(SeriesPlan::default());
    }

    let x_column = selection
        .x_column
        .as_deref()
        .ok_or_else(|| ChartError::ColumnNotFound("(no X column selected)".to_string()))?;
    table.column(x_column)?;

    let count = y_columns.len();
    let mode = RenderMode::from(selection.kind);

    let mut descriptors = Vec::with_capacity(count);
    for (i, column) in y_columns.iter().enumerate() {
        table.column(column)?;

        let unit = Some(extract_unit(column)).filter(|u| !u.is_empty());
        descriptors.push(SeriesDescriptor {
            column: column.to_string(),
            axis: assign_axis(i, count, selection.dual_axis),
            color: palette_color(i),
            mode,
            unit: unit.map(str::to_string),
            hover: HoverTemplate::new(column, unit),
        });
    }

    let secondary = descriptors
        .iter()
        .find(|d| d.axis == AxisSide::Secondary)
        .map(|d| d.column.clone());

    let axis_titles = AxisTitles {
        x: x_column.to_string(),
        primary: descriptors.first().map(|d| d.column.clone()),
        secondary,
    };

    debug!(
        series = descriptors.len(),
        mode = mode.as_str(),
        secondary = axis_titles.secondary.is_some(),
        "series built"
    );

    Ok(SeriesPlan {
        descriptors,
        axis_titles,
    })
}
