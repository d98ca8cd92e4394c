// Figure model: the composed chart handed to the drawing backend
//
// A Figure is rebuilt from scratch on every run and never mutated afterwards.

use serde::Serialize;

use crate::palette::PastelColor;
use crate::series::{AxisSide, RenderMode};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Figure {
    pub traces: Vec<Trace>,
    pub layout: Layout,
}

impl Figure {
    pub fn primary_traces(&self) -> impl Iterator<Item = &Trace> {
        self.traces.iter().filter(|t| t.axis == AxisSide::Primary)
    }

    pub fn secondary_traces(&self) -> impl Iterator<Item = &Trace> {
        self.traces.iter().filter(|t| t.axis == AxisSide::Secondary)
    }
}

/// One drawn series.
///
/// `x` and `y` are row-aligned; a `None` in `y` is a gap where the cell was
/// not numeric. Lines are broken at gaps.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trace {
    pub name: String,
    pub axis: AxisSide,
    pub mode: RenderMode,
    pub color: PastelColor,
    pub marker_size: u32,
    pub line_width: u32,
    pub hover_template: String,
    pub x: Vec<f64>,
    pub y: Vec<Option<f64>>,
}

impl Trace {
    /// Maximal runs of consecutive plottable points.
    pub fn segments(&self) -> Vec<Vec<(f64, f64)>> {
        let mut segments = Vec::new();
        let mut current = Vec::new();
        for (&x, y) in self.x.iter().zip(&self.y) {
            match y {
                Some(y) => current.push((x, *y)),
                None => {
                    if !current.is_empty() {
                        segments.push(std::mem::take(&mut current));
                    }
                }
            }
        }
        if !current.is_empty() {
            segments.push(current);
        }
        segments
    }

    pub fn points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.x
            .iter()
            .zip(&self.y)
            .filter_map(|(&x, y)| y.map(|y| (x, y)))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Layout {
    pub title: Title,
    pub width: u32,
    pub height: u32,
    pub margin: Margin,
    pub x_axis: XAxis,
    pub y_axis: YAxis,
    /// Right-hand axis; absent unless a trace is assigned to it.
    pub y_axis2: Option<YAxis>,
    pub legend: Legend,
}

/// Title placement in paper coordinates (0..1, origin bottom-left).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Title {
    pub text: String,
    pub x: f64,
    pub y: f64,
    pub font_size: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Margin {
    pub top: u32,
    pub bottom: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct XAxis {
    pub title: String,
    pub kind: XAxisKind,
    pub range: (f64, f64),
}

/// How X coordinates map back to labels.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum XAxisKind {
    Numeric,
    /// Coordinates are fractional days since 1970-01-01.
    Temporal { with_time: bool },
    /// Coordinates are indices into `categories`.
    Categorical { categories: Vec<String> },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YAxis {
    pub title: String,
    pub side: AxisSide,
    pub range: (f64, f64),
    pub show_grid: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Horizontal,
    Vertical,
}

/// Legend placement in paper coordinates; negative `y` is below the plot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Legend {
    pub orientation: Orientation,
    pub x: f64,
    pub y: f64,
    pub x_anchor: &'static str,
    pub y_anchor: &'static str,
}
