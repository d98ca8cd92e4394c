use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Title used until the user types one.
pub const DEFAULT_TITLE: &str = "My Graph";

/// Maximum number of Y columns a selection honors.
pub const MAX_Y_COLUMNS: usize = 2;

/// Chart style picked by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    #[default]
    Line,
    Scatter,
    Bar,
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ChartKind::Line => "line",
            ChartKind::Scatter => "scatter",
            ChartKind::Bar => "bar",
        })
    }
}

impl FromStr for ChartKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "line" => Ok(ChartKind::Line),
            "scatter" => Ok(ChartKind::Scatter),
            "bar" => Ok(ChartKind::Bar),
            other => Err(format!(
                "unknown chart kind '{}' (expected line, scatter or bar)",
                other
            )),
        }
    }
}

/// The user's current choices for one pipeline run.
///
/// The shell owns and mutates it between runs; every stage of a run only
/// borrows it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectionState {
    pub title: String,
    pub x_column: Option<String>,
    /// Y columns in the order they were selected.
    pub y_columns: Vec<String>,
    pub kind: ChartKind,
    pub dual_axis: bool,
}

impl Default for SelectionState {
    fn default() -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
            x_column: None,
            y_columns: Vec::new(),
            kind: ChartKind::default(),
            dual_axis: false,
        }
    }
}

impl SelectionState {
    pub fn new(x_column: impl Into<String>, y_columns: Vec<String>) -> Self {
        Self {
            x_column: Some(x_column.into()),
            y_columns,
            ..Self::default()
        }
    }

    pub fn with_kind(mut self, kind: ChartKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_dual_axis(mut self, dual_axis: bool) -> Self {
        self.dual_axis = dual_axis;
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Y columns that a run actually uses: the X column is skipped and at most
    /// [`MAX_Y_COLUMNS`] are kept, in selection order.
    pub fn honored_y_columns(&self) -> Vec<&str> {
        self.y_columns
            .iter()
            .map(String::as_str)
            .filter(|y| Some(*y) != self.x_column.as_deref())
            .take(MAX_Y_COLUMNS)
            .collect()
    }
}
