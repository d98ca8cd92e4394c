// Library exports for sheetplot

pub mod compiler;
pub mod data;
pub mod error;
pub mod export;
pub mod graph;
pub mod ir;
pub mod loader;
pub mod palette;
pub mod parser;
pub mod runtime;
pub mod scale;
pub mod selection;
pub mod series;
pub mod session;
pub mod telemetry;
pub mod units;
pub mod xlsx;

pub use error::{ChartError, ChartResult};

use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
pub enum OutputFormat {
    #[serde(rename = "png")]
    Png,
    #[serde(rename = "svg")]
    #[default]
    Svg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

/// Display and export sizes. The export size never follows the display size.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RenderOptions {
    #[serde(default = "default_display")]
    pub display: Size,
    #[serde(default = "default_export")]
    pub export: Size,
    /// Format used for the on-screen rendering.
    #[serde(default, rename = "type")]
    pub format: OutputFormat,
}

fn default_display() -> Size { Size { width: 900, height: 500 } }
fn default_export() -> Size { Size { width: 1000, height: 600 } }

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            display: default_display(),
            export: default_export(),
            format: OutputFormat::Svg,
        }
    }
}

impl RenderOptions {
    /// Parse options from JSON; missing fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
