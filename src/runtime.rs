// Pipeline runner: selection + table -> series plan -> figure

use tracing::debug;

use crate::compiler::compile_figure;
use crate::data::Table;
use crate::error::ChartResult;
use crate::ir::Figure;
use crate::selection::SelectionState;
use crate::series::build_series;
use crate::RenderOptions;

/// Shown instead of a chart while no Y column is selected.
pub const Y_PROMPT: &str = "Select at least one column to use for the Y axis.";

/// Result of one pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Nothing to draw yet; show the message instead.
    Prompt(String),
    Chart(Figure),
}

/// Run the full pipeline for the current selection.
pub fn run_pipeline(
    table: &Table,
    selection: &SelectionState,
    options: &RenderOptions,
) -> ChartResult<Outcome> {
    let plan = build_series(table, selection)?;
    if plan.is_empty() {
        debug!("no Y column selected");
        return Ok(Outcome::Prompt(Y_PROMPT.to_string()));
    }

    let figure = compile_figure(&plan, selection, table, options)?;
    Ok(Outcome::Chart(figure))
}
