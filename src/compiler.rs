use tracing::debug;

use crate::data::{CellValue, Table};
use crate::error::{ChartError, ChartResult};
use crate::ir::{Figure, Layout, Legend, Margin, Orientation, Title, Trace, XAxis, YAxis};
use crate::scale;
use crate::selection::SelectionState;
use crate::series::{AxisSide, SeriesPlan};
use crate::RenderOptions;

const TITLE_FONT_SIZE: u32 = 24;
const MARKER_SIZE: u32 = 8;
const LINE_WIDTH: u32 = 2;
const MARGIN_TOP: u32 = 80;
const MARGIN_BOTTOM: u32 = 100;

/// Compile series descriptors and table columns into a Figure.
///
/// Rows are aligned by position: row `i` of the X column pairs with row `i`
/// of each Y column. Rows with an empty X cell are dropped from every trace.
pub fn compile_figure(
    plan: &SeriesPlan,
    selection: &SelectionState,
    table: &Table,
    options: &RenderOptions,
) -> ChartResult<Figure> {
    if plan.is_empty() {
        return Err(ChartError::Render("no Y column selected".to_string()));
    }

    let x_column = table.column(&plan.axis_titles.x)?;
    let resolved_x = scale::resolve_x(&x_column.name, &x_column.values)?;

    let mut traces = Vec::with_capacity(plan.descriptors.len());
    for descriptor in &plan.descriptors {
        let y_column = table.column(&descriptor.column)?;

        let mut x = Vec::with_capacity(resolved_x.coords.len());
        let mut y = Vec::with_capacity(resolved_x.coords.len());
        for (coord, value) in resolved_x.coords.iter().zip(&y_column.values) {
            if let Some(coord) = coord {
                x.push(*coord);
                y.push(CellValue::as_number(value));
            }
        }

        if y.iter().all(Option::is_none) {
            return Err(ChartError::Render(format!(
                "column '{}' has no numeric values to plot",
                descriptor.column
            )));
        }

        traces.push(Trace {
            name: descriptor.column.clone(),
            axis: descriptor.axis,
            mode: descriptor.mode,
            color: descriptor.color,
            marker_size: MARKER_SIZE,
            line_width: LINE_WIDTH,
            hover_template: descriptor.hover.template(),
            x,
            y,
        });
    }

    let x_range = scale::x_range(
        &resolved_x.kind,
        resolved_x.coords.iter().flatten().copied(),
    );
    let y_range = scale::continuous_range(
        traces
            .iter()
            .filter(|t| t.axis == AxisSide::Primary)
            .flat_map(|t| t.points().map(|(_, y)| y)),
    );

    let y_axis2 = plan.axis_titles.secondary.as_ref().map(|title| YAxis {
        title: title.clone(),
        side: AxisSide::Secondary,
        range: scale::continuous_range(
            traces
                .iter()
                .filter(|t| t.axis == AxisSide::Secondary)
                .flat_map(|t| t.points().map(|(_, y)| y)),
        ),
        show_grid: false,
    });

    scale::check_range("x", x_range)?;
    scale::check_range("y", y_range)?;
    if let Some(y2) = &y_axis2 {
        scale::check_range("secondary y", y2.range)?;
    }

    let layout = Layout {
        title: Title {
            text: selection.title.clone(),
            x: 0.5,
            y: 0.95,
            font_size: TITLE_FONT_SIZE,
        },
        width: options.display.width,
        height: options.display.height,
        margin: Margin {
            top: MARGIN_TOP,
            bottom: MARGIN_BOTTOM,
        },
        x_axis: XAxis {
            title: plan.axis_titles.x.clone(),
            kind: resolved_x.kind,
            range: x_range,
        },
        y_axis: YAxis {
            title: plan.axis_titles.primary.clone().unwrap_or_default(),
            side: AxisSide::Primary,
            range: y_range,
            show_grid: true,
        },
        y_axis2,
        legend: Legend {
            orientation: Orientation::Horizontal,
            x: 0.5,
            y: -0.3,
            x_anchor: "center",
            y_anchor: "bottom",
        },
    };

    debug!(
        traces = traces.len(),
        x_kind = ?layout.x_axis.kind,
        secondary = plan.has_secondary_axis(),
        "figure compiled"
    );

    Ok(Figure { traces, layout })
}
