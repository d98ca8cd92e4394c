use plotters::coord::Shift;
use plotters::prelude::*;

use crate::error::{ChartError, ChartResult};
use crate::ir::{Figure, Trace, XAxisKind};
use crate::scale::{format_number, format_x_label};
use crate::series::AxisSide;

const FONT_FAMILY: &str = "sans-serif";
const AXIS_FONT_SIZE: f64 = 14.0;
const LEGEND_FONT_SIZE: f64 = 14.0;
const LEGEND_SWATCH_WIDTH: i32 = 24;
const LEGEND_SWATCH_GAP: i32 = 6;
const LEGEND_ITEM_GAP: i32 = 24;
const X_LABEL_AREA: i32 = 50;
const Y_LABEL_AREA: i32 = 70;
/// Upper bound on tick labels requested for a categorical X axis.
const MAX_CATEGORY_LABELS: usize = 50;

fn render_err<E: std::error::Error + Send + Sync>(err: DrawingAreaErrorKind<E>) -> ChartError {
    ChartError::Render(err.to_string())
}

/// Draw a figure onto any plotters drawing area.
///
/// The bottom margin of the layout is kept free for the legend; everything
/// else holds the title, axes and series. Pixel sizes come from the layout
/// as-is, so a larger area just gets more room for the plot.
pub fn draw_figure<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    figure: &Figure,
) -> ChartResult<()> {
    let layout = &figure.layout;
    root.fill(&WHITE).map_err(render_err)?;

    let (_, height) = root.dim_in_pixel();
    let legend_height = layout.margin.bottom.min(height / 2);
    let (plot_area, legend_area) =
        root.split_vertically((height - legend_height) as i32);

    let x_range = layout.x_axis.range.0..layout.x_axis.range.1;
    let y_range = layout.y_axis.range.0..layout.y_axis.range.1;
    // Without a right-hand axis the secondary coordinates mirror the primary
    // ones and stay unused.
    let y2_range = layout
        .y_axis2
        .as_ref()
        .map_or(y_range.clone(), |axis| axis.range.0..axis.range.1);

    let top_margin = layout.margin.top.saturating_sub(layout.title.font_size * 2) as i32;
    let mut builder = ChartBuilder::on(&plot_area);
    builder
        .margin(10)
        .margin_top(top_margin)
        .caption(&layout.title.text, (FONT_FAMILY, layout.title.font_size as f64))
        .x_label_area_size(X_LABEL_AREA)
        .y_label_area_size(Y_LABEL_AREA);
    if layout.y_axis2.is_some() {
        builder.right_y_label_area_size(Y_LABEL_AREA);
    }

    let mut chart = builder
        .build_cartesian_2d(x_range.clone(), y_range)
        .map_err(render_err)?
        .set_secondary_coord(x_range, y2_range);

    let x_kind = &layout.x_axis.kind;
    let x_formatter = |v: &f64| format_x_label(x_kind, *v);
    let y_formatter = |v: &f64| format_number(*v);

    let mut mesh = chart.configure_mesh();
    mesh.x_desc(layout.x_axis.title.as_str())
        .y_desc(layout.y_axis.title.as_str())
        .x_label_formatter(&x_formatter)
        .y_label_formatter(&y_formatter)
        .axis_desc_style((FONT_FAMILY, AXIS_FONT_SIZE));
    if let XAxisKind::Categorical { categories } = x_kind {
        mesh.x_labels(categories.len().clamp(2, MAX_CATEGORY_LABELS));
    }
    mesh.draw().map_err(render_err)?;

    if let Some(y2) = &layout.y_axis2 {
        chart
            .configure_secondary_axes()
            .y_desc(y2.title.as_str())
            .y_label_formatter(&y_formatter)
            .axis_desc_style((FONT_FAMILY, AXIS_FONT_SIZE))
            .draw()
            .map_err(render_err)?;
    }

    for trace in &figure.traces {
        match trace.axis {
            AxisSide::Primary => {
                chart.draw_series(line_elements(trace)).map_err(render_err)?;
                chart.draw_series(marker_elements(trace)).map_err(render_err)?;
            }
            AxisSide::Secondary => {
                chart
                    .draw_secondary_series(line_elements(trace))
                    .map_err(render_err)?;
                chart
                    .draw_secondary_series(marker_elements(trace))
                    .map_err(render_err)?;
            }
        }
    }

    draw_legend(&legend_area, &figure.traces)?;

    root.present().map_err(render_err)?;
    Ok(())
}

fn line_elements(trace: &Trace) -> Vec<PathElement<(f64, f64)>> {
    if !trace.mode.draws_lines() {
        return Vec::new();
    }
    let style = trace.color.rgb().stroke_width(trace.line_width);
    trace
        .segments()
        .into_iter()
        .map(|segment| PathElement::new(segment, style))
        .collect()
}

fn marker_elements(trace: &Trace) -> Vec<Circle<(f64, f64), i32>> {
    if !trace.mode.draws_markers() {
        return Vec::new();
    }
    let radius = (trace.marker_size / 2).max(1) as i32;
    let style = trace.color.rgb().filled();
    trace
        .points()
        .map(|point| Circle::new(point, radius, style))
        .collect()
}

/// Horizontal legend centered in `area`: a swatch then the series name per entry.
fn draw_legend<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    traces: &[Trace],
) -> ChartResult<()> {
    if traces.is_empty() {
        return Ok(());
    }

    let font: FontDesc = (FONT_FAMILY, LEGEND_FONT_SIZE).into();
    let text_style = TextStyle::from(font);

    let mut text_sizes = Vec::with_capacity(traces.len());
    for trace in traces {
        let (w, h) = area
            .estimate_text_size(&trace.name, &text_style)
            .map_err(render_err)?;
        text_sizes.push((w as i32, h as i32));
    }

    let entry_widths: Vec<i32> = text_sizes
        .iter()
        .map(|(w, _)| LEGEND_SWATCH_WIDTH + LEGEND_SWATCH_GAP + w)
        .collect();
    let total: i32 = entry_widths.iter().sum::<i32>()
        + LEGEND_ITEM_GAP * (traces.len() as i32 - 1);

    let (width, height) = area.dim_in_pixel();
    let center_y = height as i32 / 2;
    let mut x = ((width as i32 - total) / 2).max(0);

    for ((trace, (_, text_h)), entry_width) in traces.iter().zip(&text_sizes).zip(&entry_widths) {
        let color = trace.color.rgb();
        if trace.mode.draws_lines() {
            area.draw(&PathElement::new(
                vec![(x, center_y), (x + LEGEND_SWATCH_WIDTH, center_y)],
                color.stroke_width(trace.line_width),
            ))
            .map_err(render_err)?;
        }
        if trace.mode.draws_markers() {
            area.draw(&Circle::new(
                (x + LEGEND_SWATCH_WIDTH / 2, center_y),
                (trace.marker_size / 2).max(1) as i32,
                color.filled(),
            ))
            .map_err(render_err)?;
        }

        area.draw(&Text::new(
            trace.name.clone(),
            (x + LEGEND_SWATCH_WIDTH + LEGEND_SWATCH_GAP, center_y - text_h / 2),
            text_style.clone(),
        ))
        .map_err(render_err)?;

        x += entry_width + LEGEND_ITEM_GAP;
    }

    Ok(())
}

/// Render a figure as an SVG document at its display size.
pub fn render_svg(figure: &Figure) -> ChartResult<String> {
    let mut svg = String::new();
    {
        let size = (figure.layout.width, figure.layout.height);
        let root = SVGBackend::with_string(&mut svg, size).into_drawing_area();
        draw_figure(&root, figure)?;
    }
    Ok(svg)
}
