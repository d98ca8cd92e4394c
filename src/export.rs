use image::ImageEncoder;
use plotters::prelude::*;
use tracing::info;

use crate::error::{ChartError, ChartResult};
use crate::graph;
use crate::ir::Figure;
use crate::{OutputFormat, Size};

const FALLBACK_FILE_NAME: &str = "chart.png";
/// Largest raster we allocate, in pixels (about 150 MB of RGB).
const MAX_PIXELS: usize = 50_000_000;

/// A PNG ready to hand to the user under its suggested file name.
#[derive(Debug, Clone, PartialEq)]
pub struct Download {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Suggested download name: the title verbatim plus `.png`.
pub fn download_file_name(title: &str) -> String {
    if title.trim().is_empty() {
        FALLBACK_FILE_NAME.to_string()
    } else {
        format!("{}.png", title)
    }
}

/// File name safe to create on disk: path separators become underscores.
pub fn disk_file_name(file_name: &str) -> String {
    file_name
        .chars()
        .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
        .collect()
}

/// Rasterize a figure to PNG at `size`, independent of its display size.
pub fn export_png(figure: &Figure, size: Size) -> ChartResult<Vec<u8>> {
    let buffer_len = validate(figure, size)?;

    let (width, height) = (size.width, size.height);
    let mut buffer = vec![0u8; buffer_len];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();
        graph::draw_figure(&root, figure).map_err(|err| match err {
            ChartError::Render(msg) => ChartError::Export(msg),
            other => other,
        })?;
    }

    let mut png_bytes = Vec::new();
    {
        let encoder = image::codecs::png::PngEncoder::new(&mut png_bytes);
        encoder
            .write_image(&buffer, width, height, image::ColorType::Rgb8)
            .map_err(|e| ChartError::Export(format!("failed to encode PNG: {}", e)))?;
    }

    info!(width, height, bytes = png_bytes.len(), "figure exported");
    Ok(png_bytes)
}

/// Export a figure and pair it with its download name.
pub fn export_download(figure: &Figure, size: Size) -> ChartResult<Download> {
    Ok(Download {
        file_name: download_file_name(&figure.layout.title.text),
        bytes: export_png(figure, size)?,
    })
}

/// On-screen rendering at the figure's display size.
pub fn render_display(figure: &Figure, format: OutputFormat) -> ChartResult<Vec<u8>> {
    match format {
        OutputFormat::Svg => graph::render_svg(figure).map(String::into_bytes),
        OutputFormat::Png => export_png(
            figure,
            Size {
                width: figure.layout.width,
                height: figure.layout.height,
            },
        ),
    }
}

/// Check that `figure` can be rasterized at `size`; returns the RGB buffer length.
fn validate(figure: &Figure, size: Size) -> ChartResult<usize> {
    let pixels = (size.width as usize).checked_mul(size.height as usize);
    let buffer_len = match pixels {
        Some(pixels) if pixels > 0 && pixels <= MAX_PIXELS => pixels * 3,
        _ => {
            return Err(ChartError::Export(format!(
                "invalid image size {}x{}",
                size.width, size.height
            )))
        }
    };
    if figure.traces.is_empty() {
        return Err(ChartError::Export("figure has no traces".to_string()));
    }

    let layout = &figure.layout;
    let mut ranges = vec![layout.x_axis.range, layout.y_axis.range];
    if let Some(y2) = &layout.y_axis2 {
        ranges.push(y2.range);
    }
    for (lo, hi) in ranges {
        if !lo.is_finite() || !hi.is_finite() || lo >= hi {
            return Err(ChartError::Export(format!(
                "invalid axis range {}..{}",
                lo, hi
            )));
        }
    }
    Ok(buffer_len)
}
