use thiserror::Error;

pub type ChartResult<T> = Result<T, ChartError>;

/// Everything that can go wrong between an upload and a PNG download.
///
/// None of these are fatal: the shell shows the message in place of the chart
/// and waits for the next input.
#[derive(Debug, Error)]
pub enum ChartError {
    #[error("unsupported spreadsheet: {0}")]
    UnsupportedFormat(String),

    #[error("column '{0}' not found")]
    ColumnNotFound(String),

    #[error("cannot render chart: {0}")]
    Render(String),

    #[error("cannot export image: {0}")]
    Export(String),
}

impl From<zip::result::ZipError> for ChartError {
    fn from(err: zip::result::ZipError) -> Self {
        ChartError::UnsupportedFormat(err.to_string())
    }
}

impl From<quick_xml::Error> for ChartError {
    fn from(err: quick_xml::Error) -> Self {
        ChartError::UnsupportedFormat(format!("malformed XML: {}", err))
    }
}

impl From<csv::Error> for ChartError {
    fn from(err: csv::Error) -> Self {
        ChartError::UnsupportedFormat(format!("malformed CSV: {}", err))
    }
}
