// Interaction shell state: one uploaded table, the selection, the last chart
//
// Every event mutates the selection and then re-runs the whole pipeline.

use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};

use tracing::{debug, info, warn};

use crate::data::Table;
use crate::error::{ChartError, ChartResult};
use crate::export::{self, Download};
use crate::ir::Figure;
use crate::loader::{self, SheetFormat};
use crate::runtime::{self, Outcome};
use crate::selection::{ChartKind, SelectionState, MAX_Y_COLUMNS};
use crate::series::AxisSide;
use crate::RenderOptions;

/// Shown until a file has been uploaded.
pub const UPLOAD_PROMPT: &str = "Upload a spreadsheet to get started.";

/// Identifies an upload well enough to skip re-parsing the same file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileIdentity {
    pub name: String,
    pub len: usize,
    pub digest: u64,
}

impl FileIdentity {
    pub fn of(name: &str, bytes: &[u8]) -> Self {
        let mut hasher = DefaultHasher::new();
        bytes.hash(&mut hasher);
        Self {
            name: name.to_string(),
            len: bytes.len(),
            digest: hasher.finish(),
        }
    }
}

/// A user interaction.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Upload { name: String, bytes: Vec<u8> },
    SetTitle(String),
    SelectX(String),
    /// Add the column to Y, or remove it if already selected.
    ToggleY(String),
    SetKind(ChartKind),
    SetDualAxis(bool),
}

/// What the shell shows after an event.
#[derive(Debug, Clone, PartialEq)]
pub enum View {
    NoFile(String),
    Prompt(String),
    Chart(Figure),
    Error(String),
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            View::NoFile(msg) | View::Prompt(msg) => write!(f, "{}", msg),
            View::Error(msg) => write!(f, "error: {}", msg),
            View::Chart(figure) => {
                let layout = &figure.layout;
                writeln!(f, "{}", layout.title.text)?;
                writeln!(f, "  x: {}", layout.x_axis.title)?;
                for trace in figure.primary_traces().chain(figure.secondary_traces()) {
                    let side = match trace.axis {
                        AxisSide::Primary => "left",
                        AxisSide::Secondary => "right",
                    };
                    writeln!(
                        f,
                        "  y ({}): {} [{}, {}, {} points]",
                        side,
                        trace.name,
                        trace.mode.as_str(),
                        trace.color.hex,
                        trace.points().count()
                    )?;
                }
                write!(f, "  size: {}x{}", layout.width, layout.height)
            }
        }
    }
}

struct LoadedFile {
    identity: FileIdentity,
    table: Table,
}

/// In-memory state of one interactive session.
pub struct Session {
    options: RenderOptions,
    file: Option<LoadedFile>,
    selection: SelectionState,
    last_figure: Option<Figure>,
    parse_count: usize,
}

impl Session {
    pub fn new(options: RenderOptions) -> Self {
        Self {
            options,
            file: None,
            selection: SelectionState::default(),
            last_figure: None,
            parse_count: 0,
        }
    }

    pub fn selection(&self) -> &SelectionState {
        &self.selection
    }

    pub fn table(&self) -> Option<&Table> {
        self.file.as_ref().map(|f| &f.table)
    }

    /// Column names of the current table, empty before the first upload.
    pub fn columns(&self) -> Vec<String> {
        self.table()
            .map(|t| t.column_names().map(str::to_string).collect())
            .unwrap_or_default()
    }

    /// Number of times an upload was actually parsed.
    pub fn parse_count(&self) -> usize {
        self.parse_count
    }

    /// The last figure that rendered successfully.
    pub fn last_figure(&self) -> Option<&Figure> {
        self.last_figure.as_ref()
    }

    /// Apply one interaction and re-run the pipeline.
    pub fn apply(&mut self, event: Event) -> View {
        match &event {
            Event::Upload { name, bytes } => debug!(file = %name, bytes = bytes.len(), "upload event"),
            other => debug!(event = ?other, "session event"),
        }
        if let Err(err) = self.update(event) {
            warn!(error = %err, "event rejected");
            return View::Error(err.to_string());
        }
        self.view()
    }

    fn update(&mut self, event: Event) -> ChartResult<()> {
        match event {
            Event::Upload { name, bytes } => self.upload(name, bytes)?,
            Event::SetTitle(title) => self.selection.title = title,
            Event::SelectX(column) => {
                self.require_column(&column)?;
                self.selection.y_columns.retain(|y| *y != column);
                self.selection.x_column = Some(column);
            }
            Event::ToggleY(column) => self.toggle_y(column)?,
            Event::SetKind(kind) => self.selection.kind = kind,
            Event::SetDualAxis(on) => self.selection.dual_axis = on,
        }
        Ok(())
    }

    fn upload(&mut self, name: String, bytes: Vec<u8>) -> ChartResult<()> {
        let identity = FileIdentity::of(&name, &bytes);
        if self.file.as_ref().is_some_and(|f| f.identity == identity) {
            debug!(file = %name, "upload unchanged, reusing parsed table");
            return Ok(());
        }

        // A failed upload leaves the previous table in place.
        let table = loader::load_table(&bytes, SheetFormat::from_path(&name))?;
        self.parse_count += 1;

        if self.selection.x_column.is_none() {
            self.selection.x_column = table.column_names().next().map(str::to_string);
        }
        info!(file = %name, columns = table.columns().len(), "file uploaded");
        self.file = Some(LoadedFile { identity, table });
        Ok(())
    }

    fn toggle_y(&mut self, column: String) -> ChartResult<()> {
        if let Some(pos) = self.selection.y_columns.iter().position(|y| *y == column) {
            self.selection.y_columns.remove(pos);
            return Ok(());
        }

        self.require_column(&column)?;
        if self.selection.x_column.as_deref() == Some(column.as_str()) {
            warn!(column = %column, "column is already the X axis");
        } else if self.selection.y_columns.len() >= MAX_Y_COLUMNS {
            warn!(column = %column, "at most {} Y columns can be selected", MAX_Y_COLUMNS);
        } else {
            self.selection.y_columns.push(column);
        }
        Ok(())
    }

    fn require_column(&self, column: &str) -> ChartResult<()> {
        match self.table() {
            Some(table) if !table.has_column(column) => {
                Err(ChartError::ColumnNotFound(column.to_string()))
            }
            _ => Ok(()),
        }
    }

    /// Re-run the pipeline for the current state.
    pub fn view(&mut self) -> View {
        let Some(file) = &self.file else {
            return View::NoFile(UPLOAD_PROMPT.to_string());
        };

        match runtime::run_pipeline(&file.table, &self.selection, &self.options) {
            Ok(Outcome::Prompt(msg)) => View::Prompt(msg),
            Ok(Outcome::Chart(figure)) => {
                self.last_figure = Some(figure.clone());
                View::Chart(figure)
            }
            Err(err) => {
                warn!(error = %err, "pipeline failed");
                View::Error(err.to_string())
            }
        }
    }

    /// PNG download of the last successfully rendered figure.
    pub fn export(&self) -> ChartResult<Download> {
        let figure = self
            .last_figure
            .as_ref()
            .ok_or_else(|| ChartError::Export("no chart has been rendered yet".to_string()))?;
        export::export_download(figure, self.options.export)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn csv_upload(name: &str, body: &str) -> Event {
        Event::Upload {
            name: name.to_string(),
            bytes: body.as_bytes().to_vec(),
        }
    }

    const WEATHER: &str = "Date,Temp (C),Humidity (%),Wind (m/s)\n\
                           2024-01-01,3.5,80,4\n\
                           2024-01-02,4.0,75,6\n\
                           2024-01-03,2.5,90,3\n";

    fn loaded() -> Session {
        let mut session = Session::new(RenderOptions::default());
        session.apply(csv_upload("weather.csv", WEATHER));
        session
    }

    #[test]
    fn test_no_file_view() {
        let mut session = Session::new(RenderOptions::default());
        assert_eq!(session.view(), View::NoFile(UPLOAD_PROMPT.to_string()));
        assert!(session.export().is_err());
    }

    #[test]
    fn test_upload_defaults_x_and_prompts() {
        let mut session = Session::new(RenderOptions::default());
        let view = session.apply(csv_upload("weather.csv", WEATHER));
        assert!(matches!(view, View::Prompt(_)));
        assert_eq!(session.selection().x_column.as_deref(), Some("Date"));
        assert_eq!(session.columns().len(), 4);
    }

    #[test]
    fn test_toggle_y_renders_chart() {
        let mut session = loaded();
        let view = session.apply(Event::ToggleY("Temp (C)".into()));
        let View::Chart(figure) = view else {
            panic!("Expected a chart");
        };
        assert_eq!(figure.layout.title.text, "My Graph");
        assert_eq!(figure.traces[0].name, "Temp (C)");

        // Toggling again removes it.
        assert!(matches!(session.apply(Event::ToggleY("Temp (C)".into())), View::Prompt(_)));
    }

    #[test]
    fn test_third_y_is_ignored() {
        let mut session = loaded();
        session.apply(Event::ToggleY("Temp (C)".into()));
        session.apply(Event::ToggleY("Humidity (%)".into()));
        session.apply(Event::ToggleY("Wind (m/s)".into()));
        assert_eq!(
            session.selection().y_columns,
            vec!["Temp (C)".to_string(), "Humidity (%)".to_string()]
        );
    }

    #[test]
    fn test_select_x_removes_it_from_y() {
        let mut session = loaded();
        session.apply(Event::ToggleY("Temp (C)".into()));
        session.apply(Event::ToggleY("Humidity (%)".into()));
        session.apply(Event::SelectX("Temp (C)".into()));
        assert_eq!(session.selection().y_columns, vec!["Humidity (%)".to_string()]);

        // The X column cannot be toggled into Y.
        session.apply(Event::ToggleY("Temp (C)".into()));
        assert_eq!(session.selection().y_columns.len(), 1);
    }

    #[test]
    fn test_chart_view_lists_left_axis_first() {
        let mut session = loaded();
        session.apply(Event::ToggleY("Temp (C)".into()));
        session.apply(Event::ToggleY("Humidity (%)".into()));
        let text = session.apply(Event::SetDualAxis(true)).to_string();

        let left = text.find("y (left): Temp (C)").unwrap();
        let right = text.find("y (right): Humidity (%)").unwrap();
        assert!(left < right);
        assert!(text.ends_with("size: 900x500"));
    }

    #[test]
    fn test_unknown_column_is_rejected() {
        let mut session = loaded();
        let view = session.apply(Event::ToggleY("Pressure".into()));
        assert_eq!(view, View::Error("column 'Pressure' not found".to_string()));
        assert!(session.selection().y_columns.is_empty());
    }

    #[test]
    fn test_same_upload_is_memoized() {
        let mut session = loaded();
        session.apply(csv_upload("weather.csv", WEATHER));
        assert_eq!(session.parse_count(), 1);

        session.apply(csv_upload("weather.csv", "Date,Temp (C)\n2024-01-01,1\n"));
        assert_eq!(session.parse_count(), 2);
    }

    #[test]
    fn test_stale_selection_after_reupload() {
        let mut session = loaded();
        session.apply(Event::ToggleY("Humidity (%)".into()));
        let view = session.apply(csv_upload("other.csv", "Date,Temp (C)\n2024-01-01,1\n"));
        assert_eq!(view, View::Error("column 'Humidity (%)' not found".to_string()));

        // The previous chart stays downloadable.
        assert!(session.last_figure().is_some());
    }

    #[test]
    fn test_failed_upload_keeps_previous_table() {
        let mut session = loaded();
        let view = session.apply(Event::Upload {
            name: "broken.xlsx".into(),
            bytes: b"not a zip".to_vec(),
        });
        assert!(matches!(view, View::Error(ref m) if m.starts_with("unsupported spreadsheet")));
        assert_eq!(session.columns().len(), 4);
    }

    #[test]
    fn test_dual_axis_and_export() {
        let mut session = loaded();
        session.apply(Event::SetTitle("Weather".into()));
        session.apply(Event::SetKind(ChartKind::Scatter));
        session.apply(Event::ToggleY("Temp (C)".into()));
        session.apply(Event::ToggleY("Humidity (%)".into()));
        let view = session.apply(Event::SetDualAxis(true));

        let View::Chart(figure) = &view else {
            panic!("Expected a chart");
        };
        assert_eq!(figure.secondary_traces().count(), 1);
        assert!(view.to_string().contains("y (right): Humidity (%)"));

        let download = session.export().unwrap();
        assert_eq!(download.file_name, "Weather.png");
        assert_eq!(&download.bytes[..4], &[137, 80, 78, 71]);
    }
}
