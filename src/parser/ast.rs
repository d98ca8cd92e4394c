// Commands accepted by the interactive shell

use crate::selection::ChartKind;

/// One parsed shell line.
#[derive(Debug, Clone, PartialEq)]
pub enum ShellCommand {
    /// Upload the file at this path.
    Load(String),
    Title(String),
    /// Select the X column.
    X(String),
    /// Toggle a Y column.
    Y(String),
    Kind(ChartKind),
    Dual(bool),
    Columns,
    Show,
    /// Write the PNG download, optionally into a directory.
    Save(Option<String>),
    Help,
    Quit,
}
