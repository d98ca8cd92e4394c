// Interactive shell command parser

pub mod ast;
pub mod command;
pub mod lexer;

// Public API re-exports
pub use ast::ShellCommand;
pub use command::parse_command;

use lexer::ws;
use nom::combinator::all_consuming;

pub const HELP: &str = "\
commands:
  load <path>              upload a spreadsheet (.xlsx or .csv)
  title <text>             set the chart title
  x <column>               select the X column
  y <column>               toggle a Y column (at most 2)
  kind line|scatter|bar    set the chart kind
  dual on|off              put the second Y column on a right-hand axis
  columns                  list the columns of the current file
  show                     re-render and describe the chart
  save [dir]               write the PNG download
  help                     show this message
  quit                     leave the shell
arguments may be quoted: y \"Temp (C)\"";

/// Parse one whole shell line.
pub fn parse_line(line: &str) -> Result<ShellCommand, String> {
    match all_consuming(ws(parse_command))(line) {
        Ok((_, command)) => Ok(command),
        Err(_) => Err(format!(
            "cannot parse '{}'; type 'help' for the list of commands",
            line.trim()
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_line() {
        assert_eq!(parse_line("  dual on  ").unwrap(), ShellCommand::Dual(true));
        assert!(parse_line("frobnicate").is_err());
        assert!(parse_line(r#"title "a" b"#).is_err());
    }
}
