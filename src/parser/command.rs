// Shell command parser

use super::ast::ShellCommand;
use super::lexer::{argument, keyword, ws};
use crate::selection::ChartKind;
use nom::{
    branch::alt,
    bytes::complete::tag_no_case,
    combinator::{map, opt, value},
    sequence::preceded,
    IResult,
};

/// Format: load <path>
pub fn parse_load(input: &str) -> IResult<&str, ShellCommand> {
    map(preceded(keyword("load"), argument), ShellCommand::Load)(input)
}

/// Format: title [text]. A missing argument clears the title.
pub fn parse_title(input: &str) -> IResult<&str, ShellCommand> {
    map(preceded(keyword("title"), opt(argument)), |t| {
        ShellCommand::Title(t.unwrap_or_default())
    })(input)
}

/// Format: x <column>
pub fn parse_x(input: &str) -> IResult<&str, ShellCommand> {
    map(preceded(keyword("x"), argument), ShellCommand::X)(input)
}

/// Format: y <column>
pub fn parse_y(input: &str) -> IResult<&str, ShellCommand> {
    map(preceded(keyword("y"), argument), ShellCommand::Y)(input)
}

/// Format: kind line|scatter|bar
pub fn parse_kind(input: &str) -> IResult<&str, ShellCommand> {
    let (input, _) = keyword("kind")(input)?;
    let (input, kind) = ws(alt((
        value(ChartKind::Line, tag_no_case("line")),
        value(ChartKind::Scatter, tag_no_case("scatter")),
        value(ChartKind::Bar, tag_no_case("bar")),
    )))(input)?;
    Ok((input, ShellCommand::Kind(kind)))
}

/// Format: dual on|off
pub fn parse_dual(input: &str) -> IResult<&str, ShellCommand> {
    let (input, _) = keyword("dual")(input)?;
    let (input, on) = ws(alt((
        value(true, tag_no_case("on")),
        value(false, tag_no_case("off")),
    )))(input)?;
    Ok((input, ShellCommand::Dual(on)))
}

/// Format: save [dir]
pub fn parse_save(input: &str) -> IResult<&str, ShellCommand> {
    map(preceded(keyword("save"), opt(argument)), ShellCommand::Save)(input)
}

pub fn parse_command(input: &str) -> IResult<&str, ShellCommand> {
    alt((
        parse_load,
        parse_title,
        parse_x,
        parse_y,
        parse_kind,
        parse_dual,
        parse_save,
        value(ShellCommand::Columns, keyword("columns")),
        value(ShellCommand::Show, keyword("show")),
        value(ShellCommand::Help, keyword("help")),
        value(ShellCommand::Quit, alt((keyword("quit"), keyword("exit")))),
    ))(input)
}
