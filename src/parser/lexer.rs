// Lexical helpers shared by the command parsers

use nom::{
    branch::alt,
    bytes::complete::{is_not, tag, tag_no_case},
    character::complete::{char, multispace0, multispace1},
    combinator::{eof, map, opt, rest, value, verify},
    sequence::{delimited, terminated},
    IResult,
};

/// Wrap a parser so it skips surrounding whitespace.
pub fn ws<'a, F, O>(inner: F) -> impl FnMut(&'a str) -> IResult<&'a str, O>
where
    F: FnMut(&'a str) -> IResult<&'a str, O>,
{
    delimited(multispace0, inner, multispace0)
}

/// A command word, matched case-insensitively and followed by whitespace or
/// the end of the line.
pub fn keyword<'a>(word: &'static str) -> impl FnMut(&'a str) -> IResult<&'a str, &'a str> {
    terminated(tag_no_case(word), alt((multispace1, eof)))
}

/// Double-quoted string with `\"` and `\\` escapes.
pub fn string_literal(input: &str) -> IResult<&str, String> {
    delimited(
        char('"'),
        map(
            opt(nom::bytes::complete::escaped_transform(
                is_not("\"\\"),
                '\\',
                alt((value("\\", tag("\\")), value("\"", tag("\"")))),
            )),
            Option::unwrap_or_default,
        ),
        char('"'),
    )(input)
}

/// Unquoted argument: the rest of the line, trimmed. Never empty.
pub fn bare_argument(input: &str) -> IResult<&str, String> {
    map(
        verify(rest, |s: &str| !s.trim().is_empty()),
        |s: &str| s.trim().to_string(),
    )(input)
}

/// A quoted or bare argument.
pub fn argument(input: &str) -> IResult<&str, String> {
    alt((terminated(string_literal, multispace0), bare_argument))(input)
}
