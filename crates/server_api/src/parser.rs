//! Nom parser for the query operations the endpoint accepts.
//!
//! Supported: one `query` operation (named or anonymous) or the `{ ... }`
//! shorthand, nested selection sets, commas and `#` comments as ignored
//! tokens. Arguments, aliases, fragments and variables are rejected.

use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::{alpha1, alphanumeric1, char, multispace1, not_line_ending},
    combinator::{all_consuming, map, opt, recognize, value},
    multi::{many0, many0_count, many1},
    sequence::{delimited, pair, preceded, terminated, tuple},
    IResult,
};

use shared::{
    error::ApiError,
    query::{OperationDocument, Selection},
};

/// Deepest selection set a document may open. Parsing, validation and
/// projection all recurse once per level.
pub const MAX_SELECTION_DEPTH: usize = 32;

/// Parse a full request document into an [`OperationDocument`].
pub fn parse_operation(source: &str) -> Result<OperationDocument, ApiError> {
    let leading = ignored(source).map_or(source, |(rest, _)| rest);
    if leading.starts_with("mutation") || leading.starts_with("subscription") {
        return Err(ApiError::validation(
            "only query operations are supported",
        ));
    }
    if selection_depth(source) > MAX_SELECTION_DEPTH {
        return Err(ApiError::validation(
            "Syntax Error: selection set nested too deeply",
        ));
    }

    match all_consuming(delimited(ignored, operation, ignored))(source) {
        Ok((_, document)) => Ok(document),
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
            let offset = source.len() - e.input.len();
            Err(ApiError::validation(format!(
                "Syntax Error: unexpected input at offset {offset}"
            )))
        }
        Err(nom::Err::Incomplete(_)) => Err(ApiError::validation(
            "Syntax Error: unexpected end of document",
        )),
    }
}

/// Deepest `{` nesting in `source`, skipping `#` comments.
fn selection_depth(source: &str) -> usize {
    let mut depth = 0usize;
    let mut deepest = 0usize;
    for line in source.lines() {
        let code = line.split('#').next().unwrap_or_default();
        for c in code.chars() {
            match c {
                '{' => {
                    depth += 1;
                    deepest = deepest.max(depth);
                }
                '}' => depth = depth.saturating_sub(1),
                _ => {}
            }
        }
    }
    deepest
}

fn operation(input: &str) -> IResult<&str, OperationDocument> {
    alt((
        map(selection_set, |selections| OperationDocument {
            name: None,
            selections,
        }),
        map(
            tuple((
                tag("query"),
                opt(preceded(ignored1, name)),
                ignored,
                selection_set,
            )),
            |(_, name, _, selections)| OperationDocument {
                name: name.map(str::to_string),
                selections,
            },
        ),
    ))(input)
}

fn selection_set(input: &str) -> IResult<&str, Vec<Selection>> {
    delimited(
        pair(char('{'), ignored),
        many1(terminated(selection, ignored)),
        char('}'),
    )(input)
}

fn selection(input: &str) -> IResult<&str, Selection> {
    let (input, field) = name(input)?;
    let (input, _) = ignored(input)?;
    let (input, children) = opt(selection_set)(input)?;
    Ok((
        input,
        Selection {
            name: field.to_string(),
            selections: children.unwrap_or_default(),
        },
    ))
}

/// `[_A-Za-z][_0-9A-Za-z]*`
fn name(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        alt((alpha1, tag("_"))),
        many0_count(alt((alphanumeric1, tag("_")))),
    ))(input)
}

fn comment(input: &str) -> IResult<&str, &str> {
    recognize(pair(char('#'), not_line_ending))(input)
}

fn ignored_token(input: &str) -> IResult<&str, &str> {
    alt((multispace1, tag(","), comment))(input)
}

fn ignored(input: &str) -> IResult<&str, ()> {
    value((), many0(ignored_token))(input)
}

fn ignored1(input: &str) -> IResult<&str, ()> {
    value((), many1(ignored_token))(input)
}
