use thiserror::Error;

use crate::document::{Document, ExportPolicy};
use crate::error::PwlkitError;
use crate::point::Point;
use crate::scalar;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error("line {line_number}: {reason}: '{raw_text}'")]
    LineParse {
        line_number: usize,
        raw_text: String,
        reason: String,
    },
}

impl From<Error> for PwlkitError {
    fn from(value: Error) -> Self {
        PwlkitError::Parse(value)
    }
}

/// Parse PWL text into a document. One `<time> <value>` pair per line, `#`
/// comments stripped, blank lines skipped, `+` on the time token marking a
/// relative point. The whole parse fails on the first malformed line; no
/// partial document escapes.
pub fn parse(text: &str) -> Result<Document, Error> {
    let mut points = Vec::new();
    for (index, raw_line) in text.lines().enumerate() {
        let line_number = index + 1;
        let content = raw_line.split('#').next().unwrap_or("");
        if content.trim().is_empty() {
            continue;
        }
        let mut tokens = content.split_whitespace();
        let (time_token, value_token) = match (tokens.next(), tokens.next(), tokens.next()) {
            (Some(time), Some(value), None) => (time, value),
            _ => {
                return Err(line_error(
                    line_number,
                    raw_line,
                    "expected a time token and a value token".to_string(),
                ))
            }
        };
        let (time, time_notation) = scalar::parse(time_token)
            .map_err(|e| line_error(line_number, raw_line, format!("time token: {e}")))?;
        let (value, value_notation) = scalar::parse(value_token)
            .map_err(|e| line_error(line_number, raw_line, format!("value token: {e}")))?;
        points.push(Point::from_parsed(
            time,
            value,
            time_token.starts_with('+'),
            time_token.to_string(),
            value_token.to_string(),
            time_notation,
            value_notation,
        ));
    }
    Ok(Document::from_points(points))
}

/// Serialize a document back to PWL text, one `"time value"` line per point.
/// PreserveMixed keeps each point's cached token verbatim while it still
/// agrees with the numbers; the forced policies rebase a scratch clone first.
/// Never fails for a structurally valid document.
pub fn serialize(doc: &Document) -> String {
    match doc.export_policy() {
        ExportPolicy::PreserveMixed => render(doc),
        ExportPolicy::ForceRelative => {
            let mut scratch = doc.clone();
            scratch.to_relative();
            render(&scratch)
        }
        ExportPolicy::ForceAbsolute => {
            let mut scratch = doc.clone();
            scratch.to_absolute();
            render(&scratch)
        }
    }
}

fn render(doc: &Document) -> String {
    let mut out = String::new();
    for point in doc.points() {
        out.push_str(&time_token(point));
        out.push(' ');
        out.push_str(&value_token(point));
        out.push('\n');
    }
    out
}

fn time_token(point: &Point) -> String {
    if let Some(text) = point.time_text() {
        if time_text_consistent(point, text) {
            return text.to_string();
        }
    }
    let mut text = scalar::format(point.time(), point.time_notation());
    if point.time_is_relative() {
        text.insert(0, '+');
    }
    text
}

fn value_token(point: &Point) -> String {
    if let Some(text) = point.value_text() {
        if let Ok((value, _)) = scalar::parse(text) {
            if value == point.value() {
                return text.to_string();
            }
        }
    }
    scalar::format(point.value(), point.value_notation())
}

fn time_text_consistent(point: &Point, text: &str) -> bool {
    if text.starts_with('+') != point.time_is_relative() {
        return false;
    }
    matches!(scalar::parse(text), Ok((value, _)) if value == point.time())
}

fn line_error(line_number: usize, raw_line: &str, reason: String) -> Error {
    Error::LineParse {
        line_number,
        raw_text: raw_line.to_string(),
        reason,
    }
}
