//! Reply grammar.
//!
//! The upstream renders one of two descriptions:
//!
//! - taken name: `Time of Availability: <RFC 3339>, ... Searches: <count> / month`
//! - available name: `... Searches: <count> / month`
//!
//! Shapes are tried in table order and the first whose marker is present
//! decides the outcome. Anything else is rejected rather than guessed at.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use namewatch_core::{Error, ResolvedRecord};
use regex::Regex;

const AVAILABILITY_MARKER: &str = "Time of Availability: ";
const SEARCHES_MARKER: &str = "Searches: ";

static AVAILABILITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Time of Availability: ([^,]*)").expect("availability pattern is valid"));

static SEARCHES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Searches: (.*?) / month").expect("searches pattern is valid"));

/// One recognized reply layout.
pub struct ReplyShape {
    pub name: &'static str,
    /// Literal whose presence selects this shape.
    pub marker: &'static str,
    pub parse: fn(&str) -> Result<ResolvedRecord, Error>,
}

/// Recognized layouts, most specific first.
pub const SHAPES: &[ReplyShape] = &[
    ReplyShape { name: "unavailable", marker: AVAILABILITY_MARKER, parse: parse_unavailable },
    ReplyShape { name: "available", marker: SEARCHES_MARKER, parse: parse_available },
];

/// Parse a rendered description into a record.
///
/// # Errors
///
/// Returns `Error::UnparseableResponse` if no shape matches or the matching
/// shape's fields are malformed.
pub fn parse_description(description: &str) -> Result<ResolvedRecord, Error> {
    let shape = SHAPES
        .iter()
        .find(|shape| description.contains(shape.marker))
        .ok_or_else(|| unparseable("no known marker", description))?;

    tracing::trace!(shape = shape.name, "matched reply shape");
    (shape.parse)(description)
}

fn parse_unavailable(description: &str) -> Result<ResolvedRecord, Error> {
    let raw = AVAILABILITY
        .captures(description)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim())
        .ok_or_else(|| unparseable("missing availability time", description))?;

    let availability_time = DateTime::parse_from_rfc3339(raw)
        .map_err(|e| unparseable(&format!("bad availability time {raw:?} ({e})"), description))?
        .with_timezone(&Utc);

    Ok(ResolvedRecord { search_count: search_count(description)?, availability_time: Some(availability_time) })
}

fn parse_available(description: &str) -> Result<ResolvedRecord, Error> {
    Ok(ResolvedRecord { search_count: search_count(description)?, availability_time: None })
}

/// The count is kept verbatim; it only has to look like a number.
fn search_count(description: &str) -> Result<String, Error> {
    let count = SEARCHES
        .captures(description)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim())
        .ok_or_else(|| unparseable("missing search count", description))?;

    if !count.chars().any(|c| c.is_ascii_digit()) {
        return Err(unparseable(&format!("malformed search count {count:?}"), description));
    }

    Ok(count.to_string())
}

fn unparseable(reason: &str, description: &str) -> Error {
    Error::UnparseableResponse(format!("{reason} in {description:?}"))
}
