use crate::error::{ErrorKind, Rejection, Result};
use exn::ResultExt;
use regex::Regex;
use std::str::FromStr;
use std::sync::LazyLock;

/// Longest accepted text, in characters, after sanitizing.
pub const MAX_TEXT_LENGTH: usize = 200;

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Trim the input and collapse every internal run of whitespace to a single space.
pub fn sanitize(input: &str) -> String {
    WHITESPACE.replace_all(input.trim(), " ").into_owned()
}

/// Sanitize `input` and check it is acceptable as the text of `field`.
pub fn validate(field: &'static str, input: &str) -> Result<String> {
    let text = sanitize(input);
    if text.is_empty() {
        exn::bail!(ErrorKind::InvalidInput { field, reason: Rejection::Empty });
    }
    if text.chars().count() > MAX_TEXT_LENGTH {
        exn::bail!(ErrorKind::InvalidInput { field, reason: Rejection::TooLong(MAX_TEXT_LENGTH) });
    }
    Ok(text)
}

/// Parse an identifier received from outside the process (CLI argument, URL
/// segment). Surrounding whitespace is ignored.
pub fn parse_id<T>(field: &'static str, input: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    input.trim().parse::<T>().or_raise(|| ErrorKind::InvalidId(field, input.to_string()))
}
