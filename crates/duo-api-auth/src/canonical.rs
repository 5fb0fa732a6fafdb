//! Deterministic canonicalization of request parameters.
//!
//! The same canonical string is used both on the wire (as the query string or
//! form-encoded body) and inside the signature base string, so the two must be
//! character-for-character identical. The encoding rules are stricter than a
//! generic URL encoder:
//!
//! - every character outside the RFC 3986 unreserved set
//!   (`A-Z a-z 0-9 - . _ ~`) is percent-encoded, including `!`, `'`, `(`,
//!   `)` and `*`
//! - hex digits in escapes are upper-case
//! - space encodes as `%20`, never `+`
//! - `~` passes through literally
//!
//! Multi-valued parameters (`next_offset`-style pagination cursors) expand to
//! one `key=value` segment per value. All segments are then sorted by byte
//! comparison of the full encoded segment and joined with `&`.

use std::collections::HashMap;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

/// Characters percent-encoded in canonical parameter keys and values.
///
/// Everything except RFC 3986 unreserved characters is escaped. The upstream
/// verifier additionally requires `! ' ( ) *` to be escaped; `NON_ALPHANUMERIC`
/// already covers those.
const CANONICAL_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// A single request-parameter value: either one string or an ordered list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    /// A plain scalar value.
    Single(String),
    /// A multi-valued parameter; each element becomes its own `key=value`
    /// segment, in list order.
    List(Vec<String>),
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        Self::Single(value.to_owned())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        Self::Single(value)
    }
}

impl From<Vec<String>> for ParamValue {
    fn from(values: Vec<String>) -> Self {
        Self::List(values)
    }
}

/// Request parameters keyed by name. Iteration order of the map never affects
/// the canonical output.
pub type Params = HashMap<String, ParamValue>;

/// Canonicalize request parameters into the sorted, percent-encoded
/// `key=value&key=value` form used for both transmission and signing.
///
/// Zero parameters yield the empty string. This function never fails.
///
/// # Examples
///
/// ```
/// use duo_api_auth::canonical::{Params, canonicalize};
///
/// let mut params = Params::new();
/// params.insert("realname".to_owned(), "First Last".into());
/// params.insert("username".to_owned(), "root".into());
/// assert_eq!(canonicalize(&params), "realname=First%20Last&username=root");
/// ```
#[must_use]
pub fn canonicalize(params: &Params) -> String {
    let mut segments: Vec<String> = Vec::with_capacity(params.len());
    for (key, value) in params {
        let key = encode(key);
        match value {
            ParamValue::Single(v) => segments.push(format!("{key}={}", encode(v))),
            ParamValue::List(values) => {
                segments.extend(values.iter().map(|v| format!("{key}={}", encode(v))));
            }
        }
    }
    // Byte-ordinal sort of the full encoded segment, not of the raw key.
    // The sort is stable so equal segments keep their list order.
    segments.sort();
    segments.join("&")
}

fn encode(input: &str) -> String {
    utf8_percent_encode(input, CANONICAL_ENCODE_SET).to_string()
}
