//! Signature V5 base-string construction (current default).
//!
//! ```text
//! date                        \n
//! METHOD_UPPER                \n
//! host_lower                  \n
//! path                        \n
//! canonical_params            \n
//! hex(SHA512(body))           \n
//! hex(SHA512(canonical_headers))
//! ```
//!
//! V5 supports both form parameters and a JSON body in one construction; a
//! request carrying neither still emits the empty canonical string and the
//! hashes of empty input rather than omitting lines.

use crate::signature::sha512_hex;

/// Prefix selecting which caller-supplied headers participate in the
/// signature.
const SIGNED_HEADER_PREFIX: &str = "x-duo-";

/// The mandatory date header; transmitted and signed on its own line, so it
/// is excluded from header canonicalization.
const DATE_HEADER: &str = "x-duo-date";

/// Build the V5 base string.
#[must_use]
pub fn base_string(
    method: &str,
    host: &str,
    path: &str,
    date: &str,
    canonical_params: &str,
    body: &str,
    extra_headers: &[(String, String)],
) -> String {
    format!(
        "{date}\n{method}\n{host}\n{path}\n{canonical_params}\n{body_hash}\n{header_hash}",
        method = method.to_uppercase(),
        host = host.to_lowercase(),
        body_hash = sha512_hex(body),
        header_hash = sha512_hex(&canonicalize_headers(extra_headers)),
    )
}

/// Canonicalize the extensibility headers for signing.
///
/// Only headers whose name case-insensitively begins with `x-duo-` qualify,
/// excluding the date header. Names are lower-cased; the first occurrence of
/// a name wins; supply order is preserved (headers are not sorted). Segments
/// are `name \0 value`, joined by `\0`. Headers with empty names or values,
/// or with embedded NUL bytes, are skipped.
#[must_use]
pub fn canonicalize_headers(headers: &[(String, String)]) -> String {
    let mut seen: Vec<String> = Vec::new();
    let mut canonical = String::new();
    for (name, value) in headers {
        let lower = name.to_lowercase();
        if name.is_empty() || value.is_empty() {
            continue;
        }
        if lower.contains('\0') || value.contains('\0') {
            continue;
        }
        if !lower.starts_with(SIGNED_HEADER_PREFIX) || lower == DATE_HEADER {
            continue;
        }
        if seen.contains(&lower) {
            continue;
        }
        if !canonical.is_empty() {
            canonical.push('\0');
        }
        canonical.push_str(&lower);
        canonical.push('\0');
        canonical.push_str(value);
        seen.push(lower);
    }
    canonical
}
