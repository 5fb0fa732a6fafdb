//! Signature V2 base-string construction (legacy, form-encoded params only).
//!
//! ```text
//! date            \n
//! METHOD_UPPER    \n
//! host_lower      \n
//! path            \n
//! canonical_params
//! ```

/// Build the V2 base string.
///
/// `method` is upper-cased and `host` lower-cased here; `path` is used exactly
/// as given, and `canonical_params` must come from
/// [`crate::canonical::canonicalize`].
#[must_use]
pub fn base_string(
    method: &str,
    host: &str,
    path: &str,
    date: &str,
    canonical_params: &str,
) -> String {
    format!(
        "{date}\n{method}\n{host}\n{path}\n{canonical_params}",
        method = method.to_uppercase(),
        host = host.to_lowercase(),
    )
}
