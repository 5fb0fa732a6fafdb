//! Signature V4 base-string construction (JSON body only).
//!
//! ```text
//! date            \n
//! METHOD_UPPER    \n
//! host_lower      \n
//! path            \n
//!                 \n   <- explicit empty line where V2 carries params
//! hex(SHA512(body))
//! ```

use crate::signature::sha512_hex;

/// Build the V4 base string.
///
/// `body` is the serialized JSON payload, or the empty string for a call
/// without a body; the hash placeholder is always emitted.
#[must_use]
pub fn base_string(method: &str, host: &str, path: &str, date: &str, body: &str) -> String {
    format!(
        "{date}\n{method}\n{host}\n{path}\n\n{body_hash}",
        method = method.to_uppercase(),
        host = host.to_lowercase(),
        body_hash = sha512_hex(body),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_hash_json_body_into_base_string() {
        let base = base_string(
            "POST",
            "foo.bar52.com",
            "/Foo/BaR2/qux",
            "Fri, 07 Dec 2012 17:18:00 -0000",
            "{\"alpha\":[\"a\",\"b\",\"c\",\"d\"],\"data\":\"abc123\",\"info\":{\"another\":2,\"test\":1}}",
        );
        assert_eq!(
            base,
            "Fri, 07 Dec 2012 17:18:00 -0000\nPOST\nfoo.bar52.com\n/Foo/BaR2/qux\n\n\
             c30ca4ffc7fe4272aa6ae7a3c94cf71c11ed8ae7aaa32e81a401a59f1cef0866\
             ccb02304380cdc48a813b1566c457653fa62736022f0cfeadcec8cd7c6233480"
        );
    }

    #[test]
    fn test_should_emit_empty_body_hash_placeholder() {
        let base = base_string("GET", "api.example.com", "/ping", "date", "");
        assert!(base.contains("\n\ncf83e1357eefb8bd"));
    }
}
