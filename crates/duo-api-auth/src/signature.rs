//! Signature version selection and the signing entry point.
//!
//! Each protocol version builds a different base string (see [`crate::sigv2`],
//! [`crate::sigv4`] and [`crate::sigv5`]); the token construction is shared:
//!
//! ```text
//! base64(ikey ":" lowercase_hex(HMAC-SHA512(skey, base_string)))
//! ```
//!
//! The caller attaches the token as `Authorization: Basic <token>` together
//! with the exact date string that was signed.

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha512};
use tracing::debug;

use crate::canonical::{Params, canonicalize};
use crate::credentials::Credentials;
use crate::error::AuthError;
use crate::{sigv2, sigv4, sigv5};

type HmacSha512 = Hmac<Sha512>;

/// The signature protocol version used to build the base string.
///
/// V5 is the current default; V2 and V4 are retained for servers and fixtures
/// expecting the legacy constructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SignatureVersion {
    /// Legacy scheme; signs form-encoded parameters only.
    V2,
    /// Signs a JSON request body only.
    V4,
    /// Current scheme; signs form parameters or a JSON body, plus
    /// extensibility headers.
    #[default]
    V5,
}

impl fmt::Display for SignatureVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::V2 => write!(f, "V2"),
            Self::V4 => write!(f, "V4"),
            Self::V5 => write!(f, "V5"),
        }
    }
}

/// The payload of one API call, as seen by both the signer and the transport.
#[derive(Debug, Clone)]
pub enum RequestData {
    /// Form-encoded parameters; transmitted as the query string (bodyless
    /// methods) or an `application/x-www-form-urlencoded` body.
    Params(Params),
    /// A serialized JSON body, transmitted verbatim.
    Json(String),
}

impl RequestData {
    /// Request data for a call with neither parameters nor body.
    #[must_use]
    pub fn empty() -> Self {
        Self::Params(Params::new())
    }
}

/// Sign one request, producing the `Basic` authorization token.
///
/// `date` must be the exact string transmitted in the request's date headers;
/// the signature is invalid if they diverge. `extra_headers` are only
/// consulted by V5 (see [`sigv5::canonicalize_headers`]).
///
/// # Errors
///
/// Returns an error when the request data cannot be represented by the
/// selected version (JSON body under V2, form parameters under V4).
pub fn sign_request(
    credentials: &Credentials,
    method: &str,
    path: &str,
    date: &str,
    version: SignatureVersion,
    data: &RequestData,
    extra_headers: &[(String, String)],
) -> Result<String, AuthError> {
    let host = credentials.host();
    let base_string = match version {
        SignatureVersion::V2 => {
            let params = match data {
                RequestData::Params(params) => params,
                RequestData::Json(_) => return Err(AuthError::JsonBodyNotSupported(version)),
            };
            sigv2::base_string(method, host, path, date, &canonicalize(params))
        }
        SignatureVersion::V4 => {
            let body = match data {
                RequestData::Json(body) => body.as_str(),
                RequestData::Params(params) if params.is_empty() => "",
                RequestData::Params(_) => return Err(AuthError::FormParamsNotSupported(version)),
            };
            sigv4::base_string(method, host, path, date, body)
        }
        SignatureVersion::V5 => {
            let (canonical_params, body) = match data {
                RequestData::Params(params) => (canonicalize(params), ""),
                RequestData::Json(body) => (String::new(), body.as_str()),
            };
            sigv5::base_string(
                method,
                host,
                path,
                date,
                &canonical_params,
                body,
                extra_headers,
            )
        }
    };

    debug!(%version, method, path, "signing request");

    let digest = hmac_sign(credentials.secret_bytes(), &base_string);
    let token = format!("{}:{digest}", credentials.integration_key());
    Ok(BASE64.encode(token))
}

/// Compute `lowercase_hex(HMAC-SHA512(key, data))`.
pub(crate) fn hmac_sign(key: &[u8], data: &str) -> String {
    let mut mac = HmacSha512::new_from_slice(key).expect("HMAC can accept any key length");
    mac.update(data.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Compute `lowercase_hex(SHA-512(data))`.
pub(crate) fn sha512_hex(data: &str) -> String {
    hex::encode(Sha512::digest(data.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canonical::ParamValue;

    // Fixture credentials shared with the upstream verifier's test suite.
    const TEST_IKEY: &str = "test_ikey";
    const TEST_SKEY: &str = "gtdfxv9YgVBYcF6dl2Eq17KUQJN2PLM2ODVTkvoT";
    const TEST_HOST: &str = "foO.BAr52.cOm";
    const TEST_DATE: &str = "Fri, 07 Dec 2012 17:18:00 -0000";
    const TEST_PATH: &str = "/Foo/BaR2/qux";
    const TEST_JSON: &str =
        "{\"alpha\":[\"a\",\"b\",\"c\",\"d\"],\"data\":\"abc123\",\"info\":{\"another\":2,\"test\":1}}";

    fn test_credentials() -> Credentials {
        Credentials::new(TEST_IKEY, TEST_SKEY, TEST_HOST)
    }

    fn unicode_params() -> Params {
        let pairs = [
            (
                "\u{469a}\u{287b}\u{35d0}\u{8ef3}\u{6727}\u{502a}\u{0810}\u{d091}\u{c8}\u{c170}",
                "\u{0f45}\u{1a76}\u{341a}\u{654c}\u{c23f}\u{9b09}\u{abe2}\u{8343}\u{1b27}\u{60d0}",
            ),
            (
                "\u{7449}\u{7e4b}\u{ccfb}\u{59ff}\u{fe5f}\u{83b7}\u{adcc}\u{900c}\u{cfd1}\u{7813}",
                "\u{8db7}\u{5022}\u{92d3}\u{42ef}\u{207d}\u{8730}\u{acfe}\u{5617}\u{0946}\u{4e30}",
            ),
            (
                "\u{7470}\u{9314}\u{901c}\u{9eae}\u{40d8}\u{4201}\u{82d8}\u{8c70}\u{1d31}\u{a042}",
                "\u{17d9}\u{0ba8}\u{9358}\u{aadf}\u{a42a}\u{48be}\u{fb96}\u{6fe9}\u{b7ff}\u{32f3}",
            ),
            (
                "\u{c2c5}\u{2c1d}\u{2620}\u{3617}\u{96b3}F\u{8605}\u{20e8}\u{ac21}\u{5934}",
                "\u{fba9}\u{41aa}\u{bd83}\u{840b}\u{2615}\u{3e6e}\u{652d}\u{a8b5}\u{d56b}U",
            ),
        ];
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), ParamValue::from(*v)))
            .collect()
    }

    #[test]
    fn test_should_default_to_v5() {
        assert_eq!(SignatureVersion::default(), SignatureVersion::V5);
    }

    #[test]
    fn test_should_sign_v2_with_unicode_params() {
        let token = sign_request(
            &test_credentials(),
            "PoSt",
            TEST_PATH,
            TEST_DATE,
            SignatureVersion::V2,
            &RequestData::Params(unicode_params()),
            &[],
        )
        .unwrap();
        assert_eq!(
            token,
            "dGVzdF9pa2V5OjA1MDgwNjUwMzVhMDNiMmExZGUyZjQ1M2U2MjllNzkxZDE4MDMyOWUxNTdmNjVkZjZiM2Uw\
             ZjA4Mjk5ZDQzMjFlMWM1YzdhN2M3ZWU2YjllNWZjODBkMWZiNmZiZjNhZDVlYjdjNDRkZDNiMzk4NWEwMmMz\
             N2FjYTUzZWMzNjk4"
        );
    }

    #[test]
    fn test_should_sign_v4_with_json_body() {
        let token = sign_request(
            &test_credentials(),
            "POST",
            TEST_PATH,
            TEST_DATE,
            SignatureVersion::V4,
            &RequestData::Json(TEST_JSON.to_owned()),
            &[],
        )
        .unwrap();
        assert_eq!(
            token,
            "dGVzdF9pa2V5OjIxNmVmMjE5OTY5MzY5MzZkMGZiYzQ4NDc3N2Q0ZjRmMWIzYTE4YjUyZjY1ZDk5MmIwMmRk\
             ZmJhYWFlZTRiNWZkMTA0NGMzNDk3M2U1MTUwMTc0NTI4ZjU2ZTZiMGVhY2ViN2RhNGYxNjUxMmU0YzkzODVh\
             ZGE2ZmNhYTNjM2U4"
        );
    }

    #[test]
    fn test_should_sign_v4_with_empty_body_for_bodyless_call() {
        let token = sign_request(
            &test_credentials(),
            "POST",
            TEST_PATH,
            TEST_DATE,
            SignatureVersion::V4,
            &RequestData::empty(),
            &[],
        )
        .unwrap();
        assert_eq!(
            token,
            "dGVzdF9pa2V5OjExZjBmMTI0MTc0NWVlYTQzNGMzOTRlYzBjYTg1MjNjY2IwNDNkNjY5NzI1N2MxMTBmYjNl\
             OGYzODIzNTA4YTJjYTY2Mzc4NjQ1Mzg2MDY1OTc3ZjY1ZGU3ZTZlMjZhYTFjYTE2OTRlOTcwYWE1YWE1ZDY3\
             NGJiODgyMWIwNDVj"
        );
    }

    #[test]
    fn test_should_sign_v5_with_unicode_params() {
        let token = sign_request(
            &test_credentials(),
            "POST",
            TEST_PATH,
            TEST_DATE,
            SignatureVersion::V5,
            &RequestData::Params(unicode_params()),
            &[],
        )
        .unwrap();
        assert_eq!(
            token,
            "dGVzdF9pa2V5OmRlODg2NDc1ZjVlZThjZjMyODcyYTdjMTA4NjllNGRjZTdhMDAzOGY4YjBkYTAxZDkwMzQ2\
             OWM2MjQwNDczZGZkMWFiZjk4YjQwYjM0YjlhZDdmYmM5OWQ1ZGYzZjIyNzllNzEwNWZkOTEwMWM0MjhiOTRm\
             YWFlZWM1ZTE3OWNm"
        );
    }

    #[test]
    fn test_should_sign_v5_with_json_body_and_extensibility_header() {
        let token = sign_request(
            &test_credentials(),
            "POST",
            TEST_PATH,
            TEST_DATE,
            SignatureVersion::V5,
            &RequestData::Json(TEST_JSON.to_owned()),
            &[("X-Duo-Header-1".to_owned(), "header_value_1".to_owned())],
        )
        .unwrap();
        // Fixture published with the upstream V5 implementation.
        assert_eq!(
            token,
            "dGVzdF9pa2V5OjY2MDc2NjEwOTcwYzIzMDU2YzhjZTBjNjZkZGQyZGIyZDBmMTA4NzZhODI1ODE0ZDkyZTll\
             ZTNkZDA0MTg5NzUyYzg4YTViZTc5ZDIwZjZkNTZjYWNjN2E5ZjE2YTZiOGU2OTVhMDAyOGE3ZjYwZWQyMTk0\
             OTZhYzUzZGRmYWM3"
        );
    }

    #[test]
    fn test_should_reject_json_body_under_v2() {
        let result = sign_request(
            &test_credentials(),
            "POST",
            TEST_PATH,
            TEST_DATE,
            SignatureVersion::V2,
            &RequestData::Json("{}".to_owned()),
            &[],
        );
        assert!(matches!(result, Err(AuthError::JsonBodyNotSupported(_))));
    }

    #[test]
    fn test_should_reject_form_params_under_v4() {
        let mut params = Params::new();
        params.insert("username".to_owned(), "root".into());
        let result = sign_request(
            &test_credentials(),
            "POST",
            TEST_PATH,
            TEST_DATE,
            SignatureVersion::V4,
            &RequestData::Params(params),
            &[],
        );
        assert!(matches!(result, Err(AuthError::FormParamsNotSupported(_))));
    }

    #[test]
    fn test_should_produce_deterministic_hmac() {
        assert_eq!(hmac_sign(b"secret", "data"), hmac_sign(b"secret", "data"));
    }

    #[test]
    fn test_should_hash_empty_string_to_known_sha512() {
        assert_eq!(
            sha512_hex(""),
            "cf83e1357eefb8bdf1542850d66d8007d620e4050b5715dc83f4a921d36ce9ce\
             47d0d13c5d85f2b0ff8318d2877eec2f63b931bd47417a81a538327af927da3e"
        );
    }
}
