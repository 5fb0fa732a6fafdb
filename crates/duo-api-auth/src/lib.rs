//! Request signing for the Duo API.
//!
//! This crate is the pure signing core of the client: given credentials, a
//! method, a path, a date string and the request payload, it produces the
//! `Basic` authorization token that a remote verifier recomputes
//! independently. Everything here is a pure function of its inputs: no I/O,
//! no clocks, no randomness.
//!
//! # Usage
//!
//! ```rust
//! use duo_api_auth::{Credentials, RequestData, SignatureVersion, sign_request};
//!
//! let creds = Credentials::new("ikey", "skey", "api-xxxxxxxx.duosecurity.com");
//! let token = sign_request(
//!     &creds,
//!     "GET",
//!     "/admin/v1/users",
//!     "Fri, 07 Dec 2012 17:18:00 -0000",
//!     SignatureVersion::V5,
//!     &RequestData::empty(),
//!     &[],
//! )
//! .unwrap();
//! // Transmitted as `Authorization: Basic <token>`.
//! ```
//!
//! # Modules
//!
//! - [`canonical`] - Deterministic parameter canonicalization
//! - [`credentials`] - API credential pair
//! - [`error`] - Signing error type
//! - [`rfc822`] - Date-header formatting
//! - [`sigv2`] - Legacy base string (form params only)
//! - [`sigv4`] - JSON-body base string
//! - [`sigv5`] - Current base string (params, body and extensibility headers)
//! - [`signature`] - Version selection and the signing entry point

pub mod canonical;
pub mod credentials;
pub mod error;
pub mod rfc822;
pub mod signature;
pub mod sigv2;
pub mod sigv4;
pub mod sigv5;

pub use canonical::{ParamValue, Params, canonicalize};
pub use credentials::Credentials;
pub use error::AuthError;
pub use rfc822::{format_rfc822, format_rfc822_utc};
pub use signature::{RequestData, SignatureVersion, sign_request};
