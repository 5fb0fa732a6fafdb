//! Blocking HTTP client for the Duo-style REST API.
//!
//! Built on top of [`duo_api_auth`], this crate adds the transport side of
//! the contract:
//!
//! ```text
//! +------------+     +-----------+     +----------------------+
//! |  client    | --> | transport | --> | TLS (pinned chain)   |
//! |  (sign,    |     | (429      |     | bundled/custom roots |
//! |  envelope) |     |  backoff) |     +----------------------+
//! +------------+     +-----------+
//! ```
//!
//! - [`client`]: request pipeline and the builder
//! - [`envelope`]: the `{"stat": ...}` JSON response envelope
//! - [`transport`]: rate-limit backoff with injectable sleep and jitter
//! - [`pinning`]: certificate pinning over standard TLS validation
//! - [`error`]: the error type shared by all of the above
//!
//! # Example
//!
//! ```no_run
//! use duo_api_auth::{Credentials, ParamValue, Params, RequestData, SignatureVersion};
//! use duo_api_client::ApiClient;
//! use http::Method;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let client = ApiClient::builder(Credentials::new(
//!     "DIXXXXXXXXXXXXXXXXXX",
//!     "secret",
//!     "api-xxxxxxxx.duosecurity.com",
//! ))
//! .build()?;
//!
//! let mut params = Params::new();
//! params.insert("username".to_owned(), ParamValue::Single("alice".to_owned()));
//! let response = client.api_call(
//!     Method::GET,
//!     "/auth/v2/preauth",
//!     RequestData::Params(params),
//!     SignatureVersion::V5,
//! )?;
//! println!("{}", response.text()?);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod envelope;
pub mod error;
pub mod pinning;
pub mod transport;

pub use client::{ApiClient, ApiClientBuilder, ApiResponse};
pub use envelope::{PageMetadata, ResponseEnvelope, ResponseStatus};
pub use error::{ClientError, ClientResult};
pub use pinning::{RootCertificateSet, TrustMode};
pub use transport::{RandomSource, Sleeper};
