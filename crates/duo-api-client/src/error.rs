//! Error types for the transport core.

/// Errors surfaced by the API client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Request signing failed.
    #[error("signing failed: {0}")]
    Signing(#[from] duo_api_auth::AuthError),

    /// A network-level failure with no HTTP response (DNS, connect, TLS
    /// handshake, timeout). Never retried by the backoff controller.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The TLS configuration could not be built.
    #[error("failed to build TLS configuration: {0}")]
    Tls(String),

    /// A certificate in a root bundle could not be parsed.
    #[error("invalid certificate in root bundle: {0}")]
    InvalidRootCertificate(String),

    /// Disabling TLS validation is a debug-only facility.
    #[error("disabling TLS certificate validation is not available in release builds")]
    ValidationDisabledInRelease,

    /// The signed request could not be cloned for a retry attempt.
    #[error("request could not be cloned for retry")]
    RequestNotRetryable,

    /// The server reported a business error (`stat: "FAIL"` envelope).
    #[error(
        "API error {code} (HTTP {http_status}): '{message}' ('{detail}')",
        detail = .message_detail.as_deref().unwrap_or("")
    )]
    Api {
        /// Vendor error code from the envelope.
        code: i64,
        /// HTTP status of the response carrying the envelope.
        http_status: u16,
        /// Basic error information.
        message: String,
        /// Detailed error information, when the envelope carries it.
        message_detail: Option<String>,
    },

    /// The transport succeeded but the payload was not a well-formed
    /// response envelope.
    #[error("unparseable response body (HTTP {http_status}): {source}")]
    BadResponse {
        /// HTTP status of the malformed response.
        http_status: u16,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },
}

/// Convenience result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;
