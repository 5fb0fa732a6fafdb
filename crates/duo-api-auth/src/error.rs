//! Error types for request signing.

use crate::signature::SignatureVersion;

/// Errors that can occur while signing a request.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The selected signature version cannot represent a JSON request body
    /// (V2 signs form-encoded parameters only).
    #[error("signature {0} cannot sign a JSON request body")]
    JsonBodyNotSupported(SignatureVersion),

    /// The selected signature version cannot represent form parameters
    /// (V4 signs a JSON body only).
    #[error("signature {0} cannot sign form-encoded parameters")]
    FormParamsNotSupported(SignatureVersion),
}
