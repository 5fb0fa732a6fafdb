//! API credential pair and host binding.

use std::fmt;

/// Immutable credentials for one API integration.
///
/// The secret key never leaves this struct except as raw bytes fed to HMAC;
/// it is redacted from `Debug` output.
#[derive(Clone)]
pub struct Credentials {
    integration_key: String,
    secret_key: String,
    host: String,
}

impl Credentials {
    /// Create a credential set for the given API host.
    pub fn new(
        integration_key: impl Into<String>,
        secret_key: impl Into<String>,
        host: impl Into<String>,
    ) -> Self {
        Self {
            integration_key: integration_key.into(),
            secret_key: secret_key.into(),
            host: host.into(),
        }
    }

    /// The public integration key (`ikey`).
    #[must_use]
    pub fn integration_key(&self) -> &str {
        &self.integration_key
    }

    /// The API hostname, exactly as supplied.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Raw secret key bytes for HMAC computation.
    pub(crate) fn secret_bytes(&self) -> &[u8] {
        self.secret_key.as_bytes()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("integration_key", &self.integration_key)
            .field("secret_key", &"<redacted>")
            .field("host", &self.host)
            .finish()
    }
}
