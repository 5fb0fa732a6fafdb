//! The JSON response envelope returned by every API endpoint.
//!
//! Successful calls carry `{"stat": "OK", "response": ...}`, optionally with
//! paging metadata; failures carry `{"stat": "FAIL", "code": ..., "message":
//! ...}`. [`ResponseEnvelope::into_result`] folds both shapes into a
//! [`ClientResult`].

use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::error::{ClientError, ClientResult};

/// The `stat` discriminator of an envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum ResponseStatus {
    /// The call succeeded; `response` holds the payload.
    #[serde(rename = "OK")]
    Ok,
    /// The call failed; `code` and `message` describe the error.
    #[serde(rename = "FAIL")]
    Fail,
}

/// Paging cursors attached to list responses.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageMetadata {
    /// Offset to pass to fetch the next page, absent on the last page.
    pub next_offset: Option<serde_json::Value>,
    /// Offset of the previous page.
    pub prev_offset: Option<serde_json::Value>,
    /// Total number of objects across all pages.
    pub total_objects: Option<i64>,
}

impl PageMetadata {
    /// Whether another page is available.
    #[must_use]
    pub fn has_next_page(&self) -> bool {
        self.next_offset.is_some()
    }
}

/// A parsed response envelope, payload still undecoded.
#[derive(Debug, Deserialize)]
pub struct ResponseEnvelope {
    /// Success or failure discriminator.
    pub stat: ResponseStatus,
    /// The payload, present on success.
    #[serde(default)]
    pub response: serde_json::Value,
    /// API error code, present on failure.
    pub code: Option<i64>,
    /// Human-readable error summary, present on failure.
    pub message: Option<String>,
    /// Additional error detail, sometimes present on failure.
    pub message_detail: Option<String>,
    /// Paging cursors, present on paged list responses.
    pub metadata: Option<PageMetadata>,
}

impl ResponseEnvelope {
    /// Parse an envelope from a raw response body.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::BadResponse`] when the body is not a valid
    /// envelope (including bodies that are not UTF-8 at all), carrying the
    /// HTTP status for context.
    pub fn parse(body: &[u8], http_status: u16) -> ClientResult<Self> {
        serde_json::from_slice(body).map_err(|source| ClientError::BadResponse {
            http_status,
            source,
        })
    }

    /// Decode the payload, or surface the API failure.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Api`] for a `FAIL` envelope and
    /// [`ClientError::BadResponse`] when an `OK` payload does not decode
    /// into `T`.
    pub fn into_result<T: DeserializeOwned>(
        self,
        http_status: u16,
    ) -> ClientResult<(T, Option<PageMetadata>)> {
        match self.stat {
            ResponseStatus::Ok => {
                let payload =
                    serde_json::from_value(self.response).map_err(|source| {
                        ClientError::BadResponse {
                            http_status,
                            source,
                        }
                    })?;
                Ok((payload, self.metadata))
            }
            ResponseStatus::Fail => Err(ClientError::Api {
                code: self.code.unwrap_or_else(|| i64::from(http_status)),
                http_status,
                message: self.message.unwrap_or_else(|| "unknown error".to_owned()),
                message_detail: self.message_detail,
            }),
        }
    }
}
