//! The blocking API client.
//!
//! [`ApiClient`] owns the credentials, the TLS trust mode, and the HTTP
//! transport. Every call follows the same pipeline:
//!
//! ```text
//! params/body -> canonicalize -> sign -> build request -> send (retry on 429)
//! ```
//!
//! The raw surface is [`ApiClient::api_call`]; [`ApiClient::json_api_call`]
//! and [`ApiClient::json_paging_api_call`] layer envelope decoding on top.

use std::time::Duration;

use bytes::Bytes;
use chrono::Utc;
use duo_api_auth::{
    Credentials, ParamValue, Params, RequestData, SignatureVersion, canonicalize,
    format_rfc822_utc, sign_request,
};
use http::{Method, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::envelope::{PageMetadata, ResponseEnvelope};
use crate::error::{ClientError, ClientResult};
use crate::pinning::{RootCertificateSet, TrustMode};
use crate::transport::{RandomSource, Sleeper, SystemRandom, ThreadSleeper, send_with_retry};

/// A raw API response: the status code and the undecoded body.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    /// HTTP status of the final attempt.
    pub status: StatusCode,
    /// Response body, exactly as received.
    pub body: Bytes,
}

impl ApiResponse {
    /// The body as UTF-8 text.
    ///
    /// # Errors
    ///
    /// Returns the underlying [`std::str::Utf8Error`] for a body that is not
    /// valid UTF-8, rather than replacing bytes in place.
    pub fn text(&self) -> Result<&str, std::str::Utf8Error> {
        std::str::from_utf8(&self.body)
    }
}

/// Blocking client for one API host.
pub struct ApiClient {
    credentials: Credentials,
    scheme: String,
    sleeper: Box<dyn Sleeper + Send + Sync>,
    random: Box<dyn RandomSource + Send + Sync>,
    http: reqwest::blocking::Client,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("credentials", &self.credentials)
            .field("scheme", &self.scheme)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Start building a client for the given credentials.
    #[must_use]
    pub fn builder(credentials: Credentials) -> ApiClientBuilder {
        ApiClientBuilder::new(credentials)
    }

    /// Perform one API call and return the raw response.
    ///
    /// HTTP 429 responses are retried with exponential backoff; any other
    /// status, including API failures, is returned as-is.
    ///
    /// # Errors
    ///
    /// Fails when the request cannot be signed for `version` or on a
    /// transport error.
    pub fn api_call(
        &self,
        method: Method,
        path: &str,
        data: RequestData,
        version: SignatureVersion,
    ) -> ClientResult<ApiResponse> {
        self.api_call_with_headers(method, path, data, version, &[])
    }

    /// [`api_call`](Self::api_call) with additional headers, which V5 folds
    /// into the signature when their names start with `x-duo-`.
    pub fn api_call_with_headers(
        &self,
        method: Method,
        path: &str,
        data: RequestData,
        version: SignatureVersion,
        extra_headers: &[(String, String)],
    ) -> ClientResult<ApiResponse> {
        let date = format_rfc822_utc(&Utc::now());
        let token = sign_request(
            &self.credentials,
            method.as_str(),
            path,
            &date,
            version,
            &data,
            extra_headers,
        )?;

        let request = self.build_request(&method, path, &date, &token, &data, extra_headers)?;

        debug!(%method, path, %version, "sending API request");
        let response = send_with_retry::<_, ClientError>(
            || {
                let attempt = request
                    .try_clone()
                    .ok_or(ClientError::RequestNotRetryable)?;
                let response = self.http.execute(attempt)?;
                let status = response.status();
                let body = response.bytes()?;
                let mut response = http::Response::new(body);
                *response.status_mut() = status;
                Ok(response)
            },
            self.sleeper.as_ref(),
            self.random.as_ref(),
        )?;

        let status = response.status();
        let body = response.into_body();
        Ok(ApiResponse { status, body })
    }

    /// Perform one API call and decode the `OK` payload into `T`.
    ///
    /// # Errors
    ///
    /// A `FAIL` envelope becomes [`ClientError::Api`]; a body that is not a
    /// valid envelope becomes [`ClientError::BadResponse`].
    pub fn json_api_call<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        data: RequestData,
        version: SignatureVersion,
    ) -> ClientResult<T> {
        let response = self.api_call(method, path, data, version)?;
        let status = response.status.as_u16();
        let envelope = ResponseEnvelope::parse(&response.body, status)?;
        let (payload, _) = envelope.into_result(status)?;
        Ok(payload)
    }

    /// Fetch one page of a paged list endpoint.
    ///
    /// `offset` and `limit` are merged into `params` before signing, so the
    /// cursors participate in the signature like any other parameter.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`json_api_call`](Self::json_api_call).
    pub fn json_paging_api_call<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        mut params: Params,
        offset: &str,
        limit: u64,
        version: SignatureVersion,
    ) -> ClientResult<(T, Option<PageMetadata>)> {
        params.insert("offset".to_owned(), ParamValue::Single(offset.to_owned()));
        params.insert("limit".to_owned(), ParamValue::Single(limit.to_string()));
        let response = self.api_call(method, path, RequestData::Params(params), version)?;
        let status = response.status.as_u16();
        let envelope = ResponseEnvelope::parse(&response.body, status)?;
        envelope.into_result(status)
    }

    fn build_request(
        &self,
        method: &Method,
        path: &str,
        date: &str,
        token: &str,
        data: &RequestData,
        extra_headers: &[(String, String)],
    ) -> ClientResult<reqwest::blocking::Request> {
        let host = self.credentials.host();
        let has_body = matches!(*method, Method::POST | Method::PUT | Method::PATCH);

        let mut url = format!("{}://{host}{path}", self.scheme);
        let mut builder = match data {
            RequestData::Params(params) => {
                let canonical = canonicalize(params);
                if has_body {
                    self.http
                        .request(method.clone(), &url)
                        .header("Content-Type", "application/x-www-form-urlencoded")
                        .body(canonical)
                } else {
                    if !canonical.is_empty() {
                        url.push('?');
                        url.push_str(&canonical);
                    }
                    self.http.request(method.clone(), &url)
                }
            }
            RequestData::Json(body) => self
                .http
                .request(method.clone(), &url)
                .header("Content-Type", "application/json")
                .body(body.clone()),
        };

        builder = builder
            .header("Authorization", format!("Basic {token}"))
            .header("Accept", "application/json")
            .header("Date", date)
            .header("X-Duo-Date", date);
        for (name, value) in extra_headers {
            builder = builder.header(name, value);
        }

        builder.build().map_err(ClientError::from)
    }
}

/// Builder for [`ApiClient`].
pub struct ApiClientBuilder {
    credentials: Credentials,
    user_agent: String,
    scheme: String,
    trust: TrustMode,
    timeout: Option<Duration>,
    sleeper: Box<dyn Sleeper + Send + Sync>,
    random: Box<dyn RandomSource + Send + Sync>,
}

impl std::fmt::Debug for ApiClientBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClientBuilder")
            .field("credentials", &self.credentials)
            .field("user_agent", &self.user_agent)
            .field("scheme", &self.scheme)
            .field("trust", &self.trust)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl ApiClientBuilder {
    fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            user_agent: format!(
                "DuoAPIRust/{} ({}; rust)",
                env!("CARGO_PKG_VERSION"),
                std::env::consts::OS
            ),
            scheme: "https".to_owned(),
            trust: TrustMode::default(),
            timeout: None,
            sleeper: Box::new(ThreadSleeper),
            random: Box::new(SystemRandom),
        }
    }

    /// Override the `User-Agent` header.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set a total timeout for each request attempt.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Pin TLS to a caller-supplied root set instead of the bundled one.
    #[must_use]
    pub fn with_custom_roots(mut self, roots: RootCertificateSet) -> Self {
        self.trust = TrustMode::Custom(roots);
        self
    }

    /// Disable TLS certificate validation entirely. Debug builds only;
    /// [`build`](Self::build) fails in release builds.
    #[must_use]
    pub fn disable_certificate_validation(mut self) -> Self {
        self.trust = TrustMode::Disabled;
        self
    }

    /// Override the URL scheme, for tests against a plain-HTTP server.
    #[must_use]
    pub fn with_url_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = scheme.into();
        self
    }

    /// Replace the sleeper used between rate-limit retries.
    #[must_use]
    pub fn with_sleeper(mut self, sleeper: Box<dyn Sleeper + Send + Sync>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Replace the jitter source used between rate-limit retries.
    #[must_use]
    pub fn with_random(mut self, random: Box<dyn RandomSource + Send + Sync>) -> Self {
        self.random = random;
        self
    }

    /// Build the client, constructing the TLS configuration and the HTTP
    /// transport.
    ///
    /// # Errors
    ///
    /// Fails when validation is disabled in a release build, when the root
    /// bundle cannot be parsed, or when the transport cannot be constructed.
    pub fn build(self) -> ClientResult<ApiClient> {
        self.trust.ensure_allowed()?;

        let mut builder = reqwest::blocking::Client::builder().user_agent(&self.user_agent);
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        builder = match self.trust.tls_config()? {
            Some(config) => builder.use_preconfigured_tls(config),
            None => builder.danger_accept_invalid_certs(true),
        };
        let http = builder.build()?;

        Ok(ApiClient {
            credentials: self.credentials,
            scheme: self.scheme,
            sleeper: self.sleeper,
            random: self.random,
            http,
        })
    }
}
