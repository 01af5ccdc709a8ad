use std::time::Duration;

use futures::StreamExt;
use reqwest::header::{HeaderMap, CONTENT_TYPE, COOKIE, LOCATION, SET_COOKIE};
use thiserror::Error;
use url::Url;

use super::session::Session;
use crate::config::Config;

const MAX_RESPONSE_SIZE: usize = 10 * 1024 * 1024; // 10MB

/// Errors surfaced by the transport.
///
/// Non-2xx responses are not followed or swallowed: they come back as
/// [`TransportError::Status`] with the response headers attached, so callers
/// can decode redirect-based signaling (login cookies, parse-error markers).
#[derive(Debug, Error)]
pub enum TransportError {
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// Request exceeded the configured timeout
    #[error("Request timed out after {0}s")]
    Timeout(u64),
    /// HTTP response with a non-2xx status code
    #[error("HTTP error: status {status}")]
    Status { status: u16, headers: HeaderMap },
    /// Response body exceeded the size limit
    #[error("Response too large (exceeds {0} bytes)")]
    TooLarge(usize),
    /// Response body was not valid UTF-8
    #[error("Invalid UTF-8 in response")]
    InvalidUtf8,
    /// A request URL could not be built
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl TransportError {
    /// HTTP status carried by the error, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::Status { status, .. } => Some(*status),
            TransportError::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Response headers carried by a status error.
    pub fn headers(&self) -> Option<&HeaderMap> {
        match self {
            TransportError::Status { headers, .. } => Some(headers),
            _ => None,
        }
    }

    /// Returns true for 3xx responses.
    pub fn is_redirect(&self) -> bool {
        matches!(self, TransportError::Status { status, .. } if (300..400).contains(status))
    }

    /// Raw `Location` header of a status error.
    pub fn location(&self) -> Option<&str> {
        self.headers()?.get(LOCATION)?.to_str().ok()
    }

    /// All `Set-Cookie` header values of a status error.
    pub fn set_cookies(&self) -> Vec<&str> {
        self.headers()
            .map(|headers| {
                headers
                    .get_all(SET_COOKIE)
                    .iter()
                    .filter_map(|v| v.to_str().ok())
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// A successful (2xx) response.
#[derive(Debug)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: String,
}

/// HTTP transport for talking to the reading-list service.
///
/// Wraps a `reqwest::Client` configured to never follow redirects. Service
/// paths (`/u`, `/read/{id}`, ...) are resolved against `base_url`, which is
/// configurable so the pipeline can run against a local fake server.
///
/// Cloning is cheap: the underlying client is reference counted.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: Url,
    timeout_secs: u64,
}

impl HttpTransport {
    /// Builds a transport from configuration.
    pub fn new(config: &Config) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .user_agent(config.user_agent.as_str())
            .pool_idle_timeout(Duration::from_secs(30))
            .build()?;
        let base_url = Url::parse(&config.base_url)?;

        Ok(Self {
            client,
            base_url,
            timeout_secs: config.timeout_secs,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolves a service path against the base URL.
    pub fn endpoint(&self, path: &str) -> Result<Url, TransportError> {
        Ok(self.base_url.join(path)?)
    }

    /// Sends a GET request, attaching the session cookie when given.
    pub async fn get(
        &self,
        url: &Url,
        session: Option<&Session>,
    ) -> Result<HttpResponse, TransportError> {
        let mut request = self.client.get(url.as_str());
        if let Some(session) = session {
            request = request.header(COOKIE, session.cookie_header());
        }
        self.send(request).await
    }

    /// Sends a POST request with a URL-encoded form body.
    pub async fn post_form(
        &self,
        url: &Url,
        fields: &[(&str, &str)],
    ) -> Result<HttpResponse, TransportError> {
        let body = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(fields)
            .finish();
        let request = self
            .client
            .post(url.as_str())
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(body);
        self.send(request).await
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<HttpResponse, TransportError> {
        let response =
            tokio::time::timeout(Duration::from_secs(self.timeout_secs), request.send())
                .await
                .map_err(|_| TransportError::Timeout(self.timeout_secs))?
                .map_err(TransportError::Network)?;

        let status = response.status();
        if !status.is_success() {
            tracing::debug!(
                url = %response.url(),
                status = status.as_u16(),
                "Non-success response"
            );
            return Err(TransportError::Status {
                status: status.as_u16(),
                headers: response.headers().clone(),
            });
        }

        let headers = response.headers().clone();
        let body = read_limited_text(response, MAX_RESPONSE_SIZE).await?;

        Ok(HttpResponse {
            status: status.as_u16(),
            headers,
            body,
        })
    }
}

async fn read_limited_text(
    response: reqwest::Response,
    limit: usize,
) -> Result<String, TransportError> {
    // Fast path: check Content-Length header
    if let Some(len) = response.content_length() {
        if len as usize > limit {
            return Err(TransportError::TooLarge(limit));
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(TransportError::Network)?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(TransportError::TooLarge(limit));
        }
        bytes.extend_from_slice(&chunk);
    }

    String::from_utf8(bytes).map_err(|_| TransportError::InvalidUtf8)
}
