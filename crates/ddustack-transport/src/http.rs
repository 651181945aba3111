//! HTTP transport implementation using `reqwest`.

use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use url::Url;

use crate::{ApiRequest, ApiResponse, ApiTransport, Method, TransportError};

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

/// A `reqwest`-based [`ApiTransport`] rooted at a base URL.
///
/// The client keeps a cookie jar, so the `refresh_token` cookie set by a
/// login or OAuth response is replayed on later `/auth/refresh/` calls
/// without the session layer ever reading it.
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpTransport {
    /// Builds a transport for `base_url` (e.g. `https://portal.ddu.edu.et/api`)
    /// with a per-request timeout.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, TransportError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| TransportError::InvalidUrl(format!("{base_url}: {e}")))?;

        let client = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Build(e.to_string()))?;

        tracing::debug!(base_url = %base_url, ?timeout, "HTTP transport ready");
        Ok(Self { client, base_url })
    }

    /// Returns the base URL every request path is appended to.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Appends `path` to the base URL, keeping the base's own path prefix.
    ///
    /// `Url::join` would drop the `/api` prefix for absolute paths, so the
    /// two are concatenated instead.
    fn endpoint(&self, request: &ApiRequest) -> Result<Url, TransportError> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let path = request.path.trim_start_matches('/');
        let mut url = Url::parse(&format!("{base}/{path}"))
            .map_err(|e| TransportError::InvalidUrl(format!("{}: {e}", request.path)))?;

        if !request.query.is_empty() {
            url.query_pairs_mut().extend_pairs(request.query.iter());
        }
        Ok(url)
    }
}

impl ApiTransport for HttpTransport {
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        let url = self.endpoint(&request)?;
        let mut builder = self.client.request(request.method.into(), url);

        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(token) = &request.bearer {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = request.body {
            builder = builder.header(CONTENT_TYPE, body.content_type).body(body.bytes);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?.to_vec();

        tracing::trace!(
            method = %request.method,
            path = %request.path,
            status,
            "API response"
        );
        Ok(ApiResponse { status, body })
    }
}
