//! API surface handed to calls by [`super::HttpBackend`]

use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Client, Method, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;
use url::Url;

use callguard_domain::{ApiError, ApiResult};

use crate::errors::transport_error;

/// Request helpers bound to one attempt's session headers.
///
/// Paths are resolved against the configured base URL, so
/// `"core/v4/users"` and `"/core/v4/users"` address the same endpoint.
#[derive(Debug, Clone)]
pub struct HttpApi {
    client: Client,
    base_url: Url,
    headers: HeaderMap,
}

impl HttpApi {
    pub(crate) fn new(client: Client, base_url: Url, headers: HeaderMap) -> Self {
        Self { client, base_url, headers }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Headers attached to every request of this attempt.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// # Errors
    /// Returns the mapped [`ApiError`] for transport, HTTP or decode failures.
    pub async fn get<T>(&self, path: &str) -> ApiResult<T>
    where
        T: DeserializeOwned,
    {
        self.send::<(), T>(Method::GET, path, None).await
    }

    /// # Errors
    /// Returns the mapped [`ApiError`] for transport, HTTP or decode failures.
    pub async fn post<B, T>(&self, path: &str, body: &B) -> ApiResult<T>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        self.send(Method::POST, path, Some(body)).await
    }

    /// # Errors
    /// Returns the mapped [`ApiError`] for transport, HTTP or decode failures.
    pub async fn put<B, T>(&self, path: &str, body: &B) -> ApiResult<T>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        self.send(Method::PUT, path, Some(body)).await
    }

    /// # Errors
    /// Returns the mapped [`ApiError`] for transport, HTTP or decode failures.
    pub async fn delete<T>(&self, path: &str) -> ApiResult<T>
    where
        T: DeserializeOwned,
    {
        self.send::<(), T>(Method::DELETE, path, None).await
    }

    /// Issue a request with an optional JSON body and decode the JSON reply.
    ///
    /// # Errors
    /// - `Connection`/`Timeout`/`Certificate` when no response arrived
    /// - `Http` for non-2xx statuses, with the decoded error body
    /// - `Parse` when a 2xx body is not the expected JSON
    pub async fn send<B, T>(&self, method: Method, path: &str, body: Option<&B>) -> ApiResult<T>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let url = self
            .base_url
            .join(path.trim_start_matches('/'))
            .map_err(|err| ApiError::parse(format!("invalid request path '{path}': {err}")))?;

        let mut request = self.client.request(method.clone(), url.clone()).headers(self.headers.clone());
        if let Some(body) = body {
            request = request.json(body);
        }

        debug!(%method, path = url.path(), "sending API request");
        let response = request.send().await.map_err(|err| transport_error(&err, &url))?;
        decode_response(response, &url).await
    }
}

async fn decode_response<T>(response: Response, url: &Url) -> ApiResult<T>
where
    T: DeserializeOwned,
{
    let status = response.status();
    let retry_after = response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);
    let body = response.text().await.map_err(|err| transport_error(&err, url))?;

    if !status.is_success() {
        let error = ApiError::from_http_response(
            status.as_u16(),
            status.canonical_reason().unwrap_or("Unknown status"),
            &body,
            retry_after.as_deref(),
        );
        debug!(status = status.as_u16(), app_code = ?error.app_code(), path = url.path(), "API request failed");
        return Err(error);
    }

    serde_json::from_str(&body).map_err(|err| ApiError::parse(err.to_string()))
}
