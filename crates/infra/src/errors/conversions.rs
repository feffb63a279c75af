//! Conversions from transport failures into call outcomes.

use std::error::Error as StdError;

use callguard_domain::ApiError;
use reqwest::Error as HttpError;
use url::Url;

use super::InfraError;

/* -------------------------------------------------------------------------- */
/* reqwest::Error → ApiError */
/* -------------------------------------------------------------------------- */

/// Map a reqwest failure for a request to `url` onto the outcome model.
///
/// TLS failures are checked first because reqwest reports them as connect
/// errors. A failed connect is reported as potentially blocked, carrying the
/// request path and query for the connection listener.
pub fn transport_error(err: &HttpError, url: &Url) -> ApiError {
    let cause = describe(err);

    if looks_like_certificate_failure(err) {
        return ApiError::Certificate { cause };
    }

    if err.is_timeout() {
        return ApiError::Timeout { was_connected: !is_connect(err) };
    }

    if is_connect(err) {
        return ApiError::potentially_blocked(
            Some(url.path().to_string()),
            url.query().map(str::to_string),
            cause,
        );
    }

    if err.is_decode() {
        return ApiError::parse(cause);
    }

    ApiError::connection(cause)
}

#[cfg(not(target_arch = "wasm32"))]
fn is_connect(err: &HttpError) -> bool {
    err.is_connect()
}

#[cfg(target_arch = "wasm32")]
fn is_connect(_err: &HttpError) -> bool {
    false
}

/// Error message including every source, outermost first.
fn describe(err: &HttpError) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(inner) = source {
        message.push_str(": ");
        message.push_str(&inner.to_string());
        source = inner.source();
    }
    message
}

fn looks_like_certificate_failure(err: &HttpError) -> bool {
    let mut source: Option<&(dyn StdError + 'static)> = Some(err);
    while let Some(inner) = source {
        let lower = inner.to_string().to_ascii_lowercase();
        if lower.contains("certificate") || lower.contains("unknownissuer") {
            return true;
        }
        source = inner.source();
    }
    false
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        InfraError::ClientBuild(describe(&value))
    }
}

impl From<url::ParseError> for InfraError {
    fn from(value: url::ParseError) -> Self {
        InfraError::InvalidBaseUrl { url: String::new(), reason: value.to_string() }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    async fn failing_request(client: &reqwest::Client, url: &Url) -> HttpError {
        match client.get(url.clone()).send().await {
            Ok(response) => panic!("expected transport failure, got {}", response.status()),
            Err(err) => err,
        }
    }

    #[tokio::test]
    async fn refused_connection_is_potentially_blocked() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let url = Url::parse(&format!("http://127.0.0.1:{port}/core/v4/users?Page=2")).unwrap();
        let err = failing_request(&reqwest::Client::new(), &url).await;

        match transport_error(&err, &url) {
            ApiError::Connection { potentially_blocked, path, query, .. } => {
                assert!(potentially_blocked);
                assert_eq!(path.as_deref(), Some("/core/v4/users"));
                assert_eq!(query.as_deref(), Some("Page=2"));
            }
            other => panic!("expected connection error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn slow_response_is_a_connected_timeout() {
        let server = MockServer::start().await;
        Mock::given(wiremock::matchers::any())
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .mount(&server)
            .await;

        let client =
            reqwest::Client::builder().timeout(Duration::from_millis(50)).build().unwrap();
        let url = Url::parse(&server.uri()).unwrap();
        let err = failing_request(&client, &url).await;

        assert_eq!(transport_error(&err, &url), ApiError::Timeout { was_connected: true });
    }

    #[test]
    fn url_parse_failures_become_invalid_base_url() {
        let err = InfraError::from(Url::parse("not a url").unwrap_err());

        assert!(matches!(err, InfraError::InvalidBaseUrl { .. }));
    }
}
