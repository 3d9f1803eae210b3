//! Plain HTTP transport
//!
//! This module handles single HTTP GET attempts, including:
//! - Building the shared HTTP client
//! - Presenting the rotated User-Agent per request
//! - Error classification (timeout / connect / other)

use crate::fetcher::{RawPage, Transport, TransportError};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};
use reqwest::Client;
use std::time::Duration;

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `timeout` - Upper bound on a whole request
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Transport issuing plain GET requests through `reqwest`
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(timeout)?,
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, url: &str, user_agent: &str) -> Result<RawPage, TransportError> {
        let response = self
            .client
            .get(url)
            .header(USER_AGENT, user_agent)
            .header(ACCEPT, "text/html,application/xhtml+xml")
            .header(ACCEPT_LANGUAGE, "pl-PL,pl;q=0.9,en;q=0.8")
            .send()
            .await
            .map_err(classify_error)?;

        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        let body = response.text().await.map_err(classify_error)?;

        Ok(RawPage {
            status,
            final_url,
            body,
        })
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

fn classify_error(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout
    } else if e.is_connect() {
        TransportError::Connect(e.to_string())
    } else {
        TransportError::Other(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_build_http_client() {
        assert!(build_http_client(Duration::from_secs(15)).is_ok());
    }

    #[tokio::test]
    async fn test_sends_user_agent_and_returns_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/osobowe"))
            .and(header("user-agent", "TestAgent/1.0"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>ok</html>"))
            .mount(&server)
            .await;

        let transport = HttpTransport::new(Duration::from_secs(5)).unwrap();
        let page = transport
            .get(&format!("{}/osobowe", server.uri()), "TestAgent/1.0")
            .await
            .unwrap();

        assert_eq!(page.status, 200);
        assert_eq!(page.body, "<html>ok</html>");
    }

    #[tokio::test]
    async fn test_non_success_status_is_not_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let transport = HttpTransport::new(Duration::from_secs(5)).unwrap();
        let page = transport.get(&server.uri(), "ua").await.unwrap();
        assert_eq!(page.status, 503);
    }

    #[tokio::test]
    async fn test_connection_refused_is_classified() {
        let transport = HttpTransport::new(Duration::from_secs(2)).unwrap();
        let result = transport.get("http://127.0.0.1:1/", "ua").await;
        assert!(matches!(
            result,
            Err(TransportError::Connect(_)) | Err(TransportError::Other(_))
        ));
    }
}
