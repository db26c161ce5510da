//! Static acquisition: one HTTP GET with a browser-like `User-Agent`.

use std::collections::BTreeMap;
use std::time::Duration;

use crate::AcquireError;

/// `User-Agent` sent by both the static client and rendered sessions.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Request timeout for static fetches.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP settings shared by every acquisition.
#[derive(Debug, Clone)]
pub struct AcquireConfig {
    /// `User-Agent` header value.
    pub user_agent: String,
    /// Total request timeout for static fetches.
    pub timeout: Duration,
    /// Additional HTTP headers to include in static requests.
    pub headers: BTreeMap<String, String>,
}

impl Default for AcquireConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            timeout: DEFAULT_TIMEOUT,
            headers: BTreeMap::new(),
        }
    }
}

impl AcquireConfig {
    /// Overrides the `User-Agent`.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: &str) -> Self {
        user_agent.clone_into(&mut self.user_agent);
        self
    }

    /// Overrides the request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Adds an HTTP header to include in requests.
    #[must_use]
    pub fn with_header(mut self, key: &str, value: &str) -> Self {
        self.headers.insert(key.to_owned(), value.to_owned());
        self
    }

    /// Builds a [`reqwest::Client`] with the configured headers and timeout.
    fn build_client(&self) -> Result<reqwest::Client, AcquireError> {
        let mut header_map = reqwest::header::HeaderMap::new();
        for (key, value) in &self.headers {
            let name = reqwest::header::HeaderName::from_bytes(key.as_bytes())
                .map_err(|e| AcquireError::Config(format!("invalid header name '{key}': {e}")))?;
            let val = reqwest::header::HeaderValue::from_str(value).map_err(|e| {
                AcquireError::Config(format!("invalid header value '{value}': {e}"))
            })?;
            header_map.insert(name, val);
        }
        reqwest::Client::builder()
            .user_agent(self.user_agent.as_str())
            .default_headers(header_map)
            .timeout(self.timeout)
            .build()
            .map_err(AcquireError::Connection)
    }
}

/// Fetches `url` and returns the response body.
///
/// # Errors
///
/// Returns [`AcquireError::Connection`] on DNS, connect, or timeout
/// failures and on any non-2xx status.
pub async fn fetch_static(config: &AcquireConfig, url: &str) -> Result<String, AcquireError> {
    let client = config.build_client()?;

    log::info!("Fetching {url}");
    let response = client.get(url).send().await?.error_for_status()?;
    let body = response.text().await?;
    log::debug!("Fetched {} bytes from {url}", body.len());

    Ok(body)
}

#[cfg(test)]
pub(crate) mod tests {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::mpsc;

    use super::*;

    /// Serves `status_line` + `body` to every connection and forwards each
    /// raw request to the returned receiver.
    pub async fn serve(
        status_line: &'static str,
        body: &'static str,
    ) -> (String, mpsc::UnboundedReceiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let mut buf = vec![0_u8; 8192];
                let read = socket.read(&mut buf).await.unwrap_or(0);
                let _ = tx.send(String::from_utf8_lossy(&buf[..read]).into_owned());
                let response = format!(
                    "{status_line}\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                socket.write_all(response.as_bytes()).await.unwrap();
                socket.shutdown().await.ok();
            }
        });

        (format!("http://{addr}/"), rx)
    }

    #[tokio::test]
    async fn returns_body_and_sends_browser_user_agent() {
        let (url, mut requests) = serve("HTTP/1.1 200 OK", "<p>hello</p>").await;

        let body = fetch_static(&AcquireConfig::default(), &url).await.unwrap();

        assert_eq!(body, "<p>hello</p>");
        let request = requests.recv().await.unwrap().to_ascii_lowercase();
        assert!(request.contains("user-agent: mozilla/5.0 (windows nt 10.0; win64; x64)"));
    }

    #[tokio::test]
    async fn non_success_status_is_a_connection_error() {
        let (url, _requests) = serve("HTTP/1.1 404 Not Found", "gone").await;

        let err = fetch_static(&AcquireConfig::default(), &url)
            .await
            .unwrap_err();

        assert!(matches!(err, AcquireError::Connection(_)));
        assert!(err.to_string().starts_with("Connection error"));
    }

    #[tokio::test]
    async fn refused_connection_is_a_connection_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = fetch_static(&AcquireConfig::default(), &format!("http://{addr}/"))
            .await
            .unwrap_err();

        assert!(matches!(err, AcquireError::Connection(_)));
    }

    #[tokio::test]
    async fn invalid_header_is_a_config_error() {
        let config = AcquireConfig::default().with_header("bad header", "x");
        let err = fetch_static(&config, "http://127.0.0.1:9/").await.unwrap_err();
        assert!(matches!(err, AcquireError::Config(_)));
    }
}
