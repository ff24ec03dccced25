//! HTTP availability check.
//!
//! Sends one request, reports the status and elapsed time, and scrapes the
//! page `<title>` from the start of the body.

use crate::error::{Error, Result};
use crate::serde_helpers::millis;
use regex::Regex;
use reqwest::{redirect, Client, Method};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

/// Default request timeout.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Bytes of body searched for a title.
pub const TITLE_SCAN_LIMIT: usize = 8192;

/// Longest title kept before truncation.
pub const TITLE_MAX_CHARS: usize = 100;

/// Title reported when none could be read.
pub const UNKNOWN_TITLE: &str = "unknown";

const TITLE_PATTERN: &str = r"(?i)<title[^>]*>([^<]*)</title>";

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

fn default_timeout() -> Duration {
    DEFAULT_HTTP_TIMEOUT
}

fn default_method() -> String {
    "GET".to_string()
}

fn default_true() -> bool {
    true
}

fn default_headers() -> BTreeMap<String, String> {
    BTreeMap::from([("User-Agent".to_string(), DEFAULT_USER_AGENT.to_string())])
}

/// HTTP check settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HttpConfig {
    /// Whole-request timeout
    #[serde(default = "default_timeout", rename = "timeout_ms", with = "millis")]
    pub timeout: Duration,
    /// Request method (default: GET)
    #[serde(default = "default_method")]
    pub method: String,
    /// Follow redirects (default: true)
    #[serde(default = "default_true")]
    pub follow_redirects: bool,
    /// Accept invalid TLS certificates
    #[serde(default)]
    pub skip_tls_verify: bool,
    /// Request headers; a browser-like User-Agent by default
    #[serde(default = "default_headers")]
    pub headers: BTreeMap<String, String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_HTTP_TIMEOUT,
            method: default_method(),
            follow_redirects: true,
            skip_tls_verify: false,
            headers: default_headers(),
        }
    }
}

impl HttpConfig {
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into();
        self
    }

    /// Report redirects instead of following them.
    #[must_use]
    pub fn without_redirects(mut self) -> Self {
        self.follow_redirects = false;
        self
    }

    #[must_use]
    pub fn with_skip_tls_verify(mut self) -> Self {
        self.skip_tls_verify = true;
        self
    }

    #[must_use]
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }
}

/// Outcome of one HTTP check.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct HttpCheckResult {
    pub url: String,
    /// Status in 200..400
    pub available: bool,
    pub status: Option<u16>,
    #[serde(rename = "elapsed_ms", with = "millis")]
    pub elapsed: Duration,
    pub title: String,
    pub error: Option<String>,
}

impl HttpCheckResult {
    fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            available: false,
            status: None,
            elapsed: Duration::ZERO,
            title: UNKNOWN_TITLE.to_string(),
            error: None,
        }
    }
}

/// HTTP checker holding a configured client.
///
/// # Example
///
/// ```ignore
/// let check = HttpCheck::new(HttpConfig::default().without_redirects())?;
/// let result = check.check("https://example.com").await;
/// println!("{:?} {}", result.status, result.title);
/// ```
#[derive(Debug, Clone)]
pub struct HttpCheck {
    config: HttpConfig,
    method: Method,
    client: Client,
    title_pattern: Regex,
}

impl HttpCheck {
    /// Build the client for `config`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for an invalid method, or [`Error::Http`]
    /// when the client cannot be built.
    pub fn new(config: HttpConfig) -> Result<Self> {
        let method = Method::from_bytes(config.method.to_ascii_uppercase().as_bytes())
            .map_err(|e| Error::config(format!("invalid HTTP method {}: {e}", config.method)))?;

        let policy = if config.follow_redirects {
            redirect::Policy::default()
        } else {
            redirect::Policy::none()
        };
        let client = Client::builder()
            .timeout(config.timeout)
            .redirect(policy)
            .danger_accept_invalid_certs(config.skip_tls_verify)
            .build()?;

        let title_pattern = Regex::new(TITLE_PATTERN).map_err(|e| Error::config(e.to_string()))?;

        Ok(Self {
            config,
            method,
            client,
            title_pattern,
        })
    }

    /// The configuration in use.
    #[must_use]
    pub fn config(&self) -> &HttpConfig {
        &self.config
    }

    /// Request `url` once.
    ///
    /// Never fails outright; a request failure is carried in
    /// [`HttpCheckResult::error`].
    pub async fn check(&self, url: &str) -> HttpCheckResult {
        let mut result = HttpCheckResult::new(url);

        let mut request = self.client.request(self.method.clone(), url);
        for (key, value) in &self.config.headers {
            request = request.header(key.as_str(), value.as_str());
        }

        let start = Instant::now();
        let response = request.send().await;
        result.elapsed = start.elapsed();

        let response = match response {
            Ok(response) => response,
            Err(e) => {
                tracing::debug!(%url, error = %e, "HTTP request failed");
                result.error = Some(format!("request failed: {e}"));
                return result;
            }
        };

        let status = response.status().as_u16();
        result.status = Some(status);
        result.available = (200..400).contains(&status);
        tracing::debug!(%url, status, elapsed_ms = result.elapsed.as_millis(), "HTTP response");

        if result.available {
            if let Some(title) = self.read_title(response).await {
                result.title = title;
            }
        }
        result
    }

    async fn read_title(&self, mut response: reqwest::Response) -> Option<String> {
        let mut body = Vec::with_capacity(TITLE_SCAN_LIMIT);
        while body.len() < TITLE_SCAN_LIMIT {
            match response.chunk().await {
                Ok(Some(chunk)) => body.extend_from_slice(&chunk),
                Ok(None) => break,
                Err(e) => {
                    tracing::debug!(error = %e, "reading body for title failed");
                    return None;
                }
            }
        }
        body.truncate(TITLE_SCAN_LIMIT);
        extract_title(&self.title_pattern, &String::from_utf8_lossy(&body))
    }
}

/// First `<title>` text with whitespace collapsed, capped at
/// [`TITLE_MAX_CHARS`] characters plus an ellipsis.
fn extract_title(pattern: &Regex, html: &str) -> Option<String> {
    let raw = pattern.captures(html)?.get(1)?.as_str();
    let title = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if title.is_empty() {
        return None;
    }
    if title.chars().count() > TITLE_MAX_CHARS {
        let cut: String = title.chars().take(TITLE_MAX_CHARS).collect();
        return Some(format!("{cut}..."));
    }
    Some(title)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve `response` verbatim to every connection, recording requests.
    async fn serve(response: &'static str) -> (String, Arc<Mutex<Vec<String>>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));

        let seen = Arc::clone(&requests);
        tokio::spawn(async move {
            loop {
                let Ok((mut stream, _)) = listener.accept().await else {
                    return;
                };
                let mut buf = vec![0u8; 4096];
                let mut len = 0;
                while !buf[..len].windows(4).any(|w| w == b"\r\n\r\n") {
                    match stream.read(&mut buf[len..]).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => len += n,
                    }
                }
                seen.lock()
                    .unwrap()
                    .push(String::from_utf8_lossy(&buf[..len]).to_string());
                let _ = stream.write_all(response.as_bytes()).await;
                let _ = stream.shutdown().await;
            }
        });

        (format!("http://{addr}/"), requests)
    }

    fn pattern() -> Regex {
        Regex::new(TITLE_PATTERN).unwrap()
    }

    #[test]
    fn test_extract_title_collapses_whitespace() {
        let html = "<html><head><TITLE lang=\"en\">\n  Example\t  Domain \n</TITLE></head>";
        assert_eq!(extract_title(&pattern(), html).as_deref(), Some("Example Domain"));
    }

    #[test]
    fn test_extract_title_missing_or_empty() {
        assert_eq!(extract_title(&pattern(), "<html><body>hi</body></html>"), None);
        assert_eq!(extract_title(&pattern(), "<title>   </title>"), None);
    }

    #[test]
    fn test_extract_title_truncates_long_titles() {
        let html = format!("<title>{}</title>", "é".repeat(150));
        let title = extract_title(&pattern(), &html).unwrap();
        assert_eq!(title, format!("{}...", "é".repeat(100)));
    }

    #[test]
    fn test_invalid_method_is_config_error() {
        let err = HttpCheck::new(HttpConfig::default().with_method("NOT A METHOD")).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_config_defaults_from_partial_json() {
        let config: HttpConfig = serde_json::from_str(r#"{"timeout_ms": 5000}"#).unwrap();
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.method, "GET");
        assert!(config.follow_redirects);
        assert!(config.headers.contains_key("User-Agent"));
    }

    #[tokio::test]
    async fn test_check_reads_status_and_title() {
        let (url, requests) = serve(
            "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Length: 44\r\nConnection: close\r\n\r\n<html><title>Status Board</title></html>\r\n\r\n",
        )
        .await;
        let check = HttpCheck::new(HttpConfig::default().with_header("X-Check-Run", "1")).unwrap();
        let result = check.check(&url).await;

        assert_eq!(result.status, Some(200));
        assert!(result.available);
        assert_eq!(result.title, "Status Board");
        assert!(result.error.is_none());

        let request = requests.lock().unwrap()[0].to_ascii_lowercase();
        assert!(request.starts_with("get / "));
        assert!(request.contains("user-agent: mozilla/5.0"));
        assert!(request.contains("x-check-run: 1"));
    }

    #[tokio::test]
    async fn test_check_error_status_is_unavailable() {
        let (url, _) = serve(
            "HTTP/1.1 503 Service Unavailable\r\nContent-Length: 28\r\nConnection: close\r\n\r\n<title>Maintenance</title>\r\n",
        )
        .await;
        let check = HttpCheck::new(HttpConfig::default()).unwrap();
        let result = check.check(&url).await;

        assert_eq!(result.status, Some(503));
        assert!(!result.available);
        assert_eq!(result.title, UNKNOWN_TITLE);
    }

    #[tokio::test]
    async fn test_redirect_reported_when_not_followed() {
        let (url, _) = serve(
            "HTTP/1.1 302 Found\r\nLocation: http://127.0.0.1:9/\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        )
        .await;
        let check = HttpCheck::new(HttpConfig::default().without_redirects()).unwrap();
        let result = check.check(&url).await;

        assert_eq!(result.status, Some(302));
        assert!(result.available);
    }

    #[tokio::test]
    async fn test_method_is_sent() {
        let (url, requests) =
            serve("HTTP/1.1 204 No Content\r\nConnection: close\r\n\r\n").await;
        let check = HttpCheck::new(HttpConfig::default().with_method("head")).unwrap();
        let result = check.check(&url).await;

        assert_eq!(result.status, Some(204));
        assert!(requests.lock().unwrap()[0].starts_with("HEAD / "));
    }

    #[tokio::test]
    async fn test_connection_refused_sets_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let check = HttpCheck::new(HttpConfig::default().with_timeout(Duration::from_secs(2))).unwrap();
        let result = check.check(&format!("http://{addr}/")).await;

        assert!(!result.available);
        assert_eq!(result.status, None);
        assert!(result.error.is_some());
    }
}
