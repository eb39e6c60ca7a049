use crate::error::FetchError;
use crate::records::LatestLogs;
use log::debug;
use reqwest::Client;
#[cfg(test)]
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
#[cfg(test)]
use std::sync::Mutex;
use std::time::Duration;

/// Source of a server's most recent log errors
pub trait LogSource {
    fn fetch_latest<'a>(
        &'a self,
        server: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<LatestLogs, FetchError>> + Send + 'a>>;
}

/// Fetches `GET http://<server>/<endpoint_path>` and parses the `loglast` array
///
/// The timeout bounds each request so a hung server cannot stall a pass.
pub struct HttpLogFetcher {
    client: Client,
    endpoint_path: String,
}

impl HttpLogFetcher {
    /// Create a fetcher for the given endpoint path and request timeout
    ///
    /// # Example
    /// ```
    /// use logerr::collectors::HttpLogFetcher;
    /// use std::time::Duration;
    ///
    /// let fetcher = HttpLogFetcher::new("loglast", Duration::from_secs(10)).unwrap();
    /// assert_eq!(fetcher.url_for("db1:7903"), "http://db1:7903/loglast");
    /// ```
    pub fn new(endpoint_path: &str, timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder().timeout(timeout).no_proxy().build()?;

        Ok(Self {
            client,
            endpoint_path: endpoint_path.trim_matches('/').to_string(),
        })
    }

    /// URL of the diagnostic endpoint on `server`
    ///
    /// Bare `host:port` addresses are treated as plain HTTP.
    pub fn url_for(&self, server: &str) -> String {
        let base = server.trim_end_matches('/');
        if base.starts_with("http://") || base.starts_with("https://") {
            format!("{}/{}", base, self.endpoint_path)
        } else {
            format!("http://{}/{}", base, self.endpoint_path)
        }
    }
}

impl LogSource for HttpLogFetcher {
    fn fetch_latest<'a>(
        &'a self,
        server: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<LatestLogs, FetchError>> + Send + 'a>> {
        Box::pin(async move {
            let url = self.url_for(server);
            debug!("Fetching {}", url);

            let response = self.client.get(&url).send().await?;
            if !response.status().is_success() {
                return Err(FetchError::BadStatus(response.status().as_u16()));
            }

            let body = response.text().await?;
            LatestLogs::from_json(&body)
        })
    }
}

/// In-memory `LogSource` used by unit tests
///
/// Each server is mapped to a canned response body or HTTP status. Bodies go
/// through the same parser as real responses. Unknown servers answer 404.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MockLogSource {
    responses: HashMap<String, Result<String, u16>>,
    calls: Mutex<Vec<String>>,
}

#[cfg(test)]
impl MockLogSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `server` with this response body
    pub fn with_body(mut self, server: &str, body: &str) -> Self {
        self.responses
            .insert(server.to_string(), Ok(body.to_string()));
        self
    }

    /// Answer `server` with a non-success HTTP status
    pub fn with_status(mut self, server: &str, status: u16) -> Self {
        self.responses.insert(server.to_string(), Err(status));
        self
    }

    /// Servers fetched so far, in call order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[cfg(test)]
impl LogSource for MockLogSource {
    fn fetch_latest<'a>(
        &'a self,
        server: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<LatestLogs, FetchError>> + Send + 'a>> {
        Box::pin(async move {
            if let Ok(mut calls) = self.calls.lock() {
                calls.push(server.to_string());
            }

            match self.responses.get(server) {
                Some(Ok(body)) => LatestLogs::from_json(body),
                Some(Err(status)) => Err(FetchError::BadStatus(*status)),
                None => Err(FetchError::BadStatus(404)),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;

    /// Serve a single canned HTTP response and report the request line
    async fn serve_once(status: &'static str, body: &'static str) -> (SocketAddr, oneshot::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = oneshot::channel();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            let request = String::from_utf8_lossy(&request);
            let request_line = request.lines().next().unwrap_or_default().to_string();
            let _ = tx.send(request_line);

            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
        });

        (addr, rx)
    }

    #[test]
    fn test_url_for() {
        let fetcher = HttpLogFetcher::new("/loglast/", Duration::from_secs(1)).unwrap();
        assert_eq!(fetcher.url_for("db1:7903"), "http://db1:7903/loglast");
        assert_eq!(fetcher.url_for("http://db1:7903/"), "http://db1:7903/loglast");
        assert_eq!(fetcher.url_for("https://db1"), "https://db1/loglast");
    }

    #[tokio::test]
    async fn test_fetch_latest_success() {
        let (addr, request) = serve_once(
            "200 OK",
            r#"[null, null, null, {"TS": "2023-01-01T00:00:00.123Z", "Level": "ERROR", "File": "hstore.go", "Line": 42, "Msg": "disk full"}]"#,
        )
        .await;
        let fetcher = HttpLogFetcher::new("loglast", Duration::from_secs(5)).unwrap();

        let logs = fetcher.fetch_latest(&addr.to_string()).await.unwrap();

        assert!(logs.recent_warning.is_none());
        let error = logs.recent_error.unwrap();
        assert_eq!(error.msg, "disk full");
        assert_eq!(error.line, 42);
        assert_eq!(request.await.unwrap(), "GET /loglast HTTP/1.1");
    }

    #[tokio::test]
    async fn test_fetch_latest_bad_status() {
        let (addr, _request) = serve_once("500 Internal Server Error", "oops").await;
        let fetcher = HttpLogFetcher::new("loglast", Duration::from_secs(5)).unwrap();

        match fetcher.fetch_latest(&addr.to_string()).await {
            Err(FetchError::BadStatus(500)) => {}
            other => panic!("Expected BadStatus(500), got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fetch_latest_non_json_body() {
        let (addr, _request) = serve_once("200 OK", "not json").await;
        let fetcher = HttpLogFetcher::new("loglast", Duration::from_secs(5)).unwrap();

        assert!(matches!(
            fetcher.fetch_latest(&addr.to_string()).await,
            Err(FetchError::InvalidJson(_))
        ));
    }

    #[tokio::test]
    async fn test_fetch_latest_connection_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let fetcher = HttpLogFetcher::new("loglast", Duration::from_secs(5)).unwrap();
        assert!(matches!(
            fetcher.fetch_latest(&addr.to_string()).await,
            Err(FetchError::HttpError(_))
        ));
    }

    #[tokio::test]
    async fn test_fetch_latest_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            // accept and never answer
            let (_socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(30)).await;
        });

        let fetcher = HttpLogFetcher::new("loglast", Duration::from_millis(200)).unwrap();
        match fetcher.fetch_latest(&addr.to_string()).await {
            Err(FetchError::HttpError(e)) => assert!(e.is_timeout()),
            other => panic!("Expected timeout, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_mock_log_source() {
        let source = MockLogSource::new()
            .with_body("db1", "[null, null, null, null]")
            .with_status("db2", 503);

        assert_eq!(source.fetch_latest("db1").await.unwrap(), LatestLogs::default());
        assert!(matches!(
            source.fetch_latest("db2").await,
            Err(FetchError::BadStatus(503))
        ));
        assert!(matches!(
            source.fetch_latest("db3").await,
            Err(FetchError::BadStatus(404))
        ));
        assert_eq!(source.calls(), vec!["db1", "db2", "db3"]);
    }
}
