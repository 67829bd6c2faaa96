//! Minimal HTTP/1.1 server for the leaderboard API.
//!
//! Routes:
//! - `GET /api/leaderboard`: stored list as JSON (empty array on failure)
//! - `POST /api/leaderboard`: submit `{name, score[, tokens]}`, returns the updated list
//! - `OPTIONS /api/leaderboard`: CORS preflight
//! - `GET /api/metrics`: transaction and active player counters
//!
//! One request per connection; the connection is closed after the response.
//! A request must arrive in full within the request timeout and no line of
//! its head may exceed `MAX_LINE_LENGTH` bytes.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use log::{debug, error, info, warn};
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

use hydra_shared::LeaderboardEntry;

use crate::leaderboard::LeaderboardService;
use crate::metrics::{MetricsSummary, SharedMetrics};

/// Largest accepted request body
const MAX_BODY_SIZE: usize = 16 * 1024;

/// Largest accepted header block
const MAX_HEADER_LINES: usize = 64;

/// Longest accepted request or header line, in bytes
const MAX_LINE_LENGTH: usize = 8 * 1024;

/// Time a client gets to send its whole request (in seconds)
const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Pause after a failed accept (in milliseconds)
const ACCEPT_BACKOFF_MS: u64 = 100;

/// Parsed request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: String,
    pub path: String,
    pub body: Vec<u8>,
}

/// Response about to be written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub content_type: &'static str,
    pub body: String,
    /// Extra headers beyond the defaults
    pub headers: Vec<(&'static str, &'static str)>,
}

impl HttpResponse {
    pub fn json(status: u16, body: String) -> Self {
        Self {
            status,
            content_type: "application/json",
            body,
            headers: Vec::new(),
        }
    }

    pub fn text(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            content_type: "text/plain",
            body: body.into(),
            headers: Vec::new(),
        }
    }

    fn reason(&self) -> &'static str {
        match self.status {
            200 => "OK",
            204 => "No Content",
            400 => "Bad Request",
            404 => "Not Found",
            405 => "Method Not Allowed",
            408 => "Request Timeout",
            413 => "Payload Too Large",
            431 => "Request Header Fields Too Large",
            _ => "Internal Server Error",
        }
    }

    /// Serialize status line, headers and body
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut head = format!(
            "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nAccess-Control-Allow-Origin: *\r\nConnection: close\r\n",
            self.status,
            self.reason(),
            self.content_type,
            self.body.len(),
        );
        for (name, value) in &self.headers {
            head.push_str(&format!("{}: {}\r\n", name, value));
        }
        head.push_str("\r\n");

        let mut bytes = head.into_bytes();
        bytes.extend_from_slice(self.body.as_bytes());
        bytes
    }
}

/// Leaderboard HTTP server
pub struct HttpServer {
    listener: TcpListener,
    leaderboard: Arc<LeaderboardService>,
    metrics: SharedMetrics,
    request_timeout: Duration,
}

impl HttpServer {
    /// Bind to the given port on all interfaces (0 picks a free port)
    pub async fn bind(
        port: u16,
        leaderboard: Arc<LeaderboardService>,
        metrics: SharedMetrics,
    ) -> Result<Self, std::io::Error> {
        let addr = format!("0.0.0.0:{}", port);
        let listener = TcpListener::bind(&addr).await?;
        Ok(Self {
            listener,
            leaderboard,
            metrics,
            request_timeout: Duration::from_secs(REQUEST_TIMEOUT_SECS),
        })
    }

    /// Override how long a client may take to send its request
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn local_addr(&self) -> Result<SocketAddr, std::io::Error> {
        self.listener.local_addr()
    }

    /// Accept connections until the task is dropped
    pub async fn run(self) {
        if let Ok(addr) = self.local_addr() {
            info!("Leaderboard API listening on {}", addr);
        }

        loop {
            match self.listener.accept().await {
                Ok((stream, addr)) => {
                    let leaderboard = self.leaderboard.clone();
                    let metrics = self.metrics.clone();
                    let timeout = self.request_timeout;
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, &leaderboard, &metrics, timeout).await {
                            debug!("Connection from {} failed: {}", addr, e);
                        }
                    });
                }
                Err(e) => {
                    error!("Error accepting connection: {}", e);
                    tokio::time::sleep(Duration::from_millis(ACCEPT_BACKOFF_MS)).await;
                }
            }
        }
    }
}

async fn handle_connection(
    mut stream: TcpStream,
    leaderboard: &LeaderboardService,
    metrics: &SharedMetrics,
    request_timeout: Duration,
) -> Result<(), std::io::Error> {
    let response = match tokio::time::timeout(request_timeout, read_request(&mut stream)).await {
        Ok(read) => match read? {
            Ok(request) => route(&request, leaderboard, metrics).await,
            Err(response) => response,
        },
        Err(_) => {
            debug!("Client did not send a request within {:?}", request_timeout);
            HttpResponse::text(408, "Request timeout")
        }
    };

    stream.write_all(&response.to_bytes()).await?;
    stream.shutdown().await
}

/// Read one request. The inner error is a ready-made rejection for malformed input.
async fn read_request<S: AsyncRead + Unpin>(stream: &mut S) -> Result<Result<HttpRequest, HttpResponse>, std::io::Error> {
    let mut reader = BufReader::new(stream);

    let mut request_line = String::new();
    if !read_bounded_line(&mut reader, &mut request_line).await? {
        return Ok(Err(HttpResponse::text(400, "Request line too long")));
    }
    let mut parts = request_line.split_whitespace();
    let (Some(method), Some(target)) = (parts.next(), parts.next()) else {
        return Ok(Err(HttpResponse::text(400, "Malformed request line")));
    };
    let method = method.to_ascii_uppercase();
    let path = target.split('?').next().unwrap_or(target).to_string();

    let mut content_length = 0usize;
    let mut header_lines = 0usize;
    loop {
        let mut line = String::new();
        if !read_bounded_line(&mut reader, &mut line).await? {
            return Ok(Err(HttpResponse::text(431, "Header line too long")));
        }
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        header_lines += 1;
        if header_lines > MAX_HEADER_LINES {
            return Ok(Err(HttpResponse::text(400, "Too many headers")));
        }
        if let Some((name, value)) = line.split_once(':') {
            if name.trim().eq_ignore_ascii_case("content-length") {
                match value.trim().parse() {
                    Ok(length) => content_length = length,
                    Err(_) => return Ok(Err(HttpResponse::text(400, "Invalid Content-Length"))),
                }
            }
        }
    }

    if content_length > MAX_BODY_SIZE {
        return Ok(Err(HttpResponse::text(413, "Body too large")));
    }
    let mut body = vec![0u8; content_length];
    reader.read_exact(&mut body).await?;

    Ok(Ok(HttpRequest { method, path, body }))
}

/// Read one line of at most `MAX_LINE_LENGTH` bytes. Returns false when the
/// line is longer; an empty `line` means end of input.
async fn read_bounded_line<R: AsyncBufRead + Unpin>(reader: &mut R, line: &mut String) -> Result<bool, std::io::Error> {
    reader.take(MAX_LINE_LENGTH as u64 + 1).read_line(line).await?;
    Ok(line.len() <= MAX_LINE_LENGTH)
}

/// Dispatch a request to its handler
pub async fn route(request: &HttpRequest, leaderboard: &LeaderboardService, metrics: &SharedMetrics) -> HttpResponse {
    match (request.method.as_str(), request.path.as_str()) {
        ("GET", "/api/leaderboard") => {
            let entries = leaderboard.fetch().await;
            HttpResponse::json(200, serde_json::to_string(&entries).unwrap_or_else(|_| "[]".to_string()))
        }
        ("POST", "/api/leaderboard") => submit(&request.body, leaderboard, metrics).await,
        ("OPTIONS", "/api/leaderboard") => {
            let mut response = HttpResponse::text(204, "");
            response.headers.push(("Access-Control-Allow-Methods", "GET, POST, OPTIONS"));
            response.headers.push(("Access-Control-Allow-Headers", "Content-Type"));
            response
        }
        ("GET", "/api/metrics") => {
            let summary = match metrics.lock() {
                Ok(store) => store.summary(Instant::now()),
                Err(_) => MetricsSummary { transactions: 0, active_players: 0 },
            };
            HttpResponse::json(200, serde_json::to_string(&summary).unwrap_or_else(|_| "{}".to_string()))
        }
        (_, "/api/leaderboard") | (_, "/api/metrics") => HttpResponse::text(405, "Method not allowed"),
        _ => HttpResponse::text(404, "Not found"),
    }
}

async fn submit(body: &[u8], leaderboard: &LeaderboardService, metrics: &SharedMetrics) -> HttpResponse {
    let Some(entry) = parse_submission(body) else {
        return HttpResponse::text(400, "Invalid data");
    };

    if let Ok(mut store) = metrics.lock() {
        store.touch_player(&entry.name, Instant::now());
    }

    match leaderboard.submit(entry).await {
        Ok(entries) => {
            HttpResponse::json(200, serde_json::to_string(&entries).unwrap_or_else(|_| "[]".to_string()))
        }
        Err(e) => {
            warn!("Leaderboard submit failed: {}", e);
            HttpResponse::text(500, e.to_string())
        }
    }
}

/// Validate a submission body: non-empty `name`, numeric `score`, optional numeric `tokens`
pub fn parse_submission(body: &[u8]) -> Option<LeaderboardEntry> {
    let value: Value = serde_json::from_slice(body).ok()?;

    let name = value.get("name")?.as_str()?.trim();
    if name.is_empty() {
        return None;
    }
    let score = as_integer(value.get("score")?)?;
    let tokens = match value.get("tokens") {
        None | Some(Value::Null) => None,
        Some(tokens) => Some(as_integer(tokens)?),
    };

    Some(LeaderboardEntry { name: name.to_string(), score, tokens })
}

fn as_integer(value: &Value) -> Option<i64> {
    value.as_i64().or_else(|| value.as_f64().map(|f| f as i64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::leaderboard::{LeaderboardStore, MemoryStore};
    use crate::metrics::MetricsStore;

    fn fixtures() -> (Arc<LeaderboardService>, SharedMetrics) {
        (
            Arc::new(LeaderboardService::new(LeaderboardStore::Memory(MemoryStore::new()))),
            MetricsStore::shared(Duration::from_secs(300)),
        )
    }

    fn request(method: &str, path: &str, body: &str) -> HttpRequest {
        HttpRequest { method: method.into(), path: path.into(), body: body.as_bytes().to_vec() }
    }

    #[test]
    fn test_parse_submission() {
        assert_eq!(
            parse_submission(br#"{"name":"Ann","score":50}"#),
            Some(LeaderboardEntry { name: "Ann".into(), score: 50, tokens: None })
        );
        assert_eq!(
            parse_submission(br#"{"name":"Ann","score":50,"tokens":12}"#).and_then(|e| e.tokens),
            Some(12)
        );
        assert_eq!(parse_submission(br#"{"name":"","score":50}"#), None);
        assert_eq!(parse_submission(br#"{"name":"Ann","score":"50"}"#), None);
        assert_eq!(parse_submission(br#"{"score":50}"#), None);
        assert_eq!(parse_submission(b"not json"), None);
    }

    #[tokio::test]
    async fn test_post_then_get() {
        let (leaderboard, metrics) = fixtures();

        let response = route(&request("POST", "/api/leaderboard", r#"{"name":"Ann","score":50}"#), &leaderboard, &metrics).await;
        assert_eq!(response.status, 200);
        assert_eq!(response.body, r#"[{"name":"Ann","score":50}]"#);

        let response = route(&request("GET", "/api/leaderboard", ""), &leaderboard, &metrics).await;
        assert_eq!(response.status, 200);
        assert_eq!(response.body, r#"[{"name":"Ann","score":50}]"#);

        let response = route(&request("GET", "/api/metrics", ""), &leaderboard, &metrics).await;
        assert_eq!(response.body, r#"{"transactions":0,"activePlayers":1}"#);
    }

    #[tokio::test]
    async fn test_rejections() {
        let (leaderboard, metrics) = fixtures();

        let bad = route(&request("POST", "/api/leaderboard", r#"{"name":"Ann"}"#), &leaderboard, &metrics).await;
        assert_eq!(bad.status, 400);

        let wrong_method = route(&request("DELETE", "/api/leaderboard", ""), &leaderboard, &metrics).await;
        assert_eq!(wrong_method.status, 405);

        let missing = route(&request("GET", "/nope", ""), &leaderboard, &metrics).await;
        assert_eq!(missing.status, 404);

        let preflight = route(&request("OPTIONS", "/api/leaderboard", ""), &leaderboard, &metrics).await;
        assert_eq!(preflight.status, 204);
        assert!(preflight.headers.contains(&("Access-Control-Allow-Methods", "GET, POST, OPTIONS")));
    }

    #[tokio::test]
    async fn test_serves_over_tcp() {
        let (leaderboard, metrics) = fixtures();
        let server = HttpServer::bind(0, leaderboard, metrics).await.unwrap();
        let port = server.local_addr().unwrap().port();
        tokio::spawn(server.run());

        let body = r#"{"name":"Ann","score":80}"#;
        let mut stream = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
        let raw = format!(
            "POST /api/leaderboard HTTP/1.1\r\nHost: localhost\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{}",
            body.len(),
            body
        );
        stream.write_all(raw.as_bytes()).await.unwrap();

        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(response.contains("Access-Control-Allow-Origin: *"));
        assert!(response.ends_with(r#"[{"name":"Ann","score":80}]"#));
    }

    #[tokio::test]
    async fn test_oversized_lines_rejected() {
        let header = format!("GET /api/leaderboard HTTP/1.1\r\nX-Filler: {}\r\n\r\n", "a".repeat(MAX_LINE_LENGTH));
        let response = read_request(&mut header.as_bytes()).await.unwrap().unwrap_err();
        assert_eq!(response.status, 431);

        let request_line = format!("GET /{} HTTP/1.1\r\n\r\n", "a".repeat(MAX_LINE_LENGTH));
        let response = read_request(&mut request_line.as_bytes()).await.unwrap().unwrap_err();
        assert_eq!(response.status, 400);

        let fine = "GET /api/leaderboard HTTP/1.1\r\nHost: localhost\r\n\r\n";
        let request = read_request(&mut fine.as_bytes()).await.unwrap().unwrap();
        assert_eq!(request.path, "/api/leaderboard");
    }

    #[tokio::test]
    async fn test_stalled_client_times_out() {
        let (leaderboard, metrics) = fixtures();
        let server = HttpServer::bind(0, leaderboard, metrics)
            .await
            .unwrap()
            .with_request_timeout(Duration::from_millis(100));
        let port = server.local_addr().unwrap().port();
        tokio::spawn(server.run());

        // Promises a 50 byte body but sends only part of it
        let mut stream = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
        stream
            .write_all(b"POST /api/leaderboard HTTP/1.1\r\nContent-Length: 50\r\n\r\n{\"name\"")
            .await
            .unwrap();

        let mut response = String::new();
        tokio::time::timeout(Duration::from_secs(5), stream.read_to_string(&mut response))
            .await
            .expect("server must give up on the request")
            .unwrap();
        assert!(response.starts_with("HTTP/1.1 408 Request Timeout\r\n"));
    }
}
