//! HTTP client abstraction for testability

use std::time::Duration;
use thiserror::Error;
use tracing::{debug, trace};

/// Per-attempt timeout used when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

/// Transport-level failure of a single HTTP attempt.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransportError {
    #[error("Failed to create HTTP client: {0}")]
    Client(String),

    #[error("Request to {url} timed out")]
    Timeout { url: String },

    #[error("Request to {url} failed: {reason}")]
    Request { url: String, reason: String },

    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("Failed to read response from {url}: {reason}")]
    Body { url: String, reason: String },
}

/// Trait for blocking HTTP GET operations.
///
/// This abstraction allows the fetch workers to run against a stub client
/// in tests.
pub trait HttpClient: Send + Sync {
    /// Performs one HTTP GET attempt.
    ///
    /// # Arguments
    ///
    /// * `url` - The URL to request
    /// * `headers` - Slice of (header_name, header_value) tuples
    ///
    /// # Returns
    ///
    /// The response body, or an error for transport faults and any status
    /// other than 200.
    fn get(&self, url: &str, headers: &[(&str, &str)]) -> Result<Vec<u8>, TransportError>;
}

impl<C: HttpClient + ?Sized> HttpClient for &C {
    fn get(&self, url: &str, headers: &[(&str, &str)]) -> Result<Vec<u8>, TransportError> {
        (**self).get(url, headers)
    }
}

impl<C: HttpClient + ?Sized> HttpClient for std::sync::Arc<C> {
    fn get(&self, url: &str, headers: &[(&str, &str)]) -> Result<Vec<u8>, TransportError> {
        (**self).get(url, headers)
    }
}

/// Real HTTP client implementation using reqwest.
#[derive(Clone)]
pub struct ReqwestClient {
    client: reqwest::blocking::Client,
}

impl ReqwestClient {
    /// Creates a client with the default 2 second per-attempt timeout.
    pub fn new() -> Result<Self, TransportError> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    /// Creates a client with a custom per-attempt timeout.
    pub fn with_timeout(timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(30))
            .build()
            .map_err(|e| TransportError::Client(e.to_string()))?;

        Ok(Self { client })
    }
}

impl HttpClient for ReqwestClient {
    fn get(&self, url: &str, headers: &[(&str, &str)]) -> Result<Vec<u8>, TransportError> {
        trace!(url = url, "HTTP GET request starting");

        let mut request = self.client.get(url);
        for (name, value) in headers {
            request = request.header(*name, *value);
        }

        let response = request.send().map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout {
                    url: url.to_string(),
                }
            } else {
                TransportError::Request {
                    url: url.to_string(),
                    reason: e.to_string(),
                }
            }
        })?;

        // Only a plain 200 counts; redirects are followed by reqwest itself
        let status = response.status();
        if status != reqwest::StatusCode::OK {
            debug!(url = url, status = status.as_u16(), "HTTP error status");
            return Err(TransportError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response
            .bytes()
            .map(|b| b.to_vec())
            .map_err(|e| TransportError::Body {
                url: url.to_string(),
                reason: e.to_string(),
            })
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Mock HTTP client returning the same response for every URL
    #[derive(Clone)]
    pub struct MockHttpClient {
        pub response: Result<Vec<u8>, TransportError>,
    }

    impl HttpClient for MockHttpClient {
        fn get(&self, _url: &str, _headers: &[(&str, &str)]) -> Result<Vec<u8>, TransportError> {
            self.response.clone()
        }
    }

    /// Mock client that fails the first `failures` requests of each URL
    pub struct FlakyHttpClient {
        pub body: Vec<u8>,
        pub failures: u32,
        pub calls: Mutex<HashMap<String, u32>>,
    }

    impl FlakyHttpClient {
        pub fn new(body: Vec<u8>, failures: u32) -> Self {
            Self {
                body,
                failures,
                calls: Mutex::new(HashMap::new()),
            }
        }

        pub fn calls_for(&self, url: &str) -> u32 {
            self.calls.lock().unwrap().get(url).copied().unwrap_or(0)
        }
    }

    impl HttpClient for FlakyHttpClient {
        fn get(&self, url: &str, _headers: &[(&str, &str)]) -> Result<Vec<u8>, TransportError> {
            let mut calls = self.calls.lock().unwrap();
            let count = calls.entry(url.to_string()).or_insert(0);
            *count += 1;
            if *count <= self.failures {
                Err(TransportError::Status {
                    url: url.to_string(),
                    status: 503,
                })
            } else {
                Ok(self.body.clone())
            }
        }
    }

    #[test]
    fn test_mock_client_success() {
        let mock = MockHttpClient {
            response: Ok(vec![1, 2, 3, 4]),
        };

        let result = mock.get("http://example.com", &[]);
        assert_eq!(result.unwrap(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_mock_client_error() {
        let mock = MockHttpClient {
            response: Err(TransportError::Timeout {
                url: "http://example.com".to_string(),
            }),
        };

        assert!(mock.get("http://example.com", &[]).is_err());
    }

    #[test]
    fn test_flaky_client_counts_per_url() {
        let client = FlakyHttpClient::new(vec![9], 1);
        assert!(client.get("a", &[]).is_err());
        assert_eq!(client.get("a", &[]).unwrap(), vec![9]);
        assert!(client.get("b", &[]).is_err());
        assert_eq!(client.calls_for("a"), 2);
        assert_eq!(client.calls_for("b"), 1);
    }

    #[test]
    fn test_reference_forwarding() {
        let mock = MockHttpClient {
            response: Ok(vec![7]),
        };
        let by_ref: &dyn HttpClient = &mock;
        assert_eq!(by_ref.get("x", &[]).unwrap(), vec![7]);

        let shared = std::sync::Arc::new(mock);
        assert_eq!(shared.get("x", &[]).unwrap(), vec![7]);
    }

    /// Serves one request with a gzip-encoded `body` and returns the
    /// request head the client sent.
    fn serve_gzip_once(body: &[u8]) -> (String, std::thread::JoinHandle<String>) {
        use flate2::write::GzEncoder;
        use std::io::{Read, Write};
        use std::net::TcpListener;

        let mut encoder = GzEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(body).unwrap();
        let gzipped = encoder.finish().unwrap();

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/tile", listener.local_addr().unwrap());
        let server = std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut head = Vec::new();
            let mut byte = [0u8; 1];
            while !head.ends_with(b"\r\n\r\n") {
                stream.read_exact(&mut byte).unwrap();
                head.push(byte[0]);
            }
            write!(
                stream,
                "HTTP/1.1 200 OK\r\nContent-Encoding: gzip\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                gzipped.len()
            )
            .unwrap();
            stream.write_all(&gzipped).unwrap();
            String::from_utf8_lossy(&head).to_lowercase()
        });
        (url, server)
    }

    #[test]
    fn test_gzip_body_is_decoded() {
        let body = b"\x89PNG not really, but plain bytes".to_vec();
        let (url, server) = serve_gzip_once(&body);

        let client = ReqwestClient::new().unwrap();
        let fetched = client.get(&url, crate::provider::DEFAULT_HEADERS).unwrap();
        assert_eq!(fetched, body);

        let head = server.join().unwrap();
        assert!(head.contains("accept-encoding: gzip"));
    }

    #[test]
    fn test_status_error_message() {
        let err = TransportError::Status {
            url: "http://t".to_string(),
            status: 404,
        };
        assert_eq!(err.to_string(), "HTTP 404 from http://t");
    }
}
