//! Logsift HTTP Client
//!
//! A simple, type-safe HTTP client for upstream CI log APIs.
//!
//! This crate provides the transport used by the fetcher to retrieve bounded
//! log slices (tails and offset chunks) from a log source, keeping all
//! request/response handling and status classification in one place.
//!
//! # Example
//!
//! ```no_run
//! use logsift_client::LogSourceClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), logsift_client::ClientError> {
//!     let client = LogSourceClient::new("http://ci.example.com");
//!
//!     // Fetch the last 5000 lines of one job's log
//!     let tail = client.fetch_tail("512", "9017", 5000).await?;
//!
//!     println!("got {} lines (eof: {})", tail.lines.len(), tail.eof);
//!     Ok(())
//! }
//! ```

pub mod error;
mod logs;

// Re-export commonly used types
pub use error::{ClientError, Result};
pub use logsift_core::dto::log::LogChunk;

use reqwest::Client;
use serde::de::DeserializeOwned;

/// HTTP client for an upstream log source API
///
/// Provides the two retrieval shapes the fetch pipeline needs:
/// - Tail fetch: the last N lines of a job's log
/// - Chunk fetch: N lines starting at a given offset
#[derive(Debug, Clone)]
pub struct LogSourceClient {
    /// Base URL of the log API (e.g., "http://ci.example.com")
    base_url: String,
    /// HTTP client instance
    client: Client,
}

impl LogSourceClient {
    /// Create a new log source client
    ///
    /// # Arguments
    /// * `base_url` - The base URL of the log API (e.g., "http://ci.example.com")
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }

    /// Create a new log source client with a custom HTTP client
    ///
    /// This allows you to configure timeouts, proxies, TLS settings, etc.
    ///
    /// # Example
    /// ```
    /// use logsift_client::LogSourceClient;
    /// use reqwest::Client;
    /// use std::time::Duration;
    ///
    /// let http_client = Client::builder()
    ///     .timeout(Duration::from_secs(30))
    ///     .build()
    ///     .unwrap();
    ///
    /// let client = LogSourceClient::with_client("http://ci.example.com", http_client);
    /// ```
    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    /// Get the base URL of the log API
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Host portion of the base URL, used as the upstream circuit key
    ///
    /// Falls back to the full base URL if it does not parse as one.
    pub fn host(&self) -> String {
        reqwest::Url::parse(&self.base_url)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.to_string()))
            .unwrap_or_else(|| self.base_url.clone())
    }

    // =============================================================================
    // Response Handlers
    // =============================================================================

    /// Handle an API response and deserialize JSON
    ///
    /// This method checks the status code and returns an appropriate error if
    /// the request failed, or deserializes the response body if successful.
    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::api_error(status.as_u16(), error_text));
        }

        response
            .json()
            .await
            .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = LogSourceClient::new("http://ci.example.com");
        assert_eq!(client.base_url(), "http://ci.example.com");
    }

    #[test]
    fn test_client_trims_trailing_slash() {
        let client = LogSourceClient::new("http://ci.example.com/");
        assert_eq!(client.base_url(), "http://ci.example.com");
    }

    #[test]
    fn test_client_with_custom_client() {
        let http_client = Client::new();
        let client = LogSourceClient::with_client("http://ci.example.com", http_client);
        assert_eq!(client.base_url(), "http://ci.example.com");
    }

    #[test]
    fn test_host_extraction() {
        let client = LogSourceClient::new("http://ci.example.com:8080/api");
        assert_eq!(client.host(), "ci.example.com");
    }

    #[test]
    fn test_host_fallback_on_unparseable_url() {
        let client = LogSourceClient::new("not-a-url");
        assert_eq!(client.host(), "not-a-url");
    }
}
