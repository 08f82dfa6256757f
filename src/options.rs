//! Renderer configuration.

use std::collections::HashMap;
use std::time::Duration;

/// Default chat stream endpoint, matching the development server.
pub const DEFAULT_ENDPOINT: &str = "http://localhost:8000/chat/stream";

/// Number of trailing thinking-trace lines shown in the live preview.
pub const DEFAULT_PREVIEW_LINES: usize = 3;

/// Configuration for the renderer and its HTTP transport.
///
/// # Example
/// ```
/// use std::time::Duration;
/// use chatstream::options::RendererOptions;
///
/// let options = RendererOptions::default()
///     .with_endpoint("http://localhost:9000/chat/stream".to_string())
///     .with_timeout(Duration::from_secs(120))
///     .with_preview_lines(5);
/// ```
#[derive(Debug, Clone)]
pub struct RendererOptions {
    /// Full URL of the SSE chat endpoint.
    pub endpoint: String,

    /// Request timeout. None means no client-side timeout, which is the
    /// sensible default for long-lived streaming responses.
    pub timeout: Option<Duration>,

    /// Optional proxy URL.
    pub proxy: Option<String>,

    /// Extra headers added to every request.
    pub extra_headers: Option<HashMap<String, String>>,

    /// Trailing lines of the thinking trace shown while streaming.
    pub preview_lines: usize,
}

impl Default for RendererOptions {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout: None,
            proxy: None,
            extra_headers: None,
            preview_lines: DEFAULT_PREVIEW_LINES,
        }
    }
}

impl RendererOptions {
    /// Set the chat stream endpoint URL.
    pub fn with_endpoint(mut self, endpoint: String) -> Self {
        self.endpoint = endpoint;
        self
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the proxy URL.
    pub fn with_proxy(mut self, proxy: String) -> Self {
        self.proxy = Some(proxy);
        self
    }

    /// Add a single extra header.
    pub fn with_header(mut self, key: String, value: String) -> Self {
        self.extra_headers
            .get_or_insert_with(HashMap::new)
            .insert(key, value);
        self
    }

    /// Set the live thinking-preview line count.
    pub fn with_preview_lines(mut self, lines: usize) -> Self {
        self.preview_lines = lines;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = RendererOptions::default();
        assert_eq!(options.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(options.preview_lines, DEFAULT_PREVIEW_LINES);
        assert!(options.timeout.is_none());
        assert!(options.proxy.is_none());
        assert!(options.extra_headers.is_none());
    }

    #[test]
    fn test_builder_accumulates_headers() {
        let options = RendererOptions::default()
            .with_header("x-request-id".to_string(), "abc".to_string())
            .with_header("x-trace".to_string(), "1".to_string());
        let headers = options.extra_headers.expect("headers");
        assert_eq!(headers.len(), 2);
        assert_eq!(headers.get("x-request-id").map(String::as_str), Some("abc"));
    }
}
