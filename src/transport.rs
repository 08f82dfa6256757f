//! The request layer seam and its error types.

use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, TryStreamExt};
use thiserror::Error;

use crate::http::{add_extra_headers, build_chat_form, build_http_client};
use crate::model::ChatPrompt;
use crate::options::RendererOptions;

/// Errors raised by the transport and surfaced as terminal session states.
#[derive(Error, Debug)]
pub enum StreamError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("communication with the server failed: {0}")]
    Transport(String),

    #[error("configuration error: {0}")]
    Config(String),
}

/// The response body as a stream of byte chunks.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, StreamError>> + Send>>;

/// Request layer for chat submissions.
///
/// The renderer only ever asks for "the byte stream answering this prompt",
/// so anything that can produce one — an HTTP client, or a scripted stream
/// in tests — can stand behind this trait.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Submit the prompt and return the response body stream.
    ///
    /// A non-success status is an error here, not a stream: transport
    /// failures terminate the session before any frame is rendered.
    async fn open_stream(&self, prompt: &ChatPrompt) -> Result<ByteStream, StreamError>;
}

/// HTTP transport posting multipart chat submissions to the SSE endpoint.
pub struct HttpChatTransport {
    client: reqwest::Client,
    options: RendererOptions,
}

impl HttpChatTransport {
    /// Build the transport, constructing the underlying HTTP client from
    /// the options.
    pub fn new(options: RendererOptions) -> Result<Self, StreamError> {
        let client = build_http_client(&options)?;
        Ok(Self { client, options })
    }
}

#[async_trait]
impl ChatTransport for HttpChatTransport {
    async fn open_stream(&self, prompt: &ChatPrompt) -> Result<ByteStream, StreamError> {
        let form = build_chat_form(prompt)?;

        let mut request = self.client.post(&self.options.endpoint);
        request = add_extra_headers(request, &self.options.extra_headers);

        let response = request.multipart(form).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(StreamError::Transport(format!(
                "server returned HTTP {status}"
            )));
        }

        Ok(Box::pin(response.bytes_stream().map_err(StreamError::from)))
    }
}
