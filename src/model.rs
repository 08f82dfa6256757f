//! Data models for chat submissions and the server's streaming payloads.

use serde::{Deserialize, Serialize};

/// One decoded payload from the server's SSE stream.
///
/// The wire shape is `{"type": "...", "content": "..."}` where `type` is one
/// of `thinking`, `response`, `error`, or `done`. `done` carries no content
/// and only marks normal termination.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StreamPayload {
    /// A fragment of the model's reasoning trace, shown live in truncated
    /// form and in full after completion.
    Thinking {
        #[serde(default)]
        content: String,
    },

    /// A fragment of the final answer. Fragments are strictly additive.
    Response {
        #[serde(default)]
        content: String,
    },

    /// A server-signaled failure. Replaces any accumulated response text
    /// and terminates the session.
    Error {
        #[serde(default)]
        content: Option<String>,
    },

    /// Normal end-of-stream marker. Recognized by the decoder and dropped
    /// before dispatch.
    Done,
}

/// An image attached to a chat submission.
#[derive(Debug, Clone)]
pub struct ImageAttachment {
    /// Original file name, forwarded as the multipart part's file name.
    pub file_name: String,

    /// MIME type (e.g. `image/png`).
    pub mime: String,

    /// Raw image bytes.
    pub bytes: Vec<u8>,
}

/// One user-submitted message: free text plus zero or more image attachments.
#[derive(Debug, Clone, Default)]
pub struct ChatPrompt {
    /// The text typed by the user.
    pub user_input: String,

    /// Attachments in the order the user picked them.
    pub images: Vec<ImageAttachment>,
}

impl ChatPrompt {
    /// Create a text-only prompt.
    pub fn text(user_input: impl Into<String>) -> Self {
        Self {
            user_input: user_input.into(),
            images: Vec::new(),
        }
    }

    /// Attach an image.
    pub fn with_image(mut self, image: ImageAttachment) -> Self {
        self.images.push(image);
        self
    }

    /// True when there is nothing to send: no non-whitespace text and no
    /// attachments. Empty submissions never initiate a request.
    pub fn is_empty(&self) -> bool {
        self.user_input.trim().is_empty() && self.images.is_empty()
    }
}
