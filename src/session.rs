//! Per-submission streaming state.
//!
//! A [`StreamSession`] lives from one user submission to its terminal state
//! (completed, errored, or cancelled). It owns the response and thinking
//! accumulators and applies each decoded payload to its view synchronously,
//! so the rendered state is always a consistent prefix of the stream.

use tracing::debug;

use crate::model::StreamPayload;
use crate::transport::StreamError;
use crate::view::MessageView;

/// Default text rendered for error payloads without content and for
/// transport failures.
pub const DEFAULT_ERROR_MESSAGE: &str = "An error occurred.";

/// Text rendered into a cancelled session's own bubble.
pub const INTERRUPTED_MESSAGE: &str = "Stream interrupted.";

/// How a session's reader loop terminated.
#[derive(Debug)]
pub enum StreamOutcome {
    /// The byte stream was exhausted normally.
    Completed,
    /// The session's cancellation token fired (stop button or supersession).
    Cancelled,
    /// The request or the stream itself failed.
    Failed(StreamError),
}

/// Streaming-render state for one submission.
pub struct StreamSession<V: MessageView> {
    view: V,
    response: String,
    thinking: String,
    terminal: bool,
    preview_lines: usize,
}

impl<V: MessageView> StreamSession<V> {
    pub fn new(view: V, preview_lines: usize) -> Self {
        Self {
            view,
            response: String::new(),
            thinking: String::new(),
            terminal: false,
            preview_lines,
        }
    }

    /// Enter the live streaming visual state.
    pub fn begin(&mut self) {
        self.view.set_live(true);
    }

    /// Apply one payload. Payload text is strictly additive for `thinking`
    /// and `response`; an `error` payload replaces the response accumulator
    /// and makes the session terminal. No-op once terminal.
    pub fn apply(&mut self, payload: StreamPayload) {
        if self.terminal {
            return;
        }

        match payload {
            StreamPayload::Thinking { content } => {
                self.thinking.push_str(&content);
                if !self.thinking.is_empty() {
                    self.view
                        .show_thinking_preview(&last_lines(&self.thinking, self.preview_lines));
                }
            }
            StreamPayload::Response { content } => {
                self.response.push_str(&content);
                self.view.show_response(&self.response);
            }
            StreamPayload::Error { content } => {
                self.response = content
                    .filter(|c| !c.is_empty())
                    .unwrap_or_else(|| DEFAULT_ERROR_MESSAGE.to_string());
                self.view.mark_errored();
                self.view.show_response(&self.response);
                self.terminal = true;
            }
            // The decoder drops done markers before dispatch.
            StreamPayload::Done => {}
        }
    }

    /// Finalize the session: render the terminal state for the outcome,
    /// leave the live visual state, and switch the thinking panel to its
    /// full content if any was accumulated.
    pub fn finish(&mut self, outcome: StreamOutcome) {
        debug!(?outcome, "stream session finished");

        match outcome {
            StreamOutcome::Completed => {}
            StreamOutcome::Cancelled => {
                if !self.terminal {
                    self.response = INTERRUPTED_MESSAGE.to_string();
                    self.view.mark_errored();
                    self.view.show_response(&self.response);
                }
            }
            StreamOutcome::Failed(e) => {
                if !self.terminal {
                    self.response = format!("{DEFAULT_ERROR_MESSAGE} ({e})");
                    self.view.mark_errored();
                    self.view.show_response(&self.response);
                }
            }
        }

        self.view.set_live(false);
        if !self.thinking.is_empty() {
            self.view.show_thinking_full(&self.thinking);
        }
        self.terminal = true;
    }

    /// Accumulated response text.
    pub fn response_text(&self) -> &str {
        &self.response
    }

    /// Accumulated thinking text.
    pub fn thinking_text(&self) -> &str {
        &self.thinking
    }

    pub fn is_terminal(&self) -> bool {
        self.terminal
    }
}

/// Last `count` lines of `text`, tolerating `\r\n` endings and ignoring the
/// empty segment a trailing newline would produce.
pub fn last_lines(text: &str, count: usize) -> String {
    let mut lines: Vec<&str> = text
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .collect();
    if lines.last() == Some(&"") {
        lines.pop();
    }
    let start = lines.len().saturating_sub(count);
    lines[start..].join("\n")
}
