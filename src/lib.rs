//! # chatstream - Streaming Chat Renderer
//!
//! A small, pragmatic library for driving a chat UI from a server-sent-event
//! (SSE) chat endpoint: it submits a prompt, consumes the chunked response
//! body, splits it into SSE frames, decodes each frame's JSON payload, and
//! renders thinking and response text incrementally into a pluggable view —
//! with at most one cancellable session in flight at a time.
//!
//! ## Features
//! - Async-first, tokio compatible
//! - Incremental SSE frame splitting tolerant of arbitrary chunk boundaries
//!   (including multi-byte characters split across chunks)
//! - Live thinking-trace preview while streaming, full trace on completion
//! - Cooperative cancellation: submitting supersedes and cancels the
//!   previous session without touching the new session's render target
//! - Malformed frames are dropped, not fatal
//!
//! ## Architecture
//!
//! Two seams keep the core testable and UI-agnostic:
//!
//! 1. **`ChatTransport`**: produces the response byte stream for a prompt
//!    (HTTP in production, scripted streams in tests)
//! 2. **`MessageView`**: one assistant bubble's render surface (DOM, TUI,
//!    plain terminal)
//!
//! The renderer owns the only mutable cursor — the active session — and all
//! rendering happens synchronously in stream order.
//!
//! ## Example
//! ```no_run
//! use chatstream::{
//!     ChatPrompt, HttpChatTransport, MessageView, RendererOptions, StreamingChatRenderer,
//! };
//!
//! struct PrintView;
//!
//! impl MessageView for PrintView {
//!     fn show_response(&self, text: &str) { println!("{text}"); }
//!     fn show_thinking_preview(&self, preview: &str) { eprintln!("thinking: {preview}"); }
//!     fn show_thinking_full(&self, _thinking: &str) {}
//!     fn mark_errored(&self) {}
//!     fn set_live(&self, _live: bool) {}
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let transport = HttpChatTransport::new(RendererOptions::default())?;
//!     let mut renderer = StreamingChatRenderer::new(transport);
//!
//!     renderer.submit(ChatPrompt::text("Hello!"), PrintView);
//!     renderer.join_active().await;
//!     Ok(())
//! }
//! ```

pub mod http;
pub mod model;
pub mod options;
pub mod renderer;
pub mod session;
pub mod sse;
pub mod transport;
pub mod view;

// Re-exports for convenience
pub use model::{ChatPrompt, ImageAttachment, StreamPayload};
pub use options::RendererOptions;
pub use renderer::StreamingChatRenderer;
pub use session::{StreamOutcome, StreamSession};
pub use transport::{ChatTransport, HttpChatTransport, StreamError};
pub use view::MessageView;
