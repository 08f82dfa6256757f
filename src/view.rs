//! Render surface seam.
//!
//! The crate never touches a widget tree or the DOM directly; each session
//! renders through a [`MessageView`], the interface of one assistant message
//! bubble. Implementations are expected to use interior mutability — every
//! method takes `&self` so a view can be shared with the UI layer that owns
//! the actual render targets.

/// Render target for one assistant message: a response bubble plus an
/// optional thinking panel.
///
/// A fresh view is created per submission, so a superseded session keeps
/// rendering its own terminal state into its own bubble and can never touch
/// the bubble of the session that replaced it.
pub trait MessageView: Send + Sync {
    /// Render the full accumulated response text. Called with the complete
    /// accumulator on every fragment, replacing previous content, so the
    /// rendered state is always a consistent prefix of the stream.
    fn show_response(&self, text: &str);

    /// Reveal the thinking panel and render the live preview (the last few
    /// lines of the trace while streaming is active).
    fn show_thinking_preview(&self, preview: &str);

    /// Switch the thinking panel from live preview to the full trace,
    /// collapsed by default. Called once, at session end, and only if any
    /// thinking text was accumulated.
    fn show_thinking_full(&self, thinking: &str);

    /// Mark the bubble as errored (failure, server error, or interruption).
    fn mark_errored(&self);

    /// Toggle the live streaming visual state.
    fn set_live(&self, live: bool);
}
