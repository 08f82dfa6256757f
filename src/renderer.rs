//! The streaming chat renderer: session lifecycle, cancellation, and the
//! reader loop.
//!
//! At most one session streams at a time. Submitting while a session is in
//! flight cancels the previous session's token before the new request is
//! made; the superseded session observes its token at the next suspension
//! point, exits its loop, and renders its own interrupted state into its own
//! view. The active-session slot is the only mutable cursor and is only
//! written from `submit`, `cancel_active`, and `join_active`.

use std::sync::Arc;

use futures::StreamExt;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::model::ChatPrompt;
use crate::options::DEFAULT_PREVIEW_LINES;
use crate::session::{StreamOutcome, StreamSession};
use crate::sse::{decode_frame, FrameSplitter};
use crate::transport::{ByteStream, ChatTransport};
use crate::view::MessageView;

/// Owns the transport and the single active streaming session.
pub struct StreamingChatRenderer<T: ChatTransport + 'static> {
    transport: Arc<T>,
    preview_lines: usize,
    active: Option<ActiveStream>,
}

/// Handle to the in-flight session's reader task.
struct ActiveStream {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl<T: ChatTransport + 'static> StreamingChatRenderer<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport: Arc::new(transport),
            preview_lines: DEFAULT_PREVIEW_LINES,
            active: None,
        }
    }

    /// Set the live thinking-preview line count.
    pub fn with_preview_lines(mut self, lines: usize) -> Self {
        self.preview_lines = lines;
        self
    }

    /// Submit a prompt, rendering the streamed reply into `view`.
    ///
    /// Returns `false` without any request for an empty submission.
    /// Otherwise cancels the previous session, if any, and starts a fresh
    /// one; each submission gets a fresh view, so the old session never
    /// touches the new session's render target.
    pub fn submit<V: MessageView + 'static>(&mut self, prompt: ChatPrompt, view: V) -> bool {
        if prompt.is_empty() {
            return false;
        }

        if let Some(previous) = self.active.take() {
            debug!("superseding active stream");
            previous.cancel.cancel();
        }

        let cancel = CancellationToken::new();
        let transport = Arc::clone(&self.transport);
        let session = StreamSession::new(view, self.preview_lines);
        let task = tokio::spawn(run_stream(transport, prompt, session, cancel.clone()));

        self.active = Some(ActiveStream { cancel, task });
        true
    }

    /// Cooperatively cancel the in-flight session (the stop button). The
    /// reader loop observes the token at its next suspension point.
    pub fn cancel_active(&self) {
        if let Some(active) = &self.active {
            active.cancel.cancel();
        }
    }

    /// Wait for the in-flight session to reach its terminal state.
    pub async fn join_active(&mut self) {
        if let Some(active) = self.active.take() {
            let _ = active.task.await;
        }
    }

    pub fn is_streaming(&self) -> bool {
        self.active
            .as_ref()
            .is_some_and(|active| !active.task.is_finished())
    }
}

impl<T: ChatTransport + 'static> Drop for StreamingChatRenderer<T> {
    fn drop(&mut self) {
        if let Some(active) = &self.active {
            active.cancel.cancel();
        }
    }
}

/// Drive one session from request submission to terminal state.
async fn run_stream<T, V>(
    transport: Arc<T>,
    prompt: ChatPrompt,
    mut session: StreamSession<V>,
    cancel: CancellationToken,
) where
    T: ChatTransport,
    V: MessageView,
{
    session.begin();

    // The request itself is a suspension point and must also observe the
    // token so a superseded session never waits out a slow server.
    let opened = tokio::select! {
        _ = cancel.cancelled() => {
            session.finish(StreamOutcome::Cancelled);
            return;
        }
        opened = transport.open_stream(&prompt) => opened,
    };

    let stream = match opened {
        Ok(stream) => stream,
        Err(e) => {
            session.finish(StreamOutcome::Failed(e));
            return;
        }
    };

    let outcome = drive_stream(stream, &mut session, &cancel).await;
    session.finish(outcome);
}

/// The reader loop: chunks in arrival order, frames in order within each
/// chunk, every payload applied to the session before the next chunk is
/// awaited. Distinguishes cancelled from exhausted termination.
async fn drive_stream<V: MessageView>(
    mut stream: ByteStream,
    session: &mut StreamSession<V>,
    cancel: &CancellationToken,
) -> StreamOutcome {
    let mut splitter = FrameSplitter::new();

    loop {
        let next = tokio::select! {
            _ = cancel.cancelled() => return StreamOutcome::Cancelled,
            next = stream.next() => next,
        };

        match next {
            Some(Ok(chunk)) => {
                for frame in splitter.push(&chunk) {
                    if let Some(payload) = decode_frame(&frame) {
                        session.apply(payload);
                    }
                }
            }
            Some(Err(e)) => return StreamOutcome::Failed(e),
            None => {
                if let Some(frame) = splitter.finish() {
                    if let Some(payload) = decode_frame(&frame) {
                        session.apply(payload);
                    }
                }
                return StreamOutcome::Completed;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{DEFAULT_ERROR_MESSAGE, INTERRUPTED_MESSAGE};
    use crate::transport::StreamError;
    use crate::view::recording::RecordingView;
    use async_trait::async_trait;
    use bytes::Bytes;
    use futures::stream;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// One scripted answer to an `open_stream` call.
    enum Script {
        /// A stream that never yields (until cancelled).
        Pending,
        /// Byte chunks followed by a clean end of stream.
        Chunks(Vec<Vec<u8>>),
        /// Byte chunks followed by a mid-read stream error.
        ChunksThenError(Vec<Vec<u8>>, String),
        /// The request itself fails.
        Fail(String),
    }

    #[derive(Default)]
    struct ScriptedTransport {
        scripts: Mutex<VecDeque<Script>>,
        calls: AtomicUsize,
    }

    impl ScriptedTransport {
        fn new(scripts: Vec<Script>) -> Self {
            Self {
                scripts: Mutex::new(scripts.into()),
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ChatTransport for ScriptedTransport {
        async fn open_stream(&self, _prompt: &ChatPrompt) -> Result<ByteStream, StreamError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let script = self
                .scripts
                .lock()
                .expect("scripts lock")
                .pop_front()
                .expect("unexpected open_stream call");
            match script {
                Script::Pending => Ok(Box::pin(stream::pending::<Result<Bytes, StreamError>>())),
                Script::Chunks(chunks) => Ok(Box::pin(stream::iter(
                    chunks.into_iter().map(|c| Ok::<_, StreamError>(Bytes::from(c))),
                ))),
                Script::ChunksThenError(chunks, message) => {
                    let ok = stream::iter(
                        chunks.into_iter().map(|c| Ok::<_, StreamError>(Bytes::from(c))),
                    );
                    let err =
                        stream::once(async move { Err(StreamError::Transport(message)) });
                    Ok(Box::pin(ok.chain(err)))
                }
                Script::Fail(message) => Err(StreamError::Transport(message)),
            }
        }
    }

    fn frame(json: &str) -> String {
        format!("data: {json}\n\n")
    }

    async fn wait_until(mut cond: impl FnMut() -> bool) {
        for _ in 0..400 {
            if cond() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("condition not reached in time");
    }

    /// A realistic stream: thinking, response fragments, a commented
    /// keep-alive frame, and the done marker.
    fn sample_stream_bytes() -> Vec<u8> {
        let mut text = String::new();
        text.push_str(&frame(r#"{"type":"thinking","content":"considering\n"}"#));
        text.push_str(&frame(r#"{"type":"thinking","content":"deciding\n"}"#));
        text.push_str(&frame(r#"{"type":"response","content":"こん"}"#));
        text.push_str(": keep-alive\n\n");
        text.push_str(&frame(r#"{"type":"response","content":"にちは、"}"#));
        text.push_str(&frame(r#"{"type":"response","content":"world"}"#));
        text.push_str(&frame(r#"{"type":"done"}"#));
        text.into_bytes()
    }

    #[tokio::test]
    async fn test_response_reassembled_regardless_of_chunk_boundaries() {
        // Tiny chunks guarantee frames and multi-byte characters are split
        // mid-way; the rendered result must not depend on the boundaries.
        let chunks: Vec<Vec<u8>> = sample_stream_bytes().chunks(3).map(<[u8]>::to_vec).collect();
        let transport = ScriptedTransport::new(vec![Script::Chunks(chunks)]);
        let mut renderer = StreamingChatRenderer::new(transport);

        let view = RecordingView::new();
        assert!(renderer.submit(ChatPrompt::text("hi"), view.clone()));
        renderer.join_active().await;

        assert_eq!(view.response(), "こんにちは、world");
        assert!(!view.errored());
        assert!(!view.live());
        // One render per response payload: done and the keep-alive frame
        // never reach dispatch.
        assert_eq!(view.response_history().len(), 3);
        assert_eq!(
            view.thinking_full().as_deref(),
            Some("considering\ndeciding\n")
        );
    }

    #[tokio::test]
    async fn test_final_frame_without_delimiter_is_processed() {
        let mut text = frame(r#"{"type":"response","content":"almost"}"#);
        // Stream ends without the trailing blank line.
        text.push_str(r#"data: {"type":"response","content":" done"}"#);
        let transport =
            ScriptedTransport::new(vec![Script::Chunks(vec![text.into_bytes()])]);
        let mut renderer = StreamingChatRenderer::new(transport);

        let view = RecordingView::new();
        renderer.submit(ChatPrompt::text("hi"), view.clone());
        renderer.join_active().await;

        assert_eq!(view.response(), "almost done");
    }

    #[tokio::test]
    async fn test_empty_submission_never_initiates_a_request() {
        let transport = Arc::new(ScriptedTransport::new(vec![]));
        let mut renderer = StreamingChatRenderer {
            transport: Arc::clone(&transport),
            preview_lines: 3,
            active: None,
        };

        assert!(!renderer.submit(ChatPrompt::text("   \n"), RecordingView::new()));
        assert!(!renderer.is_streaming());
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn test_superseding_cancels_previous_session() {
        let reply = frame(r#"{"type":"response","content":"fresh answer"}"#);
        let transport = ScriptedTransport::new(vec![
            Script::Pending,
            Script::Chunks(vec![reply.into_bytes()]),
        ]);
        let mut renderer = StreamingChatRenderer::new(transport);

        let view_a = RecordingView::new();
        assert!(renderer.submit(ChatPrompt::text("first"), view_a.clone()));
        // Let session A reach its read loop before superseding it.
        tokio::time::sleep(Duration::from_millis(10)).await;

        let view_b = RecordingView::new();
        assert!(renderer.submit(ChatPrompt::text("second"), view_b.clone()));
        renderer.join_active().await;

        // A shows its own interrupted state in its own bubble.
        wait_until(|| view_a.errored()).await;
        assert_eq!(view_a.response(), INTERRUPTED_MESSAGE);
        assert!(!view_a.live());

        // B is unaffected by A's termination.
        assert_eq!(view_b.response(), "fresh answer");
        assert!(!view_b.errored());
    }

    #[tokio::test]
    async fn test_cancel_active_renders_interrupted() {
        let transport = ScriptedTransport::new(vec![Script::Pending]);
        let mut renderer = StreamingChatRenderer::new(transport);

        let view = RecordingView::new();
        renderer.submit(ChatPrompt::text("hi"), view.clone());
        tokio::time::sleep(Duration::from_millis(10)).await;

        renderer.cancel_active();
        renderer.join_active().await;

        assert_eq!(view.response(), INTERRUPTED_MESSAGE);
        assert!(view.errored());
        assert!(!view.live());
    }

    #[tokio::test]
    async fn test_request_failure_renders_generic_error() {
        let transport = ScriptedTransport::new(vec![Script::Fail(
            "server returned HTTP 500".to_string(),
        )]);
        let mut renderer = StreamingChatRenderer::new(transport);

        let view = RecordingView::new();
        renderer.submit(ChatPrompt::text("hi"), view.clone());
        renderer.join_active().await;

        assert!(view.response().starts_with(DEFAULT_ERROR_MESSAGE));
        assert!(view.response().contains("HTTP 500"));
        assert!(view.errored());
        assert!(!view.live());
    }

    #[tokio::test]
    async fn test_mid_read_failure_renders_generic_error() {
        let partial = frame(r#"{"type":"response","content":"half"}"#);
        let transport = ScriptedTransport::new(vec![Script::ChunksThenError(
            vec![partial.into_bytes()],
            "connection reset".to_string(),
        )]);
        let mut renderer = StreamingChatRenderer::new(transport);

        let view = RecordingView::new();
        renderer.submit(ChatPrompt::text("hi"), view.clone());
        renderer.join_active().await;

        // The partial text was rendered while streaming, then replaced by
        // the failure message.
        assert_eq!(view.response_history().first().map(String::as_str), Some("half"));
        assert!(view.response().contains("connection reset"));
        assert!(view.errored());
    }

    #[tokio::test]
    async fn test_malformed_frame_does_not_abort_stream() {
        let mut text = frame(r#"{"type":"response","content":"before"}"#);
        text.push_str("data: {broken json\n\n");
        text.push_str(&frame(r#"{"type":"response","content":" after"}"#));
        let transport =
            ScriptedTransport::new(vec![Script::Chunks(vec![text.into_bytes()])]);
        let mut renderer = StreamingChatRenderer::new(transport);

        let view = RecordingView::new();
        renderer.submit(ChatPrompt::text("hi"), view.clone());
        renderer.join_active().await;

        assert_eq!(view.response(), "before after");
        assert!(!view.errored());
    }

    #[tokio::test]
    async fn test_server_error_payload_terminates_session() {
        let mut text = frame(r#"{"type":"response","content":"partial"}"#);
        text.push_str(&frame(r#"{"type":"error","content":"boom"}"#));
        // The stream keeps going; nothing after the error may render.
        text.push_str(&frame(r#"{"type":"response","content":"ignored"}"#));
        let transport =
            ScriptedTransport::new(vec![Script::Chunks(vec![text.into_bytes()])]);
        let mut renderer = StreamingChatRenderer::new(transport);

        let view = RecordingView::new();
        renderer.submit(ChatPrompt::text("hi"), view.clone());
        renderer.join_active().await;

        assert_eq!(view.response(), "boom");
        assert!(view.errored());
    }

    #[tokio::test]
    async fn test_drop_cancels_active_session() {
        let transport = ScriptedTransport::new(vec![Script::Pending]);
        let mut renderer = StreamingChatRenderer::new(transport);

        let view = RecordingView::new();
        renderer.submit(ChatPrompt::text("hi"), view.clone());
        tokio::time::sleep(Duration::from_millis(10)).await;
        drop(renderer);

        wait_until(|| view.errored()).await;
        assert_eq!(view.response(), INTERRUPTED_MESSAGE);
    }

    #[tokio::test]
    async fn test_failed_stream_leaves_renderer_usable() {
        let reply = frame(r#"{"type":"response","content":"second try"}"#);
        let transport = ScriptedTransport::new(vec![
            Script::Fail("server returned HTTP 502".to_string()),
            Script::Chunks(vec![reply.into_bytes()]),
        ]);
        let mut renderer = StreamingChatRenderer::new(transport);

        let view_a = RecordingView::new();
        renderer.submit(ChatPrompt::text("first"), view_a.clone());
        renderer.join_active().await;
        assert!(view_a.errored());

        let view_b = RecordingView::new();
        assert!(renderer.submit(ChatPrompt::text("again"), view_b.clone()));
        renderer.join_active().await;
        assert_eq!(view_b.response(), "second try");
        assert!(!view_b.errored());
    }
}
