//! Terminal chat client for an SSE chat endpoint.

use std::io::{self, Write as _};
use std::sync::Mutex;
use std::time::Duration;

use clap::Parser;
use tokio::io::AsyncBufReadExt;
use tracing_subscriber::EnvFilter;

use chatstream::options::{DEFAULT_ENDPOINT, DEFAULT_PREVIEW_LINES};
use chatstream::{
    ChatPrompt, HttpChatTransport, MessageView, RendererOptions, StreamingChatRenderer,
};

#[derive(Parser, Debug)]
#[command(name = "chatstream", about = "Terminal client for a streaming chat endpoint")]
struct Args {
    /// Chat stream endpoint URL
    #[arg(long, default_value = DEFAULT_ENDPOINT)]
    endpoint: String,

    /// Request timeout in seconds (no timeout when omitted)
    #[arg(long)]
    timeout: Option<u64>,

    /// Thinking-trace lines shown while streaming
    #[arg(long, default_value_t = DEFAULT_PREVIEW_LINES)]
    preview_lines: usize,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

/// Renders one assistant reply onto stdout, printing only the delta of the
/// accumulated response on each update.
#[derive(Default)]
struct TerminalView {
    printed: Mutex<usize>,
}

impl MessageView for TerminalView {
    fn show_response(&self, text: &str) {
        let Ok(mut printed) = self.printed.lock() else {
            return;
        };
        if *printed <= text.len() && text.is_char_boundary(*printed) {
            print!("{}", &text[*printed..]);
        } else {
            // The accumulator was replaced (error path): restart the line.
            print!("\n{text}");
        }
        *printed = text.len();
        let _ = io::stdout().flush();
    }

    fn show_thinking_preview(&self, _preview: &str) {
        // The terminal has no live panel; the trace is printed on finish.
    }

    fn show_thinking_full(&self, thinking: &str) {
        eprintln!("\n--- thinking ---");
        eprint!("{thinking}");
        eprintln!("----------------");
    }

    fn mark_errored(&self) {}

    fn set_live(&self, live: bool) {
        if !live {
            println!();
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let default_filter = if args.debug { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(io::stderr)
        .init();

    let mut options = RendererOptions::default()
        .with_endpoint(args.endpoint)
        .with_preview_lines(args.preview_lines);
    if let Some(secs) = args.timeout {
        options = options.with_timeout(Duration::from_secs(secs));
    }

    let endpoint = options.endpoint.clone();
    let preview_lines = options.preview_lines;
    let transport = HttpChatTransport::new(options)?;
    let mut renderer = StreamingChatRenderer::new(transport).with_preview_lines(preview_lines);

    println!("Chatting with {endpoint}");
    println!("/exit or /quit to leave; blank lines are ignored");

    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("you> ");
        io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = line.trim().to_string();
        if input.is_empty() {
            continue;
        }
        if input == "/exit" || input == "/quit" {
            break;
        }

        print!("ai> ");
        io::stdout().flush()?;
        if renderer.submit(ChatPrompt::text(input), TerminalView::default()) {
            renderer.join_active().await;
        }
    }

    println!("Bye.");
    Ok(())
}
