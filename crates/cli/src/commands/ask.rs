//! `toolchat ask`: run turns in the terminal.
//!
//! Agent steps stream to stderr, answers go to stdout.

use std::io::Write;
use std::path::Path;

use tokio::io::{AsyncBufReadExt, BufReader};
use toolchat_agent::{AgentStreamEvent, EventSink};
use toolchat_config::AppConfig;
use toolchat_session::{ChatSession, SessionEvent};

pub async fn run(
    config_path: Option<&Path>,
    prompt: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config =
        AppConfig::load(config_path).map_err(|e| format!("Failed to load config: {e}"))?;

    if !config.has_api_key() {
        eprintln!();
        eprintln!("  ERROR: No API key configured!");
        eprintln!();
        eprintln!("  Set {} in the environment or in .env,", toolchat_config::ENV_API_KEY);
        eprintln!("  or add `api_key` to {}", AppConfig::default_path().display());
        eprintln!();
        return Err("No API key found. See above for setup instructions.".into());
    }

    let provider = toolchat_providers::build_from_config(&config);
    let mut session = ChatSession::from_config(&config, provider)?;
    let mut sink = TerminalSink::stdio();

    if let Some(prompt) = prompt {
        session.submit(&prompt, &mut sink).await?;
        return Ok(());
    }

    println!();
    println!("  toolchat, interactive mode");
    println!("  Type your message and press Enter. 'exit' or Ctrl+D to quit.");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("  You > ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        if line.trim() == "exit" {
            break;
        }

        if let Err(e) = session.submit(&line, &mut sink).await {
            eprintln!("  [Error] {e}");
        }
        println!();
    }

    println!();
    Ok(())
}

/// Prints session events as they arrive.
///
/// Agent steps go to `steps`, answers to `answers`. Write errors are
/// ignored; a closed terminal must not fail the turn.
struct TerminalSink<A: Write, S: Write> {
    answers: A,
    steps: S,
    streaming: bool,
}

impl TerminalSink<std::io::Stdout, std::io::Stderr> {
    fn stdio() -> Self {
        Self::new(std::io::stdout(), std::io::stderr())
    }
}

impl<A: Write, S: Write> TerminalSink<A, S> {
    fn new(answers: A, steps: S) -> Self {
        Self {
            answers,
            steps,
            streaming: false,
        }
    }

    /// Close an open line of streamed text.
    fn end_stream(&mut self) {
        if self.streaming {
            let _ = writeln!(self.steps);
            self.streaming = false;
        }
    }

    fn print_answer(&mut self, label: &str, content: &str) {
        self.end_stream();
        for line in content.lines() {
            let _ = writeln!(self.answers, "  {label} > {line}");
        }
        let _ = self.answers.flush();
    }
}

impl<A: Write + Send, S: Write + Send> EventSink<SessionEvent> for TerminalSink<A, S> {
    fn emit(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::User(_) => {}
            SessionEvent::Agent(AgentStreamEvent::Chunk { content }) => {
                if !self.streaming {
                    let _ = write!(self.steps, "  ... ");
                    self.streaming = true;
                }
                let _ = write!(self.steps, "{content}");
                let _ = self.steps.flush();
            }
            SessionEvent::Agent(AgentStreamEvent::ToolCall { name, input, .. }) => {
                self.end_stream();
                let _ = writeln!(self.steps, "  [tool] {name} {input}");
            }
            SessionEvent::Agent(AgentStreamEvent::ToolResult {
                name,
                output,
                success,
                ..
            }) => {
                self.end_stream();
                let status = if success { "ok" } else { "failed" };
                let preview: String = output.chars().take(200).collect();
                let _ = writeln!(self.steps, "  [tool] {name} {status}: {preview}");
            }
            SessionEvent::Agent(AgentStreamEvent::Done {
                iterations,
                tool_calls_made,
                ..
            }) => {
                self.end_stream();
                let _ = writeln!(
                    self.steps,
                    "  [done] {iterations} step(s), {tool_calls_made} tool call(s)"
                );
            }
            SessionEvent::AgentAnswer { content } => self.print_answer("Agent", &content),
            SessionEvent::Assistant(turn) => self.print_answer("Assistant", &turn.content),
            SessionEvent::Error { message } => {
                self.end_stream();
                let _ = writeln!(self.steps, "  [Error] {message}");
            }
        }
    }
}
