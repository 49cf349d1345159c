//! Interactive session
//!
//! Reads commands from stdin and renders session events as they arrive.
//! Submissions and chat replies run as background tasks, so the prompt stays
//! responsive while the model works.

use crate::app::{self, AppConfig};
use anyhow::Result;
use faultline_core::{
    format_error_for_cli, render, AlertThreshold, Assistant, ChatOutcome, ImageInput,
    SessionEvent, SessionState,
};
use std::io::Write;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

const HELP: &str = "\
Commands:
  /describe <text>     set the written description
  /image <path>        attach a photo (/image to remove)
  /transcript <text>   set the voice note text
  /voice <file.wav>    transcribe a recorded voice note
  /submit              diagnose the current case
  /new                 start over with empty input
  /report              show the active report
  /history             list past diagnoses
  /select <n>          reopen diagnosis n from /history
  /clear               delete all history
  /dismiss             dismiss the alert or error
  /threshold <level>   alert level: disabled, low, medium, high, critical
  /status              show what is entered so far
  /quit                exit
Anything else is sent as a follow-up question once a report is open,
or added to the description before that.";

#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

struct Repl {
    assistant: Assistant,
    config: AppConfig,
    confirming_clear: bool,
    reply: ReplyLine,
}

/// The streamed `tech>` line currently on screen, keyed by chat epoch
#[derive(Debug, Default)]
struct ReplyLine {
    epoch: Option<u64>,
}

impl ReplyLine {
    /// Text to print before a fragment of the reply for `epoch`.
    ///
    /// A fragment from a newer chat closes any line left open by a
    /// superseded reply before starting its own.
    fn before_delta(&mut self, epoch: u64) -> &'static str {
        match self.epoch.replace(epoch) {
            Some(open) if open == epoch => "",
            Some(_) => "\ntech> ",
            None => "tech> ",
        }
    }

    /// Close the open line, returning whether one was open
    fn close(&mut self) -> bool {
        self.epoch.take().is_some()
    }
}

/// Run the interactive session
pub async fn run(config: &AppConfig) -> Result<()> {
    let provider = app::resolve_provider(config)?;
    let assistant = app::build_assistant(config, provider);
    info!("Starting Faultline v{}", env!("CARGO_PKG_VERSION"));

    println!("\nFaultline diagnostic assistant");
    println!("{}", "-".repeat(40));
    println!(
        "  Voice notes: {}",
        if faultline_audio::stt_available() && !config.speech.is_disabled() {
            "enabled"
        } else {
            "unavailable (set OPENAI_API_KEY)"
        }
    );
    println!("  Alert threshold: {}", config.session.alert_threshold);
    println!("\n{}\n", HELP);

    let mut repl = Repl {
        assistant,
        config: config.clone(),
        confirming_clear: false,
        reply: ReplyLine::default(),
    };
    repl.run_loop().await
}

impl Repl {
    async fn run_loop(&mut self) -> Result<()> {
        let mut events = self.assistant.subscribe();
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        loop {
            tokio::select! {
                line = lines.next_line() => {
                    match line {
                        Ok(Some(line)) => {
                            if self.handle_line(line.trim()).await == Flow::Quit {
                                break;
                            }
                        }
                        Ok(None) => {
                            debug!("stdin closed");
                            break;
                        }
                        Err(e) => {
                            warn!(error = %e, "stdin read error");
                            break;
                        }
                    }
                }
                event = events.recv() => {
                    match event {
                        Ok(event) => self.show_event(event).await,
                        Err(RecvError::Lagged(n)) => debug!(lagged = n, "Event subscriber lagged"),
                        Err(RecvError::Closed) => break,
                    }
                }
            }
        }

        println!("Bye.");
        Ok(())
    }

    async fn handle_line(&mut self, line: &str) -> Flow {
        if line.is_empty() {
            return Flow::Continue;
        }

        if std::mem::take(&mut self.confirming_clear) {
            if line.eq_ignore_ascii_case("yes") {
                self.clear_history(true).await;
            } else {
                println!("History kept.");
            }
            return Flow::Continue;
        }

        let (command, arg) = match line.split_once(char::is_whitespace) {
            Some((c, a)) => (c, a.trim()),
            None => (line, ""),
        };

        match command {
            "/quit" | "/exit" => return Flow::Quit,
            "/help" => println!("{}", HELP),
            "/describe" => {
                self.assistant.set_description(arg).await;
                println!("Description set.");
            }
            "/image" => self.set_image(arg).await,
            "/transcript" => {
                self.assistant.set_transcript(arg).await;
                println!("Voice note text set.");
            }
            "/voice" => self.voice(arg).await,
            "/submit" => self.submit(),
            "/new" => {
                self.assistant.clear_input().await;
                self.assistant.dismiss_error().await;
                println!("Input cleared.");
            }
            "/report" => self.show_report().await,
            "/history" => {
                let text = self
                    .assistant
                    .read(|s| render::render_history(s.history(), s.active_history_index()))
                    .await;
                println!("{}", text.trim_end());
            }
            "/select" => self.select(arg).await,
            "/clear" => {
                if self.config.session.require_clear_confirmation {
                    println!("Delete all history? This cannot be undone. Type 'yes' to confirm.");
                    self.confirming_clear = true;
                } else {
                    self.clear_history(true).await;
                }
            }
            "/dismiss" => {
                if !self.assistant.dismiss_alert().await && !self.assistant.dismiss_error().await {
                    println!("Nothing to dismiss.");
                }
            }
            "/threshold" => match arg.parse::<AlertThreshold>() {
                Ok(threshold) => {
                    self.assistant.set_alert_threshold(threshold).await;
                    println!("Alert threshold: {}", threshold);
                }
                Err(e) => println!("{}", format_error_for_cli(&e)),
            },
            "/status" => self.show_status().await,
            c if c.starts_with('/') => println!("Unknown command {}. Type /help.", c),
            _ => self.free_text(line).await,
        }
        Flow::Continue
    }

    async fn set_image(&self, arg: &str) {
        if arg.is_empty() {
            self.assistant.clear_image().await;
            println!("Photo removed.");
            return;
        }
        match ImageInput::from_path(PathBuf::from(arg)) {
            Ok(image) => {
                println!("Attached {} photo.", image.media_type);
                self.assistant.set_image(image).await;
            }
            Err(e) => println!("{}", format_error_for_cli(&e)),
        }
    }

    async fn voice(&self, arg: &str) {
        if arg.is_empty() {
            println!("Usage: /voice <file.wav>");
            return;
        }
        match super::voice::transcribe_file(&self.config.speech, &PathBuf::from(arg)).await {
            Ok(text) if text.is_empty() => println!("No speech recognised."),
            Ok(text) => {
                println!("Voice note: {}", text);
                self.assistant.set_transcript(text).await;
            }
            Err(e) => println!("Voice note failed: {:#}", e),
        }
    }

    fn submit(&self) {
        println!("Diagnosing...");
        let assistant = self.assistant.clone();
        tokio::spawn(async move {
            if let Err(e) = assistant.submit_buffered().await {
                println!("{}", format_error_for_cli(&e));
            }
        });
    }

    async fn free_text(&self, text: &str) {
        let chat_open = self
            .assistant
            .read(|s| s.chat().session().is_some())
            .await;

        if !chat_open {
            let description = self
                .assistant
                .read(|s| s.input().description.clone())
                .await;
            let joined = if description.trim().is_empty() {
                text.to_string()
            } else {
                format!("{} {}", description.trim_end(), text)
            };
            self.assistant.set_description(joined).await;
            println!("Added to description. /submit when ready.");
            return;
        }

        let assistant = self.assistant.clone();
        let text = text.to_string();
        tokio::spawn(async move {
            if assistant.send_chat_message(&text).await == ChatOutcome::Ignored {
                println!("Still answering the last question...");
            }
        });
    }

    async fn select(&self, arg: &str) {
        let Ok(n) = arg.parse::<usize>() else {
            println!("Usage: /select <n>");
            return;
        };
        match self.assistant.select_history_at(n.saturating_sub(1)).await {
            Ok(_) => self.show_report().await,
            Err(e) => println!("{}", format_error_for_cli(&e)),
        }
    }

    async fn clear_history(&self, confirmed: bool) {
        match self.assistant.clear_history(confirmed).await {
            Ok(()) => println!("History cleared."),
            Err(e) => println!("{}", format_error_for_cli(&e)),
        }
    }

    async fn show_report(&self) {
        let text = self
            .assistant
            .read(|s| s.active_report().map(|r| render::render_report(r)))
            .await;
        match text {
            Some(text) => print!("{}", text),
            None => println!("No report yet. /submit a case first."),
        }
    }

    async fn show_status(&self) {
        let status = self
            .assistant
            .read(|s| {
                let input = s.input();
                let state = match s.state() {
                    SessionState::Idle => "idle",
                    SessionState::Submitting => "diagnosing",
                    SessionState::ReportReady => "report ready",
                    SessionState::Error => "error",
                };
                format!(
                    "State: {}\nDescription: {}\nPhoto: {}\nVoice note: {}\nHistory: {} entries",
                    state,
                    if input.description.is_empty() { "-" } else { input.description.as_str() },
                    input
                        .image
                        .as_ref()
                        .map_or("-", |i| i.media_type.as_str()),
                    if input.transcript.is_empty() { "-" } else { input.transcript.as_str() },
                    s.history().len(),
                )
            })
            .await;
        println!("{}", status);
    }

    async fn show_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::SubmissionCompleted { .. } => {
                println!();
                self.show_report().await;
                println!("\nAsk a follow-up question, or /new for another case.");
            }
            SessionEvent::SubmissionFailed { error, .. } => {
                println!("{}\nYour input was kept; /submit to retry.", error);
            }
            SessionEvent::SubmissionSuperseded { ticket } => {
                debug!(ticket, "Superseded submission dropped");
            }
            SessionEvent::AlertRaised { severity, threshold, .. } => {
                let alert = self.assistant.read(|s| s.alert().copied()).await;
                match alert {
                    Some(alert) => println!("\n{}", render::render_alert(&alert)),
                    None => debug!(%severity, %threshold, "Alert already dismissed"),
                }
            }
            SessionEvent::ChatDelta { epoch, delta } => {
                print!("{}{}", self.reply.before_delta(epoch), delta);
                let _ = std::io::stdout().flush();
            }
            SessionEvent::ChatFinished { .. } => {
                if self.reply.close() {
                    println!();
                }
            }
            SessionEvent::ChatFailed { .. } => {
                if self.reply.close() {
                    println!();
                }
                let turn = self
                    .assistant
                    .read(|s| s.chat().turns().last().map(render::render_turn))
                    .await;
                if let Some(turn) = turn {
                    println!("{}", turn);
                }
            }
            // these reset the chat, so a reply still streaming was superseded
            SessionEvent::HistorySelected { .. }
            | SessionEvent::HistoryCleared
            | SessionEvent::SubmissionStarted { .. } => {
                if self.reply.close() {
                    println!();
                }
            }
            SessionEvent::AlertDismissed
            | SessionEvent::ErrorDismissed => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reply_line_prefixes_first_fragment_only() {
        let mut line = ReplyLine::default();
        assert_eq!(line.before_delta(1), "tech> ");
        assert_eq!(line.before_delta(1), "");
        assert!(line.close());
        assert!(!line.close());
        assert_eq!(line.before_delta(1), "tech> ");
    }

    #[test]
    fn test_superseded_reply_line_is_terminated() {
        let mut line = ReplyLine::default();
        assert_eq!(line.before_delta(1), "tech> ");

        // a newer chat starts streaming without a finish for epoch 1
        assert_eq!(line.before_delta(3), "\ntech> ");
        assert_eq!(line.before_delta(3), "");
    }

    #[test]
    fn test_reset_closes_open_reply() {
        let mut line = ReplyLine::default();
        line.before_delta(2);
        assert!(line.close());
        assert_eq!(line.before_delta(4), "tech> ");
    }
}
