//! Terminal chat loop over a [`ChatSession`]

use super::output::Output;
use crate::chat::{ChatPhase, ChatSession, ChatView, Notice, NoticeLevel};
use tokio::io::{AsyncBufReadExt, BufReader};

/// Renders session events to stdout.
pub struct TerminalView<'a> {
    output: &'a Output,
    streaming: bool,
}

impl<'a> TerminalView<'a> {
    pub fn new(output: &'a Output) -> Self {
        Self {
            output,
            streaming: false,
        }
    }
}

impl ChatView for TerminalView<'_> {
    fn delta(&mut self, text: &str) {
        self.output.stream(text);
    }

    fn notice(&mut self, notice: &Notice) {
        if self.streaming {
            self.output.newline();
            self.streaming = false;
        }
        match notice.level {
            NoticeLevel::Warning => self.output.warning(&notice.message),
            NoticeLevel::Error => self.output.error(&notice.message),
        }
    }

    fn phase_changed(&mut self, phase: ChatPhase) {
        match phase {
            ChatPhase::AwaitingFirstToken => {}
            ChatPhase::Streaming => {
                self.output.assistant_label();
                self.streaming = true;
            }
            ChatPhase::Idle => {
                if self.streaming {
                    self.output.newline();
                    self.streaming = false;
                }
            }
        }
    }
}

fn is_exit(line: &str) -> bool {
    matches!(line.trim(), "exit" | "quit" | "/exit" | "/quit")
}

/// Read questions from stdin until EOF or `exit`.
pub async fn run(session: &mut ChatSession, output: &Output) -> std::io::Result<()> {
    output.info("Ask about programs, eligibility or costs. Type `exit` to leave.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        output.prompt();
        let Some(line) = lines.next_line().await? else {
            break;
        };
        if is_exit(&line) {
            break;
        }
        let mut view = TerminalView::new(output);
        let outcome = session.submit(&line, &mut view).await;
        tracing::debug!(?outcome, "Chat turn finished");
    }

    output.newline();
    Ok(())
}
