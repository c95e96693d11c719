use super::transport::{ChatTransport, StreamEvent};
use crate::rag::pipeline::{RetrievalStage, Retriever};
use crate::types::{ChatMetadata, ChatRequest, Message, MessageRole};
use futures::StreamExt;
use std::sync::Arc;

/// Content of the assistant message while the answer is pending.
pub const PLACEHOLDER: &str = "Thinking...";
/// Notice raised when retrieval finds nothing.
pub const NO_RESULTS_NOTICE: &str = "No relevant programs found. Try a different query.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatPhase {
    Idle,
    AwaitingFirstToken,
    Streaming,
}

/// Step of a submission that can fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Embedding,
    Search,
    Completion,
}

impl Stage {
    /// Replaces the pending assistant message.
    pub fn failure_message(&self) -> &'static str {
        match self {
            Stage::Embedding => "Sorry, there was an error processing your request.",
            Stage::Search => "Sorry, there was an error searching the program index.",
            Stage::Completion => "Sorry, there was an error generating a response.",
        }
    }

    /// Shown as an error notice.
    pub fn notice(&self) -> &'static str {
        match self {
            Stage::Embedding => "An error occurred while processing your request",
            Stage::Search => "An error occurred while searching the program index",
            Stage::Completion => "An error occurred while generating a response",
        }
    }
}

impl From<RetrievalStage> for Stage {
    fn from(stage: RetrievalStage) -> Self {
        match stage {
            RetrievalStage::Embedding => Stage::Embedding,
            RetrievalStage::Search => Stage::Search,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    fn warning(message: &str) -> Self {
        Self {
            level: NoticeLevel::Warning,
            message: message.to_string(),
        }
    }

    fn error(message: &str) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.to_string(),
        }
    }
}

/// Receives session updates as they happen.
pub trait ChatView: Send {
    /// The last message changed or was appended.
    fn message_updated(&mut self, _message: &Message) {}

    /// The pending assistant message was removed.
    fn message_removed(&mut self) {}

    /// A streamed fragment was appended to the last message.
    fn delta(&mut self, _text: &str) {}

    fn notice(&mut self, _notice: &Notice) {}

    fn phase_changed(&mut self, _phase: ChatPhase) {}
}

/// View that ignores everything.
pub struct NullView;

impl ChatView for NullView {}

/// How a submission ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Blank input, or a submission already in flight; nothing happened.
    Ignored,
    NoResults,
    Completed,
    Failed(Stage),
}

/// One conversation with the counselor.
///
/// Each submission runs retrieval, then the completion stream, strictly in
/// sequence. There is no retry and no cancellation: a submission ends when
/// the stream ends or any step fails.
pub struct ChatSession {
    retriever: Arc<dyn Retriever>,
    transport: Arc<dyn ChatTransport>,
    messages: Vec<Message>,
    phase: ChatPhase,
    used_contexts: Vec<String>,
}

impl ChatSession {
    pub fn new(retriever: Arc<dyn Retriever>, transport: Arc<dyn ChatTransport>) -> Self {
        Self {
            retriever,
            transport,
            messages: Vec::new(),
            phase: ChatPhase::Idle,
            used_contexts: Vec::new(),
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn phase(&self) -> ChatPhase {
        self.phase
    }

    /// Contexts sent with the most recent completion request.
    pub fn used_contexts(&self) -> &[String] {
        &self.used_contexts
    }

    pub async fn submit(&mut self, input: &str, view: &mut dyn ChatView) -> Outcome {
        if input.trim().is_empty() || self.phase != ChatPhase::Idle {
            return Outcome::Ignored;
        }

        self.messages.push(Message::user(input));
        self.messages.push(Message::assistant(PLACEHOLDER));
        self.set_phase(ChatPhase::AwaitingFirstToken, view);
        if let Some(last) = self.messages.last() {
            view.message_updated(last);
        }

        let retrieval = match self.retriever.retrieve(input).await {
            Ok(retrieval) => retrieval,
            Err(e) => {
                tracing::error!(stage = %e.stage, "Retrieval failed: {}", e.source);
                return self.fail(e.stage.into(), view);
            }
        };

        if retrieval.is_empty() {
            tracing::info!("No matches for query");
            self.messages.pop();
            view.message_removed();
            view.notice(&Notice::warning(NO_RESULTS_NOTICE));
            self.set_phase(ChatPhase::Idle, view);
            return Outcome::NoResults;
        }

        let request = ChatRequest {
            message: input.to_string(),
            metadata: Some(ChatMetadata::program_search(retrieval.total_results)),
            contexts: retrieval.contexts,
        };
        self.used_contexts = request.contexts.clone();

        let mut events = match self.transport.open(&request).await {
            Ok(events) => events,
            Err(e) => {
                tracing::error!("Failed to open completion stream: {}", e);
                return self.fail(Stage::Completion, view);
            }
        };

        while let Some(event) = events.next().await {
            match event {
                Ok(StreamEvent::Delta(text)) => self.apply_delta(&text, view),
                Ok(StreamEvent::End) => {
                    if self.phase == ChatPhase::AwaitingFirstToken {
                        self.clear_placeholder(view);
                    }
                    self.set_phase(ChatPhase::Idle, view);
                    return Outcome::Completed;
                }
                Err(e) => {
                    tracing::error!("Completion stream failed: {}", e);
                    return self.fail(Stage::Completion, view);
                }
            }
        }

        tracing::error!("Completion stream closed without an end event");
        self.fail(Stage::Completion, view)
    }

    fn apply_delta(&mut self, text: &str, view: &mut dyn ChatView) {
        let first = self.phase == ChatPhase::AwaitingFirstToken;
        if let Some(last) = self.pending_mut() {
            if first {
                last.content = text.to_string();
            } else {
                last.content.push_str(text);
            }
        }
        if first {
            self.set_phase(ChatPhase::Streaming, view);
        }
        view.delta(text);
        if let Some(last) = self.messages.last() {
            view.message_updated(last);
        }
    }

    fn clear_placeholder(&mut self, view: &mut dyn ChatView) {
        if let Some(last) = self.pending_mut() {
            last.content.clear();
        }
        if let Some(last) = self.messages.last() {
            view.message_updated(last);
        }
    }

    fn fail(&mut self, stage: Stage, view: &mut dyn ChatView) -> Outcome {
        if let Some(last) = self.pending_mut() {
            last.content = stage.failure_message().to_string();
        }
        if let Some(last) = self.messages.last() {
            view.message_updated(last);
        }
        view.notice(&Notice::error(stage.notice()));
        self.set_phase(ChatPhase::Idle, view);
        Outcome::Failed(stage)
    }

    fn pending_mut(&mut self) -> Option<&mut Message> {
        self.messages
            .last_mut()
            .filter(|m| m.role == MessageRole::Assistant)
    }

    fn set_phase(&mut self, phase: ChatPhase, view: &mut dyn ChatView) {
        if self.phase != phase {
            self.phase = phase;
            view.phase_changed(phase);
        }
    }
}
