//! Completion and retrieval transports for [`ChatSession`](super::session::ChatSession).
//!
//! A completion is consumed as a finite sequence of [`StreamEvent::Delta`]
//! terminated by [`StreamEvent::End`]. Running in-process, the events come
//! straight from an [`LLMClient`]; against a remote server, they are decoded
//! from the `delta` / `done` / `error` SSE events of `POST /api/chat`.

use crate::llm::prompt::build_counselor_prompt;
use crate::llm::LLMClient;
use crate::rag::pipeline::{RetrievalError, RetrievalStage, Retriever};
use crate::students::StudentProfile;
use crate::types::{AppError, ChatRequest, RecommendationRequest, Result, Retrieval};
use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures::{Stream, StreamExt};
use reqwest::Client;
use serde::Deserialize;
use std::pin::Pin;
use std::sync::Arc;

/// SSE event name carrying a text delta.
pub const EVENT_DELTA: &str = "delta";
/// SSE event name marking the end of a completion.
pub const EVENT_DONE: &str = "done";
/// SSE event name carrying a failure message.
pub const EVENT_ERROR: &str = "error";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    Delta(String),
    End,
}

pub type EventStream = Pin<Box<dyn Stream<Item = Result<StreamEvent>> + Send>>;

/// Opens a streamed completion for one chat request.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn open(&self, request: &ChatRequest) -> Result<EventStream>;
}

/// Completion straight from an LLM provider.
pub struct LocalChatTransport {
    llm: Arc<dyn LLMClient>,
    system_prompt: String,
    profile: Option<StudentProfile>,
}

impl LocalChatTransport {
    pub fn new(llm: Arc<dyn LLMClient>, system_prompt: impl Into<String>) -> Self {
        Self {
            llm,
            system_prompt: system_prompt.into(),
            profile: None,
        }
    }

    /// Include the student's profile in every prompt.
    pub fn with_profile(mut self, profile: Option<StudentProfile>) -> Self {
        self.profile = profile;
        self
    }
}

#[async_trait]
impl ChatTransport for LocalChatTransport {
    async fn open(&self, request: &ChatRequest) -> Result<EventStream> {
        let prompt =
            build_counselor_prompt(&request.message, &request.contexts, self.profile.as_ref());
        let mut tokens = self
            .llm
            .stream_with_system(&self.system_prompt, &prompt)
            .await?;

        let events = async_stream::stream! {
            while let Some(token) = tokens.next().await {
                match token {
                    Ok(text) => yield Ok(StreamEvent::Delta(text)),
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                }
            }
            yield Ok(StreamEvent::End);
        };

        Ok(Box::pin(events))
    }
}

/// Client for a running Elytra server.
#[derive(Clone)]
pub struct HttpChatTransport {
    client: Client,
    base_url: String,
    token: String,
}

impl HttpChatTransport {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    /// Retriever that calls `POST /api/recommendations` on the same server.
    pub fn retriever(&self) -> HttpRetriever {
        HttpRetriever {
            inner: self.clone(),
        }
    }
}

#[async_trait]
impl ChatTransport for HttpChatTransport {
    async fn open(&self, request: &ChatRequest) -> Result<EventStream> {
        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .bearer_auth(&self.token)
            .json(request)
            .send()
            .await
            .map_err(|e| AppError::LLM(format!("Chat request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::LLM(format!("Chat API returned {}", status)));
        }

        let events = async_stream::stream! {
            let mut sse = Box::pin(response.bytes_stream().eventsource());

            while let Some(event) = sse.next().await {
                match event {
                    Ok(event) => match event.event.as_str() {
                        EVENT_DONE => {
                            yield Ok(StreamEvent::End);
                            return;
                        }
                        EVENT_ERROR => {
                            yield Err(AppError::LLM(event.data));
                            return;
                        }
                        // Unnamed events are treated as deltas.
                        _ => yield Ok(StreamEvent::Delta(event.data)),
                    },
                    Err(e) => {
                        yield Err(AppError::LLM(format!("Stream error: {}", e)));
                        return;
                    }
                }
            }
        };

        Ok(Box::pin(events))
    }
}

/// Error body of `POST /api/recommendations`.
#[derive(Deserialize)]
struct RetrievalFailure {
    #[serde(default)]
    error: String,
    #[serde(default)]
    stage: Option<String>,
}

/// Remote retrieval through `POST /api/recommendations`.
pub struct HttpRetriever {
    inner: HttpChatTransport,
}

#[async_trait]
impl Retriever for HttpRetriever {
    async fn retrieve(&self, query: &str) -> std::result::Result<Retrieval, RetrievalError> {
        let t = &self.inner;
        let response = t
            .client
            .post(format!("{}/api/recommendations", t.base_url))
            .bearer_auth(&t.token)
            .json(&RecommendationRequest {
                query: query.to_string(),
            })
            .send()
            .await
            .map_err(|e| {
                RetrievalError::new(
                    RetrievalStage::Embedding,
                    AppError::Embedding(format!("Recommendation request failed: {}", e)),
                )
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let failure: RetrievalFailure = response.json().await.unwrap_or(RetrievalFailure {
                error: format!("Recommendation API returned {}", status),
                stage: None,
            });
            return Err(match failure.stage.as_deref() {
                Some("search") => {
                    RetrievalError::new(RetrievalStage::Search, AppError::VectorStore(failure.error))
                }
                _ => RetrievalError::new(
                    RetrievalStage::Embedding,
                    AppError::Embedding(failure.error),
                ),
            });
        }

        response.json::<Retrieval>().await.map_err(|e| {
            RetrievalError::new(
                RetrievalStage::Search,
                AppError::VectorStore(format!("Invalid recommendation response: {}", e)),
            )
        })
    }
}
