use crate::{
    auth::middleware::AuthUser,
    chat::transport::{ChatTransport, LocalChatTransport, StreamEvent, EVENT_DELTA, EVENT_DONE, EVENT_ERROR},
    types::{AppError, ChatRequest, Result},
    AppState,
};
use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures::{Stream, StreamExt};
use std::convert::Infallible;

/// Data of the terminating `done` event.
pub const DONE_DATA: &str = "[DONE]";
/// Client-facing message for any completion failure.
pub const COMPLETION_FAILED: &str = "Failed to generate a response";

/// Stream a counselor answer for the given question and program contexts
///
/// The body is a server-sent event stream: one `delta` event per text
/// fragment, then `done`. A failure after the stream has started is reported
/// as a single `error` event.
#[utoipa::path(
    post,
    path = "/api/chat",
    request_body = ChatRequest,
    responses(
        (status = 200, description = "SSE stream of `delta` events followed by `done`"),
        (status = 400, description = "Empty message"),
        (status = 401, description = "Unauthorized"),
        (status = 502, description = "Completion provider unavailable")
    ),
    tag = "chat",
    security(("bearer" = []))
)]
pub async fn chat(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Json(payload): Json<ChatRequest>,
) -> Result<Sse<impl Stream<Item = std::result::Result<Event, Infallible>>>> {
    if payload.message.trim().is_empty() {
        return Err(AppError::InvalidInput("Message cannot be empty".to_string()));
    }

    let profile = match state.db.get_user_by_email(&claims.email).await {
        Ok(profile) => profile,
        Err(e) => {
            tracing::warn!(user_id = %claims.sub, "Could not load student profile: {}", e);
            None
        }
    };

    let config = state.config_manager.config();
    let transport = LocalChatTransport::new(state.llm.clone(), config.rag.system_prompt.clone())
        .with_profile(profile);

    tracing::info!(
        user_id = %claims.sub,
        contexts = payload.contexts.len(),
        model = state.llm.model_name(),
        "Starting chat completion"
    );

    let events = transport.open(&payload).await.map_err(|e| {
        tracing::error!(user_id = %claims.sub, "Failed to open completion stream: {}", e);
        AppError::LLM(COMPLETION_FAILED.to_string())
    })?;

    let sse = events
        .filter(|event| {
            let keep = !matches!(event, Ok(StreamEvent::Delta(text)) if text.is_empty());
            async move { keep }
        })
        .map(|event| {
            Ok::<_, Infallible>(match event {
                Ok(StreamEvent::Delta(text)) => Event::default()
                    .event(EVENT_DELTA)
                    .data(normalize_newlines(&text)),
                Ok(StreamEvent::End) => Event::default().event(EVENT_DONE).data(DONE_DATA),
                Err(e) => {
                    tracing::error!("Chat stream failed: {}", e);
                    Event::default()
                        .event(EVENT_ERROR)
                        .data(COMPLETION_FAILED)
                }
            })
        });

    Ok(Sse::new(sse).keep_alive(KeepAlive::default()))
}

/// SSE fields cannot carry carriage returns.
fn normalize_newlines(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}
