//! Counselor chat
//!
//! ```text
//!            submit(non-blank)          first Delta
//!   Idle ─────────────────────► AwaitingFirstToken ─────────► Streaming
//!    ▲                                 │                          │
//!    └──── no results / failure ───────┴──── End / failure ───────┘
//! ```
//!
//! - [`session`] - the state machine and its view callbacks
//! - [`transport`] - local (LLM provider) and remote (SSE) completion streams

pub mod session;
pub mod transport;

pub use session::{ChatPhase, ChatSession, ChatView, Notice, NoticeLevel, Outcome, Stage};
pub use transport::{
    ChatTransport, HttpChatTransport, HttpRetriever, LocalChatTransport, StreamEvent,
};
