//! The chat loop for toolchat.
//!
//! A [`ChatSession`] owns one transcript and one agent. Each accepted prompt
//! is recorded, answered by the agent (streamed, shown once), then answered
//! again by a plain model call whose reply is what the transcript keeps.
//!
//! [`SessionStore`] keys sessions by [`SessionId`](toolchat_core::SessionId)
//! so concurrent browser sessions never see each other's state.

pub mod error;
pub mod event;
pub mod session;
pub mod store;

pub use error::SessionError;
pub use event::{AgentEvents, SessionEvent};
pub use session::{ChatSession, TurnOutcome, TurnPhase};
pub use store::{SessionFactory, SessionStore};
