//! Session Store
//!
//! Repository of live interview sessions keyed by candidate id, behind a
//! trait so the backing store is swappable without touching session logic.

mod repository;

pub use repository::{
    InMemorySessionStore, InterviewSession, SessionRecord, SessionRepository, SessionStatus,
    SharedSession,
};

use thiserror::Error;

/// Session store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Session already active for candidate {0}")]
    AlreadyActive(String),

    #[error("No active session for candidate {0}")]
    NotFound(String),

    #[error("Store lock poisoned: {0}")]
    LockPoisoned(String),
}
