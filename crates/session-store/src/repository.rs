//! Repository Implementation

use crate::StoreError;
use behavior::BehaviorAnalyzer;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use tracing::{debug, info};
use uuid::Uuid;

/// Session lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Active,
    Completed,
}

/// Session metadata record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub session_id: Uuid,
    pub candidate_id: String,
    pub started_at: DateTime<Utc>,
    pub status: SessionStatus,
}

/// A live interview session: metadata plus the analyzer that owns the
/// session's behavior state.
pub struct InterviewSession {
    pub record: SessionRecord,
    pub analyzer: BehaviorAnalyzer,
}

impl InterviewSession {
    /// Start a new session for a candidate
    pub fn new(candidate_id: impl Into<String>, analyzer: BehaviorAnalyzer) -> Self {
        let candidate_id = candidate_id.into();
        Self {
            record: SessionRecord {
                session_id: Uuid::new_v4(),
                candidate_id,
                started_at: analyzer.state().started_at(),
                status: SessionStatus::Active,
            },
            analyzer,
        }
    }
}

/// Handle to a stored session. The per-session mutex serializes frame
/// analysis against that session; the analyzer is never locked across
/// sessions.
pub type SharedSession = Arc<Mutex<InterviewSession>>;

/// Repository of live sessions keyed by candidate id
pub trait SessionRepository: Send + Sync {
    /// Store a new session; rejects a candidate with one already active
    fn put(&self, session: InterviewSession) -> Result<SharedSession, StoreError>;

    /// Look up the session for a candidate
    fn get(&self, candidate_id: &str) -> Option<SharedSession>;

    /// Remove and return the session for a candidate
    fn remove(&self, candidate_id: &str) -> Option<SharedSession>;

    /// Number of active sessions
    fn active_count(&self) -> usize;
}

/// In-memory repository (the default backing store)
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, SharedSession>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        info!("Creating in-memory session store");
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }
}

impl SessionRepository for InMemorySessionStore {
    fn put(&self, session: InterviewSession) -> Result<SharedSession, StoreError> {
        let candidate_id = session.record.candidate_id.clone();
        let mut sessions = self
            .sessions
            .write()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))?;

        if sessions.contains_key(&candidate_id) {
            return Err(StoreError::AlreadyActive(candidate_id));
        }

        debug!("Storing session {} for candidate {}", session.record.session_id, candidate_id);
        let handle: SharedSession = Arc::new(Mutex::new(session));
        sessions.insert(candidate_id, Arc::clone(&handle));
        Ok(handle)
    }

    fn get(&self, candidate_id: &str) -> Option<SharedSession> {
        self.sessions
            .read()
            .ok()
            .and_then(|sessions| sessions.get(candidate_id).cloned())
    }

    fn remove(&self, candidate_id: &str) -> Option<SharedSession> {
        let removed = self
            .sessions
            .write()
            .ok()
            .and_then(|mut sessions| sessions.remove(candidate_id));
        if removed.is_some() {
            debug!("Removed session for candidate {}", candidate_id);
        }
        removed
    }

    fn active_count(&self) -> usize {
        self.sessions.read().map(|s| s.len()).unwrap_or(0)
    }
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use behavior::{BehaviorConfig, ScriptedProvider};

    fn session(candidate_id: &str) -> InterviewSession {
        let analyzer = BehaviorAnalyzer::with_provider(
            BehaviorConfig::default(),
            Box::new(ScriptedProvider::new(Vec::new())),
        );
        InterviewSession::new(candidate_id, analyzer)
    }

    #[test]
    fn test_put_and_get() {
        let store = InMemorySessionStore::new();
        store.put(session("cand-1")).unwrap();

        let handle = store.get("cand-1").unwrap();
        let locked = handle.lock().unwrap();
        assert_eq!(locked.record.candidate_id, "cand-1");
        assert_eq!(locked.record.status, SessionStatus::Active);
        assert_eq!(store.active_count(), 1);
    }

    #[test]
    fn test_duplicate_candidate_rejected() {
        let store = InMemorySessionStore::new();
        store.put(session("cand-1")).unwrap();

        assert!(matches!(
            store.put(session("cand-1")),
            Err(StoreError::AlreadyActive(_))
        ));
        assert_eq!(store.active_count(), 1);
    }

    #[test]
    fn test_remove_frees_the_candidate() {
        let store = InMemorySessionStore::new();
        store.put(session("cand-1")).unwrap();

        assert!(store.remove("cand-1").is_some());
        assert!(store.get("cand-1").is_none());
        assert!(store.remove("cand-1").is_none());
        assert_eq!(store.active_count(), 0);

        // A fresh session for the same candidate is a new state
        let handle = store.put(session("cand-1")).unwrap();
        assert_eq!(handle.lock().unwrap().analyzer.state().frames_analyzed(), 0);
    }
}
