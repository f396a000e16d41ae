//! Active call sessions keyed by call id.

use crate::error::TelephonyError;
use chrono::{DateTime, Utc};
use dsva_types::ConversationTurn;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::RwLock;
use tokio::task::AbortHandle;

/// One call's conversation state.
#[derive(Debug, Clone)]
pub struct CallSession {
    pub call_id: String,
    pub history: Vec<ConversationTurn>,
    pub created_at: DateTime<Utc>,
}

impl CallSession {
    pub fn new(call_id: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            history: Vec::new(),
            created_at: Utc::now(),
        }
    }
}

/// Read-only view of an active call.
#[derive(Debug, Clone, Serialize)]
pub struct CallSummary {
    #[serde(rename = "callId")]
    pub call_id: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    pub turns: usize,
}

struct CallEntry {
    session: CallSession,
    task: Option<AbortHandle>,
}

/// Owns every active [`CallSession`].
///
/// Uses `std::sync::RwLock`: every acquisition is a short map operation that
/// never spans an `.await`.
#[derive(Default)]
pub struct SessionRegistry {
    calls: RwLock<HashMap<String, CallEntry>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the session for a new call.
    ///
    /// # Errors
    ///
    /// [`TelephonyError::DuplicateCall`] if `call_id` is already active.
    pub fn open(&self, call_id: &str) -> Result<(), TelephonyError> {
        let mut calls = self.write();
        if calls.contains_key(call_id) {
            return Err(TelephonyError::DuplicateCall(call_id.to_string()));
        }
        calls.insert(
            call_id.to_string(),
            CallEntry {
                session: CallSession::new(call_id),
                task: None,
            },
        );
        Ok(())
    }

    /// Records the task driving the call so that [`close`](Self::close) can
    /// stop it. Returns `false` if the call is no longer active.
    pub fn attach(&self, call_id: &str, task: AbortHandle) -> bool {
        match self.write().get_mut(call_id) {
            Some(entry) => {
                entry.task = Some(task);
                true
            }
            None => false,
        }
    }

    /// Appends turns to the call's history. Returns `false` if the call is
    /// no longer active.
    pub fn append(&self, call_id: &str, turns: impl IntoIterator<Item = ConversationTurn>) -> bool {
        match self.write().get_mut(call_id) {
            Some(entry) => {
                entry.session.history.extend(turns);
                true
            }
            None => false,
        }
    }

    pub fn history(&self, call_id: &str) -> Option<Vec<ConversationTurn>> {
        self.read()
            .get(call_id)
            .map(|entry| entry.session.history.clone())
    }

    pub fn get(&self, call_id: &str) -> Option<CallSession> {
        self.read().get(call_id).map(|entry| entry.session.clone())
    }

    pub fn contains(&self, call_id: &str) -> bool {
        self.read().contains_key(call_id)
    }

    /// Removes the session and stops its controller task.
    pub fn close(&self, call_id: &str) -> Option<CallSession> {
        let entry = self.write().remove(call_id)?;
        if let Some(task) = entry.task {
            task.abort();
        }
        Some(entry.session)
    }

    /// Removes the session without touching its task. Called by the
    /// controller itself when the call reaches its end.
    pub fn release(&self, call_id: &str) -> Option<CallSession> {
        self.write().remove(call_id).map(|entry| entry.session)
    }

    /// Summaries of all active calls, oldest first.
    pub fn active(&self) -> Vec<CallSummary> {
        let mut summaries: Vec<CallSummary> = self
            .read()
            .values()
            .map(|entry| CallSummary {
                call_id: entry.session.call_id.clone(),
                created_at: entry.session.created_at,
                turns: entry.session.history.len(),
            })
            .collect();
        summaries.sort_by_key(|s| s.created_at);
        summaries
    }

    /// Closes every session older than `max_age` and returns their ids.
    ///
    /// Guards against sessions whose end event was never delivered.
    pub fn reap_expired(&self, max_age: chrono::Duration) -> Vec<String> {
        let cutoff = Utc::now() - max_age;
        let expired: Vec<String> = self
            .read()
            .values()
            .filter(|entry| entry.session.created_at < cutoff)
            .map(|entry| entry.session.call_id.clone())
            .collect();

        for call_id in &expired {
            self.close(call_id);
        }
        expired
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, CallEntry>> {
        self.calls.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, CallEntry>> {
        self.calls.write().unwrap_or_else(|e| e.into_inner())
    }
}
