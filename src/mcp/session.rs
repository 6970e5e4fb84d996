//! Per-connection session state
//!
//! A `Session` exists only after a successful `initialize` and lives as long
//! as the connection that created it.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::mcp::types::ClientInfo;

/// State negotiated during the handshake
#[derive(Debug, Clone)]
pub struct Session {
    pub id: Uuid,
    pub protocol_version: String,
    pub client_info: ClientInfo,
    pub initialized_at: DateTime<Utc>,
    call_counts: HashMap<String, u64>,
}

impl Session {
    pub fn new(protocol_version: String, client_info: ClientInfo) -> Self {
        Self {
            id: Uuid::new_v4(),
            protocol_version,
            client_info,
            initialized_at: Utc::now(),
            call_counts: HashMap::new(),
        }
    }

    /// Count a handler invocation
    pub fn record_call(&mut self, tool: &str) {
        *self.call_counts.entry(tool.to_string()).or_insert(0) += 1;
    }

    pub fn call_count(&self, tool: &str) -> u64 {
        self.call_counts.get(tool).copied().unwrap_or(0)
    }

    pub fn call_counts(&self) -> &HashMap<String, u64> {
        &self.call_counts
    }
}

/// Handshake state of a connection
#[derive(Debug, Default)]
pub enum SessionState {
    #[default]
    Uninitialized,
    Ready(Session),
}

impl SessionState {
    pub fn is_ready(&self) -> bool {
        matches!(self, SessionState::Ready(_))
    }

    pub fn session(&self) -> Option<&Session> {
        match self {
            SessionState::Ready(session) => Some(session),
            SessionState::Uninitialized => None,
        }
    }

    pub fn session_mut(&mut self) -> Option<&mut Session> {
        match self {
            SessionState::Ready(session) => Some(session),
            SessionState::Uninitialized => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_counts() {
        let mut session = Session::new("2024-11-05".to_string(), ClientInfo::default());
        assert_eq!(session.call_count("calculate"), 0);
        session.record_call("calculate");
        session.record_call("calculate");
        assert_eq!(session.call_count("calculate"), 2);
    }

    #[test]
    fn test_state_transitions() {
        let mut state = SessionState::default();
        assert!(!state.is_ready());
        assert!(state.session().is_none());

        state = SessionState::Ready(Session::new("2024-11-05".to_string(), ClientInfo::default()));
        assert!(state.is_ready());
        assert!(state.session_mut().is_some());
    }
}
