//! Audit collaborator for session logout events

use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::names::UserName;

/// A set of users was logged out of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogoutEvent {
    /// Description of the client connection
    pub client: String,
    pub reason: String,
    pub initial_users: Vec<UserName>,
    pub updated_users: Vec<UserName>,
}

/// Receives audit events emitted by sessions.
pub trait AuditSink: Send + Sync {
    fn log_logout(&self, event: &LogoutEvent);
}

/// Writes each event as a JSON line on the `audit` tracing target
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn log_logout(&self, event: &LogoutEvent) {
        match serde_json::to_string(event) {
            Ok(json) => info!(target: "audit", atype = "logout", event = %json, "audit event"),
            Err(e) => info!(target: "audit", atype = "logout", error = %e, "unserializable audit event"),
        }
    }
}

/// Keeps events in memory for inspection
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    events: Mutex<Vec<LogoutEvent>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<LogoutEvent> {
        self.events.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }

    pub fn take(&self) -> Vec<LogoutEvent> {
        std::mem::take(&mut *self.events.lock().unwrap_or_else(|p| p.into_inner()))
    }
}

impl AuditSink for MemoryAuditSink {
    fn log_logout(&self, event: &LogoutEvent) {
        self.events.lock().unwrap_or_else(|p| p.into_inner()).push(event.clone());
    }
}
