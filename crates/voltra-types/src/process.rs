//! Cloud process records as seen by the client.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::computation::ComputationImage;
use crate::ids::ProcessId;

/// Preserved detail from a remote error, carried verbatim to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub message: String,
    pub detail: Option<Vec<u8>>,
}

impl ErrorInfo {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            detail: None,
        }
    }

    pub fn with_detail(message: impl Into<String>, detail: Vec<u8>) -> Self {
        Self {
            message: message.into(),
            detail: Some(detail),
        }
    }
}

/// A log line the cluster has accumulated for a given process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub message: String,
}

/// Lifecycle state of a cloud process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcessStatus {
    Pending,
    Running,
    Completed,
    Faulted,
    Killed,
}

impl ProcessStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ProcessStatus::Completed | ProcessStatus::Faulted | ProcessStatus::Killed
        )
    }
}

/// The client-visible view of a cloud process's state.
///
/// Mutable only on the cluster side; the client re-reads this through the
/// proxy on demand rather than caching it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessRecord {
    pub id: ProcessId,
    pub image: ComputationImage,
    pub status: ProcessStatus,
    pub result: Option<Vec<u8>>,
    pub error: Option<ErrorInfo>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states_are_recognized() {
        assert!(ProcessStatus::Completed.is_terminal());
        assert!(ProcessStatus::Faulted.is_terminal());
        assert!(ProcessStatus::Killed.is_terminal());
        assert!(!ProcessStatus::Pending.is_terminal());
        assert!(!ProcessStatus::Running.is_terminal());
    }
}
