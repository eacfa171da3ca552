//! Error taxonomy for the monitoring core.
//!
//! - Connectivity: the cluster is unreachable; fatal for the current cycle.
//! - PartialFetch: one topic/group failed mid-cycle; isolated to that entity.
//! - Validation: malformed caller input; rejected before any state change.
//! - StaleTarget: a cycle finished after its broker target was swapped out;
//!   the result is discarded and never surfaced.

#[derive(Debug, Clone, PartialEq)]
pub enum MonitorError {
    Connectivity { op: &'static str, message: String },
    PartialFetch { entity: String, message: String },
    Validation(String),
    StaleTarget,
}

impl MonitorError {
    pub fn connectivity(op: &'static str, message: impl Into<String>) -> Self {
        MonitorError::Connectivity { op, message: message.into() }
    }

    pub fn partial(entity: impl Into<String>, message: impl Into<String>) -> Self {
        MonitorError::PartialFetch { entity: entity.into(), message: message.into() }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        MonitorError::Validation(message.into())
    }
}

impl std::fmt::Display for MonitorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MonitorError::Connectivity { op, message } => {
                write!(f, "{} failed: {}", op, message)
            }
            MonitorError::PartialFetch { entity, message } => {
                write!(f, "failed to fetch {}: {}", entity, message)
            }
            MonitorError::Validation(message) => write!(f, "{}", message),
            MonitorError::StaleTarget => write!(f, "cycle result targets a stale broker list"),
        }
    }
}

impl std::error::Error for MonitorError {}
