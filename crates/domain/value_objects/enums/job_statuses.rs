use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// Lifecycle of anything a video provider renders: avatars, talking clips, idle loops.
#[derive(Default, Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    #[default]
    Pending,
    Processing,
    Ready,
    Failed,
}

impl Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let status = match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Ready => "ready",
            JobStatus::Failed => "failed",
        };
        write!(f, "{}", status)
    }
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Ready | JobStatus::Failed)
    }

    /// Maps the vocabulary used by the various provider APIs onto our four states.
    /// Anything unrecognised is treated as not started yet.
    pub fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "ready" | "completed" | "complete" | "success" | "succeeded" => JobStatus::Ready,
            "processing" | "in_progress" | "running" | "waiting" => JobStatus::Processing,
            "failed" | "fail" | "error" => JobStatus::Failed,
            _ => JobStatus::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_provider_vocabulary() {
        assert_eq!(JobStatus::from_str("completed"), JobStatus::Ready);
        assert_eq!(JobStatus::from_str("SUCCESS"), JobStatus::Ready);
        assert_eq!(JobStatus::from_str("running"), JobStatus::Processing);
        assert_eq!(JobStatus::from_str("fail"), JobStatus::Failed);
        assert_eq!(JobStatus::from_str("queued"), JobStatus::Pending);
    }

    #[test]
    fn only_ready_and_failed_are_terminal() {
        assert!(JobStatus::Ready.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(!JobStatus::Pending.is_terminal());
        assert!(!JobStatus::Processing.is_terminal());
    }
}
