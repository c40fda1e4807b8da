use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::enums::job_statuses::JobStatus;

/// How a provider tells us that a render finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionMode {
    /// We ask the provider for the job status until it is terminal.
    Polling,
    /// The provider calls us back; status reads hit the local job registry.
    Webhook,
}

/// Status plus the payload that is only meaningful for that status. A result URL can
/// only exist on `Ready` and an error message only on `Failed`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobState {
    Pending,
    Processing,
    Ready {
        result_url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        duration_seconds: Option<f64>,
    },
    Failed {
        error_message: String,
    },
}

impl JobState {
    pub fn status(&self) -> JobStatus {
        match self {
            JobState::Pending => JobStatus::Pending,
            JobState::Processing => JobStatus::Processing,
            JobState::Ready { .. } => JobStatus::Ready,
            JobState::Failed { .. } => JobStatus::Failed,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status().is_terminal()
    }
}

/// One outstanding render request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderJob {
    pub job_id: String,
    #[serde(flatten)]
    pub state: JobState,
    /// Unknown when the job was only observed through a status read.
    pub submitted_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl ProviderJob {
    pub fn submitted(job_id: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            state: JobState::Pending,
            submitted_at: Some(Utc::now()),
            completed_at: None,
        }
    }

    pub fn observed(job_id: impl Into<String>, state: JobState) -> Self {
        let completed_at = state.is_terminal().then(Utc::now);
        Self {
            job_id: job_id.into(),
            state,
            submitted_at: None,
            completed_at,
        }
    }

    pub fn status(&self) -> JobStatus {
        self.state.status()
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    pub fn result_url(&self) -> Option<&str> {
        match &self.state {
            JobState::Ready { result_url, .. } => Some(result_url),
            _ => None,
        }
    }

    pub fn duration_seconds(&self) -> Option<f64> {
        match &self.state {
            JobState::Ready {
                duration_seconds, ..
            } => *duration_seconds,
            _ => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match &self.state {
            JobState::Failed { error_message } => Some(error_message),
            _ => None,
        }
    }

    /// Moves the job to `next`. Terminal jobs are immutable: the update is dropped and
    /// `false` is returned.
    pub fn apply(&mut self, next: JobState) -> bool {
        if self.is_terminal() {
            return false;
        }
        if next.is_terminal() {
            self.completed_at = Some(Utc::now());
        }
        self.state = next;
        true
    }
}

/// Terminal result delivered by a provider callback, keyed by the id the provider echoes.
#[derive(Debug, Clone, PartialEq)]
pub struct CallbackUpdate {
    pub job_id: String,
    pub state: JobState,
}
