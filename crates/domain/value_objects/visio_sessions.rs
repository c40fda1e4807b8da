use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::domain::{
    entities::visio_sessions::VisioSessionEntity,
    value_objects::enums::visio_states::VisioState,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisioSessionDto {
    pub session_id: Uuid,
    pub state: VisioState,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub accumulated_seconds: i32,
    pub message_count: i32,
}

impl From<VisioSessionEntity> for VisioSessionDto {
    fn from(value: VisioSessionEntity) -> Self {
        Self {
            session_id: value.id,
            state: VisioState::from_str(&value.state),
            started_at: value.started_at,
            ended_at: value.ended_at,
            accumulated_seconds: value.accumulated_seconds,
            message_count: value.message_count,
        }
    }
}

/// Everything the client needs to play back one completed turn.
#[derive(Debug, Clone, Serialize)]
pub struct TurnResult {
    pub session: VisioSessionDto,
    pub user_text: String,
    pub ai_response: String,
    pub video_url: String,
    pub audio_url: String,
    pub duration_seconds: f64,
    pub usage_remaining: i32,
}
