use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use uuid::Uuid;

use crate::domain::{
    entities::visio_sessions::{InsertVisioSessionEntity, VisioSessionEntity},
    repositories::visio_sessions::VisioSessionRepository,
    value_objects::enums::visio_states::VisioState,
};

#[derive(Default)]
pub struct VisioSessionMemory {
    sessions: DashMap<Uuid, VisioSessionEntity>,
}

impl VisioSessionMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies `mutate` only when the session is live and still in `from`.
    fn swap_if(
        &self,
        session_id: Uuid,
        from: VisioState,
        mutate: impl FnOnce(&mut VisioSessionEntity),
    ) -> Option<VisioSessionEntity> {
        let mut session = self.sessions.get_mut(&session_id)?;
        if session.ended_at.is_some() || session.state != from.to_string() {
            return None;
        }

        mutate(&mut *session);
        session.updated_at = Utc::now();
        Some(session.clone())
    }
}

#[async_trait]
impl VisioSessionRepository for VisioSessionMemory {
    async fn insert(&self, session: InsertVisioSessionEntity) -> Result<VisioSessionEntity> {
        let entity = VisioSessionEntity {
            id: session.id,
            user_id: session.user_id,
            state: session.state,
            started_at: session.started_at,
            ended_at: None,
            accumulated_seconds: session.accumulated_seconds,
            message_count: session.message_count,
            updated_at: session.updated_at,
        };
        self.sessions.insert(entity.id, entity.clone());

        Ok(entity)
    }

    async fn find_by_id(&self, session_id: Uuid) -> Result<Option<VisioSessionEntity>> {
        Ok(self.sessions.get(&session_id).map(|row| row.clone()))
    }

    async fn compare_and_set_state(
        &self,
        session_id: Uuid,
        from: VisioState,
        to: VisioState,
    ) -> Result<Option<VisioSessionEntity>> {
        Ok(self.swap_if(session_id, from, |session| {
            session.state = to.to_string();
        }))
    }

    async fn record_turn(
        &self,
        session_id: Uuid,
        from: VisioState,
        to: VisioState,
        seconds: i32,
    ) -> Result<Option<VisioSessionEntity>> {
        Ok(self.swap_if(session_id, from, |session| {
            session.state = to.to_string();
            session.accumulated_seconds += seconds;
            session.message_count += 1;
        }))
    }

    async fn end(
        &self,
        session_id: Uuid,
        from: VisioState,
        to: VisioState,
    ) -> Result<Option<VisioSessionEntity>> {
        Ok(self.swap_if(session_id, from, |session| {
            session.state = to.to_string();
            session.ended_at = Some(Utc::now());
        }))
    }
}
