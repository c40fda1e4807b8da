use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use diesel::{insert_into, prelude::*, update};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain,
    infra::db::postgres::{postgres_connection::PgPoolSquad, schema::visio_sessions},
};
use domain::{
    entities::visio_sessions::{InsertVisioSessionEntity, VisioSessionEntity},
    repositories::visio_sessions::VisioSessionRepository,
    value_objects::enums::visio_states::VisioState,
};

pub struct VisioSessionPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl VisioSessionPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl VisioSessionRepository for VisioSessionPostgres {
    async fn insert(&self, session: InsertVisioSessionEntity) -> Result<VisioSessionEntity> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = insert_into(visio_sessions::table)
            .values(&session)
            .returning(VisioSessionEntity::as_returning())
            .get_result::<VisioSessionEntity>(&mut conn)?;

        Ok(result)
    }

    async fn find_by_id(&self, session_id: Uuid) -> Result<Option<VisioSessionEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = visio_sessions::table
            .find(session_id)
            .select(VisioSessionEntity::as_select())
            .first::<VisioSessionEntity>(&mut conn)
            .optional()?;

        Ok(result)
    }

    async fn compare_and_set_state(
        &self,
        session_id: Uuid,
        from: VisioState,
        to: VisioState,
    ) -> Result<Option<VisioSessionEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = update(
            visio_sessions::table
                .filter(visio_sessions::id.eq(session_id))
                .filter(visio_sessions::state.eq(from.to_string()))
                .filter(visio_sessions::ended_at.is_null()),
        )
        .set((
            visio_sessions::state.eq(to.to_string()),
            visio_sessions::updated_at.eq(Utc::now()),
        ))
        .returning(VisioSessionEntity::as_returning())
        .get_result::<VisioSessionEntity>(&mut conn)
        .optional()?;

        Ok(result)
    }

    async fn record_turn(
        &self,
        session_id: Uuid,
        from: VisioState,
        to: VisioState,
        seconds: i32,
    ) -> Result<Option<VisioSessionEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = update(
            visio_sessions::table
                .filter(visio_sessions::id.eq(session_id))
                .filter(visio_sessions::state.eq(from.to_string()))
                .filter(visio_sessions::ended_at.is_null()),
        )
        .set((
            visio_sessions::state.eq(to.to_string()),
            visio_sessions::accumulated_seconds.eq(visio_sessions::accumulated_seconds + seconds),
            visio_sessions::message_count.eq(visio_sessions::message_count + 1),
            visio_sessions::updated_at.eq(Utc::now()),
        ))
        .returning(VisioSessionEntity::as_returning())
        .get_result::<VisioSessionEntity>(&mut conn)
        .optional()?;

        Ok(result)
    }

    async fn end(
        &self,
        session_id: Uuid,
        from: VisioState,
        to: VisioState,
    ) -> Result<Option<VisioSessionEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;
        let now = Utc::now();

        let result = update(
            visio_sessions::table
                .filter(visio_sessions::id.eq(session_id))
                .filter(visio_sessions::state.eq(from.to_string()))
                .filter(visio_sessions::ended_at.is_null()),
        )
        .set((
            visio_sessions::state.eq(to.to_string()),
            visio_sessions::ended_at.eq(Some(now)),
            visio_sessions::updated_at.eq(now),
        ))
        .returning(VisioSessionEntity::as_returning())
        .get_result::<VisioSessionEntity>(&mut conn)
        .optional()?;

        Ok(result)
    }
}
