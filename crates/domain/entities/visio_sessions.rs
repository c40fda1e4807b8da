use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::infra::db::postgres::schema::visio_sessions;

#[derive(Debug, Clone, Identifiable, Selectable, Queryable, PartialEq)]
#[diesel(table_name = visio_sessions)]
pub struct VisioSessionEntity {
    pub id: Uuid,
    pub user_id: Uuid,
    pub state: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub accumulated_seconds: i32,
    pub message_count: i32,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = visio_sessions)]
pub struct InsertVisioSessionEntity {
    pub id: Uuid,
    pub user_id: Uuid,
    pub state: String,
    pub started_at: DateTime<Utc>,
    pub accumulated_seconds: i32,
    pub message_count: i32,
    pub updated_at: DateTime<Utc>,
}
