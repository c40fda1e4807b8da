use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::infra::db::postgres::schema::visio_usage;

#[derive(Debug, Clone, Identifiable, Selectable, Queryable, PartialEq)]
#[diesel(table_name = visio_usage, primary_key(user_id, month_year))]
pub struct UsageEntity {
    pub user_id: Uuid,
    pub month_year: String,
    pub used_seconds: i32,
    pub quota_seconds: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UsageEntity {
    pub fn remaining_seconds(&self) -> i32 {
        (self.quota_seconds - self.used_seconds).max(0)
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = visio_usage)]
pub struct InsertUsageEntity {
    pub user_id: Uuid,
    pub month_year: String,
    pub used_seconds: i32,
    pub quota_seconds: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
