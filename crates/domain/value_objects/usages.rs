use serde::Serialize;

use crate::domain::entities::usages::UsageEntity;

/// Monthly visio usage as reported to clients.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsageRecord {
    pub month_year: String,
    pub used_seconds: i32,
    pub quota_seconds: i32,
    pub remaining_seconds: i32,
    pub percent_used: f64,
}

impl From<UsageEntity> for UsageRecord {
    fn from(value: UsageEntity) -> Self {
        let remaining_seconds = value.remaining_seconds();
        let percent_used = if value.quota_seconds > 0 {
            let raw = f64::from(value.used_seconds) / f64::from(value.quota_seconds) * 100.0;
            (raw.min(100.0) * 10.0).round() / 10.0
        } else {
            100.0
        };

        Self {
            month_year: value.month_year,
            used_seconds: value.used_seconds,
            quota_seconds: value.quota_seconds,
            remaining_seconds,
            percent_used,
        }
    }
}
