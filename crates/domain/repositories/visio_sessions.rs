use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::domain::{
    entities::visio_sessions::{InsertVisioSessionEntity, VisioSessionEntity},
    value_objects::enums::visio_states::VisioState,
};

/// State writes are compare-and-set: they return `None` when the stored state is no
/// longer `from` or the session has ended, and the row is left untouched.
#[automock]
#[async_trait]
pub trait VisioSessionRepository {
    async fn insert(&self, session: InsertVisioSessionEntity) -> Result<VisioSessionEntity>;

    async fn find_by_id(&self, session_id: Uuid) -> Result<Option<VisioSessionEntity>>;

    async fn compare_and_set_state(
        &self,
        session_id: Uuid,
        from: VisioState,
        to: VisioState,
    ) -> Result<Option<VisioSessionEntity>>;

    /// Moves the state and adds one message worth `seconds` to the session totals.
    async fn record_turn(
        &self,
        session_id: Uuid,
        from: VisioState,
        to: VisioState,
        seconds: i32,
    ) -> Result<Option<VisioSessionEntity>>;

    async fn end(
        &self,
        session_id: Uuid,
        from: VisioState,
        to: VisioState,
    ) -> Result<Option<VisioSessionEntity>>;
}
