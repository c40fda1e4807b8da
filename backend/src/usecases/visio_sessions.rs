use chrono::Utc;
use crates::domain::{
    entities::visio_sessions::{InsertVisioSessionEntity, VisioSessionEntity},
    errors::{VisioError, VisioResult},
    repositories::{
        avatar_assets::AvatarAssetRepository, visio_sessions::VisioSessionRepository,
    },
    value_objects::{
        enums::{job_statuses::JobStatus, visio_states::VisioState},
        visio_sessions::VisioSessionDto,
    },
};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Guards every session state change with the transition table and a compare-and-set
/// write, so a client can never move a session out from under a running turn.
pub struct VisioSessionUseCase {
    session_repo: Arc<dyn VisioSessionRepository + Send + Sync>,
    avatar_repo: Arc<dyn AvatarAssetRepository + Send + Sync>,
}

impl VisioSessionUseCase {
    pub fn new(
        session_repo: Arc<dyn VisioSessionRepository + Send + Sync>,
        avatar_repo: Arc<dyn AvatarAssetRepository + Send + Sync>,
    ) -> Self {
        Self {
            session_repo,
            avatar_repo,
        }
    }

    pub async fn start(&self, user_id: Uuid) -> VisioResult<VisioSessionDto> {
        let avatar = self
            .avatar_repo
            .find_by_user(user_id)
            .await?
            .ok_or_else(|| VisioError::NotFound("avatar".to_string()))?;

        if JobStatus::from_str(&avatar.avatar_status) != JobStatus::Ready {
            return Err(VisioError::InvalidInput(format!(
                "avatar is not ready (status {})",
                avatar.avatar_status
            )));
        }

        let now = Utc::now();
        let session = self
            .session_repo
            .insert(InsertVisioSessionEntity {
                id: Uuid::new_v4(),
                user_id,
                state: VisioState::Setup.to_string(),
                started_at: now,
                accumulated_seconds: 0,
                message_count: 0,
                updated_at: now,
            })
            .await?;

        self.advance(session.id, VisioState::Setup, VisioState::Ready)
            .await?;
        let session = self
            .advance(session.id, VisioState::Ready, VisioState::Idle)
            .await?;

        info!(%user_id, session_id = %session.id, "visio_sessions: session started");
        Ok(session.into())
    }

    pub async fn get(&self, user_id: Uuid, session_id: Uuid) -> VisioResult<VisioSessionDto> {
        Ok(self.find_owned(user_id, session_id).await?.into())
    }

    pub async fn begin_recording(
        &self,
        user_id: Uuid,
        session_id: Uuid,
    ) -> VisioResult<VisioSessionDto> {
        self.transition(user_id, session_id, VisioState::Idle, VisioState::Recording)
            .await
    }

    pub async fn cancel_recording(
        &self,
        user_id: Uuid,
        session_id: Uuid,
    ) -> VisioResult<VisioSessionDto> {
        self.transition(user_id, session_id, VisioState::Recording, VisioState::Idle)
            .await
    }

    pub async fn playback_ended(
        &self,
        user_id: Uuid,
        session_id: Uuid,
    ) -> VisioResult<VisioSessionDto> {
        self.transition(user_id, session_id, VisioState::Talking, VisioState::Idle)
            .await
    }

    pub async fn recover(&self, user_id: Uuid, session_id: Uuid) -> VisioResult<VisioSessionDto> {
        self.transition(user_id, session_id, VisioState::Error, VisioState::Idle)
            .await
    }

    /// Closes the session in `ready`. A turn that is still processing must finish first.
    pub async fn end(&self, user_id: Uuid, session_id: Uuid) -> VisioResult<VisioSessionDto> {
        let session = self.find_live(user_id, session_id).await?;
        let mut current = VisioState::from_str(&session.state);

        if matches!(current, VisioState::Recording | VisioState::Talking) {
            self.advance(session_id, current, VisioState::Idle).await?;
            current = VisioState::Idle;
        }

        if current != VisioState::Ready {
            current.transition(VisioState::Ready)?;
        }

        let ended = self
            .session_repo
            .end(session_id, current, VisioState::Ready)
            .await?;

        match ended {
            Some(session) => {
                info!(
                    %user_id,
                    %session_id,
                    accumulated_seconds = session.accumulated_seconds,
                    message_count = session.message_count,
                    "visio_sessions: session ended"
                );
                Ok(session.into())
            }
            None => Err(self.lost_race(session_id, VisioState::Ready).await),
        }
    }

    /// Loads a session that belongs to `user_id` and is still open.
    pub async fn find_live(
        &self,
        user_id: Uuid,
        session_id: Uuid,
    ) -> VisioResult<VisioSessionEntity> {
        let session = self.find_owned(user_id, session_id).await?;
        if session.ended_at.is_some() {
            return Err(VisioError::SessionEnded(session_id));
        }
        Ok(session)
    }

    /// Moves an open session from `from` to `to` without an ownership check.
    pub async fn advance(
        &self,
        session_id: Uuid,
        from: VisioState,
        to: VisioState,
    ) -> VisioResult<VisioSessionEntity> {
        from.transition(to)?;

        match self
            .session_repo
            .compare_and_set_state(session_id, from, to)
            .await?
        {
            Some(session) => {
                debug!(%session_id, %from, %to, "visio_sessions: state changed");
                Ok(session)
            }
            None => Err(self.lost_race(session_id, to).await),
        }
    }

    /// Closes a successful turn: `processing -> talking` plus the session totals.
    pub async fn complete_turn(
        &self,
        session_id: Uuid,
        seconds: i32,
    ) -> VisioResult<VisioSessionEntity> {
        VisioState::Processing.transition(VisioState::Talking)?;

        match self
            .session_repo
            .record_turn(session_id, VisioState::Processing, VisioState::Talking, seconds)
            .await?
        {
            Some(session) => Ok(session),
            None => Err(self.lost_race(session_id, VisioState::Talking).await),
        }
    }

    async fn transition(
        &self,
        user_id: Uuid,
        session_id: Uuid,
        from: VisioState,
        to: VisioState,
    ) -> VisioResult<VisioSessionDto> {
        let session = self.find_live(user_id, session_id).await?;
        let current = VisioState::from_str(&session.state);

        if current != from {
            warn!(%session_id, %current, %to, "visio_sessions: transition refused");
            return Err(VisioError::InvalidTransition { from: current, to });
        }

        Ok(self.advance(session_id, from, to).await?.into())
    }

    async fn find_owned(&self, user_id: Uuid, session_id: Uuid) -> VisioResult<VisioSessionEntity> {
        match self.session_repo.find_by_id(session_id).await? {
            Some(session) if session.user_id == user_id => Ok(session),
            _ => Err(VisioError::NotFound(format!("session {}", session_id))),
        }
    }

    /// Builds the error for a compare-and-set that matched no row.
    async fn lost_race(&self, session_id: Uuid, to: VisioState) -> VisioError {
        match self.session_repo.find_by_id(session_id).await {
            Ok(Some(session)) if session.ended_at.is_some() => VisioError::SessionEnded(session_id),
            Ok(Some(session)) => {
                let from = VisioState::from_str(&session.state);
                warn!(%session_id, %from, %to, "visio_sessions: concurrent state change");
                VisioError::InvalidTransition { from, to }
            }
            Ok(None) => VisioError::NotFound(format!("session {}", session_id)),
            Err(err) => VisioError::Internal(err),
        }
    }
}
