use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Multipart, Path, State},
    response::IntoResponse,
    routing::{get, post},
};
use crates::domain::value_objects::avatars::{CreateAvatarModel, GenerateIdleModel};
use tracing::debug;
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    axum_http::error_responses::AppError,
    usecases::{
        avatars::AvatarUseCase,
        turn_orchestrator::{TurnInput, TurnOrchestrator},
        usage_ledger::UsageLedger,
        visio_sessions::VisioSessionUseCase,
    },
};

const AUDIO_FIELD: &str = "audio";
const DEFAULT_AUDIO_FILE_NAME: &str = "turn.webm";

#[derive(Clone)]
pub struct VisioRoutesState {
    pub sessions: Arc<VisioSessionUseCase>,
    pub turns: Arc<TurnOrchestrator>,
    pub avatars: Arc<AvatarUseCase>,
    pub usage: Arc<UsageLedger>,
}

pub fn routes(state: VisioRoutesState) -> Router {
    Router::new()
        .route("/usage", get(get_usage))
        .route("/avatar", post(create_avatar).get(get_avatar))
        .route("/avatar/idle", post(generate_idle))
        .route("/sessions", post(start_session))
        .route("/sessions/:id", get(get_session))
        .route("/sessions/:id/recording", post(begin_recording))
        .route("/sessions/:id/recording/cancel", post(cancel_recording))
        .route("/sessions/:id/turns", post(submit_turn))
        .route("/sessions/:id/playback-ended", post(playback_ended))
        .route("/sessions/:id/recover", post(recover))
        .route("/sessions/:id/end", post(end_session))
        .with_state(Arc::new(state))
}

pub async fn get_usage(
    State(state): State<Arc<VisioRoutesState>>,
    auth: AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let usage = state.usage.get_or_create(auth.user_id).await?;
    Ok(Json(usage))
}

pub async fn create_avatar(
    State(state): State<Arc<VisioRoutesState>>,
    auth: AuthUser,
    Json(model): Json<CreateAvatarModel>,
) -> Result<impl IntoResponse, AppError> {
    let avatar = state.avatars.create_avatar(auth.user_id, model).await?;
    Ok(Json(avatar))
}

pub async fn get_avatar(
    State(state): State<Arc<VisioRoutesState>>,
    auth: AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let avatar = state.avatars.get_avatar(auth.user_id).await?;
    Ok(Json(avatar))
}

pub async fn generate_idle(
    State(state): State<Arc<VisioRoutesState>>,
    auth: AuthUser,
    Json(model): Json<GenerateIdleModel>,
) -> Result<impl IntoResponse, AppError> {
    let avatar = state
        .avatars
        .generate_idle(auth.user_id, model.duration_seconds)
        .await?;
    Ok(Json(avatar))
}

pub async fn start_session(
    State(state): State<Arc<VisioRoutesState>>,
    auth: AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let session = state.sessions.start(auth.user_id).await?;
    Ok(Json(session))
}

pub async fn get_session(
    State(state): State<Arc<VisioRoutesState>>,
    auth: AuthUser,
    Path(session_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let session = state.sessions.get(auth.user_id, session_id).await?;
    Ok(Json(session))
}

pub async fn begin_recording(
    State(state): State<Arc<VisioRoutesState>>,
    auth: AuthUser,
    Path(session_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let session = state
        .sessions
        .begin_recording(auth.user_id, session_id)
        .await?;
    Ok(Json(session))
}

pub async fn cancel_recording(
    State(state): State<Arc<VisioRoutesState>>,
    auth: AuthUser,
    Path(session_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let session = state
        .sessions
        .cancel_recording(auth.user_id, session_id)
        .await?;
    Ok(Json(session))
}

pub async fn submit_turn(
    State(state): State<Arc<VisioRoutesState>>,
    auth: AuthUser,
    Path(session_id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let mut input = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| AppError::BadRequest(format!("invalid multipart body: {}", err)))?
    {
        if field.name() != Some(AUDIO_FIELD) {
            continue;
        }

        let file_name = field
            .file_name()
            .unwrap_or(DEFAULT_AUDIO_FILE_NAME)
            .to_string();
        let audio = field
            .bytes()
            .await
            .map_err(|err| AppError::BadRequest(format!("failed to read audio: {}", err)))?;

        debug!(%session_id, bytes = audio.len(), %file_name, "visio: audio received");
        input = Some(TurnInput {
            audio: audio.to_vec(),
            file_name,
        });
        break;
    }

    let input = input.ok_or_else(|| AppError::BadRequest("missing `audio` field".to_string()))?;
    let result = state
        .turns
        .run_turn(auth.user_id, session_id, input)
        .await?;
    Ok(Json(result))
}

pub async fn playback_ended(
    State(state): State<Arc<VisioRoutesState>>,
    auth: AuthUser,
    Path(session_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let session = state
        .sessions
        .playback_ended(auth.user_id, session_id)
        .await?;
    Ok(Json(session))
}

pub async fn recover(
    State(state): State<Arc<VisioRoutesState>>,
    auth: AuthUser,
    Path(session_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let session = state.sessions.recover(auth.user_id, session_id).await?;
    Ok(Json(session))
}

pub async fn end_session(
    State(state): State<Arc<VisioRoutesState>>,
    auth: AuthUser,
    Path(session_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let session = state.sessions.end(auth.user_id, session_id).await?;
    Ok(Json(session))
}
