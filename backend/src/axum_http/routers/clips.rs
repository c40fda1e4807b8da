use std::sync::Arc;

use axum::{Json, Router, extract::State, response::IntoResponse, routing::post};
use crates::domain::value_objects::clips::GenerateClipModel;

use crate::{auth::AuthUser, axum_http::error_responses::AppError, usecases::clips::ClipUseCase};

pub fn routes(clip_usecase: Arc<ClipUseCase>) -> Router {
    Router::new()
        .route("/", post(generate_clip))
        .with_state(clip_usecase)
}

pub async fn generate_clip(
    State(clip_usecase): State<Arc<ClipUseCase>>,
    auth: AuthUser,
    Json(model): Json<GenerateClipModel>,
) -> Result<impl IntoResponse, AppError> {
    let clip = clip_usecase.generate_clip(auth.user_id, model).await?;
    Ok(Json(clip))
}
