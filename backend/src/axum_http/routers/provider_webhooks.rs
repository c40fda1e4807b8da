use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::post,
};
use crates::{
    providers::{ProviderError, ProviderKind, VideoAvatarProvider},
    reconcilers::job_registry::{CallbackOutcome, JobRegistry},
};
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::axum_http::error_responses::AppError;

#[derive(Clone)]
pub struct WebhookState {
    pub provider: Arc<dyn VideoAvatarProvider>,
    pub registry: Arc<JobRegistry>,
}

/// Unauthenticated: providers call these directly.
pub fn routes(state: WebhookState) -> Router {
    Router::new()
        .route("/:provider", post(receive_callback))
        .with_state(Arc::new(state))
}

/// Answers 200 for every parseable payload, including unknown and duplicate job ids, so
/// providers stop retrying.
pub async fn receive_callback(
    State(state): State<Arc<WebhookState>>,
    Path(provider_name): Path<String>,
    Json(payload): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    let Some(kind) = ProviderKind::from_str(&provider_name) else {
        return Err(AppError::NotFound(format!("provider {}", provider_name)));
    };
    if kind.as_str() != state.provider.name() {
        warn!(
            provider = kind.as_str(),
            active = state.provider.name(),
            "webhooks: callback for inactive provider"
        );
        return Err(AppError::NotFound(format!("provider {}", kind.as_str())));
    }

    let update = match state.provider.parse_callback(&payload) {
        Ok(update) => update,
        Err(ProviderError::NotSupported(message)) => return Err(AppError::NotFound(message)),
        Err(err) => {
            warn!(provider = kind.as_str(), error = %err, "webhooks: rejected payload");
            return Err(AppError::BadRequest(err.to_string()));
        }
    };

    let job_id = update.job_id.clone();
    match state.registry.update_from_callback(update) {
        CallbackOutcome::Applied(job) => {
            info!(provider = kind.as_str(), %job_id, status = %job.status(), "webhooks: job resolved");
        }
        CallbackOutcome::Late(job) => {
            warn!(
                provider = kind.as_str(),
                %job_id,
                status = %job.status(),
                "webhooks: result arrived after the turn gave up, not charged"
            );
        }
        CallbackOutcome::AlreadyTerminal(_) => {
            debug!(provider = kind.as_str(), %job_id, "webhooks: duplicate delivery ignored");
        }
        CallbackOutcome::NotTerminal => {
            debug!(provider = kind.as_str(), %job_id, "webhooks: progress update stored");
        }
        CallbackOutcome::Buffered => {
            info!(provider = kind.as_str(), %job_id, "webhooks: result held until the job is registered");
        }
        CallbackOutcome::UnknownJob => {
            warn!(provider = kind.as_str(), %job_id, "webhooks: unknown job id");
        }
    }

    Ok((StatusCode::OK, Json(json!({ "received": true }))))
}
