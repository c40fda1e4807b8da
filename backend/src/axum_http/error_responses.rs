use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use crates::domain::errors::VisioError;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: u16,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error(transparent)]
    Visio(#[from] VisioError),

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    fn status_and_message(self) -> (StatusCode, String) {
        match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            AppError::Visio(err) => visio_status(err),
            AppError::Internal(err) => internal(err),
        }
    }
}

fn visio_status(err: VisioError) -> (StatusCode, String) {
    let status = match err {
        VisioError::Internal(inner) => return internal(inner),
        VisioError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        VisioError::NotFound(_) => StatusCode::NOT_FOUND,
        VisioError::InvalidTransition { .. } | VisioError::SessionEnded(_) => StatusCode::CONFLICT,
        VisioError::QuotaExceeded { .. } | VisioError::InsufficientCredits { .. } => {
            StatusCode::PAYMENT_REQUIRED
        }
        VisioError::NotSupported(_) => StatusCode::NOT_IMPLEMENTED,
        VisioError::Config(_) => StatusCode::SERVICE_UNAVAILABLE,
        VisioError::Upload(_) | VisioError::Generate(_) => StatusCode::BAD_GATEWAY,
        VisioError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
    };

    (status, err.to_string())
}

fn internal(err: anyhow::Error) -> (StatusCode, String) {
    error!(error = ?err, "http: internal error");
    // Don't leak internal error detail to client
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal server error".to_string(),
    )
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();

        let body = Json(ErrorResponse {
            code: status.as_u16(),
            message,
        });

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crates::domain::value_objects::enums::visio_states::VisioState;

    fn status_of(err: VisioError) -> StatusCode {
        AppError::from(err).into_response().status()
    }

    #[test]
    fn maps_domain_errors_to_status_codes() {
        assert_eq!(
            status_of(VisioError::InvalidTransition {
                from: VisioState::Idle,
                to: VisioState::Talking
            }),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(VisioError::QuotaExceeded {
                remaining_seconds: 0
            }),
            StatusCode::PAYMENT_REQUIRED
        );
        assert_eq!(
            status_of(VisioError::InsufficientCredits {
                balance: 0,
                required: 1
            }),
            StatusCode::PAYMENT_REQUIRED
        );
        assert_eq!(
            status_of(VisioError::Timeout {
                job_id: "j".into(),
                waited_ms: 1
            }),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            status_of(VisioError::NotSupported("idle".into())),
            StatusCode::NOT_IMPLEMENTED
        );
        assert_eq!(
            status_of(VisioError::Config("key".into())),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn internal_errors_hide_detail() {
        let (status, message) =
            AppError::from(VisioError::Internal(anyhow::anyhow!("pool exhausted")))
                .status_and_message();

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(message, "Internal server error");
    }
}
