use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;
use uuid::Uuid;

use crate::models::vacation::VacationStatus;

/// Postgres SQLSTATE for `exclusion_violation`.
const EXCLUSION_VIOLATION: &str = "23P01";

#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("Insufficient permissions")]
    Forbidden,

    #[error("End date must be after start date")]
    InvalidDateRange,

    #[error("Employee {0} not found")]
    EmployeeNotFound(Uuid),

    #[error("Replacement employee {0} not found")]
    ReplacementNotFound(Uuid),

    #[error("Request overlaps an existing vacation for this employee")]
    OverlappingRequest { conflicting_id: Option<Uuid> },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Cannot {action} a request in status {from}")]
    InvalidTransition {
        from: VacationStatus,
        action: &'static str,
    },

    #[error("Only pending requests can be edited (current status: {0})")]
    ImmutableState(VacationStatus),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Stable machine-readable kind, sent to clients alongside the message.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Unauthorized => "Unauthorized",
            AppError::Forbidden => "Forbidden",
            AppError::InvalidDateRange => "InvalidDateRange",
            AppError::EmployeeNotFound(_) => "EmployeeNotFound",
            AppError::ReplacementNotFound(_) => "ReplacementNotFound",
            AppError::OverlappingRequest { .. } => "OverlappingRequest",
            AppError::NotFound(_) => "NotFound",
            AppError::InvalidTransition { .. } => "InvalidTransition",
            AppError::ImmutableState(_) => "ImmutableState",
            AppError::Validation(_) => "ValidationError",
            AppError::BadRequest(_) => "BadRequest",
            AppError::StoreUnavailable(_) => "StoreUnavailable",
            AppError::Internal(_) => "Internal",
        }
    }

    /// Maps a write failure, turning the overlap exclusion constraint into
    /// `OverlappingRequest` instead of a store outage.
    pub fn from_write(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db_err) = e {
            if db_err.code().as_deref() == Some(EXCLUSION_VIOLATION) {
                tracing::warn!("Overlap exclusion constraint hit: {}", db_err.message());
                return AppError::OverlappingRequest {
                    conflicting_id: None,
                };
            }
        }
        AppError::StoreUnavailable(e)
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::InvalidDateRange
            | AppError::InvalidTransition { .. }
            | AppError::ImmutableState(_)
            | AppError::Validation(_)
            | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::EmployeeNotFound(_)
            | AppError::ReplacementNotFound(_)
            | AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::OverlappingRequest { .. } => StatusCode::CONFLICT,
            AppError::StoreUnavailable(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let message = match &self {
            AppError::NotFound(msg) | AppError::BadRequest(msg) => msg.clone(),
            AppError::Validation(e) => {
                let mut messages: Vec<String> = e
                    .field_errors()
                    .into_iter()
                    .map(|(field, errors)| {
                        let msgs: Vec<&str> = errors
                            .iter()
                            .filter_map(|err| err.message.as_ref().map(|m| m.as_ref()))
                            .collect();
                        if msgs.is_empty() {
                            let codes: Vec<&str> =
                                errors.iter().map(|err| err.code.as_ref()).collect();
                            format!("{}: {}", field, codes.join(", "))
                        } else {
                            format!("{}: {}", field, msgs.join(", "))
                        }
                    })
                    .collect();
                messages.sort();
                messages.join("; ")
            }
            AppError::StoreUnavailable(e) => {
                tracing::error!("Store error: {:?}", e);
                "Store unavailable".into()
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {:?}", e);
                "Internal server error".into()
            }
            _ => self.to_string(),
        };

        let mut body = json!({ "error": self.kind(), "message": message });
        if let AppError::OverlappingRequest {
            conflicting_id: Some(id),
        } = &self
        {
            body["conflictingId"] = json!(id);
        }

        (self.status_code(), Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
