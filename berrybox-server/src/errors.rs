use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use berrybox_collab::{DatabaseError, EngineError};
use berrybox_core::QueueError;
use log::error;
use thiserror::Error;

pub type ServerResult<T> = Result<T, ServerError>;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("{resource}:{identifier} not found")]
    NotFound {
        resource: &'static str,
        identifier: String,
    },
    #[error("{resource} with {field} of value {value} already exists")]
    Conflict {
        resource: &'static str,
        field: &'static str,
        value: String,
    },
    #[error("{0} was modified concurrently, try again")]
    Stale(&'static str),
    #[error(transparent)]
    Queue(#[from] QueueError),
    #[error("{0}")]
    BadRequest(String),
    #[error("Unknown internal error: {0}")]
    Unknown(String),
}

impl ServerError {
    fn as_status_code(&self) -> StatusCode {
        match self {
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Conflict { .. } | Self::Stale(_) => StatusCode::CONFLICT,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Queue(error) => queue_status_code(error),
            Self::Unknown(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

fn queue_status_code(error: &QueueError) -> StatusCode {
    match error {
        QueueError::BoxNotFound | QueueError::ItemNotFound => StatusCode::NOT_FOUND,
        QueueError::Unauthorized(_) => StatusCode::FORBIDDEN,
        QueueError::InsufficientBerries { .. } => StatusCode::PAYMENT_REQUIRED,
        QueueError::DurationExceeded { .. } | QueueError::VideoUnresolvable(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        QueueError::BoxClosed
        | QueueError::ItemAlreadyPlaying
        | QueueError::ItemAlreadyPlayed
        | QueueError::PreselectionLocked
        | QueueError::ForcePlayLocked
        | QueueError::SkipLocked => StatusCode::CONFLICT,
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.as_status_code();

        if status.is_server_error() {
            error!("Request failed: {}", self);
        }

        (status, self.to_string()).into_response()
    }
}

impl From<DatabaseError> for ServerError {
    fn from(value: DatabaseError) -> Self {
        match value {
            DatabaseError::NotFound {
                resource,
                identifier,
            } => Self::NotFound {
                resource,
                identifier,
            },
            DatabaseError::Conflict {
                resource,
                field,
                value,
            } => Self::Conflict {
                resource,
                field,
                value,
            },
            DatabaseError::Stale { resource, .. } => Self::Stale(resource),
            e => Self::Unknown(e.to_string()),
        }
    }
}

impl From<EngineError> for ServerError {
    fn from(value: EngineError) -> Self {
        match value {
            EngineError::Queue(error) => error.into(),
            EngineError::Database(error) => error.into(),
        }
    }
}
