use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use validator::ValidationErrors;

pub type ServerResult<T> = Result<T, ServerError>;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("{resource}:{identifier} not found")]
    NotFound {
        resource: &'static str,
        identifier: String,
    },
    #[error("Malformed message: {0}")]
    MalformedMessage(String),
    #[error("Invalid message: {0}")]
    InvalidMessage(String),
    #[error("Invalid frontend origin \"{0}\"")]
    InvalidOrigin(String),
    #[error("Could not listen on port {port}: {reason}")]
    Bind { port: u16, reason: String },
    #[error("Unknown internal error: {0}")]
    Unknown(String),
}

impl ServerError {
    fn as_status_code(&self) -> StatusCode {
        match self {
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::MalformedMessage(_) | Self::InvalidMessage(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        (self.as_status_code(), self.to_string()).into_response()
    }
}

impl From<serde_json::Error> for ServerError {
    fn from(value: serde_json::Error) -> Self {
        Self::MalformedMessage(value.to_string())
    }
}

impl From<ValidationErrors> for ServerError {
    fn from(value: ValidationErrors) -> Self {
        Self::InvalidMessage(value.to_string())
    }
}
