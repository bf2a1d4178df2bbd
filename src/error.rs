use crate::persist::SaveFileError;
use crate::world::WorldError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

/// Errors surfaced by HTTP handlers.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("sign in required")]
    Unauthorized,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("email already registered")]
    EmailTaken,
    #[error("{0}")]
    BadRequest(String),
    #[error(transparent)]
    World(#[from] WorldError),
    #[error("token: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),
    #[error("password hash: {0}")]
    PasswordHash(String),
    #[error(transparent)]
    SaveFile(#[from] SaveFileError),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthorized | AppError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AppError::EmailTaken => StatusCode::CONFLICT,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::World(e) => match e {
                WorldError::EmptyTask | WorldError::EmptyComment => StatusCode::UNPROCESSABLE_ENTITY,
                // A private task looks exactly like a missing one.
                WorldError::TaskNotFound | WorldError::TaskNotPublic | WorldError::CommentNotFound => {
                    StatusCode::NOT_FOUND
                }
                WorldError::NotTaskOwner | WorldError::NotCommentAuthor => StatusCode::FORBIDDEN,
                WorldError::SignedOut => StatusCode::UNAUTHORIZED,
            },
            AppError::Token(_) | AppError::PasswordHash(_) | AppError::SaveFile(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let message = match &self {
            AppError::World(WorldError::TaskNotPublic) => WorldError::TaskNotFound.to_string(),
            other => other.to_string(),
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}
