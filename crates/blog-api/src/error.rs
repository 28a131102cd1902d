use axum::{
    Json,
    http::{StatusCode, header},
    response::{IntoResponse, Redirect, Response},
};
use serde::Serialize;
use tracing::error;

use crate::token::TokenError;

/// Where unauthenticated browsers are sent.
pub const LOGIN_PATH: &str = "/auth/login";

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("incorrect username or password")]
    InvalidCredentials,

    #[error("username already registered")]
    UsernameTaken,

    #[error("email already registered")]
    EmailTaken,

    /// Neither the header nor the cookie carried a bearer token.
    #[error("not authenticated")]
    NoCredential,

    #[error("could not validate credentials")]
    InvalidToken,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("forbidden: {0}")]
    Forbidden(&'static str),

    #[error("file exceeds the {limit_mib} MiB upload limit")]
    PayloadTooLarge { limit_mib: usize },

    #[error("file type not allowed: {0}")]
    UnsupportedType(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("failed to store file: {0}")]
    StorageWriteFailure(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::UsernameTaken => "USERNAME_TAKEN",
            Self::EmailTaken => "EMAIL_TAKEN",
            Self::NoCredential => "NO_CREDENTIAL",
            Self::InvalidToken => "INVALID_TOKEN",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::PayloadTooLarge { .. } => "PAYLOAD_TOO_LARGE",
            Self::UnsupportedType(_) => "UNSUPPORTED_TYPE",
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::StorageWriteFailure(_) => "STORAGE_WRITE_FAILURE",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidCredentials | Self::InvalidToken => StatusCode::UNAUTHORIZED,
            Self::UsernameTaken | Self::NoCredential => StatusCode::SEE_OTHER,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::EmailTaken
            | Self::PayloadTooLarge { .. }
            | Self::UnsupportedType(_)
            | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::StorageWriteFailure(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<TokenError> for ApiError {
    fn from(_: TokenError) -> Self {
        ApiError::InvalidToken
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if matches!(self, Self::NoCredential | Self::UsernameTaken) {
            return Redirect::to(LOGIN_PATH).into_response();
        }

        let status = self.status();
        let message = match &self {
            Self::Internal(e) => {
                error!("Internal error: {:#}", e);
                "internal server error".to_string()
            }
            Self::StorageWriteFailure(msg) => {
                error!("Media write failed: {}", msg);
                self.to_string()
            }
            other => other.to_string(),
        };

        let body = Json(ErrorResponse {
            error: ErrorBody {
                code: self.code(),
                message,
            },
        });

        if status == StatusCode::UNAUTHORIZED {
            return (status, [(header::WWW_AUTHENTICATE, "Bearer")], body).into_response();
        }
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redirects_for_missing_credential() {
        let resp = ApiError::NoCredential.into_response();
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(resp.headers()[header::LOCATION], LOGIN_PATH);
    }

    #[test]
    fn unauthorized_carries_challenge() {
        let resp = ApiError::InvalidToken.into_response();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(resp.headers()[header::WWW_AUTHENTICATE], "Bearer");
    }

    #[test]
    fn status_mapping() {
        assert_eq!(ApiError::Forbidden("x").status(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::NotFound("Card").status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::PayloadTooLarge { limit_mib: 10 }.status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::StorageWriteFailure("disk full".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
