use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use sqlx::Error as SqlxError;
use std::env::VarError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found")]
    NotFound,

    #[error("Database error: {0}")]
    DatabaseError(#[from] SqlxError),

    #[error("Template error: {0}")]
    TemplateError(#[from] tera::Error),

    #[error("Identity error: {0}")]
    IdentityError(#[from] actix_identity::error::GetIdentityError),

    #[error("Login error: {0}")]
    LoginError(#[from] actix_identity::error::LoginError),

    #[error("Password error: {0}")]
    PasswordError(String),

    #[error("username already exists")]
    UsernameTaken,

    #[error("PDF error: {0}")]
    PdfError(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Environment variable error: {0}")]
    EnvVarError(#[from] VarError),
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound => StatusCode::NOT_FOUND,
            // UsernameTaken is normally turned into a flash + redirect at the
            // handler; reaching here means a handler forgot to.
            AppError::UsernameTaken => StatusCode::CONFLICT,
            AppError::DatabaseError(_)
            | AppError::TemplateError(_)
            | AppError::IdentityError(_)
            | AppError::LoginError(_)
            | AppError::PasswordError(_)
            | AppError::PdfError(_)
            | AppError::SerializationError(_)
            | AppError::IoError(_)
            | AppError::EnvVarError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).body(self.to_string())
    }
}

impl From<AppError> for std::io::Error {
    fn from(err: AppError) -> Self {
        std::io::Error::new(std::io::ErrorKind::Other, err.to_string())
    }
}
