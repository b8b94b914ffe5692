use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use sqlx::Error as SqlxError;
use std::env::VarError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    DatabaseError(SqlxError),

    #[error("Migration error: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

    #[error("Template error: {0}")]
    TemplateError(#[from] tera::Error),

    #[error("Not found")]
    NotFound,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Un paiement existe déjà pour ce locataire et ce mois")]
    DuplicatePayment,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Password error: {0}")]
    PasswordError(String),

    #[error("Identity error: {0}")]
    IdentityError(String),

    #[error("Session error: {0}")]
    SessionError(#[from] actix_session::SessionInsertError),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Environment variable error: {0}")]
    EnvVarError(#[from] VarError),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl From<SqlxError> for AppError {
    fn from(err: SqlxError) -> Self {
        match err {
            SqlxError::RowNotFound => AppError::NotFound,
            other => AppError::DatabaseError(other),
        }
    }
}

impl AppError {
    /// Maps a unique-constraint violation to [`AppError::DuplicatePayment`].
    pub fn duplicate_payment_or(err: SqlxError) -> Self {
        match &err {
            SqlxError::Database(db) if db.is_unique_violation() => AppError::DuplicatePayment,
            _ => AppError::from(err),
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::DuplicatePayment => StatusCode::BAD_REQUEST,
            AppError::Unauthorized => StatusCode::SEE_OTHER,
            AppError::DatabaseError(_)
            | AppError::MigrationError(_)
            | AppError::TemplateError(_)
            | AppError::PasswordError(_)
            | AppError::IdentityError(_)
            | AppError::SessionError(_)
            | AppError::ConfigError(_)
            | AppError::IoError(_)
            | AppError::EnvVarError(_)
            | AppError::JsonError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            AppError::Unauthorized => HttpResponse::SeeOther()
                .append_header(("Location", "/login"))
                .finish(),
            AppError::NotFound => HttpResponse::NotFound().body("Page introuvable"),
            _ if self.status_code().is_server_error() => {
                log::error!("{}", self);
                HttpResponse::build(self.status_code()).body("Erreur interne du serveur")
            }
            _ => HttpResponse::build(self.status_code()).body(self.to_string()),
        }
    }
}

impl From<AppError> for std::io::Error {
    fn from(err: AppError) -> Self {
        std::io::Error::new(std::io::ErrorKind::Other, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes() {
        assert_eq!(AppError::NotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::DuplicatePayment.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::Unauthorized.status_code(), StatusCode::SEE_OTHER);
        assert_eq!(
            AppError::from(SqlxError::RowNotFound).status_code(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn unauthorized_redirects_to_login() {
        let resp = AppError::Unauthorized.error_response();
        assert_eq!(resp.headers().get("Location").unwrap(), "/login");
    }
}
