use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(#[from] DieselError),

    #[error("Connection pool error: {0}")]
    Pool(#[from] diesel::r2d2::PoolError),

    #[error("Blocking task failed: {0}")]
    Blocking(#[from] actix_web::error::BlockingError),

    #[error("Lobby service error: {0}")]
    Lobby(String),

    #[error("{0}")]
    Internal(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
}

impl ApiError {
    /// Message safe to put in a response body. Driver and pool messages can
    /// carry connection details, so server-side failures stay generic.
    pub fn public_message(&self) -> String {
        match self {
            ApiError::BadRequest(msg)
            | ApiError::Unauthorized(msg)
            | ApiError::Forbidden(msg)
            | ApiError::NotFound(msg)
            | ApiError::Conflict(msg) => msg.to_owned(),

            ApiError::Database(DieselError::NotFound) => "Not found".to_string(),

            ApiError::Database(DieselError::DatabaseError(kind, _)) => match kind {
                DatabaseErrorKind::ForeignKeyViolation => {
                    "Operation violates a reference held by another record".to_string()
                }
                DatabaseErrorKind::UniqueViolation => "Record already exists".to_string(),
                DatabaseErrorKind::CheckViolation | DatabaseErrorKind::NotNullViolation => {
                    "Record violates a data constraint".to_string()
                }
                _ => "Internal error".to_string(),
            },

            ApiError::Lobby(_) => "Multiplayer backend unavailable".to_string(),

            _ => "Internal error".to_string(),
        }
    }

    pub fn is_unique_violation(&self) -> bool {
        matches!(
            self,
            ApiError::Database(DieselError::DatabaseError(
                DatabaseErrorKind::UniqueViolation,
                _
            ))
        )
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,

            ApiError::Database(DieselError::NotFound) => StatusCode::NOT_FOUND,

            ApiError::Database(DieselError::DatabaseError(kind, _)) => match kind {
                DatabaseErrorKind::ForeignKeyViolation | DatabaseErrorKind::UniqueViolation => {
                    StatusCode::CONFLICT
                }
                DatabaseErrorKind::CheckViolation | DatabaseErrorKind::NotNullViolation => {
                    StatusCode::BAD_REQUEST
                }
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },

            ApiError::Lobby(_) => StatusCode::BAD_GATEWAY,

            ApiError::Database(_)
            | ApiError::Pool(_)
            | ApiError::Blocking(_)
            | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();

        if status.is_server_error() {
            log::error!("[Server] {}", self);
        } else {
            log::debug!("[Server] {}: {}", status, self);
        }

        HttpResponse::build(status).json(ErrorBody {
            error: &self.public_message(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeInfo(&'static str);

    impl diesel::result::DatabaseErrorInformation for FakeInfo {
        fn message(&self) -> &str {
            self.0
        }
        fn details(&self) -> Option<&str> {
            None
        }
        fn hint(&self) -> Option<&str> {
            None
        }
        fn table_name(&self) -> Option<&str> {
            None
        }
        fn column_name(&self) -> Option<&str> {
            None
        }
        fn constraint_name(&self) -> Option<&str> {
            None
        }
        fn statement_position(&self) -> Option<i32> {
            None
        }
    }

    fn db_error(kind: DatabaseErrorKind, msg: &'static str) -> ApiError {
        ApiError::Database(DieselError::DatabaseError(kind, Box::new(FakeInfo(msg))))
    }

    #[test]
    fn restrict_violation_maps_to_conflict() {
        let err = db_error(
            DatabaseErrorKind::ForeignKeyViolation,
            "update or delete on table \"graphical_assets\" violates foreign key constraint",
        );

        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        assert!(!err.public_message().contains("graphical_assets"));
    }

    #[test]
    fn orm_not_found_maps_to_404() {
        assert_eq!(
            ApiError::Database(DieselError::NotFound).status_code(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn check_violation_is_a_bad_request() {
        let err = db_error(DatabaseErrorKind::CheckViolation, "graphical_assets_lods_without_blob");

        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn unknown_database_errors_do_not_leak_details() {
        let err = db_error(
            DatabaseErrorKind::Unknown,
            "could not connect to postgres://admin:hunter2@db",
        );

        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.public_message(), "Internal error");
    }

    #[test]
    fn unique_violation_is_detected() {
        assert!(db_error(DatabaseErrorKind::UniqueViolation, "dup").is_unique_violation());
        assert!(!ApiError::NotFound("x".to_string()).is_unique_violation());
    }
}
