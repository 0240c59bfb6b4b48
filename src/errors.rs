use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use serde_json::json;
use thiserror::Error;

pub const NON_FIELD_ERRORS: &str = "non_field_errors";

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("{field}: {message}")]
    Validation { field: String, message: String },

    #[error("Incorrect email or password.")]
    InvalidCredentials,

    #[error("Authentication credentials were not provided or are invalid.")]
    Unauthorized,

    #[error("You do not have permission to perform this action.")]
    Forbidden,

    #[error("{0} not found.")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(DieselError),

    #[error("Connection pool error: {0}")]
    Pool(#[from] diesel::r2d2::PoolError),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Database actor unavailable: {0}")]
    Mailbox(#[from] actix::MailboxError),

    #[error("An error occurred while creating the reservation.")]
    ReservationFailed,

    /// Logged in full; clients only see a generic message.
    #[error("{0}")]
    Internal(String),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

impl ServiceError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        ServiceError::Validation { field: field.into(), message: message.into() }
    }

    pub fn non_field(message: impl Into<String>) -> Self {
        ServiceError::validation(NON_FIELD_ERRORS, message)
    }

    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }
}

impl From<DieselError> for ServiceError {
    fn from(err: DieselError) -> Self {
        match err {
            DieselError::NotFound => ServiceError::NotFound("Record".into()),
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
                ServiceError::non_field(format!("Duplicate value: {}", info.message()))
            }
            other => ServiceError::Database(other),
        }
    }
}

impl ResponseError for ServiceError {
    fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::Validation { .. } | ServiceError::InvalidCredentials => StatusCode::BAD_REQUEST,
            ServiceError::Unauthorized => StatusCode::UNAUTHORIZED,
            ServiceError::Forbidden => StatusCode::FORBIDDEN,
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::Database(_)
            | ServiceError::Pool(_)
            | ServiceError::Redis(_)
            | ServiceError::Mailbox(_)
            | ServiceError::ReservationFailed
            | ServiceError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            ServiceError::Validation { field, message } => json!({ field.as_str(): [message] }),
            ServiceError::ReservationFailed => json!({ "detail": self.to_string() }),
            err if err.is_server_error() => {
                tracing::error!(error = %err, "request failed");
                json!({ "detail": "A server error occurred." })
            }
            err => json!({ "detail": err.to_string() }),
        };

        HttpResponse::build(self.status_code()).json(body)
    }
}

#[cfg(test)]
mod tests {
    use actix_web::body::to_bytes;

    use super::*;

    async fn body_of(err: ServiceError) -> serde_json::Value {
        let bytes = to_bytes(err.error_response().into_body()).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[actix_web::test]
    async fn validation_names_the_offending_field() {
        let err = ServiceError::validation("quantity", "Only 2 servings left.");
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(body_of(err).await, json!({ "quantity": ["Only 2 servings left."] }));
    }

    #[actix_web::test]
    async fn server_errors_do_not_leak_details() {
        let err = ServiceError::Database(DieselError::RollbackTransaction);
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_of(err).await, json!({ "detail": "A server error occurred." }));
    }

    #[actix_web::test]
    async fn internal_messages_stay_in_the_logs() {
        let err = ServiceError::Internal("Failed to hash password: salt too short".into());
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_of(err).await, json!({ "detail": "A server error occurred." }));
    }

    #[actix_web::test]
    async fn reservation_failure_has_its_own_message() {
        let err = ServiceError::ReservationFailed;
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body_of(err).await,
            json!({ "detail": "An error occurred while creating the reservation." })
        );
    }

    #[test]
    fn diesel_not_found_maps_to_404() {
        let err: ServiceError = DieselError::NotFound.into();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn credentials_message_is_uniform() {
        assert_eq!(ServiceError::InvalidCredentials.to_string(), "Incorrect email or password.");
        assert_eq!(ServiceError::InvalidCredentials.status_code(), StatusCode::BAD_REQUEST);
    }
}
