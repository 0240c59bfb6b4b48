use actix_web::dev::Payload;
use actix_web::http::header::AUTHORIZATION;
use actix_web::web::Data;
use actix_web::{FromRequest, HttpRequest};
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use futures::future::LocalBoxFuture;

use crate::errors::{ServiceError, ServiceResult};
use crate::services::db_utils::AppState;
use crate::services::messages::Viewer;
use crate::services::redis_handling::resolve_access_token;

pub const MIN_PASSWORD_LEN: usize = 8;

/// The caller behind a valid bearer access token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser {
    pub id: i64,
    pub is_staff: bool,
}

impl AuthUser {
    pub fn viewer(&self) -> Viewer {
        Viewer { user_id: self.id, is_staff: self.is_staff }
    }

    pub fn require_staff(&self) -> ServiceResult<()> {
        if self.is_staff {
            Ok(())
        } else {
            Err(ServiceError::Forbidden)
        }
    }

    /// Reservations and reviews are made by students for themselves.
    pub fn require_student(&self) -> ServiceResult<()> {
        if self.is_staff {
            Err(ServiceError::Forbidden)
        } else {
            Ok(())
        }
    }

    /// Staff may act on anyone; students only on themselves.
    pub fn require_self_or_staff(&self, user_id: i64) -> ServiceResult<()> {
        if self.is_staff || self.id == user_id {
            Ok(())
        } else {
            Err(ServiceError::Forbidden)
        }
    }
}

fn bearer_token(req: &HttpRequest) -> Option<String> {
    let header = req.headers().get(AUTHORIZATION)?.to_str().ok()?;
    let token = header.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_owned())
    }
}

impl FromRequest for AuthUser {
    type Error = ServiceError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let token = bearer_token(req);
        let state = req.app_data::<Data<AppState>>().cloned();

        Box::pin(async move {
            let token = token.ok_or(ServiceError::Unauthorized)?;
            let state = state.ok_or_else(|| ServiceError::Internal("Application state is missing".into()))?;

            match resolve_access_token(&state.redis_db, &token).await? {
                Some(claims) => Ok(AuthUser { id: claims.user_id, is_staff: claims.is_staff }),
                None => Err(ServiceError::Unauthorized),
            }
        })
    }
}

pub fn validate_password(password: &str) -> ServiceResult<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ServiceError::validation(
            "password",
            format!("This password is too short. It must contain at least {MIN_PASSWORD_LEN} characters."),
        ));
    }
    if password.chars().all(|c| c.is_ascii_digit()) {
        return Err(ServiceError::validation("password", "This password is entirely numeric."));
    }
    Ok(())
}

pub fn hash_password(password: &str) -> ServiceResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| ServiceError::Internal(format!("Failed to hash password: {err}")))
}

pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok(),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use actix_web::test::TestRequest;

    use super::*;

    #[test]
    fn hashes_verify_only_the_hashed_password() {
        let hash = hash_password("correct horse").unwrap();
        assert_ne!(hash, "correct horse");
        assert!(verify_password("correct horse", &hash));
        assert!(!verify_password("wrong horse", &hash));
        assert!(!verify_password("correct horse", "not-a-hash"));
    }

    #[test]
    fn weak_passwords_are_rejected() {
        assert!(validate_password("short").is_err());
        assert!(validate_password("12345678").is_err());
        assert!(validate_password("canteen-2024").is_ok());
    }

    #[test]
    fn bearer_token_is_extracted() {
        let req = TestRequest::default()
            .insert_header((AUTHORIZATION, "Bearer abc.def"))
            .to_http_request();
        assert_eq!(bearer_token(&req).as_deref(), Some("abc.def"));

        let req = TestRequest::default().insert_header((AUTHORIZATION, "Basic xyz")).to_http_request();
        assert_eq!(bearer_token(&req), None);

        let req = TestRequest::default().insert_header((AUTHORIZATION, "Bearer ")).to_http_request();
        assert_eq!(bearer_token(&req), None);
    }

    #[test]
    fn staff_checks() {
        let student = AuthUser { id: 3, is_staff: false };
        let staff = AuthUser { id: 1, is_staff: true };
        assert!(student.require_staff().is_err());
        assert!(staff.require_staff().is_ok());
        assert!(student.require_self_or_staff(3).is_ok());
        assert!(student.require_self_or_staff(4).is_err());
        assert!(staff.require_self_or_staff(4).is_ok());
    }

    #[test]
    fn staff_cannot_act_as_students() {
        let student = AuthUser { id: 3, is_staff: false };
        let staff = AuthUser { id: 1, is_staff: true };
        assert!(student.require_student().is_ok());
        assert!(matches!(staff.require_student(), Err(ServiceError::Forbidden)));
    }
}
