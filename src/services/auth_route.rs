// sub-route "/auth"
use actix_web::web::{self, Data, Json};
use actix_web::{get, post, HttpResponse};
use serde::Deserialize;
use serde_json::json;

use crate::errors::{ServiceError, ServiceResult};
use crate::services::auth::{hash_password, validate_password, verify_password, AuthUser};
use crate::services::db_utils::{dispatch, AppState};
use crate::services::insertable::NewUser;
use crate::services::messages::{FetchUser, FindUserByEmail, RegisterUser};
use crate::services::redis_handling::{issue_tokens, refresh_access_token, revoke_refresh_token, TokenClaims};

#[derive(Deserialize)]
pub struct RegisterBody {
    pub email: String,
    pub password: String,
    pub username: Option<String>,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub institute: String,
}

fn required(field: &str, value: Option<String>) -> ServiceResult<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ServiceError::validation(field, "This field is required.")),
    }
}

pub fn normalize_email(email: &str) -> ServiceResult<String> {
    let email = email.trim().to_lowercase();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(email),
        _ => Err(ServiceError::validation("email", "Enter a valid email address.")),
    }
}

/// Argon2 is slow on purpose; keep it off the async workers.
pub async fn hash_off_thread(password: String) -> ServiceResult<String> {
    web::block(move || hash_password(&password))
        .await
        .map_err(|err| ServiceError::Internal(format!("Password hashing was interrupted: {err}")))?
}

/// Creates a student account and logs it in; shared with `POST /users`.
pub async fn register(state: &AppState, body: RegisterBody) -> ServiceResult<HttpResponse> {
    let email = normalize_email(&body.email)?;
    validate_password(&body.password)?;
    let password_hash = hash_off_thread(body.password).await?;

    let username = match body.username {
        Some(name) if !name.trim().is_empty() => name.trim().to_owned(),
        _ => email.clone(),
    };

    let user = dispatch(
        &state.pg_db,
        RegisterUser(NewUser {
            email,
            username,
            password_hash,
            first_name: body.first_name.trim().to_owned(),
            last_name: body.last_name.trim().to_owned(),
            institute: body.institute.trim().to_owned(),
            is_staff: false,
        }),
    )
    .await?;

    let tokens = issue_tokens(&state.redis_db, &state.auth, TokenClaims { user_id: user.id, is_staff: user.is_staff })
        .await?;

    Ok(HttpResponse::Created().json(json!({
        "user": user,
        "access": tokens.access,
        "refresh": tokens.refresh,
    })))
}

#[post("/register")]
pub async fn register_user(state: Data<AppState>, body: Json<RegisterBody>) -> ServiceResult<HttpResponse> {
    register(&state, body.into_inner()).await
}

#[derive(Deserialize)]
pub struct ObtainBody {
    pub username: Option<String>,
    pub password: Option<String>,
}

#[post("/token/obtain")]
pub async fn obtain_token(state: Data<AppState>, body: Json<ObtainBody>) -> ServiceResult<HttpResponse> {
    let body = body.into_inner();
    let email = required("username", body.username)?;
    let password = required("password", body.password)?;

    let Some(user) = dispatch(&state.pg_db, FindUserByEmail(email)).await? else {
        tracing::warn!("login failed: unknown account");
        return Err(ServiceError::InvalidCredentials);
    };

    let stored_hash = user.password_hash.clone();
    let verified = web::block(move || verify_password(&password, &stored_hash))
        .await
        .map_err(|err| ServiceError::Internal(format!("Password check was interrupted: {err}")))?;
    if !verified {
        tracing::warn!(user_id = user.id, "login failed: wrong password");
        return Err(ServiceError::InvalidCredentials);
    }

    let tokens = issue_tokens(&state.redis_db, &state.auth, TokenClaims { user_id: user.id, is_staff: user.is_staff })
        .await?;
    tracing::info!(user_id = user.id, "login succeeded");

    Ok(HttpResponse::Ok().json(json!({
        "access": tokens.access,
        "refresh": tokens.refresh,
        "user": user,
    })))
}

#[derive(Deserialize)]
pub struct RefreshBody {
    pub refresh: Option<String>,
}

#[post("/token/refresh")]
pub async fn refresh_token(state: Data<AppState>, body: Json<RefreshBody>) -> ServiceResult<HttpResponse> {
    let refresh = required("refresh", body.into_inner().refresh)?;
    let access = refresh_access_token(&state.redis_db, &state.auth, &refresh).await?;

    Ok(HttpResponse::Ok().json(json!({ "access": access })))
}

#[derive(Deserialize)]
pub struct LogoutBody {
    pub refresh_token: Option<String>,
}

#[post("/logout")]
pub async fn logout(state: Data<AppState>, _user: AuthUser, body: Json<LogoutBody>) -> ServiceResult<HttpResponse> {
    let refresh = required("refresh_token", body.into_inner().refresh_token)?;

    if !revoke_refresh_token(&state.redis_db, &refresh).await? {
        return Err(ServiceError::validation("refresh_token", "Token is invalid or expired."));
    }

    Ok(HttpResponse::Ok().json(json!({ "detail": "Successfully logged out." })))
}

#[get("/me")]
pub async fn me(state: Data<AppState>, user: AuthUser) -> ServiceResult<HttpResponse> {
    let account = dispatch(&state.pg_db, FetchUser(user.id)).await?;

    Ok(HttpResponse::Ok().json(account))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emails_are_trimmed_and_lowercased() {
        assert_eq!(normalize_email("  Awa@Example.COM ").unwrap(), "awa@example.com");
        assert!(normalize_email("no-at-sign").is_err());
        assert!(normalize_email("@example.com").is_err());
        assert!(normalize_email("awa@").is_err());
    }

    #[test]
    fn blank_required_fields_are_rejected() {
        assert!(required("password", None).is_err());
        assert!(required("password", Some("  ".into())).is_err());
        assert_eq!(required("password", Some("secret".into())).unwrap(), "secret");
    }
}
