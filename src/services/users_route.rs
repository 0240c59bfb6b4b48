// sub-route "/users"
use actix_web::web::{Data, Json, Path};
use actix_web::{delete, get, post, put, HttpResponse};
use serde::Deserialize;

use crate::errors::ServiceResult;
use crate::services::auth::{validate_password, AuthUser};
use crate::services::auth_route::{hash_off_thread, register, RegisterBody};
use crate::services::db_utils::{dispatch, AppState};
use crate::services::insertable::UserChanges;
use crate::services::messages::{DeleteUser, FetchUser, FetchUsers, UpdateUser};

#[derive(Deserialize)]
pub struct UpdateUserBody {
    pub username: Option<String>,
    pub password: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub institute: Option<String>,
}

async fn apply_update(state: &AppState, id: i64, body: UpdateUserBody) -> ServiceResult<HttpResponse> {
    let password_hash = match body.password {
        Some(password) => {
            validate_password(&password)?;
            Some(hash_off_thread(password).await?)
        }
        None => None,
    };

    let changes = UserChanges {
        username: body.username.map(|v| v.trim().to_owned()),
        password_hash,
        first_name: body.first_name.map(|v| v.trim().to_owned()),
        last_name: body.last_name.map(|v| v.trim().to_owned()),
        institute: body.institute.map(|v| v.trim().to_owned()),
    };
    let user = dispatch(&state.pg_db, UpdateUser { id, changes }).await?;

    Ok(HttpResponse::Ok().json(user))
}

#[get("")]
pub async fn fetch_users(state: Data<AppState>, _user: AuthUser) -> ServiceResult<HttpResponse> {
    let users = dispatch(&state.pg_db, FetchUsers).await?;

    Ok(HttpResponse::Ok().json(users))
}

#[post("")]
pub async fn create_user(state: Data<AppState>, body: Json<RegisterBody>) -> ServiceResult<HttpResponse> {
    register(&state, body.into_inner()).await
}

#[get("/me")]
pub async fn fetch_me(state: Data<AppState>, user: AuthUser) -> ServiceResult<HttpResponse> {
    let account = dispatch(&state.pg_db, FetchUser(user.id)).await?;

    Ok(HttpResponse::Ok().json(account))
}

#[put("/me")]
pub async fn update_me(state: Data<AppState>, user: AuthUser, body: Json<UpdateUserBody>) -> ServiceResult<HttpResponse> {
    apply_update(&state, user.id, body.into_inner()).await
}

#[get("/{id}")]
pub async fn fetch_user(state: Data<AppState>, _user: AuthUser, path: Path<i64>) -> ServiceResult<HttpResponse> {
    let account = dispatch(&state.pg_db, FetchUser(path.into_inner())).await?;

    Ok(HttpResponse::Ok().json(account))
}

#[put("/{id}")]
pub async fn update_user(
    state: Data<AppState>,
    user: AuthUser,
    path: Path<i64>,
    body: Json<UpdateUserBody>,
) -> ServiceResult<HttpResponse> {
    let id = path.into_inner();
    user.require_self_or_staff(id)?;

    apply_update(&state, id, body.into_inner()).await
}

#[delete("/{id}")]
pub async fn delete_user(state: Data<AppState>, user: AuthUser, path: Path<i64>) -> ServiceResult<HttpResponse> {
    user.require_staff()?;
    dispatch(&state.pg_db, DeleteUser(path.into_inner())).await?;

    Ok(HttpResponse::NoContent().finish())
}
