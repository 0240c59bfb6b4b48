// sub-route "/parameters", staff only
use actix_web::web::{Data, Json, Path};
use actix_web::{delete, get, post, put, HttpResponse};

use crate::errors::ServiceResult;
use crate::services::auth::AuthUser;
use crate::services::db_utils::{dispatch, AppState};
use crate::services::insertable::{NewParameter, ParameterChanges};
use crate::services::messages::{CreateParameter, DeleteParameter, FetchParameter, FetchParameters, UpdateParameter};

#[get("")]
pub async fn fetch_parameters(state: Data<AppState>, user: AuthUser) -> ServiceResult<HttpResponse> {
    user.require_staff()?;
    let parameters = dispatch(&state.pg_db, FetchParameters).await?;

    Ok(HttpResponse::Ok().json(parameters))
}

#[get("/{id}")]
pub async fn get_parameter(state: Data<AppState>, user: AuthUser, path: Path<i64>) -> ServiceResult<HttpResponse> {
    user.require_staff()?;
    let parameter = dispatch(&state.pg_db, FetchParameter(path.into_inner())).await?;

    Ok(HttpResponse::Ok().json(parameter))
}

#[post("")]
pub async fn create_parameter(state: Data<AppState>, user: AuthUser, body: Json<NewParameter>) -> ServiceResult<HttpResponse> {
    user.require_staff()?;
    let parameter = dispatch(&state.pg_db, CreateParameter(body.into_inner())).await?;

    Ok(HttpResponse::Created().json(parameter))
}

#[put("/{id}")]
pub async fn update_parameter(
    state: Data<AppState>,
    user: AuthUser,
    path: Path<i64>,
    body: Json<ParameterChanges>,
) -> ServiceResult<HttpResponse> {
    user.require_staff()?;
    let parameter =
        dispatch(&state.pg_db, UpdateParameter { id: path.into_inner(), changes: body.into_inner() }).await?;

    Ok(HttpResponse::Ok().json(parameter))
}

#[delete("/{id}")]
pub async fn delete_parameter(state: Data<AppState>, user: AuthUser, path: Path<i64>) -> ServiceResult<HttpResponse> {
    user.require_staff()?;
    dispatch(&state.pg_db, DeleteParameter(path.into_inner())).await?;

    Ok(HttpResponse::NoContent().finish())
}
