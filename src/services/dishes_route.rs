// sub-route "/dishes"
use actix_web::web::{Data, Json, Path};
use actix_web::{delete, get, post, put, HttpResponse};

use crate::errors::ServiceResult;
use crate::services::auth::AuthUser;
use crate::services::db_utils::{dispatch, AppState};
use crate::services::insertable::{DishChanges, NewDish};
use crate::services::messages::{CreateDish, DeleteDish, FetchDish, FetchDishes, UpdateDish};

#[get("")]
pub async fn fetch_dishes(state: Data<AppState>, _user: AuthUser) -> ServiceResult<HttpResponse> {
    let dishes = dispatch(&state.pg_db, FetchDishes).await?;

    Ok(HttpResponse::Ok().json(dishes))
}

#[get("/{id}")]
pub async fn get_dish(state: Data<AppState>, _user: AuthUser, path: Path<i64>) -> ServiceResult<HttpResponse> {
    let dish = dispatch(&state.pg_db, FetchDish(path.into_inner())).await?;

    Ok(HttpResponse::Ok().json(dish))
}

#[post("")]
pub async fn create_dish(state: Data<AppState>, user: AuthUser, body: Json<NewDish>) -> ServiceResult<HttpResponse> {
    user.require_staff()?;
    let dish = dispatch(&state.pg_db, CreateDish(body.into_inner())).await?;

    Ok(HttpResponse::Created().json(dish))
}

#[put("/{id}")]
pub async fn update_dish(
    state: Data<AppState>,
    user: AuthUser,
    path: Path<i64>,
    body: Json<DishChanges>,
) -> ServiceResult<HttpResponse> {
    user.require_staff()?;
    let dish = dispatch(&state.pg_db, UpdateDish { id: path.into_inner(), changes: body.into_inner() }).await?;

    Ok(HttpResponse::Ok().json(dish))
}

#[delete("/{id}")]
pub async fn delete_dish(state: Data<AppState>, user: AuthUser, path: Path<i64>) -> ServiceResult<HttpResponse> {
    user.require_staff()?;
    dispatch(&state.pg_db, DeleteDish(path.into_inner())).await?;

    Ok(HttpResponse::NoContent().finish())
}
