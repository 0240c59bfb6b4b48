// sub-route "/notifications"
use actix_web::web::{Data, Path};
use actix_web::{delete, get, post, HttpResponse};
use serde_json::json;

use crate::errors::ServiceResult;
use crate::services::auth::AuthUser;
use crate::services::db_utils::{dispatch, AppState};
use crate::services::messages::{DeleteNotification, FetchNotification, FetchNotifications, MarkNotificationRead};

#[get("")]
pub async fn fetch_notifications(state: Data<AppState>, user: AuthUser) -> ServiceResult<HttpResponse> {
    let notifications = dispatch(&state.pg_db, FetchNotifications(user.id)).await?;

    Ok(HttpResponse::Ok().json(notifications))
}

#[get("/{id}")]
pub async fn get_notification(state: Data<AppState>, user: AuthUser, path: Path<i64>) -> ServiceResult<HttpResponse> {
    let notification = dispatch(&state.pg_db, FetchNotification { user_id: user.id, id: path.into_inner() }).await?;

    Ok(HttpResponse::Ok().json(notification))
}

#[post("/{id}/read")]
pub async fn mark_read(state: Data<AppState>, user: AuthUser, path: Path<i64>) -> ServiceResult<HttpResponse> {
    dispatch(&state.pg_db, MarkNotificationRead { user_id: user.id, id: path.into_inner() }).await?;

    Ok(HttpResponse::Ok().json(json!({ "status": "Notification marked as read" })))
}

#[delete("/{id}")]
pub async fn delete_notification(state: Data<AppState>, user: AuthUser, path: Path<i64>) -> ServiceResult<HttpResponse> {
    let id = path.into_inner();
    dispatch(&state.pg_db, DeleteNotification { user_id: user.id, id }).await?;

    Ok(HttpResponse::Ok().json(json!({ "status": "Notification deleted", "id": id })))
}
