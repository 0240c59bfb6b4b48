// sub-route "/reviews"
use actix_web::web::{Data, Json, Path, Query};
use actix_web::{delete, get, post, HttpResponse};
use serde::Deserialize;
use serde_json::json;

use crate::errors::{ServiceError, ServiceResult};
use crate::services::auth::AuthUser;
use crate::services::db_utils::{dispatch, AppState};
use crate::services::messages::{CreateReview, DeleteReview, FetchReview, FetchReviews, SetReviewApproval};

#[derive(Deserialize)]
pub struct ReviewFilter {
    pub dish: Option<i64>,
    #[serde(default)]
    pub approved: bool,
}

#[get("")]
pub async fn fetch_reviews(state: Data<AppState>, user: AuthUser, filter: Query<ReviewFilter>) -> ServiceResult<HttpResponse> {
    let filter = filter.into_inner();
    let msg = FetchReviews {
        viewer: user.viewer(),
        dish_id: filter.dish,
        // Only staff can narrow down to approved reviews.
        approved_only: filter.approved && user.is_staff,
    };
    let reviews = dispatch(&state.pg_db, msg).await?;

    Ok(HttpResponse::Ok().json(reviews))
}

#[derive(Deserialize)]
pub struct CreateReviewBody {
    pub dish_id: i64,
    pub rating: i32,
    #[serde(default)]
    pub comment: String,
}

#[post("")]
pub async fn create_review(state: Data<AppState>, user: AuthUser, body: Json<CreateReviewBody>) -> ServiceResult<HttpResponse> {
    user.require_student()?;
    let body = body.into_inner();
    let review = dispatch(
        &state.pg_db,
        CreateReview { student_id: user.id, dish_id: body.dish_id, rating: body.rating, comment: body.comment },
    )
    .await?;

    Ok(HttpResponse::Created().json(review))
}

#[derive(Deserialize)]
pub struct BulkBody {
    pub ids: Vec<i64>,
}

async fn moderate(
    state: &AppState,
    user: AuthUser,
    ids: Vec<i64>,
    approved: bool,
    strict: bool,
) -> ServiceResult<HttpResponse> {
    user.require_staff()?;
    if ids.is_empty() {
        return Err(ServiceError::validation("ids", "This list may not be empty."));
    }

    let reviews = dispatch(&state.pg_db, SetReviewApproval { ids, approved, strict }).await?;
    Ok(HttpResponse::Ok().json(reviews))
}

#[post("/bulk-approve")]
pub async fn bulk_approve(state: Data<AppState>, user: AuthUser, body: Json<BulkBody>) -> ServiceResult<HttpResponse> {
    moderate(&state, user, body.into_inner().ids, true, false).await
}

#[post("/bulk-reject")]
pub async fn bulk_reject(state: Data<AppState>, user: AuthUser, body: Json<BulkBody>) -> ServiceResult<HttpResponse> {
    moderate(&state, user, body.into_inner().ids, false, false).await
}

#[get("/{id}")]
pub async fn get_review(state: Data<AppState>, user: AuthUser, path: Path<i64>) -> ServiceResult<HttpResponse> {
    let review = dispatch(&state.pg_db, FetchReview { viewer: user.viewer(), id: path.into_inner() }).await?;

    Ok(HttpResponse::Ok().json(review))
}

#[post("/{id}/approve")]
pub async fn approve_review(state: Data<AppState>, user: AuthUser, path: Path<i64>) -> ServiceResult<HttpResponse> {
    let id = path.into_inner();
    moderate(&state, user, vec![id], true, true).await?;

    Ok(HttpResponse::Ok().json(json!({ "status": "Review approved" })))
}

#[post("/{id}/reject")]
pub async fn reject_review(state: Data<AppState>, user: AuthUser, path: Path<i64>) -> ServiceResult<HttpResponse> {
    let id = path.into_inner();
    moderate(&state, user, vec![id], false, true).await?;

    Ok(HttpResponse::Ok().json(json!({ "status": "Review rejected" })))
}

#[delete("/{id}")]
pub async fn delete_review(state: Data<AppState>, user: AuthUser, path: Path<i64>) -> ServiceResult<HttpResponse> {
    dispatch(&state.pg_db, DeleteReview { viewer: user.viewer(), id: path.into_inner() }).await?;

    Ok(HttpResponse::NoContent().finish())
}
