// sub-route "/reservations"
use actix_web::http::header::{ContentDisposition, DispositionParam, DispositionType};
use actix_web::web::{self, Data, Json, Path, Query};
use actix_web::{delete, get, patch, post, HttpResponse};
use chrono::Utc;
use serde::Deserialize;

use crate::errors::{ServiceError, ServiceResult};
use crate::services::auth::AuthUser;
use crate::services::db_utils::{dispatch, AppState};
use crate::services::export::{export_filename, ReservationReport};
use crate::services::insertable::SupplementLine;
use crate::services::messages::{
    CancelReservation, ChangeReservationStatus, CreateReservation, FetchReservation, FetchReservations, FetchUser,
    Viewer,
};
use crate::types::ReservationStatus;

#[derive(Deserialize)]
pub struct ReservationFilter {
    pub status: Option<ReservationStatus>,
}

#[get("")]
pub async fn fetch_reservations(
    state: Data<AppState>,
    user: AuthUser,
    filter: Query<ReservationFilter>,
) -> ServiceResult<HttpResponse> {
    let reservations =
        dispatch(&state.pg_db, FetchReservations { viewer: user.viewer(), status: filter.into_inner().status }).await?;

    Ok(HttpResponse::Ok().json(reservations))
}

#[get("/export")]
pub async fn export_reservations(state: Data<AppState>, user: AuthUser) -> ServiceResult<HttpResponse> {
    let owner = dispatch(&state.pg_db, FetchUser(user.id)).await?;
    // Staff export their own history too.
    let own = Viewer { user_id: user.id, is_staff: false };
    let reservations = dispatch(&state.pg_db, FetchReservations { viewer: own, status: None }).await?;

    let now = Utc::now();
    let filename = export_filename(&owner.username, now);
    let report = ReservationReport::build(&owner, &reservations, now);
    let bytes = web::block(move || report.render_pdf())
        .await
        .map_err(|err| ServiceError::Internal(format!("PDF export was interrupted: {err}")))??;

    tracing::info!(user_id = user.id, count = reservations.len(), "reservations exported");

    Ok(HttpResponse::Ok()
        .content_type("application/pdf")
        .insert_header(ContentDisposition {
            disposition: DispositionType::Attachment,
            parameters: vec![DispositionParam::Filename(filename)],
        })
        .body(bytes))
}

#[get("/{id}")]
pub async fn get_reservation(state: Data<AppState>, user: AuthUser, path: Path<i64>) -> ServiceResult<HttpResponse> {
    let reservation = dispatch(&state.pg_db, FetchReservation { viewer: user.viewer(), id: path.into_inner() }).await?;

    Ok(HttpResponse::Ok().json(reservation))
}

fn default_quantity() -> i32 {
    1
}

#[derive(Deserialize)]
pub struct CreateReservationBody {
    pub slot_id: i64,
    #[serde(default = "default_quantity")]
    pub quantity: i32,
    #[serde(default)]
    pub supplements: Vec<SupplementLine>,
}

#[post("")]
pub async fn create_reservation(
    state: Data<AppState>,
    user: AuthUser,
    body: Json<CreateReservationBody>,
) -> ServiceResult<HttpResponse> {
    user.require_student()?;
    let body = body.into_inner();
    let msg = CreateReservation {
        student_id: user.id,
        slot_id: body.slot_id,
        quantity: body.quantity,
        supplements: body.supplements,
    };

    match dispatch(&state.pg_db, msg).await {
        Ok(reservation) => Ok(HttpResponse::Created().json(reservation)),
        Err(err) if err.is_server_error() => {
            tracing::error!(user_id = user.id, slot_id = body.slot_id, error = %err, "reservation creation failed");
            Err(ServiceError::ReservationFailed)
        }
        Err(err) => Err(err),
    }
}

#[derive(Deserialize)]
pub struct StatusBody {
    pub status: ReservationStatus,
}

#[patch("/{id}/status")]
pub async fn change_status(
    state: Data<AppState>,
    user: AuthUser,
    path: Path<i64>,
    body: Json<StatusBody>,
) -> ServiceResult<HttpResponse> {
    user.require_staff()?;
    let msg = ChangeReservationStatus {
        ids: vec![path.into_inner()],
        status: body.status,
        now: Utc::now(),
        strict: true,
    };
    let reservation = dispatch(&state.pg_db, msg)
        .await?
        .pop()
        .ok_or_else(|| ServiceError::NotFound("Reservation".into()))?;

    Ok(HttpResponse::Ok().json(reservation))
}

#[derive(Deserialize)]
pub struct BulkStatusBody {
    pub ids: Vec<i64>,
    pub status: ReservationStatus,
}

/// Rows that cannot make the transition are skipped, not reported as errors.
#[post("/bulk-status")]
pub async fn bulk_change_status(
    state: Data<AppState>,
    user: AuthUser,
    body: Json<BulkStatusBody>,
) -> ServiceResult<HttpResponse> {
    user.require_staff()?;
    let body = body.into_inner();
    if body.ids.is_empty() {
        return Err(ServiceError::validation("ids", "This list may not be empty."));
    }

    let changed = dispatch(
        &state.pg_db,
        ChangeReservationStatus { ids: body.ids, status: body.status, now: Utc::now(), strict: false },
    )
    .await?;

    Ok(HttpResponse::Ok().json(changed))
}

#[delete("/{id}")]
pub async fn cancel_reservation(state: Data<AppState>, user: AuthUser, path: Path<i64>) -> ServiceResult<HttpResponse> {
    dispatch(&state.pg_db, CancelReservation { viewer: user.viewer(), id: path.into_inner() }).await?;

    Ok(HttpResponse::NoContent().finish())
}
