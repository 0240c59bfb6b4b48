use actix::Handler;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel::{ExpressionMethods, OptionalExtension, PgConnection, QueryDsl, RunQueryDsl, SelectableHelper};

use crate::errors::{ServiceError, ServiceResult};
use crate::services::db_models::{Reservation, ReservationView};
use crate::services::db_utils::PgActor;
use crate::services::insertable::{NewReservation, NewSupplement};
use crate::services::lifecycle::{
    check_quantity, duplicate_reservation, expiry_cutoff, insufficient_quantity, resolve_transition,
    supplement_prices, total_price_cents, validate_request,
};
use crate::services::messages::{
    CancelReservation, ChangeReservationStatus, CreateReservation, ExpireStaleReservations, FetchReservation,
    FetchReservations, Viewer,
};
use crate::services::notifications::{reservation_created, reservation_resolved};
use crate::types::ReservationStatus;

use super::{expiry_hours, notify, reservation_views, slot_with_dish};

const OPEN_STATUSES: [ReservationStatus; 2] = [ReservationStatus::Pending, ReservationStatus::Accepted];

fn reservation_not_found() -> ServiceError {
    ServiceError::NotFound("Reservation".into())
}

fn visible_to(viewer: &Viewer, reservation: &Reservation) -> bool {
    viewer.is_staff || reservation.student_id == viewer.user_id
}

fn single_view(conn: &mut PgConnection, reservation: Reservation) -> ServiceResult<ReservationView> {
    reservation_views(conn, vec![reservation])?
        .pop()
        .ok_or_else(reservation_not_found)
}

/// Takes `quantity` servings from the slot if and only if that many remain.
///
/// Returns the servings left afterwards, or `None` when the guard failed.
fn take_servings(conn: &mut PgConnection, slot_pk: i64, quantity: i32) -> ServiceResult<Option<i32>> {
    use crate::schema::schedule_slots::dsl::{id, remaining_quantity, schedule_slots};

    Ok(diesel::update(schedule_slots.filter(id.eq(slot_pk)).filter(remaining_quantity.ge(quantity)))
        .set(remaining_quantity.eq(remaining_quantity - quantity))
        .returning(remaining_quantity)
        .get_result::<i32>(conn)
        .optional()?)
}

/// Total from the dish's current price and the stored supplement lines.
fn current_total(view: &ReservationView) -> ServiceResult<i64> {
    total_price_cents(
        view.dish.price_cents,
        view.reservation.quantity,
        view.supplements.iter().map(|line| line.price_cents),
    )
}

fn return_servings(conn: &mut PgConnection, slot_pk: i64, quantity: i32) -> ServiceResult<()> {
    use crate::schema::schedule_slots::dsl::{id, remaining_quantity, schedule_slots};

    diesel::update(schedule_slots.filter(id.eq(slot_pk)))
        .set(remaining_quantity.eq(remaining_quantity + quantity))
        .execute(conn)?;
    Ok(())
}

impl Handler<FetchReservations> for PgActor {
    type Result = ServiceResult<Vec<ReservationView>>;

    fn handle(&mut self, msg: FetchReservations, _ctx: &mut Self::Context) -> Self::Result {
        use crate::schema::reservations::dsl::{created_at, id, reservations, status, student_id};

        let mut conn = self.connection()?;

        let mut query = reservations.select(Reservation::as_select()).into_boxed();
        if !msg.viewer.is_staff {
            query = query.filter(student_id.eq(msg.viewer.user_id));
        }
        if let Some(wanted) = msg.status {
            query = query.filter(status.eq(wanted));
        }

        let rows = query.order((created_at.desc(), id.desc())).load::<Reservation>(&mut conn)?;

        reservation_views(&mut conn, rows)
    }
}

impl Handler<FetchReservation> for PgActor {
    type Result = ServiceResult<ReservationView>;

    fn handle(&mut self, msg: FetchReservation, _ctx: &mut Self::Context) -> Self::Result {
        use crate::schema::reservations::dsl::reservations;

        let mut conn = self.connection()?;

        let reservation = reservations
            .find(msg.id)
            .select(Reservation::as_select())
            .first(&mut conn)
            .optional()?
            .filter(|r| visible_to(&msg.viewer, r))
            .ok_or_else(reservation_not_found)?;

        single_view(&mut conn, reservation)
    }
}

impl Handler<CreateReservation> for PgActor {
    type Result = ServiceResult<ReservationView>;

    fn handle(&mut self, msg: CreateReservation, _ctx: &mut Self::Context) -> Self::Result {
        use crate::schema::reservation_supplements::dsl::reservation_supplements;
        use crate::schema::reservations::dsl::{id, reservations, slot_id, status, student_id};

        validate_request(msg.quantity, &msg.supplements)?;
        let mut conn = self.connection()?;

        conn.build_transaction().run(|trx_conn| -> ServiceResult<_> {
            let open = reservations
                .filter(student_id.eq(msg.student_id))
                .filter(slot_id.eq(msg.slot_id))
                .filter(status.eq_any(OPEN_STATUSES))
                .select(id)
                .first::<i64>(trx_conn)
                .optional()?;
            if open.is_some() {
                return Err(duplicate_reservation());
            }

            let (slot, dish) = slot_with_dish(trx_conn, msg.slot_id)?.ok_or_else(|| {
                ServiceError::validation(
                    "slot_id",
                    format!("Invalid pk \"{}\" - object does not exist.", msg.slot_id),
                )
            })?;
            check_quantity(slot.remaining_quantity, msg.quantity)?;
            let total = total_price_cents(dish.price_cents, msg.quantity, supplement_prices(&msg.supplements))?;

            let left = match take_servings(trx_conn, slot.id, msg.quantity)? {
                Some(left) => left,
                None => {
                    let (current, _) = slot_with_dish(trx_conn, slot.id)?.ok_or(DieselError::NotFound)?;
                    return Err(insufficient_quantity(current.remaining_quantity));
                }
            };

            let reservation = diesel::insert_into(reservations)
                .values(&NewReservation {
                    student_id: msg.student_id,
                    slot_id: slot.id,
                    quantity: msg.quantity,
                    total_price_cents: total,
                    status: ReservationStatus::Pending,
                })
                .returning(Reservation::as_returning())
                .get_result(trx_conn)
                .map_err(|err| match err {
                    // Partial unique index: a concurrent request got past the check first.
                    DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => duplicate_reservation(),
                    other => other.into(),
                })?;

            let lines: Vec<NewSupplement> = msg
                .supplements
                .iter()
                .map(|line| NewSupplement {
                    reservation_id: reservation.id,
                    name: line.name.trim().to_owned(),
                    price_cents: line.price_cents,
                })
                .collect();
            if !lines.is_empty() {
                diesel::insert_into(reservation_supplements).values(&lines).execute(trx_conn)?;
            }

            let view = single_view(trx_conn, reservation)?;
            notify(
                trx_conn,
                &[reservation_created(&view.reservation, &view.slot, &view.dish, &view.supplements)
                    .to(view.reservation.student_id)],
            )?;

            tracing::info!(
                reservation_id = view.reservation.id,
                slot_id = view.slot.id,
                remaining = left,
                "reservation created"
            );
            Ok(view)
        })
    }
}

impl Handler<ChangeReservationStatus> for PgActor {
    type Result = ServiceResult<Vec<ReservationView>>;

    fn handle(&mut self, msg: ChangeReservationStatus, _ctx: &mut Self::Context) -> Self::Result {
        use crate::schema::reservations::dsl::{
            id, reservations, status, total_price_cents as stored_total, updated_at,
        };

        let mut ids = msg.ids.clone();
        ids.sort_unstable();
        ids.dedup();
        let mut conn = self.connection()?;

        conn.build_transaction().run(|trx_conn| -> ServiceResult<_> {
            let window = expiry_hours(trx_conn)?;
            let locked: Vec<Reservation> = reservations
                .filter(id.eq_any(&ids))
                .order(id.asc())
                .select(Reservation::as_select())
                .for_update()
                .load(trx_conn)?;

            if msg.strict && locked.len() != ids.len() {
                return Err(reservation_not_found());
            }

            let mut views = Vec::with_capacity(locked.len());
            for view in reservation_views(trx_conn, locked)? {
                let current = &view.reservation;
                let next = match resolve_transition(current.status, msg.status, current.created_at, msg.now, window) {
                    Ok(next) => next,
                    Err(err) if msg.strict => return Err(err),
                    Err(err) => {
                        tracing::debug!(reservation_id = current.id, error = %err, "skipping status change");
                        continue;
                    }
                };
                let total = current_total(&view)?;

                let updated = diesel::update(reservations.find(current.id))
                    .set((status.eq(next), stored_total.eq(total), updated_at.eq(msg.now)))
                    .returning(Reservation::as_returning())
                    .get_result(trx_conn)?;
                views.push(ReservationView { reservation: updated, ..view });
            }

            let drafts: Vec<_> = views
                .iter()
                .filter_map(|v| {
                    reservation_resolved(&v.reservation, &v.slot, &v.dish, window).map(|d| d.to(v.reservation.student_id))
                })
                .collect();
            notify(trx_conn, &drafts)?;

            tracing::info!(requested = %msg.status, changed = views.len(), "reservation statuses updated");
            Ok(views)
        })
    }
}

impl Handler<CancelReservation> for PgActor {
    type Result = ServiceResult<()>;

    fn handle(&mut self, msg: CancelReservation, _ctx: &mut Self::Context) -> Self::Result {
        use crate::schema::reservations::dsl::reservations;

        let mut conn = self.connection()?;

        conn.build_transaction().run(|trx_conn| -> ServiceResult<_> {
            let reservation = reservations
                .find(msg.id)
                .select(Reservation::as_select())
                .for_update()
                .first(trx_conn)
                .optional()?
                .filter(|r| visible_to(&msg.viewer, r))
                .ok_or_else(reservation_not_found)?;

            if reservation.status.holds_slot() {
                return_servings(trx_conn, reservation.slot_id, reservation.quantity)?;
            }
            diesel::delete(reservations.find(reservation.id)).execute(trx_conn)?;

            tracing::info!(
                reservation_id = reservation.id,
                status = %reservation.status,
                "reservation cancelled"
            );
            Ok(())
        })
    }
}

impl Handler<ExpireStaleReservations> for PgActor {
    type Result = ServiceResult<Vec<Reservation>>;

    fn handle(&mut self, msg: ExpireStaleReservations, _ctx: &mut Self::Context) -> Self::Result {
        use crate::schema::reservations::dsl::{
            created_at, reservations, status, total_price_cents as stored_total, updated_at,
        };

        let mut conn = self.connection()?;

        conn.build_transaction().run(|trx_conn| -> ServiceResult<_> {
            let window = expiry_hours(trx_conn)?;
            let cutoff = expiry_cutoff(msg.now, window);

            let expired: Vec<Reservation> = diesel::update(
                reservations
                    .filter(status.eq(ReservationStatus::Pending))
                    .filter(created_at.lt(cutoff)),
            )
            .set((status.eq(ReservationStatus::Expired), updated_at.eq(msg.now)))
            .returning(Reservation::as_returning())
            .get_results(trx_conn)?;

            let mut views = reservation_views(trx_conn, expired)?;
            for view in &mut views {
                let total = current_total(view)?;
                if total != view.reservation.total_price_cents {
                    view.reservation = diesel::update(reservations.find(view.reservation.id))
                        .set(stored_total.eq(total))
                        .returning(Reservation::as_returning())
                        .get_result(trx_conn)?;
                }
            }

            let drafts: Vec<_> = views
                .iter()
                .filter_map(|v| {
                    reservation_resolved(&v.reservation, &v.slot, &v.dish, window).map(|d| d.to(v.reservation.student_id))
                })
                .collect();
            notify(trx_conn, &drafts)?;

            Ok(views.into_iter().map(|v| v.reservation).collect())
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    fn reservation(student: i64) -> Reservation {
        let now = Utc.with_ymd_and_hms(2024, 3, 4, 9, 0, 0).unwrap();
        Reservation {
            id: 1,
            student_id: student,
            slot_id: 2,
            quantity: 1,
            total_price_cents: 1000,
            status: ReservationStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn students_only_see_their_own_reservations() {
        let owner = Viewer { user_id: 7, is_staff: false };
        let stranger = Viewer { user_id: 8, is_staff: false };
        let staff = Viewer { user_id: 1, is_staff: true };

        assert!(visible_to(&owner, &reservation(7)));
        assert!(!visible_to(&stranger, &reservation(7)));
        assert!(visible_to(&staff, &reservation(7)));
    }
}
