use std::collections::HashMap;

use diesel::{ExpressionMethods, OptionalExtension, PgConnection, QueryDsl, RunQueryDsl, SelectableHelper};

use crate::errors::ServiceResult;
use crate::services::db_models::{Dish, Reservation, ReservationSupplement, ReservationView, ScheduleSlot};
use crate::services::insertable::NewNotification;
use crate::services::lifecycle::parse_expiry_hours;
use crate::types::EXPIRY_PARAMETER;

mod dishes;
mod notifications;
mod parameters;
mod reservations;
mod reviews;
mod schedule;
mod users;

/// Current expiry window in hours, read from the parameters table.
fn expiry_hours(conn: &mut PgConnection) -> ServiceResult<i64> {
    use crate::schema::parameters::dsl::{name, parameters, value};

    let raw = parameters
        .filter(name.eq(EXPIRY_PARAMETER))
        .select(value)
        .first::<String>(conn)
        .optional()?;

    Ok(parse_expiry_hours(raw.as_deref()))
}

/// Every non-staff account; the audience of broadcast notifications.
fn student_ids(conn: &mut PgConnection) -> ServiceResult<Vec<i64>> {
    use crate::schema::users::dsl::{id, is_staff, users};

    Ok(users.filter(is_staff.eq(false)).select(id).order(id.asc()).load(conn)?)
}

fn staff_ids(conn: &mut PgConnection) -> ServiceResult<Vec<i64>> {
    use crate::schema::users::dsl::{id, is_staff, users};

    Ok(users.filter(is_staff.eq(true)).select(id).order(id.asc()).load(conn)?)
}

fn notify(conn: &mut PgConnection, rows: &[NewNotification]) -> ServiceResult<usize> {
    use crate::schema::notifications::dsl::notifications;

    if rows.is_empty() {
        return Ok(0);
    }

    Ok(diesel::insert_into(notifications).values(rows).execute(conn)?)
}

fn slot_with_dish(conn: &mut PgConnection, slot_pk: i64) -> ServiceResult<Option<(ScheduleSlot, Dish)>> {
    use crate::schema::dishes::dsl::dishes;
    use crate::schema::schedule_slots::dsl::{id, schedule_slots};

    Ok(schedule_slots
        .inner_join(dishes)
        .filter(id.eq(slot_pk))
        .select((ScheduleSlot::as_select(), Dish::as_select()))
        .first(conn)
        .optional()?)
}

/// Attaches slot, dish and supplements to each reservation, keeping order.
fn reservation_views(conn: &mut PgConnection, rows: Vec<Reservation>) -> ServiceResult<Vec<ReservationView>> {
    use crate::schema::dishes::dsl::dishes;
    use crate::schema::reservation_supplements::dsl::{id as supplement_pk, reservation_id, reservation_supplements};
    use crate::schema::schedule_slots::dsl::{id as slot_pk, schedule_slots};

    let slot_ids: Vec<i64> = rows.iter().map(|r| r.slot_id).collect();
    let reservation_ids: Vec<i64> = rows.iter().map(|r| r.id).collect();

    let slots: HashMap<i64, (ScheduleSlot, Dish)> = schedule_slots
        .inner_join(dishes)
        .filter(slot_pk.eq_any(&slot_ids))
        .select((ScheduleSlot::as_select(), Dish::as_select()))
        .load::<(ScheduleSlot, Dish)>(conn)?
        .into_iter()
        .map(|(slot, dish)| (slot.id, (slot, dish)))
        .collect();

    let mut supplements: HashMap<i64, Vec<ReservationSupplement>> = HashMap::new();
    for line in reservation_supplements
        .filter(reservation_id.eq_any(&reservation_ids))
        .order(supplement_pk.asc())
        .select(ReservationSupplement::as_select())
        .load::<ReservationSupplement>(conn)?
    {
        supplements.entry(line.reservation_id).or_default().push(line);
    }

    let mut views = Vec::with_capacity(rows.len());
    for reservation in rows {
        let (slot, dish) = slots
            .get(&reservation.slot_id)
            .cloned()
            .ok_or(diesel::result::Error::NotFound)?;
        let lines = supplements.remove(&reservation.id).unwrap_or_default();
        views.push(ReservationView { reservation, slot, dish, supplements: lines });
    }

    Ok(views)
}
