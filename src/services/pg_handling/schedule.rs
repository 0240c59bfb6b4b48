use std::collections::HashSet;

use actix::Handler;
use chrono::NaiveDate;
use diesel::{BoolExpressionMethods, ExpressionMethods, OptionalExtension, PgConnection, QueryDsl, RunQueryDsl, SelectableHelper};

use crate::errors::{ServiceError, ServiceResult};
use crate::services::db_models::{Dish, ScheduleSlot, ScheduleSlotView};
use crate::services::db_utils::PgActor;
use crate::services::lifecycle::{diff_slot, week_bounds, week_is_complete};
use crate::services::messages::{CreateSlot, DeleteSlot, FetchSlot, FetchSlots, UpdateSlot};
use crate::services::notifications::{slot_updated, week_published};
use crate::types::{DayOfWeek, MealSlot};

use super::{notify, slot_with_dish, student_ids};

fn slot_not_found() -> ServiceError {
    ServiceError::NotFound("Schedule slot".into())
}

fn ensure_dish_exists(conn: &mut PgConnection, dish_pk: i64) -> ServiceResult<Dish> {
    use crate::schema::dishes::dsl::dishes;

    dishes
        .find(dish_pk)
        .select(Dish::as_select())
        .first(conn)
        .optional()?
        .ok_or_else(|| ServiceError::validation("dish_id", format!("Invalid pk \"{dish_pk}\" - object does not exist.")))
}

fn ensure_quantity(quantity: Option<i32>) -> ServiceResult<()> {
    match quantity {
        Some(q) if q < 0 => Err(ServiceError::validation(
            "remaining_quantity",
            "Ensure this value is greater than or equal to 0.",
        )),
        _ => Ok(()),
    }
}

/// Rejects a (day, meal, date) combination already used by another slot.
fn ensure_unique(
    conn: &mut PgConnection,
    slot_day: DayOfWeek,
    slot_meal: MealSlot,
    slot_date: NaiveDate,
    except: Option<i64>,
) -> ServiceResult<()> {
    use crate::schema::schedule_slots::dsl::{date, day, id, meal, schedule_slots};

    let clash = schedule_slots
        .filter(day.eq(slot_day).and(meal.eq(slot_meal)).and(date.eq(slot_date)))
        .filter(id.ne(except.unwrap_or(-1)))
        .select(id)
        .first::<i64>(conn)
        .optional()?;

    match clash {
        Some(_) => Err(ServiceError::non_field("The fields day, meal, date must make a unique set.")),
        None => Ok(()),
    }
}

/// Tells every student once that the week containing `slot_date` is fully planned.
fn publish_week_if_complete(conn: &mut PgConnection, slot_date: NaiveDate) -> ServiceResult<usize> {
    use crate::schema::notifications::dsl::{link, notifications, recipient_id};
    use crate::schema::schedule_slots::dsl::{date, day, meal, schedule_slots};

    let (monday, sunday) = week_bounds(slot_date);
    let planned: Vec<(DayOfWeek, MealSlot)> = schedule_slots
        .filter(date.between(monday, sunday))
        .select((day, meal))
        .load(conn)?;

    if !week_is_complete(planned) {
        return Ok(0);
    }

    let draft = week_published(monday);
    let already: HashSet<i64> = notifications
        .filter(link.eq(draft.link.clone()))
        .select(recipient_id)
        .load::<i64>(conn)?
        .into_iter()
        .collect();

    let recipients: Vec<i64> = student_ids(conn)?.into_iter().filter(|id| !already.contains(id)).collect();
    let sent = notify(conn, &draft.fan_out(&recipients))?;
    if sent > 0 {
        tracing::info!(week = %monday, sent, "weekly schedule published");
    }

    Ok(sent)
}

impl Handler<FetchSlots> for PgActor {
    type Result = ServiceResult<Vec<ScheduleSlotView>>;

    fn handle(&mut self, msg: FetchSlots, _ctx: &mut Self::Context) -> Self::Result {
        use crate::schema::dishes::dsl::dishes;
        use crate::schema::schedule_slots::dsl::{date, dish_id, id, schedule_slots};

        let mut conn = self.connection()?;

        let mut query = schedule_slots
            .inner_join(dishes)
            .select((ScheduleSlot::as_select(), Dish::as_select()))
            .into_boxed();
        if let Some(on) = msg.date {
            query = query.filter(date.eq(on));
        }
        if let Some(dish) = msg.dish_id {
            query = query.filter(dish_id.eq(dish));
        }

        let rows = query.order((date.asc(), id.asc())).load::<(ScheduleSlot, Dish)>(&mut conn)?;

        Ok(rows.into_iter().map(|(slot, dish)| ScheduleSlotView { slot, dish }).collect())
    }
}

impl Handler<FetchSlot> for PgActor {
    type Result = ServiceResult<ScheduleSlotView>;

    fn handle(&mut self, msg: FetchSlot, _ctx: &mut Self::Context) -> Self::Result {
        let mut conn = self.connection()?;

        slot_with_dish(&mut conn, msg.0)?
            .map(|(slot, dish)| ScheduleSlotView { slot, dish })
            .ok_or_else(slot_not_found)
    }
}

impl Handler<CreateSlot> for PgActor {
    type Result = ServiceResult<ScheduleSlotView>;

    fn handle(&mut self, msg: CreateSlot, _ctx: &mut Self::Context) -> Self::Result {
        use crate::schema::schedule_slots::dsl::schedule_slots;

        let new_slot = msg.0;
        ensure_quantity(Some(new_slot.remaining_quantity))?;
        let mut conn = self.connection()?;

        conn.build_transaction().run(|trx_conn| -> ServiceResult<_> {
            let dish = ensure_dish_exists(trx_conn, new_slot.dish_id)?;
            ensure_unique(trx_conn, new_slot.day, new_slot.meal, new_slot.date, None)?;

            let slot = diesel::insert_into(schedule_slots)
                .values(&new_slot)
                .returning(ScheduleSlot::as_returning())
                .get_result(trx_conn)?;

            publish_week_if_complete(trx_conn, slot.date)?;

            Ok(ScheduleSlotView { slot, dish })
        })
    }
}

impl Handler<UpdateSlot> for PgActor {
    type Result = ServiceResult<ScheduleSlotView>;

    fn handle(&mut self, msg: UpdateSlot, _ctx: &mut Self::Context) -> Self::Result {
        use crate::schema::schedule_slots::dsl::schedule_slots;

        ensure_quantity(msg.changes.remaining_quantity)?;
        let mut conn = self.connection()?;

        conn.build_transaction().run(|trx_conn| -> ServiceResult<_> {
            let old = schedule_slots
                .find(msg.id)
                .select(ScheduleSlot::as_select())
                .for_update()
                .first(trx_conn)
                .optional()?
                .ok_or_else(slot_not_found)?;
            let old_dish = ensure_dish_exists(trx_conn, old.dish_id)?;
            let new_dish = match msg.changes.dish_id {
                Some(dish_pk) if dish_pk != old.dish_id => ensure_dish_exists(trx_conn, dish_pk)?,
                _ => old_dish.clone(),
            };

            let next_day = msg.changes.day.unwrap_or(old.day);
            let next_meal = msg.changes.meal.unwrap_or(old.meal);
            let next_date = msg.changes.date.unwrap_or(old.date);
            if (next_day, next_meal, next_date) != (old.day, old.meal, old.date) {
                ensure_unique(trx_conn, next_day, next_meal, next_date, Some(old.id))?;
            }

            let slot = diesel::update(schedule_slots.find(msg.id))
                .set(&msg.changes)
                .returning(ScheduleSlot::as_returning())
                .get_result(trx_conn)?;

            let changes = diff_slot(&old, &old_dish, &slot, &new_dish);
            if changes.is_substantive() {
                let recipients = student_ids(trx_conn)?;
                notify(trx_conn, &slot_updated(&slot, &new_dish, &changes).fan_out(&recipients))?;
                publish_week_if_complete(trx_conn, slot.date)?;
            }

            Ok(ScheduleSlotView { slot, dish: new_dish })
        })
    }
}

impl Handler<DeleteSlot> for PgActor {
    type Result = ServiceResult<()>;

    fn handle(&mut self, msg: DeleteSlot, _ctx: &mut Self::Context) -> Self::Result {
        use crate::schema::schedule_slots::dsl::schedule_slots;

        let mut conn = self.connection()?;

        match diesel::delete(schedule_slots.find(msg.0)).execute(&mut conn)? {
            0 => Err(slot_not_found()),
            _ => Ok(()),
        }
    }
}
