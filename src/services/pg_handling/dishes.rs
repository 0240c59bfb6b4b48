use actix::Handler;
use diesel::{ExpressionMethods, OptionalExtension, QueryDsl, RunQueryDsl, SelectableHelper};

use crate::errors::{ServiceError, ServiceResult};
use crate::services::db_models::Dish;
use crate::services::db_utils::PgActor;
use crate::services::messages::{CreateDish, DeleteDish, FetchDish, FetchDishes, UpdateDish};
use crate::services::notifications::dish_updated;

use super::{notify, student_ids};

fn validate_dish(name: Option<&str>, price_cents: Option<i64>) -> ServiceResult<()> {
    if let Some(name) = name {
        if name.trim().is_empty() {
            return Err(ServiceError::validation("name", "This field may not be blank."));
        }
    }
    if let Some(price) = price_cents {
        if price < 0 {
            return Err(ServiceError::validation("price_cents", "Ensure this value is greater than or equal to 0."));
        }
    }
    Ok(())
}

impl Handler<FetchDishes> for PgActor {
    type Result = ServiceResult<Vec<Dish>>;

    fn handle(&mut self, _msg: FetchDishes, _ctx: &mut Self::Context) -> Self::Result {
        use crate::schema::dishes::dsl::{dishes, name};

        let mut conn = self.connection()?;

        Ok(dishes.order(name.asc()).select(Dish::as_select()).load(&mut conn)?)
    }
}

impl Handler<FetchDish> for PgActor {
    type Result = ServiceResult<Dish>;

    fn handle(&mut self, msg: FetchDish, _ctx: &mut Self::Context) -> Self::Result {
        use crate::schema::dishes::dsl::dishes;

        let mut conn = self.connection()?;

        dishes
            .find(msg.0)
            .select(Dish::as_select())
            .first(&mut conn)
            .optional()?
            .ok_or_else(|| ServiceError::NotFound("Dish".into()))
    }
}

impl Handler<CreateDish> for PgActor {
    type Result = ServiceResult<Dish>;

    fn handle(&mut self, msg: CreateDish, _ctx: &mut Self::Context) -> Self::Result {
        use crate::schema::dishes::dsl::dishes;

        validate_dish(Some(&msg.0.name), Some(msg.0.price_cents))?;
        let mut conn = self.connection()?;

        Ok(diesel::insert_into(dishes)
            .values(&msg.0)
            .returning(Dish::as_returning())
            .get_result(&mut conn)?)
    }
}

impl Handler<UpdateDish> for PgActor {
    type Result = ServiceResult<Dish>;

    fn handle(&mut self, msg: UpdateDish, _ctx: &mut Self::Context) -> Self::Result {
        use crate::schema::dishes::dsl::dishes;

        validate_dish(msg.changes.name.as_deref(), msg.changes.price_cents)?;
        let mut conn = self.connection()?;

        conn.build_transaction().run(|trx_conn| -> ServiceResult<_> {
            let dish = diesel::update(dishes.find(msg.id))
                .set(&msg.changes)
                .returning(Dish::as_returning())
                .get_result(trx_conn)
                .optional()?
                .ok_or_else(|| ServiceError::NotFound("Dish".into()))?;

            let recipients = student_ids(trx_conn)?;
            let sent = notify(trx_conn, &dish_updated(&dish).fan_out(&recipients))?;
            tracing::debug!(dish_id = dish.id, sent, "dish update broadcast");

            Ok(dish)
        })
    }
}

impl Handler<DeleteDish> for PgActor {
    type Result = ServiceResult<()>;

    fn handle(&mut self, msg: DeleteDish, _ctx: &mut Self::Context) -> Self::Result {
        use crate::schema::dishes::dsl::dishes;

        let mut conn = self.connection()?;

        match diesel::delete(dishes.find(msg.0)).execute(&mut conn)? {
            0 => Err(ServiceError::NotFound("Dish".into())),
            _ => Ok(()),
        }
    }
}
