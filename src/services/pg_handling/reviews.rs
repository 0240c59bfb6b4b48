use actix::Handler;
use diesel::{ExpressionMethods, OptionalExtension, PgConnection, QueryDsl, RunQueryDsl, SelectableHelper};

use crate::errors::{ServiceError, ServiceResult};
use crate::services::db_models::{Dish, Review};
use crate::services::db_utils::PgActor;
use crate::services::insertable::NewReview;
use crate::services::messages::{CreateReview, DeleteReview, FetchReview, FetchReviews, SetReviewApproval, Viewer};
use crate::services::notifications::{review_approved, review_submitted};
use crate::types::ReservationStatus;

use super::{notify, staff_ids};

const MIN_RATING: i32 = 1;
const MAX_RATING: i32 = 5;

fn review_not_found() -> ServiceError {
    ServiceError::NotFound("Review".into())
}

fn validate_rating(rating: i32) -> ServiceResult<()> {
    if !(MIN_RATING..=MAX_RATING).contains(&rating) {
        return Err(ServiceError::validation(
            "rating",
            format!("Ensure this value is between {MIN_RATING} and {MAX_RATING}."),
        ));
    }
    Ok(())
}

/// True once the student has an accepted reservation on any slot serving the dish.
fn has_eaten(conn: &mut PgConnection, student: i64, dish: i64) -> ServiceResult<bool> {
    use crate::schema::reservations::dsl::{id, reservations, status, student_id};
    use crate::schema::schedule_slots::dsl::{dish_id, schedule_slots};

    let found = reservations
        .inner_join(schedule_slots)
        .filter(student_id.eq(student))
        .filter(dish_id.eq(dish))
        .filter(status.eq(ReservationStatus::Accepted))
        .select(id)
        .first::<i64>(conn)
        .optional()?;

    Ok(found.is_some())
}

fn visible(conn: &mut PgConnection, viewer: &Viewer, pk: i64) -> ServiceResult<Review> {
    use crate::schema::reviews::dsl::reviews;

    reviews
        .find(pk)
        .select(Review::as_select())
        .first(conn)
        .optional()?
        .filter(|r| viewer.is_staff || r.student_id == viewer.user_id)
        .ok_or_else(review_not_found)
}

impl Handler<FetchReviews> for PgActor {
    type Result = ServiceResult<Vec<Review>>;

    fn handle(&mut self, msg: FetchReviews, _ctx: &mut Self::Context) -> Self::Result {
        use crate::schema::reviews::dsl::{dish_id, id, is_approved, published_at, reviews, student_id};

        let mut conn = self.connection()?;

        let mut query = reviews.select(Review::as_select()).into_boxed();
        if !msg.viewer.is_staff {
            query = query.filter(student_id.eq(msg.viewer.user_id));
        }
        if let Some(dish) = msg.dish_id {
            query = query.filter(dish_id.eq(dish));
        }
        if msg.approved_only {
            query = query.filter(is_approved.eq(true));
        }

        Ok(query.order((published_at.desc(), id.desc())).load(&mut conn)?)
    }
}

impl Handler<FetchReview> for PgActor {
    type Result = ServiceResult<Review>;

    fn handle(&mut self, msg: FetchReview, _ctx: &mut Self::Context) -> Self::Result {
        let mut conn = self.connection()?;

        visible(&mut conn, &msg.viewer, msg.id)
    }
}

impl Handler<CreateReview> for PgActor {
    type Result = ServiceResult<Review>;

    fn handle(&mut self, msg: CreateReview, _ctx: &mut Self::Context) -> Self::Result {
        use crate::schema::dishes::dsl::dishes;
        use crate::schema::reviews::dsl::reviews;

        validate_rating(msg.rating)?;
        let mut conn = self.connection()?;

        conn.build_transaction().run(|trx_conn| -> ServiceResult<_> {
            let dish = dishes
                .find(msg.dish_id)
                .select(Dish::as_select())
                .first(trx_conn)
                .optional()?
                .ok_or_else(|| {
                    ServiceError::validation(
                        "dish_id",
                        format!("Invalid pk \"{}\" - object does not exist.", msg.dish_id),
                    )
                })?;

            if !has_eaten(trx_conn, msg.student_id, dish.id)? {
                return Err(ServiceError::non_field("You can only review dishes you have eaten."));
            }

            let review = diesel::insert_into(reviews)
                .values(&NewReview {
                    student_id: msg.student_id,
                    dish_id: dish.id,
                    rating: msg.rating,
                    comment: msg.comment.trim().to_owned(),
                })
                .returning(Review::as_returning())
                .get_result(trx_conn)?;

            let staff = staff_ids(trx_conn)?;
            notify(trx_conn, &review_submitted(&review, &dish).fan_out(&staff))?;

            Ok(review)
        })
    }
}

impl Handler<SetReviewApproval> for PgActor {
    type Result = ServiceResult<Vec<Review>>;

    fn handle(&mut self, msg: SetReviewApproval, _ctx: &mut Self::Context) -> Self::Result {
        use crate::schema::dishes::dsl::{dishes, id as dish_pk};
        use crate::schema::reviews::dsl::{id, is_approved, reviews};

        let mut conn = self.connection()?;

        conn.build_transaction().run(|trx_conn| -> ServiceResult<_> {
            if msg.strict {
                let mut wanted = msg.ids.clone();
                wanted.sort_unstable();
                wanted.dedup();
                let found: i64 = reviews.filter(id.eq_any(&wanted)).count().get_result(trx_conn)?;
                if usize::try_from(found).ok() != Some(wanted.len()) {
                    return Err(review_not_found());
                }
            }

            // Only rows whose flag actually flips produce notifications.
            let changed: Vec<Review> = diesel::update(
                reviews.filter(id.eq_any(&msg.ids)).filter(is_approved.ne(msg.approved)),
            )
            .set(is_approved.eq(msg.approved))
            .returning(Review::as_returning())
            .get_results(trx_conn)?;

            if msg.approved && !changed.is_empty() {
                let dish_ids: Vec<i64> = changed.iter().map(|r| r.dish_id).collect();
                let served: Vec<Dish> = dishes.filter(dish_pk.eq_any(&dish_ids)).select(Dish::as_select()).load(trx_conn)?;

                let drafts: Vec<_> = changed
                    .iter()
                    .filter_map(|review| {
                        served
                            .iter()
                            .find(|d| d.id == review.dish_id)
                            .map(|dish| review_approved(review, dish).to(review.student_id))
                    })
                    .collect();
                notify(trx_conn, &drafts)?;
            }

            tracing::info!(approved = msg.approved, changed = changed.len(), "review moderation applied");

            Ok(reviews
                .filter(id.eq_any(&msg.ids))
                .order(id.asc())
                .select(Review::as_select())
                .load(trx_conn)?)
        })
    }
}

impl Handler<DeleteReview> for PgActor {
    type Result = ServiceResult<()>;

    fn handle(&mut self, msg: DeleteReview, _ctx: &mut Self::Context) -> Self::Result {
        use crate::schema::reviews::dsl::reviews;

        let mut conn = self.connection()?;

        let review = visible(&mut conn, &msg.viewer, msg.id)?;
        diesel::delete(reviews.find(review.id)).execute(&mut conn)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::validate_rating;

    #[test]
    fn rating_must_be_between_one_and_five() {
        assert!(validate_rating(0).is_err());
        assert!(validate_rating(1).is_ok());
        assert!(validate_rating(5).is_ok());
        assert!(validate_rating(6).is_err());
    }
}
