//! Notification texts for every lifecycle event.

use chrono::NaiveDate;

use crate::services::db_models::{Dish, Reservation, ReservationSupplement, Review, ScheduleSlot};
use crate::services::insertable::NewNotification;
use crate::services::lifecycle::{describe_total, SlotChanges};
use crate::types::ReservationStatus;

pub const WEEK_PUBLISHED_TITLE: &str = "Weekly schedule available";

/// Title, body and link shared by every recipient of one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Draft {
    pub title: String,
    pub body: String,
    pub link: Option<String>,
}

impl Draft {
    fn new(title: &str, body: String, link: String) -> Self {
        Draft { title: title.to_owned(), body, link: Some(link) }
    }

    pub fn to(&self, recipient_id: i64) -> NewNotification {
        NewNotification {
            recipient_id,
            title: self.title.clone(),
            body: self.body.clone(),
            link: self.link.clone(),
        }
    }

    pub fn fan_out(&self, recipients: &[i64]) -> Vec<NewNotification> {
        recipients.iter().map(|id| self.to(*id)).collect()
    }
}

fn reservation_link(reservation: &Reservation) -> String {
    format!("/reservations/{}", reservation.id)
}

pub fn reservation_created(
    reservation: &Reservation,
    slot: &ScheduleSlot,
    dish: &Dish,
    supplements: &[ReservationSupplement],
) -> Draft {
    let mut details = format!(
        "- Dish: {}\n- Date: {} ({})\n- Meal: {}\n- Quantity: {}\n- Status: awaiting approval",
        dish.name, slot.date, slot.day, slot.meal, reservation.quantity
    );
    if !supplements.is_empty() {
        let names: Vec<&str> = supplements.iter().map(|s| s.name.as_str()).collect();
        details.push_str(&format!("\n- Supplements: {}", names.join(", ")));
    }

    Draft::new(
        "Reservation recorded",
        format!(
            "Your reservation has been recorded.\n\nOrder details:\n{details}\n\n\
             You will be notified as soon as it is processed."
        ),
        reservation_link(reservation),
    )
}

/// Message for a reservation that has just left `Pending`.
pub fn reservation_resolved(
    reservation: &Reservation,
    slot: &ScheduleSlot,
    dish: &Dish,
    expiry_hours: i64,
) -> Option<Draft> {
    let link = reservation_link(reservation);
    match reservation.status {
        ReservationStatus::Pending => None,
        ReservationStatus::Accepted => Some(Draft::new(
            "Reservation accepted",
            format!(
                "Your reservation for {} has been accepted.\n\nSummary:\n- Date: {}\n- Meal: {}\n\
                 - Quantity: {}\n- Total: {}",
                dish.name,
                slot.date,
                slot.meal,
                reservation.quantity,
                describe_total(reservation.total_price_cents)
            ),
            link,
        )),
        ReservationStatus::Refused => Some(Draft::new(
            "Reservation refused",
            format!(
                "Your reservation for {} has been refused.\n\nDetails:\n- Date: {}\n- Meal: {}\n- Quantity: {}",
                dish.name, slot.date, slot.meal, reservation.quantity
            ),
            link,
        )),
        ReservationStatus::Expired => Some(Draft::new(
            "Reservation expired",
            format!(
                "Your reservation for {} expired automatically after {expiry_hours} hours without approval.",
                dish.name
            ),
            link,
        )),
    }
}

pub fn dish_updated(dish: &Dish) -> Draft {
    Draft::new(
        "Dish updated",
        format!("The dish '{}' has been updated.", dish.name),
        format!("/dishes/{}", dish.id),
    )
}

pub fn slot_updated(slot: &ScheduleSlot, dish: &Dish, changes: &SlotChanges) -> Draft {
    let mut body = format!("The schedule has changed for the dish '{}':\n", dish.name);
    for line in &changes.lines {
        body.push_str(&format!("- {line}\n"));
    }
    body.push_str(&format!("\nServings available: {}", slot.remaining_quantity));

    Draft::new("Schedule updated", body, "/schedule".to_owned())
}

/// The link embeds the week so each student is told once per week.
pub fn week_published(monday: NaiveDate) -> Draft {
    Draft::new(
        WEEK_PUBLISHED_TITLE,
        format!("The meal schedule for the week of {monday} is now available."),
        format!("/schedule?week={monday}"),
    )
}

pub fn review_submitted(review: &Review, dish: &Dish) -> Draft {
    Draft::new(
        "New review received",
        format!("A new review ({}/5) has been posted for the dish '{}'.", review.rating, dish.name),
        format!("/reviews/{}", review.id),
    )
}

pub fn review_approved(review: &Review, dish: &Dish) -> Draft {
    Draft::new(
        "Review approved",
        format!("Your review of the dish '{}' has been published.", dish.name),
        format!("/dishes/{}", review.dish_id),
    )
}
