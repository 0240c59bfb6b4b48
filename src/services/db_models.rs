use chrono::{DateTime, NaiveDate, Utc};
use diesel::{Identifiable, Queryable, Selectable};
use serde::Serialize;

use crate::types::{DayOfWeek, DishCategory, MealSlot, ReservationStatus};

#[derive(Queryable, Selectable, Identifiable, Debug, Clone, Serialize)]
#[diesel(table_name = crate::schema::users)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub username: String,
    #[serde(skip)]
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub institute: String,
    pub is_staff: bool,
    pub registered_at: DateTime<Utc>,
}

impl User {
    pub fn full_name(&self) -> String {
        let name = format!("{} {}", self.first_name, self.last_name);
        match name.trim() {
            "" => self.username.clone(),
            trimmed => trimmed.to_owned(),
        }
    }
}

#[derive(Queryable, Selectable, Identifiable, Debug, Clone, Serialize)]
#[diesel(table_name = crate::schema::dishes)]
pub struct Dish {
    pub id: i64,
    pub name: String,
    pub price_cents: i64,
    pub category: DishCategory,
    pub description: String,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Queryable, Selectable, Identifiable, Debug, Clone, Serialize)]
#[diesel(table_name = crate::schema::schedule_slots)]
pub struct ScheduleSlot {
    pub id: i64,
    pub dish_id: i64,
    pub day: DayOfWeek,
    pub meal: MealSlot,
    pub date: NaiveDate,
    pub remaining_quantity: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScheduleSlotView {
    #[serde(flatten)]
    pub slot: ScheduleSlot,
    pub dish: Dish,
}

#[derive(Queryable, Selectable, Identifiable, Debug, Clone, Serialize)]
#[diesel(table_name = crate::schema::reservations)]
pub struct Reservation {
    pub id: i64,
    pub student_id: i64,
    pub slot_id: i64,
    pub quantity: i32,
    pub total_price_cents: i64,
    pub status: ReservationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Queryable, Selectable, Identifiable, Debug, Clone, Serialize)]
#[diesel(table_name = crate::schema::reservation_supplements)]
pub struct ReservationSupplement {
    pub id: i64,
    #[serde(skip)]
    pub reservation_id: i64,
    pub name: String,
    pub price_cents: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReservationView {
    #[serde(flatten)]
    pub reservation: Reservation,
    pub slot: ScheduleSlot,
    pub dish: Dish,
    pub supplements: Vec<ReservationSupplement>,
}

#[derive(Queryable, Selectable, Identifiable, Debug, Clone, Serialize)]
#[diesel(table_name = crate::schema::notifications)]
pub struct Notification {
    pub id: i64,
    pub recipient_id: i64,
    pub title: String,
    pub body: String,
    pub is_read: bool,
    pub link: Option<String>,
    pub sent_at: DateTime<Utc>,
}

#[derive(Queryable, Selectable, Identifiable, Debug, Clone, Serialize)]
#[diesel(table_name = crate::schema::parameters)]
pub struct Parameter {
    pub id: i64,
    pub name: String,
    pub value: String,
    pub description: String,
    pub updated_at: DateTime<Utc>,
}

#[derive(Queryable, Selectable, Identifiable, Debug, Clone, Serialize)]
#[diesel(table_name = crate::schema::reviews)]
pub struct Review {
    pub id: i64,
    pub student_id: i64,
    pub dish_id: i64,
    pub rating: i32,
    pub comment: String,
    pub is_approved: bool,
    pub published_at: DateTime<Utc>,
}
