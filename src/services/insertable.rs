use chrono::{DateTime, NaiveDate, Utc};
use diesel::{AsChangeset, Insertable};
use serde::{Deserialize, Serialize};

use crate::schema::dishes;
use crate::schema::notifications;
use crate::schema::parameters;
use crate::schema::reservation_supplements;
use crate::schema::reservations;
use crate::schema::reviews;
use crate::schema::schedule_slots;
use crate::schema::users;
use crate::types::{DayOfWeek, DishCategory, MealSlot, ReservationStatus};

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = users)]
pub struct NewUser {
    pub email: String,
    pub username: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub institute: String,
    pub is_staff: bool,
}

#[derive(AsChangeset, Debug, Clone, Default)]
#[diesel(table_name = users)]
pub struct UserChanges {
    pub username: Option<String>,
    pub password_hash: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub institute: Option<String>,
}

impl UserChanges {
    pub fn is_empty(&self) -> bool {
        self.username.is_none()
            && self.password_hash.is_none()
            && self.first_name.is_none()
            && self.last_name.is_none()
            && self.institute.is_none()
    }
}

#[derive(Insertable, Deserialize, Debug, Clone)]
#[diesel(table_name = dishes)]
pub struct NewDish {
    pub name: String,
    pub price_cents: i64,
    #[serde(default)]
    pub category: DishCategory,
    #[serde(default)]
    pub description: String,
    pub image: Option<String>,
}

#[derive(AsChangeset, Deserialize, Debug, Clone)]
#[diesel(table_name = dishes)]
pub struct DishChanges {
    pub name: Option<String>,
    pub price_cents: Option<i64>,
    pub category: Option<DishCategory>,
    pub description: Option<String>,
    pub image: Option<String>,
    #[serde(skip, default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Deserialize, Debug, Clone)]
#[diesel(table_name = schedule_slots)]
pub struct NewScheduleSlot {
    pub dish_id: i64,
    pub day: DayOfWeek,
    pub meal: MealSlot,
    pub date: NaiveDate,
    #[serde(default = "default_slot_quantity")]
    pub remaining_quantity: i32,
}

fn default_slot_quantity() -> i32 {
    crate::types::DEFAULT_SLOT_QUANTITY
}

#[derive(AsChangeset, Deserialize, Debug, Clone)]
#[diesel(table_name = schedule_slots)]
pub struct ScheduleSlotChanges {
    pub dish_id: Option<i64>,
    pub day: Option<DayOfWeek>,
    pub meal: Option<MealSlot>,
    pub date: Option<NaiveDate>,
    pub remaining_quantity: Option<i32>,
    #[serde(skip, default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = reservations)]
pub struct NewReservation {
    pub student_id: i64,
    pub slot_id: i64,
    pub quantity: i32,
    pub total_price_cents: i64,
    pub status: ReservationStatus,
}

/// A priced add-on as submitted with a reservation.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct SupplementLine {
    pub name: String,
    pub price_cents: i64,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = reservation_supplements)]
pub struct NewSupplement {
    pub reservation_id: i64,
    pub name: String,
    pub price_cents: i64,
}

#[derive(Insertable, Debug, Clone, PartialEq, Eq)]
#[diesel(table_name = notifications)]
pub struct NewNotification {
    pub recipient_id: i64,
    pub title: String,
    pub body: String,
    pub link: Option<String>,
}

#[derive(Insertable, Deserialize, Debug, Clone)]
#[diesel(table_name = parameters)]
pub struct NewParameter {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub description: String,
}

#[derive(AsChangeset, Deserialize, Debug, Clone)]
#[diesel(table_name = parameters)]
pub struct ParameterChanges {
    pub value: Option<String>,
    pub description: Option<String>,
    #[serde(skip, default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = reviews)]
pub struct NewReview {
    pub student_id: i64,
    pub dish_id: i64,
    pub rating: i32,
    pub comment: String,
}
