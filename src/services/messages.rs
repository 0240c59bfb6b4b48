use actix::Message;
use chrono::{DateTime, NaiveDate, Utc};

use crate::errors::ServiceResult;
use crate::services::db_models::{
    Dish, Notification, Parameter, Reservation, ReservationView, Review, ScheduleSlotView, User,
};
use crate::services::insertable::{
    DishChanges, NewDish, NewParameter, NewScheduleSlot, NewUser, ParameterChanges, ScheduleSlotChanges,
    SupplementLine, UserChanges,
};
use crate::types::ReservationStatus;

/// Who is asking; students only ever see their own rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewer {
    pub user_id: i64,
    pub is_staff: bool,
}

// users

#[derive(Message)]
#[rtype(result = "ServiceResult<User>")]
pub struct RegisterUser(pub NewUser);

#[derive(Message)]
#[rtype(result = "ServiceResult<Option<User>>")]
pub struct FindUserByEmail(pub String);

#[derive(Message)]
#[rtype(result = "ServiceResult<Vec<User>>")]
pub struct FetchUsers;

#[derive(Message)]
#[rtype(result = "ServiceResult<User>")]
pub struct FetchUser(pub i64);

#[derive(Message)]
#[rtype(result = "ServiceResult<User>")]
pub struct UpdateUser {
    pub id: i64,
    pub changes: UserChanges,
}

#[derive(Message)]
#[rtype(result = "ServiceResult<()>")]
pub struct DeleteUser(pub i64);

// dishes

#[derive(Message)]
#[rtype(result = "ServiceResult<Vec<Dish>>")]
pub struct FetchDishes;

#[derive(Message)]
#[rtype(result = "ServiceResult<Dish>")]
pub struct FetchDish(pub i64);

#[derive(Message)]
#[rtype(result = "ServiceResult<Dish>")]
pub struct CreateDish(pub NewDish);

#[derive(Message)]
#[rtype(result = "ServiceResult<Dish>")]
pub struct UpdateDish {
    pub id: i64,
    pub changes: DishChanges,
}

#[derive(Message)]
#[rtype(result = "ServiceResult<()>")]
pub struct DeleteDish(pub i64);

// schedule

#[derive(Message, Default)]
#[rtype(result = "ServiceResult<Vec<ScheduleSlotView>>")]
pub struct FetchSlots {
    pub date: Option<NaiveDate>,
    pub dish_id: Option<i64>,
}

#[derive(Message)]
#[rtype(result = "ServiceResult<ScheduleSlotView>")]
pub struct FetchSlot(pub i64);

#[derive(Message)]
#[rtype(result = "ServiceResult<ScheduleSlotView>")]
pub struct CreateSlot(pub NewScheduleSlot);

#[derive(Message)]
#[rtype(result = "ServiceResult<ScheduleSlotView>")]
pub struct UpdateSlot {
    pub id: i64,
    pub changes: ScheduleSlotChanges,
}

#[derive(Message)]
#[rtype(result = "ServiceResult<()>")]
pub struct DeleteSlot(pub i64);

// reservations

#[derive(Message)]
#[rtype(result = "ServiceResult<Vec<ReservationView>>")]
pub struct FetchReservations {
    pub viewer: Viewer,
    pub status: Option<ReservationStatus>,
}

#[derive(Message)]
#[rtype(result = "ServiceResult<ReservationView>")]
pub struct FetchReservation {
    pub viewer: Viewer,
    pub id: i64,
}

#[derive(Message)]
#[rtype(result = "ServiceResult<ReservationView>")]
pub struct CreateReservation {
    pub student_id: i64,
    pub slot_id: i64,
    pub quantity: i32,
    pub supplements: Vec<SupplementLine>,
}

#[derive(Message)]
#[rtype(result = "ServiceResult<Vec<ReservationView>>")]
pub struct ChangeReservationStatus {
    pub ids: Vec<i64>,
    pub status: ReservationStatus,
    pub now: DateTime<Utc>,
    /// Fail on the first rejected row instead of skipping it.
    pub strict: bool,
}

#[derive(Message)]
#[rtype(result = "ServiceResult<()>")]
pub struct CancelReservation {
    pub viewer: Viewer,
    pub id: i64,
}

#[derive(Message)]
#[rtype(result = "ServiceResult<Vec<Reservation>>")]
pub struct ExpireStaleReservations {
    pub now: DateTime<Utc>,
}

// notifications

#[derive(Message)]
#[rtype(result = "ServiceResult<Vec<Notification>>")]
pub struct FetchNotifications(pub i64);

#[derive(Message)]
#[rtype(result = "ServiceResult<Notification>")]
pub struct FetchNotification {
    pub user_id: i64,
    pub id: i64,
}

#[derive(Message)]
#[rtype(result = "ServiceResult<Notification>")]
pub struct MarkNotificationRead {
    pub user_id: i64,
    pub id: i64,
}

#[derive(Message)]
#[rtype(result = "ServiceResult<()>")]
pub struct DeleteNotification {
    pub user_id: i64,
    pub id: i64,
}

// reviews

#[derive(Message)]
#[rtype(result = "ServiceResult<Vec<Review>>")]
pub struct FetchReviews {
    pub viewer: Viewer,
    pub dish_id: Option<i64>,
    pub approved_only: bool,
}

#[derive(Message)]
#[rtype(result = "ServiceResult<Review>")]
pub struct FetchReview {
    pub viewer: Viewer,
    pub id: i64,
}

#[derive(Message)]
#[rtype(result = "ServiceResult<Review>")]
pub struct CreateReview {
    pub student_id: i64,
    pub dish_id: i64,
    pub rating: i32,
    pub comment: String,
}

/// Approves or rejects one or many reviews at once.
#[derive(Message)]
#[rtype(result = "ServiceResult<Vec<Review>>")]
pub struct SetReviewApproval {
    pub ids: Vec<i64>,
    pub approved: bool,
    /// Fail with `NotFound` when any id is missing instead of skipping it.
    pub strict: bool,
}

#[derive(Message)]
#[rtype(result = "ServiceResult<()>")]
pub struct DeleteReview {
    pub viewer: Viewer,
    pub id: i64,
}

// parameters

#[derive(Message)]
#[rtype(result = "ServiceResult<Vec<Parameter>>")]
pub struct FetchParameters;

#[derive(Message)]
#[rtype(result = "ServiceResult<Parameter>")]
pub struct FetchParameter(pub i64);

#[derive(Message)]
#[rtype(result = "ServiceResult<Parameter>")]
pub struct CreateParameter(pub NewParameter);

#[derive(Message)]
#[rtype(result = "ServiceResult<Parameter>")]
pub struct UpdateParameter {
    pub id: i64,
    pub changes: ParameterChanges,
}

#[derive(Message)]
#[rtype(result = "ServiceResult<()>")]
pub struct DeleteParameter(pub i64);
