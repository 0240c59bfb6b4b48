//! Reservation rules that do not need a database connection.
//!
//! Handlers in `pg_handling` load rows, ask these functions what should
//! happen, then persist the outcome inside one transaction.

use std::collections::HashSet;

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};

use crate::errors::{ServiceError, ServiceResult};
use crate::services::db_models::{Dish, ScheduleSlot};
use crate::services::insertable::SupplementLine;
use crate::types::{format_cents, DayOfWeek, MealSlot, ReservationStatus, DEFAULT_EXPIRY_HOURS};

/// Unit price times quantity plus every supplement, in cents.
/// Overflow is a validation error on the field that caused it.
pub fn total_price_cents<I>(unit_price_cents: i64, quantity: i32, supplement_prices: I) -> ServiceResult<i64>
where
    I: IntoIterator<Item = i64>,
{
    let mut total = unit_price_cents
        .checked_mul(i64::from(quantity))
        .ok_or_else(|| ServiceError::validation("quantity", "Total price is too large."))?;
    for price in supplement_prices {
        total = total
            .checked_add(price)
            .ok_or_else(|| ServiceError::validation("supplements", "Total price is too large."))?;
    }
    Ok(total)
}

pub fn supplement_prices(supplements: &[SupplementLine]) -> impl Iterator<Item = i64> + '_ {
    supplements.iter().map(|s| s.price_cents)
}

pub fn validate_request(quantity: i32, supplements: &[SupplementLine]) -> ServiceResult<()> {
    if quantity < 1 {
        return Err(ServiceError::validation("quantity", "Ensure this value is greater than or equal to 1."));
    }
    if let Some(bad) = supplements.iter().find(|s| s.price_cents < 0) {
        return Err(ServiceError::validation(
            "supplements",
            format!("Supplement \"{}\" has a negative price.", bad.name),
        ));
    }
    if supplements.iter().any(|s| s.name.trim().is_empty()) {
        return Err(ServiceError::validation("supplements", "Every supplement needs a name."));
    }
    Ok(())
}

pub fn insufficient_quantity(remaining: i32) -> ServiceError {
    ServiceError::validation(
        "quantity",
        format!("Quantity not available. Only {remaining} serving(s) left."),
    )
}

pub fn check_quantity(remaining: i32, requested: i32) -> ServiceResult<()> {
    if requested > remaining {
        return Err(insufficient_quantity(remaining));
    }
    Ok(())
}

pub fn duplicate_reservation() -> ServiceError {
    ServiceError::non_field("You already have a reservation for this slot.")
}

/// A missing or unparsable parameter falls back to the default window.
pub fn parse_expiry_hours(raw: Option<&str>) -> i64 {
    raw.and_then(|value| value.trim().parse::<i64>().ok())
        .filter(|hours| *hours >= 0)
        .unwrap_or(DEFAULT_EXPIRY_HOURS)
}

pub fn expiry_cutoff(now: DateTime<Utc>, window_hours: i64) -> DateTime<Utc> {
    now - Duration::hours(window_hours)
}

pub fn is_stale(created_at: DateTime<Utc>, now: DateTime<Utc>, window_hours: i64) -> bool {
    created_at < expiry_cutoff(now, window_hours)
}

/// Decides the status a reservation ends up in when `requested` is asked for.
///
/// Terminal reservations never move. A pending reservation older than the
/// expiry window becomes `Expired` no matter what was requested.
pub fn resolve_transition(
    current: ReservationStatus,
    requested: ReservationStatus,
    created_at: DateTime<Utc>,
    now: DateTime<Utc>,
    window_hours: i64,
) -> ServiceResult<ReservationStatus> {
    if current.is_terminal() {
        return Err(ServiceError::validation(
            "status",
            format!("Reservation is already {current} and can no longer change."),
        ));
    }
    if requested == ReservationStatus::Pending {
        return Err(ServiceError::validation("status", "A reservation cannot be moved back to pending."));
    }
    if is_stale(created_at, now, window_hours) {
        return Ok(ReservationStatus::Expired);
    }
    Ok(requested)
}

/// Field-level differences between two versions of a slot, quantity excluded.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SlotChanges {
    pub lines: Vec<String>,
}

impl SlotChanges {
    pub fn is_substantive(&self) -> bool {
        !self.lines.is_empty()
    }
}

pub fn diff_slot(old: &ScheduleSlot, old_dish: &Dish, new: &ScheduleSlot, new_dish: &Dish) -> SlotChanges {
    let mut lines = vec![];
    if old.day != new.day {
        lines.push(format!("Day: {} -> {}", old.day, new.day));
    }
    if old.meal != new.meal {
        lines.push(format!("Meal: {} -> {}", old.meal, new.meal));
    }
    if old.date != new.date {
        lines.push(format!("Date: {} -> {}", old.date, new.date));
    }
    if old.dish_id != new.dish_id {
        lines.push(format!("Dish: {} -> {}", old_dish.name, new_dish.name));
    }
    SlotChanges { lines }
}

/// Monday and Sunday of the ISO week containing `date`.
pub fn week_bounds(date: NaiveDate) -> (NaiveDate, NaiveDate) {
    let monday = date - Duration::days(i64::from(date.weekday().num_days_from_monday()));
    (monday, monday + Duration::days(6))
}

/// A week is complete once every service day and both meals are scheduled.
pub fn week_is_complete<I>(slots: I) -> bool
where
    I: IntoIterator<Item = (DayOfWeek, MealSlot)>,
{
    let mut days = HashSet::new();
    let mut meals = HashSet::new();
    for (day, meal) in slots {
        days.insert(day);
        meals.insert(meal);
    }
    days.len() == DayOfWeek::ALL.len() && meals.len() == MealSlot::ALL.len()
}

pub fn describe_total(total_cents: i64) -> String {
    format!("{} fcfa", format_cents(total_cents))
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use proptest::prelude::*;

    use super::*;
    use crate::types::DishCategory;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 4, hour, 0, 0).unwrap()
    }

    fn line(name: &str, price_cents: i64) -> SupplementLine {
        SupplementLine { name: name.to_owned(), price_cents }
    }

    fn dish(id: i64, name: &str) -> Dish {
        Dish {
            id,
            name: name.to_owned(),
            price_cents: 1500,
            category: DishCategory::Standard,
            description: String::new(),
            image: None,
            created_at: at(0),
            updated_at: at(0),
        }
    }

    fn slot(dish_id: i64, day: DayOfWeek, meal: MealSlot, remaining: i32) -> ScheduleSlot {
        ScheduleSlot {
            id: 1,
            dish_id,
            day,
            meal,
            date: NaiveDate::from_ymd_opt(2024, 3, 4).unwrap(),
            remaining_quantity: remaining,
            created_at: at(0),
            updated_at: at(0),
        }
    }

    #[test]
    fn total_adds_supplements_once() {
        let supplements = [line("sauce", 250), line("drink", 500)];
        assert_eq!(total_price_cents(1500, 2, supplement_prices(&supplements)).unwrap(), 3750);
        assert_eq!(total_price_cents(1500, 1, []).unwrap(), 1500);
    }

    #[test]
    fn oversized_totals_are_rejected_not_wrapped() {
        let huge = [line("gold leaf", i64::MAX)];
        match total_price_cents(1000, 1, supplement_prices(&huge)).unwrap_err() {
            ServiceError::Validation { field, .. } => assert_eq!(field, "supplements"),
            other => panic!("unexpected error {other:?}"),
        }

        match total_price_cents(i64::MAX, 2, []).unwrap_err() {
            ServiceError::Validation { field, .. } => assert_eq!(field, "quantity"),
            other => panic!("unexpected error {other:?}"),
        }

        let two_halves = [line("a", i64::MAX / 2 + 1), line("b", i64::MAX / 2 + 1)];
        assert!(total_price_cents(0, 1, supplement_prices(&two_halves)).is_err());
    }

    #[test]
    fn request_validation() {
        assert!(validate_request(1, &[]).is_ok());
        assert!(validate_request(0, &[]).is_err());
        assert!(validate_request(1, &[line("x", -1)]).is_err());
        assert!(validate_request(1, &[line(" ", 10)]).is_err());
    }

    #[test]
    fn shortfall_names_remaining_quantity() {
        let err = check_quantity(1, 2).unwrap_err();
        match err {
            ServiceError::Validation { field, message } => {
                assert_eq!(field, "quantity");
                assert!(message.contains("Only 1 serving(s) left"));
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert!(check_quantity(2, 2).is_ok());
    }

    #[test]
    fn expiry_hours_fall_back_to_default() {
        assert_eq!(parse_expiry_hours(Some("12")), 12);
        assert_eq!(parse_expiry_hours(Some(" 3 ")), 3);
        assert_eq!(parse_expiry_hours(Some("six")), DEFAULT_EXPIRY_HOURS);
        assert_eq!(parse_expiry_hours(Some("-2")), DEFAULT_EXPIRY_HOURS);
        assert_eq!(parse_expiry_hours(None), DEFAULT_EXPIRY_HOURS);
    }

    #[test]
    fn staleness_is_strictly_older_than_window() {
        assert!(is_stale(at(1), at(8), 6));
        assert!(!is_stale(at(2), at(8), 6));
        assert!(!is_stale(at(7), at(8), 6));
    }

    #[test]
    fn pending_moves_to_requested_terminal_status() {
        let status = resolve_transition(ReservationStatus::Pending, ReservationStatus::Accepted, at(7), at(8), 6);
        assert_eq!(status.unwrap(), ReservationStatus::Accepted);
        let status = resolve_transition(ReservationStatus::Pending, ReservationStatus::Refused, at(7), at(8), 6);
        assert_eq!(status.unwrap(), ReservationStatus::Refused);
    }

    #[test]
    fn stale_pending_resolves_to_expired() {
        let status = resolve_transition(ReservationStatus::Pending, ReservationStatus::Accepted, at(0), at(8), 6);
        assert_eq!(status.unwrap(), ReservationStatus::Expired);
    }

    #[test]
    fn terminal_statuses_reject_transitions() {
        for current in [ReservationStatus::Accepted, ReservationStatus::Refused, ReservationStatus::Expired] {
            for requested in ReservationStatus::ALL {
                assert!(resolve_transition(current, *requested, at(7), at(8), 6).is_err());
            }
        }
        assert!(resolve_transition(ReservationStatus::Pending, ReservationStatus::Pending, at(7), at(8), 6).is_err());
    }

    #[test]
    fn quantity_only_update_is_not_substantive() {
        let pasta = dish(1, "Pasta");
        let old = slot(1, DayOfWeek::Monday, MealSlot::Lunch, 50);
        let new = slot(1, DayOfWeek::Monday, MealSlot::Lunch, 10);
        assert!(!diff_slot(&old, &pasta, &new, &pasta).is_substantive());
    }

    #[test]
    fn dish_and_meal_changes_are_listed() {
        let pasta = dish(1, "Pasta");
        let rice = dish(2, "Rice");
        let old = slot(1, DayOfWeek::Monday, MealSlot::Lunch, 50);
        let new = slot(2, DayOfWeek::Monday, MealSlot::Dinner, 50);
        let changes = diff_slot(&old, &pasta, &new, &rice);
        assert_eq!(changes.lines, vec!["Meal: lunch -> dinner".to_owned(), "Dish: Pasta -> Rice".to_owned()]);
    }

    #[test]
    fn week_bounds_span_monday_to_sunday() {
        let thursday = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        let (start, end) = week_bounds(thursday);
        assert_eq!(start, NaiveDate::from_ymd_opt(2024, 3, 4).unwrap());
        assert_eq!(end, NaiveDate::from_ymd_opt(2024, 3, 10).unwrap());
    }

    #[test]
    fn week_completion_needs_all_days_and_meals() {
        let mut slots: Vec<_> = DayOfWeek::ALL.iter().map(|d| (*d, MealSlot::Lunch)).collect();
        assert!(!week_is_complete(slots.clone()));
        slots.push((DayOfWeek::Friday, MealSlot::Dinner));
        assert!(week_is_complete(slots));
    }

    proptest! {
        #[test]
        fn total_matches_formula(
            unit in 0i64..100_000,
            quantity in 1i32..50,
            prices in proptest::collection::vec(0i64..10_000, 0..8),
        ) {
            let supplements: Vec<_> = prices.iter().map(|p| line("extra", *p)).collect();
            let expected = unit * i64::from(quantity) + prices.iter().sum::<i64>();
            prop_assert_eq!(total_price_cents(unit, quantity, supplement_prices(&supplements)).unwrap(), expected);
        }

        #[test]
        fn accepted_reservations_never_overdraw(
            initial in 0i32..200,
            requests in proptest::collection::vec(1i32..10, 0..40),
        ) {
            let mut remaining = initial;
            let mut granted = 0;
            for requested in requests {
                if check_quantity(remaining, requested).is_ok() {
                    remaining -= requested;
                    granted += requested;
                }
                prop_assert!(remaining >= 0);
            }
            prop_assert_eq!(remaining, initial - granted);
        }
    }
}
