use std::fmt::{Display, Formatter};
use std::io::Write;
use std::str::FromStr;

use diesel::deserialize::{self, FromSql, FromSqlRow};
use diesel::expression::AsExpression;
use diesel::pg::{Pg, PgValue};
use diesel::serialize::{self, IsNull, Output, ToSql};
use diesel::sql_types::Text;
use serde::{Deserialize, Serialize};

pub const EXPIRY_PARAMETER: &str = "reservation_expiry_hours";
pub const DEFAULT_EXPIRY_HOURS: i64 = 6;
pub const DISH_CATEGORIES_PARAMETER: &str = "dish_categories";
pub const DEFAULT_SLOT_QUANTITY: i32 = 50;

pub const ACCESS_TOKEN_KEY: &str = "auth:access";
pub const REFRESH_TOKEN_KEY: &str = "auth:refresh";

#[derive(Debug)]
pub struct PoolInitializationError(pub String);

impl Display for PoolInitializationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.pad(&self.0)
    }
}

impl std::error::Error for PoolInitializationError {}

/// Declares a closed set of values stored as plain text columns.
macro_rules! text_enum {
    ($(#[$meta:meta])* $name:ident { $($(#[$vmeta:meta])* $variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsExpression, FromSqlRow)]
        #[diesel(sql_type = Text)]
        pub enum $name {
            $($(#[$vmeta])* #[serde(rename = $text)] $variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                f.pad(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(format!("\"{other}\" is not a valid choice.")),
                }
            }
        }

        impl ToSql<Text, Pg> for $name {
            fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
                out.write_all(self.as_str().as_bytes())?;
                Ok(IsNull::No)
            }
        }

        impl FromSql<Text, Pg> for $name {
            fn from_sql(bytes: PgValue<'_>) -> deserialize::Result<Self> {
                let raw = std::str::from_utf8(bytes.as_bytes())?;
                raw.parse::<$name>().map_err(Into::into)
            }
        }
    };
}

text_enum! {
    #[derive(Default)]
    DishCategory {
        #[default]
        Standard => "standard",
        Vip => "vip",
        Vegetarian => "vegetarian",
        GlutenFree => "gluten_free",
    }
}

text_enum! {
    /// Days the canteen serves meals on.
    DayOfWeek {
        Monday => "monday",
        Tuesday => "tuesday",
        Wednesday => "wednesday",
        Thursday => "thursday",
        Friday => "friday",
    }
}

text_enum! {
    MealSlot {
        Lunch => "lunch",
        Dinner => "dinner",
    }
}

text_enum! {
    /// `Pending` is the only state a reservation can leave.
    ReservationStatus {
        Pending => "pending",
        Accepted => "accepted",
        Refused => "refused",
        Expired => "expired",
    }
}

impl ReservationStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ReservationStatus::Pending)
    }

    /// Statuses that block the student from booking the same slot again.
    pub fn holds_slot(&self) -> bool {
        matches!(self, ReservationStatus::Pending | ReservationStatus::Accepted)
    }
}

/// Formats an amount of cents as a two-decimal price, e.g. `1250` -> `12.50`.
pub fn format_cents(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{sign}{}.{:02}", abs / 100, abs % 100)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enums_round_trip_through_text() {
        for status in ReservationStatus::ALL {
            assert_eq!(status.as_str().parse::<ReservationStatus>(), Ok(*status));
        }
        assert_eq!("gluten_free".parse::<DishCategory>(), Ok(DishCategory::GlutenFree));
        assert!("saturday".parse::<DayOfWeek>().is_err());
    }

    #[test]
    fn serde_uses_lowercase_names() {
        let json = serde_json::to_string(&MealSlot::Dinner).unwrap();
        assert_eq!(json, "\"dinner\"");
        let slot: MealSlot = serde_json::from_str("\"lunch\"").unwrap();
        assert_eq!(slot, MealSlot::Lunch);
    }

    #[test]
    fn dishes_default_to_standard() {
        assert_eq!(DishCategory::default(), DishCategory::Standard);
        assert_eq!(DishCategory::default().as_str(), "standard");
    }

    #[test]
    fn only_pending_is_open() {
        assert!(!ReservationStatus::Pending.is_terminal());
        assert!(ReservationStatus::Accepted.is_terminal());
        assert!(ReservationStatus::Refused.is_terminal());
        assert!(ReservationStatus::Expired.is_terminal());
        assert!(ReservationStatus::Accepted.holds_slot());
        assert!(!ReservationStatus::Expired.holds_slot());
    }

    #[test]
    fn cents_are_formatted_with_two_decimals() {
        assert_eq!(format_cents(0), "0.00");
        assert_eq!(format_cents(1250), "12.50");
        assert_eq!(format_cents(7), "0.07");
        assert_eq!(format_cents(-305), "-3.05");
    }
}
