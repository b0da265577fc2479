use hifitime::{Duration, Epoch};

use crate::constants::Date;

pub fn is_leap_year(year: i32) -> bool {
    year % 4 == 0 && (year % 100 != 0 || year % 400 == 0)
}

/// Number of days in a UTC calendar month.
pub fn days_in_month(year: i32, month: u8) -> u8 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 => {
            if is_leap_year(year) {
                29
            } else {
                28
            }
        }
        _ => 0,
    }
}

/// Midnight UTC at the start of a calendar day.
pub fn day_start(date: Date) -> Epoch {
    Epoch::from_gregorian_utc_at_midnight(date.0, date.1, date.2)
}

/// Midnight UTC at the start of a calendar month.
pub fn month_start(year: i32, month: u8) -> Epoch {
    Epoch::from_gregorian_utc_at_midnight(year, month, 1)
}

/// The month following `(year, month)`.
pub fn next_month(year: i32, month: u8) -> (i32, u8) {
    if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    }
}

/// The UTC calendar date containing an instant.
pub fn date_of(t: Epoch) -> Date {
    let (year, month, day, ..) = t.to_gregorian_utc();
    (year, month, day)
}

/// Calendar successor of a date, computed without time arithmetic so leap
/// seconds cannot shift the day boundary.
pub fn next_day(date: Date) -> Date {
    let (year, month, day) = date;
    if day < days_in_month(year, month) {
        (year, month, day + 1)
    } else {
        let (next_y, next_m) = next_month(year, month);
        (next_y, next_m, 1)
    }
}

/// Calendar predecessor of a date.
pub fn previous_day(date: Date) -> Date {
    let (year, month, day) = date;
    if day > 1 {
        (year, month, day - 1)
    } else if month == 1 {
        (year - 1, 12, 31)
    } else {
        (year, month - 1, days_in_month(year, month - 1))
    }
}

/// Affine map of `t` onto `[-1, 1]` over the interval `[start, end)`.
pub fn normalize_instant(t: Epoch, start: Epoch, end: Epoch) -> f64 {
    let span = (end - start).to_seconds();
    let elapsed = (t - start).to_seconds();
    let x = 2.0 * (elapsed / span) - 1.0;
    x.clamp(-1.0, 1.0)
}

pub fn one_day() -> Duration {
    Duration::from_days(1.0)
}
