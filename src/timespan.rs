//! Descriptive timespan labels for the preamble.
//!
//! The timespan field is a human label only; it never participates in block
//! lookup. A range that fills a single calendar year (give or take a day)
//! reads as `2024`, one that fills a decade as `2020s`, and anything else as
//! an explicit `YYYY-YYYY` range.

use hifitime::Epoch;

use crate::calendar::{date_of, month_start, one_day};

/// Infer the preamble timespan label for a covered range.
///
/// A one-day buffer is allowed on each side, so a file starting on
/// `1999-12-31` and ending on `2001-01-01` still reads as `2000`.
/// `custom`, when provided, wins outright.
pub fn descriptive_timespan(start: Epoch, end: Epoch, custom: Option<&str>) -> String {
    if let Some(label) = custom {
        return label.to_string();
    }

    let midpoint = start + (end - start) * 0.5;
    let (mid_year, ..) = date_of(midpoint);

    if fills(start, end, year_span(mid_year, 1)) {
        return format!("{mid_year}");
    }

    let decade = mid_year.div_euclid(10) * 10;
    if fills(start, end, year_span(decade, 10)) {
        return format!("{decade}s");
    }

    let (start_year, ..) = date_of(start);
    let (end_year, ..) = date_of(end);
    format!("{start_year}-{end_year}")
}

fn year_span(year: i32, duration: i32) -> (Epoch, Epoch) {
    (month_start(year, 1), month_start(year + duration, 1))
}

fn fills(start: Epoch, end: Epoch, nominal: (Epoch, Epoch)) -> bool {
    start >= nominal.0 - one_day() && end <= nominal.1 + one_day()
}

#[cfg(test)]
mod timespan_test {
    use super::*;
    use crate::calendar::day_start;

    #[test]
    fn test_single_year() {
        let start = day_start((2024, 1, 1));
        let end = day_start((2024, 12, 31));
        assert_eq!(descriptive_timespan(start, end, None), "2024");
    }

    #[test]
    fn test_single_year_with_buffer() {
        let start = day_start((1999, 12, 31));
        let end = day_start((2001, 1, 1));
        assert_eq!(descriptive_timespan(start, end, None), "2000");
    }

    #[test]
    fn test_partial_year_is_still_that_year() {
        let start = day_start((2024, 1, 1));
        let end = day_start((2024, 2, 1));
        assert_eq!(descriptive_timespan(start, end, None), "2024");
    }

    #[test]
    fn test_decade() {
        let start = day_start((2000, 1, 1));
        let end = day_start((2009, 12, 31));
        assert_eq!(descriptive_timespan(start, end, None), "2000s");
    }

    #[test]
    fn test_decade_with_buffer() {
        let start = day_start((1999, 12, 31));
        let end = day_start((2010, 1, 1));
        assert_eq!(descriptive_timespan(start, end, None), "2000s");
    }

    #[test]
    fn test_multi_decade_range() {
        let start = day_start((1900, 1, 1));
        let end = day_start((2100, 1, 1));
        assert_eq!(descriptive_timespan(start, end, None), "1900-2100");
    }

    #[test]
    fn test_custom_wins() {
        let start = day_start((2024, 1, 1));
        let end = day_start((2024, 12, 31));
        assert_eq!(
            descriptive_timespan(start, end, Some("my-span")),
            "my-span"
        );
    }
}
