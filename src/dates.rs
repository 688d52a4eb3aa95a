//! Calendar helpers. Dates travel as `NaiveDate` and are persisted as `YYYY-MM-DD`.

use chrono::{Datelike, Duration, NaiveDate};

pub const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Parses a strict `YYYY-MM-DD` date.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if value.len() != 10 {
        return None;
    }
    NaiveDate::parse_from_str(value, DATE_FORMAT).ok()
}

pub fn add_days(date: NaiveDate, days: i64) -> NaiveDate {
    date.checked_add_signed(Duration::days(days)).unwrap_or(date)
}

/// Whole days from `from` to `to` (negative when `to` is earlier).
pub fn days_between(from: NaiveDate, to: NaiveDate) -> i64 {
    (to - from).num_days()
}

pub fn is_past(date: NaiveDate, today: NaiveDate) -> bool {
    date < today
}

pub fn is_today(date: NaiveDate, today: NaiveDate) -> bool {
    date == today
}

pub fn is_future(date: NaiveDate, today: NaiveDate) -> bool {
    date > today
}

/// `month` is 1-based.
pub fn days_in_month(year: i32, month: u32) -> u32 {
    let next_month = if month == 12 { 1 } else { month + 1 };
    let next_year = if month == 12 { year + 1 } else { year };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|first_next| first_next.pred_opt())
        .map(|last| last.day())
        .unwrap_or(0)
}

/// Every date of the month, in order. Empty for an invalid month.
pub fn month_days(year: i32, month: u32) -> Vec<NaiveDate> {
    (1..=days_in_month(year, month))
        .filter_map(|day| NaiveDate::from_ymd_opt(year, month, day))
        .collect()
}

/// Weekday of the 1st as a Sunday-based index (0 = Sunday), i.e. the number of
/// blank cells before day 1 in a Sunday-first calendar grid.
pub fn first_weekday_of_month(year: i32, month: u32) -> u32 {
    NaiveDate::from_ymd_opt(year, month, 1)
        .map(|first| first.weekday().num_days_from_sunday())
        .unwrap_or(0)
}

/// The `n` days ending at `today`, oldest first.
pub fn last_n_days(today: NaiveDate, n: u32) -> Vec<NaiveDate> {
    (0..i64::from(n))
        .rev()
        .map(|offset| add_days(today, -offset))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn parse_and_format_are_fixed_width() {
        assert_eq!(parse_date("2024-01-03"), Some(d(2024, 1, 3)));
        assert_eq!(format_date(d(2024, 1, 3)), "2024-01-03");
        assert_eq!(parse_date("2024-1-3"), None);
        assert_eq!(parse_date("not a date"), None);
        assert_eq!(parse_date("2024-02-30"), None);
    }

    #[test]
    fn day_arithmetic_crosses_month_and_year_boundaries() {
        assert_eq!(add_days(d(2024, 1, 31), 1), d(2024, 2, 1));
        assert_eq!(add_days(d(2024, 1, 1), -1), d(2023, 12, 31));
        assert_eq!(days_between(d(2024, 1, 1), d(2024, 1, 3)), 2);
        assert_eq!(days_between(d(2024, 1, 3), d(2024, 1, 1)), -2);
    }

    #[test]
    fn past_today_future_compare_against_given_today() {
        let today = d(2024, 1, 3);
        assert!(is_past(d(2024, 1, 2), today));
        assert!(is_today(today, today));
        assert!(is_future(d(2024, 1, 4), today));
        assert!(!is_past(today, today));
    }

    #[test]
    fn month_grid_helpers() {
        assert_eq!(days_in_month(2024, 2), 29);
        assert_eq!(days_in_month(2023, 2), 28);
        assert_eq!(days_in_month(2024, 12), 31);
        assert_eq!(month_days(2024, 4).len(), 30);
        assert_eq!(month_days(2024, 4)[0], d(2024, 4, 1));
        assert!(month_days(2024, 13).is_empty());
        // 2024-09-01 is a Sunday, 2024-01-01 a Monday.
        assert_eq!(first_weekday_of_month(2024, 9), 0);
        assert_eq!(first_weekday_of_month(2024, 1), 1);
    }

    #[test]
    fn last_n_days_is_oldest_first_and_ends_today() {
        let days = last_n_days(d(2024, 3, 1), 30);
        assert_eq!(days.len(), 30);
        assert_eq!(days[0], d(2024, 2, 1));
        assert_eq!(days[29], d(2024, 3, 1));
    }
}
