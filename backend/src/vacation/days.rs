//! Calendar arithmetic for leave requests.
//!
//! All spans are inclusive on both ends: a request from Monday to Monday
//! of the following week covers eight calendar days. Only Saturday and
//! Sunday are treated as non-working days; there is no holiday calendar.

use time::{Date, Weekday};

/// Inclusive number of calendar days in `[start, end]`.
///
/// Returns 0 when `end` precedes `start`.
pub fn total_day_span(start: Date, end: Date) -> i64 {
    if end < start {
        return 0;
    }
    (end - start).whole_days() + 1
}

/// Number of weekdays (Monday..=Friday) in `[start, end]`.
pub fn business_day_span(start: Date, end: Date) -> i64 {
    days_in(start, end).filter(|d| !is_weekend(*d)).count() as i64
}

/// Number of Saturdays and Sundays in `[start, end]`.
pub fn weekend_day_span(start: Date, end: Date) -> i64 {
    days_in(start, end).filter(|d| is_weekend(*d)).count() as i64
}

/// Inclusive-inclusive overlap test. Touching endpoints overlap.
pub fn intervals_overlap(a_start: Date, a_end: Date, b_start: Date, b_end: Date) -> bool {
    a_start <= b_end && b_start <= a_end
}

pub fn is_weekend(date: Date) -> bool {
    matches!(date.weekday(), Weekday::Saturday | Weekday::Sunday)
}

fn days_in(start: Date, end: Date) -> impl Iterator<Item = Date> {
    std::iter::successors((start <= end).then_some(start), move |d| {
        d.next_day().filter(|next| *next <= end)
    })
}
