use chrono::{DateTime, Utc};

/// Whole calendar days (UTC) from `previous` to `current`; negative when
/// `current` falls on an earlier day.
pub fn calendar_day_gap(previous: DateTime<Utc>, current: DateTime<Utc>) -> i64 {
    (current.date_naive() - previous.date_naive()).num_days()
}

/// Next value of a consecutive-day streak for an event at `current`.
pub fn next_streak(streak: u32, previous: Option<DateTime<Utc>>, current: DateTime<Utc>) -> u32 {
    let Some(previous) = previous else {
        return 1;
    };

    match calendar_day_gap(previous, current) {
        1 => streak.saturating_add(1),
        gap if gap > 1 => 1,
        // same day, or out-of-order event
        _ => streak.max(1),
    }
}
