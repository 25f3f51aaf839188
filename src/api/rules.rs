//! Scheduling rules shared by create and update.

use chrono::{DateTime, Datelike, FixedOffset, Utc, Weekday};

/// An event is "in the past" when it has already ended
pub fn is_event_in_past(end: DateTime<FixedOffset>, now: DateTime<Utc>) -> bool {
    end < now
}

/// Friday and Saturday starts are refused. The weekday is read in the offset
/// the caller supplied.
pub fn is_event_on_weekend(start: DateTime<FixedOffset>) -> bool {
    matches!(start.weekday(), Weekday::Fri | Weekday::Sat)
}

/// True if either rule rejects the event
pub fn violates_schedule_rules(
    start: DateTime<FixedOffset>,
    end: DateTime<FixedOffset>,
    now: DateTime<Utc>,
) -> bool {
    is_event_in_past(end, now) || is_event_on_weekend(start)
}
