//! Event scheduler: classifies a community quest's availability window
//! and renders the countdown label shown next to it.

use chrono::{DateTime, Duration, Utc};

/// Availability of a time-boxed event at a given instant. Bounds are
/// inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventStatus {
    /// `now < event_start`
    Upcoming,
    /// `event_start <= now <= event_end`
    Live,
    /// `now > event_end`
    Closed,
}

impl EventStatus {
    pub fn classify(start: DateTime<Utc>, end: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        if now < start {
            EventStatus::Upcoming
        } else if now <= end {
            EventStatus::Live
        } else {
            EventStatus::Closed
        }
    }
}

/// Human-meaningful time-remaining/until label for an event window:
/// "starts in 2d 4h", "ends in 3h 12m", or "ended".
pub fn countdown_label(start: DateTime<Utc>, end: DateTime<Utc>, now: DateTime<Utc>) -> String {
    match EventStatus::classify(start, end, now) {
        EventStatus::Upcoming => format!("starts in {}", humanize(start - now)),
        EventStatus::Live => format!("ends in {}", humanize(end - now)),
        EventStatus::Closed => "ended".to_string(),
    }
}

/// Render a duration as its two most significant units, floored. Never
/// empty: sub-minute deltas read "under 1m".
fn humanize(delta: Duration) -> String {
    let days = delta.num_days();
    let hours = delta.num_hours() % 24;
    let minutes = delta.num_minutes() % 60;

    if days > 0 {
        format!("{}d {}h", days, hours)
    } else if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else if minutes > 0 {
        format!("{}m", minutes)
    } else {
        "under 1m".to_string()
    }
}
