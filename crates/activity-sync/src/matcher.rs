//! Decides whether a calendar event already represents an activity.

use activity_types::{Activity, CalendarEvent, Interval};

/// True when the two spans share at least one instant. Spans that only touch
/// at an endpoint do not overlap.
pub fn overlaps(event: &Interval, activity: &Interval) -> bool {
    activity.start < event.end && event.start < activity.end
}

/// True when `event` is timed and overlaps the activity's span.
/// All-day events never match.
pub fn is_match(event: &CalendarEvent, activity: &Activity) -> bool {
    match event.interval() {
        Some(span) => overlaps(&span, &activity.interval()),
        None => false,
    }
}
