//! Coarse pre-filter that narrows the run's event list to the entries worth
//! running through the matcher for one activity.

use activity_types::{Activity, CalendarEvent};
use chrono::{DateTime, Duration, Utc};

/// Events this many seconds or more from an activity are never candidates.
pub const CANDIDATE_WINDOW_SECS: i64 = 86_400;

pub fn candidate_window() -> Duration {
    Duration::seconds(CANDIDATE_WINDOW_SECS)
}

/// How distance between an event and an activity is measured
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum WindowPolicy {
    /// Distance between the two start times. Excludes long events that start
    /// a day or more away from the activity even when they overlap it.
    #[default]
    StartDistance,
    /// Gap between the two spans, zero when they overlap. Needs a timed end
    /// on the event.
    IntervalGap,
}

impl WindowPolicy {
    pub fn as_str(&self) -> &str {
        match self {
            WindowPolicy::StartDistance => "start-distance",
            WindowPolicy::IntervalGap => "interval-gap",
        }
    }
}

/// Events from `events` close enough to `activity` to be tested for overlap.
/// All-day events are always dropped.
pub fn candidate_events<'a>(
    events: &'a [CalendarEvent],
    activity: &Activity,
    policy: WindowPolicy,
) -> Vec<&'a CalendarEvent> {
    events
        .iter()
        .filter(|event| within_window(event, activity, policy))
        .collect()
}

fn within_window(event: &CalendarEvent, activity: &Activity, policy: WindowPolicy) -> bool {
    let Some(event_start) = event.start.as_timed() else {
        return false;
    };

    match policy {
        WindowPolicy::StartDistance => abs_distance(event_start, activity.start) < candidate_window(),
        WindowPolicy::IntervalGap => match event.end.as_timed() {
            Some(event_end) => {
                let gap = if event_end <= activity.start {
                    activity.start - event_end
                } else if activity.end() <= event_start {
                    event_start - activity.end()
                } else {
                    Duration::zero()
                };
                gap < candidate_window()
            }
            None => abs_distance(event_start, activity.start) < candidate_window(),
        },
    }
}

fn abs_distance(a: DateTime<Utc>, b: DateTime<Utc>) -> Duration {
    (a - b).abs()
}
