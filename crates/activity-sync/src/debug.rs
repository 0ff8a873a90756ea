//! Read-only overlap report, for checking why an event was or was not
//! treated as a duplicate of an activity.

use std::fmt;

use activity_types::{Activity, CalendarEvent, Interval};

use crate::matcher::overlaps;

/// One activity compared against one timed event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlapRow {
    pub activity_id: String,
    pub activity_summary: String,
    pub activity: Interval,
    pub event_id: String,
    pub event_summary: String,
    pub event: Interval,
    pub overlaps: bool,
}

impl fmt::Display for OverlapRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Event: {} ({})", self.event_summary, self.event_id)?;
        writeln!(f, "  event:    {}", self.event)?;
        writeln!(f, "  activity: {}", self.activity)?;
        write!(f, "  overlap:  {}", self.overlaps)
    }
}

/// Compare every activity with every timed event. No window filter is
/// applied, so rows show events the reconciler would never consider too.
pub fn overlap_rows(activities: &[Activity], events: &[CalendarEvent]) -> Vec<OverlapRow> {
    let mut rows = Vec::new();
    for activity in activities {
        let activity_span = activity.interval();
        for event in events {
            let Some(event_span) = event.interval() else {
                continue;
            };
            rows.push(OverlapRow {
                activity_id: activity.id.clone(),
                activity_summary: activity.event_summary(),
                activity: activity_span,
                event_id: event.id.clone(),
                event_summary: event.summary.clone(),
                event: event_span,
                overlaps: overlaps(&event_span, &activity_span),
            });
        }
    }
    rows
}
