use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Separator between activity type and name in created event summaries.
pub const SUMMARY_SEPARATOR: &str = " – ";

/// A time span compared with strict inequalities, so spans that only touch
/// at an endpoint do not overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Interval {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} to {}",
            self.start.to_rfc3339(),
            self.end.to_rfc3339()
        )
    }
}

// ============================================================================
// Activities
// ============================================================================

/// A recorded fitness session fetched from the activity tracker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    pub id: String,
    pub name: String,
    /// Free-text category reported by the tracker ("Run", "Ride", ...)
    #[serde(rename = "type")]
    pub kind: String,
    pub start: DateTime<Utc>,
    pub duration_min: u32,
}

impl Activity {
    pub fn end(&self) -> DateTime<Utc> {
        self.start + Duration::minutes(i64::from(self.duration_min))
    }

    pub fn interval(&self) -> Interval {
        Interval::new(self.start, self.end())
    }

    /// Summary used for the calendar entry created for this activity
    pub fn event_summary(&self) -> String {
        format!("{}{}{}", self.kind, SUMMARY_SEPARATOR, self.name)
    }
}

/// Why a raw activity record was not turned into an [`Activity`]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SkipReason {
    #[error("missing field `{0}`")]
    MissingField(&'static str),

    #[error("invalid field `{field}`: {detail}")]
    InvalidField { field: &'static str, detail: String },

    #[error("record is not an object")]
    NotAnObject,
}

/// A raw record that was dropped while parsing an activity list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRecord {
    /// Identifier of the record when it could be read
    pub id: Option<String>,
    pub reason: SkipReason,
}

impl fmt::Display for SkippedRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.id {
            Some(id) => write!(f, "activity {}: {}", id, self.reason),
            None => write!(f, "activity <unknown id>: {}", self.reason),
        }
    }
}

/// Result of parsing one raw activity record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivityRecord {
    Parsed(Activity),
    Skipped(SkippedRecord),
}

/// Activities returned by one fetch, with the records that were skipped
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivityBatch {
    pub activities: Vec<Activity>,
    pub skipped: Vec<SkippedRecord>,
}

impl FromIterator<ActivityRecord> for ActivityBatch {
    fn from_iter<I: IntoIterator<Item = ActivityRecord>>(iter: I) -> Self {
        let mut batch = ActivityBatch::default();
        for record in iter {
            match record {
                ActivityRecord::Parsed(activity) => batch.activities.push(activity),
                ActivityRecord::Skipped(skipped) => batch.skipped.push(skipped),
            }
        }
        batch
    }
}

impl From<Vec<Activity>> for ActivityBatch {
    fn from(activities: Vec<Activity>) -> Self {
        Self {
            activities,
            skipped: Vec::new(),
        }
    }
}

// ============================================================================
// Calendar events
// ============================================================================

/// Start or end of a calendar event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventTime {
    /// Event with a time of day
    Timed(DateTime<Utc>),
    /// All-day event, date only
    AllDay(NaiveDate),
}

impl EventTime {
    pub fn as_timed(&self) -> Option<DateTime<Utc>> {
        match self {
            EventTime::Timed(at) => Some(*at),
            EventTime::AllDay(_) => None,
        }
    }
}

/// An existing entry on the target calendar
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub id: String,
    pub summary: String,
    pub start: EventTime,
    pub end: EventTime,
}

impl CalendarEvent {
    /// Timed span of the event. `None` unless both start and end carry a
    /// time of day.
    pub fn interval(&self) -> Option<Interval> {
        match (self.start.as_timed(), self.end.as_timed()) {
            (Some(start), Some(end)) => Some(Interval::new(start, end)),
            _ => None,
        }
    }

    pub fn is_all_day(&self) -> bool {
        matches!(self.start, EventTime::AllDay(_))
    }
}

/// A calendar entry to be inserted for an activity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEvent {
    pub summary: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Identifier of the activity this entry mirrors
    pub activity_id: String,
}

impl NewEvent {
    pub fn for_activity(activity: &Activity) -> Self {
        Self {
            summary: activity.event_summary(),
            start: activity.start,
            end: activity.end(),
            activity_id: activity.id.clone(),
        }
    }
}

/// Calendar entry returned by the calendar after a successful insert
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedEvent {
    pub id: String,
    pub summary: String,
}
