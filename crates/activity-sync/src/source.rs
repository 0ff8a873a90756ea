//! Interfaces the reconciler consumes. Real implementations live in
//! [`crate::strava_client`] and [`crate::calendar_client`].

use activity_types::{ActivityBatch, CalendarEvent, CreatedEvent, NewEvent};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::SourceError;

/// Supplies recently recorded activities
#[async_trait]
pub trait ActivitySource: Send + Sync {
    /// Fetch activities that started after `after`. Malformed records are
    /// returned in [`ActivityBatch::skipped`] instead of failing the fetch.
    async fn fetch_activities(&self, after: DateTime<Utc>) -> Result<ActivityBatch, SourceError>;
}

/// Outcome of a successful delete
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    /// The event no longer existed (404/410). Counts as success.
    AlreadyGone,
}

/// Reads and writes entries on the target calendar
#[async_trait]
pub trait EventSource: Send + Sync {
    /// List events between `time_min` and `time_max`, expanded to single
    /// instances and ordered by start time.
    async fn list_events(
        &self,
        time_min: DateTime<Utc>,
        time_max: DateTime<Utc>,
    ) -> Result<Vec<CalendarEvent>, SourceError>;

    async fn delete_event(&self, event_id: &str) -> Result<DeleteOutcome, SourceError>;

    async fn create_event(&self, event: &NewEvent) -> Result<CreatedEvent, SourceError>;
}
