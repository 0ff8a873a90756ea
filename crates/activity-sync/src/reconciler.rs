//! One reconciliation run: fetch activities and calendar events, delete
//! events that duplicate an activity, then create a fresh event per activity.
//!
//! The calendar is the only persisted state. A run never rolls back a delete
//! when the following create fails; such activities are listed by
//! [`RunReport::unrepresented`] so they can be fixed by hand.

use activity_types::{Activity, CalendarEvent, NewEvent, SkippedRecord};
use chrono::{DateTime, Duration, Utc};
use tracing::Instrument;

use crate::matcher::is_match;
use crate::source::{ActivitySource, DeleteOutcome, EventSource};
use crate::window::{candidate_events, WindowPolicy};

/// Tuning knobs for a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncSettings {
    /// How far back activities and events are fetched
    pub lookback: Duration,
    /// How far past "now" events are fetched, to catch activities that just ended
    pub lookahead: Duration,
    pub window_policy: WindowPolicy,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            lookback: Duration::days(3),
            lookahead: Duration::hours(6),
            window_policy: WindowPolicy::StartDistance,
        }
    }
}

/// A delete that failed for a reason other than the event being gone
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteFailure {
    pub event_id: String,
    pub error: String,
}

/// What happened to one activity during a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivityOutcome {
    pub activity_id: String,
    pub summary: String,
    /// Matched events removed by this run
    pub deleted: Vec<String>,
    /// Matched events that were already gone when deleted
    pub already_gone: Vec<String>,
    pub delete_failures: Vec<DeleteFailure>,
    /// Id of the event created for the activity
    pub created: Option<String>,
    pub create_error: Option<String>,
}

impl ActivityOutcome {
    fn new(activity: &Activity) -> Self {
        Self {
            activity_id: activity.id.clone(),
            summary: activity.event_summary(),
            ..Default::default()
        }
    }

    /// Deletes that ended with the event absent from the calendar
    pub fn successful_deletes(&self) -> usize {
        self.deleted.len() + self.already_gone.len()
    }

    pub fn has_failures(&self) -> bool {
        !self.delete_failures.is_empty() || self.create_error.is_some()
    }
}

/// Result of a full run, with enough detail to remediate every failure
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub activities_fetched: usize,
    pub events_fetched: usize,
    pub skipped: Vec<SkippedRecord>,
    pub activity_fetch_error: Option<String>,
    pub event_fetch_error: Option<String>,
    pub outcomes: Vec<ActivityOutcome>,
}

impl RunReport {
    /// A source fetch failed and the run continued with an empty set
    pub fn is_degraded(&self) -> bool {
        self.activity_fetch_error.is_some() || self.event_fetch_error.is_some()
    }

    pub fn deleted_count(&self) -> usize {
        self.outcomes.iter().map(ActivityOutcome::successful_deletes).sum()
    }

    pub fn created_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.created.is_some()).count()
    }

    pub fn failure_count(&self) -> usize {
        self.outcomes
            .iter()
            .map(|o| o.delete_failures.len() + usize::from(o.create_error.is_some()))
            .sum()
    }

    /// Activities with no calendar entry after the run because the create failed
    pub fn unrepresented(&self) -> impl Iterator<Item = &ActivityOutcome> {
        self.outcomes.iter().filter(|o| o.create_error.is_some())
    }

    /// Anything an operator should look at: fetch failures, skipped records,
    /// failed deletes or creates
    pub fn needs_attention(&self) -> bool {
        self.is_degraded() || !self.skipped.is_empty() || self.failure_count() > 0
    }

    pub fn log_summary(&self) {
        tracing::info!(
            activities = self.activities_fetched,
            events = self.events_fetched,
            skipped = self.skipped.len(),
            deleted = self.deleted_count(),
            created = self.created_count(),
            failures = self.failure_count(),
            "Sync run finished"
        );

        if let Some(ref e) = self.activity_fetch_error {
            tracing::error!("Activities could not be fetched; nothing was synced: {}", e);
        }
        if let Some(ref e) = self.event_fetch_error {
            tracing::error!(
                "Calendar events could not be fetched; existing entries were not checked for duplicates: {}",
                e
            );
        }
        for outcome in self.unrepresented() {
            tracing::error!(
                "Activity {} ({}) has no calendar entry: {} matched event(s) were removed and the create failed",
                outcome.activity_id,
                outcome.summary,
                outcome.successful_deletes()
            );
        }
    }
}

/// Brings the calendar in line with the activity list
pub struct Reconciler<A, E> {
    activities: A,
    events: E,
    settings: SyncSettings,
}

impl<A: ActivitySource, E: EventSource> Reconciler<A, E> {
    pub fn new(activities: A, events: E, settings: SyncSettings) -> Self {
        Self {
            activities,
            events,
            settings,
        }
    }

    /// Run once relative to `now`. Never fails; every problem is recorded in
    /// the returned report.
    pub async fn run(&self, now: DateTime<Utc>) -> RunReport {
        let mut report = RunReport::default();

        let window_start = now - self.settings.lookback;
        let window_end = now + self.settings.lookahead;

        let activities = match self.activities.fetch_activities(window_start).await {
            Ok(batch) => {
                for skipped in &batch.skipped {
                    tracing::warn!("Skipping malformed {}", skipped);
                }
                report.skipped = batch.skipped;
                batch.activities
            }
            Err(e) => {
                tracing::error!("Failed to fetch activities: {}", e);
                report.activity_fetch_error = Some(e.to_string());
                Vec::new()
            }
        };
        report.activities_fetched = activities.len();

        let events = match self.events.list_events(window_start, window_end).await {
            Ok(events) => events,
            Err(e) => {
                tracing::error!("Failed to fetch calendar events: {}", e);
                report.event_fetch_error = Some(e.to_string());
                Vec::new()
            }
        };
        report.events_fetched = events.len();

        tracing::info!(
            "Reconciling {} activities against {} calendar events ({} to {})",
            activities.len(),
            events.len(),
            window_start.to_rfc3339(),
            window_end.to_rfc3339()
        );

        for activity in &activities {
            let span = tracing::info_span!("activity", id = %activity.id);
            let outcome = self
                .reconcile_activity(activity, &events)
                .instrument(span)
                .await;
            report.outcomes.push(outcome);
        }

        report
    }

    async fn reconcile_activity(
        &self,
        activity: &Activity,
        events: &[CalendarEvent],
    ) -> ActivityOutcome {
        let mut outcome = ActivityOutcome::new(activity);

        let matches: Vec<&CalendarEvent> =
            candidate_events(events, activity, self.settings.window_policy)
                .into_iter()
                .filter(|event| is_match(event, activity))
                .collect();

        for event in matches {
            tracing::info!("Deleting matched event: {} ({})", event.summary, event.id);
            match self.events.delete_event(&event.id).await {
                Ok(DeleteOutcome::Deleted) => outcome.deleted.push(event.id.clone()),
                Ok(DeleteOutcome::AlreadyGone) => {
                    tracing::info!(
                        "Event {} was already deleted (matched by more than one activity)",
                        event.id
                    );
                    outcome.already_gone.push(event.id.clone());
                }
                Err(e) => {
                    tracing::warn!("Failed to delete event {} ({}): {}", event.id, event.summary, e);
                    outcome.delete_failures.push(DeleteFailure {
                        event_id: event.id.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        tracing::info!("Creating event for: {}", activity.name);
        match self.events.create_event(&NewEvent::for_activity(activity)).await {
            Ok(created) => {
                tracing::info!("Created event {} for: {}", created.id, activity.name);
                outcome.created = Some(created.id);
            }
            Err(e) => {
                tracing::error!("Failed to create event for {}: {}", activity.name, e);
                outcome.create_error = Some(e.to_string());
            }
        }

        outcome
    }
}
