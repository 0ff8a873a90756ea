//! In-memory stand-ins for the Strava and Google Calendar clients.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use activity_sync::{ActivitySource, DeleteOutcome, EventSource, SourceError};
use activity_types::{Activity, ActivityBatch, CalendarEvent, CreatedEvent, EventTime, NewEvent};
use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};

pub fn at(day: u32, hour: u32, min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, day, hour, min, 0).unwrap()
}

pub fn activity(id: &str, start: DateTime<Utc>, duration_min: u32) -> Activity {
    Activity {
        id: id.to_string(),
        name: format!("Workout {}", id),
        kind: "Run".to_string(),
        start,
        duration_min,
    }
}

pub fn timed_event(id: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> CalendarEvent {
    CalendarEvent {
        id: id.to_string(),
        summary: format!("Event {}", id),
        start: EventTime::Timed(start),
        end: EventTime::Timed(end),
    }
}

/// Activity source returning a fixed batch, or an error
pub struct FakeActivities {
    result: Mutex<Option<Result<ActivityBatch, SourceError>>>,
    batch: ActivityBatch,
}

impl FakeActivities {
    pub fn new(activities: Vec<Activity>) -> Self {
        Self::with_batch(ActivityBatch::from(activities))
    }

    pub fn with_batch(batch: ActivityBatch) -> Self {
        Self {
            result: Mutex::new(None),
            batch,
        }
    }

    pub fn failing(error: SourceError) -> Self {
        Self {
            result: Mutex::new(Some(Err(error))),
            batch: ActivityBatch::default(),
        }
    }
}

#[async_trait]
impl ActivitySource for FakeActivities {
    async fn fetch_activities(&self, _after: DateTime<Utc>) -> Result<ActivityBatch, SourceError> {
        match self.result.lock().unwrap().take() {
            Some(result) => result,
            None => Ok(self.batch.clone()),
        }
    }
}

#[derive(Default)]
struct CalendarState {
    events: Vec<CalendarEvent>,
    next_id: u32,
    deletes: Vec<String>,
    creates: Vec<NewEvent>,
    failing_deletes: HashSet<String>,
    fail_creates: bool,
    fail_list: bool,
}

/// Calendar held in memory. Clones share state so tests can inspect it
/// after handing one copy to the reconciler.
#[derive(Clone, Default)]
pub struct FakeCalendar {
    state: Arc<Mutex<CalendarState>>,
}

impl FakeCalendar {
    pub fn with_events(events: Vec<CalendarEvent>) -> Self {
        let calendar = Self::default();
        calendar.state.lock().unwrap().events = events;
        calendar
    }

    pub fn fail_delete_of(&self, event_id: &str) {
        self.state
            .lock()
            .unwrap()
            .failing_deletes
            .insert(event_id.to_string());
    }

    pub fn fail_creates(&self) {
        self.state.lock().unwrap().fail_creates = true;
    }

    pub fn fail_list(&self) {
        self.state.lock().unwrap().fail_list = true;
    }

    pub fn events(&self) -> Vec<CalendarEvent> {
        self.state.lock().unwrap().events.clone()
    }

    /// Ids passed to delete, in call order, including ones already gone
    pub fn delete_calls(&self) -> Vec<String> {
        self.state.lock().unwrap().deletes.clone()
    }

    pub fn create_calls(&self) -> Vec<NewEvent> {
        self.state.lock().unwrap().creates.clone()
    }

    pub fn reset_calls(&self) {
        let mut state = self.state.lock().unwrap();
        state.deletes.clear();
        state.creates.clear();
    }
}

#[async_trait]
impl EventSource for FakeCalendar {
    async fn list_events(
        &self,
        time_min: DateTime<Utc>,
        time_max: DateTime<Utc>,
    ) -> Result<Vec<CalendarEvent>, SourceError> {
        let state = self.state.lock().unwrap();
        if state.fail_list {
            return Err(SourceError::Http {
                status: 503,
                body: "backend unavailable".to_string(),
            });
        }
        Ok(state
            .events
            .iter()
            .filter(|e| match e.interval() {
                Some(span) => span.end > time_min && span.start < time_max,
                None => true,
            })
            .cloned()
            .collect())
    }

    async fn delete_event(&self, event_id: &str) -> Result<DeleteOutcome, SourceError> {
        let mut state = self.state.lock().unwrap();
        state.deletes.push(event_id.to_string());
        if state.failing_deletes.contains(event_id) {
            return Err(SourceError::Http {
                status: 500,
                body: format!("cannot delete {}", event_id),
            });
        }
        let before = state.events.len();
        state.events.retain(|e| e.id != event_id);
        if state.events.len() < before {
            Ok(DeleteOutcome::Deleted)
        } else {
            Ok(DeleteOutcome::AlreadyGone)
        }
    }

    async fn create_event(&self, event: &NewEvent) -> Result<CreatedEvent, SourceError> {
        let mut state = self.state.lock().unwrap();
        state.creates.push(event.clone());
        if state.fail_creates {
            return Err(SourceError::Http {
                status: 403,
                body: "quota exceeded".to_string(),
            });
        }
        state.next_id += 1;
        let id = format!("created-{}", state.next_id);
        state.events.push(CalendarEvent {
            id: id.clone(),
            summary: event.summary.clone(),
            start: EventTime::Timed(event.start),
            end: EventTime::Timed(event.end),
        });
        Ok(CreatedEvent {
            id,
            summary: event.summary.clone(),
        })
    }
}

/// "Now" for runs in these tests: a couple of hours after the latest activity
pub fn now() -> DateTime<Utc> {
    at(3, 20, 0)
}

pub fn minutes(n: i64) -> Duration {
    Duration::minutes(n)
}
