//! Mirrors recent Strava activities into a Google Calendar.
//!
//! Each run lists the activities of the last few days and the calendar
//! entries around them, deletes entries whose time span overlaps an activity,
//! and creates one fresh entry per activity. Running it again converges to
//! the same calendar, so no local state is kept between runs.

pub mod calendar_client;
pub mod config;
pub mod debug;
pub mod error;
pub mod matcher;
pub mod reconciler;
pub mod source;
pub mod strava_client;
pub mod window;

pub use config::SyncConfig;
pub use error::{ConfigError, SourceError};
pub use matcher::{is_match, overlaps};
pub use reconciler::{ActivityOutcome, Reconciler, RunReport, SyncSettings};
pub use source::{ActivitySource, DeleteOutcome, EventSource};
pub use window::{candidate_events, WindowPolicy};
