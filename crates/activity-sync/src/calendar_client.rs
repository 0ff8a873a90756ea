//! Google Calendar client backed by the stored authorized-user token.

use activity_types::{CalendarEvent, CreatedEvent, EventTime, NewEvent};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use google_calendar3::api::{Event, EventDateTime, Scope};
use google_calendar3::hyper_rustls::HttpsConnector;
use google_calendar3::CalendarHub;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use serde::Deserialize;

use crate::config::{GoogleConfig, GoogleCredentials};
use crate::error::SourceError;
use crate::source::{DeleteOutcome, EventSource};

/// Client for interacting with Google Calendar API
pub struct GoogleCalendarClient {
    hub: CalendarHub<HttpsConnector<HttpConnector>>,
    calendar_id: String,
}

/// Fields read from a stored `token.json`. Other fields (access token,
/// expiry, scopes) are ignored; a fresh access token is minted on demand.
#[derive(Debug, Deserialize)]
struct StoredToken {
    client_id: String,
    client_secret: String,
    refresh_token: String,
}

impl GoogleCalendarClient {
    pub async fn connect(config: &GoogleConfig) -> Result<Self> {
        let raw = match &config.credentials {
            GoogleCredentials::Inline(json) => json.clone(),
            GoogleCredentials::File(path) => tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read Google token {}", path.display()))?,
        };
        let token: StoredToken = serde_json::from_str(&raw).with_context(|| {
            format!(
                "Google credentials from {} are not an authorized-user token",
                config.credentials.describe()
            )
        })?;

        let secret = google_calendar3::yup_oauth2::authorized_user::AuthorizedUserSecret {
            client_id: token.client_id,
            client_secret: token.client_secret,
            refresh_token: token.refresh_token,
            key_type: "authorized_user".to_string(),
        };

        let auth = google_calendar3::yup_oauth2::AuthorizedUserAuthenticator::builder(secret)
            .build()
            .await
            .context("Failed to build authenticator from refresh token")?;

        let connector = google_calendar3::hyper_rustls::HttpsConnectorBuilder::new()
            .with_native_roots()
            .context("Failed to load native TLS roots")?
            .https_or_http()
            .enable_http1()
            .build();

        let client = Client::builder(TokioExecutor::new()).build(connector);
        let hub = CalendarHub::new(client, auth);

        tracing::info!(
            "Google Calendar client ready for calendar {} (credentials: {})",
            config.calendar_id,
            config.credentials.describe()
        );

        Ok(Self {
            hub,
            calendar_id: config.calendar_id.clone(),
        })
    }
}

#[async_trait]
impl EventSource for GoogleCalendarClient {
    async fn list_events(
        &self,
        time_min: DateTime<Utc>,
        time_max: DateTime<Utc>,
    ) -> Result<Vec<CalendarEvent>, SourceError> {
        let mut events = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut call = self
                .hub
                .events()
                .list(&self.calendar_id)
                .time_min(time_min)
                .time_max(time_max)
                .single_events(true)
                .order_by("startTime")
                .add_scope(Scope::Full);
            if let Some(ref token) = page_token {
                call = call.page_token(token);
            }

            let (_, page) = call.doit().await.map_err(source_error)?;

            for item in page.items.unwrap_or_default() {
                match convert_event(item) {
                    Some(event) => events.push(event),
                    None => tracing::warn!("Ignoring calendar event without id or start time"),
                }
            }

            page_token = page.next_page_token;
            if page_token.is_none() {
                break;
            }
        }

        tracing::info!(
            "Fetched {} calendar events between {} and {}",
            events.len(),
            time_min.to_rfc3339(),
            time_max.to_rfc3339()
        );
        Ok(events)
    }

    async fn delete_event(&self, event_id: &str) -> Result<DeleteOutcome, SourceError> {
        let result = self
            .hub
            .events()
            .delete(&self.calendar_id, event_id)
            .add_scope(Scope::Full)
            .doit()
            .await;

        match result {
            Ok(_) => Ok(DeleteOutcome::Deleted),
            Err(e) if is_gone(&e) => Ok(DeleteOutcome::AlreadyGone),
            Err(e) => Err(source_error(e)),
        }
    }

    async fn create_event(&self, event: &NewEvent) -> Result<CreatedEvent, SourceError> {
        let (_, created) = self
            .hub
            .events()
            .insert(to_google_event(event), &self.calendar_id)
            .add_scope(Scope::Full)
            .doit()
            .await
            .map_err(source_error)?;

        let id = created
            .id
            .ok_or_else(|| SourceError::unexpected("created event has no id"))?;

        Ok(CreatedEvent {
            id,
            summary: created.summary.unwrap_or_else(|| event.summary.clone()),
        })
    }
}

fn to_google_event(event: &NewEvent) -> Event {
    Event {
        summary: Some(event.summary.clone()),
        start: Some(EventDateTime {
            date_time: Some(event.start),
            time_zone: Some("UTC".to_string()),
            ..Default::default()
        }),
        end: Some(EventDateTime {
            date_time: Some(event.end),
            time_zone: Some("UTC".to_string()),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Convert an API event. Returns `None` when the event has no id or no
/// usable start/end.
fn convert_event(event: Event) -> Option<CalendarEvent> {
    Some(CalendarEvent {
        id: event.id?,
        summary: event.summary.unwrap_or_default(),
        start: event_time(event.start?)?,
        end: event_time(event.end?)?,
    })
}

fn event_time(value: EventDateTime) -> Option<EventTime> {
    match (value.date_time, value.date) {
        (Some(at), _) => Some(EventTime::Timed(at)),
        (None, Some(date)) => Some(EventTime::AllDay(date)),
        (None, None) => None,
    }
}

/// 404 and 410 both mean the event is no longer on the calendar
fn is_gone_status(status: u64) -> bool {
    matches!(status, 404 | 410)
}

fn is_gone(err: &google_calendar3::Error) -> bool {
    match err {
        google_calendar3::Error::Failure(response) => {
            is_gone_status(u64::from(response.status().as_u16()))
        }
        google_calendar3::Error::BadRequest(body) => body
            .pointer("/error/code")
            .and_then(serde_json::Value::as_u64)
            .is_some_and(is_gone_status),
        _ => false,
    }
}

fn source_error(err: google_calendar3::Error) -> SourceError {
    match err {
        google_calendar3::Error::Failure(response) => SourceError::Http {
            status: response.status().as_u16(),
            body: "no error body".to_string(),
        },
        google_calendar3::Error::BadRequest(body) => SourceError::Http {
            status: body
                .pointer("/error/code")
                .and_then(serde_json::Value::as_u64)
                .and_then(|c| u16::try_from(c).ok())
                .unwrap_or(400),
            body: body
                .pointer("/error/message")
                .and_then(serde_json::Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| body.to_string()),
        },
        google_calendar3::Error::MissingToken(e) => SourceError::Auth(e.to_string()),
        google_calendar3::Error::HttpError(e) => SourceError::Transport(e.to_string()),
        google_calendar3::Error::JsonDecodeError(_, e) => SourceError::unexpected(e.to_string()),
        other => SourceError::Transport(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};
    use serde_json::json;

    #[test]
    fn test_gone_statuses() {
        assert!(is_gone_status(404));
        assert!(is_gone_status(410));
        assert!(!is_gone_status(403));
        assert!(!is_gone_status(500));
    }

    #[test]
    fn test_gone_from_error_body() {
        let gone = google_calendar3::Error::BadRequest(json!({
            "error": { "code": 410, "message": "Resource has been deleted" }
        }));
        assert!(is_gone(&gone));

        let forbidden = google_calendar3::Error::BadRequest(json!({
            "error": { "code": 403, "message": "Rate Limit Exceeded" }
        }));
        assert!(!is_gone(&forbidden));
    }

    #[test]
    fn test_error_body_becomes_http_error() {
        let err = source_error(google_calendar3::Error::BadRequest(json!({
            "error": { "code": 403, "message": "Rate Limit Exceeded" }
        })));
        match err {
            SourceError::Http { status, body } => {
                assert_eq!(status, 403);
                assert_eq!(body, "Rate Limit Exceeded");
            }
            other => panic!("expected Http error, got {:?}", other),
        }
    }

    #[test]
    fn test_convert_timed_and_all_day_events() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 1, 1, 11, 0, 0).unwrap();
        let timed = Event {
            id: Some("timed".to_string()),
            summary: Some("Run – Morning Run".to_string()),
            start: Some(EventDateTime {
                date_time: Some(start),
                ..Default::default()
            }),
            end: Some(EventDateTime {
                date_time: Some(end),
                ..Default::default()
            }),
            ..Default::default()
        };
        let converted = convert_event(timed).expect("timed event converts");
        assert_eq!(converted.start, EventTime::Timed(start));
        assert_eq!(converted.end, EventTime::Timed(end));

        let day = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let all_day = Event {
            id: Some("holiday".to_string()),
            start: Some(EventDateTime {
                date: Some(day),
                ..Default::default()
            }),
            end: Some(EventDateTime {
                date: day.succ_opt(),
                ..Default::default()
            }),
            ..Default::default()
        };
        let converted = convert_event(all_day).expect("all-day event converts");
        assert!(converted.is_all_day());
        assert_eq!(converted.summary, "");
    }

    #[test]
    fn test_event_without_id_is_dropped() {
        let event = Event {
            start: Some(EventDateTime {
                date_time: Some(Utc::now()),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert!(convert_event(event).is_none());
    }

    #[test]
    fn test_new_event_is_sent_in_utc() {
        let event = NewEvent {
            summary: "Ride – Commute".to_string(),
            start: Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap(),
            end: Utc.with_ymd_and_hms(2024, 1, 1, 8, 40, 0).unwrap(),
            activity_id: "5".to_string(),
        };
        let google = to_google_event(&event);
        assert_eq!(google.summary.as_deref(), Some("Ride – Commute"));
        let start = google.start.expect("start set");
        assert_eq!(start.time_zone.as_deref(), Some("UTC"));
        assert_eq!(start.date_time, Some(event.start));
    }
}
