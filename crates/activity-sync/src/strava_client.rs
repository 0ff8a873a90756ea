//! Strava API client: exchanges the stored refresh token for an access token
//! and lists the athlete's recent activities.

use activity_types::{Activity, ActivityBatch, ActivityRecord, SkipReason, SkippedRecord};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::config::StravaConfig;
use crate::error::SourceError;
use crate::source::ActivitySource;

/// Format of `start_date` in Strava activity summaries
const START_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";
const PER_PAGE: usize = 100;
/// Upper bound on pages fetched for one lookback window
const MAX_PAGES: u32 = 10;

pub struct StravaClient {
    http: reqwest::Client,
    config: StravaConfig,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
}

impl StravaClient {
    pub fn new(config: StravaConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("activity-sync/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { http, config })
    }

    async fn access_token(&self) -> Result<String, SourceError> {
        let url = format!("{}/oauth/token", self.config.base_url);
        let response = self
            .http
            .post(&url)
            .form(&[
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("grant_type", "refresh_token"),
                ("refresh_token", self.config.refresh_token.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::Auth(format!(
                "token exchange returned {}: {}",
                status, body
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| SourceError::Auth(format!("invalid token response: {}", e)))?;

        token
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| SourceError::Auth("no access token in response".to_string()))
    }

    async fn fetch_page(
        &self,
        access_token: &str,
        after: i64,
        page: u32,
    ) -> Result<Vec<Value>, SourceError> {
        let url = format!("{}/api/v3/athlete/activities", self.config.base_url);
        let response = self
            .http
            .get(&url)
            .bearer_auth(access_token)
            .query(&[
                ("after", after.to_string()),
                ("per_page", PER_PAGE.to_string()),
                ("page", page.to_string()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let body: Value = response.json().await?;
        match body {
            Value::Array(items) => Ok(items),
            other => Err(SourceError::unexpected(format!(
                "expected a list of activities, got {}",
                json_kind(&other)
            ))),
        }
    }
}

#[async_trait]
impl ActivitySource for StravaClient {
    async fn fetch_activities(&self, after: DateTime<Utc>) -> Result<ActivityBatch, SourceError> {
        let access_token = self.access_token().await?;

        let mut raw = Vec::new();
        for page in 1..=MAX_PAGES {
            let items = self.fetch_page(&access_token, after.timestamp(), page).await?;
            let last_page = items.len() < PER_PAGE;
            raw.extend(items);
            if last_page {
                break;
            }
            if page == MAX_PAGES {
                tracing::warn!(
                    "Stopped after {} pages of Strava activities; older ones are ignored",
                    MAX_PAGES
                );
            }
        }

        let batch = parse_activities(&raw);
        tracing::info!(
            "Fetched {} Strava activities since {} ({} skipped)",
            batch.activities.len(),
            after.to_rfc3339(),
            batch.skipped.len()
        );
        Ok(batch)
    }
}

/// Parse a list of raw Strava activity summaries
pub fn parse_activities(items: &[Value]) -> ActivityBatch {
    items.iter().map(parse_activity).collect()
}

/// Parse one raw Strava activity summary
pub fn parse_activity(item: &Value) -> ActivityRecord {
    match try_parse_activity(item) {
        Ok(activity) => ActivityRecord::Parsed(activity),
        Err(reason) => ActivityRecord::Skipped(SkippedRecord {
            id: item.get("id").and_then(id_string),
            reason,
        }),
    }
}

fn try_parse_activity(item: &Value) -> Result<Activity, SkipReason> {
    let object = item.as_object().ok_or(SkipReason::NotAnObject)?;
    let field = |name: &'static str| object.get(name).ok_or(SkipReason::MissingField(name));

    let id = id_string(field("id")?).ok_or_else(|| invalid("id", "expected a number or string"))?;
    let name = field("name")?
        .as_str()
        .ok_or_else(|| invalid("name", "expected a string"))?
        .to_string();
    let kind = field("type")?
        .as_str()
        .ok_or_else(|| invalid("type", "expected a string"))?
        .to_string();

    let start_raw = field("start_date")?
        .as_str()
        .ok_or_else(|| invalid("start_date", "expected a string"))?;
    let start = NaiveDateTime::parse_from_str(start_raw, START_DATE_FORMAT)
        .map_err(|e| invalid("start_date", format!("{:?}: {}", start_raw, e)))?
        .and_utc();

    let elapsed = field("elapsed_time")?
        .as_f64()
        .ok_or_else(|| invalid("elapsed_time", "expected a number"))?;
    if !elapsed.is_finite() || elapsed < 0.0 {
        return Err(invalid("elapsed_time", format!("{} is not a duration", elapsed)));
    }
    let minutes = (elapsed / 60.0).floor();
    if minutes > f64::from(u32::MAX) {
        return Err(invalid("elapsed_time", format!("{} is too large", elapsed)));
    }

    Ok(Activity {
        id,
        name,
        kind,
        start,
        duration_min: minutes as u32,
    })
}

fn invalid(field: &'static str, detail: impl Into<String>) -> SkipReason {
    SkipReason::InvalidField {
        field,
        detail: detail.into(),
    }
}

fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn summary() -> Value {
        json!({
            "id": 11223344556u64,
            "name": "Morning Run",
            "type": "Run",
            "sport_type": "TrailRun",
            "start_date": "2024-01-01T10:00:00Z",
            "start_date_local": "2024-01-01T11:00:00Z",
            "elapsed_time": 3659,
            "moving_time": 3400
        })
    }

    #[test]
    fn test_parses_activity_summary() {
        match parse_activity(&summary()) {
            ActivityRecord::Parsed(activity) => {
                assert_eq!(activity.id, "11223344556");
                assert_eq!(activity.name, "Morning Run");
                assert_eq!(activity.kind, "Run");
                assert_eq!(
                    activity.start,
                    Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap()
                );
                // 3659s rounds down to 60 whole minutes
                assert_eq!(activity.duration_min, 60);
            }
            other => panic!("expected parsed activity, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_field_is_skipped_with_id() {
        let mut item = summary();
        item.as_object_mut().unwrap().remove("start_date");

        match parse_activity(&item) {
            ActivityRecord::Skipped(skipped) => {
                assert_eq!(skipped.id.as_deref(), Some("11223344556"));
                assert_eq!(skipped.reason, SkipReason::MissingField("start_date"));
            }
            other => panic!("expected skipped record, got {:?}", other),
        }
    }

    #[test]
    fn test_offset_start_date_is_rejected() {
        let mut item = summary();
        item["start_date"] = json!("2024-01-01T10:00:00+02:00");

        match parse_activity(&item) {
            ActivityRecord::Skipped(skipped) => {
                assert!(matches!(
                    skipped.reason,
                    SkipReason::InvalidField { field: "start_date", .. }
                ));
            }
            other => panic!("expected skipped record, got {:?}", other),
        }
    }

    #[test]
    fn test_negative_elapsed_time_is_rejected() {
        let mut item = summary();
        item["elapsed_time"] = json!(-5);

        assert!(matches!(
            parse_activity(&item),
            ActivityRecord::Skipped(SkippedRecord {
                reason: SkipReason::InvalidField { field: "elapsed_time", .. },
                ..
            })
        ));
    }

    #[test]
    fn test_batch_keeps_good_records_and_reports_bad_ones() {
        let items = vec![
            summary(),
            json!("not an activity"),
            json!({ "id": 9, "name": "Ride" }),
        ];

        let batch = parse_activities(&items);
        assert_eq!(batch.activities.len(), 1);
        assert_eq!(batch.skipped.len(), 2);
        assert_eq!(batch.skipped[0].reason, SkipReason::NotAnObject);
        assert_eq!(batch.skipped[0].id, None);
        assert_eq!(batch.skipped[1].id.as_deref(), Some("9"));
        assert_eq!(batch.skipped[1].reason, SkipReason::MissingField("type"));
    }
}
