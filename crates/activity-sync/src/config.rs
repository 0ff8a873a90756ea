use std::path::{Path, PathBuf};

use crate::error::ConfigError;

pub const DEFAULT_TOKEN_PATH: &str = "credentials/token.json";
pub const DEFAULT_STRAVA_BASE_URL: &str = "https://www.strava.com";

/// Variables that must be present before anything talks to the network
pub const REQUIRED_VARS: [&str; 4] = [
    "STRAVA_CLIENT_ID",
    "STRAVA_CLIENT_SECRET",
    "STRAVA_REFRESH_TOKEN",
    "GOOGLE_CALENDAR_ID",
];

#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub strava: StravaConfig,
    pub google: GoogleConfig,
}

#[derive(Debug, Clone)]
pub struct StravaConfig {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
    /// Scheme and host of the Strava API, overridable for testing
    pub base_url: String,
}

#[derive(Debug, Clone)]
pub struct GoogleConfig {
    /// Calendar that receives activity events
    pub calendar_id: String,
    pub credentials: GoogleCredentials,
}

/// Where the stored Google authorized-user token comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GoogleCredentials {
    /// Token JSON passed directly, e.g. from a CI secret
    Inline(String),
    /// Token JSON on disk
    File(PathBuf),
}

impl GoogleCredentials {
    pub fn describe(&self) -> String {
        match self {
            GoogleCredentials::Inline(_) => "GOOGLE_CREDENTIALS environment variable".to_string(),
            GoogleCredentials::File(path) => format!("local file {}", path.display()),
        }
    }
}

impl SyncConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok(), |path| path.exists())
    }

    /// Build the config from a variable lookup. Every missing variable is
    /// reported at once. Empty values count as missing.
    pub fn from_lookup<F, P>(lookup: F, file_exists: P) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
        P: Fn(&Path) -> bool,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let missing: Vec<String> = REQUIRED_VARS
            .iter()
            .filter(|key| get(**key).is_none())
            .map(|key| key.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(ConfigError::MissingVars(missing));
        }

        let credentials = match get("GOOGLE_CREDENTIALS") {
            Some(json) => GoogleCredentials::Inline(json),
            None => {
                let path = PathBuf::from(
                    get("GOOGLE_TOKEN_PATH").unwrap_or_else(|| DEFAULT_TOKEN_PATH.to_string()),
                );
                if !file_exists(&path) {
                    return Err(ConfigError::MissingGoogleCredentials { path });
                }
                GoogleCredentials::File(path)
            }
        };

        let required = |key: &str| get(key).unwrap_or_default();

        Ok(Self {
            strava: StravaConfig {
                client_id: required("STRAVA_CLIENT_ID"),
                client_secret: required("STRAVA_CLIENT_SECRET"),
                refresh_token: required("STRAVA_REFRESH_TOKEN"),
                base_url: get("STRAVA_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_STRAVA_BASE_URL.to_string()),
            },
            google: GoogleConfig {
                calendar_id: required("GOOGLE_CALENDAR_ID"),
                credentials,
            },
        })
    }
}
