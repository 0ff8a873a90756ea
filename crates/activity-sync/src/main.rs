use activity_sync::calendar_client::GoogleCalendarClient;
use activity_sync::config::SyncConfig;
use activity_sync::debug::overlap_rows;
use activity_sync::strava_client::StravaClient;
use activity_sync::{ActivitySource, EventSource, Reconciler, SyncSettings, WindowPolicy};
use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "activity-sync")]
#[command(about = "Mirror recent Strava activities into a Google Calendar")]
#[command(
    long_about = "Fetches the last few days of Strava activities, removes calendar entries \
    that overlap an activity, and creates one fresh entry per activity.\n\n\
    Credentials come from the environment (or a .env file): STRAVA_CLIENT_ID, \
    STRAVA_CLIENT_SECRET, STRAVA_REFRESH_TOKEN, GOOGLE_CALENDAR_ID, and either \
    GOOGLE_CREDENTIALS or a token file at GOOGLE_TOKEN_PATH (default credentials/token.json)."
)]
struct Cli {
    /// How many days back to look for activities and calendar entries
    #[arg(
        long,
        global = true,
        env = "SYNC_LOOKBACK_DAYS",
        default_value_t = 3,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    lookback_days: u32,

    /// How many hours past now to look for calendar entries
    #[arg(long, global = true, env = "SYNC_LOOKAHEAD_HOURS", default_value_t = 6)]
    lookahead_hours: u32,

    /// How to pick the calendar entries tested against each activity.
    ///
    /// start-distance keeps entries starting less than 24h from the activity.
    /// interval-gap also keeps long entries that start earlier but still
    /// come within 24h of the activity.
    #[arg(
        long,
        global = true,
        env = "SYNC_WINDOW_POLICY",
        value_enum,
        default_value_t = WindowPolicy::StartDistance
    )]
    window_policy: WindowPolicy,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile the calendar with recent activities (default)
    Sync,
    /// Validate configuration without touching the network
    Check,
    /// Print every activity/event pair with its overlap verdict; makes no changes
    DebugOverlap,
}

impl Cli {
    fn settings(&self) -> SyncSettings {
        SyncSettings {
            lookback: Duration::days(i64::from(self.lookback_days)),
            lookahead: Duration::hours(i64::from(self.lookahead_hours)),
            window_policy: self.window_policy,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "activity_sync=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install crypto provider"))?;

    let settings = cli.settings();
    let config = SyncConfig::from_env().context("Configuration is incomplete")?;

    match cli.command.unwrap_or(Commands::Sync) {
        Commands::Check => {
            println!("Configuration OK");
            println!("  calendar:    {}", config.google.calendar_id);
            println!("  credentials: {}", config.google.credentials.describe());
            println!(
                "  window:      {} days back, {} hours ahead, {}",
                cli.lookback_days,
                cli.lookahead_hours,
                settings.window_policy.as_str()
            );
            Ok(())
        }
        Commands::Sync => run_sync(&config, settings).await,
        Commands::DebugOverlap => run_debug_overlap(&config, settings).await,
    }
}

async fn run_sync(config: &SyncConfig, settings: SyncSettings) -> Result<()> {
    tracing::info!(
        "Starting activity sync (window policy: {})",
        settings.window_policy.as_str()
    );

    let strava = StravaClient::new(config.strava.clone()).context("Failed to build Strava client")?;
    let calendar = GoogleCalendarClient::connect(&config.google)
        .await
        .context("Failed to create Google Calendar client")?;

    let reconciler = Reconciler::new(strava, calendar, settings);
    let report = reconciler.run(Utc::now()).await;
    report.log_summary();

    if report.needs_attention() {
        anyhow::bail!(
            "Sync finished with problems: {} failed operation(s), {} skipped record(s){}",
            report.failure_count(),
            report.skipped.len(),
            if report.is_degraded() {
                ", a source could not be fetched"
            } else {
                ""
            }
        );
    }
    Ok(())
}

async fn run_debug_overlap(config: &SyncConfig, settings: SyncSettings) -> Result<()> {
    let strava = StravaClient::new(config.strava.clone()).context("Failed to build Strava client")?;
    let calendar = GoogleCalendarClient::connect(&config.google)
        .await
        .context("Failed to create Google Calendar client")?;

    let now = Utc::now();
    let window_start = now - settings.lookback;
    let events = calendar
        .list_events(window_start, now + settings.lookahead)
        .await
        .context("Failed to fetch calendar events")?;
    let batch = strava
        .fetch_activities(window_start)
        .await
        .context("Failed to fetch Strava activities")?;

    println!("Total events: {}", events.len());
    println!("Total activities: {}", batch.activities.len());
    for skipped in &batch.skipped {
        println!("Skipped {}", skipped);
    }

    let rows = overlap_rows(&batch.activities, &events);
    for activity in &batch.activities {
        println!("\n=== Checking activity: {} ===", activity.name);
        for row in rows.iter().filter(|r| r.activity_id == activity.id) {
            println!("{}", row);
            println!("{}", "-".repeat(40));
        }
    }
    Ok(())
}
