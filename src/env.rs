use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tracing::Level;
use url::Url;

use crate::network::ApiClient;
use crate::tracking::{DynSubscriber, SimulatedSubscriber, SseSubscriber, TrackingRoute};

#[derive(clap::ValueEnum, Debug, Clone)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for Level {
    fn from(log_level: LogLevel) -> Self {
        (&log_level).into()
    }
}

impl From<&LogLevel> for Level {
    fn from(log_level: &LogLevel) -> Self {
        match log_level {
            LogLevel::Trace => Self::TRACE,
            LogLevel::Debug => Self::DEBUG,
            LogLevel::Info => Self::INFO,
            LogLevel::Warn => Self::WARN,
            LogLevel::Error => Self::ERROR,
        }
    }
}

const MAX_SIMULATION_STEP_SECS: u64 = 86_400;

#[derive(Parser, Debug, Clone)]
pub struct Env {
    /// API origin and prefix, e.g. `https://api.example.com/api/v1`
    #[clap(long, env, default_value = "http://localhost:8000/api/v1", value_parser = parse_base_url)]
    pub api_base_url: String,
    #[clap(long, env, default_value = "info")]
    pub log_level: LogLevel,
    /// Server route serving the live status stream
    #[clap(long, env, value_enum, default_value = "track")]
    pub tracking_route: TrackingRoute,
    /// Replace the server stream with a local simulated feed
    #[clap(long, env, default_value = "false")]
    pub simulate_tracking: bool,
    /// Base delay in seconds between simulated status changes, at most a day
    #[clap(
        long,
        env,
        default_value = "5",
        value_parser = clap::value_parser!(u64).range(1..=MAX_SIMULATION_STEP_SECS)
    )]
    pub simulation_step_secs: u64,
}

/// Checks that the value is an absolute URL but keeps the original text, since
/// request URLs are built by plain concatenation.
fn parse_base_url(value: &str) -> Result<String, url::ParseError> {
    Url::parse(value)?;
    Ok(value.to_string())
}

impl Env {
    pub fn api_client(&self) -> ApiClient {
        ApiClient::new(&self.api_base_url)
    }

    pub fn live_tracking(&self) -> DynSubscriber {
        if self.simulate_tracking {
            Arc::new(SimulatedSubscriber::new(Duration::from_secs(
                self.simulation_step_secs,
            )))
        } else {
            Arc::new(SseSubscriber::new(self.api_client(), self.tracking_route))
        }
    }
}

pub fn setup_tracing(log_level: &LogLevel) {
    let level: Level = log_level.into();
    let default_filter = format!("swift_track={level},swift_orders={level}");

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .compact()
        .init();
}
