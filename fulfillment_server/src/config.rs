use std::{env, env::VarError, fmt::Display, str::FromStr, time::Duration};

use fulfillment_engine::SyncConfig;
use log::*;
use panel_common::{helpers::parse_boolean_flag, Secret};

const DEFAULT_PANEL_HOST: &str = "127.0.0.1";
const DEFAULT_PANEL_PORT: u16 = 8360;
const DEFAULT_SYNC_INTERVAL_SECS: u64 = 300;
const DEFAULT_SYNC_TIME_BUDGET_MS: u64 = 25_000;
const DEFAULT_SYNC_MAX_CANDIDATES: usize = 200;
const DEFAULT_SYNC_MAX_PER_RUN: usize = 100;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// Callers of the admin endpoints must present this value in the `panel_admin_token` header. When it is empty,
    /// every admin request is refused.
    pub admin_token: Secret<String>,
    pub sync: SyncWorkerConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_PANEL_HOST.to_string(),
            port: DEFAULT_PANEL_PORT,
            database_url: String::default(),
            admin_token: Secret::default(),
            sync: SyncWorkerConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("PANEL_HOST").ok().unwrap_or_else(|| DEFAULT_PANEL_HOST.into());
        let port = parse_env_value("PANEL_PORT", env::var("PANEL_PORT"), DEFAULT_PANEL_PORT);
        let database_url = env::var("PANEL_DATABASE_URL").ok().unwrap_or_else(|| {
            error!("🪛️ PANEL_DATABASE_URL is not set. Please set it to the URL for the panel database.");
            String::default()
        });
        let admin_token = env::var("PANEL_ADMIN_TOKEN").ok().unwrap_or_else(|| {
            warn!(
                "🪛️ PANEL_ADMIN_TOKEN is not set. Admin endpoints, including manual sync, will refuse every request."
            );
            String::default()
        });
        let sync = SyncWorkerConfig::from_env_or_default();
        Self { host, port, database_url, admin_token: Secret::new(admin_token), sync }
    }
}

//-------------------------------------------------  SyncWorkerConfig  -------------------------------------------------
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SyncWorkerConfig {
    /// Time between scheduled sync runs. `None` disables the background worker.
    pub interval: Option<Duration>,
    pub time_budget: Duration,
    pub max_candidates: usize,
    pub max_per_run: usize,
    /// Whether scheduled runs emit progress and order-updated events
    pub broadcast: bool,
}

impl Default for SyncWorkerConfig {
    fn default() -> Self {
        Self {
            interval: interval_from_seconds(DEFAULT_SYNC_INTERVAL_SECS),
            time_budget: Duration::from_millis(DEFAULT_SYNC_TIME_BUDGET_MS),
            max_candidates: DEFAULT_SYNC_MAX_CANDIDATES,
            max_per_run: DEFAULT_SYNC_MAX_PER_RUN,
            broadcast: false,
        }
    }
}

impl SyncWorkerConfig {
    pub fn from_env_or_default() -> Self {
        let interval_secs =
            parse_env_value("PANEL_SYNC_INTERVAL", env::var("PANEL_SYNC_INTERVAL"), DEFAULT_SYNC_INTERVAL_SECS);
        let interval = interval_from_seconds(interval_secs);
        if interval.is_none() {
            info!("🪛️ PANEL_SYNC_INTERVAL is 0. Scheduled provider syncs are disabled.");
        }
        let budget_ms = parse_env_value(
            "PANEL_SYNC_TIME_BUDGET_MS",
            env::var("PANEL_SYNC_TIME_BUDGET_MS"),
            DEFAULT_SYNC_TIME_BUDGET_MS,
        );
        let max_candidates = parse_env_value(
            "PANEL_SYNC_MAX_CANDIDATES",
            env::var("PANEL_SYNC_MAX_CANDIDATES"),
            DEFAULT_SYNC_MAX_CANDIDATES,
        );
        let max_per_run =
            parse_env_value("PANEL_SYNC_MAX_PER_RUN", env::var("PANEL_SYNC_MAX_PER_RUN"), DEFAULT_SYNC_MAX_PER_RUN);
        let broadcast = parse_boolean_flag(env::var("PANEL_SYNC_BROADCAST").ok(), false);
        Self { interval, time_budget: Duration::from_millis(budget_ms), max_candidates, max_per_run, broadcast }
    }

    pub fn sync_config(&self) -> SyncConfig {
        SyncConfig { time_budget: self.time_budget, max_candidates: self.max_candidates, max_per_run: self.max_per_run }
    }
}

/// A zero interval switches the scheduled sync off.
pub fn interval_from_seconds(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

fn parse_env_value<T>(name: &str, value: Result<String, VarError>, default: T) -> T
where
    T: FromStr + Display,
    T::Err: Display,
{
    match value {
        Ok(s) => s.trim().parse::<T>().unwrap_or_else(|e| {
            error!("🪛️ {s} is not a valid value for {name}. {e} Using the default, {default}, instead.");
            default
        }),
        Err(VarError::NotPresent) => {
            debug!("🪛️ {name} is not set. Using the default value of {default}.");
            default
        },
        Err(e) => {
            warn!("🪛️ Could not read {name}. {e} Using the default value of {default}.");
            default
        },
    }
}
