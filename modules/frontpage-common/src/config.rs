use std::env;

use chrono::Duration;
use tracing::info;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Shared store
    pub database_url: String,

    // Telegram
    pub telegram_token: String,
    pub channel_id: i64,
    pub discussion_id: Option<i64>,

    // Tick
    pub candidate_limit: usize,
    pub tick_interval_secs: u64,

    // Graduation thresholds
    pub min_score: i64,
    pub min_comments: i64,
    pub max_wait_secs: i64,
    pub age_floor_score: i64,
    pub age_floor_comments: i64,

    // Cadence / expiry
    pub metric_refresh_secs: i64,
    pub pending_ttl_secs: i64,
}

impl Config {
    /// Load configuration from environment variables.
    /// Panics with a clear message if required vars are missing or malformed.
    pub fn from_env() -> Self {
        Self {
            database_url: required_env("DATABASE_URL"),
            telegram_token: required_env("TG_TOKEN"),
            channel_id: required_int("TG_CHANNEL_ID"),
            discussion_id: optional_int("TG_DISCUSSION_ID"),
            candidate_limit: int_env("CANDIDATE_LIMIT", 15) as usize,
            tick_interval_secs: int_env("TICK_INTERVAL_SECS", 300) as u64,
            min_score: int_env("MIN_SCORE", 50),
            min_comments: int_env("MIN_COMMENTS", 50),
            max_wait_secs: int_env("MAX_WAIT_SECS", 5 * 3600),
            age_floor_score: int_env("AGE_FLOOR_SCORE", 10),
            age_floor_comments: int_env("AGE_FLOOR_COMMENTS", 10),
            metric_refresh_secs: int_env("METRIC_REFRESH_SECS", 600),
            pending_ttl_secs: int_env("PENDING_TTL_SECS", 15 * 60),
        }
    }

    pub fn max_wait(&self) -> Duration {
        Duration::seconds(self.max_wait_secs)
    }

    pub fn metric_refresh(&self) -> Duration {
        Duration::seconds(self.metric_refresh_secs)
    }

    pub fn pending_ttl(&self) -> Duration {
        Duration::seconds(self.pending_ttl_secs)
    }

    /// Log the loaded configuration without leaking secrets.
    pub fn log_redacted(&self) {
        info!(
            channel_id = self.channel_id,
            discussion_id = ?self.discussion_id,
            candidate_limit = self.candidate_limit,
            tick_interval_secs = self.tick_interval_secs,
            min_score = self.min_score,
            min_comments = self.min_comments,
            max_wait_secs = self.max_wait_secs,
            age_floor_score = self.age_floor_score,
            age_floor_comments = self.age_floor_comments,
            metric_refresh_secs = self.metric_refresh_secs,
            pending_ttl_secs = self.pending_ttl_secs,
            token_set = !self.telegram_token.is_empty(),
            "Config loaded"
        );
    }
}

fn required_env(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("{key} environment variable is required"))
}

fn required_int(key: &str) -> i64 {
    required_env(key)
        .parse()
        .unwrap_or_else(|_| panic!("{key} must be an integer"))
}

fn optional_int(key: &str) -> Option<i64> {
    match env::var(key) {
        Ok(v) if !v.is_empty() => {
            Some(v.parse().unwrap_or_else(|_| panic!("{key} must be an integer")))
        }
        _ => None,
    }
}

fn int_env(key: &str, default: i64) -> i64 {
    match env::var(key) {
        Ok(v) if !v.is_empty() => v
            .parse()
            .unwrap_or_else(|_| panic!("{key} must be an integer")),
        _ => default,
    }
}
