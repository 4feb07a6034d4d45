use std::time::Duration;

/// Runtime configuration, loaded from the environment once at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub max_attempts: i32,
    pub step_timeout: Duration,
    pub lock_ttl: Duration,
    pub batch_limit: usize,
    pub poll_interval: Duration,
    pub migrate_on_startup: bool,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL is missing"))?;

        let max_attempts: i32 = env_parse("JOBFLOW_MAX_ATTEMPTS", 3).clamp(1, 100);

        let step_timeout = Duration::from_millis(
            env_parse("JOBFLOW_STEP_TIMEOUT_MS", 10_000_u64).clamp(50, 600_000),
        );

        let lock_ttl =
            Duration::from_secs(env_parse("JOBFLOW_LOCK_TTL_SECS", 30_u64).clamp(1, 3_600));

        let batch_limit = env_parse("JOBFLOW_BATCH_LIMIT", 10_usize).clamp(1, 1_000);

        let poll_interval = Duration::from_millis(
            env_parse("JOBFLOW_POLL_INTERVAL_MS", 60_000_u64).clamp(100, 3_600_000),
        );

        let migrate_on_startup = env_bool("JOBFLOW_MIGRATE_ON_STARTUP").unwrap_or(false);

        Ok(Self {
            database_url,
            max_attempts,
            step_timeout,
            lock_ttl,
            batch_limit,
            poll_interval,
            migrate_on_startup,
        })
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

fn env_bool(key: &str) -> Option<bool> {
    std::env::var(key)
        .ok()
        .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
}
