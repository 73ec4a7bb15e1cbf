use anyhow::Result;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

use crate::args::Args;
use crate::sqlite;
use crate::usage::MAX_DAILY_LIMIT;

pub const ADMIN_PASSWORD_ENV: &str = "SHOPAUDIT_ADMIN_PASSWORD";

pub const DEFAULT_ADMIN_PASSWORD: &str = "admin1234";

/// Settings resolved from command-line flags and environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// SQLite file holding usage and history state.
    pub db_path: PathBuf,
    /// Analyses allowed per IP per day.
    pub daily_limit: u32,
    /// Timeout for the public IP lookup.
    pub ip_timeout: Duration,
    /// Expected admin password, from `SHOPAUDIT_ADMIN_PASSWORD` only.
    admin_password: String,
}

/// Falls back to the default when the variable is unset or empty.
fn resolve_admin_password(from_env: Option<String>) -> String {
    from_env
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| DEFAULT_ADMIN_PASSWORD.to_string())
}

impl Config {
    pub fn from_args(args: &Args) -> Result<Self> {
        crate::utils::validate_args(args)?;

        let db_path = match &args.db {
            Some(path) => path.clone(),
            None => sqlite::default_database_path()?,
        };

        let config = Self {
            db_path,
            daily_limit: args.daily_limit.unwrap_or(MAX_DAILY_LIMIT),
            ip_timeout: Duration::from_secs(args.ip_timeout),
            admin_password: resolve_admin_password(std::env::var(ADMIN_PASSWORD_ENV).ok()),
        };

        info!(
            action = "configure",
            component = "config",
            db_path = ?config.db_path,
            daily_limit = config.daily_limit,
            ip_timeout_secs = args.ip_timeout,
            "Configuration resolved"
        );
        Ok(config)
    }

    pub fn check_admin_password(&self, candidate: &str) -> bool {
        candidate == self.admin_password
    }
}
