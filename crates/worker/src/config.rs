use chrono::{FixedOffset, NaiveTime};

/// Worker configuration loaded from environment variables.
///
/// | Env Var                        | Default |
/// |--------------------------------|---------|
/// | `DATABASE_URL`                 | required |
/// | `DB_MAX_CONNECTIONS`           | `20`    |
/// | `LIFECYCLE_RUN_AT`             | `09:00` |
/// | `LIFECYCLE_UTC_OFFSET_MINUTES` | `540`   |
/// | `LIFECYCLE_RUN_ON_START`       | `false` |
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub database_url: String,
    pub max_connections: u32,
    /// Local wall-clock time of the daily sweep.
    pub run_at: NaiveTime,
    /// Offset used for "today" and the deletion day windows.
    pub utc_offset: FixedOffset,
    /// Run one sweep immediately at startup before waiting for `run_at`.
    pub run_on_start: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{var}='{value}' is invalid: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: &'static str,
    },
}

impl WorkerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let database_url = lookup("DATABASE_URL")
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let max_connections = match lookup("DB_MAX_CONNECTIONS") {
            None => 20,
            Some(v) => {
                let parsed = v.trim().parse::<u32>();
                match parsed {
                    Ok(n) if n > 0 => n,
                    _ => return Err(invalid("DB_MAX_CONNECTIONS", v, "expected a positive integer")),
                }
            }
        };

        let run_at = match lookup("LIFECYCLE_RUN_AT") {
            None => NaiveTime::from_hms_opt(9, 0, 0).unwrap_or(NaiveTime::MIN),
            Some(v) => {
                let parsed = NaiveTime::parse_from_str(v.trim(), "%H:%M");
                parsed.map_err(|_| invalid("LIFECYCLE_RUN_AT", v, "expected HH:MM"))?
            }
        };

        let offset_minutes = match lookup("LIFECYCLE_UTC_OFFSET_MINUTES") {
            None => 540,
            Some(v) => {
                let parsed = v.trim().parse::<i32>();
                parsed.map_err(|_| invalid("LIFECYCLE_UTC_OFFSET_MINUTES", v, "expected an integer"))?
            }
        };
        let utc_offset = offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| {
                invalid(
                    "LIFECYCLE_UTC_OFFSET_MINUTES",
                    offset_minutes.to_string(),
                    "must be within ±24h",
                )
            })?;

        let run_on_start = match lookup("LIFECYCLE_RUN_ON_START") {
            None => false,
            Some(v) => {
                let flag = v.trim().to_ascii_lowercase();
                match flag.as_str() {
                    "1" | "true" | "yes" => true,
                    "0" | "false" | "no" => false,
                    _ => return Err(invalid("LIFECYCLE_RUN_ON_START", v, "expected true or false")),
                }
            }
        };

        Ok(Self {
            database_url,
            max_connections,
            run_at,
            utc_offset,
            run_on_start,
        })
    }
}

fn invalid(var: &'static str, value: String, reason: &'static str) -> ConfigError {
    ConfigError::Invalid { var, value, reason }
}
