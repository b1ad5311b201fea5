use std::{env, path::PathBuf, str::FromStr, time::Duration};
use tracing::warn;

/// Server settings, read from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub port: u16,
    pub log_level: String,
    /// Multipart field carrying the zip upload.
    pub upload_field: String,
    pub request_timeout: Duration,
    pub max_upload_bytes: u64,
    /// Where uploads are staged while a request runs.
    pub staging_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 12071,
            log_level: "info".to_string(),
            upload_field: "oneCSVzipFile".to_string(),
            request_timeout: Duration::from_secs(30),
            max_upload_bytes: 64 * 1024 * 1024,
            staging_dir: env::temp_dir(),
        }
    }
}

impl Config {
    /// Build from `PORT`, `LOG_LEVEL`, `UPLOAD_FIELD`, `REQUEST_TIMEOUT_SECS`,
    /// `MAX_UPLOAD_BYTES` and `STAGING_DIR`, falling back to the defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            port: parsed(&lookup, "PORT", defaults.port),
            log_level: lookup("LOG_LEVEL").unwrap_or(defaults.log_level),
            upload_field: lookup("UPLOAD_FIELD")
                .filter(|s| !s.is_empty())
                .unwrap_or(defaults.upload_field),
            request_timeout: Duration::from_secs(parsed(
                &lookup,
                "REQUEST_TIMEOUT_SECS",
                defaults.request_timeout.as_secs(),
            )),
            max_upload_bytes: parsed(&lookup, "MAX_UPLOAD_BYTES", defaults.max_upload_bytes),
            staging_dir: lookup("STAGING_DIR")
                .filter(|s| !s.is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.staging_dir),
        }
    }
}

fn parsed<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + Copy + std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("invalid {}='{}', using {}", key, raw, default);
            default
        }),
        None => default,
    }
}
