//! Runtime settings loaded from `METASO_*` variables and `.env.local`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use reqwest::Url;
use thiserror::Error;
use tracing::debug;

/// Prefix shared by every variable this crate reads.
pub const ENV_PREFIX: &str = "METASO_";

/// Local override file, resolved against the working directory.
pub const ENV_FILE: &str = ".env.local";

pub const DEFAULT_BASE_URL: &str = "https://metaso.cn";
pub const DEFAULT_TIMEOUT_SECS: f64 = 15.0;

const API_KEY_VAR: &str = "METASO_API_KEY";
const BASE_URL_VAR: &str = "METASO_BASE_URL";
const TIMEOUT_VAR: &str = "METASO_REQUEST_TIMEOUT";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("METASO_API_KEY is not set")]
    MissingApiKey,

    #[error("METASO_BASE_URL {value:?} is not a valid http(s) URL: {reason}")]
    InvalidBaseUrl { value: String, reason: String },

    #[error("METASO_REQUEST_TIMEOUT must be a positive number of seconds, got {0:?}")]
    InvalidTimeout(String),

    #[error("failed to read {}: {source}", .path.display())]
    EnvFile {
        path: PathBuf,
        source: dotenvy::Error,
    },
}

/// Validated, immutable runtime settings.
#[derive(Clone, PartialEq)]
pub struct Settings {
    api_key: String,
    base_url: String,
    timeout: Duration,
}

impl Settings {
    /// Validate and build settings from explicit values.
    pub fn new(
        api_key: impl Into<String>,
        base_url: &str,
        timeout_secs: f64,
    ) -> Result<Self, ConfigError> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(ConfigError::MissingApiKey);
        }
        Ok(Self {
            api_key,
            base_url: parse_base_url(base_url)?,
            timeout: parse_timeout(timeout_secs)
                .ok_or_else(|| ConfigError::InvalidTimeout(timeout_secs.to_string()))?,
        })
    }

    /// Build settings from a variable map. Key lookup ignores ASCII case.
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let lookup = |key: &str| {
            vars.iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(key))
                .map(|(_, v)| v.as_str())
        };

        let api_key = lookup(API_KEY_VAR).ok_or(ConfigError::MissingApiKey)?;
        let base_url = lookup(BASE_URL_VAR).unwrap_or(DEFAULT_BASE_URL);
        let timeout = match lookup(TIMEOUT_VAR) {
            Some(raw) => raw
                .trim()
                .parse::<f64>()
                .map_err(|_| ConfigError::InvalidTimeout(raw.to_string()))?,
            None => DEFAULT_TIMEOUT_SECS,
        };

        Self::new(api_key, base_url, timeout)
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Provider root without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Whole-request timeout (connect and read).
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

fn parse_base_url(value: &str) -> Result<String, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidBaseUrl {
        value: value.to_string(),
        reason,
    };

    let url = Url::parse(value.trim()).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme `{}`", url.scheme())));
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(invalid("missing host".to_string()));
    }

    Ok(url.as_str().trim_end_matches('/').to_string())
}

fn parse_timeout(secs: f64) -> Option<Duration> {
    if !secs.is_finite() || secs <= 0.0 {
        return None;
    }
    Duration::try_from_secs_f64(secs).ok()
}

enum VarSource {
    Process,
    Fixed(HashMap<String, String>),
}

/// Resolves [`Settings`] once and hands out the same `Arc` afterwards.
///
/// Variables override values from the env file.
pub struct SettingsProvider {
    vars: VarSource,
    env_file: Option<PathBuf>,
    resolved: OnceLock<Arc<Settings>>,
}

impl SettingsProvider {
    /// Read the process environment and `.env.local` in the working directory.
    pub fn from_process() -> Self {
        Self {
            vars: VarSource::Process,
            env_file: Some(PathBuf::from(ENV_FILE)),
            resolved: OnceLock::new(),
        }
    }

    /// Read a fixed set of variables instead of the process environment.
    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let vars = vars
            .into_iter()
            .map(|(k, v)| (k.into().to_ascii_uppercase(), v.into()))
            .collect();
        Self {
            vars: VarSource::Fixed(vars),
            env_file: None,
            resolved: OnceLock::new(),
        }
    }

    pub fn with_env_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.env_file = Some(path.into());
        self
    }

    /// Resolve settings on first use; later calls return the cached value.
    pub fn get(&self) -> Result<Arc<Settings>, ConfigError> {
        if let Some(settings) = self.resolved.get() {
            return Ok(Arc::clone(settings));
        }
        let settings = Arc::new(self.resolve()?);
        Ok(Arc::clone(self.resolved.get_or_init(|| settings)))
    }

    fn resolve(&self) -> Result<Settings, ConfigError> {
        let mut vars = HashMap::new();
        if let Some(path) = &self.env_file {
            read_env_file(path, &mut vars)?;
        }

        match &self.vars {
            VarSource::Process => vars.extend(
                std::env::vars_os()
                    .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
                    .map(|(k, v)| (k.to_ascii_uppercase(), v))
                    .filter(|(k, _)| k.starts_with(ENV_PREFIX)),
            ),
            VarSource::Fixed(fixed) => vars.extend(fixed.clone()),
        }

        let settings = Settings::from_vars(&vars)?;
        debug!(
            base_url = %settings.base_url(),
            timeout_secs = settings.timeout().as_secs_f64(),
            "settings resolved"
        );
        Ok(settings)
    }
}

fn read_env_file(path: &Path, vars: &mut HashMap<String, String>) -> Result<(), ConfigError> {
    let env_file_error = |source: dotenvy::Error| ConfigError::EnvFile {
        path: path.to_path_buf(),
        source,
    };

    let entries = match dotenvy::from_path_iter(path) {
        Ok(entries) => entries,
        Err(e) if e.not_found() => {
            debug!(path = %path.display(), "no env file");
            return Ok(());
        }
        Err(e) => return Err(env_file_error(e)),
    };

    for entry in entries {
        let (key, value) = entry.map_err(env_file_error)?;
        let key = key.to_ascii_uppercase();
        if key.starts_with(ENV_PREFIX) {
            vars.insert(key, value);
        }
    }
    Ok(())
}
