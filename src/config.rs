//! Configuration constants and profile loading for benchpad
//!
//! Profiles live in an INI file, one section per profile:
//!
//! ```ini
//! [default]
//! server = http://localhost:8080
//! fmt_path = /fmt
//! run_path = /run
//! timeout_secs = 30
//! language = go
//! fmt_key = Ctrl-F
//! run_key = Shift-Enter
//! ```

use crate::repl::commands::keymap::KeyChord;
use crossterm::event::{KeyCode, KeyModifiers};
use ini::Ini;
use std::path::Path;
use std::time::Duration;

/// Default profile file path for benchpad
pub const DEFAULT_PROFILE_PATH: &str = "~/.benchpad/profile";

/// Environment variable name for overriding the profile path
pub const PROFILE_PATH_ENV_VAR: &str = "BENCHPAD_PROFILE_PATH";

pub const DEFAULT_SERVER: &str = "http://localhost:8080";
pub const DEFAULT_FMT_PATH: &str = "/fmt";
pub const DEFAULT_RUN_PATH: &str = "/run";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_LANGUAGE: &str = "go";

/// Get the profile file path, checking environment variable first, then falling back to default
pub fn get_profile_path() -> String {
    std::env::var_os(PROFILE_PATH_ENV_VAR)
        .and_then(|val| val.into_string().ok())
        .unwrap_or_else(|| DEFAULT_PROFILE_PATH.to_string())
}

/// Errors raised while reading a profile
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to load profile file '{path}': {source}")]
    Load {
        path: String,
        #[source]
        source: ini::Error,
    },
    #[error("invalid value '{value}' for '{key}' in profile [{profile}]: {reason}")]
    InvalidValue {
        profile: String,
        key: String,
        value: String,
        reason: String,
    },
}

/// Connection and editor settings for one profile
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceProfile {
    server: String,
    fmt_path: String,
    run_path: String,
    timeout: Duration,
    language: String,
    fmt_key: KeyChord,
    run_key: KeyChord,
}

impl ServiceProfile {
    /// Server base URL without a trailing slash
    pub fn server(&self) -> &str {
        &self.server
    }

    pub fn fmt_path(&self) -> &str {
        &self.fmt_path
    }

    pub fn run_path(&self) -> &str {
        &self.run_path
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn fmt_key(&self) -> KeyChord {
        self.fmt_key
    }

    pub fn run_key(&self) -> KeyChord {
        self.run_key
    }

    /// Replace the server URL (e.g. from `--server`)
    pub fn with_server(mut self, server: &str) -> Result<Self, ConfigError> {
        self.server = validate_server("command line", server)?;
        Ok(self)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn from_section(profile: &str, section: &ini::Properties) -> Result<Self, ConfigError> {
        let mut result = Self::default();

        if let Some(server) = section.get("server") {
            result.server = validate_server(profile, server)?;
        }
        if let Some(path) = section.get("fmt_path") {
            result.fmt_path = normalize_path(path);
        }
        if let Some(path) = section.get("run_path") {
            result.run_path = normalize_path(path);
        }
        if let Some(value) = section.get("timeout_secs") {
            let secs: u64 = value
                .trim()
                .parse()
                .map_err(|e: std::num::ParseIntError| invalid(profile, "timeout_secs", value, e))?;
            result.timeout = Duration::from_secs(secs);
        }
        if let Some(language) = section.get("language") {
            result.language = language.trim().to_string();
        }
        if let Some(value) = section.get("fmt_key") {
            result.fmt_key = value.parse().map_err(|e| invalid(profile, "fmt_key", value, e))?;
        }
        if let Some(value) = section.get("run_key") {
            result.run_key = value.parse().map_err(|e| invalid(profile, "run_key", value, e))?;
        }

        Ok(result)
    }
}

impl Default for ServiceProfile {
    fn default() -> Self {
        Self {
            server: DEFAULT_SERVER.to_string(),
            fmt_path: DEFAULT_FMT_PATH.to_string(),
            run_path: DEFAULT_RUN_PATH.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            language: DEFAULT_LANGUAGE.to_string(),
            fmt_key: KeyChord::new(KeyCode::Char('f'), KeyModifiers::CONTROL),
            run_key: KeyChord::new(KeyCode::Enter, KeyModifiers::SHIFT),
        }
    }
}

/// Reads profiles from an INI file
pub struct ProfileStore {
    path: String,
}

impl ProfileStore {
    /// Create a store for `path`; a leading `~` is expanded
    pub fn new(path: &str) -> Self {
        Self {
            path: shellexpand::tilde(path).into_owned(),
        }
    }

    /// Load a profile by name. A missing file or section is not an error.
    pub fn get_profile(&self, name: &str) -> Result<Option<ServiceProfile>, ConfigError> {
        if !Path::new(&self.path).exists() {
            tracing::debug!("Profile file '{}' does not exist", self.path);
            return Ok(None);
        }

        let ini = Ini::load_from_file(&self.path).map_err(|source| ConfigError::Load {
            path: self.path.clone(),
            source,
        })?;

        match ini.section(Some(name)) {
            Some(section) => ServiceProfile::from_section(name, section).map(Some),
            None => Ok(None),
        }
    }
}

fn validate_server(profile: &str, server: &str) -> Result<String, ConfigError> {
    let trimmed = server.trim();
    let url = reqwest::Url::parse(trimmed).map_err(|e| invalid(profile, "server", server, e))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(profile, "server", server, "scheme must be http or https"));
    }
    Ok(trimmed.trim_end_matches('/').to_string())
}

fn normalize_path(path: &str) -> String {
    let path = path.trim();
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    }
}

fn invalid(profile: &str, key: &str, value: &str, reason: impl ToString) -> ConfigError {
    ConfigError::InvalidValue {
        profile: profile.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}
