//! TOML Configuration File Support
//!
//! Loads the finder's tunables from `~/.config/finder/finder.toml`.
//!
//! # Configuration Priority
//!
//! Configuration values are loaded with the following priority (highest first):
//! 1. CLI arguments (applied by the caller through [`ConfigOverrides`])
//! 2. Environment variables (`FINDER_*`)
//! 3. TOML configuration file
//! 4. Default values
//!
//! # XDG Base Directory Compliance
//!
//! - `$XDG_CONFIG_HOME/finder/finder.toml` (typically `~/.config/finder/finder.toml`)
//!
//! # Example Configuration
//!
//! ```toml
//! [transition]
//! start_delay_ms = 50
//! scroll_delay_ms = 750
//! end_delay_ms = 2000
//!
//! [navigation]
//! busy_policy = "coalesce"
//! results_screen_id = "Results"
//! legacy_screen_change_event = true
//!
//! [bus]
//! channel_capacity = 256
//!
//! [dependency]
//! http_timeout_secs = 10
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::bus::DEFAULT_CHANNEL_CAPACITY;
use crate::navigator::{BusyPolicy, NavigatorConfig};
use crate::screens::ScreenId;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur when loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file at {path}: {source}")]
    ReadError {
        /// The path that was attempted
        path: PathBuf,
        /// The underlying IO error
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("Failed to parse TOML config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

// =============================================================================
// Configuration Source Tracking
// =============================================================================

/// Tracks where a configuration value came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Value from command-line argument
    Cli,
    /// Value from environment variable
    Env,
    /// Value from TOML configuration file
    File,
    /// Default value
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cli => write!(f, "CLI"),
            Self::Env => write!(f, "environment"),
            Self::File => write!(f, "config file"),
            Self::Default => write!(f, "default"),
        }
    }
}

// =============================================================================
// TOML Configuration Structures
// =============================================================================

/// Transition section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TransitionToml {
    /// Delay between transition start and activation in milliseconds
    pub start_delay_ms: Option<u64>,

    /// Delay between activation and scroll-to-top in milliseconds
    pub scroll_delay_ms: Option<u64>,

    /// Delay between activation and transition end in milliseconds
    pub end_delay_ms: Option<u64>,
}

/// Navigation section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigationToml {
    /// What to do with requests while busy
    pub busy_policy: Option<BusyPolicy>,

    /// Initial selection retry interval in milliseconds
    pub bootstrap_poll_ms: Option<u64>,

    /// Dependency polling interval in milliseconds
    pub dependency_poll_ms: Option<u64>,

    /// Screen reported as results view (empty string disables)
    pub results_screen_id: Option<String>,

    /// Whether to publish the legacy screen change notification
    pub legacy_screen_change_event: Option<bool>,
}

/// Bus section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BusToml {
    /// Per-subscriber channel capacity
    pub channel_capacity: Option<usize>,
}

/// Dependency section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DependencyToml {
    /// Timeout for HTTP dependencies in seconds
    pub http_timeout_secs: Option<u64>,
}

/// Top-level TOML configuration structure
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FinderToml {
    /// Transition timing section
    pub transition: TransitionToml,

    /// Navigation section
    pub navigation: NavigationToml,

    /// Event bus section
    pub bus: BusToml,

    /// Dependency section
    pub dependency: DependencyToml,
}

// =============================================================================
// Main Configuration Struct
// =============================================================================

/// Centralized configuration for a finder
///
/// Use [`load_config`] to load configuration with proper priority handling.
#[derive(Clone, Debug)]
pub struct FinderConfig {
    /// Navigator configuration
    pub navigator: NavigatorConfig,

    /// Per-subscriber bus channel capacity
    pub bus_capacity: usize,

    /// Timeout for HTTP dependencies
    pub http_timeout: Duration,

    /// Path to the config file that was loaded (if any)
    pub config_file_path: Option<PathBuf>,

    /// Source of configuration values
    source: ConfigSource,
}

impl Default for FinderConfig {
    fn default() -> Self {
        Self {
            navigator: NavigatorConfig::default(),
            bus_capacity: DEFAULT_CHANNEL_CAPACITY,
            http_timeout: Duration::from_secs(10),
            config_file_path: None,
            source: ConfigSource::Default,
        }
    }
}

impl FinderConfig {
    /// Create a new configuration with default values
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the primary source of this configuration
    #[must_use]
    pub fn source(&self) -> ConfigSource {
        self.source
    }

    /// Set the configuration source
    pub fn set_source(&mut self, source: ConfigSource) {
        self.source = source;
    }

    /// Check values that would make the finder unusable
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] describing the first bad value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bus_capacity == 0 {
            return Err(ConfigError::ValidationError(
                "bus channel_capacity must be at least 1".to_string(),
            ));
        }
        if self.navigator.dependency_poll.is_zero() {
            return Err(ConfigError::ValidationError(
                "navigation dependency_poll_ms must be at least 1".to_string(),
            ));
        }
        if self.navigator.bootstrap_poll.is_zero() {
            return Err(ConfigError::ValidationError(
                "navigation bootstrap_poll_ms must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Configuration Loading
// =============================================================================

/// Get the default configuration file path
///
/// Returns `$XDG_CONFIG_HOME/finder/finder.toml` or
/// `~/.config/finder/finder.toml` if `XDG_CONFIG_HOME` is not set.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("finder").join("finder.toml"))
}

/// Load configuration from all sources with proper priority
///
/// # Errors
///
/// Returns an error if the config file exists but cannot be parsed, or the
/// resulting values fail validation. A missing config file is not an error.
pub fn load_config() -> Result<FinderConfig, ConfigError> {
    load_config_from_path(default_config_path())
}

/// Load configuration from a specific path
///
/// # Arguments
///
/// * `path` - Optional path to the configuration file. If `None`, only defaults
///   and environment variables are used.
///
/// # Errors
///
/// Returns an error if the specified config file cannot be read or parsed,
/// or the resulting values fail validation.
pub fn load_config_from_path(path: Option<PathBuf>) -> Result<FinderConfig, ConfigError> {
    let mut config = FinderConfig::default();

    if let Some(ref config_path) = path {
        if config_path.exists() {
            let toml_content =
                std::fs::read_to_string(config_path).map_err(|e| ConfigError::ReadError {
                    path: config_path.clone(),
                    source: e,
                })?;

            let toml_config: FinderToml = toml::from_str(&toml_content)?;
            apply_toml_config(&mut config, &toml_config);
            config.config_file_path = Some(config_path.clone());
            config.source = ConfigSource::File;

            tracing::info!(
                path = %config_path.display(),
                "Loaded configuration from file"
            );
        } else {
            tracing::debug!(
                path = %config_path.display(),
                "Config file not found, using defaults"
            );
        }
    }

    apply_env_config(&mut config);
    config.validate()?;

    Ok(config)
}

fn results_screen(id: &str) -> Option<ScreenId> {
    let id = id.trim();
    (!id.is_empty()).then(|| ScreenId::new(id))
}

/// Apply TOML configuration values to the config struct
fn apply_toml_config(config: &mut FinderConfig, toml: &FinderToml) {
    let navigator = &mut config.navigator;

    // Transition timings
    if let Some(ms) = toml.transition.start_delay_ms {
        navigator.timings.start_delay = Duration::from_millis(ms);
    }
    if let Some(ms) = toml.transition.scroll_delay_ms {
        navigator.timings.scroll_delay = Duration::from_millis(ms);
    }
    if let Some(ms) = toml.transition.end_delay_ms {
        navigator.timings.end_delay = Duration::from_millis(ms);
    }

    // Navigation
    if let Some(policy) = toml.navigation.busy_policy {
        navigator.busy_policy = policy;
    }
    if let Some(ms) = toml.navigation.bootstrap_poll_ms {
        navigator.bootstrap_poll = Duration::from_millis(ms);
    }
    if let Some(ms) = toml.navigation.dependency_poll_ms {
        navigator.dependency_poll = Duration::from_millis(ms);
    }
    if let Some(ref id) = toml.navigation.results_screen_id {
        navigator.results_screen_id = results_screen(id);
    }
    if let Some(enabled) = toml.navigation.legacy_screen_change_event {
        navigator.legacy_screen_change_event = enabled;
    }

    if let Some(capacity) = toml.bus.channel_capacity {
        config.bus_capacity = capacity;
    }
    if let Some(secs) = toml.dependency.http_timeout_secs {
        config.http_timeout = Duration::from_secs(secs);
    }
}

/// Apply environment variable overrides to the config
fn apply_env_config(config: &mut FinderConfig) {
    apply_env_from(config, |key| std::env::var(key).ok());
}

/// Apply overrides read through `lookup`
fn apply_env_from(config: &mut FinderConfig, lookup: impl Fn(&str) -> Option<String>) {
    let millis = |key: &str| {
        lookup(key)
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_millis)
    };

    if let Some(delay) = millis("FINDER_START_DELAY_MS") {
        config.navigator.timings.start_delay = delay;
        config.source = ConfigSource::Env;
    }
    if let Some(delay) = millis("FINDER_SCROLL_DELAY_MS") {
        config.navigator.timings.scroll_delay = delay;
        config.source = ConfigSource::Env;
    }
    if let Some(delay) = millis("FINDER_END_DELAY_MS") {
        config.navigator.timings.end_delay = delay;
        config.source = ConfigSource::Env;
    }

    if let Some(policy) = lookup("FINDER_BUSY_POLICY") {
        match BusyPolicy::parse(&policy) {
            Some(policy) => {
                config.navigator.busy_policy = policy;
                config.source = ConfigSource::Env;
            }
            None => tracing::warn!(value = %policy, "Ignoring unknown FINDER_BUSY_POLICY"),
        }
    }
    if let Some(id) = lookup("FINDER_RESULTS_SCREEN") {
        config.navigator.results_screen_id = results_screen(&id);
        config.source = ConfigSource::Env;
    }
    if let Some(enabled) = lookup("FINDER_LEGACY_EVENT") {
        config.navigator.legacy_screen_change_event =
            enabled != "0" && enabled.to_lowercase() != "false";
        config.source = ConfigSource::Env;
    }

    if let Some(capacity) = lookup("FINDER_BUS_CAPACITY").and_then(|v| v.parse::<usize>().ok()) {
        config.bus_capacity = capacity;
        config.source = ConfigSource::Env;
    }
}

// =============================================================================
// CLI Override Support
// =============================================================================

/// Builder for applying CLI overrides to configuration
///
/// Use this after [`load_config`] to apply command-line argument overrides.
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    /// Start delay override (milliseconds)
    pub start_delay_ms: Option<u64>,

    /// End delay override (milliseconds)
    pub end_delay_ms: Option<u64>,

    /// Busy policy override
    pub busy_policy: Option<BusyPolicy>,

    /// Results screen override
    pub results_screen_id: Option<String>,
}

impl ConfigOverrides {
    /// Create a new empty set of overrides
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set start delay override
    #[must_use]
    pub fn with_start_delay_ms(mut self, ms: u64) -> Self {
        self.start_delay_ms = Some(ms);
        self
    }

    /// Set end delay override
    #[must_use]
    pub fn with_end_delay_ms(mut self, ms: u64) -> Self {
        self.end_delay_ms = Some(ms);
        self
    }

    /// Set busy policy override
    #[must_use]
    pub fn with_busy_policy(mut self, policy: BusyPolicy) -> Self {
        self.busy_policy = Some(policy);
        self
    }

    /// Set results screen override
    #[must_use]
    pub fn with_results_screen_id(mut self, id: String) -> Self {
        self.results_screen_id = Some(id);
        self
    }

    /// Whether any override is set
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.start_delay_ms.is_none()
            && self.end_delay_ms.is_none()
            && self.busy_policy.is_none()
            && self.results_screen_id.is_none()
    }

    /// Apply overrides to a configuration
    pub fn apply(&self, config: &mut FinderConfig) {
        if !self.is_empty() {
            config.source = ConfigSource::Cli;
        }

        if let Some(ms) = self.start_delay_ms {
            config.navigator.timings.start_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = self.end_delay_ms {
            config.navigator.timings.end_delay = Duration::from_millis(ms);
        }
        if let Some(policy) = self.busy_policy {
            config.navigator.busy_policy = policy;
        }
        if let Some(ref id) = self.results_screen_id {
            config.navigator.results_screen_id = results_screen(id);
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    fn from_toml(content: &str) -> FinderConfig {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        load_config_from_path(Some(file.path().to_path_buf())).unwrap()
    }

    // =========================================================================
    // Default Configuration Tests
    // =========================================================================

    #[test]
    fn test_default_config() {
        let config = FinderConfig::default();

        assert_eq!(
            config.navigator.timings.start_delay,
            Duration::from_millis(50)
        );
        assert_eq!(
            config.navigator.timings.scroll_delay,
            Duration::from_millis(750)
        );
        assert_eq!(
            config.navigator.timings.end_delay,
            Duration::from_millis(2000)
        );
        assert_eq!(config.navigator.busy_policy, BusyPolicy::Coalesce);
        assert_eq!(
            config.navigator.results_screen_id,
            Some(ScreenId::new("Results"))
        );
        assert!(config.navigator.legacy_screen_change_event);
        assert_eq!(config.bus_capacity, DEFAULT_CHANNEL_CAPACITY);
        assert_eq!(config.source(), ConfigSource::Default);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_config_path() {
        if let Some(p) = default_config_path() {
            assert!(p.ends_with("finder/finder.toml"));
        }
    }

    // =========================================================================
    // TOML Parsing Tests
    // =========================================================================

    #[test]
    fn test_parse_valid_toml() {
        let config = from_toml(
            r#"
[transition]
start_delay_ms = 10
scroll_delay_ms = 300
end_delay_ms = 900

[navigation]
busy_policy = "drop"
bootstrap_poll_ms = 20
dependency_poll_ms = 5
results_screen_id = "recommendations"
legacy_screen_change_event = false

[bus]
channel_capacity = 32

[dependency]
http_timeout_secs = 3
"#,
        );

        let nav = &config.navigator;
        assert_eq!(nav.timings.start_delay, Duration::from_millis(10));
        assert_eq!(nav.timings.scroll_delay, Duration::from_millis(300));
        assert_eq!(nav.timings.end_delay, Duration::from_millis(900));
        assert_eq!(nav.busy_policy, BusyPolicy::Drop);
        assert_eq!(nav.bootstrap_poll, Duration::from_millis(20));
        assert_eq!(nav.dependency_poll, Duration::from_millis(5));
        assert_eq!(
            nav.results_screen_id,
            Some(ScreenId::new("recommendations"))
        );
        assert!(!nav.legacy_screen_change_event);
        assert_eq!(config.bus_capacity, 32);
        assert_eq!(config.http_timeout, Duration::from_secs(3));
        assert_eq!(config.source(), ConfigSource::File);
        assert!(config.config_file_path.is_some());
    }

    #[test]
    fn test_parse_partial_toml() {
        let config = from_toml(
            r#"
[transition]
end_delay_ms = 500
"#,
        );
        assert_eq!(
            config.navigator.timings.end_delay,
            Duration::from_millis(500)
        );
        assert_eq!(
            config.navigator.timings.start_delay,
            Duration::from_millis(50)
        );
        assert_eq!(config.navigator.busy_policy, BusyPolicy::Coalesce);
    }

    #[test]
    fn test_empty_results_screen_disables_reporting() {
        let config = from_toml(
            r#"
[navigation]
results_screen_id = ""
"#,
        );
        assert!(config.navigator.results_screen_id.is_none());
    }

    #[test]
    fn test_missing_file_graceful() {
        let config =
            load_config_from_path(Some(PathBuf::from("/nonexistent/finder/finder.toml"))).unwrap();
        assert!(config.config_file_path.is_none());
    }

    #[test]
    fn test_malformed_toml_error() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"[transition\nstart_delay_ms = ").unwrap();
        let result = load_config_from_path(Some(file.path().to_path_buf()));
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_unknown_busy_policy_is_parse_error() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"[navigation]\nbusy_policy = \"queue\"\n")
            .unwrap();
        let result = load_config_from_path(Some(file.path().to_path_buf()));
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"[bus]\nchannel_capacity = 0\n").unwrap();
        let result = load_config_from_path(Some(file.path().to_path_buf()));
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    // =========================================================================
    // Environment Override Tests
    // =========================================================================

    #[test]
    fn test_env_overrides() {
        let mut config = FinderConfig::default();
        apply_env_from(
            &mut config,
            env(&[
                ("FINDER_START_DELAY_MS", "5"),
                ("FINDER_SCROLL_DELAY_MS", "6"),
                ("FINDER_END_DELAY_MS", "7"),
                ("FINDER_BUSY_POLICY", "Drop"),
                ("FINDER_RESULTS_SCREEN", "shoes"),
                ("FINDER_LEGACY_EVENT", "false"),
                ("FINDER_BUS_CAPACITY", "8"),
            ]),
        );

        let nav = &config.navigator;
        assert_eq!(nav.timings.start_delay, Duration::from_millis(5));
        assert_eq!(nav.timings.scroll_delay, Duration::from_millis(6));
        assert_eq!(nav.timings.end_delay, Duration::from_millis(7));
        assert_eq!(nav.busy_policy, BusyPolicy::Drop);
        assert_eq!(nav.results_screen_id, Some(ScreenId::new("shoes")));
        assert!(!nav.legacy_screen_change_event);
        assert_eq!(config.bus_capacity, 8);
        assert_eq!(config.source(), ConfigSource::Env);
    }

    #[test]
    fn test_env_invalid_values_ignored() {
        let mut config = FinderConfig::default();
        apply_env_from(
            &mut config,
            env(&[
                ("FINDER_START_DELAY_MS", "soon"),
                ("FINDER_BUSY_POLICY", "queue"),
            ]),
        );
        assert_eq!(
            config.navigator.timings.start_delay,
            Duration::from_millis(50)
        );
        assert_eq!(config.navigator.busy_policy, BusyPolicy::Coalesce);
        assert_eq!(config.source(), ConfigSource::Default);
    }

    // =========================================================================
    // CLI Override Tests
    // =========================================================================

    #[test]
    fn test_config_overrides_apply() {
        let mut config = FinderConfig::default();
        let overrides = ConfigOverrides::new()
            .with_start_delay_ms(1)
            .with_end_delay_ms(2)
            .with_busy_policy(BusyPolicy::Drop)
            .with_results_screen_id("done".to_string());
        overrides.apply(&mut config);

        assert_eq!(
            config.navigator.timings.start_delay,
            Duration::from_millis(1)
        );
        assert_eq!(config.navigator.timings.end_delay, Duration::from_millis(2));
        assert_eq!(config.navigator.busy_policy, BusyPolicy::Drop);
        assert_eq!(
            config.navigator.results_screen_id,
            Some(ScreenId::new("done"))
        );
        assert_eq!(config.source(), ConfigSource::Cli);
    }

    #[test]
    fn test_config_overrides_empty_no_change() {
        let mut config = FinderConfig::default();
        let overrides = ConfigOverrides::new();
        assert!(overrides.is_empty());
        overrides.apply(&mut config);
        assert_eq!(config.source(), ConfigSource::Default);
    }

    #[test]
    fn test_config_source_display() {
        assert_eq!(ConfigSource::Cli.to_string(), "CLI");
        assert_eq!(ConfigSource::Env.to_string(), "environment");
        assert_eq!(ConfigSource::File.to_string(), "config file");
        assert_eq!(ConfigSource::Default.to_string(), "default");
    }

    #[test]
    fn test_busy_policy_parse() {
        assert_eq!(BusyPolicy::parse("coalesce"), Some(BusyPolicy::Coalesce));
        assert_eq!(BusyPolicy::parse(" DROP "), Some(BusyPolicy::Drop));
        assert_eq!(BusyPolicy::parse("queue"), None);
    }
}
