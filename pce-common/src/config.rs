//! Configuration loading and state folder resolution
//!
//! The engine settings live in a small TOML file. Every field has a built-in
//! default so a missing or partial file never prevents startup:
//!
//! ```toml
//! [constraints]
//! no_disabled = true
//! min_song_length = 120
//!
//! [exclusion]
//! song_list_length = 5
//! max_age_hours = 24
//!
//! [limits]
//! max_tries = 10
//! ```
//!
//! Selection settings are reloadable: [`SettingsSource::reload`] is called
//! before every top-level random selection so live edits take effect without
//! a restart.

use crate::{Error, Result};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Environment variable overriding the state folder
pub const STATE_DIR_ENV: &str = "PCE_STATE_DIR";

/// Complete engine configuration as stored in the TOML file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct EngineConfig {
    /// Folder holding persisted queues and exclusion lists (optional)
    #[serde(default)]
    pub state_dir: Option<PathBuf>,

    #[serde(default)]
    pub constraints: ConstraintsConfig,

    #[serde(default)]
    pub exclusion: ExclusionConfig,

    #[serde(default)]
    pub limits: LimitsConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Candidate constraints applied by the catalog query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstraintsConfig {
    /// Never choose disabled songs
    #[serde(default = "default_true")]
    pub no_disabled: bool,

    /// Never choose hated songs
    #[serde(default = "default_true")]
    pub no_hated: bool,

    /// Never choose songs marked as having bad audio
    #[serde(default = "default_true")]
    pub no_bad_audio: bool,

    /// Never choose live recordings
    #[serde(default)]
    pub no_live_music: bool,

    /// Minimum duration in seconds
    #[serde(default = "default_min_song_length")]
    pub min_song_length: u32,

    /// Maximum duration in seconds
    #[serde(default = "default_max_song_length")]
    pub max_song_length: u32,
}

/// Exclusion list capacities and entry lifetime
///
/// A capacity of `0` disables the list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExclusionConfig {
    #[serde(default = "default_song_list_length")]
    pub song_list_length: usize,

    #[serde(default = "default_album_list_length")]
    pub album_list_length: usize,

    #[serde(default = "default_artist_list_length")]
    pub artist_list_length: usize,

    #[serde(default = "default_video_list_length")]
    pub video_list_length: usize,

    /// Entries older than this are expired on validation
    #[serde(default = "default_max_age_hours")]
    pub max_age_hours: u32,
}

/// Selection limits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Maximum catalog queries per selection
    #[serde(default = "default_max_tries")]
    pub max_tries: u32,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_true() -> bool {
    true
}

fn default_min_song_length() -> u32 {
    120
}

fn default_max_song_length() -> u32 {
    600
}

fn default_song_list_length() -> usize {
    5
}

fn default_album_list_length() -> usize {
    2
}

fn default_artist_list_length() -> usize {
    1
}

fn default_video_list_length() -> usize {
    3
}

fn default_max_age_hours() -> u32 {
    24
}

fn default_max_tries() -> u32 {
    10
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ConstraintsConfig {
    fn default() -> Self {
        Self {
            no_disabled: true,
            no_hated: true,
            no_bad_audio: true,
            no_live_music: false,
            min_song_length: default_min_song_length(),
            max_song_length: default_max_song_length(),
        }
    }
}

impl Default for ExclusionConfig {
    fn default() -> Self {
        Self {
            song_list_length: default_song_list_length(),
            album_list_length: default_album_list_length(),
            artist_list_length: default_artist_list_length(),
            video_list_length: default_video_list_length(),
            max_age_hours: default_max_age_hours(),
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_tries: default_max_tries(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl EngineConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: EngineConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file
    ///
    /// A missing file is not an error: defaults are returned and a warning is
    /// logged. A file that exists but does not parse is a configuration error.
    pub fn load(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::from_toml_str(&content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(
                    "Config file {} not found, using built-in defaults",
                    path.display()
                );
                Ok(Self::default())
            }
            Err(e) => Err(Error::Io(e)),
        }
    }

    /// Reject settings the selector cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.limits.max_tries == 0 {
            return Err(Error::Config("limits.max_tries must be at least 1".to_string()));
        }
        if self.constraints.min_song_length > self.constraints.max_song_length {
            return Err(Error::Config(format!(
                "constraints.min_song_length ({}) exceeds constraints.max_song_length ({})",
                self.constraints.min_song_length, self.constraints.max_song_length
            )));
        }
        Ok(())
    }

    /// Serialize back to TOML (used when writing an initial config file)
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))
    }
}

/// Typed, reloadable access to the engine configuration
pub trait SettingsSource: Send + Sync {
    /// Re-read the configuration, picking up live edits
    fn reload(&self) -> Result<EngineConfig>;
}

/// Settings re-read from a TOML file on every reload
#[derive(Debug, Clone)]
pub struct TomlSettingsFile {
    path: PathBuf,
}

impl TomlSettingsFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SettingsSource for TomlSettingsFile {
    fn reload(&self) -> Result<EngineConfig> {
        debug!("Reloading settings from {}", self.path.display());
        EngineConfig::load(&self.path)
    }
}

/// In-memory settings, updated programmatically
#[derive(Debug, Default)]
pub struct StaticSettings {
    config: RwLock<EngineConfig>,
}

impl StaticSettings {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config: RwLock::new(config),
        }
    }

    /// Replace the configuration seen by the next reload
    pub fn update(&self, config: EngineConfig) {
        *self.config.write() = config;
    }
}

impl SettingsSource for StaticSettings {
    fn reload(&self) -> Result<EngineConfig> {
        let config = self.config.read().clone();
        config.validate()?;
        Ok(config)
    }
}

/// State folder resolution, in priority order:
/// 1. Explicit argument (highest priority)
/// 2. `PCE_STATE_DIR` environment variable
/// 3. `state_dir` from the TOML config
/// 4. OS-dependent default (fallback)
pub fn resolve_state_dir(cli_arg: Option<&Path>, config: Option<&EngineConfig>) -> PathBuf {
    // Priority 1: explicit argument
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    // Priority 2: environment variable
    if let Ok(path) = std::env::var(STATE_DIR_ENV) {
        if !path.is_empty() {
            return PathBuf::from(path);
        }
    }

    // Priority 3: TOML config
    if let Some(path) = config.and_then(|c| c.state_dir.as_ref()) {
        return path.clone();
    }

    // Priority 4: OS-dependent default
    default_state_dir()
}

/// Get OS-dependent default state folder
fn default_state_dir() -> PathBuf {
    if cfg!(target_os = "linux") {
        // ~/.local/share/pce (or /var/lib/pce for system-wide)
        dirs::data_local_dir()
            .map(|d| d.join("pce"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/pce"))
    } else if cfg!(target_os = "macos") {
        dirs::data_dir()
            .map(|d| d.join("pce"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/pce"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join("pce"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\pce"))
    } else {
        PathBuf::from("./pce_state")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_yields_defaults() {
        let config = EngineConfig::from_toml_str("").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.exclusion.song_list_length, 5);
        assert_eq!(config.exclusion.album_list_length, 2);
        assert_eq!(config.exclusion.artist_list_length, 1);
        assert_eq!(config.exclusion.video_list_length, 3);
        assert_eq!(config.exclusion.max_age_hours, 24);
        assert_eq!(config.limits.max_tries, 10);
        assert!(config.constraints.no_disabled);
        assert!(!config.constraints.no_live_music);
    }

    #[test]
    fn test_partial_section_keeps_other_defaults() {
        let config = EngineConfig::from_toml_str(
            r#"
            [exclusion]
            song_list_length = 50
            "#,
        )
        .unwrap();
        assert_eq!(config.exclusion.song_list_length, 50);
        assert_eq!(config.exclusion.album_list_length, 2);
        assert_eq!(config.constraints.max_song_length, 600);
    }

    #[test]
    fn test_zero_max_tries_rejected() {
        let err = EngineConfig::from_toml_str("[limits]\nmax_tries = 0\n").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_inverted_duration_bounds_rejected() {
        let err = EngineConfig::from_toml_str(
            "[constraints]\nmin_song_length = 700\nmax_song_length = 600\n",
        )
        .unwrap_err();
        assert!(err.to_string().contains("min_song_length"));
    }

    #[test]
    fn test_static_settings_update_visible_on_reload() {
        let settings = StaticSettings::new(EngineConfig::default());
        assert_eq!(settings.reload().unwrap().limits.max_tries, 10);

        let mut changed = EngineConfig::default();
        changed.limits.max_tries = 3;
        settings.update(changed);
        assert_eq!(settings.reload().unwrap().limits.max_tries, 3);
    }

    #[test]
    fn test_toml_round_trip() {
        let mut config = EngineConfig::default();
        config.exclusion.video_list_length = 0;
        let text = config.to_toml_string().unwrap();
        assert_eq!(EngineConfig::from_toml_str(&text).unwrap(), config);
    }
}
