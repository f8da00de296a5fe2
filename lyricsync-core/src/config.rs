use crate::ass::{AssOptions, AssStylePolicy};
use crate::cache::DEFAULT_CACHE_CAPACITY;
use crate::error::{CoreError, Result};
use crate::files::DEFAULT_LYRIC_EXTENSIONS;
use crate::karaoke::KaraokeScale;
use crate::lrc::DEFAULT_CHUNK_LINES;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LyricSyncConfig {
    #[serde(default)]
    pub lyrics: LyricsConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub parser: ParserConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LyricsConfig {
    /// Query online providers when no sibling lyric file exists
    #[serde(default = "default_true")]
    pub enable_online_fetch: bool,
    /// Save fetched lyrics next to the audio file as `.lrc`
    #[serde(default)]
    pub auto_save_online_lyrics: bool,
    /// Merge a provider's translation into the primary lyrics
    #[serde(default = "default_true")]
    pub prefer_translation: bool,
    /// Also merge a provider's romanization
    #[serde(default)]
    pub include_romanization: bool,
    /// Provider priority: providers are tried in order
    #[serde(default = "default_providers")]
    pub providers: Vec<LyricsProviderType>,
    /// Number of online results kept in memory
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
    /// Sibling lyric file extensions, highest priority first
    #[serde(default = "default_local_extensions")]
    pub local_extensions: Vec<String>,
}

const fn default_true() -> bool {
    true
}

fn default_providers() -> Vec<LyricsProviderType> {
    vec![LyricsProviderType::Netease, LyricsProviderType::Lrclib]
}

const fn default_cache_capacity() -> usize {
    DEFAULT_CACHE_CAPACITY
}

fn default_local_extensions() -> Vec<String> {
    DEFAULT_LYRIC_EXTENSIONS
        .iter()
        .map(|ext| (*ext).to_string())
        .collect()
}

impl Default for LyricsConfig {
    fn default() -> Self {
        Self {
            enable_online_fetch: true,
            auto_save_online_lyrics: false,
            prefer_translation: true,
            include_romanization: false,
            providers: default_providers(),
            cache_capacity: default_cache_capacity(),
            local_extensions: default_local_extensions(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LyricsProviderType {
    Netease,
    Lrclib,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Signed user offset in seconds (positive = lyrics shown earlier)
    #[serde(default)]
    pub user_offset_secs: f64,
    /// Fixed lead compensating for render lag, in seconds
    #[serde(default = "default_lead_bias")]
    pub lead_bias_secs: f64,
    /// Minimum time between active-line recomputations
    #[serde(default = "default_min_update_interval")]
    pub min_update_interval_ms: u64,
}

const fn default_lead_bias() -> f64 {
    0.05
}

const fn default_min_update_interval() -> u64 {
    100
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            user_offset_secs: 0.0,
            lead_bias_secs: default_lead_bias(),
            min_update_interval_ms: default_min_update_interval(),
        }
    }
}

impl SyncConfig {
    #[must_use]
    pub const fn min_update_interval(&self) -> Duration {
        Duration::from_millis(self.min_update_interval_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParserConfig {
    /// Scale applied to `\k`/`\kf` karaoke durations
    #[serde(default)]
    pub karaoke_scale: KaraokeScale,
    #[serde(default)]
    pub ass_styles: AssStylePolicy,
    /// Lines parsed between yields for large LRC inputs
    #[serde(default = "default_chunk_lines")]
    pub chunk_lines: usize,
}

const fn default_chunk_lines() -> usize {
    DEFAULT_CHUNK_LINES
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            karaoke_scale: KaraokeScale::default(),
            ass_styles: AssStylePolicy::default(),
            chunk_lines: default_chunk_lines(),
        }
    }
}

impl ParserConfig {
    #[must_use]
    pub fn ass_options(&self) -> AssOptions {
        AssOptions {
            styles: self.ass_styles.clone(),
            karaoke_scale: self.karaoke_scale,
        }
    }
}

impl LyricSyncConfig {
    /// Get the config file path (~/.config/lyricsync/config.toml)
    #[must_use]
    pub fn config_path() -> PathBuf {
        crate::paths::config_path()
    }

    /// Parse config from TOML text
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid TOML or values are out of range.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load config from file or create template on first run
    ///
    /// # Errors
    ///
    /// Returns `ConfigNotFound` after writing the template, or an error if the
    /// config file cannot be read or parsed.
    pub fn load_or_create() -> Result<Self> {
        Self::load_or_create_at(&Self::config_path())
    }

    /// Load config from `config_path`, writing the template there if missing
    ///
    /// # Errors
    ///
    /// Returns `ConfigNotFound` after writing the template, or an error if the
    /// config file cannot be read or parsed.
    pub fn load_or_create_at(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            // Create config directory if it doesn't exist
            if let Some(parent) = config_path.parent() {
                fs::create_dir_all(parent)?;
            }

            fs::write(config_path, CONFIG_TEMPLATE)?;

            return Err(CoreError::ConfigNotFound {
                path: config_path.to_path_buf(),
            });
        }

        let content = fs::read_to_string(config_path)?;
        Self::from_toml_str(&content)
    }

    fn validate(&self) -> Result<()> {
        if !self.sync.user_offset_secs.is_finite() {
            return Err(CoreError::ConfigInvalid {
                message: "sync.user_offset_secs must be a finite number".to_string(),
            });
        }
        if !self.sync.lead_bias_secs.is_finite() {
            return Err(CoreError::ConfigInvalid {
                message: "sync.lead_bias_secs must be a finite number".to_string(),
            });
        }
        if self.lyrics.local_extensions.iter().any(|ext| ext.trim().is_empty()) {
            return Err(CoreError::ConfigInvalid {
                message: "lyrics.local_extensions must not contain empty entries".to_string(),
            });
        }
        Ok(())
    }
}

const CONFIG_TEMPLATE: &str = r#"# lyricsync configuration
# ~/.config/lyricsync/config.toml

[lyrics]
# Fetch lyrics online when no sibling .lrc/.ass file exists
enable_online_fetch = true
# Save fetched lyrics next to the audio file (same name, .lrc)
auto_save_online_lyrics = false
# Merge translations returned by the provider as a second line
prefer_translation = true
# Also merge romanization when the provider has one
include_romanization = false
# Provider priority: "netease", "lrclib"
# Providers are tried in order; first result with lyrics wins
providers = ["netease", "lrclib"]
# Online results kept in memory
cache_capacity = 50
# Sibling lyric files, highest priority first
local_extensions = ["lrc", "ass", "ssa"]

[sync]
# Seconds; positive shows lyrics earlier
user_offset_secs = 0.0
lead_bias_secs = 0.05
min_update_interval_ms = 100

[parser]
# "uniform": \k and \kf are centiseconds; "legacy": \k is deciseconds
karaoke_scale = "uniform"
chunk_lines = 100

[parser.ass_styles]
original = ["orig", "default"]
translation = ["ts", "trans", "translation"]
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_parses_to_defaults() {
        let config = LyricSyncConfig::from_toml_str(CONFIG_TEMPLATE)
            .unwrap_or_else(|e| panic!("template should parse: {e}"));
        assert_eq!(config, LyricSyncConfig::default());
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = LyricSyncConfig::from_toml_str("")
            .unwrap_or_else(|e| panic!("empty config should parse: {e}"));
        assert!(config.lyrics.enable_online_fetch);
        assert!(!config.lyrics.auto_save_online_lyrics);
        assert_eq!(config.lyrics.cache_capacity, 50);
        assert_eq!(config.sync.min_update_interval(), Duration::from_millis(100));
        assert_eq!(config.parser.karaoke_scale, KaraokeScale::Uniform);
    }

    #[test]
    fn test_partial_override() {
        let config = LyricSyncConfig::from_toml_str(
            "[lyrics]\nenable_online_fetch = false\nproviders = [\"lrclib\"]\n[sync]\nuser_offset_secs = -0.3\n[parser]\nkaraoke_scale = \"legacy\"\n",
        )
        .unwrap_or_else(|e| panic!("config should parse: {e}"));
        assert!(!config.lyrics.enable_online_fetch);
        assert_eq!(config.lyrics.providers, vec![LyricsProviderType::Lrclib]);
        assert!((config.sync.user_offset_secs + 0.3).abs() < f64::EPSILON);
        assert!((config.sync.lead_bias_secs - 0.05).abs() < f64::EPSILON);
        assert_eq!(config.parser.karaoke_scale, KaraokeScale::Legacy);
    }

    #[test]
    fn test_invalid_toml_is_a_parse_error() {
        let result = LyricSyncConfig::from_toml_str("[lyrics\nbroken");
        assert!(matches!(result, Err(CoreError::ConfigParseError(_))));
    }

    #[test]
    fn test_empty_extension_is_rejected() {
        let result = LyricSyncConfig::from_toml_str("[lyrics]\nlocal_extensions = [\"lrc\", \"\"]\n");
        assert!(matches!(result, Err(CoreError::ConfigInvalid { .. })));
    }

    #[test]
    fn test_load_or_create_writes_template_once() {
        let dir = std::env::temp_dir().join(format!("lyricsync-config-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        let path = dir.join("nested").join(crate::paths::CONFIG_FILE_NAME);

        let first = LyricSyncConfig::load_or_create_at(&path);
        assert!(matches!(first, Err(CoreError::ConfigNotFound { .. })));
        assert!(path.exists());

        let second = LyricSyncConfig::load_or_create_at(&path)
            .unwrap_or_else(|e| panic!("template should load: {e}"));
        assert_eq!(second, LyricSyncConfig::default());
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_ass_options_follow_parser_config() {
        let config = ParserConfig {
            karaoke_scale: KaraokeScale::Legacy,
            ..ParserConfig::default()
        };
        let options = config.ass_options();
        assert_eq!(options.karaoke_scale, KaraokeScale::Legacy);
        assert_eq!(options.styles, AssStylePolicy::default());
    }
}
