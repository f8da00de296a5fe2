//! Path constants for configuration files and lyric writeback targets.

use std::path::{Path, PathBuf};

/// The name of the configuration directory under ~/.config/
pub const CONFIG_DIR_NAME: &str = "lyricsync";

/// The name of the main configuration file
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Extension used for lyric files written next to audio tracks
pub const WRITEBACK_EXTENSION: &str = "lrc";

/// Get the configuration directory path (~/.config/lyricsync/)
#[must_use]
pub fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join(CONFIG_DIR_NAME)
}

/// Get the config file path (~/.config/lyricsync/config.toml)
#[must_use]
pub fn config_path() -> PathBuf {
    config_dir().join(CONFIG_FILE_NAME)
}

/// Sibling lyric file path for a track: same directory, same base name, `.lrc`.
#[must_use]
pub fn writeback_path(track_path: &Path) -> PathBuf {
    sibling_path(track_path, WRITEBACK_EXTENSION)
}

/// File next to a track with the same base name and `extension`.
///
/// The track's extension is replaced only when it looks like a file type
/// (ASCII letters and digits); otherwise `extension` is appended, so
/// `01. Intro` maps to `01. Intro.lrc` and not `01.lrc`.
#[must_use]
pub fn sibling_path(track_path: &Path, extension: &str) -> PathBuf {
    let has_type_extension = track_path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()));

    if has_type_extension {
        track_path.with_extension(extension)
    } else {
        let mut name = track_path.as_os_str().to_owned();
        name.push(".");
        name.push(extension);
        PathBuf::from(name)
    }
}

/// Identity key used by the cache and the in-progress registry.
#[must_use]
pub fn track_key(track_path: &Path) -> String {
    track_path.to_string_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_writeback_path_replaces_extension() {
        let path = Path::new("/music/album/01 - Song.flac");
        assert_eq!(
            writeback_path(path),
            PathBuf::from("/music/album/01 - Song.lrc")
        );
    }

    #[test]
    fn test_writeback_path_without_extension() {
        let path = Path::new("/music/track");
        assert_eq!(writeback_path(path), PathBuf::from("/music/track.lrc"));
    }

    #[test]
    fn test_dotted_name_without_extension_keeps_full_name() {
        let path = Path::new("/music/01. Intro");
        assert_eq!(writeback_path(path), PathBuf::from("/music/01. Intro.lrc"));
        assert_eq!(
            sibling_path(path, "ass"),
            PathBuf::from("/music/01. Intro.ass")
        );
    }

    #[test]
    fn test_sibling_path_replaces_audio_extension() {
        assert_eq!(
            sibling_path(Path::new("/music/a.mp3"), "ASS"),
            PathBuf::from("/music/a.ASS")
        );
    }

    #[test]
    fn test_config_path_under_config_dir() {
        assert!(config_path().starts_with(config_dir()));
        assert!(config_path().ends_with(CONFIG_FILE_NAME));
    }
}
