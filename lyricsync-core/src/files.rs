//! File collaborator: sibling lyric lookup, reads and writeback.

use crate::encoding::decode_text;
use crate::error::{CoreError, Result};
use crate::paths::sibling_path;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::debug;

const LOG_TARGET: &str = "lyricsync::files";

/// Default sibling lyric extensions, highest priority first
pub const DEFAULT_LYRIC_EXTENSIONS: &[&str] = &["lrc", "ass", "ssa"];

/// Grammar of a lyric file, chosen by its extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LyricFormat {
    Lrc,
    Ass,
}

impl LyricFormat {
    /// Grammar for a lyric file path; anything not ASS/SSA is read as LRC
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("ass" | "ssa") => Self::Ass,
            _ => Self::Lrc,
        }
    }
}

/// Access to lyric files living next to audio tracks
#[async_trait]
pub trait FileLookup: Send + Sync {
    /// Find a sibling lyric file sharing the track's base name
    async fn find_lyric_file(&self, track_path: &Path) -> Option<PathBuf>;

    /// Read a lyric file as text
    async fn read_file(&self, path: &Path) -> Result<String>;

    /// Create a lyric file. An existing file at `path` is never replaced;
    /// that case fails with `WritebackFailed`.
    async fn write_file(&self, path: &Path, text: &str) -> Result<()>;
}

/// [`FileLookup`] over the local filesystem
#[derive(Debug, Clone)]
pub struct FsFileLookup {
    extensions: Vec<String>,
}

impl FsFileLookup {
    /// Create a lookup that checks `extensions` in order
    #[must_use]
    pub fn new(extensions: Vec<String>) -> Self {
        Self { extensions }
    }
}

impl Default for FsFileLookup {
    fn default() -> Self {
        Self::new(
            DEFAULT_LYRIC_EXTENSIONS
                .iter()
                .map(|ext| (*ext).to_string())
                .collect(),
        )
    }
}

#[async_trait]
impl FileLookup for FsFileLookup {
    async fn find_lyric_file(&self, track_path: &Path) -> Option<PathBuf> {
        for ext in &self.extensions {
            for candidate_ext in [ext.to_lowercase(), ext.to_uppercase()] {
                let candidate = sibling_path(track_path, &candidate_ext);
                if candidate == track_path {
                    continue;
                }
                if tokio::fs::try_exists(&candidate).await.unwrap_or(false) {
                    debug!(target: LOG_TARGET, "Found lyric file {:?}", candidate);
                    return Some(candidate);
                }
            }
        }
        None
    }

    async fn read_file(&self, path: &Path) -> Result<String> {
        let bytes = tokio::fs::read(path).await?;
        Ok(decode_text(&bytes))
    }

    async fn write_file(&self, path: &Path, text: &str) -> Result<()> {
        let failed = |e: std::io::Error| CoreError::WritebackFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        };

        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .await
            .map_err(failed)?;
        file.write_all(text.as_bytes()).await.map_err(failed)?;
        file.flush().await.map_err(failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static DIR_COUNTER: AtomicUsize = AtomicUsize::new(0);

    fn scratch_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "lyricsync-files-{}-{}",
            std::process::id(),
            DIR_COUNTER.fetch_add(1, Ordering::SeqCst)
        ));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).ok();
        dir
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(LyricFormat::from_path(Path::new("a.lrc")), LyricFormat::Lrc);
        assert_eq!(LyricFormat::from_path(Path::new("a.ASS")), LyricFormat::Ass);
        assert_eq!(LyricFormat::from_path(Path::new("a.ssa")), LyricFormat::Ass);
        assert_eq!(LyricFormat::from_path(Path::new("a")), LyricFormat::Lrc);
    }

    #[tokio::test]
    async fn test_find_prefers_lrc_over_ass() {
        let dir = scratch_dir();
        let track = dir.join("song.flac");
        std::fs::write(dir.join("song.ass"), "x").ok();
        std::fs::write(dir.join("song.lrc"), "x").ok();

        let lookup = FsFileLookup::default();
        assert_eq!(lookup.find_lyric_file(&track).await, Some(dir.join("song.lrc")));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_find_falls_back_to_ass() {
        let dir = scratch_dir();
        let track = dir.join("song.mp3");
        std::fs::write(dir.join("song.ass"), "x").ok();

        let lookup = FsFileLookup::default();
        assert_eq!(lookup.find_lyric_file(&track).await, Some(dir.join("song.ass")));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_find_returns_none_without_sibling() {
        let dir = scratch_dir();
        let lookup = FsFileLookup::default();
        assert_eq!(lookup.find_lyric_file(&dir.join("song.mp3")).await, None);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_write_then_read_roundtrip() {
        let dir = scratch_dir();
        let path = dir.join("song.lrc");
        let lookup = FsFileLookup::default();

        lookup
            .write_file(&path, "[00:01.00]你好")
            .await
            .unwrap_or_else(|e| panic!("write failed: {e}"));
        let text = lookup
            .read_file(&path)
            .await
            .unwrap_or_else(|e| panic!("read failed: {e}"));
        assert_eq!(text, "[00:01.00]你好");
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_write_never_replaces_existing_file() {
        let dir = scratch_dir();
        let path = dir.join("song.lrc");
        std::fs::write(&path, "Plain unsynced lyrics").ok();

        let result = FsFileLookup::default()
            .write_file(&path, "[00:01.00]online")
            .await;
        assert!(matches!(result, Err(CoreError::WritebackFailed { .. })));
        assert_eq!(
            std::fs::read_to_string(&path).ok().as_deref(),
            Some("Plain unsynced lyrics")
        );
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_write_into_missing_directory_fails() {
        let dir = scratch_dir();
        let path = dir.join("missing").join("song.lrc");
        let result = FsFileLookup::default().write_file(&path, "x").await;
        assert!(matches!(result, Err(CoreError::WritebackFailed { .. })));
        let _ = std::fs::remove_dir_all(&dir);
    }
}
