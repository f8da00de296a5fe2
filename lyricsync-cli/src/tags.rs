//! Track metadata from audio file tags.

use anyhow::{Context, Result};
use lofty::file::{AudioFile, TaggedFileExt};
use lofty::probe::Probe;
use lofty::tag::Accessor;
use lyricsync_core::TrackInfo;
use std::path::Path;
use std::time::Duration;

const LOG_TARGET: &str = "lyricsync::cli::tags";

/// Values given on the command line, winning over tags
#[derive(Debug, Default, Clone)]
pub struct TagOverrides {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub duration: Option<Duration>,
}

/// Read title, artist, album and duration from an audio file
fn read_tags(path: &Path) -> Result<TrackInfo> {
    let tagged_file = Probe::open(path)
        .context("Failed to open audio file")?
        .read()
        .context("Failed to read audio file")?;

    let duration = tagged_file.properties().duration();
    let tag = tagged_file
        .primary_tag()
        .or_else(|| tagged_file.first_tag());

    let mut track = fallback_track(path);
    track.duration = duration;

    if let Some(tag) = tag {
        if let Some(title) = tag.title().filter(|t| !t.trim().is_empty()) {
            track.title = title.trim().to_string();
        }
        if let Some(artist) = tag.artist() {
            track.artist = artist.trim().to_string();
        }
        if let Some(album) = tag.album().filter(|a| !a.trim().is_empty()) {
            track.album = Some(album.trim().to_string());
        }
    }

    Ok(track)
}

/// Track info derived from the file name alone
fn fallback_track(path: &Path) -> TrackInfo {
    let title = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    TrackInfo::new(path, title, "", Duration::ZERO)
}

fn apply_overrides(mut track: TrackInfo, overrides: TagOverrides) -> TrackInfo {
    if let Some(title) = overrides.title {
        track.title = title;
    }
    if let Some(artist) = overrides.artist {
        track.artist = artist;
    }
    if let Some(album) = overrides.album {
        track.album = Some(album);
    }
    if let Some(duration) = overrides.duration {
        track.duration = duration;
    }
    track
}

/// Build the track for `path`; unreadable tags fall back to the file name
pub fn track_for(path: &Path, overrides: TagOverrides) -> TrackInfo {
    let track = match read_tags(path) {
        Ok(track) => track,
        Err(e) => {
            tracing::warn!(target: LOG_TARGET, "Could not read tags from {:?}: {:#}", path, e);
            fallback_track(path)
        }
    };
    apply_overrides(track, overrides)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_uses_file_stem() {
        let track = fallback_track(Path::new("/music/01 - Intro.flac"));
        assert_eq!(track.title, "01 - Intro");
        assert_eq!(track.artist, "");
        assert_eq!(track.duration, Duration::ZERO);
    }

    #[test]
    fn test_overrides_win() {
        let track = apply_overrides(
            fallback_track(Path::new("/music/a.mp3")),
            TagOverrides {
                title: Some("Title".to_string()),
                artist: Some("Artist".to_string()),
                album: None,
                duration: Some(Duration::from_secs(90)),
            },
        );
        assert_eq!(track.title, "Title");
        assert_eq!(track.artist, "Artist");
        assert_eq!(track.album, None);
        assert_eq!(track.duration, Duration::from_secs(90));
    }

    #[test]
    fn test_missing_file_falls_back() {
        let track = track_for(Path::new("/definitely/missing/song.mp3"), TagOverrides::default());
        assert_eq!(track.title, "song");
    }
}
