use crate::paths::track_key;
use crate::provider::LyricsQuery;
use crate::time::DurationExt;
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// Information about the currently playing track
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackInfo {
    /// Audio file path; identity of the track
    pub path: PathBuf,
    /// Track title
    pub title: String,
    /// Artist name(s)
    pub artist: String,
    /// Album name
    pub album: Option<String>,
    /// Track duration
    pub duration: Duration,
}

impl TrackInfo {
    /// Create a new track info
    pub fn new(
        path: impl Into<PathBuf>,
        title: impl Into<String>,
        artist: impl Into<String>,
        duration: Duration,
    ) -> Self {
        Self {
            path: path.into(),
            title: title.into(),
            artist: artist.into(),
            album: None,
            duration,
        }
    }

    #[must_use]
    pub fn with_album(mut self, album: impl Into<String>) -> Self {
        self.album = Some(album.into());
        self
    }

    /// Cache and registry key for this track
    #[must_use]
    pub fn key(&self) -> String {
        track_key(&self.path)
    }

    /// Get duration in milliseconds (for lyrics query)
    #[must_use]
    pub fn duration_ms(&self) -> u64 {
        self.duration.as_millis_u64()
    }

    /// Build the online provider query for this track
    #[must_use]
    pub fn to_query(&self) -> LyricsQuery {
        let mut query = LyricsQuery::new(&self.title, &self.artist);
        if let Some(album) = &self.album {
            query = query.with_album(album);
        }
        if !self.duration.is_zero() {
            query = query.with_duration_ms(self.duration_ms());
        }
        query
    }
}

/// Playback position reported by the player, interpolated between reports
#[derive(Debug, Clone)]
pub struct PlaybackClock {
    /// Whether music is currently playing
    pub is_playing: bool,
    /// Position at the last report
    pub position: Duration,
    /// Total track duration
    pub duration: Duration,
    /// When the position was last reported
    pub updated_at: Instant,
}

impl PlaybackClock {
    #[must_use]
    pub fn new(is_playing: bool, position: Duration, duration: Duration) -> Self {
        Self {
            is_playing,
            position,
            duration,
            updated_at: Instant::now(),
        }
    }

    /// Position at `now`, advanced by elapsed time while playing and clamped
    /// to the track duration
    #[must_use]
    pub fn position_at(&self, now: Instant) -> Duration {
        if !self.is_playing {
            return self.position;
        }

        let interpolated = self.position + now.saturating_duration_since(self.updated_at);
        if self.duration.is_zero() {
            interpolated
        } else {
            interpolated.min(self.duration)
        }
    }

    /// Position in seconds at `now`
    #[must_use]
    pub fn seconds_at(&self, now: Instant) -> f64 {
        self.position_at(now).as_secs_f64()
    }

    /// Whether playback ran past the end of the track
    #[must_use]
    pub fn finished_at(&self, now: Instant) -> bool {
        !self.duration.is_zero() && self.position_at(now) >= self.duration
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_track_info_query() {
        let track = TrackInfo::new(
            "/music/song.flac",
            "Song",
            "Artist",
            Duration::from_millis(183_400),
        )
        .with_album("Album");

        let query = track.to_query();
        assert_eq!(query.title, "Song");
        assert_eq!(query.artist, "Artist");
        assert_eq!(query.album.as_deref(), Some("Album"));
        assert_eq!(query.duration_ms, Some(183_400));
        assert_eq!(track.key(), "/music/song.flac");
    }

    #[test]
    fn test_unknown_duration_is_not_queried() {
        let track = TrackInfo::new("/music/a.mp3", "A", "B", Duration::ZERO);
        assert_eq!(track.to_query().duration_ms, None);
    }

    #[test]
    fn test_paused_clock_does_not_advance() {
        let start = Instant::now();
        let clock = PlaybackClock {
            is_playing: false,
            position: Duration::from_secs(30),
            duration: Duration::from_secs(180),
            updated_at: start,
        };
        assert_eq!(clock.position_at(start + Duration::from_secs(5)), Duration::from_secs(30));
    }

    #[test]
    fn test_playing_clock_interpolates_and_clamps() {
        let start = Instant::now();
        let clock = PlaybackClock {
            is_playing: true,
            position: Duration::from_secs(178),
            duration: Duration::from_secs(180),
            updated_at: start,
        };
        assert_eq!(clock.position_at(start + Duration::from_secs(1)), Duration::from_secs(179));
        assert_eq!(clock.position_at(start + Duration::from_secs(10)), Duration::from_secs(180));
        assert!(clock.finished_at(start + Duration::from_secs(10)));
    }

    #[test]
    fn test_unknown_duration_is_not_clamped() {
        let clock = PlaybackClock::new(true, Duration::from_secs(20), Duration::ZERO);
        let later = clock.updated_at + Duration::from_millis(500);
        assert!((clock.seconds_at(later) - 20.5).abs() < 1e-9);
        assert!(!clock.finished_at(later + Duration::from_secs(3600)));
    }
}
