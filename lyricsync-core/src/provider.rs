use crate::error::CoreError;
use crate::time::DurationExt;
use async_trait::async_trait;
use std::time::Duration;

/// Query parameters for fetching lyrics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LyricsQuery {
    /// Track title
    pub title: String,
    /// Artist name
    pub artist: String,
    /// Album name (optional)
    pub album: Option<String>,
    /// Track duration in milliseconds (for matching)
    pub duration_ms: Option<u64>,
}

impl LyricsQuery {
    /// Create a new lyrics query
    pub fn new(title: impl Into<String>, artist: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            artist: artist.into(),
            album: None,
            duration_ms: None,
        }
    }

    /// Set album name
    #[must_use]
    pub fn with_album(mut self, album: impl Into<String>) -> Self {
        self.album = Some(album.into());
        self
    }

    /// Set duration in milliseconds
    #[must_use]
    pub const fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    /// Duration as whole seconds, for providers that match on seconds
    #[must_use]
    pub fn duration_secs(&self) -> Option<u32> {
        self.duration_ms
            .map(|ms| Duration::from_millis(ms).as_secs_u32())
    }
}

/// Raw lyric texts returned by a provider
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchedLyrics {
    /// Primary-language LRC text
    pub primary_text: String,
    /// Translation LRC text sharing the primary's timing
    pub translation_text: Option<String>,
    /// Romanization LRC text sharing the primary's timing
    pub romanization_text: Option<String>,
    /// Provider-specific ID (e.g., LRCLIB's numeric ID as string)
    pub provider_id: String,
}

impl FetchedLyrics {
    /// Create a result carrying only a primary text
    pub fn primary(text: impl Into<String>, provider_id: impl Into<String>) -> Self {
        Self {
            primary_text: text.into(),
            provider_id: provider_id.into(),
            ..Self::default()
        }
    }

    /// Whether there is any primary text to parse
    #[must_use]
    pub fn has_primary(&self) -> bool {
        !self.primary_text.trim().is_empty()
    }

    /// Translation text if it is non-blank
    #[must_use]
    pub fn translation(&self) -> Option<&str> {
        non_blank(self.translation_text.as_deref())
    }

    /// Romanization text if it is non-blank
    #[must_use]
    pub fn romanization(&self) -> Option<&str> {
        non_blank(self.romanization_text.as_deref())
    }
}

fn non_blank(text: Option<&str>) -> Option<&str> {
    text.filter(|t| !t.trim().is_empty())
}

/// Trait for online lyrics providers
///
/// `Ok(None)` means the provider has no lyrics for the track; it is not an
/// error. Timeouts and bad responses are reported as `Err`.
#[async_trait]
pub trait LyricsProvider: Send + Sync {
    /// Get the provider name
    fn name(&self) -> &'static str;

    /// Search lyrics for a query
    async fn search(&self, query: &LyricsQuery) -> Result<Option<FetchedLyrics>, CoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_builder() {
        let query = LyricsQuery::new("Song", "Artist")
            .with_album("Album")
            .with_duration_ms(215_500);
        assert_eq!(query.album.as_deref(), Some("Album"));
        assert_eq!(query.duration_ms, Some(215_500));
        assert_eq!(query.duration_secs(), Some(215));
    }

    #[test]
    fn test_blank_texts_are_absent() {
        let fetched = FetchedLyrics {
            primary_text: "  \n".to_string(),
            translation_text: Some(String::new()),
            romanization_text: Some("[00:01.00]a".to_string()),
            provider_id: "1".to_string(),
        };
        assert!(!fetched.has_primary());
        assert_eq!(fetched.translation(), None);
        assert_eq!(fetched.romanization(), Some("[00:01.00]a"));
    }
}
