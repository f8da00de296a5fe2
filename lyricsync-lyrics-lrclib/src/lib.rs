use async_trait::async_trait;
use lyricsync_core::{CoreError, FetchedLyrics, LyricsProvider, LyricsQuery};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use serde::Deserialize;
use std::fmt::Write;
use std::time::Duration;
use tracing::{debug, info, warn};

const LOG_TARGET: &str = "lyricsync::provider::lrclib";

const LRCLIB_API_URL: &str = "https://lrclib.net/api";

/// Default timeout for HTTP requests (10 seconds)
const DEFAULT_TIMEOUT_SECS: u64 = 10;
/// Default number of retry attempts
const DEFAULT_MAX_RETRIES: u32 = 3;
/// Duration tolerance for track-name search matches (±2 seconds)
const DURATION_TOLERANCE_SECS: f64 = 2.0;

/// Distance between a candidate's duration and the query's, for ranking.
/// Lower is better; unknown durations rank in the middle.
fn duration_score(actual: Option<f64>, expected: Option<f64>, scale: f64) -> i32 {
    match (actual, expected) {
        (Some(d), Some(q)) => {
            let diff = (d - q).abs() * scale;
            #[allow(clippy::cast_possible_truncation)]
            if diff > f64::from(i32::MAX) {
                i32::MAX
            } else {
                diff as i32
            }
        }
        _ => 50,
    }
}

/// LRCLIB.net lyrics provider.
///
/// Only time-synced lyrics are returned; plain-text results count as "no
/// lyrics" because they cannot be tracked against playback.
pub struct LrclibProvider {
    client: ClientWithMiddleware,
    base_url: String,
}

impl LrclibProvider {
    /// Create a new LRCLIB provider with default 10-second timeout and 3 retries.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new() -> Result<Self, CoreError> {
        Self::with_base_url(LRCLIB_API_URL)
    }

    /// Create a provider talking to another LRCLIB-compatible server.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, CoreError> {
        let base_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(5))
            .user_agent(concat!("lyricsync/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let retry_policy =
            ExponentialBackoff::builder().build_with_max_retries(DEFAULT_MAX_RETRIES);
        let client = ClientBuilder::new(base_client)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn failure(&self, reason: String) -> CoreError {
        CoreError::LyricsProviderFailed {
            provider: self.name().to_string(),
            reason,
        }
    }
}

/// Record returned by LRCLIB's `/get` and `/search` endpoints.
/// Unused fields (trackName, albumName, plainLyrics) are ignored.
#[derive(Debug, Deserialize)]
struct LrclibRecord {
    id: i64,
    #[serde(rename = "artistName", default)]
    artist_name: String,
    duration: Option<f64>,
    #[serde(default)]
    instrumental: bool,
    #[serde(rename = "syncedLyrics")]
    synced_lyrics: Option<String>,
}

impl LrclibRecord {
    fn has_synced(&self) -> bool {
        !self.instrumental
            && self
                .synced_lyrics
                .as_deref()
                .is_some_and(|s| !s.trim().is_empty())
    }

    fn into_fetched(self) -> Option<FetchedLyrics> {
        if self.instrumental {
            debug!(target: LOG_TARGET, "Track is instrumental (lrclib id: {})", self.id);
            return None;
        }
        let synced = self.synced_lyrics.filter(|s| !s.trim().is_empty())?;
        Some(FetchedLyrics::primary(synced, self.id.to_string()))
    }
}

/// Keep records within the duration tolerance of `expected` (all records if
/// the duration is unknown)
fn within_tolerance(records: Vec<LrclibRecord>, expected: Option<f64>) -> Vec<LrclibRecord> {
    match expected {
        Some(expected) => records
            .into_iter()
            .filter(|r| {
                r.duration
                    .is_some_and(|d| (d - expected).abs() <= DURATION_TOLERANCE_SECS)
            })
            .collect(),
        None => records,
    }
}

/// Closest-duration record carrying synced lyrics
fn pick_best(records: Vec<LrclibRecord>, expected: Option<f64>, scale: f64) -> Option<LrclibRecord> {
    records
        .into_iter()
        .filter(LrclibRecord::has_synced)
        .min_by_key(|r| duration_score(r.duration, expected, scale))
}

#[allow(clippy::cast_precision_loss)]
fn expected_secs(query: &LyricsQuery) -> Option<f64> {
    query.duration_ms.map(|ms| ms as f64 / 1000.0)
}

#[async_trait]
impl LyricsProvider for LrclibProvider {
    fn name(&self) -> &'static str {
        "lrclib"
    }

    async fn search(&self, query: &LyricsQuery) -> Result<Option<FetchedLyrics>, CoreError> {
        info!(
            target: LOG_TARGET,
            "Fetching lyrics from LRCLIB for: {} - {} (duration: {:?}ms)",
            query.artist, query.title, query.duration_ms
        );

        if let Some(record) = self.get_exact(query).await? {
            if let Some(fetched) = record.into_fetched() {
                return Ok(Some(fetched));
            }
            info!(target: LOG_TARGET, "LRCLIB exact match has no synced lyrics");
        }

        if let Some(fetched) = self.search_by_track_name(query).await? {
            return Ok(Some(fetched));
        }

        self.search_free_text(query).await
    }
}

impl LrclibProvider {
    /// `/get` with artist, track, album and duration. `None` on 404.
    async fn get_exact(&self, query: &LyricsQuery) -> Result<Option<LrclibRecord>, CoreError> {
        let mut url = format!(
            "{}/get?artist_name={}&track_name={}",
            self.base_url,
            urlencoding::encode(&query.artist),
            urlencoding::encode(&query.title)
        );
        if let Some(album) = &query.album {
            let _ = write!(url, "&album_name={}", urlencoding::encode(album));
        }
        if let Some(duration) = query.duration_secs() {
            let _ = write!(url, "&duration={duration}");
        }

        debug!(target: LOG_TARGET, "LRCLIB GET (exact match): {}", url);
        let response = self.client.get(&url).send().await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            info!(target: LOG_TARGET, "LRCLIB exact match not found");
            return Ok(None);
        }
        if !response.status().is_success() {
            warn!(target: LOG_TARGET, "LRCLIB returned status: {}", response.status());
            return Err(self.failure(format!("LRCLIB returned status: {}", response.status())));
        }

        let record: LrclibRecord = response.json().await?;
        info!(target: LOG_TARGET, "LRCLIB found exact match with id: {}", record.id);
        Ok(Some(record))
    }

    /// `/search` by track name only, keeping candidates within ±2 s
    async fn search_by_track_name(
        &self,
        query: &LyricsQuery,
    ) -> Result<Option<FetchedLyrics>, CoreError> {
        let url = format!(
            "{}/search?track_name={}",
            self.base_url,
            urlencoding::encode(&query.title)
        );
        debug!(target: LOG_TARGET, "LRCLIB GET (search by track): {}", url);

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            warn!(target: LOG_TARGET, "LRCLIB search returned status: {}", response.status());
            return Ok(None);
        }

        let records: Vec<LrclibRecord> = response.json().await?;
        let expected = expected_secs(query);
        let best = pick_best(within_tolerance(records, expected), expected, 10.0);

        Ok(best.and_then(|record| {
            info!(
                target: LOG_TARGET,
                "LRCLIB found match by track name + duration (id: {}, artist: {}, duration: {:?})",
                record.id,
                record.artist_name,
                record.duration
            );
            record.into_fetched()
        }))
    }

    /// `/search?q=<artist> <track>` as the final fallback
    async fn search_free_text(&self, query: &LyricsQuery) -> Result<Option<FetchedLyrics>, CoreError> {
        let search_query = format!("{} {}", query.artist, query.title);
        let url = format!(
            "{}/search?q={}",
            self.base_url,
            urlencoding::encode(&search_query)
        );
        debug!(target: LOG_TARGET, "LRCLIB GET (full search): {}", url);

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(self.failure(format!(
                "LRCLIB search returned status: {}",
                response.status()
            )));
        }

        let records: Vec<LrclibRecord> = response.json().await?;
        match pick_best(records, expected_secs(query), 1.0) {
            Some(record) => {
                info!(
                    target: LOG_TARGET,
                    "LRCLIB found match via full search (id: {}, artist: {})",
                    record.id,
                    record.artist_name
                );
                Ok(record.into_fetched())
            }
            None => {
                info!(
                    target: LOG_TARGET,
                    "LRCLIB has no synced lyrics for {} - {}", query.artist, query.title
                );
                Ok(None)
            }
        }
    }
}
