use async_trait::async_trait;
use lyricsync_core::{CoreError, FetchedLyrics, LyricsProvider, LyricsQuery};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, REFERER};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

const LOG_TARGET: &str = "lyricsync::provider::netease";

const NETEASE_API_URL: &str = "https://music.163.com/api";

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Default timeout for HTTP requests (10 seconds)
const DEFAULT_TIMEOUT_SECS: u64 = 10;
/// Default number of retry attempts
const DEFAULT_MAX_RETRIES: u32 = 3;
/// Number of search candidates considered
const SEARCH_LIMIT: u32 = 10;
/// Candidates within this distance of the track duration are preferred
const DURATION_WINDOW_MS: u64 = 3_000;
/// Success code in NetEase response bodies
const API_OK: i32 = 200;

/// NetEase Cloud Music lyrics provider.
///
/// Returns the original LRC plus the translated and romanized LRC texts when
/// the song has them.
pub struct NeteaseProvider {
    client: ClientWithMiddleware,
    base_url: String,
}

impl NeteaseProvider {
    /// Create a new NetEase provider with default 10-second timeout and 3 retries.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new() -> Result<Self, CoreError> {
        Self::with_base_url(NETEASE_API_URL)
    }

    /// Create a provider against another API base URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, CoreError> {
        let base_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(5))
            .user_agent(BROWSER_USER_AGENT)
            .default_headers(browser_headers())
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

/// The web API rejects requests that do not look like they come from its site
fn browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("zh-CN,zh;q=0.9"));
    headers.insert(REFERER, HeaderValue::from_static("https://music.163.com/"));
    headers
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    code: i32,
    result: Option<SearchResult>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    #[serde(default)]
    songs: Vec<Song>,
}

#[derive(Debug, Deserialize)]
struct Song {
    id: i64,
    #[serde(default)]
    name: String,
    #[serde(default)]
    ar: Vec<Named>,
    al: Option<Named>,
    /// Duration in milliseconds
    #[serde(default)]
    dt: u64,
}

#[derive(Debug, Default, Deserialize)]
struct Named {
    #[serde(default)]
    name: String,
}

impl Song {
    fn artists(&self) -> String {
        self.ar
            .iter()
            .map(|a| a.name.as_str())
            .collect::<Vec<_>>()
            .join("/")
    }
}

#[derive(Debug, Deserialize)]
struct LyricResponse {
    code: i32,
    lrc: Option<LyricBody>,
    tlyric: Option<LyricBody>,
    romalrc: Option<LyricBody>,
}

#[derive(Debug, Deserialize)]
struct LyricBody {
    lyric: Option<String>,
}

fn body_text(body: Option<LyricBody>) -> Option<String> {
    body.and_then(|b| b.lyric).filter(|text| !text.trim().is_empty())
}

impl LyricResponse {
    /// `None` when the song has no original lyrics
    fn into_fetched(self, song_id: i64) -> Option<FetchedLyrics> {
        let primary_text = body_text(self.lrc)?;
        Some(FetchedLyrics {
            primary_text,
            translation_text: body_text(self.tlyric),
            romanization_text: body_text(self.romalrc),
            provider_id: song_id.to_string(),
        })
    }
}

/// Pick the candidate closest in duration, if one falls inside the window;
/// otherwise the search engine's first hit.
fn pick_candidate(songs: &[Song], duration_ms: Option<u64>) -> Option<&Song> {
    let first = songs.first()?;
    let Some(expected) = duration_ms else {
        return Some(first);
    };

    songs
        .iter()
        .filter(|s| s.dt > 0)
        .map(|s| (s.dt.abs_diff(expected), s))
        .filter(|(diff, _)| *diff <= DURATION_WINDOW_MS)
        .min_by_key(|(diff, _)| *diff)
        .map(|(_, s)| s)
        .or(Some(first))
}

fn search_keyword(query: &LyricsQuery) -> String {
    format!("{} {}", query.title.trim(), query.artist.trim())
        .trim()
        .to_string()
}

#[async_trait]
impl LyricsProvider for NeteaseProvider {
    fn name(&self) -> &'static str {
        "netease"
    }

    async fn search(&self, query: &LyricsQuery) -> Result<Option<FetchedLyrics>, CoreError> {
        info!(
            target: LOG_TARGET,
            "Fetching lyrics from NetEase for: {} - {} (duration: {:?}ms)",
            query.artist, query.title, query.duration_ms
        );

        let songs = self.search_songs(&search_keyword(query)).await?;
        let Some(song) = pick_candidate(&songs, query.duration_ms) else {
            info!(target: LOG_TARGET, "NetEase search returned no songs");
            return Ok(None);
        };

        info!(
            target: LOG_TARGET,
            "NetEase picked song {} ({} - {}, album: {}, {}ms)",
            song.id,
            song.artists(),
            song.name,
            song.al.as_ref().map_or("", |a| a.name.as_str()),
            song.dt
        );

        let lyrics = self.fetch_lyrics(song.id).await?;
        if lyrics.is_none() {
            info!(target: LOG_TARGET, "NetEase song {} has no lyrics", song.id);
        }
        Ok(lyrics)
    }
}

impl NeteaseProvider {
    async fn search_songs(&self, keyword: &str) -> Result<Vec<Song>, CoreError> {
        let url = format!("{}/cloudsearch/pc", self.base_url);
        let limit = SEARCH_LIMIT.to_string();
        let params = [
            ("s", keyword),
            ("type", "1"),
            ("limit", limit.as_str()),
            ("offset", "0"),
        ];

        debug!(target: LOG_TARGET, "NetEase POST (search): {} s={}", url, keyword);
        let response = self.client.post(&url).form(&params).send().await?;
        if !response.status().is_success() {
            return Err(self.failure(format!("NetEase search returned status: {}", response.status())));
        }

        let data: SearchResponse = response.json().await?;
        if data.code != API_OK {
            return Err(self.failure(format!("NetEase search API error: code {}", data.code)));
        }

        let songs = data.result.map(|r| r.songs).unwrap_or_default();
        debug!(target: LOG_TARGET, "NetEase search returned {} songs", songs.len());
        Ok(songs)
    }

    async fn fetch_lyrics(&self, song_id: i64) -> Result<Option<FetchedLyrics>, CoreError> {
        let url = format!(
            "{}/song/lyric?id={song_id}&lv=-1&tv=-1&rv=-1&kv=-1",
            self.base_url
        );

        debug!(target: LOG_TARGET, "NetEase GET (lyric): {}", url);
        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(self.failure(format!("NetEase lyric returned status: {}", response.status())));
        }

        let data: LyricResponse = response.json().await?;
        if data.code != API_OK {
            return Err(self.failure(format!("NetEase lyric API error: code {}", data.code)));
        }

        Ok(data.into_fetched(song_id))
    }
}
