//! Resolution pipeline: cache, sibling lyric file, online providers,
//! optional writeback.

use crate::ass::{parse_ass, AssOptions};
use crate::bilingual::merge_sets;
use crate::cache::LyricsCache;
use crate::config::LyricSyncConfig;
use crate::files::{FileLookup, LyricFormat};
use crate::lrc::parse_lrc_chunked;
use crate::lyrics::{LyricSet, LyricSource, ResolvedLyrics};
use crate::paths::writeback_path;
use crate::playback::TrackInfo;
use crate::provider::{FetchedLyrics, LyricsProvider};
use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

const LOG_TARGET: &str = "lyricsync::resolver";

type SharedResolution = Shared<BoxFuture<'static, Arc<ResolvedLyrics>>>;

/// Behaviour switches for [`LyricsResolver`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverOptions {
    pub enable_online_fetch: bool,
    pub auto_save_online_lyrics: bool,
    pub prefer_translation: bool,
    pub include_romanization: bool,
    pub cache_capacity: usize,
    pub ass: AssOptions,
    pub chunk_lines: usize,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self::from_config(&LyricSyncConfig::default())
    }
}

impl ResolverOptions {
    #[must_use]
    pub fn from_config(config: &LyricSyncConfig) -> Self {
        Self {
            enable_online_fetch: config.lyrics.enable_online_fetch,
            auto_save_online_lyrics: config.lyrics.auto_save_online_lyrics,
            prefer_translation: config.lyrics.prefer_translation,
            include_romanization: config.lyrics.include_romanization,
            cache_capacity: config.lyrics.cache_capacity,
            ass: config.parser.ass_options(),
            chunk_lines: config.parser.chunk_lines.max(1),
        }
    }
}

/// Where a track stands in the resolver
#[derive(Debug, Clone, PartialEq)]
pub enum ResolutionState {
    /// Nothing known; the next request runs the full pipeline
    Idle,
    /// A resolution is running; new requests join it
    InProgress,
    /// An online result is cached
    Resolved(Arc<ResolvedLyrics>),
}

/// A running resolution; `generation` tells apart successive runs for one key
struct InFlight {
    generation: u64,
    resolution: SharedResolution,
}

/// Outcome of the sibling file lookup
enum LocalLookup {
    Missing,
    /// A sibling file exists but could not be read or has no timed lines
    Unusable(PathBuf),
    Loaded(ResolvedLyrics),
}

struct ResolverInner {
    files: Arc<dyn FileLookup>,
    providers: Vec<Arc<dyn LyricsProvider>>,
    options: ResolverOptions,
    cache: Mutex<LyricsCache>,
    in_flight: Mutex<HashMap<String, InFlight>>,
    next_generation: AtomicU64,
}

/// Resolves lyrics for tracks.
///
/// Cheap to clone; clones share the cache and the in-progress registry.
/// Create one per application and pass it to whoever needs it.
#[derive(Clone)]
pub struct LyricsResolver {
    inner: Arc<ResolverInner>,
}

impl LyricsResolver {
    /// Create a resolver
    ///
    /// # Arguments
    /// * `files` - Sibling lyric file lookup and writeback
    /// * `providers` - Online providers to try in order
    /// * `options` - Pipeline switches
    #[must_use]
    pub fn new(
        files: Arc<dyn FileLookup>,
        providers: Vec<Arc<dyn LyricsProvider>>,
        options: ResolverOptions,
    ) -> Self {
        let cache = LyricsCache::new(options.cache_capacity);
        Self {
            inner: Arc::new(ResolverInner {
                files,
                providers,
                options,
                cache: Mutex::new(cache),
                in_flight: Mutex::new(HashMap::new()),
                next_generation: AtomicU64::new(0),
            }),
        }
    }

    #[must_use]
    pub fn options(&self) -> &ResolverOptions {
        &self.inner.options
    }

    /// Provider names in priority order
    #[must_use]
    pub fn provider_names(&self) -> Vec<&'static str> {
        self.inner.providers.iter().map(|p| p.name()).collect()
    }

    /// Resolve lyrics for a track.
    ///
    /// A request for a track that is already being resolved awaits that
    /// resolution instead of starting another. The work runs on its own task,
    /// so dropping the returned future does not abort it.
    pub async fn resolve(&self, track: &TrackInfo) -> Arc<ResolvedLyrics> {
        let key = track.key();

        let resolution = {
            let mut in_flight = self.inner.in_flight.lock().await;
            if let Some(existing) = in_flight.get(&key) {
                debug!(target: LOG_TARGET, "Joining in-progress resolution for {}", key);
                existing.resolution.clone()
            } else {
                let generation = self.inner.next_generation.fetch_add(1, Ordering::Relaxed);
                let resolution = self.spawn_resolution(key.clone(), generation, track.clone());
                in_flight.insert(
                    key.clone(),
                    InFlight {
                        generation,
                        resolution: resolution.clone(),
                    },
                );
                resolution
            }
        };

        resolution.await
    }

    fn spawn_resolution(&self, key: String, generation: u64, track: TrackInfo) -> SharedResolution {
        let worker = self.clone();
        let worker_key = key.clone();
        let handle = tokio::spawn(async move {
            let result = worker.run_pipeline(&worker_key, &track).await;
            worker.forget(&worker_key, generation).await;
            result
        });

        let registry = self.clone();
        async move {
            match handle.await {
                Ok(result) => result,
                Err(e) => {
                    error!(target: LOG_TARGET, "Resolution task for {} failed: {}", key, e);
                    registry.forget(&key, generation).await;
                    Arc::new(ResolvedLyrics {
                        error: Some(format!("Resolution failed: {e}")),
                        ..ResolvedLyrics::not_found()
                    })
                }
            }
        }
        .boxed()
        .shared()
    }

    /// Current state of a track in the registry and cache
    pub async fn state(&self, track: &TrackInfo) -> ResolutionState {
        let key = track.key();
        if self.inner.in_flight.lock().await.contains_key(&key) {
            return ResolutionState::InProgress;
        }
        match self.inner.cache.lock().await.peek(&key) {
            Some(resolved) => ResolutionState::Resolved(resolved),
            None => ResolutionState::Idle,
        }
    }

    /// Remove the registry entry for `key` only if it still belongs to `generation`
    async fn forget(&self, key: &str, generation: u64) {
        let mut in_flight = self.inner.in_flight.lock().await;
        if in_flight
            .get(key)
            .is_some_and(|entry| entry.generation == generation)
        {
            in_flight.remove(key);
        }
    }

    async fn run_pipeline(&self, key: &str, track: &TrackInfo) -> Arc<ResolvedLyrics> {
        if let Some(hit) = self.inner.cache.lock().await.get(key) {
            info!(
                target: LOG_TARGET,
                "Using cached lyrics for {} ({} lines, source: {})",
                key,
                hit.lines.len(),
                hit.source
            );
            return hit;
        }

        let existing = match self.resolve_local(track).await {
            LocalLookup::Loaded(local) => return Arc::new(local),
            LocalLookup::Unusable(path) => Some(path),
            LocalLookup::Missing => None,
        };

        if !self.inner.options.enable_online_fetch {
            debug!(target: LOG_TARGET, "Online fetch disabled; no lyrics for {}", key);
            return Arc::new(ResolvedLyrics::not_found());
        }

        let (fetched, last_error) = self.fetch_online(track).await;
        let Some(fetched) = fetched else {
            info!(
                target: LOG_TARGET,
                "No lyrics found for {} - {} (tried providers: {:?})",
                track.artist,
                track.title,
                self.provider_names()
            );
            return Arc::new(ResolvedLyrics {
                error: last_error,
                ..ResolvedLyrics::not_found()
            });
        };

        let fetched = Arc::new(fetched);
        self.inner
            .cache
            .lock()
            .await
            .insert(key.to_string(), Arc::clone(&fetched));

        if self.inner.options.auto_save_online_lyrics {
            self.write_back(key, track, fetched, existing.as_deref()).await
        } else {
            fetched
        }
    }

    async fn resolve_local(&self, track: &TrackInfo) -> LocalLookup {
        let Some(path) = self.inner.files.find_lyric_file(&track.path).await else {
            return LocalLookup::Missing;
        };

        let text = match self.inner.files.read_file(&path).await {
            Ok(text) => text,
            Err(e) => {
                warn!(target: LOG_TARGET, "Failed to read lyric file {:?}: {}", path, e);
                return LocalLookup::Unusable(path);
            }
        };

        let lines = match LyricFormat::from_path(&path) {
            LyricFormat::Lrc => parse_lrc_chunked(&text, self.inner.options.chunk_lines).await,
            LyricFormat::Ass => parse_ass(&text, &self.inner.options.ass),
        };

        if lines.is_empty() {
            info!(
                target: LOG_TARGET,
                "Lyric file {:?} has no timed lines, trying online providers", path
            );
            return LocalLookup::Unusable(path);
        }

        info!(
            target: LOG_TARGET,
            "Loaded local lyrics {:?} ({} lines)",
            path,
            lines.len()
        );
        LocalLookup::Loaded(ResolvedLyrics {
            lines: Arc::new(lines),
            source: LyricSource::Local,
            raw_text: text,
            provider: None,
            error: None,
        })
    }

    /// Try providers in order. Returns the first usable result, or the last
    /// provider error if none had lyrics.
    async fn fetch_online(&self, track: &TrackInfo) -> (Option<ResolvedLyrics>, Option<String>) {
        let query = track.to_query();
        let mut last_error = None;

        for provider in &self.inner.providers {
            info!(target: LOG_TARGET, "Trying provider: {}", provider.name());
            match provider.search(&query).await {
                Ok(Some(fetched)) if fetched.has_primary() => {
                    let resolved = self.build_online(provider.name(), &fetched).await;
                    if resolved.lines.is_empty() {
                        info!(
                            target: LOG_TARGET,
                            "Provider {} returned lyrics without timestamps",
                            provider.name()
                        );
                        continue;
                    }
                    info!(
                        target: LOG_TARGET,
                        "Found lyrics from {} ({} lines, provider_id: {})",
                        provider.name(),
                        resolved.lines.len(),
                        fetched.provider_id
                    );
                    return (Some(resolved), None);
                }
                Ok(_) => {
                    info!(target: LOG_TARGET, "Provider {} returned no lyrics", provider.name());
                }
                Err(e) => {
                    warn!(target: LOG_TARGET, "Provider {} failed with error: {}", provider.name(), e);
                    last_error = Some(e.to_string());
                }
            }
        }

        (None, last_error)
    }

    async fn build_online(&self, provider: &str, fetched: &FetchedLyrics) -> ResolvedLyrics {
        let options = &self.inner.options;
        let primary = parse_lrc_chunked(&fetched.primary_text, options.chunk_lines).await;

        let mut extras: Vec<LyricSet> = Vec::new();
        if options.prefer_translation {
            if let Some(text) = fetched.translation() {
                extras.push(parse_lrc_chunked(text, options.chunk_lines).await);
            }
        }
        if options.include_romanization {
            if let Some(text) = fetched.romanization() {
                extras.push(parse_lrc_chunked(text, options.chunk_lines).await);
            }
        }

        let (lines, raw_text) = if extras.is_empty() {
            (primary, fetched.primary_text.clone())
        } else {
            let merged = merge_sets(primary, &extras);
            let raw_text = merged.to_lrc();
            (merged, raw_text)
        };

        ResolvedLyrics {
            lines: Arc::new(lines),
            source: LyricSource::Online,
            raw_text,
            provider: Some(provider.to_string()),
            error: None,
        }
    }

    /// Save fetched text next to the track. On success the result is reported
    /// as local and its cache entry is dropped; on failure both are kept.
    ///
    /// An existing file at the target is never replaced, even when it held no
    /// usable lyrics.
    async fn write_back(
        &self,
        key: &str,
        track: &TrackInfo,
        fetched: Arc<ResolvedLyrics>,
        existing: Option<&Path>,
    ) -> Arc<ResolvedLyrics> {
        let path = writeback_path(&track.path);
        if existing == Some(path.as_path()) {
            info!(
                target: LOG_TARGET,
                "Keeping existing lyric file {:?}; online lyrics stay in memory", path
            );
            return fetched;
        }
        match self.inner.files.write_file(&path, &fetched.raw_text).await {
            Ok(()) => {
                info!(target: LOG_TARGET, "Saved online lyrics to {:?}", path);
                self.inner.cache.lock().await.remove(key);
                Arc::new(ResolvedLyrics {
                    source: LyricSource::Local,
                    ..(*fetched).clone()
                })
            }
            Err(e) => {
                warn!(target: LOG_TARGET, "Failed to save lyrics for {}: {}", key, e);
                fetched
            }
        }
    }
}
