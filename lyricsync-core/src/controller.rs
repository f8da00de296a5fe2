use crate::config::SyncConfig;
use crate::lyrics::{LyricLine, LyricSet, ResolvedLyrics};
use crate::playback::TrackInfo;
use crate::resolver::LyricsResolver;
use crate::sync::SyncTracker;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info};

const LOG_TARGET: &str = "lyricsync::controller";

/// Events emitted by the lyrics controller
#[derive(Debug, Clone)]
pub enum LyricsEvent {
    /// A new track became current; previous lyrics are cleared
    TrackChanged { track: TrackInfo },
    /// Lyrics were resolved for the current track
    LyricsLoaded {
        track: TrackInfo,
        lyrics: Arc<ResolvedLyrics>,
    },
    /// No lyrics found for the current track
    LyricsNotFound { track: TrackInfo },
    /// The active line changed (`None` = before the first line)
    ActiveLineChanged { index: Option<usize> },
    /// Recoverable error worth showing to the user
    Error { message: String },
}

struct ControllerInner {
    current: Option<TrackInfo>,
    lyrics: Option<Arc<ResolvedLyrics>>,
    tracker: SyncTracker,
}

/// Entry points driven by the player: track changes and playback time.
pub struct LyricsController {
    resolver: LyricsResolver,
    inner: RwLock<ControllerInner>,
    event_tx: broadcast::Sender<LyricsEvent>,
}

impl LyricsController {
    /// Create a new controller
    #[must_use]
    pub fn new(resolver: LyricsResolver, sync: &SyncConfig) -> Arc<Self> {
        let (event_tx, _) = broadcast::channel(64);

        Arc::new(Self {
            resolver,
            inner: RwLock::new(ControllerInner {
                current: None,
                lyrics: None,
                tracker: SyncTracker::from_config(sync),
            }),
            event_tx,
        })
    }

    /// Subscribe to lyrics events
    pub fn subscribe(&self) -> broadcast::Receiver<LyricsEvent> {
        self.event_tx.subscribe()
    }

    #[must_use]
    pub const fn resolver(&self) -> &LyricsResolver {
        &self.resolver
    }

    /// Make `track` current and resolve its lyrics.
    ///
    /// Returns `None` if another track became current while resolving; that
    /// result is dropped without touching state.
    pub async fn on_track_changed(&self, track: TrackInfo) -> Option<Arc<ResolvedLyrics>> {
        {
            let mut inner = self.inner.write().await;
            inner.current = Some(track.clone());
            inner.lyrics = None;
            inner.tracker.set_lines(Arc::new(LyricSet::empty()));
        }
        info!(
            target: LOG_TARGET,
            "Track changed: {} - {} ({:?})",
            track.artist,
            track.title,
            track.path
        );
        let _ = self.event_tx.send(LyricsEvent::TrackChanged {
            track: track.clone(),
        });

        let resolved = self.resolver.resolve(&track).await;

        {
            let mut inner = self.inner.write().await;
            let still_current = inner
                .current
                .as_ref()
                .is_some_and(|current| current.path == track.path);
            if !still_current {
                debug!(
                    target: LOG_TARGET,
                    "Dropping stale lyrics for {:?}", track.path
                );
                return None;
            }
            inner.lyrics = Some(Arc::clone(&resolved));
            inner.tracker.set_lines(Arc::clone(&resolved.lines));
        }

        if resolved.is_found() {
            let _ = self.event_tx.send(LyricsEvent::LyricsLoaded {
                track,
                lyrics: Arc::clone(&resolved),
            });
        } else {
            if let Some(message) = &resolved.error {
                let _ = self.event_tx.send(LyricsEvent::Error {
                    message: message.clone(),
                });
            }
            let _ = self.event_tx.send(LyricsEvent::LyricsNotFound { track });
        }

        Some(resolved)
    }

    /// Forget the current track (playback stopped)
    pub async fn clear_track(&self) {
        let mut inner = self.inner.write().await;
        inner.current = None;
        inner.lyrics = None;
        inner.tracker.set_lines(Arc::new(LyricSet::empty()));
    }

    /// Feed the player's position in seconds (throttled)
    pub async fn on_playback_time(&self, seconds: f64) -> Option<Option<usize>> {
        self.on_playback_time_at(seconds, Instant::now()).await
    }

    /// Feed a position observed at `now` (throttled)
    pub async fn on_playback_time_at(&self, seconds: f64, now: Instant) -> Option<Option<usize>> {
        let changed = self.inner.write().await.tracker.update(seconds, now);
        self.emit_active(changed)
    }

    /// Feed a position bypassing the throttle (pause, seek, stop)
    pub async fn flush_playback_time(&self, seconds: f64) -> Option<Option<usize>> {
        let changed = self
            .inner
            .write()
            .await
            .tracker
            .flush(seconds, Instant::now());
        self.emit_active(changed)
    }

    /// Set the signed user offset in seconds (positive = lyrics earlier)
    pub async fn set_user_offset(&self, offset: f64) {
        self.inner.write().await.tracker.set_user_offset(offset);
    }

    fn emit_active(&self, changed: Option<Option<usize>>) -> Option<Option<usize>> {
        if let Some(index) = changed {
            let _ = self.event_tx.send(LyricsEvent::ActiveLineChanged { index });
        }
        changed
    }

    /// Get current track info
    pub async fn current_track(&self) -> Option<TrackInfo> {
        self.inner.read().await.current.clone()
    }

    /// Get current lyrics
    pub async fn lyrics(&self) -> Option<Arc<ResolvedLyrics>> {
        self.inner.read().await.lyrics.clone()
    }

    pub async fn active_index(&self) -> Option<usize> {
        self.inner.read().await.tracker.active_index()
    }

    /// The active line of the current lyrics
    pub async fn active_line(&self) -> Option<LyricLine> {
        let inner = self.inner.read().await;
        let index = inner.tracker.active_index()?;
        inner.tracker.lines().get(index).cloned()
    }
}
