pub mod ass;
pub mod bilingual;
pub mod cache;
pub mod config;
pub mod controller;
pub mod encoding;
pub mod error;
pub mod files;
pub mod karaoke;
pub mod lrc;
pub mod lyrics;
pub mod paths;
pub mod playback;
pub mod provider;
pub mod resolver;
pub mod sync;
pub mod time;

pub use ass::{parse_ass, AssOptions, AssStylePolicy};
pub use bilingual::{merge_bilingual, merge_sets};
pub use cache::LyricsCache;
pub use config::{LyricSyncConfig, LyricsConfig, LyricsProviderType, ParserConfig, SyncConfig};

pub use controller::{LyricsController, LyricsEvent};
pub use error::CoreError;
pub use files::{FileLookup, FsFileLookup, LyricFormat};
pub use karaoke::KaraokeScale;
pub use lrc::{parse_lrc, parse_lrc_chunked, LrcDocument, LrcMetadata};
pub use lyrics::{
    Karaoke, KaraokeTiming, KaraokeWord, LyricLine, LyricSet, LyricSource, ResolvedLyrics,
};
pub use paths::{config_dir, config_path, writeback_path, CONFIG_DIR_NAME, CONFIG_FILE_NAME};
pub use playback::{PlaybackClock, TrackInfo};
pub use provider::{FetchedLyrics, LyricsProvider, LyricsQuery};
pub use resolver::{LyricsResolver, ResolutionState, ResolverOptions};
pub use sync::SyncTracker;
pub use time::DurationExt;
