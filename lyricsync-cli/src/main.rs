mod tags;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use lyricsync_core::{
    parse_ass, parse_lrc, CoreError, FileLookup, FsFileLookup, LyricFormat, LyricLine, LyricSet,
    LyricSyncConfig, LyricsController, LyricsProvider, LyricsProviderType, LyricsResolver,
    PlaybackClock, ResolvedLyrics, ResolverOptions, TrackInfo,
};
use lyricsync_lyrics_lrclib::LrclibProvider;
use lyricsync_lyrics_netease::NeteaseProvider;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::tags::{track_for, TagOverrides};

const LOG_TARGET: &str = "lyricsync::cli";

/// How often the simulated player reports its position
const TICK_INTERVAL: Duration = Duration::from_millis(50);
/// Playback keeps going this long after the last line when the duration is unknown
const TAIL_SECS: f64 = 5.0;

#[derive(Debug, Parser)]
#[command(name = "lyricsync", version, about = "Resolve and follow time-synced lyrics")]
struct Cli {
    /// Override config file path.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Never query online providers.
    #[arg(long)]
    offline: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, clap::Args)]
struct TrackArgs {
    /// Audio file
    file: PathBuf,
    /// Title to search for instead of the tag value
    #[arg(long)]
    title: Option<String>,
    /// Artist to search for instead of the tag value
    #[arg(long)]
    artist: Option<String>,
    /// Album to search for instead of the tag value
    #[arg(long)]
    album: Option<String>,
    /// Track length in seconds, when tags do not have one
    #[arg(long)]
    duration: Option<f64>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Resolve lyrics for a track and print them with their source.
    Show {
        #[command(flatten)]
        track: TrackArgs,
    },
    /// Resolve lyrics and print each line as a simulated playback reaches it.
    Play {
        #[command(flatten)]
        track: TrackArgs,
        /// Start position in seconds
        #[arg(long, default_value_t = 0.0)]
        start: f64,
        /// Signed lyric offset in seconds (positive shows lyrics earlier)
        #[arg(long, allow_hyphen_values = true)]
        offset: Option<f64>,
    },
    /// Parse an LRC or ASS/SSA file and print the timed lines.
    Parse {
        /// Lyric file
        file: PathBuf,
    },
}

impl TrackArgs {
    fn overrides(&self) -> Result<TagOverrides> {
        let duration = self
            .duration
            .map(Duration::try_from_secs_f64)
            .transpose()
            .context("Invalid --duration")?;
        Ok(TagOverrides {
            title: self.title.clone(),
            artist: self.artist.clone(),
            album: self.album.clone(),
            duration,
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let mut config = load_config(cli.config.as_deref())?;
    if cli.offline {
        config.lyrics.enable_online_fetch = false;
    }

    match cli.command {
        Command::Parse { file } => parse_file(&file, &config).await,
        Command::Show { track } => {
            let controller = build_controller(&config);
            let track = track_for(&track.file, track.overrides()?);
            let Some(resolved) = controller.on_track_changed(track).await else {
                return Ok(());
            };
            print_header(&resolved);
            print_lines(&resolved.lines);
            Ok(())
        }
        Command::Play {
            track,
            start,
            offset,
        } => {
            let controller = build_controller(&config);
            if let Some(offset) = offset {
                controller.set_user_offset(offset).await;
            }
            let track = track_for(&track.file, track.overrides()?);
            play(&controller, track, start).await
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<LyricSyncConfig> {
    let path = path.map_or_else(LyricSyncConfig::config_path, Path::to_path_buf);
    match LyricSyncConfig::load_or_create_at(&path) {
        Ok(config) => Ok(config),
        Err(e @ CoreError::ConfigNotFound { .. }) => {
            // The template holds the defaults, so carry on with them
            eprintln!("{e}");
            Ok(LyricSyncConfig::default())
        }
        Err(e) => Err(e).with_context(|| format!("Failed to load config {}", path.display())),
    }
}

/// Create lyrics providers based on config
fn create_providers(config: &LyricSyncConfig) -> Vec<Arc<dyn LyricsProvider>> {
    config
        .lyrics
        .providers
        .iter()
        .filter_map(|provider_type| -> Option<Arc<dyn LyricsProvider>> {
            let provider: Result<Arc<dyn LyricsProvider>, CoreError> = match provider_type {
                LyricsProviderType::Netease => {
                    NeteaseProvider::new().map(|p| Arc::new(p) as Arc<dyn LyricsProvider>)
                }
                LyricsProviderType::Lrclib => {
                    LrclibProvider::new().map(|p| Arc::new(p) as Arc<dyn LyricsProvider>)
                }
            };
            match provider {
                Ok(provider) => {
                    info!(target: LOG_TARGET, "Initializing {} provider", provider.name());
                    Some(provider)
                }
                Err(e) => {
                    error!(
                        target: LOG_TARGET,
                        "Failed to create {:?} provider: {}", provider_type, e
                    );
                    None
                }
            }
        })
        .collect()
}

fn build_controller(config: &LyricSyncConfig) -> Arc<LyricsController> {
    let providers = create_providers(config);
    let files = Arc::new(FsFileLookup::new(config.lyrics.local_extensions.clone()));
    let resolver = LyricsResolver::new(files, providers, ResolverOptions::from_config(config));
    info!(
        target: LOG_TARGET,
        "Initialized {} lyrics provider(s): {:?}",
        resolver.provider_names().len(),
        resolver.provider_names()
    );
    LyricsController::new(resolver, &config.sync)
}

async fn parse_file(path: &Path, config: &LyricSyncConfig) -> Result<()> {
    let text = FsFileLookup::default()
        .read_file(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let lines = match LyricFormat::from_path(path) {
        LyricFormat::Lrc => parse_lrc(&text),
        LyricFormat::Ass => parse_ass(&text, &config.parser.ass_options()),
    };
    print_lines(&lines);
    Ok(())
}

async fn play(controller: &LyricsController, track: TrackInfo, start: f64) -> Result<()> {
    let duration = track.duration;
    let Some(resolved) = controller.on_track_changed(track).await else {
        return Ok(());
    };
    print_header(&resolved);
    if !resolved.is_found() {
        return Ok(());
    }

    let end = if duration.is_zero() {
        resolved
            .lines
            .lines()
            .last()
            .map_or(0.0, |line| line.time + TAIL_SECS)
    } else {
        duration.as_secs_f64()
    };

    // Create shared cancellation token for graceful shutdown
    let cancel_token = CancellationToken::new();
    let ctrlc_token = cancel_token.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        info!(target: LOG_TARGET, "Received Ctrl+C, stopping playback");
        ctrlc_token.cancel();
    }) {
        warn!(target: LOG_TARGET, "Failed to set Ctrl+C handler: {}", e);
    }

    let start = Duration::try_from_secs_f64(start.max(0.0)).context("Invalid --start")?;
    let length = Duration::try_from_secs_f64(end).unwrap_or(duration);
    let clock = PlaybackClock::new(true, start, length);
    let mut ticker = tokio::time::interval(TICK_INTERVAL);

    loop {
        tokio::select! {
            () = cancel_token.cancelled() => break,
            _ = ticker.tick() => {
                let now = Instant::now();
                let position = clock.seconds_at(now);
                if let Some(Some(index)) = controller.on_playback_time_at(position, now).await {
                    print_active(&resolved.lines, index);
                }
                if clock.finished_at(now) || position >= end {
                    break;
                }
            }
        }
    }

    stop_playback(controller, &clock, &resolved.lines).await;
    Ok(())
}

/// Report the final position bypassing the throttle, so the line shown
/// matches where playback stopped
async fn stop_playback(
    controller: &LyricsController,
    clock: &PlaybackClock,
    lines: &LyricSet,
) -> Option<usize> {
    let position = clock.seconds_at(Instant::now());
    let index = controller.flush_playback_time(position).await.flatten();
    if let Some(index) = index {
        print_active(lines, index);
    }
    index
}

fn print_header(resolved: &ResolvedLyrics) {
    let provider = resolved
        .provider
        .as_deref()
        .map(|p| format!(" via {p}"))
        .unwrap_or_default();
    println!(
        "# {} lines, source: {}{}",
        resolved.lines.len(),
        resolved.source,
        provider
    );
    if let Some(error) = &resolved.error {
        println!("# last error: {error}");
    }
}

fn print_lines(lines: &LyricSet) {
    for line in lines {
        print_line(line);
    }
}

fn print_active(lines: &LyricSet, index: usize) {
    if let Some(line) = lines.get(index) {
        print_line(line);
    }
}

fn print_line(line: &LyricLine) {
    let minutes = (line.time / 60.0).floor();
    let seconds = line.time - minutes * 60.0;
    println!("[{minutes:02}:{seconds:05.2}] {}", line.primary_text());
    for extra in line.texts.iter().skip(1) {
        println!("           {extra}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_stop_playback_flushes_final_line() {
        let dir = std::env::temp_dir().join(format!("lyricsync-cli-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).ok();
        std::fs::write(dir.join("song.lrc"), "[00:00.00]a\n[00:01.00]b\n[00:02.00]c").ok();

        let mut config = LyricSyncConfig::default();
        config.lyrics.enable_online_fetch = false;
        let controller = build_controller(&config);
        let track = TrackInfo::new(dir.join("song.mp3"), "Song", "", Duration::ZERO);
        let resolved = controller
            .on_track_changed(track)
            .await
            .unwrap_or_else(|| panic!("track should still be current"));
        assert_eq!(resolved.lines.len(), 3);

        let now = Instant::now();
        assert_eq!(controller.on_playback_time_at(0.5, now).await, Some(Some(0)));

        // Within the throttle window, only the flush reaches the last line
        let clock = PlaybackClock::new(false, Duration::from_millis(2_500), Duration::ZERO);
        assert_eq!(controller.on_playback_time_at(2.5, now).await, None);
        assert_eq!(stop_playback(&controller, &clock, &resolved.lines).await, Some(2));
        assert_eq!(controller.active_index().await, Some(2));
        let _ = std::fs::remove_dir_all(&dir);
    }
}
