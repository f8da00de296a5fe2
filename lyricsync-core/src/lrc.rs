//! LRC grammar: `[mm:ss.xx]` timestamped lines into a [`LyricSet`].

use crate::lyrics::{Karaoke, KaraokeTiming, KaraokeWord, LyricLine, LyricSet};
use crate::time::{millis_key, millis_to_secs, shift_clamped};
use std::collections::HashMap;
use tracing::{debug, trace};

const LOG_TARGET: &str = "lyricsync::parser::lrc";

/// Number of input lines processed between yields in [`LrcDocument::parse_chunked`]
pub const DEFAULT_CHUNK_LINES: usize = 100;

/// Parsed LRC file: ID-tag metadata plus the time-ordered lines
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LrcDocument {
    pub metadata: LrcMetadata,
    pub lines: LyricSet,
}

/// LRC metadata from ID tags
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LrcMetadata {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub author: Option<String>,
    /// Track length in seconds
    pub length: Option<f64>,
    pub offset_ms: i64, // positive = lyrics shown earlier
}

/// Parse LRC text into lines, discarding metadata
#[must_use]
pub fn parse_lrc(input: &str) -> LyricSet {
    LrcDocument::parse(input).lines
}

/// Parse LRC text, yielding to the runtime every `chunk_lines` input lines
pub async fn parse_lrc_chunked(input: &str, chunk_lines: usize) -> LyricSet {
    LrcDocument::parse_chunked(input, chunk_lines).await.lines
}

impl LrcDocument {
    /// Parse an LRC string in one pass
    #[must_use]
    pub fn parse(input: &str) -> Self {
        let mut builder = LrcBuilder::default();
        for line in input.lines() {
            builder.push_line(line);
        }
        builder.finish()
    }

    /// Parse an LRC string in batches of `chunk_lines` lines, yielding between
    /// batches so long files do not monopolize the caller's thread.
    pub async fn parse_chunked(input: &str, chunk_lines: usize) -> Self {
        let chunk_lines = chunk_lines.max(1);
        let mut builder = LrcBuilder::default();

        for (i, line) in input.lines().enumerate() {
            if i > 0 && i % chunk_lines == 0 {
                tokio::task::yield_now().await;
            }
            builder.push_line(line);
        }

        builder.finish()
    }
}

/// Line under construction; `open_end` marks a word list whose last word has
/// no end tag yet
struct PendingLine {
    line: LyricLine,
    open_end: bool,
}

#[derive(Default)]
struct LrcBuilder {
    metadata: LrcMetadata,
    lines: Vec<PendingLine>,
    by_start: HashMap<i64, usize>,
    skipped: usize,
}

impl LrcBuilder {
    fn push_line(&mut self, raw: &str) {
        let line = raw.trim();
        if line.is_empty() {
            return;
        }

        // Try to parse as ID tag first
        if let Some((tag, value)) = parse_id_tag(line) {
            self.apply_tag(&tag, value);
            return;
        }

        let Some(parsed) = parse_timed_line(line) else {
            trace!(target: LOG_TARGET, "Skipping line without timestamp: {line}");
            self.skipped += 1;
            return;
        };

        if parsed.line.primary_text().is_empty() {
            return;
        }

        match self.by_start.get(&millis_key(parsed.line.time)) {
            Some(&index) => {
                // Same start time: stack the text onto the existing line
                self.lines[index].line.texts.extend(parsed.line.texts);
            }
            None => {
                self.by_start
                    .insert(millis_key(parsed.line.time), self.lines.len());
                self.lines.push(parsed);
            }
        }
    }

    fn apply_tag(&mut self, tag: &str, value: String) {
        match tag.to_lowercase().as_str() {
            "ti" => self.metadata.title = Some(value),
            "ar" => self.metadata.artist = Some(value),
            "al" => self.metadata.album = Some(value),
            "au" | "by" => self.metadata.author = Some(value),
            "length" => self.metadata.length = parse_timestamp(&value),
            "offset" => {
                if let Ok(offset) = value.trim().parse::<i64>() {
                    self.metadata.offset_ms = offset;
                }
            }
            _ => {} // Ignore unknown tags
        }
    }

    fn finish(self) -> LrcDocument {
        let Self {
            metadata,
            mut lines,
            skipped,
            ..
        } = self;

        if metadata.offset_ms != 0 {
            let delta = -millis_to_secs(metadata.offset_ms);
            for pending in &mut lines {
                shift_line(&mut pending.line, delta);
            }
        }

        // Stable sort keeps input order for equal start times
        lines.sort_by(|a, b| a.line.time.total_cmp(&b.line.time));

        // Close word lists that ran to the end of their line
        let next_starts: Vec<Option<f64>> = (0..lines.len())
            .map(|i| lines.get(i + 1).map(|next| next.line.time))
            .collect();
        for (pending, next_start) in lines.iter_mut().zip(next_starts) {
            if !pending.open_end {
                continue;
            }
            if let Some(Karaoke::Words(words)) = &mut pending.line.karaoke {
                if let Some(last) = words.last_mut() {
                    last.end = next_start.map_or(last.start, |next| next.max(last.start));
                }
            }
        }

        debug!(
            target: LOG_TARGET,
            "Parsed {} LRC lines ({} skipped)",
            lines.len(),
            skipped
        );

        LrcDocument {
            metadata,
            lines: LyricSet::from_unsorted(lines.into_iter().map(|p| p.line).collect()),
        }
    }
}

fn shift_line(line: &mut LyricLine, delta: f64) {
    line.time = shift_clamped(line.time, delta);
    match &mut line.karaoke {
        Some(Karaoke::Timings { timings, .. }) => {
            for timing in timings {
                timing.time = shift_clamped(timing.time, delta);
            }
        }
        Some(Karaoke::Words(words)) => {
            for word in words {
                word.start = shift_clamped(word.start, delta);
                word.end = shift_clamped(word.end, delta);
            }
        }
        None => {}
    }
}

/// Parse an ID tag like [ti:Title] or [ar:Artist]
fn parse_id_tag(line: &str) -> Option<(String, String)> {
    if !line.starts_with('[') || !line.contains(':') {
        return None;
    }

    let end = line.find(']')?;
    let content = &line[1..end];

    let first_colon = content.find(':')?;
    let tag = &content[..first_colon];

    // If the tag part looks like a number, it's a timestamp, not an ID tag
    if tag.is_empty() || tag.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }
    if !tag.chars().all(char::is_alphabetic) {
        return None;
    }

    let value = content[first_colon + 1..].trim().to_string();
    Some((tag.to_string(), value))
}

/// Parse a lyric line like `[00:12.34]Hello` or `[00:01.00]Hel[00:01.50]lo`.
///
/// Every bracketed timestamp anywhere on the line is removed from the text.
/// The first one starts the line; any further ones become karaoke timings.
fn parse_timed_line(line: &str) -> Option<PendingLine> {
    let mut times = Vec::new();
    let mut text = String::with_capacity(line.len());
    let mut remaining = line;

    while let Some(open) = remaining.find('[') {
        let Some(close) = remaining[open..].find(']').map(|c| open + c) else {
            break;
        };
        match parse_timestamp(&remaining[open + 1..close]) {
            Some(time) => {
                text.push_str(&remaining[..open]);
                times.push(time);
            }
            None => text.push_str(&remaining[..=close]),
        }
        remaining = &remaining[close + 1..];
    }
    text.push_str(remaining);

    let (&start, rest) = times.split_first()?;

    if !rest.is_empty() {
        let full_text = strip_word_tags(&text).trim().to_string();
        let timings = rest
            .iter()
            .enumerate()
            .map(|(i, &time)| KaraokeTiming {
                time,
                position: i + 1,
            })
            .collect();
        return Some(PendingLine {
            line: LyricLine {
                time: start,
                texts: vec![full_text.clone()],
                karaoke: Some(Karaoke::Timings { full_text, timings }),
            },
            open_end: false,
        });
    }

    if let Some(enhanced) = parse_enhanced_words(&text) {
        return Some(PendingLine {
            line: LyricLine {
                time: start,
                texts: vec![enhanced.display.trim().to_string()],
                karaoke: Some(Karaoke::Words(enhanced.words)),
            },
            open_end: enhanced.open_end,
        });
    }

    Some(PendingLine {
        line: LyricLine::new(start, text.trim()),
        open_end: false,
    })
}

/// Parse a timestamp body: `mm:ss`, `mm:ss.xx`, `mm:ss.xxx` or `hh:mm:ss`.
///
/// Fractions scale by their digit count, so `.5`, `.50` and `.500` are equal.
fn parse_timestamp(s: &str) -> Option<f64> {
    let parts: Vec<&str> = s.trim().split(':').collect();

    match parts.as_slice() {
        [minutes, seconds] => Some(parse_whole(minutes)? * 60.0 + parse_seconds(seconds)?),
        [hours, minutes, seconds] => Some(
            parse_whole(hours)? * 3600.0 + parse_whole(minutes)? * 60.0 + parse_seconds(seconds)?,
        ),
        _ => None,
    }
}

fn parse_whole(s: &str) -> Option<f64> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse::<u32>().ok().map(f64::from)
}

fn parse_seconds(s: &str) -> Option<f64> {
    match s.split_once('.') {
        Some((whole, fraction)) => {
            let whole = parse_whole(whole)?;
            let digits = i32::try_from(fraction.len()).ok()?;
            let fraction = parse_whole(fraction)?;
            Some(whole + fraction / 10f64.powi(digits))
        }
        None => parse_whole(s),
    }
}

struct EnhancedWords {
    display: String,
    words: Vec<KaraokeWord>,
    open_end: bool,
}

/// Parse enhanced LRC word timing
/// Format: <mm:ss.xx>word1 <mm:ss.xx>word2 ... [<mm:ss.xx>]
fn parse_enhanced_words(text: &str) -> Option<EnhancedWords> {
    let mut display = String::with_capacity(text.len());
    // (tag time, text following the tag)
    let mut segments: Vec<(f64, String)> = Vec::new();
    let mut remaining = text;

    while let Some(open) = remaining.find('<') {
        let Some(close) = remaining[open..].find('>').map(|c| open + c) else {
            break;
        };
        let before = &remaining[..open];
        match parse_timestamp(&remaining[open + 1..close]) {
            Some(time) => {
                push_segment_text(&mut display, &mut segments, before);
                segments.push((time, String::new()));
            }
            None => push_segment_text(&mut display, &mut segments, &remaining[..=close]),
        }
        remaining = &remaining[close + 1..];
    }
    push_segment_text(&mut display, &mut segments, remaining);

    if segments.is_empty() {
        return None;
    }

    let mut words = Vec::new();
    let mut open_end = false;
    for (i, (start, word)) in segments.iter().enumerate() {
        if word.is_empty() {
            continue;
        }
        match segments.get(i + 1) {
            Some((end, _)) => words.push(KaraokeWord {
                text: word.clone(),
                start: *start,
                end: end.max(*start),
            }),
            None => {
                open_end = true;
                words.push(KaraokeWord {
                    text: word.clone(),
                    start: *start,
                    end: *start,
                });
            }
        }
    }

    if words.is_empty() {
        return None;
    }

    Some(EnhancedWords {
        display,
        words,
        open_end,
    })
}

fn push_segment_text(display: &mut String, segments: &mut [(f64, String)], text: &str) {
    display.push_str(text);
    if let Some((_, word)) = segments.last_mut() {
        word.push_str(text);
    }
}

fn strip_word_tags(text: &str) -> String {
    parse_enhanced_words(text).map_or_else(|| text.to_string(), |enhanced| enhanced.display)
}
