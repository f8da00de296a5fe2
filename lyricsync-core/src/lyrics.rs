//! Normalized lyric data shared by every parser, the resolver and the sync tracker.

use crate::time::millis_key;
use std::fmt::Write;
use std::sync::Arc;

/// A single displayable line of lyrics
#[derive(Debug, Clone, PartialEq)]
pub struct LyricLine {
    /// Start of the line in seconds (never negative)
    pub time: f64,
    /// Display texts: index 0 is the primary language, later entries are
    /// translations in the order they were merged
    pub texts: Vec<String>,
    /// Sub-line timing, if the source grammar carried any
    pub karaoke: Option<Karaoke>,
}

/// Sub-line "karaoke" timing layered on top of a line's start time
#[derive(Debug, Clone, PartialEq)]
pub enum Karaoke {
    /// Several timestamps on one LRC line
    Timings {
        full_text: String,
        timings: Vec<KaraokeTiming>,
    },
    /// Word segments with explicit end times (ASS `\k` tags, enhanced LRC)
    Words(Vec<KaraokeWord>),
}

/// Extra timestamp of a multi-timestamp LRC line
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KaraokeTiming {
    pub time: f64,
    /// 1-based ordinal of the timestamp after the line's first one
    pub position: usize,
}

/// One timed word or segment
#[derive(Debug, Clone, PartialEq)]
pub struct KaraokeWord {
    pub text: String,
    pub start: f64,
    pub end: f64,
}

impl LyricLine {
    /// Create a line with a single primary text and no karaoke data
    pub fn new(time: f64, text: impl Into<String>) -> Self {
        Self {
            time,
            texts: vec![text.into()],
            karaoke: None,
        }
    }

    /// Primary-language text of the line
    #[must_use]
    pub fn primary_text(&self) -> &str {
        self.texts.first().map_or("", String::as_str)
    }

    /// First translation, if one was merged in
    #[must_use]
    pub fn translation(&self) -> Option<&str> {
        self.texts.get(1).map(String::as_str)
    }
}

/// Time-ordered sequence of lyric lines.
///
/// Lines are sorted non-decreasing by `time` when the set is built, ties
/// keeping their input order. The set is never re-sorted afterwards.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LyricSet {
    lines: Vec<LyricLine>,
}

impl LyricSet {
    /// Build a set from lines in any order
    #[must_use]
    pub fn from_unsorted(mut lines: Vec<LyricLine>) -> Self {
        // `sort_by` is stable, so equal times keep input order
        lines.sort_by(|a, b| a.time.total_cmp(&b.time));
        Self { lines }
    }

    /// An empty set (the "no lyrics" state)
    #[must_use]
    pub const fn empty() -> Self {
        Self { lines: Vec::new() }
    }

    #[must_use]
    pub fn lines(&self) -> &[LyricLine] {
        &self.lines
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&LyricLine> {
        self.lines.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, LyricLine> {
        self.lines.iter()
    }

    /// Greatest index whose line starts at or before `time`.
    ///
    /// Equal start times resolve to the later index. Returns `None` before the
    /// first line or when the set is empty.
    #[must_use]
    pub fn active_index_at(&self, time: f64) -> Option<usize> {
        let count = self.lines.partition_point(|line| line.time <= time);
        count.checked_sub(1)
    }

    /// Serialize back to LRC text.
    ///
    /// Every text of a line becomes its own LRC line carrying the same start
    /// timestamp, so the output re-parses into the same multi-text lines.
    #[must_use]
    pub fn to_lrc(&self) -> String {
        let mut output = String::new();

        for line in &self.lines {
            let timestamp = format_timestamp(line.time);

            for (i, text) in line.texts.iter().enumerate() {
                match (&line.karaoke, i) {
                    (Some(Karaoke::Timings { timings, .. }), 0) => {
                        let _ = write!(output, "[{timestamp}]");
                        for timing in timings {
                            let _ = write!(output, "[{}]", format_timestamp(timing.time));
                        }
                        let _ = writeln!(output, "{text}");
                    }
                    (Some(Karaoke::Words(words)), 0) if !words.is_empty() => {
                        let _ = write!(output, "[{timestamp}]");
                        for word in words {
                            let _ = write!(output, "<{}>{}", format_timestamp(word.start), word.text);
                        }
                        if let Some(last) = words.last() {
                            let _ = write!(output, "<{}>", format_timestamp(last.end));
                        }
                        output.push('\n');
                    }
                    _ => {
                        let _ = writeln!(output, "[{timestamp}]{text}");
                    }
                }
            }
        }

        output
    }
}

impl<'a> IntoIterator for &'a LyricSet {
    type Item = &'a LyricLine;
    type IntoIter = std::slice::Iter<'a, LyricLine>;

    fn into_iter(self) -> Self::IntoIter {
        self.lines.iter()
    }
}

/// Where a resolution's lyrics came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LyricSource {
    /// Sibling lyric file, written-back lyrics, or the "no lyrics" default
    Local,
    /// Fetched from an online provider and not (yet) persisted locally
    Online,
}

impl LyricSource {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Online => "online",
        }
    }
}

impl std::fmt::Display for LyricSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one track resolution
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedLyrics {
    /// Parsed lines, shared with the sync tracker
    pub lines: Arc<LyricSet>,
    pub source: LyricSource,
    /// Text the lines were parsed from (empty when nothing was found)
    pub raw_text: String,
    /// Name of the online provider that supplied the text
    pub provider: Option<String>,
    /// Retained fetch failure message, for display only
    pub error: Option<String>,
}

impl ResolvedLyrics {
    /// The "no lyrics" outcome
    #[must_use]
    pub fn not_found() -> Self {
        Self {
            lines: Arc::new(LyricSet::empty()),
            source: LyricSource::Local,
            raw_text: String::new(),
            provider: None,
            error: None,
        }
    }

    #[must_use]
    pub fn is_found(&self) -> bool {
        !self.lines.is_empty()
    }
}

/// Format seconds as an LRC timestamp (`mm:ss.xx`, or `mm:ss.xxx` when the
/// time is not a whole number of hundredths)
fn format_timestamp(seconds: f64) -> String {
    let millis = millis_key(seconds).max(0);
    let minutes = millis / 60_000;
    let secs = (millis / 1000) % 60;
    let frac = millis % 1000;

    if frac % 10 == 0 {
        format!("{minutes:02}:{secs:02}.{:02}", frac / 10)
    } else {
        format!("{minutes:02}:{secs:02}.{frac:03}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(times: &[f64]) -> LyricSet {
        LyricSet::from_unsorted(
            times
                .iter()
                .enumerate()
                .map(|(i, t)| LyricLine::new(*t, format!("line {i}")))
                .collect(),
        )
    }

    fn linear_active_index(lines: &LyricSet, time: f64) -> Option<usize> {
        lines
            .iter()
            .enumerate()
            .filter(|(_, line)| line.time <= time)
            .map(|(i, _)| i)
            .last()
    }

    #[test]
    fn test_from_unsorted_orders_by_time() {
        let lines = set(&[4.0, 0.0, 2.0]);
        let times: Vec<f64> = lines.iter().map(|l| l.time).collect();
        assert_eq!(times, vec![0.0, 2.0, 4.0]);
    }

    #[test]
    fn test_from_unsorted_keeps_input_order_on_ties() {
        let lines = LyricSet::from_unsorted(vec![
            LyricLine::new(3.0, "b"),
            LyricLine::new(1.0, "a"),
            LyricLine::new(3.0, "c"),
        ]);
        let texts: Vec<&str> = lines.iter().map(LyricLine::primary_text).collect();
        assert_eq!(texts, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_active_index_matches_linear_scan() {
        let lines = set(&[0.0, 1.0, 1.0, 2.5, 4.0, 4.0, 7.25]);
        let mut t = -1.0;
        while t < 9.0 {
            assert_eq!(
                lines.active_index_at(t),
                linear_active_index(&lines, t),
                "mismatch at {t}"
            );
            t += 0.125;
        }
    }

    #[test]
    fn test_active_index_bounds() {
        let lines = set(&[1.0, 2.0]);
        assert_eq!(lines.active_index_at(0.5), None);
        assert_eq!(lines.active_index_at(1.0), Some(0));
        assert_eq!(lines.active_index_at(100.0), Some(1));
        assert_eq!(LyricSet::empty().active_index_at(5.0), None);
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(12.34), "00:12.34");
        assert_eq!(format_timestamp(90.0), "01:30.00");
        assert_eq!(format_timestamp(0.0), "00:00.00");
        assert_eq!(format_timestamp(5.005), "00:05.005");
    }

    #[test]
    fn test_to_lrc_emits_one_line_per_text() {
        let lines = LyricSet::from_unsorted(vec![LyricLine {
            time: 5.0,
            texts: vec!["Hello".to_string(), "你好".to_string()],
            karaoke: None,
        }]);
        assert_eq!(lines.to_lrc(), "[00:05.00]Hello\n[00:05.00]你好\n");
    }

    #[test]
    fn test_to_lrc_multi_timestamp_line() {
        let lines = LyricSet::from_unsorted(vec![LyricLine {
            time: 1.0,
            texts: vec!["Hi".to_string()],
            karaoke: Some(Karaoke::Timings {
                full_text: "Hi".to_string(),
                timings: vec![KaraokeTiming {
                    time: 1.5,
                    position: 1,
                }],
            }),
        }]);
        assert_eq!(lines.to_lrc(), "[00:01.00][00:01.50]Hi\n");
    }

    #[test]
    fn test_to_lrc_word_timing() {
        let lines = LyricSet::from_unsorted(vec![LyricLine {
            time: 5.0,
            texts: vec!["Hello world".to_string()],
            karaoke: Some(Karaoke::Words(vec![
                KaraokeWord {
                    text: "Hello ".to_string(),
                    start: 5.0,
                    end: 5.5,
                },
                KaraokeWord {
                    text: "world".to_string(),
                    start: 5.5,
                    end: 6.0,
                },
            ])),
        }]);
        assert_eq!(
            lines.to_lrc(),
            "[00:05.00]<00:05.00>Hello <00:05.50>world<00:06.00>\n"
        );
    }

    #[test]
    fn test_not_found_is_local_and_empty() {
        let resolved = ResolvedLyrics::not_found();
        assert_eq!(resolved.source, LyricSource::Local);
        assert!(resolved.lines.is_empty());
        assert!(!resolved.is_found());
    }
}
