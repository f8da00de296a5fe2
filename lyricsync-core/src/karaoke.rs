//! Karaoke tag decomposition for ASS/SSA dialogue text.
//!
//! A `{\k<n>}` or `{\kf<n>}` override starts a timed run that lasts until the
//! next karaoke override or the end of the text. Durations are centiseconds.

use crate::lyrics::KaraokeWord;
use serde::{Deserialize, Serialize};

/// How karaoke durations are scaled into seconds.
///
/// Older scripts in the wild disagree on whether `\k` counts centiseconds or
/// deciseconds, so the scale is a policy rather than a constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KaraokeScale {
    /// `\k`, `\kf`, `\ko` and `\K` all count centiseconds
    #[default]
    Uniform,
    /// `\k` counts deciseconds, `\kf` counts centiseconds
    Legacy,
}

/// Kind of karaoke override found in a tag block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KaraokeTag {
    /// `\k` and `\ko`
    Plain,
    /// `\kf` and its alias `\K`
    Fill,
}

impl KaraokeScale {
    fn seconds(self, tag: KaraokeTag, value: u32) -> f64 {
        let value = f64::from(value);
        match (self, tag) {
            (Self::Legacy, KaraokeTag::Plain) => value / 10.0,
            _ => value / 100.0,
        }
    }
}

/// Display text and timed words extracted from one dialogue text field
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Decomposed {
    pub display: String,
    pub words: Vec<KaraokeWord>,
}

/// Split `text` into timed words starting at `line_start` seconds.
///
/// Runs with empty text still advance the clock but are not emitted.
/// All `{...}` blocks are removed from the display text.
#[must_use]
pub fn decompose(text: &str, line_start: f64, scale: KaraokeScale) -> Decomposed {
    // (duration in seconds, run text)
    let mut runs: Vec<(f64, String)> = Vec::new();
    let mut display = String::with_capacity(text.len());
    let mut remaining = text;

    loop {
        let Some(open) = remaining.find('{') else {
            push_run_text(&mut display, &mut runs, remaining);
            break;
        };
        let Some(close) = remaining[open..].find('}').map(|c| open + c) else {
            // Unclosed block: the rest is plain text
            push_run_text(&mut display, &mut runs, remaining);
            break;
        };

        push_run_text(&mut display, &mut runs, &remaining[..open]);
        if let Some((tag, value)) = find_karaoke_tag(&remaining[open + 1..close]) {
            runs.push((scale.seconds(tag, value), String::new()));
        }
        remaining = &remaining[close + 1..];
    }

    let mut clock = line_start;
    let mut words = Vec::with_capacity(runs.len());
    for (duration, run) in runs {
        let start = clock;
        let end = start + duration;
        clock = end;
        if !run.is_empty() {
            words.push(KaraokeWord {
                text: run,
                start,
                end,
            });
        }
    }

    Decomposed {
        display: display.trim().to_string(),
        words,
    }
}

/// Remove every `{...}` override block and convert ASS escapes to plain text
#[must_use]
pub fn strip_override_tags(text: &str) -> String {
    let mut output = String::with_capacity(text.len());
    let mut remaining = text;

    while let Some(open) = remaining.find('{') {
        let Some(close) = remaining[open..].find('}').map(|c| open + c) else {
            break;
        };
        output.push_str(&remaining[..open]);
        remaining = &remaining[close + 1..];
    }
    output.push_str(remaining);

    unescape(&output).trim().to_string()
}

fn push_run_text(display: &mut String, runs: &mut [(f64, String)], text: &str) {
    if text.is_empty() {
        return;
    }
    let text = unescape(text);
    display.push_str(&text);
    if let Some((_, run)) = runs.last_mut() {
        run.push_str(&text);
    }
}

/// `\N` and `\n` are line breaks, `\h` a hard space
fn unescape(text: &str) -> String {
    text.replace("\\N", " ")
        .replace("\\n", " ")
        .replace("\\h", " ")
}

/// Find the karaoke override inside a tag block body such as `\kf45\b1`
fn find_karaoke_tag(block: &str) -> Option<(KaraokeTag, u32)> {
    block.split('\\').find_map(|item| {
        let (tag, digits) = if let Some(rest) = item.strip_prefix("kf") {
            (KaraokeTag::Fill, rest)
        } else if let Some(rest) = item.strip_prefix("ko") {
            (KaraokeTag::Plain, rest)
        } else if let Some(rest) = item.strip_prefix('K') {
            (KaraokeTag::Fill, rest)
        } else if let Some(rest) = item.strip_prefix('k') {
            (KaraokeTag::Plain, rest)
        } else {
            return None;
        };
        let digits = digits.trim();
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        digits.parse().ok().map(|value| (tag, value))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_k_and_kf_share_scale_by_default() {
        let k = decompose("{\\k50}la", 0.0, KaraokeScale::Uniform);
        let kf = decompose("{\\kf50}la", 0.0, KaraokeScale::Uniform);
        assert!(approx(k.words[0].end - k.words[0].start, 0.5));
        assert!(approx(kf.words[0].end - kf.words[0].start, 0.5));
    }

    #[test]
    fn test_legacy_scale_treats_k_as_deciseconds() {
        let k = decompose("{\\k50}la", 0.0, KaraokeScale::Legacy);
        let kf = decompose("{\\kf50}la", 0.0, KaraokeScale::Legacy);
        assert!(approx(k.words[0].end, 5.0));
        assert!(approx(kf.words[0].end, 0.5));
    }

    #[test]
    fn test_segments_accumulate_from_line_start() {
        let result = decompose("{\\k20}Hel{\\k30}lo {\\kf50}world", 10.0, KaraokeScale::Uniform);
        assert_eq!(result.display, "Hello world");
        assert_eq!(result.words.len(), 3);
        assert_eq!(result.words[0].text, "Hel");
        assert!(approx(result.words[0].start, 10.0));
        assert!(approx(result.words[0].end, 10.2));
        assert_eq!(result.words[1].text, "lo ");
        assert!(approx(result.words[1].start, 10.2));
        assert!(approx(result.words[1].end, 10.5));
        assert!(approx(result.words[2].start, 10.5));
        assert!(approx(result.words[2].end, 11.0));
    }

    #[test]
    fn test_empty_runs_advance_clock_without_words() {
        let result = decompose("{\\k100}{\\k50}go", 0.0, KaraokeScale::Uniform);
        assert_eq!(result.words.len(), 1);
        assert!(approx(result.words[0].start, 1.0));
        assert!(approx(result.words[0].end, 1.5));
    }

    #[test]
    fn test_style_tags_are_stripped_from_display() {
        let result = decompose("{\\b1\\k25}Bold{\\i1}ish", 0.0, KaraokeScale::Uniform);
        assert_eq!(result.display, "Boldish");
        assert_eq!(result.words.len(), 1);
        assert_eq!(result.words[0].text, "Boldish");
    }

    #[test]
    fn test_text_without_karaoke_tags_has_no_words() {
        let result = decompose("{\\an8}Plain line", 3.0, KaraokeScale::Uniform);
        assert_eq!(result.display, "Plain line");
        assert!(result.words.is_empty());
    }

    #[test]
    fn test_capital_k_is_fill_alias() {
        assert_eq!(find_karaoke_tag("K30"), Some((KaraokeTag::Fill, 30)));
        assert_eq!(find_karaoke_tag("ko12"), Some((KaraokeTag::Plain, 12)));
        assert_eq!(find_karaoke_tag("b1"), None);
        assert_eq!(find_karaoke_tag("k"), None);
    }

    #[test]
    fn test_strip_override_tags_and_escapes() {
        assert_eq!(strip_override_tags("{\\i1}Line one\\Nline two"), "Line one line two");
        assert_eq!(strip_override_tags("  {\\pos(1,2)}spaced  "), "spaced");
    }
}
