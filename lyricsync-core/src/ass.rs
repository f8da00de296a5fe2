//! ASS/SSA subtitle scripts: `Dialogue:` events into a [`LyricSet`].
//!
//! Events sharing the same `(start, end)` pair form one lyric line. The
//! event's style decides whether it fills the original or the translation
//! slot; karaoke overrides are read from the original slot only.

use crate::karaoke::{decompose, strip_override_tags, KaraokeScale};
use crate::lyrics::{Karaoke, LyricLine, LyricSet};
use crate::time::millis_key;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, trace};

const LOG_TARGET: &str = "lyricsync::parser::ass";

/// Prefix of dialogue event lines
pub const DIALOGUE_PREFIX: &str = "Dialogue:";

/// Minimum comma-separated fields in a dialogue event
const MIN_FIELDS: usize = 10;

const START_FIELD: usize = 1;
const END_FIELD: usize = 2;
const STYLE_FIELD: usize = 3;
const TEXT_FIELD: usize = 9;

/// Which style names fill which text slot (compared case-insensitively)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssStylePolicy {
    #[serde(default = "default_original_styles")]
    pub original: Vec<String>,
    #[serde(default = "default_translation_styles")]
    pub translation: Vec<String>,
}

fn default_original_styles() -> Vec<String> {
    vec!["orig".to_string(), "default".to_string()]
}

fn default_translation_styles() -> Vec<String> {
    vec![
        "ts".to_string(),
        "trans".to_string(),
        "translation".to_string(),
    ]
}

impl Default for AssStylePolicy {
    fn default() -> Self {
        Self {
            original: default_original_styles(),
            translation: default_translation_styles(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Original,
    Translation,
}

impl AssStylePolicy {
    fn slot(&self, style: &str) -> Option<Slot> {
        let style = style.trim();
        if self.original.iter().any(|s| s.eq_ignore_ascii_case(style)) {
            Some(Slot::Original)
        } else if self.translation.iter().any(|s| s.eq_ignore_ascii_case(style)) {
            Some(Slot::Translation)
        } else {
            None
        }
    }
}

/// Options for [`parse_ass`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssOptions {
    pub styles: AssStylePolicy,
    pub karaoke_scale: KaraokeScale,
}

/// Events sharing one `(start, end)` pair
struct EventGroup {
    start: f64,
    original: Option<String>,
    translation: Option<String>,
}

/// Parse an ASS/SSA script into lyric lines
#[must_use]
pub fn parse_ass(input: &str, options: &AssOptions) -> LyricSet {
    let mut groups: Vec<EventGroup> = Vec::new();
    let mut by_timing: HashMap<(i64, i64), usize> = HashMap::new();
    let mut skipped = 0usize;

    for line in input.lines() {
        let Some(body) = line.trim_start().strip_prefix(DIALOGUE_PREFIX) else {
            continue;
        };

        // The text field may itself contain commas, so stop splitting there
        let fields: Vec<&str> = body.splitn(MIN_FIELDS, ',').collect();
        if fields.len() < MIN_FIELDS {
            trace!(target: LOG_TARGET, "Skipping dialogue with {} fields", fields.len());
            skipped += 1;
            continue;
        }

        let (Some(start), Some(end)) = (
            parse_ass_time(fields[START_FIELD]),
            parse_ass_time(fields[END_FIELD]),
        ) else {
            trace!(target: LOG_TARGET, "Skipping dialogue with bad timing: {line}");
            skipped += 1;
            continue;
        };

        let Some(slot) = options.styles.slot(fields[STYLE_FIELD]) else {
            continue;
        };

        let key = (millis_key(start), millis_key(end));
        let index = *by_timing.entry(key).or_insert_with(|| {
            groups.push(EventGroup {
                start,
                original: None,
                translation: None,
            });
            groups.len() - 1
        });

        let text = fields[TEXT_FIELD].to_string();
        let group = &mut groups[index];
        let target = match slot {
            Slot::Original => &mut group.original,
            Slot::Translation => &mut group.translation,
        };
        if target.is_none() {
            *target = Some(text);
        }
    }

    let lines: Vec<LyricLine> = groups
        .into_iter()
        .filter_map(|group| build_line(group, options.karaoke_scale))
        .collect();

    debug!(
        target: LOG_TARGET,
        "Parsed {} ASS lines ({} events skipped)",
        lines.len(),
        skipped
    );

    LyricSet::from_unsorted(lines)
}

fn build_line(group: EventGroup, scale: KaraokeScale) -> Option<LyricLine> {
    let original = group.original?;
    let decomposed = decompose(&original, group.start, scale);
    if decomposed.display.is_empty() {
        return None;
    }

    let mut texts = vec![decomposed.display];
    if let Some(translation) = group.translation {
        let translation = strip_override_tags(&translation);
        if !translation.is_empty() {
            texts.push(translation);
        }
    }

    Some(LyricLine {
        time: group.start,
        texts,
        karaoke: (!decomposed.words.is_empty()).then_some(Karaoke::Words(decomposed.words)),
    })
}

/// Parse an ASS timestamp `h:mm:ss.cc` into seconds
fn parse_ass_time(s: &str) -> Option<f64> {
    let parts: Vec<&str> = s.trim().split(':').collect();
    let [hours, minutes, seconds] = parts.as_slice() else {
        return None;
    };

    let hours: u32 = hours.parse().ok()?;
    let minutes: u32 = minutes.parse().ok()?;
    let seconds: f64 = seconds.parse().ok()?;
    if !seconds.is_finite() || seconds < 0.0 {
        return None;
    }

    Some(f64::from(hours) * 3600.0 + f64::from(minutes) * 60.0 + seconds)
}
