//! Combine a primary LRC source with translations that share its timing.

use crate::lrc::parse_lrc;
use crate::lyrics::{LyricLine, LyricSet};
use crate::time::millis_key;
use std::collections::HashMap;

/// Merge a primary LRC text with one translation LRC text.
///
/// Each primary line gains the text of the translation line starting at the
/// same millisecond. Translation lines with no primary counterpart are dropped.
#[must_use]
pub fn merge_bilingual(primary: &str, translation: &str) -> LyricSet {
    merge_sets(parse_lrc(primary), &[parse_lrc(translation)])
}

/// Merge already-parsed sets: every extra set is matched against `primary`
/// in order, so texts end up as `[primary, extras[0], extras[1], ...]`.
#[must_use]
pub fn merge_sets(primary: LyricSet, extras: &[LyricSet]) -> LyricSet {
    let indexes: Vec<HashMap<i64, &LyricLine>> = extras.iter().map(index_by_start).collect();

    let lines = primary
        .iter()
        .map(|line| {
            let mut merged = line.clone();
            let key = millis_key(line.time);
            for index in &indexes {
                if let Some(extra) = index.get(&key) {
                    merged.texts.extend(extra.texts.iter().cloned());
                }
            }
            merged
        })
        .collect();

    LyricSet::from_unsorted(lines)
}

fn index_by_start(set: &LyricSet) -> HashMap<i64, &LyricLine> {
    let mut index = HashMap::with_capacity(set.len());
    for line in set {
        index.entry(millis_key(line.time)).or_insert(line);
    }
    index
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_matching_lines() {
        let primary = "[00:01.00]Hello\n[00:03.00]World";
        let translation = "[00:01.00]你好\n[00:03.00]世界";
        let merged = merge_bilingual(primary, translation);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged.lines()[0].texts, vec!["Hello", "你好"]);
        assert_eq!(merged.lines()[1].texts, vec!["World", "世界"]);
    }

    #[test]
    fn test_unmatched_translation_lines_are_dropped() {
        let primary = "[00:01.00]Hello\n[00:03.00]World";
        let translation = "[00:01.00]你好\n[00:02.00]孤儿\n[00:03.01]近似";
        let merged = merge_bilingual(primary, translation);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged.lines()[0].texts, vec!["Hello", "你好"]);
        assert_eq!(merged.lines()[1].texts, vec!["World"]);
    }

    #[test]
    fn test_merge_with_itself_doubles_every_text() {
        let text = "[00:02.00]b\n[00:01.00]a\n[00:05.50]c";
        let merged = merge_bilingual(text, text);
        assert_eq!(merged.len(), 3);
        for line in &merged {
            assert_eq!(line.texts.len(), 2);
            assert_eq!(line.texts[0], line.texts[1]);
        }
    }

    #[test]
    fn test_merge_keeps_order_and_karaoke() {
        let primary = "[00:04.00]late\n[00:01.00][00:01.50]early";
        let merged = merge_bilingual(primary, "[00:01.00]早");
        assert_eq!(merged.lines()[0].texts, vec!["early", "早"]);
        assert!(merged.lines()[0].karaoke.is_some());
        assert!(merged.lines()[0].time <= merged.lines()[1].time);
    }

    #[test]
    fn test_merge_sets_appends_extras_in_order() {
        let primary = parse_lrc("[00:01.00]こんにちは");
        let translation = parse_lrc("[00:01.00]hello");
        let romanization = parse_lrc("[00:01.00]konnichiwa");
        let merged = merge_sets(primary, &[translation, romanization]);
        assert_eq!(
            merged.lines()[0].texts,
            vec!["こんにちは", "hello", "konnichiwa"]
        );
    }

    #[test]
    fn test_empty_translation_changes_nothing() {
        let primary = "[00:01.00]solo";
        assert_eq!(merge_bilingual(primary, ""), parse_lrc(primary));
    }
}
