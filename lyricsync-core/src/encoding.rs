//! Text decoding for lyric files.
//!
//! Lyric files shipped with older CJK releases are often GBK, Big5 or
//! Shift-JIS rather than UTF-8.

use encoding_rs::{BIG5, EUC_KR, GBK, SHIFT_JIS, UTF_16BE, UTF_16LE, WINDOWS_1252};

/// Decode raw lyric file bytes into text.
///
/// Order: BOM-tagged UTF-8/UTF-16, plain UTF-8, then legacy encodings
/// (GBK, Big5, Shift-JIS, EUC-KR, Windows-1252), then lossy UTF-8.
#[must_use]
pub fn decode_text(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]) {
        return String::from_utf8_lossy(rest).into_owned();
    }
    if let Some(rest) = bytes.strip_prefix(&[0xFF, 0xFE]) {
        return UTF_16LE.decode_without_bom_handling(rest).0.into_owned();
    }
    if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        return UTF_16BE.decode_without_bom_handling(rest).0.into_owned();
    }

    if let Ok(s) = std::str::from_utf8(bytes) {
        return s.to_string();
    }

    for encoding in [GBK, BIG5, SHIFT_JIS, EUC_KR, WINDOWS_1252] {
        let (decoded, had_errors) = encoding.decode_without_bom_handling(bytes);
        if !had_errors && is_likely_valid_text(&decoded) {
            return decoded.into_owned();
        }
    }

    String::from_utf8_lossy(bytes).into_owned()
}

/// Heuristic check that decoded text is not mojibake
fn is_likely_valid_text(s: &str) -> bool {
    let suspicious = s
        .chars()
        .filter(|c| {
            (*c < ' ' && !matches!(*c, '\t' | '\n' | '\r'))
                || ('\u{E000}'..='\u{F8FF}').contains(c)
                || *c == '\u{FFFD}'
        })
        .count();

    // Allow up to 5% suspicious characters
    suspicious <= (s.len() / 20).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_utf8() {
        assert_eq!(decode_text("[00:01.00]你好".as_bytes()), "[00:01.00]你好");
    }

    #[test]
    fn test_utf8_bom_is_stripped() {
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice(b"[00:01.00]hi");
        assert_eq!(decode_text(&bytes), "[00:01.00]hi");
    }

    #[test]
    fn test_utf16le_bom() {
        let mut bytes = vec![0xFF, 0xFE];
        for unit in "[00:01.00]hi".encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        assert_eq!(decode_text(&bytes), "[00:01.00]hi");
    }

    #[test]
    fn test_gbk_fallback() {
        let (encoded, _, _) = GBK.encode("[00:01.00]你好世界");
        assert_eq!(decode_text(&encoded), "[00:01.00]你好世界");
    }
}
