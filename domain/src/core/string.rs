//! String utilities for the domain layer.

/// Truncate a string to a maximum length with ellipsis (UTF-8 safe)
///
/// Uses byte length for max_len but ensures truncation occurs at valid
/// UTF-8 character boundaries.
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        s.to_string()
    } else {
        let target = max_len.saturating_sub(3);
        let mut end = target.min(s.len());
        while end > 0 && !s.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &s[..end])
    }
}

/// Cut a byte buffer down to at most `max_bytes`, decoding lossily.
///
/// Unlike [`truncate`] no ellipsis is appended; the result is the longest
/// valid prefix that fits.
pub fn bounded_lossy(bytes: &[u8], max_bytes: usize) -> String {
    let slice = if bytes.len() > max_bytes {
        &bytes[..max_bytes]
    } else {
        bytes
    };
    let text = String::from_utf8_lossy(slice);
    if text.len() <= max_bytes {
        return text.into_owned();
    }
    // Replacement characters can grow the string past the limit
    let mut end = max_bytes;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    text[..end].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_ascii() {
        assert_eq!(truncate("hello", 10), "hello");
        assert_eq!(truncate("hello world", 8), "hello...");
    }

    #[test]
    fn test_truncate_multibyte() {
        // "é" is two bytes; cutting inside it must back off to a boundary
        assert_eq!(truncate("ééééé", 7), "éé...");
    }

    #[test]
    fn test_bounded_lossy_short_input() {
        assert_eq!(bounded_lossy(b"abc", 10), "abc");
    }

    #[test]
    fn test_bounded_lossy_cuts_at_limit() {
        assert_eq!(bounded_lossy(b"abcdef", 4), "abcd");
    }

    #[test]
    fn test_bounded_lossy_never_exceeds_limit() {
        let bytes = "ééé".as_bytes();
        let out = bounded_lossy(bytes, 3);
        assert!(out.len() <= 3);
    }
}
