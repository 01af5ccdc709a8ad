use std::borrow::Cow;

/// Returns true for characters that XML 1.0 does not allow in documents.
///
/// Allowed: `#x9 | #xA | #xD | [#x20-#xD7FF] | [#xE000-#xFFFD] | [#x10000-#x10FFFF]`.
/// Surrogates cannot occur in a Rust `str`, so only C0 controls and the two
/// noncharacters need checking.
fn is_xml_illegal(c: char) -> bool {
    matches!(c, '\u{0}'..='\u{8}' | '\u{b}' | '\u{c}' | '\u{e}'..='\u{1f}' | '\u{fffe}' | '\u{ffff}')
}

/// Removes characters that would make the generated feed invalid XML.
///
/// Returns `Cow::Borrowed` when the input is already clean.
pub fn strip_xml_illegal_chars(s: &str) -> Cow<'_, str> {
    if !s.chars().any(is_xml_illegal) {
        return Cow::Borrowed(s);
    }
    Cow::Owned(s.chars().filter(|&c| !is_xml_illegal(c)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_text_returns_borrowed() {
        let input = "Hello, world! <p>clean</p>";
        let result = strip_xml_illegal_chars(input);
        assert!(matches!(result, Cow::Borrowed(_)));
        assert_eq!(result, input);
    }

    #[test]
    fn test_preserves_tabs_newlines_cr() {
        let input = "line1\nline2\ttabbed\r\nwindows";
        let result = strip_xml_illegal_chars(input);
        assert!(matches!(result, Cow::Borrowed(_)));
    }

    #[test]
    fn test_removes_c0_controls() {
        let result = strip_xml_illegal_chars("he\x00ll\x07o\x08 w\x0bor\x0cld\x1b!");
        assert!(matches!(result, Cow::Owned(_)));
        assert_eq!(result, "hello world!");
    }

    #[test]
    fn test_removes_noncharacters() {
        assert_eq!(strip_xml_illegal_chars("a\u{fffe}b\u{ffff}c"), "abc");
    }

    #[test]
    fn test_keeps_non_ascii() {
        let input = "Café – 世界 🎉";
        assert_eq!(strip_xml_illegal_chars(input), input);
    }
}
