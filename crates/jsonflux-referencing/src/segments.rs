use std::borrow::Cow;

/// Escapes a JSON-pointer segment per RFC 6901: `~` becomes `~0`, `/`
/// becomes `~1`.
pub fn escape_segment(segment: &str) -> Cow<'_, str> {
    if !segment.contains(['~', '/']) {
        return Cow::Borrowed(segment);
    }
    let mut out = String::with_capacity(segment.len() + 2);
    for c in segment.chars() {
        match c {
            '~' => out.push_str("~0"),
            '/' => out.push_str("~1"),
            c => out.push(c),
        }
    }
    Cow::Owned(out)
}

/// Reverses [`escape_segment`]. A dangling `~` is kept verbatim.
pub fn unescape_segment(segment: &str) -> Cow<'_, str> {
    if !segment.contains('~') {
        return Cow::Borrowed(segment);
    }
    let mut out = String::with_capacity(segment.len());
    let mut chars = segment.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '~' {
            match chars.peek() {
                Some('0') => {
                    chars.next();
                    out.push('~');
                }
                Some('1') => {
                    chars.next();
                    out.push('/');
                }
                _ => out.push('~'),
            }
        } else {
            out.push(c);
        }
    }
    Cow::Owned(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("plain", "plain")]
    #[test_case("a/b", "a~1b")]
    #[test_case("a~b", "a~0b")]
    #[test_case("~/", "~0~1")]
    fn escaping(raw: &str, escaped: &str) {
        assert_eq!(escape_segment(raw), escaped);
        assert_eq!(unescape_segment(escaped), raw);
    }

    #[test]
    fn dangling_tilde_survives() {
        assert_eq!(unescape_segment("a~"), "a~");
    }
}
