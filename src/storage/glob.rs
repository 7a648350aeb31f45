//! Glob matching for `KEYS`.
//!
//! Supported syntax, on raw bytes:
//! - `*` matches any run of bytes, including none
//! - `?` matches exactly one byte
//! - `[abc]`, `[a-z]`, `[^a]` match one byte from (or outside) a class
//! - `\x` matches `x` literally
//!
//! Matching backtracks only to the most recent `*`, so the cost stays
//! proportional to `pattern.len() * text.len()`.

/// Returns true if `text` matches the glob `pattern`.
pub fn glob_match(pattern: &[u8], text: &[u8]) -> bool {
    let (mut p, mut t) = (0, 0);
    // Pattern position just after the last `*`, and the text position it
    // is currently assumed to have consumed up to.
    let mut star: Option<(usize, usize)> = None;

    while t < text.len() {
        if p < pattern.len() {
            if pattern[p] == b'*' {
                p += 1;
                star = Some((p, t));
                continue;
            }
            if let Some(width) = match_token(&pattern[p..], text[t]) {
                p += width;
                t += 1;
                continue;
            }
        }

        match star {
            Some((after_star, consumed)) => {
                p = after_star;
                t = consumed + 1;
                star = Some((after_star, consumed + 1));
            }
            None => return false,
        }
    }

    pattern[p..].iter().all(|&c| c == b'*')
}

/// Matches the single-byte token at the start of `pattern` against `c`.
/// Returns the width of the token on success.
fn match_token(pattern: &[u8], c: u8) -> Option<usize> {
    match pattern[0] {
        b'?' => Some(1),
        b'\\' if pattern.len() > 1 => (pattern[1] == c).then_some(2),
        b'[' => match_class(pattern, c),
        literal => (literal == c).then_some(1),
    }
}

fn match_class(pattern: &[u8], c: u8) -> Option<usize> {
    let negate = pattern.get(1) == Some(&b'^');
    let mut i = if negate { 2 } else { 1 };
    let mut matched = false;

    loop {
        match pattern.get(i) {
            // unterminated class never matches
            None => return None,
            Some(b']') => break,
            Some(b'\\') if i + 1 < pattern.len() => {
                matched |= pattern[i + 1] == c;
                i += 2;
            }
            Some(&lo) if pattern.get(i + 1) == Some(&b'-') && i + 2 < pattern.len() && pattern[i + 2] != b']' => {
                let hi = pattern[i + 2];
                let (lo, hi) = if lo <= hi { (lo, hi) } else { (hi, lo) };
                matched |= (lo..=hi).contains(&c);
                i += 3;
            }
            Some(&literal) => {
                matched |= literal == c;
                i += 1;
            }
        }
    }

    (matched != negate).then_some(i + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn m(pattern: &str, text: &str) -> bool {
        glob_match(pattern.as_bytes(), text.as_bytes())
    }

    #[test]
    fn test_star() {
        assert!(m("*", ""));
        assert!(m("*", "anything"));
        assert!(m("h*llo", "hello"));
        assert!(m("h*llo", "hllo"));
        assert!(m("h*llo", "heeeello"));
        assert!(!m("h*llo", "world"));
        assert!(m("user:*:name", "user:42:name"));
        assert!(!m("user:*:name", "user:42:email"));
        assert!(m("a**b", "ab"));
    }

    #[test]
    fn test_question_mark() {
        assert!(m("h?llo", "hello"));
        assert!(m("h?llo", "hallo"));
        assert!(!m("h?llo", "hllo"));
        assert!(!m("h?llo", "heello"));
    }

    #[test]
    fn test_classes() {
        assert!(m("h[ae]llo", "hello"));
        assert!(m("h[ae]llo", "hallo"));
        assert!(!m("h[ae]llo", "hillo"));
        assert!(m("h[^e]llo", "hallo"));
        assert!(!m("h[^e]llo", "hello"));
        assert!(m("h[a-b]llo", "hbllo"));
        assert!(!m("h[a-b]llo", "hcllo"));
        assert!(m("key[0-9]", "key7"));
        assert!(!m("h[ae", "ha"));
    }

    #[test]
    fn test_escape() {
        assert!(m("a\\*b", "a*b"));
        assert!(!m("a\\*b", "axb"));
        assert!(m("[\\]]", "]"));
    }

    #[test]
    fn test_binary_text() {
        assert!(glob_match(b"k*", b"k\x00\xff"));
        assert!(!glob_match(b"k?", b"k"));
    }

    #[test]
    fn test_many_stars_do_not_blow_up() {
        let pattern = "*a".repeat(20) + "b";
        let text = "a".repeat(60);
        assert!(!m(&pattern, &text));
    }
}
