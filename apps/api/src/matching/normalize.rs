//! Text normalization and phrase lookup shared by the matcher and level resolution.

/// Lowercases, replaces every character outside `[a-z0-9+/#.&]` with a space and collapses
/// whitespace runs. Keeps tokens such as `c++`, `c#`, `node.js` and `ds&a` intact.
pub fn normalize_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_space = false;

    for ch in text.chars().flat_map(char::to_lowercase) {
        let keep = ch.is_ascii_lowercase()
            || ch.is_ascii_digit()
            || matches!(ch, '+' | '/' | '#' | '.' | '&');
        if keep {
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            out.push(ch);
        } else {
            pending_space = true;
        }
    }

    out
}

/// True if `phrase` occurs in `haystack` without touching another word character on either side.
///
/// Both arguments are expected to be normalized. "git" does not match inside "digital" and
/// "api" does not match inside "capabilities".
pub fn phrase_present(haystack: &str, phrase: &str) -> bool {
    if phrase.is_empty() {
        return false;
    }

    let bytes = haystack.as_bytes();
    let mut from = 0;
    while let Some(pos) = haystack[from..].find(phrase) {
        let start = from + pos;
        let end = start + phrase.len();

        let clear_before = start == 0 || !is_word_byte(bytes[start - 1]);
        let clear_after = end == bytes.len() || !is_word_byte(bytes[end]);
        if clear_before && clear_after {
            return true;
        }

        // advance by one char so overlapping occurrences are still considered
        from = start + haystack[start..].chars().next().map_or(1, char::len_utf8);
    }
    false
}

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Minimum chunk length (in chars) considered for semantic comparison.
const MIN_CHUNK_CHARS: usize = 6;

/// Splits raw resume text into sentence-like chunks for semantic matching.
pub fn chunk_text(text: &str) -> Vec<String> {
    text.split(['.', ';', '!', '?', '\n'])
        .map(str::trim)
        .filter(|chunk| chunk.chars().count() >= MIN_CHUNK_CHARS)
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_keeps_tech_tokens() {
        assert_eq!(
            normalize_text("Built APIs in C++, C#, and Node.js (R&D)!"),
            "built apis in c++ c# and node.js r&d"
        );
    }

    #[test]
    fn test_normalize_collapses_whitespace_and_strips_noise() {
        assert_eq!(normalize_text("  Unit\t\ttests --  **Jest**\n"), "unit tests jest");
        assert_eq!(normalize_text("résumé"), "r sum");
        assert_eq!(normalize_text(""), "");
        assert_eq!(normalize_text("!!!"), "");
    }

    #[test]
    fn test_phrase_present_respects_word_boundaries() {
        assert!(!phrase_present("digital transformation", "git"));
        assert!(!phrase_present("strong capabilities", "api"));
        assert!(phrase_present("used git daily", "git"));
        assert!(phrase_present("git", "git"));
        assert!(phrase_present("rest api.", "api"));
    }

    #[test]
    fn test_phrase_present_multiword_and_symbols() {
        assert!(phrase_present("wrote unit tests for the api", "unit tests"));
        assert!(phrase_present("modern c++ and c# code", "c++"));
        assert!(phrase_present("modern c++ and c# code", "c#"));
        assert!(!phrase_present("going forward", "go"));
    }

    #[test]
    fn test_phrase_present_finds_later_clean_occurrence() {
        assert!(phrase_present("gitlab and git", "git"));
    }

    #[test]
    fn test_phrase_present_empty_phrase_never_matches() {
        assert!(!phrase_present("anything", ""));
    }

    #[test]
    fn test_chunk_text_drops_short_fragments() {
        let chunks = chunk_text("Led migration to k8s. Ok. Wrote tests;\nhi\nImproved CI pipeline!");
        assert_eq!(
            chunks,
            vec!["Led migration to k8s", "Wrote tests", "Improved CI pipeline"]
        );
    }

    #[test]
    fn test_chunk_text_empty_input() {
        assert!(chunk_text("").is_empty());
    }
}
