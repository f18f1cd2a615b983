/// Byte ranges of non-overlapping, case-insensitive occurrences of `needle`
/// in `haystack`. Comparison is per character, so the ranges always fall on
/// char boundaries of the original text.
pub fn find_matches(haystack: &str, needle: &str) -> Vec<(usize, usize)> {
    let needle: Vec<char> = needle.chars().collect();
    if needle.is_empty() {
        return Vec::new();
    }

    let chars: Vec<(usize, char)> = haystack.char_indices().collect();
    let mut matches = Vec::new();
    let mut i = 0;
    while i + needle.len() <= chars.len() {
        let hit = needle
            .iter()
            .zip(&chars[i..i + needle.len()])
            .all(|(n, (_, h))| same_letter(*n, *h));
        if hit {
            let start = chars[i].0;
            let end = chars
                .get(i + needle.len())
                .map(|(pos, _)| *pos)
                .unwrap_or(haystack.len());
            matches.push((start, end));
            i += needle.len();
        } else {
            i += 1;
        }
    }
    matches
}

fn same_letter(a: char, b: char) -> bool {
    a == b || a.to_lowercase().eq(b.to_lowercase())
}

/// Find-in-document position. Hits are counted by the renderer; this keeps
/// track of which one is current.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FindState {
    keyword: String,
    hits: usize,
    current: Option<usize>,
}

impl FindState {
    /// Starts a search. A blank keyword clears it.
    pub fn apply(&mut self, keyword: &str, hits: usize) {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            self.clear();
            return;
        }
        self.keyword = keyword.to_string();
        self.hits = hits;
        self.current = if hits > 0 { Some(0) } else { None };
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn keyword(&self) -> Option<&str> {
        if self.keyword.is_empty() {
            None
        } else {
            Some(&self.keyword)
        }
    }

    pub fn hits(&self) -> usize {
        self.hits
    }

    /// Zero-based index of the current hit.
    pub fn current(&self) -> Option<usize> {
        self.current
    }

    pub fn next(&mut self) -> Option<usize> {
        let current = self.current?;
        self.current = Some((current + 1) % self.hits);
        self.current
    }

    pub fn prev(&mut self) -> Option<usize> {
        let current = self.current?;
        self.current = Some((current + self.hits - 1) % self.hits);
        self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_ignore_case() {
        assert_eq!(find_matches("Foo foo FOO", "foo"), vec![(0, 3), (4, 7), (8, 11)]);
    }

    #[test]
    fn matches_do_not_overlap() {
        assert_eq!(find_matches("aaaa", "aa"), vec![(0, 2), (2, 4)]);
    }

    #[test]
    fn ranges_sit_on_char_boundaries() {
        let text = "Éclair ÉCLAIR";
        let found = find_matches(text, "éclair");
        assert_eq!(found.len(), 2);
        for (start, end) in found {
            assert_eq!(text[start..end].to_lowercase(), "éclair");
        }
    }

    #[test]
    fn empty_needle_finds_nothing() {
        assert!(find_matches("abc", "").is_empty());
        assert!(find_matches("", "abc").is_empty());
    }

    #[test]
    fn next_and_prev_wrap() {
        let mut state = FindState::default();
        state.apply("x", 3);
        assert_eq!(state.current(), Some(0));
        assert_eq!(state.next(), Some(1));
        assert_eq!(state.next(), Some(2));
        assert_eq!(state.next(), Some(0));
        assert_eq!(state.prev(), Some(2));
    }

    #[test]
    fn no_hits_means_no_position() {
        let mut state = FindState::default();
        state.apply("x", 0);
        assert_eq!(state.keyword(), Some("x"));
        assert_eq!(state.next(), None);
        assert_eq!(state.prev(), None);
    }

    #[test]
    fn blank_keyword_clears() {
        let mut state = FindState::default();
        state.apply("term", 2);
        state.apply("  ", 5);
        assert_eq!(state, FindState::default());
        assert_eq!(state.keyword(), None);
    }
}
