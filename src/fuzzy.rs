//! Fuzzy keyword matching for completion
//!
//! Typos such as `retrun` still surface the intended keyword: a keyword is
//! offered when the typed prefix is a literal prefix of it, or when the whole
//! keyword lies within a small edit distance of what was typed.

use std::cmp::Ordering;

use crate::language::KEYWORDS;

/// Shortest prefix for which edit-distance matches are considered
const MIN_FUZZY_PREFIX: usize = 2;

/// Levenshtein distance over chars
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    let a_len = a_chars.len();
    let b_len = b_chars.len();

    if a_len == 0 {
        return b_len;
    }
    if b_len == 0 {
        return a_len;
    }

    let mut prev_row: Vec<usize> = (0..=b_len).collect();
    let mut curr_row = vec![0; b_len + 1];

    for (i, a_char) in a_chars.iter().enumerate() {
        curr_row[0] = i + 1;
        for (j, b_char) in b_chars.iter().enumerate() {
            let cost = usize::from(a_char != b_char);
            curr_row[j + 1] = (curr_row[j] + 1)
                .min(prev_row[j + 1] + 1)
                .min(prev_row[j] + cost);
        }
        std::mem::swap(&mut prev_row, &mut curr_row);
    }

    prev_row[b_len]
}

/// A keyword offered for a typed prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeywordMatch {
    pub keyword: &'static str,
    pub distance: usize,
    pub is_prefix: bool,
    pub same_first_char: bool,
}

impl KeywordMatch {
    fn rank(&self, other: &Self) -> Ordering {
        other
            .is_prefix
            .cmp(&self.is_prefix)
            .then_with(|| other.same_first_char.cmp(&self.same_first_char))
            .then_with(|| self.distance.cmp(&other.distance))
            .then_with(|| self.keyword.len().cmp(&other.keyword.len()))
            .then_with(|| self.keyword.cmp(other.keyword))
    }
}

/// Keywords matching `prefix`, best first.
///
/// Prefix matches come before edit-distance matches; ties are broken by a
/// shared first character, then distance, then length, then lexical order.
pub fn rank_keywords(prefix: &str, max_distance: usize) -> Vec<KeywordMatch> {
    if prefix.is_empty() {
        return Vec::new();
    }
    let first = prefix.chars().next();
    let fuzzy_allowed = prefix.chars().count() >= MIN_FUZZY_PREFIX && max_distance > 0;

    let mut matches: Vec<KeywordMatch> = KEYWORDS
        .iter()
        .filter_map(|&keyword| {
            let distance = levenshtein(prefix, keyword);
            let is_prefix = keyword.starts_with(prefix);
            if !is_prefix && !(fuzzy_allowed && distance <= max_distance) {
                return None;
            }
            Some(KeywordMatch {
                keyword,
                distance,
                is_prefix,
                same_first_char: keyword.chars().next() == first,
            })
        })
        .collect();

    matches.sort_by(KeywordMatch::rank);
    matches
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keywords(prefix: &str, max: usize) -> Vec<&'static str> {
        rank_keywords(prefix, max).iter().map(|m| m.keyword).collect()
    }

    #[test]
    fn test_levenshtein_basics() {
        assert_eq!(levenshtein("retrun", "return"), 2);
        assert_eq!(levenshtein("await", "await"), 0);
        assert_eq!(levenshtein("", "fn"), 2);
        assert_eq!(levenshtein("kitten", "sitting"), 3);
    }

    #[test]
    fn test_levenshtein_symmetric_and_zero_only_for_equal() {
        let words = ["", "a", "fn", "for", "from", "return", "retrun", "été"];
        for a in words {
            for b in words {
                assert_eq!(levenshtein(a, b), levenshtein(b, a), "{a} vs {b}");
                assert_eq!(levenshtein(a, b) == 0, a == b, "{a} vs {b}");
            }
        }
    }

    #[test]
    fn test_typo_ranks_intended_keyword_first() {
        let ranked = keywords("retrun", 2);
        assert_eq!(ranked.first(), Some(&"return"));
    }

    #[test]
    fn test_prefix_matches_all_offered() {
        let ranked = keywords("im", 2);
        assert!(ranked.contains(&"import"));
        assert!(ranked.contains(&"impl"));
        // prefix matches lead, shorter first
        assert_eq!(&ranked[..2], &["impl", "import"]);
    }

    #[test]
    fn test_prefix_matches_precede_fuzzy_matches() {
        let ranked = rank_keywords("fo", 2);
        let first_fuzzy = ranked.iter().position(|m| !m.is_prefix).unwrap_or(ranked.len());
        assert!(ranked[..first_fuzzy].iter().all(|m| m.is_prefix));
        assert!(ranked[first_fuzzy..].iter().all(|m| !m.is_prefix));
        assert_eq!(ranked[0].keyword, "for");
    }

    #[test]
    fn test_short_and_empty_prefixes() {
        assert!(keywords("", 2).is_empty());
        // single characters only produce literal prefix matches
        assert!(rank_keywords("w", 2).iter().all(|m| m.is_prefix));
        assert_eq!(keywords("w", 2), vec!["while"]);
    }

    #[test]
    fn test_distance_cap() {
        assert!(!keywords("retrun", 1).contains(&"return"));
        assert!(keywords("whle", 1).contains(&"while"));
    }
}
