//! Text helpers shared by both session engines: script detection, cloze
//! tokenization and answer matching.

use rand::Rng;
use serde::Serialize;

const BLANK: &str = "___";

/// True when the text contains kana, CJK ideographs or halfwidth katakana,
/// i.e. a script written without spaces between words.
pub fn is_contiguous_script(text: &str) -> bool {
    text.chars().any(|c| {
        matches!(c as u32,
            0x3040..=0x30FF
            | 0x3400..=0x4DBF
            | 0x4E00..=0x9FFF
            | 0xF900..=0xFAFF
            | 0xFF66..=0xFF9F)
    })
}

/// Split a sentence into cloze tokens: per character for contiguous scripts,
/// on whitespace otherwise.
pub fn tokenize(text: &str) -> Vec<String> {
    if is_contiguous_script(text) {
        text.chars()
            .filter(|c| !c.is_whitespace())
            .map(|c| c.to_string())
            .collect()
    } else {
        text.split_whitespace().map(str::to_string).collect()
    }
}

fn is_eligible(token: &str) -> bool {
    token.chars().any(char::is_alphanumeric)
}

pub fn eligible_indices(tokens: &[String]) -> Vec<usize> {
    tokens
        .iter()
        .enumerate()
        .filter(|(_, t)| is_eligible(t))
        .map(|(i, _)| i)
        .collect()
}

fn strip_punctuation(token: &str) -> &str {
    token.trim_matches(|c: char| !c.is_alphanumeric())
}

/// A sentence with one token hidden.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClozePrompt {
    pub tokens: Vec<String>,
    pub blank_index: usize,
    pub contiguous: bool,
}

impl ClozePrompt {
    /// Pick the blank for a sentence. A locked index is reused while it still
    /// points at an eligible token; otherwise the blank is drawn uniformly.
    /// Returns `None` when the sentence has nothing to blank out.
    pub fn choose<R: Rng + ?Sized>(
        target: &str,
        locked: Option<usize>,
        rng: &mut R,
    ) -> Option<Self> {
        let tokens = tokenize(target);
        let candidates = eligible_indices(&tokens);
        if candidates.is_empty() {
            return None;
        }

        let blank_index = match locked {
            Some(i) if candidates.contains(&i) => i,
            _ => candidates[rng.gen_range(0..candidates.len())],
        };

        Some(Self {
            tokens,
            blank_index,
            contiguous: is_contiguous_script(target),
        })
    }

    pub fn answer(&self) -> &str {
        strip_punctuation(&self.tokens[self.blank_index])
    }

    /// The sentence with the blanked token replaced, surrounding punctuation kept.
    pub fn masked(&self) -> String {
        let parts: Vec<String> = self
            .tokens
            .iter()
            .enumerate()
            .map(|(i, token)| {
                if i == self.blank_index {
                    let core = strip_punctuation(token);
                    token.replacen(core, BLANK, 1)
                } else {
                    token.clone()
                }
            })
            .collect();

        let joiner = if self.contiguous { "" } else { " " };
        parts.join(joiner)
    }

    pub fn check(&self, input: &str) -> bool {
        answers_match(input, self.answer())
    }
}

/// Exact match ignoring case and surrounding whitespace.
pub fn answers_match(input: &str, expected: &str) -> bool {
    input.trim().to_lowercase() == expected.trim().to_lowercase()
}

/// Levenshtein distance over chars; substitution, insertion and deletion all cost 1.
pub fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for i in 1..=a.len() {
        curr[0] = i;
        for j in 1..=b.len() {
            let cost = if a[i - 1] == b[j - 1] { 0 } else { 1 };
            curr[j] = (prev[j] + 1).min(curr[j - 1] + 1).min(prev[j - 1] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

/// Lenient answer check: exact (case-insensitive), or within
/// `floor(len/4) + 1` edits of the target. Contiguous-script targets and
/// very short words only accept exact answers.
pub fn is_close_enough(input: &str, target: &str) -> bool {
    let s = input.trim().to_lowercase();
    let t = target.trim().to_lowercase();

    if s == t {
        return true;
    }
    if is_contiguous_script(&t) {
        return false;
    }

    let target_len = t.chars().count();
    if s.chars().count() < 3 || target_len < 3 {
        return false;
    }

    edit_distance(&s, &t) <= target_len / 4 + 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    mod script_tests {
        use super::*;

        #[test]
        fn detects_han_and_kana() {
            assert!(is_contiguous_script("我很好"));
            assert!(is_contiguous_script("ありがとう"));
            assert!(is_contiguous_script("mixed 中文"));
        }

        #[test]
        fn latin_is_spaced() {
            assert!(!is_contiguous_script("apple"));
            assert!(!is_contiguous_script("señor"));
        }
    }

    mod tokenize_tests {
        use super::*;

        #[test]
        fn spaced_text_splits_on_whitespace() {
            assert_eq!(tokenize("the  red dog"), vec!["the", "red", "dog"]);
        }

        #[test]
        fn contiguous_text_splits_per_char() {
            assert_eq!(tokenize("我很好。"), vec!["我", "很", "好", "。"]);
        }

        #[test]
        fn punctuation_only_tokens_are_ineligible() {
            let tokens = tokenize("Hola , amigo !");
            assert_eq!(eligible_indices(&tokens), vec![0, 2]);

            let cjk = tokenize("好。");
            assert_eq!(eligible_indices(&cjk), vec![0]);
        }
    }

    mod cloze_tests {
        use super::*;

        #[test]
        fn locked_index_is_reused() {
            let mut rng = StdRng::seed_from_u64(7);
            for _ in 0..20 {
                let prompt = ClozePrompt::choose("I like green tea", Some(2), &mut rng).unwrap();
                assert_eq!(prompt.blank_index, 2);
                assert_eq!(prompt.answer(), "green");
            }
        }

        #[test]
        fn stale_lock_falls_back_to_random_choice() {
            let mut rng = StdRng::seed_from_u64(7);
            let prompt = ClozePrompt::choose("I like tea", Some(10), &mut rng).unwrap();
            assert!(prompt.blank_index < 3);
        }

        #[test]
        fn unlocked_choice_covers_every_eligible_token() {
            let mut rng = StdRng::seed_from_u64(42);
            let mut seen = [false; 3];
            for _ in 0..200 {
                let prompt = ClozePrompt::choose("one ! two three", None, &mut rng).unwrap();
                assert_ne!(prompt.blank_index, 1);
                let slot = match prompt.blank_index {
                    0 => 0,
                    2 => 1,
                    _ => 2,
                };
                seen[slot] = true;
            }
            assert!(seen.iter().all(|s| *s));
        }

        #[test]
        fn nothing_to_blank_returns_none() {
            let mut rng = StdRng::seed_from_u64(1);
            assert!(ClozePrompt::choose("? !", None, &mut rng).is_none());
            assert!(ClozePrompt::choose("", None, &mut rng).is_none());
        }

        #[test]
        fn masked_keeps_punctuation() {
            let prompt = ClozePrompt {
                tokens: tokenize("Where is the station?"),
                blank_index: 3,
                contiguous: false,
            };
            assert_eq!(prompt.masked(), "Where is the ___?");
            assert_eq!(prompt.answer(), "station");
            assert!(prompt.check(" Station "));
            assert!(!prompt.check("stations"));
        }

        #[test]
        fn masked_contiguous_joins_without_spaces() {
            let prompt = ClozePrompt {
                tokens: tokenize("我很好"),
                blank_index: 1,
                contiguous: true,
            };
            assert_eq!(prompt.masked(), "我___好");
            assert!(prompt.check("很"));
        }
    }

    mod matching_tests {
        use super::*;

        #[test]
        fn edit_distance_basics() {
            assert_eq!(edit_distance("", ""), 0);
            assert_eq!(edit_distance("abc", ""), 3);
            assert_eq!(edit_distance("kitten", "sitting"), 3);
            assert_eq!(edit_distance("aple", "apple"), 1);
        }

        #[test]
        fn edit_distance_counts_chars_not_bytes() {
            assert_eq!(edit_distance("café", "cafe"), 1);
        }

        #[test]
        fn close_misspelling_is_accepted() {
            assert!(is_close_enough("aple", "apple"));
            assert!(is_close_enough("APPLE ", "apple"));
        }

        #[test]
        fn distant_answer_is_rejected() {
            assert!(!is_close_enough("xyz", "apple"));
        }

        #[test]
        fn threshold_scales_with_length() {
            // floor(8/4) + 1 = 3 edits allowed
            assert!(is_close_enough("elefnt", "elephant"));
            assert!(!is_close_enough("elfn", "elephant"));
        }

        #[test]
        fn contiguous_targets_need_exact_answer() {
            assert!(is_close_enough("你好", "你好"));
            assert!(!is_close_enough("你们", "你好"));
            assert!(!is_close_enough("你好吗", "你好么"));
        }

        #[test]
        fn short_words_need_exact_answer() {
            assert!(!is_close_enough("ab", "ac"));
            assert!(is_close_enough("Ab", "ab"));
        }

        #[test]
        fn answers_match_ignores_case_and_padding() {
            assert!(answers_match("  Hund ", "hund"));
            assert!(!answers_match("hunde", "hund"));
        }
    }
}
