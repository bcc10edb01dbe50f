use tracing::debug;

use super::Cue;

/// A matched time range within the cue list.
#[derive(Debug, Clone, PartialEq)]
pub struct CueMatch {
    /// Start time in seconds
    pub start: f64,
    /// End time in seconds
    pub end: f64,
    /// Primary text of the matched cue(s)
    pub text: String,
    /// Translated line of the matched cue(s), when present
    pub secondary: Option<String>,
    /// Inclusive range of cue indices covered by the match
    pub span: (usize, usize),
}

impl CueMatch {
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// Finds the cue containing an example sentence.
///
/// Comparison happens on normalized text (lowercased, punctuation stripped).
/// A sentence that was split across consecutive cues is found by
/// concatenating up to `window` adjacent cues. The first match wins; a failed
/// match is a `None`, reported by the caller, never an error.
pub struct Matcher {
    window: usize,
}

impl Matcher {
    pub fn new(window: usize) -> Self {
        Self {
            window: window.max(1),
        }
    }

    pub fn find(&self, cues: &[Cue], sentence: &str, word: Option<&str>) -> Option<CueMatch> {
        let sentence_clean = normalize(sentence);
        if sentence_clean.is_empty() || cues.is_empty() {
            return None;
        }
        let word_clean = word.map(normalize).filter(|w| !w.is_empty());

        // Pass 1: single-cue containment in either direction, the common case.
        for (index, cue) in cues.iter().enumerate() {
            let cue_clean = normalize(&cue.text);
            if cue_clean.is_empty() {
                continue;
            }
            if !cue_clean.contains(&sentence_clean) && !sentence_clean.contains(&cue_clean) {
                continue;
            }
            if let Some(word_clean) = &word_clean {
                if !cue_clean.contains(word_clean.as_str()) {
                    continue;
                }
            }
            return Some(Self::match_from_span(cues, index, index));
        }

        // Pass 2: the sentence spans adjacent cues; widen the window until the
        // concatenated text contains it.
        for width in 2..=self.window {
            for start_index in 0..cues.len().saturating_sub(width - 1) {
                let end_index = start_index + width - 1;
                let joined = cues[start_index..=end_index]
                    .iter()
                    .map(|c| normalize(&c.text))
                    .filter(|t| !t.is_empty())
                    .collect::<Vec<_>>()
                    .join(" ");
                if joined.is_empty() || !joined.contains(&sentence_clean) {
                    continue;
                }
                if let Some(word_clean) = &word_clean {
                    if !joined.contains(word_clean.as_str()) {
                        continue;
                    }
                }
                debug!(
                    "Sentence matched across {} cues ({}..={})",
                    width, start_index, end_index
                );
                return Some(Self::match_from_span(cues, start_index, end_index));
            }
        }

        None
    }

    fn match_from_span(cues: &[Cue], start_index: usize, end_index: usize) -> CueMatch {
        let text = cues[start_index..=end_index]
            .iter()
            .map(|c| c.text.trim())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        let secondary = {
            let joined = cues[start_index..=end_index]
                .iter()
                .filter_map(|c| c.secondary.as_deref())
                .collect::<Vec<_>>()
                .join(" ");
            if joined.is_empty() { None } else { Some(joined) }
        };

        CueMatch {
            start: cues[start_index].start,
            end: cues[end_index].end,
            text,
            secondary,
            span: (start_index, end_index),
        }
    }
}

/// Lowercase and strip everything but letters, digits and whitespace, then
/// collapse runs of whitespace. Mirrors the cleanup applied to both sides of
/// every comparison.
pub fn normalize(text: &str) -> String {
    let lowered = text.to_lowercase();
    let kept: String = lowered
        .chars()
        .map(|c| {
            if c.is_alphanumeric() {
                c
            } else {
                ' '
            }
        })
        .collect();
    kept.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cue(start: f64, end: f64, text: &str) -> Cue {
        Cue {
            start,
            end,
            text: text.to_string(),
            secondary: None,
        }
    }

    #[test]
    fn test_normalize() {
        assert_eq!(
            normalize("We live in a twilight world."),
            "we live in a twilight world"
        );
        assert_eq!(normalize("  Don't--stop!  "), "don t stop");
        assert_eq!(normalize("..."), "");
    }

    #[test]
    fn test_verbatim_sentence_returns_exact_range() {
        let cues = vec![
            cue(100.0, 102.0, "No small talk."),
            cue(196.55, 198.17, "We live in a twilight world."),
            cue(200.0, 203.0, "And there are no friends at dusk."),
        ];
        let matched = Matcher::new(3)
            .find(&cues, "We live in a twilight world", None)
            .unwrap();
        assert!((matched.start - 196.55).abs() < 1e-9);
        assert!((matched.end - 198.17).abs() < 1e-9);
        assert!((matched.duration() - 1.62).abs() < 1e-3);
        assert_eq!(matched.span, (1, 1));
    }

    #[test]
    fn test_no_match_returns_none() {
        let cues = vec![cue(0.0, 1.0, "Unrelated line.")];
        assert!(Matcher::new(3)
            .find(&cues, "We live in a twilight world", None)
            .is_none());
    }

    #[test]
    fn test_empty_sentence_returns_none() {
        let cues = vec![cue(0.0, 1.0, "Some line.")];
        assert!(Matcher::new(3).find(&cues, "  ...  ", None).is_none());
    }

    #[test]
    fn test_punctuation_and_case_insensitive() {
        let cues = vec![cue(5.0, 7.0, "WE LIVE... in a twilight world!")];
        let matched = Matcher::new(3)
            .find(&cues, "we live in a twilight world", None)
            .unwrap();
        assert_eq!(matched.span, (0, 0));
    }

    #[test]
    fn test_word_filter_rejects_cue_without_word() {
        let cues = vec![
            cue(1.0, 2.0, "We live in a world."),
            cue(3.0, 4.0, "We live in a twilight world."),
        ];
        // Both cues are substring-compatible with the sentence; the word
        // filter picks the one actually containing the target.
        let matched = Matcher::new(3)
            .find(&cues, "We live in a twilight world", Some("twilight"))
            .unwrap();
        assert_eq!(matched.span, (1, 1));
    }

    #[test]
    fn test_sentence_spanning_adjacent_cues() {
        let cues = vec![
            cue(10.0, 11.5, "All I have for you"),
            cue(11.5, 13.0, "is a word: Tenet."),
        ];
        let matched = Matcher::new(3)
            .find(&cues, "All I have for you is a word", None)
            .unwrap();
        assert_eq!(matched.span, (0, 1));
        assert!((matched.start - 10.0).abs() < 1e-9);
        assert!((matched.end - 13.0).abs() < 1e-9);
    }

    #[test]
    fn test_window_limit_respected() {
        let cues = vec![
            cue(0.0, 1.0, "One"),
            cue(1.0, 2.0, "two"),
            cue(2.0, 3.0, "three"),
            cue(3.0, 4.0, "four"),
        ];
        assert!(Matcher::new(2).find(&cues, "one two three four", None).is_none());
        assert!(Matcher::new(4).find(&cues, "one two three four", None).is_some());
    }

    #[test]
    fn test_first_match_wins() {
        let cues = vec![
            cue(1.0, 2.0, "We live in a twilight world."),
            cue(8.0, 9.0, "We live in a twilight world."),
        ];
        let matched = Matcher::new(3)
            .find(&cues, "We live in a twilight world", None)
            .unwrap();
        assert_eq!(matched.span, (0, 0));
    }

    #[test]
    fn test_secondary_text_carried_through() {
        let cues = vec![Cue {
            start: 196.55,
            end: 198.17,
            text: "We live in a twilight world.".to_string(),
            secondary: Some("我们活在暮光之界".to_string()),
        }];
        let matched = Matcher::new(3)
            .find(&cues, "We live in a twilight world", None)
            .unwrap();
        assert_eq!(matched.secondary.as_deref(), Some("我们活在暮光之界"));
    }
}
