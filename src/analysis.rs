//! Lightweight grammatical analysis of a target word inside its example
//! sentence: part-of-speech guessing from context and suffix cues, and verb
//! lemmatization (irregular table plus suffix rules). The dictionary is
//! queried with the lemma for verbs and the surface form otherwise, so an
//! inflected highlight like "sent" still lands on the right entry page.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PosTag {
    Noun,
    Verb,
    Adjective,
    Adverb,
    Other,
}

impl PosTag {
    pub fn label(&self) -> &'static str {
        match self {
            PosTag::Noun => "noun",
            PosTag::Verb => "verb",
            PosTag::Adjective => "adjective",
            PosTag::Adverb => "adverb",
            PosTag::Other => "",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WordAnalysis {
    /// The word as it appears in the sentence
    pub surface: String,
    /// Base form; equals the surface form unless a verb rule applied
    pub lemma: String,
    pub tag: PosTag,
}

impl WordAnalysis {
    /// The form to look up in the dictionary: the lemma for verbs, the
    /// surface form for everything else.
    pub fn lookup_form(&self) -> &str {
        if self.tag == PosTag::Verb {
            &self.lemma
        } else {
            &self.surface
        }
    }
}

static IRREGULAR_VERBS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    [
        ("was", "be"), ("were", "be"), ("been", "be"), ("is", "be"), ("are", "be"), ("am", "be"),
        ("began", "begin"), ("begun", "begin"),
        ("bought", "buy"), ("brought", "bring"), ("built", "build"),
        ("came", "come"), ("caught", "catch"), ("chose", "choose"),
        ("did", "do"), ("done", "do"), ("drew", "draw"), ("drove", "drive"),
        ("ate", "eat"), ("eaten", "eat"),
        ("fell", "fall"), ("felt", "feel"), ("fought", "fight"), ("flew", "fly"),
        ("forgot", "forget"), ("found", "find"), ("froze", "freeze"),
        ("gave", "give"), ("given", "give"), ("got", "get"), ("gotten", "get"),
        ("went", "go"), ("gone", "go"), ("grew", "grow"),
        ("had", "have"), ("has", "have"), ("heard", "hear"), ("held", "hold"), ("hid", "hide"),
        ("kept", "keep"), ("knew", "know"), ("known", "know"),
        ("laid", "lay"), ("lay", "lie"), ("led", "lead"), ("left", "leave"), ("lent", "lend"),
        ("lost", "lose"),
        ("made", "make"), ("meant", "mean"), ("met", "meet"),
        ("paid", "pay"),
        ("ran", "run"), ("rose", "rise"),
        ("said", "say"), ("sat", "sit"), ("saw", "see"), ("seen", "see"),
        ("sent", "send"), ("shot", "shoot"), ("sold", "sell"), ("sought", "seek"),
        ("spent", "spend"), ("spoke", "speak"), ("stood", "stand"), ("stole", "steal"),
        ("swam", "swim"),
        ("taught", "teach"), ("thought", "think"), ("threw", "throw"),
        ("told", "tell"), ("took", "take"), ("taken", "take"),
        ("understood", "understand"),
        ("woke", "wake"), ("wore", "wear"), ("won", "win"), ("wrote", "write"),
    ]
    .into_iter()
    .collect()
});

const DETERMINERS: &[&str] = &[
    "a", "an", "the", "this", "that", "these", "those", "my", "your", "his", "her", "its", "our",
    "their", "some", "any", "no", "every", "each",
];

const AUXILIARIES: &[&str] = &[
    "will", "would", "can", "could", "shall", "should", "may", "might", "must", "do", "does",
    "did", "don't", "doesn't", "didn't", "won't", "wouldn't", "can't", "couldn't", "shouldn't",
    "to", "i", "you", "we", "they", "he", "she", "it",
];

/// Locate the target word in the sentence and analyze it. Returns `None`
/// when the word does not occur (for instance when the list entry is a
/// multi-word phrase, which is looked up verbatim instead).
pub fn analyze(sentence: &str, target: &str) -> Option<WordAnalysis> {
    let target_lower = target.trim().to_lowercase();
    if target_lower.is_empty() || target_lower.contains(char::is_whitespace) {
        return None;
    }

    let tokens: Vec<String> = sentence
        .split_whitespace()
        .map(|t| t.trim_matches(|c: char| !c.is_alphanumeric() && c != '\'' && c != '-'))
        .filter(|t| !t.is_empty())
        .map(|t| t.to_string())
        .collect();

    let position = tokens
        .iter()
        .position(|t| t.to_lowercase() == target_lower)?;

    let surface = tokens[position].to_lowercase();
    let previous = position
        .checked_sub(1)
        .map(|i| tokens[i].to_lowercase());

    let tag = guess_tag(&surface, previous.as_deref());
    let lemma = if tag == PosTag::Verb {
        lemmatize_verb(&surface)
    } else {
        surface.clone()
    };

    debug!("Analyzed '{}': {:?}, lemma '{}'", surface, tag, lemma);

    Some(WordAnalysis {
        surface,
        lemma,
        tag,
    })
}

fn guess_tag(word: &str, previous: Option<&str>) -> PosTag {
    if IRREGULAR_VERBS.contains_key(word) {
        return PosTag::Verb;
    }

    if let Some(previous) = previous {
        if AUXILIARIES.contains(&previous) {
            return PosTag::Verb;
        }
        if DETERMINERS.contains(&previous) {
            if word.ends_with("ly") {
                return PosTag::Adverb;
            }
            return PosTag::Noun;
        }
    }

    if word.ends_with("ly") {
        return PosTag::Adverb;
    }
    if word.ends_with("ing") || word.ends_with("ed") {
        return PosTag::Verb;
    }
    if word.ends_with("tion")
        || word.ends_with("sion")
        || word.ends_with("ness")
        || word.ends_with("ment")
        || word.ends_with("ity")
    {
        return PosTag::Noun;
    }
    if word.ends_with("ous")
        || word.ends_with("ful")
        || word.ends_with("ive")
        || word.ends_with("able")
        || word.ends_with("ible")
    {
        return PosTag::Adjective;
    }

    PosTag::Noun
}

/// Strip inflection suffixes from a verb. The output feeds a dictionary
/// lookup, which tolerates near misses through its fallback page.
pub fn lemmatize_verb(word: &str) -> String {
    if let Some(base) = IRREGULAR_VERBS.get(word) {
        return (*base).to_string();
    }

    if let Some(stem) = word.strip_suffix("ies") {
        if !stem.is_empty() {
            return format!("{}y", stem);
        }
    }
    if let Some(stem) = word.strip_suffix("ied") {
        if !stem.is_empty() {
            return format!("{}y", stem);
        }
    }
    if let Some(stem) = word.strip_suffix("ing") {
        if stem.len() >= 2 {
            return undouble_or_restore(stem);
        }
    }
    if let Some(stem) = word.strip_suffix("ed") {
        if stem.len() >= 2 {
            return undouble_or_restore(stem);
        }
    }
    if let Some(stem) = word.strip_suffix("es") {
        if stem.ends_with("sh")
            || stem.ends_with("ch")
            || stem.ends_with('s')
            || stem.ends_with('x')
            || stem.ends_with('z')
            || stem.ends_with('o')
        {
            return stem.to_string();
        }
    }
    if let Some(stem) = word.strip_suffix('s') {
        if stem.len() >= 2 && !stem.ends_with('s') {
            return stem.to_string();
        }
    }

    word.to_string()
}

// "stopped" -> "stop", "lived" -> "live", "walked" -> "walk"
fn undouble_or_restore(stem: &str) -> String {
    let chars: Vec<char> = stem.chars().collect();
    let len = chars.len();

    if len >= 2 && chars[len - 1] == chars[len - 2] && !matches!(chars[len - 1], 'l' | 's' | 'z')
    {
        return chars[..len - 1].iter().collect();
    }

    // Consonant clusters like "liv" or "believ" lost a trailing 'e'.
    if len >= 2 {
        let last = chars[len - 1];
        let second_last = chars[len - 2];
        let is_vowel = |c: char| matches!(c, 'a' | 'e' | 'i' | 'o' | 'u');
        if matches!(last, 'v' | 'c' | 'g' | 'z') && !is_vowel(second_last) {
            return format!("{}e", stem);
        }
        if matches!(last, 'v' | 'c' | 's' | 'z' | 'g') && is_vowel(second_last) && second_last != 'e'
        {
            return format!("{}e", stem);
        }
    }

    stem.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analyze_finds_verb_and_lemma() {
        let analysis = analyze("The perpetrator ended up being sent to juvenile prison.", "sent")
            .unwrap();
        assert_eq!(analysis.tag, PosTag::Verb);
        assert_eq!(analysis.lemma, "send");
        assert_eq!(analysis.lookup_form(), "send");
    }

    #[test]
    fn test_analyze_noun_keeps_surface() {
        let analysis = analyze("We live in a twilight world.", "twilight").unwrap();
        assert_eq!(analysis.tag, PosTag::Noun);
        assert_eq!(analysis.lookup_form(), "twilight");
    }

    #[test]
    fn test_analyze_missing_word() {
        assert!(analyze("We live in a twilight world.", "posterity").is_none());
    }

    #[test]
    fn test_analyze_rejects_phrases() {
        assert!(analyze("He went to juvenile prison.", "juvenile prison").is_none());
    }

    #[test]
    fn test_analyze_strips_punctuation() {
        let analysis = analyze("\"We live in a twilight world,\" he said.", "world").unwrap();
        assert_eq!(analysis.surface, "world");
    }

    #[test]
    fn test_lemmatize_regular_forms() {
        assert_eq!(lemmatize_verb("walked"), "walk");
        assert_eq!(lemmatize_verb("stopped"), "stop");
        assert_eq!(lemmatize_verb("lived"), "live");
        assert_eq!(lemmatize_verb("carries"), "carry");
        assert_eq!(lemmatize_verb("tried"), "try");
        assert_eq!(lemmatize_verb("watches"), "watch");
        assert_eq!(lemmatize_verb("runs"), "run");
    }

    #[test]
    fn test_lemmatize_irregular_forms() {
        assert_eq!(lemmatize_verb("went"), "go");
        assert_eq!(lemmatize_verb("thought"), "think");
        assert_eq!(lemmatize_verb("sent"), "send");
    }

    #[test]
    fn test_verb_after_auxiliary() {
        let analysis = analyze("They will invert the entropy.", "invert").unwrap();
        assert_eq!(analysis.tag, PosTag::Verb);
    }

    #[test]
    fn test_noun_after_determiner() {
        let analysis = analyze("Hand me the detonator.", "detonator").unwrap();
        assert_eq!(analysis.tag, PosTag::Noun);
    }
}
