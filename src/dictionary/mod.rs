// Dictionary lookups over a scraped dictionary site
//
// This module turns a word (or an entry page URL) into a structured
// `WordEntry`: headword, part-of-speech blocks, pronunciation, bilingual
// definitions and phrases. The JSON field names stay camelCase so the
// snapshot files remain hand-readable next to the exports they mirror.

pub mod cambridge;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use cambridge::CambridgeDictionary;

use crate::config::DictionaryConfig;
use crate::error::Result;
use crate::vocab::VocabNote;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WordEntry {
    #[serde(default)]
    pub word: String,
    #[serde(default)]
    pub word_url: String,
    #[serde(default)]
    pub part_of_speech: Vec<PartOfSpeech>,
    #[serde(default)]
    pub sentences: Vec<VocabNote>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartOfSpeech {
    /// Part-of-speech label, e.g. "noun" or "verb"
    #[serde(rename = "type", default)]
    pub pos_type: String,
    #[serde(default)]
    pub word_prototype: String,
    #[serde(rename = "pronunciationUK", default)]
    pub pronunciation_uk: Pronunciation,
    #[serde(rename = "pronunciationUS", default)]
    pub pronunciation_us: Pronunciation,
    #[serde(default)]
    pub definitions: Vec<Definition>,
    #[serde(default)]
    pub phrases: Vec<String>,
    #[serde(default)]
    pub phrase_definitions: Vec<Definition>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pronunciation {
    #[serde(default)]
    pub phonetic: String,
    #[serde(default)]
    pub pron_url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Definition {
    #[serde(default)]
    pub en_meaning: String,
    #[serde(default)]
    pub ch_meaning: String,
}

impl WordEntry {
    /// A lookup that found nothing; keeps the word importable with a single
    /// empty part-of-speech slot for a later merge to fill.
    pub fn placeholder(word: &str) -> Self {
        Self {
            word: word.to_string(),
            word_url: String::new(),
            part_of_speech: vec![PartOfSpeech::default()],
            sentences: Vec::new(),
        }
    }

    /// The headword under which the entry files in the deck.
    pub fn prototype(&self) -> &str {
        self.part_of_speech
            .iter()
            .map(|p| p.word_prototype.as_str())
            .find(|p| !p.is_empty())
            .unwrap_or(self.word.as_str())
    }

    /// True when at least one block carries real content.
    pub fn has_content(&self) -> bool {
        self.part_of_speech.iter().any(|p| {
            !p.word_prototype.is_empty() || !p.definitions.is_empty() || !p.phrases.is_empty()
        })
    }
}

impl PartOfSpeech {
    pub fn has_content(&self) -> bool {
        !self.word_prototype.is_empty() || !self.definitions.is_empty() || !self.phrases.is_empty()
    }
}

/// Main trait for dictionary lookup operations
#[async_trait]
pub trait DictionaryProvider: Send + Sync {
    /// Look up a word, trying the provider's page variants in order
    async fn lookup(&self, word: &str) -> Result<WordEntry>;

    /// Parse a specific entry page URL
    async fn lookup_url(&self, url: &str) -> Result<WordEntry>;
}

/// Factory for creating dictionary provider instances
pub struct DictionaryFactory;

impl DictionaryFactory {
    /// Create the default provider implementation (Cambridge-based)
    pub fn create_provider(config: DictionaryConfig) -> Box<dyn DictionaryProvider> {
        Box::new(CambridgeDictionary::new(config))
    }
}
