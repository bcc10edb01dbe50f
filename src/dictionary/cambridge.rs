use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use reqwest::Client;
use scraper::{CaseSensitivity, ElementRef, Html, Selector};
use tracing::{debug, warn};

use crate::config::DictionaryConfig;
use crate::error::{LexiclipError, Result};
use super::{Definition, DictionaryProvider, PartOfSpeech, Pronunciation, WordEntry};

static ENTRY_BODY: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".entry-body__el").expect("valid selector"));
static IDIOM_BODY: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".di-body").expect("valid selector"));
static HEADWORD: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".headword.dhw, .headword").expect("valid selector"));
static HEADWORD_BOLD: Lazy<Selector> = Lazy::new(|| Selector::parse("b").expect("valid selector"));
static POSGRAM: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".posgram.dpos-g, .pos.dpos").expect("valid selector"));
static PRON_UK: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".uk.dpron-i").expect("valid selector"));
static PRON_US: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".us.dpron-i").expect("valid selector"));
static PHONETIC: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".pron.dpron").expect("valid selector"));
static AUDIO_SOURCE: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"audio source[type="audio/mpeg"]"#).expect("valid selector"));
static DEF_BLOCK: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div.def-block.ddef_block").expect("valid selector"));
static DEF_EN: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".def.ddef_d.db, .def.ddef_d").expect("valid selector"));
static DEF_TRANS_PRIMARY: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".trans.dtrans.dtrans-se").expect("valid selector"));
static DEF_TRANS_ANY: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".trans.dtrans").expect("valid selector"));
static PHRASE_BLOCK: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".phrase-block.dphrase-block").expect("valid selector"));
static PHRASE_TITLE: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(".phrase-head.dphrase_h .phrase-title").expect("valid selector")
});

/// Dictionary provider scraping Cambridge Dictionary entry pages. The
/// bilingual page is tried first, the monolingual page as fallback; a word
/// the site does not know yields a placeholder entry rather than an error.
pub struct CambridgeDictionary {
    client: Client,
    config: DictionaryConfig,
}

impl CambridgeDictionary {
    pub fn new(config: DictionaryConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(&config.user_agent)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self { client, config }
    }

    fn entry_urls(&self, word: &str) -> Vec<String> {
        let slug = urlencoding::encode(&word.trim().replace(' ', "-")).into_owned();
        vec![
            format!(
                "{}/dictionary/english-chinese-simplified/{}",
                self.config.base_url, slug
            ),
            format!("{}/dictionary/english/{}", self.config.base_url, slug),
        ]
    }

    async fn fetch_html(&self, url: &str) -> Result<Option<String>> {
        debug!("Fetching dictionary page: {}", url);
        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!("Dictionary request failed for {}: {}", url, e);
                return Ok(None);
            }
        };

        if !response.status().is_success() {
            debug!("Dictionary page {} returned {}", url, response.status());
            return Ok(None);
        }

        let html = response.text().await.map_err(|e| {
            LexiclipError::Dictionary(format!("Failed to read page body from {}: {}", url, e))
        })?;
        if self.config.request_delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.config.request_delay_ms)).await;
        }
        Ok(Some(html))
    }

    fn parse_page(&self, html: &str, url: &str, word: &str) -> WordEntry {
        let document = Html::parse_document(html);
        let mut entry = WordEntry {
            word: word.to_string(),
            word_url: url.to_string(),
            part_of_speech: Vec::new(),
            sentences: Vec::new(),
        };

        for element in document.select(&ENTRY_BODY) {
            let pos = self.parse_entry_body(element);
            if pos.has_content() {
                entry.part_of_speech.push(pos);
            }
        }

        // Idiom pages lack entry bodies and carry a reduced block layout.
        if entry.part_of_speech.is_empty() {
            for element in document.select(&IDIOM_BODY) {
                let pos = self.parse_idiom_block(element);
                if pos.has_content() {
                    entry.part_of_speech.push(pos);
                }
            }
        }

        entry
    }

    fn parse_entry_body(&self, element: ElementRef) -> PartOfSpeech {
        let mut pos = PartOfSpeech {
            word_prototype: element
                .select(&HEADWORD)
                .next()
                .map(collapsed_text)
                .unwrap_or_default(),
            pos_type: element
                .select(&POSGRAM)
                .next()
                .map(collapsed_text)
                .unwrap_or_default(),
            ..Default::default()
        };

        pos.pronunciation_uk = self.parse_pronunciation(element, &PRON_UK);
        pos.pronunciation_us = self.parse_pronunciation(element, &PRON_US);

        for def_block in element.select(&DEF_BLOCK) {
            if has_ancestor_class(def_block, "phrase-block") {
                continue;
            }
            pos.definitions.push(self.parse_definition(def_block));
        }

        for phrase_block in element.select(&PHRASE_BLOCK) {
            let title = phrase_block
                .select(&PHRASE_TITLE)
                .next()
                .map(collapsed_text)
                .unwrap_or_default();
            if title.is_empty() {
                continue;
            }
            pos.phrases.push(title);

            for def_block in phrase_block.select(&DEF_BLOCK) {
                pos.phrase_definitions.push(self.parse_definition(def_block));
            }
        }

        pos
    }

    fn parse_idiom_block(&self, element: ElementRef) -> PartOfSpeech {
        let word_prototype = element
            .select(&HEADWORD)
            .next()
            .map(|headword| {
                headword
                    .select(&HEADWORD_BOLD)
                    .next()
                    .map(collapsed_text)
                    .unwrap_or_else(|| collapsed_text(headword))
            })
            .unwrap_or_default();

        let mut pos = PartOfSpeech {
            word_prototype,
            pos_type: element
                .select(&POSGRAM)
                .next()
                .map(collapsed_text)
                .unwrap_or_default(),
            ..Default::default()
        };

        for def_block in element.select(&DEF_BLOCK) {
            if has_ancestor_class(def_block, "phrase-block") {
                continue;
            }
            pos.definitions.push(self.parse_definition(def_block));
        }

        pos
    }

    fn parse_pronunciation(&self, element: ElementRef, region: &Selector) -> Pronunciation {
        let Some(block) = element.select(region).next() else {
            return Pronunciation::default();
        };

        let phonetic = block
            .select(&PHONETIC)
            .next()
            .map(collapsed_text)
            .unwrap_or_default();
        let pron_url = block
            .select(&AUDIO_SOURCE)
            .next()
            .and_then(|source| source.value().attr("src"))
            .map(|src| self.absolute_audio_url(src))
            .unwrap_or_default();

        Pronunciation { phonetic, pron_url }
    }

    fn parse_definition(&self, def_block: ElementRef) -> Definition {
        let en_meaning = def_block
            .select(&DEF_EN)
            .next()
            .map(collapsed_text)
            .unwrap_or_default();

        // Prefer the sense-level translation; anything nested in an .hdb
        // wrapper is a secondary variant.
        let ch_meaning = def_block
            .select(&DEF_TRANS_PRIMARY)
            .filter(|t| !has_ancestor_class(*t, "hdb"))
            .map(collapsed_text)
            .find(|t| !t.is_empty())
            .or_else(|| {
                def_block
                    .select(&DEF_TRANS_ANY)
                    .map(collapsed_text)
                    .find(|t| !t.is_empty())
            })
            .unwrap_or_default();

        Definition {
            en_meaning,
            ch_meaning,
        }
    }

    fn absolute_audio_url(&self, src: &str) -> String {
        if src.starts_with("http://") || src.starts_with("https://") {
            src.to_string()
        } else {
            format!("{}{}", self.config.base_url, src)
        }
    }
}

#[async_trait]
impl DictionaryProvider for CambridgeDictionary {
    async fn lookup(&self, word: &str) -> Result<WordEntry> {
        for url in self.entry_urls(word) {
            let Some(html) = self.fetch_html(&url).await? else {
                continue;
            };
            let entry = self.parse_page(&html, &url, word);
            if entry.has_content() {
                return Ok(entry);
            }
        }

        warn!("No dictionary entry found for '{}'", word);
        Ok(WordEntry::placeholder(word))
    }

    async fn lookup_url(&self, url: &str) -> Result<WordEntry> {
        let Some(html) = self.fetch_html(url).await? else {
            return Ok(WordEntry::placeholder(""));
        };
        Ok(self.parse_page(&html, url, ""))
    }
}

fn collapsed_text(element: ElementRef) -> String {
    element
        .text()
        .collect::<Vec<_>>()
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn has_ancestor_class(element: ElementRef, class: &str) -> bool {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .any(|ancestor| {
            ancestor
                .value()
                .has_class(class, CaseSensitivity::CaseSensitive)
        })
}
