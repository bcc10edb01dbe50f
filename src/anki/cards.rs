use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Value};

use crate::dictionary::WordEntry;
use crate::subtitle::format_display_timestamp;

pub const FIELD_WORD: &str = "Word";
pub const FIELD_PRONUNCIATION: &str = "Pronunciation";
pub const FIELD_DEFINITION: &str = "Definition";
pub const FIELD_POS_DEFINITIONS: &str = "POS_Definitions";
pub const FIELD_EXAMPLES: &str = "Examples";
pub const FIELD_BLANKED_EXAMPLES: &str = "Blanked_Examples";
pub const FIELD_TAGS: &str = "Tags";

pub const FIELD_NAMES: &[&str] = &[
    FIELD_WORD,
    FIELD_PRONUNCIATION,
    FIELD_DEFINITION,
    FIELD_POS_DEFINITIONS,
    FIELD_EXAMPLES,
    FIELD_BLANKED_EXAMPLES,
    FIELD_TAGS,
];

pub const MODEL_CSS: &str = r#"
.card { font-family: Arial, "Helvetica Neue", Helvetica, sans-serif; font-size: 16px; text-align: left; color: #111; background: white; line-height: 1.5; padding: 12px; }
.word-header { font-size: 34px; text-align: center; margin: 8px 0 12px 0; font-weight: 600; }
.pos-block, .definition-block { margin-bottom: 12px; font-size: 16px; }
.pos-title { font-size: 18px; font-weight: 600; margin-bottom: 4px; }
.definition-en { font-size: 15px; }
.definition-ch { color: #555; font-size: 14px; }
.example { margin-top: 10px; padding: 8px 12px; border-radius: 8px; background: #f7f7f7; line-height: 1.5; border: 1px solid #eee; }
.example-text { font-size: 16px; margin-bottom: 6px; }
.example-meta { color: #666; font-size: 13px; text-align: right; }
.example-text strong { font-weight: 700; color: #0066cc; }
hr { margin: 15px 0; }

input[type=text] { font-family: inherit; font-size: 20px; text-align: center; border: 1px solid #ccc; border-radius: 5px; padding: 8px; margin-top: 20px; width: 90%; display: block; margin-left: auto; margin-right: auto; }

.nightMode .card { color: #f0f0f0; background: #272828; }
.nightMode .definition-ch, .nightMode .example-meta { color: #aaa; }
.nightMode .example-text strong { color: #5db0ff; }
.nightMode .example { background: #3a3a3a; border: 1px solid #4f4f4f; }
.nightMode input[type=text] { background-color: #333; color: #eee; border-color: #555; }
"#;

/// The two card layouts of the note model: a plain front/back card and a
/// typing card quizzing the word against its blanked examples.
pub fn card_templates() -> Value {
    json!([
        {
            "Name": "Basic",
            "Front": "{{Word}}<hr>{{#Examples}}{{Examples}}{{/Examples}}",
            "Back": "{{FrontSide}}<hr><div class='word-header'>{{Word}}</div><div class='definition-block'>{{Definition}}</div><div class='pos-block'>{{Pronunciation}}</div><div style='margin-top:20px;'><b>Examples:</b>{{Examples}}</div>"
        },
        {
            "Name": "Type",
            "Front": "{{Definition}}<div style='margin-top:20px;'>{{Blanked_Examples}}</div>{{type:Word}}",
            "Back": "<div class='word-header'>{{Word}}</div><hr><div class='definition-block'>{{Definition}}</div><div class='pos-block'>{{Pronunciation}}</div><div style='margin-top:20px;'><b>Examples:</b>{{Examples}}</div>"
        }
    ])
}

/// Escape text for embedding into note field HTML.
pub fn html_escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            other => escaped.push(other),
        }
    }
    escaped
}

fn word_pattern(word: &str) -> Option<Regex> {
    let escaped = regex::escape(word.trim());
    if escaped.is_empty() {
        return None;
    }
    // Multi-word phrases match without boundaries; single words are anchored
    // so "sent" does not hit "consented".
    let pattern = if word.contains(' ') {
        format!("(?i){}", escaped)
    } else {
        format!(r"(?i)\b{}\b", escaped)
    };
    Regex::new(&pattern).ok()
}

/// Wrap occurrences of the target word in `<strong>`, escaping everything.
pub fn highlight_word(sentence: &str, word: &str) -> String {
    let escaped_sentence = html_escape(sentence);
    let Some(pattern) = word_pattern(&html_escape(word)) else {
        return escaped_sentence;
    };
    pattern
        .replace_all(&escaped_sentence, "<strong>$0</strong>")
        .into_owned()
}

/// Replace the target word's letters and digits with underscores, keeping
/// punctuation, then escape.
pub fn blank_word(sentence: &str, word: &str) -> String {
    let Some(pattern) = word_pattern(word) else {
        return html_escape(sentence);
    };
    let blanked = pattern.replace_all(sentence, |captures: &regex::Captures| {
        captures[0]
            .chars()
            .map(|c| if c.is_alphanumeric() { '_' } else { c })
            .collect::<String>()
    });
    html_escape(&blanked)
}

/// Build all note fields for a word entry. Examples come from the entry's
/// collected sentences, highlighted and blanked per sentence.
pub fn build_note_fields(entry: &WordEntry) -> HashMap<String, String> {
    let mut pronunciation_parts = Vec::new();
    let mut definition_parts = Vec::new();
    let mut pos_parts = Vec::new();

    for pos in &entry.part_of_speech {
        let title = if pos.pos_type.is_empty() {
            String::new()
        } else {
            format!("<div class='pos-title'>{}</div>", html_escape(&capitalize(&pos.pos_type)))
        };

        let uk = &pos.pronunciation_uk;
        let us = &pos.pronunciation_us;
        if !uk.phonetic.is_empty() || !us.phonetic.is_empty() {
            pronunciation_parts.push(format!(
                "<div>{}UK: {} | US: {}</div>",
                title,
                html_escape(&uk.phonetic),
                html_escape(&us.phonetic)
            ));
        }

        if !pos.definitions.is_empty() {
            let mut block = vec![title.clone(), "<ul>".to_string()];
            for definition in &pos.definitions {
                block.push(format!(
                    "<li><div class='definition-en'>{}</div><div class='definition-ch'>{}</div></li>",
                    html_escape(definition.en_meaning.trim()),
                    html_escape(definition.ch_meaning.trim())
                ));
            }
            block.push("</ul>".to_string());
            definition_parts.push(block.concat());
        }

        pos_parts.push(build_pos_block(pos, &title));
    }

    let mut examples_parts = Vec::new();
    let mut blanked_parts = Vec::new();
    for sentence in &entry.sentences {
        if sentence.notes.is_empty() {
            continue;
        }
        let target = if sentence.text.is_empty() {
            entry.word.as_str()
        } else {
            sentence.text.as_str()
        };
        let meta = if sentence.book_name.is_empty() {
            String::new()
        } else {
            format!(" — 《{}》", html_escape(&sentence.book_name))
        };
        examples_parts.push(format!(
            "<div class='example'><div class='example-text'>{}</div><div class='example-meta'>{}</div></div>",
            highlight_word(&sentence.notes, target),
            meta
        ));
        blanked_parts.push(format!(
            "<div class='example'><div class='example-text'>{}</div><div class='example-meta'>{}</div></div>",
            blank_word(&sentence.notes, target),
            meta
        ));
    }

    let tag = if entry.prototype().contains(' ') {
        "phrase"
    } else {
        "word"
    };

    HashMap::from([
        (FIELD_WORD.to_string(), entry.prototype().to_string()),
        (FIELD_PRONUNCIATION.to_string(), pronunciation_parts.join("\n")),
        (FIELD_DEFINITION.to_string(), definition_parts.join("\n")),
        (FIELD_POS_DEFINITIONS.to_string(), pos_parts.join("\n")),
        (FIELD_EXAMPLES.to_string(), examples_parts.join("\n")),
        (FIELD_BLANKED_EXAMPLES.to_string(), blanked_parts.join("\n")),
        (FIELD_TAGS.to_string(), tag.to_string()),
    ])
}

fn build_pos_block(pos: &crate::dictionary::PartOfSpeech, title: &str) -> String {
    let mut lines = vec![title.to_string()];

    for (label, pron) in [("UK", &pos.pronunciation_uk), ("US", &pos.pronunciation_us)] {
        if pron.phonetic.is_empty() && pron.pron_url.is_empty() {
            continue;
        }
        let mut row = format!("{}: {}", label, html_escape(&pron.phonetic));
        if !pron.pron_url.is_empty() {
            row.push_str(&format!(
                " <audio controls src=\"{}\"></audio>",
                html_escape(&pron.pron_url)
            ));
        }
        lines.push(format!("<div class='audio-row'>{}</div>", row));
    }

    if !pos.definitions.is_empty() {
        lines.push("<ul>".to_string());
        for definition in &pos.definitions {
            lines.push(format!(
                "<li><div class='definition-en'>{}</div><div class='definition-ch'>{}</div></li>",
                html_escape(definition.en_meaning.trim()),
                html_escape(definition.ch_meaning.trim())
            ));
        }
        lines.push("</ul>".to_string());
    }

    if !pos.phrases.is_empty() {
        lines.push("<div><b>Phrases:</b><ul>".to_string());
        for (index, phrase) in pos.phrases.iter().enumerate() {
            let definition = pos.phrase_definitions.get(index);
            let en = definition.map(|d| d.en_meaning.trim()).unwrap_or_default();
            let ch = definition.map(|d| d.ch_meaning.trim()).unwrap_or_default();
            lines.push(format!(
                "<li><span class='phrase'>{}</span> — <span class='definition-en'>{}</span><div class='definition-ch'>{}</div></li>",
                html_escape(phrase),
                html_escape(en),
                html_escape(ch)
            ));
        }
        lines.push("</ul></div>".to_string());
    }

    format!("<div>{}</div>", lines.join("\n"))
}

/// An example block for a movie word: the screenshot plays the clip when
/// clicked, captioned with the sentence, its translation, and the source.
pub fn build_media_example(
    image_filename: &str,
    audio_filename: &str,
    sentence: &str,
    translation: Option<&str>,
    source_name: &str,
    timestamp: f64,
) -> String {
    let escaped_sentence = html_escape(sentence);
    let meta = format!(
        " — 《{}》 {}",
        html_escape(source_name),
        format_display_timestamp(timestamp)
    );
    let audio_id: String = image_filename
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect();

    let translation_html = translation
        .filter(|t| !t.is_empty())
        .map(|t| {
            format!(
                "<div class=\"definition-ch\" style=\"text-align: center; margin-top: 5px;\">{}</div>",
                html_escape(t)
            )
        })
        .unwrap_or_default();

    format!(
        "<div class='example'>\
         <div style=\"text-align: center; margin: 15px 0;\">\
         <a href=\"javascript:void(0);\" onclick=\"(function() {{ \
         var el = document.getElementById('audio-{audio_id}'); \
         if (!el) {{ el = document.createElement('audio'); el.id = 'audio-{audio_id}'; \
         el.src = '{audio}'; document.body.appendChild(el); }} el.play(); }})(); return false;\">\
         <img src=\"{image}\" style=\"max-width: 100%; cursor: pointer; border: 2px solid #ddd; border-radius: 8px;\" />\
         </a></div>\
         <div class='example-text' style=\"text-align: center; margin-top: 10px;\">{sentence}</div>\
         {translation}\
         <div class='example-meta'>{meta}</div>\
         </div>",
        audio_id = audio_id,
        audio = audio_filename,
        image = image_filename,
        sentence = escaped_sentence,
        translation = translation_html,
        meta = meta,
    )
}

/// A blanked example block carrying only the sentence with the target word
/// struck out; used alongside `build_media_example`.
pub fn build_blanked_example(sentence: &str, word: &str) -> String {
    format!(
        "<div class='example'><div class='example-text'>{}</div></div>",
        blank_word(sentence, word)
    )
}

static FIRST_LETTER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z]").expect("valid regex"));

fn capitalize(text: &str) -> String {
    FIRST_LETTER
        .replace(text, |captures: &regex::Captures| {
            captures[0].to_uppercase()
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dictionary::{Definition, PartOfSpeech};
    use crate::vocab::VocabNote;

    fn sample_entry() -> WordEntry {
        WordEntry {
            word: "twilight".to_string(),
            word_url: String::new(),
            part_of_speech: vec![PartOfSpeech {
                pos_type: "noun".to_string(),
                word_prototype: "twilight".to_string(),
                definitions: vec![Definition {
                    en_meaning: "the period just before dark".to_string(),
                    ch_meaning: "暮色".to_string(),
                }],
                ..Default::default()
            }],
            sentences: vec![VocabNote {
                key: "1".to_string(),
                book_key: String::new(),
                date: String::new(),
                chapter: String::new(),
                text: "twilight".to_string(),
                notes: "We live in a twilight world.".to_string(),
                book_name: "Tenet".to_string(),
                book_author: String::new(),
            }],
        }
    }

    #[test]
    fn test_html_escape() {
        assert_eq!(html_escape("a < b & c"), "a &lt; b &amp; c");
        assert_eq!(html_escape("\"it's\""), "&quot;it&#x27;s&quot;");
    }

    #[test]
    fn test_highlight_word_boundaries() {
        let highlighted = highlight_word("We live in a twilight world.", "twilight");
        assert!(highlighted.contains("<strong>twilight</strong>"));

        let no_hit = highlight_word("He consented quietly.", "sent");
        assert!(!no_hit.contains("<strong>"));
    }

    #[test]
    fn test_highlight_is_case_insensitive() {
        let highlighted = highlight_word("Twilight falls.", "twilight");
        assert!(highlighted.contains("<strong>Twilight</strong>"));
    }

    #[test]
    fn test_blank_word_keeps_punctuation() {
        assert_eq!(
            blank_word("We live in a twilight world.", "twilight"),
            "We live in a ________ world."
        );
        assert_eq!(
            blank_word("It's freeze-dried.", "freeze-dried"),
            "It&#x27;s ______-_____."
        );
    }

    #[test]
    fn test_blank_phrase_without_boundaries() {
        assert_eq!(
            blank_word("Sent to juvenile prison for it.", "juvenile prison"),
            "Sent to ________ ______ for it."
        );
    }

    #[test]
    fn test_build_note_fields() {
        let fields = build_note_fields(&sample_entry());
        assert_eq!(fields[FIELD_WORD], "twilight");
        assert_eq!(fields[FIELD_TAGS], "word");
        assert!(fields[FIELD_DEFINITION].contains("暮色"));
        assert!(fields[FIELD_EXAMPLES].contains("<strong>twilight</strong>"));
        assert!(fields[FIELD_EXAMPLES].contains("《Tenet》"));
        assert!(fields[FIELD_BLANKED_EXAMPLES].contains("________ world"));
    }

    #[test]
    fn test_phrase_entry_tagged_as_phrase() {
        let mut entry = sample_entry();
        entry.part_of_speech[0].word_prototype = "juvenile prison".to_string();
        let fields = build_note_fields(&entry);
        assert_eq!(fields[FIELD_TAGS], "phrase");
    }

    #[test]
    fn test_build_media_example() {
        let html = build_media_example(
            "twilight_01.jpg",
            "twilight_01.mp3",
            "We live in a twilight world.",
            Some("我们活在暮光之界"),
            "Tenet",
            196.55,
        );
        assert!(html.contains("twilight_01.jpg"));
        assert!(html.contains("twilight_01.mp3"));
        assert!(html.contains("0:03:16:55"));
        assert!(html.contains("我们活在暮光之界"));
        assert!(html.contains("audio-twilight01jpg"));
    }

    #[test]
    fn test_templates_reference_known_fields() {
        let templates = card_templates();
        let reference = Regex::new(r"\{\{(?:type:|#|/)?([A-Za-z_]+)\}\}").unwrap();
        for template in templates.as_array().unwrap() {
            for side in ["Front", "Back"] {
                let text = template[side].as_str().unwrap();
                for captures in reference.captures_iter(text) {
                    let field = &captures[1];
                    assert!(
                        field == "FrontSide" || FIELD_NAMES.contains(&field),
                        "template references unknown field {}",
                        field
                    );
                }
            }
        }
    }
}
