use once_cell::sync::Lazy;
use regex::Regex;

use super::{contains_cjk, parse_timestamp, Cue};

static STYLE_TAG_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{[^}]*\}").expect("ASS style tag regex is valid"));

/// Parse Advanced SubStation Alpha content into cues.
///
/// Only `Dialogue:` event lines are read. The standard event layout packs the
/// text into the tenth comma-separated field; bilingual releases separate the
/// translated and original lines with `\N`, and inline `{...}` override tags
/// are stripped.
pub fn parse(content: &str) -> Vec<Cue> {
    let mut cues = Vec::new();

    for line in content.lines() {
        let Some(event) = line.trim().strip_prefix("Dialogue:") else {
            continue;
        };

        let fields: Vec<&str> = event.splitn(10, ',').collect();
        if fields.len() < 10 {
            continue;
        }

        let (Some(start), Some(end)) = (parse_timestamp(fields[1]), parse_timestamp(fields[2]))
        else {
            continue;
        };

        let raw_text = fields[9].trim();
        let (first, rest) = match raw_text.split_once(r"\N") {
            Some((first, rest)) => (first, Some(rest)),
            None => (raw_text, None),
        };

        let first = strip_style_tags(first);
        let rest = rest.map(|r| strip_style_tags(r));

        // Bilingual layout puts the translation above the original line. A
        // monolingual event carries the text in the first (only) part.
        let (text, secondary) = match rest {
            Some(rest) if !rest.is_empty() => (rest, Some(first).filter(|s| !s.is_empty())),
            _ => {
                if contains_cjk(&first) {
                    (String::new(), Some(first).filter(|s| !s.is_empty()))
                } else {
                    (first, None)
                }
            }
        };

        if text.is_empty() && secondary.is_none() {
            continue;
        }

        cues.push(Cue {
            start,
            end,
            text,
            secondary,
        });
    }

    cues
}

fn strip_style_tags(text: &str) -> String {
    STYLE_TAG_REGEX.replace_all(text, "").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const BILINGUAL_LINE: &str = r"Dialogue: 0,0:03:16.55,0:03:18.17,Default,NTP,0,0,0,,我们活在暮光之界\N{\fn微软雅黑}{\b0}{\fs14}{\3c&H202020&}{\shad1}We live in a twilight world.";

    #[test]
    fn test_parse_bilingual_dialogue() {
        let cues = parse(BILINGUAL_LINE);
        assert_eq!(cues.len(), 1);
        let cue = &cues[0];
        assert!((cue.start - 196.55).abs() < 1e-9);
        assert!((cue.end - 198.17).abs() < 1e-9);
        assert_eq!(cue.text, "We live in a twilight world.");
        assert_eq!(cue.secondary.as_deref(), Some("我们活在暮光之界"));
    }

    #[test]
    fn test_parse_monolingual_dialogue() {
        let line = r"Dialogue: 0,0:00:05.00,0:00:07.00,Default,,0,0,0,,No small talk.";
        let cues = parse(line);
        assert_eq!(cues.len(), 1);
        assert_eq!(cues[0].text, "No small talk.");
        assert_eq!(cues[0].secondary, None);
    }

    #[test]
    fn test_parse_strips_style_tags() {
        let line = r"Dialogue: 0,0:00:05.00,0:00:07.00,Default,,0,0,0,,{\i1}Inverted{\i0} entropy";
        let cues = parse(line);
        assert_eq!(cues[0].text, "Inverted entropy");
    }

    #[test]
    fn test_parse_ignores_non_dialogue_lines() {
        let content = "[Script Info]\nTitle: Tenet\n\n[Events]\nFormat: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text\n";
        assert!(parse(content).is_empty());
    }

    #[test]
    fn test_parse_text_with_commas_preserved() {
        let line = r"Dialogue: 0,0:00:05.00,0:00:07.00,Default,,0,0,0,,Well, that, too, happened.";
        let cues = parse(line);
        assert_eq!(cues[0].text, "Well, that, too, happened.");
    }
}
