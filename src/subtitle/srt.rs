use once_cell::sync::Lazy;
use regex::Regex;

use super::{contains_cjk, parse_timestamp, Cue};

static TIMING_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d{1,2}:\d{2}:\d{2}[,.]\d{1,3})\s*-->\s*(\d{1,2}:\d{2}:\d{2}[,.]\d{1,3})")
        .expect("SRT timing regex is valid")
});

static HTML_TAG_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<[^>]+>").expect("HTML tag regex is valid"));

/// Parse SubRip content into cues. Blocks are delimited by blank lines:
/// index, timing line, then one or more text lines. CJK lines become the
/// secondary text, everything else joins into the primary text.
pub fn parse(content: &str) -> Vec<Cue> {
    let mut cues = Vec::new();

    for block in content.split("\n\n").map(str::trim).filter(|b| !b.is_empty()) {
        let mut lines = block.lines().map(str::trim).filter(|l| !l.is_empty());

        let timing = loop {
            match lines.next() {
                Some(line) => {
                    if let Some(captures) = TIMING_REGEX.captures(line) {
                        break Some(captures);
                    }
                    // Index lines and stray text before the timing line are skipped.
                }
                None => break None,
            }
        };
        let Some(timing) = timing else { continue };

        let (Some(start), Some(end)) = (
            parse_timestamp(&timing[1]),
            parse_timestamp(&timing[2]),
        ) else {
            continue;
        };

        let mut primary = String::new();
        let mut secondary = String::new();
        for line in lines {
            let line = HTML_TAG_REGEX.replace_all(line, "");
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let target = if contains_cjk(line) {
                &mut secondary
            } else {
                &mut primary
            };
            if !target.is_empty() {
                target.push(' ');
            }
            target.push_str(line);
        }

        if primary.is_empty() && secondary.is_empty() {
            continue;
        }

        cues.push(Cue {
            start,
            end,
            text: primary,
            secondary: if secondary.is_empty() {
                None
            } else {
                Some(secondary)
            },
        });
    }

    cues
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_basic_block() {
        let content = "1\n00:00:01,000 --> 00:00:02,500\nHello there.\n\n\
                       2\n00:00:03,000 --> 00:00:04,000\nGeneral Kenobi!\n";
        let cues = parse(content);
        assert_eq!(cues.len(), 2);
        assert_eq!(cues[0].text, "Hello there.");
        assert!((cues[0].start - 1.0).abs() < 1e-9);
        assert!((cues[0].end - 2.5).abs() < 1e-9);
        assert_eq!(cues[0].secondary, None);
    }

    #[test]
    fn test_parse_bilingual_block() {
        let content = "12\n00:03:16,550 --> 00:03:18,170\n我们活在暮光之界\nWe live in a twilight world.\n";
        let cues = parse(content);
        assert_eq!(cues.len(), 1);
        assert_eq!(cues[0].text, "We live in a twilight world.");
        assert_eq!(cues[0].secondary.as_deref(), Some("我们活在暮光之界"));
    }

    #[test]
    fn test_parse_strips_html_tags() {
        let content = "1\n00:00:01,000 --> 00:00:02,000\n<i>Whispered</i> words\n";
        let cues = parse(content);
        assert_eq!(cues[0].text, "Whispered words");
    }

    #[test]
    fn test_parse_multiline_text_joined() {
        let content = "1\n00:00:01,000 --> 00:00:02,000\nFirst half\nsecond half\n";
        let cues = parse(content);
        assert_eq!(cues[0].text, "First half second half");
    }

    #[test]
    fn test_parse_skips_malformed_blocks() {
        let content = "not a cue\n\n1\n00:00:01,000 --> 00:00:02,000\nReal cue\n";
        let cues = parse(content);
        assert_eq!(cues.len(), 1);
        assert_eq!(cues[0].text, "Real cue");
    }
}
