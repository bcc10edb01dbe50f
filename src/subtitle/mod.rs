// Subtitle parsing and cue matching
//
// This module reads subtitle files into an ordered cue list and locates the
// cue (or short run of adjacent cues) containing a given example sentence:
// - srt: SubRip parser
// - ass: Advanced SubStation Alpha parser
// - matcher: normalized containment search over the cue list

pub mod ass;
pub mod matcher;
pub mod srt;

use std::path::Path;

pub use matcher::{CueMatch, Matcher};

use crate::error::{LexiclipError, Result};

/// A timed subtitle entry. `text` carries the primary (matchable) line,
/// `secondary` the translated line when the file is bilingual.
#[derive(Debug, Clone, PartialEq)]
pub struct Cue {
    /// Start time in seconds
    pub start: f64,
    /// End time in seconds
    pub end: f64,
    pub text: String,
    pub secondary: Option<String>,
}

impl Cue {
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// Parse a subtitle file, dispatching on the file extension. Cues are
/// returned ordered by start time.
pub fn parse_subtitle_file<P: AsRef<Path>>(path: P) -> Result<Vec<Cue>> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(LexiclipError::FileNotFound(path.display().to_string()));
    }

    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
        .unwrap_or_default();

    let content = read_lossy(path)?;
    let mut cues = match extension.as_str() {
        "srt" => srt::parse(&content),
        "ass" => ass::parse(&content),
        other => {
            return Err(LexiclipError::UnsupportedFormat(format!(
                "subtitle extension '{}', expected .srt or .ass",
                other
            )));
        }
    };

    cues.sort_by(|a, b| a.start.partial_cmp(&b.start).unwrap_or(std::cmp::Ordering::Equal));
    Ok(cues)
}

// Subtitle files in the wild arrive in whatever encoding the release group
// used; invalid UTF-8 bytes are replaced rather than failing the whole file.
fn read_lossy(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path)?;
    let mut content = String::from_utf8_lossy(&bytes).into_owned();
    if let Some(stripped) = content.strip_prefix('\u{feff}') {
        content = stripped.to_string();
    }
    Ok(content)
}

/// Parse a subtitle timestamp to seconds. Accepts ASS (`0:03:16.55`) and
/// SRT (`00:03:16,550`) layouts.
pub fn parse_timestamp(value: &str) -> Option<f64> {
    let normalized = value.trim().replace(',', ".");
    let parts: Vec<&str> = normalized.split(':').collect();
    if parts.len() != 3 {
        return None;
    }

    let hours: f64 = parts[0].parse().ok()?;
    let minutes: f64 = parts[1].parse().ok()?;
    let seconds: f64 = parts[2].parse().ok()?;
    if hours < 0.0 || minutes >= 60.0 || seconds >= 60.0 {
        return None;
    }

    Some(hours * 3600.0 + minutes * 60.0 + seconds)
}

/// Format seconds as `H:MM:SS:cc` for card captions.
pub fn format_display_timestamp(seconds: f64) -> String {
    let total_centis = (seconds * 100.0).round() as u64;
    let hours = total_centis / 360_000;
    let minutes = (total_centis % 360_000) / 6_000;
    let secs = (total_centis % 6_000) / 100;
    let centis = total_centis % 100;

    format!("{}:{:02}:{:02}:{:02}", hours, minutes, secs, centis)
}

/// True when the text contains CJK ideographs; bilingual subtitles use this
/// to tell the translated line from the primary one.
pub fn contains_cjk(text: &str) -> bool {
    text.chars().any(|c| ('\u{4e00}'..='\u{9fff}').contains(&c))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_timestamp_ass() {
        let parsed = parse_timestamp("0:03:16.55").unwrap();
        assert!((parsed - 196.55).abs() < 1e-9);
        assert_eq!(parse_timestamp("1:00:00.00"), Some(3600.0));
    }

    #[test]
    fn test_parse_timestamp_srt() {
        let parsed = parse_timestamp("00:03:16,550").unwrap();
        assert!((parsed - 196.55).abs() < 1e-9);
    }

    #[test]
    fn test_parse_timestamp_rejects_garbage() {
        assert_eq!(parse_timestamp("16.55"), None);
        assert_eq!(parse_timestamp("0:99:00.00"), None);
        assert_eq!(parse_timestamp("a:b:c"), None);
    }

    #[test]
    fn test_format_display_timestamp() {
        assert_eq!(format_display_timestamp(196.55), "0:03:16:55");
        assert_eq!(format_display_timestamp(0.0), "0:00:00:00");
        assert_eq!(format_display_timestamp(3661.5), "1:01:01:50");
    }

    #[test]
    fn test_contains_cjk() {
        assert!(contains_cjk("我们活在暮光之界"));
        assert!(!contains_cjk("We live in a twilight world."));
    }

    #[test]
    fn test_parse_subtitle_file_dispatch() {
        let mut srt = tempfile::Builder::new().suffix(".srt").tempfile().unwrap();
        write!(
            srt,
            "1\n00:00:01,000 --> 00:00:02,000\nHello there.\n\n"
        )
        .unwrap();
        let cues = parse_subtitle_file(srt.path()).unwrap();
        assert_eq!(cues.len(), 1);
        assert_eq!(cues[0].text, "Hello there.");
    }

    #[test]
    fn test_parse_subtitle_file_unknown_extension() {
        let file = tempfile::Builder::new().suffix(".vtt").tempfile().unwrap();
        assert!(matches!(
            parse_subtitle_file(file.path()),
            Err(crate::error::LexiclipError::UnsupportedFormat(_))
        ));
    }
}
