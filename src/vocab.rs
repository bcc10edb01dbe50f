use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;
use walkdir::WalkDir;

use crate::error::{LexiclipError, Result};

/// One word (or phrase) with its example sentence, in word-list order.
/// `index` is 1-based and disambiguates repeated words in output filenames.
#[derive(Debug, Clone, PartialEq)]
pub struct VocabEntry {
    pub word: String,
    pub sentence: String,
    pub index: usize,
}

impl VocabEntry {
    /// Stem for output clip files: `{sanitized word}_{two-digit index}`.
    pub fn clip_stem(&self) -> String {
        format!("{}_{:02}", sanitize_word(&self.word), self.index)
    }
}

/// A highlighted note exported from the e-reader: `text` is the marked word,
/// `notes` the sentence it was marked in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VocabNote {
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub book_key: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub chapter: String,
    pub text: String,
    pub notes: String,
    #[serde(default)]
    pub book_name: String,
    #[serde(default)]
    pub book_author: String,
}

/// Parse a word-list file: each entry is a word line followed by its example
/// sentence line; blank lines separate nothing in particular and are skipped.
pub fn parse_words_file<P: AsRef<Path>>(path: P) -> Result<Vec<VocabEntry>> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .map_err(|_| LexiclipError::FileNotFound(path.display().to_string()))?;

    let mut entries = Vec::new();
    let mut lines = content.lines().map(str::trim).filter(|l| !l.is_empty());
    while let Some(word) = lines.next() {
        let Some(sentence) = lines.next() else {
            debug!("Word '{}' has no example sentence, dropped", word);
            break;
        };
        entries.push(VocabEntry {
            word: word.to_string(),
            sentence: sentence.to_string(),
            index: entries.len() + 1,
        });
    }

    Ok(entries)
}

/// Find all CSV exports under the source directory, recursively.
pub fn find_csv_files<P: AsRef<Path>>(dir: P) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    if !dir.exists() {
        return Err(LexiclipError::FileNotFound(dir.display().to_string()));
    }

    let mut paths: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .map(|e| e.into_path())
        .filter(|p| {
            p.extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| ext.eq_ignore_ascii_case("csv"))
                .unwrap_or(false)
        })
        .collect();
    paths.sort();
    Ok(paths)
}

/// Read e-reader notes from the given CSV exports. Word and sentence fields
/// are trimmed; rows without a word are dropped.
pub fn read_csv_notes(paths: &[PathBuf]) -> Result<Vec<VocabNote>> {
    let mut notes = Vec::new();
    for path in paths {
        let mut reader = csv::Reader::from_path(path)?;
        for record in reader.deserialize::<VocabNote>() {
            let mut note = record?;
            note.text = note.text.trim().to_string();
            note.notes = note.notes.trim().to_string();
            if note.text.is_empty() {
                continue;
            }
            notes.push(note);
        }
        debug!("Read notes from {}", path.display());
    }
    Ok(notes)
}

/// Reduce a word to a filesystem-safe stem: drop everything but letters,
/// digits, whitespace and dashes, then join with underscores.
pub fn sanitize_word(word: &str) -> String {
    let kept: String = word
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace() || *c == '-')
        .collect();
    kept.split_whitespace().collect::<Vec<_>>().join("_")
}

/// True when a clip for this entry already exists in the directory, matching
/// on the sanitized word regardless of the recorded index.
pub fn clip_exists(entry: &VocabEntry, clip_dir: &Path, extension: &str) -> bool {
    let prefix = format!("{}_", sanitize_word(&entry.word));
    let Ok(dir) = std::fs::read_dir(clip_dir) else {
        return false;
    };
    dir.filter_map(|e| e.ok()).any(|e| {
        let name = e.file_name();
        let Some(name) = name.to_str() else {
            return false;
        };
        name.starts_with(&prefix) && name.ends_with(&format!(".{}", extension))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_words_file_pairs() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            "twilight\nWe live in a twilight world\n\nposterity\nIt's for posterity.\n"
        )
        .unwrap();

        let entries = parse_words_file(file.path()).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].word, "twilight");
        assert_eq!(entries[0].sentence, "We live in a twilight world");
        assert_eq!(entries[0].index, 1);
        assert_eq!(entries[1].index, 2);
    }

    #[test]
    fn test_clip_stem_format() {
        let entry = VocabEntry {
            word: "twilight".to_string(),
            sentence: String::new(),
            index: 1,
        };
        assert_eq!(entry.clip_stem(), "twilight_01");

        let phrase = VocabEntry {
            word: "freeze-dried coffee!".to_string(),
            sentence: String::new(),
            index: 12,
        };
        assert_eq!(phrase.clip_stem(), "freeze-dried_coffee_12");
    }

    #[test]
    fn test_sanitize_word() {
        assert_eq!(sanitize_word("juvenile prison"), "juvenile_prison");
        assert_eq!(sanitize_word("don't"), "dont");
        assert_eq!(sanitize_word("  two   words "), "two_words");
    }

    #[test]
    fn test_read_csv_notes() {
        let dir = tempfile::tempdir().unwrap();
        let csv_path = dir.path().join("KoodoReader-Note.csv");
        std::fs::write(
            &csv_path,
            "key,bookKey,date,chapter,text,notes,bookName,bookAuthor\n\
             1758084501416,1738143464138,2025-09-17,Cover, juvenile prison ,The perpetrator ended up being sent to juvenile prison for it.,Elon Musk,Walter Isaacson\n\
             ,,,,,orphan sentence,,\n",
        )
        .unwrap();

        let notes = read_csv_notes(&[csv_path]).unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].text, "juvenile prison");
        assert_eq!(notes[0].key, "1758084501416");
        assert_eq!(notes[0].book_name, "Elon Musk");
    }

    #[test]
    fn test_find_csv_files_recursive() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("Musk");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(nested.join("notes.csv"), "text,notes\n").unwrap();
        std::fs::write(dir.path().join("readme.txt"), "").unwrap();

        let found = find_csv_files(dir.path()).unwrap();
        assert_eq!(found.len(), 1);
        assert!(found[0].ends_with("notes.csv"));
    }

    #[test]
    fn test_clip_exists_matches_prefix() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("twilight_01.mp3"), []).unwrap();

        let entry = VocabEntry {
            word: "twilight".to_string(),
            sentence: String::new(),
            index: 4,
        };
        assert!(clip_exists(&entry, dir.path(), "mp3"));
        assert!(!clip_exists(&entry, dir.path(), "jpg"));
    }
}
