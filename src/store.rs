//! Dated JSON snapshots of note and word-info lists.
//!
//! Each run persists its state as `YYYY-MM-DD.json` under the backup
//! directory; loading picks the snapshot whose date is closest to today, so
//! a missed day does not orphan the history.

use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::dictionary::WordEntry;
use crate::error::Result;
use crate::vocab::VocabNote;

/// Load the snapshot dated closest to today. A missing directory or an empty
/// one yields an empty list, not an error.
pub fn load_latest_snapshot<T: DeserializeOwned>(dir: &Path) -> Result<Vec<T>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let today = Local::now().date_naive();
    let mut closest: Option<(i64, PathBuf)> = None;

    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let Some(date) = snapshot_date(&path) else {
            continue;
        };
        let distance = (today - date).num_days().abs();
        if closest.as_ref().map(|(d, _)| distance < *d).unwrap_or(true) {
            closest = Some((distance, path));
        }
    }

    let Some((_, path)) = closest else {
        return Ok(Vec::new());
    };

    debug!("Loading snapshot {}", path.display());
    let content = std::fs::read_to_string(&path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Save a snapshot named after today's date, creating the directory as
/// needed. Returns the written path.
pub fn save_snapshot<T: Serialize>(dir: &Path, items: &[T]) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(format!("{}.json", Local::now().date_naive().format("%Y-%m-%d")));
    let content = serde_json::to_string_pretty(items)?;
    std::fs::write(&path, content)?;
    Ok(path)
}

fn snapshot_date(path: &Path) -> Option<NaiveDate> {
    if path.extension().and_then(|e| e.to_str()) != Some("json") {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    NaiveDate::parse_from_str(stem, "%Y-%m-%d").ok()
}

/// Merge two note lists, keeping the first occurrence of each note key.
pub fn merge_notes(old: &[VocabNote], new: &[VocabNote]) -> Vec<VocabNote> {
    let mut seen = std::collections::HashSet::new();
    let mut merged = Vec::new();
    for note in old.iter().chain(new.iter()) {
        if seen.insert(note.key.clone()) {
            merged.push(note.clone());
        }
    }
    merged
}

/// Notes present in `new` whose key does not appear in `old`; these drive
/// the dictionary lookups and Anki imports of the current run.
pub fn diff_new_notes(old: &[VocabNote], new: &[VocabNote]) -> Vec<VocabNote> {
    let old_keys: std::collections::HashSet<&str> =
        old.iter().map(|n| n.key.as_str()).collect();
    new.iter()
        .filter(|n| !old_keys.contains(n.key.as_str()))
        .cloned()
        .collect()
}

/// Merge freshly looked-up word entries into the cumulative info list,
/// keyed by normalized prototype. Sentences are deduplicated; part-of-speech
/// data from the new entry fills empty slots in the old one.
pub fn merge_word_entries(base: &[WordEntry], new: &[WordEntry]) -> Vec<WordEntry> {
    let mut merged: Vec<WordEntry> = base.to_vec();
    let mut index_by_prototype = std::collections::HashMap::new();
    for (index, entry) in merged.iter().enumerate() {
        if let Some(prototype) = entry_prototype(entry) {
            index_by_prototype.entry(prototype).or_insert(index);
        }
    }

    for entry in new {
        let Some(prototype) = entry_prototype(entry) else {
            warn!("Word entry without prototype or sentence, dropped from merge");
            continue;
        };

        match index_by_prototype.get(&prototype) {
            Some(&existing_index) => {
                merge_into(&mut merged[existing_index], entry);
            }
            None => {
                merged.push(entry.clone());
                index_by_prototype.insert(prototype, merged.len() - 1);
            }
        }
    }

    merged
}

fn merge_into(existing: &mut WordEntry, incoming: &WordEntry) {
    let mut seen: std::collections::HashSet<String> = existing
        .sentences
        .iter()
        .map(sentence_identity)
        .collect();
    for sentence in &incoming.sentences {
        if seen.insert(sentence_identity(sentence)) {
            existing.sentences.push(sentence.clone());
        }
    }

    if existing.part_of_speech.is_empty() {
        existing.part_of_speech = incoming.part_of_speech.clone();
        if existing.word_url.is_empty() {
            existing.word_url = incoming.word_url.clone();
        }
        return;
    }

    for pos in &incoming.part_of_speech {
        if let Some(slot) = existing
            .part_of_speech
            .iter_mut()
            .find(|p| p.word_prototype.is_empty())
        {
            *slot = pos.clone();
        } else if !existing.part_of_speech.contains(pos) {
            existing.part_of_speech.push(pos.clone());
        }
    }
}

// A note's key is its stable identity; older exports without keys fall back
// to the sentence text.
fn sentence_identity(note: &VocabNote) -> String {
    if note.key.is_empty() {
        note.notes.clone()
    } else {
        note.key.clone()
    }
}

/// The prototype under which an entry merges: the first non-empty headword,
/// falling back to the first sentence's marked word.
pub fn entry_prototype(entry: &WordEntry) -> Option<String> {
    entry
        .part_of_speech
        .iter()
        .find(|p| !p.word_prototype.is_empty())
        .map(|p| p.word_prototype.clone())
        .or_else(|| {
            entry
                .sentences
                .iter()
                .find(|s| !s.text.is_empty())
                .map(|s| s.text.clone())
        })
        .map(|p| p.trim().to_lowercase())
        .filter(|p| !p.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dictionary::PartOfSpeech;

    fn note(key: &str, text: &str, notes: &str) -> VocabNote {
        VocabNote {
            key: key.to_string(),
            book_key: String::new(),
            date: String::new(),
            chapter: String::new(),
            text: text.to_string(),
            notes: notes.to_string(),
            book_name: String::new(),
            book_author: String::new(),
        }
    }

    fn entry(prototype: &str, sentences: Vec<VocabNote>) -> WordEntry {
        WordEntry {
            word: prototype.to_string(),
            word_url: String::new(),
            part_of_speech: vec![PartOfSpeech {
                word_prototype: prototype.to_string(),
                ..Default::default()
            }],
            sentences,
        }
    }

    #[test]
    fn test_merge_notes_dedupes_by_key() {
        let old = vec![note("1", "twilight", "a")];
        let new = vec![note("1", "twilight", "a"), note("2", "posterity", "b")];
        let merged = merge_notes(&old, &new);
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn test_diff_new_notes() {
        let old = vec![note("1", "twilight", "a")];
        let new = vec![note("1", "twilight", "a"), note("2", "posterity", "b")];
        let fresh = diff_new_notes(&old, &new);
        assert_eq!(fresh.len(), 1);
        assert_eq!(fresh[0].key, "2");
    }

    #[test]
    fn test_merge_word_entries_appends_new_prototype() {
        let base = vec![entry("twilight", vec![note("1", "twilight", "s1")])];
        let new = vec![entry("posterity", vec![note("2", "posterity", "s2")])];
        let merged = merge_word_entries(&base, &new);
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn test_merge_word_entries_merges_sentences() {
        let base = vec![entry("twilight", vec![note("1", "twilight", "s1")])];
        let new = vec![entry("twilight", vec![
            note("1", "twilight", "s1"),
            note("3", "twilight", "s3"),
        ])];
        let merged = merge_word_entries(&base, &new);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].sentences.len(), 2);
    }

    #[test]
    fn test_merge_word_entries_fills_empty_slot() {
        let mut bare = entry("", vec![note("1", "twilight", "s1")]);
        bare.word = "twilight".to_string();
        bare.part_of_speech[0].word_prototype = String::new();
        // An entry whose scrape failed merges under its sentence word; the
        // incoming lookup fills the empty part-of-speech slot.
        let incoming = entry("twilight", vec![]);
        let merged = merge_word_entries(&[bare], &[incoming]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].part_of_speech[0].word_prototype, "twilight");
    }

    #[test]
    fn test_snapshot_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let notes = vec![note("1", "twilight", "s1")];
        let path = save_snapshot(dir.path(), &notes).unwrap();
        assert!(path.exists());

        let loaded: Vec<VocabNote> = load_latest_snapshot(dir.path()).unwrap();
        assert_eq!(loaded, notes);
    }

    #[test]
    fn test_load_latest_snapshot_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        let loaded: Vec<VocabNote> = load_latest_snapshot(&missing).unwrap();
        assert!(loaded.is_empty());
    }

    #[test]
    fn test_load_latest_snapshot_picks_closest_date() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("2000-01-01.json"), "[]").unwrap();
        let recent = save_snapshot(dir.path(), &[note("9", "w", "s")]).unwrap();
        assert!(recent.exists());

        let loaded: Vec<VocabNote> = load_latest_snapshot(dir.path()).unwrap();
        assert_eq!(loaded.len(), 1);
    }
}
