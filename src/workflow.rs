use std::collections::HashMap;
use std::path::Path;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use crate::analysis;
use crate::anki::{self, AnkiClient};
use crate::config::{Config, MediaConfig, ResolvedProject};
use crate::dictionary::{DictionaryFactory, DictionaryProvider, PartOfSpeech, WordEntry};
use crate::error::{LexiclipError, Result};
use crate::media::{ClipExtractorFactory, ClipExtractorTrait, TimeSpan};
use crate::store;
use crate::subtitle::{parse_subtitle_file, Cue, Matcher};
use crate::vocab::{self, VocabEntry, VocabNote};

pub struct Workflow {
    config: Config,
    dictionary: Box<dyn DictionaryProvider>,
    anki: AnkiClient,
    matcher: Matcher,
}

impl Workflow {
    pub fn new(config: Config) -> Self {
        let dictionary = DictionaryFactory::create_provider(config.dictionary.clone());
        let anki = AnkiClient::new(config.anki.clone());
        let matcher = Matcher::new(config.matcher.window);

        Self {
            config,
            dictionary,
            anki,
            matcher,
        }
    }

    /// Import e-reader notes: read every CSV export, keep the notes not seen
    /// in the latest snapshot, look each one up, push the results into Anki,
    /// and save the updated snapshots.
    pub async fn run_vocab_import(&self) -> Result<()> {
        self.anki.check_availability().await?;
        self.anki
            .ensure_model_and_deck(&self.config.vocab.deck_name)
            .await?;

        let csv_paths = vocab::find_csv_files(&self.config.vocab.source_dir)?;
        info!("Found {} CSV export(s)", csv_paths.len());
        let notes = vocab::read_csv_notes(&csv_paths)?;

        let notes_dir = self.config.vocab.backup_dir.join("notes");
        let info_dir = self.config.vocab.backup_dir.join("info");

        let old_notes: Vec<VocabNote> = store::load_latest_snapshot(&notes_dir)?;
        let all_notes = store::merge_notes(&old_notes, &notes);
        let new_notes = store::diff_new_notes(&old_notes, &notes);
        info!(
            "{} note(s) total, {} new since last snapshot",
            all_notes.len(),
            new_notes.len()
        );

        let old_entries: Vec<WordEntry> = store::load_latest_snapshot(&info_dir)?;

        let progress = word_progress(new_notes.len() as u64);
        let mut new_entries = Vec::new();
        for note in &new_notes {
            progress.set_message(note.text.clone());
            match self.lookup_note(note).await {
                Ok(entry) => new_entries.push(entry),
                Err(e) => warn!("Lookup failed for '{}': {}", note.text, e),
            }
            progress.inc(1);
        }
        progress.finish_and_clear();

        let merged_entries = store::merge_word_entries(&old_entries, &new_entries);
        info!(
            "old entries: {}, new entries: {}, merged: {}",
            old_entries.len(),
            new_entries.len(),
            merged_entries.len()
        );

        let mut imported = 0usize;
        let mut failed = 0usize;
        for entry in &new_entries {
            let fields = anki::build_note_fields(entry);
            let prototype = entry.prototype().to_string();
            match self
                .anki
                .upsert_word_note(&self.config.vocab.deck_name, &prototype, fields, &[])
                .await
            {
                Ok(_) => imported += 1,
                Err(e) => {
                    warn!("Import failed for '{}': {}", prototype, e);
                    failed += 1;
                }
            }
        }

        store::save_snapshot(&notes_dir, &all_notes)?;
        store::save_snapshot(&info_dir, &merged_entries)?;

        info!("Import finished: {} succeeded, {} failed", imported, failed);
        Ok(())
    }

    async fn lookup_note(&self, note: &VocabNote) -> Result<WordEntry> {
        let lookup_form = analysis::analyze(&note.notes, &note.text)
            .map(|a| a.lookup_form().to_string())
            .unwrap_or_else(|| note.text.clone());

        let mut entry = self.dictionary.lookup(&lookup_form).await?;
        entry.sentences.push(note.clone());
        Ok(entry)
    }

    /// Process a movie project: match each listed word's sentence against
    /// the subtitles, cut its clip and screenshot, and build or extend the
    /// word's note in the movie deck.
    pub async fn run_movie(&self, project: Option<&str>) -> Result<()> {
        let project = self.config.resolve_project(project)?;
        info!("Processing project '{}'", project.name);

        let extractor = self.extractor_for_run().await?;
        extractor.check_availability()?;
        if !project.video_path.exists() {
            return Err(LexiclipError::FileNotFound(
                project.video_path.display().to_string(),
            ));
        }

        self.anki.check_availability().await?;
        self.anki
            .ensure_model_and_deck(&self.config.movie.deck_name)
            .await?;

        let entries = vocab::parse_words_file(&project.words_file)?;
        info!("Found {} word(s)", entries.len());
        let cues = parse_subtitle_file(&project.subtitle_file)?;
        info!("Found {} cue(s)", cues.len());

        std::fs::create_dir_all(&project.clip_dir)?;
        let pending: Vec<&VocabEntry> = entries
            .iter()
            .filter(|entry| !vocab::clip_exists(entry, &project.clip_dir, "mp3"))
            .collect();
        if pending.is_empty() {
            info!("All words already have clips, nothing to do");
            return Ok(());
        }
        info!("{} new word(s) to process", pending.len());

        let progress = word_progress(pending.len() as u64);
        let mut succeeded = 0usize;
        let mut failed = 0usize;
        for entry in pending {
            progress.set_message(entry.word.clone());
            match self
                .process_movie_word(entry, &cues, &project, extractor.as_ref())
                .await
            {
                Ok(()) => succeeded += 1,
                Err(e) => {
                    warn!("Skipping '{}': {}", entry.word, e);
                    failed += 1;
                }
            }
            progress.inc(1);
        }
        progress.finish_and_clear();

        info!(
            "Project '{}' finished: {} succeeded, {} failed",
            project.name, succeeded, failed
        );
        Ok(())
    }

    async fn process_movie_word(
        &self,
        entry: &VocabEntry,
        cues: &[Cue],
        project: &ResolvedProject,
        extractor: &dyn ClipExtractorTrait,
    ) -> Result<()> {
        let matched = self
            .matcher
            .find(cues, &entry.sentence, Some(&entry.word))
            .ok_or_else(|| {
                LexiclipError::Subtitle(format!("no cue matches \"{}\"", entry.sentence))
            })?;
        info!(
            "Matched '{}' at {:.2}s..{:.2}s ({:.2}s)",
            entry.word,
            matched.start,
            matched.end,
            matched.duration()
        );

        let span = TimeSpan::new(matched.start, matched.end)?;
        let stem = entry.clip_stem();
        let audio_path = project.clip_dir.join(format!("{}.mp3", stem));
        let image_path = project.clip_dir.join(format!("{}.jpg", stem));

        extractor
            .extract_audio_clip(&project.video_path, span, &audio_path)
            .await?;

        // Delay the frame slightly so the on-screen subtitle is visible.
        let mut screenshot_time = span.start + self.config.media.screenshot_offset;
        if screenshot_time > span.end {
            screenshot_time = span.start;
        }
        extractor
            .extract_screenshot(&project.video_path, screenshot_time, &image_path)
            .await?;

        let word_analysis = analysis::analyze(&entry.sentence, &entry.word);
        let lookup_form = word_analysis
            .as_ref()
            .map(|a| a.lookup_form().to_string())
            .unwrap_or_else(|| entry.word.clone());

        let mut dictionary_entry = self.dictionary.lookup(&lookup_form).await?;
        if !dictionary_entry.has_content() {
            // Keep the card importable with what the analyzer knows.
            dictionary_entry = WordEntry {
                word: lookup_form.clone(),
                word_url: String::new(),
                part_of_speech: vec![PartOfSpeech {
                    pos_type: word_analysis
                        .map(|a| a.tag.label().to_string())
                        .unwrap_or_default(),
                    word_prototype: lookup_form.clone(),
                    ..Default::default()
                }],
                sentences: Vec::new(),
            };
        }

        let audio_filename = format!("{}.mp3", stem);
        let image_filename = format!("{}.jpg", stem);
        self.anki
            .store_media_file(&image_path, &image_filename)
            .await?;
        self.anki
            .store_media_file(&audio_path, &audio_filename)
            .await?;

        let mut fields = anki::build_note_fields(&dictionary_entry);
        append_field(
            &mut fields,
            anki::FIELD_EXAMPLES,
            &anki::build_media_example(
                &image_filename,
                &audio_filename,
                &entry.sentence,
                matched.secondary.as_deref(),
                &project.name,
                matched.start,
            ),
        );
        append_field(
            &mut fields,
            anki::FIELD_BLANKED_EXAMPLES,
            &anki::build_blanked_example(&entry.sentence, &entry.word),
        );

        let prototype = dictionary_entry.prototype().to_string();
        let tags = vec![project.name.to_lowercase()];
        self.anki
            .upsert_word_note(&self.config.movie.deck_name, &prototype, fields, &tags)
            .await?;

        Ok(())
    }

    /// Match and extract clips without touching Anki.
    pub async fn run_extract(
        &self,
        words_file: &Path,
        subtitle_file: &Path,
        video_path: &Path,
        output_dir: &Path,
    ) -> Result<()> {
        let extractor = self.extractor_for_run().await?;
        extractor.check_availability()?;
        if !video_path.exists() {
            return Err(LexiclipError::FileNotFound(
                video_path.display().to_string(),
            ));
        }

        let entries = vocab::parse_words_file(words_file)?;
        let cues = parse_subtitle_file(subtitle_file)?;
        info!("Found {} word(s) and {} cue(s)", entries.len(), cues.len());
        std::fs::create_dir_all(output_dir)?;

        let mut succeeded = 0usize;
        let mut failed = 0usize;
        for entry in &entries {
            let Some(matched) = self
                .matcher
                .find(&cues, &entry.sentence, Some(&entry.word))
            else {
                warn!("No cue matches \"{}\"", entry.sentence);
                failed += 1;
                continue;
            };

            let result = async {
                let span = TimeSpan::new(matched.start, matched.end)?;
                let stem = entry.clip_stem();
                extractor
                    .extract_audio_clip(
                        video_path,
                        span,
                        &output_dir.join(format!("{}.mp3", stem)),
                    )
                    .await?;

                let mut screenshot_time = span.start + self.config.media.screenshot_offset;
                if screenshot_time > span.end {
                    screenshot_time = span.start;
                }
                extractor
                    .extract_screenshot(
                        video_path,
                        screenshot_time,
                        &output_dir.join(format!("{}.jpg", stem)),
                    )
                    .await
            }
            .await;

            match result {
                Ok(()) => succeeded += 1,
                Err(e) => {
                    warn!("Extraction failed for '{}': {}", entry.word, e);
                    failed += 1;
                }
            }
        }

        info!("Extraction finished: {} succeeded, {} failed", succeeded, failed);
        Ok(())
    }

    /// Look up a single word, for inspection from the command line.
    pub async fn lookup_word(&self, word: &str) -> Result<WordEntry> {
        self.dictionary.lookup(word).await
    }

    /// Build the extractor for this run. When normalization toward a
    /// reference audio file is configured, its measured loudness replaces
    /// the configured target.
    async fn extractor_for_run(&self) -> Result<Box<dyn ClipExtractorTrait>> {
        let mut media_config: MediaConfig = self.config.media.clone();

        if media_config.normalize_volume {
            if let Some(reference) = media_config.reference_audio.clone() {
                let probe = ClipExtractorFactory::create_extractor(media_config.clone());
                match probe.measure_loudness(&reference).await {
                    Ok(Some(lufs)) => {
                        info!("Reference audio loudness: {:.2} LUFS", lufs);
                        media_config.target_lufs = lufs;
                    }
                    Ok(None) => warn!(
                        "Could not measure reference audio {}, using {} LUFS",
                        reference.display(),
                        media_config.target_lufs
                    ),
                    Err(e) => warn!(
                        "Reference audio {} unusable ({}), using {} LUFS",
                        reference.display(),
                        e,
                        media_config.target_lufs
                    ),
                }
            }
        }

        Ok(ClipExtractorFactory::create_extractor(media_config))
    }
}

fn append_field(fields: &mut HashMap<String, String>, field: &str, html: &str) {
    fields
        .entry(field.to_string())
        .and_modify(|value| value.push_str(html))
        .or_insert_with(|| html.to_string());
}

fn word_progress(len: u64) -> ProgressBar {
    let progress = ProgressBar::new(len);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );
    progress
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_field_concatenates() {
        let mut fields = HashMap::from([("Examples".to_string(), "<div>a</div>".to_string())]);
        append_field(&mut fields, "Examples", "<div>b</div>");
        assert_eq!(fields["Examples"], "<div>a</div><div>b</div>");

        append_field(&mut fields, "Blanked_Examples", "<div>c</div>");
        assert_eq!(fields["Blanked_Examples"], "<div>c</div>");
    }
}
