use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::{LexiclipError, Result};

fn default_match_window() -> usize {
    3
}

fn default_request_delay_ms() -> u64 {
    500
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub anki: AnkiConfig,
    pub dictionary: DictionaryConfig,
    pub media: MediaConfig,
    pub matcher: MatcherConfig,
    pub vocab: VocabConfig,
    pub movie: MovieConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnkiConfig {
    /// AnkiConnect endpoint URL
    pub endpoint: String,
    /// Note model (note type) name
    pub model_name: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DictionaryConfig {
    /// Dictionary site base URL
    pub base_url: String,
    /// User agent sent with page requests
    pub user_agent: String,
    /// Delay between page requests in milliseconds
    #[serde(default = "default_request_delay_ms")]
    pub request_delay_ms: u64,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    /// Path to ffmpeg binary
    pub binary_path: String,
    /// Audio bitrate for extracted clips
    pub audio_bitrate: String,
    /// Audio sample rate for extracted clips
    pub audio_sample_rate: u32,
    /// Seconds appended after the cue end so clips do not cut off mid-word
    pub end_padding: f64,
    /// Seconds after cue start at which the screenshot frame is taken
    pub screenshot_offset: f64,
    /// Normalize clip loudness with the loudnorm filter
    pub normalize_volume: bool,
    /// Reference audio whose measured LUFS becomes the normalization target
    pub reference_audio: Option<PathBuf>,
    /// Fallback LUFS target when no reference audio is configured
    pub target_lufs: f64,
    /// Hardware acceleration: "auto", "none", or an accelerator name
    pub hwaccel: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatcherConfig {
    /// Maximum number of adjacent cues concatenated when a sentence spans cues
    #[serde(default = "default_match_window")]
    pub window: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VocabConfig {
    /// Directory scanned recursively for e-reader CSV note exports
    pub source_dir: PathBuf,
    /// Directory holding dated note/info snapshots
    pub backup_dir: PathBuf,
    /// Target deck for imported words
    pub deck_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovieConfig {
    /// Target deck for movie words
    pub deck_name: String,
    /// Project used when none is given on the command line
    pub default_project: Option<String>,
    /// Named movie projects
    #[serde(default)]
    pub projects: BTreeMap<String, ProjectConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Directory containing the word list and subtitle file
    pub project_dir: PathBuf,
    /// Source video file
    pub video_path: PathBuf,
}

/// Project paths resolved against the filesystem.
#[derive(Debug, Clone)]
pub struct ResolvedProject {
    pub name: String,
    pub words_file: PathBuf,
    pub subtitle_file: PathBuf,
    pub video_path: PathBuf,
    pub clip_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            anki: AnkiConfig {
                endpoint: "http://localhost:8765".to_string(),
                model_name: "WordType".to_string(),
                timeout_secs: 5,
            },
            dictionary: DictionaryConfig {
                base_url: "https://dictionary.cambridge.org".to_string(),
                user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
                             AppleWebKit/537.36 (KHTML, like Gecko) \
                             Chrome/100.0.4896.127 Safari/537.36"
                    .to_string(),
                request_delay_ms: default_request_delay_ms(),
                timeout_secs: 10,
            },
            media: MediaConfig {
                binary_path: "ffmpeg".to_string(),
                audio_bitrate: "192k".to_string(),
                audio_sample_rate: 44100,
                end_padding: 0.5,
                screenshot_offset: 0.5,
                normalize_volume: true,
                reference_audio: None,
                target_lufs: -23.0,
                hwaccel: "auto".to_string(),
            },
            matcher: MatcherConfig {
                window: default_match_window(),
            },
            vocab: VocabConfig {
                source_dir: PathBuf::from("data/source"),
                backup_dir: PathBuf::from("data/backup"),
                deck_name: "CambridgeDeck".to_string(),
            },
            movie: MovieConfig {
                deck_name: "Media".to_string(),
                default_project: None,
                projects: BTreeMap::new(),
            },
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| LexiclipError::Config(format!("Failed to read config file: {}", e)))?;

        serde_json::from_str(&content)
            .map_err(|e| LexiclipError::Config(format!("Failed to parse config file: {}", e)))
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;

        std::fs::write(path, content)
            .map_err(|e| LexiclipError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Resolve a movie project by name, falling back to the configured default
    /// and then to the first project. The word list and subtitle file are
    /// discovered inside the project directory; clips land in an `audio`
    /// directory next to the subtitle file.
    pub fn resolve_project(&self, name: Option<&str>) -> Result<ResolvedProject> {
        let name = name
            .map(|n| n.to_string())
            .or_else(|| self.movie.default_project.clone())
            .or_else(|| self.movie.projects.keys().next().cloned())
            .ok_or_else(|| LexiclipError::Config("No movie projects configured".to_string()))?;

        let project = self.movie.projects.get(&name).ok_or_else(|| {
            LexiclipError::Config(format!("Project '{}' not found in configuration", name))
        })?;

        if !project.project_dir.is_dir() {
            return Err(LexiclipError::FileNotFound(
                project.project_dir.display().to_string(),
            ));
        }

        let words_file = find_file_with_extension(&project.project_dir, &["txt"])?.ok_or_else(
            || {
                LexiclipError::Config(format!(
                    "No word list (.txt) found in {}",
                    project.project_dir.display()
                ))
            },
        )?;
        let subtitle_file = find_file_with_extension(&project.project_dir, &["ass", "srt"])?
            .ok_or_else(|| {
                LexiclipError::Config(format!(
                    "No subtitle file (.ass or .srt) found in {}",
                    project.project_dir.display()
                ))
            })?;

        let clip_dir = subtitle_file
            .parent()
            .unwrap_or(&project.project_dir)
            .join("audio");

        Ok(ResolvedProject {
            name,
            words_file,
            subtitle_file,
            video_path: project.video_path.clone(),
            clip_dir,
        })
    }
}

fn find_file_with_extension(dir: &Path, extensions: &[&str]) -> Result<Option<PathBuf>> {
    let mut entries: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| extensions.contains(&ext.to_lowercase().as_str()))
                .unwrap_or(false)
        })
        .collect();
    entries.sort();
    Ok(entries.into_iter().next())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_round_trip() {
        let config = Config::default();
        let json = serde_json::to_string_pretty(&config).unwrap();
        let parsed: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.anki.endpoint, "http://localhost:8765");
        assert_eq!(parsed.movie.deck_name, "Media");
        assert_eq!(parsed.matcher.window, 3);
    }

    #[test]
    fn test_resolve_project_discovers_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Tenet.txt"), "twilight\nWe live\n").unwrap();
        std::fs::write(dir.path().join("Tenet.ass"), "[Events]\n").unwrap();

        let mut config = Config::default();
        config.movie.projects.insert(
            "Tenet".to_string(),
            ProjectConfig {
                project_dir: dir.path().to_path_buf(),
                video_path: dir.path().join("Tenet.mkv"),
            },
        );

        let resolved = config.resolve_project(Some("Tenet")).unwrap();
        assert!(resolved.words_file.ends_with("Tenet.txt"));
        assert!(resolved.subtitle_file.ends_with("Tenet.ass"));
        assert!(resolved.clip_dir.ends_with("audio"));
    }

    #[test]
    fn test_resolve_project_unknown_name() {
        let config = Config::default();
        assert!(config.resolve_project(Some("missing")).is_err());
    }
}
