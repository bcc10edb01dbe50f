// Clip extraction over an external media tool
//
// This module wraps the ffmpeg invocations that cut matched cue ranges out
// of the source video:
// - commands: abstract command building
// - extractor: the ffmpeg-backed implementation

pub mod commands;
pub mod extractor;

use async_trait::async_trait;
use std::path::Path;

pub use commands::*;
pub use extractor::*;

use crate::config::MediaConfig;
use crate::error::{LexiclipError, Result};

/// A validated clip time range. Construction rejects empty and negative
/// ranges so a bad match can never reach the media tool.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeSpan {
    pub start: f64,
    pub end: f64,
}

impl TimeSpan {
    pub fn new(start: f64, end: f64) -> Result<Self> {
        if start < 0.0 || !start.is_finite() || !end.is_finite() {
            return Err(LexiclipError::Media(format!(
                "Invalid clip range {:.2}..{:.2}",
                start, end
            )));
        }
        if end <= start {
            return Err(LexiclipError::Media(format!(
                "Clip range {:.2}..{:.2} has non-positive duration",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// Main trait for clip extraction operations
#[async_trait]
pub trait ClipExtractorTrait: Send + Sync {
    /// Cut the given range out of the video into a standalone audio file
    async fn extract_audio_clip(
        &self,
        video_path: &Path,
        span: TimeSpan,
        output_path: &Path,
    ) -> Result<()>;

    /// Grab a single frame at the given timestamp into an image file
    async fn extract_screenshot(
        &self,
        video_path: &Path,
        timestamp: f64,
        output_path: &Path,
    ) -> Result<()>;

    /// Measure integrated loudness (LUFS) of an audio file
    async fn measure_loudness(&self, audio_path: &Path) -> Result<Option<f64>>;

    /// Check if the media tool is available
    fn check_availability(&self) -> Result<()>;
}

/// Factory for creating clip extractor instances
pub struct ClipExtractorFactory;

impl ClipExtractorFactory {
    /// Create the default extractor implementation (ffmpeg-based)
    pub fn create_extractor(config: MediaConfig) -> Box<dyn ClipExtractorTrait> {
        Box::new(extractor::FfmpegExtractor::new(config))
    }
}
