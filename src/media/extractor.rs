use async_trait::async_trait;
use once_cell::sync::OnceCell;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::config::MediaConfig;
use crate::error::{LexiclipError, Result};
use super::{ClipExtractorTrait, MediaCommandBuilder, TimeSpan};

/// Accelerators probed in order when `hwaccel` is set to "auto".
const HWACCEL_CANDIDATES: &[&str] = &["cuda", "d3d11va", "qsv", "videotoolbox", "vaapi"];

/// Concrete clip extractor implementation (ffmpeg-based)
pub struct FfmpegExtractor {
    config: MediaConfig,
    command_builder: MediaCommandBuilder,
    resolved_hwaccel: OnceCell<Option<String>>,
}

impl FfmpegExtractor {
    /// Create a new extractor implementation
    pub fn new(config: MediaConfig) -> Self {
        let command_builder = MediaCommandBuilder::new(&config.binary_path);

        Self {
            config,
            command_builder,
            resolved_hwaccel: OnceCell::new(),
        }
    }

    /// Resolve the configured accelerator once per run. "none" disables
    /// acceleration, "auto" probes the tool's `-hwaccels` listing, anything
    /// else is passed through as given.
    async fn hwaccel(&self) -> Option<String> {
        if let Some(resolved) = self.resolved_hwaccel.get() {
            return resolved.clone();
        }

        let resolved = match self.config.hwaccel.as_str() {
            "none" | "" => None,
            "auto" => self.probe_hwaccel().await,
            explicit => Some(explicit.to_string()),
        };

        if let Some(accelerator) = &resolved {
            info!("Using hardware acceleration: {}", accelerator);
        } else {
            debug!("Hardware acceleration disabled");
        }

        self.resolved_hwaccel.get_or_init(|| resolved).clone()
    }

    async fn probe_hwaccel(&self) -> Option<String> {
        let output = self.command_builder.hwaccel_list().capture().await.ok()?;
        if !output.status.success() {
            return None;
        }
        let listing = String::from_utf8_lossy(&output.stdout).to_lowercase();
        HWACCEL_CANDIDATES
            .iter()
            .find(|candidate| listing.lines().any(|line| line.trim() == **candidate))
            .map(|candidate| candidate.to_string())
    }

    /// Run a clip command, retrying once on the CPU when a GPU-accelerated
    /// attempt fails.
    async fn run_with_fallback<F>(&self, build: F) -> Result<()>
    where
        F: Fn(Option<&str>) -> super::MediaCommand,
    {
        let hwaccel = self.hwaccel().await;
        match build(hwaccel.as_deref()).execute().await {
            Ok(()) => Ok(()),
            Err(e) if hwaccel.is_some() => {
                warn!("Accelerated extraction failed ({}), retrying on CPU", e);
                build(None).execute().await
            }
            Err(e) => Err(e),
        }
    }

    /// Extract a clip and normalize its loudness toward the target via an
    /// intermediate temporary file.
    async fn extract_normalized(
        &self,
        video_path: &Path,
        span: TimeSpan,
        output_path: &Path,
    ) -> Result<()> {
        let temp = tempfile::Builder::new()
            .suffix(".mp3")
            .tempfile()
            .map_err(|e| LexiclipError::Media(format!("Failed to create temp file: {}", e)))?;

        self.extract_plain(video_path, span, temp.path()).await?;

        let target_lufs = self.config.target_lufs;
        debug!("Normalizing clip loudness toward {} LUFS", target_lufs);
        self.command_builder
            .normalize_loudness(
                temp.path(),
                output_path,
                target_lufs,
                &self.config.audio_bitrate,
                self.config.audio_sample_rate,
            )
            .execute()
            .await
    }

    async fn extract_plain(
        &self,
        video_path: &Path,
        span: TimeSpan,
        output_path: &Path,
    ) -> Result<()> {
        let duration = span.duration() + self.config.end_padding;
        self.run_with_fallback(|hwaccel| {
            self.command_builder.clip_audio(
                video_path,
                span.start,
                duration,
                output_path,
                &self.config.audio_bitrate,
                self.config.audio_sample_rate,
                hwaccel,
            )
        })
        .await
    }
}

#[async_trait]
impl ClipExtractorTrait for FfmpegExtractor {
    async fn extract_audio_clip(
        &self,
        video_path: &Path,
        span: TimeSpan,
        output_path: &Path,
    ) -> Result<()> {
        info!(
            "Extracting audio {:.2}s..{:.2}s from {} to {}",
            span.start,
            span.end,
            video_path.display(),
            output_path.display()
        );

        if self.config.normalize_volume {
            self.extract_normalized(video_path, span, output_path).await?;
        } else {
            self.extract_plain(video_path, span, output_path).await?;
        }

        info!("Audio clip extraction completed");
        Ok(())
    }

    async fn extract_screenshot(
        &self,
        video_path: &Path,
        timestamp: f64,
        output_path: &Path,
    ) -> Result<()> {
        if timestamp < 0.0 || !timestamp.is_finite() {
            return Err(LexiclipError::Media(format!(
                "Invalid screenshot timestamp {:.2}",
                timestamp
            )));
        }

        info!(
            "Extracting screenshot at {:.2}s from {} to {}",
            timestamp,
            video_path.display(),
            output_path.display()
        );

        self.run_with_fallback(|hwaccel| {
            self.command_builder
                .screenshot(video_path, timestamp, output_path, hwaccel)
        })
        .await?;

        info!("Screenshot extraction completed");
        Ok(())
    }

    async fn measure_loudness(&self, audio_path: &Path) -> Result<Option<f64>> {
        if !audio_path.exists() {
            return Err(LexiclipError::FileNotFound(
                audio_path.display().to_string(),
            ));
        }

        let output = self
            .command_builder
            .loudness_scan(audio_path)
            .capture()
            .await?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        Ok(parse_loudness(&stderr))
    }

    fn check_availability(&self) -> Result<()> {
        let output = std::process::Command::new(&self.config.binary_path)
            .arg("-version")
            .output()
            .map_err(|e| LexiclipError::Media(format!("Media tool not found: {}", e)))?;

        if output.status.success() {
            info!("Media tool is available");
            Ok(())
        } else {
            Err(LexiclipError::Media(
                "Media tool version check failed".to_string(),
            ))
        }
    }
}

/// Pull the measured integrated loudness (`input_i`) out of the loudnorm
/// filter's stderr report.
fn parse_loudness(stderr: &str) -> Option<f64> {
    let json_start = stderr.find('{')?;
    let json_end = stderr.rfind('}')? + 1;
    if json_end <= json_start {
        return None;
    }

    let report: serde_json::Value = serde_json::from_str(&stderr[json_start..json_end]).ok()?;
    report
        .get("input_i")?
        .as_str()?
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}
