use std::path::Path;
use std::process::{Command, Output};
use tracing::debug;

use crate::error::{LexiclipError, Result};

/// Abstract media tool command representation
#[derive(Debug, Clone)]
pub struct MediaCommand {
    pub binary_path: String,
    pub args: Vec<String>,
    pub description: String,
}

impl MediaCommand {
    /// Create a new media tool command
    pub fn new<S1: Into<String>, S2: Into<String>>(binary_path: S1, description: S2) -> Self {
        Self {
            binary_path: binary_path.into(),
            args: Vec::new(),
            description: description.into(),
        }
    }

    /// Add an argument
    pub fn arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add input file
    pub fn input<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg("-i").arg(path.as_ref().to_string_lossy().to_string())
    }

    /// Add output file
    pub fn output<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg(path.as_ref().to_string_lossy().to_string())
    }

    /// Force overwrite output
    pub fn overwrite(self) -> Self {
        self.arg("-y")
    }

    /// Seek to position (seconds)
    pub fn seek(self, seconds: f64) -> Self {
        self.arg("-ss").arg(seconds.to_string())
    }

    /// Limit output duration (seconds)
    pub fn duration(self, seconds: f64) -> Self {
        self.arg("-t").arg(seconds.to_string())
    }

    /// Disable video
    pub fn no_video(self) -> Self {
        self.arg("-vn")
    }

    /// Set audio codec
    pub fn audio_codec<S: Into<String>>(self, codec: S) -> Self {
        self.arg("-acodec").arg(codec)
    }

    /// Set audio bitrate
    pub fn audio_bitrate<S: Into<String>>(self, bitrate: S) -> Self {
        self.arg("-ab").arg(bitrate)
    }

    /// Set audio sample rate
    pub fn audio_sample_rate(self, rate: u32) -> Self {
        self.arg("-ar").arg(rate.to_string())
    }

    /// Add audio filter
    pub fn audio_filter<S: Into<String>>(self, filter: S) -> Self {
        self.arg("-af").arg(filter)
    }

    /// Force output container format
    pub fn format<S: Into<String>>(self, format: S) -> Self {
        self.arg("-f").arg(format)
    }

    /// Request hardware-accelerated decoding
    pub fn hwaccel<S: Into<String>>(self, accelerator: S) -> Self {
        self.arg("-hwaccel").arg(accelerator)
    }

    /// Execute the command, failing on a non-zero exit
    pub async fn execute(&self) -> Result<()> {
        let output = self.capture().await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(LexiclipError::Media(format!(
                "{} failed: {}",
                self.description, stderr
            )));
        }

        Ok(())
    }

    /// Execute the command and return its raw output regardless of exit
    /// status; used for analysis passes that report on stderr.
    pub async fn capture(&self) -> Result<Output> {
        debug!(
            "Executing media tool command: {} {:?}",
            self.binary_path, self.args
        );
        debug!("Description: {}", self.description);

        let mut cmd = Command::new(&self.binary_path);
        cmd.args(&self.args);

        cmd.output()
            .map_err(|e| LexiclipError::Media(format!("Failed to execute media tool: {}", e)))
    }
}

/// Builder for the extraction operations the workflows need
pub struct MediaCommandBuilder {
    binary_path: String,
}

impl MediaCommandBuilder {
    /// Create a new command builder
    pub fn new<S: Into<String>>(binary_path: S) -> Self {
        Self {
            binary_path: binary_path.into(),
        }
    }

    /// Build an audio clip extraction command
    pub fn clip_audio<P: AsRef<Path>>(
        &self,
        video_path: P,
        start: f64,
        duration: f64,
        output_path: P,
        bitrate: &str,
        sample_rate: u32,
        hwaccel: Option<&str>,
    ) -> MediaCommand {
        let mut cmd = MediaCommand::new(&self.binary_path, "Audio clip extraction");
        if let Some(accelerator) = hwaccel {
            cmd = cmd.hwaccel(accelerator);
        }
        cmd.input(video_path)
            .seek(start)
            .duration(duration)
            .no_video()
            .audio_codec("libmp3lame")
            .audio_bitrate(bitrate)
            .audio_sample_rate(sample_rate)
            .format("mp3")
            .overwrite()
            .output(output_path)
    }

    /// Build a single-frame screenshot command
    pub fn screenshot<P: AsRef<Path>>(
        &self,
        video_path: P,
        timestamp: f64,
        output_path: P,
        hwaccel: Option<&str>,
    ) -> MediaCommand {
        let mut cmd = MediaCommand::new(&self.binary_path, "Screenshot extraction");
        if let Some(accelerator) = hwaccel {
            cmd = cmd.hwaccel(accelerator);
        }
        cmd.input(video_path)
            .seek(timestamp)
            .arg("-vframes")
            .arg("1")
            .arg("-q:v")
            .arg("2")
            .overwrite()
            .output(output_path)
    }

    /// Build a loudness analysis command; the loudnorm filter prints its
    /// measurement as JSON on stderr.
    pub fn loudness_scan<P: AsRef<Path>>(&self, audio_path: P) -> MediaCommand {
        MediaCommand::new(&self.binary_path, "Loudness analysis")
            .input(audio_path)
            .audio_filter("loudnorm=I=-23.0:TP=-1.5:LRA=11:print_format=json")
            .format("null")
            .arg("-")
    }

    /// Build a loudness normalization command
    pub fn normalize_loudness<P: AsRef<Path>>(
        &self,
        input_path: P,
        output_path: P,
        target_lufs: f64,
        bitrate: &str,
        sample_rate: u32,
    ) -> MediaCommand {
        MediaCommand::new(&self.binary_path, "Loudness normalization")
            .input(input_path)
            .audio_filter(format!("loudnorm=I={}:TP=-1.5:LRA=11", target_lufs))
            .audio_codec("libmp3lame")
            .audio_bitrate(bitrate)
            .audio_sample_rate(sample_rate)
            .format("mp3")
            .overwrite()
            .output(output_path)
    }

    /// Build a version check command
    pub fn version_check(&self) -> MediaCommand {
        MediaCommand::new(&self.binary_path, "Version check").arg("-version")
    }

    /// Build a hardware accelerator listing command
    pub fn hwaccel_list(&self) -> MediaCommand {
        MediaCommand::new(&self.binary_path, "Hardware accelerator listing")
            .arg("-hide_banner")
            .arg("-hwaccels")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clip_audio_command_shape() {
        let builder = MediaCommandBuilder::new("ffmpeg");
        let cmd = builder.clip_audio(
            "movie.mkv",
            196.55,
            2.12,
            "twilight_01.mp3",
            "192k",
            44100,
            None,
        );
        assert_eq!(cmd.binary_path, "ffmpeg");
        assert!(cmd.args.windows(2).any(|w| w == ["-ss", "196.55"]));
        assert!(cmd.args.windows(2).any(|w| w == ["-t", "2.12"]));
        assert!(cmd.args.contains(&"-vn".to_string()));
        assert!(cmd.args.contains(&"-y".to_string()));
        assert_eq!(cmd.args.last().unwrap(), "twilight_01.mp3");
    }

    #[test]
    fn test_hwaccel_prepended_before_input() {
        let builder = MediaCommandBuilder::new("ffmpeg");
        let cmd = builder.screenshot("movie.mkv", 197.05, "twilight_01.jpg", Some("cuda"));
        let hw = cmd.args.iter().position(|a| a == "-hwaccel").unwrap();
        let input = cmd.args.iter().position(|a| a == "-i").unwrap();
        assert!(hw < input);
        assert_eq!(cmd.args[hw + 1], "cuda");
    }

    #[test]
    fn test_loudness_scan_writes_nowhere() {
        let builder = MediaCommandBuilder::new("ffmpeg");
        let cmd = builder.loudness_scan("clip.mp3");
        assert_eq!(cmd.args.last().unwrap(), "-");
        assert!(cmd.args.windows(2).any(|w| w == ["-f", "null"]));
    }
}
