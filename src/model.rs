use std::fmt;
use std::path::PathBuf;

use crate::error::{DownloadError, Result};

/// Audio container/codec requested from yt-dlp when extracting audio
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AudioFormat {
    /// Let yt-dlp keep the best available audio
    #[default]
    Best,
    Mp3,
    M4a,
    Opus,
    Wav,
    Flac,
}

impl AudioFormat {
    /// Every choice offered in the audio format dropdown
    pub const ALL: [AudioFormat; 6] = [
        AudioFormat::Best,
        AudioFormat::Mp3,
        AudioFormat::M4a,
        AudioFormat::Opus,
        AudioFormat::Wav,
        AudioFormat::Flac,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AudioFormat::Best => "best",
            AudioFormat::Mp3 => "mp3",
            AudioFormat::M4a => "m4a",
            AudioFormat::Opus => "opus",
            AudioFormat::Wav => "wav",
            AudioFormat::Flac => "flac",
        }
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Video format selection passed to `-f`
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum VideoFormat {
    /// Prefer mp4 video with m4a audio, falling back to whatever is best
    #[default]
    Best,
    /// A format expression typed or picked by the user
    Custom(String),
}

impl VideoFormat {
    /// Presets listed in the video format dropdown; the field stays editable
    pub const PRESETS: [&'static str; 4] = ["best", "bestvideo+bestaudio/best", "mp4", "webm"];

    /// Interprets the text of the video format field
    pub fn parse(input: &str) -> Self {
        let trimmed = input.trim();
        if trimmed.is_empty() || trimmed == "best" {
            VideoFormat::Best
        } else {
            VideoFormat::Custom(trimmed.to_string())
        }
    }
}

/// Options for a single yt-dlp invocation, rebuilt from the form on every click
#[derive(Clone, Debug, Default)]
pub struct DownloadRequest {
    /// Media URL handed to yt-dlp as the last argument
    pub url: String,
    /// Folder passed with `-P`
    pub destination: PathBuf,
    /// Extract audio only
    pub audio_only: bool,
    /// Audio format used when `audio_only` is set
    pub audio_format: AudioFormat,
    /// Video format used when `audio_only` is not set
    pub video_format: VideoFormat,
    /// Download uploaded subtitles
    pub subtitles: bool,
    /// Download automatically generated subtitles
    pub auto_subtitles: bool,
}

impl DownloadRequest {
    /// Checks the two things the front-end is responsible for: a URL and an existing folder
    pub fn validate(&self) -> Result<()> {
        if self.url.trim().is_empty() {
            return Err(DownloadError::MissingUrl);
        }
        if self.destination.as_os_str().is_empty() || !self.destination.is_dir() {
            return Err(DownloadError::InvalidDestination(self.destination.clone()));
        }
        Ok(())
    }
}

/// Which pipe a relayed line came from
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputStream {
    Stdout,
    Stderr,
}

/// One decoded line of child output
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutputLine {
    pub stream: OutputStream,
    pub text: String,
}

/// How a download run ended
#[derive(Debug)]
pub enum DownloadOutcome {
    /// Exit code 0
    Completed,
    /// Negative exit code, or the process was ended by a signal (`code` is `None`)
    Cancelled { code: Option<i32> },
    /// Positive exit code
    Failed { code: i32 },
    /// The process could not be started or supervised
    Error(DownloadError),
}

impl DownloadOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, DownloadOutcome::Completed)
    }

    /// Closing message appended to the output view
    pub fn summary(&self) -> String {
        match self {
            DownloadOutcome::Completed => "--- Download complete ---".to_string(),
            DownloadOutcome::Cancelled { code: Some(code) } => {
                format!("--- Process stopped ({code}) ---")
            }
            DownloadOutcome::Cancelled { code: None } => "--- Process stopped ---".to_string(),
            DownloadOutcome::Failed { code } => format!("--- Process error ({code}) ---"),
            DownloadOutcome::Error(err) => format!("ERROR: {err}"),
        }
    }
}
