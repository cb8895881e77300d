//! Turns a download request into yt-dlp arguments

use std::path::Path;

use crate::model::{AudioFormat, DownloadRequest, VideoFormat};

/// Format expression used when the user leaves the video format on "best"
pub const DEFAULT_VIDEO_FORMAT: &str =
    "bestvideo[ext=mp4]+bestaudio[ext=m4a]/bestvideo+bestaudio/best";

/// Builds the ordered argument list for one invocation; the URL always comes last
pub fn build_args(request: &DownloadRequest) -> Vec<String> {
    // One progress update per line so the output view and progress bar can follow along
    let mut args = vec!["--newline".to_owned()];

    if request.audio_only {
        args.push("-x".to_owned());
        if request.audio_format != AudioFormat::Best {
            args.push("--audio-format".to_owned());
            args.push(request.audio_format.as_str().to_owned());
        }
        args.push("--audio-quality".to_owned());
        args.push("0".to_owned());
    } else {
        args.push("-f".to_owned());
        args.push(match &request.video_format {
            VideoFormat::Best => DEFAULT_VIDEO_FORMAT.to_owned(),
            VideoFormat::Custom(format) => format.clone(),
        });
    }

    if request.subtitles {
        args.push("--write-sub".to_owned());
    }
    if request.auto_subtitles {
        args.push("--write-auto-sub".to_owned());
    }

    args.push("-P".to_owned());
    args.push(request.destination.to_string_lossy().into_owned());
    args.push(request.url.trim().to_owned());
    args
}

/// Renders the invocation echoed at the top of the output view
pub fn command_line(program: &Path, args: &[String]) -> String {
    let mut line = program.display().to_string();
    for arg in args {
        line.push(' ');
        line.push_str(arg);
    }
    line
}
