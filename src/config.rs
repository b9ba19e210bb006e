//! Built-in application settings.
//!
//! Nothing is read from disk; the external tools are looked up on PATH
//! once at start-up.

use std::path::PathBuf;

use tracing::{debug, warn};

use crate::model::Quality;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// yt-dlp executable used to resolve playlists and streams
    pub ytdlp: PathBuf,
    /// ffmpeg executable used to upscale downloaded files
    pub ffmpeg: PathBuf,
    /// Folder pre-filled in the destination field
    pub download_folder: PathBuf,
    /// Quality pre-selected in the dropdown
    pub default_quality: Quality,
    /// Width and height every enhanced file is scaled to
    pub enhance_target: (u32, u32),
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            ytdlp: PathBuf::from("yt-dlp"),
            ffmpeg: PathBuf::from("ffmpeg"),
            download_folder: PathBuf::from("./downloads"),
            default_quality: Quality::default(),
            enhance_target: (1920, 1080),
        }
    }
}

impl Settings {
    /// Defaults with tool paths resolved on PATH where possible.
    pub fn discover() -> Self {
        Self {
            ytdlp: locate("yt-dlp"),
            ffmpeg: locate("ffmpeg"),
            ..Self::default()
        }
    }
}

/// Absolute path of `program`, or the bare name so the failure shows up
/// in the log panel when a run actually needs the tool.
fn locate(program: &str) -> PathBuf {
    match which::which(program) {
        Ok(path) => {
            debug!(program, path = %path.display(), "found external tool");
            path
        }
        Err(err) => {
            warn!(program, %err, "external tool not found on PATH");
            PathBuf::from(program)
        }
    }
}
