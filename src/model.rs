use std::fmt;
use std::path::PathBuf;

use crate::error::{Error, Result};

/// Resolutions offered in the quality dropdown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Quality {
    P1080,
    #[default]
    P720,
    P480,
    P360,
    P240,
}

impl Quality {
    /// All options, highest first, in dropdown order
    pub const ALL: [Quality; 5] = [
        Quality::P1080,
        Quality::P720,
        Quality::P480,
        Quality::P360,
        Quality::P240,
    ];

    /// Label shown to the user, e.g. "720p"
    pub fn label(self) -> &'static str {
        match self {
            Quality::P1080 => "1080p",
            Quality::P720 => "720p",
            Quality::P480 => "480p",
            Quality::P360 => "360p",
            Quality::P240 => "240p",
        }
    }

    /// Vertical resolution a stream must have to match
    pub fn height(self) -> u32 {
        match self {
            Quality::P1080 => 1080,
            Quality::P720 => 720,
            Quality::P480 => 480,
            Quality::P360 => 360,
            Quality::P240 => 240,
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Parameters of a single worker run. Fixed for the run's duration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    /// Playlist page URL
    pub playlist_url: String,
    /// Requested stream resolution
    pub quality: Quality,
    /// Folder the videos are written to
    pub save_path: PathBuf,
    /// First playlist position to process (0 for a fresh run)
    pub start_index: usize,
    /// Transcode each file after it is downloaded
    pub enhance: bool,
}

impl DownloadRequest {
    /// Builds a request from raw form input, rejecting empty fields.
    pub fn new(
        playlist_url: &str,
        quality: Quality,
        save_path: &str,
        start_index: usize,
        enhance: bool,
    ) -> Result<Self> {
        let playlist_url = playlist_url.trim();
        if playlist_url.is_empty() {
            return Err(Error::Invalid("Please enter a playlist URL"));
        }
        let save_path = save_path.trim();
        if save_path.is_empty() {
            return Err(Error::Invalid("Please select a folder to save videos"));
        }
        Ok(Self {
            playlist_url: playlist_url.to_string(),
            quality,
            save_path: PathBuf::from(save_path),
            start_index,
            enhance,
        })
    }
}

/// Notification sent from the worker to the UI thread
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerEvent {
    /// Overall progress in percent
    Progress(u8),
    /// Line for the log panel
    Log(String),
    /// A file landed in the download folder
    VideoDownloaded(PathBuf),
    /// Stop was honoured; the next run should start here
    Stopped { resume_index: usize },
    /// Every item was processed
    Finished,
    /// The run aborted; the reason was already sent as a log line
    Failed,
}
