//! The seam between the worker and whatever resolves and fetches media.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::Result;
use crate::model::Quality;

/// A video and the renditions it is available in.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct VideoInfo {
    pub title: String,
    #[serde(rename = "formats", default)]
    pub streams: Vec<StreamInfo>,
}

/// One encoded rendition of a video.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct StreamInfo {
    pub format_id: String,
    pub ext: String,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub vcodec: Option<String>,
    #[serde(default)]
    pub acodec: Option<String>,
    /// Direct media URL
    #[serde(default)]
    pub url: Option<String>,
    /// Headers the media host expects on the request
    #[serde(default)]
    pub http_headers: HashMap<String, String>,
}

impl StreamInfo {
    pub fn has_video(&self) -> bool {
        codec_present(self.vcodec.as_deref())
    }

    pub fn has_audio(&self) -> bool {
        codec_present(self.acodec.as_deref())
    }
}

// yt-dlp reports absent tracks as "none"; a missing field means unknown.
fn codec_present(codec: Option<&str>) -> bool {
    codec != Some("none")
}

/// Resolves playlists and videos and downloads streams.
#[async_trait]
pub trait MediaSource: Send + Sync {
    /// Ordered video URLs of the playlist at `url`.
    async fn playlist_entries(&self, url: &str) -> Result<Vec<String>>;

    /// Title and available streams of a single video.
    async fn resolve(&self, video_url: &str) -> Result<VideoInfo>;

    /// Downloads `stream` into `dir`, returning the written file.
    async fn fetch(&self, stream: &StreamInfo, title: &str, dir: &Path) -> Result<PathBuf>;
}

/// First mp4 stream at exactly `quality`, preferring ones that carry audio.
pub fn select_stream(streams: &[StreamInfo], quality: Quality) -> Option<&StreamInfo> {
    let mut candidates = streams.iter().filter(|s| {
        s.ext == "mp4" && s.height == Some(quality.height()) && s.has_video() && s.url.is_some()
    });
    let first = candidates.next()?;
    if first.has_audio() {
        return Some(first);
    }
    candidates.find(|s| s.has_audio()).or(Some(first))
}

/// Turns a video title into a file name that is valid on common filesystems.
pub fn sanitize_file_name(title: &str) -> String {
    const INVALID: &[char] = &[
        '/', '\\', ':', '*', '?', '"', '<', '>', '|', '#', '%', '~', '{', '}', '^',
    ];

    let cleaned: String = title
        .chars()
        .filter(|c| !c.is_control() && !INVALID.contains(c))
        .collect();
    let cleaned = cleaned.trim().trim_end_matches('.').trim_end();
    let mut name: String = cleaned.chars().take(200).collect();
    if name.is_empty() {
        name.push_str("video");
    }
    name
}
