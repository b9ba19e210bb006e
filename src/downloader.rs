use std::{
    path::{Path, PathBuf},
    process::Stdio,
};

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::Deserialize;
use tokio::{fs, io::AsyncWriteExt, process::Command};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::source::{MediaSource, StreamInfo, VideoInfo, sanitize_file_name};

const TOOL: &str = "yt-dlp";

/// Resolves playlists and streams through yt-dlp and downloads the
/// selected stream over HTTP.
pub struct YtDlpSource {
    bin: PathBuf,
    http: reqwest::Client,
}

#[derive(Deserialize)]
struct FlatPlaylist {
    entries: Option<Vec<Option<FlatEntry>>>,
}

#[derive(Deserialize)]
struct FlatEntry {
    url: Option<String>,
    id: Option<String>,
}

impl YtDlpSource {
    pub fn new(bin: impl Into<PathBuf>) -> Self {
        Self {
            bin: bin.into(),
            http: reqwest::Client::new(),
        }
    }

    /// Runs yt-dlp with `args` and returns its stdout.
    async fn run(&self, args: &[&str]) -> Result<Vec<u8>> {
        debug!(bin = %self.bin.display(), ?args, "running yt-dlp");
        let output = Command::new(&self.bin)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|source| match source.kind() {
                std::io::ErrorKind::NotFound => Error::ToolNotFound(TOOL),
                _ => Error::Spawn { tool: TOOL, source },
            })?;

        if !output.status.success() {
            return Err(Error::ToolFailed {
                tool: TOOL,
                status: output.status.to_string(),
                stderr: last_line(&output.stderr),
            });
        }
        Ok(output.stdout)
    }
}

#[async_trait]
impl MediaSource for YtDlpSource {
    async fn playlist_entries(&self, url: &str) -> Result<Vec<String>> {
        let stdout = self.run(&["-J", "--flat-playlist", url]).await?;
        parse_playlist(&stdout)
    }

    async fn resolve(&self, video_url: &str) -> Result<VideoInfo> {
        let stdout = self.run(&["-J", "--no-playlist", video_url]).await?;
        Ok(serde_json::from_slice(&stdout)?)
    }

    async fn fetch(&self, stream: &StreamInfo, title: &str, dir: &Path) -> Result<PathBuf> {
        let url = stream.url.as_deref().ok_or_else(|| Error::Malformed {
            tool: TOOL,
            reason: format!("format {} has no URL", stream.format_id),
        })?;

        let target = dir.join(format!("{}.{}", sanitize_file_name(title), stream.ext));
        let partial = target.with_extension(format!("{}.part", stream.ext));

        let mut response = self
            .http
            .get(url)
            .headers(header_map(stream))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Error::HttpStatus {
                status: response.status(),
                title: title.to_string(),
            });
        }

        let saved: Result<u64> = async {
            let written = write_body(&mut response, &partial).await?;
            fs::rename(&partial, &target).await?;
            Ok(written)
        }
        .await;

        match saved {
            Ok(written) => {
                debug!(path = %target.display(), bytes = written, "stream saved");
                Ok(target)
            }
            Err(err) => {
                let _ = fs::remove_file(&partial).await;
                Err(err)
            }
        }
    }
}

/// Streams the response body into `path`, returning the byte count.
async fn write_body(response: &mut reqwest::Response, path: &Path) -> Result<u64> {
    let mut file = fs::File::create(path).await?;
    let mut written: u64 = 0;
    while let Some(chunk) = response.chunk().await? {
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;
    Ok(written)
}

/// Video URLs listed in `yt-dlp -J --flat-playlist` output, in playlist order.
fn parse_playlist(stdout: &[u8]) -> Result<Vec<String>> {
    let playlist: FlatPlaylist = serde_json::from_slice(stdout)?;
    let entries = playlist.entries.ok_or_else(|| Error::Malformed {
        tool: TOOL,
        reason: "URL does not point to a playlist".to_string(),
    })?;

    let mut urls = Vec::with_capacity(entries.len());
    for (position, entry) in entries.into_iter().enumerate() {
        match entry {
            Some(FlatEntry { url: Some(url), .. }) => urls.push(url),
            Some(FlatEntry { id: Some(id), .. }) => {
                urls.push(format!("https://www.youtube.com/watch?v={id}"))
            }
            _ => warn!(position, "skipping playlist entry without a URL"),
        }
    }
    Ok(urls)
}

fn header_map(stream: &StreamInfo) -> HeaderMap {
    let mut headers = HeaderMap::new();
    for (name, value) in &stream.http_headers {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                headers.insert(name, value);
            }
            _ => debug!(header = %name, "ignoring unusable header"),
        }
    }
    headers
}

/// Last non-empty stderr line; yt-dlp puts the actual error there.
fn last_line(stderr: &[u8]) -> String {
    String::from_utf8_lossy(stderr)
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .last()
        .unwrap_or("no error output")
        .to_string()
}
