//! Sequential playlist download loop.
//!
//! Runs on the background runtime and reports to the UI exclusively
//! through [`WorkerEvent`]s. Stop requests are honoured between items only.

use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::enhance::Enhancer;
use crate::error::Result;
use crate::model::{DownloadRequest, WorkerEvent};
use crate::progress::percent_after;
use crate::source::{MediaSource, select_stream};

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Finished,
    Stopped { resume_index: usize },
    Failed,
}

pub struct Worker {
    source: Arc<dyn MediaSource>,
    enhancer: Arc<dyn Enhancer>,
}

impl Worker {
    pub fn new(source: Arc<dyn MediaSource>, enhancer: Arc<dyn Enhancer>) -> Self {
        Self { source, enhancer }
    }

    /// Processes `request` and emits exactly one terminal event
    /// (`Finished`, `Stopped` or `Failed`).
    pub async fn run(
        &self,
        request: &DownloadRequest,
        stop: &CancellationToken,
        events: &UnboundedSender<WorkerEvent>,
    ) -> RunOutcome {
        info!(
            url = %request.playlist_url,
            quality = %request.quality,
            start = request.start_index,
            enhance = request.enhance,
            "download run started"
        );

        let outcome = match self.process(request, stop, events).await {
            Ok(outcome) => outcome,
            Err(err) => {
                error!(%err, "download run aborted");
                let _ = events.send(WorkerEvent::Log(format!("Error: {err}")));
                RunOutcome::Failed
            }
        };

        let terminal = match outcome {
            RunOutcome::Finished => WorkerEvent::Finished,
            RunOutcome::Stopped { resume_index } => WorkerEvent::Stopped { resume_index },
            RunOutcome::Failed => WorkerEvent::Failed,
        };
        let _ = events.send(terminal);
        info!(?outcome, "download run ended");
        outcome
    }

    async fn process(
        &self,
        request: &DownloadRequest,
        stop: &CancellationToken,
        events: &UnboundedSender<WorkerEvent>,
    ) -> Result<RunOutcome> {
        let log = |line: String| {
            let _ = events.send(WorkerEvent::Log(line));
        };

        tokio::fs::create_dir_all(&request.save_path).await?;

        let entries = self.source.playlist_entries(&request.playlist_url).await?;
        let total = entries.len();
        if total == 0 {
            log("Playlist contains no videos".to_string());
            return Ok(RunOutcome::Finished);
        }

        for (index, video_url) in entries.iter().enumerate().skip(request.start_index) {
            if stop.is_cancelled() {
                return Ok(RunOutcome::Stopped { resume_index: index });
            }

            let video = self.source.resolve(video_url).await?;
            match select_stream(&video.streams, request.quality) {
                Some(stream) => {
                    let path = self
                        .source
                        .fetch(stream, &video.title, &request.save_path)
                        .await?;
                    log(format!("Downloaded: {}", video.title));
                    let _ = events.send(WorkerEvent::VideoDownloaded(path.clone()));

                    if request.enhance {
                        let name = path
                            .file_name()
                            .map(|n| n.to_string_lossy().into_owned())
                            .unwrap_or_default();
                        match self.enhancer.enhance(&path).await {
                            Ok(()) => log(format!("Enhanced quality of: {name}")),
                            Err(err) => {
                                warn!(file = %name, %err, "enhancement failed");
                                log(format!("Enhancement error: {err}"));
                            }
                        }
                    }
                }
                None => {
                    warn!(index, title = %video.title, "no matching stream");
                    log(format!(
                        "No stream found for {} at {}",
                        video.title, request.quality
                    ));
                }
            }

            let _ = events.send(WorkerEvent::Progress(percent_after(index, total)));
        }

        Ok(RunOutcome::Finished)
    }
}
