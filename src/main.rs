//! Main application for the YouTube Playlist Downloader GUI

// Built-in settings and tool discovery
mod config;
// yt-dlp backed media source
mod downloader;
// ffmpeg post-processing
mod enhance;
mod error;
mod logging;
// Data models for requests and worker events
mod model;
// Progress percentage math
mod progress;
// UI-side run state
mod session;
// Media source trait and stream selection
mod source;
// Background download loop
mod worker;

use config::Settings;
use downloader::YtDlpSource;
use enhance::FfmpegEnhancer;
use model::{DownloadRequest, Quality};
use session::{RunState, Session};
use worker::Worker;

use anyhow::{Context, anyhow};
// eframe/egui for GUI application framework
use eframe::{App, Frame, egui};
use egui::Visuals;
// OnceCell for single-time runtime initialization
use once_cell::sync::OnceCell;
// FileDialog for folder selection dialogs
use rfd::FileDialog;
use std::sync::Arc;
use tokio::runtime::Runtime;
use tracing::info;

// Global Tokio runtime stored in a OnceCell for lazy init
static RUNTIME: OnceCell<Arc<Runtime>> = OnceCell::new();

/// Program entry point: initializes logging and the runtime, then launches the GUI
fn main() -> anyhow::Result<()> {
    logging::init_tracing();

    let rt = Arc::new(Runtime::new().context("failed to start the tokio runtime")?);
    RUNTIME
        .set(rt)
        .map_err(|_| anyhow!("tokio runtime initialised twice"))?;

    let settings = Settings::discover();
    info!(ytdlp = %settings.ytdlp.display(), ffmpeg = %settings.ffmpeg.display(), "starting");

    // Configure default native options for egui window
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([800.0, 600.0]),
        ..Default::default()
    };
    eframe::run_native(
        "WT YouTube Playlist Downloader",
        options,
        Box::new(move |cc| {
            cc.egui_ctx.set_visuals(Visuals::dark());
            Box::new(PlaylistApp::new(settings))
        }),
    )
    .map_err(|err| anyhow!("failed to open the main window: {err}"))
}

/// Application state for the GUI
struct PlaylistApp {
    /// Input field for the playlist URL
    url_input: String,
    /// Destination folder for downloads
    download_folder: String,
    /// Selected quality option
    selected_quality: Quality,
    /// Upscale every file after it is downloaded
    enhance: bool,
    /// Run state, progress and log panel contents
    session: Session,
    /// Shared download loop handed to each run
    worker: Arc<Worker>,
}

impl PlaylistApp {
    fn new(settings: Settings) -> Self {
        let source = Arc::new(YtDlpSource::new(settings.ytdlp.clone()));
        let enhancer = Arc::new(FfmpegEnhancer::new(
            settings.ffmpeg.clone(),
            settings.enhance_target,
        ));
        Self {
            url_input: String::new(),
            download_folder: settings.download_folder.display().to_string(),
            selected_quality: settings.default_quality,
            enhance: false,
            session: Session::default(),
            worker: Arc::new(Worker::new(source, enhancer)),
        }
    }

    /// Validates the form and launches a worker starting at `start_index`
    fn start(&mut self, start_index: usize, ctx: &egui::Context) {
        let request = match DownloadRequest::new(
            &self.url_input,
            self.selected_quality,
            &self.download_folder,
            start_index,
            self.enhance,
        ) {
            Ok(request) => request,
            Err(err) => {
                self.session.warn(err.to_string());
                return;
            }
        };
        let Some(rt) = RUNTIME.get() else {
            self.session.warn("Background runtime is not available");
            return;
        };
        let Some(handle) = self.session.begin(start_index) else {
            return;
        };

        let worker = Arc::clone(&self.worker);
        let ctx = ctx.clone();
        rt.spawn(async move {
            worker.run(&request, &handle.stop, &handle.events).await;
            ctx.request_repaint();
        });
    }
}

/// GUI update loop: called each frame to redraw and handle interactions
impl App for PlaylistApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut Frame) {
        // Apply everything the worker reported since the last frame
        self.session.poll();
        let controls = self.session.controls();

        if let Some(notice) = self.session.notice().cloned() {
            egui::Window::new(notice.title())
                .collapsible(false)
                .resizable(false)
                .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
                .show(ctx, |ui| {
                    ui.label(notice.message());
                    if ui.button("OK").clicked() {
                        self.session.dismiss_notice();
                    }
                });
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading("YouTube Playlist Downloader");
            ui.add_space(8.0);

            // URL input field
            ui.label("Playlist URL:");
            ui.add(
                egui::TextEdit::singleline(&mut self.url_input)
                    .hint_text("Enter YouTube playlist URL")
                    .desired_width(f32::INFINITY),
            );

            // Quality dropdown
            ui.horizontal(|ui| {
                ui.label("Select Quality:");
                egui::ComboBox::from_id_source("quality")
                    .selected_text(self.selected_quality.label())
                    .show_ui(ui, |ui| {
                        for q in Quality::ALL {
                            ui.selectable_value(&mut self.selected_quality, q, q.label());
                        }
                    });
                ui.checkbox(&mut self.enhance, "Upscale after download");
            });

            // Folder selection
            ui.horizontal(|ui| {
                ui.label("Save to:");
                ui.text_edit_singleline(&mut self.download_folder);
                if ui.button("Browse…").clicked() {
                    if let Some(folder) = FileDialog::new()
                        .set_directory(&self.download_folder)
                        .pick_folder()
                    {
                        self.download_folder = folder.display().to_string();
                    }
                }
            });

            ui.add_space(8.0);
            ui.horizontal(|ui| {
                if ui
                    .add_enabled(controls.download, egui::Button::new("Download"))
                    .clicked()
                {
                    self.start(0, ctx);
                }
                if ui
                    .add_enabled(controls.stop, egui::Button::new("Stop"))
                    .clicked()
                {
                    self.session.request_stop();
                }
                if ui
                    .add_enabled(controls.resume, egui::Button::new("Resume"))
                    .clicked()
                {
                    if let Some(index) = self.session.resume_index() {
                        self.start(index, ctx);
                    }
                }
                if ui.button("Clear Log").clicked() {
                    self.session.clear_log();
                }
            });

            ui.add_space(8.0);
            if self.session.state() == RunState::Stopping {
                ui.label("Stopping after the current video…");
            }
            ui.add(
                egui::ProgressBar::new(f32::from(self.session.progress()) / 100.0)
                    .show_percentage(),
            );

            ui.add_space(8.0);
            ui.label("Log:");
            egui::ScrollArea::vertical()
                .auto_shrink([false; 2])
                .stick_to_bottom(true)
                .show(ui, |ui| {
                    for line in self.session.log() {
                        ui.monospace(line);
                    }
                });
        });

        // Request periodic repaint for progress updates
        ctx.request_repaint_after(std::time::Duration::from_millis(100));
    }
}
