//! Desktop client for a "paste a URL, pick a format, download" video backend

// Async continuations for user actions
mod actions;
// Backend API client
mod api;
// Command-line configuration
mod config;
// UI state and user-action handling
mod controller;
// Content-Disposition filename recovery
mod disposition;
// Title sanitisation for save names
mod filename;
// Data models for videos, formats and transfers
mod model;
// Transfer progress helpers
mod progress;
// Platform side effects (open, save, temporary files, transfers)
mod shell;
// Thumbnail fetching module
mod thumbnail;
#[cfg(test)]
mod test_support;

use std::sync::{Arc, Mutex};

use clap::Parser;
// eframe/egui for GUI application framework
use eframe::{App, Frame, egui};
use egui::{Color32, ColorImage, TextureOptions, Visuals};
// OnceCell for single-time runtime initialization
use once_cell::sync::OnceCell;
// FileDialog for folder selection dialogs
use rfd::FileDialog;
use tokio::{
    runtime::Runtime,
    sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel},
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use api::{ApiError, Backend, HttpBackend};
use config::{Args, ClientConfig};
use controller::{Controller, FetchJob, PanelVisibility, TransferJob};
use model::{DownloadStatus, DownloadTask, Notice, Status, TransferEvent, VideoInfo};
use shell::{DesktopShell, Shell};

const PANEL_FADE_SECS: f32 = 0.3;

// Global Tokio runtime stored in a OnceCell for lazy init
static RUNTIME: OnceCell<Arc<Runtime>> = OnceCell::new();

fn runtime() -> &'static Runtime {
    RUNTIME.get_or_init(|| Arc::new(Runtime::new().expect("failed to start Tokio runtime")))
}

/// Program entry point: initializes logging and runtime and launches GUI
fn main() -> Result<(), eframe::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ClientConfig::from(Args::parse());
    info!(server = %config.server, download_dir = %config.download_dir, "starting");
    runtime();

    let options = eframe::NativeOptions::default();
    eframe::run_native(
        "Video Fetch",
        options,
        Box::new(move |cc| {
            cc.egui_ctx.set_visuals(Visuals::dark());
            Box::new(FetchApp::new(config))
        }),
    )
}

/// A user action picked up while drawing the frame
enum Intent {
    Fetch,
    Clear,
    Open,
    Download,
    OpenFolder,
}

/// Result of a job that ran on the runtime
enum Completion {
    Fetched(Result<VideoInfo, ApiError>),
    Opened(Option<Notice>),
    Downloaded(Notice),
}

struct FetchApp {
    controller: Controller,
    config: ClientConfig,
    backend: Arc<dyn Backend>,
    shell: Arc<dyn Shell>,
    completions_tx: UnboundedSender<Completion>,
    completions_rx: UnboundedReceiver<Completion>,
    transfer_rx: UnboundedReceiver<TransferEvent>,
    /// Direct-link transfers, newest last
    downloads: Vec<DownloadTask>,
    /// Texture for the current video's thumbnail
    thumbnail: Option<egui::TextureHandle>,
    /// Incoming thumbnail fetch results (url, image)
    thumbnail_results: Arc<Mutex<Vec<(String, ColorImage)>>>,
}

impl FetchApp {
    fn new(config: ClientConfig) -> Self {
        let (completions_tx, completions_rx) = unbounded_channel();
        let (transfer_tx, transfer_rx) = unbounded_channel();
        Self {
            controller: Controller::new(config.download_dir.clone()),
            backend: Arc::new(HttpBackend::new(config.server.clone())),
            shell: Arc::new(DesktopShell::new(runtime().handle().clone(), transfer_tx)),
            config,
            completions_tx,
            completions_rx,
            transfer_rx,
            downloads: Vec::new(),
            thumbnail: None,
            thumbnail_results: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn spawn_fetch(&self, ctx: &egui::Context, job: FetchJob) {
        let backend = Arc::clone(&self.backend);
        let tx = self.completions_tx.clone();
        let ctx = ctx.clone();
        runtime().spawn(async move {
            let result = actions::fetch_info(backend.as_ref(), job).await;
            let _ = tx.send(Completion::Fetched(result));
            ctx.request_repaint();
        });
    }

    fn spawn_open(&self, ctx: &egui::Context, job: TransferJob) {
        let backend = Arc::clone(&self.backend);
        let shell = Arc::clone(&self.shell);
        let delay = self.config.open_release_delay;
        let tx = self.completions_tx.clone();
        let ctx = ctx.clone();
        runtime().spawn(async move {
            let notice = actions::open_direct_link(backend.as_ref(), shell, job, delay).await;
            let _ = tx.send(Completion::Opened(notice));
            ctx.request_repaint();
        });
    }

    fn spawn_download(&self, ctx: &egui::Context, job: TransferJob) {
        let backend = Arc::clone(&self.backend);
        let shell = Arc::clone(&self.shell);
        let tx = self.completions_tx.clone();
        let ctx = ctx.clone();
        runtime().spawn(async move {
            let notice = actions::download(backend.as_ref(), shell.as_ref(), job).await;
            let _ = tx.send(Completion::Downloaded(notice));
            ctx.request_repaint();
        });
    }

    fn spawn_thumbnail(&self, ctx: &egui::Context, url: String) {
        let results = Arc::clone(&self.thumbnail_results);
        let ctx = ctx.clone();
        runtime().spawn_blocking(move || {
            if let Some(img) = thumbnail::fetch_thumbnail(&url) {
                if let Ok(mut pending) = results.lock() {
                    pending.push((url, img));
                }
                ctx.request_repaint();
            }
        });
    }

    fn handle(&mut self, ctx: &egui::Context, intent: Intent) {
        match intent {
            Intent::Fetch => {
                if let Some(job) = self.controller.submit_url() {
                    self.spawn_fetch(ctx, job);
                }
            }
            Intent::Clear => {
                self.controller.clear();
                self.thumbnail = None;
            }
            Intent::Open => {
                if let Some(job) = self.controller.begin_open() {
                    self.spawn_open(ctx, job);
                }
            }
            Intent::Download => {
                if let Some(job) = self.controller.begin_download() {
                    self.spawn_download(ctx, job);
                }
            }
            Intent::OpenFolder => {
                if let Err(e) = self.shell.open_external(&self.controller.download_folder) {
                    error!("could not open download folder: {e:#}");
                }
            }
        }
    }

    fn apply(&mut self, ctx: &egui::Context, completion: Completion) {
        match completion {
            Completion::Fetched(result) => {
                let thumb = result
                    .as_ref()
                    .ok()
                    .and_then(|info| info.thumbnail.clone())
                    .filter(|url| !url.is_empty());
                self.thumbnail = None;
                self.controller.finish_fetch(result);
                if let Some(url) = thumb {
                    self.spawn_thumbnail(ctx, url);
                }
            }
            Completion::Opened(notice) => self.controller.finish_open(notice),
            Completion::Downloaded(notice) => self.controller.finish_download(notice),
        }
    }

    fn track(&mut self, event: TransferEvent) {
        match event {
            TransferEvent::Started { id, file_name } => self.downloads.push(DownloadTask {
                id,
                file_name,
                status: DownloadStatus::Downloading,
                progress: 0.0,
            }),
            TransferEvent::Progress { id, fraction } => {
                if let Some(task) = self.downloads.iter_mut().find(|t| t.id == id) {
                    // Only update if progress increased
                    if fraction > task.progress {
                        task.progress = fraction;
                    }
                }
            }
            TransferEvent::Finished { id } => {
                if let Some(task) = self.downloads.iter_mut().find(|t| t.id == id) {
                    task.progress = 1.0;
                    task.status = DownloadStatus::Done;
                }
            }
            TransferEvent::Failed { id, reason } => {
                if let Some(task) = self.downloads.iter_mut().find(|t| t.id == id) {
                    task.status = DownloadStatus::Failed(reason);
                }
            }
        }
    }

    fn downloads_panel(&mut self, ui: &mut egui::Ui, intents: &mut Vec<Intent>) {
        ui.heading("Active Downloads");
        ui.separator();

        egui::ScrollArea::vertical()
            .auto_shrink([false; 2])
            .show(ui, |ui| {
                let mut to_remove = vec![];

                for task in &self.downloads {
                    let status_text = match &task.status {
                        DownloadStatus::Downloading => "⬇️ Downloading".to_string(),
                        DownloadStatus::Done => "✅ Done".to_string(),
                        DownloadStatus::Failed(reason) => format!("⚠ {reason}"),
                    };
                    ui.group(|ui| {
                        ui.label(&task.file_name);
                        ui.label(status_text);
                        let bar = egui::ProgressBar::new(task.progress).show_percentage();
                        let bar = match task.status {
                            DownloadStatus::Downloading if task.progress == 0.0 => bar.animate(true),
                            _ => bar,
                        };
                        ui.add(bar);
                        if task.status != DownloadStatus::Downloading {
                            ui.horizontal(|ui| {
                                if ui.button("Open Folder").clicked() {
                                    intents.push(Intent::OpenFolder);
                                }
                                // Queue removal of finished task
                                if ui.add(egui::Button::new("❌").fill(Color32::RED)).clicked() {
                                    to_remove.push(task.id);
                                }
                            });
                        }
                    });
                }

                if !to_remove.is_empty() {
                    self.downloads.retain(|t| !to_remove.contains(&t.id));
                }
            });
    }

    fn main_panel(&mut self, ui: &mut egui::Ui, intents: &mut Vec<Intent>) {
        ui.heading("Video Fetch");

        // URL form
        ui.label("Paste YouTube video URL:");
        ui.horizontal(|ui| {
            let input = ui.text_edit_singleline(&mut self.controller.url_input);
            let submitted = input.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
            let fetch = ui.add_enabled(self.controller.fetch_enabled(), egui::Button::new("Fetch"));
            if fetch.clicked() || (submitted && self.controller.fetch_enabled()) {
                intents.push(Intent::Fetch);
            }
            if ui.button("Clear").clicked() {
                intents.push(Intent::Clear);
            }
        });

        // Folder selection
        ui.horizontal(|ui| {
            ui.label("Download folder:");
            ui.text_edit_singleline(&mut self.controller.download_folder);
            if ui.button("Browse…").clicked() {
                if let Some(folder) = FileDialog::new()
                    .set_directory(&self.controller.download_folder)
                    .pick_folder()
                {
                    self.controller.download_folder = folder.display().to_string();
                }
            }
        });

        // Status area
        match self.controller.status() {
            Status::Clear => {}
            Status::Loading => {
                ui.spinner();
            }
            Status::Info(msg) => {
                ui.colored_label(Color32::LIGHT_BLUE, msg);
            }
            Status::Error(msg) => {
                ui.colored_label(Color32::LIGHT_RED, msg);
            }
        }

        let panel = self.controller.panel();
        if !panel.is_shown() {
            return;
        }
        ui.separator();

        let opacity = panel_opacity(ui.ctx(), panel, self.controller.reveal_generation());
        ui.scope(|ui| {
            ui.set_opacity(opacity);
            self.format_panel(ui, intents);
        });
    }

    fn format_panel(&mut self, ui: &mut egui::Ui, intents: &mut Vec<Intent>) {
        ui.horizontal(|ui| {
            if let Some(tex) = &self.thumbnail {
                ui.add(egui::Image::new(tex).max_width(160.0));
            }
            if let Some(title) = self.controller.video().and_then(|v| v.title.as_deref()) {
                ui.strong(title);
            }
        });

        let mut selected = self.controller.selected;
        let selected_text = self
            .controller
            .selected_option()
            .map(|o| o.label.clone())
            .unwrap_or_default();
        egui::ComboBox::from_label("Format")
            .selected_text(selected_text)
            .show_ui(ui, |ui| {
                for (i, opt) in self.controller.options().iter().enumerate() {
                    ui.add_enabled_ui(!opt.disabled, |ui| {
                        ui.selectable_value(&mut selected, i, &opt.label);
                    });
                }
            });
        self.controller.selected = selected;

        ui.horizontal(|ui| {
            let download =
                ui.add_enabled(self.controller.download_enabled(), egui::Button::new("Download"));
            if download.clicked() {
                intents.push(Intent::Download);
            }
            if ui.button("Open in browser").clicked() {
                intents.push(Intent::Open);
            }
        });
    }
}

/// Fade of the format panel.
///
/// The animation id changes with every reveal, so a new reveal always starts
/// from transparent instead of resuming the previous one's finished fade.
fn panel_opacity(ctx: &egui::Context, panel: PanelVisibility, generation: u64) -> f32 {
    ctx.animate_bool_with_time(
        egui::Id::new(("format_panel", generation)),
        panel.is_opaque(),
        PANEL_FADE_SECS,
    )
}

/// GUI update loop: called each frame to redraw and handle interactions
impl App for FetchApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut Frame) {
        while let Ok(completion) = self.completions_rx.try_recv() {
            self.apply(ctx, completion);
        }
        while let Ok(event) = self.transfer_rx.try_recv() {
            self.track(event);
        }

        // Handle completed thumbnail fetches, dropping stale ones
        let pending: Vec<_> = match self.thumbnail_results.lock() {
            Ok(mut pending) => pending.drain(..).collect(),
            Err(_) => Vec::new(),
        };
        let current = self.controller.video().and_then(|v| v.thumbnail.clone());
        for (url, img) in pending {
            if current.as_deref() == Some(url.as_str()) {
                self.thumbnail = Some(ctx.load_texture(&url, img, TextureOptions::default()));
            }
        }

        let mut intents = Vec::new();
        egui::SidePanel::right("downloads_panel").show(ctx, |ui| {
            self.downloads_panel(ui, &mut intents);
        });
        egui::CentralPanel::default().show(ctx, |ui| {
            self.main_panel(ui, &mut intents);
        });

        // The reveal's first frame has been drawn hidden; let the fade run
        self.controller.settle();

        for intent in intents {
            self.handle(ctx, intent);
        }

        // Request periodic repaint for progress updates
        ctx.request_repaint_after(std::time::Duration::from_millis(100));
    }
}
