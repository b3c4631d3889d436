//! UI state for the two-step fetch → download workflow.
//!
//! Each user action is a `begin_*`/`submit_*` method that validates input,
//! updates the view state and hands back a job; the matching `finish_*`
//! method applies the job's outcome. The async work in between lives in
//! [`crate::actions`].

use std::path::PathBuf;

use tracing::{debug, warn};

use crate::api::ApiError;
use crate::filename::derive_file_name;
use crate::model::{DEFAULT_EXT, FormatOption, Notice, Status, VideoInfo};

pub const EMPTY_URL: &str = "Please paste a YouTube URL.";
pub const NO_VIDEO: &str = "Fetch a video first.";
pub const FETCH_FAILED: &str = "Failed to fetch video info.";
pub const SERVER_UNREACHABLE: &str = "Could not connect to server. Is it running?";
pub const OPENING: &str = "Opening direct stream if available...";

/// Visibility of the format panel.
///
/// Revealing goes through `Revealing` for exactly one rendered frame so the
/// fade-in starts from the hidden state instead of snapping to visible.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PanelVisibility {
    #[default]
    Hidden,
    Revealing,
    Visible,
}

impl PanelVisibility {
    pub fn is_shown(self) -> bool {
        !matches!(self, PanelVisibility::Hidden)
    }

    /// Target of the fade animation
    pub fn is_opaque(self) -> bool {
        matches!(self, PanelVisibility::Visible)
    }
}

/// Work for the metadata request
#[derive(Debug, Clone, PartialEq)]
pub struct FetchJob {
    pub url: String,
}

/// Work for a `/download` request, shared by "open" and "download"
#[derive(Debug, Clone, PartialEq)]
pub struct TransferJob {
    pub url: String,
    pub format_id: String,
    pub ext: String,
    /// Name derived from the title, used when the server suggests none
    pub file_name: String,
    pub dest_dir: PathBuf,
}

/// Application state for the GUI
#[derive(Debug)]
pub struct Controller {
    /// Input field for the video URL
    pub url_input: String,
    /// Destination folder for downloads
    pub download_folder: String,
    /// Index of the selected entry in `options`
    pub selected: usize,
    status: Status,
    panel: PanelVisibility,
    /// Bumped on every reveal so each one gets its own fade
    reveal_generation: u64,
    video: Option<VideoInfo>,
    options: Vec<FormatOption>,
    fetch_enabled: bool,
    download_enabled: bool,
}

impl Controller {
    pub fn new(download_folder: impl Into<String>) -> Self {
        Self {
            url_input: String::new(),
            download_folder: download_folder.into(),
            selected: 0,
            status: Status::Clear,
            panel: PanelVisibility::Hidden,
            reveal_generation: 0,
            video: None,
            options: Vec::new(),
            fetch_enabled: true,
            download_enabled: true,
        }
    }

    pub fn status(&self) -> &Status {
        &self.status
    }

    pub fn panel(&self) -> PanelVisibility {
        self.panel
    }

    pub fn reveal_generation(&self) -> u64 {
        self.reveal_generation
    }

    pub fn video(&self) -> Option<&VideoInfo> {
        self.video.as_ref()
    }

    pub fn options(&self) -> &[FormatOption] {
        &self.options
    }

    pub fn fetch_enabled(&self) -> bool {
        self.fetch_enabled
    }

    pub fn download_enabled(&self) -> bool {
        self.download_enabled
    }

    pub fn selected_option(&self) -> Option<&FormatOption> {
        self.options.get(self.selected)
    }

    /// Called once per rendered frame; completes a pending reveal
    pub fn settle(&mut self) {
        if self.panel == PanelVisibility::Revealing {
            self.panel = PanelVisibility::Visible;
        }
    }

    fn show_panel(&mut self) {
        self.panel = PanelVisibility::Revealing;
        self.reveal_generation += 1;
    }

    fn hide_panel(&mut self) {
        self.panel = PanelVisibility::Hidden;
    }

    /// URL form submitted
    pub fn submit_url(&mut self) -> Option<FetchJob> {
        let url = self.url_input.trim();
        if url.is_empty() {
            self.status = Status::Error(EMPTY_URL.to_string());
            return None;
        }
        let job = FetchJob {
            url: url.to_string(),
        };

        self.fetch_enabled = false;
        self.hide_panel();
        self.status = Status::Loading;
        debug!(url = %job.url, "fetching video info");
        Some(job)
    }

    pub fn finish_fetch(&mut self, result: Result<VideoInfo, ApiError>) {
        self.status = Status::Clear;
        match result {
            Ok(info) => {
                self.populate_formats(&info);
                self.video = Some(info);
                self.show_panel();
            }
            Err(ApiError::Http { message, .. }) => {
                // An unparsable error body counts as a failed connection
                self.status =
                    Status::Error(message.or_fallback(FETCH_FAILED, SERVER_UNREACHABLE));
            }
            Err(ApiError::Connection(cause)) => {
                warn!("video info request failed: {cause}");
                self.status = Status::Error(SERVER_UNREACHABLE.to_string());
            }
        }
        self.fetch_enabled = true;
    }

    /// Clear button
    pub fn clear(&mut self) {
        self.url_input.clear();
        self.status = Status::Clear;
        self.hide_panel();
        self.video = None;
        self.options.clear();
        self.selected = 0;
    }

    /// Rebuilds the format list from `info`
    pub fn populate_formats(&mut self, info: &VideoInfo) {
        self.options = format_options(info);
        self.selected = 0;
    }

    fn transfer_job(&self) -> Option<TransferJob> {
        let video = self.video.as_ref()?;
        let (format_id, ext) = match self.selected_option() {
            Some(opt) => (opt.value.clone(), opt.ext.clone()),
            None => (String::new(), DEFAULT_EXT.to_string()),
        };
        Some(TransferJob {
            url: self.url_input.trim().to_string(),
            file_name: derive_file_name(video.title.as_deref(), &ext),
            format_id,
            ext,
            dest_dir: PathBuf::from(&self.download_folder),
        })
    }

    /// "Open" button
    pub fn begin_open(&mut self) -> Option<TransferJob> {
        let Some(job) = self.transfer_job() else {
            self.status = Status::Error(NO_VIDEO.to_string());
            return None;
        };
        self.status = Status::Info(OPENING.to_string());
        Some(job)
    }

    /// `None` leaves the status line untouched
    pub fn finish_open(&mut self, notice: Option<Notice>) {
        if let Some(notice) = notice {
            self.status = notice.into();
        }
    }

    /// Download form submitted
    pub fn begin_download(&mut self) -> Option<TransferJob> {
        let Some(job) = self.transfer_job() else {
            self.status = Status::Error(NO_VIDEO.to_string());
            return None;
        };
        self.download_enabled = false;
        self.status = Status::Loading;
        Some(job)
    }

    pub fn finish_download(&mut self, notice: Notice) {
        self.status = notice.into();
        self.download_enabled = true;
    }
}

/// Selection entries for `info`; a single disabled placeholder when it has no formats
pub fn format_options(info: &VideoInfo) -> Vec<FormatOption> {
    match info.formats.as_deref() {
        Some(formats) if !formats.is_empty() => formats.iter().map(FormatOption::from).collect(),
        _ => vec![FormatOption::placeholder()],
    }
}
