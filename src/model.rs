use serde::Deserialize;

/// Extension used when the backend does not name one
pub const DEFAULT_EXT: &str = "mp4";

/// Text of the disabled entry shown when a video has no formats
pub const NO_FORMATS_LABEL: &str = "No formats found";

/// Metadata returned by `/get_info` for one source URL
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct VideoInfo {
    /// Video title, absent for some sources
    #[serde(default)]
    pub title: Option<String>,
    /// Thumbnail URL
    #[serde(default)]
    pub thumbnail: Option<String>,
    /// Available formats, in the order the backend ranked them
    #[serde(default)]
    pub formats: Option<Vec<Format>>,
}

/// One downloadable variant of a video
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Format {
    /// Opaque format identifier sent back as `format_id`
    pub id: String,
    /// Display text
    #[serde(default)]
    pub label: String,
    /// File extension
    #[serde(default)]
    pub ext: Option<String>,
}

impl Format {
    pub fn ext_or_default(&self) -> &str {
        match self.ext.as_deref() {
            Some(ext) if !ext.is_empty() => ext,
            _ => DEFAULT_EXT,
        }
    }
}

/// One rendered entry of the format selection list
#[derive(Debug, Clone, PartialEq)]
pub struct FormatOption {
    pub value: String,
    pub label: String,
    pub ext: String,
    pub disabled: bool,
}

impl FormatOption {
    pub fn placeholder() -> Self {
        Self {
            value: String::new(),
            label: NO_FORMATS_LABEL.to_string(),
            ext: DEFAULT_EXT.to_string(),
            disabled: true,
        }
    }
}

impl From<&Format> for FormatOption {
    fn from(format: &Format) -> Self {
        Self {
            value: format.id.clone(),
            label: format.label.clone(),
            ext: format.ext_or_default().to_string(),
            disabled: false,
        }
    }
}

/// Contents of the status area
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Status {
    #[default]
    Clear,
    Loading,
    Info(String),
    Error(String),
}

/// Message produced by a finished action, shown in the status area
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    Info(String),
    Error(String),
}

impl Notice {
    pub fn info(msg: impl Into<String>) -> Self {
        Notice::Info(msg.into())
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Notice::Error(msg.into())
    }
}

impl From<Notice> for Status {
    fn from(notice: Notice) -> Self {
        match notice {
            Notice::Info(msg) => Status::Info(msg),
            Notice::Error(msg) => Status::Error(msg),
        }
    }
}

/// Represents the current state of a background transfer
#[derive(Debug, Clone, PartialEq)]
pub enum DownloadStatus {
    /// Transfer is in progress
    Downloading,
    /// Transfer has completed successfully
    Done,
    /// Transfer stopped with an error
    Failed(String),
}

/// Data structure for tracking a direct-link transfer in the UI
#[derive(Debug, Clone)]
pub struct DownloadTask {
    /// Transfer identifier, unique for the lifetime of the app
    pub id: u64,
    /// Name of the file being written in the download folder
    pub file_name: String,
    /// Current status of the transfer
    pub status: DownloadStatus,
    /// Progress fraction (0.0 to 1.0)
    pub progress: f32,
}

/// Update sent by a running transfer
#[derive(Debug, Clone, PartialEq)]
pub enum TransferEvent {
    Started { id: u64, file_name: String },
    Progress { id: u64, fraction: f32 },
    Finished { id: u64 },
    Failed { id: u64, reason: String },
}
