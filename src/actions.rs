//! Async continuations for the controller's jobs.

use std::{path::Path, sync::Arc, time::Duration};

use tracing::{error, info, warn};

use crate::api::{ApiError, Backend, DownloadReply};
use crate::controller::{FetchJob, TransferJob};
use crate::model::{Notice, VideoInfo};
use crate::shell::Shell;

pub const LINK_UNAVAILABLE: &str = "Direct link not available.";
pub const LINK_FAILED: &str = "Failed to get link";
pub const UNKNOWN_ERROR: &str = "Unknown error";
pub const OPEN_UNREACHABLE: &str = "Could not reach server to open link.";
pub const NO_DIRECT_LINK: &str = "No direct download link returned.";
pub const DOWNLOAD_FAILED: &str = "Download failed.";
pub const SERVER_ERROR: &str = "Server error";
pub const DOWNLOAD_UNREACHABLE: &str = "Connection error during download.";
pub const DIRECT_STARTED: &str = "Download started (direct link).";
pub const SERVER_SIDE_DONE: &str = "Server-side download complete.";

pub async fn fetch_info(backend: &dyn Backend, job: FetchJob) -> Result<VideoInfo, ApiError> {
    backend.get_info(&job.url).await
}

/// Opens the selected format externally.
///
/// A file reply is staged as a temporary file, opened, and removed after
/// `release_after` on its own task. Returns `None` on success.
pub async fn open_direct_link(
    backend: &dyn Backend,
    shell: Arc<dyn Shell>,
    job: TransferJob,
    release_after: Duration,
) -> Option<Notice> {
    let reply = match backend.request_download(&job.url, &job.format_id).await {
        Ok(reply) => reply,
        Err(ApiError::Http { message, .. }) => {
            return Some(Notice::error(message.or_fallback(LINK_FAILED, UNKNOWN_ERROR)));
        }
        Err(ApiError::Connection(cause)) => {
            warn!("open request failed: {cause}");
            return Some(Notice::error(OPEN_UNREACHABLE));
        }
    };

    match reply {
        DownloadReply::DirectLink(Some(link)) => match shell.open_external(&link) {
            Ok(()) => {
                info!("opened direct link");
                None
            }
            Err(e) => {
                error!("could not open direct link: {e:#}");
                Some(Notice::error(OPEN_UNREACHABLE))
            }
        },
        DownloadReply::DirectLink(None) => Some(Notice::error(LINK_UNAVAILABLE)),
        DownloadReply::File { bytes, .. } => {
            let blob = match shell.stage_blob(bytes, &job.ext).await {
                Ok(blob) => blob,
                Err(e) => {
                    error!("could not stage file for opening: {e:#}");
                    return Some(Notice::error(OPEN_UNREACHABLE));
                }
            };
            let opened = shell.open_blob(&blob);

            let releaser = Arc::clone(&shell);
            tokio::spawn(async move {
                tokio::time::sleep(release_after).await;
                releaser.release_blob(blob);
            });

            match opened {
                Ok(()) => None,
                Err(e) => {
                    error!("could not open staged file: {e:#}");
                    Some(Notice::error(OPEN_UNREACHABLE))
                }
            }
        }
    }
}

/// Downloads the selected format into `job.dest_dir`
pub async fn download(backend: &dyn Backend, shell: &dyn Shell, job: TransferJob) -> Notice {
    let reply = match backend.request_download(&job.url, &job.format_id).await {
        Ok(reply) => reply,
        Err(ApiError::Http { message, .. }) => {
            return Notice::error(message.or_fallback(DOWNLOAD_FAILED, SERVER_ERROR));
        }
        Err(ApiError::Connection(cause)) => {
            warn!("download request failed: {cause}");
            return Notice::error(DOWNLOAD_UNREACHABLE);
        }
    };

    match reply {
        DownloadReply::DirectLink(Some(link)) => {
            let dest = job.dest_dir.join(&job.file_name);
            match shell.start_transfer(&link, dest) {
                Ok(()) => Notice::info(DIRECT_STARTED),
                Err(e) => {
                    error!("could not start direct-link download: {e:#}");
                    Notice::error(format!("Could not start download: {e:#}"))
                }
            }
        }
        DownloadReply::DirectLink(None) => Notice::error(NO_DIRECT_LINK),
        DownloadReply::File {
            bytes,
            suggested_name,
        } => {
            let file_name = suggested_name
                .as_deref()
                .and_then(|name| Path::new(name).file_name())
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or(job.file_name);
            let dest = job.dest_dir.join(&file_name);

            let blob = match shell.stage_blob(bytes, &job.ext).await {
                Ok(blob) => blob,
                Err(e) => {
                    error!("could not stage downloaded file: {e:#}");
                    return Notice::error(format!("Could not save file: {e:#}"));
                }
            };
            let saved = shell.save_blob(&blob, &dest).await;
            shell.release_blob(blob);

            match saved {
                Ok(()) => Notice::info(SERVER_SIDE_DONE),
                Err(e) => {
                    error!("could not save downloaded file: {e:#}");
                    Notice::error(format!("Could not save file: {e:#}"))
                }
            }
        }
    }
}
