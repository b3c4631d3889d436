//! Platform side effects: opening things, temporary blob files, saving and
//! background direct-link transfers.

use std::{
    io::Write,
    path::{Path, PathBuf},
    sync::atomic::{AtomicU64, Ordering},
};

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use tempfile::TempPath;
use tokio::{io::AsyncWriteExt, runtime::Handle, sync::mpsc::UnboundedSender};
use tracing::{debug, error, info, warn};

use crate::model::TransferEvent;
use crate::progress::fraction;

/// Temporary local reference to downloaded bytes
#[derive(Debug)]
pub struct BlobRef {
    path: PathBuf,
    guard: Option<TempPath>,
}

impl BlobRef {
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[cfg(test)]
    pub fn untracked(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            guard: None,
        }
    }
}

#[async_trait]
pub trait Shell: Send + Sync {
    /// Opens a URL with the system handler
    fn open_external(&self, target: &str) -> Result<()>;

    /// Writes bytes to a temporary file ending in `.{ext}`
    async fn stage_blob(&self, bytes: Vec<u8>, ext: &str) -> Result<BlobRef>;

    /// Opens a staged blob with the system handler
    fn open_blob(&self, blob: &BlobRef) -> Result<()>;

    /// Copies a staged blob to `dest`
    async fn save_blob(&self, blob: &BlobRef, dest: &Path) -> Result<()>;

    /// Deletes a staged blob
    fn release_blob(&self, blob: BlobRef);

    /// Starts streaming `url` into `dest` in the background
    fn start_transfer(&self, url: &str, dest: PathBuf) -> Result<()>;
}

/// [`Shell`] for the desktop app
pub struct DesktopShell {
    runtime: Handle,
    client: reqwest::Client,
    events: UnboundedSender<TransferEvent>,
    next_id: AtomicU64,
}

impl DesktopShell {
    pub fn new(runtime: Handle, events: UnboundedSender<TransferEvent>) -> Self {
        Self {
            runtime,
            client: reqwest::Client::new(),
            events,
            next_id: AtomicU64::new(1),
        }
    }
}

#[async_trait]
impl Shell for DesktopShell {
    fn open_external(&self, target: &str) -> Result<()> {
        open::that_detached(target).with_context(|| format!("Failed to open {target}"))
    }

    async fn stage_blob(&self, bytes: Vec<u8>, ext: &str) -> Result<BlobRef> {
        let suffix = format!(".{ext}");
        let path = tokio::task::spawn_blocking(move || -> Result<TempPath> {
            let mut file = tempfile::Builder::new()
                .prefix("video_fetch_")
                .suffix(&suffix)
                .tempfile()
                .context("Failed to create temporary file")?;
            file.write_all(&bytes).context("Failed to write temporary file")?;
            Ok(file.into_temp_path())
        })
        .await
        .context("Staging task panicked")??;

        debug!(path = %path.display(), "staged blob");
        Ok(BlobRef {
            path: path.to_path_buf(),
            guard: Some(path),
        })
    }

    fn open_blob(&self, blob: &BlobRef) -> Result<()> {
        open::that_detached(blob.path())
            .with_context(|| format!("Failed to open {}", blob.path().display()))
    }

    async fn save_blob(&self, blob: &BlobRef, dest: &Path) -> Result<()> {
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        tokio::fs::copy(blob.path(), dest)
            .await
            .with_context(|| format!("Failed to save {}", dest.display()))?;
        info!(dest = %dest.display(), "saved server-side download");
        Ok(())
    }

    fn release_blob(&self, blob: BlobRef) {
        if let Some(guard) = blob.guard {
            if let Err(e) = guard.close() {
                warn!(path = %blob.path.display(), "could not remove temporary file: {e}");
            }
        }
    }

    fn start_transfer(&self, url: &str, dest: PathBuf) -> Result<()> {
        let Some(file_name) = dest.file_name().map(|n| n.to_string_lossy().into_owned()) else {
            bail!("Destination {} has no file name", dest.display());
        };
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let _ = self.events.send(TransferEvent::Started { id, file_name });

        let client = self.client.clone();
        let events = self.events.clone();
        let url = url.to_string();
        self.runtime.spawn(async move {
            let event = match transfer(&client, &url, &dest, id, &events).await {
                Ok(()) => {
                    info!(dest = %dest.display(), "direct-link download finished");
                    TransferEvent::Finished { id }
                }
                Err(e) => {
                    error!(dest = %dest.display(), "direct-link download failed: {e:#}");
                    // reqwest errors already print their sources, so show only the innermost one
                    TransferEvent::Failed {
                        id,
                        reason: e.root_cause().to_string(),
                    }
                }
            };
            let _ = events.send(event);
        });
        Ok(())
    }
}

async fn transfer(
    client: &reqwest::Client,
    url: &str,
    dest: &Path,
    id: u64,
    events: &UnboundedSender<TransferEvent>,
) -> Result<()> {
    let mut resp = client
        .get(url)
        .send()
        .await
        .context("Request failed")?
        .error_for_status()
        .context("Server refused the download")?;
    let total = resp.content_length();

    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    // Write to a .part file first so a half-written file never carries the final name
    let part = dest.with_extension(match dest.extension() {
        Some(ext) => format!("{}.part", ext.to_string_lossy()),
        None => "part".to_string(),
    });
    let file = tokio::fs::File::create(&part)
        .await
        .with_context(|| format!("Failed to create {}", part.display()))?;

    let written = write_body(&mut resp, file, total, id, events).await;
    let result = match written {
        Ok(()) => tokio::fs::rename(&part, dest)
            .await
            .with_context(|| format!("Failed to move {} into place", part.display())),
        Err(e) => Err(e),
    };
    if result.is_err() {
        if let Err(e) = tokio::fs::remove_file(&part).await {
            warn!(part = %part.display(), "could not remove partial download: {e}");
        }
    }
    result
}

async fn write_body(
    resp: &mut reqwest::Response,
    mut file: tokio::fs::File,
    total: Option<u64>,
    id: u64,
    events: &UnboundedSender<TransferEvent>,
) -> Result<()> {
    let mut done: u64 = 0;
    while let Some(chunk) = resp.chunk().await.context("Connection dropped")? {
        file.write_all(&chunk).await?;
        done += chunk.len() as u64;
        if let Some(f) = fraction(done, total) {
            let _ = events.send(TransferEvent::Progress { id, fraction: f });
        }
    }
    file.flush().await?;
    Ok(())
}
