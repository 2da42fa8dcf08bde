use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tempfile::TempDir;
use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

use crate::error::{RunError, RunResult};

/// Extensions browsers use for files that are still being written. Chrome on
/// Linux also drops hidden `.com.google.Chrome.*` files next to the download.
const PARTIAL_EXTENSIONS: &[&str] = &["crdownload", "part", "tmp"];

pub const DOWNLOAD_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Runs `check` until it yields a value or `timeout` has elapsed.
///
/// The deadline is tested after each call, so a final check always runs at
/// the deadline. Returns `Ok(None)` on expiry; check errors abort the wait.
pub async fn poll_until<T, E, F, Fut>(
    timeout: Duration,
    interval: Duration,
    mut check: F,
) -> Result<Option<T>, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>, E>>,
{
    let start = Instant::now();
    loop {
        if let Some(value) = check().await? {
            return Ok(Some(value));
        }

        let elapsed = start.elapsed();
        if elapsed >= timeout {
            return Ok(None);
        }

        sleep(interval.min(timeout - elapsed)).await;
    }
}

/// Run-exclusive temporary directory the browser downloads into.
pub struct ScratchDir {
    dir: Option<TempDir>,
    path: PathBuf,
}

impl ScratchDir {
    pub fn new() -> RunResult<Self> {
        let dir = tempfile::Builder::new()
            .prefix("payslip-downloader-")
            .tempdir()
            .map_err(|e| RunError::io(std::env::temp_dir(), e))?;
        let path = dir.path().to_path_buf();
        debug!("created scratch folder {}", path.display());
        Ok(Self { dir: Some(dir), path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Completed downloads currently in the folder.
    pub fn completed_files(&self) -> RunResult<Vec<PathBuf>> {
        let entries = std::fs::read_dir(&self.path).map_err(|e| RunError::io(&self.path, e))?;

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| RunError::io(&self.path, e))?;
            let path = entry.path();
            if path.is_file() && !is_partial(&path) {
                files.push(path);
            }
        }
        Ok(files)
    }

    /// The completed file with the latest creation time.
    pub fn latest_file(&self) -> RunResult<PathBuf> {
        let mut latest: Option<(SystemTime, PathBuf)> = None;
        for path in self.completed_files()? {
            let metadata = std::fs::metadata(&path).map_err(|e| RunError::io(&path, e))?;
            // Not every filesystem records a birth time.
            let created = metadata
                .created()
                .or_else(|_| metadata.modified())
                .map_err(|e| RunError::io(&path, e))?;

            if latest.as_ref().map_or(true, |(t, _)| created >= *t) {
                latest = Some((created, path));
            }
        }

        latest
            .map(|(_, path)| path)
            .ok_or_else(|| RunError::NoDownloadedFile(self.path.clone()))
    }

    /// Waits until the folder holds more completed files than `baseline`,
    /// checking every `interval`.
    pub async fn wait_for_new_file_every(
        &self,
        baseline: usize,
        timeout: Duration,
        interval: Duration,
    ) -> RunResult<()> {
        let found = poll_until(timeout, interval, move || async move {
            let count = self.completed_files()?.len();
            Ok::<_, RunError>((count > baseline).then_some(count))
        })
        .await?;

        match found {
            Some(count) => {
                debug!("download finished, {} file(s) in scratch folder", count);
                Ok(())
            }
            None => Err(RunError::DownloadTimeout {
                folder: self.path.clone(),
                timeout,
            }),
        }
    }

    /// Removes the folder and everything in it. Calling it again is a no-op.
    pub fn close(&mut self) -> RunResult<()> {
        if let Some(dir) = self.dir.take() {
            debug!("remove temp folder {}", self.path.display());
            dir.close().map_err(|e| RunError::io(&self.path, e))?;
        }
        Ok(())
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!("failed to remove scratch folder: {}", e);
        }
    }
}

fn is_partial(path: &Path) -> bool {
    let hidden = path
        .file_name()
        .and_then(|n| n.to_str())
        .map_or(false, |n| n.starts_with('.'));

    hidden
        || path
            .extension()
            .and_then(|e| e.to_str())
            .map_or(false, |e| PARTIAL_EXTENSIONS.iter().any(|p| e.eq_ignore_ascii_case(p)))
}
