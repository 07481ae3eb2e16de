use super::{DownloadStarter, RenameStrategy};
use crate::config::Config;
use crate::errors::PolicyError;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio::time::Instant;

/// Extensions browsers use while a download is still being written.
const PARTIAL_EXTENSIONS: [&str; 3] = ["crdownload", "tmp", "part"];

#[derive(Debug, Clone, Copy)]
pub struct WatcherTiming {
    /// Sleep between directory scans.
    pub poll_interval: Duration,
    /// Wait before moving a finished file so the browser releases its handle.
    pub settle_delay: Duration,
    /// One-off deadline extension once a partial file shows up.
    pub start_grace: Duration,
}

impl Default for WatcherTiming {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(3),
            settle_delay: Duration::from_secs(2),
            start_grace: Duration::from_secs(10),
        }
    }
}

impl WatcherTiming {
    pub fn from_config(config: &Config) -> Self {
        Self {
            poll_interval: Duration::from_millis(config.download_poll_ms),
            settle_delay: Duration::from_millis(config.download_settle_ms),
            start_grace: Duration::from_secs(config.download_start_grace_secs),
        }
    }
}

/// Watches one company's temp download directory. The directory must not
/// be shared with another session: cleaning it would race.
#[derive(Debug, Clone)]
pub struct FileTransferWatcher {
    company: String,
    tmp_dir: PathBuf,
    timing: WatcherTiming,
}

fn is_ignored(name: &str) -> bool {
    name.to_lowercase().ends_with(".ini")
}

fn is_partial(name: &str) -> bool {
    Path::new(name)
        .extension()
        .map(|ext| {
            let ext = ext.to_string_lossy().to_lowercase();
            PARTIAL_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

impl FileTransferWatcher {
    pub fn new(company: impl Into<String>, tmp_dir: impl Into<PathBuf>, timing: WatcherTiming) -> Self {
        Self {
            company: company.into(),
            tmp_dir: tmp_dir.into(),
            timing,
        }
    }

    fn folder_error(&self, err: io::Error) -> PolicyError {
        if err.kind() == io::ErrorKind::NotFound {
            tracing::error!("❌ Carpeta no encontrada: {}", self.tmp_dir.display());
            PolicyError::FolderNotFound(self.tmp_dir.clone())
        } else {
            PolicyError::Io(err)
        }
    }

    /// Removes every file below the temp directory except desktop `.ini` files.
    pub async fn clean_tmp_folder(&self) -> Result<(), PolicyError> {
        let mut pending = vec![self.tmp_dir.clone()];
        let mut first = true;

        while let Some(dir) = pending.pop() {
            let mut entries = match tokio::fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if first => return Err(self.folder_error(e)),
                Err(e) => return Err(PolicyError::Io(e)),
            };
            first = false;

            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                let file_type = entry.file_type().await?;
                if file_type.is_dir() {
                    pending.push(path);
                } else if !is_ignored(&entry.file_name().to_string_lossy()) {
                    tokio::fs::remove_file(&path).await?;
                }
            }
        }

        Ok(())
    }

    /// Newest non-ignored file at the top of the temp directory.
    async fn newest_candidate(&self) -> Result<Option<String>, PolicyError> {
        let mut entries = tokio::fs::read_dir(&self.tmp_dir)
            .await
            .map_err(|e| self.folder_error(e))?;

        let mut newest: Option<(SystemTime, String)> = None;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if is_ignored(&name) {
                continue;
            }
            // The browser may rename the file between listing and stat
            let metadata = match entry.metadata().await {
                Ok(metadata) if metadata.is_file() => metadata,
                _ => continue,
            };
            let stamp = metadata
                .created()
                .or_else(|_| metadata.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            if newest.as_ref().map_or(true, |(best, _)| stamp >= *best) {
                newest = Some((stamp, name));
            }
        }

        Ok(newest.map(|(_, name)| name))
    }

    async fn move_file(&self, source: &Path, destination: &Path) -> Result<(), PolicyError> {
        if tokio::fs::rename(source, destination).await.is_err() {
            // Different filesystem
            tokio::fs::copy(source, destination).await?;
            tokio::fs::remove_file(source).await?;
        }
        Ok(())
    }

    /// Polls until a stable file appears, then moves it where `rename` says.
    /// `Ok(None)` means the deadline passed without a finished file.
    pub async fn wait_for_download_and_rename(
        &self,
        rename: &dyn RenameStrategy,
        timeout: Duration,
    ) -> Result<Option<PathBuf>, PolicyError> {
        let mut deadline = Instant::now() + timeout;
        let mut download_started = false;

        while Instant::now() < deadline {
            match self.newest_candidate().await? {
                None => tracing::debug!("⏳ La descarga no inició aún ({})", rename),
                Some(name) if is_partial(&name) => {
                    if !download_started {
                        deadline += self.timing.start_grace;
                        download_started = true;
                    }
                    tracing::debug!("⏳ Archivo aún descargándose: {}", name);
                }
                Some(name) => {
                    let source = self.tmp_dir.join(&name);
                    let destination = rename.destination(&name);

                    tokio::fs::create_dir_all(rename.folder()).await?;
                    if tokio::fs::metadata(&destination).await.is_ok() {
                        tokio::fs::remove_file(&destination).await?;
                        tracing::info!("🗑️ Se eliminó archivo existente {}", destination.display());
                    }

                    tokio::time::sleep(self.timing.settle_delay).await;
                    self.move_file(&source, &destination).await?;

                    tracing::info!("📄 {} → {}", name, destination.display());
                    return Ok(Some(destination));
                }
            }
            tokio::time::sleep(self.timing.poll_interval).await;
        }

        tracing::warn!("⌛ Tiempo agotado esperando {} en {}", rename, self.company);
        Ok(None)
    }

    /// Clean, trigger, verify, watch. Repeats on timeout until `max_attempts`
    /// starts were made, then fails with a company-scoped error.
    pub async fn download_file_from_starter(
        &self,
        starter: &dyn DownloadStarter,
        rename: &dyn RenameStrategy,
        timeout: Duration,
        max_attempts: u32,
    ) -> Result<PathBuf, PolicyError> {
        let max_attempts = max_attempts.max(1);

        for attempt in 1..=max_attempts {
            self.clean_tmp_folder().await?;
            starter.start_download().await?;
            starter.verify_download_in_progress(&rename.to_string()).await?;

            tracing::info!(
                "📥 Esperando {} de {} (intento {}/{})",
                rename,
                self.company,
                attempt,
                max_attempts
            );

            if let Some(path) = self.wait_for_download_and_rename(rename, timeout).await? {
                return Ok(path);
            }
            tracing::warn!("🔁 Falló la descarga de {}, intento {}/{}", rename, attempt, max_attempts);
        }

        Err(PolicyError::DownloadExhausted {
            company: self.company.clone(),
            target: rename.to_string(),
        })
    }
}
