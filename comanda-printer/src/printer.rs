//! Raw device writer for USB line printers
//!
//! One in-flight write per device path. The blocking write owns the path
//! lock until the OS call returns, so a timed-out job can never interleave
//! its bytes with the next one on the same printer. A job abandoned by its
//! caller drops its data instead of printing late.

use crate::error::{PrintError, PrintResult};
use dashmap::DashMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};

/// Default bound on lock wait plus write
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(5);

/// Trait for device writers
#[allow(async_fn_in_trait)]
pub trait DeviceWriter {
    /// Send raw ESC/POS data to the device node, all or nothing from the
    /// caller's point of view
    async fn write(&self, path: &Path, data: &[u8]) -> PrintResult<()>;
}

/// Character device printer (`/dev/usb/lpN`)
#[derive(Debug)]
pub struct DevicePrinter {
    timeout: Duration,
    locks: DashMap<PathBuf, Arc<Mutex<()>>>,
}

impl DevicePrinter {
    pub fn new() -> Self {
        Self {
            timeout: DEFAULT_WRITE_TIMEOUT,
            locks: DashMap::new(),
        }
    }

    /// Set write timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn lock_for(&self, path: &Path) -> Arc<Mutex<()>> {
        self.locks
            .entry(path.to_path_buf())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

impl Default for DevicePrinter {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceWriter for DevicePrinter {
    #[instrument(skip(self, data), fields(path = %path.display(), data_len = data.len()))]
    async fn write(&self, path: &Path, data: &[u8]) -> PrintResult<()> {
        let lock = self.lock_for(path);
        let target = path.to_path_buf();
        let data = data.to_vec();
        let abandoned = Arc::new(AtomicBool::new(false));
        let job_abandoned = abandoned.clone();

        let job = async move {
            let guard = lock.lock_owned().await;
            tokio::task::spawn_blocking(move || {
                let _guard = guard;
                write_blocking(&target, &data, &job_abandoned)
            })
            .await
        };

        match tokio::time::timeout(self.timeout, job).await {
            Ok(Ok(result)) => {
                if result.is_ok() {
                    info!("Print job written to device");
                }
                result
            }
            Ok(Err(e)) => Err(PrintError::Io(std::io::Error::other(format!(
                "Write task failed: {}",
                e
            )))),
            Err(_) => {
                abandoned.store(true, Ordering::SeqCst);
                warn!(timeout_ms = self.timeout.as_millis() as u64, "Device write timed out");
                Err(PrintError::Timeout(format!(
                    "{} after {} ms",
                    path.display(),
                    self.timeout.as_millis()
                )))
            }
        }
    }
}

fn write_blocking(path: &Path, data: &[u8], abandoned: &AtomicBool) -> PrintResult<()> {
    let mut file = OpenOptions::new().append(true).open(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            PrintError::DeviceNotFound(path.display().to_string())
        } else {
            PrintError::Io(e)
        }
    })?;
    // The caller already reported a timeout; nothing may reach the paper now.
    if abandoned.load(Ordering::SeqCst) {
        warn!(path = %path.display(), "Dropping abandoned print job");
        return Err(PrintError::Timeout(path.display().to_string()));
    }
    file.write_all(data)?;
    file.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_to_node() {
        let dir = tempfile::tempdir().unwrap();
        let node = dir.path().join("lp0");
        std::fs::write(&node, b"").unwrap();

        let printer = DevicePrinter::new();
        printer.write(&node, &[0x1B, 0x40, b'o', b'k']).await.unwrap();

        assert_eq!(std::fs::read(&node).unwrap(), vec![0x1B, 0x40, b'o', b'k']);
    }

    #[tokio::test]
    async fn test_missing_node_is_not_created() {
        let dir = tempfile::tempdir().unwrap();
        let node = dir.path().join("lp9");

        let result = DevicePrinter::new().write(&node, b"x").await;
        assert!(matches!(result, Err(PrintError::DeviceNotFound(_))));
        assert!(!node.exists());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_writes_do_not_interleave() {
        let dir = tempfile::tempdir().unwrap();
        let node = dir.path().join("lp0");
        std::fs::write(&node, b"").unwrap();

        let printer = Arc::new(DevicePrinter::new());
        let mut handles = Vec::new();
        for i in 0..8u8 {
            let printer = printer.clone();
            let node = node.clone();
            handles.push(tokio::spawn(async move {
                let block = vec![b'a' + i; 64 * 1024];
                printer.write(&node, &block).await
            }));
        }
        for h in handles {
            h.await.unwrap().unwrap();
        }

        let written = std::fs::read(&node).unwrap();
        assert_eq!(written.len(), 8 * 64 * 1024);
        for chunk in written.chunks(64 * 1024) {
            assert!(chunk.iter().all(|b| *b == chunk[0]));
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_stuck_device_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let fifo = dir.path().join("stuck");
        let made = std::process::Command::new("mkfifo").arg(&fifo).status();
        if !matches!(made, Ok(s) if s.success()) {
            return;
        }

        // Opening a FIFO for writing blocks until a reader shows up.
        let printer = DevicePrinter::new().with_timeout(Duration::from_millis(200));
        let result = printer.write(&fifo, b"ticket").await;
        assert!(matches!(result, Err(PrintError::Timeout(_))));

        // Release the blocked writer; the abandoned job must not deliver.
        let mut reader = std::fs::File::open(&fifo).unwrap();
        let mut buf = Vec::new();
        std::io::Read::read_to_end(&mut reader, &mut buf).unwrap();
        assert!(buf.is_empty());
    }
}
