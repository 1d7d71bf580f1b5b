//! # Output Retention
//!
//! Ogni richiesta `/convert` lascia i JPEG in `<output_dir>/<uuid>/`.
//! Questo modulo rimuove periodicamente le directory di richiesta più
//! vecchie di `server.retention_secs`, così lo spazio su disco del server
//! non cresce senza limite.
//!
//! Vengono considerate solo le sottodirectory dirette di `output_dir`;
//! i file sciolti non vengono toccati.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::error::ConvertError;

/// Longest wait between two sweeps
const MAX_SWEEP_PERIOD: Duration = Duration::from_secs(3600);

/// Remove the request directories under `output_dir` last modified at least
/// `max_age` ago, returning how many were removed.
///
/// A missing `output_dir` counts as empty.
pub async fn sweep_expired(output_dir: &Path, max_age: Duration) -> Result<usize, ConvertError> {
    let mut entries = match tokio::fs::read_dir(output_dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e.into()),
    };

    let now = SystemTime::now();
    let mut removed = 0;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let metadata = match entry.metadata().await {
            Ok(metadata) => metadata,
            Err(e) => {
                warn!("Cannot inspect {}: {}", path.display(), e);
                continue;
            }
        };
        if !metadata.is_dir() {
            continue;
        }

        let age = metadata
            .modified()
            .ok()
            .and_then(|modified| now.duration_since(modified).ok())
            .unwrap_or_default();
        if age < max_age {
            continue;
        }

        match tokio::fs::remove_dir_all(&path).await {
            Ok(()) => {
                debug!("Removed expired output {}", path.display());
                removed += 1;
            }
            Err(e) => warn!("Failed to remove expired output {}: {}", path.display(), e),
        }
    }

    Ok(removed)
}

/// Sweep `output_dir` in the background, at most once an hour and at least
/// once per `retention`. `retention` must be non-zero.
pub fn spawn_retention_sweep(output_dir: PathBuf, retention: Duration) -> JoinHandle<()> {
    let period = retention.min(MAX_SWEEP_PERIOD);
    info!(
        "Request outputs in {} are kept for {:?}",
        output_dir.display(),
        retention
    );

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            match sweep_expired(&output_dir, retention).await {
                Ok(0) => {}
                Ok(removed) => info!(
                    "Removed {} expired request directories from {}",
                    removed,
                    output_dir.display()
                ),
                Err(e) => warn!("Output sweep of {} failed: {}", output_dir.display(), e),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_sweep_removes_only_expired_directories() {
        let dir = TempDir::new().unwrap();
        let request_dir = dir.path().join("3f2b6c1e");
        std::fs::create_dir(&request_dir).unwrap();
        std::fs::write(request_dir.join("a.jpg"), b"jpeg").unwrap();
        std::fs::write(dir.path().join("keep.txt"), b"x").unwrap();

        let removed = sweep_expired(dir.path(), Duration::from_secs(3600)).await.unwrap();
        assert_eq!(removed, 0);
        assert!(request_dir.exists());

        let removed = sweep_expired(dir.path(), Duration::ZERO).await.unwrap();
        assert_eq!(removed, 1);
        assert!(!request_dir.exists());
        assert!(dir.path().join("keep.txt").exists());
    }

    #[tokio::test]
    async fn test_sweep_missing_output_dir() {
        let dir = TempDir::new().unwrap();
        let removed = sweep_expired(&dir.path().join("absent"), Duration::ZERO).await.unwrap();
        assert_eq!(removed, 0);
    }

    #[tokio::test]
    async fn test_background_sweep_runs() {
        let dir = TempDir::new().unwrap();
        let request_dir = dir.path().join("old-request");
        std::fs::create_dir(&request_dir).unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        let handle = spawn_retention_sweep(dir.path().to_path_buf(), Duration::from_millis(5));
        for _ in 0..50 {
            if !request_dir.exists() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        handle.abort();

        assert!(!request_dir.exists());
    }
}
