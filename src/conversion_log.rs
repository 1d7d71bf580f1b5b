//! # Conversion Log Module
//!
//! Log testuale append-only delle conversioni, separato dal logging
//! diagnostico di `tracing`.
//!
//! ## Responsabilità:
//! - Crea il file (e le directory parent) se non esiste
//! - Scrive un banner a ogni apertura di sessione
//! - Una riga con timestamp per tentativo, successo (con % di riduzione) ed errore
//! - Se il file non è scrivibile, l'errore va su console e la conversione prosegue
//!
//! Il log viene costruito esplicitamente e passato a chi lo usa; non esiste
//! un logger globale.
//!
//! ## Formato:
//! ```text
//! [2024-05-01 10:22:03] INFO Converting: /in/a.heic -> /out/a.jpg
//! [2024-05-01 10:22:04] INFO Success: /out/a.jpg | 1.92 MB -> 812.40 KB (-58.7%)
//! ```

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{error, info, warn};

use crate::file_manager::FileManager;

/// Append-only conversion log
pub struct ConversionLog {
    path: Option<PathBuf>,
    file: Mutex<Option<File>>,
}

impl ConversionLog {
    /// Open (or create) the log at `path` and write the session banner
    pub fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let file = match Self::open_file(&path) {
            Ok(file) => Some(file),
            Err(e) => {
                error!("Cannot open conversion log {}: {}", path.display(), e);
                None
            }
        };

        let log = Self {
            path: Some(path),
            file: Mutex::new(file),
        };
        log.write_banner();
        log
    }

    /// A log that only forwards to `tracing`
    pub fn disabled() -> Self {
        Self {
            path: None,
            file: Mutex::new(None),
        }
    }

    fn open_file(path: &Path) -> std::io::Result<File> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        OpenOptions::new().create(true).append(true).open(path)
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn write_banner(&self) {
        let rule = "=".repeat(50);
        let cwd = std::env::current_dir()
            .map(|d| d.display().to_string())
            .unwrap_or_else(|_| "<unknown>".to_string());
        self.write_raw(&format!(
            "\n{rule}\nConversion session started\nWorking directory: {cwd}\nTime: {}\n{rule}\n",
            Self::timestamp()
        ));
    }

    fn timestamp() -> String {
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
    }

    fn write_line(&self, level: &str, message: &str) {
        self.write_raw(&format!("[{}] {} {}\n", Self::timestamp(), level, message));
    }

    // Blocking append under a std mutex, called from tokio workers too.
    // Each call writes at most a few short lines and never awaits while locked.
    // TODO: hand the writes to a dedicated writer task if server traffic grows.
    fn write_raw(&self, text: &str) {
        let mut guard = match self.file.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(file) = guard.as_mut() {
            if let Err(e) = file.write_all(text.as_bytes()).and_then(|_| file.flush()) {
                error!("Failed to write conversion log: {}", e);
            }
        }
    }

    pub fn log_attempt(&self, source: &Path, destination: &Path) {
        info!("Converting: {} -> {}", source.display(), destination.display());
        self.write_line(
            "INFO",
            &format!("Converting: {} -> {}", source.display(), destination.display()),
        );
    }

    pub fn log_success(&self, destination: &Path, source_size: u64, destination_size: u64) {
        let message = format!(
            "Success: {} | {} -> {} ({:+.1}%)",
            destination.display(),
            FileManager::format_size(source_size),
            FileManager::format_size(destination_size),
            0.0 - FileManager::calculate_reduction(source_size, destination_size)
        );
        info!("{}", message);
        self.write_line("INFO", &message);
    }

    pub fn log_failure(&self, source: &Path, detail: &str) {
        error!("Conversion failed for {}: {}", source.display(), detail);
        self.write_line("ERROR", &format!("Failed: {} | {}", source.display(), detail));
    }

    pub fn log_warning(&self, message: &str) {
        warn!("{}", message);
        self.write_line("WARN", message);
    }

    pub fn log_info(&self, message: &str) {
        info!("{}", message);
        self.write_line("INFO", message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_creates_parent_dirs_and_appends() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("logs").join("conversions.log");

        {
            let log = ConversionLog::open(&path);
            log.log_attempt(Path::new("a.heic"), Path::new("a.jpg"));
            log.log_success(Path::new("a.jpg"), 2000, 1000);
        }
        {
            let log = ConversionLog::open(&path);
            log.log_failure(Path::new("b.heic"), "Codec error: truncated");
        }

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.matches("Conversion session started").count(), 2);
        assert!(content.contains("INFO Converting: a.heic -> a.jpg"));
        assert!(content.contains("(-50.0%)"));
        assert!(content.contains("ERROR Failed: b.heic | Codec error: truncated"));
    }

    #[test]
    fn test_unwritable_log_does_not_panic() {
        let dir = TempDir::new().unwrap();
        // A directory cannot be opened as the log file
        let log = ConversionLog::open(dir.path());
        log.log_info("still running");
        assert_eq!(log.path(), Some(dir.path()));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_writers_keep_lines_intact() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("conversions.log");
        let log = std::sync::Arc::new(ConversionLog::open(&path));

        let mut handles = Vec::new();
        for worker in 0..8 {
            let log = log.clone();
            handles.push(tokio::spawn(async move {
                for i in 0..25 {
                    log.log_info(&format!("worker {} line {}", worker, i));
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = content.lines().filter(|l| l.contains("] INFO worker ")).collect();
        assert_eq!(lines.len(), 200);
        assert!(lines.iter().all(|l| l.starts_with('[') && l.contains(" line ")));
    }

    #[test]
    fn test_disabled_log() {
        let log = ConversionLog::disabled();
        log.log_warning("nothing written");
        assert!(log.path().is_none());
    }
}
