//! # File Management Module
//!
//! Questo modulo gestisce le operazioni sui file e la discovery dei sorgenti HEIC.
//!
//! ## Responsabilità:
//! - Discovery non ricorsiva dei file sorgente in una directory
//! - Riconoscimento estensione sorgente (case-insensitive)
//! - Dimensioni file, formattazione human-readable, percentuale di riduzione
//! - Rimozione dell'originale dopo la conversione (solo se richiesto)
//!
//! ## Esempio:
//! ```rust,ignore
//! let sources = FileManager::find_source_files(dir, &config.source_extensions)?;
//! for source in sources {
//!     let size = FileManager::get_file_size(&source).await?;
//! }
//! ```

use std::path::{Path, PathBuf};
use tokio::fs;
use walkdir::WalkDir;

use crate::error::ConvertError;

/// Manages file operations and discovery
pub struct FileManager;

impl FileManager {
    /// Size of a file in bytes
    pub async fn get_file_size(path: &Path) -> Result<u64, ConvertError> {
        let metadata = fs::metadata(path).await?;
        Ok(metadata.len())
    }

    /// Find the source files directly inside `dir`, sorted by file name.
    ///
    /// Subdirectories are not descended into. Symlinks to regular files are
    /// included; dangling links and links to directories are skipped.
    pub fn find_source_files(dir: &Path, extensions: &[String]) -> Result<Vec<PathBuf>, ConvertError> {
        let mut files = Vec::new();

        for entry in WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|e| {
                ConvertError::Io(
                    e.into_io_error()
                        .unwrap_or_else(|| std::io::Error::new(std::io::ErrorKind::Other, "directory walk failed")),
                )
            })?;
            let path = entry.path();
            // Links count when they resolve to a regular file
            let is_file = if entry.path_is_symlink() {
                path.is_file()
            } else {
                entry.file_type().is_file()
            };
            if !is_file {
                continue;
            }
            if Self::is_source_file(path, extensions) {
                files.push(path.to_path_buf());
            }
        }

        Ok(files)
    }

    /// Check if a file carries one of the source extensions
    pub fn is_source_file(path: &Path, extensions: &[String]) -> bool {
        if let Some(ext) = path.extension() {
            let ext_lower = ext.to_string_lossy().to_lowercase();
            extensions.iter().any(|candidate| candidate.to_lowercase() == ext_lower)
        } else {
            false
        }
    }

    /// Delete a source file after conversion
    pub async fn remove_source(path: &Path) -> Result<(), ConvertError> {
        fs::remove_file(path).await?;
        Ok(())
    }

    /// Get human-readable file size
    pub fn format_size(size: u64) -> String {
        const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
        let mut size = size as f64;
        let mut unit_index = 0;

        while size >= 1024.0 && unit_index < UNITS.len() - 1 {
            size /= 1024.0;
            unit_index += 1;
        }

        if unit_index == 0 {
            format!("{} {}", size as u64, UNITS[unit_index])
        } else {
            format!("{:.2} {}", size, UNITS[unit_index])
        }
    }

    /// Calculate percentage reduction
    pub fn calculate_reduction(original_size: u64, new_size: u64) -> f64 {
        if original_size == 0 {
            0.0
        } else {
            ((original_size as f64 - new_size as f64) / original_size as f64) * 100.0
        }
    }
}
