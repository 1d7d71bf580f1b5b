//! # Path Resolution Module
//!
//! Centralizza il calcolo dei path di destinazione: stesso nome file,
//! estensione sostituita, nella directory di output.

use std::path::{Path, PathBuf};

use crate::error::ConvertError;

/// Utility per calcolare i path di output in modo centralizzato
pub struct PathResolver;

impl PathResolver {
    /// Destination for `source` inside `output_dir`, e.g. `IMG_1.HEIC` -> `out/IMG_1.jpg`
    pub fn destination_for(source: &Path, output_dir: &Path, output_extension: &str) -> Result<PathBuf, ConvertError> {
        let file_stem = source
            .file_stem()
            .ok_or_else(|| ConvertError::InvalidInput(format!("Invalid file name: {}", source.display())))?;

        let mut filename = file_stem.to_os_string();
        filename.push(".");
        filename.push(output_extension);

        Ok(output_dir.join(filename))
    }

    /// Crea le directory parent se necessario
    pub async fn ensure_parent_dirs(path: &Path) -> Result<(), ConvertError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }
}
