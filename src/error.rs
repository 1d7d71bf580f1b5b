//! # Error Types Module
//!
//! Questo modulo definisce tutti i tipi di errore custom della conversione.
//!
//! ## Responsabilità:
//! - Definisce `ConvertError` enum per categorizzare gli errori possibili
//! - Associa a ogni errore un `ErrorKind` serializzabile (per risultati e JSON)
//! - Classifica ogni errore come fatale o recuperabile (`ErrorSeverity`)
//!
//! ## Categorie di errori:
//! - `InvalidInput`: Directory o path di input non validi (fatale)
//! - `NotFound`: File sorgente mancante
//! - `Codec` / `Image`: Decode o encode falliti, output mancante
//! - `MissingDependency`: Nessun decoder HEIC esterno installato (fatale)
//! - `Io`: Errori di I/O (fatale ai confini CLI/HTTP)
//!
//! ## Esempio:
//! ```rust,ignore
//! if !input_dir.is_dir() {
//!     return Err(ConvertError::InvalidInput(format!("not a directory: {}", input_dir.display())));
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Custom error types for HEIC conversion
#[derive(thiserror::Error, Debug)]
pub enum ConvertError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Source file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Codec error: {0}")]
    Codec(String),

    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Dependency missing: {0}")]
    MissingDependency(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse error category carried by every `ConversionResult`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidInput,
    NotFound,
    Codec,
    Io,
}

/// Whether an error should end the whole operation at the CLI/HTTP boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Fatal,
    Recoverable,
}

impl ConvertError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Codec(_) | Self::Image(_) | Self::MissingDependency(_) => ErrorKind::Codec,
            Self::Io(_) => ErrorKind::Io,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::InvalidInput(_) | Self::MissingDependency(_) | Self::Io(_) => ErrorSeverity::Fatal,
            Self::NotFound(_) | Self::Codec(_) | Self::Image(_) => ErrorSeverity::Recoverable,
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.severity() == ErrorSeverity::Fatal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        assert_eq!(ConvertError::InvalidInput("x".into()).kind(), ErrorKind::InvalidInput);
        assert_eq!(ConvertError::NotFound(PathBuf::from("a.heic")).kind(), ErrorKind::NotFound);
        assert_eq!(ConvertError::MissingDependency("heif-convert".into()).kind(), ErrorKind::Codec);
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        assert_eq!(ConvertError::from(io).kind(), ErrorKind::Io);
    }

    #[test]
    fn test_severity() {
        assert!(ConvertError::InvalidInput("bad dir".into()).is_fatal());
        assert!(ConvertError::MissingDependency("magick".into()).is_fatal());
        assert!(!ConvertError::Codec("truncated".into()).is_fatal());
        assert!(!ConvertError::NotFound(PathBuf::from("x.heic")).is_fatal());
    }

    #[test]
    fn test_kind_serializes_snake_case() {
        let json = serde_json::to_string(&ErrorKind::InvalidInput).unwrap();
        assert_eq!(json, "\"invalid_input\"");
    }
}
