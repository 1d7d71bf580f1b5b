//! # JSON Output Module
//!
//! Questo modulo gestisce l'output strutturato in JSON (una riga per evento)
//! per l'uso programmatico della CLI.
//!
//! ## Tipi di messaggi:
//! - `start`: Inizio conversione di una directory
//! - `file_complete`: Fine elaborazione di un file (successo o errore)
//! - `complete`: Fine batch con statistiche finali
//! - `error`: Errore fatale

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::converter::{BatchSummary, ConversionResult};

/// Tipo di messaggio JSON
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum JsonMessage {
    /// Inizio della conversione
    #[serde(rename = "start")]
    Start {
        input_dir: PathBuf,
        output_dir: PathBuf,
        total_files: usize,
        quality: u8,
    },

    /// Fine elaborazione di un file specifico
    #[serde(rename = "file_complete")]
    FileComplete {
        source: PathBuf,
        destination: PathBuf,
        success: bool,
        source_size: u64,
        destination_size: u64,
        reduction_percent: f64,
        error: Option<String>,
    },

    /// Batch completato
    #[serde(rename = "complete")]
    Complete {
        total: usize,
        converted: usize,
        failed: usize,
        bytes_saved: u64,
        duration_seconds: f64,
    },

    /// Errore fatale
    #[serde(rename = "error")]
    Error {
        message: String,
        details: Option<String>,
    },
}

impl JsonMessage {
    /// Emette il messaggio JSON su stdout
    pub fn emit(&self) {
        if let Ok(json) = serde_json::to_string(self) {
            println!("{}", json);
        }
    }

    pub fn start(input_dir: PathBuf, output_dir: PathBuf, total_files: usize, quality: u8) -> Self {
        Self::Start {
            input_dir,
            output_dir,
            total_files,
            quality,
        }
    }

    pub fn file_complete(result: &ConversionResult) -> Self {
        Self::FileComplete {
            source: result.task.source_path().to_path_buf(),
            destination: result.task.destination_path().to_path_buf(),
            success: result.success,
            source_size: result.source_size_bytes,
            destination_size: result.destination_size_bytes,
            reduction_percent: result.reduction_percent(),
            error: result.error_detail.clone(),
        }
    }

    pub fn complete(summary: &BatchSummary, duration_seconds: f64) -> Self {
        Self::Complete {
            total: summary.total,
            converted: summary.converted,
            failed: summary.failed,
            bytes_saved: summary.bytes_saved(),
            duration_seconds,
        }
    }

    pub fn error(message: String, details: Option<String>) -> Self {
        Self::Error { message, details }
    }
}
