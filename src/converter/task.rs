//! # Conversion Task Module
//!
//! Tipi di dato della conversione: un `ConversionTask` per ogni file
//! scoperto, un `ConversionResult` per ogni task elaborato, e il
//! `BatchSummary` aggregato per i report.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{ConvertError, ErrorKind};
use crate::file_manager::FileManager;

/// One source file and where its JPEG goes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionTask {
    source_path: PathBuf,
    destination_path: PathBuf,
}

impl ConversionTask {
    pub fn new(source_path: impl Into<PathBuf>, destination_path: impl Into<PathBuf>) -> Self {
        Self {
            source_path: source_path.into(),
            destination_path: destination_path.into(),
        }
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    pub fn destination_path(&self) -> &Path {
        &self.destination_path
    }
}

/// Outcome of processing a `ConversionTask`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionResult {
    pub task: ConversionTask,
    pub success: bool,
    pub error_kind: Option<ErrorKind>,
    pub error_detail: Option<String>,
    pub source_size_bytes: u64,
    pub destination_size_bytes: u64,
}

impl ConversionResult {
    pub fn succeeded(task: ConversionTask, source_size_bytes: u64, destination_size_bytes: u64) -> Self {
        Self {
            task,
            success: true,
            error_kind: None,
            error_detail: None,
            source_size_bytes,
            destination_size_bytes,
        }
    }

    pub fn failed(task: ConversionTask, error: &ConvertError, source_size_bytes: u64) -> Self {
        Self {
            task,
            success: false,
            error_kind: Some(error.kind()),
            error_detail: Some(error.to_string()),
            source_size_bytes,
            destination_size_bytes: 0,
        }
    }

    /// Size reduction in percent; informational only
    pub fn reduction_percent(&self) -> f64 {
        if !self.success {
            return 0.0;
        }
        FileManager::calculate_reduction(self.source_size_bytes, self.destination_size_bytes)
    }
}

/// Totals over a batch of results
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total: usize,
    pub converted: usize,
    pub failed: usize,
    pub bytes_in: u64,
    pub bytes_out: u64,
}

impl BatchSummary {
    pub fn from_results(results: &[ConversionResult]) -> Self {
        results.iter().fold(Self::default(), |mut summary, result| {
            summary.total += 1;
            if result.success {
                summary.converted += 1;
                summary.bytes_in += result.source_size_bytes;
                summary.bytes_out += result.destination_size_bytes;
            } else {
                summary.failed += 1;
            }
            summary
        })
    }

    pub fn bytes_saved(&self) -> u64 {
        self.bytes_in.saturating_sub(self.bytes_out)
    }

    pub fn format_summary(&self) -> String {
        format!(
            "Processed: {} files | Converted: {} | Failed: {} | {} -> {} ({:.2}% smaller)",
            self.total,
            self.converted,
            self.failed,
            FileManager::format_size(self.bytes_in),
            FileManager::format_size(self.bytes_out),
            FileManager::calculate_reduction(self.bytes_in, self.bytes_out)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_counts() {
        let ok = ConversionResult::succeeded(ConversionTask::new("a.heic", "a.jpg"), 1000, 400);
        let err = ConversionResult::failed(
            ConversionTask::new("b.heic", "b.jpg"),
            &ConvertError::Codec("bad header".into()),
            0,
        );

        let summary = BatchSummary::from_results(&[ok.clone(), err.clone()]);
        assert_eq!(summary.total, 2);
        assert_eq!(summary.converted, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.bytes_saved(), 600);

        assert_eq!(ok.reduction_percent(), 60.0);
        assert_eq!(err.reduction_percent(), 0.0);
        assert_eq!(err.error_kind, Some(ErrorKind::Codec));
        assert!(err.error_detail.as_deref().unwrap().contains("bad header"));
    }
}
