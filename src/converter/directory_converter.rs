//! # Directory Converter
//!
//! Orchestratore della conversione: scopre i file sorgente di una directory,
//! li converte uno alla volta e restituisce un `ConversionResult` per file.
//! Un errore su un file viene registrato nel suo risultato e il batch
//! prosegue; solo le precondizioni (directory di input non valida, output non
//! creabile, nessun decoder) interrompono l'operazione.

use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::Config;
use crate::conversion_log::ConversionLog;
use crate::converter::path_resolver::PathResolver;
use crate::converter::task::{ConversionResult, ConversionTask};
use crate::decoder::HeifDecoder;
use crate::error::ConvertError;
use crate::file_manager::FileManager;
use crate::image_processor::ImageProcessor;
use crate::json_output::JsonMessage;
use crate::progress::ProgressManager;

/// Converts HEIC files, one directory or one file at a time
pub struct DirectoryConverter {
    config: Config,
    processor: ImageProcessor,
    log: Arc<ConversionLog>,
    progress: Option<ProgressManager>,
}

impl DirectoryConverter {
    pub fn new(config: Config, decoder: Arc<dyn HeifDecoder>, log: Arc<ConversionLog>) -> Self {
        let processor = ImageProcessor::new(decoder, config.jpeg_quality);
        Self {
            config,
            processor,
            log,
            progress: None,
        }
    }

    /// Tick `progress` once per converted file
    pub fn with_progress(mut self, progress: ProgressManager) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Convert every source file directly inside `input_dir` into `output_dir`.
    ///
    /// Files are visited in file-name order. The returned vector holds one
    /// result per matched source file, failed ones included.
    pub async fn convert_directory(
        &self,
        input_dir: &Path,
        output_dir: &Path,
    ) -> Result<Vec<ConversionResult>, ConvertError> {
        if !input_dir.is_dir() {
            return Err(ConvertError::InvalidInput(format!(
                "Input path is not a directory: {}",
                input_dir.display()
            )));
        }

        tokio::fs::create_dir_all(output_dir).await?;

        let sources = FileManager::find_source_files(input_dir, &self.config.source_extensions)?;
        info!("Found {} source files in {}", sources.len(), input_dir.display());

        if !sources.is_empty() {
            self.processor.decoder().check_available().await?;
        }

        if self.config.json_output {
            JsonMessage::start(
                input_dir.to_path_buf(),
                output_dir.to_path_buf(),
                sources.len(),
                self.config.jpeg_quality,
            )
            .emit();
        }
        self.log.log_info(&format!(
            "Batch started: {} files from {} to {}",
            sources.len(),
            input_dir.display(),
            output_dir.display()
        ));
        if let Some(ref progress) = self.progress {
            progress.set_length(sources.len() as u64);
        }

        let mut results = Vec::with_capacity(sources.len());
        for source in sources {
            let result = match PathResolver::destination_for(&source, output_dir, &self.config.output_extension) {
                Ok(destination) => self.convert_one(&source, &destination).await,
                Err(e) => {
                    self.log.log_failure(&source, &e.to_string());
                    ConversionResult::failed(ConversionTask::new(&source, output_dir), &e, 0)
                }
            };
            self.report(&result);
            results.push(result);
        }

        Ok(results)
    }

    /// Convert a single file. Never fails: errors are carried in the result.
    pub async fn convert_one(&self, source: &Path, destination: &Path) -> ConversionResult {
        let task = ConversionTask::new(source, destination);
        self.log.log_attempt(source, destination);

        match self.try_convert(&task).await {
            Ok((source_size, destination_size)) => {
                self.log.log_success(destination, source_size, destination_size);
                if self.config.delete_source {
                    self.remove_source(source).await;
                }
                ConversionResult::succeeded(task, source_size, destination_size)
            }
            Err(e) => {
                self.log.log_failure(source, &e.to_string());
                let source_size = FileManager::get_file_size(source).await.unwrap_or(0);
                ConversionResult::failed(task, &e, source_size)
            }
        }
    }

    async fn try_convert(&self, task: &ConversionTask) -> Result<(u64, u64), ConvertError> {
        let source = task.source_path();
        let destination = task.destination_path();

        let source_size = match tokio::fs::metadata(source).await {
            Ok(metadata) if metadata.is_file() => metadata.len(),
            Ok(_) => {
                return Err(ConvertError::InvalidInput(format!(
                    "Source is not a file: {}",
                    source.display()
                )))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ConvertError::NotFound(source.to_path_buf()))
            }
            Err(e) => return Err(e.into()),
        };

        if source == destination {
            return Err(ConvertError::InvalidInput(format!(
                "Destination would overwrite the source: {}",
                destination.display()
            )));
        }

        PathResolver::ensure_parent_dirs(destination).await?;

        let (width, height) = self.processor.convert(source, destination).await?;
        debug!("{} decoded at {}x{}", source.display(), width, height);

        let destination_size = FileManager::get_file_size(destination).await?;
        Ok((source_size, destination_size))
    }

    async fn remove_source(&self, source: &Path) {
        match FileManager::remove_source(source).await {
            Ok(()) => self.log.log_info(&format!("Removed source: {}", source.display())),
            Err(e) => self
                .log
                .log_warning(&format!("Could not remove source {}: {}", source.display(), e)),
        }
    }

    fn report(&self, result: &ConversionResult) {
        if self.config.json_output {
            JsonMessage::file_complete(result).emit();
        }
        if let Some(ref progress) = self.progress {
            let name = result
                .task
                .source_path()
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            let marker = if result.success { "✅" } else { "❌" };
            progress.update(&format!("{} {}", marker, name));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::BatchSummary;
    use crate::error::ErrorKind;
    use crate::image_processor::test_support::{write_fake_heic, CopyDecoder};
    use async_trait::async_trait;
    use tempfile::TempDir;
    use tokio_test::assert_ok;

    fn converter(config: Config) -> DirectoryConverter {
        DirectoryConverter::new(config, Arc::new(CopyDecoder), Arc::new(ConversionLog::disabled()))
    }

    struct UnavailableDecoder;

    #[async_trait]
    impl HeifDecoder for UnavailableDecoder {
        fn name(&self) -> &str {
            "unavailable"
        }

        async fn check_available(&self) -> Result<(), ConvertError> {
            Err(ConvertError::MissingDependency("no decoder".into()))
        }

        async fn decode_to_png(&self, _source: &Path, _intermediate: &Path) -> Result<(), ConvertError> {
            Err(ConvertError::MissingDependency("no decoder".into()))
        }
    }

    #[tokio::test]
    async fn test_valid_and_corrupt_files() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        write_fake_heic(&input.path().join("photo1.heic"));
        std::fs::write(input.path().join("photo2.heic"), b"").unwrap();

        let results = converter(Config::default())
            .convert_directory(input.path(), output.path())
            .await
            .unwrap();

        assert_eq!(results.len(), 2);
        let first = &results[0];
        assert!(first.success);
        assert_eq!(first.task.destination_path(), output.path().join("photo1.jpg"));
        assert!(output.path().join("photo1.jpg").exists());
        assert!(first.destination_size_bytes > 0);

        let second = &results[1];
        assert!(!second.success);
        assert_eq!(second.error_kind, Some(ErrorKind::Codec));
        assert!(!output.path().join("photo2.jpg").exists());
    }

    #[tokio::test]
    async fn test_result_count_matches_source_files() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        for name in ["a.heic", "b.HEIC", "c.heif"] {
            write_fake_heic(&input.path().join(name));
        }
        std::fs::write(input.path().join("readme.txt"), b"skip").unwrap();
        std::fs::write(input.path().join("d.heic"), b"garbage").unwrap();

        let results = converter(Config::default())
            .convert_directory(input.path(), output.path())
            .await
            .unwrap();

        assert_eq!(results.len(), 4);
        let summary = BatchSummary::from_results(&results);
        assert_eq!(summary.converted, 3);
        assert_eq!(summary.failed, 1);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_symlinked_sources_are_converted() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        let elsewhere = TempDir::new().unwrap();
        write_fake_heic(&input.path().join("plain.heic"));
        write_fake_heic(&elsewhere.path().join("real.heic"));
        std::os::unix::fs::symlink(elsewhere.path().join("real.heic"), input.path().join("linked.heic")).unwrap();

        let results = converter(Config::default())
            .convert_directory(input.path(), output.path())
            .await
            .unwrap();

        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.success));
        assert!(output.path().join("linked.jpg").exists());
        assert!(output.path().join("plain.jpg").exists());
    }

    #[tokio::test]
    async fn test_output_directory_is_created() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        write_fake_heic(&input.path().join("a.heic"));
        let nested = output.path().join("deep").join("er");

        let results = converter(Config::default())
            .convert_directory(input.path(), &nested)
            .await
            .unwrap();
        assert!(results[0].success);
        assert!(nested.join("a.jpg").exists());
    }

    #[tokio::test]
    async fn test_invalid_input_directory_is_fatal() {
        let output = TempDir::new().unwrap();
        let err = converter(Config::default())
            .convert_directory(&output.path().join("missing"), output.path())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn test_missing_decoder_is_fatal_only_with_sources() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        let converter = DirectoryConverter::new(
            Config::default(),
            Arc::new(UnavailableDecoder),
            Arc::new(ConversionLog::disabled()),
        );

        let empty = assert_ok!(converter.convert_directory(input.path(), output.path()).await);
        assert!(empty.is_empty());

        write_fake_heic(&input.path().join("a.heic"));
        let err = converter
            .convert_directory(input.path(), output.path())
            .await
            .unwrap_err();
        assert!(matches!(err, ConvertError::MissingDependency(_)));
    }

    #[tokio::test]
    async fn test_convert_one_missing_source() {
        let dir = TempDir::new().unwrap();
        let result = converter(Config::default())
            .convert_one(&dir.path().join("nope.heic"), &dir.path().join("nope.jpg"))
            .await;
        assert!(!result.success);
        assert_eq!(result.error_kind, Some(ErrorKind::NotFound));
    }

    #[tokio::test]
    async fn test_convert_one_creates_parent_dir() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("a.heic");
        write_fake_heic(&source);
        let destination = dir.path().join("x").join("y").join("a.jpg");

        let result = converter(Config::default()).convert_one(&source, &destination).await;
        assert!(result.success);
        assert!(destination.exists());
        assert!(source.exists());
    }

    #[tokio::test]
    async fn test_delete_source_only_on_success() {
        let dir = TempDir::new().unwrap();
        let good = dir.path().join("good.heic");
        let bad = dir.path().join("bad.heic");
        write_fake_heic(&good);
        std::fs::write(&bad, b"").unwrap();

        let config = Config {
            delete_source: true,
            ..Default::default()
        };
        let results = converter(config)
            .convert_directory(dir.path(), &dir.path().join("out"))
            .await
            .unwrap();

        assert_eq!(results.len(), 2);
        assert!(!good.exists());
        assert!(bad.exists());
    }

    #[tokio::test]
    async fn test_rerun_overwrites_deterministically() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        write_fake_heic(&input.path().join("a.heic"));
        let converter = converter(Config::default());

        converter.convert_directory(input.path(), output.path()).await.unwrap();
        let first = std::fs::read(output.path().join("a.jpg")).unwrap();
        converter.convert_directory(input.path(), output.path()).await.unwrap();
        let second = std::fs::read(output.path().join("a.jpg")).unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_conversion_log_records_outcomes() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        write_fake_heic(&input.path().join("ok.heic"));
        std::fs::write(input.path().join("broken.heic"), b"").unwrap();
        let log_path = output.path().join("logs").join("conversions.log");

        let converter = DirectoryConverter::new(
            Config::default(),
            Arc::new(CopyDecoder),
            Arc::new(ConversionLog::open(&log_path)),
        )
        .with_progress(ProgressManager::hidden(0));
        converter
            .convert_directory(input.path(), &output.path().join("jpg"))
            .await
            .unwrap();

        let content = std::fs::read_to_string(&log_path).unwrap();
        assert!(content.contains("Success:"));
        assert!(content.contains("ERROR Failed:"));
        assert!(content.contains("broken.heic"));
    }
}
