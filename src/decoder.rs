//! # HEIC Decoder Module
//!
//! Il decode HEIC è delegato interamente a tool esterni. Questo modulo
//! definisce il trait `HeifDecoder` e l'implementazione di default
//! `ExternalToolDecoder`, che prova i tool disponibili in ordine di preferenza
//! finché uno produce il PNG intermedio.
//!
//! ## Tool supportati (priorità decrescente):
//! 1. **heif-convert** / **heif-dec**: decoder di riferimento di libheif
//! 2. **magick** / **convert**: ImageMagick con delegate HEIC
//! 3. **vips**: libvips compilato con supporto heif
//!
//! Un tool che fallisce fa passare al successivo; se nessun tool è
//! installato l'errore è `MissingDependency`.

use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, error, warn};

use crate::error::ConvertError;
use crate::tool_resolver::{ToolPathResolver, DECODER_TOOLS};

/// Decodes a HEIC file into a PNG the image crate can read
#[async_trait]
pub trait HeifDecoder: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &str;

    /// Fails when the decoder cannot run at all on this system
    async fn check_available(&self) -> Result<(), ConvertError> {
        Ok(())
    }

    /// Decode `source` and write a PNG to `intermediate`
    async fn decode_to_png(&self, source: &Path, intermediate: &Path) -> Result<(), ConvertError>;
}

/// Decoder backed by command-line tools
pub struct ExternalToolDecoder {
    resolver: ToolPathResolver,
    timeout: Duration,
}

impl ExternalToolDecoder {
    pub fn new(resolver: ToolPathResolver, timeout: Duration) -> Self {
        Self { resolver, timeout }
    }

    /// Command line for each supported tool
    fn tool_args(tool_name: &str, source: &Path, intermediate: &Path) -> Vec<OsString> {
        let source = source.as_os_str().to_os_string();
        let intermediate = intermediate.as_os_str().to_os_string();
        match tool_name {
            "heif-dec" => vec![source, "-o".into(), intermediate],
            "vips" => vec!["copy".into(), source, intermediate],
            _ => vec![source, intermediate],
        }
    }

    async fn run_tool(&self, tool_path: &Path, args: &[OsString]) -> Result<std::process::Output, ConvertError> {
        let child = Command::new(tool_path)
            .args(args)
            .kill_on_drop(true)
            .output();

        tokio::time::timeout(self.timeout, child)
            .await
            .map_err(|_| ConvertError::Codec(format!("{} timed out after {:?}", tool_path.display(), self.timeout)))?
            .map_err(ConvertError::from)
    }
}

impl Default for ExternalToolDecoder {
    fn default() -> Self {
        Self::new(ToolPathResolver::default(), Duration::from_secs(120))
    }
}

#[async_trait]
impl HeifDecoder for ExternalToolDecoder {
    fn name(&self) -> &str {
        "external-tools"
    }

    async fn check_available(&self) -> Result<(), ConvertError> {
        let available = self.resolver.available_decoders();
        if available.is_empty() {
            let error_msg = format!(
                "No HEIC decoder available. Please install one of: {} ({})",
                DECODER_TOOLS.join(", "),
                ToolPathResolver::install_instructions("heif-convert")
            );
            error!("{}", error_msg);
            return Err(ConvertError::MissingDependency(error_msg));
        }
        debug!("HEIC decoders available: {}", available.join(", "));
        Ok(())
    }

    async fn decode_to_png(&self, source: &Path, intermediate: &Path) -> Result<(), ConvertError> {
        let mut any_tool_available = false;
        let mut last_failure = String::new();

        for tool_name in DECODER_TOOLS {
            let Some(tool_path) = self.resolver.resolve_tool(tool_name) else {
                continue;
            };
            any_tool_available = true;

            let args = Self::tool_args(tool_name, source, intermediate);
            debug!("Decoding with {}: {:?}", tool_name, args);

            let start_time = std::time::Instant::now();
            let output = match self.run_tool(&tool_path, &args).await {
                Ok(output) => output,
                Err(e) => {
                    warn!("{} could not run: {}, trying next tool", tool_name, e);
                    last_failure = e.to_string();
                    continue;
                }
            };
            let elapsed = start_time.elapsed();

            if output.status.success() && intermediate.exists() {
                debug!("{} decoded {} in {:?}", tool_name, source.display(), elapsed);
                return Ok(());
            }

            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            warn!(
                "{} failed on {} after {:?} ({}), trying next tool",
                tool_name,
                source.display(),
                elapsed,
                output.status
            );
            last_failure = if stderr.is_empty() {
                format!("{} exited with {}", tool_name, output.status)
            } else {
                format!("{}: {}", tool_name, stderr)
            };
        }

        if !any_tool_available {
            return Err(ConvertError::MissingDependency(format!(
                "No HEIC decoder available. Please install one of: {}",
                DECODER_TOOLS.join(", ")
            )));
        }

        Err(ConvertError::Codec(format!(
            "All decoders failed for {}: {}",
            source.display(),
            last_failure
        )))
    }
}

/// Scratch location for a decoded frame inside `scratch_dir`
pub fn intermediate_path(scratch_dir: &Path) -> PathBuf {
    scratch_dir.join("decoded.png")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_tool_args() {
        let src = Path::new("/in/a.heic");
        let out = Path::new("/tmp/decoded.png");
        assert_eq!(
            ExternalToolDecoder::tool_args("heif-dec", src, out),
            vec![OsString::from("/in/a.heic"), OsString::from("-o"), OsString::from("/tmp/decoded.png")]
        );
        assert_eq!(
            ExternalToolDecoder::tool_args("vips", src, out)[0],
            OsString::from("copy")
        );
        assert_eq!(ExternalToolDecoder::tool_args("magick", src, out).len(), 2);
    }

    #[tokio::test]
    async fn test_no_tools_is_missing_dependency() {
        let empty = TempDir::new().unwrap();
        let decoder = ExternalToolDecoder::new(
            ToolPathResolver::with_tools_dir(empty.path()),
            Duration::from_secs(5),
        );
        // PATH may contain real decoders on a developer machine
        if !decoder.resolver.available_decoders().is_empty() {
            return;
        }
        let err = decoder.check_available().await.unwrap_err();
        assert!(matches!(err, ConvertError::MissingDependency(_)));

        let scratch = TempDir::new().unwrap();
        let err = decoder
            .decode_to_png(Path::new("missing.heic"), &intermediate_path(scratch.path()))
            .await
            .unwrap_err();
        assert!(err.is_fatal());
    }
}
