//! # Configuration Management Module
//!
//! Questo modulo gestisce tutta la configurazione del convertitore.
//!
//! ## Responsabilità:
//! - Definisce la struct `Config` con i parametri di conversione e del server
//! - Fornisce validazione dei parametri di input
//! - Supporta caricamento/salvataggio configurazione da/verso file JSON
//! - Fornisce valori di default sensati per tutti i parametri
//!
//! ## Parametri di configurazione:
//! - `jpeg_quality`: Qualità JPEG (1-100, default: 95)
//! - `source_extensions`: Estensioni sorgente, case-insensitive (default: heic, heif)
//! - `output_extension`: Estensione di output (default: "jpg")
//! - `delete_source`: Rimuove l'originale dopo una conversione riuscita (default: false)
//! - `log_file`: File di log delle conversioni (default: logs/conversions.log)
//! - `decode_timeout_secs`: Timeout per il decoder esterno (default: 120)
//! - `server`: Host, porta, directory di output, limiti e retention del server HTTP
//!
//! ## Esempio:
//! ```rust,ignore
//! let config = Config {
//!     jpeg_quality: 90,
//!     delete_source: true,
//!     ..Default::default()
//! };
//! config.validate()?;
//! ```

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};

/// Configuration for HEIC conversion
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// JPEG quality (1-100)
    pub jpeg_quality: u8,
    /// Extensions picked up by directory conversion, compared case-insensitively
    pub source_extensions: Vec<String>,
    /// Extension given to converted files (without the dot)
    pub output_extension: String,
    /// Remove the source file after a successful conversion
    pub delete_source: bool,
    /// Append-only conversion log
    pub log_file: PathBuf,
    /// Upper bound for a single external decoder run
    pub decode_timeout_secs: u64,
    /// Output progress and results as JSON lines for programmatic use
    pub json_output: bool,
    /// HTTP server settings
    pub server: ServerConfig,
}

/// Settings for `heic-convert serve`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: IpAddr,
    pub port: u16,
    /// Converted uploads are kept under `<output_dir>/<request id>/`
    pub output_dir: PathBuf,
    pub max_upload_bytes: usize,
    /// CORS origins; empty means any origin
    pub allowed_origins: Vec<String>,
    /// Request directories older than this are swept away; 0 keeps them forever
    pub retention_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            jpeg_quality: 95,
            source_extensions: vec!["heic".to_string(), "heif".to_string()],
            output_extension: "jpg".to_string(),
            delete_source: false,
            log_file: PathBuf::from("logs").join("conversions.log"),
            decode_timeout_secs: 120,
            json_output: false,
            server: ServerConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 5001,
            output_dir: PathBuf::from("output"),
            max_upload_bytes: 50 * 1024 * 1024,
            allowed_origins: Vec::new(),
            retention_secs: 3600,
        }
    }
}

impl Config {
    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        if self.jpeg_quality == 0 || self.jpeg_quality > 100 {
            return Err(anyhow::anyhow!("JPEG quality must be between 1 and 100"));
        }

        if self.source_extensions.is_empty() {
            return Err(anyhow::anyhow!("At least one source extension is required"));
        }

        if self
            .source_extensions
            .iter()
            .any(|ext| ext.is_empty() || ext.starts_with('.'))
        {
            return Err(anyhow::anyhow!("Source extensions must be non-empty and given without the leading dot"));
        }

        if self.output_extension.is_empty() || self.output_extension.starts_with('.') {
            return Err(anyhow::anyhow!("Output extension must be non-empty and given without the leading dot"));
        }

        if self.decode_timeout_secs == 0 {
            return Err(anyhow::anyhow!("Decode timeout must be greater than 0"));
        }

        if self.server.max_upload_bytes == 0 {
            return Err(anyhow::anyhow!("Maximum upload size must be greater than 0"));
        }

        Ok(())
    }

    /// Per-user config location, used when `--config` is not given
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("heic-converter").join("config.json"))
    }

    /// Load configuration from file
    pub async fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(path).await?;
        let config: Config = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub async fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }
}
