//! # HEIC Converter Library
//!
//! Questo è il modulo principale della libreria che espone tutte le API pubbliche.
//!
//! ## Architettura dei moduli:
//! - `config`: Gestione configurazione e validazione parametri
//! - `error`: Tipi di errore con tipo e gravità (fatale / recuperabile)
//! - `file_manager`: Discovery dei file HEIC e utilità sulle dimensioni
//! - `tool_resolver`: Ricerca dei decoder esterni
//! - `decoder`: Trait `HeifDecoder` e decoder basato su tool esterni
//! - `image_processor`: Conversione di un file (decode, RGB, JPEG)
//! - `converter`: Orchestratore del batch di directory
//! - `conversion_log`: Log append-only delle conversioni
//! - `progress` / `json_output`: Feedback per la CLI
//! - `server`: Endpoint HTTP
//!
//! ## Utilizzo:
//! ```rust,ignore
//! use heic_converter::{Config, ConversionLog, DirectoryConverter, ExternalToolDecoder};
//!
//! let log = Arc::new(ConversionLog::open("logs/conversions.log"));
//! let converter = DirectoryConverter::new(Config::default(), Arc::new(ExternalToolDecoder::default()), log);
//! let results = converter.convert_directory(&input, &output).await?;
//! ```

pub mod config;
pub mod conversion_log;
pub mod converter;
pub mod decoder;
pub mod error;
pub mod file_manager;
pub mod image_processor;
pub mod json_output;
pub mod progress;
pub mod server;
pub mod tool_resolver;

pub use config::{Config, ServerConfig};
pub use conversion_log::ConversionLog;
pub use converter::{BatchSummary, ConversionResult, ConversionTask, DirectoryConverter};
pub use decoder::{ExternalToolDecoder, HeifDecoder};
pub use error::{ConvertError, ErrorKind, ErrorSeverity};
