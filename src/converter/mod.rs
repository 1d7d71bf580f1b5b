//! # Converter Module
//!
//! Separa le responsabilità in sottomoduli:
//! - `directory_converter`: Orchestratore del batch e conversione singola
//! - `task`: Tipi `ConversionTask`, `ConversionResult`, `BatchSummary`
//! - `path_resolver`: Logica di calcolo path centralizzata

pub mod directory_converter;
pub mod path_resolver;
pub mod task;

pub use directory_converter::DirectoryConverter;
pub use path_resolver::PathResolver;
pub use task::{BatchSummary, ConversionResult, ConversionTask};
