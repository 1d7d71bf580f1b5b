//! # Server State
//!
//! Stato condiviso fra gli handler: il `DirectoryConverter` (con la sua
//! configurazione e il log delle conversioni), costruito una volta in `main`.

use std::sync::Arc;

use crate::config::Config;
use crate::converter::DirectoryConverter;

/// Shared state handed to every request handler
pub struct AppState {
    converter: Arc<DirectoryConverter>,
}

impl AppState {
    pub fn new(converter: DirectoryConverter) -> Self {
        Self {
            converter: Arc::new(converter),
        }
    }

    pub fn converter(&self) -> &DirectoryConverter {
        &self.converter
    }

    pub fn config(&self) -> &Config {
        self.converter.config()
    }
}
