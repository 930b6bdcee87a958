pub mod check_tools;
pub mod init_config;
pub mod similar;
pub mod subsample;
pub mod validate_schema;

use crate::core::config::{default_config, load_config, Config};
use crate::Result;
use std::path::Path;
use tracing::debug;

/// Load the configuration file when one was given, defaults otherwise.
pub fn resolve_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => {
            debug!("Loading configuration from {}", path.display());
            crate::core::job::check_file(path)?;
            load_config(path)
        }
        None => Ok(default_config()),
    }
}
