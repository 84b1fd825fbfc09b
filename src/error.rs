// SPDX-License-Identifier: PMPL-1.0-or-later
//! Error types for wcagfixbot

use crate::selector::CompileError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for wcagfixbot
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Selector error: {0}")]
    Selector(#[from] CompileError),

    #[error("Scan failed: {0}")]
    Scan(String),
}
