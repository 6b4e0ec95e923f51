//! Error types for the suite runner

use std::path::PathBuf;
use thiserror::Error;

use suiterun_core::StructureError;

#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("Suite file parse error: {path}: {message}")]
    SpecParse { path: PathBuf, message: String },

    #[error("Invalid suite in {path}: {source}")]
    Structure {
        path: PathBuf,
        #[source]
        source: StructureError,
    },

    #[error("No suite files found in {0}")]
    NoSuites(PathBuf),

    #[error("Invalid grep pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML write error: {0}")]
    TomlWrite(#[from] toml::ser::Error),
}

pub type RunnerResult<T> = Result<T, RunnerError>;
