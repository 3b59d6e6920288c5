use thiserror::Error;

#[derive(Error, Debug)]
pub enum UpkeepError {
    #[error("Project validation failed: {0}")]
    ProjectValidation(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Lock file parsing failed: {0}")]
    LockParsing(String),

    #[error("Outdated report parsing failed: {0}")]
    ReportParsing(String),

    #[error("Registry client error: {0}")]
    Registry(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, UpkeepError>;
