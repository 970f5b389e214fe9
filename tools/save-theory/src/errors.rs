use thiserror::Error;

#[derive(Debug, Error)]
pub enum SaveTheoryError {
    #[error("io error: {0}")]
    Io(String),
    #[error("config parse error: {0}")]
    ConfigParse(String),
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("cli error: {0}")]
    Cli(String),
    #[error("varying parameter {group}--{name} missing from evaluation")]
    MissingParameter { group: String, name: String },
    #[error("series {name} missing from evaluation")]
    MissingSeries { name: String },
    #[error("row width {actual} does not match header width {expected}")]
    RowWidth { expected: usize, actual: usize },
    #[error("evaluation error: {0}")]
    Evaluation(String),
}
