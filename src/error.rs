use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Unsupported export format: {0}")]
    UnsupportedFormat(String),

    #[error("Spreadsheet error: {0}")]
    Spreadsheet(String),

    #[error("Unreadable chart of accounts: {0}")]
    Accounts(String),

    #[error("Encoding error: {0}")]
    Encoding(String),

    #[error("Unknown conversion: {0}")]
    UnknownKind(String),

    #[error("Settings error: {0}")]
    Settings(String),
}

pub type Result<T> = std::result::Result<T, ConvertError>;
