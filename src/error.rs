//! Error types.

#[derive(thiserror::Error, Debug)]
pub enum ChoroplethError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to fetch {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("Wrapped csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Wrapped json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Column '{0}' not found in CSV header")]
    MissingColumn(String),
    #[error("Topology has no object named '{0}'")]
    MissingObject(String),
    #[error("Unsupported geographic document: {0}")]
    UnsupportedDocument(String),
    #[error("Arc index {0} out of range")]
    InvalidArc(i64),
}

pub type Result<T> = std::result::Result<T, ChoroplethError>;
