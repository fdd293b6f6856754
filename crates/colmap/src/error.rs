use thiserror::Error;

/// Failures talking to the host document layer.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HostError {
    #[error("host unavailable: {0}")]
    Unavailable(String),

    #[error("host item not found: {0}")]
    ItemNotFound(String),

    /// The host answered, but not in the shape the staged batch asked for.
    #[error("host protocol violation: {0}")]
    Protocol(String),
}

/// Rejections when assembling a formula-generation request.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PayloadError {
    #[error("query is empty")]
    EmptyQuery,

    #[error("column map is empty; workbook structure is not available")]
    EmptyColumnMap,
}
