use std::fmt;
use std::time::Duration;

/// Where in the fetch a failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStage {
    Probe,
    Page { skip: usize },
    Assembly,
}

impl fmt::Display for FetchStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Probe => write!(f, "probe"),
            Self::Page { skip } => write!(f, "page (skip={skip})"),
            Self::Assembly => write!(f, "assembly"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FetchErrorKind {
    /// Server answered with a non-success status.
    Status { url: String, status: u16 },
    /// Connection, TLS or body read failure.
    Transport { url: String, message: String },
    Timeout { url: String, after: Duration },
    /// Body was not the expected JSON envelope.
    Malformed { url: String, message: String },
    /// Assembled record count differs from the probe's `total`.
    CountMismatch { expected: usize, actual: usize },
}

impl FetchErrorKind {
    /// Transient failures worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::Transport { .. } | Self::Timeout { .. } => true,
            Self::Malformed { .. } | Self::CountMismatch { .. } => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FetchError {
    pub stage: FetchStage,
    pub kind: FetchErrorKind,
    pub attempts: u32,
}

impl FetchError {
    pub fn new(stage: FetchStage, kind: FetchErrorKind) -> Self {
        Self {
            stage,
            kind,
            attempts: 1,
        }
    }

    pub fn count_mismatch(expected: usize, actual: usize) -> Self {
        Self {
            stage: FetchStage::Assembly,
            kind: FetchErrorKind::CountMismatch { expected, actual },
            attempts: 0,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self.kind {
            FetchErrorKind::Status { status, .. } => Some(status),
            _ => None,
        }
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fetch failed at {}: ", self.stage)?;
        match &self.kind {
            FetchErrorKind::Status { url, status } => write!(f, "HTTP {status} from {url}")?,
            FetchErrorKind::Transport { url, message } => write!(f, "{url}: {message}")?,
            FetchErrorKind::Timeout { url, after } => {
                write!(f, "{url}: no response after {}s", after.as_secs_f64())?
            }
            FetchErrorKind::Malformed { url, message } => {
                write!(f, "malformed body from {url}: {message}")?
            }
            FetchErrorKind::CountMismatch { expected, actual } => {
                write!(f, "expected {expected} records, assembled {actual}")?
            }
        }
        if self.attempts > 1 {
            write!(f, " (after {} attempts)", self.attempts)?;
        }
        Ok(())
    }
}

impl std::error::Error for FetchError {}

#[derive(Debug)]
pub enum CatalogError {
    /// A product failed the pricing preconditions.
    InvalidRecord {
        id: Option<i64>,
        field: &'static str,
        value: f64,
    },
    Fetch(FetchError),
    /// Reconciliation needs at least one actual record.
    EmptyDataset,
    DatasetLoad { path: String, reason: String },
    DatasetSave { path: String, reason: String },
    Config(String),
}

impl CatalogError {
    pub fn invalid(field: &'static str, value: f64) -> Self {
        Self::InvalidRecord {
            id: None,
            field,
            value,
        }
    }

    /// Attach the product id to an `InvalidRecord` raised before the id was known.
    pub fn with_id(self, record_id: i64) -> Self {
        match self {
            Self::InvalidRecord { field, value, .. } => Self::InvalidRecord {
                id: Some(record_id),
                field,
                value,
            },
            other => other,
        }
    }
}

impl fmt::Display for CatalogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidRecord { id, field, value } => match id {
                Some(id) => write!(f, "invalid record {id}: {field} = {value}"),
                None => write!(f, "invalid record: {field} = {value}"),
            },
            Self::Fetch(e) => write!(f, "{e}"),
            Self::EmptyDataset => write!(f, "cannot reconcile an empty actual dataset"),
            Self::DatasetLoad { path, reason } => {
                write!(f, "failed to load dataset '{path}': {reason}")
            }
            Self::DatasetSave { path, reason } => {
                write!(f, "failed to save dataset '{path}': {reason}")
            }
            Self::Config(msg) => write!(f, "config error: {msg}"),
        }
    }
}

impl std::error::Error for CatalogError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Fetch(e) => Some(e),
            _ => None,
        }
    }
}

impl From<FetchError> for CatalogError {
    fn from(e: FetchError) -> Self {
        Self::Fetch(e)
    }
}

pub type Result<T> = std::result::Result<T, CatalogError>;
