use thiserror::Error;

use crate::domain::SeriesKind;

/// CLI-boundary error: a message plus the process exit code it maps to.
#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

/// Failure result of the analytics engine.
///
/// Zero-total periods are never an error: they are dropped from the ratio
/// series before anything downstream sees them.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum EngineError {
    #[error("{series} data unavailable for {ba}: {reason}")]
    FetchUnavailable {
        series: SeriesKind,
        ba: String,
        reason: String,
    },
    #[error("malformed {series} payload: {reason}")]
    MalformedPayload { series: SeriesKind, reason: String },
    #[error("insufficient data: {what}")]
    EmptyJoin { what: String },
    #[error("balancing authority name must be non-empty")]
    InvalidBa,
    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type EngineResult<T> = std::result::Result<T, EngineError>;

impl EngineError {
    pub fn empty(what: impl Into<String>) -> Self {
        EngineError::EmptyJoin { what: what.into() }
    }

    /// Only upstream outages can be papered over with an older cache entry.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, EngineError::FetchUnavailable { .. })
    }

    /// Status class an HTTP front-end should answer with.
    pub fn http_status(&self) -> u16 {
        match self {
            EngineError::FetchUnavailable { .. } | EngineError::EmptyJoin { .. } => 503,
            EngineError::InvalidBa => 400,
            EngineError::MalformedPayload { .. } | EngineError::Config(_) => 500,
        }
    }
}

impl From<EngineError> for AppError {
    fn from(err: EngineError) -> Self {
        let exit_code = match &err {
            EngineError::InvalidBa | EngineError::Config(_) => 2,
            EngineError::FetchUnavailable { .. } | EngineError::EmptyJoin { .. } => 3,
            EngineError::MalformedPayload { .. } => 4,
        };
        AppError::new(exit_code, err.to_string())
    }
}
