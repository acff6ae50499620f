//! Domain error types.

/// Top-level error type for crossback.
#[derive(Debug, thiserror::Error)]
pub enum BacktestError {
    #[error("no data for {ticker}: {reason}")]
    DataUnavailable { ticker: String, reason: String },

    #[error("insufficient history for {indicator}: have {bars} bars, need {required}")]
    InsufficientHistory {
        indicator: String,
        bars: usize,
        required: usize,
    },

    #[error("invalid parameters: {reason}")]
    InvalidParameters { reason: String },

    #[error("malformed data: {reason}")]
    MalformedData { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("failed to render report: {reason}")]
    Render { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl BacktestError {
    pub fn invalid(reason: impl Into<String>) -> Self {
        BacktestError::InvalidParameters {
            reason: reason.into(),
        }
    }

    pub fn malformed(reason: impl Into<String>) -> Self {
        BacktestError::MalformedData {
            reason: reason.into(),
        }
    }
}

impl From<&BacktestError> for std::process::ExitCode {
    fn from(err: &BacktestError) -> Self {
        let code: u8 = match err {
            BacktestError::Io(_) | BacktestError::Render { .. } => 1,
            BacktestError::ConfigParse { .. } | BacktestError::ConfigInvalid { .. } => 2,
            BacktestError::InvalidParameters { .. } => 3,
            BacktestError::DataUnavailable { .. }
            | BacktestError::InsufficientHistory { .. }
            | BacktestError::MalformedData { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
