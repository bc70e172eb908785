use thiserror::Error;

/// Failures surfaced by the extraction and analysis engine.
#[derive(Error, Debug)]
pub enum TranscriptError {
    #[error("invalid CSS selector `{selector}`: {message}")]
    Selector { selector: String, message: String },

    #[error("result page reports the hall ticket as not found")]
    ResultNotFound,

    #[error("expected at least 2 result tables, found {found}")]
    NoResultTables { found: usize },

    #[error("could not extract subject data from {source_label}")]
    NoRecords { source_label: String },

    #[error("invalid target plan: {message}")]
    InvalidPlan { message: String },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error on {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl TranscriptError {
    pub fn invalid_plan(message: impl Into<String>) -> Self {
        Self::InvalidPlan {
            message: message.into(),
        }
    }

    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether the caller should retry through the alternate (PDF text) path.
    pub fn suggests_text_fallback(&self) -> bool {
        matches!(
            self,
            TranscriptError::NoRecords { .. }
                | TranscriptError::NoResultTables { .. }
                | TranscriptError::Selector { .. }
        )
    }
}

pub type TranscriptResult<T> = Result<T, TranscriptError>;
