//! Transcript extraction strategies.
//!
//! Both strategies produce the same [`Extraction`] contract from different
//! input shapes: free text pulled out of a grade memo, or the tables of a
//! rendered results page.

pub mod html;
pub mod table;
pub mod text;

use serde::{Deserialize, Serialize};

use crate::error::{TranscriptError, TranscriptResult};
use crate::models::{StudentIdentity, SubjectRecord};

pub use table::TableExtractor;
pub use text::TextExtractor;

/// A strategy that turns one document into canonical subject records.
pub trait Extractor {
    type Input: ?Sized;

    fn extract(&self, input: &Self::Input) -> Extraction;
}

/// Outcome of extracting one document. `success` is false when no subject
/// record could be recovered; callers treat that as a failed document, not
/// as a student with zero subjects.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Extraction {
    pub success: bool,
    pub identity: StudentIdentity,
    pub records: Vec<SubjectRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub official_cgpa: Option<f64>,
}

impl Extraction {
    pub fn new(
        identity: StudentIdentity,
        records: Vec<SubjectRecord>,
        official_cgpa: Option<f64>,
    ) -> Self {
        Self {
            success: !records.is_empty(),
            identity,
            records,
            official_cgpa,
        }
    }

    pub fn failed(identity: StudentIdentity) -> Self {
        Self {
            identity,
            ..Self::default()
        }
    }

    pub fn into_result(self, source_label: &str) -> TranscriptResult<Self> {
        if self.success {
            Ok(self)
        } else {
            Err(TranscriptError::NoRecords {
                source_label: source_label.to_string(),
            })
        }
    }
}
