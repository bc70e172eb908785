use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::aggregate::Transcript;
use crate::error::{TranscriptError, TranscriptResult};
use crate::extract::html::parse_result_page;
use crate::extract::{Extraction, Extractor, TableExtractor, TextExtractor};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    /// Text already pulled out of a grade memo PDF
    Text,
    /// A saved results page
    Html,
}

impl DocumentKind {
    pub fn for_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("html" | "htm") => DocumentKind::Html,
            _ => DocumentKind::Text,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DocumentOutcome {
    pub source: String,
    pub kind: DocumentKind,
    #[serde(flatten)]
    pub extraction: Extraction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DocumentOutcome {
    fn failed(source: String, kind: DocumentKind, error: &TranscriptError) -> Self {
        Self {
            source,
            kind,
            extraction: Extraction::default(),
            error: Some(error.to_string()),
        }
    }
}

/// Run the matching extractor over one document's content.
pub fn extract_document(
    kind: DocumentKind,
    content: &str,
    htno: Option<&str>,
) -> TranscriptResult<Extraction> {
    match kind {
        DocumentKind::Html => {
            let page = parse_result_page(content, htno)?;
            if page.tables.len() < 2 {
                return Err(TranscriptError::NoResultTables {
                    found: page.tables.len(),
                });
            }
            Ok(TableExtractor.extract(&page))
        }
        DocumentKind::Text => {
            let mut extraction = TextExtractor.extract(content);
            if let Some(htno) = htno.filter(|_| extraction.identity.htno.is_empty()) {
                extraction.identity.htno = htno.to_string();
                for record in &mut extraction.records {
                    record.htno = Some(htno.to_string());
                }
            }
            Ok(extraction)
        }
    }
}

async fn load_document(path: PathBuf, htno: Option<String>) -> DocumentOutcome {
    let source = path.display().to_string();
    let kind = DocumentKind::for_path(&path);

    let result = match tokio::fs::read_to_string(&path).await {
        Ok(content) => extract_document(kind, &content, htno.as_deref())
            .and_then(|extraction| extraction.into_result(&source)),
        Err(e) => Err(TranscriptError::io(source.clone(), e)),
    };

    match result {
        Ok(extraction) => {
            debug!(source = %source, records = extraction.records.len(), "document extracted");
            DocumentOutcome {
                source,
                kind,
                extraction,
                error: None,
            }
        }
        Err(e) => {
            warn!(source = %source, error = %e, "document extraction failed");
            if e.suggests_text_fallback() {
                info!(source = %source, "retry this student with the grade memo PDF text");
            }
            DocumentOutcome::failed(source, kind, &e)
        }
    }
}

/// Extract every document with at most `max_concurrent` in flight.
/// Outcomes come back in input order.
pub async fn load_batch(
    paths: &[PathBuf],
    max_concurrent: usize,
    htno: Option<&str>,
) -> Vec<DocumentOutcome> {
    let semaphore = Arc::new(Semaphore::new(max_concurrent.max(1)));
    let mut handles = Vec::with_capacity(paths.len());

    for path in paths {
        let semaphore = Arc::clone(&semaphore);
        let path = path.clone();
        let htno = htno.map(str::to_string);
        handles.push(tokio::spawn(async move {
            let _permit = semaphore.acquire_owned().await.ok();
            load_document(path, htno).await
        }));
    }

    let mut outcomes = Vec::with_capacity(handles.len());
    for (handle, path) in handles.into_iter().zip(paths) {
        match handle.await {
            Ok(outcome) => outcomes.push(outcome),
            Err(e) => {
                let source = path.display().to_string();
                warn!(source = %source, error = %e, "extraction task aborted");
                outcomes.push(DocumentOutcome {
                    source,
                    kind: DocumentKind::for_path(path),
                    extraction: Extraction::default(),
                    error: Some(e.to_string()),
                });
            }
        }
    }
    outcomes
}

/// Append successful documents in order; failed ones are left out.
pub fn merge_outcomes(outcomes: &[DocumentOutcome]) -> Transcript {
    let mut transcript = Transcript::default();
    for outcome in outcomes {
        transcript.merge(outcome.extraction.clone());
    }
    info!(
        documents = outcomes.len(),
        merged = transcript.documents,
        records = transcript.records.len(),
        "merged batch"
    );
    transcript
}

#[cfg(test)]
mod tests {
    use super::*;

    const MEMO: &str = "Name: RAVI KUMAR\nHall Ticket No: 20AB1A0501\n\
I Year I Semester\nCS101 DataStructures O 4\nMA101 Calculus A 3\n";

    const PAGE: &str = r#"<html><body>
<table><tr><td>SRUTHI REDDY</td><td>21XY5A0412</td></tr></table>
<b>I Year II Semester</b>
<table>
<tr><td>EN102</td><td>ENGLISH</td><td>20</td><td>50</td><td>70</td><td>B</td><td>2</td></tr>
</table>
</body></html>"#;

    #[test]
    fn kind_follows_extension() {
        assert_eq!(DocumentKind::for_path(Path::new("r.HTML")), DocumentKind::Html);
        assert_eq!(DocumentKind::for_path(Path::new("r.htm")), DocumentKind::Html);
        assert_eq!(DocumentKind::for_path(Path::new("memo.txt")), DocumentKind::Text);
        assert_eq!(DocumentKind::for_path(Path::new("memo")), DocumentKind::Text);
    }

    #[test]
    fn caller_hall_ticket_fills_text_records() {
        let memo = "1-2\nPH102 Physics B+ 3\n";
        let extraction = extract_document(DocumentKind::Text, memo, Some("20AB1A0501")).unwrap();
        assert_eq!(extraction.identity.htno, "20AB1A0501");
        assert_eq!(extraction.records[0].htno.as_deref(), Some("20AB1A0501"));
    }

    #[test]
    fn single_table_page_is_rejected() {
        let html = "<table><tr><td>ONLY INFO</td></tr></table>";
        let err = extract_document(DocumentKind::Html, html, None).unwrap_err();
        assert!(matches!(err, TranscriptError::NoResultTables { found: 1 }));
        assert!(err.suggests_text_fallback());
    }

    #[tokio::test]
    async fn batch_keeps_order_and_isolates_failures() {
        let dir = tempfile::tempdir().unwrap();
        let memo = dir.path().join("memo.txt");
        let junk = dir.path().join("junk.txt");
        let page = dir.path().join("result.html");
        let missing = dir.path().join("missing.txt");
        std::fs::write(&memo, MEMO).unwrap();
        std::fs::write(&junk, "nothing useful here").unwrap();
        std::fs::write(&page, PAGE).unwrap();

        let paths = vec![memo, junk, page, missing];
        let outcomes = load_batch(&paths, 2, None).await;

        assert_eq!(outcomes.len(), 4);
        assert!(outcomes[0].extraction.success);
        assert_eq!(outcomes[0].extraction.records.len(), 2);
        assert!(!outcomes[1].extraction.success);
        assert!(outcomes[1].error.is_some());
        assert_eq!(outcomes[2].kind, DocumentKind::Html);
        assert_eq!(outcomes[2].extraction.records.len(), 1);
        assert_eq!(outcomes[2].extraction.records[0].sem, 2);
        assert!(outcomes[3].error.is_some());

        let transcript = merge_outcomes(&outcomes);
        assert_eq!(transcript.documents, 2);
        assert_eq!(transcript.records.len(), 3);
        assert_eq!(transcript.identity.name, "RAVI KUMAR");
        assert_eq!(transcript.records[0].subject_code, "CS101");
        assert_eq!(transcript.records[2].subject_code, "EN102");
    }
}
