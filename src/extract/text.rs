use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, trace};

use super::{Extraction, Extractor};
use crate::grades::{grade_points, Grade};
use crate::models::{StudentIdentity, SubjectRecord};
use crate::semester::{split_sections, Section, SemesterKey};

static SUBJECT_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)([A-Z0-9]{4,10})\s+(.+?)\s+(O|A\+|A|B\+|B|C|D|F|Ab|ABSENT)\s+([0-9]+(?:\.[0-9])?)\s*$",
    )
    .expect("subject line pattern")
});

static NAME_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Name\s*[:\-]?\s*([A-Za-z \t.]+)").expect("name pattern"));

static HALL_TICKET_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)Hall\s*Ticket\s*(?:No\.?|Number)?\s*[:\-]?\s*([0-9]{2}[A-Z0-9]{8,10})")
        .expect("hall ticket pattern")
});

/// Line scanner for text pulled out of grade memos.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextExtractor;

impl Extractor for TextExtractor {
    type Input = str;

    fn extract(&self, text: &str) -> Extraction {
        let identity = extract_identity(text);
        let htno = (!identity.htno.is_empty()).then(|| identity.htno.clone());

        let scan = split_sections(text)
            .into_iter()
            .fold(TextScan::default(), TextScan::step);

        let records: Vec<SubjectRecord> = scan
            .records
            .into_iter()
            .map(|record| SubjectRecord {
                htno: htno.clone(),
                ..record
            })
            .collect();

        debug!(
            records = records.len(),
            skipped_lines = scan.skipped_lines,
            "scanned memo text"
        );
        Extraction::new(identity, records, None)
    }
}

/// Running state of the section fold. `context` stays `None` until the first
/// usable header, and everything read meanwhile is discarded.
#[derive(Debug, Default)]
struct TextScan {
    context: Option<SemesterKey>,
    records: Vec<SubjectRecord>,
    skipped_lines: usize,
}

impl TextScan {
    fn step(mut self, section: Section<'_>) -> Self {
        match section {
            Section::Header(key) => {
                self.context = key.is_valid().then(|| key.clamped());
            }
            Section::Body(body) => match self.context {
                Some(key) => {
                    for line in body.lines() {
                        match parse_subject_line(line, key) {
                            Some(record) => self.records.push(record),
                            None => self.skipped_lines += 1,
                        }
                    }
                }
                None => trace!(bytes = body.len(), "text before any semester header"),
            },
        }
        self
    }
}

/// Match `<code> <name> <grade> <credits>` at the end of a line.
pub fn parse_subject_line(line: &str, key: SemesterKey) -> Option<SubjectRecord> {
    let caps = SUBJECT_LINE.captures(line)?;
    let grade = Grade::normalize(&caps[3])?;
    let credits: f64 = caps[4].parse().ok()?;

    Some(SubjectRecord {
        subject_code: caps[1].trim().to_string(),
        subject_name: caps[2].trim().to_string(),
        grade: grade.symbol().to_string(),
        credits,
        grade_points: grade_points(grade.symbol()),
        year: key.year,
        sem: key.sem,
        htno: None,
        internal: None,
        external: None,
        total: None,
        official_sem_sgpa: None,
    })
}

/// Best-effort name and hall ticket lookup; missing pieces stay empty.
pub fn extract_identity(text: &str) -> StudentIdentity {
    let name = NAME_LABEL
        .captures(text)
        .map(|caps| caps[1].trim().to_string())
        .unwrap_or_default();
    let htno = HALL_TICKET_LABEL
        .captures(text)
        .map(|caps| caps[1].trim().to_string())
        .unwrap_or_default();

    StudentIdentity { name, htno }
}
