use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use super::text::extract_identity;
use super::{Extraction, Extractor};
use crate::grades::{grade_points, Grade};
use crate::models::{StudentIdentity, SubjectRecord};
use crate::semester::{parse_header, SemesterKey};

const SUBJECT_CODE_LABEL: &str = "Subject Code";
const KNOWN_CREDITS: [f64; 8] = [0.0, 1.0, 1.5, 2.0, 2.5, 3.0, 4.0, 5.0];
const MAX_CODE_LEN: usize = 15;

static DECIMAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([0-9]+\.[0-9]+)").expect("decimal pattern"));

static CGPA_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)CGPA\s*[:\-]?\s*([0-9]+\.[0-9]+)").expect("cgpa pattern")
});

/// One table from a results page with the heading text just before it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultTable {
    pub heading: Option<String>,
    pub rows: Vec<Vec<String>>,
}

/// Tables of a rendered results page. Table 0 holds student details.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultPage {
    pub tables: Vec<ResultTable>,
    pub page_text: String,
    pub htno: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Code,
    Name,
    Internal,
    External,
    Total,
    Grade,
    Credits,
}

impl Field {
    /// Classify a header cell by substring.
    pub fn from_header(text: &str) -> Option<Field> {
        let upper = text.trim().to_uppercase();
        let field = if upper.contains("CODE") {
            Field::Code
        } else if upper.contains("NAME") {
            Field::Name
        } else if upper.contains("INT") {
            Field::Internal
        } else if upper.contains("EXT") {
            Field::External
        } else if upper.contains("TOT") {
            Field::Total
        } else if upper.contains("GRADE") && !upper.contains("POINT") {
            Field::Grade
        } else if upper.contains("CREDIT") || upper == "C" || upper == "CR" || upper.contains("CRD")
        {
            Field::Credits
        } else {
            return None;
        };
        Some(field)
    }
}

/// Column index to field. Unmapped columns contribute nothing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnMap(BTreeMap<usize, Field>);

impl ColumnMap {
    /// Code, name, internal, external, total, grade, credits.
    pub fn canonical() -> Self {
        let fields = [
            Field::Code,
            Field::Name,
            Field::Internal,
            Field::External,
            Field::Total,
            Field::Grade,
            Field::Credits,
        ];
        Self(fields.into_iter().enumerate().collect())
    }

    pub fn from_header_row(cells: &[String]) -> Self {
        Self(
            cells
                .iter()
                .enumerate()
                .filter_map(|(idx, cell)| Field::from_header(cell).map(|field| (idx, field)))
                .collect(),
        )
    }

    pub fn get(&self, idx: usize) -> Option<Field> {
        self.0.get(&idx).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Column map for a table plus the index of its first data row.
    pub fn detect(rows: &[Vec<String>]) -> (Self, usize) {
        match rows.first().and_then(|row| row.first()) {
            Some(first) if first.trim() != SUBJECT_CODE_LABEL => (Self::canonical(), 0),
            _ => (
                rows.first()
                    .map(|row| Self::from_header_row(row))
                    .unwrap_or_default(),
                1,
            ),
        }
    }
}

/// Heuristic scanner for the tables of a rendered results page.
#[derive(Debug, Clone, Copy, Default)]
pub struct TableExtractor;

impl Extractor for TableExtractor {
    type Input = ResultPage;

    fn extract(&self, page: &ResultPage) -> Extraction {
        let identity = page_identity(page);
        let official_cgpa = official_cgpa(&page.page_text);

        if page.tables.len() < 2 {
            warn!(tables = page.tables.len(), "no semester tables on results page");
            return Extraction::failed(identity);
        }

        let htno = (!identity.htno.is_empty()).then(|| identity.htno.clone());
        let scan = page.tables[1..]
            .iter()
            .fold(TableScan::new(htno), TableScan::scan_table);

        debug!(
            tables = page.tables.len() - 1,
            records = scan.records.len(),
            "scanned result tables"
        );
        Extraction::new(identity, scan.records, official_cgpa)
    }
}

/// Accumulator threaded through every row of every semester table.
#[derive(Debug, Clone)]
pub struct TableScan {
    pub context: SemesterKey,
    pub records: Vec<SubjectRecord>,
    columns: ColumnMap,
    heading_key: Option<SemesterKey>,
    htno: Option<String>,
}

impl TableScan {
    pub fn new(htno: Option<String>) -> Self {
        Self {
            context: SemesterKey::new(1, 1),
            records: Vec::new(),
            columns: ColumnMap::default(),
            heading_key: None,
            htno,
        }
    }

    pub fn scan_table(mut self, table: &ResultTable) -> Self {
        if table.rows.is_empty() {
            return self;
        }

        let (columns, start) = ColumnMap::detect(&table.rows);
        self.columns = columns;
        self.heading_key = table
            .heading
            .as_deref()
            .and_then(parse_header)
            .filter(SemesterKey::is_valid);

        if self.heading_key.is_none() {
            trace!(heading = ?table.heading, "table heading has no semester designator");
        }

        table.rows[start..]
            .iter()
            .fold(self, |scan, row| scan.step(row))
    }

    /// Consume one row of the current table.
    pub fn step(mut self, row: &[String]) -> Self {
        if let Some(key) = self.heading_key {
            self.context = key;
        }

        if row.first().is_some_and(|cell| cell.contains("SGPA")) {
            if let Some(sgpa) = marker_sgpa(row) {
                attach_official_sgpa(&mut self.records, self.context, sgpa);
            }
            if self.heading_key.is_none() {
                self.context = self.context.advance();
            }
            return self;
        }

        if self.columns.is_empty() && row.len() >= 7 {
            self.columns = ColumnMap::canonical();
        }

        match parse_row(row, &self.columns, self.context, self.htno.as_deref()) {
            Some(record) => self.records.push(record),
            None => trace!(cells = row.len(), "row rejected"),
        }
        self
    }
}

/// SGPA value from a marker row: first decimal in cell 0, else cell 1.
fn marker_sgpa(row: &[String]) -> Option<f64> {
    row.iter()
        .take(2)
        .find_map(|cell| DECIMAL.captures(cell))
        .and_then(|caps| caps[1].parse().ok())
}

/// Annotate the trailing run of records that belong to `key`.
pub fn attach_official_sgpa(records: &mut [SubjectRecord], key: SemesterKey, sgpa: f64) {
    let target = key.clamped();
    let mut idx = records.len();
    while idx > 0 {
        idx -= 1;
        if records[idx].key() != target {
            break;
        }
        records[idx].official_sem_sgpa = Some(sgpa);
    }
}

/// Build a record from one data row, or `None` when the row is not a subject.
pub fn parse_row(
    row: &[String],
    columns: &ColumnMap,
    context: SemesterKey,
    htno: Option<&str>,
) -> Option<SubjectRecord> {
    let mut code = String::new();
    let mut name = String::new();
    let mut grade = String::new();
    let mut internal = None;
    let mut external = None;
    let mut total = None;
    let mut credits = None;

    for (idx, cell) in row.iter().enumerate() {
        let Some(field) = columns.get(idx) else {
            continue;
        };
        let value = cell.trim();
        match field {
            Field::Code => code = value.to_string(),
            Field::Name => name = value.to_string(),
            Field::Grade => grade = value.to_string(),
            Field::Internal => internal = value.parse().ok().or(internal),
            Field::External => external = value.parse().ok().or(external),
            Field::Total => total = value.parse().ok().or(total),
            Field::Credits => {
                credits = value
                    .parse::<f64>()
                    .ok()
                    .filter(|c| (0.0..=10.0).contains(c))
                    .or(credits);
            }
        }
    }

    let credits = credits
        .or_else(|| scan_known_credits(row))
        .unwrap_or_else(|| credits_by_subject_kind(&name, &code));

    if grade.is_empty() {
        grade = row
            .iter()
            .map(|cell| cell.trim())
            .find(|value| Grade::from_symbol(value).is_some())
            .unwrap_or_default()
            .to_string();
    }

    if code.is_empty()
        || name.is_empty()
        || grade.is_empty()
        || code.chars().count() >= MAX_CODE_LEN
        || code == SUBJECT_CODE_LABEL
    {
        return None;
    }

    let key = context.clamped();
    Some(SubjectRecord {
        grade_points: grade_points(&grade),
        subject_code: code,
        subject_name: name,
        grade,
        credits,
        year: key.year,
        sem: key.sem,
        htno: htno.map(str::to_string),
        internal,
        external,
        total,
        official_sem_sgpa: None,
    })
}

/// First cell from column 5 on that reads as a known credit value.
fn scan_known_credits(row: &[String]) -> Option<f64> {
    if row.len() < 7 {
        return None;
    }
    row[5..].iter().find_map(|cell| {
        cell.trim()
            .parse::<f64>()
            .ok()
            .filter(|value| KNOWN_CREDITS.contains(value))
    })
}

/// Typical credit weight for a subject when the page does not say.
pub fn credits_by_subject_kind(name: &str, code: &str) -> f64 {
    let name = name.to_lowercase();
    let code = code.to_lowercase();

    if name.contains("lab") || code.ends_with('l') {
        1.5
    } else if name.contains("workshop") || name.contains("skill") {
        1.0
    } else if name.contains("project") || name.contains("seminar") {
        2.0
    } else if ["mathematics", "calculus", "statistics"]
        .iter()
        .any(|subject| name.contains(subject))
    {
        4.0
    } else {
        3.0
    }
}

/// Student name from the info table; hall ticket from the caller or page text.
fn page_identity(page: &ResultPage) -> StudentIdentity {
    let name = page
        .tables
        .first()
        .and_then(|info| {
            info.rows
                .iter()
                .flatten()
                .map(|cell| cell.trim())
                .find(|text| looks_like_student_name(text))
        })
        .unwrap_or_default()
        .to_string();

    let htno = page
        .htno
        .clone()
        .filter(|htno| !htno.is_empty())
        .unwrap_or_else(|| extract_identity(&page.page_text).htno);

    StudentIdentity { name, htno }
}

fn looks_like_student_name(text: &str) -> bool {
    let letters: Vec<char> = text.chars().filter(|c| *c != ' ').collect();
    text.chars().count() > 5
        && !letters.is_empty()
        && letters.iter().all(|c| c.is_alphabetic())
        && text.chars().any(char::is_uppercase)
        && !text.chars().any(char::is_lowercase)
}

/// CGPA printed on the page, kept only for cross-checking.
pub fn official_cgpa(page_text: &str) -> Option<f64> {
    CGPA_LABEL
        .captures(page_text)
        .and_then(|caps| caps[1].parse().ok())
}
