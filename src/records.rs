use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{TranscriptError, TranscriptResult};
use crate::grades::grade_points;
use crate::models::SubjectRecord;
use crate::semester::SemesterKey;

/// Flat CSV shape of a subject record. Grade points are derived on import.
#[derive(Debug, Serialize, Deserialize)]
struct CsvRow {
    year: u8,
    sem: u8,
    subject_code: String,
    subject_name: String,
    grade: String,
    credits: f64,
    internal: Option<i32>,
    external: Option<i32>,
    total: Option<i32>,
    htno: Option<String>,
    official_sem_sgpa: Option<f64>,
}

impl From<&SubjectRecord> for CsvRow {
    fn from(record: &SubjectRecord) -> Self {
        Self {
            year: record.year,
            sem: record.sem,
            subject_code: record.subject_code.clone(),
            subject_name: record.subject_name.clone(),
            grade: record.grade.clone(),
            credits: record.credits,
            internal: record.internal,
            external: record.external,
            total: record.total,
            htno: record.htno.clone(),
            official_sem_sgpa: record.official_sem_sgpa,
        }
    }
}

impl From<CsvRow> for SubjectRecord {
    fn from(row: CsvRow) -> Self {
        Self {
            grade_points: grade_points(&row.grade),
            subject_code: row.subject_code,
            subject_name: row.subject_name,
            grade: row.grade,
            credits: row.credits,
            year: row.year,
            sem: row.sem,
            htno: row.htno,
            internal: row.internal,
            external: row.external,
            total: row.total,
            official_sem_sgpa: row.official_sem_sgpa,
        }
    }
}

pub fn write_records<W: io::Write>(writer: W, records: &[SubjectRecord]) -> TranscriptResult<()> {
    let mut writer = csv::Writer::from_writer(writer);
    for record in records {
        writer.serialize(CsvRow::from(record))?;
    }
    writer
        .flush()
        .map_err(|e| TranscriptError::io("csv writer", e))?;
    Ok(())
}

/// Read records back, skipping rows whose semester is out of range.
pub fn read_records<R: io::Read>(reader: R) -> TranscriptResult<Vec<SubjectRecord>> {
    let mut reader = csv::Reader::from_reader(reader);
    let mut records = Vec::new();

    for result in reader.deserialize::<CsvRow>() {
        let row = result?;
        if !SemesterKey::new(row.year, row.sem).is_valid() || row.year > 4 {
            warn!(
                code = %row.subject_code,
                year = row.year,
                sem = row.sem,
                "skipping record outside the four-year program"
            );
            continue;
        }
        records.push(SubjectRecord::from(row));
    }

    Ok(records)
}

pub fn export_csv(path: &Path, records: &[SubjectRecord]) -> TranscriptResult<()> {
    let file = std::fs::File::create(path)
        .map_err(|e| TranscriptError::io(path.display().to_string(), e))?;
    write_records(file, records)
}

pub fn import_csv(path: &Path) -> TranscriptResult<Vec<SubjectRecord>> {
    let file =
        std::fs::File::open(path).map_err(|e| TranscriptError::io(path.display().to_string(), e))?;
    read_records(file)
}
