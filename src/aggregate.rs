use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use crate::extract::Extraction;
use crate::models::{CumulativeMetrics, SemesterSummary, StudentIdentity, SubjectRecord};
use crate::semester::SemesterKey;

/// Round half to even at `places` decimals.
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round_ties_even() / factor
}

/// Credit-weighted mean of grade points; 0.0 when there are no credits.
pub fn weighted_gpa(credits: f64, credit_points: f64) -> f64 {
    if credits > 0.0 {
        round_to(credit_points / credits, 2)
    } else {
        0.0
    }
}

pub fn summarize_semesters(records: &[SubjectRecord]) -> Vec<SemesterSummary> {
    let mut groups: BTreeMap<SemesterKey, (f64, f64, Option<f64>)> = BTreeMap::new();

    for record in records {
        let entry = groups.entry(record.key()).or_insert((0.0, 0.0, None));
        entry.0 += record.credits;
        entry.1 += record.credit_points();
        if entry.2.is_none() {
            entry.2 = record.official_sem_sgpa.filter(|sgpa| *sgpa > 0.0);
        }
    }

    groups
        .into_iter()
        .map(|(key, (credits, credit_points, official_sgpa))| SemesterSummary {
            year: key.year,
            sem: key.sem,
            credits,
            credit_points,
            sgpa: weighted_gpa(credits, credit_points),
            official_sgpa,
        })
        .collect()
}

pub fn cgpa(records: &[SubjectRecord]) -> f64 {
    let credits: f64 = records.iter().map(|r| r.credits).sum();
    let credit_points: f64 = records.iter().map(SubjectRecord::credit_points).sum();
    weighted_gpa(credits, credit_points)
}

/// Percentage equivalent: (CGPA - 0.5) x 10; zero when there is no CGPA.
pub fn percentage(cgpa: f64) -> f64 {
    if cgpa <= 0.0 {
        return 0.0;
    }
    round_to((cgpa - 0.5) * 10.0, 2)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Aggregate {
    pub semesters: Vec<SemesterSummary>,
    pub cumulative: CumulativeMetrics,
    pub total_credits: f64,
}

/// Full recompute of semester and cumulative metrics from a record set.
pub fn aggregate(records: &[SubjectRecord]) -> Aggregate {
    let semesters = summarize_semesters(records);
    let cgpa = cgpa(records);
    let total_credits = records.iter().map(|r| r.credits).sum();

    debug!(
        records = records.len(),
        semesters = semesters.len(),
        cgpa,
        "aggregated transcript"
    );

    Aggregate {
        semesters,
        cumulative: CumulativeMetrics {
            cgpa,
            percentage: percentage(cgpa),
        },
        total_credits,
    }
}

/// Records merged from every document of one student.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Transcript {
    pub identity: StudentIdentity,
    pub records: Vec<SubjectRecord>,
    pub official_cgpa: Option<f64>,
    pub documents: usize,
}

impl Transcript {
    /// Append a successful extraction. Failed ones leave the transcript untouched.
    pub fn merge(&mut self, extraction: Extraction) -> bool {
        if !extraction.success {
            return false;
        }
        self.identity.absorb(&extraction.identity);
        self.official_cgpa = self.official_cgpa.or(extraction.official_cgpa);
        self.records.extend(extraction.records);
        self.documents += 1;
        true
    }

    pub fn extend_records(&mut self, records: Vec<SubjectRecord>) {
        self.records.extend(records);
    }

    pub fn aggregate(&self) -> Aggregate {
        aggregate(&self.records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grades::grade_points;

    fn record(year: u8, sem: u8, grade: &str, credits: f64) -> SubjectRecord {
        SubjectRecord {
            subject_code: format!("SUB{year}{sem}"),
            subject_name: "Subject".to_string(),
            grade: grade.to_string(),
            credits,
            grade_points: grade_points(grade),
            year,
            sem,
            htno: None,
            internal: None,
            external: None,
            total: None,
            official_sem_sgpa: None,
        }
    }

    #[test]
    fn semester_sgpa_is_credit_weighted() {
        let records = vec![record(1, 1, "O", 4.0), record(1, 1, "A", 3.0)];
        let summaries = summarize_semesters(&records);
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].credit_points, 64.0);
        assert_eq!(summaries[0].credits, 7.0);
        assert_eq!(summaries[0].sgpa, 9.14);
    }

    #[test]
    fn halves_round_to_even() {
        // (5 x 10 + 3 x 5) / 8 = 8.125
        let records = vec![record(1, 1, "O", 5.0), record(1, 1, "C", 3.0)];
        assert_eq!(summarize_semesters(&records)[0].sgpa, 8.12);
        assert_eq!(cgpa(&records), 8.12);
        assert_eq!(round_to(0.375, 2), 0.38);
    }

    #[test]
    fn semesters_come_out_in_order() {
        let records = vec![
            record(2, 1, "B", 3.0),
            record(1, 2, "A", 3.0),
            record(1, 1, "O", 3.0),
            record(1, 2, "C", 3.0),
        ];
        let keys: Vec<(u8, u8)> = summarize_semesters(&records)
            .iter()
            .map(|s| (s.year, s.sem))
            .collect();
        assert_eq!(keys, vec![(1, 1), (1, 2), (2, 1)]);
    }

    #[test]
    fn cumulative_metrics() {
        let records = vec![
            record(1, 1, "O", 4.0),
            record(1, 1, "A", 3.0),
            record(1, 2, "B", 3.0),
        ];
        let result = aggregate(&records);
        // (40 + 24 + 18) / 10
        assert_eq!(result.cumulative.cgpa, 8.2);
        assert_eq!(result.cumulative.percentage, 77.0);
        assert_eq!(result.total_credits, 10.0);
    }

    #[test]
    fn zero_credits_never_divides() {
        let records = vec![record(1, 1, "O", 0.0)];
        let result = aggregate(&records);
        assert_eq!(result.cumulative.cgpa, 0.0);
        assert_eq!(result.cumulative.percentage, 0.0);
        assert_eq!(result.semesters[0].sgpa, 0.0);
        assert_eq!(aggregate(&[]).semesters.len(), 0);
    }

    #[test]
    fn percentage_clamps_only_missing_cgpa() {
        assert_eq!(percentage(0.0), 0.0);
        assert_eq!(percentage(-1.0), 0.0);
        assert_eq!(percentage(0.3), -2.0);
        assert_eq!(percentage(7.69), 71.9);
    }

    #[test]
    fn recompute_is_idempotent_and_order_free() {
        let a = vec![record(1, 1, "O", 4.0), record(1, 2, "B+", 3.0)];
        let b = vec![record(2, 1, "A", 3.0), record(1, 1, "C", 2.0)];

        let ab: Vec<_> = a.iter().chain(b.iter()).cloned().collect();
        let ba: Vec<_> = b.iter().chain(a.iter()).cloned().collect();

        assert_eq!(aggregate(&ab), aggregate(&ab));
        assert_eq!(aggregate(&ab).cumulative, aggregate(&ba).cumulative);
        assert_eq!(aggregate(&ab).semesters, aggregate(&ba).semesters);
    }

    #[test]
    fn official_sgpa_is_carried() {
        let mut official = record(1, 1, "A", 3.0);
        official.official_sem_sgpa = Some(8.57);
        let summaries = summarize_semesters(&[record(1, 1, "O", 3.0), official]);
        assert_eq!(summaries[0].official_sgpa, Some(8.57));
        assert_eq!(summaries[0].effective_sgpa(), 8.57);
    }

    #[test]
    fn failed_extraction_does_not_merge() {
        let mut transcript = Transcript::default();
        assert!(!transcript.merge(Extraction::failed(StudentIdentity::default())));

        let identity = StudentIdentity {
            name: "RAVI KUMAR".to_string(),
            htno: String::new(),
        };
        let extraction = Extraction::new(identity, vec![record(1, 1, "O", 3.0)], Some(9.0));
        assert!(transcript.merge(extraction));
        assert_eq!(transcript.documents, 1);
        assert_eq!(transcript.records.len(), 1);
        assert_eq!(transcript.identity.name, "RAVI KUMAR");
        assert_eq!(transcript.official_cgpa, Some(9.0));
    }
}
