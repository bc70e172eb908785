use serde::{Deserialize, Serialize};

use crate::grades::Grade;
use crate::semester::SemesterKey;

/// One evaluated course instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectRecord {
    pub subject_code: String,
    pub subject_name: String,
    pub grade: String,
    pub credits: f64,
    pub grade_points: u8,
    pub year: u8,
    pub sem: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub htno: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub internal: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub official_sem_sgpa: Option<f64>,
}

impl SubjectRecord {
    pub fn key(&self) -> SemesterKey {
        SemesterKey::new(self.year, self.sem)
    }

    pub fn parsed_grade(&self) -> Option<Grade> {
        Grade::from_symbol(&self.grade)
    }

    pub fn credit_points(&self) -> f64 {
        self.credits * f64::from(self.grade_points)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StudentIdentity {
    pub name: String,
    pub htno: String,
}

impl StudentIdentity {
    /// Fill empty fields from another identity, keeping what is already known.
    pub fn absorb(&mut self, other: &StudentIdentity) {
        if self.name.is_empty() {
            self.name = other.name.clone();
        }
        if self.htno.is_empty() {
            self.htno = other.htno.clone();
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SemesterSummary {
    pub year: u8,
    pub sem: u8,
    pub credits: f64,
    pub credit_points: f64,
    pub sgpa: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub official_sgpa: Option<f64>,
}

impl SemesterSummary {
    pub fn key(&self) -> SemesterKey {
        SemesterKey::new(self.year, self.sem)
    }

    /// SGPA published by the university when known, otherwise the computed one.
    pub fn effective_sgpa(&self) -> f64 {
        self.official_sgpa.unwrap_or(self.sgpa)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CumulativeMetrics {
    pub cgpa: f64,
    pub percentage: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stability {
    #[serde(rename = "Very High")]
    VeryHigh,
    High,
    Moderate,
    Volatile,
    Unknown,
}

impl Stability {
    pub fn label(self) -> &'static str {
        match self {
            Stability::VeryHigh => "Very High",
            Stability::High => "High",
            Stability::Moderate => "Moderate",
            Stability::Volatile => "Volatile",
            Stability::Unknown => "Unknown",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceStats {
    pub consistency_score: u8,
    pub grade_stability: Stability,
    pub dominant_grade: String,
    pub grade_points_mean: f64,
    pub grade_points_std: f64,
}

impl Default for PerformanceStats {
    fn default() -> Self {
        Self {
            consistency_score: 0,
            grade_stability: Stability::Unknown,
            dominant_grade: "N/A".to_string(),
            grade_points_mean: 0.0,
            grade_points_std: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Trend {
    Increasing,
    Decreasing,
    Stable,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub predicted_sgpa: Option<f64>,
    pub slope: Option<f64>,
    pub trend: Option<Trend>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsightKind {
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    #[serde(rename = "type")]
    pub kind: InsightKind,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetOutcome {
    pub required_sgpa: f64,
    pub achievable: bool,
    pub message: String,
    pub max_reachable_cgpa: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Backlog {
    pub subject_code: String,
    pub subject_name: String,
    pub year: u8,
    pub sem: u8,
    pub grade: String,
    pub credits: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearlyAverage {
    pub year: u8,
    pub average: f64,
    pub semesters: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CreditsStats {
    pub earned: f64,
    pub lost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeCount {
    pub grade: Grade,
    pub count: usize,
}
