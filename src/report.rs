use std::fmt::Write;

use chrono::NaiveDate;
use serde::Serialize;

use crate::aggregate::Transcript;
use crate::models::{
    Backlog, CreditsStats, CumulativeMetrics, GradeCount, Insight, PerformanceStats, Prediction,
    SemesterSummary, StudentIdentity, SubjectRecord, YearlyAverage,
};
use crate::stats;

/// Everything derived from one student's merged record set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Analysis {
    pub identity: StudentIdentity,
    pub records: Vec<SubjectRecord>,
    pub semesters: Vec<SemesterSummary>,
    pub cumulative: CumulativeMetrics,
    pub total_credits: f64,
    pub performance: PerformanceStats,
    pub prediction: Prediction,
    pub insights: Vec<Insight>,
    pub backlogs: Vec<Backlog>,
    pub distribution: Vec<GradeCount>,
    pub credits: CreditsStats,
    pub yearly: Vec<YearlyAverage>,
    pub category: String,
    pub official_cgpa: Option<f64>,
}

pub fn build_analysis(transcript: &Transcript) -> Analysis {
    let aggregate = transcript.aggregate();
    let history = stats::sgpa_history(&aggregate.semesters);

    Analysis {
        identity: transcript.identity.clone(),
        records: transcript.records.clone(),
        performance: stats::performance_stats(&transcript.records),
        prediction: stats::predict_next_sgpa(&history),
        insights: stats::insights(&history),
        backlogs: stats::backlogs(&transcript.records),
        distribution: stats::grade_distribution(&transcript.records),
        credits: stats::credits_stats(&transcript.records),
        yearly: stats::yearly_averages(&aggregate.semesters),
        category: stats::performance_category(aggregate.cumulative.cgpa).to_string(),
        official_cgpa: transcript.official_cgpa,
        semesters: aggregate.semesters,
        cumulative: aggregate.cumulative,
        total_credits: aggregate.total_credits,
    }
}

fn or_unknown(value: &str) -> &str {
    if value.is_empty() {
        "unknown"
    } else {
        value
    }
}

pub fn build_report(analysis: &Analysis, generated_on: NaiveDate) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Transcript GPA Report");
    let _ = writeln!(
        output,
        "Generated for {} ({}) on {}",
        or_unknown(&analysis.identity.name),
        or_unknown(&analysis.identity.htno),
        generated_on
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Summary");
    let _ = writeln!(
        output,
        "- CGPA {:.2} ({}), percentage {:.2}%",
        analysis.cumulative.cgpa, analysis.category, analysis.cumulative.percentage
    );
    if let Some(official) = analysis.official_cgpa {
        let _ = writeln!(output, "- Reported CGPA {official:.2}");
    }
    let _ = writeln!(
        output,
        "- {} credits earned, {} lost across {} subjects",
        analysis.credits.earned,
        analysis.credits.lost,
        analysis.records.len()
    );

    let _ = writeln!(output);
    let _ = writeln!(output, "## Semesters");

    if analysis.semesters.is_empty() {
        let _ = writeln!(output, "No semester records found.");
    } else {
        let _ = writeln!(output, "| Semester | Credits | SGPA | Official |");
        let _ = writeln!(output, "|---|---|---|---|");
        for semester in analysis.semesters.iter() {
            let official = semester
                .official_sgpa
                .map(|sgpa| format!("{sgpa:.2}"))
                .unwrap_or_else(|| "-".to_string());
            let _ = writeln!(
                output,
                "| {} | {} | {:.2} | {} |",
                semester.key().label(),
                semester.credits,
                semester.sgpa,
                official
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Performance");
    let performance = &analysis.performance;
    let _ = writeln!(
        output,
        "- Consistency score {} ({} stability, std dev {:.2})",
        performance.consistency_score,
        performance.grade_stability.label(),
        performance.grade_points_std
    );
    let _ = writeln!(output, "- Dominant grade {}", performance.dominant_grade);

    match (analysis.prediction.predicted_sgpa, analysis.prediction.trend) {
        (Some(predicted), Some(trend)) => {
            let _ = writeln!(
                output,
                "- Next semester projected at {predicted:.2} SGPA ({trend:?})"
            );
        }
        _ => {
            let message = analysis.prediction.message.as_deref().unwrap_or("No prediction");
            let _ = writeln!(output, "- {message}");
        }
    }

    if !analysis.insights.is_empty() {
        let _ = writeln!(output);
        let _ = writeln!(output, "## Insights");
        for insight in analysis.insights.iter() {
            let _ = writeln!(output, "- [{:?}] {}", insight.kind, insight.text);
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Backlogs");

    if analysis.backlogs.is_empty() {
        let _ = writeln!(output, "No backlogs.");
    } else {
        for backlog in analysis.backlogs.iter() {
            let _ = writeln!(
                output,
                "- {} {} ({}-{}): {}, {} credits",
                backlog.subject_code,
                backlog.subject_name,
                backlog.year,
                backlog.sem,
                backlog.grade,
                backlog.credits
            );
        }
    }

    output
}
