use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::aggregate::{round_to, weighted_gpa};
use crate::error::{TranscriptError, TranscriptResult};
use crate::grades::Grade;
use crate::models::{
    Backlog, CreditsStats, GradeCount, Insight, InsightKind, PerformanceStats, Prediction,
    SemesterSummary, Stability, SubjectRecord, TargetOutcome, Trend, YearlyAverage,
};

const TREND_THRESHOLD: f64 = 0.1;
const SWING_THRESHOLD: f64 = 0.5;

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation; 0.0 below two values.
fn sample_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let avg = mean(values);
    let variance =
        values.iter().map(|v| (v - avg).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

pub fn stability_for(std_dev: f64) -> Stability {
    if std_dev < 0.5 {
        Stability::VeryHigh
    } else if std_dev < 1.0 {
        Stability::High
    } else if std_dev < 1.5 {
        Stability::Moderate
    } else {
        Stability::Volatile
    }
}

/// 100 at zero spread, 0 once the coefficient of variation reaches 0.5.
pub fn consistency_score(mean: f64, std_dev: f64) -> u8 {
    if mean <= 0.0 {
        return 0;
    }
    let cv = std_dev / mean;
    (100.0 * (1.0 - cv / 0.5)).round_ties_even().clamp(0.0, 100.0) as u8
}

/// Most frequent grade; ties go to the lexically smallest symbol.
fn dominant_grade(records: &[SubjectRecord]) -> Option<String> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for record in records {
        *counts.entry(record.grade.as_str()).or_insert(0) += 1;
    }
    let best = counts.values().copied().max()?;
    counts
        .into_iter()
        .find(|(_, count)| *count == best)
        .map(|(grade, _)| grade.to_string())
}

pub fn performance_stats(records: &[SubjectRecord]) -> PerformanceStats {
    if records.is_empty() {
        return PerformanceStats::default();
    }

    let points: Vec<f64> = records.iter().map(|r| f64::from(r.grade_points)).collect();
    let gp_mean = mean(&points);
    let gp_std = sample_std(&points);

    PerformanceStats {
        consistency_score: consistency_score(gp_mean, gp_std),
        grade_stability: stability_for(gp_std),
        dominant_grade: dominant_grade(records).unwrap_or_else(|| "N/A".to_string()),
        grade_points_mean: round_to(gp_mean, 2),
        grade_points_std: round_to(gp_std, 2),
    }
}

/// SGPA per semester in order, preferring the published value.
pub fn sgpa_history(semesters: &[SemesterSummary]) -> Vec<f64> {
    semesters.iter().map(SemesterSummary::effective_sgpa).collect()
}

pub fn trend_for(slope: f64) -> Trend {
    if slope > TREND_THRESHOLD {
        Trend::Increasing
    } else if slope < -TREND_THRESHOLD {
        Trend::Decreasing
    } else {
        Trend::Stable
    }
}

/// Least-squares line over (index, SGPA), evaluated one semester ahead.
pub fn predict_next_sgpa(history: &[f64]) -> Prediction {
    if history.len() < 2 {
        return Prediction {
            predicted_sgpa: None,
            slope: None,
            trend: None,
            message: Some("Need at least 2 semesters of data for prediction".to_string()),
        };
    }

    let n = history.len() as f64;
    let x_mean = (n - 1.0) / 2.0;
    let y_mean = mean(history);

    let (covariance, x_spread) = history
        .iter()
        .enumerate()
        .fold((0.0, 0.0), |(cov, spread), (idx, y)| {
            let dx = idx as f64 - x_mean;
            (cov + dx * (y - y_mean), spread + dx * dx)
        });

    let slope = covariance / x_spread;
    let intercept = y_mean - slope * x_mean;
    let predicted = (intercept + slope * n).clamp(0.0, 10.0);

    Prediction {
        predicted_sgpa: Some(round_to(predicted, 2)),
        slope: Some(round_to(slope, 3)),
        trend: Some(trend_for(slope)),
        message: None,
    }
}

/// Inputs of the target solver.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TargetPlan {
    pub current_cgpa: f64,
    pub completed_credits: f64,
    pub target_cgpa: f64,
    pub remaining_semesters: u32,
    pub credits_per_semester: f64,
}

/// SGPA needed in every remaining semester to land on the target CGPA.
pub fn solve_target(plan: &TargetPlan) -> TranscriptResult<TargetOutcome> {
    let future_credits = f64::from(plan.remaining_semesters) * plan.credits_per_semester;
    if future_credits <= 0.0 {
        return Err(TranscriptError::invalid_plan(
            "remaining semesters and credits per semester must both be positive",
        ));
    }
    if plan.completed_credits < 0.0 {
        return Err(TranscriptError::invalid_plan(
            "completed credits cannot be negative",
        ));
    }

    let total_credits = plan.completed_credits + future_credits;
    let current_points = plan.current_cgpa * plan.completed_credits;
    let needed_points = plan.target_cgpa * total_credits - current_points;
    let required_sgpa = round_to(needed_points / future_credits, 2);
    let achievable = (0.0..=10.0).contains(&required_sgpa);

    let message = if achievable {
        format!("You need ~{required_sgpa} SGPA in remaining semesters")
    } else {
        "Target is mathematically impossible with standard credits".to_string()
    };

    Ok(TargetOutcome {
        required_sgpa,
        achievable,
        message,
        max_reachable_cgpa: round_to((current_points + 10.0 * future_credits) / total_credits, 2),
    })
}

/// Narrative observations over the SGPA history.
pub fn insights(history: &[f64]) -> Vec<Insight> {
    let mut insights = Vec::new();

    if history.len() >= 3 {
        let std_dev = sample_std(history);
        if std_dev > 1.0 {
            insights.push(Insight {
                kind: InsightKind::Warning,
                text: format!(
                    "High volatility detected (Std Dev: {std_dev:.2}). Performance is inconsistent."
                ),
            });
        } else if std_dev < 0.3 {
            insights.push(Insight {
                kind: InsightKind::Success,
                text: "Consistent performance! Your SGPA is very stable.".to_string(),
            });
        }
    }

    if let [.., previous, latest] = history {
        let diff = latest - previous;
        if diff >= SWING_THRESHOLD {
            insights.push(Insight {
                kind: InsightKind::Success,
                text: format!(
                    "Great improvement! SGPA increased by {diff:.2} compared to last semester."
                ),
            });
        } else if diff <= -SWING_THRESHOLD {
            insights.push(Insight {
                kind: InsightKind::Error,
                text: format!("Performance drop detected. SGPA decreased by {:.2}.", diff.abs()),
            });
        }
    }

    insights
}

/// Count of each grade over credit-bearing records, in scale order.
pub fn grade_distribution(records: &[SubjectRecord]) -> Vec<GradeCount> {
    Grade::ALL
        .iter()
        .map(|grade| GradeCount {
            grade: *grade,
            count: records
                .iter()
                .filter(|r| r.credits > 0.0 && r.parsed_grade() == Some(*grade))
                .count(),
        })
        .collect()
}

/// Failed or absent subjects that still carry credits.
pub fn backlogs(records: &[SubjectRecord]) -> Vec<Backlog> {
    records
        .iter()
        .filter(|r| r.credits > 0.0 && r.parsed_grade().is_some_and(Grade::is_backlog))
        .map(|r| Backlog {
            subject_code: r.subject_code.clone(),
            subject_name: r.subject_name.clone(),
            year: r.year,
            sem: r.sem,
            grade: r.grade.clone(),
            credits: r.credits,
        })
        .collect()
}

pub fn credits_stats(records: &[SubjectRecord]) -> CreditsStats {
    records
        .iter()
        .filter(|r| r.credits > 0.0)
        .fold(CreditsStats::default(), |mut stats, r| {
            if r.parsed_grade().is_some_and(Grade::is_backlog) {
                stats.lost += r.credits;
            } else {
                stats.earned += r.credits;
            }
            stats
        })
}

/// Credit-weighted average per year over semesters with a positive SGPA.
pub fn yearly_averages(semesters: &[SemesterSummary]) -> Vec<YearlyAverage> {
    let mut years: BTreeMap<u8, (f64, f64, usize)> = BTreeMap::new();
    for semester in semesters {
        let sgpa = semester.effective_sgpa();
        if sgpa <= 0.0 {
            continue;
        }
        let entry = years.entry(semester.year).or_insert((0.0, 0.0, 0));
        entry.0 += sgpa * semester.credits;
        entry.1 += semester.credits;
        entry.2 += 1;
    }

    years
        .into_iter()
        .map(|(year, (weighted, credits, count))| YearlyAverage {
            year,
            average: weighted_gpa(credits, weighted),
            semesters: count,
        })
        .collect()
}

pub fn performance_category(cgpa: f64) -> &'static str {
    match cgpa {
        c if c >= 9.5 => "Outstanding",
        c if c >= 9.0 => "Excellent",
        c if c >= 8.0 => "Very Good",
        c if c >= 7.0 => "Good",
        c if c >= 6.0 => "Above Average",
        c if c >= 5.0 => "Average",
        _ => "Below Average",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grades::grade_points;

    fn graded(grade: &str, credits: f64) -> SubjectRecord {
        SubjectRecord {
            subject_code: "CS101".to_string(),
            subject_name: "Subject".to_string(),
            grade: grade.to_string(),
            credits,
            grade_points: grade_points(grade),
            year: 1,
            sem: 1,
            htno: None,
            internal: None,
            external: None,
            total: None,
            official_sem_sgpa: None,
        }
    }

    fn summary(year: u8, sem: u8, sgpa: f64, credits: f64) -> SemesterSummary {
        SemesterSummary {
            year,
            sem,
            credits,
            credit_points: sgpa * credits,
            sgpa,
            official_sgpa: None,
        }
    }

    #[test]
    fn uniform_grades_are_fully_consistent() {
        let records = vec![graded("A", 3.0), graded("A", 3.0), graded("A", 4.0)];
        let stats = performance_stats(&records);
        assert_eq!(stats.consistency_score, 100);
        assert_eq!(stats.grade_stability, Stability::VeryHigh);
        assert_eq!(stats.dominant_grade, "A");
        assert_eq!(stats.grade_points_mean, 8.0);
        assert_eq!(stats.grade_points_std, 0.0);
    }

    #[test]
    fn spread_lowers_the_score() {
        // points 10, 8, 6: mean 8, sample std 2, cv 0.25
        let records = vec![graded("O", 3.0), graded("A", 3.0), graded("B", 3.0)];
        let stats = performance_stats(&records);
        assert_eq!(stats.consistency_score, 50);
        assert_eq!(stats.grade_stability, Stability::Volatile);
        assert_eq!(stats.grade_points_std, 2.0);
    }

    #[test]
    fn score_is_bounded() {
        assert_eq!(consistency_score(0.0, 1.0), 0);
        assert_eq!(consistency_score(2.0, 5.0), 0);
        assert_eq!(consistency_score(9.0, 0.0), 100);
        let records = vec![graded("F", 3.0), graded("O", 3.0)];
        assert!(performance_stats(&records).consistency_score <= 100);
    }

    #[test]
    fn stability_steps() {
        assert_eq!(stability_for(0.49), Stability::VeryHigh);
        assert_eq!(stability_for(0.5), Stability::High);
        assert_eq!(stability_for(1.0), Stability::Moderate);
        assert_eq!(stability_for(1.5), Stability::Volatile);
    }

    #[test]
    fn empty_records_give_defaults() {
        let stats = performance_stats(&[]);
        assert_eq!(stats.dominant_grade, "N/A");
        assert_eq!(stats.grade_stability, Stability::Unknown);
        assert_eq!(stats.consistency_score, 0);
    }

    #[test]
    fn dominant_grade_tie_takes_smallest_symbol() {
        let records = vec![graded("B", 3.0), graded("A", 3.0)];
        assert_eq!(performance_stats(&records).dominant_grade, "A");
    }

    #[test]
    fn increasing_history_predicts_higher() {
        let prediction = predict_next_sgpa(&[6.5, 7.0, 7.8]);
        assert_eq!(prediction.trend, Some(Trend::Increasing));
        assert_eq!(prediction.slope, Some(0.65));
        assert_eq!(prediction.predicted_sgpa, Some(8.4));
    }

    #[test]
    fn prediction_is_clamped() {
        let prediction = predict_next_sgpa(&[8.0, 9.0, 10.0]);
        assert_eq!(prediction.predicted_sgpa, Some(10.0));

        let prediction = predict_next_sgpa(&[3.0, 1.5, 0.2]);
        assert_eq!(prediction.predicted_sgpa, Some(0.0));
        assert_eq!(prediction.trend, Some(Trend::Decreasing));
    }

    #[test]
    fn flat_history_is_stable() {
        let prediction = predict_next_sgpa(&[7.5, 7.55]);
        assert_eq!(prediction.trend, Some(Trend::Stable));
    }

    #[test]
    fn short_history_has_no_prediction() {
        let prediction = predict_next_sgpa(&[8.0]);
        assert_eq!(prediction.predicted_sgpa, None);
        assert!(prediction.message.is_some());
        assert!(predict_next_sgpa(&[]).predicted_sgpa.is_none());
    }

    #[test]
    fn impossible_target() {
        let outcome = solve_target(&TargetPlan {
            current_cgpa: 7.0,
            completed_credits: 60.0,
            target_cgpa: 8.0,
            remaining_semesters: 1,
            credits_per_semester: 21.0,
        })
        .unwrap();
        assert_eq!(outcome.required_sgpa, 10.86);
        assert!(!outcome.achievable);
        assert_eq!(
            outcome.message,
            "Target is mathematically impossible with standard credits"
        );
        // (420 + 210) / 81
        assert_eq!(outcome.max_reachable_cgpa, 7.78);
    }

    #[test]
    fn reachable_target() {
        let outcome = solve_target(&TargetPlan {
            current_cgpa: 7.0,
            completed_credits: 60.0,
            target_cgpa: 7.5,
            remaining_semesters: 2,
            credits_per_semester: 20.0,
        })
        .unwrap();
        // (7.5 * 100 - 420) / 40
        assert_eq!(outcome.required_sgpa, 8.25);
        assert!(outcome.achievable);
        assert_eq!(outcome.message, "You need ~8.25 SGPA in remaining semesters");
    }

    #[test]
    fn target_already_exceeded_is_not_achievable() {
        let outcome = solve_target(&TargetPlan {
            current_cgpa: 9.0,
            completed_credits: 140.0,
            target_cgpa: 6.0,
            remaining_semesters: 1,
            credits_per_semester: 20.0,
        })
        .unwrap();
        assert!(outcome.required_sgpa < 0.0);
        assert!(!outcome.achievable);
    }

    #[test]
    fn plan_without_future_credits_is_rejected() {
        let err = solve_target(&TargetPlan {
            current_cgpa: 7.0,
            completed_credits: 60.0,
            target_cgpa: 8.0,
            remaining_semesters: 0,
            credits_per_semester: 21.0,
        })
        .unwrap_err();
        assert!(matches!(err, TranscriptError::InvalidPlan { .. }));
    }

    #[test]
    fn volatile_history_warns_and_flags_drop() {
        let found = insights(&[9.0, 6.0, 8.5, 6.5]);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].kind, InsightKind::Warning);
        assert!(found[0].text.starts_with("High volatility detected"));
        assert_eq!(found[1].kind, InsightKind::Error);
        assert_eq!(found[1].text, "Performance drop detected. SGPA decreased by 2.00.");
    }

    #[test]
    fn steady_history_is_praised() {
        let found = insights(&[8.0, 8.1, 8.2]);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].kind, InsightKind::Success);
    }

    #[test]
    fn improvement_is_flagged_with_two_points() {
        let found = insights(&[7.0, 7.75]);
        assert_eq!(found.len(), 1);
        assert_eq!(
            found[0].text,
            "Great improvement! SGPA increased by 0.75 compared to last semester."
        );
        assert!(insights(&[]).is_empty());
        assert!(insights(&[8.0]).is_empty());
    }

    #[test]
    fn history_prefers_official_sgpa() {
        let mut first = summary(1, 1, 8.0, 20.0);
        first.official_sgpa = Some(8.2);
        let history = sgpa_history(&[first, summary(1, 2, 7.0, 20.0)]);
        assert_eq!(history, vec![8.2, 7.0]);
    }

    #[test]
    fn backlogs_and_credit_split() {
        let records = vec![
            graded("O", 3.0),
            graded("F", 4.0),
            graded("Ab", 3.0),
            graded("F", 0.0),
        ];
        let found = backlogs(&records);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].grade, "F");
        assert_eq!(found[1].grade, "Ab");

        let credits = credits_stats(&records);
        assert_eq!(credits.earned, 3.0);
        assert_eq!(credits.lost, 7.0);
    }

    #[test]
    fn distribution_skips_zero_credit_subjects() {
        let records = vec![graded("O", 3.0), graded("O", 0.0), graded("B+", 3.0)];
        let distribution = grade_distribution(&records);
        assert_eq!(distribution.len(), Grade::ALL.len());
        assert_eq!(distribution[0].count, 1);
        assert_eq!(distribution[3].grade, Grade::BPlus);
        assert_eq!(distribution[3].count, 1);
    }

    #[test]
    fn yearly_average_weights_by_credits() {
        let semesters = vec![
            summary(1, 1, 8.0, 20.0),
            summary(1, 2, 9.0, 20.0),
            summary(2, 1, 0.0, 20.0),
        ];
        let years = yearly_averages(&semesters);
        assert_eq!(years.len(), 1);
        assert_eq!(years[0].average, 8.5);
        assert_eq!(years[0].semesters, 2);
    }

    #[test]
    fn categories() {
        assert_eq!(performance_category(9.6), "Outstanding");
        assert_eq!(performance_category(8.2), "Very Good");
        assert_eq!(performance_category(4.9), "Below Average");
    }
}
