//! Class-wide statistics over the full result set of one exam.

use std::collections::HashMap;

use crate::models::domain::{ExamAnalytics, ExamResult, SubjectAverage, SubjectComparison};

/// A student's position within the exam's ranking.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Standing {
    /// 1-based.
    pub rank: u32,
    pub percentile: u32,
    pub student_count: u32,
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn mean(sum: f64, count: usize) -> f64 {
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

/// Class average of total nets and, per subject, the average over only the
/// results that contain that subject. Subjects keep first-seen order.
pub fn summarize(results: &[ExamResult]) -> ExamAnalytics {
    let total: f64 = results.iter().map(|r| r.total_net).sum();

    let mut order: Vec<(String, String)> = Vec::new();
    let mut sums: HashMap<&str, (f64, usize)> = HashMap::new();
    for row in results.iter().flat_map(|r| r.results_by_subject.iter()) {
        let entry = sums.entry(row.subject_id.as_str()).or_insert_with(|| {
            order.push((row.subject_id.clone(), row.subject.clone()));
            (0.0, 0)
        });
        entry.0 += row.net;
        entry.1 += 1;
    }

    let subject_averages = order
        .into_iter()
        .map(|(subject_id, subject)| {
            let (sum, count) = sums.get(subject_id.as_str()).copied().unwrap_or((0.0, 0));
            SubjectAverage {
                avg_net: mean(sum, count),
                subject_id,
                subject,
            }
        })
        .collect();

    ExamAnalytics {
        student_count: results.len() as u32,
        class_avg_total_net: mean(total, results.len()),
        subject_averages,
    }
}

/// `round((N - rank) / N * 100)`.
pub fn percentile(rank: u32, student_count: u32) -> u32 {
    if student_count == 0 {
        return 0;
    }
    let n = f64::from(student_count);
    ((n - f64::from(rank)) / n * 100.0).round() as u32
}

/// Standing of every student, keyed by student id. Ranking is by total net,
/// highest first; ties keep input order.
pub fn standings(results: &[ExamResult]) -> HashMap<String, Standing> {
    let mut ranked: Vec<&ExamResult> = results.iter().collect();
    ranked.sort_by(|a, b| b.total_net.total_cmp(&a.total_net));

    let student_count = ranked.len() as u32;
    ranked
        .into_iter()
        .enumerate()
        .map(|(index, result)| {
            let rank = index as u32 + 1;
            (
                result.student_id.clone(),
                Standing {
                    rank,
                    percentile: percentile(rank, student_count),
                    student_count,
                },
            )
        })
        .collect()
}

/// The student's net against the class average for each subject they sat.
pub fn subject_comparisons(
    result: &ExamResult,
    analytics: &ExamAnalytics,
) -> Vec<SubjectComparison> {
    result
        .results_by_subject
        .iter()
        .map(|row| {
            let class_avg_net = analytics
                .subject_averages
                .iter()
                .find(|avg| avg.subject_id == row.subject_id)
                .map(|avg| avg.avg_net)
                .unwrap_or(0.0);
            SubjectComparison {
                subject_id: row.subject_id.clone(),
                subject: row.subject.clone(),
                student_net: row.net,
                class_avg_net,
                delta: round2(row.net - class_avg_net),
            }
        })
        .collect()
}
