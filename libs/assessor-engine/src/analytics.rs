/// Progress Analytics - Aggregation over Attempt History
///
/// **Core Responsibility:**
/// Summarize a user's stored attempts: daily trend, per-type and
/// per-difficulty breakdowns, and a first-half/second-half improvement signal.
///
/// **Critical Properties:**
/// - Pure: identical history gives identical output, whatever its order
/// - Total: an empty history yields empty vectors and zeros
/// - Averages skip attempts without a score (or time); counts include them
/// - Reported averages are rounded to two decimals
use assessor_common::types::{AttemptRecord, ChallengeType, Difficulty};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub date: NaiveDate,
    pub average_score: f64,
    pub attempts: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeStats {
    pub challenge_type: ChallengeType,
    pub average_score: f64,
    pub attempts: usize,
    pub average_time_seconds: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DifficultyStats {
    pub difficulty: Difficulty,
    pub average_score: f64,
    pub attempts: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HalfStats {
    pub attempts: usize,
    pub average_score: f64,
    pub average_time_seconds: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Improvement {
    pub first_half: HalfStats,
    pub second_half: HalfStats,
    /// second_half.average_score - first_half.average_score
    pub score_change: f64,
    /// second_half.average_time_seconds - first_half.average_time_seconds
    pub time_change: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Overview {
    pub total_attempts: usize,
    pub distinct_challenges: usize,
    pub average_score: f64,
    pub best_score: f64,
    pub total_time_seconds: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressReport {
    pub overview: Overview,
    pub trend: Vec<TrendPoint>,
    pub by_type: Vec<TypeStats>,
    pub by_difficulty: Vec<DifficultyStats>,
    pub improvement: Improvement,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn average(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        0.0
    } else {
        round2(sum / count as f64)
    }
}

fn average_score(attempts: &[&AttemptRecord]) -> f64 {
    average(attempts.iter().filter_map(|a| a.performance_score))
}

fn average_time(attempts: &[&AttemptRecord]) -> f64 {
    average(attempts.iter().filter_map(|a| a.time_taken_seconds).map(f64::from))
}

/// Per-day averages for attempts completed in `(now - window_days, now]`.
/// Only days with attempts appear, in ascending order.
pub fn trend(attempts: &[AttemptRecord], now: DateTime<Utc>, window_days: u32) -> Vec<TrendPoint> {
    // A window reaching past the representable range covers everything
    let start = Duration::try_days(i64::from(window_days))
        .and_then(|window| now.checked_sub_signed(window))
        .unwrap_or(DateTime::<Utc>::MIN_UTC);

    let mut days: BTreeMap<NaiveDate, Vec<&AttemptRecord>> = BTreeMap::new();
    for attempt in attempts
        .iter()
        .filter(|a| a.completed_at > start && a.completed_at <= now)
    {
        days.entry(attempt.completed_at.date_naive()).or_default().push(attempt);
    }

    days.into_iter()
        .map(|(date, group)| TrendPoint {
            date,
            average_score: average_score(&group),
            attempts: group.len(),
        })
        .collect()
}

pub fn by_type(attempts: &[AttemptRecord]) -> Vec<TypeStats> {
    let mut groups: BTreeMap<ChallengeType, Vec<&AttemptRecord>> = BTreeMap::new();
    for attempt in attempts {
        groups.entry(attempt.challenge_type).or_default().push(attempt);
    }

    groups
        .into_iter()
        .map(|(challenge_type, group)| TypeStats {
            challenge_type,
            average_score: average_score(&group),
            attempts: group.len(),
            average_time_seconds: average_time(&group),
        })
        .collect()
}

pub fn by_difficulty(attempts: &[AttemptRecord]) -> Vec<DifficultyStats> {
    let mut groups: BTreeMap<Difficulty, Vec<&AttemptRecord>> = BTreeMap::new();
    for attempt in attempts {
        groups.entry(attempt.difficulty_level).or_default().push(attempt);
    }

    groups
        .into_iter()
        .map(|(difficulty, group)| DifficultyStats {
            difficulty,
            average_score: average_score(&group),
            attempts: group.len(),
        })
        .collect()
}

/// Completion time first; the remaining fields break ties so the split
/// does not depend on the stored order.
fn chronological(a: &AttemptRecord, b: &AttemptRecord) -> Ordering {
    a.completed_at
        .cmp(&b.completed_at)
        .then_with(|| a.challenge_id.cmp(&b.challenge_id))
        .then_with(|| a.user_id.cmp(&b.user_id))
        .then_with(|| {
            let score = |r: &AttemptRecord| r.performance_score.unwrap_or(f64::NEG_INFINITY);
            score(a).total_cmp(&score(b))
        })
        .then_with(|| a.time_taken_seconds.cmp(&b.time_taken_seconds))
}

/// Chronological split: the first `n / 2` attempts against the rest
pub fn improvement(attempts: &[AttemptRecord]) -> Improvement {
    let mut ordered: Vec<&AttemptRecord> = attempts.iter().collect();
    ordered.sort_by(|a, b| chronological(a, b));

    let (first, second) = ordered.split_at(ordered.len() / 2);
    let half = |group: &[&AttemptRecord]| HalfStats {
        attempts: group.len(),
        average_score: average_score(group),
        average_time_seconds: average_time(group),
    };
    let first_half = half(first);
    let second_half = half(second);

    Improvement {
        score_change: round2(second_half.average_score - first_half.average_score),
        time_change: round2(second_half.average_time_seconds - first_half.average_time_seconds),
        first_half,
        second_half,
    }
}

pub fn overview(attempts: &[AttemptRecord]) -> Overview {
    let all: Vec<&AttemptRecord> = attempts.iter().collect();
    let distinct: BTreeSet<&str> = attempts.iter().map(|a| a.challenge_id.as_str()).collect();
    let best_score = attempts
        .iter()
        .filter_map(|a| a.performance_score)
        .fold(None, |best: Option<f64>, score| Some(best.map_or(score, |b| b.max(score))))
        .unwrap_or(0.0);

    Overview {
        total_attempts: attempts.len(),
        distinct_challenges: distinct.len(),
        average_score: average_score(&all),
        best_score: round2(best_score),
        total_time_seconds: attempts
            .iter()
            .filter_map(|a| a.time_taken_seconds)
            .map(u64::from)
            .sum(),
    }
}

/// Everything above in one response
pub fn progress_report(attempts: &[AttemptRecord], now: DateTime<Utc>, window_days: u32) -> ProgressReport {
    ProgressReport {
        overview: overview(attempts),
        trend: trend(attempts, now, window_days),
        by_type: by_type(attempts),
        by_difficulty: by_difficulty(attempts),
        improvement: improvement(attempts),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, day, hour, 0, 0).unwrap()
    }

    fn attempt(
        challenge: &str,
        completed_at: DateTime<Utc>,
        score: Option<f64>,
        time: Option<u32>,
        challenge_type: ChallengeType,
        difficulty: Difficulty,
    ) -> AttemptRecord {
        AttemptRecord {
            user_id: "user-1".to_string(),
            challenge_id: challenge.to_string(),
            completed_at,
            performance_score: score,
            time_taken_seconds: time,
            challenge_type,
            difficulty_level: difficulty,
        }
    }

    fn coding(challenge: &str, completed_at: DateTime<Utc>, score: f64, time: u32) -> AttemptRecord {
        attempt(challenge, completed_at, Some(score), Some(time), ChallengeType::Coding, Difficulty::Medium)
    }

    #[test]
    fn test_empty_history() {
        let report = progress_report(&[], at(10, 12), 30);
        assert!(report.trend.is_empty());
        assert!(report.by_type.is_empty());
        assert!(report.by_difficulty.is_empty());
        assert_eq!(report.improvement, Improvement::default());
        assert_eq!(report.overview, Overview::default());
    }

    #[test]
    fn test_improvement_splits_five_into_two_and_three() {
        let attempts = vec![
            coding("c5", at(5, 9), 90.0, 100),
            coding("c1", at(1, 9), 40.0, 300),
            coding("c3", at(3, 9), 70.0, 200),
            coding("c2", at(2, 9), 60.0, 300),
            coding("c4", at(4, 9), 80.0, 100),
        ];

        let result = improvement(&attempts);

        assert_eq!(result.first_half.attempts, 2);
        assert_eq!(result.second_half.attempts, 3);
        assert_eq!(result.first_half.average_score, 50.0);
        assert_eq!(result.second_half.average_score, 80.0);
        assert_eq!(result.first_half.average_time_seconds, 300.0);
        assert_eq!(result.second_half.average_time_seconds, 133.33);
        assert_eq!(result.score_change, 30.0);
        assert_eq!(result.time_change, -166.67);
    }

    #[test]
    fn test_single_attempt_lands_in_second_half() {
        let result = improvement(&[coding("c1", at(1, 9), 55.0, 60)]);
        assert_eq!(result.first_half.attempts, 0);
        assert_eq!(result.second_half.attempts, 1);
        assert_eq!(result.score_change, 55.0);
    }

    #[test]
    fn test_trend_groups_by_day_within_window() {
        let now = at(31, 12);
        let attempts = vec![
            coding("a", at(31, 8), 80.0, 10),
            coding("b", at(31, 10), 60.0, 10),
            coding("c", at(30, 23), 50.0, 10),
            // exactly at the window start: excluded
            coding("old", at(24, 12), 10.0, 10),
            // after now: excluded
            coding("future", at(31, 13), 10.0, 10),
        ];

        let points = trend(&attempts, now, 7);

        assert_eq!(
            points,
            vec![
                TrendPoint {
                    date: NaiveDate::from_ymd_opt(2026, 3, 30).unwrap(),
                    average_score: 50.0,
                    attempts: 1,
                },
                TrendPoint {
                    date: NaiveDate::from_ymd_opt(2026, 3, 31).unwrap(),
                    average_score: 70.0,
                    attempts: 2,
                },
            ]
        );
    }

    #[test]
    fn test_missing_scores_are_counted_but_not_averaged() {
        let attempts = vec![
            attempt("a", at(1, 9), Some(90.0), None, ChallengeType::SystemDesign, Difficulty::Hard),
            attempt("b", at(2, 9), None, Some(600), ChallengeType::SystemDesign, Difficulty::Hard),
        ];

        let types = by_type(&attempts);

        assert_eq!(
            types,
            vec![TypeStats {
                challenge_type: ChallengeType::SystemDesign,
                average_score: 90.0,
                attempts: 2,
                average_time_seconds: 600.0,
            }]
        );
    }

    #[test]
    fn test_groups_are_in_stable_order() {
        let attempts = vec![
            attempt("a", at(1, 9), Some(30.0), Some(10), ChallengeType::CaseStudy, Difficulty::Hard),
            attempt("b", at(2, 9), Some(60.0), Some(20), ChallengeType::Coding, Difficulty::Easy),
            attempt("c", at(3, 9), Some(90.0), Some(30), ChallengeType::Coding, Difficulty::Hard),
        ];

        let types: Vec<ChallengeType> = by_type(&attempts).into_iter().map(|s| s.challenge_type).collect();
        assert_eq!(types, vec![ChallengeType::Coding, ChallengeType::CaseStudy]);

        let difficulties = by_difficulty(&attempts);
        assert_eq!(difficulties.len(), 2);
        assert_eq!(difficulties[0].difficulty, Difficulty::Easy);
        assert_eq!(difficulties[1].difficulty, Difficulty::Hard);
        assert_eq!(difficulties[1].average_score, 60.0);
        assert_eq!(difficulties[1].attempts, 2);
    }

    #[test]
    fn test_output_independent_of_input_order() {
        let attempts = vec![
            coding("a", at(1, 9), 33.0, 10),
            coding("b", at(2, 9), 66.0, 20),
            coding("a", at(3, 9), 99.0, 30),
            attempt("d", at(3, 10), Some(12.5), None, ChallengeType::CaseStudy, Difficulty::Easy),
        ];
        let mut reversed = attempts.clone();
        reversed.reverse();

        let now = at(4, 0);
        assert_eq!(progress_report(&attempts, now, 30), progress_report(&reversed, now, 30));
    }

    #[test]
    fn test_trend_with_huge_window_covers_everything() {
        let attempts = vec![coding("a", at(1, 9), 40.0, 10), coding("b", at(9, 9), 60.0, 10)];

        assert!(trend(&[], at(10, 12), u32::MAX).is_empty());
        let points = trend(&attempts, at(10, 12), u32::MAX);
        assert_eq!(points.len(), 2);

        let report = progress_report(&attempts, at(10, 12), u32::MAX);
        assert_eq!(report.trend, points);
    }

    #[test]
    fn test_improvement_ties_do_not_depend_on_order() {
        let attempts = vec![
            coding("b", at(1, 9), 90.0, 10),
            coding("a", at(1, 9), 10.0, 50),
            coding("c", at(2, 9), 50.0, 30),
        ];
        let mut reversed = attempts.clone();
        reversed.reverse();

        let forward = improvement(&attempts);
        assert_eq!(forward, improvement(&reversed));
        // "a" sorts before "b" at the same instant
        assert_eq!(forward.first_half.average_score, 10.0);
        assert_eq!(forward.second_half.average_score, 70.0);
    }

    #[test]
    fn test_overview() {
        let attempts = vec![
            coding("a", at(1, 9), 33.34, 10),
            coding("a", at(2, 9), 66.0, 20),
            attempt("b", at(3, 9), None, None, ChallengeType::Coding, Difficulty::Easy),
        ];

        let summary = overview(&attempts);

        assert_eq!(summary.total_attempts, 3);
        assert_eq!(summary.distinct_challenges, 2);
        assert_eq!(summary.average_score, 49.67);
        assert_eq!(summary.best_score, 66.0);
        assert_eq!(summary.total_time_seconds, 30);
    }
}
