//! Statistics derived from logged lines. Always recomputed, never stored.

use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;

use crate::types::{Exercise, Line, Session};

/// Mean reps across `lines`; exactly zero when there are none.
pub fn average_reps(lines: &[Line]) -> Decimal {
    if lines.is_empty() {
        return Decimal::ZERO;
    }

    let total: i64 = lines.iter().map(|l| i64::from(l.reps)).sum();
    Decimal::from(total) / Decimal::from(lines.len() as u64)
}

/// Statistics for a single exercise.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseStats {
    pub exercise: Exercise,
    pub line_count: usize,
    pub total_reps: i64,
    pub average_reps: Decimal,
    pub best_weight: Option<Decimal>,
    /// Sum of weight x reps over every line.
    pub total_volume: Decimal,
}

impl ExerciseStats {
    /// Compute statistics from the lines belonging to `exercise`.
    pub fn compute(exercise: Exercise, lines: &[Line]) -> Self {
        Self {
            line_count: lines.len(),
            total_reps: lines.iter().map(|l| i64::from(l.reps)).sum(),
            average_reps: average_reps(lines),
            best_weight: lines.iter().map(|l| l.weight).max(),
            total_volume: lines
                .iter()
                .map(|l| l.weight * Decimal::from(l.reps))
                .sum(),
            exercise,
        }
    }
}

/// Statistics across everything a user has logged.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub session_count: usize,
    pub exercise_count: usize,
    pub line_count: usize,
    pub exercises: Vec<ExerciseStats>,
}

impl UserStats {
    pub fn compute(sessions: &[Session], exercises: Vec<Exercise>, lines: Vec<Line>) -> Self {
        let line_count = lines.len();

        let mut by_exercise: HashMap<i64, Vec<Line>> = HashMap::new();
        for line in lines {
            by_exercise.entry(line.exercise_id).or_default().push(line);
        }

        let exercise_count = exercises.len();
        let exercises = exercises
            .into_iter()
            .map(|exercise| {
                let lines = by_exercise.remove(&exercise.id).unwrap_or_default();
                ExerciseStats::compute(exercise, &lines)
            })
            .collect();

        Self {
            session_count: sessions.len(),
            exercise_count,
            line_count,
            exercises,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::UserId;
    use chrono::Utc;

    fn line(id: i64, exercise_id: i64, weight: i64, reps: i32) -> Line {
        Line {
            id,
            weight: Decimal::from(weight),
            reps,
            timestamp: Utc::now(),
            slug: format!("line-{}", id),
            exercise_id,
            owner: UserId(1),
        }
    }

    fn exercise(id: i64, name: &str) -> Exercise {
        Exercise {
            id,
            name: name.to_string(),
            slug: name.to_lowercase(),
            session_id: Some(1),
            owner: UserId(1),
        }
    }

    #[test]
    fn test_average_reps_no_lines() {
        assert_eq!(average_reps(&[]), Decimal::ZERO);
    }

    #[test]
    fn test_average_reps_one_line() {
        assert_eq!(average_reps(&[line(1, 1, 100, 10)]), Decimal::from(10));
    }

    #[test]
    fn test_average_reps_multiple_lines() {
        let lines = vec![line(1, 1, 100, 10), line(2, 1, 150, 15), line(3, 1, 200, 20)];
        // 45 / 3
        assert_eq!(average_reps(&lines), Decimal::from(15));
    }

    #[test]
    fn test_average_reps_fractional() {
        let lines = vec![line(1, 1, 100, 5), line(2, 1, 100, 6)];
        assert_eq!(average_reps(&lines), Decimal::new(55, 1));
    }

    #[test]
    fn test_exercise_stats() {
        let lines = vec![line(1, 1, 100, 10), line(2, 1, 120, 8)];
        let stats = ExerciseStats::compute(exercise(1, "Squats"), &lines);

        assert_eq!(stats.line_count, 2);
        assert_eq!(stats.total_reps, 18);
        assert_eq!(stats.average_reps, Decimal::from(9));
        assert_eq!(stats.best_weight, Some(Decimal::from(120)));
        assert_eq!(stats.total_volume, Decimal::from(1960));
    }

    #[test]
    fn test_exercise_stats_empty() {
        let stats = ExerciseStats::compute(exercise(1, "Squats"), &[]);
        assert_eq!(stats.line_count, 0);
        assert_eq!(stats.average_reps, Decimal::ZERO);
        assert_eq!(stats.best_weight, None);
        assert_eq!(stats.total_volume, Decimal::ZERO);
    }

    #[test]
    fn test_user_stats_groups_by_exercise() {
        let exercises = vec![exercise(1, "Squats"), exercise(2, "Lunges")];
        let lines = vec![line(1, 1, 100, 10), line(2, 2, 40, 12), line(3, 1, 110, 8)];

        let stats = UserStats::compute(&[], exercises, lines);

        assert_eq!(stats.exercise_count, 2);
        assert_eq!(stats.line_count, 3);
        assert_eq!(stats.exercises[0].line_count, 2);
        assert_eq!(stats.exercises[0].average_reps, Decimal::from(9));
        assert_eq!(stats.exercises[1].line_count, 1);
        assert_eq!(stats.exercises[1].average_reps, Decimal::from(12));
    }
}
