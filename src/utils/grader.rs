use crate::models::{AccuracyRecord, FinalScore, Grade, PredictionRecord};

/// Grading tolerance in points for the spread component. This is
/// bet-grading tolerance, not push/cover logic: a prediction within the
/// band counts as correct.
pub const SPREAD_TOLERANCE: f64 = 3.0;

/// Grading tolerance in points for the total component (boundary inclusive)
pub const TOTAL_TOLERANCE: f64 = 3.0;

/// Grade a stored prediction against the actual final score.
///
/// Pure function: the caller persists the record and triggers any
/// downstream learning step, exactly once per grading event. Missing
/// prediction fields grade as incorrect and set the `partial` flag; they
/// never error, since partial predictions are a legitimate historical
/// state.
///
/// Sign convention: `actual_spread = away - home`, positive when the away
/// team won by that margin. Equal scores are a tie, and a predicted winner
/// is never correct on a tie.
pub fn grade_prediction(
    prediction: &PredictionRecord,
    home_team: &str,
    away_team: &str,
    score: &FinalScore,
) -> AccuracyRecord {
    let actual_winner = if score.home > score.away {
        Some(home_team)
    } else if score.away > score.home {
        Some(away_team)
    } else {
        None // tie
    };

    let winner_correct = match (&prediction.predicted_winner, actual_winner) {
        (Some(predicted), Some(actual)) => predicted == actual,
        _ => false,
    };

    let actual_spread = score.away as f64 - score.home as f64;
    let spread_correct = prediction
        .predicted_spread
        .map(|predicted| (actual_spread - predicted).abs() <= SPREAD_TOLERANCE)
        .unwrap_or(false);

    let actual_total = (score.away + score.home) as f64;
    let total_correct = prediction
        .predicted_total
        .map(|predicted| (actual_total - predicted).abs() <= TOTAL_TOLERANCE)
        .unwrap_or(false);

    let correct_count = [winner_correct, spread_correct, total_correct]
        .iter()
        .filter(|c| **c)
        .count();
    let accuracy_percentage = ((correct_count as f64 / 3.0) * 100.0).round() as u8;

    let partial = prediction.predicted_winner.is_none()
        || prediction.predicted_spread.is_none()
        || prediction.predicted_total.is_none();

    AccuracyRecord {
        winner_correct,
        spread_correct,
        total_correct,
        accuracy_percentage,
        grade: Grade::from_percentage(accuracy_percentage),
        partial,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prediction(winner: &str, spread: f64, total: f64) -> PredictionRecord {
        PredictionRecord {
            predicted_winner: Some(winner.to_string()),
            predicted_spread: Some(spread),
            predicted_total: Some(total),
            spread_confidence: Some(70),
            total_confidence: Some(60),
        }
    }

    #[test]
    fn test_perfect_prediction() {
        // Home wins 27-20: actual spread -7, actual total 47
        let pred = prediction("Chiefs", -6.0, 45.0);
        let score = FinalScore { home: 27, away: 20 };
        let rec = grade_prediction(&pred, "Chiefs", "Bills", &score);

        assert!(rec.winner_correct);
        assert!(rec.spread_correct); // |-7 - (-6)| = 1
        assert!(rec.total_correct); // |47 - 45| = 2
        assert_eq!(rec.accuracy_percentage, 100);
        assert_eq!(rec.grade, Grade::A);
        assert!(!rec.partial);
    }

    #[test]
    fn test_spread_outside_tolerance() {
        // Home favored by 3.5, final 27-20 home: actual spread (away-home)
        // is -7, off by 3.5, outside the 3-point band
        let pred = prediction("Chiefs", -3.5, 51.0);
        let score = FinalScore { home: 27, away: 20 };
        let rec = grade_prediction(&pred, "Chiefs", "Bills", &score);

        assert!(rec.winner_correct);
        assert!(!rec.spread_correct);
        assert!(!rec.total_correct); // |47 - 51| = 4
    }

    #[test]
    fn test_total_boundary_is_inclusive() {
        let pred = prediction("Chiefs", -7.0, 45.0);
        let score = FinalScore { home: 28, away: 20 }; // total 48
        let rec = grade_prediction(&pred, "Chiefs", "Bills", &score);
        assert!(rec.total_correct); // |48 - 45| = 3, boundary counts
    }

    #[test]
    fn test_accuracy_percentages_are_quantized() {
        let score = FinalScore { home: 27, away: 20 };

        let all_wrong = grade_prediction(&prediction("Bills", 10.0, 90.0), "Chiefs", "Bills", &score);
        assert_eq!(all_wrong.accuracy_percentage, 0);
        assert_eq!(all_wrong.grade, Grade::F);

        let one_right = grade_prediction(&prediction("Chiefs", 10.0, 90.0), "Chiefs", "Bills", &score);
        assert_eq!(one_right.accuracy_percentage, 33);
        assert_eq!(one_right.grade, Grade::F);

        let two_right = grade_prediction(&prediction("Chiefs", -6.0, 90.0), "Chiefs", "Bills", &score);
        assert_eq!(two_right.accuracy_percentage, 67);
        assert_eq!(two_right.grade, Grade::C);

        let all_right = grade_prediction(&prediction("Chiefs", -6.0, 47.0), "Chiefs", "Bills", &score);
        assert_eq!(all_right.accuracy_percentage, 100);
        assert_eq!(all_right.grade, Grade::A);
    }

    #[test]
    fn test_missing_fields_grade_incorrect_and_flag_partial() {
        let pred = PredictionRecord {
            predicted_winner: Some("Chiefs".to_string()),
            ..Default::default()
        };
        let score = FinalScore { home: 27, away: 20 };
        let rec = grade_prediction(&pred, "Chiefs", "Bills", &score);

        assert!(rec.winner_correct);
        assert!(!rec.spread_correct);
        assert!(!rec.total_correct);
        assert_eq!(rec.accuracy_percentage, 33);
        assert!(rec.partial);
    }

    #[test]
    fn test_tie_score_never_awards_the_winner_component() {
        let pred = prediction("Chiefs", 0.0, 40.0);
        let score = FinalScore { home: 20, away: 20 };
        let rec = grade_prediction(&pred, "Chiefs", "Bills", &score);

        assert!(!rec.winner_correct);
        assert!(rec.spread_correct); // actual spread 0
        assert!(rec.total_correct); // actual total 40
        assert_eq!(rec.accuracy_percentage, 67);
    }
}
