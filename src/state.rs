use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::models::{AccuracyRecord, FinalScore};
use crate::utils::ev_analysis::ValueOpportunity;

/// Which analysis produced a stored result for an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisKind {
    Game,
    Props,
}

/// One analysis run's output for one event
#[derive(Debug, Clone, Serialize)]
pub struct StoredAnalysis {
    pub opportunities: Vec<ValueOpportunity>,
    /// Carried through from the normalizer so consumers can tell an empty
    /// market from a payload that failed to parse
    pub malformed_source: bool,
    pub generated_at: DateTime<Utc>,
}

/// Explicit mapping from (event id, analysis kind) to the latest analysis.
/// A new run for the same key supersedes the old one wholesale.
#[derive(Debug, Default)]
pub struct AnalysisStore {
    entries: BTreeMap<(String, AnalysisKind), StoredAnalysis>,
}

impl AnalysisStore {
    pub fn put(&mut self, event_id: &str, kind: AnalysisKind, analysis: StoredAnalysis) {
        self.entries.insert((event_id.to_string(), kind), analysis);
    }

    pub fn get(&self, event_id: &str, kind: AnalysisKind) -> Option<&StoredAnalysis> {
        self.entries.get(&(event_id.to_string(), kind))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&(String, AnalysisKind), &StoredAnalysis)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A graded game: the entered score plus the derived accuracy record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradedResult {
    pub home_team: String,
    pub away_team: String,
    pub score: FinalScore,
    pub accuracy: AccuracyRecord,
    pub graded_at: DateTime<Utc>,
}

/// Aggregate view over every graded game
#[derive(Debug, Clone, Copy, Serialize)]
pub struct LedgerSummary {
    pub graded: usize,
    pub winner_hits: usize,
    pub spread_hits: usize,
    pub total_hits: usize,
    pub mean_accuracy: f64,
}

/// Graded results keyed by event id. Each game is graded at most once;
/// a second grade without an explicit regrade would double-count in the
/// aggregate statistics.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct AccuracyLedger {
    games: BTreeMap<String, GradedResult>,
}

impl AccuracyLedger {
    pub fn record(&mut self, event_id: &str, result: GradedResult) -> Result<(), EngineError> {
        if self.games.contains_key(event_id) {
            return Err(EngineError::AlreadyGraded {
                event_id: event_id.to_string(),
            });
        }
        self.games.insert(event_id.to_string(), result);
        Ok(())
    }

    /// Explicit correction path: replaces any stored result wholesale
    pub fn regrade(&mut self, event_id: &str, result: GradedResult) {
        self.games.insert(event_id.to_string(), result);
    }

    pub fn get(&self, event_id: &str) -> Option<&GradedResult> {
        self.games.get(event_id)
    }

    pub fn is_graded(&self, event_id: &str) -> bool {
        self.games.contains_key(event_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &GradedResult)> {
        self.games.iter()
    }

    pub fn len(&self) -> usize {
        self.games.len()
    }

    pub fn is_empty(&self) -> bool {
        self.games.is_empty()
    }

    pub fn summary(&self) -> LedgerSummary {
        let graded = self.games.len();
        let winner_hits = self.games.values().filter(|g| g.accuracy.winner_correct).count();
        let spread_hits = self.games.values().filter(|g| g.accuracy.spread_correct).count();
        let total_hits = self.games.values().filter(|g| g.accuracy.total_correct).count();
        let mean_accuracy = if graded == 0 {
            0.0
        } else {
            self.games
                .values()
                .map(|g| g.accuracy.accuracy_percentage as f64)
                .sum::<f64>()
                / graded as f64
        };

        LedgerSummary {
            graded,
            winner_hits,
            spread_hits,
            total_hits,
            mean_accuracy,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Grade, PredictionRecord};
    use crate::utils::grader::grade_prediction;

    fn graded(home: u32, away: u32) -> GradedResult {
        let prediction = PredictionRecord {
            predicted_winner: Some("Chiefs".to_string()),
            predicted_spread: Some(-6.0),
            predicted_total: Some(45.0),
            ..Default::default()
        };
        let score = FinalScore { home, away };
        GradedResult {
            home_team: "Chiefs".to_string(),
            away_team: "Bills".to_string(),
            score,
            accuracy: grade_prediction(&prediction, "Chiefs", "Bills", &score),
            graded_at: Utc::now(),
        }
    }

    #[test]
    fn test_ledger_grades_at_most_once() {
        let mut ledger = AccuracyLedger::default();
        ledger.record("evt1", graded(27, 20)).unwrap();

        let err = ledger.record("evt1", graded(30, 10)).unwrap_err();
        assert_eq!(
            err,
            EngineError::AlreadyGraded {
                event_id: "evt1".to_string()
            }
        );
        // Original result untouched
        assert_eq!(ledger.get("evt1").unwrap().score.home, 27);
    }

    #[test]
    fn test_regrade_is_the_explicit_override() {
        let mut ledger = AccuracyLedger::default();
        ledger.record("evt1", graded(27, 20)).unwrap();
        ledger.regrade("evt1", graded(30, 10));
        assert_eq!(ledger.get("evt1").unwrap().score.home, 30);
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_summary_aggregates() {
        let mut ledger = AccuracyLedger::default();
        assert_eq!(ledger.summary().graded, 0);
        assert_eq!(ledger.summary().mean_accuracy, 0.0);

        // 27-20: all three components correct (spread -7 within 3 of -6,
        // total 47 within 3 of 45)
        ledger.record("evt1", graded(27, 20)).unwrap();
        // 10-24: away won, nothing close
        ledger.record("evt2", graded(10, 24)).unwrap();

        let summary = ledger.summary();
        assert_eq!(summary.graded, 2);
        assert_eq!(summary.winner_hits, 1);
        assert_eq!(summary.spread_hits, 1);
        assert_eq!(summary.total_hits, 1);
        assert!((summary.mean_accuracy - 50.0).abs() < 1e-9);
        assert_eq!(ledger.get("evt1").unwrap().accuracy.grade, Grade::A);
    }

    #[test]
    fn test_analysis_store_last_write_wins() {
        let mut store = AnalysisStore::default();
        let old = StoredAnalysis {
            opportunities: Vec::new(),
            malformed_source: true,
            generated_at: Utc::now(),
        };
        let new = StoredAnalysis {
            opportunities: Vec::new(),
            malformed_source: false,
            generated_at: Utc::now(),
        };

        store.put("evt1", AnalysisKind::Game, old);
        store.put("evt1", AnalysisKind::Game, new);
        assert_eq!(store.len(), 1);
        assert!(!store.get("evt1", AnalysisKind::Game).unwrap().malformed_source);
        assert!(store.get("evt1", AnalysisKind::Props).is_none());
    }
}
