use thiserror::Error;

/// Hard failures from the scoring engine.
///
/// Empty-data states (no odds yet, ungraded game, missing prediction fields)
/// are never errors; the normalizer recovers from malformed payloads with a
/// diagnostic flag and the grader degrades missing fields to "incorrect".
/// Only contract violations surface here.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    /// Expected value over zero books is meaningless; refusing beats
    /// silently reporting 0% with no consensus behind it.
    #[error("no sportsbook quotes for outcome `{outcome}`")]
    NoQuotes { outcome: String },

    /// A game may only be graded once; re-grading would double-count in
    /// aggregate accuracy statistics. Use `AccuracyLedger::regrade` to
    /// correct a score deliberately.
    #[error("game `{event_id}` has already been graded")]
    AlreadyGraded { event_id: String },
}
