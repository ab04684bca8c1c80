use chrono::{DateTime, Utc};
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::fmt;

/// An upcoming or completed game as reported by the odds aggregator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameEvent {
    pub id: String,
    pub sport_title: String,
    pub home_team: String,
    pub away_team: String,
    pub commence_time: DateTime<Utc>,
}

/// Market shape, dispatched explicitly in the normalizer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketKind {
    Moneyline,
    Spread,
    Total,
    PlayerProp,
    TeamProp,
}

impl MarketKind {
    /// Map an aggregator market key to its shape. Unknown keys are not an
    /// error; the caller skips markets it does not understand.
    pub fn from_market_key(key: &str) -> Option<Self> {
        match key {
            "h2h" => Some(Self::Moneyline),
            "spreads" => Some(Self::Spread),
            "totals" => Some(Self::Total),
            k if k.starts_with("player_") || k.starts_with("batter_") || k.starts_with("pitcher_") => {
                Some(Self::PlayerProp)
            }
            k if k.starts_with("team_") => Some(Self::TeamProp),
            _ => None,
        }
    }
}

/// A spread/total/prop line usable as an ordered map key
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Line(OrderedFloat<f64>);

impl Line {
    pub fn new(value: f64) -> Self {
        Self(OrderedFloat(value))
    }

    pub fn value(&self) -> f64 {
        self.0.into_inner()
    }
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.into_inner())
    }
}

/// One sportsbook's price for one outcome of one market on one event.
/// Produced fresh on each fetch and superseded wholesale on the next;
/// never patched in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketQuote {
    pub book: String,
    pub kind: MarketKind,
    pub market: String,         // raw aggregator market key, e.g. "player_pass_tds"
    pub outcome: String,        // team name, or "Over"/"Under"
    pub entity: Option<String>, // player/team a prop references
    pub line: Option<f64>,      // None for moneyline
    pub price: i32,             // American odds (e.g. -110, +150)
}

/// Over/Under prices for one (entity, market, line, book) cell.
/// A missing side stays `None` and renders as the `–` sentinel; it is
/// never treated as a price of zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteSides {
    pub over: Option<i32>,
    pub under: Option<i32>,
}

/// Format a one-sided price for display, `–` when the book never quoted it
pub fn format_price(price: Option<i32>) -> String {
    match price {
        Some(p) => format!("{:+}", p),
        None => "–".to_string(),
    }
}

/// A stored prediction for a game. Fields are optional because partial
/// predictions are a legitimate historical state; the grader treats a
/// missing field as an incorrect component, never as an error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub predicted_winner: Option<String>,
    pub predicted_spread: Option<f64>, // away - home convention
    pub predicted_total: Option<f64>,
    pub spread_confidence: Option<u8>, // 0-100
    pub total_confidence: Option<u8>,  // 0-100
}

/// Actual final score entered when a game completes
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FinalScore {
    pub home: u32,
    pub away: u32,
}

/// Letter grade for a graded prediction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Grade {
    A,
    B,
    C,
    D,
    F,
}

impl Grade {
    /// Fixed thresholds; not configurable
    pub fn from_percentage(pct: u8) -> Self {
        match pct {
            90..=u8::MAX => Self::A,
            75..=89 => Self::B,
            60..=74 => Self::C,
            50..=59 => Self::D,
            _ => Self::F,
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
            Self::D => "D",
            Self::F => "F",
        };
        write!(f, "{}", s)
    }
}

/// Result of grading one prediction against an actual final score.
/// Created once per game at score entry; derived deterministically.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AccuracyRecord {
    pub winner_correct: bool,
    pub spread_correct: bool,
    pub total_correct: bool,
    pub accuracy_percentage: u8, // one of 0, 33, 67, 100
    pub grade: Grade,
    /// Set when one or more prediction fields were absent and graded
    /// as incorrect
    pub partial: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grade_thresholds() {
        assert_eq!(Grade::from_percentage(100), Grade::A);
        assert_eq!(Grade::from_percentage(90), Grade::A);
        assert_eq!(Grade::from_percentage(89), Grade::B);
        assert_eq!(Grade::from_percentage(75), Grade::B);
        assert_eq!(Grade::from_percentage(67), Grade::C);
        assert_eq!(Grade::from_percentage(60), Grade::C);
        assert_eq!(Grade::from_percentage(50), Grade::D);
        assert_eq!(Grade::from_percentage(33), Grade::F);
        assert_eq!(Grade::from_percentage(0), Grade::F);
    }

    #[test]
    fn test_market_kind_from_key() {
        assert_eq!(MarketKind::from_market_key("h2h"), Some(MarketKind::Moneyline));
        assert_eq!(MarketKind::from_market_key("spreads"), Some(MarketKind::Spread));
        assert_eq!(MarketKind::from_market_key("totals"), Some(MarketKind::Total));
        assert_eq!(
            MarketKind::from_market_key("player_pass_tds"),
            Some(MarketKind::PlayerProp)
        );
        assert_eq!(
            MarketKind::from_market_key("team_totals"),
            Some(MarketKind::TeamProp)
        );
        assert_eq!(MarketKind::from_market_key("alternate_lines"), None);
    }

    #[test]
    fn test_format_price_sentinel() {
        assert_eq!(format_price(Some(150)), "+150");
        assert_eq!(format_price(Some(-110)), "-110");
        assert_eq!(format_price(None), "–");
    }

    #[test]
    fn test_line_ordering() {
        let mut lines = vec![Line::new(48.5), Line::new(-3.5), Line::new(44.0)];
        lines.sort();
        assert_eq!(lines[0], Line::new(-3.5));
        assert_eq!(lines[2], Line::new(48.5));
    }
}
