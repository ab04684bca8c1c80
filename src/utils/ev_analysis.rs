use std::cmp::Ordering;
use std::fmt;

use serde::Serialize;

use crate::error::EngineError;
use crate::utils::normalizer::{format_market_name, BookPrices, NormalizedBoard};
use crate::utils::odds::{american_odds_to_probability, calculate_expected_value};

/// Minimum edge (in percentage points) for a negative-EV outcome to be
/// flagged as a market discrepancy. Exclusive boundary: an edge of exactly
/// 3.0 stays Neutral.
pub const DISCREPANCY_EDGE_THRESHOLD: f64 = 3.0;

/// One book's price for the outcome under evaluation
#[derive(Debug, Clone)]
pub struct BookQuote {
    pub book: String,
    pub price: i32,
}

/// Trend classification for a value opportunity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TrendLabel {
    #[serde(rename = "Strong Value Bet")]
    StrongValueBet,
    #[serde(rename = "Lean Value")]
    LeanValue,
    #[serde(rename = "Market Discrepancy")]
    MarketDiscrepancy,
    #[serde(rename = "Neutral")]
    Neutral,
}

impl fmt::Display for TrendLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::StrongValueBet => "Strong Value Bet",
            Self::LeanValue => "Lean Value",
            Self::MarketDiscrepancy => "Market Discrepancy",
            Self::Neutral => "Neutral",
        };
        write!(f, "{}", s)
    }
}

/// A ranked betting opportunity for one outcome, aggregated across books.
/// Ephemeral: recomputed on every analysis run, never persisted verbatim.
#[derive(Debug, Clone, Serialize)]
pub struct ValueOpportunity {
    pub entity: String,
    pub prop_description: String,
    pub best_book: String,
    pub best_american_odds: i32,
    /// Mean of per-book implied probabilities (vig left in, matching the
    /// source behavior)
    pub consensus_prob: f64,
    pub ev_percent: f64,
    pub edge_percent: f64,
    /// Number of books quoting this outcome; always >= 1
    pub confidence: usize,
    pub trend: TrendLabel,
}

impl ValueOpportunity {
    /// Format the opportunity as a readable string. Percentages round to
    /// one decimal place here and only here; the stored figures stay
    /// unrounded.
    pub fn format(&self) -> String {
        format!(
            "{} {} | Best: {:+} on {} | EV: {:+.1}% | Edge: {:+.1}% | {} books | {}",
            self.entity,
            self.prop_description,
            self.best_american_odds,
            self.best_book,
            self.ev_percent,
            self.edge_percent,
            self.confidence,
            self.trend
        )
    }
}

/// Classify an opportunity from its unrounded EV and edge figures
pub fn classify(ev_percent: f64, edge_percent: f64) -> TrendLabel {
    if ev_percent > 5.0 {
        TrendLabel::StrongValueBet
    } else if ev_percent > 0.0 {
        TrendLabel::LeanValue
    } else if edge_percent > DISCREPANCY_EDGE_THRESHOLD {
        TrendLabel::MarketDiscrepancy
    } else {
        TrendLabel::Neutral
    }
}

/// Aggregate one outcome's book quotes into a value opportunity.
///
/// Consensus probability is the unweighted mean of per-book implied
/// probabilities; the payout basis is the single best (highest) American
/// price on offer. Zero quotes is a contract violation, not a "no data"
/// state: an EV figure with no consensus behind it must not exist.
pub fn evaluate_outcome(
    entity: &str,
    description: &str,
    quotes: &[BookQuote],
) -> Result<ValueOpportunity, EngineError> {
    let Some(best) = quotes.iter().max_by_key(|q| q.price) else {
        return Err(EngineError::NoQuotes {
            outcome: entity.to_string(),
        });
    };

    let consensus_prob = quotes
        .iter()
        .map(|q| american_odds_to_probability(q.price))
        .sum::<f64>()
        / quotes.len() as f64;

    let ev_percent = calculate_expected_value(consensus_prob, best.price) * 100.0;
    let edge_percent = (consensus_prob - american_odds_to_probability(best.price)) * 100.0;

    Ok(ValueOpportunity {
        entity: entity.to_string(),
        prop_description: description.to_string(),
        best_book: best.book.clone(),
        best_american_odds: best.price,
        consensus_prob,
        ev_percent,
        edge_percent,
        confidence: quotes.len(),
        trend: classify(ev_percent, edge_percent),
    })
}

/// Display ordering: EV descending, then edge descending, then book count
/// descending (more books, more trustworthy consensus)
pub fn compare_opportunities(a: &ValueOpportunity, b: &ValueOpportunity) -> Ordering {
    b.ev_percent
        .partial_cmp(&a.ev_percent)
        .unwrap_or(Ordering::Equal)
        .then_with(|| {
            b.edge_percent
                .partial_cmp(&a.edge_percent)
                .unwrap_or(Ordering::Equal)
        })
        .then_with(|| b.confidence.cmp(&a.confidence))
}

pub fn rank_opportunities(opportunities: &mut [ValueOpportunity]) {
    opportunities.sort_by(|a, b| compare_opportunities(a, b));
}

fn book_quotes(books: &BookPrices) -> Vec<BookQuote> {
    books
        .iter()
        .map(|(book, price)| BookQuote {
            book: book.clone(),
            price: *price,
        })
        .collect()
}

fn sided_quotes<'a>(
    books: impl Iterator<Item = (&'a String, Option<i32>)>,
) -> Vec<BookQuote> {
    books
        .filter_map(|(book, price)| {
            price.map(|p| BookQuote {
                book: book.clone(),
                price: p,
            })
        })
        .collect()
}

/// Evaluate every outcome on a normalized board and return the ranked list
/// of opportunities. Outcomes nobody quotes simply do not appear; the
/// zero-quote error cannot fire from a populated table.
pub fn analyze_board(board: &NormalizedBoard) -> Vec<ValueOpportunity> {
    let mut opportunities = Vec::new();

    for (outcome, books) in &board.moneylines {
        let quotes = book_quotes(books);
        if let Ok(op) = evaluate_outcome(outcome, "Moneyline", &quotes) {
            opportunities.push(op);
        }
    }

    for (team, lines) in &board.spreads {
        for (line, books) in lines {
            let quotes = book_quotes(books);
            let description = format!("Spread {:+}", line.value());
            if let Ok(op) = evaluate_outcome(team, &description, &quotes) {
                opportunities.push(op);
            }
        }
    }

    for (line, books) in &board.totals {
        let overs = sided_quotes(books.iter().map(|(b, s)| (b, s.over)));
        if let Ok(op) = evaluate_outcome("Over", &format!("Total {}", line), &overs) {
            opportunities.push(op);
        }
        let unders = sided_quotes(books.iter().map(|(b, s)| (b, s.under)));
        if let Ok(op) = evaluate_outcome("Under", &format!("Total {}", line), &unders) {
            opportunities.push(op);
        }
    }

    for (entity, markets) in &board.props {
        for (market, lines) in markets {
            for (line, books) in lines {
                let title = format_market_name(market);
                let overs = sided_quotes(books.iter().map(|(b, s)| (b, s.over)));
                if let Ok(op) =
                    evaluate_outcome(entity, &format!("{} Over {}", title, line), &overs)
                {
                    opportunities.push(op);
                }
                let unders = sided_quotes(books.iter().map(|(b, s)| (b, s.under)));
                if let Ok(op) =
                    evaluate_outcome(entity, &format!("{} Under {}", title, line), &unders)
                {
                    opportunities.push(op);
                }
            }
        }
    }

    rank_opportunities(&mut opportunities);
    opportunities
}
