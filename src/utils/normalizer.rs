use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::models::{format_price, Line, MarketKind, MarketQuote, QuoteSides};
use crate::utils::odds::is_valid_american;

/// book -> price, for single-sided markets (moneyline, spreads)
pub type BookPrices = BTreeMap<String, i32>;

/// book -> {over, under}, for two-sided markets (totals, props)
pub type SidedBookPrices = BTreeMap<String, QuoteSides>;

/// Uniform lookup structure built from one event's raw bookmaker payload.
/// Rebuilt wholesale on every refresh; consumers only read. All tables are
/// ordered maps so that normalizing the same payload twice produces an
/// identical board.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedBoard {
    /// outcome -> book -> price
    pub moneylines: BTreeMap<String, BookPrices>,
    /// team -> line -> book -> price. Two different points for the same
    /// team are distinct rows, never merged.
    pub spreads: BTreeMap<String, BTreeMap<Line, BookPrices>>,
    /// line -> book -> sides. An Over and Under sharing a point pair into
    /// one row.
    pub totals: BTreeMap<Line, SidedBookPrices>,
    /// entity -> market -> line -> book -> sides
    pub props: BTreeMap<String, BTreeMap<String, BTreeMap<Line, SidedBookPrices>>>,
    /// Set when the payload, or an entry inside it, did not match the
    /// expected shape. Whatever normalized cleanly is still in the tables;
    /// the flag lets a caller tell "no data yet" from "garbage payload"
    /// without an error path.
    pub malformed: bool,
}

impl NormalizedBoard {
    pub fn is_empty(&self) -> bool {
        self.moneylines.is_empty()
            && self.spreads.is_empty()
            && self.totals.is_empty()
            && self.props.is_empty()
    }

    /// Flatten the props table into display rows, one per (entity, market,
    /// line, book) cell, sorted by entity then market. Missing sides render
    /// as the `–` sentinel.
    pub fn prop_rows(&self) -> Vec<PropRow> {
        let mut rows = Vec::new();
        for (entity, markets) in &self.props {
            for (market, lines) in markets {
                for (line, books) in lines {
                    for (book, sides) in books {
                        rows.push(PropRow {
                            entity: entity.clone(),
                            market: format_market_name(market),
                            line: line.value(),
                            book: book.clone(),
                            over: format_price(sides.over),
                            under: format_price(sides.under),
                        });
                    }
                }
            }
        }
        rows
    }
}

/// One display row of the props table
#[derive(Debug, Clone, Serialize)]
pub struct PropRow {
    pub entity: String,
    pub market: String,
    pub line: f64,
    pub book: String,
    pub over: String,
    pub under: String,
}

/// Turn a market key into a readable title, e.g. "player_pass_tds" -> "Pass Tds"
pub fn format_market_name(key: &str) -> String {
    key.trim_start_matches("player_")
        .split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Build a normalized board from one event's raw payload (the aggregator's
/// event object with its `bookmakers` array). Malformed input yields an
/// empty board with the diagnostic flag set rather than an error, so a
/// caller can always render a "no data" state.
pub fn normalize_board(payload: &Value) -> NormalizedBoard {
    let mut board = NormalizedBoard::default();

    let Some(bookmakers) = payload.get("bookmakers").and_then(Value::as_array) else {
        board.malformed = true;
        return board;
    };

    for bookmaker in bookmakers {
        let Some(book) = bookmaker.get("key").and_then(Value::as_str) else {
            board.malformed = true;
            continue;
        };
        let Some(markets) = bookmaker.get("markets").and_then(Value::as_array) else {
            board.malformed = true;
            continue;
        };

        for market in markets {
            let Some(market_key) = market.get("key").and_then(Value::as_str) else {
                board.malformed = true;
                continue;
            };
            // Market types we do not model are skipped, not flagged
            let Some(kind) = MarketKind::from_market_key(market_key) else {
                continue;
            };
            let Some(outcomes) = market.get("outcomes").and_then(Value::as_array) else {
                board.malformed = true;
                continue;
            };

            for outcome in outcomes {
                if let Some(quote) = extract_quote(book, kind, market_key, outcome) {
                    board.insert(quote);
                }
            }
        }
    }

    board
}

/// Pull one validated quote out of a raw outcome object. Quotes with a
/// missing or non-numeric price, a price inside (-100, 100), or a missing
/// line/entity where the market shape requires one are dropped.
fn extract_quote(book: &str, kind: MarketKind, market_key: &str, outcome: &Value) -> Option<MarketQuote> {
    let name = outcome.get("name").and_then(Value::as_str)?;
    let price = outcome.get("price").and_then(Value::as_f64)? as i32;
    if !is_valid_american(price) {
        return None;
    }
    let line = outcome.get("point").and_then(Value::as_f64);
    let entity = outcome
        .get("description")
        .and_then(Value::as_str)
        .map(str::to_string);

    match kind {
        MarketKind::Moneyline => {}
        MarketKind::Spread | MarketKind::Total => {
            line?;
        }
        MarketKind::PlayerProp | MarketKind::TeamProp => {
            line?;
            entity.as_ref()?;
        }
    }

    Some(MarketQuote {
        book: book.to_string(),
        kind,
        market: market_key.to_string(),
        outcome: name.to_string(),
        entity,
        line,
        price,
    })
}

impl NormalizedBoard {
    fn insert(&mut self, quote: MarketQuote) {
        match quote.kind {
            MarketKind::Moneyline => {
                self.moneylines
                    .entry(quote.outcome)
                    .or_default()
                    .insert(quote.book, quote.price);
            }
            MarketKind::Spread => {
                // line presence was checked at extraction
                let Some(line) = quote.line else { return };
                self.spreads
                    .entry(quote.outcome)
                    .or_default()
                    .entry(Line::new(line))
                    .or_default()
                    .insert(quote.book, quote.price);
            }
            MarketKind::Total => {
                let Some(line) = quote.line else { return };
                let sides = self
                    .totals
                    .entry(Line::new(line))
                    .or_default()
                    .entry(quote.book)
                    .or_default();
                set_side(sides, &quote.outcome, quote.price);
            }
            MarketKind::PlayerProp | MarketKind::TeamProp => {
                let (Some(line), Some(entity)) = (quote.line, quote.entity) else {
                    return;
                };
                let sides = self
                    .props
                    .entry(entity)
                    .or_default()
                    .entry(quote.market)
                    .or_default()
                    .entry(Line::new(line))
                    .or_default()
                    .entry(quote.book)
                    .or_default();
                set_side(sides, &quote.outcome, quote.price);
            }
        }
    }
}

/// At most one Over and one Under per book for a given row; a repeated
/// side in the same payload is last-write-wins. Labels other than
/// Over/Under are discarded.
fn set_side(sides: &mut QuoteSides, outcome: &str, price: i32) {
    match outcome {
        "Over" => sides.over = Some(price),
        "Under" => sides.under = Some(price),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_payload() -> Value {
        json!({
            "id": "evt1",
            "home_team": "Kansas City Chiefs",
            "away_team": "Buffalo Bills",
            "bookmakers": [
                {
                    "key": "draftkings",
                    "markets": [
                        {
                            "key": "h2h",
                            "outcomes": [
                                { "name": "Kansas City Chiefs", "price": -150 },
                                { "name": "Buffalo Bills", "price": 130 }
                            ]
                        },
                        {
                            "key": "spreads",
                            "outcomes": [
                                { "name": "Kansas City Chiefs", "price": -110, "point": -3.5 },
                                { "name": "Buffalo Bills", "price": -110, "point": 3.5 }
                            ]
                        },
                        {
                            "key": "totals",
                            "outcomes": [
                                { "name": "Over", "price": -105, "point": 47.5 },
                                { "name": "Under", "price": -115, "point": 47.5 }
                            ]
                        },
                        {
                            "key": "player_pass_tds",
                            "outcomes": [
                                { "name": "Over", "price": 120, "point": 1.5, "description": "Patrick Mahomes" },
                                { "name": "Under", "price": -140, "point": 1.5, "description": "Patrick Mahomes" }
                            ]
                        }
                    ]
                },
                {
                    "key": "fanduel",
                    "markets": [
                        {
                            "key": "h2h",
                            "outcomes": [
                                { "name": "Kansas City Chiefs", "price": -145 },
                                { "name": "Buffalo Bills", "price": 125 }
                            ]
                        },
                        {
                            "key": "totals",
                            "outcomes": [
                                { "name": "Over", "price": -110, "point": 48.0 }
                            ]
                        }
                    ]
                }
            ]
        })
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let payload = sample_payload();
        let first = normalize_board(&payload);
        let second = normalize_board(&payload);
        assert_eq!(first, second);
        assert!(!first.malformed);
    }

    #[test]
    fn test_moneylines_group_by_outcome() {
        let board = normalize_board(&sample_payload());
        let chiefs = &board.moneylines["Kansas City Chiefs"];
        assert_eq!(chiefs["draftkings"], -150);
        assert_eq!(chiefs["fanduel"], -145);
        assert_eq!(board.moneylines["Buffalo Bills"].len(), 2);
    }

    #[test]
    fn test_totals_pair_over_and_under_on_same_point() {
        let board = normalize_board(&sample_payload());
        let row = &board.totals[&Line::new(47.5)];
        assert_eq!(row["draftkings"].over, Some(-105));
        assert_eq!(row["draftkings"].under, Some(-115));

        // FanDuel only quoted the Over at 48.0; the Under side stays empty
        let half = &board.totals[&Line::new(48.0)];
        assert_eq!(half["fanduel"].over, Some(-110));
        assert_eq!(half["fanduel"].under, None);
    }

    #[test]
    fn test_distinct_points_are_distinct_rows() {
        let payload = json!({
            "bookmakers": [{
                "key": "draftkings",
                "markets": [{
                    "key": "spreads",
                    "outcomes": [
                        { "name": "Kansas City Chiefs", "price": -110, "point": -3.5 },
                        { "name": "Kansas City Chiefs", "price": 105, "point": -4.5 }
                    ]
                }]
            }]
        });
        let board = normalize_board(&payload);
        let chiefs = &board.spreads["Kansas City Chiefs"];
        assert_eq!(chiefs.len(), 2);
        assert_eq!(chiefs[&Line::new(-3.5)]["draftkings"], -110);
        assert_eq!(chiefs[&Line::new(-4.5)]["draftkings"], 105);
    }

    #[test]
    fn test_props_keyed_by_entity_market_line() {
        let board = normalize_board(&sample_payload());
        let mahomes = &board.props["Patrick Mahomes"]["player_pass_tds"][&Line::new(1.5)];
        assert_eq!(mahomes["draftkings"].over, Some(120));
        assert_eq!(mahomes["draftkings"].under, Some(-140));

        let rows = board.prop_rows();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].market, "Pass Tds");
        assert_eq!(rows[0].over, "+120");
    }

    #[test]
    fn test_malformed_payload_yields_empty_flagged_board() {
        for payload in [json!(42), json!([1, 2, 3]), json!({"games": []})] {
            let board = normalize_board(&payload);
            assert!(board.malformed);
            assert!(board.is_empty());
        }

        // A bad bookmaker entry flags the board without discarding the rest
        let payload = json!({
            "bookmakers": [
                { "key": "draftkings", "markets": "not-an-array" },
                {
                    "key": "fanduel",
                    "markets": [{
                        "key": "h2h",
                        "outcomes": [{ "name": "Buffalo Bills", "price": 125 }]
                    }]
                }
            ]
        });
        let board = normalize_board(&payload);
        assert!(board.malformed);
        assert_eq!(board.moneylines["Buffalo Bills"]["fanduel"], 125);
    }

    #[test]
    fn test_bad_quotes_are_dropped_not_zeroed() {
        let payload = json!({
            "bookmakers": [{
                "key": "draftkings",
                "markets": [{
                    "key": "h2h",
                    "outcomes": [
                        { "name": "Kansas City Chiefs" },
                        { "name": "Buffalo Bills", "price": "unavailable" },
                        { "name": "Denver Broncos", "price": -50 },
                        { "name": "New York Jets", "price": 240 }
                    ]
                }]
            }]
        });
        let board = normalize_board(&payload);
        assert!(!board.malformed);
        assert_eq!(board.moneylines.len(), 1);
        assert_eq!(board.moneylines["New York Jets"]["draftkings"], 240);
    }

    #[test]
    fn test_absent_market_type_is_empty_not_error() {
        let payload = json!({
            "bookmakers": [{
                "key": "draftkings",
                "markets": [{
                    "key": "h2h",
                    "outcomes": [{ "name": "Buffalo Bills", "price": 125 }]
                }]
            }]
        });
        let board = normalize_board(&payload);
        assert!(board.spreads.is_empty());
        assert!(board.totals.is_empty());
        assert!(board.props.is_empty());
        assert!(!board.malformed);
    }

    #[test]
    fn test_unmodeled_market_is_skipped_silently() {
        let payload = json!({
            "bookmakers": [{
                "key": "draftkings",
                "markets": [{
                    "key": "alternate_spreads_corners",
                    "outcomes": [{ "name": "Whatever", "price": -110, "point": 1.0 }]
                }]
            }]
        });
        let board = normalize_board(&payload);
        assert!(board.is_empty());
        assert!(!board.malformed);
    }
}
