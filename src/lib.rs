pub mod api;
pub mod error;
pub mod models;
pub mod state;
pub mod utils;

pub use api::*;
pub use error::*;
pub use models::*;
pub use state::*;
pub use utils::*;

use anyhow::{Context, Result};
use std::path::Path;

use api::odds_api::{OddsApiClient, Sport};
use models::GameEvent;
use utils::data::{load_odds_from_cache, save_odds_to_cache};
use utils::ev_analysis::{analyze_board, ValueOpportunity};
use utils::normalizer::{normalize_board, NormalizedBoard};

/// One event's normalized market board and its ranked opportunities
#[derive(Debug, Clone)]
pub struct GameBoard {
    pub event: GameEvent,
    pub board: NormalizedBoard,
    pub opportunities: Vec<ValueOpportunity>,
}

/// All analyzed games for one sport
#[derive(Debug, Clone)]
pub struct SportAnalysis {
    pub sport: Sport,
    pub games: Vec<GameBoard>,
}

/// Cache file for one sport's raw odds payloads
pub fn sport_cache_file(sport: Sport) -> String {
    format!("cache/{}_odds_cache.json", sport.to_string().to_lowercase())
}

/// Fetch (or cache-load) one sport's odds and run the full analysis
/// pipeline: raw payload -> normalized board -> ranked opportunities.
/// Each refresh rebuilds every board from scratch, so repeating a call
/// with the same payload is harmless.
pub async fn analyze_sport(
    client: &OddsApiClient,
    sport: Sport,
    use_cache: bool,
) -> Result<SportAnalysis> {
    let cache_file = sport_cache_file(sport);

    let events = if use_cache && Path::new(&cache_file).exists() {
        load_odds_from_cache(&cache_file)?
    } else {
        let events = client
            .fetch_events(sport)
            .await
            .with_context(|| format!("Failed to fetch {} odds", sport))?;
        save_odds_to_cache(&events, &cache_file)?;
        events
    };

    let games = events
        .into_iter()
        .map(|(event, payload)| {
            let board = normalize_board(&payload);
            let opportunities = analyze_board(&board);
            GameBoard {
                event,
                board,
                opportunities,
            }
        })
        .collect();

    Ok(SportAnalysis { sport, games })
}
