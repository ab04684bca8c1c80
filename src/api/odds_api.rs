use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use tracing::warn;

use crate::models::GameEvent;

const ODDS_API_BASE_URL: &str = "https://api.the-odds-api.com/v4";

/// Game-level markets requested for every event
const FEATURED_MARKETS: &str = "h2h,spreads,totals";

/// Sportsbooks queried when no allow-list is configured
const DEFAULT_BOOKS: &str = "draftkings,fanduel";

/// Leagues the dashboard tracks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sport {
    Nfl,
    Cfb,
    Nba,
    Mlb,
    Ufc,
    Golf,
}

impl Sport {
    pub const ALL: [Sport; 6] = [
        Sport::Nfl,
        Sport::Cfb,
        Sport::Nba,
        Sport::Mlb,
        Sport::Ufc,
        Sport::Golf,
    ];

    /// The aggregator's sport key for the featured-odds endpoint
    pub fn odds_api_key(&self) -> &'static str {
        match self {
            Sport::Nfl => "americanfootball_nfl",
            Sport::Cfb => "americanfootball_ncaaf",
            Sport::Nba => "basketball_nba",
            Sport::Mlb => "baseball_mlb",
            Sport::Ufc => "mma_mixed_martial_arts",
            Sport::Golf => "golf_masters_tournament_winner",
        }
    }

    /// Player-prop markets worth requesting per sport; None where the
    /// aggregator offers no prop coverage we model
    pub fn prop_markets(&self) -> Option<&'static str> {
        match self {
            Sport::Nfl | Sport::Cfb => {
                Some("player_pass_tds,player_pass_yds,player_rush_yds,player_receptions")
            }
            Sport::Nba => Some("player_points,player_rebounds,player_assists,player_threes"),
            Sport::Mlb => Some("batter_home_runs,batter_hits,pitcher_strikeouts"),
            Sport::Ufc | Sport::Golf => None,
        }
    }
}

impl fmt::Display for Sport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Sport::Nfl => "NFL",
            Sport::Cfb => "CFB",
            Sport::Nba => "NBA",
            Sport::Mlb => "MLB",
            Sport::Ufc => "UFC",
            Sport::Golf => "Golf",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for Sport {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "nfl" => Ok(Sport::Nfl),
            "cfb" => Ok(Sport::Cfb),
            "nba" => Ok(Sport::Nba),
            "mlb" => Ok(Sport::Mlb),
            "ufc" => Ok(Sport::Ufc),
            "golf" => Ok(Sport::Golf),
            other => Err(format!(
                "unknown sport `{}` (expected one of: nfl, cfb, nba, mlb, ufc, golf)",
                other
            )),
        }
    }
}

/// Event metadata from the aggregator; the bookmaker payload itself is kept
/// raw and schema-checked by the normalizer
#[derive(Debug, Deserialize)]
struct EventMeta {
    id: String,
    #[serde(default)]
    sport_title: String,
    commence_time: DateTime<Utc>,
    home_team: Option<String>,
    away_team: Option<String>,
}

pub struct OddsApiClient {
    api_key: String,
    books: String,
    client: reqwest::Client,
}

impl OddsApiClient {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            books: DEFAULT_BOOKS.to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Restrict quotes to a comma-separated sportsbook allow-list
    pub fn with_allow_list(mut self, books: &str) -> Self {
        if !books.trim().is_empty() {
            self.books = books.trim().to_string();
        }
        self
    }

    /// Build a client from `ODDS_API_KEY` and the optional `BOOKS` allow-list
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("ODDS_API_KEY").context("ODDS_API_KEY not set")?;
        let client = Self::new(api_key);
        match std::env::var("BOOKS") {
            Ok(books) => Ok(client.with_allow_list(&books)),
            Err(_) => Ok(client),
        }
    }

    /// Fetch upcoming events with game-level odds for one sport.
    /// Only returns games that are in the future and within the next 7 days.
    pub async fn fetch_events(&self, sport: Sport) -> Result<Vec<(GameEvent, Value)>> {
        let url = format!(
            "{}/sports/{}/odds",
            ODDS_API_BASE_URL,
            sport.odds_api_key()
        );

        let response = self
            .client
            .get(&url)
            .query(&[
                ("apiKey", self.api_key.as_str()),
                ("bookmakers", self.books.as_str()),
                ("markets", FEATURED_MARKETS),
                ("oddsFormat", "american"),
            ])
            .send()
            .await
            .context("Failed to fetch odds from The Odds API")?;

        if !response.status().is_success() {
            anyhow::bail!("Odds API returned error: {}", response.status());
        }

        let raw_events: Vec<Value> = response
            .json()
            .await
            .context("Failed to parse Odds API response")?;

        let now = Utc::now();
        let one_week_from_now = now + chrono::Duration::days(7);

        let mut events = Vec::new();
        for raw in raw_events {
            let meta: EventMeta = match serde_json::from_value(raw.clone()) {
                Ok(meta) => meta,
                Err(e) => {
                    warn!("Skipping event with unparseable metadata: {}", e);
                    continue;
                }
            };
            let (Some(home_team), Some(away_team)) = (meta.home_team, meta.away_team) else {
                continue;
            };
            if meta.commence_time <= now || meta.commence_time > one_week_from_now {
                continue;
            }
            events.push((
                GameEvent {
                    id: meta.id,
                    sport_title: meta.sport_title,
                    home_team,
                    away_team,
                    commence_time: meta.commence_time,
                },
                raw,
            ));
        }

        Ok(events)
    }

    /// Fetch the player-prop payload for one event. Ok(None) when the sport
    /// has no prop markets we model.
    pub async fn fetch_event_props(&self, sport: Sport, event_id: &str) -> Result<Option<Value>> {
        let Some(markets) = sport.prop_markets() else {
            return Ok(None);
        };

        let url = format!(
            "{}/sports/{}/events/{}/odds",
            ODDS_API_BASE_URL,
            sport.odds_api_key(),
            event_id
        );

        let response = self
            .client
            .get(&url)
            .query(&[
                ("apiKey", self.api_key.as_str()),
                ("bookmakers", self.books.as_str()),
                ("markets", markets),
                ("oddsFormat", "american"),
            ])
            .send()
            .await
            .context("Failed to fetch player props from The Odds API")?;

        if !response.status().is_success() {
            anyhow::bail!("Odds API returned error: {}", response.status());
        }

        let payload: Value = response
            .json()
            .await
            .context("Failed to parse player props response")?;

        Ok(Some(payload))
    }

    /// Check how many API requests you have remaining
    pub async fn check_usage(&self) -> Result<()> {
        let url = format!("{}/sports", ODDS_API_BASE_URL);

        let response = self
            .client
            .get(&url)
            .query(&[("apiKey", self.api_key.as_str())])
            .send()
            .await?;

        if let Some(remaining) = response.headers().get("x-requests-remaining") {
            println!("API requests remaining: {:?}", remaining);
        }

        if let Some(used) = response.headers().get("x-requests-used") {
            println!("API requests used: {:?}", used);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sport_round_trip() {
        for sport in Sport::ALL {
            let parsed: Sport = sport.to_string().to_lowercase().parse().unwrap();
            assert_eq!(parsed, sport);
        }
        assert!("curling".parse::<Sport>().is_err());
    }

    #[test]
    fn test_prop_markets_use_modeled_prefixes() {
        use crate::models::MarketKind;
        for sport in Sport::ALL {
            let Some(markets) = sport.prop_markets() else {
                continue;
            };
            for key in markets.split(',') {
                assert_eq!(
                    MarketKind::from_market_key(key),
                    Some(MarketKind::PlayerProp),
                    "prop market `{}` would not normalize",
                    key
                );
            }
        }
    }
}
