use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::{Mutex, RwLock};
use tower_http::trace::TraceLayer;
use tracing::info;

use sports_betting_ev::analyze_sport;
use sports_betting_ev::api::{OddsApiClient, Sport};
use sports_betting_ev::error::EngineError;
use sports_betting_ev::models::{FinalScore, GameEvent, PredictionRecord};
use sports_betting_ev::state::{
    AccuracyLedger, AnalysisKind, AnalysisStore, GradedResult, LedgerSummary, StoredAnalysis,
};
use sports_betting_ev::utils::ev_analysis::{analyze_board, ValueOpportunity};
use sports_betting_ev::utils::grader::grade_prediction;
use sports_betting_ev::utils::normalizer::{normalize_board, PropRow};

/// JSON error envelope for the API
enum ApiError {
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    Upstream(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m),
            ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m),
            ApiError::Conflict(m) => (StatusCode::CONFLICT, m),
            ApiError::Upstream(m) => (StatusCode::BAD_GATEWAY, m),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

struct AppState {
    client: OddsApiClient,
    /// One lock per sport so concurrent refresh requests queue instead of
    /// interleaving; the swap itself is wholesale, last write wins
    refresh_locks: HashMap<Sport, Mutex<()>>,
    games: RwLock<HashMap<String, (Sport, GameEvent)>>,
    store: RwLock<AnalysisStore>,
    ledger: RwLock<AccuracyLedger>,
}

type SharedState = Arc<AppState>;

fn parse_sport(s: &str) -> Result<Sport, ApiError> {
    s.parse().map_err(ApiError::BadRequest)
}

async fn refresh(
    Path(sport): Path<String>,
    State(state): State<SharedState>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let sport = parse_sport(&sport)?;
    let lock = state
        .refresh_locks
        .get(&sport)
        .ok_or_else(|| ApiError::BadRequest(format!("unsupported sport `{}`", sport)))?;
    let _guard = lock.lock().await;

    let analysis = analyze_sport(&state.client, sport, false)
        .await
        .map_err(|e| ApiError::Upstream(e.to_string()))?;
    let count = analysis.games.len();

    let mut games = state.games.write().await;
    let mut store = state.store.write().await;
    for game in analysis.games {
        let event = game.event;
        store.put(
            &event.id,
            AnalysisKind::Game,
            StoredAnalysis {
                opportunities: game.opportunities,
                malformed_source: game.board.malformed,
                generated_at: Utc::now(),
            },
        );
        games.insert(event.id.clone(), (sport, event));
    }

    info!("Refreshed {} games for {}", count, sport);
    Ok(Json(json!({ "sport": sport.to_string(), "games": count })))
}

#[derive(Serialize)]
struct GameOpportunities {
    event: GameEvent,
    generated_at: DateTime<Utc>,
    malformed_source: bool,
    opportunities: Vec<ValueOpportunity>,
}

async fn opportunities(
    Path(sport): Path<String>,
    State(state): State<SharedState>,
) -> Result<Json<Vec<GameOpportunities>>, ApiError> {
    let sport = parse_sport(&sport)?;
    let games = state.games.read().await;
    let store = state.store.read().await;

    let mut out = Vec::new();
    for (event_id, (game_sport, event)) in games.iter() {
        if *game_sport != sport {
            continue;
        }
        if let Some(analysis) = store.get(event_id, AnalysisKind::Game) {
            out.push(GameOpportunities {
                event: event.clone(),
                generated_at: analysis.generated_at,
                malformed_source: analysis.malformed_source,
                opportunities: analysis.opportunities.clone(),
            });
        }
    }
    out.sort_by_key(|g| g.event.commence_time);

    Ok(Json(out))
}

#[derive(Serialize)]
struct PropsResponse {
    event_id: String,
    malformed_source: bool,
    rows: Vec<PropRow>,
    opportunities: Vec<ValueOpportunity>,
}

async fn props(
    Path((sport, event_id)): Path<(String, String)>,
    State(state): State<SharedState>,
) -> Result<Json<PropsResponse>, ApiError> {
    let sport = parse_sport(&sport)?;
    let payload = state
        .client
        .fetch_event_props(sport, &event_id)
        .await
        .map_err(|e| ApiError::Upstream(e.to_string()))?
        .ok_or_else(|| {
            ApiError::NotFound(format!("no player prop markets modeled for {}", sport))
        })?;

    let board = normalize_board(&payload);
    let rows = board.prop_rows();
    let opportunities = analyze_board(&board);

    state.store.write().await.put(
        &event_id,
        AnalysisKind::Props,
        StoredAnalysis {
            opportunities: opportunities.clone(),
            malformed_source: board.malformed,
            generated_at: Utc::now(),
        },
    );

    Ok(Json(PropsResponse {
        event_id,
        malformed_source: board.malformed,
        rows,
        opportunities,
    }))
}

#[derive(Deserialize)]
struct GradeRequest {
    home_score: u32,
    away_score: u32,
    prediction: PredictionRecord,
    #[serde(default)]
    regrade: bool,
}

async fn grade(
    Path(event_id): Path<String>,
    State(state): State<SharedState>,
    Json(req): Json<GradeRequest>,
) -> Result<Json<GradedResult>, ApiError> {
    let (home_team, away_team) = {
        let games = state.games.read().await;
        let Some((_, event)) = games.get(&event_id) else {
            return Err(ApiError::NotFound(format!("unknown game `{}`", event_id)));
        };
        (event.home_team.clone(), event.away_team.clone())
    };

    let score = FinalScore {
        home: req.home_score,
        away: req.away_score,
    };
    let accuracy = grade_prediction(&req.prediction, &home_team, &away_team, &score);
    let result = GradedResult {
        home_team,
        away_team,
        score,
        accuracy,
        graded_at: Utc::now(),
    };

    let mut ledger = state.ledger.write().await;
    if req.regrade {
        ledger.regrade(&event_id, result.clone());
    } else {
        ledger.record(&event_id, result.clone()).map_err(|e| match e {
            EngineError::AlreadyGraded { .. } => ApiError::Conflict(e.to_string()),
            other => ApiError::BadRequest(other.to_string()),
        })?;
    }

    // The external learning step keys off this event; it must fire once
    // per grading
    info!(
        "Graded game {}: {}% ({})",
        event_id, result.accuracy.accuracy_percentage, result.accuracy.grade
    );
    Ok(Json(result))
}

#[derive(Serialize)]
struct GradedGame {
    event_id: String,
    #[serde(flatten)]
    result: GradedResult,
}

#[derive(Serialize)]
struct AccuracyResponse {
    summary: LedgerSummary,
    games: Vec<GradedGame>,
}

async fn accuracy(State(state): State<SharedState>) -> Json<AccuracyResponse> {
    let ledger = state.ledger.read().await;
    Json(AccuracyResponse {
        summary: ledger.summary(),
        games: ledger
            .iter()
            .map(|(event_id, result)| GradedGame {
                event_id: event_id.clone(),
                result: result.clone(),
            })
            .collect(),
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenv::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt::init();

    let client = OddsApiClient::from_env()?;
    let refresh_locks = Sport::ALL.iter().map(|s| (*s, Mutex::new(()))).collect();

    let state = Arc::new(AppState {
        client,
        refresh_locks,
        games: RwLock::new(HashMap::new()),
        store: RwLock::new(AnalysisStore::default()),
        ledger: RwLock::new(AccuracyLedger::default()),
    });

    let app = Router::new()
        .route("/api/refresh/:sport", post(refresh))
        .route("/api/opportunities/:sport", get(opportunities))
        .route("/api/props/:sport/:event_id", get(props))
        .route("/api/games/:event_id/grade", post(grade))
        .route("/api/accuracy", get(accuracy))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    println!("Starting API server at http://127.0.0.1:3000");
    println!("Load odds with POST /api/refresh/:sport");
    println!("Press Ctrl+C to stop\n");

    let listener = tokio::net::TcpListener::bind("127.0.0.1:3000").await?;
    axum::serve(listener, app).await?;

    Ok(())
}
