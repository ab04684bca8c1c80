use anyhow::{bail, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::warn;

use sports_betting_ev::analyze_sport;
use sports_betting_ev::api::{OddsApiClient, Sport};
use sports_betting_ev::models::{FinalScore, GameEvent, PredictionRecord};
use sports_betting_ev::state::GradedResult;
use sports_betting_ev::utils::data::{
    load_ledger_from_cache, save_ledger_to_cache, LEDGER_CACHE_FILE,
};
use sports_betting_ev::utils::ev_analysis::{compare_opportunities, ValueOpportunity};
use sports_betting_ev::utils::grader::grade_prediction;
use sports_betting_ev::utils::normalizer::normalize_board;

#[derive(Parser)]
#[command(
    name = "sports-betting-ev",
    about = "Multi-sport odds analysis and prediction scoring"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch odds for a sport and print the ranked value opportunities
    Analyze {
        #[arg(long)]
        sport: Sport,
        /// How many opportunities to print
        #[arg(long, default_value_t = 30)]
        top: usize,
    },
    /// Print the normalized player props table for one event
    Props {
        #[arg(long)]
        sport: Sport,
        #[arg(long)]
        event: String,
    },
    /// Grade a prediction against an actual final score
    Grade {
        /// Event id; when given, the result is saved to the accuracy ledger
        #[arg(long)]
        event: Option<String>,
        #[arg(long)]
        home_team: String,
        #[arg(long)]
        away_team: String,
        #[arg(long)]
        home_score: u32,
        #[arg(long)]
        away_score: u32,
        #[arg(long)]
        winner: Option<String>,
        /// Predicted spread, away minus home
        #[arg(long, allow_hyphen_values = true)]
        spread: Option<f64>,
        #[arg(long)]
        total: Option<f64>,
        /// Replace an already-graded result instead of refusing
        #[arg(long)]
        regrade: bool,
    },
    /// Show aggregate accuracy for graded games
    Accuracy,
    /// Check remaining odds API request quota
    Usage,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    match cli.command {
        Command::Analyze { sport, top } => analyze(sport, top).await,
        Command::Props { sport, event } => props(sport, &event).await,
        Command::Grade {
            event,
            home_team,
            away_team,
            home_score,
            away_score,
            winner,
            spread,
            total,
            regrade,
        } => grade(
            event, home_team, away_team, home_score, away_score, winner, spread, total, regrade,
        ),
        Command::Accuracy => accuracy(),
        Command::Usage => {
            let client = OddsApiClient::from_env()?;
            client.check_usage().await
        }
    }
}

async fn analyze(sport: Sport, top: usize) -> Result<()> {
    let client = OddsApiClient::from_env()?;
    let use_cache = std::env::var("USE_CACHE").unwrap_or_default() == "1";

    println!("{} Value Opportunities\n", sport);
    let analysis = analyze_sport(&client, sport, use_cache).await?;

    let malformed = analysis.games.iter().filter(|g| g.board.malformed).count();
    if malformed > 0 {
        warn!("{} event payloads did not match the expected shape", malformed);
    }

    let mut ranked: Vec<(&GameEvent, &ValueOpportunity)> = analysis
        .games
        .iter()
        .flat_map(|game| game.opportunities.iter().map(move |op| (&game.event, op)))
        .collect();
    ranked.sort_by(|a, b| compare_opportunities(a.1, b.1));

    if ranked.is_empty() {
        println!("No opportunities found.");
        return Ok(());
    }

    println!("Top {} of {}:\n", top.min(ranked.len()), ranked.len());
    for (i, (event, op)) in ranked.iter().take(top).enumerate() {
        println!(
            "{}. {} @ {} | {}",
            i + 1,
            event.away_team,
            event.home_team,
            op.format()
        );
    }

    Ok(())
}

async fn props(sport: Sport, event: &str) -> Result<()> {
    let client = OddsApiClient::from_env()?;

    let Some(payload) = client.fetch_event_props(sport, event).await? else {
        println!("No player prop markets modeled for {}.", sport);
        return Ok(());
    };

    let board = normalize_board(&payload);
    if board.malformed {
        warn!("Props payload for event {} did not match the expected shape", event);
    }

    let rows = board.prop_rows();
    if rows.is_empty() {
        println!("No player props available for this game.");
        return Ok(());
    }

    println!(
        "{:<24} {:<20} {:>7} {:<12} {:>8} {:>8}",
        "Player", "Market", "Line", "Book", "Over", "Under"
    );
    for row in rows {
        println!(
            "{:<24} {:<20} {:>7} {:<12} {:>8} {:>8}",
            row.entity, row.market, row.line, row.book, row.over, row.under
        );
    }

    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn grade(
    event: Option<String>,
    home_team: String,
    away_team: String,
    home_score: u32,
    away_score: u32,
    winner: Option<String>,
    spread: Option<f64>,
    total: Option<f64>,
    regrade: bool,
) -> Result<()> {
    let prediction = PredictionRecord {
        predicted_winner: winner,
        predicted_spread: spread,
        predicted_total: total,
        spread_confidence: None,
        total_confidence: None,
    };
    let score = FinalScore {
        home: home_score,
        away: away_score,
    };

    let accuracy = grade_prediction(&prediction, &home_team, &away_team, &score);

    println!(
        "Accuracy: {}% (Grade: {})",
        accuracy.accuracy_percentage, accuracy.grade
    );
    println!("Winner: {}", correctness(accuracy.winner_correct));
    println!("Spread: {}", correctness(accuracy.spread_correct));
    println!("Total:  {}", correctness(accuracy.total_correct));
    if accuracy.partial {
        println!("Note: prediction was incomplete; missing components graded incorrect");
    }

    if let Some(event_id) = event {
        let mut ledger = load_ledger_from_cache(LEDGER_CACHE_FILE)?;
        let result = GradedResult {
            home_team,
            away_team,
            score,
            accuracy,
            graded_at: Utc::now(),
        };
        if regrade {
            ledger.regrade(&event_id, result);
        } else if let Err(e) = ledger.record(&event_id, result) {
            bail!("{}. Pass --regrade to replace the stored result", e);
        }
        save_ledger_to_cache(&ledger, LEDGER_CACHE_FILE)?;
        println!("\nSaved graded result for {} to {}", event_id, LEDGER_CACHE_FILE);
    }

    Ok(())
}

fn correctness(correct: bool) -> &'static str {
    if correct {
        "Correct"
    } else {
        "Incorrect"
    }
}

fn accuracy() -> Result<()> {
    let ledger = load_ledger_from_cache(LEDGER_CACHE_FILE)?;
    if ledger.is_empty() {
        println!("No graded games yet.");
        return Ok(());
    }

    let summary = ledger.summary();
    println!("Graded games: {}", summary.graded);
    println!("Winner hits:  {}/{}", summary.winner_hits, summary.graded);
    println!("Spread hits:  {}/{}", summary.spread_hits, summary.graded);
    println!("Total hits:   {}/{}", summary.total_hits, summary.graded);
    println!("Mean accuracy score: {:.1}%\n", summary.mean_accuracy);

    for (event_id, game) in ledger.iter() {
        println!(
            "{} | {} @ {} | {}-{} | {}% ({})",
            event_id,
            game.away_team,
            game.home_team,
            game.score.away,
            game.score.home,
            game.accuracy.accuracy_percentage,
            game.accuracy.grade
        );
    }

    Ok(())
}
