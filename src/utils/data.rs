use anyhow::{Context, Result};
use serde_json::Value;
use std::path::Path;

use crate::models::GameEvent;
use crate::state::AccuracyLedger;

/// Where the CLI keeps graded results between runs
pub const LEDGER_CACHE_FILE: &str = "cache/accuracy_ledger.json";

fn ensure_parent_dir(path: &str) -> Result<()> {
    if let Some(parent) = Path::new(path).parent() {
        std::fs::create_dir_all(parent).context("Failed to create cache directory")?;
    }
    Ok(())
}

/// Save raw event payloads to a JSON cache file
pub fn save_odds_to_cache(events: &[(GameEvent, Value)], cache_file: &str) -> Result<()> {
    ensure_parent_dir(cache_file)?;
    let json = serde_json::to_string_pretty(events).context("Failed to serialize odds data")?;
    std::fs::write(cache_file, json).context("Failed to write cache file")?;
    Ok(())
}

/// Load raw event payloads from a JSON cache file
pub fn load_odds_from_cache(cache_file: &str) -> Result<Vec<(GameEvent, Value)>> {
    let json = std::fs::read_to_string(cache_file).context("Failed to read cache file")?;
    let events: Vec<(GameEvent, Value)> =
        serde_json::from_str(&json).context("Failed to deserialize odds data")?;
    Ok(events)
}

/// Save the accuracy ledger to its cache file
pub fn save_ledger_to_cache(ledger: &AccuracyLedger, cache_file: &str) -> Result<()> {
    ensure_parent_dir(cache_file)?;
    let json = serde_json::to_string_pretty(ledger).context("Failed to serialize ledger")?;
    std::fs::write(cache_file, json).context("Failed to write ledger file")?;
    Ok(())
}

/// Load the accuracy ledger, or an empty one if it has not been written yet
pub fn load_ledger_from_cache(cache_file: &str) -> Result<AccuracyLedger> {
    if !Path::new(cache_file).exists() {
        return Ok(AccuracyLedger::default());
    }
    let json = std::fs::read_to_string(cache_file).context("Failed to read ledger file")?;
    let ledger: AccuracyLedger =
        serde_json::from_str(&json).context("Failed to deserialize ledger")?;
    Ok(ledger)
}
