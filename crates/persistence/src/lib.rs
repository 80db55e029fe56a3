#![deny(warnings)]

//! Persistence layer: whole-state save slots in SQLite, keyed by business id.
//!
//! States are stored as bincode blobs next to a few summary columns so that
//! save lists can be shown without decoding anything.

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use sim_core::{BusinessId, GameState};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use tracing::{debug, info};

/// Version tag written with every blob; bump when `GameState` changes shape.
pub const FORMAT_VERSION: i64 = 1;

const SCHEMA: &str = r"CREATE TABLE IF NOT EXISTS saves (
    business_id    TEXT PRIMARY KEY,
    business_name  TEXT NOT NULL,
    tick           INTEGER NOT NULL,
    sim_date       TEXT NOT NULL,
    format_version INTEGER NOT NULL,
    state          BLOB NOT NULL,
    updated_at     TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
)";

/// Returns the default SQLite URL used for local saves.
pub fn default_sqlite_url() -> &'static str {
    "sqlite://./saves/main.db"
}

/// One row of the save list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SaveSummary {
    /// Business the slot belongs to.
    pub business_id: BusinessId,
    /// Display name at save time.
    pub business_name: String,
    /// Tick at save time.
    pub tick: u64,
    /// Simulated date at save time.
    pub date: NaiveDate,
    /// Wall-clock time of the last write (SQLite `CURRENT_TIMESTAMP`).
    pub updated_at: String,
}

/// Open (creating if needed) the database at `url` and ensure the schema.
pub async fn init_db(url: &str) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(url)
        .with_context(|| format!("invalid database url {url}"))?
        .create_if_missing(true);
    let in_memory = url.contains(":memory:");
    // Every connection to an in-memory database sees its own empty database.
    let pool = SqlitePoolOptions::new()
        .max_connections(if in_memory { 1 } else { 4 })
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
        .with_context(|| format!("connecting to {url}"))?;
    sqlx::query(SCHEMA)
        .execute(&pool)
        .await
        .context("creating saves table")?;
    info!(url, "database ready");
    Ok(pool)
}

/// Upsert the state into the slot of its business.
pub async fn save_state(pool: &SqlitePool, state: &GameState) -> Result<BusinessId> {
    let business = state
        .business
        .as_ref()
        .context("cannot save a session without an active business")?;
    let blob = encode_state(state)?;
    let tick = i64::try_from(state.tick()).context("tick does not fit in the database")?;
    sqlx::query(
        r"INSERT INTO saves (business_id, business_name, tick, sim_date, format_version, state, updated_at)
          VALUES (?, ?, ?, ?, ?, ?, CURRENT_TIMESTAMP)
          ON CONFLICT (business_id) DO UPDATE SET
            business_name = excluded.business_name,
            tick = excluded.tick,
            sim_date = excluded.sim_date,
            format_version = excluded.format_version,
            state = excluded.state,
            updated_at = CURRENT_TIMESTAMP",
    )
    .bind(&business.id.0)
    .bind(&business.name)
    .bind(tick)
    .bind(state.date().to_string())
    .bind(FORMAT_VERSION)
    .bind(&blob)
    .execute(pool)
    .await
    .with_context(|| format!("saving {}", business.id))?;
    debug!(business = %business.id, tick, bytes = blob.len(), "state saved");
    Ok(business.id.clone())
}

/// Load the saved state of `id`, if any. The state is returned as saved;
/// derived metrics are recomputed by the store when it is loaded.
pub async fn load_state(pool: &SqlitePool, id: &BusinessId) -> Result<Option<GameState>> {
    let row = sqlx::query("SELECT format_version, state FROM saves WHERE business_id = ?")
        .bind(&id.0)
        .fetch_optional(pool)
        .await
        .with_context(|| format!("loading {id}"))?;
    let Some(row) = row else {
        return Ok(None);
    };
    let version: i64 = row.try_get("format_version")?;
    if version != FORMAT_VERSION {
        bail!("save for {id} has format version {version}, expected {FORMAT_VERSION}");
    }
    let blob: Vec<u8> = row.try_get("state")?;
    let state = decode_state(&blob).with_context(|| format!("decoding save for {id}"))?;
    debug!(business = %id, tick = state.tick(), "state loaded");
    Ok(Some(state))
}

/// All save slots, most recently written first.
pub async fn list_saves(pool: &SqlitePool) -> Result<Vec<SaveSummary>> {
    let rows = sqlx::query(
        "SELECT business_id, business_name, tick, sim_date, updated_at FROM saves \
         ORDER BY updated_at DESC, business_id",
    )
    .fetch_all(pool)
    .await
    .context("listing saves")?;
    rows.iter()
        .map(|row| -> Result<SaveSummary> {
            let tick: i64 = row.try_get("tick")?;
            let date: String = row.try_get("sim_date")?;
            Ok(SaveSummary {
                business_id: BusinessId(row.try_get("business_id")?),
                business_name: row.try_get("business_name")?,
                tick: u64::try_from(tick).context("negative tick in save")?,
                date: NaiveDate::from_str(&date)
                    .with_context(|| format!("bad date {date} in save"))?,
                updated_at: row.try_get("updated_at")?,
            })
        })
        .collect()
}

/// Remove the slot of `id`. Returns false when there was none.
pub async fn delete_save(pool: &SqlitePool, id: &BusinessId) -> Result<bool> {
    let done = sqlx::query("DELETE FROM saves WHERE business_id = ?")
        .bind(&id.0)
        .execute(pool)
        .await
        .with_context(|| format!("deleting {id}"))?;
    Ok(done.rows_affected() > 0)
}

/// Binary encoding used for save blobs.
pub fn encode_state(state: &GameState) -> Result<Vec<u8>> {
    bincode::serialize(state).context("encoding game state")
}

/// Inverse of [`encode_state`].
pub fn decode_state(bytes: &[u8]) -> Result<GameState> {
    bincode::deserialize(bytes).context("decoding game state")
}

/// Pretty JSON export of a state, for inspection and sharing.
pub fn export_json(state: &GameState) -> Result<String> {
    serde_json::to_string_pretty(state).context("exporting game state as json")
}

#[cfg(test)]
mod tests {
    use super::*;
    use sim_core::{BusinessSetup, FundingStage, Industry, SimConfig};
    use sim_runtime::{run_ticks, Command, GameStateStore};

    fn played_state(name: &str, ticks: u64) -> GameState {
        let mut store = GameStateStore::new(SimConfig::default()).unwrap();
        store
            .dispatch(Command::CreateBusiness(BusinessSetup {
                name: name.into(),
                industry: Industry::Tech,
                stage: FundingStage::Seed,
                starting_cash: None,
            }))
            .unwrap();
        let state = run_ticks(&mut store, ticks).unwrap();
        GameState::clone(&state)
    }

    #[test]
    fn url_is_sqlite() {
        assert!(default_sqlite_url().starts_with("sqlite://"));
    }

    #[test]
    fn blob_round_trips_a_played_session() {
        let state = played_state("Blob Co", 12);
        let bytes = encode_state(&state).unwrap();
        assert_eq!(decode_state(&bytes).unwrap(), state);
        assert!(decode_state(&bytes[..bytes.len() / 2]).is_err());
    }

    #[test]
    fn json_export_is_readable() {
        let state = played_state("Json Co", 2);
        let json = export_json(&state).unwrap();
        assert!(json.contains("\"Json Co\""));
        let back: GameState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, state);
    }

    #[tokio::test]
    async fn save_load_and_list() {
        let pool = init_db("sqlite::memory:").await.unwrap();
        let state = played_state("Saver", 6);
        let id = save_state(&pool, &state).await.unwrap();
        assert_eq!(id.0, "saver");

        let loaded = load_state(&pool, &id).await.unwrap().unwrap();
        assert_eq!(loaded, state);

        let later = played_state("Saver", 9);
        save_state(&pool, &later).await.unwrap();
        let saves = list_saves(&pool).await.unwrap();
        assert_eq!(saves.len(), 1);
        assert_eq!(saves[0].tick, 9);
        assert_eq!(saves[0].date, later.date());
        assert_eq!(load_state(&pool, &id).await.unwrap().unwrap().tick(), 9);
    }

    #[tokio::test]
    async fn slots_are_keyed_by_business() {
        let pool = init_db("sqlite::memory:").await.unwrap();
        save_state(&pool, &played_state("Alpha", 1)).await.unwrap();
        save_state(&pool, &played_state("Beta", 1)).await.unwrap();
        assert_eq!(list_saves(&pool).await.unwrap().len(), 2);

        let alpha = BusinessId("alpha".into());
        assert!(delete_save(&pool, &alpha).await.unwrap());
        assert!(!delete_save(&pool, &alpha).await.unwrap());
        assert!(load_state(&pool, &alpha).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn empty_session_cannot_be_saved() {
        let pool = init_db("sqlite::memory:").await.unwrap();
        let empty = GameState::new(&SimConfig::default()).unwrap();
        let err = save_state(&pool, &empty).await.unwrap_err();
        assert!(err.to_string().contains("without an active business"));
    }
}
