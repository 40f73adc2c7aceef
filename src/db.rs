//! SQLite persistence for runs
//!
//! The ledger itself is in-memory. This layer saves runs so the command line
//! can pick them up again on the next invocation. Amounts are stored as TEXT
//! so decimals come back exactly as written.

use std::fmt;
use std::str::FromStr;

use rusqlite::Connection;
use rust_decimal::Decimal;
use tracing::debug;

use crate::error::{Result, RunError};
use crate::models::{Distribution, Identity, Run, RunId, RunKind};
use crate::store::RunStore;

/// Initialize the database schema
pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS runs (
            id INTEGER PRIMARY KEY,
            kind TEXT NOT NULL,
            creator TEXT NOT NULL,
            sand TEXT NOT NULL,
            strav_mass TEXT NOT NULL,
            titanium_ore TEXT NOT NULL,
            fiber TEXT NOT NULL,
            -- JSON encoded Distribution, NULL until calculated
            last_calculation TEXT
        );

        -- Roster order matters, so it is kept explicitly
        CREATE TABLE IF NOT EXISTS run_players (
            run_id INTEGER NOT NULL,
            position INTEGER NOT NULL,
            name TEXT NOT NULL,
            PRIMARY KEY (run_id, position)
        );

        CREATE INDEX IF NOT EXISTS idx_run_players_run ON run_players(run_id);
        "#,
    )?;
    Ok(())
}

fn sql_id(id: RunId) -> Result<i64> {
    i64::try_from(id.0)
        .map_err(|_| RunError::Storage(format!("run id {id} does not fit in SQLite")))
}

/// Insert or replace a run and its roster
pub fn save_run(conn: &Connection, run: &Run) -> Result<()> {
    let id = sql_id(run.id)?;
    let last_calculation = run
        .last_calculation
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?;

    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "INSERT OR REPLACE INTO runs
             (id, kind, creator, sand, strav_mass, titanium_ore, fiber, last_calculation)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        (
            id,
            run.kind.as_str(),
            run.creator.as_str(),
            run.sand.to_string(),
            run.strav_mass.to_string(),
            run.titanium_ore.to_string(),
            run.fiber.to_string(),
            last_calculation,
        ),
    )?;
    tx.execute("DELETE FROM run_players WHERE run_id = ?1", [id])?;
    for (position, name) in run.players.iter().enumerate() {
        tx.execute(
            "INSERT INTO run_players (run_id, position, name) VALUES (?1, ?2, ?3)",
            (id, position as i64, name),
        )?;
    }
    tx.commit()?;
    debug!(run_id = %run.id, "run saved");
    Ok(())
}

/// Remove a run. Returns whether a row existed.
pub fn delete_run(conn: &Connection, id: RunId) -> Result<bool> {
    let id = sql_id(id)?;
    let tx = conn.unchecked_transaction()?;
    tx.execute("DELETE FROM run_players WHERE run_id = ?1", [id])?;
    let removed = tx.execute("DELETE FROM runs WHERE id = ?1", [id])?;
    tx.commit()?;
    Ok(removed > 0)
}

/// Clear all runs
pub fn clear_runs(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        DELETE FROM run_players;
        DELETE FROM runs;
        "#,
    )?;
    Ok(())
}

fn parse_amount(column: &str, raw: &str) -> Result<Decimal> {
    Decimal::from_str(raw).map_err(|_| RunError::Storage(format!("bad {column} value '{raw}'")))
}

struct RunRow {
    id: i64,
    kind: String,
    creator: String,
    sand: String,
    strav_mass: String,
    titanium_ore: String,
    fiber: String,
    last_calculation: Option<String>,
}

impl RunRow {
    fn into_run(self, players: Vec<String>) -> Result<Run> {
        let id = u64::try_from(self.id)
            .map(RunId)
            .map_err(|_| RunError::Storage(format!("negative run id {}", self.id)))?;
        let kind = RunKind::from_str(&self.kind)
            .map_err(|_| RunError::Storage(format!("run {id} has unknown kind '{}'", self.kind)))?;
        let last_calculation = self
            .last_calculation
            .as_deref()
            .map(serde_json::from_str::<Distribution>)
            .transpose()?;

        Ok(Run {
            id,
            kind,
            creator: Identity(self.creator),
            players,
            sand: parse_amount("sand", &self.sand)?,
            strav_mass: parse_amount("strav_mass", &self.strav_mass)?,
            titanium_ore: parse_amount("titanium_ore", &self.titanium_ore)?,
            fiber: parse_amount("fiber", &self.fiber)?,
            last_calculation,
        })
    }
}

fn get_players(conn: &Connection, run_id: i64) -> Result<Vec<String>> {
    let mut stmt =
        conn.prepare("SELECT name FROM run_players WHERE run_id = ?1 ORDER BY position")?;
    let rows = stmt.query_map([run_id], |row| row.get(0))?;

    let mut results = Vec::new();
    for row in rows {
        results.push(row?);
    }
    Ok(results)
}

const RUN_COLUMNS: &str =
    "id, kind, creator, sand, strav_mass, titanium_ore, fiber, last_calculation";

fn read_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RunRow> {
    Ok(RunRow {
        id: row.get(0)?,
        kind: row.get(1)?,
        creator: row.get(2)?,
        sand: row.get(3)?,
        strav_mass: row.get(4)?,
        titanium_ore: row.get(5)?,
        fiber: row.get(6)?,
        last_calculation: row.get(7)?,
    })
}

/// Load every run, ordered by id
pub fn load_runs(conn: &Connection) -> Result<Vec<Run>> {
    let sql = format!("SELECT {RUN_COLUMNS} FROM runs ORDER BY id");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], read_row)?;

    let mut results = Vec::new();
    for row in rows {
        let row = row?;
        let players = get_players(conn, row.id)?;
        results.push(row.into_run(players)?);
    }
    Ok(results)
}

/// Load all stored runs into `store`
pub fn load_into(conn: &Connection, store: &RunStore) -> Result<LoadStats> {
    let mut stats = LoadStats::default();
    for run in load_runs(conn)? {
        if run.last_calculation.is_some() {
            stats.calculated += 1;
        }
        store.insert(run)?;
        stats.runs += 1;
    }
    debug!(runs = stats.runs, "runs loaded");
    Ok(stats)
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct LoadStats {
    pub runs: usize,
    pub calculated: usize,
}

impl fmt::Display for LoadStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Loaded {} runs ({} calculated)", self.runs, self.calculated)
    }
}
