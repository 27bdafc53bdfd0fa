//! Selection store: the active game and specialisation

use rusqlite::{Connection, OptionalExtension};
use tracing::info;

use crate::error::CraftResult;

pub const GAME_KEY: &str = "game";
pub const SPECIALISATION_KEY: &str = "specialisation";

/// Initialize the database schema
pub fn init_schema(conn: &Connection) -> CraftResult<()> {
    conn.execute_batch(
        r#"
        -- Opaque key-value parameters, last write wins
        CREATE TABLE IF NOT EXISTS selection (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );
        "#,
    )?;
    Ok(())
}

/// Insert or replace a selection parameter
pub fn set_selection(conn: &Connection, key: &str, value: &str) -> CraftResult<()> {
    conn.execute(
        "INSERT OR REPLACE INTO selection (key, value) VALUES (?1, ?2)",
        (key, value),
    )?;
    info!("Selected {} = {}", key, value);
    Ok(())
}

pub fn get_selection(conn: &Connection, key: &str) -> CraftResult<Option<String>> {
    let value = conn
        .query_row("SELECT value FROM selection WHERE key = ?1", [key], |row| {
            row.get(0)
        })
        .optional()?;
    Ok(value)
}

pub fn clear_selection(conn: &Connection, key: &str) -> CraftResult<()> {
    conn.execute("DELETE FROM selection WHERE key = ?1", [key])?;
    Ok(())
}

/// Currently selected game and specialisation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub game: Option<String>,
    pub specialisation: Option<String>,
}

pub fn current_selection(conn: &Connection) -> CraftResult<Selection> {
    Ok(Selection {
        game: get_selection(conn, GAME_KEY)?,
        specialisation: get_selection(conn, SPECIALISATION_KEY)?,
    })
}
