// Copyright (c) 2026 walkware
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/walkware/stridekeeper-rs

//! Local counter store - durable single-slot persistence for the step total

use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::info;

use crate::config::StoreConfig;

/// Fixed slot the running total is stored under
const SLOT_KEY: &str = "last_step";

/// Counter store failure
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
}

/// Single-key, last-write-wins store for the last known running total.
/// No transactions across callers, no history.
pub struct CounterStore {
    conn: Arc<Mutex<Connection>>,
}

impl CounterStore {
    /// Open or create the backing database
    pub fn open(config: &StoreConfig) -> Result<Self, StoreError> {
        if let Some(parent) = config.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(&config.path)?;

        conn.execute_batch(
            r#"
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
        "#,
        )?;

        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };

        store.create_tables()?;

        info!("Counter store opened at {:?}", config.path);
        Ok(store)
    }

    fn create_tables(&self) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS counter (
                key TEXT PRIMARY KEY,
                value INTEGER NOT NULL,
                updated_at TEXT DEFAULT CURRENT_TIMESTAMP
            );
        "#,
        )?;

        Ok(())
    }

    /// Last persisted running total, 0 if the slot was never written
    pub fn load(&self) -> Result<u64, StoreError> {
        let conn = self.conn.lock().unwrap();

        let result: Result<i64, _> = conn.query_row(
            "SELECT value FROM counter WHERE key = ?1",
            params![SLOT_KEY],
            |row| row.get(0),
        );

        match result {
            Ok(value) => Ok(value.max(0) as u64),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(0),
            Err(e) => Err(e.into()),
        }
    }

    /// Overwrite the slot with a new total, last-write-wins
    pub fn save(&self, total: u64) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();

        conn.execute(
            "INSERT OR REPLACE INTO counter (key, value, updated_at) VALUES (?1, ?2, ?3)",
            params![SLOT_KEY, total as i64, chrono::Utc::now().to_rfc3339()],
        )?;

        Ok(())
    }
}
