//! Database connection management
//!
//! This module provides the single-file SQLite connection wrapper that every
//! other database component goes through.

use anyhow::{Context, Result};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A single result row, values in column order
pub type Row = Vec<Value>;

/// Core database connection wrapper
///
/// `DatabaseConn` owns at most one live `rusqlite::Connection` for a single
/// database file. The handle is (re)opened lazily: every public operation
/// goes through [`DatabaseConn::connect`], so callers may `close()` at any
/// point and keep using the wrapper afterwards.
///
/// Statements outside of an explicit transaction are committed as soon as
/// they complete.
pub struct DatabaseConn {
    path: Option<PathBuf>,
    conn: Option<Connection>,
}

impl DatabaseConn {
    /// Open a database at the specified path
    ///
    /// If the path is `None`, an in-memory database is created. Otherwise the
    /// parent directory and an empty database file are created if missing.
    pub fn open(path: Option<&Path>) -> Result<Self> {
        let mut db = DatabaseConn {
            path: path.map(Path::to_path_buf),
            conn: None,
        };
        db.connect()?;
        Ok(db)
    }

    /// Open a database at the specified path (convenience method)
    pub fn open_path(path: impl AsRef<Path>) -> Result<Self> {
        Self::open(Some(path.as_ref()))
    }

    /// Create an in-memory database
    ///
    /// Closing an in-memory database discards its contents; the next
    /// operation starts from an empty database.
    pub fn open_in_memory() -> Result<Self> {
        Self::open(None)
    }

    /// Path of the backing file, `None` for in-memory databases
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn is_open(&self) -> bool {
        self.conn.is_some()
    }

    /// Return the live connection, opening it first if needed
    pub fn connect(&mut self) -> Result<&Connection> {
        if self.conn.is_none() {
            let conn = match &self.path {
                Some(p) => {
                    ensure_database_file(p)?;
                    debug!("opening database {}", p.display());
                    Connection::open(p)
                        .with_context(|| format!("Failed to open database at '{}'", p.display()))?
                }
                None => Connection::open_in_memory()
                    .context("Failed to create in-memory database")?,
            };
            configure(&conn)?;
            self.conn = Some(conn);
        }

        self.conn
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("Database connection is not open"))
    }

    /// Release the connection
    ///
    /// Already committed data stays in the file. Closing a closed handle is a no-op.
    pub fn close(&mut self) -> Result<()> {
        if let Some(conn) = self.conn.take() {
            conn.close()
                .map_err(|(_, e)| e)
                .context("Failed to close database")?;
        }
        Ok(())
    }

    /// Execute a single SQL statement
    ///
    /// Returns the number of changed rows. Statements that yield rows, such
    /// as `SELECT` or `PRAGMA journal_mode=WAL`, are stepped to completion
    /// and their rows discarded; for those the row count is returned instead.
    pub fn execute(&mut self, sql: &str) -> Result<usize> {
        debug!("execute: {}", sql);
        let mut stmt = self
            .connect()?
            .prepare(sql)
            .with_context(|| format!("Failed to execute SQL: {}", sql))?;

        if stmt.column_count() == 0 {
            return stmt
                .raw_execute()
                .with_context(|| format!("Failed to execute SQL: {}", sql));
        }

        let mut rows = stmt.raw_query();
        let mut count = 0;
        while rows
            .next()
            .with_context(|| format!("Failed to execute SQL: {}", sql))?
            .is_some()
        {
            count += 1;
        }
        Ok(count)
    }

    /// Execute a SQL statement with parameters
    pub fn execute_with_params<P: rusqlite::Params>(&mut self, sql: &str, params: P) -> Result<usize> {
        self.connect()?
            .execute(sql, params)
            .with_context(|| format!("Failed to execute SQL with params: {}", sql))
    }

    /// Execute one parameterized statement for every row
    ///
    /// All rows are applied in a single transaction that is committed at the
    /// end. Returns the total number of changed rows.
    pub fn execute_batch(&mut self, sql: &str, rows: &[Row]) -> Result<usize> {
        let conn = self.connect()?;
        let tx = conn
            .unchecked_transaction()
            .context("Failed to begin transaction")?;

        let mut changed = 0;
        {
            let mut stmt = tx
                .prepare(sql)
                .with_context(|| format!("Failed to prepare statement: {}", sql))?;
            for row in rows {
                changed += stmt
                    .execute(params_from_iter(row.iter()))
                    .with_context(|| format!("Failed to execute SQL: {}", sql))?;
            }
        }

        tx.commit().context("Failed to commit transaction")?;
        Ok(changed)
    }

    /// Run a read statement and return every result row
    pub fn query(&mut self, sql: &str) -> Result<Vec<Row>> {
        debug!("query: {}", sql);
        let conn = self.connect()?;
        let mut stmt = conn
            .prepare(sql)
            .with_context(|| format!("Failed to prepare query: {}", sql))?;
        let column_count = stmt.column_count();

        let rows = stmt
            .query_map([], |row| {
                (0..column_count)
                    .map(|i| row.get::<_, Value>(i))
                    .collect::<rusqlite::Result<Row>>()
            })
            .with_context(|| format!("Failed to run query: {}", sql))?
            .collect::<rusqlite::Result<Vec<Row>>>()
            .with_context(|| format!("Failed to read rows: {}", sql))?;
        Ok(rows)
    }

    /// Begin an unchecked transaction
    pub fn transaction(&mut self) -> Result<rusqlite::Transaction<'_>> {
        self.connect()?
            .unchecked_transaction()
            .context("Failed to begin transaction")
    }

    /// Turn foreign key enforcement on or off for the live connection
    pub fn set_foreign_keys(&mut self, enabled: bool) -> Result<()> {
        let sql = if enabled {
            "PRAGMA foreign_keys = ON"
        } else {
            "PRAGMA foreign_keys = OFF"
        };
        self.connect()?
            .execute(sql, [])
            .context("Failed to toggle foreign key enforcement")?;
        Ok(())
    }

    pub fn foreign_keys_enabled(&mut self) -> Result<bool> {
        let enabled: i64 = self
            .connect()?
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .context("Failed to read foreign key setting")?;
        Ok(enabled == 1)
    }

    /// Check if a table exists in the database
    pub fn table_exists(&mut self, table_name: &str) -> Result<bool> {
        let count: i32 = self
            .connect()?
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
                [table_name],
                |row| row.get(0),
            )
            .context("Failed to check table existence")?;
        Ok(count > 0)
    }

    /// Get the row count for a table
    pub fn table_count(&mut self, table_name: &str) -> Result<u64> {
        let query = format!("SELECT COUNT(*) FROM {}", table_name);
        let count: u64 = self
            .connect()?
            .query_row(&query, [], |row| row.get(0))
            .with_context(|| format!("Failed to get row count of '{}'", table_name))?;
        Ok(count)
    }

    /// Names of all user tables, in creation order
    pub fn table_names(&mut self) -> Result<Vec<String>> {
        let conn = self.connect()?;
        let mut stmt = conn
            .prepare(
                "SELECT name FROM sqlite_master \
                 WHERE type='table' AND name NOT LIKE 'sqlite_%' ORDER BY rowid",
            )
            .context("Failed to list tables")?;
        let names = stmt
            .query_map([], |row| row.get(0))
            .context("Failed to list tables")?
            .collect::<rusqlite::Result<Vec<String>>>()
            .context("Failed to read table names")?;
        Ok(names)
    }
}

/// Create the parent directory and an empty database file if they are missing
fn ensure_database_file(path: &Path) -> Result<()> {
    if path.exists() {
        return Ok(());
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).with_context(|| {
            format!("Failed to create database directory '{}'", parent.display())
        })?;
    }
    File::create(path)
        .with_context(|| format!("Failed to create database file '{}'", path.display()))?;
    Ok(())
}

/// Apply the connection settings used for every handle
fn configure(conn: &Connection) -> Result<()> {
    // WAL for file databases; in-memory databases report "memory"
    let _: String = conn
        .query_row("PRAGMA journal_mode=WAL", [], |row| row.get(0))
        .context("Failed to set journal mode")?;

    conn.execute("PRAGMA synchronous=NORMAL", [])
        .context("Failed to set synchronous mode")?;

    conn.execute("PRAGMA temp_store=MEMORY", [])
        .context("Failed to set temp store")?;

    conn.execute("PRAGMA foreign_keys=ON", [])
        .context("Failed to enable foreign keys")?;

    Ok(())
}
