//! Paper library database
//!
//! This module provides the database handle used by the paper CLI. A paper
//! database is a single SQLite file under `<library>/db/` whose tables are
//! created from the user's `db-config.json`.

use anyhow::Result;
use serde::Serialize;
use std::path::Path;
use tracing::info;

use crate::config::{db_file_name, PaperConfig};
use crate::database::core::{DatabaseConn, SchemaDescription, SchemaMaterializer, TableSnapshot};

/// File name used when none is given
pub const DEFAULT_DB_NAME: &str = "untitled";

/// Per-table overview of a paper database
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "display", derive(tabled::Tabled))]
pub struct TableSummary {
    pub table: String,
    pub columns: usize,
    pub rows: u64,
    pub foreign_keys: String,
}

/// Main paper database (SQLite backend)
///
/// `PaperDatabase` owns the connection for one database file and exposes
/// the schema bootstrap on top of the generic [`DatabaseConn`] operations.
pub struct PaperDatabase {
    db: DatabaseConn,
}

impl PaperDatabase {
    /// Open (creating if needed) the database at the specified path
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let db = DatabaseConn::open_path(path)?;
        Ok(Self { db })
    }

    /// Open the database called `filename` in a directory
    ///
    /// `.db` is appended to `filename` when missing.
    pub fn open_in_dir(db_dir: impl AsRef<Path>, filename: &str) -> Result<Self> {
        Self::open(db_dir.as_ref().join(db_file_name(filename)))
    }

    /// Open the database called `filename` in the configured library
    pub fn open_with_config(config: &PaperConfig, filename: &str) -> Result<Self> {
        Self::open(config.db_path(filename))
    }

    /// Create an in-memory paper database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let db = DatabaseConn::open_in_memory()?;
        Ok(Self { db })
    }

    /// Get the underlying database connection (for CRUD and raw queries)
    pub fn connection(&mut self) -> &mut DatabaseConn {
        &mut self.db
    }

    pub fn close(&mut self) -> Result<()> {
        self.db.close()
    }

    /// Create all tables and relations of `schema`
    ///
    /// Fails on the first table that already exists; see [`SchemaMaterializer`].
    pub fn create_database(&mut self, schema: &SchemaDescription) -> Result<()> {
        SchemaMaterializer::new(&mut self.db).create_database(schema)
    }

    /// Load `db-config.json` from the config directory and create the database from it
    pub fn create_database_from_config(&mut self, config: &PaperConfig) -> Result<()> {
        let path = config.schema_config_path();
        info!("loading schema description from {}", path.display());
        let schema = SchemaDescription::from_file(&path)?;
        self.create_database(&schema)
    }

    /// Summarize every table: column count, row count and foreign keys
    pub fn table_summaries(&mut self) -> Result<Vec<TableSummary>> {
        let names = self.db.table_names()?;
        let mut summaries = Vec::with_capacity(names.len());
        for name in names {
            let rows = self.db.table_count(&name)?;
            let snapshot = TableSnapshot::capture(self.db.connect()?, &name)?;
            let foreign_keys = snapshot
                .foreign_keys
                .iter()
                .map(|fk| {
                    format!(
                        "{} -> {}({})",
                        fk.columns.join(","),
                        fk.ref_table,
                        fk.ref_columns.join(",")
                    )
                })
                .collect::<Vec<_>>()
                .join("; ");
            summaries.push(TableSummary {
                table: name,
                columns: snapshot.columns.len(),
                rows,
                foreign_keys,
            });
        }
        Ok(summaries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::core::SCHEMA_CONFIG_FILE;

    const SCHEMA: &str = r#"{
        "tables": {
            "author": { "id": "INTEGER PRIMARY KEY", "name": "TEXT" },
            "paper": { "id": "INTEGER PRIMARY KEY", "title": "TEXT", "author_id": "INTEGER" }
        },
        "relations": {
            "written_by": [
                { "table": "paper", "column": "author_id", "ref_table": "author", "ref_column": "id" }
            ]
        }
    }"#;

    #[test]
    fn test_open_in_dir_appends_extension() {
        let dir = tempfile::tempdir().unwrap();
        PaperDatabase::open_in_dir(dir.path(), "papers").unwrap();
        assert!(dir.path().join("papers.db").exists());

        PaperDatabase::open_in_dir(dir.path(), "notes.db").unwrap();
        assert!(dir.path().join("notes.db").exists());
        assert!(!dir.path().join("notes.db.db").exists());
    }

    #[test]
    fn test_create_database_and_summaries() {
        let mut db = PaperDatabase::open_in_memory().unwrap();
        db.create_database(&SCHEMA.parse().unwrap()).unwrap();
        db.connection()
            .insert("author", "1, 'Shannon'")
            .unwrap();

        let summaries = db.table_summaries().unwrap();
        assert_eq!(summaries.len(), 2);

        let author = summaries.iter().find(|s| s.table == "author").unwrap();
        assert_eq!(author.columns, 2);
        assert_eq!(author.rows, 1);
        assert!(author.foreign_keys.is_empty());

        let paper = summaries.iter().find(|s| s.table == "paper").unwrap();
        assert_eq!(paper.columns, 3);
        assert_eq!(paper.foreign_keys, "author_id -> author(id)");
    }

    #[test]
    fn test_create_database_from_config() {
        let home = tempfile::tempdir().unwrap();
        let cwd = tempfile::tempdir().unwrap();
        let config =
            PaperConfig::resolve(home.path().to_path_buf(), cwd.path().to_path_buf(), true)
                .unwrap();
        std::fs::create_dir_all(&config.config_dir).unwrap();
        std::fs::write(config.config_dir.join(SCHEMA_CONFIG_FILE), SCHEMA).unwrap();

        let mut db = PaperDatabase::open_with_config(&config, DEFAULT_DB_NAME).unwrap();
        db.create_database_from_config(&config).unwrap();
        assert!(config.db_path(DEFAULT_DB_NAME).exists());
        assert!(db.connection().table_exists("paper").unwrap());
    }

    #[test]
    fn test_missing_schema_config_is_fatal() {
        let home = tempfile::tempdir().unwrap();
        let cwd = tempfile::tempdir().unwrap();
        let config =
            PaperConfig::resolve(home.path().to_path_buf(), cwd.path().to_path_buf(), true)
                .unwrap();

        let mut db = PaperDatabase::open_in_memory().unwrap();
        assert!(db.create_database_from_config(&config).is_err());
        assert!(db.connection().table_names().unwrap().is_empty());
    }
}
