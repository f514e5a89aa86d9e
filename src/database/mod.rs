//! Database module
//!
//! This module provides all database functionality for paper, organized into:
//!
//! - **core**: connection wrapper, CRUD helpers, schema description and the
//!   schema materializer
//! - **paper**: the paper library database built on top of core
//!
//! # Architecture
//!
//! ```text
//! database/
//! ├── core/             # Foundation
//! │   ├── connection    # SQLite DatabaseConn wrapper
//! │   ├── crud          # create/insert/select/update/delete/drop helpers
//! │   ├── schema        # db-config.json as typed SchemaDescription
//! │   └── materializer  # tables + foreign keys (rebuild-and-swap)
//! │
//! └── paper/            # PaperDatabase, one file per library database
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use paper::database::{PaperDatabase, SchemaDescription};
//!
//! let schema = SchemaDescription::from_file("config/db-config.json")?;
//! let mut db = PaperDatabase::open_in_dir("library/db", "untitled")?;
//! db.create_database(&schema)?;
//!
//! let rows = db.connection().select("book", "title", Some("author_id = 1"))?;
//! ```

pub mod core;
pub mod paper;

pub use self::core::{
    copy_windows, ColumnInfo, ColumnSpec, DatabaseConn, ForeignKeyInfo, RelationGroup,
    RelationSpec, Row, SchemaDescription, SchemaMaterializer, TableSnapshot, TableSpec,
    COPY_BATCH_SIZE, SCHEMA_CONFIG_FILE,
};

pub use self::paper::{PaperDatabase, TableSummary, DEFAULT_DB_NAME};
