#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

//! Paper - a personal paper library manager
//!
//! Paper keeps a library of papers in a local SQLite database whose schema
//! is not compiled in but declared in a `db-config.json` file. It can be
//! used as both a command-line application and a library.
//!
//! # Feature Flags
//!
//! | Feature | Description | Key Dependencies |
//! |---------|-------------|------------------|
//! | `display` | Table formatting with `tabled` | `tabled` |
//! | `cli` | CLI binary | `clap`, `tracing-subscriber` |
//!
//! # Architecture
//!
//! - **[`config`]**: resolution of the library and config directories
//! - **[`database`]**: SQLite connection, CRUD helpers, schema description
//!   and the schema materializer
//! - **[`output`]**: output formats for the CLI
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use paper::{PaperConfig, PaperDatabase, DEFAULT_DB_NAME};
//!
//! let config = PaperConfig::new(false)?;
//! let mut db = PaperDatabase::open_with_config(&config, DEFAULT_DB_NAME)?;
//!
//! // Create every table and foreign key declared in <config>/db-config.json
//! db.create_database_from_config(&config)?;
//! ```

pub mod config;
pub mod database;
pub mod output;

pub use crate::config::{db_file_name, PaperConfig, APP_NAME, DB_EXTENSION, LOCATION_FILE};

pub use database::{
    DatabaseConn, PaperDatabase, RelationSpec, Row, SchemaDescription, SchemaMaterializer,
    TableSnapshot, TableSummary, COPY_BATCH_SIZE, DEFAULT_DB_NAME, SCHEMA_CONFIG_FILE,
};

pub use output::OutputFormat;
