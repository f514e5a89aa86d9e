//! Core database infrastructure
//!
//! This module provides the foundational database components:
//! - `DatabaseConn`: SQLite connection wrapper with lazy reconnect
//! - CRUD helpers on `DatabaseConn`
//! - `SchemaDescription`: typed form of `db-config.json`
//! - `SchemaMaterializer`: builds tables and foreign keys from a description

mod connection;
mod crud;
mod materializer;
mod schema;

pub use connection::{DatabaseConn, Row};
pub use materializer::{
    copy_windows, ColumnInfo, ForeignKeyInfo, SchemaMaterializer, TableSnapshot, COPY_BATCH_SIZE,
};
pub use schema::{
    ColumnSpec, RelationGroup, RelationSpec, SchemaDescription, TableSpec, SCHEMA_CONFIG_FILE,
};
