//! Declarative schema description
//!
//! The schema of a paper database is not compiled in; it is read from a
//! `db-config.json` file with two sections:
//!
//! ```json
//! {
//!   "tables": {
//!     "author": { "id": "INTEGER PRIMARY KEY", "name": "TEXT" },
//!     "book": { "id": "INTEGER PRIMARY KEY", "title": "TEXT", "author_id": "INTEGER" }
//!   },
//!   "relations": {
//!     "authorship": [
//!       { "table": "book", "column": "author_id", "ref_table": "author", "ref_column": "id" }
//!     ]
//!   }
//! }
//! ```
//!
//! Declaration order of tables, columns, groups and relations is kept.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;
use std::str::FromStr;

/// File name of the schema description inside the config directory
pub const SCHEMA_CONFIG_FILE: &str = "db-config.json";

/// One column declaration: name plus its SQL type/constraint string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: String,
    pub definition: String,
}

/// One table declaration, columns in declaration order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSpec {
    pub name: String,
    pub columns: Vec<ColumnSpec>,
}

impl TableSpec {
    /// Column clause for `CREATE TABLE`, e.g. `id INTEGER, name TEXT`
    pub fn column_clause(&self) -> String {
        self.columns
            .iter()
            .map(|c| format!("{} {}", c.name, c.definition))
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn create_statement(&self) -> String {
        format!("CREATE TABLE {} ({})", self.name, self.column_clause())
    }
}

/// A foreign key intent: `table.column` references `ref_table.ref_column`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationSpec {
    pub table: String,
    pub column: String,
    pub ref_table: String,
    pub ref_column: String,
}

impl RelationSpec {
    pub fn new(table: &str, column: &str, ref_table: &str, ref_column: &str) -> Self {
        Self {
            table: table.to_string(),
            column: column.to_string(),
            ref_table: ref_table.to_string(),
            ref_column: ref_column.to_string(),
        }
    }

    /// Table constraint clause, e.g. `FOREIGN KEY (author_id) REFERENCES author (id)`
    pub fn foreign_key_clause(&self) -> String {
        format!(
            "FOREIGN KEY ({}) REFERENCES {} ({})",
            self.column, self.ref_table, self.ref_column
        )
    }
}

/// A named, ordered group of relations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationGroup {
    pub name: String,
    pub relations: Vec<RelationSpec>,
}

/// Typed form of `db-config.json`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawSchemaDescription")]
pub struct SchemaDescription {
    pub tables: Vec<TableSpec>,
    pub relations: Vec<RelationGroup>,
}

/// JSON shape as written on disk; maps keep insertion order (`preserve_order`)
#[derive(Deserialize)]
struct RawSchemaDescription {
    tables: Map<String, Value>,
    #[serde(default)]
    relations: Map<String, Value>,
}

impl TryFrom<RawSchemaDescription> for SchemaDescription {
    type Error = anyhow::Error;

    fn try_from(raw: RawSchemaDescription) -> Result<Self> {
        let mut tables = Vec::with_capacity(raw.tables.len());
        for (table_name, columns) in raw.tables {
            let columns = columns
                .as_object()
                .ok_or_else(|| anyhow!("table '{}' must map column names to types", table_name))?;
            let columns = columns
                .iter()
                .map(|(name, definition)| {
                    definition
                        .as_str()
                        .map(|d| ColumnSpec {
                            name: name.clone(),
                            definition: d.to_string(),
                        })
                        .ok_or_else(|| {
                            anyhow!("type of column '{}.{}' must be a string", table_name, name)
                        })
                })
                .collect::<Result<Vec<_>>>()?;
            tables.push(TableSpec {
                name: table_name,
                columns,
            });
        }

        let mut relations = Vec::with_capacity(raw.relations.len());
        for (group_name, specs) in raw.relations {
            let specs: Vec<RelationSpec> = serde_json::from_value(specs)
                .map_err(|e| anyhow!("invalid relation group '{}': {}", group_name, e))?;
            relations.push(RelationGroup {
                name: group_name,
                relations: specs,
            });
        }

        Ok(SchemaDescription { tables, relations })
    }
}

impl FromStr for SchemaDescription {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        serde_json::from_str(s).context("Failed to parse schema description")
    }
}

impl SchemaDescription {
    /// Load a schema description from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read schema config '{}'", path.display()))?;
        content
            .parse()
            .with_context(|| format!("Malformed schema config '{}'", path.display()))
    }

    pub fn table(&self, name: &str) -> Option<&TableSpec> {
        self.tables.iter().find(|t| t.name == name)
    }

    /// All relations across groups, in declaration order
    pub fn all_relations(&self) -> impl Iterator<Item = &RelationSpec> {
        self.relations.iter().flat_map(|g| g.relations.iter())
    }
}
