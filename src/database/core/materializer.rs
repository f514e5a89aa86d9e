//! Schema materialization
//!
//! Turns a [`SchemaDescription`] into live tables. SQLite cannot add a
//! constraint to an existing table, so every relation is applied by
//! rebuilding the source table:
//!
//! 1. disable foreign key enforcement
//! 2. begin a transaction
//! 3. snapshot the table definition
//! 4. create `<table>_new` from the stored `CREATE TABLE` text plus the new
//!    foreign key, so every existing column and table constraint is kept
//! 5. copy rows in windows of [`COPY_BATCH_SIZE`]
//! 6. drop the original table
//! 7. rename `<table>_new` to the original name and recreate its indexes
//!    and triggers
//! 8. commit
//! 9. re-enable foreign key enforcement
//!
//! Enforcement has to stay off until after the rename, otherwise the
//! intermediate state is validated against the half-built `_new` table.

use anyhow::{anyhow, bail, Context, Result};
use rusqlite::Connection;
use std::collections::BTreeMap;
use tracing::{debug, info};

use super::connection::DatabaseConn;
use super::schema::{RelationSpec, SchemaDescription};

/// Number of rows copied per `INSERT .. SELECT` while rebuilding a table
pub const COPY_BATCH_SIZE: u64 = 5;

/// Column metadata as reported by `PRAGMA table_info`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    pub name: String,
    pub declared_type: String,
    pub not_null: bool,
    pub default_value: Option<String>,
    /// 1-based position in the primary key, 0 if not part of it
    pub primary_key: u32,
}

/// An existing foreign key as reported by `PRAGMA foreign_key_list`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKeyInfo {
    pub columns: Vec<String>,
    pub ref_table: String,
    /// Empty when the key references the parent's primary key implicitly
    pub ref_columns: Vec<String>,
    pub on_update: String,
    pub on_delete: String,
}

/// Transient view of a live table, taken right before it is rebuilt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSnapshot {
    pub table: String,
    /// `CREATE TABLE` statement as stored in `sqlite_master`
    pub create_sql: String,
    pub columns: Vec<ColumnInfo>,
    pub foreign_keys: Vec<ForeignKeyInfo>,
    /// `CREATE INDEX` / `CREATE TRIGGER` statements attached to the table
    pub dependents: Vec<String>,
}

impl TableSnapshot {
    /// Introspect `table` on the given connection
    pub fn capture(conn: &Connection, table: &str) -> Result<Self> {
        let create_sql: String = match conn.query_row(
            "SELECT sql FROM sqlite_master WHERE type='table' AND name=?1 COLLATE NOCASE",
            [table],
            |row| row.get(0),
        ) {
            Ok(sql) => sql,
            Err(rusqlite::Error::QueryReturnedNoRows) => bail!("table '{}' does not exist", table),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read definition of '{}'", table))
            }
        };

        // auto-indexes have no sql; they come back with the table definition
        let mut stmt = conn
            .prepare(
                "SELECT sql FROM sqlite_master \
                 WHERE type IN ('index', 'trigger') AND tbl_name=?1 COLLATE NOCASE \
                 AND sql IS NOT NULL ORDER BY rowid",
            )
            .with_context(|| format!("Failed to read indexes of '{}'", table))?;
        let dependents = stmt
            .query_map([table], |row| row.get(0))
            .with_context(|| format!("Failed to read indexes of '{}'", table))?
            .collect::<rusqlite::Result<Vec<String>>>()
            .with_context(|| format!("Failed to read indexes of '{}'", table))?;

        let mut stmt = conn
            .prepare(&format!("PRAGMA table_info({})", table))
            .with_context(|| format!("Failed to read columns of '{}'", table))?;
        let columns = stmt
            .query_map([], |row| {
                Ok(ColumnInfo {
                    name: row.get(1)?,
                    declared_type: row.get(2)?,
                    not_null: row.get::<_, i64>(3)? != 0,
                    default_value: row.get(4)?,
                    primary_key: row.get(5)?,
                })
            })
            .with_context(|| format!("Failed to read columns of '{}'", table))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .with_context(|| format!("Failed to read columns of '{}'", table))?;

        if columns.is_empty() {
            bail!("table '{}' does not exist", table);
        }

        // (id, seq) ordered so multi-column keys come out in column order
        let mut stmt = conn
            .prepare(&format!("PRAGMA foreign_key_list({})", table))
            .with_context(|| format!("Failed to read foreign keys of '{}'", table))?;
        let fk_rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, Option<String>>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, String>(6)?,
                ))
            })
            .with_context(|| format!("Failed to read foreign keys of '{}'", table))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .with_context(|| format!("Failed to read foreign keys of '{}'", table))?;

        let mut grouped: BTreeMap<i64, Vec<_>> = BTreeMap::new();
        for row in fk_rows {
            grouped.entry(row.0).or_default().push(row);
        }

        let foreign_keys = grouped
            .into_values()
            .map(|mut rows| {
                rows.sort_by_key(|r| r.1);
                let (_, _, ref_table, _, _, on_update, on_delete) = rows[0].clone();
                ForeignKeyInfo {
                    columns: rows.iter().map(|r| r.3.clone()).collect(),
                    ref_table,
                    ref_columns: rows.iter().filter_map(|r| r.4.clone()).collect(),
                    on_update,
                    on_delete,
                }
            })
            .collect();

        Ok(TableSnapshot {
            table: table.to_string(),
            create_sql,
            columns,
            foreign_keys,
            dependents,
        })
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    /// `CREATE TABLE <new_table>` with this table's definition plus one
    /// more table constraint
    ///
    /// The column list is taken verbatim from the stored statement, so
    /// UNIQUE, CHECK, COLLATE, AUTOINCREMENT and existing foreign keys
    /// survive the rebuild. Table options after the list are kept as well.
    pub fn rebuild_statement(&self, new_table: &str, constraint: &str) -> Result<String> {
        let (open, close) = column_list_bounds(&self.create_sql).ok_or_else(|| {
            anyhow!(
                "cannot parse definition of '{}': {}",
                self.table,
                self.create_sql
            )
        })?;
        Ok(format!(
            "CREATE TABLE {} {}, {}{}",
            new_table,
            &self.create_sql[open..close],
            constraint,
            &self.create_sql[close..]
        ))
    }
}

/// Byte positions of the outer `(` and its matching `)` in a `CREATE TABLE`
///
/// Parentheses inside quotes, bracketed identifiers and comments are skipped.
fn column_list_bounds(sql: &str) -> Option<(usize, usize)> {
    let mut chars = sql.char_indices().peekable();
    let mut open = None;
    let mut depth = 0usize;

    while let Some((i, ch)) = chars.next() {
        match ch {
            '\'' | '"' | '`' | '[' => {
                let end = if ch == '[' { ']' } else { ch };
                // a doubled quote reads as close-then-open, which is equivalent
                for (_, c) in chars.by_ref() {
                    if c == end {
                        break;
                    }
                }
            }
            '-' if matches!(chars.peek(), Some((_, '-'))) => {
                for (_, c) in chars.by_ref() {
                    if c == '\n' {
                        break;
                    }
                }
            }
            '/' if matches!(chars.peek(), Some((_, '*'))) => {
                chars.next();
                let mut prev = ' ';
                for (_, c) in chars.by_ref() {
                    if prev == '*' && c == '/' {
                        break;
                    }
                    prev = c;
                }
            }
            '(' => {
                if depth == 0 {
                    open = Some(i);
                }
                depth += 1;
            }
            ')' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return open.map(|o| (o, i));
                }
            }
            _ => {}
        }
    }
    None
}

/// Offsets of the `LIMIT/OFFSET` windows covering `[0, total_rows)`
pub fn copy_windows(total_rows: u64) -> impl Iterator<Item = u64> {
    (0..total_rows).step_by(COPY_BATCH_SIZE as usize)
}

/// Builds a fully constrained schema from a [`SchemaDescription`]
///
/// Borrows the connection for the whole bootstrap. There is no duplicate
/// table guard and no rollback across the whole call: if a later step fails,
/// whatever was committed before stays in the database.
pub struct SchemaMaterializer<'a> {
    db: &'a mut DatabaseConn,
}

impl<'a> SchemaMaterializer<'a> {
    pub fn new(db: &'a mut DatabaseConn) -> Self {
        Self { db }
    }

    /// Create every table, then add every relation
    pub fn create_database(&mut self, schema: &SchemaDescription) -> Result<()> {
        self.create_tables(schema)?;
        self.create_relations(schema)?;
        info!(
            "created {} tables and {} relations",
            schema.tables.len(),
            schema.all_relations().count()
        );
        Ok(())
    }

    /// Table pass: one `CREATE TABLE` per declared table, in order
    pub fn create_tables(&mut self, schema: &SchemaDescription) -> Result<()> {
        for table in &schema.tables {
            info!("creating table {}", table.name);
            self.db
                .execute(&table.create_statement())
                .with_context(|| format!("Failed to create table '{}'", table.name))?;
        }
        Ok(())
    }

    /// Relation pass: every relation of every group, in order
    pub fn create_relations(&mut self, schema: &SchemaDescription) -> Result<()> {
        for group in &schema.relations {
            debug!("applying relation group {}", group.name);
            for relation in &group.relations {
                self.add_foreign_key(relation)?;
            }
        }
        Ok(())
    }

    /// Add one foreign key by rebuilding `relation.table`
    ///
    /// On failure the rebuild transaction is rolled back, but enforcement is
    /// left off on the live connection. Restore it with
    /// [`DatabaseConn::set_foreign_keys`] or by reconnecting.
    pub fn add_foreign_key(&mut self, relation: &RelationSpec) -> Result<()> {
        let conn = self.db.connect()?;
        check_relation(conn, relation)?;

        info!(
            "adding foreign key {}.{} -> {}.{}",
            relation.table, relation.column, relation.ref_table, relation.ref_column
        );
        rebuild_with_foreign_key(conn, relation).with_context(|| {
            format!(
                "Failed to add foreign key {}.{} -> {}.{}",
                relation.table, relation.column, relation.ref_table, relation.ref_column
            )
        })
    }
}

/// Both ends of the relation must be existing columns of existing tables
fn check_relation(conn: &Connection, relation: &RelationSpec) -> Result<()> {
    let source = TableSnapshot::capture(conn, &relation.table)
        .with_context(|| format!("relation source table '{}' not found", relation.table))?;
    if !source.has_column(&relation.column) {
        return Err(anyhow!(
            "relation column '{}.{}' not found",
            relation.table,
            relation.column
        ));
    }

    let target = TableSnapshot::capture(conn, &relation.ref_table).with_context(|| {
        format!("relation target table '{}' not found", relation.ref_table)
    })?;
    if !target.has_column(&relation.ref_column) {
        return Err(anyhow!(
            "relation column '{}.{}' not found",
            relation.ref_table,
            relation.ref_column
        ));
    }

    Ok(())
}

fn rebuild_with_foreign_key(conn: &Connection, relation: &RelationSpec) -> Result<()> {
    let table = relation.table.as_str();
    let new_table = format!("{}_new", table);

    conn.execute("PRAGMA foreign_keys = OFF", [])
        .context("Failed to disable foreign keys")?;

    let tx = conn
        .unchecked_transaction()
        .context("Failed to begin transaction")?;

    let snapshot = TableSnapshot::capture(&tx, table)?;

    let create_sql = snapshot.rebuild_statement(&new_table, &relation.foreign_key_clause())?;
    debug!("{}", create_sql);
    tx.execute(&create_sql, [])
        .with_context(|| format!("Failed to create '{}'", new_table))?;

    let column_list = snapshot.column_names().join(", ");
    let total_rows: u64 = tx
        .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
            row.get(0)
        })
        .with_context(|| format!("Failed to count rows of '{}'", table))?;

    for offset in copy_windows(total_rows) {
        tx.execute(
            &format!(
                "INSERT INTO {new} ({cols}) SELECT {cols} FROM {old} LIMIT {limit} OFFSET {offset}",
                new = new_table,
                cols = column_list,
                old = table,
                limit = COPY_BATCH_SIZE,
                offset = offset,
            ),
            [],
        )
        .with_context(|| format!("Failed to copy rows into '{}'", new_table))?;
    }
    debug!("copied {} rows from {} into {}", total_rows, table, new_table);

    tx.execute(&format!("DROP TABLE {}", table), [])
        .with_context(|| format!("Failed to drop '{}'", table))?;

    tx.execute(&format!("ALTER TABLE {} RENAME TO {}", new_table, table), [])
        .with_context(|| format!("Failed to rename '{}' to '{}'", new_table, table))?;

    for sql in &snapshot.dependents {
        tx.execute_batch(sql)
            .with_context(|| format!("Failed to recreate '{}' on '{}'", sql, table))?;
    }

    tx.commit().context("Failed to commit table rebuild")?;

    conn.execute("PRAGMA foreign_keys = ON", [])
        .context("Failed to re-enable foreign keys")?;

    Ok(())
}
