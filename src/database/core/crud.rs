//! Single-statement CRUD helpers
//!
//! Thin wrappers that format a statement from its parts and forward it to
//! [`DatabaseConn::execute`] or [`DatabaseConn::query`]. The fragments are
//! inserted verbatim; nothing is quoted or validated.

use anyhow::Result;

use super::connection::{DatabaseConn, Row};

impl DatabaseConn {
    /// `CREATE TABLE <table_name> (<columns>)`
    pub fn create_table(&mut self, table_name: &str, columns: &str) -> Result<()> {
        self.execute(&format!("CREATE TABLE {} ({})", table_name, columns))?;
        Ok(())
    }

    /// `INSERT INTO <table_name> VALUES (<values>)`
    pub fn insert(&mut self, table_name: &str, values: &str) -> Result<()> {
        self.execute(&format!("INSERT INTO {} VALUES ({})", table_name, values))?;
        Ok(())
    }

    /// `SELECT <columns> FROM <table_name> [WHERE <condition>]`
    pub fn select(
        &mut self,
        table_name: &str,
        columns: &str,
        condition: Option<&str>,
    ) -> Result<Vec<Row>> {
        let sql = match condition {
            Some(cond) => format!("SELECT {} FROM {} WHERE {}", columns, table_name, cond),
            None => format!("SELECT {} FROM {}", columns, table_name),
        };
        self.query(&sql)
    }

    /// `UPDATE <table_name> SET <assignments> WHERE <condition>`
    pub fn update(&mut self, table_name: &str, assignments: &str, condition: &str) -> Result<usize> {
        self.execute(&format!(
            "UPDATE {} SET {} WHERE {}",
            table_name, assignments, condition
        ))
    }

    /// `DELETE FROM <table_name> WHERE <condition>`
    pub fn delete(&mut self, table_name: &str, condition: &str) -> Result<usize> {
        self.execute(&format!("DELETE FROM {} WHERE {}", table_name, condition))
    }

    /// `DROP TABLE <table_name>`
    pub fn drop_table(&mut self, table_name: &str) -> Result<()> {
        self.execute(&format!("DROP TABLE {}", table_name))?;
        Ok(())
    }
}
