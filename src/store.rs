use crate::types::Value;
use rusqlite::{params_from_iter, types::Value as SqlValue, Connection};

/// The statements-and-rows interface the persistence layer runs against.
pub trait Store {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Runs a statement and returns the number of affected rows.
    fn execute(&mut self, sql: &str, params: &[Value]) -> Result<usize, Self::Error>;

    /// Id assigned to the most recently inserted row.
    fn last_insert_id(&self) -> i64;

    /// Runs a query and returns every row as raw column values.
    fn query(&mut self, sql: &str, params: &[Value]) -> Result<Vec<Vec<SqlValue>>, Self::Error>;

    fn table_names(&mut self) -> Result<Vec<String>, Self::Error>;
}

const SELECT_TABLE_NAMES: &str =
    "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%';";

impl Store for Connection {
    type Error = rusqlite::Error;

    fn execute(&mut self, sql: &str, params: &[Value]) -> rusqlite::Result<usize> {
        Connection::execute(self, sql, params_from_iter(params.iter()))
    }

    fn last_insert_id(&self) -> i64 {
        self.last_insert_rowid()
    }

    fn query(&mut self, sql: &str, params: &[Value]) -> rusqlite::Result<Vec<Vec<SqlValue>>> {
        let mut stmt = self.prepare_cached(sql)?;
        let width = stmt.column_count();
        let rows = stmt.query_map(params_from_iter(params.iter()), |row| {
            (0..width)
                .map(|index| row.get::<_, SqlValue>(index))
                .collect::<rusqlite::Result<Vec<_>>>()
        })?;

        let mut result = Vec::new();
        for row in rows {
            result.push(row?);
        }
        Ok(result)
    }

    fn table_names(&mut self) -> rusqlite::Result<Vec<String>> {
        let mut stmt = self.prepare_cached(SELECT_TABLE_NAMES)?;
        let names = stmt.query_map([], |row| row.get(0))?;
        names.collect()
    }
}
