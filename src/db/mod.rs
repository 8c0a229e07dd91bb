mod postgres;
mod sqlite;

use anyhow::Result;

use crate::connection::Connection;
use crate::interchange::ImportSource;
use crate::model::Table;

pub use self::postgres::Postgres;
pub use self::sqlite::Sqlite;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseType {
    Postgres,
    Sqlite,
}

impl DatabaseType {
    pub fn display_name(&self) -> &'static str {
        match self {
            DatabaseType::Postgres => "PostgreSQL",
            DatabaseType::Sqlite => "SQLite",
        }
    }
}

/// One open database. The pipeline holds exactly one of these and drives
/// every step through it.
pub trait Backend {
    fn kind(&self) -> DatabaseType;

    /// Creates the five tables if they are missing. Runs in one transaction.
    fn ensure_schema(&mut self) -> Result<()>;

    /// Replaces the contents of all five tables with the records from
    /// `source`. Either every table is replaced or nothing changes.
    fn import(&mut self, source: &ImportSource) -> Result<ImportReport>;

    /// User tables, sorted by name.
    fn list_tables(&mut self) -> Result<Vec<String>>;

    fn fetch_records(&mut self, table: &str) -> Result<Records>;

    fn close(self: Box<Self>) -> Result<()>;
}

pub struct DB;

impl DB {
    pub fn open(conn: &Connection) -> Result<Box<dyn Backend>> {
        match conn {
            Connection::Postgres(creds) => Ok(Box::new(Postgres::connect(creds)?)),
            Connection::Sqlite { path } => Ok(Box::new(Sqlite::open(path)?)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Records {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>, // each inner Vec is a row of stringified values
}

/// Rows inserted per table, in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportReport {
    pub tables: Vec<(Table, u64)>,
}

impl ImportReport {
    pub fn rows(&self, table: Table) -> Option<u64> {
        self.tables
            .iter()
            .find(|(t, _)| *t == table)
            .map(|(_, n)| *n)
    }
}

/// Double-quotes an identifier taken from the catalog.
fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
