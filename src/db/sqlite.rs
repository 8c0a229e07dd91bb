use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::types::ValueRef;
use rusqlite::{params, Connection as SqliteConn, Transaction};

use super::{quote_ident, Backend, DatabaseType, ImportReport, Records};
use crate::interchange::ImportSource;
use crate::logger::debug;
use crate::model::{Dataset, Table};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS kategorie (
    id INTEGER PRIMARY KEY,
    nazwa TEXT NOT NULL,
    opis TEXT
);
CREATE TABLE IF NOT EXISTS produkty (
    id INTEGER PRIMARY KEY,
    nazwa TEXT NOT NULL,
    opis TEXT,
    cena REAL NOT NULL CHECK (cena >= 0),
    stan_magazynowy INTEGER NOT NULL CHECK (stan_magazynowy >= 0),
    kategoria_id INTEGER,
    FOREIGN KEY (kategoria_id) REFERENCES kategorie(id)
);
CREATE TABLE IF NOT EXISTS klienci (
    id INTEGER PRIMARY KEY,
    imie TEXT NOT NULL,
    nazwisko TEXT NOT NULL,
    email TEXT UNIQUE NOT NULL,
    telefon TEXT,
    adres TEXT
);
CREATE TABLE IF NOT EXISTS zamowienia (
    id INTEGER PRIMARY KEY,
    klient_id INTEGER,
    data_zamowienia DATE NOT NULL,
    status TEXT CHECK (status IN ('nowe', 'w_realizacji', 'zrealizowane')),
    FOREIGN KEY (klient_id) REFERENCES klienci(id)
);
CREATE TABLE IF NOT EXISTS platnosci (
    id INTEGER PRIMARY KEY,
    zamowienie_id INTEGER,
    kwota REAL NOT NULL CHECK (kwota > 0),
    metoda_platnosci TEXT NOT NULL,
    data_platnosci DATE NOT NULL,
    FOREIGN KEY (zamowienie_id) REFERENCES zamowienia(id)
);
"#;

pub struct Sqlite {
    conn: SqliteConn,
}

impl Sqlite {
    pub fn open(path: &Path) -> Result<Self> {
        debug("sqlite: opening file");
        let conn = SqliteConn::open(path)
            .with_context(|| format!("cannot open sqlite database {}", path.display()))?;
        debug("sqlite: opened");
        Self::with_connection(conn)
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(SqliteConn::open_in_memory()?)
    }

    fn with_connection(conn: SqliteConn) -> Result<Self> {
        // sqlite leaves foreign keys unenforced unless asked per connection
        conn.pragma_update(None, "foreign_keys", true)?;
        Ok(Self { conn })
    }
}

impl Backend for Sqlite {
    fn kind(&self) -> DatabaseType {
        DatabaseType::Sqlite
    }

    fn ensure_schema(&mut self) -> Result<()> {
        let tx = self.conn.transaction()?;
        tx.execute_batch(SCHEMA)?;
        tx.commit()?;
        Ok(())
    }

    fn import(&mut self, source: &ImportSource) -> Result<ImportReport> {
        let tx = self.conn.transaction()?;

        for table in Table::DELETE_ORDER {
            tx.execute(delete_sql(table), [])
                .with_context(|| format!("failed to clear '{table}'"))?;
        }
        debug("sqlite: tables cleared");

        let dataset = source.load()?;
        dataset.validate().context("refusing to import invalid data")?;

        let mut report = ImportReport::default();
        for table in Table::INSERT_ORDER {
            let rows = insert_table(&tx, &dataset, table)
                .with_context(|| format!("failed to import '{table}'"))?;
            debug(&format!("sqlite: inserted {rows} rows into {table}"));
            report.tables.push((table, rows));
        }

        tx.commit()?;
        Ok(report)
    }

    fn list_tables(&mut self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut tables = Vec::new();
        for r in rows {
            tables.push(r?);
        }
        Ok(tables)
    }

    fn fetch_records(&mut self, table: &str) -> Result<Records> {
        // columns
        let mut col_stmt = self
            .conn
            .prepare("SELECT name FROM pragma_table_info(?1) ORDER BY cid")?;
        let col_iter = col_stmt.query_map([table], |row| row.get::<_, String>(0))?;
        let mut columns = Vec::new();
        for c in col_iter {
            columns.push(c?);
        }
        if columns.is_empty() {
            anyhow::bail!("no such table: {table}");
        }

        // rows: read ValueRef per column and stringify conservatively
        let mut rows_vec: Vec<Vec<String>> = Vec::new();
        let q = format!("SELECT * FROM {}", quote_ident(table));
        let mut stmt = self.conn.prepare(&q)?;
        let col_count = stmt.column_count();
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            let mut v = Vec::with_capacity(col_count);
            for i in 0..col_count {
                let s = match row.get_ref(i)? {
                    ValueRef::Null => String::new(),
                    ValueRef::Integer(i) => i.to_string(),
                    ValueRef::Real(f) => f.to_string(),
                    ValueRef::Text(t) => String::from_utf8_lossy(t).into_owned(),
                    ValueRef::Blob(b) => format!("<blob {} bytes>", b.len()),
                };
                v.push(s);
            }
            rows_vec.push(v);
        }

        Ok(Records {
            columns,
            rows: rows_vec,
        })
    }

    fn close(self: Box<Self>) -> Result<()> {
        self.conn.close().map_err(|(_, err)| err)?;
        Ok(())
    }
}

fn delete_sql(table: Table) -> &'static str {
    match table {
        Table::Categories => "DELETE FROM kategorie",
        Table::Products => "DELETE FROM produkty",
        Table::Customers => "DELETE FROM klienci",
        Table::Orders => "DELETE FROM zamowienia",
        Table::Payments => "DELETE FROM platnosci",
    }
}

fn insert_sql(table: Table) -> &'static str {
    match table {
        Table::Categories => "INSERT INTO kategorie (id, nazwa, opis) VALUES (?1, ?2, ?3)",
        Table::Products => {
            "INSERT INTO produkty (id, nazwa, opis, cena, stan_magazynowy, kategoria_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)"
        }
        Table::Customers => {
            "INSERT INTO klienci (id, imie, nazwisko, email, telefon, adres)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)"
        }
        Table::Orders => {
            "INSERT INTO zamowienia (id, klient_id, data_zamowienia, status)
             VALUES (?1, ?2, ?3, ?4)"
        }
        Table::Payments => {
            "INSERT INTO platnosci (id, zamowienie_id, kwota, metoda_platnosci, data_platnosci)
             VALUES (?1, ?2, ?3, ?4, ?5)"
        }
    }
}

fn insert_table(tx: &Transaction<'_>, dataset: &Dataset, table: Table) -> Result<u64> {
    let mut stmt = tx.prepare_cached(insert_sql(table))?;
    let mut rows = 0;
    match table {
        Table::Categories => {
            for c in &dataset.catalog.categories {
                rows += stmt.execute(params![c.id, c.name, c.description])?;
            }
        }
        Table::Products => {
            for p in &dataset.catalog.products {
                rows += stmt.execute(params![
                    p.id,
                    p.name,
                    p.description,
                    p.price,
                    p.stock_quantity,
                    p.category_id
                ])?;
            }
        }
        Table::Customers => {
            for c in &dataset.catalog.customers {
                rows += stmt.execute(params![
                    c.id,
                    c.first_name,
                    c.last_name,
                    c.email,
                    c.phone,
                    c.address
                ])?;
            }
        }
        Table::Orders => {
            for o in &dataset.activity.orders {
                rows += stmt.execute(params![
                    o.id,
                    o.customer_id,
                    o.order_date.to_string(),
                    o.status.as_str()
                ])?;
            }
        }
        Table::Payments => {
            for p in &dataset.activity.payments {
                rows += stmt.execute(params![
                    p.id,
                    p.order_id,
                    p.amount,
                    p.payment_method.as_str(),
                    p.payment_date.to_string()
                ])?;
            }
        }
    }
    Ok(rows as u64)
}
