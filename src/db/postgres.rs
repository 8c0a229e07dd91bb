use std::fs::File;
use std::io::{Cursor, Read};

use anyhow::{Context, Result};

use super::{quote_ident, Backend, DatabaseType, ImportReport, Records};
use crate::connection::Credentials;
use crate::interchange::{csv_table_bytes, ImportSource};
use crate::logger::debug;
use crate::model::{Dataset, Table};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS kategorie (
    id SERIAL PRIMARY KEY,
    nazwa VARCHAR(100) NOT NULL,
    opis TEXT
);
CREATE TABLE IF NOT EXISTS produkty (
    id SERIAL PRIMARY KEY,
    nazwa VARCHAR(100) NOT NULL,
    opis TEXT,
    cena DECIMAL(10,2) NOT NULL CHECK (cena >= 0),
    stan_magazynowy INTEGER NOT NULL CHECK (stan_magazynowy >= 0),
    kategoria_id INTEGER,
    FOREIGN KEY (kategoria_id) REFERENCES kategorie(id)
);
CREATE TABLE IF NOT EXISTS klienci (
    id SERIAL PRIMARY KEY,
    imie VARCHAR(100) NOT NULL,
    nazwisko VARCHAR(100) NOT NULL,
    email VARCHAR(255) UNIQUE NOT NULL,
    telefon VARCHAR(20),
    adres TEXT
);
CREATE TABLE IF NOT EXISTS zamowienia (
    id SERIAL PRIMARY KEY,
    klient_id INTEGER,
    data_zamowienia DATE NOT NULL,
    status VARCHAR(50) CHECK (status IN ('nowe', 'w_realizacji', 'zrealizowane')),
    FOREIGN KEY (klient_id) REFERENCES klienci(id)
);
CREATE TABLE IF NOT EXISTS platnosci (
    id SERIAL PRIMARY KEY,
    zamowienie_id INTEGER,
    kwota DECIMAL(10,2) NOT NULL CHECK (kwota > 0),
    metoda_platnosci VARCHAR(50) NOT NULL,
    data_platnosci DATE NOT NULL,
    FOREIGN KEY (zamowienie_id) REFERENCES zamowienia(id)
);
"#;

pub struct Postgres {
    client: postgres::Client,
}

impl Postgres {
    pub fn connect(creds: &Credentials) -> Result<Self> {
        debug("postgres: connecting");
        let mut config = postgres::Config::new();
        config
            .dbname(&creds.db_name)
            .user(&creds.user_name)
            .password(&creds.password)
            .host(&creds.host_name)
            .port(creds.port_number);
        let client = config.connect(postgres::NoTls).with_context(|| {
            format!(
                "cannot connect to postgres at {}:{}",
                creds.host_name, creds.port_number
            )
        })?;
        debug("postgres: connected");
        Ok(Self { client })
    }
}

impl Backend for Postgres {
    fn kind(&self) -> DatabaseType {
        DatabaseType::Postgres
    }

    fn ensure_schema(&mut self) -> Result<()> {
        let mut tx = self.client.transaction()?;
        tx.batch_execute(SCHEMA)?;
        tx.commit()?;
        Ok(())
    }

    fn import(&mut self, source: &ImportSource) -> Result<ImportReport> {
        let mut tx = self.client.transaction()?;

        for table in Table::DELETE_ORDER {
            tx.execute(delete_sql(table), &[])
                .with_context(|| format!("failed to clear '{table}'"))?;
        }
        debug("postgres: tables cleared");

        // Every source is checked up front. CSV files are then streamed to
        // COPY as they are; JSON records are rendered to CSV in memory.
        let dataset = source.load()?;
        dataset.validate().context("refusing to import invalid data")?;
        let loaded = match source {
            ImportSource::Csv { .. } => None,
            ImportSource::Json { .. } => Some(dataset),
        };

        let mut report = ImportReport::default();
        for table in Table::INSERT_ORDER {
            let mut reader = open_table(source, loaded.as_ref(), table)?;
            let mut writer = tx.copy_in(copy_sql(table))?;
            std::io::copy(&mut reader, &mut writer)
                .with_context(|| format!("failed to stream '{table}'"))?;
            let rows = writer
                .finish()
                .with_context(|| format!("failed to import '{table}'"))?;
            debug(&format!("postgres: copied {rows} rows into {table}"));
            report.tables.push((table, rows));
        }

        // Explicit ids bypass the SERIAL sequences; move them past the data.
        for table in Table::INSERT_ORDER {
            tx.execute(reset_sequence_sql(table), &[])
                .with_context(|| format!("failed to reset the id sequence of '{table}'"))?;
        }

        tx.commit()?;
        Ok(report)
    }

    fn list_tables(&mut self) -> Result<Vec<String>> {
        let rows = self.client.query(
            "SELECT tablename
             FROM pg_tables
             WHERE schemaname = 'public'
               AND tablename NOT LIKE 'pg_%'
               AND tablename NOT LIKE 'sql_%'
             ORDER BY tablename",
            &[],
        )?;
        Ok(rows.into_iter().map(|r| r.get::<_, String>(0)).collect())
    }

    fn fetch_records(&mut self, table: &str) -> Result<Records> {
        // columns
        let cols_rows = self.client.query(
            "SELECT column_name
             FROM information_schema.columns
             WHERE table_schema = 'public' AND table_name = $1
             ORDER BY ordinal_position",
            &[&table],
        )?;
        let columns: Vec<String> = cols_rows
            .into_iter()
            .map(|r| r.get::<_, String>(0))
            .collect();
        if columns.is_empty() {
            anyhow::bail!("no such table: {table}");
        }

        // Cast each column to text for consistent string output
        let select_list = columns
            .iter()
            .map(|c| format!("{}::text", quote_ident(c)))
            .collect::<Vec<_>>()
            .join(", ");
        let q = format!("SELECT {} FROM {}", select_list, quote_ident(table));
        let rows = self.client.query(&q, &[])?;
        let mut rows_vec = Vec::with_capacity(rows.len());
        for r in rows {
            let mut row_vec = Vec::with_capacity(r.len());
            for i in 0..r.len() {
                let v: Option<String> = r.get(i);
                row_vec.push(v.unwrap_or_default());
            }
            rows_vec.push(row_vec);
        }

        Ok(Records {
            columns,
            rows: rows_vec,
        })
    }

    fn close(self: Box<Self>) -> Result<()> {
        self.client.close()?;
        Ok(())
    }
}

fn open_table(
    source: &ImportSource,
    loaded: Option<&Dataset>,
    table: Table,
) -> Result<Box<dyn Read>> {
    match (source, loaded) {
        (_, Some(dataset)) => Ok(Box::new(Cursor::new(csv_table_bytes(dataset, table)?))),
        (ImportSource::Csv { dir }, None) => {
            let path = dir.join(table.file_name());
            let file = File::open(&path)
                .with_context(|| format!("CSV file not found: {}", path.display()))?;
            Ok(Box::new(file))
        }
        (ImportSource::Json { .. }, None) => {
            anyhow::bail!("json source must be loaded before copying '{table}'")
        }
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

fn copy_sql(table: Table) -> &'static str {
    match table {
        Table::Categories => {
            "COPY kategorie (id, nazwa, opis) FROM STDIN (FORMAT CSV, HEADER TRUE)"
        }
        Table::Products => {
            "COPY produkty (id, nazwa, opis, cena, stan_magazynowy, kategoria_id) \
             FROM STDIN (FORMAT CSV, HEADER TRUE)"
        }
        Table::Customers => {
            "COPY klienci (id, imie, nazwisko, email, telefon, adres) \
             FROM STDIN (FORMAT CSV, HEADER TRUE)"
        }
        Table::Orders => {
            "COPY zamowienia (id, klient_id, data_zamowienia, status) \
             FROM STDIN (FORMAT CSV, HEADER TRUE)"
        }
        Table::Payments => {
            "COPY platnosci (id, zamowienie_id, kwota, metoda_platnosci, data_platnosci) \
             FROM STDIN (FORMAT CSV, HEADER TRUE)"
        }
    }
}

// setval(seq, max + 1, false) makes the next nextval() return max + 1,
// and 1 for an empty table.
fn reset_sequence_sql(table: Table) -> &'static str {
    match table {
        Table::Categories => {
            "SELECT setval(pg_get_serial_sequence('kategorie', 'id'), COALESCE(MAX(id), 0) + 1, false) FROM kategorie"
        }
        Table::Products => {
            "SELECT setval(pg_get_serial_sequence('produkty', 'id'), COALESCE(MAX(id), 0) + 1, false) FROM produkty"
        }
        Table::Customers => {
            "SELECT setval(pg_get_serial_sequence('klienci', 'id'), COALESCE(MAX(id), 0) + 1, false) FROM klienci"
        }
        Table::Orders => {
            "SELECT setval(pg_get_serial_sequence('zamowienia', 'id'), COALESCE(MAX(id), 0) + 1, false) FROM zamowienia"
        }
        Table::Payments => {
            "SELECT setval(pg_get_serial_sequence('platnosci', 'id'), COALESCE(MAX(id), 0) + 1, false) FROM platnosci"
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use tempfile::TempDir;

    use super::*;
    use crate::connection::load_credentials;
    use crate::generator::{generate, Profile};
    use crate::interchange::{export, Format, JSON_FILE_NAME};

    /// Connects using the credentials file named by `SKLEP_SEED_PG_TEST_DB`.
    /// The tests below are skipped when it is unset.
    fn test_db() -> Option<Postgres> {
        let path = std::env::var_os("SKLEP_SEED_PG_TEST_DB")?;
        let creds = load_credentials(std::path::Path::new(&path)).unwrap();
        Some(Postgres::connect(&creds).unwrap())
    }

    fn count(db: &mut Postgres, table: &str) -> i64 {
        let sql = format!("SELECT COUNT(*) FROM {table}");
        db.client.query_one(&sql, &[]).unwrap().get(0)
    }

    #[test]
    fn every_table_has_a_copy_statement_matching_its_columns() {
        for table in Table::INSERT_ORDER {
            let expected = format!("COPY {} ({})", table.name(), table.columns().join(", "));
            assert!(copy_sql(table).starts_with(&expected), "{table}");
            assert!(delete_sql(table).ends_with(table.name()));
            assert!(reset_sequence_sql(table).ends_with(&format!("FROM {}", table.name())));
        }
    }

    #[test]
    fn csv_import_round_trip() -> Result<()> {
        let Some(mut db) = test_db() else {
            return Ok(());
        };
        db.ensure_schema()?;
        db.ensure_schema()?;

        let dir = TempDir::new()?;
        let today = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
        let ds = generate(Profile::Full, today, &mut StdRng::seed_from_u64(1));
        export(Format::Csv, dir.path(), &ds)?;
        let report = db.import(&ImportSource::Csv { dir: dir.path() })?;

        let orders = ds.activity.orders.len() as i64;
        assert_eq!(report.rows(Table::Orders), Some(orders as u64));
        assert_eq!(count(&mut db, "zamowienia"), orders);
        assert_eq!(count(&mut db, "platnosci"), orders);

        let payments = db.fetch_records("platnosci")?;
        assert_eq!(payments.rows.len(), ds.activity.payments.len());
        Ok(())
    }

    #[test]
    fn failed_import_leaves_tables_untouched() -> Result<()> {
        let Some(mut db) = test_db() else {
            return Ok(());
        };
        db.ensure_schema()?;

        let dir = TempDir::new()?;
        let today = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
        export(
            Format::Csv,
            dir.path(),
            &generate(Profile::Full, today, &mut StdRng::seed_from_u64(1)),
        )?;
        db.import(&ImportSource::Csv { dir: dir.path() })?;
        let before = db.fetch_records("zamowienia")?.rows;

        export(
            Format::Csv,
            dir.path(),
            &generate(Profile::Full, today, &mut StdRng::seed_from_u64(2)),
        )?;
        std::fs::write(
            dir.path().join("platnosci.csv"),
            "id,zamowienie_id,kwota,metoda_platnosci,data_platnosci\n1,999999,10.00,karta,2024-01-01\n",
        )?;
        assert!(db.import(&ImportSource::Csv { dir: dir.path() }).is_err());

        assert_eq!(db.fetch_records("zamowienia")?.rows, before);
        Ok(())
    }

    #[test]
    fn csv_payment_before_its_order_is_rejected() -> Result<()> {
        let Some(mut db) = test_db() else {
            return Ok(());
        };
        db.ensure_schema()?;

        let dir = TempDir::new()?;
        let today = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
        let ds = generate(Profile::Full, today, &mut StdRng::seed_from_u64(1));
        export(Format::Csv, dir.path(), &ds)?;
        db.import(&ImportSource::Csv { dir: dir.path() })?;
        let before = db.fetch_records("platnosci")?.rows;

        let mut early = generate(Profile::Full, today, &mut StdRng::seed_from_u64(2));
        let order_id = early.activity.payments[0].order_id;
        let order_date = early
            .activity
            .orders
            .iter()
            .find(|o| o.id == order_id)
            .unwrap()
            .order_date;
        early.activity.payments[0].payment_date =
            order_date.checked_sub_days(chrono::Days::new(365)).unwrap();
        export(Format::Csv, dir.path(), &early)?;

        let err = db
            .import(&ImportSource::Csv { dir: dir.path() })
            .unwrap_err();
        assert!(format!("{err:#}").contains("before its order date"), "{err:#}");
        assert_eq!(db.fetch_records("platnosci")?.rows, before);
        Ok(())
    }

    #[test]
    fn json_import_round_trip() -> Result<()> {
        let Some(mut db) = test_db() else {
            return Ok(());
        };
        db.ensure_schema()?;

        let dir = TempDir::new()?;
        let today = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
        let ds = generate(Profile::Compact, today, &mut StdRng::seed_from_u64(2));
        export(Format::Json, dir.path(), &ds)?;
        let path = dir.path().join(JSON_FILE_NAME);
        let report = db.import(&ImportSource::Json {
            path: &path,
            activity: &ds.activity,
        })?;

        let orders = ds.activity.orders.len() as i64;
        assert_eq!(report.rows(Table::Customers), Some(5));
        assert_eq!(count(&mut db, "klienci"), 5);
        assert_eq!(count(&mut db, "produkty"), 10);
        assert_eq!(count(&mut db, "zamowienia"), orders);
        assert_eq!(count(&mut db, "platnosci"), orders);

        let categories = db.fetch_records("kategorie")?;
        assert_eq!(categories.rows[0][1], ds.catalog.categories[0].name);
        Ok(())
    }
}
