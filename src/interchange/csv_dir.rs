use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::model::{Activity, Catalog, Dataset, Table};

pub fn export(dir: &Path, dataset: &Dataset) -> Result<Vec<PathBuf>> {
    let mut written = Vec::with_capacity(Table::INSERT_ORDER.len());
    for table in Table::INSERT_ORDER {
        let path = dir.join(table.file_name());
        let file = File::create(&path)
            .with_context(|| format!("failed to create {}", path.display()))?;
        write_table(file, dataset, table)
            .with_context(|| format!("failed to write {}", path.display()))?;
        written.push(path);
    }
    Ok(written)
}

/// Renders one table as CSV, header included, into memory.
pub fn table_bytes(dataset: &Dataset, table: Table) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    write_table(&mut buf, dataset, table)?;
    Ok(buf)
}

fn write_table<W: Write>(out: W, dataset: &Dataset, table: Table) -> Result<()> {
    match table {
        Table::Categories => write_records(out, table, &dataset.catalog.categories),
        Table::Products => write_records(out, table, &dataset.catalog.products),
        Table::Customers => write_records(out, table, &dataset.catalog.customers),
        Table::Orders => write_records(out, table, &dataset.activity.orders),
        Table::Payments => write_records(out, table, &dataset.activity.payments),
    }
}

fn write_records<W: Write, T: Serialize>(out: W, table: Table, records: &[T]) -> Result<()> {
    // The header is written by hand so that empty tables still get one.
    let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(out);
    writer.write_record(table.columns())?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn read_dataset(dir: &Path) -> Result<Dataset> {
    Ok(Dataset {
        catalog: Catalog {
            categories: read_table(dir, Table::Categories)?,
            products: read_table(dir, Table::Products)?,
            customers: read_table(dir, Table::Customers)?,
        },
        activity: Activity {
            orders: read_table(dir, Table::Orders)?,
            payments: read_table(dir, Table::Payments)?,
        },
    })
}

fn read_table<T: DeserializeOwned>(dir: &Path, table: Table) -> Result<Vec<T>> {
    let path = dir.join(table.file_name());
    let mut reader = csv::Reader::from_path(&path)
        .with_context(|| format!("CSV file not found: {}", path.display()))?;

    let headers = reader.headers()?;
    if !headers.iter().eq(table.columns().iter().copied()) {
        bail!(
            "unexpected header in {}: expected {}, found {}",
            path.display(),
            table.columns().join(","),
            headers.iter().collect::<Vec<_>>().join(",")
        );
    }

    let mut records = Vec::new();
    for (line, row) in reader.deserialize::<T>().enumerate() {
        let record = row.with_context(|| {
            format!("malformed row {} in {}", line + 2, path.display())
        })?;
        records.push(record);
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use tempfile::TempDir;

    use super::*;
    use crate::generator::{generate, Profile};

    fn dataset() -> Dataset {
        let today = chrono::NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
        generate(Profile::Full, today, &mut StdRng::seed_from_u64(1))
    }

    #[test]
    fn export_then_read_preserves_records() -> Result<()> {
        let dir = TempDir::new()?;
        let ds = dataset();
        let written = export(dir.path(), &ds)?;
        assert_eq!(written.len(), 5);
        assert_eq!(read_dataset(dir.path())?, ds);
        Ok(())
    }

    #[test]
    fn header_follows_column_order_and_dates_are_iso() -> Result<()> {
        let ds = dataset();
        let text = String::from_utf8(table_bytes(&ds, Table::Payments)?)?;
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("id,zamowienie_id,kwota,metoda_platnosci,data_platnosci")
        );
        let first = lines.next().unwrap();
        let date = first.rsplit(',').next().unwrap();
        assert_eq!(date, ds.activity.payments[0].payment_date.format("%Y-%m-%d").to_string());
        Ok(())
    }

    #[test]
    fn blank_optional_text_reads_back_as_none() -> Result<()> {
        let dir = TempDir::new()?;
        let mut ds = dataset();
        ds.catalog.categories[0].description = Some(String::new());
        ds.catalog.customers[0].phone = Some(String::new());
        export(dir.path(), &ds)?;

        let back = read_dataset(dir.path())?;
        assert_eq!(back.catalog.categories[0].description, None);
        assert_eq!(back.catalog.customers[0].phone, None);
        assert_eq!(back.catalog.customers[0].address, ds.catalog.customers[0].address);
        Ok(())
    }

    #[test]
    fn empty_table_still_has_header() -> Result<()> {
        let text = String::from_utf8(table_bytes(&Dataset::default(), Table::Orders)?)?;
        assert_eq!(text.trim_end(), "id,klient_id,data_zamowienia,status");
        Ok(())
    }

    #[test]
    fn missing_file_is_an_error() -> Result<()> {
        let dir = TempDir::new()?;
        export(dir.path(), &dataset())?;
        std::fs::remove_file(dir.path().join("platnosci.csv"))?;
        let err = read_dataset(dir.path()).unwrap_err();
        assert!(format!("{err:#}").contains("platnosci.csv"));
        Ok(())
    }

    #[test]
    fn malformed_row_is_an_error() -> Result<()> {
        let dir = TempDir::new()?;
        export(dir.path(), &dataset())?;
        std::fs::write(
            dir.path().join("zamowienia.csv"),
            "id,klient_id,data_zamowienia,status\n1,1,not-a-date,nowe\n",
        )?;
        let err = read_dataset(dir.path()).unwrap_err();
        assert!(format!("{err:#}").contains("malformed row 2"));
        Ok(())
    }

    #[test]
    fn wrong_header_is_an_error() -> Result<()> {
        let dir = TempDir::new()?;
        export(dir.path(), &dataset())?;
        std::fs::write(dir.path().join("kategorie.csv"), "id,name,opis\n")?;
        assert!(read_dataset(dir.path()).is_err());
        Ok(())
    }
}
