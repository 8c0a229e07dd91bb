use std::fmt::Display;

use anyhow::Result;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::config::Settings;
use crate::db::DB;
use crate::generator::generate;
use crate::interchange::{self, Format, ImportSource, JSON_FILE_NAME};
use crate::logger::{error, info, warn};
use crate::model::Table;
use crate::printer::print_all;

/// Runs schema → generate → export → import → print → close.
///
/// A failing step is reported on stderr and in the log, and the pipeline
/// moves on to the next one.
pub fn run_app(settings: &Settings) {
    let kind = settings.connection.r#type();
    let name = kind.display_name();

    let mut backend = match DB::open(&settings.connection) {
        Ok(backend) => {
            println!("Connected to {name} database.");
            info(&format!("connected to {name}"));
            Some(backend)
        }
        Err(err) => {
            report_failure(&format!("Connecting to {name}"), &err);
            None
        }
    };

    println!("Creating tables...");
    match backend.as_deref_mut() {
        Some(db) => {
            if let Ok(()) = step("Creating tables", db.ensure_schema()) {
                println!("Tables created successfully.");
            }
        }
        None => skipped("table creation"),
    }

    println!("Generating test data...");
    let today = chrono::Local::now().date_naive();
    let mut rng = match settings.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    let dataset = generate(settings.profile, today, &mut rng);
    info(&format!(
        "generated {} orders for {} customers ({:?} profile, seed {:?})",
        dataset.activity.orders.len(),
        dataset.catalog.customers.len(),
        settings.profile,
        settings.seed
    ));

    println!("Exporting data to {}...", format_name(settings.format));
    let exported = step(
        "Exporting data",
        interchange::export(settings.format, &settings.output_dir, &dataset),
    );
    if let Ok(paths) = &exported {
        for path in paths {
            println!("Wrote {}", path.display());
        }
    }

    println!("Importing data from {} to {name}...", format_name(settings.format));
    match backend.as_deref_mut() {
        Some(db) if exported.is_ok() => {
            let json_path = settings.output_dir.join(JSON_FILE_NAME);
            let source = match settings.format {
                Format::Csv => ImportSource::Csv {
                    dir: &settings.output_dir,
                },
                Format::Json => ImportSource::Json {
                    path: &json_path,
                    activity: &dataset.activity,
                },
            };
            if let Ok(report) = step("Importing data", db.import(&source)) {
                for (table, rows) in &report.tables {
                    println!("Imported {rows} rows into '{table}'.");
                }
                for table in Table::INSERT_ORDER {
                    let expected = dataset.row_count(table) as u64;
                    if report.rows(table) != Some(expected) {
                        warn(&format!(
                            "'{table}': generated {expected} rows, imported {:?}",
                            report.rows(table)
                        ));
                    }
                }
                println!("Data imported successfully.");
            }
        }
        Some(_) => {
            warn("import skipped because the export failed");
            println!("Skipped import (export failed).");
        }
        None => skipped("import"),
    }

    if settings.print_tables {
        println!("Displaying table content...");
        match backend.as_deref_mut() {
            Some(db) => {
                let stdout = std::io::stdout();
                let _ = step("Displaying tables", print_all(db, &mut stdout.lock()));
            }
            None => skipped("table display"),
        }
    }

    if let Some(db) = backend.take() {
        if let Ok(()) = step("Closing the connection", db.close()) {
            println!("Connection to {name} database closed.");
        }
    }

    println!("Finished working with {name} database.");
}

fn step<T>(what: &str, result: Result<T>) -> Result<T> {
    if let Err(err) = &result {
        report_failure(what, err);
    }
    result
}

fn report_failure(what: &str, err: &impl Display) {
    eprintln!("{what} failed: {err:#}");
    error(&format!("{what} failed: {err:#}"));
}

fn skipped(what: &str) {
    warn(&format!("skipped {what}: no database connection"));
    println!("Skipped {what} (no database connection).");
}

fn format_name(format: Format) -> &'static str {
    match format {
        Format::Csv => "CSV",
        Format::Json => "JSON",
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use chrono::NaiveDate;
    use tempfile::TempDir;

    use super::*;
    use crate::connection::Connection;
    use crate::db::{Backend, Sqlite};
    use crate::generator::Profile;

    fn settings(dir: &Path, db_path: &Path, format: Format) -> Settings {
        Settings {
            connection: Connection::Sqlite {
                path: db_path.to_path_buf(),
            },
            output_dir: dir.to_path_buf(),
            format,
            profile: Profile::Compact,
            seed: Some(3),
            print_tables: false,
        }
    }

    fn expected_orders() -> usize {
        // Row counts depend only on the RNG draws, not on the date.
        let any_day = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        generate(Profile::Compact, any_day, &mut StdRng::seed_from_u64(3))
            .activity
            .orders
            .len()
    }

    #[test]
    fn sqlite_json_pipeline_populates_every_table() -> Result<()> {
        let dir = TempDir::new()?;
        let db_path = dir.path().join("sklepWedkarski.db");
        run_app(&settings(dir.path(), &db_path, Format::Json));

        assert!(dir.path().join(JSON_FILE_NAME).exists());
        let mut db = Sqlite::open(&db_path)?;
        assert_eq!(db.fetch_records("kategorie")?.rows.len(), 5);
        assert_eq!(db.fetch_records("zamowienia")?.rows.len(), expected_orders());
        assert_eq!(db.fetch_records("platnosci")?.rows.len(), expected_orders());
        Ok(())
    }

    #[test]
    fn sqlite_csv_pipeline_can_run_twice() -> Result<()> {
        let dir = TempDir::new()?;
        let db_path = dir.path().join("sklepWedkarski.db");
        let settings = settings(dir.path(), &db_path, Format::Csv);
        run_app(&settings);
        run_app(&settings);

        assert!(dir.path().join("platnosci.csv").exists());
        let mut db = Sqlite::open(&db_path)?;
        assert_eq!(db.fetch_records("klienci")?.rows.len(), 5);
        assert_eq!(db.fetch_records("zamowienia")?.rows.len(), expected_orders());
        Ok(())
    }

    #[test]
    fn unreachable_database_still_exports() -> Result<()> {
        let dir = TempDir::new()?;
        let db_path = dir.path().join("missing").join("dir").join("sklep.db");
        run_app(&settings(dir.path(), &db_path, Format::Csv));

        assert!(!db_path.exists());
        assert!(dir.path().join("kategorie.csv").exists());
        Ok(())
    }
}
