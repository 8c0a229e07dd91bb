use std::io::Write;

use anyhow::{Context, Result};

use crate::db::Backend;

const RULE_WIDTH: usize = 50;

/// Dumps every user table: column names, each row, and the row count.
pub fn print_all<W: Write>(backend: &mut dyn Backend, out: &mut W) -> Result<()> {
    let rule = "-".repeat(RULE_WIDTH);
    writeln!(
        out,
        "\n=== Content of {} Tables ===",
        backend.kind().display_name()
    )?;

    for table in backend.list_tables()? {
        let records = backend
            .fetch_records(&table)
            .with_context(|| format!("failed to read table '{table}'"))?;

        writeln!(out, "\nTable: {table}")?;
        writeln!(out, "{rule}")?;
        writeln!(out, "{}", records.columns.join(" | "))?;
        writeln!(out, "{rule}")?;
        for row in &records.rows {
            writeln!(out, "{}", row.join(" | "))?;
        }
        writeln!(out, "\nNumber of rows in table {table}: {}", records.rows.len())?;
        writeln!(out, "{rule}")?;
    }
    out.flush()?;
    Ok(())
}
