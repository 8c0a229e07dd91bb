use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::model::Catalog;

pub const FILE_NAME: &str = "dane_testowe.json";

pub fn export(path: &Path, catalog: &Catalog) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    let mut out = BufWriter::new(file);
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut out, formatter);
    catalog
        .serialize(&mut ser)
        .with_context(|| format!("failed to write {}", path.display()))?;
    out.write_all(b"\n")?;
    out.flush()?;
    Ok(())
}

pub fn read(path: &Path) -> Result<Catalog> {
    let file =
        File::open(path).with_context(|| format!("JSON file not found: {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("failed to parse JSON at {}", path.display()))
}
