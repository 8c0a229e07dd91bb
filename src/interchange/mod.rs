mod csv_dir;
mod json_doc;

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::ValueEnum;

use crate::model::{Activity, Dataset};

pub use csv_dir::table_bytes as csv_table_bytes;
pub use json_doc::FILE_NAME as JSON_FILE_NAME;

/// On-disk format of the generated data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    /// One comma-separated file per table
    Csv,
    /// A single JSON document with the catalog tables
    Json,
}

/// Where the importer reads records from.
pub enum ImportSource<'a> {
    /// All five tables as CSV files in `dir`.
    Csv { dir: &'a Path },
    /// The catalog from a JSON document; orders and payments come from memory
    /// because the document does not carry them.
    Json {
        path: &'a Path,
        activity: &'a Activity,
    },
}

impl ImportSource<'_> {
    pub fn load(&self) -> Result<Dataset> {
        match self {
            ImportSource::Csv { dir } => csv_dir::read_dataset(dir),
            ImportSource::Json { path, activity } => Ok(Dataset {
                catalog: json_doc::read(path)?,
                activity: (*activity).clone(),
            }),
        }
    }
}

/// Writes `dataset` under `dir` and returns the files written.
pub fn export(format: Format, dir: &Path, dataset: &Dataset) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)?;
    match format {
        Format::Csv => csv_dir::export(dir, dataset),
        Format::Json => {
            let path = dir.join(JSON_FILE_NAME);
            json_doc::export(&path, &dataset.catalog)?;
            Ok(vec![path])
        }
    }
}
