use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer};

use crate::db::DatabaseType;

/// PostgreSQL credentials, as stored in the credentials JSON file.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct Credentials {
    pub db_name: String,
    pub user_name: String,
    #[serde(default)]
    pub password: String,
    pub host_name: String,
    #[serde(deserialize_with = "port_from_number_or_string")]
    pub port_number: u16,
}

/// What the pipeline connects to.
#[derive(Debug, Clone)]
pub enum Connection {
    Postgres(Credentials),
    Sqlite { path: PathBuf },
}

impl Connection {
    pub fn r#type(&self) -> DatabaseType {
        match self {
            Connection::Postgres(_) => DatabaseType::Postgres,
            Connection::Sqlite { .. } => DatabaseType::Sqlite,
        }
    }
}

pub fn load_credentials(path: &Path) -> Result<Credentials> {
    let data = std::fs::read(path)
        .with_context(|| format!("credentials file not found: {}", path.display()))?;
    let creds: Credentials = serde_json::from_slice(&data)
        .with_context(|| format!("invalid JSON in credentials file {}", path.display()))?;
    Ok(creds)
}

// The sample credentials file quotes the port, so accept both forms.
fn port_from_number_or_string<'de, D>(deserializer: D) -> std::result::Result<u16, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Port {
        Number(u16),
        Text(String),
    }

    match Port::deserialize(deserializer)? {
        Port::Number(port) => Ok(port),
        Port::Text(text) => text
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("invalid port number: {text:?}"))),
    }
}
