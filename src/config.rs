use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::connection::{load_credentials, Connection};
use crate::db::DatabaseType;
use crate::generator::Profile;
use crate::interchange::Format;

const APP_NAME: &str = "sklep-seed";
const LOG_FILE: &str = "sklep-seed.log";

/// Populate the tackle-shop schema with sample data.
#[derive(Debug, Parser)]
#[command(name = "sklep-seed", version, about)]
pub struct Args {
    #[command(subcommand)]
    pub target: Target,

    /// Directory for the interchange files
    #[arg(long, global = true, default_value = ".")]
    pub output_dir: PathBuf,

    /// Interchange format [default: csv for postgres, json for sqlite]
    #[arg(long, global = true, value_enum)]
    pub format: Option<Format>,

    /// Generation profile [default: full for postgres, compact for sqlite]
    #[arg(long, global = true, value_enum)]
    pub profile: Option<Profile>,

    /// Seed for reproducible orders and payments
    #[arg(long, global = true)]
    pub seed: Option<u64>,

    /// Skip dumping the tables at the end
    #[arg(long, global = true)]
    pub no_print: bool,

    /// Log file [default: <config dir>/sklep-seed/sklep-seed.log]
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
pub enum Target {
    /// Seed a PostgreSQL database
    Postgres {
        /// JSON file with db_name, user_name, password, host_name, port_number
        #[arg(long, default_value = "database_creds.json")]
        creds: PathBuf,
    },
    /// Seed a SQLite database file
    Sqlite {
        /// Database file, created if missing
        #[arg(long, default_value = "sklepWedkarski.db")]
        path: PathBuf,
    },
}

/// Everything the pipeline needs, with per-backend defaults applied.
#[derive(Debug, Clone)]
pub struct Settings {
    pub connection: Connection,
    pub output_dir: PathBuf,
    pub format: Format,
    pub profile: Profile,
    pub seed: Option<u64>,
    pub print_tables: bool,
}

impl Args {
    /// Fails when the credentials file is missing or unreadable; nothing
    /// touches a database before this succeeds.
    pub fn settings(&self) -> Result<Settings> {
        let connection = match &self.target {
            Target::Postgres { creds } => {
                let path = expand_path(creds).unwrap_or_else(|| creds.clone());
                Connection::Postgres(load_credentials(&path)?)
            }
            Target::Sqlite { path } => Connection::Sqlite {
                path: expand_path(path).unwrap_or_else(|| path.clone()),
            },
        };
        let kind = connection.r#type();
        Ok(Settings {
            connection,
            output_dir: expand_path(&self.output_dir).unwrap_or_else(|| self.output_dir.clone()),
            format: self.format.unwrap_or_else(|| default_format(kind)),
            profile: self.profile.unwrap_or_else(|| default_profile(kind)),
            seed: self.seed,
            print_tables: !self.no_print,
        })
    }

    pub fn log_path(&self) -> Result<PathBuf> {
        match &self.log_file {
            Some(path) => Ok(expand_path(path).unwrap_or_else(|| path.clone())),
            None => Ok(app_config_dir()?.join(LOG_FILE)),
        }
    }
}

pub fn default_format(kind: DatabaseType) -> Format {
    match kind {
        DatabaseType::Postgres => Format::Csv,
        DatabaseType::Sqlite => Format::Json,
    }
}

pub fn default_profile(kind: DatabaseType) -> Profile {
    match kind {
        DatabaseType::Postgres => Profile::Full,
        DatabaseType::Sqlite => Profile::Compact,
    }
}

/// Return the application config directory path, creating it if missing.
pub fn app_config_dir() -> Result<PathBuf> {
    let mut path = if cfg!(target_os = "macos") {
        dirs_next::home_dir().map(|h| h.join(".config"))
    } else {
        dirs_next::config_dir()
    }
    .ok_or_else(|| anyhow::anyhow!("failed to find os config dir."))?;

    path.push(APP_NAME);
    fs::create_dir_all(&path)?;
    Ok(path)
}

/// Expands a leading `~` and `$VAR` / `%VAR%` segments.
pub fn expand_path(path: &Path) -> Option<PathBuf> {
    let mut expanded_path = PathBuf::new();
    let mut path_iter = path.iter();
    if path.starts_with("~") {
        path_iter.next()?;
        expanded_path = expanded_path.join(dirs_next::home_dir()?);
    }
    for path in path_iter {
        let path = path.to_str()?;
        expanded_path = if cfg!(unix) && path.starts_with('$') {
            expanded_path.join(std::env::var(path.strip_prefix('$')?).unwrap_or_default())
        } else if cfg!(windows) && path.starts_with('%') && path.ends_with('%') {
            expanded_path
                .join(std::env::var(path.strip_prefix('%')?.strip_suffix('%')?).unwrap_or_default())
        } else {
            expanded_path.join(path)
        }
    }
    Some(expanded_path)
}

#[cfg(test)]
mod tests {
    use std::ffi::OsStr;

    use clap::CommandFactory;
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn sqlite_defaults() -> Result<()> {
        let args = Args::try_parse_from(["sklep-seed", "sqlite"])?;
        let settings = args.settings()?;
        assert_eq!(settings.format, Format::Json);
        assert_eq!(settings.profile, Profile::Compact);
        assert!(settings.print_tables);
        match settings.connection {
            Connection::Sqlite { path } => assert_eq!(path, PathBuf::from("sklepWedkarski.db")),
            other => panic!("unexpected connection {other:?}"),
        }
        Ok(())
    }

    #[test]
    fn global_options_override_defaults() -> Result<()> {
        let args = Args::try_parse_from([
            "sklep-seed",
            "sqlite",
            "--format",
            "csv",
            "--profile",
            "full",
            "--seed",
            "7",
            "--no-print",
        ])?;
        let settings = args.settings()?;
        assert_eq!(settings.format, Format::Csv);
        assert_eq!(settings.profile, Profile::Full);
        assert_eq!(settings.seed, Some(7));
        assert!(!settings.print_tables);
        Ok(())
    }

    #[test]
    fn postgres_without_credentials_fails_early() -> Result<()> {
        let dir = TempDir::new()?;
        let creds = dir.path().join("database_creds.json");
        let args = Args::try_parse_from([
            OsStr::new("sklep-seed"),
            OsStr::new("postgres"),
            OsStr::new("--creds"),
            creds.as_os_str(),
        ])?;
        assert!(args.settings().is_err());
        Ok(())
    }

    #[test]
    fn postgres_defaults() -> Result<()> {
        let dir = TempDir::new()?;
        let creds = dir.path().join("database_creds.json");
        std::fs::write(
            &creds,
            r#"{"db_name":"sklep","user_name":"u","password":"p","host_name":"localhost","port_number":"5432"}"#,
        )?;
        let args = Args::try_parse_from([
            OsStr::new("sklep-seed"),
            OsStr::new("postgres"),
            OsStr::new("--creds"),
            creds.as_os_str(),
        ])?;
        let settings = args.settings()?;
        assert_eq!(settings.format, Format::Csv);
        assert_eq!(settings.profile, Profile::Full);
        assert_eq!(settings.connection.r#type(), DatabaseType::Postgres);
        Ok(())
    }

    #[test]
    fn tilde_expands_to_home() {
        let home = dirs_next::home_dir().unwrap();
        assert_eq!(
            expand_path(Path::new("~/sklep.db")),
            Some(home.join("sklep.db"))
        );
        assert_eq!(
            expand_path(Path::new("data/sklep.db")),
            Some(PathBuf::from("data/sklep.db"))
        );
    }
}
