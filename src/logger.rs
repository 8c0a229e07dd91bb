use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};

static LOG_FILE: OnceLock<Mutex<File>> = OnceLock::new();
static LEVEL: OnceLock<LogLevel> = OnceLock::new();

const LEVEL_ENV: &str = "SKLEP_SEED_LOG";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn parse(value: &str) -> LogLevel {
        match value.to_lowercase().as_str() {
            "error" => LogLevel::Error,
            "warn" | "warning" => LogLevel::Warn,
            "debug" | "trace" => LogLevel::Debug,
            _ => LogLevel::Info,
        }
    }

    fn from_env() -> LogLevel {
        LogLevel::parse(&std::env::var(LEVEL_ENV).unwrap_or_default())
    }

    fn label(&self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        }
    }
}

/// Opens (appending) the log file. Until this is called every log call is a
/// no-op.
pub fn init(log_path: impl AsRef<Path>) -> std::io::Result<PathBuf> {
    let path = log_path.as_ref();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let _ = LOG_FILE.set(Mutex::new(file));
    let _ = LEVEL.set(LogLevel::from_env());
    info(&format!("logging initialized: {}", path.display()));
    Ok(path.to_path_buf())
}

fn enabled(level: LogLevel) -> bool {
    level >= *LEVEL.get_or_init(LogLevel::from_env)
}

fn write_line(level: LogLevel, msg: &str) {
    if !enabled(level) {
        return;
    }
    if let Some(m) = LOG_FILE.get() {
        if let Ok(mut f) = m.lock() {
            let ts = chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
            let _ = writeln!(f, "{} [{}] {}", ts, level.label(), msg);
            let _ = f.flush();
        }
    }
}

pub fn error(msg: &str) {
    write_line(LogLevel::Error, msg);
}
pub fn warn(msg: &str) {
    write_line(LogLevel::Warn, msg);
}
pub fn info(msg: &str) {
    write_line(LogLevel::Info, msg);
}
pub fn debug(msg: &str) {
    write_line(LogLevel::Debug, msg);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_names() {
        assert_eq!(LogLevel::parse("ERROR"), LogLevel::Error);
        assert_eq!(LogLevel::parse("warning"), LogLevel::Warn);
        assert_eq!(LogLevel::parse("trace"), LogLevel::Debug);
        assert_eq!(LogLevel::parse(""), LogLevel::Info);
    }

    #[test]
    fn levels_are_ordered_by_severity() {
        assert!(LogLevel::Error > LogLevel::Warn);
        assert!(LogLevel::Info > LogLevel::Debug);
    }
}
