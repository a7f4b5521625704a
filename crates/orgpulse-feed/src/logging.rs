use std::env;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::EnvFilter;

const LOG_LEVEL_ENV: &str = "ORGPULSE_LOG_LEVEL";

type SharedFile = Arc<Mutex<File>>;

/// Keeps the log file open for the lifetime of the process.
pub struct LogGuard {
    file: Option<SharedFile>,
}

impl LogGuard {
    pub fn has_file(&self) -> bool {
        self.file.is_some()
    }
}

struct MultiWriter {
    stdout_enabled: bool,
    file: Option<SharedFile>,
}

impl MultiWriter {
    fn new(file: Option<SharedFile>, stdout_enabled: bool) -> Self {
        Self {
            stdout_enabled,
            file,
        }
    }
}

impl Write for MultiWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.stdout_enabled {
            let _ = io::stdout().write_all(buf);
        }
        if let Some(file) = &self.file {
            if let Ok(mut file) = file.lock() {
                let _ = file.write_all(buf);
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if self.stdout_enabled {
            let _ = io::stdout().flush();
        }
        if let Some(file) = &self.file {
            if let Ok(mut file) = file.lock() {
                let _ = file.flush();
            }
        }
        Ok(())
    }
}

/// Installs the global subscriber. `RUST_LOG` wins over `ORGPULSE_LOG_LEVEL`.
/// Returns `None` if a subscriber was already installed.
pub fn init_logging(log_dir: &str, session: &str, stdout_enabled: bool) -> Option<LogGuard> {
    let level = env::var(LOG_LEVEL_ENV).unwrap_or_else(|_| "info".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let guard = match open_log_file(log_dir, session) {
        Ok(guard) => guard,
        Err(err) => {
            eprintln!("log_file_error: {err}");
            LogGuard { file: None }
        }
    };
    let file = guard.file.clone();
    let make_writer = BoxMakeWriter::new(move || MultiWriter::new(file.clone(), stdout_enabled));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(make_writer)
        .with_ansi(false)
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        return None;
    }
    Some(guard)
}

pub fn log_file_path(log_dir: &Path, session: &str) -> PathBuf {
    log_dir.join(format!("orgpulse-feed-{}.log", sanitize_component(session)))
}

fn open_log_file(log_dir: &str, session: &str) -> io::Result<LogGuard> {
    if log_dir.trim().is_empty() {
        return Ok(LogGuard { file: None });
    }
    let dir = PathBuf::from(log_dir);
    if std::fs::create_dir_all(&dir).is_err() {
        return Ok(LogGuard { file: None });
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file_path(&dir, session))?;
    Ok(LogGuard {
        file: Some(Arc::new(Mutex::new(file))),
    })
}

pub fn sanitize_component(input: &str) -> String {
    input
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' {
                ch
            } else {
                '_'
            }
        })
        .collect()
}

pub fn parse_bool_env(value: &str) -> Option<bool> {
    match value.trim() {
        "1" | "true" | "TRUE" | "yes" | "YES" | "on" | "ON" => Some(true),
        "0" | "false" | "FALSE" | "no" | "NO" | "off" | "OFF" => Some(false),
        _ => None,
    }
}
