//! Per-session transcript written by the terminal client. The TUI owns the
//! screen, so this file is where a chat session leaves its record.

use anyhow::{Result, anyhow, bail};
use std::env;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
#[cfg(unix)]
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::neighborhood::LocationHint;

const TRACE_DIR: &str = "climate-chat/traces";

#[derive(Clone)]
pub struct ChatTrace {
    inner: Arc<TraceFile>,
}

struct TraceFile {
    writer: Mutex<BufWriter<File>>,
    path: PathBuf,
    failed: AtomicBool,
}

impl ChatTrace {
    pub fn create(session_id: &str) -> Result<Self> {
        let dir = trace_dir_from_env()?;
        Self::create_in(session_id, &dir)
    }

    pub fn create_in(session_id: &str, dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)
            .map_err(|err| anyhow!("Failed to create trace directory {}: {err}", dir.display()))?;

        let started = OffsetDateTime::now_utc().unix_timestamp();
        let path = dir.join(format!("session-{session_id}-{started}.log"));
        let file = open_private(&path)
            .map_err(|err| anyhow!("Failed to create trace file {}: {err}", path.display()))?;

        Ok(Self {
            inner: Arc::new(TraceFile {
                writer: Mutex::new(BufWriter::new(file)),
                path,
                failed: AtomicBool::new(false),
            }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    pub fn log_user(&self, text: &str) {
        self.record("user", text);
    }

    pub fn log_assistant(&self, text: &str) {
        self.record("assistant", text);
    }

    pub fn log_location(&self, location: LocationHint) {
        self.record("map", &format!("lat={:.4} lon={:.4}", location.lat, location.lon));
    }

    pub fn log_error(&self, message: &str) {
        self.record("error", message);
    }

    pub fn log_system(&self, message: &str) {
        self.record("system", message);
    }

    /// Full conversation, written once when the session closes.
    pub fn log_transcript(&self, transcript: &str) {
        self.record("transcript", transcript);
    }

    fn record(&self, kind: &str, text: &str) {
        let stamp = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_else(|_| "-".to_string());

        let mut out = String::new();
        let mut lines = text.lines().peekable();
        if lines.peek().is_none() {
            out.push_str(&format!("[{stamp}] [{kind:<10}] <empty>\n"));
        }
        for line in lines {
            out.push_str(&format!("[{stamp}] [{kind:<10}] {line}\n"));
        }
        self.write(&out);
    }

    fn write(&self, text: &str) {
        let Ok(mut writer) = self.inner.writer.lock() else {
            self.warn_once("trace writer lock poisoned");
            return;
        };
        if writer.write_all(text.as_bytes()).is_err() || writer.flush().is_err() {
            self.warn_once("failed to write to trace file");
        }
    }

    fn warn_once(&self, message: &str) {
        if !self.inner.failed.swap(true, Ordering::Relaxed) {
            tracing::warn!(path = %self.inner.path.display(), "{message}");
        }
    }
}

#[cfg(unix)]
fn open_private(path: &Path) -> std::io::Result<File> {
    OpenOptions::new()
        .create(true)
        .truncate(true)
        .write(true)
        .mode(0o600)
        .open(path)
}

#[cfg(not(unix))]
fn open_private(path: &Path) -> std::io::Result<File> {
    File::create(path)
}

pub fn trace_dir_from_env() -> Result<PathBuf> {
    let state_home = env::var("XDG_STATE_HOME").ok();
    resolve_trace_dir(state_home.as_deref(), dirs::home_dir().as_deref())
}

fn resolve_trace_dir(state_home: Option<&str>, home: Option<&Path>) -> Result<PathBuf> {
    if let Some(state_home) = state_home {
        let trimmed = state_home.trim();
        if trimmed.is_empty() {
            bail!("Failed to resolve trace path: XDG_STATE_HOME is set but empty");
        }
        return Ok(PathBuf::from(trimmed).join(TRACE_DIR));
    }

    let home =
        home.ok_or_else(|| anyhow!("Failed to resolve trace path: HOME directory is unavailable"))?;
    Ok(home.join(".local/state").join(TRACE_DIR))
}
