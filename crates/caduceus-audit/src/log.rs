//! The audit journal: one JSON object per line, append-only.
//!
//! Audit records a privileged action after it succeeded. A journal that
//! cannot be written must never veto the action itself, so append failures
//! are counted and logged instead of propagated.

use std::fmt;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use caduceus_core::error::GatewayError;
use caduceus_core::identity::{Identity, Role};

/// Privileged actions that reach the journal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Store,
    Search,
    List,
    Fetch,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Store => "store",
            AuditAction::Search => "search",
            AuditAction::List => "list",
            AuditAction::Fetch => "fetch",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One attributed, timestamped action. Entries are written once and never
/// edited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub ts: DateTime<Utc>,
    pub actor: String,
    pub role: Role,
    pub action: AuditAction,
    pub resource: String,
}

struct AppendState {
    last_ts: Option<DateTime<Utc>>,
}

/// Shared journal handle. Appends are serialized through one mutex so
/// concurrent requests cannot interleave partial lines.
pub struct AuditLog {
    path: PathBuf,
    state: Mutex<AppendState>,
    dropped: AtomicU64,
}

impl AuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            state: Mutex::new(AppendState { last_ts: None }),
            dropped: AtomicU64::new(0),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record a completed privileged action. Never fails: an append that
    /// cannot be written is counted in `dropped` and logged locally.
    pub fn record(&self, identity: &Identity, action: AuditAction, resource: &str) {
        if let Err(err) = self.append(identity, action, resource) {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            warn!(
                actor = %identity.subject,
                action = %action,
                "audit append failed: {err}"
            );
        }
    }

    /// Number of entries lost to append failures since this handle was
    /// created.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    fn append(
        &self,
        identity: &Identity,
        action: AuditAction,
        resource: &str,
    ) -> Result<(), GatewayError> {
        let mut state = self
            .state
            .lock()
            .map_err(|e| GatewayError::Internal { reason: format!("audit lock poisoned: {e}") })?;

        // Wall clocks can step backwards; journal order must not.
        let now = Utc::now();
        let ts = match state.last_ts {
            Some(last) if last > now => last,
            _ => now,
        };
        state.last_ts = Some(ts);

        let entry = AuditEntry {
            ts,
            actor: identity.subject.clone(),
            role: identity.role,
            action,
            resource: resource.to_string(),
        };
        let line = serde_json::to_string(&entry)
            .map_err(|e| GatewayError::Internal { reason: format!("audit encode failed: {e}") })?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| GatewayError::Internal {
                reason: format!("audit directory unavailable: {e}"),
            })?;
        }
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| GatewayError::Internal { reason: format!("audit open failed: {e}") })?;
        writeln!(file, "{line}")
            .map_err(|e| GatewayError::Internal { reason: format!("audit write failed: {e}") })
    }

    /// Read back every entry in this journal.
    pub fn read_all(&self) -> Result<Vec<AuditEntry>, GatewayError> {
        read_entries(&self.path)
    }
}

/// Read a journal file. A journal that does not exist yet, or is empty,
/// reads as zero entries; a corrupt line is an error, not a skip.
pub fn read_entries(path: &Path) -> Result<Vec<AuditEntry>, GatewayError> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => {
            return Err(GatewayError::Internal { reason: format!("audit read failed: {e}") })
        }
    };
    contents
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            serde_json::from_str(line).map_err(|e| GatewayError::Internal {
                reason: format!("corrupt audit entry: {e}"),
            })
        })
        .collect()
}
