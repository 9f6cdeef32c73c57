use std::{fmt::Display, str::FromStr, time::Duration};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    Relational,
    ObjectStore,
}

impl BackendKind {
    pub fn other(&self) -> Self {
        match self {
            BackendKind::Relational => BackendKind::ObjectStore,
            BackendKind::ObjectStore => BackendKind::Relational,
        }
    }
}

impl Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendKind::Relational => write!(f, "relational"),
            BackendKind::ObjectStore => write!(f, "object store"),
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("Unknown store '{0}'. Use 'relational' or 'object'")]
pub struct UnknownBackend(String);

impl FromStr for BackendKind {
    type Err = UnknownBackend;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "relational" | "sqlite" | "sql" | "db" => Ok(Self::Relational),
            "object" | "object_store" | "objectstore" | "blob" | "document" => Ok(Self::ObjectStore),
            other => Err(UnknownBackend(other.to_string())),
        }
    }
}

pub const DEFAULT_BACKEND_TIMEOUT: Duration = Duration::from_millis(5000);

/// Which store is authoritative, and how the other one is used. Resolved once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreTopology {
    pub primary: BackendKind,
    /// On a primary miss, look in the secondary store (and backfill the primary on a hit).
    pub fallback_reads: bool,
    /// Mirror every primary write to the secondary store.
    pub dual_write: bool,
    /// Upper bound on every individual backend call.
    pub backend_timeout: Duration,
}

impl Default for StoreTopology {
    fn default() -> Self {
        Self {
            primary: BackendKind::Relational,
            fallback_reads: true,
            dual_write: true,
            backend_timeout: DEFAULT_BACKEND_TIMEOUT,
        }
    }
}

impl StoreTopology {
    /// An explicitly configured primary always wins. Otherwise the relational store is primary when a database has
    /// been configured, and the object store when it has not.
    pub fn resolve(explicit_primary: Option<BackendKind>, relational_configured: bool) -> Self {
        let primary = explicit_primary.unwrap_or(if relational_configured {
            BackendKind::Relational
        } else {
            BackendKind::ObjectStore
        });
        Self { primary, ..Default::default() }
    }

    pub fn secondary(&self) -> BackendKind {
        self.primary.other()
    }

    pub fn uses_secondary(&self) -> bool {
        self.fallback_reads || self.dual_write
    }

    pub fn with_fallback_reads(mut self, enabled: bool) -> Self {
        self.fallback_reads = enabled;
        self
    }

    pub fn with_dual_write(mut self, enabled: bool) -> Self {
        self.dual_write = enabled;
        self
    }

    pub fn with_backend_timeout(mut self, timeout: Duration) -> Self {
        self.backend_timeout = timeout;
        self
    }
}

impl Display for StoreTopology {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "primary: {}, secondary: {}, fallback reads: {}, dual write: {}, timeout: {}ms",
            self.primary,
            self.secondary(),
            self.fallback_reads,
            self.dual_write,
            self.backend_timeout.as_millis()
        )
    }
}
