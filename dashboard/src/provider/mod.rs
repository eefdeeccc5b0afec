use chrono::{DateTime, Utc};
use std::fmt;
use std::time::Duration;

pub mod migrator;

#[cfg(test)]
pub mod fake;

// ---------- DTOs ----------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Sql,
    Rust,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Sql => "sql",
            SourceKind::Rust => "rust",
        }
    }
}

/// Identifies the migration a status or result refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    pub kind: SourceKind,
    /// File path or migration name, as the provider knows it.
    pub path: String,
    pub version: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Pending,
    Applied,
}

impl State {
    pub fn as_str(&self) -> &'static str {
        match self {
            State::Pending => "pending",
            State::Applied => "applied",
        }
    }
}

#[derive(Debug, Clone)]
pub struct MigrationStatus {
    pub source: Option<Source>,
    pub state: State,
    /// None = never applied.
    pub applied_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Down => "down",
        }
    }
}

/// One migration executed during a single provider call.
#[derive(Debug, Clone)]
pub struct MigrationResult {
    pub source: Option<Source>,
    pub duration: Duration,
    pub direction: Direction,
    pub error: Option<String>,
}

// ---------- errors ----------

#[derive(Debug)]
pub enum ProviderError {
    Db(sea_orm::DbErr),
    /// Rollback requested but no migration is applied.
    NothingApplied,
    /// A step failed part way through a batch. `applied` holds the steps
    /// that completed before `failed`.
    Partial {
        applied: Vec<MigrationResult>,
        failed: MigrationResult,
    },
    Other(String),
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderError::Db(e) => write!(f, "Database error: {e}"),
            ProviderError::NothingApplied => write!(f, "No applied migrations to roll back"),
            ProviderError::Partial { applied, failed } => {
                let path = failed
                    .source
                    .as_ref()
                    .map(|s| s.path.as_str())
                    .unwrap_or("unknown migration");
                let reason = failed.error.as_deref().unwrap_or("unknown error");
                write!(
                    f,
                    "Migration {path} failed after {} succeeded: {reason}",
                    applied.len()
                )
            }
            ProviderError::Other(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for ProviderError {}

impl From<sea_orm::DbErr> for ProviderError {
    fn from(e: sea_orm::DbErr) -> Self {
        ProviderError::Db(e)
    }
}

// ---------- trait ----------

/// The operations the dashboard drives. Implementations own planning,
/// ordering and execution; callers only render what comes back.
#[async_trait::async_trait]
pub trait MigrationProvider: Send + Sync {
    /// Every known migration in version order.
    async fn status(&self) -> Result<Vec<MigrationStatus>, ProviderError>;

    /// Apply all pending migrations.
    async fn up(&self) -> Result<Vec<MigrationResult>, ProviderError>;

    /// Roll back the most recently applied migration.
    async fn down(&self) -> Result<MigrationResult, ProviderError>;

    /// Apply pending migrations up to and including `version`.
    async fn up_to(&self, version: i64) -> Result<Vec<MigrationResult>, ProviderError>;

    /// Roll back applied migrations newer than `version`.
    async fn down_to(&self, version: i64) -> Result<Vec<MigrationResult>, ProviderError>;
}
