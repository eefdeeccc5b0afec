use chrono::DateTime;
use regex::Regex;
use sea_orm::DatabaseConnection;
use sea_orm_migration::{MigrationStatus as SeaMigrationStatus, MigratorTrait};
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::OnceLock;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use super::{
    Direction, MigrationProvider, MigrationResult, MigrationStatus, ProviderError, Source,
    SourceKind, State,
};

/// `MigrationProvider` backed by a SeaORM migrator.
///
/// SeaORM identifies migrations by name only, so versions are derived from
/// the conventional `mYYYYMMDD_NNNNNN_description` prefix. When any name does
/// not follow it, every migration falls back to its 1-based position.
pub struct SeaOrmProvider<M> {
    db: DatabaseConnection,
    versions: HashMap<String, i64>,
    /// Serializes up/down so step counts are computed against a stable plan.
    lock: Mutex<()>,
    _migrator: PhantomData<fn() -> M>,
}

impl<M: MigratorTrait> SeaOrmProvider<M> {
    pub fn new(db: DatabaseConnection) -> Self {
        let names: Vec<String> = M::get_migration_files()
            .iter()
            .map(|m| m.name().to_string())
            .collect();
        let versions = names
            .iter()
            .cloned()
            .zip(assign_versions(&names))
            .collect();
        Self {
            db,
            versions,
            lock: Mutex::new(()),
            _migrator: PhantomData,
        }
    }

    fn source(&self, name: &str) -> Option<Source> {
        self.versions.get(name).map(|&version| Source {
            kind: SourceKind::Rust,
            path: name.to_string(),
            version,
        })
    }

    async fn pending(&self) -> Result<Vec<Source>, ProviderError> {
        let pending = M::get_pending_migrations(&self.db).await?;
        Ok(pending.iter().filter_map(|m| self.source(m.name())).collect())
    }

    async fn applied(&self) -> Result<Vec<Source>, ProviderError> {
        let applied = M::get_applied_migrations(&self.db).await?;
        Ok(applied.iter().filter_map(|m| self.source(m.name())).collect())
    }

    /// Run exactly one migration step in `direction`, timing it.
    async fn step(&self, source: Source, direction: Direction) -> MigrationResult {
        let started = Instant::now();
        let outcome = match direction {
            Direction::Up => M::up(&self.db, Some(1)).await,
            Direction::Down => M::down(&self.db, Some(1)).await,
        };
        let duration = started.elapsed();

        match &outcome {
            Ok(()) => tracing::info!(
                migration = %source.path,
                version = source.version,
                direction = direction.as_str(),
                elapsed_ms = elapsed_millis(duration),
                "migration step complete"
            ),
            Err(e) => tracing::error!(
                migration = %source.path,
                version = source.version,
                direction = direction.as_str(),
                error = %e,
                "migration step failed"
            ),
        }

        MigrationResult {
            source: Some(source),
            duration,
            direction,
            error: outcome.err().map(|e| e.to_string()),
        }
    }

    /// Execute `plan` in order, stopping at the first failing step.
    async fn run(
        &self,
        plan: Vec<Source>,
        direction: Direction,
    ) -> Result<Vec<MigrationResult>, ProviderError> {
        let mut done = Vec::with_capacity(plan.len());
        for source in plan {
            let result = self.step(source, direction).await;
            if result.error.is_some() {
                return Err(ProviderError::Partial {
                    applied: done,
                    failed: result,
                });
            }
            done.push(result);
        }
        Ok(done)
    }
}

#[async_trait::async_trait]
impl<M: MigratorTrait + 'static> MigrationProvider for SeaOrmProvider<M> {
    async fn status(&self) -> Result<Vec<MigrationStatus>, ProviderError> {
        let migrations = M::get_migration_with_status(&self.db).await?;
        let applied_at: HashMap<String, i64> = M::get_migration_models(&self.db)
            .await?
            .into_iter()
            .map(|m| (m.version, m.applied_at))
            .collect();

        Ok(migrations
            .iter()
            .map(|m| MigrationStatus {
                source: self.source(m.name()),
                state: match m.status() {
                    SeaMigrationStatus::Pending => State::Pending,
                    SeaMigrationStatus::Applied => State::Applied,
                },
                applied_at: applied_at
                    .get(m.name())
                    .and_then(|&secs| DateTime::from_timestamp(secs, 0)),
            })
            .collect())
    }

    async fn up(&self) -> Result<Vec<MigrationResult>, ProviderError> {
        let _guard = self.lock.lock().await;
        let plan = self.pending().await?;
        self.run(plan, Direction::Up).await
    }

    async fn down(&self) -> Result<MigrationResult, ProviderError> {
        let _guard = self.lock.lock().await;
        let last = self
            .applied()
            .await?
            .pop()
            .ok_or(ProviderError::NothingApplied)?;

        let result = self.step(last, Direction::Down).await;
        if result.error.is_some() {
            return Err(ProviderError::Partial {
                applied: Vec::new(),
                failed: result,
            });
        }
        Ok(result)
    }

    async fn up_to(&self, version: i64) -> Result<Vec<MigrationResult>, ProviderError> {
        let _guard = self.lock.lock().await;
        let plan = self
            .pending()
            .await?
            .into_iter()
            .take_while(|s| s.version <= version)
            .collect();
        self.run(plan, Direction::Up).await
    }

    async fn down_to(&self, version: i64) -> Result<Vec<MigrationResult>, ProviderError> {
        let _guard = self.lock.lock().await;
        let plan = self
            .applied()
            .await?
            .into_iter()
            .rev()
            .take_while(|s| s.version > version)
            .collect();
        self.run(plan, Direction::Down).await
    }
}

/// Milliseconds for log fields, saturating instead of wrapping.
fn elapsed_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

// ---------- versions ----------

fn name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^m(\d{8})_(\d{6})(?:_|$)").expect("migration name pattern is valid")
    })
}

/// `m20240105_000001_create_accounts` → `20240105000001`.
pub fn parse_name_version(name: &str) -> Option<i64> {
    let caps = name_pattern().captures(name)?;
    format!("{}{}", &caps[1], &caps[2]).parse().ok()
}

/// Versions for `names` in order: parsed from the names when all of them
/// parse and strictly increase, otherwise 1-based positions.
pub fn assign_versions(names: &[String]) -> Vec<i64> {
    let parsed: Option<Vec<i64>> = names.iter().map(|n| parse_name_version(n)).collect();
    match parsed {
        Some(versions) if versions.windows(2).all(|w| w[0] < w[1]) => versions,
        _ => (1..=names.len() as i64).collect(),
    }
}

// ---------- tests ----------
