//! Database snapshots and the background job taking them
//!
//! Snapshots are plain copies of the SQLite file named
//! `<prefix>_<YYYYMMDD_HHMMSS>.<ext>` (local time). Retention ordering uses the
//! timestamp embedded in the name, never file-system mtimes.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, NaiveDateTime, NaiveTime};
use serde::Serialize;
use tokio::{
    sync::{watch, Mutex},
    task::JoinHandle,
};
use tracing::{error, info, warn};
use utoipa::ToSchema;

use crate::{
    config::{BackupConfig, BackupSchedule},
    error::{AppError, AppResult},
};

const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// One snapshot file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct BackupEntry {
    pub name: String,
    pub size_bytes: u64,
    #[schema(value_type = String)]
    pub created_at: NaiveDateTime,
}

/// Result of restoring a snapshot over the database file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreOutcome {
    pub restored_from: PathBuf,
    /// Copy of the database as it was before the restore, if there was one
    pub safety_copy: Option<PathBuf>,
}

/// Summary of the backup directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct BackupInfo {
    pub count: usize,
    pub total_size_bytes: u64,
    pub latest: Option<String>,
}

impl BackupSchedule {
    /// Time to wait from `now` (local) until the next run, `None` if the schedule is invalid
    pub fn next_delay(&self, now: NaiveDateTime) -> Option<Duration> {
        match *self {
            BackupSchedule::Interval { minutes } if minutes > 0 => {
                Some(Duration::from_secs(minutes * 60))
            }
            BackupSchedule::Interval { .. } => None,
            BackupSchedule::Hourly => Some(Duration::from_secs(3600)),
            BackupSchedule::Daily { hour, minute } => {
                let at = NaiveTime::from_hms_opt(hour, minute, 0)?;
                let mut next = now.date().and_time(at);
                if next <= now {
                    next += chrono::Duration::days(1);
                }
                (next - now).to_std().ok()
            }
        }
    }

    fn describe(&self) -> String {
        match self {
            BackupSchedule::Interval { minutes } => format!("every {} minutes", minutes),
            BackupSchedule::Hourly => "hourly".to_string(),
            BackupSchedule::Daily { hour, minute } => format!("daily at {:02}:{:02}", hour, minute),
        }
    }
}

/// Takes, lists and prunes snapshots
pub struct BackupService {
    config: BackupConfig,
}

impl BackupService {
    pub fn new(config: BackupConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BackupConfig {
        &self.config
    }

    /// File name of a snapshot taken at `at`
    pub fn file_name_for(&self, at: NaiveDateTime) -> String {
        format!(
            "{}_{}.{}",
            self.config.prefix,
            at.format(TIMESTAMP_FORMAT),
            self.config.extension
        )
    }

    /// Timestamp of a snapshot file name, `None` for any other file
    pub fn parse_file_name(&self, name: &str) -> Option<NaiveDateTime> {
        let stamp = name
            .strip_prefix(self.config.prefix.as_str())?
            .strip_prefix('_')?
            .strip_suffix(self.config.extension.as_str())?
            .strip_suffix('.')?;
        NaiveDateTime::parse_from_str(stamp, TIMESTAMP_FORMAT).ok()
    }

    fn source(&self) -> AppResult<&Path> {
        self.config
            .source
            .as_deref()
            .ok_or_else(|| AppError::Internal("No database file configured for backups".to_string()))
    }

    /// Where the pre-restore copy of `database` goes, next to the database itself
    pub fn safety_copy_path(database: &Path, at: NaiveDateTime) -> PathBuf {
        let stem = database
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("database");
        let stamp = at.format(TIMESTAMP_FORMAT);
        let name = match database.extension().and_then(|e| e.to_str()) {
            Some(ext) => format!("{}_before_restore_{}.{}", stem, stamp, ext),
            None => format!("{}_before_restore_{}", stem, stamp),
        };
        database.with_file_name(name)
    }

    /// Copy the database file, then prune old snapshots
    pub async fn create_backup(&self) -> AppResult<PathBuf> {
        let source = self.source()?;
        if !tokio::fs::try_exists(source).await.unwrap_or(false) {
            return Err(AppError::Internal(format!(
                "Database file not found: {}",
                source.display()
            )));
        }

        tokio::fs::create_dir_all(&self.config.directory)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to create backup directory: {}", e)))?;

        let target = self
            .config
            .directory
            .join(self.file_name_for(Local::now().naive_local()));

        let size = tokio::fs::copy(source, &target)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to copy database: {}", e)))?;

        info!(
            "Backup created: {} ({:.2} KB)",
            target.display(),
            size as f64 / 1024.0
        );

        match self.cleanup_old_backups().await {
            Ok(0) => {}
            Ok(deleted) => info!(
                "Deleted {} old backups, kept {}",
                deleted, self.config.retention
            ),
            Err(e) => warn!("Backup cleanup failed: {}", e),
        }

        Ok(target)
    }

    /// Snapshots in the backup directory, newest first
    pub async fn list_backups(&self) -> AppResult<Vec<BackupEntry>> {
        let mut entries = Vec::new();

        let mut dir = match tokio::fs::read_dir(&self.config.directory).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(entries),
            Err(e) => {
                return Err(AppError::Internal(format!(
                    "Failed to read backup directory: {}",
                    e
                )))
            }
        };

        while let Some(entry) = dir
            .next_entry()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to read backup directory: {}", e)))?
        {
            let name = entry.file_name().to_string_lossy().into_owned();
            let Some(created_at) = self.parse_file_name(&name) else {
                continue;
            };
            let size_bytes = entry.metadata().await.map(|m| m.len()).unwrap_or(0);

            entries.push(BackupEntry {
                name,
                size_bytes,
                created_at,
            });
        }

        entries.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.name.cmp(&a.name))
        });
        Ok(entries)
    }

    /// Delete snapshots beyond the retention count; returns how many were deleted
    pub async fn cleanup_old_backups(&self) -> AppResult<usize> {
        let backups = self.list_backups().await?;
        let mut deleted = 0;

        for old in backups.iter().skip(self.config.retention) {
            let path = self.config.directory.join(&old.name);
            match tokio::fs::remove_file(&path).await {
                Ok(()) => {
                    info!("Deleted old backup {}", old.name);
                    deleted += 1;
                }
                Err(e) => warn!("Failed to delete old backup {}: {}", path.display(), e),
            }
        }

        Ok(deleted)
    }

    /// Replace the database file with the snapshot `name`, keeping a copy of the current one.
    /// Only safe while nothing holds the database open.
    pub async fn restore_backup(&self, name: &str) -> AppResult<RestoreOutcome> {
        if self.parse_file_name(name).is_none() {
            return Err(AppError::BadRequest(format!("Not a backup file: {}", name)));
        }

        let snapshot = self.config.directory.join(name);
        if !tokio::fs::try_exists(&snapshot).await.unwrap_or(false) {
            return Err(AppError::NotFound(format!(
                "Backup not found: {}",
                snapshot.display()
            )));
        }

        let database = self.source()?;
        let safety_copy = if tokio::fs::try_exists(database).await.unwrap_or(false) {
            let path = Self::safety_copy_path(database, Local::now().naive_local());
            tokio::fs::copy(database, &path)
                .await
                .map_err(|e| AppError::Internal(format!("Failed to save current database: {}", e)))?;
            info!("Safety copy created: {}", path.display());
            Some(path)
        } else {
            None
        };

        if let Some(parent) = database.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::Internal(format!("Failed to create database directory: {}", e)))?;
        }

        tokio::fs::copy(&snapshot, database)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to restore database: {}", e)))?;

        info!("Database {} restored from {}", database.display(), snapshot.display());
        Ok(RestoreOutcome {
            restored_from: snapshot,
            safety_copy,
        })
    }

    pub async fn backup_info(&self) -> AppResult<BackupInfo> {
        let backups = self.list_backups().await?;

        Ok(BackupInfo {
            count: backups.len(),
            total_size_bytes: backups.iter().map(|b| b.size_bytes).sum(),
            latest: backups.first().map(|b| b.name.clone()),
        })
    }

    /// One scheduled run; failures are logged and the schedule goes on
    async fn run_scheduled(&self) {
        if let Err(e) = self.create_backup().await {
            error!("Automatic backup failed: {}", e);
        }
    }
}

struct RunningTask {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Background task taking snapshots on a schedule
pub struct BackupScheduler {
    service: Arc<BackupService>,
    schedule: BackupSchedule,
    running: Mutex<Option<RunningTask>>,
}

impl BackupScheduler {
    pub fn new(service: Arc<BackupService>, schedule: BackupSchedule) -> Self {
        Self {
            service,
            schedule,
            running: Mutex::new(None),
        }
    }

    pub async fn is_running(&self) -> bool {
        self.running
            .lock()
            .await
            .as_ref()
            .is_some_and(|task| !task.handle.is_finished())
    }

    /// Take a snapshot now, then keep taking them on schedule
    pub async fn start(&self) -> AppResult<()> {
        let mut running = self.running.lock().await;

        if running.as_ref().is_some_and(|task| !task.handle.is_finished()) {
            warn!("Backup scheduler is already running");
            return Ok(());
        }

        if self.schedule.next_delay(Local::now().naive_local()).is_none() {
            return Err(AppError::Internal(format!(
                "Invalid backup schedule: {:?}",
                self.schedule
            )));
        }

        let (shutdown, mut shutdown_rx) = watch::channel(false);
        let service = self.service.clone();
        let schedule = self.schedule;

        let handle = tokio::spawn(async move {
            service.run_scheduled().await;

            loop {
                let Some(delay) = schedule.next_delay(Local::now().naive_local()) else {
                    error!("Invalid backup schedule, stopping");
                    break;
                };

                tokio::select! {
                    _ = tokio::time::sleep(delay) => service.run_scheduled().await,
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                }
            }

            info!("Backup scheduler stopped");
        });

        info!("Backup scheduler started ({})", self.schedule.describe());
        *running = Some(RunningTask { shutdown, handle });
        Ok(())
    }

    /// Stop the task and wait for it; stopping twice is harmless
    pub async fn stop(&self) {
        let Some(task) = self.running.lock().await.take() else {
            return;
        };

        let _ = task.shutdown.send(true);
        if let Err(e) = task.handle.await {
            error!("Backup scheduler task failed: {}", e);
        }
    }
}
