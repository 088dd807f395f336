//! Business logic services

pub mod auth;
pub mod backup;
pub mod catalog;
pub mod email;
pub mod loans;
pub mod profile;
pub mod stats;
pub mod tokens;

use std::sync::Arc;

use crate::{config::AppConfig, repository::Repository};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub auth: auth::AuthService,
    pub profile: profile::ProfileService,
    pub catalog: catalog::CatalogService,
    pub loans: loans::LoansService,
    pub stats: stats::StatsService,
    pub backup: Arc<backup::BackupService>,
    pub repository: Repository,
}

impl Services {
    /// Create all services, sending email as configured
    pub fn new(repository: Repository, config: &AppConfig) -> Self {
        let email = email::EmailService::from_config(&config.email, &config.auth.frontend_url);
        Self::with_email(repository, config, email)
    }

    /// Create all services with an explicit email service
    pub fn with_email(repository: Repository, config: &AppConfig, email: email::EmailService) -> Self {
        Self {
            auth: auth::AuthService::new(repository.clone(), email, config.auth.clone()),
            profile: profile::ProfileService::new(repository.clone(), config.uploads.clone()),
            catalog: catalog::CatalogService::new(repository.clone()),
            loans: loans::LoansService::new(repository.clone(), &config.loans),
            stats: stats::StatsService::new(repository.clone()),
            backup: Arc::new(backup::BackupService::new(config.backup.clone())),
            repository,
        }
    }
}
