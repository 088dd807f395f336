//! Own-profile management: details, password change, photo, account deletion

use std::path::{Path, PathBuf};

use validator::Validate;

use crate::{
    config::UploadsConfig,
    error::{AppError, AppResult},
    models::account::{normalize_email, Account, UpdateProfile},
    repository::Repository,
};

use super::auth::{hash_password, verify_password};

pub const DEFAULT_PHOTO: &str = "default.png";

#[derive(Clone)]
pub struct ProfileService {
    repository: Repository,
    uploads: UploadsConfig,
}

impl ProfileService {
    pub fn new(repository: Repository, uploads: UploadsConfig) -> Self {
        Self {
            repository,
            uploads,
        }
    }

    /// Directory holding uploaded profile photos
    pub fn photos_dir(&self) -> PathBuf {
        self.uploads.directory.join("profiles")
    }

    pub async fn get_profile(&self, account_id: i64) -> AppResult<Account> {
        self.repository.accounts.get_by_id(account_id).await
    }

    /// Update name, email and, given the current password, the password
    pub async fn update_profile(&self, account_id: i64, update: UpdateProfile) -> AppResult<Account> {
        update.validate()?;
        let account = self.repository.accounts.get_by_id(account_id).await?;

        let email = normalize_email(update.email.as_deref()).filter(|e| *e != account.email);
        if let Some(ref email) = email {
            if self
                .repository
                .accounts
                .email_exists(email, Some(account_id))
                .await?
            {
                return Err(AppError::Conflict("Cet email est déjà utilisé".to_string()));
            }
        }

        let password_hash = match update.new_password.as_deref().filter(|p| !p.is_empty()) {
            Some(new_password) => {
                let current = update
                    .current_password
                    .as_deref()
                    .filter(|p| !p.is_empty())
                    .ok_or_else(|| AppError::BadRequest("Ancien mot de passe requis".to_string()))?;

                if !verify_password(&account.password_hash, current)? {
                    return Err(AppError::BadRequest("Ancien mot de passe incorrect".to_string()));
                }
                Some(hash_password(new_password)?)
            }
            None => None,
        };

        let last_name = non_empty(update.last_name.as_deref());
        let first_name = non_empty(update.first_name.as_deref());

        let updated = self
            .repository
            .accounts
            .update_profile(
                account_id,
                last_name,
                first_name,
                email.as_deref(),
                password_hash.as_deref(),
            )
            .await?;

        tracing::info!(account_id, "Profile updated");
        Ok(updated)
    }

    /// Store a new profile photo and return its file name
    pub async fn update_photo(
        &self,
        account_id: i64,
        file_name: &str,
        data: &[u8],
    ) -> AppResult<String> {
        if file_name.trim().is_empty() {
            return Err(AppError::BadRequest("Aucune photo sélectionnée".to_string()));
        }
        if !self.is_allowed(file_name) {
            return Err(AppError::BadRequest("Format de fichier non autorisé".to_string()));
        }
        if data.len() > self.uploads.max_size_bytes {
            return Err(AppError::BadRequest("Fichier trop volumineux".to_string()));
        }

        let account = self.repository.accounts.get_by_id(account_id).await?;

        let stored_name = format!(
            "{}_{}",
            &uuid::Uuid::new_v4().simple().to_string()[..16],
            sanitize_file_name(file_name)
        );

        let dir = self.photos_dir();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to create upload directory: {}", e)))?;
        tokio::fs::write(dir.join(&stored_name), data)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to save photo: {}", e)))?;

        self.repository
            .accounts
            .update_photo(account_id, &stored_name)
            .await?;

        self.remove_photo(&account.photo).await;

        Ok(stored_name)
    }

    /// Delete the account with everything it owns
    pub async fn delete_account(&self, account_id: i64) -> AppResult<()> {
        let account = self.repository.accounts.get_by_id(account_id).await?;
        self.repository.accounts.delete(account_id).await?;
        self.remove_photo(&account.photo).await;

        tracing::info!(account_id, "Account deleted");
        Ok(())
    }

    fn is_allowed(&self, file_name: &str) -> bool {
        Path::new(file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                let ext = ext.to_lowercase();
                self.uploads.allowed_extensions.iter().any(|a| *a == ext)
            })
            .unwrap_or(false)
    }

    async fn remove_photo(&self, photo: &str) {
        if photo == DEFAULT_PHOTO {
            return;
        }
        let path = self.photos_dir().join(photo);
        if let Err(e) = tokio::fs::remove_file(&path).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!("Failed to remove old photo {}: {}", path.display(), e);
            }
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Keep only the base name, with characters safe for a file system path
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');

    if cleaned.is_empty() {
        "photo".to_string()
    } else {
        cleaned.to_string()
    }
}
