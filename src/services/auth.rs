//! Authentication, email verification and password reset

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{Duration, Utc};
use validator::Validate;

use crate::{
    config::AuthConfig,
    error::{AppError, AppResult},
    models::account::{
        normalize_email, Account, AccountClaims, EmailRequest, LoginRequest, NewAccount,
        RegisterRequest, ResetCodeRequest, ResetPasswordRequest, VerifyEmailRequest,
    },
    repository::Repository,
};

use super::{
    email::EmailService,
    tokens::{self, CredentialCheck},
};

pub const PASSWORD_TOO_SHORT: &str = "Le mot de passe doit contenir au moins 6 caractères";
const MIN_PASSWORD_CHARS: usize = 6;

/// A freshly registered account
#[derive(Debug)]
pub struct Registration {
    pub account: Account,
    /// False when the verification email could not be delivered
    pub email_sent: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmailVerification {
    Verified { email: String },
    AlreadyVerified { email: String },
}

/// Result of a successful login
#[derive(Debug)]
pub struct Session {
    pub token: String,
    pub account: Account,
}

#[derive(Clone)]
pub struct AuthService {
    repository: Repository,
    email: EmailService,
    config: AuthConfig,
}

impl AuthService {
    pub fn new(repository: Repository, email: EmailService, config: AuthConfig) -> Self {
        Self {
            repository,
            email,
            config,
        }
    }

    /// Create an unverified account and send its verification link
    pub async fn register(&self, request: RegisterRequest) -> AppResult<Registration> {
        request.validate()?;

        let email = normalize_email(request.email.as_deref())
            .ok_or_else(|| AppError::Validation("Email requis".to_string()))?;
        let password = request.password.unwrap_or_default();

        if self.repository.accounts.email_exists(&email, None).await? {
            return Err(AppError::Conflict("Cet email existe déjà".to_string()));
        }

        let token = tokens::issue_verification_token(
            Utc::now(),
            Duration::hours(self.config.verification_token_hours),
        );

        let account = self
            .repository
            .accounts
            .create(&NewAccount {
                last_name: request.last_name.unwrap_or_default().trim().to_string(),
                first_name: request.first_name.unwrap_or_default().trim().to_string(),
                email,
                password_hash: hash_password(&password)?,
                verification_token: token.value.clone(),
                verification_token_expires_at: token.expires_at,
            })
            .await?;

        tracing::info!(account_id = account.id, "Account registered");

        let email_sent = match self
            .email
            .send_verification(&account.email, &account.display_name(), &token.value)
            .await
        {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(
                    email = %account.email,
                    link = %self.email.verification_url(&token.value),
                    "Verification email not delivered: {}",
                    e
                );
                false
            }
        };

        Ok(Registration {
            account,
            email_sent,
        })
    }

    /// Consume a verification token
    pub async fn verify_email(&self, request: VerifyEmailRequest) -> AppResult<EmailVerification> {
        let token = request
            .token
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| AppError::BadRequest("Token manquant".to_string()))?;
        let invalid = || AppError::NotFound("Token invalide ou expiré".to_string());

        let account = self
            .repository
            .accounts
            .get_by_verification_token(&token)
            .await?
            .ok_or_else(invalid)?;

        if account.email_verified {
            return Ok(EmailVerification::AlreadyVerified {
                email: account.email,
            });
        }

        match tokens::check_credential(
            account.verification_token.as_deref(),
            account.verification_token_expires_at,
            &token,
            Utc::now(),
        ) {
            CredentialCheck::Valid => {}
            CredentialCheck::Expired => {
                return Err(AppError::BadRequest(
                    "Token expiré. Demandez un nouveau lien de vérification.".to_string(),
                ))
            }
            CredentialCheck::Missing | CredentialCheck::Mismatch => return Err(invalid()),
        }

        // A concurrent request may have consumed the token first
        if !self
            .repository
            .accounts
            .consume_verification_token(account.id, &token)
            .await?
        {
            return Err(invalid());
        }

        tracing::info!(account_id = account.id, "Email verified");
        Ok(EmailVerification::Verified {
            email: account.email,
        })
    }

    /// Issue a new verification token. Unknown emails succeed silently.
    pub async fn resend_verification(&self, request: EmailRequest) -> AppResult<()> {
        let email = normalize_email(request.email.as_deref())
            .ok_or_else(|| AppError::BadRequest("Email requis".to_string()))?;

        let Some(account) = self.repository.accounts.get_by_email(&email).await? else {
            tracing::debug!("Verification requested for unknown email");
            return Ok(());
        };

        if account.email_verified {
            return Err(AppError::BadRequest("Cet email est déjà vérifié".to_string()));
        }

        let token = tokens::issue_verification_token(
            Utc::now(),
            Duration::hours(self.config.verification_token_hours),
        );
        self.repository
            .accounts
            .set_verification_token(account.id, &token.value, token.expires_at)
            .await?;

        if let Err(e) = self
            .email
            .send_verification(&account.email, &account.display_name(), &token.value)
            .await
        {
            tracing::warn!(
                email = %account.email,
                link = %self.email.verification_url(&token.value),
                "Verification email not delivered: {}",
                e
            );
        }

        Ok(())
    }

    /// Check credentials and issue a JWT
    pub async fn login(&self, request: LoginRequest) -> AppResult<Session> {
        let (email, password) = match (normalize_email(request.email.as_deref()), request.password) {
            (Some(email), Some(password)) => (email, password),
            _ => return Err(AppError::BadRequest("Email et mot de passe requis".to_string())),
        };
        let rejected = || AppError::Authentication("Email ou mot de passe incorrect".to_string());

        let account = self
            .repository
            .accounts
            .get_by_email(&email)
            .await?
            .ok_or_else(rejected)?;

        if !verify_password(&account.password_hash, &password)? {
            return Err(rejected());
        }

        if !account.email_verified {
            return Err(AppError::EmailNotVerified {
                email: account.email,
            });
        }

        let token = self.create_token(&account)?;
        tracing::info!(account_id = account.id, "Login");

        Ok(Session { token, account })
    }

    fn create_token(&self, account: &Account) -> AppResult<String> {
        let now = Utc::now();
        let exp = now + Duration::hours(self.config.jwt_expiration_hours as i64);

        let claims = AccountClaims {
            sub: account.id.to_string(),
            account_id: account.id,
            email: account.email.clone(),
            role: account.role,
            jti: uuid::Uuid::new_v4().to_string(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
        };

        claims
            .create_token(&self.config.jwt_secret)
            .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))
    }

    /// Revoke the presented token
    pub async fn logout(&self, claims: &AccountClaims) -> AppResult<()> {
        self.repository
            .accounts
            .revoke_token(&claims.jti, claims.exp)
            .await?;

        let purged = self
            .repository
            .accounts
            .purge_revoked_tokens(Utc::now().timestamp())
            .await?;
        if purged > 0 {
            tracing::debug!("Purged {} expired revoked tokens", purged);
        }

        Ok(())
    }

    pub async fn is_token_revoked(&self, jti: &str) -> AppResult<bool> {
        self.repository.accounts.is_token_revoked(jti).await
    }

    /// Current account
    pub async fn me(&self, account_id: i64) -> AppResult<Account> {
        self.repository.accounts.get_by_id(account_id).await
    }

    /// Issue a reset code. Unknown emails succeed silently.
    pub async fn forgot_password(&self, request: EmailRequest) -> AppResult<()> {
        let email = normalize_email(request.email.as_deref())
            .ok_or_else(|| AppError::BadRequest("Email requis".to_string()))?;

        let Some(account) = self.repository.accounts.get_by_email(&email).await? else {
            tracing::debug!("Reset code requested for unknown email");
            return Ok(());
        };

        let code = tokens::issue_reset_code(
            Utc::now(),
            Duration::minutes(self.config.reset_code_minutes),
        );
        self.repository
            .accounts
            .set_reset_code(account.id, &code.value, code.expires_at)
            .await?;

        if let Err(e) = self
            .email
            .send_reset_code(&account.email, &account.display_name(), &code.value)
            .await
        {
            tracing::warn!(
                email = %account.email,
                code = %code.value,
                expires_at = %code.expires_at,
                "Reset code email not delivered: {}",
                e
            );
        }

        Ok(())
    }

    /// Check a reset code without consuming it
    pub async fn verify_reset_code(&self, request: ResetCodeRequest) -> AppResult<()> {
        let (email, code) = match (
            normalize_email(request.email.as_deref()),
            request.code.filter(|c| !c.is_empty()),
        ) {
            (Some(email), Some(code)) => (email, code),
            _ => return Err(AppError::BadRequest("Email et code requis".to_string())),
        };

        let account = self.account_for_reset(&email).await?;
        check_reset_code(&account, &code, "Code expiré. Demandez un nouveau code")
    }

    /// Consume a reset code and set the new password
    pub async fn reset_password_with_code(&self, request: ResetPasswordRequest) -> AppResult<()> {
        let (email, code, password) = match (
            normalize_email(request.email.as_deref()),
            request.code.filter(|c| !c.is_empty()),
            request.password.filter(|p| !p.is_empty()),
        ) {
            (Some(email), Some(code), Some(password)) => (email, code, password),
            _ => return Err(AppError::BadRequest("Tous les champs sont requis".to_string())),
        };

        if password.chars().count() < MIN_PASSWORD_CHARS {
            return Err(AppError::Validation(PASSWORD_TOO_SHORT.to_string()));
        }

        let account = self.account_for_reset(&email).await?;
        check_reset_code(&account, &code, "Code expiré")?;

        let password_hash = hash_password(&password)?;
        if !self
            .repository
            .accounts
            .reset_password(account.id, &code, &password_hash)
            .await?
        {
            return Err(AppError::BadRequest(
                "Aucun code de réinitialisation actif".to_string(),
            ));
        }

        tracing::info!(account_id = account.id, "Password reset with code");

        if let Err(e) = self
            .email
            .send_password_changed(&account.email, &account.display_name())
            .await
        {
            tracing::warn!(email = %account.email, "Password change notice not delivered: {}", e);
        }

        Ok(())
    }

    async fn account_for_reset(&self, email: &str) -> AppResult<Account> {
        self.repository
            .accounts
            .get_by_email(email)
            .await?
            .ok_or_else(|| AppError::NotFound("Email non trouvé".to_string()))
    }
}

fn check_reset_code(account: &Account, code: &str, expired_message: &str) -> AppResult<()> {
    match tokens::check_credential(
        account.reset_code.as_deref(),
        account.reset_code_expires_at,
        code,
        Utc::now(),
    ) {
        CredentialCheck::Valid => Ok(()),
        CredentialCheck::Missing => Err(AppError::BadRequest(
            "Aucun code de réinitialisation actif".to_string(),
        )),
        CredentialCheck::Expired => Err(AppError::BadRequest(expired_message.to_string())),
        CredentialCheck::Mismatch => Err(AppError::BadRequest("Code incorrect".to_string())),
    }
}

/// Hash a password using Argon2
pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;
    Ok(hash.to_string())
}

/// Check a password against a stored Argon2 hash
pub fn verify_password(hash: &str, password: &str) -> AppResult<bool> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|_| AppError::Internal("Invalid password hash".to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_hash_roundtrip() {
        let hash = hash_password("secret1").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password(&hash, "secret1").unwrap());
        assert!(!verify_password(&hash, "secret2").unwrap());
    }

    #[test]
    fn test_invalid_stored_hash_is_internal_error() {
        assert!(matches!(
            verify_password("plaintext", "plaintext"),
            Err(AppError::Internal(_))
        ));
    }
}
