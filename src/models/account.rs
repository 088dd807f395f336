//! Account model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use crate::error::AppError;

/// Account role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
pub enum Role {
    #[serde(rename = "utilisateur")]
    #[sqlx(rename = "utilisateur")]
    User,
    #[serde(rename = "admin")]
    #[sqlx(rename = "admin")]
    Admin,
}

/// Account of a library owner, as stored in the database
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct Account {
    #[serde(rename = "id_utilisateur")]
    pub id: i64,
    #[serde(rename = "nom")]
    pub last_name: String,
    #[serde(rename = "prenom")]
    pub first_name: String,
    pub email: String,
    /// Hashed password (argon2)
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    #[serde(rename = "date_creation")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "photo_profil")]
    pub photo: String,
    #[serde(skip_serializing)]
    pub reset_code: Option<String>,
    #[serde(skip_serializing)]
    pub reset_code_expires_at: Option<DateTime<Utc>>,
    pub email_verified: bool,
    #[serde(skip_serializing)]
    pub verification_token: Option<String>,
    #[serde(skip_serializing)]
    pub verification_token_expires_at: Option<DateTime<Utc>>,
}

impl Account {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Registration request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterRequest {
    #[serde(rename = "nom")]
    #[validate(required(message = "Le nom est requis"), length(min = 1, message = "Le nom est requis"))]
    pub last_name: Option<String>,
    #[serde(rename = "prenom")]
    #[validate(required(message = "Le prénom est requis"), length(min = 1, message = "Le prénom est requis"))]
    pub first_name: Option<String>,
    #[validate(required(message = "Email requis"), email(message = "Format d'email invalide"))]
    pub email: Option<String>,
    #[serde(rename = "mot_de_passe")]
    #[validate(
        required(message = "Le mot de passe est requis"),
        length(min = 6, message = "Le mot de passe doit contenir au moins 6 caractères")
    )]
    pub password: Option<String>,
}

/// New account ready to be inserted
#[derive(Debug)]
pub struct NewAccount {
    pub last_name: String,
    pub first_name: String,
    pub email: String,
    pub password_hash: String,
    pub verification_token: String,
    pub verification_token_expires_at: DateTime<Utc>,
}

/// Update own profile request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateProfile {
    #[serde(rename = "nom")]
    pub last_name: Option<String>,
    #[serde(rename = "prenom")]
    pub first_name: Option<String>,
    #[validate(email(message = "Format d'email invalide"))]
    pub email: Option<String>,
    /// Current password (required to change password)
    #[serde(rename = "ancien_mot_de_passe")]
    pub current_password: Option<String>,
    #[serde(rename = "nouveau_mot_de_passe")]
    #[validate(length(min = 6, message = "Le mot de passe doit contenir au moins 6 caractères"))]
    pub new_password: Option<String>,
}

/// Login request
#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: Option<String>,
    #[serde(rename = "mot_de_passe")]
    pub password: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct VerifyEmailRequest {
    pub token: Option<String>,
}

/// Request carrying only an email (resend verification, forgot password)
#[derive(Debug, Deserialize, ToSchema)]
pub struct EmailRequest {
    pub email: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ResetCodeRequest {
    pub email: Option<String>,
    pub code: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ResetPasswordRequest {
    pub email: Option<String>,
    pub code: Option<String>,
    #[serde(rename = "mot_de_passe")]
    pub password: Option<String>,
}

/// Lowercase and trim an email address; empty input counts as absent
pub fn normalize_email(email: Option<&str>) -> Option<String> {
    email
        .map(|e| e.trim().to_lowercase())
        .filter(|e| !e.is_empty())
}

/// JWT claims for authenticated accounts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountClaims {
    /// Account id as string (JWT subject)
    pub sub: String,
    pub account_id: i64,
    pub email: String,
    pub role: Role,
    /// Token id, used for revocation on logout
    pub jti: String,
    pub exp: i64,
    pub iat: i64,
}

impl AccountClaims {
    /// Create a new JWT token
    pub fn create_token(&self, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{encode, EncodingKey, Header};
        encode(
            &Header::default(),
            self,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
    }

    /// Parse JWT token
    pub fn from_token(token: &str, secret: &str) -> Result<Self, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{decode, DecodingKey, Validation};
        let token_data = decode::<Self>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )?;
        Ok(token_data.claims)
    }

    /// Require admin privileges
    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.role == Role::Admin {
            Ok(())
        } else {
            Err(AppError::Authorization("Privilèges administrateur requis".to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(role: Role, exp: i64) -> AccountClaims {
        AccountClaims {
            sub: "7".to_string(),
            account_id: 7,
            email: "lea@example.org".to_string(),
            role,
            jti: "jti-1".to_string(),
            exp,
            iat: Utc::now().timestamp(),
        }
    }

    #[test]
    fn test_token_roundtrip_keeps_account() {
        let exp = Utc::now().timestamp() + 3600;
        let token = claims(Role::User, exp).create_token("secret").unwrap();
        let parsed = AccountClaims::from_token(&token, "secret").unwrap();
        assert_eq!(parsed.account_id, 7);
        assert_eq!(parsed.role, Role::User);
        assert!(AccountClaims::from_token(&token, "other-secret").is_err());
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let exp = Utc::now().timestamp() - 3600;
        let token = claims(Role::User, exp).create_token("secret").unwrap();
        assert!(AccountClaims::from_token(&token, "secret").is_err());
    }

    #[test]
    fn test_require_admin() {
        let exp = Utc::now().timestamp() + 60;
        assert!(claims(Role::Admin, exp).require_admin().is_ok());
        assert!(claims(Role::User, exp).require_admin().is_err());
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(
            normalize_email(Some("  Lea@Example.ORG ")).as_deref(),
            Some("lea@example.org")
        );
        assert_eq!(normalize_email(Some("   ")), None);
        assert_eq!(normalize_email(None), None);
    }

    #[test]
    fn test_register_request_validation() {
        let request = RegisterRequest {
            last_name: Some("Martin".into()),
            first_name: Some("Léa".into()),
            email: Some("not-an-email".into()),
            password: Some("secret1".into()),
        };
        assert!(request.validate().is_err());

        let request = RegisterRequest {
            email: Some("lea@example.org".into()),
            ..request
        };
        assert!(request.validate().is_ok());
    }
}
