//! Verification tokens and password reset codes
//!
//! Both credentials are single-use and time-boxed: a credential issued at `t`
//! with lifetime `d` is accepted up to and including the instant `t + d`.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Duration, Utc};
use rand::Rng;

/// Number of random bytes in a verification token
const TOKEN_BYTES: usize = 32;
/// Number of digits in a reset code
const CODE_DIGITS: usize = 6;

/// A credential together with the instant it stops being valid
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedCredential {
    pub value: String,
    pub expires_at: DateTime<Utc>,
}

/// Why a presented credential was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialCheck {
    Valid,
    /// Nothing is currently issued
    Missing,
    Expired,
    Mismatch,
}

/// Generate a URL-safe verification token valid for `lifetime`
pub fn issue_verification_token(now: DateTime<Utc>, lifetime: Duration) -> IssuedCredential {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill(&mut bytes);

    IssuedCredential {
        value: URL_SAFE_NO_PAD.encode(bytes),
        expires_at: now + lifetime,
    }
}

/// Generate a numeric reset code valid for `lifetime`
pub fn issue_reset_code(now: DateTime<Utc>, lifetime: Duration) -> IssuedCredential {
    let mut rng = rand::thread_rng();
    let value = (0..CODE_DIGITS)
        .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
        .collect();

    IssuedCredential {
        value,
        expires_at: now + lifetime,
    }
}

/// Check a presented credential against the stored one at instant `now`
pub fn check_credential(
    stored: Option<&str>,
    expires_at: Option<DateTime<Utc>>,
    presented: &str,
    now: DateTime<Utc>,
) -> CredentialCheck {
    let (stored, expires_at) = match (stored, expires_at) {
        (Some(stored), Some(expires_at)) => (stored, expires_at),
        _ => return CredentialCheck::Missing,
    };

    if now > expires_at {
        CredentialCheck::Expired
    } else if stored != presented {
        CredentialCheck::Mismatch
    } else {
        CredentialCheck::Valid
    }
}
