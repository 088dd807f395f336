//! Email verification and password reset lifecycles

mod common;

use std::sync::Arc;

use chrono::{Duration, Utc};

use bibliotech_server::{
    error::AppError,
    models::account::{EmailRequest, LoginRequest, ResetCodeRequest, ResetPasswordRequest, VerifyEmailRequest},
    services::auth::EmailVerification,
};
use common::{setup, setup_with_mailer, FailingMailer, RecordingMailer, PASSWORD};

fn login(email: &str, password: &str) -> LoginRequest {
    LoginRequest {
        email: Some(email.to_string()),
        password: Some(password.to_string()),
    }
}

fn reset_request(email: &str, code: &str, password: &str) -> ResetPasswordRequest {
    ResetPasswordRequest {
        email: Some(email.to_string()),
        code: Some(code.to_string()),
        password: Some(password.to_string()),
    }
}

fn bad_request_message(err: AppError) -> String {
    match err {
        AppError::BadRequest(msg) | AppError::Validation(msg) => msg,
        other => panic!("expected a 400 error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_login_refused_until_email_verified() {
    let app = setup().await;
    app.services
        .auth
        .register(common::register_request("lea@example.org"))
        .await
        .unwrap();

    let err = app
        .services
        .auth
        .login(login("lea@example.org", PASSWORD))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::EmailNotVerified { ref email } if email == "lea@example.org"));

    let token = common::verification_token_sent_to(&app.mailer, "lea@example.org");
    let verified = app
        .services
        .auth
        .verify_email(VerifyEmailRequest { token: Some(token) })
        .await
        .unwrap();
    assert_eq!(
        verified,
        EmailVerification::Verified {
            email: "lea@example.org".to_string()
        }
    );

    let session = app
        .services
        .auth
        .login(login("Lea@Example.org", PASSWORD))
        .await
        .unwrap();
    assert!(!session.token.is_empty());
    assert!(session.account.email_verified);
}

#[tokio::test]
async fn test_wrong_password_is_unauthorized() {
    let app = setup().await;
    common::verified_account(&app, "lea@example.org").await;

    let err = app
        .services
        .auth
        .login(login("lea@example.org", "nope-nope"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Authentication(ref msg) if msg == "Email ou mot de passe incorrect"));

    let err = app
        .services
        .auth
        .login(login("nobody@example.org", PASSWORD))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Authentication(_)));
}

#[tokio::test]
async fn test_verification_token_is_accepted_once() {
    let app = setup().await;
    app.services
        .auth
        .register(common::register_request("lea@example.org"))
        .await
        .unwrap();
    let token = common::verification_token_sent_to(&app.mailer, "lea@example.org");

    app.services
        .auth
        .verify_email(VerifyEmailRequest { token: Some(token.clone()) })
        .await
        .unwrap();

    let err = app
        .services
        .auth
        .verify_email(VerifyEmailRequest { token: Some(token) })
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(ref msg) if msg == "Token invalide ou expiré"));
}

#[tokio::test]
async fn test_expired_verification_token() {
    let app = setup().await;
    let registration = app
        .services
        .auth
        .register(common::register_request("lea@example.org"))
        .await
        .unwrap();
    let token = common::verification_token_sent_to(&app.mailer, "lea@example.org");

    sqlx::query("UPDATE accounts SET verification_token_expires_at = ? WHERE id = ?")
        .bind(Utc::now() - Duration::seconds(1))
        .bind(registration.account.id)
        .execute(&app.pool)
        .await
        .unwrap();

    let err = app
        .services
        .auth
        .verify_email(VerifyEmailRequest { token: Some(token) })
        .await
        .unwrap_err();
    assert_eq!(
        bad_request_message(err),
        "Token expiré. Demandez un nouveau lien de vérification."
    );

    // A fresh link works
    app.services
        .auth
        .resend_verification(EmailRequest {
            email: Some("lea@example.org".to_string()),
        })
        .await
        .unwrap();
    let token = common::verification_token_sent_to(&app.mailer, "lea@example.org");
    assert!(app
        .services
        .auth
        .verify_email(VerifyEmailRequest { token: Some(token) })
        .await
        .is_ok());
}

#[tokio::test]
async fn test_missing_token() {
    let app = setup().await;
    let err = app
        .services
        .auth
        .verify_email(VerifyEmailRequest { token: None })
        .await
        .unwrap_err();
    assert_eq!(bad_request_message(err), "Token manquant");
}

#[tokio::test]
async fn test_resend_to_verified_account_is_refused() {
    let app = setup().await;
    common::verified_account(&app, "lea@example.org").await;

    let err = app
        .services
        .auth
        .resend_verification(EmailRequest {
            email: Some("lea@example.org".to_string()),
        })
        .await
        .unwrap_err();
    assert_eq!(bad_request_message(err), "Cet email est déjà vérifié");
}

#[tokio::test]
async fn test_unknown_email_gets_no_mail_and_no_error() {
    let app = setup().await;

    app.services
        .auth
        .forgot_password(EmailRequest {
            email: Some("ghost@example.org".to_string()),
        })
        .await
        .unwrap();
    app.services
        .auth
        .resend_verification(EmailRequest {
            email: Some("ghost@example.org".to_string()),
        })
        .await
        .unwrap();

    assert!(app.mailer.sent().is_empty());
}

#[tokio::test]
async fn test_reset_code_is_single_use() {
    let app = setup().await;
    common::verified_account(&app, "lea@example.org").await;

    app.services
        .auth
        .forgot_password(EmailRequest {
            email: Some("lea@example.org".to_string()),
        })
        .await
        .unwrap();
    let code = common::reset_code_sent_to(&app.mailer, "lea@example.org");

    // Checking does not consume
    for _ in 0..2 {
        app.services
            .auth
            .verify_reset_code(ResetCodeRequest {
                email: Some("lea@example.org".to_string()),
                code: Some(code.clone()),
            })
            .await
            .unwrap();
    }

    app.services
        .auth
        .reset_password_with_code(reset_request("lea@example.org", &code, "nouveau-secret"))
        .await
        .unwrap();

    let err = app
        .services
        .auth
        .reset_password_with_code(reset_request("lea@example.org", &code, "encore-autre"))
        .await
        .unwrap_err();
    assert_eq!(bad_request_message(err), "Aucun code de réinitialisation actif");

    // Old password is gone, new one works, and a notice was sent
    assert!(app
        .services
        .auth
        .login(login("lea@example.org", PASSWORD))
        .await
        .is_err());
    assert!(app
        .services
        .auth
        .login(login("lea@example.org", "nouveau-secret"))
        .await
        .is_ok());
    let notice = app.mailer.last_to("lea@example.org").unwrap();
    assert!(notice.subject.contains("Mot de passe modifié"));
}

#[tokio::test]
async fn test_reset_code_expiry_boundary() {
    let app = setup().await;
    let account = common::verified_account(&app, "lea@example.org").await;

    app.services
        .auth
        .forgot_password(EmailRequest {
            email: Some("lea@example.org".to_string()),
        })
        .await
        .unwrap();
    let code = common::reset_code_sent_to(&app.mailer, "lea@example.org");
    let check = ResetCodeRequest {
        email: Some("lea@example.org".to_string()),
        code: Some(code.clone()),
    };

    // Still valid a moment before expiry
    sqlx::query("UPDATE accounts SET reset_code_expires_at = ? WHERE id = ?")
        .bind(Utc::now() + Duration::seconds(5))
        .bind(account.id)
        .execute(&app.pool)
        .await
        .unwrap();
    app.services
        .auth
        .verify_reset_code(ResetCodeRequest {
            email: check.email.clone(),
            code: check.code.clone(),
        })
        .await
        .unwrap();

    sqlx::query("UPDATE accounts SET reset_code_expires_at = ? WHERE id = ?")
        .bind(Utc::now() - Duration::seconds(1))
        .bind(account.id)
        .execute(&app.pool)
        .await
        .unwrap();

    let err = app.services.auth.verify_reset_code(check).await.unwrap_err();
    assert_eq!(bad_request_message(err), "Code expiré. Demandez un nouveau code");

    let err = app
        .services
        .auth
        .reset_password_with_code(reset_request("lea@example.org", &code, "nouveau-secret"))
        .await
        .unwrap_err();
    assert_eq!(bad_request_message(err), "Code expiré");

    // Nothing changed
    assert!(app
        .services
        .auth
        .login(login("lea@example.org", PASSWORD))
        .await
        .is_ok());
}

#[tokio::test]
async fn test_wrong_code_and_unknown_email() {
    let app = setup().await;
    common::verified_account(&app, "lea@example.org").await;

    let err = app
        .services
        .auth
        .verify_reset_code(ResetCodeRequest {
            email: Some("lea@example.org".to_string()),
            code: Some("123456".to_string()),
        })
        .await
        .unwrap_err();
    assert_eq!(bad_request_message(err), "Aucun code de réinitialisation actif");

    app.services
        .auth
        .forgot_password(EmailRequest {
            email: Some("lea@example.org".to_string()),
        })
        .await
        .unwrap();
    let code = common::reset_code_sent_to(&app.mailer, "lea@example.org");
    let wrong = if code == "000000" { "111111" } else { "000000" };

    let err = app
        .services
        .auth
        .reset_password_with_code(reset_request("lea@example.org", wrong, "nouveau-secret"))
        .await
        .unwrap_err();
    assert_eq!(bad_request_message(err), "Code incorrect");

    let err = app
        .services
        .auth
        .verify_reset_code(ResetCodeRequest {
            email: Some("ghost@example.org".to_string()),
            code: Some(code),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(ref msg) if msg == "Email non trouvé"));
}

#[tokio::test]
async fn test_reset_validates_input_first() {
    let app = setup().await;

    let err = app
        .services
        .auth
        .reset_password_with_code(ResetPasswordRequest {
            email: Some("lea@example.org".to_string()),
            code: None,
            password: Some("nouveau-secret".to_string()),
        })
        .await
        .unwrap_err();
    assert_eq!(bad_request_message(err), "Tous les champs sont requis");

    let err = app
        .services
        .auth
        .reset_password_with_code(reset_request("lea@example.org", "123456", "court"))
        .await
        .unwrap_err();
    assert_eq!(
        bad_request_message(err),
        "Le mot de passe doit contenir au moins 6 caractères"
    );
}

#[tokio::test]
async fn test_new_code_replaces_previous_one() {
    let app = setup().await;
    common::verified_account(&app, "lea@example.org").await;
    let request = || EmailRequest {
        email: Some("lea@example.org".to_string()),
    };

    app.services.auth.forgot_password(request()).await.unwrap();
    let first = common::reset_code_sent_to(&app.mailer, "lea@example.org");
    app.services.auth.forgot_password(request()).await.unwrap();
    let second = common::reset_code_sent_to(&app.mailer, "lea@example.org");

    if first != second {
        let err = app
            .services
            .auth
            .verify_reset_code(ResetCodeRequest {
                email: Some("lea@example.org".to_string()),
                code: Some(first),
            })
            .await
            .unwrap_err();
        assert_eq!(bad_request_message(err), "Code incorrect");
    }
    assert!(app
        .services
        .auth
        .verify_reset_code(ResetCodeRequest {
            email: Some("lea@example.org".to_string()),
            code: Some(second),
        })
        .await
        .is_ok());
}

#[tokio::test]
async fn test_email_failure_is_not_fatal() {
    let recorder = Arc::new(RecordingMailer::default());
    let app = setup_with_mailer(Arc::new(FailingMailer), recorder).await;

    let registration = app
        .services
        .auth
        .register(common::register_request("lea@example.org"))
        .await
        .unwrap();
    assert!(!registration.email_sent);

    // The token was stored and stays usable
    let token: String = sqlx::query_scalar("SELECT verification_token FROM accounts WHERE id = ?")
        .bind(registration.account.id)
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert!(app
        .services
        .auth
        .verify_email(VerifyEmailRequest { token: Some(token) })
        .await
        .is_ok());

    // Same for reset codes
    app.services
        .auth
        .forgot_password(EmailRequest {
            email: Some("lea@example.org".to_string()),
        })
        .await
        .unwrap();
    let code: Option<String> = sqlx::query_scalar("SELECT reset_code FROM accounts WHERE id = ?")
        .bind(registration.account.id)
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(code.map(|c| c.len()), Some(6));
}

#[tokio::test]
async fn test_duplicate_registration() {
    let app = setup().await;
    app.services
        .auth
        .register(common::register_request("lea@example.org"))
        .await
        .unwrap();

    let err = app
        .services
        .auth
        .register(common::register_request("LEA@example.org"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(ref msg) if msg == "Cet email existe déjà"));
}

#[tokio::test]
async fn test_logout_revokes_token() {
    let app = setup().await;
    common::verified_account(&app, "lea@example.org").await;
    let session = app
        .services
        .auth
        .login(login("lea@example.org", PASSWORD))
        .await
        .unwrap();

    let claims = bibliotech_server::models::AccountClaims::from_token(
        &session.token,
        &app.config.auth.jwt_secret,
    )
    .unwrap();
    assert!(!app.services.auth.is_token_revoked(&claims.jti).await.unwrap());

    app.services.auth.logout(&claims).await.unwrap();
    assert!(app.services.auth.is_token_revoked(&claims.jti).await.unwrap());
    // Logging out twice is harmless
    app.services.auth.logout(&claims).await.unwrap();
}
