//! Shared helpers for integration tests

#![allow(dead_code)]

use std::str::FromStr;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Pool, Sqlite,
};

use bibliotech_server::{
    config::AppConfig,
    error::{AppError, AppResult},
    models::account::{Account, RegisterRequest},
    repository::Repository,
    services::{
        email::{EmailService, Mailer, OutgoingEmail},
        Services,
    },
};

pub const PASSWORD: &str = "secret1";

/// Keeps every message instead of sending it
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<OutgoingEmail>>,
}

impl RecordingMailer {
    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().unwrap().clone()
    }

    pub fn last_to(&self, to: &str) -> Option<OutgoingEmail> {
        self.sent().into_iter().rev().find(|m| m.to == to)
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: OutgoingEmail) -> AppResult<()> {
        self.sent.lock().unwrap().push(email);
        Ok(())
    }
}

/// Fails every delivery, like an unreachable SMTP server
pub struct FailingMailer;

#[async_trait]
impl Mailer for FailingMailer {
    async fn send(&self, _email: OutgoingEmail) -> AppResult<()> {
        Err(AppError::Internal("SMTP connection refused".to_string()))
    }
}

pub struct TestApp {
    pub pool: Pool<Sqlite>,
    pub config: AppConfig,
    pub services: Services,
    pub mailer: Arc<RecordingMailer>,
}

/// Fresh in-memory database with migrations applied
pub async fn test_pool() -> Pool<Sqlite> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .unwrap()
        .foreign_keys(true);

    // One connection that never recycles: the in-memory database lives with it
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
        .unwrap();

    sqlx::migrate!("./migrations").run(&pool).await.unwrap();
    pool
}

pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.auth.jwt_secret = "test-secret".to_string();
    config.backup.enabled = false;
    config.uploads.directory = std::env::temp_dir().join("bibliotech-test-uploads");
    config
}

pub async fn setup() -> TestApp {
    let mailer = Arc::new(RecordingMailer::default());
    setup_with_mailer(mailer.clone(), mailer).await
}

/// Services delivering through `delivery`; `mailer` is what the test inspects
pub async fn setup_with_mailer(delivery: Arc<dyn Mailer>, mailer: Arc<RecordingMailer>) -> TestApp {
    let pool = test_pool().await;
    let config = test_config();
    let email = EmailService::new(delivery, config.auth.frontend_url.clone());
    let services = Services::with_email(Repository::new(pool.clone()), &config, email);

    TestApp {
        pool,
        config,
        services,
        mailer,
    }
}

pub fn register_request(email: &str) -> RegisterRequest {
    RegisterRequest {
        last_name: Some("Martin".to_string()),
        first_name: Some("Léa".to_string()),
        email: Some(email.to_string()),
        password: Some(PASSWORD.to_string()),
    }
}

/// Register an account and mark it verified
pub async fn verified_account(app: &TestApp, email: &str) -> Account {
    let registration = app.services.auth.register(register_request(email)).await.unwrap();

    sqlx::query("UPDATE accounts SET email_verified = 1, verification_token = NULL WHERE id = ?")
        .bind(registration.account.id)
        .execute(&app.pool)
        .await
        .unwrap();

    app.services.auth.me(registration.account.id).await.unwrap()
}

/// Token from the last verification link sent to `to`
pub fn verification_token_sent_to(mailer: &RecordingMailer, to: &str) -> String {
    let email = mailer.last_to(to).expect("no email sent");
    let start = email.body.find("token=").expect("no link in email") + "token=".len();
    email.body[start..]
        .split_whitespace()
        .next()
        .unwrap()
        .to_string()
}

/// Six-digit code from the last reset email sent to `to`
pub fn reset_code_sent_to(mailer: &RecordingMailer, to: &str) -> String {
    let email = mailer.last_to(to).expect("no email sent");
    email
        .body
        .split(|c: char| !c.is_ascii_digit())
        .find(|part| part.len() == 6)
        .expect("no code in email")
        .to_string()
}
