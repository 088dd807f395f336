//! HTTP-level tests through the full router

mod common;

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use bibliotech_server::{api, AppState};
use common::{setup, TestApp, PASSWORD};

fn router(app: &TestApp) -> Router {
    api::create_router(AppState {
        config: Arc::new(app.config.clone()),
        services: Arc::new(app.services.clone()),
    })
}

async fn send(
    router: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<&str>,
) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        request = request.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => request
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string())),
        None => request.body(Body::empty()),
    }
    .unwrap();

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn login_token(router: &Router, email: &str) -> String {
    let (status, body) = send(
        router,
        Method::POST,
        "/api/v1/auth/login",
        None,
        Some(&json!({ "email": email, "mot_de_passe": PASSWORD }).to_string()),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health() {
    let app = setup().await;
    let router = router(&app);

    let (status, body) = send(&router, Method::GET, "/api/v1/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) = send(&router, Method::GET, "/api/v1/ready", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
}

#[tokio::test]
async fn test_register_then_login_requires_verification() {
    let app = setup().await;
    let router = router(&app);

    let (status, body) = send(
        &router,
        Method::POST,
        "/api/v1/auth/register",
        None,
        Some(
            &json!({
                "nom": "Martin",
                "prenom": "Léa",
                "email": "lea@example.org",
                "mot_de_passe": PASSWORD
            })
            .to_string(),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["utilisateur"]["email"], "lea@example.org");
    assert_eq!(body["utilisateur"]["email_verified"], false);
    assert!(body["utilisateur"].get("password_hash").is_none());
    assert!(body.get("warning").is_none());

    let (status, body) = send(
        &router,
        Method::POST,
        "/api/v1/auth/login",
        None,
        Some(&json!({ "email": "lea@example.org", "mot_de_passe": PASSWORD }).to_string()),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["email_not_verified"], true);
    assert_eq!(body["email"], "lea@example.org");
}

#[tokio::test]
async fn test_register_validation_errors() {
    let app = setup().await;
    let router = router(&app);

    let (status, body) = send(
        &router,
        Method::POST,
        "/api/v1/auth/register",
        None,
        Some(
            &json!({
                "nom": "Martin",
                "prenom": "Léa",
                "email": "lea@example.org",
                "mot_de_passe": "abc"
            })
            .to_string(),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Le mot de passe doit contenir au moins 6 caractères");
}

#[tokio::test]
async fn test_malformed_json_uses_error_shape() {
    let app = setup().await;
    let router = router(&app);

    let (status, body) = send(
        &router,
        Method::POST,
        "/api/v1/auth/login",
        None,
        Some("{not json"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().starts_with("Requête JSON invalide"));
}

#[tokio::test]
async fn test_protected_routes_require_token() {
    let app = setup().await;
    let router = router(&app);

    for uri in ["/api/v1/livres", "/api/v1/stats", "/api/v1/auth/me"] {
        let (status, body) = send(&router, Method::GET, uri, None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{}", uri);
        assert_eq!(body["error"], "Non authentifié");
    }

    let (status, _) = send(&router, Method::GET, "/api/v1/livres", Some("garbage"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_forgot_password_does_not_reveal_accounts() {
    let app = setup().await;
    common::verified_account(&app, "lea@example.org").await;
    let router = router(&app);

    let (known_status, known) = send(
        &router,
        Method::POST,
        "/api/v1/auth/forgot-password",
        None,
        Some(&json!({ "email": "lea@example.org" }).to_string()),
    )
    .await;
    let (unknown_status, unknown) = send(
        &router,
        Method::POST,
        "/api/v1/auth/forgot-password",
        None,
        Some(&json!({ "email": "ghost@example.org" }).to_string()),
    )
    .await;

    assert_eq!(known_status, StatusCode::OK);
    assert_eq!(unknown_status, StatusCode::OK);
    assert_eq!(known, unknown);

    let (status, body) = send(
        &router,
        Method::POST,
        "/api/v1/auth/forgot-password",
        None,
        Some("{}"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Email requis");
}

#[tokio::test]
async fn test_catalog_and_loan_flow() {
    let app = setup().await;
    common::verified_account(&app, "lea@example.org").await;
    let router = router(&app);
    let token = login_token(&router, "lea@example.org").await;

    let (status, book) = send(
        &router,
        Method::POST,
        "/api/v1/livres",
        Some(&token),
        Some(
            &json!({
                "titre": "Le Petit Prince",
                "auteur": "Antoine de Saint-Exupéry",
                "categorie": "Conte",
                "annee_publication": 1943,
                "nombre_exemplaires": 1
            })
            .to_string(),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(book["disponibles"], 1);

    let (status, member) = send(
        &router,
        Method::POST,
        "/api/v1/membres",
        Some(&token),
        Some(&json!({ "nom": "Durand", "prenom": "Paul", "email": "paul@example.org" }).to_string()),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(member["statut"], "actif");

    let loan_body = json!({ "id_livre": book["id_livre"], "id_membre": member["id_membre"] }).to_string();
    let (status, loan) = send(&router, Method::POST, "/api/v1/emprunts", Some(&token), Some(&loan_body)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(loan["statut"], "en_cours");
    assert_eq!(loan["livre"]["disponibles"], 0);

    let (status, body) = send(&router, Method::POST, "/api/v1/emprunts", Some(&token), Some(&loan_body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Livre non disponible");

    let uri = format!("/api/v1/emprunts/{}/retour", loan["id_emprunt"]);
    let (status, returned) = send(&router, Method::POST, &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(returned["id_emprunt"], loan["id_emprunt"]);
    assert_eq!(returned["statut"], "retourne");
    assert!(returned["date_retour_reelle"].is_string());
    assert_eq!(returned["livre"]["disponibles"], 1);
    assert!(returned.get("amende").is_none());
    assert!(returned.get("emprunt").is_none());

    let (status, stats) = send(&router, Method::GET, "/api/v1/stats", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        stats,
        json!({ "total_livres": 1, "total_membres": 1, "emprunts_actifs": 0, "amendes_impayees": 0 })
    );
}

#[tokio::test]
async fn test_late_return_carries_fine_next_to_loan() {
    let app = setup().await;
    common::verified_account(&app, "lea@example.org").await;
    let router = router(&app);
    let token = login_token(&router, "lea@example.org").await;

    let (_, book) = send(
        &router,
        Method::POST,
        "/api/v1/livres",
        Some(&token),
        Some(&json!({ "titre": "Nana", "auteur": "Émile Zola", "nombre_exemplaires": 1 }).to_string()),
    )
    .await;
    let (_, member) = send(
        &router,
        Method::POST,
        "/api/v1/membres",
        Some(&token),
        Some(&json!({ "nom": "Durand", "prenom": "Paul", "email": "paul@example.org" }).to_string()),
    )
    .await;
    let (_, loan) = send(
        &router,
        Method::POST,
        "/api/v1/emprunts",
        Some(&token),
        Some(&json!({ "id_livre": book["id_livre"], "id_membre": member["id_membre"] }).to_string()),
    )
    .await;

    let today = chrono::Utc::now().date_naive();
    sqlx::query("UPDATE loans SET checkout_date = ?, due_date = ? WHERE id = ?")
        .bind(today - chrono::Duration::days(28))
        .bind(today - chrono::Duration::days(14))
        .bind(loan["id_emprunt"].as_i64().unwrap())
        .execute(&app.pool)
        .await
        .unwrap();

    let uri = format!("/api/v1/emprunts/{}/retour", loan["id_emprunt"]);
    let (status, returned) = send(&router, Method::POST, &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(returned["statut"], "retourne");
    assert_eq!(returned["amende"]["montant"], 7.0);
    assert_eq!(returned["amende"]["statut"], "impayee");
    assert_eq!(returned["amende"]["id_emprunt"], loan["id_emprunt"]);
}

#[tokio::test]
async fn test_logout_revokes_token() {
    let app = setup().await;
    common::verified_account(&app, "lea@example.org").await;
    let router = router(&app);
    let token = login_token(&router, "lea@example.org").await;

    let (status, _) = send(&router, Method::GET, "/api/v1/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&router, Method::POST, "/api/v1/auth/logout", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Déconnexion réussie");

    let (status, _) = send(&router, Method::GET, "/api/v1/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_backups_need_admin() {
    let app = setup().await;
    common::verified_account(&app, "lea@example.org").await;
    let router = router(&app);
    let token = login_token(&router, "lea@example.org").await;

    let (status, body) = send(&router, Method::GET, "/api/v1/backups", Some(&token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Privilèges administrateur requis");
}

#[tokio::test]
async fn test_profile_update_checks_current_password() {
    let app = setup().await;
    common::verified_account(&app, "lea@example.org").await;
    common::verified_account(&app, "marc@example.org").await;
    let router = router(&app);
    let token = login_token(&router, "lea@example.org").await;

    let (status, body) = send(
        &router,
        Method::PUT,
        "/api/v1/profile",
        Some(&token),
        Some(&json!({ "nouveau_mot_de_passe": "nouveau-secret" }).to_string()),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Ancien mot de passe requis");

    let (status, body) = send(
        &router,
        Method::PUT,
        "/api/v1/profile",
        Some(&token),
        Some(&json!({ "ancien_mot_de_passe": "mauvais", "nouveau_mot_de_passe": "nouveau-secret" }).to_string()),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Ancien mot de passe incorrect");

    let (status, body) = send(
        &router,
        Method::PUT,
        "/api/v1/profile",
        Some(&token),
        Some(&json!({ "email": "marc@example.org" }).to_string()),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Cet email est déjà utilisé");

    let (status, body) = send(
        &router,
        Method::PUT,
        "/api/v1/profile",
        Some(&token),
        Some(&json!({ "prenom": "Léonie" }).to_string()),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["utilisateur"]["prenom"], "Léonie");
    assert_eq!(body["utilisateur"]["nom"], "Martin");
}

#[tokio::test]
async fn test_deleted_account_token_is_rejected() {
    let app = setup().await;
    common::verified_account(&app, "lea@example.org").await;
    let router = router(&app);
    let token = login_token(&router, "lea@example.org").await;

    let (status, body) = send(&router, Method::DELETE, "/api/v1/profile", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Compte supprimé");

    let (status, body) = send(&router, Method::DELETE, "/api/v1/profile", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Non authentifié");

    let (status, _) = send(
        &router,
        Method::POST,
        "/api/v1/auth/login",
        None,
        Some(&json!({ "email": "lea@example.org", "mot_de_passe": PASSWORD }).to_string()),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

async fn upload_photo(router: &Router, token: &str, file_name: &str, data: &[u8]) -> (StatusCode, Value) {
    let boundary = "bibliotech-test-boundary";
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"photo\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/profile/photo")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", boundary),
        )
        .body(Body::from(body))
        .unwrap();

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_photo_upload_through_multipart() {
    let app = setup().await;
    common::verified_account(&app, "lea@example.org").await;
    let router = router(&app);
    let token = login_token(&router, "lea@example.org").await;

    let (status, body) = upload_photo(&router, &token, "notes.txt", b"hello").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Format de fichier non autorisé");

    let (status, body) = upload_photo(&router, &token, "portrait.png", b"\x89PNG fake").await;
    assert_eq!(status, StatusCode::OK);
    let stored = body["photo_profil"].as_str().unwrap().to_string();
    assert!(stored.ends_with("_portrait.png"), "{}", stored);
    assert_eq!(stored.len(), 16 + 1 + "portrait.png".len());

    let (status, me) = send(&router, Method::GET, "/api/v1/profile", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["photo_profil"], stored.as_str());

    // Served back as a static file
    let request = Request::builder()
        .uri(format!("/uploads/profiles/{}", stored))
        .body(Body::empty())
        .unwrap();
    let response = router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&bytes[..], b"\x89PNG fake");
}

#[tokio::test]
async fn test_photo_upload_requires_photo_field() {
    let app = setup().await;
    common::verified_account(&app, "lea@example.org").await;
    let router = router(&app);
    let token = login_token(&router, "lea@example.org").await;

    let boundary = "bibliotech-test-boundary";
    let body = format!(
        "--{boundary}\r\nContent-Disposition: form-data; name=\"avatar\"; filename=\"portrait.png\"\r\n\r\nxyz\r\n--{boundary}--\r\n"
    );
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/profile/photo")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", boundary),
        )
        .body(Body::from(body))
        .unwrap();

    let response = router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["error"], "Aucune photo fournie");
}
