//! Library member model

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

/// Member status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
pub enum MemberStatus {
    #[serde(rename = "actif")]
    #[sqlx(rename = "actif")]
    Active,
    #[serde(rename = "inactif")]
    #[sqlx(rename = "inactif")]
    Inactive,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Member {
    #[serde(rename = "id_membre")]
    pub id: i64,
    #[serde(rename = "id_utilisateur")]
    pub account_id: i64,
    #[serde(rename = "nom")]
    pub last_name: String,
    #[serde(rename = "prenom")]
    pub first_name: String,
    pub email: String,
    #[serde(rename = "telephone")]
    pub phone: String,
    #[serde(rename = "date_inscription")]
    pub registered_on: NaiveDate,
    #[serde(rename = "statut")]
    pub status: MemberStatus,
}

/// Create member request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateMember {
    #[serde(rename = "nom")]
    #[validate(required(message = "Le nom est requis"), length(min = 1, message = "Le nom est requis"))]
    pub last_name: Option<String>,
    #[serde(rename = "prenom")]
    #[validate(required(message = "Le prénom est requis"), length(min = 1, message = "Le prénom est requis"))]
    pub first_name: Option<String>,
    #[validate(required(message = "Email requis"), email(message = "Format d'email invalide"))]
    pub email: Option<String>,
    #[serde(rename = "telephone")]
    pub phone: Option<String>,
}

/// Update member request
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateMember {
    #[serde(rename = "nom")]
    #[validate(length(min = 1, message = "Le nom ne peut pas être vide"))]
    pub last_name: Option<String>,
    #[serde(rename = "prenom")]
    #[validate(length(min = 1, message = "Le prénom ne peut pas être vide"))]
    pub first_name: Option<String>,
    #[validate(email(message = "Format d'email invalide"))]
    pub email: Option<String>,
    #[serde(rename = "telephone")]
    pub phone: Option<String>,
    #[serde(rename = "statut")]
    pub status: Option<MemberStatus>,
}
