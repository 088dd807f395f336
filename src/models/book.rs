//! Book model and related types

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

/// Book of an account's catalog
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Book {
    #[serde(rename = "id_livre")]
    pub id: i64,
    #[serde(skip)]
    pub account_id: i64,
    #[serde(rename = "titre")]
    pub title: String,
    #[serde(rename = "auteur")]
    pub author: String,
    #[serde(rename = "categorie")]
    pub category: String,
    #[serde(rename = "annee_publication")]
    pub publication_year: Option<i32>,
    #[serde(rename = "nombre_exemplaires")]
    pub total_copies: i64,
    #[serde(rename = "disponibles")]
    pub available_copies: i64,
}

/// Book search parameters
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct BookQuery {
    /// Matches title or author
    pub search: Option<String>,
}

/// Create book request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateBook {
    #[serde(rename = "titre")]
    #[validate(required(message = "Le titre est requis"), length(min = 1, message = "Le titre est requis"))]
    pub title: Option<String>,
    #[serde(rename = "auteur")]
    #[validate(required(message = "L'auteur est requis"), length(min = 1, message = "L'auteur est requis"))]
    pub author: Option<String>,
    #[serde(rename = "categorie")]
    pub category: Option<String>,
    #[serde(rename = "annee_publication")]
    pub publication_year: Option<i32>,
    #[serde(rename = "nombre_exemplaires")]
    #[validate(range(min = 1, message = "Le nombre d'exemplaires doit être au moins 1"))]
    pub total_copies: Option<i64>,
}

/// Update book request
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateBook {
    #[serde(rename = "titre")]
    #[validate(length(min = 1, message = "Le titre ne peut pas être vide"))]
    pub title: Option<String>,
    #[serde(rename = "auteur")]
    #[validate(length(min = 1, message = "L'auteur ne peut pas être vide"))]
    pub author: Option<String>,
    #[serde(rename = "categorie")]
    pub category: Option<String>,
    #[serde(rename = "annee_publication")]
    pub publication_year: Option<i32>,
    #[serde(rename = "nombre_exemplaires")]
    #[validate(range(min = 0, message = "Le nombre d'exemplaires ne peut pas être négatif"))]
    pub total_copies: Option<i64>,
}

impl Book {
    /// Copies currently out on loan
    pub fn on_loan(&self) -> i64 {
        self.total_copies - self.available_copies
    }

    /// Availability after changing the total number of copies, or `None` when the
    /// new total is smaller than the number of copies out on loan.
    pub fn available_after_resize(&self, new_total: i64) -> Option<i64> {
        let available = new_total - self.on_loan();
        (available >= 0).then_some(available)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book(total: i64, available: i64) -> Book {
        Book {
            id: 1,
            account_id: 1,
            title: "Germinal".into(),
            author: "Émile Zola".into(),
            category: "Roman".into(),
            publication_year: Some(1885),
            total_copies: total,
            available_copies: available,
        }
    }

    #[test]
    fn test_resize_shifts_availability_by_delta() {
        assert_eq!(book(3, 1).available_after_resize(5), Some(3));
        assert_eq!(book(3, 1).available_after_resize(2), Some(0));
    }

    #[test]
    fn test_resize_below_copies_on_loan_is_refused() {
        assert_eq!(book(3, 1).available_after_resize(1), None);
    }

    #[test]
    fn test_serializes_with_catalog_field_names() {
        let json = serde_json::to_value(book(2, 2)).unwrap();
        assert_eq!(json["titre"], "Germinal");
        assert_eq!(json["nombre_exemplaires"], 2);
        assert_eq!(json["disponibles"], 2);
        assert!(json.get("account_id").is_none());
    }
}
