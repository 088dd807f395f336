//! Fine (late-return penalty) model

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::{sqlite::SqliteRow, FromRow, Row};
use utoipa::ToSchema;

use super::loan::LoanDetails;

/// Fine status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
pub enum FineStatus {
    #[serde(rename = "impayee")]
    #[sqlx(rename = "impayee")]
    Unpaid,
    #[serde(rename = "payee")]
    #[sqlx(rename = "payee")]
    Paid,
}

/// Fine with the loan it penalizes
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FineDetails {
    #[serde(rename = "id_amende")]
    pub id: i64,
    #[serde(rename = "id_emprunt")]
    pub loan_id: i64,
    #[serde(rename = "emprunt")]
    pub loan: LoanDetails,
    #[serde(rename = "montant")]
    pub amount: f64,
    #[serde(rename = "statut")]
    pub status: FineStatus,
    #[serde(rename = "date_creation")]
    pub created_on: NaiveDate,
}

/// Fine columns selected on top of `LOAN_DETAILS_COLUMNS`
pub const FINE_COLUMNS: &str =
    "f.id AS fine_id, f.amount, f.status AS fine_status, f.created_on AS fine_created_on";

impl<'r> FromRow<'r, SqliteRow> for FineDetails {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let loan = LoanDetails::from_row(row)?;
        Ok(FineDetails {
            id: row.try_get("fine_id")?,
            loan_id: loan.id,
            loan,
            amount: row.try_get("amount")?,
            status: row.try_get("fine_status")?,
            created_on: row.try_get("fine_created_on")?,
        })
    }
}
