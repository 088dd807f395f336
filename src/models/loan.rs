//! Loan (borrow) model and related types

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use sqlx::{sqlite::SqliteRow, FromRow, Row};
use utoipa::ToSchema;

use super::book::Book;
use super::member::{Member, MemberStatus};
use crate::config::LoansConfig;

/// Loan status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
pub enum LoanStatus {
    #[serde(rename = "en_cours")]
    #[sqlx(rename = "en_cours")]
    Ongoing,
    #[serde(rename = "retourne")]
    #[sqlx(rename = "retourne")]
    Returned,
}

/// Loan model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Loan {
    pub id: i64,
    pub book_id: i64,
    pub member_id: i64,
    pub checkout_date: NaiveDate,
    pub due_date: NaiveDate,
    pub returned_date: Option<NaiveDate>,
    pub status: LoanStatus,
}

/// Loan with its book and member, as returned by the API
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoanDetails {
    #[serde(rename = "id_emprunt")]
    pub id: i64,
    #[serde(rename = "id_livre")]
    pub book_id: i64,
    #[serde(rename = "id_membre")]
    pub member_id: i64,
    #[serde(rename = "livre")]
    pub book: Book,
    #[serde(rename = "membre")]
    pub member: Member,
    #[serde(rename = "date_emprunt")]
    pub checkout_date: NaiveDate,
    #[serde(rename = "date_retour_prevue")]
    pub due_date: NaiveDate,
    #[serde(rename = "date_retour_reelle")]
    pub returned_date: Option<NaiveDate>,
    #[serde(rename = "statut")]
    pub status: LoanStatus,
}

/// Columns selected by every loan detail query (aliases read by `LoanDetails::from_row`)
pub const LOAN_DETAILS_COLUMNS: &str = r#"
    l.id AS loan_id, l.book_id, l.member_id, l.checkout_date, l.due_date,
    l.returned_date, l.status AS loan_status,
    b.account_id, b.title, b.author, b.category, b.publication_year,
    b.total_copies, b.available_copies,
    m.last_name AS member_last_name, m.first_name AS member_first_name,
    m.email AS member_email, m.phone AS member_phone,
    m.registered_on AS member_registered_on, m.status AS member_status
"#;

impl<'r> FromRow<'r, SqliteRow> for LoanDetails {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let book_id: i64 = row.try_get("book_id")?;
        let member_id: i64 = row.try_get("member_id")?;
        let account_id: i64 = row.try_get("account_id")?;
        let member_status: MemberStatus = row.try_get("member_status")?;

        Ok(LoanDetails {
            id: row.try_get("loan_id")?,
            book_id,
            member_id,
            book: Book {
                id: book_id,
                account_id,
                title: row.try_get("title")?,
                author: row.try_get("author")?,
                category: row.try_get("category")?,
                publication_year: row.try_get("publication_year")?,
                total_copies: row.try_get("total_copies")?,
                available_copies: row.try_get("available_copies")?,
            },
            member: Member {
                id: member_id,
                account_id,
                last_name: row.try_get("member_last_name")?,
                first_name: row.try_get("member_first_name")?,
                email: row.try_get("member_email")?,
                phone: row.try_get("member_phone")?,
                registered_on: row.try_get("member_registered_on")?,
                status: member_status,
            },
            checkout_date: row.try_get("checkout_date")?,
            due_date: row.try_get("due_date")?,
            returned_date: row.try_get("returned_date")?,
            status: row.try_get("loan_status")?,
        })
    }
}

/// Create loan request
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateLoan {
    #[serde(rename = "id_livre")]
    pub book_id: i64,
    #[serde(rename = "id_membre")]
    pub member_id: i64,
}

/// Loan duration and late-return penalty
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoanPolicy {
    pub duration_days: i64,
    pub daily_fine: f64,
}

impl Default for LoanPolicy {
    fn default() -> Self {
        Self {
            duration_days: 14,
            daily_fine: 0.50,
        }
    }
}

impl From<&LoansConfig> for LoanPolicy {
    fn from(config: &LoansConfig) -> Self {
        Self {
            duration_days: config.duration_days,
            daily_fine: config.daily_fine,
        }
    }
}

impl LoanPolicy {
    /// Due date of a loan checked out on `checkout`
    pub fn due_date(&self, checkout: NaiveDate) -> NaiveDate {
        checkout + Duration::days(self.duration_days)
    }

    /// Fine owed for a return on `returned`, if it is later than `due`
    pub fn fine_for(&self, due: NaiveDate, returned: NaiveDate) -> Option<f64> {
        let late_days = (returned - due).num_days();
        (late_days > 0).then(|| late_days as f64 * self.daily_fine)
    }
}
