//! Fines repository for database operations

use sqlx::{Pool, Sqlite};

use crate::{
    error::{AppError, AppResult},
    models::{
        fine::{FineDetails, FINE_COLUMNS},
        loan::LOAN_DETAILS_COLUMNS,
    },
};

#[derive(Clone)]
pub struct FinesRepository {
    pool: Pool<Sqlite>,
}

fn select_fines(filter: &str) -> String {
    format!(
        r#"
        SELECT {FINE_COLUMNS}, {LOAN_DETAILS_COLUMNS}
        FROM fines f
        JOIN loans l ON f.loan_id = l.id
        JOIN books b ON l.book_id = b.id
        JOIN members m ON l.member_id = m.id
        WHERE {filter}
        "#
    )
}

impl FinesRepository {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    /// Get a fine, scoped to the account owning the book
    pub async fn get_details(&self, account_id: i64, id: i64) -> AppResult<FineDetails> {
        sqlx::query_as::<_, FineDetails>(&select_fines("f.id = ? AND b.account_id = ?"))
            .bind(id)
            .bind(account_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Amende non trouvée".to_string()))
    }

    /// List the account's fines, most recent first
    pub async fn list(&self, account_id: i64) -> AppResult<Vec<FineDetails>> {
        let query = format!(
            "{} ORDER BY f.created_on DESC, f.id DESC",
            select_fines("b.account_id = ?")
        );

        let fines = sqlx::query_as::<_, FineDetails>(&query)
            .bind(account_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(fines)
    }

    /// Mark a fine paid; paying twice leaves it paid
    pub async fn pay(&self, account_id: i64, id: i64) -> AppResult<FineDetails> {
        let result = sqlx::query(
            r#"
            UPDATE fines SET status = 'payee'
            WHERE id = ? AND loan_id IN (
                SELECT l.id FROM loans l JOIN books b ON l.book_id = b.id WHERE b.account_id = ?
            )
            "#,
        )
        .bind(id)
        .bind(account_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Amende non trouvée".to_string()));
        }

        self.get_details(account_id, id).await
    }

    /// Count the account's unpaid fines
    pub async fn count_unpaid(&self, account_id: i64) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM fines f
            JOIN loans l ON f.loan_id = l.id
            JOIN books b ON l.book_id = b.id
            WHERE b.account_id = ? AND f.status = 'impayee'
            "#,
        )
        .bind(account_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }
}
