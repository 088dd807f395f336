//! Loans repository for database operations

use chrono::NaiveDate;
use sqlx::{Pool, Sqlite, SqliteConnection};

use crate::{
    error::{AppError, AppResult},
    models::{
        loan::{Loan, LoanDetails, LoanPolicy, LoanStatus, LOAN_DETAILS_COLUMNS},
        member::MemberStatus,
    },
};

/// Outcome of a return
#[derive(Debug, Clone)]
pub struct ReturnedLoan {
    pub loan: LoanDetails,
    /// Fine created for a late return
    pub fine_id: Option<i64>,
}

#[derive(Clone)]
pub struct LoansRepository {
    pool: Pool<Sqlite>,
}

impl LoansRepository {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    /// List the account's loans, most recent first
    pub async fn list(&self, account_id: i64) -> AppResult<Vec<LoanDetails>> {
        let query = format!(
            r#"
            SELECT {LOAN_DETAILS_COLUMNS}
            FROM loans l
            JOIN books b ON l.book_id = b.id
            JOIN members m ON l.member_id = m.id
            WHERE b.account_id = ?
            ORDER BY l.checkout_date DESC, l.id DESC
            "#
        );

        let loans = sqlx::query_as::<_, LoanDetails>(&query)
            .bind(account_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(loans)
    }

    /// Check out one copy of a book to a member
    pub async fn checkout(
        &self,
        account_id: i64,
        book_id: i64,
        member_id: i64,
        today: NaiveDate,
        policy: &LoanPolicy,
    ) -> AppResult<LoanDetails> {
        let mut tx = self.pool.begin().await?;

        // Conditional decrement: concurrent checkouts cannot drive availability negative
        let taken = sqlx::query(
            r#"
            UPDATE books SET available_copies = available_copies - 1
            WHERE id = ? AND account_id = ? AND available_copies > 0
            "#,
        )
        .bind(book_id)
        .bind(account_id)
        .execute(&mut *tx)
        .await?;

        if taken.rows_affected() == 0 {
            return Err(AppError::BusinessRule("Livre non disponible".to_string()));
        }

        let member_status: Option<MemberStatus> =
            sqlx::query_scalar("SELECT status FROM members WHERE id = ? AND account_id = ?")
                .bind(member_id)
                .bind(account_id)
                .fetch_optional(&mut *tx)
                .await?;

        if member_status != Some(MemberStatus::Active) {
            return Err(AppError::BusinessRule("Membre invalide".to_string()));
        }

        let result = sqlx::query(
            r#"
            INSERT INTO loans (book_id, member_id, checkout_date, due_date, status)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(book_id)
        .bind(member_id)
        .bind(today)
        .bind(policy.due_date(today))
        .bind(LoanStatus::Ongoing)
        .execute(&mut *tx)
        .await?;

        let loan = fetch_details(&mut tx, account_id, result.last_insert_rowid()).await?;
        tx.commit().await?;

        Ok(loan)
    }

    /// Return a loan: close it, put the copy back and fine a late return
    pub async fn return_loan(
        &self,
        account_id: i64,
        id: i64,
        today: NaiveDate,
        policy: &LoanPolicy,
    ) -> AppResult<ReturnedLoan> {
        let mut tx = self.pool.begin().await?;

        let loan = sqlx::query_as::<_, Loan>(
            r#"
            SELECT l.* FROM loans l
            JOIN books b ON l.book_id = b.id
            WHERE l.id = ? AND b.account_id = ?
            "#,
        )
        .bind(id)
        .bind(account_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Emprunt non trouvé".to_string()))?;

        if loan.status == LoanStatus::Returned {
            return Err(AppError::BusinessRule("Emprunt déjà retourné".to_string()));
        }

        sqlx::query("UPDATE loans SET returned_date = ?, status = ? WHERE id = ?")
            .bind(today)
            .bind(LoanStatus::Returned)
            .bind(loan.id)
            .execute(&mut *tx)
            .await?;

        let fine_id = match policy.fine_for(loan.due_date, today) {
            Some(amount) => {
                let result = sqlx::query(
                    "INSERT INTO fines (loan_id, amount, status, created_on) VALUES (?, ?, 'impayee', ?)",
                )
                .bind(loan.id)
                .bind(amount)
                .bind(today)
                .execute(&mut *tx)
                .await?;
                Some(result.last_insert_rowid())
            }
            None => None,
        };

        sqlx::query(
            r#"
            UPDATE books SET available_copies = MIN(available_copies + 1, total_copies)
            WHERE id = ?
            "#,
        )
        .bind(loan.book_id)
        .execute(&mut *tx)
        .await?;

        let details = fetch_details(&mut tx, account_id, loan.id).await?;
        tx.commit().await?;

        Ok(ReturnedLoan {
            loan: details,
            fine_id,
        })
    }

    /// Count the account's ongoing loans
    pub async fn count_active(&self, account_id: i64) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM loans l
            JOIN books b ON l.book_id = b.id
            WHERE b.account_id = ? AND l.status = 'en_cours'
            "#,
        )
        .bind(account_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }
}

async fn fetch_details(
    conn: &mut SqliteConnection,
    account_id: i64,
    id: i64,
) -> AppResult<LoanDetails> {
    let query = format!(
        r#"
        SELECT {LOAN_DETAILS_COLUMNS}
        FROM loans l
        JOIN books b ON l.book_id = b.id
        JOIN members m ON l.member_id = m.id
        WHERE l.id = ? AND b.account_id = ?
        "#
    );

    sqlx::query_as::<_, LoanDetails>(&query)
        .bind(id)
        .bind(account_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Emprunt non trouvé".to_string()))
}
