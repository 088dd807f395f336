//! Members repository for database operations

use chrono::Utc;
use sqlx::{Pool, Sqlite};

use crate::{
    error::{AppError, AppResult},
    models::member::{Member, UpdateMember},
};

#[derive(Clone)]
pub struct MembersRepository {
    pool: Pool<Sqlite>,
}

impl MembersRepository {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    /// Get a member registered by the account
    pub async fn get_owned(&self, account_id: i64, id: i64) -> AppResult<Member> {
        sqlx::query_as::<_, Member>("SELECT * FROM members WHERE id = ? AND account_id = ?")
            .bind(id)
            .bind(account_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Membre non trouvé".to_string()))
    }

    /// List the account's members
    pub async fn list(&self, account_id: i64) -> AppResult<Vec<Member>> {
        let members = sqlx::query_as::<_, Member>(
            "SELECT * FROM members WHERE account_id = ? ORDER BY last_name, first_name",
        )
        .bind(account_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(members)
    }

    /// Register a new, active member
    pub async fn create(
        &self,
        account_id: i64,
        last_name: &str,
        first_name: &str,
        email: &str,
        phone: &str,
    ) -> AppResult<Member> {
        let result = sqlx::query(
            r#"
            INSERT INTO members (account_id, last_name, first_name, email, phone, registered_on, status)
            VALUES (?, ?, ?, ?, ?, ?, 'actif')
            "#,
        )
        .bind(account_id)
        .bind(last_name)
        .bind(first_name)
        .bind(email)
        .bind(phone)
        .bind(Utc::now().date_naive())
        .execute(&self.pool)
        .await?;

        self.get_owned(account_id, result.last_insert_rowid()).await
    }

    /// Update a member; `None` keeps the current value
    pub async fn update(&self, account_id: i64, id: i64, update: &UpdateMember) -> AppResult<Member> {
        let result = sqlx::query(
            r#"
            UPDATE members SET
                last_name = COALESCE(?, last_name),
                first_name = COALESCE(?, first_name),
                email = COALESCE(?, email),
                phone = COALESCE(?, phone),
                status = COALESCE(?, status)
            WHERE id = ? AND account_id = ?
            "#,
        )
        .bind(&update.last_name)
        .bind(&update.first_name)
        .bind(&update.email)
        .bind(&update.phone)
        .bind(update.status)
        .bind(id)
        .bind(account_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Membre non trouvé".to_string()));
        }

        self.get_owned(account_id, id).await
    }

    /// Delete a member. Copies the member still holds go back on the shelf
    /// before the cascade removes their loans.
    pub async fn delete(&self, account_id: i64, id: i64) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            UPDATE books SET available_copies = available_copies + (
                SELECT COUNT(*) FROM loans
                WHERE loans.book_id = books.id AND loans.member_id = ? AND loans.status = 'en_cours'
            )
            WHERE id IN (SELECT book_id FROM loans WHERE member_id = ? AND status = 'en_cours')
            "#,
        )
        .bind(id)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        let result = sqlx::query("DELETE FROM members WHERE id = ? AND account_id = ?")
            .bind(id)
            .bind(account_id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            // Dropping the transaction rolls back the availability update
            return Err(AppError::NotFound("Membre non trouvé".to_string()));
        }

        tx.commit().await?;
        Ok(())
    }

    /// Count the account's members
    pub async fn count(&self, account_id: i64) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM members WHERE account_id = ?")
            .bind(account_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
