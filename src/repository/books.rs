//! Books repository for database operations

use sqlx::{Pool, Sqlite};

use crate::{
    error::{AppError, AppResult},
    models::book::{Book, BookQuery, UpdateBook},
};

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Sqlite>,
}

impl BooksRepository {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    /// Get a book owned by the account
    pub async fn get_owned(&self, account_id: i64, id: i64) -> AppResult<Book> {
        sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = ? AND account_id = ?")
            .bind(id)
            .bind(account_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Livre non trouvé".to_string()))
    }

    /// List the account's books, optionally filtered on title or author
    pub async fn list(&self, account_id: i64, query: &BookQuery) -> AppResult<Vec<Book>> {
        let pattern = query
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", s));

        let books = sqlx::query_as::<_, Book>(
            r#"
            SELECT * FROM books
            WHERE account_id = ?
              AND (? IS NULL OR title LIKE ? OR author LIKE ?)
            ORDER BY title
            "#,
        )
        .bind(account_id)
        .bind(&pattern)
        .bind(&pattern)
        .bind(&pattern)
        .fetch_all(&self.pool)
        .await?;

        Ok(books)
    }

    /// Create a book; every copy starts available
    pub async fn create(
        &self,
        account_id: i64,
        title: &str,
        author: &str,
        category: &str,
        publication_year: Option<i32>,
        total_copies: i64,
    ) -> AppResult<Book> {
        let result = sqlx::query(
            r#"
            INSERT INTO books (account_id, title, author, category, publication_year, total_copies, available_copies)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(account_id)
        .bind(title)
        .bind(author)
        .bind(category)
        .bind(publication_year)
        .bind(total_copies)
        .bind(total_copies)
        .execute(&self.pool)
        .await?;

        self.get_owned(account_id, result.last_insert_rowid()).await
    }

    /// Update a book. A new total shifts availability by the same delta and is
    /// refused when it would drop below the copies out on loan.
    pub async fn update(&self, account_id: i64, id: i64, update: &UpdateBook) -> AppResult<Book> {
        let mut tx = self.pool.begin().await?;

        let book = sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = ? AND account_id = ?")
            .bind(id)
            .bind(account_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound("Livre non trouvé".to_string()))?;

        let total_copies = update.total_copies.unwrap_or(book.total_copies);
        let available_copies = book.available_after_resize(total_copies).ok_or_else(|| {
            AppError::BusinessRule(format!(
                "Impossible de réduire à {} exemplaires: {} actuellement empruntés",
                total_copies,
                book.on_loan()
            ))
        })?;

        sqlx::query(
            r#"
            UPDATE books SET
                title = COALESCE(?, title),
                author = COALESCE(?, author),
                category = COALESCE(?, category),
                publication_year = COALESCE(?, publication_year),
                total_copies = ?,
                available_copies = ?
            WHERE id = ?
            "#,
        )
        .bind(&update.title)
        .bind(&update.author)
        .bind(&update.category)
        .bind(update.publication_year)
        .bind(total_copies)
        .bind(available_copies)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        self.get_owned(account_id, id).await
    }

    /// Delete a book and, by cascade, its loans and fines
    pub async fn delete(&self, account_id: i64, id: i64) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM books WHERE id = ? AND account_id = ?")
            .bind(id)
            .bind(account_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Livre non trouvé".to_string()));
        }

        Ok(())
    }

    /// Count the account's books
    pub async fn count(&self, account_id: i64) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM books WHERE account_id = ?")
            .bind(account_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
