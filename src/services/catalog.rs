//! Book catalog and member registry

use validator::Validate;

use crate::{
    error::AppResult,
    models::{
        book::{Book, BookQuery, CreateBook, UpdateBook},
        member::{CreateMember, Member, UpdateMember},
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
}

impl CatalogService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    // Books

    pub async fn list_books(&self, account_id: i64, query: &BookQuery) -> AppResult<Vec<Book>> {
        self.repository.books.list(account_id, query).await
    }

    pub async fn get_book(&self, account_id: i64, id: i64) -> AppResult<Book> {
        self.repository.books.get_owned(account_id, id).await
    }

    /// Add a book; all copies start available
    pub async fn create_book(&self, account_id: i64, book: CreateBook) -> AppResult<Book> {
        book.validate()?;

        let created = self
            .repository
            .books
            .create(
                account_id,
                book.title.unwrap_or_default().trim(),
                book.author.unwrap_or_default().trim(),
                book.category.as_deref().map(str::trim).unwrap_or_default(),
                book.publication_year,
                book.total_copies.unwrap_or(1),
            )
            .await?;

        tracing::info!(account_id, book_id = created.id, "Book created");
        Ok(created)
    }

    pub async fn update_book(&self, account_id: i64, id: i64, update: UpdateBook) -> AppResult<Book> {
        update.validate()?;
        self.repository.books.update(account_id, id, &update).await
    }

    pub async fn delete_book(&self, account_id: i64, id: i64) -> AppResult<()> {
        self.repository.books.delete(account_id, id).await?;
        tracing::info!(account_id, book_id = id, "Book deleted");
        Ok(())
    }

    // Members

    pub async fn list_members(&self, account_id: i64) -> AppResult<Vec<Member>> {
        self.repository.members.list(account_id).await
    }

    pub async fn create_member(&self, account_id: i64, member: CreateMember) -> AppResult<Member> {
        member.validate()?;

        let created = self
            .repository
            .members
            .create(
                account_id,
                member.last_name.unwrap_or_default().trim(),
                member.first_name.unwrap_or_default().trim(),
                member.email.unwrap_or_default().trim(),
                member.phone.as_deref().map(str::trim).unwrap_or_default(),
            )
            .await?;

        tracing::info!(account_id, member_id = created.id, "Member created");
        Ok(created)
    }

    pub async fn update_member(
        &self,
        account_id: i64,
        id: i64,
        update: UpdateMember,
    ) -> AppResult<Member> {
        update.validate()?;
        self.repository.members.update(account_id, id, &update).await
    }

    /// Delete a member; copies they still hold become available again
    pub async fn delete_member(&self, account_id: i64, id: i64) -> AppResult<()> {
        self.repository.members.delete(account_id, id).await?;
        tracing::info!(account_id, member_id = id, "Member deleted");
        Ok(())
    }
}
