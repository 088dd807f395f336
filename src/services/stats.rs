//! Dashboard statistics

use serde::Serialize;
use utoipa::ToSchema;

use crate::{error::AppResult, repository::Repository};

/// Counters scoped to one account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Stats {
    #[serde(rename = "total_livres")]
    pub total_books: i64,
    #[serde(rename = "total_membres")]
    pub total_members: i64,
    #[serde(rename = "emprunts_actifs")]
    pub active_loans: i64,
    #[serde(rename = "amendes_impayees")]
    pub unpaid_fines: i64,
}

#[derive(Clone)]
pub struct StatsService {
    repository: Repository,
}

impl StatsService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn get_stats(&self, account_id: i64) -> AppResult<Stats> {
        let (total_books, total_members, active_loans, unpaid_fines) = tokio::try_join!(
            self.repository.books.count(account_id),
            self.repository.members.count(account_id),
            self.repository.loans.count_active(account_id),
            self.repository.fines.count_unpaid(account_id),
        )?;

        Ok(Stats {
            total_books,
            total_members,
            active_loans,
            unpaid_fines,
        })
    }
}
