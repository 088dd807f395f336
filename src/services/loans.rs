//! Loan ledger: checkouts, returns and fines

use chrono::{NaiveDate, Utc};

use crate::{
    config::LoansConfig,
    error::AppResult,
    models::{
        fine::FineDetails,
        loan::{CreateLoan, LoanDetails, LoanPolicy},
    },
    repository::Repository,
};

/// A closed loan and the fine it produced, if any
#[derive(Debug, Clone)]
pub struct ReturnOutcome {
    pub loan: LoanDetails,
    pub fine: Option<FineDetails>,
}

#[derive(Clone)]
pub struct LoansService {
    repository: Repository,
    policy: LoanPolicy,
}

impl LoansService {
    pub fn new(repository: Repository, config: &LoansConfig) -> Self {
        Self {
            repository,
            policy: LoanPolicy::from(config),
        }
    }

    fn today() -> NaiveDate {
        Utc::now().date_naive()
    }

    pub async fn list_loans(&self, account_id: i64) -> AppResult<Vec<LoanDetails>> {
        self.repository.loans.list(account_id).await
    }

    /// Lend one copy of a book to a member
    pub async fn create_loan(&self, account_id: i64, loan: CreateLoan) -> AppResult<LoanDetails> {
        let created = self
            .repository
            .loans
            .checkout(account_id, loan.book_id, loan.member_id, Self::today(), &self.policy)
            .await?;

        tracing::info!(
            account_id,
            loan_id = created.id,
            book_id = loan.book_id,
            member_id = loan.member_id,
            due = %created.due_date,
            "Loan created"
        );
        Ok(created)
    }

    /// Return a borrowed copy, fining a late return
    pub async fn return_loan(&self, account_id: i64, loan_id: i64) -> AppResult<ReturnOutcome> {
        let returned = self
            .repository
            .loans
            .return_loan(account_id, loan_id, Self::today(), &self.policy)
            .await?;

        let fine = match returned.fine_id {
            Some(fine_id) => {
                let fine = self.repository.fines.get_details(account_id, fine_id).await?;
                tracing::info!(account_id, loan_id, amount = fine.amount, "Late return fined");
                Some(fine)
            }
            None => None,
        };

        tracing::info!(account_id, loan_id, "Loan returned");
        Ok(ReturnOutcome {
            loan: returned.loan,
            fine,
        })
    }

    pub async fn list_fines(&self, account_id: i64) -> AppResult<Vec<FineDetails>> {
        self.repository.fines.list(account_id).await
    }

    /// Mark a fine paid
    pub async fn pay_fine(&self, account_id: i64, fine_id: i64) -> AppResult<FineDetails> {
        let fine = self.repository.fines.pay(account_id, fine_id).await?;
        tracing::info!(account_id, fine_id, "Fine paid");
        Ok(fine)
    }
}
