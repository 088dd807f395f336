//! Data models for BiblioTech

pub mod account;
pub mod book;
pub mod fine;
pub mod loan;
pub mod member;

// Re-export commonly used types
pub use account::{Account, AccountClaims, Role};
pub use book::Book;
pub use fine::{FineDetails, FineStatus};
pub use loan::{LoanDetails, LoanPolicy, LoanStatus};
pub use member::{Member, MemberStatus};
