//! Persistence port. The engine talks to the hosted database only through
//! these traits; `MemoryStore` is the in-crate implementation used by tests
//! and demos.

pub mod memory;

pub use memory::MemoryStore;

use crate::errors::Result;
use crate::loan::Loan;
use crate::member::{Member, SavingsEntry};
use crate::schedule::Installment;
use crate::types::{InstallmentId, LoanId, LoanStatus, MemberId};

/// `pinjaman` table
pub trait LoanRepository {
    fn insert_loan(&mut self, loan: Loan) -> Result<()>;
    fn loan(&self, id: LoanId) -> Result<Loan>;
    fn update_loan(&mut self, loan: &Loan) -> Result<()>;
    fn loans_by_member(&self, member_id: MemberId) -> Result<Vec<Loan>>;
    fn loans_by_status(&self, status: LoanStatus) -> Result<Vec<Loan>>;
    fn all_loans(&self) -> Result<Vec<Loan>>;
}

/// `angsuran` table
pub trait InstallmentRepository {
    /// bulk insert; a single call is atomic at the store's discretion
    fn insert_installments(&mut self, rows: Vec<Installment>) -> Result<()>;
    fn installment(&self, id: InstallmentId) -> Result<Installment>;
    fn update_installment(&mut self, row: &Installment) -> Result<()>;
    /// bulk update
    fn update_installments(&mut self, rows: &[Installment]) -> Result<()>;
    fn installments_by_loan(&self, loan_id: LoanId) -> Result<Vec<Installment>>;
    /// compensation path for a failed schedule insert; returns rows removed
    fn delete_installments_by_loan(&mut self, loan_id: LoanId) -> Result<u32>;
}

/// `personal_data` table
pub trait MemberRepository {
    fn insert_member(&mut self, member: Member) -> Result<()>;
    fn member(&self, id: MemberId) -> Result<Member>;
    fn update_member(&mut self, member: &Member) -> Result<()>;
}

/// `simpanan` table
pub trait SavingsRepository {
    fn insert_savings(&mut self, entry: SavingsEntry) -> Result<()>;
    fn savings_by_member(&self, member_id: MemberId) -> Result<Vec<SavingsEntry>>;
}

/// combined persistence port the engine operates against
pub trait Store:
    LoanRepository + InstallmentRepository + MemberRepository + SavingsRepository
{
}

impl<T> Store for T where
    T: LoanRepository + InstallmentRepository + MemberRepository + SavingsRepository
{
}
