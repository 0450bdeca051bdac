use std::collections::BTreeMap;

use crate::errors::{EngineError, Result};
use crate::loan::Loan;
use crate::member::{Member, SavingsEntry};
use crate::schedule::Installment;
use crate::types::{InstallmentId, LoanId, LoanStatus, MemberId, SavingsId};

use super::{InstallmentRepository, LoanRepository, MemberRepository, SavingsRepository};

/// in-memory store; BTreeMaps keep iteration deterministic
#[derive(Debug, Default)]
pub struct MemoryStore {
    loans: BTreeMap<LoanId, Loan>,
    installments: BTreeMap<InstallmentId, Installment>,
    members: BTreeMap<MemberId, Member>,
    savings: BTreeMap<SavingsId, SavingsEntry>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LoanRepository for MemoryStore {
    fn insert_loan(&mut self, loan: Loan) -> Result<()> {
        self.loans.insert(loan.id, loan);
        Ok(())
    }

    fn loan(&self, id: LoanId) -> Result<Loan> {
        self.loans
            .get(&id)
            .cloned()
            .ok_or(EngineError::NotFound { entity: "loan", id })
    }

    fn update_loan(&mut self, loan: &Loan) -> Result<()> {
        match self.loans.get_mut(&loan.id) {
            Some(existing) => {
                *existing = loan.clone();
                Ok(())
            }
            None => Err(EngineError::NotFound {
                entity: "loan",
                id: loan.id,
            }),
        }
    }

    fn loans_by_member(&self, member_id: MemberId) -> Result<Vec<Loan>> {
        Ok(self
            .loans
            .values()
            .filter(|l| l.member_id == member_id)
            .cloned()
            .collect())
    }

    fn loans_by_status(&self, status: LoanStatus) -> Result<Vec<Loan>> {
        Ok(self
            .loans
            .values()
            .filter(|l| l.status == status)
            .cloned()
            .collect())
    }

    fn all_loans(&self) -> Result<Vec<Loan>> {
        Ok(self.loans.values().cloned().collect())
    }
}

impl InstallmentRepository for MemoryStore {
    fn insert_installments(&mut self, rows: Vec<Installment>) -> Result<()> {
        for row in rows {
            self.installments.insert(row.id, row);
        }
        Ok(())
    }

    fn installment(&self, id: InstallmentId) -> Result<Installment> {
        self.installments
            .get(&id)
            .cloned()
            .ok_or(EngineError::NotFound {
                entity: "installment",
                id,
            })
    }

    fn update_installment(&mut self, row: &Installment) -> Result<()> {
        match self.installments.get_mut(&row.id) {
            Some(existing) => {
                *existing = row.clone();
                Ok(())
            }
            None => Err(EngineError::NotFound {
                entity: "installment",
                id: row.id,
            }),
        }
    }

    fn update_installments(&mut self, rows: &[Installment]) -> Result<()> {
        // reject the whole batch up front so a bulk update never half-applies
        for row in rows {
            if !self.installments.contains_key(&row.id) {
                return Err(EngineError::NotFound {
                    entity: "installment",
                    id: row.id,
                });
            }
        }
        for row in rows {
            self.installments.insert(row.id, row.clone());
        }
        Ok(())
    }

    fn installments_by_loan(&self, loan_id: LoanId) -> Result<Vec<Installment>> {
        let mut rows: Vec<Installment> = self
            .installments
            .values()
            .filter(|i| i.loan_id == loan_id)
            .cloned()
            .collect();
        rows.sort_by_key(|i| i.sequence);
        Ok(rows)
    }

    fn delete_installments_by_loan(&mut self, loan_id: LoanId) -> Result<u32> {
        let ids: Vec<InstallmentId> = self
            .installments
            .values()
            .filter(|i| i.loan_id == loan_id)
            .map(|i| i.id)
            .collect();
        let removed = ids.len() as u32;
        for id in ids {
            self.installments.remove(&id);
        }
        Ok(removed)
    }
}

impl MemberRepository for MemoryStore {
    fn insert_member(&mut self, member: Member) -> Result<()> {
        self.members.insert(member.id, member);
        Ok(())
    }

    fn member(&self, id: MemberId) -> Result<Member> {
        self.members
            .get(&id)
            .cloned()
            .ok_or(EngineError::NotFound {
                entity: "member",
                id,
            })
    }

    fn update_member(&mut self, member: &Member) -> Result<()> {
        match self.members.get_mut(&member.id) {
            Some(existing) => {
                *existing = member.clone();
                Ok(())
            }
            None => Err(EngineError::NotFound {
                entity: "member",
                id: member.id,
            }),
        }
    }
}

impl SavingsRepository for MemoryStore {
    fn insert_savings(&mut self, entry: SavingsEntry) -> Result<()> {
        self.savings.insert(entry.id, entry);
        Ok(())
    }

    fn savings_by_member(&self, member_id: MemberId) -> Result<Vec<SavingsEntry>> {
        let mut entries: Vec<SavingsEntry> = self
            .savings
            .values()
            .filter(|e| e.member_id == member_id)
            .cloned()
            .collect();
        entries.sort_by_key(|e| e.recorded_at);
        Ok(entries)
    }
}
