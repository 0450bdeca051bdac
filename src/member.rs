use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::Money;
use crate::errors::{EngineError, Result};
use crate::types::{
    DeliveryStatus, MemberId, MembershipStatus, SavingsDirection, SavingsId, SavingsKind,
    SavingsStatus,
};

/// exit metadata, populated only on deactivation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExitRecord {
    pub exited_at: DateTime<Utc>,
    pub reason: String,
    pub settlement_delivery: DeliveryStatus,
    pub settlement_delivered_at: Option<DateTime<Utc>>,
}

/// a cooperative member
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Member {
    pub id: MemberId,
    pub name: String,
    pub employee_number: String,
    /// master-data references, resolved elsewhere
    pub company: String,
    pub work_unit: String,
    pub status: MembershipStatus,
    pub joined_at: DateTime<Utc>,
    pub exit: Option<ExitRecord>,
}

impl Member {
    pub fn new(
        name: impl Into<String>,
        employee_number: impl Into<String>,
        company: impl Into<String>,
        work_unit: impl Into<String>,
        joined_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            employee_number: employee_number.into(),
            company: company.into(),
            work_unit: work_unit.into(),
            status: MembershipStatus::Active,
            joined_at,
            exit: None,
        }
    }

    /// only active members may apply for loans
    pub fn can_apply(&self) -> bool {
        self.status == MembershipStatus::Active
    }

    /// reversible demotion, `Active -> Pasif`
    pub fn demote(&mut self) -> Result<()> {
        if self.status != MembershipStatus::Active {
            return Err(EngineError::InvalidMemberTransition {
                member: self.id,
                current: self.status,
                attempted: "demote",
            });
        }
        self.status = MembershipStatus::Pasif;
        Ok(())
    }

    /// undo a demotion, `Pasif -> Active`
    pub fn reactivate(&mut self) -> Result<()> {
        if self.status != MembershipStatus::Pasif {
            return Err(EngineError::InvalidMemberTransition {
                member: self.id,
                current: self.status,
                attempted: "reactivate",
            });
        }
        self.status = MembershipStatus::Active;
        Ok(())
    }

    /// terminal exit, `Active|Pasif -> NonActive`; stamps exit metadata
    pub fn deactivate(&mut self, exited_at: DateTime<Utc>, reason: impl Into<String>) -> Result<()> {
        if self.status == MembershipStatus::NonActive {
            return Err(EngineError::InvalidMemberTransition {
                member: self.id,
                current: self.status,
                attempted: "deactivate",
            });
        }
        self.status = MembershipStatus::NonActive;
        self.exit = Some(ExitRecord {
            exited_at,
            reason: reason.into(),
            settlement_delivery: DeliveryStatus::Pending,
            settlement_delivered_at: None,
        });
        Ok(())
    }

    /// flip the settlement payout to `Sent` once; the first timestamp sticks
    pub fn mark_settlement_delivered(&mut self, delivered_at: DateTime<Utc>) -> bool {
        match self.exit.as_mut() {
            Some(exit) if exit.settlement_delivery == DeliveryStatus::Pending => {
                exit.settlement_delivery = DeliveryStatus::Sent;
                exit.settlement_delivered_at = Some(delivered_at);
                true
            }
            _ => false,
        }
    }
}

/// one savings transaction; billed-but-unpaid obligations carry their period
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavingsEntry {
    pub id: SavingsId,
    pub member_id: MemberId,
    pub kind: SavingsKind,
    pub direction: SavingsDirection,
    pub amount: Money,
    pub status: SavingsStatus,
    /// billing period for billed-but-unpaid rows
    pub sequence: Option<u32>,
    pub due_date: Option<NaiveDate>,
    pub recorded_at: DateTime<Utc>,
}

impl SavingsEntry {
    pub fn paid(
        member_id: MemberId,
        kind: SavingsKind,
        direction: SavingsDirection,
        amount: Money,
        recorded_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            member_id,
            kind,
            direction,
            amount,
            status: SavingsStatus::Paid,
            sequence: None,
            due_date: None,
            recorded_at,
        }
    }
}

/// settled savings balance across all compartments: paid deposits minus paid
/// withdrawals; billed-but-unpaid rows do not count
pub fn savings_balance(entries: &[SavingsEntry]) -> Money {
    entries
        .iter()
        .filter(|e| e.status == SavingsStatus::Paid)
        .map(|e| match e.direction {
            SavingsDirection::Setor => e.amount,
            SavingsDirection::Tarik => -e.amount,
        })
        .sum()
}
