use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::interest::InterestMode;
use crate::settlement::ExitSettlement;
use crate::types::{InstallmentId, LoanId, MemberId, MembershipStatus, PaymentMethod};

/// all events emitted by the engine during mutating operations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    // loan lifecycle
    LoanApplied {
        loan_id: LoanId,
        member_id: MemberId,
        loan_number: String,
        requested_amount: Money,
        tenor_months: u32,
        timestamp: DateTime<Utc>,
    },
    InterestConfigured {
        loan_id: LoanId,
        mode: InterestMode,
        configured_by: String,
        timestamp: DateTime<Utc>,
    },
    LoanApproved {
        loan_id: LoanId,
        approved_amount: Money,
        total_interest: Money,
        periodic_installment: Money,
        approved_by: String,
        timestamp: DateTime<Utc>,
    },
    LoanRejected {
        loan_id: LoanId,
        rejected_by: String,
        reason: String,
        timestamp: DateTime<Utc>,
    },
    LoanDisbursed {
        loan_id: LoanId,
        principal: Money,
        total_deduction: Money,
        admin_fee: Money,
        net_disbursement: Money,
        disbursed_by: String,
        timestamp: DateTime<Utc>,
    },
    ScheduleCreated {
        loan_id: LoanId,
        installments: u32,
        periodic_installment: Money,
        first_due: chrono::NaiveDate,
    },
    DisbursementRolledBack {
        loan_id: LoanId,
        reason: String,
        timestamp: DateTime<Utc>,
    },
    LoanDelivered {
        loan_id: LoanId,
        timestamp: DateTime<Utc>,
    },

    // installment events
    InstallmentPaid {
        installment_id: InstallmentId,
        loan_id: LoanId,
        sequence: u32,
        amount: Money,
        method: PaymentMethod,
        timestamp: DateTime<Utc>,
    },
    InstallmentsDeducted {
        loan_id: LoanId,
        deducted: Vec<InstallmentId>,
        total_deduction: Money,
        timestamp: DateTime<Utc>,
    },
    LoanSettled {
        loan_id: LoanId,
        total_collected: Money,
        timestamp: DateTime<Utc>,
    },

    // member lifecycle
    MemberStatusChanged {
        member_id: MemberId,
        old_status: MembershipStatus,
        new_status: MembershipStatus,
        timestamp: DateTime<Utc>,
    },
    MemberExited {
        member_id: MemberId,
        reason: String,
        settlement: ExitSettlement,
        timestamp: DateTime<Utc>,
    },
    SettlementDelivered {
        member_id: MemberId,
        timestamp: DateTime<Utc>,
    },
}

/// event store for collecting events during operations
#[derive(Debug, Default)]
pub struct EventStore {
    events: Vec<Event>,
}

impl EventStore {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}
