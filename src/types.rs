use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// unique identifier for a loan
pub type LoanId = Uuid;

/// unique identifier for an installment row
pub type InstallmentId = Uuid;

/// unique identifier for a member
pub type MemberId = Uuid;

/// unique identifier for a savings row
pub type SavingsId = Uuid;

/// loan application status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoanStatus {
    /// application submitted by the member, terms not yet fixed
    Pengajuan,
    /// approved by an admin, principal and interest terms fixed
    Disetujui,
    /// funds released, installment schedule live
    Dicairkan,
    /// rejected, terminal
    Ditolak,
}

/// installment payment status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InstallmentStatus {
    Unpaid,
    Paid,
}

/// how an installment was settled
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentMethod {
    /// paid over the counter or by transfer, recorded by an admin
    Manual,
    /// marked paid by a bulk repayment import
    BulkImport,
    /// netted out of another loan's disbursement
    DeductedAtDisbursement,
}

/// delivery status for disbursed funds and settlement payouts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeliveryStatus {
    Pending,
    Sent,
}

/// membership status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MembershipStatus {
    /// full member, may apply for loans
    Active,
    /// demoted but still a member; reversible
    Pasif,
    /// exited; terminal, triggers exit settlement
    NonActive,
}

/// savings account compartment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SavingsKind {
    /// principal savings, paid once on joining
    Pokok,
    /// mandatory monthly savings
    Wajib,
    /// voluntary savings
    Sukarela,
}

/// savings transaction direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SavingsDirection {
    /// deposit
    Setor,
    /// withdrawal
    Tarik,
}

/// savings transaction status; billed-but-unpaid rows stay `Unpaid`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SavingsStatus {
    Paid,
    Unpaid,
}
