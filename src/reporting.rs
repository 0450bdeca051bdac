use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::errors::Result;
use crate::loan::Loan;
use crate::member::{savings_balance, SavingsEntry};
use crate::netting::DeductionBreakdown;
use crate::schedule::Installment;
use crate::store::Store;
use crate::types::{LoanId, LoanStatus, MemberId, SavingsDirection, SavingsKind, SavingsStatus};

/// repayment progress of one loan; `settled` is derived from the rows,
/// never read from a stored status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanProgress {
    pub loan_id: LoanId,
    pub paid_count: u32,
    pub total_count: u32,
    pub collected_amount: Money,
    pub remaining_amount: Money,
    pub settled: bool,
}

/// derive repayment progress from a loan's installment rows
pub fn loan_progress(loan: &Loan, rows: &[Installment]) -> LoanProgress {
    let paid_count = rows.iter().filter(|r| !r.is_unpaid()).count() as u32;
    let collected_amount = rows
        .iter()
        .filter(|r| !r.is_unpaid())
        .map(|r| r.amount)
        .sum();
    let remaining_amount = rows
        .iter()
        .filter(|r| r.is_unpaid())
        .map(|r| r.amount)
        .sum();

    LoanProgress {
        loan_id: loan.id,
        paid_count,
        total_count: rows.len() as u32,
        collected_amount,
        remaining_amount,
        settled: loan.is_running() && !rows.is_empty() && paid_count == rows.len() as u32,
    }
}

/// portfolio-wide dashboard statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioReport {
    pub generated_at: DateTime<Utc>,
    pub applications: u32,
    pub approved: u32,
    pub running: u32,
    pub rejected: u32,
    /// running loans with every installment paid
    pub settled: u32,
    pub disbursed_principal: Money,
    pub total_deductions: Money,
    pub collected_amount: Money,
    pub receivable_amount: Money,
}

impl PortfolioReport {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// roll the whole portfolio up from the store; read-only
pub fn portfolio_report<S: Store>(store: &S, generated_at: DateTime<Utc>) -> Result<PortfolioReport> {
    let mut report = PortfolioReport {
        generated_at,
        applications: 0,
        approved: 0,
        running: 0,
        rejected: 0,
        settled: 0,
        disbursed_principal: Money::ZERO,
        total_deductions: Money::ZERO,
        collected_amount: Money::ZERO,
        receivable_amount: Money::ZERO,
    };

    for loan in store.all_loans()? {
        match loan.status {
            LoanStatus::Pengajuan => report.applications += 1,
            LoanStatus::Disetujui => report.approved += 1,
            LoanStatus::Ditolak => report.rejected += 1,
            LoanStatus::Dicairkan => {
                report.running += 1;
                report.disbursed_principal += loan.approved_amount;
                report.total_deductions += loan.outstanding_deduction;

                let rows = store.installments_by_loan(loan.id)?;
                let progress = loan_progress(&loan, &rows);
                report.collected_amount += progress.collected_amount;
                report.receivable_amount += progress.remaining_amount;
                if progress.settled {
                    report.settled += 1;
                }
            }
        }
    }

    Ok(report)
}

/// per-compartment savings totals for one member
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberSavingsSummary {
    pub member_id: MemberId,
    pub pokok: Money,
    pub wajib: Money,
    pub sukarela: Money,
    pub balance: Money,
    pub billed_unpaid: Money,
}

/// summarize a member's savings; only settled rows count toward the balance
pub fn member_savings_summary(member_id: MemberId, entries: &[SavingsEntry]) -> MemberSavingsSummary {
    let mut summary = MemberSavingsSummary {
        member_id,
        pokok: Money::ZERO,
        wajib: Money::ZERO,
        sukarela: Money::ZERO,
        balance: savings_balance(entries),
        billed_unpaid: Money::ZERO,
    };

    for entry in entries {
        if entry.status != SavingsStatus::Paid {
            summary.billed_unpaid += entry.amount;
            continue;
        }
        let signed = match entry.direction {
            SavingsDirection::Setor => entry.amount,
            SavingsDirection::Tarik => -entry.amount,
        };
        match entry.kind {
            SavingsKind::Pokok => summary.pokok += signed,
            SavingsKind::Wajib => summary.wajib += signed,
            SavingsKind::Sukarela => summary.sukarela += signed,
        }
    }

    summary
}

/// everything the external document formatter needs to render a loan
/// agreement and its analysis report; computed totals only, no layout
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgreementInputs {
    pub loan_number: String,
    pub member_name: String,
    pub principal: Money,
    pub tenor_months: u32,
    pub total_interest: Money,
    pub total_payable: Money,
    pub periodic_installment: Money,
    pub deduction: DeductionBreakdown,
    pub admin_fee: Money,
    pub net_disbursement: Money,
    pub prepared_by: String,
    pub prepared_at: DateTime<Utc>,
}

impl AgreementInputs {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// assemble the formatter inputs from the loan's persisted terms; the quote
/// is recomputed, so it is identical to the one approval previewed
pub fn agreement_inputs(
    loan: &Loan,
    member_name: &str,
    deduction: DeductionBreakdown,
    admin_fee: Money,
    prepared_by: &str,
    prepared_at: DateTime<Utc>,
) -> Result<AgreementInputs> {
    let quote = loan.quote()?;
    Ok(AgreementInputs {
        loan_number: loan.number.to_string(),
        member_name: member_name.to_string(),
        principal: quote.principal,
        tenor_months: quote.tenor_months,
        total_interest: quote.total_interest,
        total_payable: quote.total_payable,
        periodic_installment: quote.periodic_installment,
        deduction,
        admin_fee,
        net_disbursement: quote.principal - deduction.total - admin_fee,
        prepared_by: prepared_by.to_string(),
        prepared_at,
    })
}
