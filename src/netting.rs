use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::errors::{EngineError, Result};
use crate::loan::{Loan, LoanNumber};
use crate::schedule::Installment;
use crate::types::{InstallmentId, LoanId};

/// computes the deductions applied to a disbursement and the net cash to
/// release; selection of installments is the admin's, never automatic
#[derive(Debug, Clone)]
pub struct NettingEngine {
    admin_fee: Money,
}

/// outcome of netting a disbursement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NettingResult {
    /// validated, de-duplicated selection
    pub deducted: Vec<InstallmentId>,
    pub total_deduction: Money,
    pub admin_fee: Money,
    pub net_disbursement: Money,
    /// deductions exceeded principal; a business misconfiguration surfaced
    /// as a data-quality flag, not rejected here
    pub shortfall: bool,
}

impl NettingEngine {
    pub fn new(admin_fee: Money) -> Self {
        Self { admin_fee }
    }

    /// net the loan's principal against the selected unpaid installments of
    /// the member's other running loans, minus the fixed admin fee.
    ///
    /// Every selected installment must belong to one of `other_loans` (the
    /// member's other running loans) and be unpaid. Selecting the same
    /// installment twice counts it once.
    pub fn compute(
        &self,
        loan: &Loan,
        other_loans: &[Loan],
        candidates: &[Installment],
        selected: &[InstallmentId],
    ) -> Result<NettingResult> {
        let eligible_loans: BTreeSet<LoanId> = other_loans
            .iter()
            .filter(|other| other.id != loan.id && other.member_id == loan.member_id && other.is_running())
            .map(|other| other.id)
            .collect();

        let unique: BTreeSet<InstallmentId> = selected.iter().copied().collect();

        let mut deducted = Vec::with_capacity(unique.len());
        let mut total_deduction = Money::ZERO;
        for id in unique {
            let installment = candidates
                .iter()
                .find(|c| c.id == id)
                .ok_or(EngineError::NotFound {
                    entity: "installment",
                    id,
                })?;

            if !eligible_loans.contains(&installment.loan_id) {
                return Err(EngineError::validation(
                    "deductions",
                    format!(
                        "installment {id} does not belong to another running loan of member {}",
                        loan.member_id
                    ),
                ));
            }
            if !installment.is_unpaid() {
                return Err(EngineError::validation(
                    "deductions",
                    format!("installment {id} is already paid"),
                ));
            }

            total_deduction += installment.amount;
            deducted.push(id);
        }

        let net_disbursement = loan.approved_amount - total_deduction - self.admin_fee;

        Ok(NettingResult {
            deducted,
            total_deduction,
            admin_fee: self.admin_fee,
            net_disbursement,
            shortfall: net_disbursement.is_negative(),
        })
    }
}

/// principal/interest split of the deductions captured on a disbursed loan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeductionBreakdown {
    pub principal_portion: Money,
    pub interest_portion: Money,
    pub total: Money,
}

/// derive the principal/interest split of historically deducted installments.
///
/// Each deducted installment contributes a flat per-month share of its parent
/// loan (`principal/tenor`, `total_interest/tenor`). The derived split is then
/// scaled so principal + interest reproduces `stored_total` exactly, instead
/// of compounding rounding drift between the live formula and the persisted
/// total. The rounding residue lands on the interest portion.
pub fn deduction_breakdown(
    stored_total: Money,
    deducted: &[(&Installment, &Loan)],
) -> Result<DeductionBreakdown> {
    if deducted.is_empty() || stored_total.is_zero() {
        return Ok(DeductionBreakdown {
            principal_portion: Money::ZERO,
            interest_portion: Money::ZERO,
            total: stored_total,
        });
    }

    let mut raw_principal = rust_decimal::Decimal::ZERO;
    let mut raw_interest = rust_decimal::Decimal::ZERO;
    for (_, parent) in deducted {
        let quote = parent.quote()?;
        raw_principal += parent.approved_amount.share(parent.tenor_months);
        raw_interest += quote.total_interest.share(parent.tenor_months);
    }

    let raw_total = raw_principal + raw_interest;
    if raw_total.is_zero() {
        return Ok(DeductionBreakdown {
            principal_portion: Money::ZERO,
            interest_portion: stored_total,
            total: stored_total,
        });
    }

    let factor = stored_total.as_decimal() / raw_total;
    let principal_portion = Money::from_decimal_rounded(raw_principal * factor);
    let interest_portion = stored_total - principal_portion;

    Ok(DeductionBreakdown {
        principal_portion,
        interest_portion,
        total: stored_total,
    })
}

/// legacy compatibility: rows migrated from the source dataset reference the
/// disbursing loan only through free text containing its number
pub fn matches_legacy_note(installment: &Installment, number: &LoanNumber) -> bool {
    installment
        .note
        .as_deref()
        .is_some_and(|note| note.contains(number.as_str()))
}

/// whether an installment was netted out by the given loan, by explicit
/// reference or by the legacy note shim
pub fn settled_by(installment: &Installment, loan: &Loan) -> bool {
    installment.settled_by_loan == Some(loan.id) || matches_legacy_note(installment, &loan.number)
}
