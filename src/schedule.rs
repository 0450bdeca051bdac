use chrono::{DateTime, Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::Money;
use crate::errors::{EngineError, Result};
use crate::interest::InterestQuote;
use crate::loan::Loan;
use crate::types::{InstallmentId, InstallmentStatus, LoanId, PaymentMethod};

/// one scheduled repayment obligation; created exactly once at disbursement,
/// mutated to `Paid` at most once, never deleted or regenerated
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Installment {
    pub id: InstallmentId,
    pub loan_id: LoanId,
    /// month number within the schedule, 1..=tenor, unique per loan
    pub sequence: u32,
    /// fixed at schedule-generation time
    pub amount: Money,
    pub due_date: NaiveDate,
    pub status: InstallmentStatus,
    pub paid_at: Option<DateTime<Utc>>,
    pub method: Option<PaymentMethod>,
    pub note: Option<String>,
    /// the disbursing loan that netted this installment out, if any
    pub settled_by_loan: Option<LoanId>,
}

impl Installment {
    pub fn is_unpaid(&self) -> bool {
        self.status == InstallmentStatus::Unpaid
    }

    /// settle the installment; returns false without touching anything when
    /// it was already paid, so the original paid-at survives re-invocation
    pub fn mark_paid(
        &mut self,
        paid_at: DateTime<Utc>,
        method: PaymentMethod,
        note: Option<String>,
        settled_by_loan: Option<LoanId>,
    ) -> bool {
        if self.status == InstallmentStatus::Paid {
            return false;
        }
        self.status = InstallmentStatus::Paid;
        self.paid_at = Some(paid_at);
        self.method = Some(method);
        self.note = note;
        self.settled_by_loan = settled_by_loan;
        true
    }
}

/// the full future schedule of a disbursed loan
#[derive(Debug, Clone)]
pub struct InstallmentSchedule {
    pub loan_id: LoanId,
    pub quote: InterestQuote,
    pub rows: Vec<Installment>,
}

impl InstallmentSchedule {
    /// generate the schedule for a terms-finalized loan: exactly `tenor`
    /// rows, equal amounts, due dates one calendar month apart starting one
    /// month after disbursement.
    ///
    /// Not idempotent. Generating twice for the same loan duplicates the
    /// schedule; only the disbursement transition may call this, once.
    pub fn generate(loan: &Loan, disbursed_at: DateTime<Utc>) -> Result<Self> {
        let quote = loan.quote()?;
        let start = disbursed_at.date_naive();

        let mut rows = Vec::with_capacity(quote.tenor_months as usize);
        for sequence in 1..=quote.tenor_months {
            let due_date = start.checked_add_months(Months::new(sequence)).ok_or_else(|| {
                EngineError::InvalidDate {
                    message: format!("due date overflow at month {sequence} from {start}"),
                }
            })?;

            rows.push(Installment {
                id: Uuid::new_v4(),
                loan_id: loan.id,
                sequence,
                amount: quote.periodic_installment,
                due_date,
                status: InstallmentStatus::Unpaid,
                paid_at: None,
                method: None,
                note: None,
                settled_by_loan: None,
            });
        }

        Ok(Self {
            loan_id: loan.id,
            quote,
            rows,
        })
    }

    /// sum of all scheduled amounts; exceeds total payable by at most the
    /// ceiling-division rounding
    pub fn total_scheduled(&self) -> Money {
        self.rows.iter().map(|r| r.amount).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::Rate;
    use crate::interest::InterestMode;
    use crate::loan::LoanNumber;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn loan(principal: i64, tenor: u32, interest: InterestMode) -> Loan {
        let date = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        let mut loan = Loan::new_application(
            Uuid::new_v4(),
            LoanNumber::from_parts("RS", date, 7).unwrap(),
            Money::from_major(principal),
            tenor,
            Utc.with_ymd_and_hms(2024, 1, 31, 10, 0, 0).unwrap(),
        )
        .unwrap();
        loan.interest = interest;
        loan
    }

    #[test]
    fn test_schedule_shape() {
        let loan = loan(
            5_000_000,
            12,
            InterestMode::Persenan {
                annual_rate: Rate::from_percentage(dec!(12)),
            },
        );
        let disbursed_at = Utc.with_ymd_and_hms(2024, 3, 15, 10, 0, 0).unwrap();
        let schedule = InstallmentSchedule::generate(&loan, disbursed_at).unwrap();

        assert_eq!(schedule.rows.len(), 12);
        let sequences: Vec<u32> = schedule.rows.iter().map(|r| r.sequence).collect();
        assert_eq!(sequences, (1..=12).collect::<Vec<_>>());

        for row in &schedule.rows {
            assert_eq!(row.amount, Money::from_major(466_667));
            assert!(row.is_unpaid());
            assert!(row.paid_at.is_none());
            assert!(row.settled_by_loan.is_none());
        }

        // due dates advance by exactly one calendar month and strictly increase
        assert_eq!(schedule.rows[0].due_date, NaiveDate::from_ymd_opt(2024, 4, 15).unwrap());
        assert_eq!(schedule.rows[11].due_date, NaiveDate::from_ymd_opt(2025, 3, 15).unwrap());
        for pair in schedule.rows.windows(2) {
            assert!(pair[0].due_date < pair[1].due_date);
        }
    }

    #[test]
    fn test_schedule_clamps_end_of_month() {
        let loan = loan(1_200_000, 3, InterestMode::None);
        let disbursed_at = Utc.with_ymd_and_hms(2024, 1, 31, 10, 0, 0).unwrap();
        let schedule = InstallmentSchedule::generate(&loan, disbursed_at).unwrap();

        // chrono clamps to the last day of shorter months
        assert_eq!(schedule.rows[0].due_date, NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
        assert_eq!(schedule.rows[1].due_date, NaiveDate::from_ymd_opt(2024, 3, 31).unwrap());
        assert_eq!(schedule.rows[2].due_date, NaiveDate::from_ymd_opt(2024, 4, 30).unwrap());
    }

    #[test]
    fn test_total_scheduled_covers_payable() {
        let loan = loan(
            5_000_000,
            12,
            InterestMode::Persenan {
                annual_rate: Rate::from_percentage(dec!(12)),
            },
        );
        let disbursed_at = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let schedule = InstallmentSchedule::generate(&loan, disbursed_at).unwrap();

        let total = schedule.total_scheduled();
        assert!(total >= schedule.quote.total_payable);
        // over-collection is bounded by one unit per installment
        assert!(total - schedule.quote.total_payable < Money::from_major(12));
    }

    #[test]
    fn test_mark_paid_is_sticky() {
        let loan = loan(600_000, 6, InterestMode::None);
        let disbursed_at = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        let mut schedule = InstallmentSchedule::generate(&loan, disbursed_at).unwrap();

        let row = &mut schedule.rows[0];
        let first_paid = Utc.with_ymd_and_hms(2024, 6, 2, 8, 0, 0).unwrap();
        assert!(row.mark_paid(first_paid, PaymentMethod::Manual, None, None));

        let second_paid = Utc.with_ymd_and_hms(2024, 6, 9, 8, 0, 0).unwrap();
        assert!(!row.mark_paid(second_paid, PaymentMethod::Manual, None, None));
        assert_eq!(row.paid_at, Some(first_paid));
    }
}
