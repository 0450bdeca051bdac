use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::errors::Result;
use crate::loan::Loan;
use crate::member::{savings_balance, SavingsEntry};
use crate::schedule::Installment;
use crate::types::MemberId;

/// nets an exiting member's savings against outstanding loan debt
#[derive(Debug, Clone)]
pub struct SettlementCalculator {
    admin_fee: Money,
}

/// final reconciliation of a departing member; positive net is owed to the
/// member, negative net is still owed to the cooperative. Surfaced for
/// manual reconciliation, never applied automatically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExitSettlement {
    pub member_id: MemberId,
    pub savings_balance: Money,
    /// flat pro-rated principal still to recover
    pub outstanding_principal: Money,
    /// flat pro-rated interest still owed
    pub outstanding_interest: Money,
    pub total_outstanding: Money,
    pub admin_fee: Money,
    pub net_settlement: Money,
    pub unpaid_installments: u32,
}

impl ExitSettlement {
    pub fn payable_to_member(&self) -> bool {
        self.net_settlement.is_positive()
    }
}

impl SettlementCalculator {
    pub fn new(admin_fee: Money) -> Self {
        Self { admin_fee }
    }

    /// compute the exit settlement from the member's settled savings history
    /// and unpaid installments paired with their parent loans.
    ///
    /// Each unpaid installment contributes `principal/tenor` and
    /// `total_interest/tenor` of its parent loan rather than the stored
    /// installment amount, isolating principal recovery from interest owed.
    /// Shares stay decimal-exact until a single half-up rounding at the end.
    pub fn calculate(
        &self,
        member_id: MemberId,
        savings: &[SavingsEntry],
        unpaid: &[(&Installment, &Loan)],
    ) -> Result<ExitSettlement> {
        let savings_balance = savings_balance(savings);

        let mut raw_principal = Decimal::ZERO;
        let mut raw_interest = Decimal::ZERO;
        let mut unpaid_installments = 0u32;
        for (installment, parent) in unpaid {
            if !installment.is_unpaid() {
                continue;
            }
            let quote = parent.quote()?;
            raw_principal += parent.approved_amount.share(parent.tenor_months);
            raw_interest += quote.total_interest.share(parent.tenor_months);
            unpaid_installments += 1;
        }

        let outstanding_principal = Money::from_decimal_rounded(raw_principal);
        let outstanding_interest = Money::from_decimal_rounded(raw_interest);
        let total_outstanding = Money::from_decimal_rounded(raw_principal + raw_interest);
        let net_settlement = savings_balance - total_outstanding - self.admin_fee;

        Ok(ExitSettlement {
            member_id,
            savings_balance,
            outstanding_principal,
            outstanding_interest,
            total_outstanding,
            admin_fee: self.admin_fee,
            net_settlement,
            unpaid_installments,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::Rate;
    use crate::interest::InterestMode;
    use crate::loan::LoanNumber;
    use crate::schedule::InstallmentSchedule;
    use crate::types::{LoanStatus, PaymentMethod, SavingsDirection, SavingsKind};
    use chrono::{NaiveDate, TimeZone, Utc};
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn running_loan(
        member_id: Uuid,
        principal: i64,
        tenor: u32,
        interest: InterestMode,
    ) -> (Loan, Vec<Installment>) {
        let date = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
        let mut loan = Loan::new_application(
            member_id,
            LoanNumber::generate("RS", date),
            Money::from_major(principal),
            tenor,
            Utc.with_ymd_and_hms(2024, 1, 10, 9, 0, 0).unwrap(),
        )
        .unwrap();
        loan.interest = interest;
        loan.status = LoanStatus::Dicairkan;
        let schedule = InstallmentSchedule::generate(
            &loan,
            Utc.with_ymd_and_hms(2024, 1, 20, 9, 0, 0).unwrap(),
        )
        .unwrap();
        (loan, schedule.rows)
    }

    fn deposits(member_id: Uuid, amount: i64) -> Vec<SavingsEntry> {
        vec![SavingsEntry::paid(
            member_id,
            SavingsKind::Sukarela,
            SavingsDirection::Setor,
            Money::from_major(amount),
            Utc.with_ymd_and_hms(2023, 6, 1, 0, 0, 0).unwrap(),
        )]
    }

    #[test]
    fn test_settlement_with_outstanding_loan() {
        // savings 4,000,000; loan 1,200,000 over 12 months, interest-free,
        // 4 installments unpaid
        let member_id = Uuid::new_v4();
        let (loan, mut rows) = running_loan(member_id, 1_200_000, 12, InterestMode::None);
        let paid_at = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        for row in rows.iter_mut().take(8) {
            row.mark_paid(paid_at, PaymentMethod::Manual, None, None);
        }
        let unpaid: Vec<(&Installment, &Loan)> = rows
            .iter()
            .filter(|r| r.is_unpaid())
            .map(|r| (r, &loan))
            .collect();
        assert_eq!(unpaid.len(), 4);

        let calc = SettlementCalculator::new(Money::from_major(5_000));
        let settlement = calc
            .calculate(member_id, &deposits(member_id, 4_000_000), &unpaid)
            .unwrap();

        assert_eq!(settlement.total_outstanding, Money::from_major(400_000));
        assert_eq!(settlement.outstanding_principal, Money::from_major(400_000));
        assert_eq!(settlement.outstanding_interest, Money::ZERO);
        assert_eq!(settlement.net_settlement, Money::from_major(3_595_000));
        assert!(settlement.payable_to_member());
        assert_eq!(settlement.unpaid_installments, 4);
    }

    #[test]
    fn test_settlement_without_loans() {
        let member_id = Uuid::new_v4();
        let calc = SettlementCalculator::new(Money::from_major(5_000));
        let settlement = calc
            .calculate(member_id, &deposits(member_id, 250_000), &[])
            .unwrap();

        assert_eq!(settlement.total_outstanding, Money::ZERO);
        assert_eq!(settlement.net_settlement, Money::from_major(245_000));
    }

    #[test]
    fn test_settlement_uses_flat_shares_not_installment_amounts() {
        // 5,000,000 over 12 months at 12%: the stored installment is the
        // ceiled 466,667, the flat shares are 416,666.67 + 50,000
        let member_id = Uuid::new_v4();
        let (loan, rows) = running_loan(
            member_id,
            5_000_000,
            12,
            InterestMode::Persenan {
                annual_rate: Rate::from_percentage(dec!(12)),
            },
        );
        let unpaid: Vec<(&Installment, &Loan)> = vec![(&rows[0], &loan), (&rows[1], &loan)];

        let calc = SettlementCalculator::new(Money::from_major(5_000));
        let settlement = calc
            .calculate(member_id, &deposits(member_id, 2_000_000), &unpaid)
            .unwrap();

        // 2 x (416,666.67 + 50,000) = 933,333.33, rounded once at the end
        assert_eq!(settlement.total_outstanding, Money::from_major(933_333));
        assert_eq!(settlement.outstanding_principal, Money::from_major(833_333));
        assert_eq!(settlement.outstanding_interest, Money::from_major(100_000));
        assert_eq!(
            settlement.net_settlement,
            Money::from_major(2_000_000 - 933_333 - 5_000)
        );
    }

    #[test]
    fn test_settlement_can_owe_the_cooperative() {
        let member_id = Uuid::new_v4();
        let (loan, rows) = running_loan(member_id, 1_200_000, 12, InterestMode::None);
        let unpaid: Vec<(&Installment, &Loan)> = rows.iter().map(|r| (r, &loan)).collect();

        let calc = SettlementCalculator::new(Money::from_major(5_000));
        let settlement = calc
            .calculate(member_id, &deposits(member_id, 100_000), &unpaid)
            .unwrap();

        assert_eq!(settlement.total_outstanding, Money::from_major(1_200_000));
        assert_eq!(settlement.net_settlement, Money::from_major(-1_105_000));
        assert!(!settlement.payable_to_member());
    }

    #[test]
    fn test_paid_rows_in_input_are_ignored() {
        let member_id = Uuid::new_v4();
        let (loan, mut rows) = running_loan(member_id, 1_200_000, 12, InterestMode::None);
        rows[0].mark_paid(
            Utc.with_ymd_and_hms(2024, 2, 20, 0, 0, 0).unwrap(),
            PaymentMethod::Manual,
            None,
            None,
        );
        let pairs: Vec<(&Installment, &Loan)> =
            vec![(&rows[0], &loan), (&rows[1], &loan)];

        let calc = SettlementCalculator::new(Money::from_major(5_000));
        let settlement = calc
            .calculate(member_id, &deposits(member_id, 1_000_000), &pairs)
            .unwrap();

        assert_eq!(settlement.unpaid_installments, 1);
        assert_eq!(settlement.total_outstanding, Money::from_major(100_000));
    }
}
