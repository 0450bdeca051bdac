use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::decimal::{Money, Rate};
use crate::errors::{EngineError, Result};

/// interest configuration of a loan; one calculation path per variant so a
/// new mode can never silently fall through to zero interest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InterestMode {
    /// interest-free loan
    None,
    /// flat annual percentage on the original principal
    Persenan { annual_rate: Rate },
    /// fixed total interest amount, not scaled by tenor or principal
    Nominal { amount: Money },
}

impl InterestMode {
    /// total interest over the whole tenor
    pub fn total_interest(&self, principal: Money, tenor_months: u32) -> Money {
        match self {
            InterestMode::None => Money::ZERO,
            InterestMode::Persenan { annual_rate } => {
                let years = Decimal::from(tenor_months) / Decimal::from(12);
                Money::from_decimal_rounded(
                    principal.as_decimal() * annual_rate.as_decimal() * years,
                )
            }
            InterestMode::Nominal { amount } => *amount,
        }
    }

    /// whether interest is charged at all
    pub fn is_enabled(&self) -> bool {
        !matches!(self, InterestMode::None)
    }

    /// reject configurations that could never be disbursed
    pub fn validate(&self) -> Result<()> {
        match self {
            InterestMode::None => Ok(()),
            InterestMode::Persenan { annual_rate } => {
                if annual_rate.is_negative() {
                    return Err(EngineError::validation(
                        "interest_value",
                        format!("annual rate must not be negative, got {annual_rate}"),
                    ));
                }
                Ok(())
            }
            InterestMode::Nominal { amount } => {
                if amount.is_negative() {
                    return Err(EngineError::validation(
                        "interest_value",
                        format!("nominal interest must not be negative, got {amount}"),
                    ));
                }
                Ok(())
            }
        }
    }

    /// stricter check applied at approval: an enabled mode with a zero value
    /// is ambiguous and must block approval rather than default to zero
    pub fn validate_for_approval(&self) -> Result<()> {
        self.validate()?;
        match self {
            InterestMode::None => Ok(()),
            InterestMode::Persenan { annual_rate } if annual_rate.is_zero() => {
                Err(EngineError::validation(
                    "interest_value",
                    "percentage interest enabled but rate is zero",
                ))
            }
            InterestMode::Nominal { amount } if amount.is_zero() => {
                Err(EngineError::validation(
                    "interest_value",
                    "nominal interest enabled but amount is zero",
                ))
            }
            _ => Ok(()),
        }
    }
}

/// result of quoting a loan's terms; deterministic, so approval preview,
/// disbursement and reporting always agree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterestQuote {
    pub principal: Money,
    pub tenor_months: u32,
    pub total_interest: Money,
    pub total_payable: Money,
    pub periodic_installment: Money,
}

/// quote total interest and the periodic installment for the given terms
pub fn quote(principal: Money, tenor_months: u32, mode: InterestMode) -> Result<InterestQuote> {
    if !principal.is_positive() {
        return Err(EngineError::validation(
            "principal",
            format!("principal must be positive, got {principal}"),
        ));
    }
    if tenor_months < 1 {
        return Err(EngineError::validation("tenor", "tenor must be at least one month"));
    }
    mode.validate()?;

    let total_interest = mode.total_interest(principal, tenor_months);
    let total_payable = principal + total_interest;
    // ceiling division: the final collected total may exceed total_payable by
    // the rounding, never fall short of it
    let periodic_installment = total_payable.ceil_div(tenor_months);

    Ok(InterestQuote {
        principal,
        tenor_months,
        total_interest,
        total_payable,
        periodic_installment,
    })
}
