use chrono::{DateTime, NaiveDate, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::decimal::Money;
use crate::errors::{EngineError, Result};
use crate::interest::{self, InterestMode, InterestQuote};
use crate::types::{DeliveryStatus, LoanId, LoanStatus, MemberId};

/// human-readable loan number, `RS<yyyymmdd>-<4 digits>`; uniqueness is
/// expected but not enforced here, collisions are negligible at this scale
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanNumber(String);

impl LoanNumber {
    /// generate a number for the given date with a random 4-digit suffix
    pub fn generate(prefix: &str, date: NaiveDate) -> Self {
        let suffix: u16 = rand::thread_rng().gen_range(0..10_000);
        Self::render(prefix, date, suffix)
    }

    /// build a number from known parts; suffix must fit in 4 digits
    pub fn from_parts(prefix: &str, date: NaiveDate, suffix: u16) -> Result<Self> {
        if suffix > 9_999 {
            return Err(EngineError::validation(
                "loan_number",
                format!("suffix must be at most 4 digits, got {suffix}"),
            ));
        }
        Ok(Self::render(prefix, date, suffix))
    }

    fn render(prefix: &str, date: NaiveDate, suffix: u16) -> Self {
        LoanNumber(format!("{prefix}{}-{suffix:04}", date.format("%Y%m%d")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LoanNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// a loan through its whole lifecycle, from application to payoff
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Loan {
    pub id: LoanId,
    pub member_id: MemberId,
    pub number: LoanNumber,

    /// amount the member asked for; never altered once status leaves
    /// `Pengajuan`
    pub requested_amount: Money,
    /// amount the cooperative lends; admins may adjust it until disbursement
    pub approved_amount: Money,
    pub tenor_months: u32,
    pub interest: InterestMode,

    pub status: LoanStatus,
    /// total of prior-loan installments netted out at disbursement
    pub outstanding_deduction: Money,

    pub applied_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub disbursed_at: Option<DateTime<Utc>>,

    /// whether the disbursed funds have been handed over
    pub delivery_status: DeliveryStatus,
    pub delivered_at: Option<DateTime<Utc>>,

    // audit attribution, display names only
    pub approved_by: Option<String>,
    pub disbursed_by: Option<String>,
}

impl Loan {
    /// create a fresh application in `Pengajuan`
    pub fn new_application(
        member_id: MemberId,
        number: LoanNumber,
        requested_amount: Money,
        tenor_months: u32,
        applied_at: DateTime<Utc>,
    ) -> Result<Self> {
        if !requested_amount.is_positive() {
            return Err(EngineError::validation(
                "requested_amount",
                format!("requested amount must be positive, got {requested_amount}"),
            ));
        }
        if tenor_months < 1 {
            return Err(EngineError::validation("tenor", "tenor must be at least one month"));
        }

        Ok(Self {
            id: Uuid::new_v4(),
            member_id,
            number,
            requested_amount,
            // approval starts from what was requested
            approved_amount: requested_amount,
            tenor_months,
            interest: InterestMode::None,
            status: LoanStatus::Pengajuan,
            outstanding_deduction: Money::ZERO,
            applied_at,
            approved_at: None,
            rejected_at: None,
            disbursed_at: None,
            delivery_status: DeliveryStatus::Pending,
            delivered_at: None,
            approved_by: None,
            disbursed_by: None,
        })
    }

    /// quote against the current approved amount and interest terms
    pub fn quote(&self) -> Result<InterestQuote> {
        interest::quote(self.approved_amount, self.tenor_months, self.interest)
    }

    /// interest may be (re)configured until disbursement
    pub fn can_configure_interest(&self) -> bool {
        matches!(self.status, LoanStatus::Pengajuan | LoanStatus::Disetujui)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.status, LoanStatus::Ditolak)
    }

    /// running loans are the ones whose unpaid installments can be netted
    /// against a new disbursement
    pub fn is_running(&self) -> bool {
        self.status == LoanStatus::Dicairkan
    }
}
