pub mod config;
pub mod decimal;
pub mod engine;
pub mod errors;
pub mod events;
pub mod interest;
pub mod loan;
pub mod member;
pub mod netting;
pub mod reporting;
pub mod schedule;
pub mod settlement;
pub mod store;
pub mod types;

// re-export key types
pub use config::EngineConfig;
pub use decimal::{Money, Rate};
pub use engine::{DisbursementOutcome, LoanEngine, MarkPaid};
pub use errors::{EngineError, Result};
pub use events::{Event, EventStore};
pub use interest::{quote, InterestMode, InterestQuote};
pub use loan::{Loan, LoanNumber};
pub use member::{savings_balance, Member, SavingsEntry};
pub use netting::{DeductionBreakdown, NettingEngine, NettingResult};
pub use reporting::{
    agreement_inputs, loan_progress, member_savings_summary, portfolio_report, AgreementInputs,
    LoanProgress, MemberSavingsSummary, PortfolioReport,
};
pub use schedule::{Installment, InstallmentSchedule};
pub use settlement::{ExitSettlement, SettlementCalculator};
pub use store::{
    InstallmentRepository, LoanRepository, MemberRepository, MemoryStore, SavingsRepository, Store,
};
pub use types::{
    DeliveryStatus, InstallmentId, InstallmentStatus, LoanId, LoanStatus, MemberId,
    MembershipStatus, PaymentMethod, SavingsDirection, SavingsId, SavingsKind, SavingsStatus,
};

// re-export external dependencies that users will need
pub use chrono;
pub use hourglass_rs::{SafeTimeProvider, TimeSource};
pub use rust_decimal::Decimal;
pub use uuid::Uuid;
