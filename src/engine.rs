use chrono::NaiveDate;
use hourglass_rs::SafeTimeProvider;
use tracing::{info, warn};

use crate::config::EngineConfig;
use crate::decimal::Money;
use crate::errors::{EngineError, Result};
use crate::events::{Event, EventStore};
use crate::interest::{InterestMode, InterestQuote};
use crate::loan::{Loan, LoanNumber};
use crate::member::{Member, SavingsEntry};
use crate::netting::{self, DeductionBreakdown, NettingEngine, NettingResult};
use crate::schedule::{Installment, InstallmentSchedule};
use crate::settlement::{ExitSettlement, SettlementCalculator};
use crate::store::Store;
use crate::types::{DeliveryStatus, InstallmentId, LoanId, LoanStatus, MemberId, PaymentMethod};

/// outcome of marking an installment paid; a repeat call is a no-op that
/// never alters the first payment timestamp
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkPaid {
    Applied,
    AlreadyPaid,
}

/// result of a successful disbursement
#[derive(Debug, Clone)]
pub struct DisbursementOutcome {
    pub loan: Loan,
    pub netting: NettingResult,
    pub installments: u32,
    pub first_due: NaiveDate,
}

/// the loan state machine, run against the persistence port.
///
/// Every mutating operation validates the source state first and fails with
/// no partial effect; `disburse` is the one multi-step unit and carries its
/// own compensation.
pub struct LoanEngine<S> {
    config: EngineConfig,
    store: S,
    events: EventStore,
}

impl<S: Store> LoanEngine<S> {
    pub fn new(config: EngineConfig, store: S) -> Self {
        Self {
            config,
            store,
            events: EventStore::new(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// drain events collected since the last call
    pub fn take_events(&mut self) -> Vec<Event> {
        self.events.take_events()
    }

    // ---- members and savings -------------------------------------------

    pub fn register_member(&mut self, member: Member) -> Result<()> {
        self.store.insert_member(member)
    }

    pub fn record_savings(&mut self, entry: SavingsEntry) -> Result<()> {
        self.store.member(entry.member_id)?;
        self.store.insert_savings(entry)
    }

    // ---- loan lifecycle ------------------------------------------------

    /// member action: create a loan application in `Pengajuan`
    pub fn submit_application(
        &mut self,
        member_id: MemberId,
        requested_amount: Money,
        tenor_months: u32,
        time_provider: &SafeTimeProvider,
    ) -> Result<Loan> {
        let member = self.store.member(member_id)?;
        if !member.can_apply() {
            return Err(EngineError::InvalidMemberTransition {
                member: member_id,
                current: member.status,
                attempted: "apply for a loan",
            });
        }

        let now = time_provider.now();
        let number = LoanNumber::generate(&self.config.loan_number_prefix, now.date_naive());
        let loan = Loan::new_application(member_id, number, requested_amount, tenor_months, now)?;

        self.store.insert_loan(loan.clone())?;
        info!(loan = %loan.id, number = %loan.number, amount = %requested_amount, "loan application submitted");
        self.events.emit(Event::LoanApplied {
            loan_id: loan.id,
            member_id,
            loan_number: loan.number.to_string(),
            requested_amount,
            tenor_months,
            timestamp: now,
        });

        Ok(loan)
    }

    /// admin action: set interest mode and value; idempotent, repeatable
    /// until disbursement, never changes status
    pub fn configure_interest(
        &mut self,
        loan_id: LoanId,
        mode: InterestMode,
        admin: &str,
        time_provider: &SafeTimeProvider,
    ) -> Result<Loan> {
        let mut loan = self.store.loan(loan_id)?;
        if !loan.can_configure_interest() {
            return Err(EngineError::InvalidLoanTransition {
                loan: loan_id,
                current: loan.status,
                attempted: "configure interest",
            });
        }
        mode.validate()?;

        loan.interest = mode;
        self.store.update_loan(&loan)?;
        self.events.emit(Event::InterestConfigured {
            loan_id,
            mode,
            configured_by: admin.to_string(),
            timestamp: time_provider.now(),
        });

        Ok(loan)
    }

    /// admin action: `Pengajuan -> Disetujui`; fixes principal and interest
    /// terms, creates no installments
    pub fn approve(
        &mut self,
        loan_id: LoanId,
        approved_amount: Option<Money>,
        admin: &str,
        time_provider: &SafeTimeProvider,
    ) -> Result<InterestQuote> {
        let mut loan = self.store.loan(loan_id)?;
        if loan.status != LoanStatus::Pengajuan {
            return Err(EngineError::InvalidLoanTransition {
                loan: loan_id,
                current: loan.status,
                attempted: "approve",
            });
        }

        if let Some(amount) = approved_amount {
            loan.approved_amount = amount;
        }
        if !loan.approved_amount.is_positive() {
            return Err(EngineError::validation(
                "approved_amount",
                format!("approved amount must be positive, got {}", loan.approved_amount),
            ));
        }
        // an enabled interest mode with a zero value is ambiguous and blocks
        // approval; it never silently becomes interest-free
        loan.interest.validate_for_approval()?;
        let quote = loan.quote()?;

        let now = time_provider.now();
        loan.status = LoanStatus::Disetujui;
        loan.approved_at = Some(now);
        loan.approved_by = Some(admin.to_string());
        self.store.update_loan(&loan)?;

        info!(loan = %loan_id, amount = %loan.approved_amount, installment = %quote.periodic_installment, "loan approved");
        self.events.emit(Event::LoanApproved {
            loan_id,
            approved_amount: loan.approved_amount,
            total_interest: quote.total_interest,
            periodic_installment: quote.periodic_installment,
            approved_by: admin.to_string(),
            timestamp: now,
        });

        Ok(quote)
    }

    /// admin action: `Pengajuan -> Ditolak`, terminal
    pub fn reject(
        &mut self,
        loan_id: LoanId,
        reason: &str,
        admin: &str,
        time_provider: &SafeTimeProvider,
    ) -> Result<()> {
        let mut loan = self.store.loan(loan_id)?;
        if loan.status != LoanStatus::Pengajuan {
            return Err(EngineError::InvalidLoanTransition {
                loan: loan_id,
                current: loan.status,
                attempted: "reject",
            });
        }

        let now = time_provider.now();
        loan.status = LoanStatus::Ditolak;
        loan.rejected_at = Some(now);
        self.store.update_loan(&loan)?;

        self.events.emit(Event::LoanRejected {
            loan_id,
            rejected_by: admin.to_string(),
            reason: reason.to_string(),
            timestamp: now,
        });

        Ok(())
    }

    /// unpaid installments of the member's other running loans, the pool an
    /// admin picks deductions from
    pub fn deduction_candidates(
        &self,
        member_id: MemberId,
        excluding_loan: LoanId,
    ) -> Result<Vec<Installment>> {
        let mut candidates = Vec::new();
        for other in self.store.loans_by_member(member_id)? {
            if other.id == excluding_loan || !other.is_running() {
                continue;
            }
            candidates.extend(
                self.store
                    .installments_by_loan(other.id)?
                    .into_iter()
                    .filter(Installment::is_unpaid),
            );
        }
        Ok(candidates)
    }

    /// admin action: `Disetujui -> Dicairkan`.
    ///
    /// Runs netting over the selected prior installments, stamps the
    /// disbursement, marks the deducted installments paid with a reference to
    /// this loan, and generates the installment schedule exactly once. The
    /// three store writes are one logical unit: on failure the already
    /// applied steps are undone, and if the undo itself fails the error is a
    /// `PartialCommit` so the operator knows the store needs manual repair.
    /// Must not be blindly retried after a `PartialCommit`.
    pub fn disburse(
        &mut self,
        loan_id: LoanId,
        selected: &[InstallmentId],
        admin: &str,
        time_provider: &SafeTimeProvider,
    ) -> Result<DisbursementOutcome> {
        let loan_before = self.store.loan(loan_id)?;
        if loan_before.status != LoanStatus::Disetujui {
            return Err(EngineError::InvalidLoanTransition {
                loan: loan_id,
                current: loan_before.status,
                attempted: "disburse",
            });
        }
        // uniqueness backstop: one schedule per loan, ever
        if !self.store.installments_by_loan(loan_id)?.is_empty() {
            return Err(EngineError::validation(
                "schedule",
                format!("loan {loan_id} already has an installment schedule"),
            ));
        }

        let other_loans: Vec<Loan> = self
            .store
            .loans_by_member(loan_before.member_id)?
            .into_iter()
            .filter(|l| l.id != loan_id && l.is_running())
            .collect();
        let mut candidates = Vec::new();
        for other in &other_loans {
            candidates.extend(self.store.installments_by_loan(other.id)?);
        }

        let netting_engine = NettingEngine::new(self.config.admin_fee);
        let netting = netting_engine.compute(&loan_before, &other_loans, &candidates, selected)?;
        if netting.shortfall {
            warn!(loan = %loan_id, net = %netting.net_disbursement, "deductions exceed principal");
        }

        let now = time_provider.now();

        // everything is computed before the first write
        let deducted_before: Vec<Installment> = candidates
            .iter()
            .filter(|c| netting.deducted.contains(&c.id))
            .cloned()
            .collect();
        let mut deducted_after = deducted_before.clone();
        for row in &mut deducted_after {
            row.mark_paid(
                now,
                PaymentMethod::DeductedAtDisbursement,
                Some(format!("dipotong pencairan {}", loan_before.number)),
                Some(loan_id),
            );
        }

        let schedule = InstallmentSchedule::generate(&loan_before, now)?;
        let first_due = schedule.rows[0].due_date;

        let mut loan = loan_before.clone();
        loan.status = LoanStatus::Dicairkan;
        loan.outstanding_deduction = netting.total_deduction;
        loan.disbursed_at = Some(now);
        loan.disbursed_by = Some(admin.to_string());

        // step A: loan row
        self.store.update_loan(&loan)?;

        // step B: deducted installments
        if let Err(err) = self.store.update_installments(&deducted_after) {
            return Err(self.undo_disbursement(
                loan_id,
                &loan_before,
                None,
                false,
                err,
                "loan status updated",
                time_provider,
            ));
        }

        // step C: new schedule
        if let Err(err) = self.store.insert_installments(schedule.rows.clone()) {
            return Err(self.undo_disbursement(
                loan_id,
                &loan_before,
                Some(deducted_before.as_slice()),
                true,
                err,
                "loan status updated, deductions applied",
                time_provider,
            ));
        }

        info!(
            loan = %loan_id,
            number = %loan.number,
            net = %netting.net_disbursement,
            deduction = %netting.total_deduction,
            "loan disbursed"
        );
        self.events.emit(Event::LoanDisbursed {
            loan_id,
            principal: loan.approved_amount,
            total_deduction: netting.total_deduction,
            admin_fee: netting.admin_fee,
            net_disbursement: netting.net_disbursement,
            disbursed_by: admin.to_string(),
            timestamp: now,
        });
        if !netting.deducted.is_empty() {
            self.events.emit(Event::InstallmentsDeducted {
                loan_id,
                deducted: netting.deducted.clone(),
                total_deduction: netting.total_deduction,
                timestamp: now,
            });
        }
        self.events.emit(Event::ScheduleCreated {
            loan_id,
            installments: schedule.rows.len() as u32,
            periodic_installment: schedule.quote.periodic_installment,
            first_due,
        });

        Ok(DisbursementOutcome {
            loan,
            netting,
            installments: schedule.rows.len() as u32,
            first_due,
        })
    }

    /// compensating undo for a failed disbursement; escalates to
    /// `PartialCommit` when the undo cannot fully restore the store
    #[allow(clippy::too_many_arguments)]
    fn undo_disbursement(
        &mut self,
        loan_id: LoanId,
        loan_before: &Loan,
        deducted_before: Option<&[Installment]>,
        remove_schedule: bool,
        cause: EngineError,
        completed: &'static str,
        time_provider: &SafeTimeProvider,
    ) -> EngineError {
        warn!(loan = %loan_id, %cause, "disbursement failed, compensating");

        if remove_schedule {
            if let Err(undo_err) = self.store.delete_installments_by_loan(loan_id) {
                return EngineError::PartialCommit {
                    loan: loan_id,
                    completed,
                    message: format!("{cause}; schedule rows could not be removed: {undo_err}"),
                };
            }
        }
        if let Some(rows) = deducted_before {
            if let Err(undo_err) = self.store.update_installments(rows) {
                return EngineError::PartialCommit {
                    loan: loan_id,
                    completed,
                    message: format!("{cause}; deducted installments could not be restored: {undo_err}"),
                };
            }
        }
        if let Err(undo_err) = self.store.update_loan(loan_before) {
            return EngineError::PartialCommit {
                loan: loan_id,
                completed,
                message: format!("{cause}; loan row could not be restored: {undo_err}"),
            };
        }

        self.events.emit(Event::DisbursementRolledBack {
            loan_id,
            reason: cause.to_string(),
            timestamp: time_provider.now(),
        });
        cause
    }

    /// admin or bulk-import action: settle one installment. The second call
    /// for the same installment is a no-op that keeps the original paid-at.
    pub fn mark_installment_paid(
        &mut self,
        installment_id: InstallmentId,
        method: PaymentMethod,
        note: Option<String>,
        time_provider: &SafeTimeProvider,
    ) -> Result<MarkPaid> {
        let mut row = self.store.installment(installment_id)?;
        let now = time_provider.now();
        if !row.mark_paid(now, method.clone(), note, None) {
            return Ok(MarkPaid::AlreadyPaid);
        }
        self.store.update_installment(&row)?;

        self.events.emit(Event::InstallmentPaid {
            installment_id,
            loan_id: row.loan_id,
            sequence: row.sequence,
            amount: row.amount,
            method,
            timestamp: now,
        });

        // payoff is derived, never stored; emit the audit event when the
        // last installment lands
        let rows = self.store.installments_by_loan(row.loan_id)?;
        if rows.iter().all(|r| !r.is_unpaid()) {
            let total_collected = rows.iter().map(|r| r.amount).sum();
            info!(loan = %row.loan_id, %total_collected, "loan fully repaid");
            self.events.emit(Event::LoanSettled {
                loan_id: row.loan_id,
                total_collected,
                timestamp: now,
            });
        }

        Ok(MarkPaid::Applied)
    }

    /// derived payoff state: a disbursed loan with every installment paid
    pub fn is_settled(&self, loan_id: LoanId) -> Result<bool> {
        let loan = self.store.loan(loan_id)?;
        if loan.status != LoanStatus::Dicairkan {
            return Ok(false);
        }
        let rows = self.store.installments_by_loan(loan_id)?;
        Ok(!rows.is_empty() && rows.iter().all(|r| !r.is_unpaid()))
    }

    /// flip fund delivery to `Sent` once; repeat calls keep the first stamp
    pub fn mark_loan_delivered(
        &mut self,
        loan_id: LoanId,
        time_provider: &SafeTimeProvider,
    ) -> Result<bool> {
        let mut loan = self.store.loan(loan_id)?;
        if loan.status != LoanStatus::Dicairkan {
            return Err(EngineError::InvalidLoanTransition {
                loan: loan_id,
                current: loan.status,
                attempted: "mark delivered",
            });
        }
        if loan.delivery_status == DeliveryStatus::Sent {
            return Ok(false);
        }

        let now = time_provider.now();
        loan.delivery_status = DeliveryStatus::Sent;
        loan.delivered_at = Some(now);
        self.store.update_loan(&loan)?;
        self.events.emit(Event::LoanDelivered {
            loan_id,
            timestamp: now,
        });
        Ok(true)
    }

    /// principal/interest split of the deductions captured on a disbursed
    /// loan, scaled to reproduce the stored total exactly
    pub fn deduction_breakdown(&self, loan_id: LoanId) -> Result<DeductionBreakdown> {
        let loan = self.store.loan(loan_id)?;
        if loan.status != LoanStatus::Dicairkan {
            return Err(EngineError::InvalidLoanTransition {
                loan: loan_id,
                current: loan.status,
                attempted: "derive deduction breakdown",
            });
        }

        let mut owned: Vec<(Installment, Loan)> = Vec::new();
        for other in self.store.loans_by_member(loan.member_id)? {
            if other.id == loan_id {
                continue;
            }
            for row in self.store.installments_by_loan(other.id)? {
                if netting::settled_by(&row, &loan) {
                    owned.push((row, other.clone()));
                }
            }
        }
        let pairs: Vec<(&Installment, &Loan)> = owned.iter().map(|(i, l)| (i, l)).collect();
        netting::deduction_breakdown(loan.outstanding_deduction, &pairs)
    }

    // ---- member lifecycle ----------------------------------------------

    /// reversible demotion, `Active -> Pasif`
    pub fn demote_member(
        &mut self,
        member_id: MemberId,
        time_provider: &SafeTimeProvider,
    ) -> Result<()> {
        let mut member = self.store.member(member_id)?;
        let old_status = member.status;
        member.demote()?;
        self.store.update_member(&member)?;
        self.events.emit(Event::MemberStatusChanged {
            member_id,
            old_status,
            new_status: member.status,
            timestamp: time_provider.now(),
        });
        Ok(())
    }

    /// `Pasif -> Active`
    pub fn reactivate_member(
        &mut self,
        member_id: MemberId,
        time_provider: &SafeTimeProvider,
    ) -> Result<()> {
        let mut member = self.store.member(member_id)?;
        let old_status = member.status;
        member.reactivate()?;
        self.store.update_member(&member)?;
        self.events.emit(Event::MemberStatusChanged {
            member_id,
            old_status,
            new_status: member.status,
            timestamp: time_provider.now(),
        });
        Ok(())
    }

    /// what the exit settlement would be today, without mutating anything
    pub fn exit_settlement_preview(&self, member_id: MemberId) -> Result<ExitSettlement> {
        self.store.member(member_id)?;
        self.member_settlement(member_id)
    }

    /// terminal exit, `Active|Pasif -> NonActive`: stamps exit metadata and
    /// returns the settlement for manual reconciliation. The settlement is
    /// never applied to the stores by this call.
    pub fn deactivate_member(
        &mut self,
        member_id: MemberId,
        reason: &str,
        time_provider: &SafeTimeProvider,
    ) -> Result<ExitSettlement> {
        let mut member = self.store.member(member_id)?;
        let settlement = self.member_settlement(member_id)?;

        let now = time_provider.now();
        let old_status = member.status;
        member.deactivate(now, reason)?;
        self.store.update_member(&member)?;

        info!(member = %member_id, net = %settlement.net_settlement, "member exited");
        self.events.emit(Event::MemberStatusChanged {
            member_id,
            old_status,
            new_status: member.status,
            timestamp: now,
        });
        self.events.emit(Event::MemberExited {
            member_id,
            reason: reason.to_string(),
            settlement: settlement.clone(),
            timestamp: now,
        });

        Ok(settlement)
    }

    /// flip the settlement payout to `Sent` once
    pub fn mark_settlement_delivered(
        &mut self,
        member_id: MemberId,
        time_provider: &SafeTimeProvider,
    ) -> Result<bool> {
        let mut member = self.store.member(member_id)?;
        let flipped = member.mark_settlement_delivered(time_provider.now());
        if flipped {
            self.store.update_member(&member)?;
            self.events.emit(Event::SettlementDelivered {
                member_id,
                timestamp: time_provider.now(),
            });
        }
        Ok(flipped)
    }

    fn member_settlement(&self, member_id: MemberId) -> Result<ExitSettlement> {
        let savings = self.store.savings_by_member(member_id)?;

        let mut owned: Vec<(Installment, Loan)> = Vec::new();
        for loan in self.store.loans_by_member(member_id)? {
            if !loan.is_running() {
                continue;
            }
            for row in self.store.installments_by_loan(loan.id)? {
                if row.is_unpaid() {
                    owned.push((row, loan.clone()));
                }
            }
        }
        let pairs: Vec<(&Installment, &Loan)> = owned.iter().map(|(i, l)| (i, l)).collect();

        SettlementCalculator::new(self.config.admin_fee).calculate(member_id, &savings, &pairs)
    }
}
