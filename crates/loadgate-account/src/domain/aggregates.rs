//! The account aggregate and its admission state machine.

use std::collections::HashMap;

use chrono::Datelike;

use loadgate_core::action::EventAction;
use loadgate_core::error::DomainError;
use loadgate_core::event::Event;
use loadgate_core::transaction::Transaction;

use super::events::{AccountState, FailureCause, TxnFailure, TxnRecord};

/// Per-customer deposit limits. A zero value disables that axis.
#[derive(Debug, Clone, Copy)]
pub struct AccountLimits {
    /// Maximum accepted amount per civil day.
    pub daily_amount: f64,
    /// Maximum accepted transaction count per civil day.
    pub daily_count: u32,
    /// Maximum accepted amount per ISO week.
    pub weekly_amount: f64,
    /// Maximum accepted transaction count per ISO week.
    pub weekly_count: u32,
}

impl AccountLimits {
    /// Checks internal consistency: limits are non-negative and an
    /// enabled weekly bound is never tighter than its daily counterpart.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` describing the first violation.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.daily_amount < 0.0 || self.weekly_amount < 0.0 {
            return Err(DomainError::Validation(
                "amount limits must not be negative".to_owned(),
            ));
        }
        if self.weekly_amount > 0.0 && self.weekly_amount < self.daily_amount {
            return Err(DomainError::Validation(
                "weekly amount limit must not be below the daily amount limit".to_owned(),
            ));
        }
        if self.weekly_count > 0 && self.weekly_count < self.daily_count {
            return Err(DomainError::Validation(
                "weekly transaction count limit must not be below the daily count limit".to_owned(),
            ));
        }
        Ok(())
    }

    fn daily(&self) -> TxnRecord {
        TxnRecord {
            num_txns: self.daily_count,
            total_amount: self.daily_amount,
        }
    }

    fn weekly(&self) -> TxnRecord {
        TxnRecord {
            num_txns: self.weekly_count,
            total_amount: self.weekly_amount,
        }
    }
}

/// Outcome of admitting one transaction.
#[derive(Debug, Clone, PartialEq)]
pub enum Admission {
    /// The transaction was accepted; the snapshot to persist.
    Accepted(AccountState),
    /// The transaction was rejected; the failure to persist.
    Rejected(TxnFailure),
}

impl Admission {
    /// Returns the event action this admission persists under for the
    /// given transaction. Zero-amount loads count as deposits.
    #[must_use]
    pub fn action(&self, txn: &Transaction) -> EventAction {
        match self {
            Self::Accepted(_) if txn.load_amount < 0.0 => EventAction::AccountWithdrawn,
            Self::Accepted(_) => EventAction::AccountDeposited,
            Self::Rejected(failure) if failure.failure_cause == FailureCause::DuplicateTxn => {
                EventAction::DuplicateTxn
            }
            Self::Rejected(_) => EventAction::AccountLimitExceeded,
        }
    }
}

struct LimitViolation {
    cause: Option<FailureCause>,
    reason: String,
}

/// The admission state machine for one customer's account.
///
/// Rebuilt from the customer's event stream for every command; instances
/// are never cached across commands.
pub struct Account {
    limits: AccountLimits,
    customer_id: String,
    balance: f64,
    seen_txn_ids: Vec<String>,
    daily_txn: HashMap<i32, HashMap<u32, TxnRecord>>,
    weekly_txn: HashMap<i32, HashMap<u32, TxnRecord>>,
}

impl Account {
    /// Creates an empty account for `customer_id`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the limits are inconsistent.
    pub fn new(customer_id: impl Into<String>, limits: AccountLimits) -> Result<Self, DomainError> {
        limits.validate()?;
        Ok(Self {
            limits,
            customer_id: customer_id.into(),
            balance: 0.0,
            seen_txn_ids: Vec::new(),
            daily_txn: HashMap::new(),
            weekly_txn: HashMap::new(),
        })
    }

    /// Returns the customer id this account belongs to.
    #[must_use]
    pub fn customer_id(&self) -> &str {
        &self.customer_id
    }

    /// Returns the current balance.
    #[must_use]
    pub fn balance(&self) -> f64 {
        self.balance
    }

    /// Rebuilds aggregate state from the customer's event stream.
    ///
    /// Accepted-transaction snapshots are applied in order; rejection
    /// events carry no state change and are skipped.
    ///
    /// # Errors
    ///
    /// Returns a serialization error for undecodable snapshots, or a
    /// validation error for actions that do not belong to an account
    /// stream.
    pub fn replay(&mut self, events: &[Event]) -> Result<(), DomainError> {
        for event in events {
            match event.action() {
                EventAction::AccountDeposited | EventAction::AccountWithdrawn => {
                    let state: AccountState = event.decode()?;
                    self.apply(&state);
                }
                EventAction::DuplicateTxn | EventAction::AccountLimitExceeded => {}
                other => {
                    return Err(DomainError::Validation(format!(
                        "unexpected action '{other}' in account event stream"
                    )));
                }
            }
        }
        Ok(())
    }

    fn apply(&mut self, state: &AccountState) {
        let time = state.txn_time;
        let iso = time.iso_week();

        self.daily_txn
            .entry(time.year())
            .or_default()
            .insert(time.ordinal(), state.daily_txn);
        self.weekly_txn
            .entry(iso.year())
            .or_default()
            .insert(iso.week(), state.weekly_txn);
        self.seen_txn_ids.push(state.txn_id.clone());
        self.balance = state.total_amount;
    }

    /// Runs one transaction through the admission checks: duplicate id,
    /// then the daily bucket, then the weekly bucket. Exactly one outcome
    /// is produced per call and the checks run in that fixed order.
    #[must_use]
    pub fn admit(&self, txn: &Transaction) -> Admission {
        if self.seen_txn_ids.iter().any(|id| id == &txn.id) {
            return Admission::Rejected(TxnFailure {
                txn: txn.clone(),
                error: "duplicate transaction".to_owned(),
                failure_cause: FailureCause::DuplicateTxn,
            });
        }

        let time = txn.time;
        let daily_trial = self
            .daily_record(time.year(), time.ordinal())
            .with_txn(txn.load_amount);
        if let Err(violation) = self.validate_limits(daily_trial, self.limits.daily()) {
            return Admission::Rejected(TxnFailure {
                txn: txn.clone(),
                error: format!("failed daily-limits validation: {}", violation.reason),
                failure_cause: violation.cause.unwrap_or(FailureCause::DailyLimitsExceeded),
            });
        }

        let iso = time.iso_week();
        let weekly_trial = self
            .weekly_record(iso.year(), iso.week())
            .with_txn(txn.load_amount);
        if let Err(violation) = self.validate_limits(weekly_trial, self.limits.weekly()) {
            return Admission::Rejected(TxnFailure {
                txn: txn.clone(),
                error: format!("failed weekly-limits validation: {}", violation.reason),
                failure_cause: violation.cause.unwrap_or(FailureCause::WeeklyLimitsExceeded),
            });
        }

        Admission::Accepted(AccountState {
            txn_id: txn.id.clone(),
            cust_id: txn.customer_id.clone(),
            txn_time: txn.time,
            daily_txn: daily_trial,
            weekly_txn: weekly_trial,
            total_amount: self.balance + txn.load_amount,
        })
    }

    fn daily_record(&self, year: i32, day: u32) -> TxnRecord {
        self.daily_txn
            .get(&year)
            .and_then(|days| days.get(&day))
            .copied()
            .unwrap_or_default()
    }

    fn weekly_record(&self, year: i32, week: u32) -> TxnRecord {
        self.weekly_txn
            .get(&year)
            .and_then(|weeks| weeks.get(&week))
            .copied()
            .unwrap_or_default()
    }

    fn validate_limits(&self, trial: TxnRecord, limits: TxnRecord) -> Result<(), LimitViolation> {
        if self.balance + trial.total_amount < 0.0 {
            return Err(LimitViolation {
                cause: Some(FailureCause::InsufficientFunds),
                reason: "balance less than zero".to_owned(),
            });
        }
        if limits.num_txns > 0 && trial.num_txns > limits.num_txns {
            return Err(LimitViolation {
                cause: None,
                reason: "num-of-deposits limit exceeded".to_owned(),
            });
        }
        if limits.total_amount > 0.0 && trial.total_amount > limits.total_amount {
            return Err(LimitViolation {
                cause: None,
                reason: format!(
                    "amount limit exceeded by ${:.2}",
                    trial.total_amount - limits.total_amount
                ),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    fn default_limits() -> AccountLimits {
        AccountLimits {
            daily_amount: 5000.0,
            daily_count: 3,
            weekly_amount: 20000.0,
            weekly_count: 0,
        }
    }

    fn txn(id: &str, customer_id: &str, amount: f64, date: (i32, u32, u32)) -> Transaction {
        Transaction {
            id: id.to_owned(),
            customer_id: customer_id.to_owned(),
            load_amount: amount,
            time: Utc
                .with_ymd_and_hms(date.0, date.1, date.2, 0, 0, 0)
                .unwrap(),
        }
    }

    /// Admits the transaction and, when accepted, folds the snapshot back
    /// into the aggregate the way replay would.
    fn admit_and_apply(account: &mut Account, txn: &Transaction) -> Admission {
        let admission = account.admit(txn);
        if let Admission::Accepted(state) = &admission {
            account.apply(state);
        }
        admission
    }

    fn expect_rejection(admission: Admission) -> TxnFailure {
        match admission {
            Admission::Rejected(failure) => failure,
            Admission::Accepted(state) => panic!("expected rejection, got acceptance: {state:?}"),
        }
    }

    #[test]
    fn test_first_deposit_is_accepted_with_full_snapshot() {
        let account = Account::new("528", default_limits()).unwrap();
        assert_eq!(account.customer_id(), "528");
        let deposit = txn("15887", "528", 3318.47, (2000, 1, 1));

        let admission = account.admit(&deposit);

        let Admission::Accepted(state) = &admission else {
            panic!("expected acceptance, got {admission:?}");
        };
        assert_eq!(state.txn_id, "15887");
        assert_eq!(state.cust_id, "528");
        assert_eq!(
            state.daily_txn,
            TxnRecord {
                num_txns: 1,
                total_amount: 3318.47
            }
        );
        assert_eq!(state.weekly_txn, state.daily_txn);
        assert!((state.total_amount - 3318.47).abs() < f64::EPSILON);
        assert_eq!(admission.action(&deposit), EventAction::AccountDeposited);
    }

    #[test]
    fn test_zero_amount_load_counts_as_deposit() {
        let account = Account::new("528", default_limits()).unwrap();
        let zero = txn("1", "528", 0.0, (2000, 1, 1));

        let admission = account.admit(&zero);
        assert_eq!(admission.action(&zero), EventAction::AccountDeposited);
    }

    #[test]
    fn test_negative_amount_load_is_a_withdrawal() {
        let mut account = Account::new("528", default_limits()).unwrap();
        admit_and_apply(&mut account, &txn("1", "528", 100.0, (2000, 1, 1)));

        let withdrawal = txn("2", "528", -40.0, (2000, 1, 1));
        let admission = admit_and_apply(&mut account, &withdrawal);

        assert_eq!(admission.action(&withdrawal), EventAction::AccountWithdrawn);
        assert!((account.balance() - 60.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_withdrawal_on_empty_account_is_insufficient_funds() {
        let account = Account::new("898", default_limits()).unwrap();
        let withdrawal = txn("16987", "898", -33.47, (2000, 1, 2));

        let admission = account.admit(&withdrawal);
        assert_eq!(admission.action(&withdrawal), EventAction::AccountLimitExceeded);

        let failure = expect_rejection(admission);
        assert_eq!(failure.failure_cause, FailureCause::InsufficientFunds);
        assert!(failure.error.contains("balance less than zero"));
    }

    #[test]
    fn test_duplicate_transaction_id_is_rejected() {
        let mut account = Account::new("528", default_limits()).unwrap();
        let original = txn("15887", "528", 100.0, (2000, 1, 1));
        admit_and_apply(&mut account, &original);

        // Same id on a different day and amount is still a duplicate.
        let replayed = txn("15887", "528", 50.0, (2000, 1, 3));
        let admission = account.admit(&replayed);

        assert_eq!(admission.action(&replayed), EventAction::DuplicateTxn);
        let failure = expect_rejection(admission);
        assert_eq!(failure.failure_cause, FailureCause::DuplicateTxn);
        assert_eq!(failure.error, "duplicate transaction");
    }

    #[test]
    fn test_rejected_transaction_id_may_be_retried() {
        let mut account = Account::new("528", default_limits()).unwrap();

        let too_large = txn("77", "528", 9000.0, (2000, 1, 1));
        expect_rejection(admit_and_apply(&mut account, &too_large));

        // Rejections record no transaction id, so a corrected retry of
        // the same id passes the duplicate check.
        let corrected = txn("77", "528", 90.0, (2000, 1, 1));
        assert!(matches!(
            admit_and_apply(&mut account, &corrected),
            Admission::Accepted(_)
        ));
    }

    #[test]
    fn test_fourth_same_day_deposit_exceeds_count_limit() {
        let mut account = Account::new("197", default_limits()).unwrap();

        for id in ["1", "2", "3"] {
            let deposit = txn(id, "197", 100.0, (2000, 5, 1));
            assert!(matches!(
                admit_and_apply(&mut account, &deposit),
                Admission::Accepted(_)
            ));
        }

        let fourth = txn("4", "197", 100.0, (2000, 5, 1));
        let failure = expect_rejection(admit_and_apply(&mut account, &fourth));
        assert_eq!(failure.failure_cause, FailureCause::DailyLimitsExceeded);
        assert!(failure.error.contains("num-of-deposits limit exceeded"));
    }

    #[test]
    fn test_daily_amount_limit_boundary() {
        let limits = AccountLimits {
            daily_amount: 5000.0,
            daily_count: 0,
            weekly_amount: 20000.0,
            weekly_count: 0,
        };
        let mut account = Account::new("197", limits).unwrap();

        // 1000 + 2500 + 1500 lands exactly on the limit and is accepted.
        for (id, amount) in [("1", 1000.0), ("2", 2500.0), ("3", 1500.0)] {
            let deposit = txn(id, "197", amount, (2000, 5, 1));
            assert!(matches!(
                admit_and_apply(&mut account, &deposit),
                Admission::Accepted(_)
            ));
        }

        let over = txn("4", "197", 1000.0, (2000, 5, 1));
        let failure = expect_rejection(admit_and_apply(&mut account, &over));
        assert_eq!(failure.failure_cause, FailureCause::DailyLimitsExceeded);
        assert!(failure.error.contains("amount limit exceeded by $1000.00"));
    }

    #[test]
    fn test_daily_buckets_reset_across_days() {
        let mut account = Account::new("528", default_limits()).unwrap();

        for id in ["1", "2", "3"] {
            admit_and_apply(&mut account, &txn(id, "528", 100.0, (2000, 5, 1)));
        }
        expect_rejection(admit_and_apply(&mut account, &txn("4", "528", 100.0, (2000, 5, 1))));

        let next_day = txn("5", "528", 100.0, (2000, 5, 2));
        assert!(matches!(
            admit_and_apply(&mut account, &next_day),
            Admission::Accepted(_)
        ));
    }

    #[test]
    fn test_sixth_deposit_in_iso_week_exceeds_weekly_count() {
        let limits = AccountLimits {
            daily_amount: 0.0,
            daily_count: 0,
            weekly_amount: 0.0,
            weekly_count: 5,
        };
        let mut account = Account::new("528", limits).unwrap();

        // 2000-05-01 is a Monday; six deposits Monday through Saturday.
        for (id, day) in [("1", 1), ("2", 2), ("3", 3), ("4", 4), ("5", 5)] {
            let deposit = txn(id, "528", 100.0, (2000, 5, day));
            assert!(matches!(
                admit_and_apply(&mut account, &deposit),
                Admission::Accepted(_)
            ));
        }

        let sixth = txn("6", "528", 100.0, (2000, 5, 6));
        let failure = expect_rejection(admit_and_apply(&mut account, &sixth));
        assert_eq!(failure.failure_cause, FailureCause::WeeklyLimitsExceeded);

        // The next Monday starts a new ISO week.
        let next_week = txn("7", "528", 100.0, (2000, 5, 8));
        assert!(matches!(
            admit_and_apply(&mut account, &next_week),
            Admission::Accepted(_)
        ));
    }

    #[test]
    fn test_weekly_amount_failure_quotes_weekly_limit() {
        let limits = AccountLimits {
            daily_amount: 5000.0,
            daily_count: 0,
            weekly_amount: 6000.0,
            weekly_count: 0,
        };
        let mut account = Account::new("528", limits).unwrap();

        admit_and_apply(&mut account, &txn("1", "528", 4000.0, (2000, 5, 1)));

        // Passes the daily check (3000 < 5000) but breaches the weekly
        // amount by exactly 1000.
        let second = txn("2", "528", 3000.0, (2000, 5, 2));
        let failure = expect_rejection(admit_and_apply(&mut account, &second));
        assert_eq!(failure.failure_cause, FailureCause::WeeklyLimitsExceeded);
        assert!(failure.error.contains("failed weekly-limits validation"));
        assert!(failure.error.contains("amount limit exceeded by $1000.00"));
    }

    #[test]
    fn test_disabled_limits_accept_unbounded_volume() {
        let limits = AccountLimits {
            daily_amount: 0.0,
            daily_count: 0,
            weekly_amount: 0.0,
            weekly_count: 0,
        };
        let mut account = Account::new("528", limits).unwrap();

        for i in 0..100 {
            let deposit = txn(&i.to_string(), "528", 100.0, (2000, 5, 1));
            assert!(matches!(
                admit_and_apply(&mut account, &deposit),
                Admission::Accepted(_)
            ));
        }
        assert!((account.balance() - 10_000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_weekly_bucket_spans_civil_year_boundary() {
        let limits = AccountLimits {
            daily_amount: 0.0,
            daily_count: 0,
            weekly_amount: 0.0,
            weekly_count: 2,
        };
        let mut account = Account::new("528", limits).unwrap();

        // 1999-12-27 through 2000-01-02 are all ISO week 1999-W52.
        admit_and_apply(&mut account, &txn("1", "528", 100.0, (1999, 12, 27)));
        admit_and_apply(&mut account, &txn("2", "528", 100.0, (1999, 12, 29)));

        let third = txn("3", "528", 100.0, (2000, 1, 1));
        let failure = expect_rejection(admit_and_apply(&mut account, &third));
        assert_eq!(failure.failure_cause, FailureCause::WeeklyLimitsExceeded);
    }

    #[test]
    fn test_withdrawal_beyond_balance_is_rejected() {
        let mut account = Account::new("528", default_limits()).unwrap();
        admit_and_apply(&mut account, &txn("1", "528", 100.0, (2000, 5, 1)));

        let overdraw = txn("2", "528", -150.0, (2000, 5, 2));
        let failure = expect_rejection(admit_and_apply(&mut account, &overdraw));
        assert_eq!(failure.failure_cause, FailureCause::InsufficientFunds);
    }

    #[test]
    fn test_replay_restores_balance_and_duplicate_record() {
        let mut original = Account::new("528", default_limits()).unwrap();
        let mut events = Vec::new();
        for (id, amount) in [("1", 1000.0), ("2", 500.0)] {
            let deposit = txn(id, "528", amount, (2000, 5, 1));
            let Admission::Accepted(state) = admit_and_apply(&mut original, &deposit) else {
                panic!("seed deposit must be accepted");
            };
            events.push(
                Event::new(EventAction::AccountDeposited, "528", &state).unwrap(),
            );
        }

        let mut rebuilt = Account::new("528", default_limits()).unwrap();
        rebuilt.replay(&events).unwrap();

        assert!((rebuilt.balance() - 1500.0).abs() < f64::EPSILON);
        let duplicate = txn("1", "528", 10.0, (2000, 5, 2));
        assert_eq!(
            expect_rejection(rebuilt.admit(&duplicate)).failure_cause,
            FailureCause::DuplicateTxn
        );
    }

    #[test]
    fn test_replay_skips_rejection_events() {
        let mut seeded = Account::new("528", default_limits()).unwrap();
        let deposit = txn("1", "528", 1000.0, (2000, 5, 1));
        let Admission::Accepted(state) = admit_and_apply(&mut seeded, &deposit) else {
            panic!("seed deposit must be accepted");
        };

        let failure = TxnFailure {
            txn: txn("2", "528", -9999.0, (2000, 5, 1)),
            error: "failed daily-limits validation: balance less than zero".to_owned(),
            failure_cause: FailureCause::InsufficientFunds,
        };
        let events = vec![
            Event::new(EventAction::AccountDeposited, "528", &state).unwrap(),
            Event::new(EventAction::AccountLimitExceeded, "528", &failure).unwrap(),
        ];

        let mut rebuilt = Account::new("528", default_limits()).unwrap();
        rebuilt.replay(&events).unwrap();

        // The rejection neither moved the balance nor recorded the id.
        assert!((rebuilt.balance() - 1000.0).abs() < f64::EPSILON);
        let retried = txn("2", "528", 100.0, (2000, 5, 2));
        assert!(matches!(rebuilt.admit(&retried), Admission::Accepted(_)));
    }

    #[test]
    fn test_replay_rejects_foreign_actions() {
        let stray = Event::from_bytes(EventAction::TxnCreated, "528", b"{}".to_vec()).unwrap();
        let mut account = Account::new("528", default_limits()).unwrap();

        let result = account.replay(&[stray]);
        assert!(matches!(result, Err(DomainError::Validation(_))));
    }

    #[test]
    fn test_limit_configuration_is_validated() {
        assert!(
            Account::new(
                "x",
                AccountLimits {
                    daily_amount: 200.0,
                    daily_count: 0,
                    weekly_amount: 100.0,
                    weekly_count: 0,
                }
            )
            .is_err()
        );
        assert!(
            Account::new(
                "x",
                AccountLimits {
                    daily_amount: 0.0,
                    daily_count: 3,
                    weekly_amount: 0.0,
                    weekly_count: 2,
                }
            )
            .is_err()
        );
        assert!(
            Account::new(
                "x",
                AccountLimits {
                    daily_amount: -1.0,
                    daily_count: 0,
                    weekly_amount: 0.0,
                    weekly_count: 0,
                }
            )
            .is_err()
        );
        // A disabled weekly axis never conflicts with the daily one.
        assert!(
            Account::new(
                "x",
                AccountLimits {
                    daily_amount: 5000.0,
                    daily_count: 3,
                    weekly_amount: 0.0,
                    weekly_count: 0,
                }
            )
            .is_ok()
        );
    }
}
