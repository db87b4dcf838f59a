//! Loan policy configuration
//!
//! The loan period, the per-member open-loan ceiling and the daily fine rate
//! are library policy rather than data, so they travel with the evaluator as
//! a single configuration value.

use chrono::TimeDelta;
use rust_decimal::Decimal;

/// Default loan period in days
pub const DEFAULT_LOAN_PERIOD_DAYS: u32 = 14;

/// Default ceiling on concurrently open loans per member
pub const DEFAULT_MAX_OPEN_LOANS: u32 = 5;

/// Loan policy applied by the evaluator
#[derive(Debug, Clone, PartialEq)]
pub struct LoanPolicy {
    /// Days between borrowing and the due date
    pub loan_period_days: u32,

    /// Maximum number of open loans per member; `None` means unlimited
    pub max_open_loans: Option<u32>,

    /// Fine accrued per started day past the due date
    pub daily_fine: Decimal,
}

impl Default for LoanPolicy {
    fn default() -> Self {
        Self {
            loan_period_days: DEFAULT_LOAN_PERIOD_DAYS,
            max_open_loans: Some(DEFAULT_MAX_OPEN_LOANS),
            daily_fine: Decimal::new(50, 2),
        }
    }
}

impl LoanPolicy {
    /// Create a policy with custom values
    ///
    /// A zero loan period or a negative fine falls back to the default with a
    /// warning. A zero loan limit means "unlimited".
    pub fn new(loan_period_days: u32, max_open_loans: u32, daily_fine: Decimal) -> Self {
        let default = Self::default();

        let loan_period_days = if loan_period_days == 0 {
            tracing::warn!(
                loan_period_days,
                default = default.loan_period_days,
                "Invalid loan period, using default"
            );
            default.loan_period_days
        } else {
            loan_period_days
        };

        let max_open_loans = (max_open_loans > 0).then_some(max_open_loans);

        let daily_fine = if daily_fine.is_sign_negative() {
            tracing::warn!(%daily_fine, default = %default.daily_fine, "Invalid daily fine, using default");
            default.daily_fine
        } else {
            daily_fine
        };

        Self {
            loan_period_days,
            max_open_loans,
            daily_fine,
        }
    }

    /// The loan period as a duration
    pub fn loan_period(&self) -> TimeDelta {
        TimeDelta::days(i64::from(self.loan_period_days))
    }
}
