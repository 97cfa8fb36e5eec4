//! Ledger error taxonomy
//!
//! Every variant is caller-recoverable. An operation that returns an error
//! has left the ledger and every position exactly as it found them.

use thiserror::Error;

use crate::state::Owner;

pub type Result<T> = std::result::Result<T, LedgerError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("amount must be a positive, finite quantity")]
    InvalidAmount,

    #[error("requested {requested} exceeds available balance {available}")]
    InsufficientBalance { requested: u128, available: u128 },

    #[error("operation would leave the position below the minimum collateral ratio")]
    BelowMinCollateralRatio,

    #[error("position is not eligible for liquidation")]
    NotLiquidatable,

    #[error("protocol revenue {revenue} does not exceed buyback threshold {threshold}")]
    InsufficientRevenue { revenue: u128, threshold: u128 },

    #[error("no position exists for owner {0}")]
    UnknownPosition(Owner),

    #[error("requested {requested} exceeds position collateral {collateral}")]
    InsufficientCollateral { requested: u128, collateral: u128 },

    #[error("repayment {requested} exceeds outstanding debt {debt}")]
    ExceedsDebt { requested: u128, debt: u128 },

    #[error("price source returned a zero price")]
    InvalidPrice,

    #[error("invalid protocol parameter: {0}")]
    InvalidParams(&'static str),

    #[error("external source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("arithmetic overflow")]
    ArithmeticOverflow,
}

/// Lift an `Option` from the checked math helpers into a ledger error
pub(crate) trait OrOverflow<T> {
    fn or_overflow(self) -> Result<T>;
}

impl<T> OrOverflow<T> for Option<T> {
    fn or_overflow(self) -> Result<T> {
        self.ok_or(LedgerError::ArithmeticOverflow)
    }
}
