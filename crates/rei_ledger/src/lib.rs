//! REI protocol position ledger
//!
//! Collateral/debt accounting, stability fee accrual, liquidation and
//! treasury buyback for a synthetic index token. Pure Rust, no I/O, no
//! unwrap/panic: every operation either commits fully or returns an error
//! with state untouched.

pub mod error;
pub mod fees;
pub mod helpers;
pub mod liquidation;
pub mod math;
pub mod position;
pub mod sources;
pub mod state;
pub mod treasury;

// Re-export commonly used types
pub use error::{LedgerError, Result};
pub use fees::{AccrualReport, FeeAccrualEngine};
pub use liquidation::{Health, LiquidationReceipt};
pub use math::{Amount, Price, Timestamp, AMOUNT_SCALE};
pub use position::{BurnReceipt, DepositReceipt, MintReceipt, PositionView, WithdrawReceipt};
pub use sources::*;
pub use state::*;
pub use treasury::BuybackReceipt;
