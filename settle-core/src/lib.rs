//! Settle Core
//!
//! Balance accounting and debt settlement for shared-expense groups.
//!
//! # Pipeline
//!
//! 1. **Accrual**: payers are credited, split participants are debited
//! 2. **Adjustment**: completed settlements move money back between members
//! 3. **Partition**: balances are rounded to cents and split into debtors and creditors
//! 4. **Matching**: largest debtor pays largest creditor until one side is exhausted
//!
//! # Invariants
//!
//! - Money conservation: transfers never move more than a debtor owes
//! - Determinism: the same ledger in any order yields the same transfers
//! - Positivity: every emitted transfer carries a strictly positive amount
//! - Statelessness: balances are rebuilt from scratch on every call
//!
//! # Example
//!
//! ```
//! use rust_decimal::Decimal;
//! use settle_core::{optimize, Expense, Split, UserId};
//!
//! let alice = UserId::new("alice");
//! let bob = UserId::new("bob");
//! let dinner = Expense::new(
//!     alice.clone(),
//!     Decimal::new(10000, 2),
//!     vec![
//!         Split::new(alice.clone(), Decimal::new(5000, 2)),
//!         Split::new(bob.clone(), Decimal::new(5000, 2)),
//!     ],
//! );
//!
//! let transfers = optimize(&[dinner], &[]);
//! assert_eq!(transfers.len(), 1);
//! assert_eq!(transfers[0].from, bob);
//! assert_eq!(transfers[0].to, alice);
//! ```

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod types;
pub mod rounding;
pub mod balance;
pub mod optimizer;
pub mod split;
pub mod error;

// Re-exports
pub use error::{Error, Result};
pub use types::{Expense, Position, Settlement, SettlementStatus, Split, Transfer, UserId};
pub use balance::BalanceSheet;
pub use optimizer::{optimize, SettlementOptimizer};
pub use rounding::{is_settled, round_currency, MAX_AMOUNT, SETTLED_THRESHOLD};
pub use split::{equal_split, SplitKind};
