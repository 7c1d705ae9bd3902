//! Carbon accounting and offset allocation engine.
//!
//! Converts recorded activity data into GHG-Protocol-classified emissions,
//! keeps an append-only ledger of footprints and offset purchases, derives
//! the carbon balance from it on demand, and recommends offset portfolios
//! to close the remaining gap.

pub mod balance;
pub mod catalog;
pub mod error;
pub mod factors;
pub mod footprint;
pub mod import;
pub mod ledger;
pub mod models;
pub mod recommend;
pub mod sync;
pub mod units;

pub use error::{DegradedModeWarning, EngineError, Result};
