//! tatrader: technical-analysis strategy backtester.
//!
//! Pure logic lives in [`domain`], I/O seams are the traits in [`ports`], and
//! [`adapters`] implement them for INI configs, CSV histories, JSON strategy
//! descriptions and CSV trade reports.

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod ports;
