//! Core domain types and logic.

pub mod backtest;
pub mod config_validation;
pub mod error;
pub mod execution;
pub mod filter;
pub mod history;
pub mod method;
pub mod registry;
pub mod series;
pub mod strategy;
pub mod summary;
pub mod trade_position;
pub mod trade_record;
pub mod trade_session;
