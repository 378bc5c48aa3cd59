//! Outcome of one trade slice, closed or still open.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeStatus {
    Open,
    ClosedExitSignal,
    ClosedTakeProfit,
    ClosedStopLoss,
}

impl TradeStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TradeStatus::Open => "open",
            TradeStatus::ClosedExitSignal => "closed_exit_signal",
            TradeStatus::ClosedTakeProfit => "closed_take_profit",
            TradeStatus::ClosedStopLoss => "closed_stop_loss",
        }
    }
}

impl std::fmt::Display for TradeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A realized (or marked-to-market) slice of a position.
///
/// `position_size` is signed: positive for long, negative for short. Values
/// derived from it (`investment`, `exit_value`) carry the same sign, so
/// `pnl` is correct for both directions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TradeRecord {
    pub status: TradeStatus,
    pub position_size: f64,
    pub average_price: f64,
    pub entry_timestamp: i64,
    pub entry_price: f64,
    pub entry_index: usize,
    pub exit_timestamp: i64,
    pub exit_price: f64,
    pub exit_index: usize,
    pub stop_loss_price: f64,
    pub trailing_stop_price: f64,
    pub take_profit_price: f64,
    pub fee: f64,
}

impl TradeRecord {
    pub fn entry_value(&self) -> f64 {
        self.position_size * self.entry_price
    }

    pub fn exit_value(&self) -> f64 {
        self.position_size * self.exit_price
    }

    pub fn investment(&self) -> f64 {
        self.position_size * self.average_price
    }

    /// Net of fees.
    pub fn pnl(&self) -> f64 {
        self.exit_value() - self.investment() - self.fee
    }

    /// Profit relative to the capital committed, in percent.
    pub fn percent(&self) -> f64 {
        let investment = self.investment().abs();
        if investment == 0.0 {
            0.0
        } else {
            self.pnl() / investment * 100.0
        }
    }

    /// Seconds between entry and exit.
    pub fn duration(&self) -> i64 {
        self.exit_timestamp - self.entry_timestamp
    }

    pub fn is_long(&self) -> bool {
        self.position_size > 0.0
    }

    pub fn is_short(&self) -> bool {
        self.position_size < 0.0
    }

    pub fn is_open(&self) -> bool {
        self.status == TradeStatus::Open
    }

    pub fn is_closed(&self) -> bool {
        !self.is_open()
    }

    pub fn is_closed_exit_signal(&self) -> bool {
        self.status == TradeStatus::ClosedExitSignal
    }

    pub fn is_closed_take_profit(&self) -> bool {
        self.status == TradeStatus::ClosedTakeProfit
    }

    pub fn is_closed_stop_loss(&self) -> bool {
        self.status == TradeStatus::ClosedStopLoss
    }
}
