//! One bar's view of a single asset's trading: the open position, the
//! position closed on this bar (if any) and the current market mark.

use crate::domain::error::TradeError;
use crate::domain::trade_position::TradePosition;
use crate::domain::trade_record::{TradeRecord, TradeStatus};

/// An order that opens or adds to a position. `position_size` is signed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TradeEntry {
    pub position_size: f64,
    pub price: f64,
    pub stop_loss_price: f64,
    pub stop_loss_trailing: bool,
    pub take_profit_price: f64,
}

impl TradeEntry {
    /// Starting trailing stop: the initial stop when trailing, NaN otherwise.
    pub fn stop_loss_trailing_price(&self) -> f64 {
        if self.stop_loss_trailing {
            self.stop_loss_price
        } else {
            f64::NAN
        }
    }

    pub fn is_long(&self) -> bool {
        self.position_size > 0.0
    }

    pub fn is_short(&self) -> bool {
        self.position_size < 0.0
    }

    pub fn is_buy(&self) -> bool {
        self.is_long()
    }

    pub fn is_sell(&self) -> bool {
        self.is_short()
    }

    pub fn notional_value(&self) -> f64 {
        (self.position_size * self.price).abs()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    Signal,
    StopLoss,
    TakeProfit,
}

impl ExitReason {
    pub fn status(self) -> TradeStatus {
        match self {
            ExitReason::Signal => TradeStatus::ClosedExitSignal,
            ExitReason::StopLoss => TradeStatus::ClosedStopLoss,
            ExitReason::TakeProfit => TradeStatus::ClosedTakeProfit,
        }
    }
}

/// An order that reduces a position. `position_size` has the sign of the
/// position being reduced, so closing a long is a sell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TradeExit {
    pub position_size: f64,
    pub price: f64,
    pub reason: ExitReason,
}

impl TradeExit {
    pub fn is_long(&self) -> bool {
        self.position_size > 0.0
    }

    pub fn is_short(&self) -> bool {
        self.position_size < 0.0
    }

    pub fn is_buy(&self) -> bool {
        self.is_short()
    }

    pub fn is_sell(&self) -> bool {
        self.is_long()
    }

    pub fn notional_value(&self) -> f64 {
        (self.position_size * self.price).abs()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TradeSession {
    market_timestamp: i64,
    market_price: f64,
    market_index: usize,
    open_position: Option<TradePosition>,
    closed_position: Option<TradePosition>,
}

impl Default for TradeSession {
    fn default() -> Self {
        TradeSession {
            market_timestamp: 0,
            market_price: f64::NAN,
            market_index: 0,
            open_position: None,
            closed_position: None,
        }
    }
}

impl TradeSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn market_timestamp(&self) -> i64 {
        self.market_timestamp
    }

    pub fn market_price(&self) -> f64 {
        self.market_price
    }

    pub fn market_index(&self) -> usize {
        self.market_index
    }

    pub fn open_position(&self) -> Option<&TradePosition> {
        self.open_position.as_ref()
    }

    pub fn closed_position(&self) -> Option<&TradePosition> {
        self.closed_position.as_ref()
    }

    /// Move to a new bar. The position closed on the previous bar is dropped.
    /// An undefined price keeps the last defined mark.
    pub fn market_update(&mut self, timestamp: i64, price: f64, index: usize) {
        self.market_timestamp = timestamp;
        if price.is_finite() {
            self.market_price = price;
        }
        self.market_index = index;
        self.closed_position = None;
    }

    /// Open a position, or scale into the one already open.
    pub fn entry_position(&mut self, entry: &TradeEntry, fee: f64) -> Result<(), TradeError> {
        match self.open_position.as_mut() {
            Some(position) => {
                position.scaled_in(entry.position_size, entry.price)?;
                position.charge_entry_fee(fee);
            }
            None => {
                let mut position = TradePosition::new(
                    entry.position_size,
                    self.market_timestamp,
                    entry.price,
                    self.market_index,
                    entry.stop_loss_price,
                    entry.stop_loss_trailing_price(),
                    entry.take_profit_price,
                )?;
                position.charge_entry_fee(fee);
                self.open_position = Some(position);
            }
        }
        Ok(())
    }

    pub fn exit_position(&mut self, exit: &TradeExit, fee: f64) -> Result<TradeRecord, TradeError> {
        let position = self
            .open_position
            .as_mut()
            .ok_or(TradeError::NoOpenPosition)?;

        let record = position.scaled_out(
            exit.position_size,
            self.market_timestamp,
            exit.price,
            self.market_index,
            exit.reason.status(),
            fee,
        )?;

        if position.is_closed() {
            self.closed_position = self.open_position.take();
        }
        Ok(record)
    }

    /// Check the open position's stop, then its target, and return the
    /// exit the first triggered one calls for. Fill prices account for a
    /// bar that gaps through the level.
    pub fn evaluate_exit_conditions(
        &mut self,
        prev_close: f64,
        open: f64,
        high: f64,
        low: f64,
    ) -> Option<TradeExit> {
        let position = self.open_position.as_mut()?;
        let size = position.position_size();

        if position.trigger_stop_loss(prev_close, high, low) {
            let stop = position.stop_loss_price();
            let price = if position.is_long() {
                open.min(stop)
            } else {
                open.max(stop)
            };
            return Some(TradeExit {
                position_size: size,
                price,
                reason: ExitReason::StopLoss,
            });
        }

        if position.trigger_take_profit(high, low) {
            let target = position.take_profit_price();
            let price = if position.is_long() {
                open.max(target)
            } else {
                open.min(target)
            };
            return Some(TradeExit {
                position_size: size,
                price,
                reason: ExitReason::TakeProfit,
            });
        }

        None
    }

    pub fn unrealized_pnl(&self) -> f64 {
        self.open_position
            .as_ref()
            .map_or(0.0, |p| p.unrealized_pnl(self.market_price))
    }

    /// Realized profit of slices already closed out of the open position.
    pub fn partial_realized_pnl(&self) -> f64 {
        self.open_position.as_ref().map_or(0.0, TradePosition::realized_pnl)
    }

    pub fn unrealized_investment(&self) -> f64 {
        self.open_position
            .as_ref()
            .map_or(0.0, TradePosition::unrealized_investment)
    }

    pub fn unrealized_duration(&self) -> i64 {
        self.open_position
            .as_ref()
            .map_or(0, |p| p.unrealized_duration(self.market_timestamp))
    }

    pub fn realized_pnl(&self) -> f64 {
        self.closed_position.as_ref().map_or(0.0, TradePosition::realized_pnl)
    }

    pub fn realized_investment(&self) -> f64 {
        self.closed_position
            .as_ref()
            .map_or(0.0, TradePosition::realized_investment)
    }

    pub fn realized_duration(&self) -> i64 {
        self.closed_position
            .as_ref()
            .map_or(0, TradePosition::realized_duration)
    }

    pub fn is_flat(&self) -> bool {
        self.open_position.is_none() && self.closed_position.is_none()
    }

    pub fn is_open(&self) -> bool {
        self.open_position.is_some()
    }

    /// A position closed on this bar and nothing is open.
    pub fn is_closed(&self) -> bool {
        !self.is_open() && self.closed_position.is_some()
    }

    /// A position closed on this bar and another was opened.
    pub fn is_reopen(&self) -> bool {
        self.open_position.is_some() && self.closed_position.is_some()
    }

    /// Closed-position slices, then the open position's realized slices,
    /// then the open remainder marked at the market price.
    pub fn trade_records(&self) -> Vec<TradeRecord> {
        let mut records: Vec<TradeRecord> = self
            .closed_position
            .iter()
            .chain(self.open_position.iter())
            .flat_map(|p| p.realized_records().iter().cloned())
            .collect();

        if let Some(position) = &self.open_position {
            records.push(TradeRecord {
                status: TradeStatus::Open,
                position_size: position.position_size(),
                average_price: position.average_price(),
                entry_timestamp: position.entry_timestamp(),
                entry_price: position.entry_price(),
                entry_index: position.entry_index(),
                exit_timestamp: self.market_timestamp,
                exit_price: self.market_price,
                exit_index: self.market_index,
                stop_loss_price: position.stop_loss_initial_price(),
                trailing_stop_price: position.stop_loss_trailing_price(),
                take_profit_price: position.take_profit_price(),
                fee: position.unallocated_fee(),
            });
        }
        records
    }
}
