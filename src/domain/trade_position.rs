//! Position lifecycle: open, scale in, scale out, stop-loss and take-profit.
//!
//! The sign of `position_size` encodes direction. A position is closed once
//! its size reaches zero; closed positions reject further scaling.

use crate::domain::error::TradeError;
use crate::domain::trade_record::{TradeRecord, TradeStatus};

#[derive(Debug, Clone, PartialEq)]
pub struct TradePosition {
    position_size: f64,
    average_price: f64,
    entry_price: f64,
    entry_timestamp: i64,
    entry_index: usize,
    stop_loss_initial_price: f64,
    stop_loss_trailing_price: f64,
    take_profit_price: f64,
    unallocated_fee: f64,
    realized_records: Vec<TradeRecord>,
}

impl TradePosition {
    /// Open a position. A NaN stop or target disables it; a NaN trailing
    /// price disables trailing.
    pub fn new(
        position_size: f64,
        entry_timestamp: i64,
        entry_price: f64,
        entry_index: usize,
        stop_loss_initial_price: f64,
        stop_loss_trailing_price: f64,
        take_profit_price: f64,
    ) -> Result<Self, TradeError> {
        if position_size == 0.0 || position_size.is_nan() {
            return Err(TradeError::InvalidSize {
                size: position_size,
            });
        }
        Ok(TradePosition {
            position_size,
            average_price: entry_price,
            entry_price,
            entry_timestamp,
            entry_index,
            stop_loss_initial_price,
            stop_loss_trailing_price,
            take_profit_price,
            unallocated_fee: 0.0,
            realized_records: Vec::new(),
        })
    }

    pub fn position_size(&self) -> f64 {
        self.position_size
    }

    pub fn average_price(&self) -> f64 {
        self.average_price
    }

    pub fn entry_price(&self) -> f64 {
        self.entry_price
    }

    pub fn entry_timestamp(&self) -> i64 {
        self.entry_timestamp
    }

    pub fn entry_index(&self) -> usize {
        self.entry_index
    }

    pub fn stop_loss_initial_price(&self) -> f64 {
        self.stop_loss_initial_price
    }

    pub fn stop_loss_trailing_price(&self) -> f64 {
        self.stop_loss_trailing_price
    }

    pub fn take_profit_price(&self) -> f64 {
        self.take_profit_price
    }

    /// The trailing stop when one is set, otherwise the initial stop.
    pub fn stop_loss_price(&self) -> f64 {
        if self.stop_loss_trailing_price.is_nan() {
            self.stop_loss_initial_price
        } else {
            self.stop_loss_trailing_price
        }
    }

    pub fn realized_records(&self) -> &[TradeRecord] {
        &self.realized_records
    }

    /// Entry fees not yet assigned to a realized slice.
    pub fn unallocated_fee(&self) -> f64 {
        self.unallocated_fee
    }

    pub fn is_closed(&self) -> bool {
        self.position_size == 0.0
    }

    pub fn is_long(&self) -> bool {
        self.position_size > 0.0
    }

    pub fn is_short(&self) -> bool {
        self.position_size < 0.0
    }

    /// Record a fee paid on entry; it is charged to exit slices pro rata.
    pub fn charge_entry_fee(&mut self, fee: f64) {
        if fee.is_finite() {
            self.unallocated_fee += fee;
        }
    }

    /// Capital committed to the open size.
    pub fn unrealized_investment(&self) -> f64 {
        (self.position_size * self.average_price).abs()
    }

    /// Open size marked at `market_price`, net of entry fees not yet realized.
    pub fn unrealized_pnl(&self, market_price: f64) -> f64 {
        if self.is_closed() {
            return 0.0;
        }
        self.position_size * (market_price - self.average_price) - self.unallocated_fee
    }

    pub fn unrealized_duration(&self, market_timestamp: i64) -> i64 {
        market_timestamp - self.entry_timestamp
    }

    pub fn realized_position_size(&self) -> f64 {
        self.realized_records.iter().map(|r| r.position_size).sum()
    }

    pub fn realized_investment(&self) -> f64 {
        self.realized_records.iter().map(|r| r.investment().abs()).sum()
    }

    pub fn realized_pnl(&self) -> f64 {
        self.realized_records.iter().map(TradeRecord::pnl).sum()
    }

    pub fn realized_duration(&self) -> i64 {
        self.realized_records.iter().map(TradeRecord::duration).sum()
    }

    /// Add to the position and recompute the volume-weighted average price.
    /// Entry price, time and index keep their first-entry values.
    pub fn scaled_in(&mut self, size: f64, price: f64) -> Result<(), TradeError> {
        if self.is_closed() {
            return Err(TradeError::PositionClosed);
        }
        if size == 0.0 || size.is_nan() {
            return Err(TradeError::InvalidSize { size });
        }
        if size.signum() != self.position_size.signum() {
            return Err(TradeError::DirectionMismatch { size });
        }

        let investment = self.position_size * self.average_price + size * price;
        self.position_size += size;
        self.average_price = investment / self.position_size;
        Ok(())
    }

    /// Close `size` (same sign as the position) at `price` and return the
    /// realized slice. Sizes beyond the open size are clamped to it.
    pub fn scaled_out(
        &mut self,
        size: f64,
        timestamp: i64,
        price: f64,
        index: usize,
        status: TradeStatus,
        exit_fee: f64,
    ) -> Result<TradeRecord, TradeError> {
        if self.is_closed() {
            return Err(TradeError::PositionClosed);
        }
        if size == 0.0 || size.is_nan() {
            return Err(TradeError::InvalidSize { size });
        }
        if size.signum() != self.position_size.signum() {
            return Err(TradeError::DirectionMismatch { size });
        }

        let mut size = size;
        if size.abs() > self.position_size.abs() {
            tracing::warn!(
                requested = size,
                open = self.position_size,
                "scale-out exceeds open size; clamping"
            );
            size = self.position_size;
        }

        let share = size / self.position_size;
        let entry_fee = self.unallocated_fee * share;
        self.unallocated_fee -= entry_fee;

        let record = TradeRecord {
            status,
            position_size: size,
            average_price: self.average_price,
            entry_timestamp: self.entry_timestamp,
            entry_price: self.entry_price,
            entry_index: self.entry_index,
            exit_timestamp: timestamp,
            exit_price: price,
            exit_index: index,
            stop_loss_price: self.stop_loss_initial_price,
            trailing_stop_price: self.stop_loss_trailing_price,
            take_profit_price: self.take_profit_price,
            fee: entry_fee + if exit_fee.is_finite() { exit_fee } else { 0.0 },
        };

        self.position_size -= size;
        if self.is_closed() {
            self.unallocated_fee = 0.0;
        }
        self.realized_records.push(record.clone());
        Ok(record)
    }

    /// Ratchet the trailing stop using `prev_close`, then report whether the
    /// bar's range reached the effective stop.
    ///
    /// The trailing candidate keeps the initial risk distance behind the
    /// previous close: `prev_close - (average_price - initial_stop)`.
    pub fn trigger_stop_loss(&mut self, prev_close: f64, high: f64, low: f64) -> bool {
        if self.is_closed() || self.stop_loss_initial_price.is_nan() {
            return false;
        }

        let risk = self.average_price - self.stop_loss_initial_price;
        let candidate = prev_close - risk;

        if self.is_short() {
            if candidate < self.stop_loss_trailing_price {
                self.stop_loss_trailing_price = candidate;
            }
            return high >= self.stop_loss_price();
        }

        if candidate > self.stop_loss_trailing_price {
            self.stop_loss_trailing_price = candidate;
        }
        low <= self.stop_loss_price()
    }

    pub fn trigger_take_profit(&self, high: f64, low: f64) -> bool {
        if self.is_closed() || self.take_profit_price.is_nan() {
            return false;
        }
        if self.is_long() {
            high >= self.take_profit_price
        } else {
            low <= self.take_profit_price
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn long_position() -> TradePosition {
        TradePosition::new(10.0, 0, 100.0, 0, 95.0, f64::NAN, 108.0).unwrap()
    }

    fn short_position() -> TradePosition {
        TradePosition::new(-10.0, 0, 100.0, 0, 105.0, f64::NAN, 92.0).unwrap()
    }

    #[test]
    fn open_rejects_zero_and_nan() {
        assert!(matches!(
            TradePosition::new(0.0, 0, 1.0, 0, f64::NAN, f64::NAN, f64::NAN),
            Err(TradeError::InvalidSize { .. })
        ));
        assert!(TradePosition::new(f64::NAN, 0, 1.0, 0, f64::NAN, f64::NAN, f64::NAN).is_err());
    }

    #[test]
    fn scale_in_averages_price() {
        let mut pos = long_position();
        pos.scaled_in(10.0, 110.0).unwrap();
        assert!((pos.position_size() - 20.0).abs() < f64::EPSILON);
        assert!((pos.average_price() - 105.0).abs() < f64::EPSILON);
        assert!((pos.entry_price() - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn scale_in_against_direction_rejected() {
        let mut pos = long_position();
        assert_eq!(
            pos.scaled_in(-5.0, 100.0),
            Err(TradeError::DirectionMismatch { size: -5.0 })
        );
        assert!(matches!(pos.scaled_in(0.0, 100.0), Err(TradeError::InvalidSize { .. })));
    }

    #[test]
    fn partial_then_full_scale_out() {
        let mut pos = long_position();
        let first = pos
            .scaled_out(4.0, 86_400, 110.0, 1, TradeStatus::ClosedExitSignal, 0.0)
            .unwrap();
        assert!((first.pnl() - 40.0).abs() < 1e-9);
        assert!(!pos.is_closed());
        assert!((pos.position_size() - 6.0).abs() < f64::EPSILON);

        pos.scaled_out(6.0, 2 * 86_400, 90.0, 2, TradeStatus::ClosedStopLoss, 0.0)
            .unwrap();
        assert!(pos.is_closed());
        assert_eq!(pos.realized_records().len(), 2);
        assert!((pos.realized_pnl() - (40.0 - 60.0)).abs() < 1e-9);
        assert!((pos.realized_investment() - 1000.0).abs() < 1e-9);
        assert_eq!(pos.realized_duration(), 3 * 86_400);
        assert!((pos.realized_position_size() - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn scale_out_overshoot_clamps() {
        let mut pos = long_position();
        let record = pos
            .scaled_out(25.0, 0, 100.0, 1, TradeStatus::ClosedExitSignal, 0.0)
            .unwrap();
        assert!((record.position_size - 10.0).abs() < f64::EPSILON);
        assert!(pos.is_closed());
    }

    #[test]
    fn closed_position_rejects_scaling() {
        let mut pos = long_position();
        pos.scaled_out(10.0, 0, 100.0, 1, TradeStatus::ClosedExitSignal, 0.0)
            .unwrap();
        assert_eq!(pos.scaled_in(1.0, 100.0), Err(TradeError::PositionClosed));
        assert_eq!(
            pos.scaled_out(1.0, 0, 100.0, 2, TradeStatus::ClosedExitSignal, 0.0),
            Err(TradeError::PositionClosed)
        );
        assert!(!pos.trigger_stop_loss(100.0, 200.0, 0.0));
        assert!(!pos.trigger_take_profit(200.0, 0.0));
    }

    #[test]
    fn entry_fee_allocated_pro_rata() {
        let mut pos = long_position();
        pos.charge_entry_fee(10.0);
        assert!((pos.unrealized_pnl(100.0) + 10.0).abs() < f64::EPSILON);
        let first = pos
            .scaled_out(5.0, 0, 100.0, 1, TradeStatus::ClosedExitSignal, 1.0)
            .unwrap();
        assert!((first.fee - 6.0).abs() < 1e-9);
        assert!((pos.unallocated_fee() - 5.0).abs() < 1e-9);
        let second = pos
            .scaled_out(5.0, 0, 100.0, 1, TradeStatus::ClosedExitSignal, 0.0)
            .unwrap();
        assert!((second.fee - 5.0).abs() < 1e-9);
        assert!((pos.realized_pnl() + 11.0).abs() < 1e-9);
    }

    #[test]
    fn long_stop_and_target() {
        let mut pos = long_position();
        assert!(!pos.trigger_stop_loss(100.0, 101.0, 96.0));
        assert!(pos.trigger_stop_loss(100.0, 101.0, 95.0));
        assert!(!pos.trigger_take_profit(107.9, 100.0));
        assert!(pos.trigger_take_profit(108.0, 100.0));
    }

    #[test]
    fn short_stop_and_target() {
        let mut pos = short_position();
        assert!(!pos.trigger_stop_loss(100.0, 104.0, 99.0));
        assert!(pos.trigger_stop_loss(100.0, 105.0, 99.0));
        assert!(!pos.trigger_take_profit(100.0, 92.1));
        assert!(pos.trigger_take_profit(100.0, 92.0));
    }

    #[test]
    fn disabled_stop_and_target_never_trigger() {
        let mut pos = TradePosition::new(1.0, 0, 100.0, 0, f64::NAN, f64::NAN, f64::NAN).unwrap();
        assert!(!pos.trigger_stop_loss(100.0, 1000.0, 0.0));
        assert!(!pos.trigger_take_profit(1000.0, 0.0));
        assert!(pos.stop_loss_price().is_nan());
    }

    #[test]
    fn fixed_stop_does_not_trail() {
        let mut pos = long_position();
        assert!(!pos.trigger_stop_loss(120.0, 121.0, 116.0));
        assert!((pos.stop_loss_price() - 95.0).abs() < f64::EPSILON);
    }

    #[test]
    fn trailing_stop_ratchets_up_only() {
        let mut pos = TradePosition::new(10.0, 0, 100.0, 0, 95.0, 95.0, f64::NAN).unwrap();
        assert!(!pos.trigger_stop_loss(110.0, 112.0, 106.0));
        assert!((pos.stop_loss_price() - 105.0).abs() < f64::EPSILON);
        // a lower close never loosens the stop
        assert!(!pos.trigger_stop_loss(107.0, 108.0, 106.0));
        assert!((pos.stop_loss_price() - 105.0).abs() < f64::EPSILON);
        assert!(pos.trigger_stop_loss(107.0, 108.0, 104.0));
    }

    #[test]
    fn trailing_stop_ratchets_down_for_shorts() {
        let mut pos = TradePosition::new(-10.0, 0, 100.0, 0, 105.0, 105.0, f64::NAN).unwrap();
        assert!(!pos.trigger_stop_loss(90.0, 94.0, 88.0));
        assert!((pos.stop_loss_price() - 95.0).abs() < f64::EPSILON);
        assert!(!pos.trigger_stop_loss(93.0, 94.0, 92.0));
        assert!((pos.stop_loss_price() - 95.0).abs() < f64::EPSILON);
        assert!(pos.trigger_stop_loss(93.0, 95.5, 92.0));
    }

    #[test]
    fn unrealized_values() {
        let pos = short_position();
        assert!((pos.unrealized_pnl(90.0) - 100.0).abs() < f64::EPSILON);
        assert!((pos.unrealized_investment() - 1000.0).abs() < f64::EPSILON);
        assert_eq!(pos.unrealized_duration(500), 500);
    }
}
