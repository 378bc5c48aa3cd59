//! Backtest engine and bar loop.
//!
//! Bars are processed oldest to newest. On each bar an open position is
//! checked for stop-loss, then take-profit, then its exit filter; if no
//! position remains open, the long and then the short entry filter are
//! evaluated on the same bar.

use serde::Serialize;

use crate::domain::error::TatraderError;
use crate::domain::execution::{Broker, Market, Profile};
use crate::domain::history::{History, Snapshot};
use crate::domain::registry::MethodContext;
use crate::domain::strategy::{DirectionRules, Strategy};
use crate::domain::summary::BacktestSummary;
use crate::domain::trade_record::TradeRecord;
use crate::domain::trade_session::{ExitReason, TradeEntry, TradeExit, TradeSession};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct BacktestConfig {
    pub profile: Profile,
    pub market: Market,
    pub broker: Broker,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EquityPoint {
    pub timestamp: i64,
    pub equity: f64,
}

#[derive(Debug, Clone)]
pub struct BacktestResult {
    pub summary: BacktestSummary,
    /// Closed slices in exit order, followed by the open remainder if any.
    pub trade_records: Vec<TradeRecord>,
    pub equity_curve: Vec<EquityPoint>,
}

/// Bar prices with missing open/high/low replaced by the close.
struct Bar {
    timestamp: i64,
    index: usize,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    prev_close: f64,
}

impl Bar {
    fn read(snapshot: Snapshot<'_>, index: usize) -> Self {
        let close = snapshot.close();
        let or_close = |v: f64| if v.is_nan() { close } else { v };
        Bar {
            timestamp: snapshot.timestamp(),
            index,
            open: or_close(snapshot.open()),
            high: or_close(snapshot.high()),
            low: or_close(snapshot.low()),
            close,
            prev_close: or_close(snapshot.at(1).close()),
        }
    }
}

pub fn run_backtest(
    history: &History,
    strategy: &Strategy,
    config: &BacktestConfig,
) -> Result<BacktestResult, TatraderError> {
    let ctx = strategy.context();
    let mut session = TradeSession::new();
    let mut summary = BacktestSummary::new(config.profile.initial_capital);
    let mut trade_records = Vec::new();
    let mut equity_curve = Vec::with_capacity(history.len());

    tracing::info!(
        strategy = %strategy.name,
        bars = history.len(),
        "running backtest"
    );

    for index in 0..history.len() {
        let snapshot = history.snapshot_at_index(index);
        let bar = Bar::read(snapshot, index);
        session.market_update(bar.timestamp, bar.close, bar.index);

        if let Some(position) = session.open_position() {
            let size = position.position_size();
            let exit = session
                .evaluate_exit_conditions(bar.prev_close, bar.open, bar.high, bar.low)
                .or_else(|| signal_exit(strategy, snapshot, ctx, &bar, size));

            if let Some(exit) = exit {
                let fee = config.broker.exit_fee(&exit);
                let record = session.exit_position(&exit, fee)?;
                tracing::debug!(
                    index,
                    status = %record.status,
                    price = record.exit_price,
                    pnl = record.pnl(),
                    "position exited"
                );
                trade_records.push(record);
            }
        }

        if !session.is_open() {
            if let Some(entry) = entry_trade(strategy, snapshot, ctx, config) {
                let fee = config.broker.entry_fee(&entry);
                session.entry_position(&entry, fee)?;
                tracing::debug!(
                    index,
                    size = entry.position_size,
                    price = entry.price,
                    "position entered"
                );
            }
        }

        summary.update_to_next_summary(&session);
        equity_curve.push(EquityPoint {
            timestamp: bar.timestamp,
            equity: summary.equity(),
        });
    }

    trade_records.extend(session.trade_records().into_iter().filter(TradeRecord::is_open));

    tracing::info!(
        trades = summary.trade_count(),
        equity = summary.equity(),
        "backtest complete"
    );

    Ok(BacktestResult {
        summary,
        trade_records,
        equity_curve,
    })
}

fn direction_rules(strategy: &Strategy, size: f64) -> Option<&DirectionRules> {
    if size > 0.0 {
        strategy.long.as_ref()
    } else if size < 0.0 {
        strategy.short.as_ref()
    } else {
        None
    }
}

fn signal_exit(
    strategy: &Strategy,
    snapshot: Snapshot<'_>,
    ctx: MethodContext<'_>,
    bar: &Bar,
    size: f64,
) -> Option<TradeExit> {
    let rules = direction_rules(strategy, size)?;
    if !rules.exit.evaluate(snapshot, ctx) {
        return None;
    }

    let mut price = strategy.exit_price.evaluate(snapshot, ctx);
    if !price.is_finite() {
        price = bar.close;
    }
    if !price.is_finite() {
        tracing::warn!(index = bar.index, "exit held: no defined exit price on this bar");
        return None;
    }
    Some(TradeExit {
        position_size: size,
        price,
        reason: ExitReason::Signal,
    })
}

fn entry_trade(
    strategy: &Strategy,
    snapshot: Snapshot<'_>,
    ctx: MethodContext<'_>,
    config: &BacktestConfig,
) -> Option<TradeEntry> {
    let long = strategy
        .long
        .as_ref()
        .is_some_and(|rules| rules.entry.evaluate(snapshot, ctx));
    let short = !long
        && strategy
            .short
            .as_ref()
            .is_some_and(|rules| rules.entry.evaluate(snapshot, ctx));
    if !long && !short {
        return None;
    }

    let sign = if long { 1.0 } else { -1.0 };
    let price = strategy.entry_price.evaluate(snapshot, ctx);
    let risk = sign * strategy.risk.evaluate(snapshot, ctx);
    let size = config
        .market
        .round_quantity(config.profile.risk_value() / risk);

    if !price.is_finite() || !size.is_finite() || size == 0.0 {
        tracing::warn!(
            index = ?snapshot.index(),
            price,
            risk,
            size,
            "entry skipped: undefined price or order size"
        );
        return None;
    }

    let stop_loss_price = if strategy.stop_loss.enabled {
        price - risk
    } else {
        f64::NAN
    };
    let take_profit_price = if strategy.take_profit.enabled {
        price + sign * strategy.take_profit.reward.evaluate(snapshot, ctx)
    } else {
        f64::NAN
    };

    Some(TradeEntry {
        position_size: size,
        price,
        stop_loss_price,
        stop_loss_trailing: strategy.stop_loss.enabled && strategy.stop_loss.trailing,
        take_profit_price,
    })
}
