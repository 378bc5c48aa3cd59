//! Running backtest statistics.
//!
//! Only the raw totals are stored; every ratio is derived on demand.
//! Losses are accumulated as a positive magnitude.

use crate::domain::trade_record::TradeRecord;
use crate::domain::trade_session::TradeSession;

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestSummary {
    capital: f64,
    peak_equity: f64,
    max_drawdown: f64,
    max_drawdown_percent: f64,
    cumulative_duration: i64,
    cumulative_investment: f64,
    profit_count: usize,
    cumulative_profits: f64,
    loss_count: usize,
    cumulative_losses: f64,
    break_even_count: usize,
    // mark of the last folded session
    open_trade_count: usize,
    unrealized_pnl: f64,
    unrealized_investment: f64,
    unrealized_duration: i64,
    partial_realized_pnl: f64,
}

impl BacktestSummary {
    pub fn new(initial_capital: f64) -> Self {
        BacktestSummary {
            capital: initial_capital,
            peak_equity: initial_capital,
            max_drawdown: 0.0,
            max_drawdown_percent: 0.0,
            cumulative_duration: 0,
            cumulative_investment: 0.0,
            profit_count: 0,
            cumulative_profits: 0.0,
            loss_count: 0,
            cumulative_losses: 0.0,
            break_even_count: 0,
            open_trade_count: 0,
            unrealized_pnl: 0.0,
            unrealized_investment: 0.0,
            unrealized_duration: 0,
            partial_realized_pnl: 0.0,
        }
    }

    /// Fold one bar's session: realize the position closed on this bar (if
    /// any), mark the open position, then update peak equity and drawdown.
    pub fn update_to_next_summary(&mut self, session: &TradeSession) {
        if session.closed_position().is_some() {
            self.record_trade(
                session.realized_pnl(),
                session.realized_investment(),
                session.realized_duration(),
            );
        }

        self.open_trade_count = usize::from(session.is_open());
        self.unrealized_pnl = session.unrealized_pnl();
        self.unrealized_investment = session.unrealized_investment();
        self.unrealized_duration = session.unrealized_duration();
        self.partial_realized_pnl = session.partial_realized_pnl();
        self.update_drawdown();
    }

    /// Fold a single closed trade record.
    pub fn add_trade_record(&mut self, record: &TradeRecord) {
        if record.is_open() {
            return;
        }
        self.record_trade(record.pnl(), record.investment().abs(), record.duration());
        self.update_drawdown();
    }

    fn record_trade(&mut self, pnl: f64, investment: f64, duration: i64) {
        if !pnl.is_finite() || !investment.is_finite() {
            tracing::warn!(pnl, investment, "skipping trade with undefined result");
            return;
        }
        self.cumulative_duration += duration;
        self.cumulative_investment += investment;

        if pnl > 0.0 {
            self.profit_count += 1;
            self.cumulative_profits += pnl;
        } else if pnl < 0.0 {
            self.loss_count += 1;
            self.cumulative_losses += -pnl;
        } else {
            self.break_even_count += 1;
        }

        self.capital += pnl;
    }

    fn update_drawdown(&mut self) {
        self.peak_equity = self.peak_equity.max(self.equity());
        self.max_drawdown = self.max_drawdown.max(self.drawdown());
        self.max_drawdown_percent = self.max_drawdown_percent.max(self.drawdown_percent());
    }

    pub fn capital(&self) -> f64 {
        self.capital
    }

    pub fn initial_capital(&self) -> f64 {
        self.capital - self.cumulative_pnl()
    }

    pub fn peak_equity(&self) -> f64 {
        self.peak_equity
    }

    /// Capital plus the marked value of the open position.
    pub fn equity(&self) -> f64 {
        self.capital + self.partial_realized_pnl + self.unrealized_pnl
    }

    pub fn drawdown(&self) -> f64 {
        self.peak_equity - self.equity()
    }

    pub fn drawdown_percent(&self) -> f64 {
        if self.peak_equity == 0.0 {
            0.0
        } else {
            self.drawdown() / self.peak_equity * 100.0
        }
    }

    pub fn max_drawdown(&self) -> f64 {
        self.max_drawdown
    }

    pub fn max_drawdown_percent(&self) -> f64 {
        self.max_drawdown_percent
    }

    pub fn trade_count(&self) -> usize {
        self.profit_count + self.loss_count + self.break_even_count
    }

    pub fn profit_count(&self) -> usize {
        self.profit_count
    }

    pub fn loss_count(&self) -> usize {
        self.loss_count
    }

    pub fn break_even_count(&self) -> usize {
        self.break_even_count
    }

    pub fn open_trade_count(&self) -> usize {
        self.open_trade_count
    }

    pub fn cumulative_investment(&self) -> f64 {
        self.cumulative_investment
    }

    pub fn cumulative_duration(&self) -> i64 {
        self.cumulative_duration
    }

    pub fn cumulative_profits(&self) -> f64 {
        self.cumulative_profits
    }

    pub fn cumulative_losses(&self) -> f64 {
        self.cumulative_losses
    }

    pub fn cumulative_pnl(&self) -> f64 {
        self.cumulative_profits - self.cumulative_losses
    }

    fn per_trade(&self, total: f64) -> f64 {
        match self.trade_count() {
            0 => 0.0,
            n => total / n as f64,
        }
    }

    pub fn average_investment(&self) -> f64 {
        self.per_trade(self.cumulative_investment)
    }

    pub fn average_duration(&self) -> i64 {
        match self.trade_count() {
            0 => 0,
            n => self.cumulative_duration / n as i64,
        }
    }

    pub fn average_pnl(&self) -> f64 {
        self.per_trade(self.cumulative_pnl())
    }

    pub fn profit_rate(&self) -> f64 {
        self.per_trade(self.profit_count as f64)
    }

    pub fn loss_rate(&self) -> f64 {
        self.per_trade(self.loss_count as f64)
    }

    pub fn break_even_rate(&self) -> f64 {
        self.per_trade(self.break_even_count as f64)
    }

    pub fn average_profit(&self) -> f64 {
        match self.profit_count {
            0 => 0.0,
            n => self.cumulative_profits / n as f64,
        }
    }

    /// Mean loss as a positive magnitude.
    pub fn average_loss(&self) -> f64 {
        match self.loss_count {
            0 => 0.0,
            n => self.cumulative_losses / n as f64,
        }
    }

    /// Expected profit per trade.
    pub fn expected_value(&self) -> f64 {
        self.profit_rate() * self.average_profit() - self.loss_rate() * self.average_loss()
    }

    /// Expected profit per trade relative to the average investment, in percent.
    pub fn expected_return(&self) -> f64 {
        let average = self.average_investment();
        if average == 0.0 {
            0.0
        } else {
            self.expected_value() / average * 100.0
        }
    }

    pub fn cumulative_profit_percent(&self) -> f64 {
        if self.cumulative_investment == 0.0 {
            0.0
        } else {
            self.cumulative_profits / self.cumulative_investment * 100.0
        }
    }

    pub fn cumulative_loss_percent(&self) -> f64 {
        if self.cumulative_investment == 0.0 {
            0.0
        } else {
            self.cumulative_losses / self.cumulative_investment * 100.0
        }
    }

    /// Gross profits over gross losses: infinite without losses, zero
    /// without either.
    pub fn profit_factor(&self) -> f64 {
        if self.cumulative_losses == 0.0 {
            if self.cumulative_profits > 0.0 {
                f64::INFINITY
            } else {
                0.0
            }
        } else {
            self.cumulative_profits / self.cumulative_losses
        }
    }

    pub fn unrealized_pnl(&self) -> f64 {
        self.unrealized_pnl
    }

    pub fn unrealized_investment(&self) -> f64 {
        self.unrealized_investment
    }

    pub fn unrealized_duration(&self) -> i64 {
        self.unrealized_duration
    }

    pub fn partial_realized_pnl(&self) -> f64 {
        self.partial_realized_pnl
    }
}
