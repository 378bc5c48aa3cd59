//! Execution parameters: account profile, market quantity rules and broker fees.
//!
//! Fees are computed from the signed order size, so the same fee table
//! can distinguish long from short positions and buys from sells.

use crate::domain::trade_session::{TradeEntry, TradeExit};

/// Account sizing parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    pub name: String,
    pub initial_capital: f64,
    /// Fraction of initial capital risked per trade.
    pub capital_risk: f64,
}

impl Default for Profile {
    fn default() -> Self {
        Profile {
            name: "default".to_string(),
            initial_capital: 100_000.0,
            capital_risk: 0.01,
        }
    }
}

impl Profile {
    /// Capital put at risk on each trade.
    pub fn risk_value(&self) -> f64 {
        self.initial_capital * self.capital_risk
    }
}

/// Order quantity constraints of a market.
#[derive(Debug, Clone, PartialEq)]
pub struct Market {
    pub name: String,
    pub min_order_qty: f64,
    pub qty_step: f64,
}

impl Default for Market {
    fn default() -> Self {
        Market {
            name: "default".to_string(),
            min_order_qty: 0.0,
            qty_step: 0.0,
        }
    }
}

impl Market {
    /// A market whose step equals its minimum order quantity.
    pub fn new(name: impl Into<String>, min_order_qty: f64) -> Self {
        Market {
            name: name.into(),
            min_order_qty,
            qty_step: min_order_qty,
        }
    }

    /// Round `size` to the nearest step, then raise a non-zero size below the
    /// minimum order quantity up to it. The sign is preserved.
    pub fn round_quantity(&self, size: f64) -> f64 {
        let mut size = size;
        if self.qty_step > 0.0 && size % self.qty_step != 0.0 {
            size = self.qty_step * (size / self.qty_step).round();
        }

        if size > 0.0 && size < self.min_order_qty {
            self.min_order_qty
        } else if size < 0.0 && size > -self.min_order_qty {
            -self.min_order_qty
        } else {
            size
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeeType {
    /// `value` percent of the order's notional value.
    PercentageNotional,
    /// `value` per order.
    Fixed,
}

impl FeeType {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "percentage_notional" | "percentage" | "percent" => Some(FeeType::PercentageNotional),
            "fixed" => Some(FeeType::Fixed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeePosition {
    Long,
    Short,
    LongAndShort,
}

impl FeePosition {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "long" => Some(FeePosition::Long),
            "short" => Some(FeePosition::Short),
            "long_and_short" | "both" | "all" => Some(FeePosition::LongAndShort),
            _ => None,
        }
    }

    fn applies(self, is_long: bool, is_short: bool) -> bool {
        match self {
            FeePosition::Long => is_long,
            FeePosition::Short => is_short,
            FeePosition::LongAndShort => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeeTrigger {
    Entry,
    Exit,
    Buy,
    Sell,
    All,
}

impl FeeTrigger {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "entry" => Some(FeeTrigger::Entry),
            "exit" => Some(FeeTrigger::Exit),
            "buy" => Some(FeeTrigger::Buy),
            "sell" => Some(FeeTrigger::Sell),
            "all" => Some(FeeTrigger::All),
            _ => None,
        }
    }
}

/// One line of a broker's fee schedule.
#[derive(Debug, Clone, PartialEq)]
pub struct BrokerFee {
    pub name: String,
    pub fee_type: FeeType,
    pub position: FeePosition,
    pub trigger: FeeTrigger,
    pub value: f64,
}

impl BrokerFee {
    fn amount(&self, notional: f64) -> f64 {
        match self.fee_type {
            FeeType::PercentageNotional => notional * self.value / 100.0,
            FeeType::Fixed => self.value,
        }
    }

    pub fn entry_fee(&self, entry: &TradeEntry) -> f64 {
        if !self.position.applies(entry.is_long(), entry.is_short()) {
            return 0.0;
        }
        let triggered = match self.trigger {
            FeeTrigger::Entry | FeeTrigger::All => true,
            FeeTrigger::Exit => false,
            FeeTrigger::Buy => entry.is_buy(),
            FeeTrigger::Sell => entry.is_sell(),
        };
        if triggered {
            self.amount(entry.notional_value())
        } else {
            0.0
        }
    }

    pub fn exit_fee(&self, exit: &TradeExit) -> f64 {
        if !self.position.applies(exit.is_long(), exit.is_short()) {
            return 0.0;
        }
        let triggered = match self.trigger {
            FeeTrigger::Exit | FeeTrigger::All => true,
            FeeTrigger::Entry => false,
            FeeTrigger::Buy => exit.is_buy(),
            FeeTrigger::Sell => exit.is_sell(),
        };
        if triggered {
            self.amount(exit.notional_value())
        } else {
            0.0
        }
    }
}

/// A named fee schedule. An empty schedule trades for free.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Broker {
    pub name: String,
    pub fees: Vec<BrokerFee>,
}

impl Broker {
    pub fn entry_fee(&self, entry: &TradeEntry) -> f64 {
        self.fees.iter().map(|fee| fee.entry_fee(entry)).sum()
    }

    pub fn exit_fee(&self, exit: &TradeExit) -> f64 {
        self.fees.iter().map(|fee| fee.exit_fee(exit)).sum()
    }
}
