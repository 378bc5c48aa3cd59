//! Declarative strategy: named series, entry/exit filters per direction,
//! risk sizing and stop/target rules.

use crate::domain::error::TatraderError;
use crate::domain::filter::Filter;
use crate::domain::method::Method;
use crate::domain::registry::{MethodContext, Registry};
use std::collections::HashSet;

/// Entry and exit conditions for one trade direction.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectionRules {
    pub entry: Filter,
    pub exit: Filter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StopLoss {
    pub enabled: bool,
    pub trailing: bool,
}

/// Target distance from entry is the value of `reward` at entry.
#[derive(Debug, Clone, PartialEq)]
pub struct TakeProfit {
    pub enabled: bool,
    pub reward: Method,
}

impl Default for TakeProfit {
    fn default() -> Self {
        TakeProfit {
            enabled: false,
            reward: Method::Value(0.0),
        }
    }
}

impl TakeProfit {
    /// Target at `multiplier` times the risk distance.
    pub fn risk_multiple(risk: &Method, multiplier: f64) -> Self {
        TakeProfit {
            enabled: true,
            reward: Method::multiply(risk.clone(), Method::Value(multiplier)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Strategy {
    pub name: String,
    pub registry: Registry,
    /// Risk per unit; also the stop distance from entry.
    pub risk: Method,
    pub long: Option<DirectionRules>,
    pub short: Option<DirectionRules>,
    pub stop_loss: StopLoss,
    pub take_profit: TakeProfit,
    pub entry_price: Method,
    pub exit_price: Method,
}

impl Strategy {
    /// An empty strategy that never trades.
    pub fn new(name: impl Into<String>, risk: Method) -> Self {
        Strategy {
            name: name.into(),
            registry: Registry::new(),
            risk,
            long: None,
            short: None,
            stop_loss: StopLoss::default(),
            take_profit: TakeProfit::default(),
            entry_price: Method::Close,
            exit_price: Method::Close,
        }
    }

    pub fn context(&self) -> MethodContext<'_> {
        MethodContext::with_registry(&self.registry)
    }

    pub fn is_tradable(&self) -> bool {
        self.long.is_some() || self.short.is_some()
    }

    /// Check that the strategy can trade, that every referenced series is
    /// registered and that no series refers back to itself.
    pub fn validate(&self) -> Result<(), TatraderError> {
        if !self.is_tradable() {
            return Err(invalid("no long or short position rules"));
        }

        for (owner, method) in self.methods() {
            if let Some(value) = method.constants().into_iter().find(|v| !v.is_finite()) {
                return Err(invalid(format!("{owner} has non-finite parameter {value}")));
            }
            for name in method.references() {
                if !self.registry.contains(name) {
                    return Err(invalid(format!("{owner} references unknown series {name:?}")));
                }
            }
        }

        let mut done = HashSet::new();
        for name in self.registry.names() {
            let mut chain = Vec::new();
            self.check_cycle(name, &mut chain, &mut done)?;
        }
        Ok(())
    }

    fn methods(&self) -> Vec<(String, &Method)> {
        let mut out: Vec<(String, &Method)> = self
            .registry
            .iter()
            .map(|(name, method)| (format!("series {name:?}"), method))
            .collect();
        out.push(("risk".to_string(), &self.risk));
        out.push(("entry price".to_string(), &self.entry_price));
        out.push(("exit price".to_string(), &self.exit_price));
        if self.take_profit.enabled {
            out.push(("take profit".to_string(), &self.take_profit.reward));
        }
        for (label, rules) in [("long", &self.long), ("short", &self.short)] {
            if let Some(rules) = rules {
                for method in rules.entry.methods() {
                    out.push((format!("{label} entry"), method));
                }
                for method in rules.exit.methods() {
                    out.push((format!("{label} exit"), method));
                }
            }
        }
        out
    }

    fn check_cycle<'a>(
        &'a self,
        name: &'a str,
        chain: &mut Vec<&'a str>,
        done: &mut HashSet<&'a str>,
    ) -> Result<(), TatraderError> {
        if done.contains(name) {
            return Ok(());
        }
        if chain.contains(&name) {
            chain.push(name);
            return Err(invalid(format!("circular series reference: {}", chain.join(" -> "))));
        }
        let Some(method) = self.registry.get(name) else {
            return Ok(());
        };
        chain.push(name);
        for child in method.references() {
            self.check_cycle(child, chain, done)?;
        }
        chain.pop();
        done.insert(name);
        Ok(())
    }
}

fn invalid(reason: impl Into<String>) -> TatraderError {
    TatraderError::StrategyInvalid {
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::history::History;

    fn sample_strategy() -> Strategy {
        let mut strategy = Strategy::new("EMA cross", Method::Value(5.0));
        strategy.registry.insert("fast", Method::ema(Method::Close, 2));
        strategy.registry.insert("slow", Method::ema(Method::Close, 4));
        strategy.long = Some(DirectionRules {
            entry: Filter::crossover(Method::reference("fast"), Method::reference("slow")),
            exit: Filter::crossunder(Method::reference("fast"), Method::reference("slow")),
        });
        strategy
    }

    #[test]
    fn defaults() {
        let s = Strategy::new("empty", Method::Value(1.0));
        assert!(!s.is_tradable());
        assert_eq!(s.entry_price, Method::Close);
        assert_eq!(s.exit_price, Method::Close);
        assert!(!s.stop_loss.enabled);
        assert!(!s.take_profit.enabled);
    }

    #[test]
    fn long_only_strategy() {
        let s = sample_strategy();
        assert!(s.is_tradable());
        assert!(s.short.is_none());
    }

    #[test]
    fn context_resolves_series() {
        let s = sample_strategy();
        let history = History::from_columns(vec![("Close", vec![1.0, 2.0, 3.0, 4.0])]).unwrap();
        let value = Method::reference("fast").evaluate(history.snapshot(0), s.context());
        assert!(!value.is_nan());
    }

    #[test]
    fn validate_accepts_resolved_strategy() {
        assert!(sample_strategy().validate().is_ok());
    }

    #[test]
    fn validate_rejects_untradable() {
        let err = Strategy::new("empty", Method::Value(1.0)).validate().unwrap_err();
        assert!(matches!(err, TatraderError::StrategyInvalid { .. }));
    }

    #[test]
    fn validate_rejects_unknown_reference() {
        let mut s = sample_strategy();
        s.registry.remove("slow");
        let err = s.validate().unwrap_err();
        assert!(err.to_string().contains("\"slow\""));
    }

    #[test]
    fn validate_rejects_cycle() {
        let mut s = sample_strategy();
        s.registry.insert("a", Method::sma(Method::reference("b"), 2));
        s.registry.insert("b", Method::add(Method::reference("a"), Method::Value(1.0)));
        let err = s.validate().unwrap_err();
        assert!(err.to_string().contains("circular"));
    }

    #[test]
    fn validate_checks_risk() {
        let mut s = sample_strategy();
        s.risk = Method::reference("atr");
        assert!(s.validate().is_err());
        s.registry.insert("atr", Method::atr(14, 2.0));
        assert!(s.validate().is_ok());
    }

    #[test]
    fn validate_rejects_non_finite_parameter() {
        let mut s = sample_strategy();
        s.risk = Method::atr(14, f64::NAN);
        assert_ne!(s.risk, s.risk.clone());
        let err = s.validate().unwrap_err().to_string();
        assert!(err.contains("risk has non-finite parameter NaN"), "{err}");

        s.risk = Method::percentage(Method::Close, f64::INFINITY);
        assert!(s.validate().is_err());

        s.risk = Method::atr(14, 2.0);
        assert_eq!(s.risk, s.risk.clone());
        assert!(s.validate().is_ok());
    }

    #[test]
    fn risk_multiple_target() {
        let history = History::from_columns(vec![("Close", vec![1.0])]).unwrap();
        let tp = TakeProfit::risk_multiple(&Method::Value(5.0), 1.5);
        assert!(tp.enabled);
        let reward = tp.reward.evaluate(history.snapshot(0), MethodContext::none());
        assert!((reward - 7.5).abs() < f64::EPSILON);
    }
}
