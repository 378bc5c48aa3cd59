//! Configuration validation.
//!
//! Validates the profile, market and broker sections before a backtest runs.

use crate::domain::error::TatraderError;
use crate::domain::execution::{FeePosition, FeeTrigger, FeeType};
use crate::ports::config_port::ConfigPort;

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), TatraderError> {
    validate_initial_capital(config)?;
    validate_capital_risk(config)?;
    validate_market(config)?;
    validate_broker(config)?;
    Ok(())
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> TatraderError {
    TatraderError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn require_double(config: &dyn ConfigPort, section: &str, key: &str) -> Result<f64, TatraderError> {
    let raw = config
        .get_string(section, key)
        .ok_or_else(|| TatraderError::ConfigMissing {
            section: section.to_string(),
            key: key.to_string(),
        })?;
    raw.trim()
        .parse::<f64>()
        .map_err(|_| invalid(section, key, format!("{raw:?} is not a number")))
}

fn optional_double(config: &dyn ConfigPort, section: &str, key: &str) -> Result<f64, TatraderError> {
    match config.get_string(section, key) {
        None => Ok(0.0),
        Some(_) => require_double(config, section, key),
    }
}

fn validate_initial_capital(config: &dyn ConfigPort) -> Result<(), TatraderError> {
    let value = require_double(config, "profile", "initial_capital")?;
    if !(value > 0.0) || !value.is_finite() {
        return Err(invalid(
            "profile",
            "initial_capital",
            "initial_capital must be positive",
        ));
    }
    Ok(())
}

fn validate_capital_risk(config: &dyn ConfigPort) -> Result<(), TatraderError> {
    let value = require_double(config, "profile", "capital_risk")?;
    if !(value > 0.0 && value <= 1.0) {
        return Err(invalid(
            "profile",
            "capital_risk",
            "capital_risk must be in (0, 1]",
        ));
    }
    Ok(())
}

fn validate_market(config: &dyn ConfigPort) -> Result<(), TatraderError> {
    for key in ["min_order_qty", "qty_step"] {
        let value = optional_double(config, "market", key)?;
        if value < 0.0 || !value.is_finite() {
            return Err(invalid("market", key, format!("{key} must be non-negative")));
        }
    }
    Ok(())
}

/// Fee ids listed in `[broker] fees`, comma separated.
pub fn broker_fee_ids(config: &dyn ConfigPort) -> Vec<String> {
    config.get_list("broker", "fees")
}

fn validate_broker(config: &dyn ConfigPort) -> Result<(), TatraderError> {
    for id in broker_fee_ids(config) {
        let section = format!("fee.{id}");
        if !config.has_section(&section) {
            return Err(invalid(
                "broker",
                "fees",
                format!("fee {id} has no [{section}] section"),
            ));
        }
        validate_fee(config, &section)?;
    }
    Ok(())
}

fn validate_fee(config: &dyn ConfigPort, section: &str) -> Result<(), TatraderError> {
    let field = |key: &str| {
        config
            .get_string(section, key)
            .ok_or_else(|| TatraderError::ConfigMissing {
                section: section.to_string(),
                key: key.to_string(),
            })
    };

    let fee_type = field("type")?;
    if FeeType::from_name(&fee_type).is_none() {
        return Err(invalid(section, "type", format!("unknown fee type {fee_type}")));
    }
    let position = field("position")?;
    if FeePosition::from_name(&position).is_none() {
        return Err(invalid(
            section,
            "position",
            format!("unknown fee position {position}"),
        ));
    }
    let trigger = field("trigger")?;
    if FeeTrigger::from_name(&trigger).is_none() {
        return Err(invalid(
            section,
            "trigger",
            format!("unknown fee trigger {trigger}"),
        ));
    }
    let value = require_double(config, section, "value")?;
    if value < 0.0 || !value.is_finite() {
        return Err(invalid(section, "value", "value must be non-negative"));
    }
    Ok(())
}
