//! Strategy description source port trait.

use crate::domain::error::TatraderError;
use crate::domain::strategy::Strategy;

pub trait StrategyPort {
    fn load_strategy(&self) -> Result<Strategy, TatraderError>;
}
