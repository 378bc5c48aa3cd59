//! Price history source port trait.

use crate::domain::error::TatraderError;
use crate::domain::history::{FieldResolver, History};

pub trait HistoryPort {
    /// Load the full history, oldest sample first, with `resolver` mapping
    /// standard fields to column names.
    fn load_history(&self, resolver: &FieldResolver) -> Result<History, TatraderError>;
}
