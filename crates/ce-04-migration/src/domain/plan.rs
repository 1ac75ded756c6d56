//! What a migration changes: the balance multiplier and token metadata.

use super::errors::MigrationError;

/// A validated migration request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationPlan {
    /// Every holder receives `balance * ratio` on the new instance.
    pub ratio: u64,
    /// Overrides the current symbol when set.
    pub new_symbol: Option<String>,
    /// Overrides the current name when set.
    pub new_name: Option<String>,
}

impl MigrationPlan {
    /// Stock split: multiply every balance by `ratio`, keep metadata.
    pub fn split(ratio: u64) -> Result<Self, MigrationError> {
        if ratio < 2 {
            return Err(MigrationError::InvalidRatio(ratio));
        }
        Ok(Self {
            ratio,
            new_symbol: None,
            new_name: None,
        })
    }

    /// Symbol change at ratio 1. The symbol is trimmed; the name, if given,
    /// is used as is.
    pub fn rename(new_symbol: &str, new_name: Option<&str>) -> Result<Self, MigrationError> {
        let symbol = new_symbol.trim();
        if symbol.is_empty() {
            return Err(MigrationError::InvalidSymbol);
        }
        Ok(Self {
            ratio: 1,
            new_symbol: Some(symbol.to_string()),
            new_name: new_name.map(str::to_string),
        })
    }

    pub fn kind(&self) -> &'static str {
        if self.ratio > 1 {
            "split"
        } else {
            "rename"
        }
    }
}
