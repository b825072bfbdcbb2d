use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::errors::{CoverageError, Result};
use crate::types::{SurplusPolicy, WeekMode};

/// engine configuration shared by the arrears calculator and chronology builder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// evaluation window
    pub week_mode: WeekMode,
    /// number of leading weeks exempt from payment (week 0 only by default)
    pub grace_weeks: u32,
    /// a week paid at or above `installment * overpaid_multiplier` is overpaid
    pub overpaid_multiplier: Decimal,
    /// how chronology surplus treats earlier uncovered weeks
    pub surplus_policy: SurplusPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            week_mode: WeekMode::Current,
            grace_weeks: 1,
            overpaid_multiplier: dec!(1.5),
            surplus_policy: SurplusPolicy::ForwardOnly,
        }
    }
}

impl EngineConfig {
    /// only closed weeks count; used for month-end reporting
    pub fn strict() -> Self {
        Self::default()
    }

    /// in-progress week counts; used by collectors on route
    pub fn lenient() -> Self {
        Self {
            week_mode: WeekMode::Next,
            ..Self::default()
        }
    }

    pub fn with_week_mode(mut self, mode: WeekMode) -> Self {
        self.week_mode = mode;
        self
    }

    pub fn with_surplus_policy(mut self, policy: SurplusPolicy) -> Self {
        self.surplus_policy = policy;
        self
    }

    /// load from a json document; missing fields take defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let config: EngineConfig =
            serde_json::from_str(json).map_err(|e| CoverageError::InvalidConfiguration {
                message: e.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.grace_weeks == 0 {
            return Err(CoverageError::InvalidConfiguration {
                message: "grace_weeks must be at least 1 (week 0 is always exempt)".to_string(),
            });
        }

        if self.overpaid_multiplier < Decimal::ONE {
            return Err(CoverageError::InvalidConfiguration {
                message: format!(
                    "overpaid_multiplier must be at least 1, got {}",
                    self.overpaid_multiplier
                ),
            });
        }

        Ok(())
    }
}
