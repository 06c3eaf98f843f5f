//! Simulation tunables.
//!
//! Defaults reproduce the reference launch parameters in [`crate::constants`].
//! Every struct is `#[serde(default)]`, so a JSON override only needs the
//! fields it changes.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::error::{Error, Result};

/// Bonding-curve shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CurveConfig {
    /// Hard ceiling on minted supply.
    pub cap: Decimal,
    /// Exposure at zero supply; divides the free supply into the virtual token reserve.
    pub exposure_factor: Decimal,
    /// Exposure is zero once `minted * exposure_amplifier >= cap`.
    pub exposure_amplifier: Decimal,
    /// Cumulative buy-side USDC at which base virtual liquidity is gone.
    pub virtual_limit: Decimal,
}

impl Default for CurveConfig {
    fn default() -> Self {
        Self {
            cap:                Decimal::from(CAP),
            exposure_factor:    Decimal::from(EXPOSURE_FACTOR),
            exposure_amplifier: Decimal::from(EXPOSURE_AMPLIFIER),
            virtual_limit:      Decimal::from(VIRTUAL_LIMIT),
        }
    }
}

impl CurveConfig {
    /// Base virtual USDC liquidity before any decay: `cap / exposure_factor`.
    pub fn base_virtual_liquidity(&self) -> Result<Decimal> {
        self.cap
            .checked_div(self.exposure_factor)
            .ok_or(Error::MathOverflow)
    }

    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("cap", self.cap),
            ("exposure_factor", self.exposure_factor),
            ("exposure_amplifier", self.exposure_amplifier),
            ("virtual_limit", self.virtual_limit),
        ];
        for (name, value) in positive {
            if value <= Decimal::ZERO {
                return Err(Error::InvalidConfig(format!("{name} must be > 0, got {value}")));
            }
        }
        Ok(())
    }
}

/// Vault yield parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VaultConfig {
    /// Annual rate as a fraction (0.05 = 5 %).
    pub apy: Decimal,
    /// Discrete compounding periods per year.
    pub days_per_year: u32,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            apy:           Decimal::from(DEFAULT_APY_BPS) / Decimal::from(BPS_DENOMINATOR),
            days_per_year: DAYS_PER_YEAR,
        }
    }
}

impl VaultConfig {
    /// Growth factor applied once per day: `1 + apy / days_per_year`.
    pub fn daily_growth(&self) -> Result<Decimal> {
        self.apy
            .checked_div(Decimal::from(self.days_per_year))
            .and_then(|rate| rate.checked_add(Decimal::ONE))
            .ok_or(Error::MathOverflow)
    }

    pub fn validate(&self) -> Result<()> {
        if self.apy < Decimal::ZERO {
            return Err(Error::InvalidConfig(format!("apy must be >= 0, got {}", self.apy)));
        }
        if self.days_per_year == 0 {
            return Err(Error::InvalidConfig("days_per_year must be > 0".into()));
        }
        Ok(())
    }
}

/// Everything one simulation run needs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub curve: CurveConfig,
    pub vault: VaultConfig,
}

impl SimConfig {
    pub fn validate(&self) -> Result<()> {
        self.curve.validate()?;
        self.vault.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn defaults_match_launch_parameters() {
        let cfg = SimConfig::default();
        assert_eq!(cfg.curve.cap, dec!(1000000000));
        assert_eq!(cfg.curve.exposure_factor, dec!(100000));
        assert_eq!(cfg.curve.base_virtual_liquidity().unwrap(), dec!(10000));
        assert_eq!(cfg.vault.apy, dec!(0.05));
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn partial_json_override_keeps_defaults() {
        let cfg: SimConfig =
            serde_json::from_str(r#"{ "vault": { "apy": "0.10" }, "curve": { "cap": 5000 } }"#).unwrap();
        assert_eq!(cfg.vault.apy, dec!(0.10));
        assert_eq!(cfg.vault.days_per_year, 365);
        assert_eq!(cfg.curve.cap, dec!(5000));
        assert_eq!(cfg.curve.exposure_factor, dec!(100000));
    }

    #[test]
    fn rejects_non_positive_curve_params() {
        let mut cfg = SimConfig::default();
        cfg.curve.exposure_factor = Decimal::ZERO;
        assert!(matches!(cfg.validate(), Err(Error::InvalidConfig(_))));

        let mut cfg = SimConfig::default();
        cfg.vault.apy = dec!(-0.01);
        assert!(matches!(cfg.validate(), Err(Error::InvalidConfig(_))));
    }
}
