use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

use tally_core::Money;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid near-match tolerance: {0}")]
    InvalidTolerance(String),
}

/// How far a near match may stray from the reported activity.
///
/// A transaction is near an activity if it falls within `date_window_days`
/// and inside the amount band (the wider of `amount_band` dollars and
/// `amount_ratio` of the activity total), or if the totals are equal and
/// the dates are within `exact_amount_window_days`.
///
/// The band only covers charges unless `match_refunds` is set, in which case
/// a negative activity gets the same band mirrored below zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NearMatchTolerance {
    pub date_window_days: u32,
    pub exact_amount_window_days: u32,
    pub amount_band: Decimal,
    pub amount_ratio: Decimal,
    pub match_refunds: bool,
}

impl Default for NearMatchTolerance {
    fn default() -> Self {
        Self {
            date_window_days: 1,
            exact_amount_window_days: 2,
            amount_band: Decimal::new(300, 2),
            amount_ratio: Decimal::new(10, 2),
            match_refunds: false,
        }
    }
}

impl NearMatchTolerance {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.amount_band.is_sign_negative() {
            return Err(ConfigError::InvalidTolerance(format!(
                "amount_band must not be negative (got {})",
                self.amount_band
            )));
        }
        if self.amount_ratio.is_sign_negative() || self.amount_ratio >= Decimal::ONE {
            return Err(ConfigError::InvalidTolerance(format!(
                "amount_ratio must be in [0, 1) (got {})",
                self.amount_ratio
            )));
        }
        Ok(())
    }

    /// Whether `candidate` lies in the band around `reference`.
    ///
    /// Amounts too large for the band to be computed never match.
    pub fn amount_within_band(&self, candidate: Money, reference: Money) -> bool {
        if reference.is_negative() && !self.match_refunds {
            return false;
        }
        let Some((lower, upper)) = self.band(reference.abs().as_decimal()) else {
            return false;
        };

        let (low, high) = if reference.is_negative() {
            (-upper, -lower)
        } else {
            (lower, upper)
        };
        let candidate = candidate.as_decimal();
        low <= candidate && candidate <= high
    }

    fn band(&self, magnitude: Decimal) -> Option<(Decimal, Decimal)> {
        let scaled_down = magnitude.checked_mul(Decimal::ONE - self.amount_ratio)?;
        let scaled_up = magnitude.checked_mul(Decimal::ONE + self.amount_ratio)?;
        let lower = magnitude
            .checked_sub(self.amount_band)?
            .max(Decimal::ZERO)
            .min(scaled_down);
        let upper = magnitude.checked_add(self.amount_band)?.max(scaled_up);
        Some((lower, upper))
    }
}

/// Settings for a reconciliation run, usually read from `tally.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReconcileConfig {
    /// Where uploads are staged while being parsed.
    pub staging_dir: Option<PathBuf>,
    pub near_match: NearMatchTolerance,
}

impl ReconcileConfig {
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: ReconcileConfig = toml::from_str(text)?;
        config.near_match.validate()?;
        Ok(config)
    }

    pub fn resolved_staging_dir(&self) -> PathBuf {
        self.staging_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("tally-activity"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dollars(cents: i64) -> Money {
        Money::from_cents(cents)
    }

    #[test]
    fn empty_config_uses_defaults() {
        let config = ReconcileConfig::from_toml("").unwrap();
        assert_eq!(config, ReconcileConfig::default());
        assert_eq!(config.near_match.date_window_days, 1);
        assert_eq!(config.near_match.exact_amount_window_days, 2);
        assert_eq!(config.near_match.amount_band, Decimal::new(3, 0));
        assert_eq!(config.near_match.amount_ratio, Decimal::new(1, 1));
        assert!(!config.near_match.match_refunds);
        assert!(config.staging_dir.is_none());
    }

    #[test]
    fn partial_near_match_section() {
        let config = ReconcileConfig::from_toml(
            r#"
            staging_dir = "/var/tmp/tally"

            [near_match]
            date_window_days = 3
            amount_band = "5.00"
            "#,
        )
        .unwrap();
        assert_eq!(config.resolved_staging_dir(), PathBuf::from("/var/tmp/tally"));
        assert_eq!(config.near_match.date_window_days, 3);
        assert_eq!(config.near_match.exact_amount_window_days, 2);
        assert_eq!(config.near_match.amount_band, Decimal::new(5, 0));
        assert_eq!(config.near_match.amount_ratio, Decimal::new(1, 1));
    }

    #[test]
    fn invalid_tolerances_rejected() {
        let result = ReconcileConfig::from_toml("[near_match]\namount_band = \"-1\"\n");
        assert!(matches!(result, Err(ConfigError::InvalidTolerance(_))));

        let result = ReconcileConfig::from_toml("[near_match]\namount_ratio = \"1.0\"\n");
        assert!(matches!(result, Err(ConfigError::InvalidTolerance(_))));

        let result = ReconcileConfig::from_toml("[near_match]\namount_ratio = \"-0.1\"\n");
        assert!(matches!(result, Err(ConfigError::InvalidTolerance(_))));
    }

    #[test]
    fn unknown_keys_rejected() {
        let result = ReconcileConfig::from_toml("[near_match]\nfuzz = 2\n");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn default_staging_dir_is_under_temp() {
        let dir = ReconcileConfig::default().resolved_staging_dir();
        assert!(dir.starts_with(std::env::temp_dir()));
    }

    // ── amount band ───────────────────────────────────────────────────────────

    #[test]
    fn band_uses_dollars_for_small_amounts() {
        let tolerance = NearMatchTolerance::default();
        assert!(tolerance.amount_within_band(dollars(2687), dollars(2700)));
        assert!(tolerance.amount_within_band(dollars(3000), dollars(2700)));
        assert!(!tolerance.amount_within_band(dollars(3001), dollars(2700)));
        assert!(tolerance.amount_within_band(dollars(300), dollars(500)));
        assert!(!tolerance.amount_within_band(dollars(100), dollars(500)));
    }

    #[test]
    fn band_uses_ratio_for_large_amounts() {
        let tolerance = NearMatchTolerance::default();
        assert!(tolerance.amount_within_band(dollars(8217), dollars(8000)));
        assert!(tolerance.amount_within_band(dollars(8800), dollars(8000)));
        assert!(!tolerance.amount_within_band(dollars(8801), dollars(8000)));
        assert!(tolerance.amount_within_band(dollars(7200), dollars(8000)));
        assert!(!tolerance.amount_within_band(dollars(7199), dollars(8000)));
    }

    #[test]
    fn band_never_crosses_zero() {
        let tolerance = NearMatchTolerance::default();
        assert!(tolerance.amount_within_band(dollars(0), dollars(200)));
        assert!(!tolerance.amount_within_band(dollars(-100), dollars(200)));
    }

    #[test]
    fn refunds_have_no_band_by_default() {
        let tolerance = NearMatchTolerance::default();
        assert!(!tolerance.amount_within_band(dollars(-2687), dollars(-2700)));
        assert!(!tolerance.amount_within_band(dollars(-2700), dollars(-2700)));
        assert!(!tolerance.amount_within_band(dollars(2700), dollars(-2700)));
    }

    #[test]
    fn band_follows_sign_of_refunds_when_enabled() {
        let tolerance = NearMatchTolerance {
            match_refunds: true,
            ..NearMatchTolerance::default()
        };
        assert!(tolerance.amount_within_band(dollars(-2687), dollars(-2700)));
        assert!(!tolerance.amount_within_band(dollars(2700), dollars(-2700)));
    }

    #[test]
    fn match_refunds_from_toml() {
        let config = ReconcileConfig::from_toml("[near_match]\nmatch_refunds = true\n").unwrap();
        assert!(config.near_match.match_refunds);
    }

    #[test]
    fn band_overflow_is_not_a_match() {
        let tolerance = NearMatchTolerance::default();
        let huge = Money::from_decimal(Decimal::MAX);
        assert!(!tolerance.amount_within_band(huge, huge));
        assert!(!tolerance.amount_within_band(dollars(2700), huge));
    }
}
