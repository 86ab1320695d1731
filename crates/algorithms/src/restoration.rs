//! Tree planting estimate for recovering lost canopy

use serde::{Deserialize, Serialize};
use verdant_core::{Error, Result};

/// Restoration assumptions
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RestorationParams {
    /// Share of the lost area to replant, in [0, 1]
    pub recovery_fraction: f64,
    /// Canopy area of one mature tree in m²
    pub crown_m2_per_tree: f64,
}

impl Default for RestorationParams {
    fn default() -> Self {
        Self {
            recovery_fraction: 0.5,
            crown_m2_per_tree: 40.0,
        }
    }
}

impl RestorationParams {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.recovery_fraction) {
            return Err(Error::InvalidParameter {
                name: "recovery_fraction",
                value: self.recovery_fraction.to_string(),
                reason: "must be between 0 and 1".into(),
            });
        }
        if !self.crown_m2_per_tree.is_finite() || self.crown_m2_per_tree < 0.0 {
            return Err(Error::InvalidParameter {
                name: "crown_m2_per_tree",
                value: self.crown_m2_per_tree.to_string(),
                reason: "must be a non-negative number".into(),
            });
        }
        Ok(())
    }
}

/// Number of trees whose canopy covers the recoverable share of `loss_m2`.
///
/// Rounds down. A zero canopy area yields 0.
pub fn trees_needed(loss_m2: f64, params: &RestorationParams) -> Result<u64> {
    params.validate()?;
    if params.crown_m2_per_tree == 0.0 {
        return Ok(0);
    }
    let recoverable = loss_m2.max(0.0) * params.recovery_fraction;
    Ok((recoverable / params.crown_m2_per_tree).floor() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_assumptions() {
        assert_eq!(trees_needed(1_000.0, &RestorationParams::default()).unwrap(), 12);
        assert_eq!(trees_needed(79.9, &RestorationParams::default()).unwrap(), 0);
        assert_eq!(trees_needed(80.0, &RestorationParams::default()).unwrap(), 1);
    }

    #[test]
    fn zero_loss_needs_no_trees() {
        assert_eq!(trees_needed(0.0, &RestorationParams::default()).unwrap(), 0);
    }

    #[test]
    fn zero_canopy_yields_zero() {
        let params = RestorationParams {
            crown_m2_per_tree: 0.0,
            ..RestorationParams::default()
        };
        assert_eq!(trees_needed(5_000.0, &params).unwrap(), 0);
    }

    #[test]
    fn full_recovery() {
        let params = RestorationParams {
            recovery_fraction: 1.0,
            crown_m2_per_tree: 25.0,
        };
        assert_eq!(trees_needed(100.0, &params).unwrap(), 4);
    }

    #[test]
    fn out_of_range_parameters_are_rejected() {
        let params = RestorationParams {
            recovery_fraction: 1.5,
            ..RestorationParams::default()
        };
        assert!(trees_needed(10.0, &params).is_err());

        let params = RestorationParams {
            crown_m2_per_tree: -1.0,
            ..RestorationParams::default()
        };
        assert!(matches!(
            trees_needed(10.0, &params),
            Err(Error::InvalidParameter { name: "crown_m2_per_tree", .. })
        ));
    }
}
