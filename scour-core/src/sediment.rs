//! Shields-criterion scour estimate.
//!
//! The bed shear stress is compared against the submerged weight of a median
//! grain:
//!
//! ```text
//! θ = τ_max / ((ρ_s − ρ) g d50)
//! ```
//!
//! No scour develops while `θ ≤ θc` (θc = 0.05). Above the threshold, with the
//! excess ratio `e = (θ − θc) / θc` and pier diameter `D`:
//!
//! ```text
//! depth = min(max(2 · d50 · 1000 · e^0.6, 0.5 · D · √e), 3 · D)
//! ```
//!
//! The constants and exponents are empirical and are reproduced exactly.

use crate::error::{Error, Result};
use crate::types::{
    DEFAULT_D50, DEFAULT_PIER_DIAMETER, GRAVITY, MAX_SCOUR_DIAMETERS, SEDIMENT_DENSITY,
    SHIELDS_CRITICAL, WATER_DENSITY,
};
use serde::{Deserialize, Serialize};

/// Bed sediment and reference geometry for the scour estimate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SedimentParams {
    /// Median grain size d50 (m).
    pub d50: f64,
    /// Pier diameter used to scale and cap the scour depth (m).
    pub pier_diameter: f64,
}

impl SedimentParams {
    /// Create sediment parameters.
    ///
    /// # Errors
    ///
    /// Returns error if either value is not positive and finite.
    pub fn new(d50: f64, pier_diameter: f64) -> Result<Self> {
        let params = Self { d50, pier_diameter };
        params.validate()?;
        Ok(params)
    }

    /// Check that the grain size and pier diameter are usable.
    pub fn validate(&self) -> Result<()> {
        if !(self.d50.is_finite() && self.d50 > 0.0) {
            return Err(Error::InvalidParameter(format!(
                "d50 must be positive and finite, got {}",
                self.d50
            )));
        }
        if !(self.pier_diameter.is_finite() && self.pier_diameter > 0.0) {
            return Err(Error::InvalidParameter(format!(
                "pier diameter must be positive and finite, got {}",
                self.pier_diameter
            )));
        }
        Ok(())
    }

    /// Submerged grain weight scale `(ρ_s − ρ) g d50` (Pa).
    pub fn submerged_weight(&self) -> f64 {
        (SEDIMENT_DENSITY - WATER_DENSITY) * GRAVITY * self.d50
    }

    /// Upper bound on the scour depth (m).
    pub fn max_scour_depth(&self) -> f64 {
        MAX_SCOUR_DIAMETERS * self.pier_diameter
    }
}

impl Default for SedimentParams {
    fn default() -> Self {
        Self {
            d50: DEFAULT_D50,
            pier_diameter: DEFAULT_PIER_DIAMETER,
        }
    }
}

/// Scour estimate derived from the maximum pier shear stress.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScourResult {
    /// Maximum wall shear stress over the pier boundary (Pa).
    pub max_shear_stress: f64,
    /// Shields parameter θ.
    pub shields_parameter: f64,
    /// Critical Shields parameter θc.
    pub shields_critical: f64,
    /// `(θ − θc) / θc`, zero when no scour develops.
    pub excess_shields_ratio: f64,
    /// Equilibrium scour depth (m).
    pub scour_depth: f64,
    /// Pier diameter used for scaling (m).
    pub pier_diameter: f64,
}

impl ScourResult {
    /// Whether the bed is mobilized at the pier.
    pub fn is_scouring(&self) -> bool {
        self.scour_depth > 0.0
    }

    /// Scour depth in pier diameters.
    pub fn relative_depth(&self) -> f64 {
        self.scour_depth / self.pier_diameter
    }
}

/// Shields parameter for a bed shear stress.
pub fn shields_parameter(shear_stress: f64, params: &SedimentParams) -> f64 {
    shear_stress / params.submerged_weight()
}

/// Scour depth and excess ratio for a Shields parameter.
///
/// Returns `(0, 0)` at or below the critical value.
pub fn scour_depth_from_shields(shields: f64, params: &SedimentParams) -> (f64, f64) {
    if shields <= SHIELDS_CRITICAL {
        return (0.0, 0.0);
    }

    let excess = (shields - SHIELDS_CRITICAL) / SHIELDS_CRITICAL;
    let grain_scaled = 2.0 * params.d50 * 1000.0 * excess.powf(0.6);
    let pier_scaled = 0.5 * params.pier_diameter * excess.sqrt();
    let depth = grain_scaled.max(pier_scaled).min(params.max_scour_depth());

    (depth, excess)
}

/// Full scour estimate from the maximum pier shear stress.
///
/// A non-positive shear stress means no mobilization at all.
pub fn scour_from_shear(max_shear_stress: f64, params: &SedimentParams) -> ScourResult {
    let max_shear_stress = max_shear_stress.max(0.0);
    let shields = shields_parameter(max_shear_stress, params);

    let (scour_depth, excess_shields_ratio) = if max_shear_stress > 0.0 {
        scour_depth_from_shields(shields, params)
    } else {
        (0.0, 0.0)
    };

    if scour_depth > 0.0 {
        log::info!(
            "Scour: tau={:.3e} Pa, Shields={:.4} (critical {:.2}), depth={:.3} m ({:.2}D)",
            max_shear_stress,
            shields,
            SHIELDS_CRITICAL,
            scour_depth,
            scour_depth / params.pier_diameter
        );
    } else {
        log::info!(
            "No scour: tau={:.3e} Pa, Shields={:.4} below critical {:.2}",
            max_shear_stress,
            shields,
            SHIELDS_CRITICAL
        );
    }

    ScourResult {
        max_shear_stress,
        shields_parameter: shields,
        shields_critical: SHIELDS_CRITICAL,
        excess_shields_ratio,
        scour_depth,
        pier_diameter: params.pier_diameter,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_default_params() {
        let params = SedimentParams::default();
        assert_eq!(params.d50, 0.5e-3);
        assert_eq!(params.pier_diameter, 2.0);
        assert_eq!(params.max_scour_depth(), 6.0);
    }

    #[test]
    fn test_invalid_params() {
        assert!(SedimentParams::new(0.0, 2.0).is_err());
        assert!(SedimentParams::new(1e-3, -1.0).is_err());
        assert!(SedimentParams::new(f64::NAN, 2.0).is_err());
        assert!(SedimentParams::new(1e-3, 1.5).is_ok());
    }

    #[test]
    fn test_shields_parameter() {
        let params = SedimentParams::default();
        assert_relative_eq!(shields_parameter(8.09325, &params), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_threshold_exact_gives_no_scour() {
        let params = SedimentParams::default();
        let (depth, excess) = scour_depth_from_shields(SHIELDS_CRITICAL, &params);
        assert_eq!(depth, 0.0);
        assert_eq!(excess, 0.0);
    }

    #[test]
    fn test_just_above_threshold_scours() {
        let params = SedimentParams::default();
        let (depth, excess) = scour_depth_from_shields(SHIELDS_CRITICAL + 1e-9, &params);
        assert!(excess > 0.0);
        assert!(depth > 0.0);
    }

    #[test]
    fn test_pier_scaled_branch() {
        // θ = 0.1: e = 1, grain term 1e-3 m, pier term 0.5 * 2 * 1 = 1 m
        let params = SedimentParams::default();
        let (depth, excess) = scour_depth_from_shields(0.1, &params);
        assert_relative_eq!(excess, 1.0, epsilon = 1e-12);
        assert_relative_eq!(depth, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_grain_scaled_branch() {
        // Coarse grains and a slender pier make the grain term dominate
        let params = SedimentParams::new(0.1, 0.01).unwrap();
        let (depth, excess) = scour_depth_from_shields(0.1, &params);
        assert_relative_eq!(excess, 1.0, epsilon = 1e-12);
        // grain term: 2 * 0.1 * 1000 * 1 = 200 m, capped at 3 * 0.01
        assert_relative_eq!(depth, 0.03, epsilon = 1e-15);

        let params = SedimentParams::new(1e-3, 10.0).unwrap();
        // e = 0.1: grain term 2 * 0.1^0.6 ≈ 0.5024, pier term 5 * √0.1 ≈ 1.581
        let (depth, _) = scour_depth_from_shields(0.055, &params);
        assert_relative_eq!(depth, 5.0 * 0.1_f64.sqrt(), epsilon = 1e-9);
    }

    #[test]
    fn test_depth_capped_at_three_diameters() {
        let params = SedimentParams::default();
        let (depth, _) = scour_depth_from_shields(1e6, &params);
        assert_eq!(depth, 6.0);
    }

    #[test]
    fn test_scour_from_zero_shear() {
        let result = scour_from_shear(0.0, &SedimentParams::default());
        assert_eq!(result.scour_depth, 0.0);
        assert_eq!(result.shields_parameter, 0.0);
        assert_eq!(result.shields_critical, 0.05);
        assert!(!result.is_scouring());
    }

    #[test]
    fn test_scour_from_shear_above_threshold() {
        let params = SedimentParams::default();
        // τ = 0.1 × 8.09325 Pa gives θ ≈ 0.1
        let result = scour_from_shear(0.809325, &params);
        assert_relative_eq!(result.shields_parameter, 0.1, epsilon = 1e-12);
        assert_relative_eq!(result.scour_depth, 1.0, epsilon = 1e-9);
        assert_relative_eq!(result.relative_depth(), 0.5, epsilon = 1e-9);
        assert!(result.is_scouring());
    }

    #[test]
    fn test_scour_depth_monotone_in_shear() {
        let params = SedimentParams::default();
        let mut previous = 0.0;
        for i in 0..200 {
            let tau = i as f64 * 0.05;
            let depth = scour_from_shear(tau, &params).scour_depth;
            assert!(depth >= previous);
            assert!(depth <= params.max_scour_depth());
            previous = depth;
        }
    }
}
