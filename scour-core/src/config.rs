//! JSON configuration for pier scour problems.
//!
//! Every field has a default, so an empty object `{}` describes the reference
//! channel: 20 m × 10 m, 40 × 40 grid, a 1 m pier at (0, 5), 1.2 m/s inflow and
//! ν = 1e-6 m²/s.

use crate::error::{Error, Result};
use crate::mesh::validate_geometry;
use crate::sediment::SedimentParams;
use crate::solver::SolverConfig;
use crate::types::Point2;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Channel extent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DomainConfig {
    /// Streamwise length Lx (m), centered on x = 0
    pub length: f64,
    /// Channel width Ly (m), from y = 0
    pub height: f64,
}

impl Default for DomainConfig {
    fn default() -> Self {
        Self {
            length: 20.0,
            height: 10.0,
        }
    }
}

/// Structured grid resolution (nodes per direction).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridConfig {
    pub nx: usize,
    pub ny: usize,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self { nx: 40, ny: 40 }
    }
}

/// Circular pier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PierConfig {
    pub center_x: f64,
    pub center_y: f64,
    pub radius: f64,
}

impl Default for PierConfig {
    fn default() -> Self {
        Self {
            center_x: 0.0,
            center_y: 5.0,
            radius: 1.0,
        }
    }
}

fn default_inlet_velocity() -> f64 {
    1.2
}

fn default_viscosity() -> f64 {
    1e-6
}

/// Complete flow problem loaded from JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowProblem {
    #[serde(default)]
    pub domain: DomainConfig,
    #[serde(default)]
    pub grid: GridConfig,
    #[serde(default)]
    pub pier: PierConfig,
    /// Uniform inflow at x = -Lx/2 (m/s)
    #[serde(default = "default_inlet_velocity")]
    pub inlet_velocity: f64,
    /// Kinematic viscosity ν (m²/s)
    #[serde(default = "default_viscosity")]
    pub kinematic_viscosity: f64,
    #[serde(default)]
    pub sediment: SedimentParams,
    #[serde(default)]
    pub solver: SolverConfig,
}

impl Default for FlowProblem {
    fn default() -> Self {
        Self {
            domain: DomainConfig::default(),
            grid: GridConfig::default(),
            pier: PierConfig::default(),
            inlet_velocity: default_inlet_velocity(),
            kinematic_viscosity: default_viscosity(),
            sediment: SedimentParams::default(),
            solver: SolverConfig::default(),
        }
    }
}

impl FlowProblem {
    /// Parse and validate a problem from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let problem: FlowProblem = serde_json::from_str(json)?;
        problem.validate()?;
        Ok(problem)
    }

    /// Load and validate a problem from a JSON file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        let problem = Self::from_json_str(&contents)?;
        log::debug!("Loaded flow problem from {}", path.display());
        Ok(problem)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check every input before any mesh is built.
    pub fn validate(&self) -> Result<()> {
        validate_geometry(
            self.domain_size(),
            self.grid.nx,
            self.grid.ny,
            &self.pier_center(),
            self.pier.radius,
        )?;
        if !self.inlet_velocity.is_finite() {
            return Err(Error::InvalidParameter(format!(
                "inlet velocity must be finite, got {}",
                self.inlet_velocity
            )));
        }
        if !(self.kinematic_viscosity.is_finite() && self.kinematic_viscosity > 0.0) {
            return Err(Error::InvalidParameter(format!(
                "kinematic viscosity must be positive and finite, got {}",
                self.kinematic_viscosity
            )));
        }
        self.sediment.validate()
    }

    /// Same problem with a different inflow velocity.
    pub fn with_inlet_velocity(&self, inlet_velocity: f64) -> Self {
        Self {
            inlet_velocity,
            ..self.clone()
        }
    }

    pub fn domain_size(&self) -> (f64, f64) {
        (self.domain.length, self.domain.height)
    }

    pub fn pier_center(&self) -> Point2 {
        Point2::new(self.pier.center_x, self.pier.center_y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::SolverType;

    #[test]
    fn test_empty_json_is_reference_scenario() {
        let problem = FlowProblem::from_json_str("{}").unwrap();
        assert_eq!(problem, FlowProblem::default());
        assert_eq!(problem.domain_size(), (20.0, 10.0));
        assert_eq!((problem.grid.nx, problem.grid.ny), (40, 40));
        assert_eq!(problem.pier_center(), Point2::new(0.0, 5.0));
        assert_eq!(problem.pier.radius, 1.0);
        assert_eq!(problem.inlet_velocity, 1.2);
        assert_eq!(problem.kinematic_viscosity, 1e-6);
        assert_eq!(problem.sediment.d50, 0.5e-3);
    }

    #[test]
    fn test_partial_override() {
        let json = r#"{
            "grid": { "nx": 12, "ny": 8 },
            "inlet_velocity": 0.4,
            "sediment": { "d50": 0.002 },
            "solver": { "solver_type": "dense_lu" }
        }"#;
        let problem = FlowProblem::from_json_str(json).unwrap();
        assert_eq!(problem.grid, GridConfig { nx: 12, ny: 8 });
        assert_eq!(problem.inlet_velocity, 0.4);
        assert_eq!(problem.sediment.d50, 0.002);
        assert_eq!(problem.sediment.pier_diameter, 2.0);
        assert_eq!(problem.solver.solver_type, SolverType::DenseLu);
        assert_eq!(problem.domain, DomainConfig::default());
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(
            FlowProblem::from_json_str(r#"{ "domain": { "length": -20.0, "height": 10.0 } }"#),
            Err(Error::InvalidParameter(_))
        ));
        assert!(matches!(
            FlowProblem::from_json_str(r#"{ "kinematic_viscosity": -1.0 }"#),
            Err(Error::InvalidParameter(_))
        ));
        assert!(matches!(
            FlowProblem::from_json_str(r#"{ "sediment": { "d50": 0.0 } }"#),
            Err(Error::InvalidParameter(_))
        ));
        assert!(matches!(
            FlowProblem::from_json_str(r#"{ "inlet_velocity": "fast" }"#),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_with_inlet_velocity() {
        let base = FlowProblem::default();
        let slow = base.with_inlet_velocity(0.3);
        assert_eq!(slow.inlet_velocity, 0.3);
        assert_eq!(slow.grid, base.grid);
        assert_eq!(base.inlet_velocity, 1.2);
    }

    #[test]
    fn test_file_round_trip() {
        use tempfile::tempdir;

        let dir = tempdir().unwrap();
        let path = dir.path().join("problem.json");
        let mut problem = FlowProblem::default();
        problem.pier.radius = 0.75;
        problem.grid.nx = 21;
        fs::write(&path, problem.to_json_string().unwrap()).unwrap();

        let loaded = FlowProblem::from_file(&path).unwrap();
        assert_eq!(loaded, problem);
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = FlowProblem::from_file(dir.path().join("absent.json"));
        assert!(matches!(result, Err(Error::Io(_))));
    }
}
