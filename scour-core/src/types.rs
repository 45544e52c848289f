//! Core data types and fixed physical constants.
//!
//! All constants here are read-only and shared by every solve. The sediment and
//! wall-function constants are empirical engineering choices and must be reproduced
//! exactly for numerical parity with existing scour estimates.

use nalgebra::Vector2;

/// A point in the 2-D flow plane.
pub type Point2 = Vector2<f64>;

/// A 2-D vector (velocity, direction).
pub type Vec2 = Vector2<f64>;

/// Coordinate tolerance for the inlet, outlet and wall boundary tests.
pub const BOUNDARY_TOLERANCE: f64 = 1e-6;

/// Elements with a smaller area contribute nothing to the global system.
pub const DEGENERATE_AREA: f64 = 1e-12;

/// Neighbors closer than this to a wall node are ignored for gradient estimation.
pub const MIN_NEIGHBOR_DISTANCE: f64 = 1e-10;

/// Fraction of the pier radius inside which grid nodes are removed.
pub const PIER_EXCLUSION_FACTOR: f64 = 0.8;

/// Half-width of the pier boundary band, as a fraction of the pier radius.
pub const PIER_BAND_FACTOR: f64 = 0.2;

/// Water density ρ (kg/m³).
pub const WATER_DENSITY: f64 = 1000.0;

/// Sediment grain density ρ_s (kg/m³).
pub const SEDIMENT_DENSITY: f64 = 2650.0;

/// Gravitational acceleration g (m/s²).
pub const GRAVITY: f64 = 9.81;

/// Critical Shields parameter for the onset of sediment motion.
pub const SHIELDS_CRITICAL: f64 = 0.05;

/// Default median grain size d50 (m).
pub const DEFAULT_D50: f64 = 0.5e-3;

/// Reference pier diameter used for scour scaling when none is supplied (m).
pub const DEFAULT_PIER_DIAMETER: f64 = 2.0;

/// Maximum scour depth, in pier diameters.
pub const MAX_SCOUR_DIAMETERS: f64 = 3.0;

/// Additive constant in the log-law friction coefficient `cf = 2 / (log10(y+) + B)²`.
pub const LOG_LAW_OFFSET: f64 = 5.2;

/// Euclidean distance between two points.
#[inline]
pub fn distance(a: &Point2, b: &Point2) -> f64 {
    (b - a).norm()
}
