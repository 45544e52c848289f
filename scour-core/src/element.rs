//! Linear triangle for the velocity-component diffusion system.
//!
//! Each velocity component is discretized with the 3-node constant-gradient
//! triangle:
//! - Shape functions `N_i = (a_i + b_i x + c_i y) / (2A)`
//! - Gradient matrix `B = [b1 b2 b3; c1 c2 c3] / (2A)` (constant per element)
//! - Element matrix `Ke = ν A BᵀB + diag(A/3)`
//!
//! # Known simplification
//!
//! The lumped-mass diagonal `A/3` stabilizes the otherwise purely diffusive
//! operator and stands in for the advection and pressure coupling the model omits.
//! This is not a Navier–Stokes discretization.

use crate::types::{Point2, DEGENERATE_AREA};
use nalgebra::{Matrix2x3, Matrix3};

/// 3-node flow triangle with a fixed kinematic viscosity.
#[derive(Debug, Clone, Copy)]
pub struct FlowTriangle {
    /// Kinematic viscosity ν (m²/s).
    viscosity: f64,
}

impl FlowTriangle {
    /// Create an element evaluator for the given kinematic viscosity.
    pub fn new(viscosity: f64) -> Self {
        Self { viscosity }
    }

    /// Unsigned triangle area.
    pub fn area(coords: &[Point2; 3]) -> f64 {
        let [p1, p2, p3] = coords;
        0.5 * ((p2.x - p1.x) * (p3.y - p1.y) - (p3.x - p1.x) * (p2.y - p1.y)).abs()
    }

    /// Shape function gradient coefficients `(b, c)`, cyclic in the vertices.
    pub fn gradient_coefficients(coords: &[Point2; 3]) -> ([f64; 3], [f64; 3]) {
        let [p1, p2, p3] = coords;
        let b = [p2.y - p3.y, p3.y - p1.y, p1.y - p2.y];
        let c = [p3.x - p2.x, p1.x - p3.x, p2.x - p1.x];
        (b, c)
    }

    /// Gradient matrix `B` (2×3) and area, or `None` for a degenerate triangle.
    pub fn gradient_matrix(coords: &[Point2; 3]) -> Option<(Matrix2x3<f64>, f64)> {
        let area = Self::area(coords);
        if area < DEGENERATE_AREA {
            return None;
        }

        let (b, c) = Self::gradient_coefficients(coords);
        let two_area = 2.0 * area;
        let grad = Matrix2x3::new(
            b[0], b[1], b[2],
            c[0], c[1], c[2],
        ) / two_area;

        Some((grad, area))
    }

    /// Element matrix, or `None` if the triangle is degenerate and must be skipped.
    pub fn stiffness(&self, coords: &[Point2; 3]) -> Option<Matrix3<f64>> {
        let (grad, area) = Self::gradient_matrix(coords)?;

        let mut ke: Matrix3<f64> = grad.transpose() * grad * (self.viscosity * area);

        // Lumped-mass stabilization
        let mass_diag = area / 3.0;
        for i in 0..3 {
            ke[(i, i)] += mass_diag;
        }

        Some(ke)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn unit_right_triangle() -> [Point2; 3] {
        [
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(0.0, 1.0),
        ]
    }

    #[test]
    fn test_area_unit_triangle() {
        assert_relative_eq!(FlowTriangle::area(&unit_right_triangle()), 0.5, epsilon = 1e-15);
    }

    #[test]
    fn test_area_ignores_orientation() {
        let [a, b, c] = unit_right_triangle();
        assert_relative_eq!(FlowTriangle::area(&[a, c, b]), 0.5, epsilon = 1e-15);
    }

    #[test]
    fn test_gradient_coefficients() {
        let (b, c) = FlowTriangle::gradient_coefficients(&unit_right_triangle());
        assert_eq!(b, [-1.0, 1.0, 0.0]);
        assert_eq!(c, [-1.0, 0.0, 1.0]);
    }

    #[test]
    fn test_stiffness_unit_triangle() {
        // ν = 1: BᵀB = [2 -1 -1; -1 1 0; -1 0 1], scaled by A = 0.5, plus A/3 on the diagonal
        let ke = FlowTriangle::new(1.0).stiffness(&unit_right_triangle()).unwrap();
        let mass = 0.5 / 3.0;
        let expected = Matrix3::new(
            1.0 + mass, -0.5, -0.5,
            -0.5, 0.5 + mass, 0.0,
            -0.5, 0.0, 0.5 + mass,
        );
        for i in 0..3 {
            for j in 0..3 {
                assert_relative_eq!(ke[(i, j)], expected[(i, j)], epsilon = 1e-14);
            }
        }
    }

    #[test]
    fn test_stiffness_symmetric() {
        let coords = [
            Point2::new(0.2, -0.1),
            Point2::new(1.7, 0.4),
            Point2::new(0.6, 1.3),
        ];
        let ke = FlowTriangle::new(1e-3).stiffness(&coords).unwrap();
        for i in 0..3 {
            for j in 0..3 {
                assert_relative_eq!(ke[(i, j)], ke[(j, i)], epsilon = 1e-15);
            }
        }
    }

    #[test]
    fn test_row_sums_equal_lumped_mass() {
        // The diffusion part annihilates constant fields, leaving A/3 per row
        let coords = [
            Point2::new(0.0, 0.0),
            Point2::new(2.0, 0.5),
            Point2::new(0.5, 1.5),
        ];
        let area = FlowTriangle::area(&coords);
        let ke = FlowTriangle::new(0.37).stiffness(&coords).unwrap();
        for i in 0..3 {
            let row_sum: f64 = (0..3).map(|j| ke[(i, j)]).sum();
            assert_relative_eq!(row_sum, area / 3.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_degenerate_triangle_skipped() {
        let collinear = [
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 1.0),
            Point2::new(2.0, 2.0),
        ];
        assert!(FlowTriangle::new(1.0).stiffness(&collinear).is_none());
        assert!(FlowTriangle::gradient_matrix(&collinear).is_none());
    }
}
