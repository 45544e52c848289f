//! Flow recovery and wall shear estimation.
//!
//! After solving for the nodal velocities this module:
//! 1. Splits the DOF vector into velocity components and computes the magnitude
//! 2. Estimates the wall shear stress at every pier-boundary node from the velocity
//!    difference to its nearest mesh neighbor
//! 3. Feeds the maximum shear stress into the Shields scour estimate
//!
//! Pier nodes are evaluated in parallel; nodes without a usable neighbor are
//! skipped rather than treated as failures.

use crate::error::{Error, Result};
use crate::mesh::{BoundaryKind, Mesh};
use crate::sediment::{scour_from_shear, ScourResult, SedimentParams};
use crate::types::{distance, Vec2, LOG_LAW_OFFSET, MIN_NEIGHBOR_DISTANCE, WATER_DENSITY};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Nodal velocity field.
///
/// `velocity_magnitude[i] == sqrt(velocity_x[i]² + velocity_y[i]²)` for every node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowSolution {
    pub velocity_x: Vec<f64>,
    pub velocity_y: Vec<f64>,
    pub velocity_magnitude: Vec<f64>,
    /// Pressure is not solved by the diffusion model; kept zero for exporters.
    pub pressure: Option<Vec<f64>>,
}

impl FlowSolution {
    /// Build from velocity components, computing the magnitude.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Solver`] if the component lengths differ.
    pub fn from_components(velocity_x: Vec<f64>, velocity_y: Vec<f64>) -> Result<Self> {
        if velocity_x.len() != velocity_y.len() {
            return Err(Error::Solver(format!(
                "velocity components differ in length: {} vs {}",
                velocity_x.len(),
                velocity_y.len()
            )));
        }

        let velocity_magnitude = velocity_x
            .iter()
            .zip(&velocity_y)
            .map(|(u, v)| (u * u + v * v).sqrt())
            .collect();
        let pressure = Some(vec![0.0; velocity_x.len()]);

        Ok(Self {
            velocity_x,
            velocity_y,
            velocity_magnitude,
            pressure,
        })
    }

    /// Split a `2N` solution vector (x block then y block).
    pub fn from_dofs(solution: &[f64], n_nodes: usize) -> Result<Self> {
        if solution.len() != 2 * n_nodes {
            return Err(Error::Solver(format!(
                "solution has {} entries, expected {} for {} nodes",
                solution.len(),
                2 * n_nodes,
                n_nodes
            )));
        }
        let (x, y) = solution.split_at(n_nodes);
        Self::from_components(x.to_vec(), y.to_vec())
    }

    pub fn n_nodes(&self) -> usize {
        self.velocity_x.len()
    }

    /// Maximum velocity magnitude, zero for an empty field.
    pub fn max_velocity(&self) -> f64 {
        self.velocity_magnitude.iter().copied().fold(0.0, f64::max)
    }
}

/// Nearest mesh neighbor of a node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NeighborInfo {
    pub node: usize,
    pub distance: f64,
}

/// Closest node sharing an element with `node`.
///
/// Candidates are visited element by element (ascending element index) and vertex
/// by vertex; the first candidate at the minimum distance wins. Coincident nodes
/// (distance `<= 1e-10`) are ignored.
pub fn closest_neighbor(mesh: &Mesh, node_elements: &[usize], node: usize) -> Option<NeighborInfo> {
    let origin = mesh.node(node)?;
    let mut best: Option<NeighborInfo> = None;

    for &elem_idx in node_elements {
        for &candidate in &mesh.elements()[elem_idx] {
            if candidate == node {
                continue;
            }
            let Some(position) = mesh.node(candidate) else {
                continue;
            };
            let d = distance(origin, position);
            if d > MIN_NEIGHBOR_DISTANCE && best.map_or(true, |b| d < b.distance) {
                best = Some(NeighborInfo { node: candidate, distance: d });
            }
        }
    }

    best
}

/// Wall shear stress at one pier node given its neighbor.
///
/// Takes the larger of the normal and tangential velocity gradients towards the
/// neighbor, then raises the result to the log-law estimate when `y+ > 1`.
pub fn nodal_wall_shear(
    mesh: &Mesh,
    velocity_x: &[f64],
    velocity_y: &[f64],
    kinematic_viscosity: f64,
    node: usize,
    neighbor: NeighborInfo,
) -> f64 {
    let (Some(wall), Some(fluid)) = (mesh.node(node), mesh.node(neighbor.node)) else {
        return 0.0;
    };
    let d = neighbor.distance;

    let normal: Vec2 = (fluid - wall) / d;
    let tangent = Vec2::new(-normal.y, normal.x);

    let du = velocity_x[neighbor.node] - velocity_x[node];
    let dv = velocity_y[neighbor.node] - velocity_y[node];

    let gradient_normal = (du * normal.x + dv * normal.y) / d;
    let gradient_tangential = (du * tangent.x + dv * tangent.y).abs() / d;

    let mut shear = WATER_DENSITY * kinematic_viscosity * gradient_normal.max(gradient_tangential);

    let (un, vn) = (velocity_x[neighbor.node], velocity_y[neighbor.node]);
    let speed = (un * un + vn * vn).sqrt();
    if speed > 0.0 {
        let y_plus = d * speed / kinematic_viscosity;
        if y_plus > 1.0 {
            let cf = 2.0 / (y_plus.log10() + LOG_LAW_OFFSET).powi(2);
            let shear_log_law = 0.5 * WATER_DENSITY * cf * speed * speed;
            shear = shear.max(shear_log_law);
        }
    }

    shear
}

/// Wall shear stress over the pier boundary.
#[derive(Debug, Clone, PartialEq)]
pub struct WallShear {
    /// Per-node shear stress (Pa), zero away from the pier.
    pub nodal: Vec<f64>,
    /// Maximum over evaluated pier nodes, never negative.
    pub max: f64,
    /// Pier nodes that had a usable neighbor.
    pub evaluated_nodes: usize,
}

/// Estimate the wall shear stress at every pier-boundary node.
///
/// # Errors
///
/// Returns [`Error::Solver`] if the velocity vectors do not match the mesh, and
/// [`Error::InvalidParameter`] if the viscosity is not positive and finite.
pub fn wall_shear_stress(
    mesh: &Mesh,
    velocity_x: &[f64],
    velocity_y: &[f64],
    kinematic_viscosity: f64,
) -> Result<WallShear> {
    if !(kinematic_viscosity.is_finite() && kinematic_viscosity > 0.0) {
        return Err(Error::InvalidParameter(format!(
            "kinematic viscosity must be positive and finite, got {}",
            kinematic_viscosity
        )));
    }
    let n_nodes = mesh.n_nodes();
    if velocity_x.len() != n_nodes || velocity_y.len() != n_nodes {
        return Err(Error::Solver(format!(
            "velocity fields have {}/{} entries, mesh has {} nodes",
            velocity_x.len(),
            velocity_y.len(),
            n_nodes
        )));
    }

    let pier_nodes = mesh.boundary_nodes(BoundaryKind::Pier);
    let mut nodal = vec![0.0; n_nodes];
    if pier_nodes.is_empty() {
        return Ok(WallShear { nodal, max: 0.0, evaluated_nodes: 0 });
    }

    let adjacency = mesh.node_elements();

    let shears: Vec<(usize, Option<f64>)> = pier_nodes
        .par_iter()
        .map(|&node| {
            let shear = closest_neighbor(mesh, &adjacency[node], node).map(|neighbor| {
                nodal_wall_shear(mesh, velocity_x, velocity_y, kinematic_viscosity, node, neighbor)
            });
            (node, shear)
        })
        .collect();

    let mut max = 0.0_f64;
    let mut evaluated_nodes = 0;
    for (node, shear) in shears {
        if let Some(tau) = shear {
            nodal[node] = tau;
            max = max.max(tau);
            evaluated_nodes += 1;
        }
    }

    log::debug!(
        "Wall shear evaluated at {}/{} pier nodes, max {:.3e} Pa",
        evaluated_nodes,
        pier_nodes.len(),
        max
    );

    Ok(WallShear { nodal, max, evaluated_nodes })
}

/// Everything derived from one velocity solution.
#[derive(Debug, Clone)]
pub struct PostProcessed {
    pub flow: FlowSolution,
    pub scour: ScourResult,
    pub wall_shear: WallShear,
}

/// Recover the flow field, wall shear, and scour estimate.
///
/// When no pier node has a computable shear stress the result is a valid zero
/// scour, not an error.
pub fn postprocess(
    mesh: &Mesh,
    velocity_x: &[f64],
    velocity_y: &[f64],
    kinematic_viscosity: f64,
    sediment: &SedimentParams,
) -> Result<PostProcessed> {
    sediment.validate()?;
    let wall_shear = wall_shear_stress(mesh, velocity_x, velocity_y, kinematic_viscosity)?;
    if wall_shear.evaluated_nodes == 0 {
        log::warn!("No pier boundary node has a computable wall shear stress");
    }

    let flow = FlowSolution::from_components(velocity_x.to_vec(), velocity_y.to_vec())?;
    let scour = scour_from_shear(wall_shear.max, sediment);

    Ok(PostProcessed { flow, scour, wall_shear })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::create_mesh;
    use crate::types::Point2;
    use approx::assert_relative_eq;

    fn pier_mesh() -> Mesh {
        create_mesh((4.0, 4.0), 5, 5, Point2::new(0.0, 2.0), 1.0).unwrap()
    }

    #[test]
    fn test_magnitude_invariant() {
        let u = vec![3.0, -1.5, 0.0, 1e-7];
        let v = vec![4.0, 2.0, 0.0, -2e-7];
        let flow = FlowSolution::from_components(u, v).unwrap();
        for i in 0..flow.n_nodes() {
            let (u, v) = (flow.velocity_x[i], flow.velocity_y[i]);
            assert_eq!(flow.velocity_magnitude[i], (u * u + v * v).sqrt());
        }
        assert_relative_eq!(flow.max_velocity(), 5.0, epsilon = 1e-12);
        assert_eq!(flow.pressure.as_deref(), Some(&[0.0; 4][..]));
    }

    #[test]
    fn test_from_dofs_splits_blocks() {
        let flow = FlowSolution::from_dofs(&[1.0, 2.0, 3.0, 4.0], 2).unwrap();
        assert_eq!(flow.velocity_x, vec![1.0, 2.0]);
        assert_eq!(flow.velocity_y, vec![3.0, 4.0]);
        assert!(FlowSolution::from_dofs(&[1.0, 2.0, 3.0], 2).is_err());
    }

    #[test]
    fn test_closest_neighbor_first_on_ties() {
        // Node 0 has two neighbors at distance 1; node 1 is met first
        let nodes = vec![
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(0.0, 1.0),
        ];
        let mesh = Mesh::new(nodes, vec![[0, 1, 2]], vec![None; 3]).unwrap();
        let adjacency = mesh.node_elements();
        let neighbor = closest_neighbor(&mesh, &adjacency[0], 0).unwrap();
        assert_eq!(neighbor.node, 1);
        assert_relative_eq!(neighbor.distance, 1.0);
    }

    #[test]
    fn test_closest_neighbor_ignores_coincident_nodes() {
        let nodes = vec![
            Point2::new(0.0, 0.0),
            Point2::new(0.0, 0.0),
            Point2::new(0.0, 2.0),
        ];
        let mesh = Mesh::new(nodes, vec![[0, 1, 2]], vec![None; 3]).unwrap();
        let adjacency = mesh.node_elements();
        let neighbor = closest_neighbor(&mesh, &adjacency[0], 0).unwrap();
        assert_eq!(neighbor.node, 2);
    }

    #[test]
    fn test_isolated_node_has_no_neighbor() {
        let nodes = vec![
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(0.0, 1.0),
            Point2::new(5.0, 5.0),
        ];
        let mesh = Mesh::new(nodes, vec![[0, 1, 2]], vec![None; 4]).unwrap();
        let adjacency = mesh.node_elements();
        assert!(closest_neighbor(&mesh, &adjacency[3], 3).is_none());
    }

    #[test]
    fn test_nodal_shear_viscous_gradient() {
        // Wall at the origin, neighbor 0.5 m away along x, tangential flow
        let nodes = vec![
            Point2::new(0.0, 0.0),
            Point2::new(0.5, 0.0),
            Point2::new(0.0, 1.0),
        ];
        let mesh = Mesh::new(nodes, vec![[0, 1, 2]], vec![None; 3]).unwrap();
        let u = [0.0, 0.0, 0.0];
        let v = [0.0, 1e-6, 0.0];
        let neighbor = NeighborInfo { node: 1, distance: 0.5 };
        // y+ = 0.5 * 1e-6 / 1e-3 < 1, so only the viscous term applies
        let tau = nodal_wall_shear(&mesh, &u, &v, 1e-3, 0, neighbor);
        assert_relative_eq!(tau, 1000.0 * 1e-3 * 1e-6 / 0.5, epsilon = 1e-15);
    }

    #[test]
    fn test_nodal_shear_log_law() {
        let nodes = vec![
            Point2::new(0.0, 0.0),
            Point2::new(0.1, 0.0),
            Point2::new(0.0, 1.0),
        ];
        let mesh = Mesh::new(nodes, vec![[0, 1, 2]], vec![None; 3]).unwrap();
        let u = [0.0, 1.0, 0.0];
        let v = [0.0, 0.0, 0.0];
        let neighbor = NeighborInfo { node: 1, distance: 0.1 };
        let nu = 1e-6;
        let tau = nodal_wall_shear(&mesh, &u, &v, nu, 0, neighbor);

        // y+ = 1e5 gives cf = 2 / (5 + 5.2)^2
        let cf = 2.0 / (10.2_f64 * 10.2);
        let log_law = 0.5 * 1000.0 * cf;
        let viscous = 1000.0 * nu * 1.0 / 0.1;
        assert_relative_eq!(tau, log_law.max(viscous), max_relative = 1e-12);
    }

    #[test]
    fn test_log_law_speed_matches_velocity_magnitude() {
        let nodes = vec![
            Point2::new(0.0, 0.0),
            Point2::new(0.1, 0.0),
            Point2::new(0.0, 1.0),
        ];
        let mesh = Mesh::new(nodes, vec![[0, 1, 2]], vec![None; 3]).unwrap();
        let u = [0.0, 0.3, 0.0];
        let v = [0.0, 0.7, 0.0];
        let neighbor = NeighborInfo { node: 1, distance: 0.1 };
        let nu = 1e-6;
        let tau = nodal_wall_shear(&mesh, &u, &v, nu, 0, neighbor);

        let speed = FlowSolution::from_components(u.to_vec(), v.to_vec())
            .unwrap()
            .velocity_magnitude[1];
        let y_plus = 0.1 * speed / nu;
        let cf = 2.0 / (y_plus.log10() + LOG_LAW_OFFSET).powi(2);
        assert_eq!(tau, 0.5 * WATER_DENSITY * cf * speed * speed);
    }

    #[test]
    fn test_invalid_viscosity_rejected() {
        let mesh = pier_mesh();
        let n = mesh.n_nodes();
        let u = vec![1.0; n];
        let v = vec![0.0; n];
        for nu in [-1e-6, 0.0, f64::NAN] {
            assert!(matches!(
                wall_shear_stress(&mesh, &u, &v, nu),
                Err(Error::InvalidParameter(_))
            ));
            assert!(matches!(
                postprocess(&mesh, &u, &v, nu, &SedimentParams::default()),
                Err(Error::InvalidParameter(_))
            ));
        }
    }

    #[test]
    fn test_zero_field_zero_shear() {
        let mesh = pier_mesh();
        let zeros = vec![0.0; mesh.n_nodes()];
        let shear = wall_shear_stress(&mesh, &zeros, &zeros, 1e-6).unwrap();
        assert_eq!(shear.max, 0.0);
        assert_eq!(shear.evaluated_nodes, mesh.boundary_nodes(BoundaryKind::Pier).len());
        assert!(shear.nodal.iter().all(|&t| t == 0.0));
    }

    #[test]
    fn test_shear_only_on_pier_nodes() {
        let mesh = pier_mesh();
        let u: Vec<f64> = mesh.nodes().iter().map(|p| 0.1 * (p.x + 2.0)).collect();
        let v = vec![0.0; mesh.n_nodes()];
        let shear = wall_shear_stress(&mesh, &u, &v, 1e-6).unwrap();

        let pier = mesh.boundary_nodes(BoundaryKind::Pier);
        for (node, &tau) in shear.nodal.iter().enumerate() {
            if !pier.contains(&node) {
                assert_eq!(tau, 0.0);
            }
            assert!(tau >= 0.0);
        }
        let nodal_max = shear.nodal.iter().copied().fold(0.0, f64::max);
        assert_eq!(shear.max, nodal_max);
        assert!(shear.max > 0.0);
    }

    #[test]
    fn test_shear_length_mismatch() {
        let mesh = pier_mesh();
        let short = vec![0.0; 3];
        assert!(wall_shear_stress(&mesh, &short, &short, 1e-6).is_err());
    }

    #[test]
    fn test_postprocess_without_pier_nodes() {
        let nodes = vec![
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(0.0, 1.0),
        ];
        let mesh = Mesh::new(nodes, vec![[0, 1, 2]], vec![None; 3]).unwrap();
        let u = [1.0, 2.0, 3.0];
        let v = [0.0, 0.0, 0.0];
        let result = postprocess(&mesh, &u, &v, 1e-6, &SedimentParams::default()).unwrap();
        assert_eq!(result.wall_shear.evaluated_nodes, 0);
        assert_eq!(result.scour.max_shear_stress, 0.0);
        assert_eq!(result.scour.scour_depth, 0.0);
        assert_relative_eq!(result.flow.max_velocity(), 3.0);
    }
}
