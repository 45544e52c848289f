//! End-to-end scour analysis.
//!
//! [`ScourSolver::solve`] runs the full pipeline for one [`FlowProblem`]:
//!
//! 1. Generate the channel mesh around the pier
//! 2. Assemble the 2N × 2N velocity system
//! 3. Apply inlet and no-slip conditions
//! 4. Factor and solve
//! 5. Recover the flow field, pier wall shear, and scour depth
//!
//! Nothing is cached between calls; [`ScourSolver::sweep`] solves independent
//! copies of a problem for several inlet velocities in parallel.

use std::path::Path;
use std::time::Instant;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::assembly::assemble;
use crate::boundary::apply_boundary_conditions;
use crate::config::FlowProblem;
use crate::error::Result;
use crate::mesh::{create_mesh, BoundaryKind, Mesh};
use crate::postprocess::{postprocess, FlowSolution, WallShear};
use crate::sediment::ScourResult;
use crate::solver::{select_solver, SolverConfig};
use crate::vtk::write_vtk_file;

/// Solve statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolveStats {
    pub n_nodes: usize,
    pub n_elements: usize,
    pub n_dofs: usize,
    /// DOFs fixed by Dirichlet conditions.
    pub constrained_dofs: usize,
    pub degenerate_elements: usize,
    pub classification_gaps: usize,
    pub orphan_nodes: usize,
    /// Pier nodes with a computable wall shear stress.
    pub pier_nodes_evaluated: usize,
    pub max_velocity: f64,
    /// Solver name used.
    pub solver: String,
    /// Wall-clock time in seconds.
    pub time_seconds: f64,
}

/// Result of one scour analysis.
#[derive(Debug, Clone)]
pub struct ScourAnalysis {
    pub mesh: Mesh,
    pub flow: FlowSolution,
    pub scour: ScourResult,
    pub wall_shear: WallShear,
    pub stats: SolveStats,
}

impl ScourAnalysis {
    /// Export mesh, velocity, and wall shear as legacy VTK.
    pub fn write_vtk(&self, path: impl AsRef<Path>) -> Result<()> {
        write_vtk_file(path, &self.mesh, &self.flow, Some(&self.wall_shear.nodal))
    }
}

/// Stateless driver for the scour pipeline.
#[derive(Debug, Clone, Default)]
pub struct ScourSolver {
    config: SolverConfig,
}

impl ScourSolver {
    pub fn new(config: SolverConfig) -> Self {
        Self { config }
    }

    /// Use the solver settings carried by a problem.
    pub fn for_problem(problem: &FlowProblem) -> Self {
        Self::new(problem.solver.clone())
    }

    /// Run the full pipeline for one problem.
    ///
    /// # Errors
    ///
    /// * [`crate::Error::InvalidParameter`] for invalid inputs
    /// * [`crate::Error::MeshConstruction`] if the pier leaves no usable mesh
    /// * [`crate::Error::SingularSystem`] if the factorization fails
    pub fn solve(&self, problem: &FlowProblem) -> Result<ScourAnalysis> {
        let start = Instant::now();
        problem.validate()?;

        let mesh = create_mesh(
            problem.domain_size(),
            problem.grid.nx,
            problem.grid.ny,
            problem.pier_center(),
            problem.pier.radius,
        )?;
        let diagnostics = mesh.diagnostics();
        log::debug!("Mesh built in {:.3}s", start.elapsed().as_secs_f64());

        let mut system = assemble(&mesh, problem.kinematic_viscosity)?;
        let constrained_dofs =
            apply_boundary_conditions(&mut system, &mesh, problem.inlet_velocity)?;
        log::debug!("System assembled in {:.3}s", start.elapsed().as_secs_f64());

        let solver = select_solver(&self.config, system.n_dofs());
        log::debug!("Solving {} DOFs with {}", system.n_dofs(), solver.name());
        let solution = solver.solve(&system.stiffness, &system.rhs)?;

        let n = mesh.n_nodes();
        let (velocity_x, velocity_y) = solution.split_at(n);
        let processed = postprocess(
            &mesh,
            velocity_x,
            velocity_y,
            problem.kinematic_viscosity,
            &problem.sediment,
        )?;

        let stats = SolveStats {
            n_nodes: n,
            n_elements: mesh.n_elements(),
            n_dofs: system.n_dofs(),
            constrained_dofs,
            degenerate_elements: system.degenerate_elements,
            classification_gaps: diagnostics.classification_gaps,
            orphan_nodes: diagnostics.orphan_nodes,
            pier_nodes_evaluated: processed.wall_shear.evaluated_nodes,
            max_velocity: processed.flow.max_velocity(),
            solver: solver.name().to_string(),
            time_seconds: start.elapsed().as_secs_f64(),
        };

        log::info!(
            "Solved {} nodes / {} elements in {:.3}s: max shear {:.3e} Pa, scour {:.3} m",
            stats.n_nodes,
            stats.n_elements,
            stats.time_seconds,
            processed.scour.max_shear_stress,
            processed.scour.scour_depth
        );
        if mesh.boundary_nodes(BoundaryKind::Pier).is_empty() {
            log::warn!("Mesh has no pier boundary nodes; scour estimate is zero");
        }

        Ok(ScourAnalysis {
            mesh,
            flow: processed.flow,
            scour: processed.scour,
            wall_shear: processed.wall_shear,
            stats,
        })
    }

    /// Solve the problem for each inlet velocity, in parallel.
    ///
    /// Results are returned in the order of `inlet_velocities`; one failure does
    /// not stop the others.
    pub fn sweep(
        &self,
        problem: &FlowProblem,
        inlet_velocities: &[f64],
    ) -> Vec<Result<ScourAnalysis>> {
        inlet_velocities
            .par_iter()
            .map(|&velocity| self.solve(&problem.with_inlet_velocity(velocity)))
            .collect()
    }
}
