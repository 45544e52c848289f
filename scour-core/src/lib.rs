//! Scour Core - bridge pier scour estimation
//!
//! Small finite element engine for steady 2-D viscous flow past a circular pier,
//! with a Shields-criterion estimate of the equilibrium scour depth:
//! - Structured triangle mesh with the pier cut out
//! - Parallel element evaluation using Rayon
//! - Sparse matrix operations (CSR format)
//! - Sparse and dense direct solvers
//! - Wall shear recovery, scour estimate, and legacy VTK export
//!
//! # Architecture
//!
//! One solve runs through these stages, each in its own module:
//!
//! - [`mesh::create_mesh`]: nodes, triangles, and boundary classification
//! - [`assembly::assemble`]: 2N × 2N system for both velocity components
//! - [`boundary::apply_boundary_conditions`]: inlet and no-slip rows
//! - [`Solver`] trait: linear system solution strategies
//! - [`postprocess::postprocess`]: flow field, wall shear, and [`ScourResult`]
//!
//! [`ScourSolver`] drives the whole pipeline from a [`FlowProblem`].
//!
//! # Example
//!
//! ```no_run
//! use scour_core::{FlowProblem, ScourSolver};
//!
//! let problem = FlowProblem::default();
//! let analysis = ScourSolver::for_problem(&problem).solve(&problem)?;
//! println!("scour depth: {:.2} m", analysis.scour.scour_depth);
//! analysis.write_vtk("flow.vtk")?;
//! # Ok::<(), scour_core::Error>(())
//! ```

pub mod types;
pub mod element;
pub mod mesh;
pub mod sparse;
pub mod assembly;
pub mod boundary;
pub mod solver;
pub mod sediment;
pub mod postprocess;
pub mod vtk;
pub mod config;
pub mod engine;
pub mod error;

pub use types::Point2;
pub use element::FlowTriangle;
pub use mesh::{create_mesh, BoundaryKind, Mesh, MeshDiagnostics};
pub use sparse::CsrMatrix;
pub use assembly::{assemble, LinearSystem};
pub use boundary::apply_boundary_conditions;
pub use solver::{Solver, SolverConfig, SolverType};
pub use sediment::{ScourResult, SedimentParams};
pub use postprocess::{postprocess, FlowSolution};
pub use config::FlowProblem;
pub use engine::{ScourAnalysis, ScourSolver, SolveStats};
pub use error::{Error, Result};
