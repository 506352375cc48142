//! Claw advances hyperbolic systems of conservation laws in time on
//! structured, rectilinear grids. A [`solver::Solver`] takes adaptive
//! sub-steps, keeping the CFL number of each one near a desired value and
//! retrying those which violate the stability bound with a smaller step. A
//! [`controller::Controller`] drives the solver through a sequence of output
//! checkpoints, writing snapshots, scalar diagnostics and gauge time series
//! along the way.
//!
//! The spatial discretization is a black box behind the [`kernel::Kernel`]
//! trait; [`kernels::shallow_water`] provides a Godunov kernel for the
//! shallow water equations, with the interface reconstruction of
//! [`reconstruction::Reconstruction`].

pub mod boundary;
pub mod controller;
pub mod error;
pub mod geometry;
pub mod grid;
pub mod io;
pub mod kernel;
pub mod kernels;
pub mod reconstruction;
pub mod solution;
pub mod solver;
pub mod state;

pub use controller::{Controller, RunStatus};
pub use error::Error;
pub use solution::Solution;
pub use solver::{Solver, SolverConfig, SolverKind, Target};
pub use state::State;
