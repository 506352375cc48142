use std::collections::BTreeMap;
use crate::boundary::Extended;
use crate::grid::Grid;
use crate::reconstruction::Reconstruction;




/**
 * Which spatial terms a kernel evaluation should include. Unsplit updates
 * include all axes at once; dimensionally split updates sweep one axis at a
 * time.
 */
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Sweep {
    Unsplit,
    Axis(usize),
}




/**
 * Everything a kernel may read besides the ghost-padded field array. The
 * reconstruction is resolved from the solver configuration at setup, and
 * the padded array has enough guard zones for its stencil.
 */
pub struct KernelContext<'a> {
    pub grid: &'a Grid,
    pub aux: Option<&'a [f64]>,
    pub aux_global: &'a BTreeMap<String, f64>,
    pub reconstruction: &'a Reconstruction,
    pub dt: f64,
    pub t: f64,
    pub sweep: Sweep,
}




/**
 * Interface to the numerical update of a hyperbolic system (the flux,
 * reconstruction and Riemann solver machinery). The solver treats a kernel
 * as a black box: given a ghost-padded state, it yields the increment
 * `dq = dt * L(q)` over the interior zones, and the CFL number observed in
 * computing it.
 *
 * `dq` has the unpadded layout of [`State::q`](crate::state::State). The
 * returned CFL number must be non-negative; a non-finite value is treated
 * as a stability failure by the solver.
 */
pub trait Kernel {

    /// Human-readable name, used in log messages.
    fn name(&self) -> &str;

    /// Compute the increment for one sub-step (or one stage or sweep of a
    /// sub-step), and return the observed CFL number.
    fn increment(&mut self, q: &Extended, context: &KernelContext, dq: &mut [f64]) -> f64;
}
