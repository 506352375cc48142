use crate::error::Error;
use crate::kernel::{Kernel, Sweep};
use crate::solution::Solution;
use crate::state::State;
use super::{evaluate, Scratch, SolverConfig, Spatial, Stepper, Trial};




/**
 * Single-stage explicit update, in the style of the classic wave
 * propagation algorithms: the kernel returns the complete increment of one
 * step. With dimensional splitting, the kernel is swept along each axis in
 * turn, and the guard zones are refreshed between sweeps.
 */
pub struct Classic {
    scratch: Vec<Scratch>,
    spatial: Vec<Spatial>,
}




// ============================================================================
impl Classic {
    pub fn new() -> Self {
        Self {
            scratch: Vec::new(),
            spatial: Vec::new(),
        }
    }
}

impl Default for Classic {
    fn default() -> Self {
        Self::new()
    }
}




// ============================================================================
impl Stepper for Classic {

    fn name(&self) -> &'static str {
        "classic"
    }

    fn setup(&mut self, solution: &Solution, config: &SolverConfig) -> Result<(), Error> {
        self.spatial = solution
            .states
            .iter()
            .map(|s| Spatial::from_config(config, s.grid.ndim(), s.meqn))
            .collect::<Result<_, _>>()?;
        self.scratch = solution
            .states
            .iter()
            .map(|s| Scratch::new(s, config.num_ghost, 0))
            .collect();
        Ok(())
    }

    fn attempt(
        &mut self,
        index: usize,
        state: &State,
        config: &SolverConfig,
        kernel: &mut dyn Kernel,
        dt: f64,
        candidate: &mut [f64],
    ) -> Trial {
        let Scratch { extended, dq, .. } = &mut self.scratch[index];
        let spatial = &self.spatial[index];
        let ndim = state.grid.ndim();

        let sweeps: Vec<Sweep> = if config.dim_split && ndim > 1 {
            (0..ndim).map(Sweep::Axis).collect()
        } else {
            vec![Sweep::Unsplit]
        };

        candidate.copy_from_slice(&state.q);
        let mut cfl: f64 = 0.0;

        for sweep in sweeps {
            let c = evaluate(kernel, extended, dq, candidate, state, spatial, (dt, state.t), sweep);
            cfl = if c.is_finite() { cfl.max(c) } else { f64::INFINITY };

            for (q, d) in candidate.iter_mut().zip(dq.iter()) {
                *q += d;
            }
        }
        Trial { cfl, converged: true, iterations: 1 }
    }

    fn teardown(&mut self) {
        self.scratch = Vec::new();
        self.spatial = Vec::new();
    }
}




// ============================================================================
#[cfg(test)]
mod test {

    use crate::boundary::Extended;
    use crate::geometry::BoundaryCondition::*;
    use crate::grid::{Dimension, Grid};
    use crate::kernel::{Kernel, KernelContext, Sweep};
    use crate::solution::Solution;
    use crate::solver::{Solver, SolverConfig};
    use crate::state::State;
    use std::sync::{Arc, Mutex};

    /**
     * Records the sweeps requested, and adds one to every zone per sweep.
     */
    struct SweepRecorder {
        sweeps: Arc<Mutex<Vec<Sweep>>>,
    }

    impl Kernel for SweepRecorder {
        fn name(&self) -> &str {
            "sweeps"
        }

        fn increment(&mut self, _: &Extended, context: &KernelContext, dq: &mut [f64]) -> f64 {
            self.sweeps.lock().unwrap().push(context.sweep);
            dq.iter_mut().for_each(|x| *x = 1.0);
            0.5
        }
    }

    fn run(dim_split: bool) -> (Vec<Sweep>, Solution) {
        let sweeps = Arc::new(Mutex::new(Vec::new()));
        let grid = Grid::new(vec![Dimension::new("x", 0.0, 1.0, 4), Dimension::new("y", 0.0, 1.0, 4)]);
        let mut solution = Solution::new(State::new(grid, 3));
        let config = SolverConfig {
            mwaves: Some(3),
            dim_split,
            ..SolverConfig::classic().with_boundaries(2, Outflow, Reflecting)
        };
        let mut solver = Solver::new(config, Box::new(SweepRecorder { sweeps: sweeps.clone() }));
        solver.setup(&solution).unwrap();
        solver.evolve_steps(&mut solution, 1).unwrap();
        let sweeps = sweeps.lock().unwrap().clone();
        (sweeps, solution)
    }

    #[test]
    fn split_update_sweeps_each_axis() {
        let (sweeps, solution) = run(true);
        assert_eq!(sweeps, vec![Sweep::Axis(0), Sweep::Axis(1)]);
        assert!(solution.state().q.iter().all(|&q| q == 2.0));
    }

    #[test]
    fn unsplit_update_calls_kernel_once() {
        let (sweeps, solution) = run(false);
        assert_eq!(sweeps, vec![Sweep::Unsplit]);
        assert!(solution.state().q.iter().all(|&q| q == 1.0));
    }
}
