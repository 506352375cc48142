use log::debug;
use crate::error::Error;
use crate::kernel::{Kernel, Sweep};
use crate::solution::Solution;
use crate::state::State;
use super::{evaluate, Scratch, SolverConfig, Spatial, Stepper, Trial};




/**
 * Backward Euler update. Each sub-step solves the nonlinear system
 *
 * ```text
 * R(q) = q - q_old - dt * L(q) = 0
 * ```
 *
 * by nonlinear Richardson iteration, `q <- q - lambda * R(q)`, starting from
 * `q_old`. The solve converges when `max |R|` falls below
 * `snes_atol + snes_rtol * max |R_0|`. Failure to converge within
 * `snes_max_it` iterations, or a non-finite residual, is reported as a
 * non-converged trial, and the solver rejects the sub-step.
 */
pub struct BackwardEuler {
    scratch: Vec<Scratch>,
    spatial: Vec<Spatial>,
}




// ============================================================================
impl BackwardEuler {
    pub fn new() -> Self {
        Self {
            scratch: Vec::new(),
            spatial: Vec::new(),
        }
    }
}

impl Default for BackwardEuler {
    fn default() -> Self {
        Self::new()
    }
}




// ============================================================================
impl Stepper for BackwardEuler {

    fn name(&self) -> &'static str {
        "implicit-sharpclaw"
    }

    fn setup(&mut self, solution: &Solution, config: &SolverConfig) -> Result<(), Error> {
        config.time_integrator()?;
        self.spatial = solution
            .states
            .iter()
            .map(|s| Spatial::from_config(config, s.grid.ndim(), s.meqn))
            .collect::<Result<_, _>>()?;
        self.scratch = solution
            .states
            .iter()
            .map(|s| Scratch::new(s, config.num_ghost, 1))
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
        let Scratch { extended, dq, stages } = &mut self.scratch[index];
        let spatial = &self.spatial[index];
        let residual = &mut stages[0];
        let q_old = &state.q;

        candidate.copy_from_slice(q_old);

        let mut tolerance = config.snes_atol;
        let mut cfl = 0.0;

        for iteration in 0..config.snes_max_it {
            cfl = evaluate(kernel, extended, dq, candidate, state, spatial, (dt, state.t + dt), Sweep::Unsplit);

            let mut norm: f64 = 0.0;

            for (r, ((q, q0), d)) in residual.iter_mut().zip(candidate.iter().zip(q_old).zip(dq.iter())) {
                *r = q - q0 - d;
                norm = if r.is_finite() { norm.max(r.abs()) } else { f64::INFINITY };
            }
            if !norm.is_finite() || !cfl.is_finite() {
                debug!("nonlinear solve diverged after {} iterations", iteration + 1);
                return Trial { cfl, converged: false, iterations: iteration + 1 };
            }
            if iteration == 0 {
                tolerance += config.snes_rtol * norm;
            }
            if norm <= tolerance {
                return Trial { cfl, converged: true, iterations: iteration + 1 };
            }
            for (q, r) in candidate.iter_mut().zip(residual.iter()) {
                *q -= config.snes_damping * r;
            }
        }
        debug!("nonlinear solve did not converge in {} iterations", config.snes_max_it);
        Trial { cfl, converged: false, iterations: config.snes_max_it }
    }

    fn teardown(&mut self) {
        self.scratch = Vec::new();
        self.spatial = Vec::new();
    }
}
