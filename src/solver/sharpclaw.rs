use crate::error::Error;
use crate::kernel::{Kernel, Sweep};
use crate::solution::Solution;
use crate::state::State;
use super::{evaluate, Scratch, SolverConfig, Spatial, Stepper, TimeIntegrator, Trial};




/**
 * Explicit method-of-lines update: the kernel is treated as the spatial
 * operator `dt * L(q)`, and the stages are combined by a strong stability
 * preserving Runge-Kutta scheme. The CFL number of a sub-step is the
 * largest over its stages.
 */
pub struct SharpClaw {
    integrator: TimeIntegrator,
    scratch: Vec<Scratch>,
    spatial: Vec<Spatial>,
}




// ============================================================================
impl SharpClaw {
    pub fn new() -> Self {
        Self {
            integrator: TimeIntegrator::Ssp33,
            scratch: Vec::new(),
            spatial: Vec::new(),
        }
    }
}

impl Default for SharpClaw {
    fn default() -> Self {
        Self::new()
    }
}




/**
 * Set `out = a * q0 + b * (q1 + dq)`.
 */
fn combine(out: &mut [f64], a: f64, q0: &[f64], b: f64, q1: &[f64], dq: &[f64]) {
    for (o, ((q0, q1), dq)) in out.iter_mut().zip(q0.iter().zip(q1).zip(dq)) {
        *o = a * q0 + b * (q1 + dq);
    }
}

fn worst(a: f64, b: f64) -> f64 {
    if a.is_finite() && b.is_finite() {
        a.max(b)
    } else {
        f64::INFINITY
    }
}




// ============================================================================
impl Stepper for SharpClaw {

    fn name(&self) -> &'static str {
        "sharpclaw"
    }

    fn setup(&mut self, solution: &Solution, config: &SolverConfig) -> Result<(), Error> {
        self.integrator = config.time_integrator()?;
        self.spatial = solution
            .states
            .iter()
            .map(|s| Spatial::from_config(config, s.grid.ndim(), s.meqn))
            .collect::<Result<_, _>>()?;
        self.scratch = solution
            .states
            .iter()
            .map(|s| Scratch::new(s, config.num_ghost, 2))
            .collect();
        Ok(())
    }

    fn attempt(
        &mut self,
        index: usize,
        state: &State,
        _config: &SolverConfig,
        kernel: &mut dyn Kernel,
        dt: f64,
        candidate: &mut [f64],
    ) -> Trial {
        let Scratch { extended, dq, stages } = &mut self.scratch[index];
        let spatial = &self.spatial[index];
        let q0 = &state.q;
        let t = state.t;

        let cfl = match self.integrator {
            TimeIntegrator::Ssp33 => {
                let (s1, s2) = stages.split_at_mut(1);
                let (s1, s2) = (&mut s1[0], &mut s2[0]);

                let c1 = evaluate(kernel, extended, dq, q0, state, spatial, (dt, t), Sweep::Unsplit);
                combine(s1, 0.0, q0, 1.0, q0, dq);

                let c2 = evaluate(kernel, extended, dq, s1, state, spatial, (dt, t + dt), Sweep::Unsplit);
                combine(s2, 0.75, q0, 0.25, s1, dq);

                let c3 = evaluate(kernel, extended, dq, s2, state, spatial, (dt, t + 0.5 * dt), Sweep::Unsplit);
                combine(candidate, 1.0 / 3.0, q0, 2.0 / 3.0, s2, dq);

                worst(worst(c1, c2), c3)
            }
            _ => {
                let c = evaluate(kernel, extended, dq, q0, state, spatial, (dt, t), Sweep::Unsplit);
                combine(candidate, 0.0, q0, 1.0, q0, dq);
                worst(0.0, c)
            }
        };
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
    use crate::kernel::{Kernel, KernelContext};
    use crate::solver::test::solution;
    use crate::solver::{Solver, SolverConfig};

    /**
     * The linear decay operator `L(q) = -q`, with a CFL number of `dt`.
     */
    struct Decay;

    impl Kernel for Decay {
        fn name(&self) -> &str {
            "decay"
        }

        fn increment(&mut self, q: &Extended, context: &KernelContext, dq: &mut [f64]) -> f64 {
            let n = q.num_interior_zones();
            for zone in 0..n {
                dq[zone] = -context.dt * q.value(0, q.padded_index(zone));
            }
            context.dt
        }
    }

    fn decay(integrator: &str) -> f64 {
        let config = SolverConfig {
            mwaves: Some(1),
            time_integrator: integrator.into(),
            dt_initial: 0.1,
            dt_max: 0.1,
            ..SolverConfig::sharpclaw().with_boundaries(1, Outflow, Outflow)
        };
        let mut solution = solution();
        solution.state_mut().q.iter_mut().for_each(|q| *q = 1.0);

        let mut solver = Solver::new(config, Box::new(Decay));
        solver.setup(&solution).unwrap();
        solver.evolve_steps(&mut solution, 1).unwrap();
        solution.state().q[0]
    }

    #[test]
    fn forward_euler_stage_works() {
        assert!((decay("Euler") - 0.9).abs() < 1e-14);
    }

    #[test]
    fn ssp33_matches_third_order_taylor_series() {
        let h: f64 = 0.1;
        let taylor = 1.0 - h + h * h / 2.0 - h * h * h / 6.0;
        assert!((decay("SSP33") - taylor).abs() < 1e-14);
    }

    #[test]
    fn unknown_integrator_fails_setup() {
        let config = SolverConfig {
            mwaves: Some(1),
            time_integrator: "RK4".into(),
            ..SolverConfig::sharpclaw().with_boundaries(1, Outflow, Outflow)
        };
        let mut solver = Solver::new(config, Box::new(Decay));
        assert!(solver.setup(&solution()).is_err());
    }
}
