use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use log::{debug, info, warn};
use crate::boundary::Extended;
use crate::error::Error;
use crate::geometry::BoundaryCondition;
use crate::kernel::{Kernel, KernelContext, Sweep};
use crate::reconstruction::Reconstruction;
use crate::solution::Solution;
use crate::state::State;

pub mod classic;
pub mod config;
pub mod implicit;
pub mod sharpclaw;

pub use config::{Limiter, SolverConfig, SolverKind, TimeIntegrator};




/**
 * The spatial treatment of one state, resolved from the configuration when
 * the solver is set up: the boundary condition pair and reflected field of
 * every axis, and the interface reconstruction handed to the kernel.
 */
#[derive(Clone, Debug)]
pub struct Spatial {
    pub faces: Vec<(BoundaryCondition, BoundaryCondition)>,
    pub normal: Vec<Option<usize>>,
    pub reconstruction: Reconstruction,
}




// ============================================================================
impl Spatial {

    pub fn from_config(config: &SolverConfig, ndim: usize, meqn: usize) -> Result<Self, Error> {
        let mut faces = Vec::with_capacity(ndim);

        for axis in 0..ndim {
            match (config.bc_lower.get(axis).cloned().flatten(), config.bc_upper.get(axis).cloned().flatten()) {
                (Some(lower), Some(upper)) => faces.push((lower, upper)),
                _ => return Err(Error::MissingAttributes(vec![format!("bc on axis {}", axis)])),
            }
        }
        let normal = (0..ndim).map(|axis| config.normal_component(axis, meqn)).collect();
        let reconstruction = config.reconstruction()?;
        Ok(Self { faces, normal, reconstruction })
    }
}




/**
 * Buffers owned by a stepper for one state of the solution: the ghost-padded
 * working array, the kernel increment, and any intermediate stages.
 */
pub struct Scratch {
    pub extended: Extended,
    pub dq: Vec<f64>,
    pub stages: Vec<Vec<f64>>,
}




// ============================================================================
impl Scratch {

    pub fn new(state: &State, num_ghost: usize, num_stages: usize) -> Self {
        Self {
            extended: Extended::zeros(state.meqn, &state.grid.shape(), num_ghost),
            dq: vec![0.0; state.q.len()],
            stages: vec![vec![0.0; state.q.len()]; num_stages],
        }
    }
}




/**
 * Extend `q` into the ghost-padded working array, and have the kernel
 * compute its increment into `dq`. Returns the observed CFL number.
 */
pub fn evaluate(
    kernel: &mut dyn Kernel,
    extended: &mut Extended,
    dq: &mut [f64],
    q: &[f64],
    state: &State,
    spatial: &Spatial,
    (dt, t): (f64, f64),
    sweep: Sweep,
) -> f64 {
    extended.fill(q, &spatial.faces, &spatial.normal);

    let context = KernelContext {
        grid: &state.grid,
        aux: state.aux.as_deref(),
        aux_global: &state.aux_global,
        reconstruction: &spatial.reconstruction,
        dt,
        t,
        sweep,
    };
    kernel.increment(extended, &context, dq)
}




/**
 * The result of attempting one sub-step on one state. `converged` is false
 * only for implicit steppers whose nonlinear solve failed.
 */
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Trial {
    pub cfl: f64,
    pub converged: bool,
    pub iterations: usize,
}




/**
 * The capability interface of the solver variants. A stepper owns scratch
 * buffers between `setup` and `teardown`, and computes candidate states
 * without touching the solution.
 */
pub trait Stepper {

    fn name(&self) -> &'static str;

    /// Allocate scratch buffers for every state of the solution.
    fn setup(&mut self, solution: &Solution, config: &SolverConfig) -> Result<(), Error>;

    /// Compute into `candidate` the state `index` advanced by `dt`.
    fn attempt(
        &mut self,
        index: usize,
        state: &State,
        config: &SolverConfig,
        kernel: &mut dyn Kernel,
        dt: f64,
        candidate: &mut [f64],
    ) -> Trial;

    /// Release the scratch buffers. Must be safe to call repeatedly.
    fn teardown(&mut self);
}

fn stepper_for(kind: SolverKind) -> Box<dyn Stepper> {
    match kind {
        SolverKind::Classic => Box::new(classic::Classic::new()),
        SolverKind::SharpClaw => Box::new(sharpclaw::SharpClaw::new()),
        SolverKind::ImplicitSharpClaw => Box::new(implicit::BackwardEuler::new()),
    }
}




/**
 * Lifecycle of a solver. `Stepping` is only observable from within hooks or
 * kernels, and if an evolve call was abandoned by a panic.
 */
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Uninitialized,
    Ready,
    Stepping,
    TornDown,
}




/**
 * What an evolve call should advance the solution to: a target time, or a
 * number of accepted sub-steps.
 */
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Target {
    Time(f64),
    Steps(usize),
}




/**
 * The outcome of one sub-step attempt over the whole solution.
 */
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StepOutcome {
    pub accepted: bool,
    pub cfl: f64,
    pub dt: f64,
}




#[derive(Clone, Copy, Debug, Default, PartialEq)]

/**
 * Summary of an evolve call: the time reached, the number of accepted and
 * rejected sub-steps, and the step size proposed for the next sub-step.
 */
pub struct EvolveSummary {
    pub t: f64,
    pub accepted: usize,
    pub rejected: usize,
    pub dt: f64,
    pub cfl: f64,
}




#[derive(Clone, Copy, Debug, PartialEq)]

/**
 * Running totals across all evolve calls since setup. `iterations` sums the
 * iterations of every sub-step attempt: one per attempt for the explicit
 * steppers, and the nonlinear iterations for the implicit one.
 */
pub struct Statistics {
    pub accepted: usize,
    pub rejected: usize,
    pub iterations: usize,
    pub smallest_dt: f64,
    pub largest_dt: f64,
}

impl Default for Statistics {
    fn default() -> Self {
        Self {
            accepted: 0,
            rejected: 0,
            iterations: 0,
            smallest_dt: f64::INFINITY,
            largest_dt: 0.0,
        }
    }
}




/**
 * Advances a solution in time by repeated sub-steps, adapting the step size
 * to keep the observed CFL number near `cfl_desired` and never above
 * `cfl_max`. Sub-steps which violate the CFL bound (or whose implicit solve
 * fails to converge) are discarded and retried with a smaller step.
 *
 * The step size policy is the same for every solver kind: after a sub-step
 * with CFL number `c` at step size `dt`, the next step size is
 * `dt * min(max_growth, cfl_desired / c)`, clamped to `[dt_min, dt_max]`.
 */
pub struct Solver {
    config: SolverConfig,
    kernel: Box<dyn Kernel>,
    stepper: Box<dyn Stepper>,
    phase: Phase,
    dt: f64,
    candidates: Vec<Vec<f64>>,
    interrupt: Option<Arc<AtomicBool>>,
    statistics: Statistics,
}




// ============================================================================
impl Solver {

    pub fn new(config: SolverConfig, kernel: Box<dyn Kernel>) -> Self {
        let stepper = stepper_for(config.kind);
        let dt = config.dt_initial;
        Self {
            config,
            kernel,
            stepper,
            phase: Phase::Uninitialized,
            dt,
            candidates: Vec::new(),
            interrupt: None,
            statistics: Statistics::default(),
        }
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// The step size that the next sub-step will attempt.
    pub fn dt(&self) -> f64 {
        self.dt
    }

    pub fn statistics(&self) -> Statistics {
        self.statistics
    }

    /**
     * Share a flag which, once raised, aborts the evolve call in progress
     * after its current sub-step attempt.
     */
    pub fn set_interrupt(&mut self, flag: Arc<AtomicBool>) {
        self.interrupt = Some(flag);
    }

    /**
     * Check the configuration against a problem of the given dimension.
     */
    pub fn validate(&self, ndim: usize) -> Result<(), Error> {
        self.config.validate(ndim)
    }

    /**
     * Validate the configuration, and allocate the scratch buffers for the
     * given solution. Must be called once before stepping, and matched by a
     * call to [`Solver::teardown`].
     */
    pub fn setup(&mut self, solution: &Solution) -> Result<(), Error> {
        if let Phase::Ready | Phase::Stepping = self.phase {
            return Err(Error::InvalidConfiguration("solver is already set up".into()));
        }
        if !solution.is_valid() {
            return Err(Error::InvalidConfiguration("solution is not valid".into()));
        }
        self.config.validate(solution.ndim())?;

        for state in &solution.states {
            if state.grid.shape().iter().any(|&n| n < self.config.num_ghost) {
                return Err(Error::Configuration(format!(
                    "grid of shape {:?} is too small for {} guard zones",
                    state.grid.shape(),
                    self.config.num_ghost
                )));
            }
        }
        self.stepper.setup(solution, &self.config)?;
        self.candidates = solution.states.iter().map(|s| vec![0.0; s.q.len()]).collect();
        self.dt = self.config.dt_initial;
        self.statistics = Statistics::default();
        self.phase = Phase::Ready;

        info!(
            "{} solver ready with {} kernel: {} state(s), dt={}",
            self.stepper.name(),
            self.kernel.name(),
            solution.states.len(),
            self.dt
        );
        Ok(())
    }

    /**
     * Release scratch buffers. Calling this more than once, or without a
     * prior call to setup, does nothing.
     */
    pub fn teardown(&mut self) {
        if let Phase::Ready | Phase::Stepping = self.phase {
            self.stepper.teardown();
            self.candidates = Vec::new();
            self.phase = Phase::TornDown;
            debug!("{} solver torn down", self.stepper.name());
        }
    }

    /**
     * Advance the solution to `target_time`, by as many sub-steps as it
     * takes. A target at or before the current time is a no-op.
     */
    pub fn evolve_to_time(&mut self, solution: &mut Solution, target_time: f64) -> Result<EvolveSummary, Error> {
        self.evolve_with(solution, Target::Time(target_time), &mut |_| {})
    }

    /**
     * Advance the solution by `num_steps` accepted sub-steps, irrespective
     * of the time reached.
     */
    pub fn evolve_steps(&mut self, solution: &mut Solution, num_steps: usize) -> Result<EvolveSummary, Error> {
        self.evolve_with(solution, Target::Steps(num_steps), &mut |_| {})
    }

    /**
     * Advance the solution to the target, calling `observer` after every
     * accepted sub-step.
     */
    pub fn evolve_with(
        &mut self,
        solution: &mut Solution,
        target: Target,
        observer: &mut dyn FnMut(&Solution),
    ) -> Result<EvolveSummary, Error> {
        self.check_ready(solution)?;
        self.phase = Phase::Stepping;
        let result = self.substeps(solution, target, observer);
        self.phase = Phase::Ready;
        result
    }

    fn check_ready(&self, solution: &Solution) -> Result<(), Error> {
        if self.phase != Phase::Ready {
            return Err(Error::InvalidConfiguration(format!("solver cannot step while {:?}", self.phase)));
        }
        let matches = solution.states.len() == self.candidates.len()
            && solution.states.iter().zip(&self.candidates).all(|(s, c)| s.q.len() == c.len());

        if !matches {
            return Err(Error::InvalidConfiguration(
                "solution does not match the one the solver was set up with".into(),
            ));
        }
        Ok(())
    }

    fn substeps(
        &mut self,
        solution: &mut Solution,
        target: Target,
        observer: &mut dyn FnMut(&Solution),
    ) -> Result<EvolveSummary, Error> {
        let mut summary = EvolveSummary {
            t: solution.t(),
            dt: self.dt,
            ..EvolveSummary::default()
        };
        let mut attempts = 0;

        loop {
            let t = solution.t();

            let (dt, landing) = match target {
                Target::Time(tend) if t >= tend => break,
                Target::Steps(n) if summary.accepted >= n => break,
                Target::Time(tend) => Self::truncated(self.dt, t, tend),
                Target::Steps(_) => (self.dt, None),
            };
            if attempts >= self.config.max_steps {
                return Err(Error::StepLimitExceeded {
                    max_steps: self.config.max_steps,
                    t,
                });
            }
            attempts += 1;

            let outcome = self.step(solution, dt, landing)?;
            summary.cfl = outcome.cfl;

            if outcome.accepted {
                summary.accepted += 1;
                observer(solution);
            } else {
                summary.rejected += 1;
            }
            if let Some(flag) = &self.interrupt {
                if flag.load(Ordering::SeqCst) {
                    return Err(Error::Interrupted { t: solution.t() });
                }
            }
        }
        summary.t = solution.t();
        summary.dt = self.dt;
        Ok(summary)
    }

    /**
     * Shorten the step if it would overshoot `tend` (or leave a sliver
     * behind), in which case the sub-step lands exactly on `tend`.
     */
    fn truncated(dt: f64, t: f64, tend: f64) -> (f64, Option<f64>) {
        let remaining = tend - t;
        if dt >= remaining || remaining - dt <= 1e-14 * t.abs().max(1.0) {
            (remaining, Some(tend))
        } else {
            (dt, None)
        }
    }

    /**
     * Attempt a single sub-step of size `dt` on every state; commit it if
     * the CFL bound holds, and adapt the step size either way. A sub-step
     * which is truncated to land on a target carries the time `landing`.
     */
    fn step(&mut self, solution: &mut Solution, dt: f64, landing: Option<f64>) -> Result<StepOutcome, Error> {
        let t = solution.t();
        let trial = self.attempt(solution, dt);
        self.statistics.iterations += trial.iterations;

        if trial.converged && trial.cfl <= self.config.cfl_max {
            for (state, candidate) in solution.states.iter_mut().zip(&self.candidates) {
                state.q.copy_from_slice(candidate);
            }
            if let (Some(hook), true) = (&self.config.source, self.config.src_split > 0) {
                for state in &mut solution.states {
                    (hook.0)(state, t, dt);
                }
            }
            solution.set_t(landing.unwrap_or(t + dt));

            self.statistics.accepted += 1;
            self.statistics.smallest_dt = self.statistics.smallest_dt.min(dt);
            self.statistics.largest_dt = self.statistics.largest_dt.max(dt);

            if self.config.dt_variable {
                // The CFL number scales with the step size, so a truncated
                // step still predicts the CFL number of the full one.
                let cfl = trial.cfl * self.dt / dt;
                self.dt = self.grown(self.dt, cfl);
            }
            debug!("accepted sub-step t={:.6} dt={:.3e} cfl={:.4} next dt={:.3e}", solution.t(), dt, trial.cfl, self.dt);
            Ok(StepOutcome { accepted: true, cfl: trial.cfl, dt: self.dt })
        } else {
            self.statistics.rejected += 1;

            let shrunk = dt * self.shrink_ratio(&trial);

            if !self.config.dt_variable || !(shrunk >= self.config.dt_min) {
                return Err(Error::CflToleranceExceeded {
                    dt,
                    cfl: trial.cfl,
                    dt_min: self.config.dt_min,
                });
            }
            self.dt = shrunk.min(self.config.dt_max);

            warn!(
                "rejected sub-step at t={:.6}: cfl={:.4} converged={} dt={:.3e} -> {:.3e}",
                t, trial.cfl, trial.converged, dt, self.dt
            );
            Ok(StepOutcome { accepted: false, cfl: trial.cfl, dt: self.dt })
        }
    }

    fn attempt(&mut self, solution: &mut Solution, dt: f64) -> Trial {
        if let Some(hook) = &self.config.start_step {
            for state in &mut solution.states {
                (hook.0)(state);
            }
        }
        let mut trial = Trial { cfl: 0.0, converged: true, iterations: 0 };

        for (index, state) in solution.states.iter().enumerate() {
            let part = self.stepper.attempt(
                index,
                state,
                &self.config,
                self.kernel.as_mut(),
                dt,
                &mut self.candidates[index],
            );
            if part.cfl.is_finite() {
                trial.cfl = trial.cfl.max(part.cfl);
            } else {
                trial.cfl = f64::INFINITY;
                trial.converged = false;
            }
            trial.converged &= part.converged;
            trial.iterations += part.iterations;
        }
        trial
    }

    fn grown(&self, dt: f64, cfl: f64) -> f64 {
        let ratio = if cfl > 0.0 { self.config.cfl_desired / cfl } else { f64::INFINITY };
        (dt * ratio.min(self.config.max_growth))
            .max(self.config.dt_min)
            .min(self.config.dt_max)
    }

    /**
     * Factor by which to shrink the step size of a rejected sub-step. A CFL
     * violation shrinks by `cfl_desired / cfl`, which is less than one; a
     * failed nonlinear solve shrinks at least by `divergence_shrink`.
     */
    fn shrink_ratio(&self, trial: &Trial) -> f64 {
        let ratio = if trial.cfl.is_finite() && trial.cfl > 0.0 {
            self.config.cfl_desired / trial.cfl
        } else {
            self.config.divergence_shrink
        };
        if trial.converged {
            ratio.min(1.0)
        } else {
            ratio.min(self.config.divergence_shrink)
        }
    }
}




// ============================================================================
impl Drop for Solver {
    fn drop(&mut self) {
        self.teardown()
    }
}
