use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use serde::Serialize;
use crate::error::Error;
use crate::geometry::BoundaryCondition;
use crate::reconstruction::Reconstruction;
use crate::state::State;

pub use crate::reconstruction::Limiter;




#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum SolverKind {
    Classic,
    SharpClaw,
    ImplicitSharpClaw,
}




// ============================================================================
impl FromStr for SolverKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "classic" => Ok(SolverKind::Classic),
            "sharpclaw" => Ok(SolverKind::SharpClaw),
            "implicit" | "implicit_sharpclaw" => Ok(SolverKind::ImplicitSharpClaw),
            _ => Err(Error::Configuration(format!("unknown solver type '{}'", s))),
        }
    }
}




/**
 * The time integration schemes understood by the steppers. Parsed from the
 * `time_integrator` name of the configuration.
 */
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimeIntegrator {
    Classic,
    Euler,
    Ssp33,
    BackwardEuler,
}




// ============================================================================
impl TimeIntegrator {

    pub fn parse(kind: SolverKind, name: &str) -> Result<Self, Error> {
        match (kind, name) {
            (SolverKind::Classic, "Classic") => Ok(TimeIntegrator::Classic),
            (SolverKind::SharpClaw, "Euler") => Ok(TimeIntegrator::Euler),
            (SolverKind::SharpClaw, "SSP33") => Ok(TimeIntegrator::Ssp33),
            (SolverKind::ImplicitSharpClaw, "BEuler") => Ok(TimeIntegrator::BackwardEuler),
            _ => Err(Error::Configuration(format!(
                "unrecognized time integrator '{}' for {:?} solver",
                name, kind
            ))),
        }
    }
}




/**
 * A user callback held by the configuration. Hooks are shared and never
 * mutated, so the configuration stays cheap to clone.
 */
pub struct Hook<F: ?Sized>(pub Arc<F>);

impl<F: ?Sized> Clone for Hook<F> {
    fn clone(&self) -> Self {
        Hook(self.0.clone())
    }
}

impl<F: ?Sized> fmt::Debug for Hook<F> {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(fmt, "Hook")
    }
}

/// Called on each state before every sub-step attempt.
pub type StartStepHook = Hook<dyn Fn(&mut State) + Send + Sync>;

/// Called on each state after an accepted sub-step, with the time at the
/// start of the sub-step and its size.
pub type SourceHook = Hook<dyn Fn(&mut State, f64, f64) + Send + Sync>;




#[derive(Clone, Debug, Serialize)]

/**
 * All the tunables of a solver. Constructed and validated once before a
 * run, never mutated during one. Attributes which have no sensible default
 * (the number of waves and the boundary conditions) are optional, so that
 * "not set" can be reported by [`SolverConfig::validate`].
 */
pub struct SolverConfig {
    pub kind: SolverKind,
    pub mwaves: Option<usize>,
    pub limiters: Vec<Limiter>,
    pub order: u32,
    pub lim_type: u32,
    pub weno_order: u32,
    pub dim_split: bool,
    pub time_integrator: String,
    pub num_ghost: usize,

    pub cfl_desired: f64,
    pub cfl_max: f64,
    pub dt_initial: f64,
    pub dt_min: f64,
    pub dt_max: f64,
    pub dt_variable: bool,
    pub max_growth: f64,
    pub max_steps: usize,

    pub bc_lower: Vec<Option<BoundaryCondition>>,
    pub bc_upper: Vec<Option<BoundaryCondition>>,

    /// Field negated by a reflecting boundary, per axis. Axes not listed
    /// here use field `axis + 1`, the momentum layout of the shallow water
    /// and Euler systems.
    pub normal_velocity: Vec<Option<usize>>,

    pub src_split: u32,

    pub snes_rtol: f64,
    pub snes_atol: f64,
    pub snes_max_it: usize,
    pub snes_damping: f64,
    pub divergence_shrink: f64,

    #[serde(skip)]
    pub start_step: Option<StartStepHook>,
    #[serde(skip)]
    pub source: Option<SourceHook>,
}




// ============================================================================
impl Default for SolverConfig {
    fn default() -> Self {
        Self::classic()
    }
}




// ============================================================================
impl SolverConfig {

    pub fn classic() -> Self {
        Self {
            kind: SolverKind::Classic,
            mwaves: None,
            limiters: vec![Limiter::MC],
            order: 2,
            lim_type: 2,
            weno_order: 5,
            dim_split: true,
            time_integrator: "Classic".to_string(),
            num_ghost: 2,
            cfl_desired: 0.9,
            cfl_max: 1.0,
            dt_initial: 0.1,
            dt_min: 1e-12,
            dt_max: 1e99,
            dt_variable: true,
            max_growth: 2.0,
            max_steps: 1000,
            bc_lower: Vec::new(),
            bc_upper: Vec::new(),
            normal_velocity: Vec::new(),
            src_split: 1,
            snes_rtol: 1e-8,
            snes_atol: 1e-12,
            snes_max_it: 50,
            snes_damping: 1.0,
            divergence_shrink: 0.5,
            start_step: None,
            source: None,
        }
    }

    pub fn sharpclaw() -> Self {
        Self {
            kind: SolverKind::SharpClaw,
            time_integrator: "SSP33".to_string(),
            num_ghost: 3,
            dim_split: false,
            ..Self::classic()
        }
    }

    pub fn implicit() -> Self {
        Self {
            kind: SolverKind::ImplicitSharpClaw,
            time_integrator: "BEuler".to_string(),
            num_ghost: 3,
            dim_split: false,
            cfl_desired: 2.45,
            cfl_max: 2.5,
            ..Self::classic()
        }
    }

    pub fn for_kind(kind: SolverKind) -> Self {
        match kind {
            SolverKind::Classic => Self::classic(),
            SolverKind::SharpClaw => Self::sharpclaw(),
            SolverKind::ImplicitSharpClaw => Self::implicit(),
        }
    }

    /**
     * Set the same boundary condition pair on every one of `ndim` axes.
     */
    pub fn with_boundaries(mut self, ndim: usize, lower: BoundaryCondition, upper: BoundaryCondition) -> Self {
        self.bc_lower = vec![Some(lower); ndim];
        self.bc_upper = vec![Some(upper); ndim];
        self
    }

    pub fn with_start_step<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut State) + Send + Sync + 'static,
    {
        let hook: Arc<dyn Fn(&mut State) + Send + Sync> = Arc::new(f);
        self.start_step = Some(Hook(hook));
        self
    }

    pub fn with_source<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut State, f64, f64) + Send + Sync + 'static,
    {
        let hook: Arc<dyn Fn(&mut State, f64, f64) + Send + Sync> = Arc::new(f);
        self.source = Some(Hook(hook));
        self
    }

    pub fn time_integrator(&self) -> Result<TimeIntegrator, Error> {
        TimeIntegrator::parse(self.kind, &self.time_integrator)
    }

    /**
     * Return one limiter per wave: a single limiter is applied to all waves,
     * otherwise there must be exactly one per wave.
     */
    pub fn mthlim(&self) -> Result<Vec<Limiter>, Error> {
        let mwaves = self
            .mwaves
            .ok_or_else(|| Error::MissingAttributes(vec!["mwaves".to_string()]))?;

        match self.limiters.len() {
            1 => Ok(vec![self.limiters[0]; mwaves]),
            n if n == mwaves => Ok(self.limiters.clone()),
            n => Err(Error::Configuration(format!(
                "{} limiters given, which is neither 1 nor mwaves={}",
                n, mwaves
            ))),
        }
    }

    /**
     * Resolve the interface reconstruction the kernels are to use. Order 1
     * is piecewise constant for every solver kind. At order 2 the classic
     * solver limits its slopes with `mthlim`, while the other kinds choose
     * by `lim_type`: 0 for unlimited slopes, 1 for `mthlim`, and 2 for WENO
     * of `weno_order` 3 or 5.
     */
    pub fn reconstruction(&self) -> Result<Reconstruction, Error> {
        let mthlim = self.mthlim()?;

        match (self.kind, self.order, self.lim_type) {
            (_, 1, _) => Ok(Reconstruction::PiecewiseConstant),
            (SolverKind::Classic, 2, _) => Ok(Reconstruction::Limited(mthlim)),
            (_, 2, 0) => Ok(Reconstruction::Limited(vec![Limiter::None; mthlim.len()])),
            (_, 2, 1) => Ok(Reconstruction::Limited(mthlim)),
            (_, 2, 2) => match self.weno_order {
                3 | 5 => Ok(Reconstruction::Weno(self.weno_order)),
                n => Err(Error::Configuration(format!("weno_order={} must be 3 or 5", n))),
            },
            (_, 2, n) => Err(Error::Configuration(format!("lim_type={} must be 0, 1 or 2", n))),
            (_, n, _) => Err(Error::Configuration(format!("order={} must be 1 or 2", n))),
        }
    }

    /**
     * The field negated by a reflecting boundary along the given axis, if
     * that field exists.
     */
    pub fn normal_component(&self, axis: usize, meqn: usize) -> Option<usize> {
        let m = match self.normal_velocity.get(axis) {
            Some(m) => *m,
            None => Some(axis + 1),
        };
        m.filter(|&m| m < meqn)
    }

    /**
     * Check that every required attribute is set for a problem with `ndim`
     * dimensions, and that the attributes are mutually consistent.
     */
    pub fn validate(&self, ndim: usize) -> Result<(), Error> {
        let mut missing = Vec::new();

        if self.mwaves.is_none() {
            missing.push("mwaves".to_string());
        }
        for axis in 0..ndim {
            if self.bc_lower.get(axis).cloned().flatten().is_none() {
                missing.push(format!("bc_lower[{}]", axis));
            }
            if self.bc_upper.get(axis).cloned().flatten().is_none() {
                missing.push(format!("bc_upper[{}]", axis));
            }
        }
        if !missing.is_empty() {
            return Err(Error::MissingAttributes(missing));
        }

        let invalid = |what: String| Err(Error::Configuration(what));

        let reconstruction = self.reconstruction()?;
        self.time_integrator()?;

        for axis in 0..ndim {
            if let (Some(lower), Some(upper)) = (self.bc_lower[axis], self.bc_upper[axis]) {
                if !BoundaryCondition::is_consistent_pair(lower, upper) {
                    return invalid(format!("periodic boundary on axis {} must be periodic on both faces", axis));
                }
            }
        }
        if self.mwaves == Some(0) {
            return invalid("mwaves must be positive".into());
        }
        if self.num_ghost < reconstruction.stencil_width() {
            return invalid(format!(
                "num_ghost={} is too few for {:?} reconstruction, which needs {}",
                self.num_ghost,
                reconstruction,
                reconstruction.stencil_width()
            ));
        }
        if !(self.cfl_desired > 0.0 && self.cfl_desired <= self.cfl_max) {
            return invalid(format!(
                "need 0 < cfl_desired <= cfl_max, got cfl_desired={} cfl_max={}",
                self.cfl_desired, self.cfl_max
            ));
        }
        if !(self.dt_min > 0.0 && self.dt_min <= self.dt_max) {
            return invalid(format!("need 0 < dt_min <= dt_max, got dt_min={} dt_max={}", self.dt_min, self.dt_max));
        }
        if !(self.dt_initial >= self.dt_min && self.dt_initial <= self.dt_max) {
            return invalid(format!("dt_initial={} is outside [dt_min, dt_max]", self.dt_initial));
        }
        if !(self.max_growth >= 1.0) {
            return invalid(format!("max_growth={} must be at least 1", self.max_growth));
        }
        if self.max_steps == 0 {
            return invalid("max_steps must be positive".into());
        }
        if self.kind == SolverKind::ImplicitSharpClaw {
            if self.snes_max_it == 0 {
                return invalid("snes_max_it must be positive".into());
            }
            if !(self.snes_damping > 0.0 && self.snes_damping <= 1.0) {
                return invalid(format!("snes_damping={} must lie in (0, 1]", self.snes_damping));
            }
            if !(self.snes_rtol >= 0.0 && self.snes_atol >= 0.0) {
                return invalid("snes tolerances must be non-negative".into());
            }
        }
        if !(self.divergence_shrink > 0.0 && self.divergence_shrink < 1.0) {
            return invalid(format!("divergence_shrink={} must lie in (0, 1)", self.divergence_shrink));
        }
        Ok(())
    }
}




// ============================================================================
#[cfg(test)]
mod test {

    use super::{Limiter, SolverConfig, SolverKind, TimeIntegrator};
    use crate::error::Error;
    use crate::reconstruction::Reconstruction;
    use crate::geometry::BoundaryCondition::*;

    fn config() -> SolverConfig {
        SolverConfig {
            mwaves: Some(3),
            ..SolverConfig::classic().with_boundaries(2, Outflow, Reflecting)
        }
    }

    #[test]
    fn complete_config_validates() {
        assert!(config().validate(2).is_ok());
    }

    #[test]
    fn missing_attributes_are_all_listed() {
        let mut config = config();
        config.mwaves = None;
        config.bc_upper[1] = None;
        config.bc_lower.truncate(1);

        match config.validate(2) {
            Err(Error::MissingAttributes(names)) => {
                assert_eq!(names, vec!["mwaves", "bc_lower[1]", "bc_upper[1]"]);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn limiters_broadcast_or_match_wave_count() {
        let mut config = config();
        assert_eq!(config.mthlim().unwrap(), vec![Limiter::MC; 3]);

        config.limiters = vec![Limiter::Minmod, Limiter::MC, Limiter::VanLeer];
        assert_eq!(config.mthlim().unwrap().len(), 3);

        config.limiters = vec![Limiter::Minmod, Limiter::MC];
        assert!(matches!(config.validate(2), Err(Error::Configuration(_))));
    }

    #[test]
    fn reconstruction_follows_order_and_limiter_settings() {
        let mut classic = config();
        assert_eq!(classic.reconstruction().unwrap(), Reconstruction::Limited(vec![Limiter::MC; 3]));
        classic.order = 1;
        assert_eq!(classic.reconstruction().unwrap(), Reconstruction::PiecewiseConstant);

        let mut sharp = SolverConfig { mwaves: Some(2), ..SolverConfig::sharpclaw().with_boundaries(1, Outflow, Outflow) };
        assert_eq!(sharp.reconstruction().unwrap(), Reconstruction::Weno(5));
        sharp.weno_order = 3;
        assert_eq!(sharp.reconstruction().unwrap(), Reconstruction::Weno(3));
        sharp.lim_type = 1;
        sharp.limiters = vec![Limiter::Superbee, Limiter::Minmod];
        assert_eq!(sharp.reconstruction().unwrap(), Reconstruction::Limited(vec![Limiter::Superbee, Limiter::Minmod]));
        sharp.lim_type = 0;
        assert_eq!(sharp.reconstruction().unwrap(), Reconstruction::Limited(vec![Limiter::None; 2]));
    }

    #[test]
    fn unsupported_reconstruction_settings_are_rejected() {
        let sharp = SolverConfig { mwaves: Some(1), ..SolverConfig::sharpclaw().with_boundaries(1, Outflow, Outflow) };
        assert!(sharp.validate(1).is_ok());

        for config in vec![
            SolverConfig { weno_order: 7, ..sharp.clone() },
            SolverConfig { lim_type: 4, ..sharp.clone() },
            SolverConfig { order: 3, ..sharp.clone() },
            SolverConfig { num_ghost: 2, ..sharp.clone() },
        ] {
            assert!(matches!(config.validate(1), Err(Error::Configuration(_))), "{:?}", config);
        }
        assert!(SolverConfig { num_ghost: 2, weno_order: 3, ..sharp }.validate(1).is_ok());
    }

    #[test]
    fn time_integrators_depend_on_kind() {
        assert_eq!(SolverConfig::implicit().time_integrator().unwrap(), TimeIntegrator::BackwardEuler);
        assert_eq!(SolverConfig::sharpclaw().time_integrator().unwrap(), TimeIntegrator::Ssp33);

        let mut config = config();
        config.time_integrator = "SSP104".into();
        assert!(matches!(config.validate(2), Err(Error::Configuration(_))));
    }

    #[test]
    fn inconsistent_step_bounds_are_rejected() {
        let mut config = config();
        config.cfl_desired = 1.5;
        assert!(config.validate(2).is_err());

        let mut config = self::config();
        config.dt_min = 1.0;
        config.dt_max = 0.5;
        assert!(config.validate(2).is_err());

        let mut config = self::config();
        config.max_growth = 0.5;
        assert!(config.validate(2).is_err());

        let mut config = self::config();
        config.bc_lower[0] = Some(Periodic);
        assert!(config.validate(2).is_err());
    }

    #[test]
    fn normal_component_defaults_to_momentum_layout() {
        let mut config = config();
        assert_eq!(config.normal_component(0, 3), Some(1));
        assert_eq!(config.normal_component(1, 3), Some(2));
        assert_eq!(config.normal_component(1, 2), None);

        config.normal_velocity = vec![None, Some(0)];
        assert_eq!(config.normal_component(0, 3), None);
        assert_eq!(config.normal_component(1, 3), Some(0));
    }

    #[test]
    fn kinds_have_their_own_defaults() {
        let implicit = SolverConfig::for_kind(SolverKind::ImplicitSharpClaw);
        assert_eq!(implicit.cfl_max, 2.5);
        assert_eq!(implicit.num_ghost, 3);
        assert!(SolverConfig::default().dim_split);
    }

    #[test]
    fn solver_kind_parses_cli_names() {
        assert_eq!("sharpclaw".parse::<SolverKind>().unwrap(), SolverKind::SharpClaw);
        assert_eq!("implicit".parse::<SolverKind>().unwrap(), SolverKind::ImplicitSharpClaw);
        assert!("fortran".parse::<SolverKind>().is_err());
    }
}
