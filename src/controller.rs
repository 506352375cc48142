use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use log::{error, info, warn};
use crate::error::Error;
use crate::io::functional::FunctionalLog;
use crate::io::gauges::{Gauge, GaugeFiles};
use crate::io::{FileWriter, OutputFormat, SnapshotOptions, SnapshotWriter};
use crate::solution::Solution;
use crate::solver::config::Hook;
use crate::solver::{EvolveSummary, Solver, Target};
use crate::state::State;




/// Scalar diagnostics computed from a state at every checkpoint.
pub type FunctionalHook = Hook<dyn Fn(&State) -> Vec<f64> + Send + Sync>;

/// Derived quantities computed from a state, written next to the snapshots.
pub type DerivedHook = Hook<dyn Fn(&State) -> State + Send + Sync>;




#[derive(Clone, Copy, Debug, Default, PartialEq)]

/**
 * What a completed run reports: the summary of the final solver call, the
 * number of frames produced (including the initial one), the number of
 * output failures that were survived, and the time reached.
 */
pub struct RunStatus {
    pub summary: EvolveSummary,
    pub checkpoints: usize,
    pub persistence_failures: usize,
    pub t: f64,
}




/**
 * Drives a solver over a solution from its current time to `tfinal`,
 * stopping at a sequence of checkpoints to record output. The checkpoints
 * come from one of three output styles:
 *
 * - `1`: `nout` evenly spaced times up to `tfinal`
 * - `2`: the explicit times in `out_times`
 * - `3`: every `nstepout` accepted sub-steps, `nout` times
 *
 * Frame `start_frame` is the initial solution, written before any stepping.
 */
pub struct Controller {
    pub solution: Solution,
    pub solver: Option<Solver>,
    pub tfinal: f64,
    pub outstyle: u32,
    pub nout: usize,
    pub out_times: Vec<f64>,
    pub nstepout: usize,
    pub keep_copy: bool,
    pub frames: Vec<Solution>,
    pub output_format: Option<OutputFormat>,
    pub outdir: PathBuf,
    pub output_file_prefix: String,
    pub overwrite: bool,
    pub write_aux_init: bool,
    pub write_aux_always: bool,
    pub compute_p: Option<DerivedHook>,
    pub file_prefix_p: String,
    pub compute_functional: Option<FunctionalHook>,
    pub functional_path: Option<PathBuf>,
    pub gauges: Vec<Gauge>,
    pub start_frame: usize,
    writer: Option<Box<dyn SnapshotWriter>>,
    interrupt: Arc<AtomicBool>,
}




// ============================================================================
impl Controller {

    pub fn new(solution: Solution) -> Self {
        Self {
            solution,
            solver: None,
            tfinal: 1.0,
            outstyle: 1,
            nout: 10,
            out_times: Vec::new(),
            nstepout: 1,
            keep_copy: false,
            frames: Vec::new(),
            output_format: Some(OutputFormat::Ascii),
            outdir: PathBuf::from("_output"),
            output_file_prefix: "fort".to_string(),
            overwrite: true,
            write_aux_init: false,
            write_aux_always: false,
            compute_p: None,
            file_prefix_p: "fort".to_string(),
            compute_functional: None,
            functional_path: None,
            gauges: Vec::new(),
            start_frame: 0,
            writer: None,
            interrupt: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_solver(mut self, solver: Solver) -> Self {
        self.solver = Some(solver);
        self
    }

    /**
     * Replace the file writer used for snapshots, which otherwise writes
     * into `outdir`.
     */
    pub fn with_writer(mut self, writer: Box<dyn SnapshotWriter>) -> Self {
        self.writer = Some(writer);
        self
    }

    pub fn with_functional<F>(mut self, f: F) -> Self
    where
        F: Fn(&State) -> Vec<f64> + Send + Sync + 'static,
    {
        let hook: Arc<dyn Fn(&State) -> Vec<f64> + Send + Sync> = Arc::new(f);
        self.compute_functional = Some(Hook(hook));
        self
    }

    pub fn with_derived<F>(mut self, f: F) -> Self
    where
        F: Fn(&State) -> State + Send + Sync + 'static,
    {
        let hook: Arc<dyn Fn(&State) -> State + Send + Sync> = Arc::new(f);
        self.compute_p = Some(Hook(hook));
        self
    }

    /**
     * The flag which, once raised, aborts the run after the sub-step
     * attempt in progress.
     */
    pub fn interrupt_flag(&self) -> Arc<AtomicBool> {
        self.interrupt.clone()
    }

    /**
     * Raise the interrupt flag on SIGINT or SIGTERM.
     */
    pub fn install_interrupt_handler(&self) -> Result<(), Error> {
        use signal_hook::consts::{SIGINT, SIGTERM};

        for &signal in &[SIGINT, SIGTERM] {
            signal_hook::flag::register(signal, self.interrupt.clone())
                .map_err(|e| Error::Configuration(format!("cannot install signal handler: {}", e)))?;
        }
        Ok(())
    }

    pub fn functional_path(&self) -> PathBuf {
        self.functional_path.clone().unwrap_or_else(|| self.outdir.join("F.txt"))
    }

    /**
     * Check that a solver is set, that its configuration is valid for the
     * solution, and that the solution itself is valid.
     */
    pub fn check_validity(&self) -> Result<(), Error> {
        let solver = self
            .solver
            .as_ref()
            .ok_or_else(|| Error::InvalidConfiguration("no solver is set".into()))?;

        if !self.solution.is_valid() {
            return Err(Error::InvalidConfiguration("solution is not valid".into()));
        }
        solver
            .validate(self.solution.ndim())
            .map_err(|e| Error::InvalidConfiguration(format!("solver is not valid: {}", e)))
    }

    /**
     * The checkpoints which follow the initial frame, in order.
     */
    pub fn checkpoints(&self) -> Result<Vec<Target>, Error> {
        if self.solution.states.is_empty() {
            return Err(Error::InvalidConfiguration("solution has no states".into()));
        }
        let t0 = self.solution.t();

        match self.outstyle {
            1 => {
                if self.nout == 0 || !(self.tfinal >= t0) {
                    return Err(Error::InvalidConfiguration(format!(
                        "output style 1 needs nout > 0 and tfinal >= {}",
                        t0
                    )));
                }
                let n = self.nout;
                Ok((1..=n)
                    .map(|k| if k == n { self.tfinal } else { t0 + (self.tfinal - t0) * k as f64 / n as f64 })
                    .map(Target::Time)
                    .collect())
            }
            2 => {
                let ordered = self.out_times.windows(2).all(|w| w[0] <= w[1]);

                if !ordered || self.out_times.iter().any(|t| !t.is_finite()) {
                    return Err(Error::InvalidConfiguration("out_times must be finite and ordered".into()));
                }
                Ok(self.out_times.iter().filter(|&&t| t > t0).map(|&t| Target::Time(t)).collect())
            }
            3 => {
                if self.nstepout == 0 {
                    return Err(Error::InvalidConfiguration("output style 3 needs nstepout > 0".into()));
                }
                Ok(vec![Target::Steps(self.nstepout); self.nout])
            }
            style => Err(Error::InvalidConfiguration(format!("unknown output style {}", style))),
        }
    }

    /**
     * Run the simulation through every checkpoint. Output failures are
     * logged and counted; any other failure aborts the run. The solver is
     * torn down, and gauge files closed, whatever the outcome.
     */
    pub fn run(&mut self) -> Result<RunStatus, Error> {
        self.check_validity()?;
        let checkpoints = self.checkpoints()?;

        if !self.overwrite && self.output_format.is_some() && self.outdir.exists() {
            return Err(Error::Configuration(format!(
                "output directory {} exists and overwrite is not set",
                self.outdir.display()
            )));
        }
        let mut solver = self
            .solver
            .take()
            .ok_or_else(|| Error::InvalidConfiguration("no solver is set".into()))?;

        solver.set_interrupt(self.interrupt.clone());
        self.frames.clear();

        let mut gauges = None;
        let result = self.drive(&mut solver, &checkpoints, &mut gauges);

        solver.teardown();
        self.solver = Some(solver);

        if let Some(mut gauges) = gauges {
            if let Err(e) = gauges.close() {
                warn!("{}", e);
            }
        }
        if let Err(e) = &result {
            error!("run aborted at t={}: {}", self.solution.t(), e);
        }
        result
    }

    fn drive(
        &mut self,
        solver: &mut Solver,
        checkpoints: &[Target],
        gauges: &mut Option<GaugeFiles>,
    ) -> Result<RunStatus, Error> {
        solver.setup(&self.solution)?;

        let mut status = RunStatus {
            t: self.solution.t(),
            ..RunStatus::default()
        };

        if !self.gauges.is_empty() {
            match GaugeFiles::open(&self.outdir, &self.gauges, &self.solution) {
                Ok(mut files) => {
                    if let Err(e) = files.record(&self.solution) {
                        status.persistence_failures += self.report(e)?;
                    }
                    *gauges = Some(files);
                }
                Err(e) => status.persistence_failures += self.report(e)?,
            }
        }
        let mut functional = FunctionalLog::new(self.functional_path());

        status.persistence_failures += self.checkpoint(self.start_frame, &mut functional, true);
        status.checkpoints += 1;

        for (n, &target) in checkpoints.iter().enumerate() {
            let frame = self.start_frame + n + 1;
            let mut gauge_failures = 0;

            let summary = solver.evolve_with(&mut self.solution, target, &mut |solution: &Solution| {
                if let Some(files) = gauges.as_mut() {
                    if let Err(e) = files.record(solution) {
                        warn!("{}", e);
                        gauge_failures += 1;
                    }
                }
            })?;

            if let Some(files) = gauges.as_mut() {
                if let Err(e) = files.flush() {
                    status.persistence_failures += self.report(e)?;
                }
            }
            status.persistence_failures += gauge_failures + self.checkpoint(frame, &mut functional, false);
            status.checkpoints += 1;
            status.summary = summary;
            status.t = self.solution.t();
        }
        Ok(status)
    }

    /**
     * Record the solution as the given frame. Returns the number of
     * persistence failures met along the way.
     */
    fn checkpoint(&mut self, frame: usize, functional: &mut FunctionalLog, initial: bool) -> usize {
        let mut failures = 0;

        if self.keep_copy {
            self.frames.push(self.solution.clone());
        }
        if let Some(format) = self.output_format {
            let options = SnapshotOptions {
                format,
                file_prefix: self.output_file_prefix.clone(),
                write_aux: if initial { self.write_aux_init } else { self.write_aux_always },
            };
            let outdir = &self.outdir;
            let writer = self
                .writer
                .get_or_insert_with(|| Box::new(FileWriter::new(outdir)) as Box<dyn SnapshotWriter>);

            if let Err(e) = writer.write_snapshot(frame, &self.solution, &options) {
                warn!("frame {}: {}", frame, e);
                failures += 1;
            }
            if let Some(hook) = &self.compute_p {
                let derived = Solution::from_states(self.solution.states.iter().map(|s| (hook.0)(s)).collect());
                let options = SnapshotOptions {
                    format,
                    file_prefix: self.file_prefix_p.clone(),
                    write_aux: false,
                };
                if let Err(e) = FileWriter::new(self.outdir.join("_p")).write_snapshot(frame, &derived, &options) {
                    warn!("derived frame {}: {}", frame, e);
                    failures += 1;
                }
            }
        }
        if let Some(hook) = &self.compute_functional {
            let values = (hook.0)(self.solution.state());
            let t = self.solution.t();
            let written = if initial {
                functional.start(t, &values)
            } else {
                functional.append(t, &values)
            };
            if let Err(e) = written {
                warn!("functional at t={}: {}", t, e);
                failures += 1;
            }
        }
        info!("solution {} computed for time t={}", frame, self.solution.t());
        failures
    }

    /**
     * Survive a persistence failure by logging it and counting it as one;
     * pass any other error on.
     */
    fn report(&self, e: Error) -> Result<usize, Error> {
        if e.is_fatal() {
            Err(e)
        } else {
            warn!("{}", e);
            Ok(1)
        }
    }
}




// ============================================================================
impl fmt::Display for Controller {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        writeln!(fmt, "Controller")?;
        match self.solution.states.first() {
            Some(state) => writeln!(fmt, "    t = {}", state.t)?,
            None => writeln!(fmt, "    t = none (no states)")?,
        }
        writeln!(fmt, "    tfinal = {}", self.tfinal)?;
        writeln!(fmt, "    outstyle = {}", self.outstyle)?;
        writeln!(fmt, "    nout = {}", self.nout)?;
        writeln!(fmt, "    nstepout = {}", self.nstepout)?;
        writeln!(fmt, "    out_times = {:?}", self.out_times)?;
        writeln!(fmt, "    output_format = {:?}", self.output_format)?;
        writeln!(fmt, "    outdir = {}", self.outdir.display())?;
        writeln!(fmt, "    output_file_prefix = {}", self.output_file_prefix)?;
        writeln!(fmt, "    keep_copy = {}", self.keep_copy)?;
        writeln!(fmt, "    start_frame = {}", self.start_frame)?;
        writeln!(fmt, "    gauges = {}", self.gauges.len())?;
        match &self.solver {
            Some(solver) => write!(fmt, "    solver = {:?} ({:?})", solver.config().kind, solver.phase()),
            None => write!(fmt, "    solver = none"),
        }
    }
}




// ============================================================================
#[cfg(test)]
mod test {

    use std::sync::atomic::Ordering;
    use super::Controller;
    use crate::error::Error;
    use crate::io::gauges::Gauge;
    use crate::io::test::scratch_dir;
    use crate::io::OutputFormat;
    use crate::solution::Solution;
    use crate::solver::test::{config, solution, Scripted};
    use crate::solver::{Phase, Solver, SolverConfig, Target};

    fn controller(name: &str) -> Controller {
        let mut controller = Controller::new(solution())
            .with_solver(Solver::new(config(), Box::new(Scripted::new(&[]))));
        controller.outdir = scratch_dir(name);
        controller.output_format = None;
        controller
    }

    #[test]
    fn style_one_checkpoints_are_evenly_spaced() {
        let mut controller = controller("style-one");
        controller.tfinal = 1.0;
        controller.nout = 4;
        let times: Vec<_> = controller.checkpoints().unwrap();
        assert_eq!(times, vec![Target::Time(0.25), Target::Time(0.5), Target::Time(0.75), Target::Time(1.0)]);
    }

    #[test]
    fn unknown_output_style_is_refused() {
        let mut controller = controller("style-unknown");
        controller.outstyle = 4;
        assert!(matches!(controller.checkpoints(), Err(Error::InvalidConfiguration(_))));
        assert!(matches!(controller.run(), Err(Error::InvalidConfiguration(_))));
    }

    #[test]
    fn missing_solver_is_refused() {
        let mut controller = Controller::new(solution());
        assert!(matches!(controller.run(), Err(Error::InvalidConfiguration(_))));
    }

    #[test]
    fn invalid_solver_configuration_is_refused() {
        let mut controller = Controller::new(solution())
            .with_solver(Solver::new(SolverConfig::classic(), Box::new(Scripted::new(&[]))));
        assert!(matches!(controller.check_validity(), Err(Error::InvalidConfiguration(_))));
    }

    #[test]
    fn explicit_out_times_are_visited() {
        let mut controller = controller("style-two");
        controller.outstyle = 2;
        controller.out_times = vec![0.0, 0.15, 0.4];
        controller.keep_copy = true;
        let status = controller.run().unwrap();

        assert_eq!(status.checkpoints, 3);
        let times: Vec<f64> = controller.frames.iter().map(|f| f.t()).collect();
        assert_eq!(times, vec![0.0, 0.15, 0.4]);

        controller.out_times = vec![0.5, 0.2];
        assert!(controller.run().is_err());
    }

    #[test]
    fn functional_and_gauges_are_recorded() {
        let mut controller = controller("functional")
            .with_functional(|state| vec![state.integral(0)]);
        controller.tfinal = 0.2;
        controller.nout = 2;
        controller.gauges = vec![Gauge::new(7, vec![3])];
        controller.run().unwrap();

        let functional = std::fs::read_to_string(controller.outdir.join("F.txt")).unwrap();
        let lines: Vec<&str> = functional.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("0 "));

        let gauge = std::fs::read_to_string(controller.outdir.join("gauge00007.txt")).unwrap();
        assert_eq!(gauge.lines().count(), 3);
        std::fs::remove_dir_all(&controller.outdir).unwrap();
    }

    #[test]
    fn snapshots_and_derived_output_are_written() {
        let mut controller = controller("snapshots").with_derived(|state| state.clone());
        controller.output_format = Some(OutputFormat::Ascii);
        controller.start_frame = 3;
        controller.tfinal = 0.1;
        controller.nout = 1;
        controller.run().unwrap();

        assert!(controller.outdir.join("fort.q0003").exists());
        assert!(controller.outdir.join("fort.q0004").exists());
        assert!(controller.outdir.join("_p").join("fort.q0004").exists());

        controller.overwrite = false;
        assert!(matches!(controller.run(), Err(Error::Configuration(_))));
        std::fs::remove_dir_all(&controller.outdir).unwrap();
    }

    #[test]
    fn solver_is_torn_down_after_failure() {
        let mut controller = Controller::new(solution()).with_solver(Solver::new(
            SolverConfig { dt_min: 0.09, ..config() },
            Box::new(Scripted::new(&[5.0])),
        ));
        controller.output_format = None;

        assert!(matches!(controller.run(), Err(Error::CflToleranceExceeded { .. })));
        assert_eq!(controller.solver.as_ref().unwrap().phase(), Phase::TornDown);
    }

    #[test]
    fn gauges_are_flushed_when_the_run_fails() {
        let mut controller = Controller::new(solution()).with_solver(Solver::new(
            SolverConfig { dt_min: 0.09, ..config() },
            Box::new(Scripted::new(&[0.5, 5.0])),
        ));
        controller.outdir = scratch_dir("gauges-failure");
        controller.output_format = None;
        controller.tfinal = 1.0;
        controller.nout = 1;
        controller.gauges = vec![Gauge::new(1, vec![2])];

        assert!(matches!(controller.run(), Err(Error::CflToleranceExceeded { .. })));

        let gauge = std::fs::read_to_string(controller.outdir.join("gauge00001.txt")).unwrap();
        let times: Vec<f64> = gauge
            .lines()
            .map(|l| l.split_whitespace().next().unwrap().parse().unwrap())
            .collect();
        assert_eq!(times.len(), 2);
        assert_eq!(times[0], 0.0);
        assert!((times[1] - 0.1).abs() < 1e-15);
        std::fs::remove_dir_all(&controller.outdir).unwrap();
    }

    #[test]
    fn unwritable_functional_file_does_not_abort_the_run() {
        let dir = scratch_dir("functional-failure");
        std::fs::create_dir_all(&dir).unwrap();
        let not_a_directory = dir.join("plain-file");
        std::fs::write(&not_a_directory, "").unwrap();

        let mut controller = controller("functional-failure-out")
            .with_functional(|state| vec![state.integral(0)]);
        controller.functional_path = Some(not_a_directory.join("F.txt"));
        controller.tfinal = 0.2;
        controller.nout = 2;

        let status = controller.run().unwrap();
        assert_eq!(status.persistence_failures, 3);
        assert_eq!(status.t, 0.2);
        std::fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn empty_solution_is_refused_without_panicking() {
        let mut controller = Controller::new(Solution::from_states(vec![]))
            .with_solver(Solver::new(config(), Box::new(Scripted::new(&[]))));
        assert!(matches!(controller.checkpoints(), Err(Error::InvalidConfiguration(_))));
        assert!(format!("{}", controller).contains("no states"));
        assert!(matches!(controller.run(), Err(Error::InvalidConfiguration(_))));
    }

    #[test]
    fn history_starts_over_on_every_run() {
        let mut controller = controller("history");
        controller.keep_copy = true;
        controller.tfinal = 0.2;
        controller.nout = 2;

        controller.run().unwrap();
        assert_eq!(controller.frames.len(), 3);

        controller.tfinal = 0.3;
        controller.nout = 1;
        controller.run().unwrap();
        let times: Vec<f64> = controller.frames.iter().map(|f| f.t()).collect();
        assert_eq!(times.len(), 2);
        assert!((times[0] - 0.2).abs() < 1e-12);
        assert!((times[1] - 0.3).abs() < 1e-12);
    }

    #[test]
    fn interrupt_aborts_the_run() {
        let mut controller = controller("interrupt");
        controller.interrupt_flag().store(true, Ordering::SeqCst);
        assert!(matches!(controller.run(), Err(Error::Interrupted { .. })));
        assert_eq!(controller.solver.as_ref().unwrap().phase(), Phase::TornDown);
    }
}
