use std::path::PathBuf;
use clap::Parser;
use log::{debug, LevelFilter};
use simple_logger::SimpleLogger;
use claw::geometry::BoundaryCondition::*;
use claw::grid::{Dimension, Grid};
use claw::io::OutputFormat;
use claw::kernels::shallow_water::ShallowWater;
use claw::solver::Limiter;
use claw::{Controller, Error, Solution, Solver, SolverConfig, SolverKind, State};

#[derive(Debug, Parser)]
#[clap(version = "1.0", author = "J. Zrake <jzrake@clemson.edu>")]
#[clap(about = "Radial dam break for the 2D shallow water equations")]
struct Opts {
    #[clap(long, default_value = "150")]
    mx: usize,

    #[clap(long, default_value = "150")]
    my: usize,

    #[clap(long, default_value = "classic")]
    solver_type: String,

    #[clap(long, default_value = "2.5")]
    tfinal: f64,

    #[clap(long, default_value = "10")]
    nout: usize,

    #[clap(long, default_value = "1")]
    outstyle: u32,

    #[clap(long, default_value = "1")]
    nstepout: usize,

    /// Spatial order: 1 for piecewise constant, 2 for limited or WENO
    #[clap(long, default_value = "2")]
    order: u32,

    /// 0 unlimited, 1 TVD limiter, 2 WENO (sharpclaw and implicit only)
    #[clap(long, default_value = "2")]
    lim_type: u32,

    #[clap(long, default_value = "5")]
    weno_order: u32,

    #[clap(long, default_value = "_output")]
    outdir: PathBuf,

    /// One of ascii, cbor, msgpack; no output if absent
    #[clap(long)]
    format: Option<String>,

    /// Log level: off, error, warn, info, debug or trace
    #[clap(short, long, default_value = "info")]
    verbosity: String,
}

fn initial_state(mx: usize, my: usize) -> State {
    let (hl, hr, dam_radius) = (2.0, 1.0, 0.5);
    let grid = Grid::new(vec![
        Dimension::new("x", -2.5, 2.5, mx),
        Dimension::new("y", -2.5, 2.5, my),
    ]);
    State::from_function(grid, 3, |x, q| {
        let r = (x[0] * x[0] + x[1] * x[1]).sqrt();
        q[0] = if r <= dam_radius { hl } else { hr };
        q[1] = 0.0;
        q[2] = 0.0;
    })
    .with_global("grav", 1.0)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let opts = Opts::parse();
    let level: LevelFilter = opts
        .verbosity
        .parse()
        .map_err(|_| Error::Configuration(format!("unknown verbosity '{}'", opts.verbosity)))?;
    SimpleLogger::new()
        .with_level(level)
        .init()
        .map_err(|e| Error::Configuration(e.to_string()))?;

    let kind: SolverKind = opts.solver_type.parse()?;
    let config = SolverConfig {
        mwaves: Some(3),
        limiters: vec![Limiter::MC],
        dim_split: true,
        order: opts.order,
        lim_type: opts.lim_type,
        weno_order: opts.weno_order,
        bc_lower: vec![Some(Outflow), Some(Outflow)],
        bc_upper: vec![Some(Reflecting), Some(Reflecting)],
        ..SolverConfig::for_kind(kind)
    };
    debug!("{:?}", config);

    let solver = Solver::new(config, Box::new(ShallowWater::new()));
    let mut controller = Controller::new(Solution::new(initial_state(opts.mx, opts.my))).with_solver(solver);
    controller.tfinal = opts.tfinal;
    controller.nout = opts.nout;
    controller.outstyle = opts.outstyle;
    controller.nstepout = opts.nstepout;
    controller.outdir = opts.outdir.clone();
    controller.output_format = opts.format.as_deref().map(str::parse::<OutputFormat>).transpose()?;
    controller.install_interrupt_handler()?;

    let start = std::time::Instant::now();
    controller.run()?;
    let time_total = start.elapsed().as_secs_f64();

    println!("time_total:{:.6}", time_total);
    println!("param_problem:shallow2D");
    println!("param_solver_type:{}", opts.solver_type);
    println!("param_order:{}", opts.weno_order);
    println!("param_lim_type:{}", opts.lim_type);
    println!("param_grid_x:{}", opts.mx);
    println!("param_grid_y:{}", opts.my);
    Ok(())
}
