use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use log::debug;
use serde::Serialize;
use crate::error::Error;
use crate::grid::Grid;
use crate::solution::Solution;
use crate::state::State;

pub mod functional;
pub mod gauges;




#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum OutputFormat {
    Ascii,
    Cbor,
    MsgPack,
}




// ============================================================================
impl FromStr for OutputFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ascii" => Ok(OutputFormat::Ascii),
            "cbor" => Ok(OutputFormat::Cbor),
            "msgpack" => Ok(OutputFormat::MsgPack),
            _ => Err(Error::Configuration(format!("unknown output format '{}'", s))),
        }
    }
}




/**
 * How a snapshot is to be written.
 */
#[derive(Clone, Debug, PartialEq)]
pub struct SnapshotOptions {
    pub format: OutputFormat,
    pub file_prefix: String,
    pub write_aux: bool,
}

impl Default for SnapshotOptions {
    fn default() -> Self {
        Self {
            format: OutputFormat::Ascii,
            file_prefix: "fort".to_string(),
            write_aux: false,
        }
    }
}




/**
 * Interface to persist a snapshot of the solution at a numbered checkpoint
 * (frame). Failures are reported to the caller, which decides whether they
 * matter.
 */
pub trait SnapshotWriter {
    fn write_snapshot(&mut self, frame: usize, solution: &Solution, options: &SnapshotOptions) -> Result<(), Error>;
}




#[derive(Serialize)]

/**
 * Borrowed view of a solution, serialized by the binary formats. The aux
 * arrays are left out unless requested.
 */
struct Snapshot<'a> {
    frame: usize,
    t: f64,
    states: Vec<StateView<'a>>,
}

#[derive(Serialize)]
struct StateView<'a> {
    grid: &'a Grid,
    meqn: usize,
    maux: usize,
    q: &'a [f64],
    aux: Option<&'a [f64]>,
    aux_global: &'a BTreeMap<String, f64>,
    t: f64,
}

impl<'a> Snapshot<'a> {
    fn new(frame: usize, solution: &'a Solution, write_aux: bool) -> Self {
        let view = |s: &'a State| StateView {
            grid: &s.grid,
            meqn: s.meqn,
            maux: s.maux,
            q: &s.q,
            aux: if write_aux { s.aux.as_deref() } else { None },
            aux_global: &s.aux_global,
            t: s.t,
        };
        Self {
            frame,
            t: solution.t(),
            states: solution.states.iter().map(view).collect(),
        }
    }
}




/**
 * Writes snapshots as files in an output directory, which is created on
 * first use.
 */
pub struct FileWriter {
    outdir: PathBuf,
}




// ============================================================================
impl FileWriter {

    pub fn new<P: AsRef<Path>>(outdir: P) -> Self {
        Self {
            outdir: outdir.as_ref().to_path_buf(),
        }
    }

    fn create(&self, name: String) -> Result<BufWriter<File>, Error> {
        fs::create_dir_all(&self.outdir)?;
        let path = self.outdir.join(name);
        debug!("writing {}", path.display());
        Ok(BufWriter::new(File::create(path)?))
    }

    fn write_ascii(&self, frame: usize, solution: &Solution, options: &SnapshotOptions) -> Result<(), Error> {
        let prefix = &options.file_prefix;
        let mut q_file = self.create(format!("{}.q{:04}", prefix, frame))?;

        for (n, state) in solution.states.iter().enumerate() {
            write_grid_header(&mut q_file, n + 1, &state.grid)?;
            write_fields(&mut q_file, &state.q, state.meqn, state.num_zones())?;
        }
        q_file.flush()?;

        if options.write_aux && solution.states.iter().any(|s| s.aux.is_some()) {
            let mut a_file = self.create(format!("{}.a{:04}", prefix, frame))?;

            for (n, state) in solution.states.iter().enumerate() {
                if let Some(aux) = &state.aux {
                    write_grid_header(&mut a_file, n + 1, &state.grid)?;
                    write_fields(&mut a_file, aux, state.maux, state.num_zones())?;
                }
            }
            a_file.flush()?;
        }

        let state = solution.state();
        let mut t_file = self.create(format!("{}.t{:04}", prefix, frame))?;
        writeln!(t_file, "{:18.8e}    time", solution.t())?;
        writeln!(t_file, "{:5}                 meqn", state.meqn)?;
        writeln!(t_file, "{:5}                 ngrids", solution.states.len())?;
        writeln!(t_file, "{:5}                 naux", state.maux)?;
        writeln!(t_file, "{:5}                 ndim", solution.ndim())?;
        t_file.flush()?;
        Ok(())
    }
}




// ============================================================================
fn write_grid_header<W: Write>(out: &mut W, grid_number: usize, grid: &Grid) -> Result<(), Error> {
    writeln!(out, "{:5}                 grid_number", grid_number)?;

    for d in &grid.dimensions {
        writeln!(out, "{:5}                 m{}", d.num_cells, d.name)?;
    }
    for d in &grid.dimensions {
        writeln!(out, "{:18.8e}    {}low", d.lower, d.name)?;
    }
    for d in &grid.dimensions {
        writeln!(out, "{:18.8e}    d{}", d.cell_spacing(), d.name)?;
    }
    writeln!(out)?;
    Ok(())
}

fn write_fields<W: Write>(out: &mut W, data: &[f64], num_fields: usize, num_zones: usize) -> Result<(), Error> {
    for zone in 0..num_zones {
        let line: Vec<String> = (0..num_fields)
            .map(|m| format!("{:18.8e}", data[m * num_zones + zone]))
            .collect();
        writeln!(out, "{}", line.join(" "))?;
    }
    writeln!(out)?;
    Ok(())
}




// ============================================================================
impl SnapshotWriter for FileWriter {

    fn write_snapshot(&mut self, frame: usize, solution: &Solution, options: &SnapshotOptions) -> Result<(), Error> {
        match options.format {
            OutputFormat::Ascii => self.write_ascii(frame, solution, options),
            OutputFormat::Cbor => {
                let snapshot = Snapshot::new(frame, solution, options.write_aux);
                let mut file = self.create(format!("{}{:04}.cbor", options.file_prefix, frame))?;
                ciborium::ser::into_writer(&snapshot, &mut file).map_err(|e| Error::Persistence(format!("{:?}", e)))?;
                file.flush()?;
                Ok(())
            }
            OutputFormat::MsgPack => {
                let snapshot = Snapshot::new(frame, solution, options.write_aux);
                let mut file = self.create(format!("{}{:04}.msgpack", options.file_prefix, frame))?;
                rmp_serde::encode::write_named(&mut file, &snapshot).map_err(|e| Error::Persistence(e.to_string()))?;
                file.flush()?;
                Ok(())
            }
        }
    }
}




// ============================================================================
#[cfg(test)]
pub(crate) mod test {

    use std::path::PathBuf;
    use super::{FileWriter, OutputFormat, SnapshotOptions, SnapshotWriter};
    use crate::grid::{Dimension, Grid};
    use crate::solution::Solution;
    use crate::state::State;

    pub fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("claw-{}-{}", name, std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    fn solution() -> Solution {
        let grid = Grid::new(vec![Dimension::new("x", 0.0, 1.0, 3)]);
        let state = State::from_function(grid, 2, |x, q| {
            q[0] = 1.0 + x[0];
            q[1] = 0.0;
        });
        Solution::new(state.with_aux(1, vec![7.0, 8.0, 9.0]))
    }

    #[test]
    fn ascii_snapshot_works() {
        let dir = scratch_dir("ascii");
        let mut writer = FileWriter::new(&dir);
        let options = SnapshotOptions { write_aux: true, ..SnapshotOptions::default() };
        writer.write_snapshot(3, &solution(), &options).unwrap();

        let q = std::fs::read_to_string(dir.join("fort.q0003")).unwrap();
        let t = std::fs::read_to_string(dir.join("fort.t0003")).unwrap();
        assert!(q.starts_with("    1                 grid_number\n    3                 mx\n"));
        let rows: Vec<Vec<f64>> = q
            .lines()
            .map(|l| l.split_whitespace().map(|x| x.parse::<f64>()).collect::<Result<Vec<_>, _>>())
            .filter_map(|r| r.ok())
            .filter(|r| r.len() == 2)
            .collect();
        assert_eq!(rows.len(), 3);
        assert!((rows[0][0] - 7.0 / 6.0).abs() < 1e-8);
        assert!(t.contains("meqn") && t.contains("ngrids"));
        assert!(dir.join("fort.a0003").exists());
        std::fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn binary_snapshots_are_written() {
        let dir = scratch_dir("binary");
        let mut writer = FileWriter::new(&dir);

        for format in [OutputFormat::Cbor, OutputFormat::MsgPack].iter() {
            let options = SnapshotOptions { format: *format, ..SnapshotOptions::default() };
            writer.write_snapshot(0, &solution(), &options).unwrap();
        }
        assert!(std::fs::metadata(dir.join("fort0000.cbor")).unwrap().len() > 0);
        assert!(std::fs::metadata(dir.join("fort0000.msgpack")).unwrap().len() > 0);
        std::fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn unknown_format_is_a_configuration_error() {
        assert_eq!("cbor".parse::<OutputFormat>().unwrap(), OutputFormat::Cbor);
        assert!("hdf5".parse::<OutputFormat>().is_err());
    }
}
