use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use log::debug;
use serde::Serialize;
use crate::error::Error;
use crate::solution::Solution;




#[derive(Clone, Debug, PartialEq, Serialize)]

/**
 * A fixed cell of one state of the solution, whose field values are
 * recorded as a time series.
 */
pub struct Gauge {
    pub number: usize,
    pub state: usize,
    pub cell: Vec<usize>,
}




// ============================================================================
impl Gauge {
    pub fn new(number: usize, cell: Vec<usize>) -> Self {
        Self { number, state: 0, cell }
    }

    pub fn file_name(&self) -> String {
        format!("gauge{:05}.txt", self.number)
    }
}




/**
 * Open output files of a set of gauges, one per gauge. Each line is
 * `<t> <q_1> ... <q_meqn>`.
 */
pub struct GaugeFiles {
    files: Vec<(Gauge, usize, BufWriter<File>)>,
}




// ============================================================================
impl GaugeFiles {

    /**
     * Check each gauge against the solution, and create its file under
     * `outdir`. Gauges outside the grid are a configuration error.
     */
    pub fn open(outdir: &Path, gauges: &[Gauge], solution: &Solution) -> Result<Self, Error> {
        let mut files = Vec::with_capacity(gauges.len());

        for gauge in gauges {
            let state = solution
                .states
                .get(gauge.state)
                .ok_or_else(|| Error::Configuration(format!("gauge {} refers to a missing state", gauge.number)))?;

            let shape = state.grid.shape();
            let inside = gauge.cell.len() == shape.len() && gauge.cell.iter().zip(&shape).all(|(i, n)| i < n);

            if !inside {
                return Err(Error::Configuration(format!(
                    "gauge {} at {:?} is outside the grid of shape {:?}",
                    gauge.number, gauge.cell, shape
                )));
            }
            fs::create_dir_all(outdir)?;
            let file = File::create(outdir.join(gauge.file_name()))?;
            files.push((gauge.clone(), state.grid.ravel(&gauge.cell), BufWriter::new(file)));
        }
        Ok(Self { files })
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn record(&mut self, solution: &Solution) -> Result<(), Error> {
        for (gauge, zone, file) in &mut self.files {
            let state = &solution.states[gauge.state];
            let mut line = state.t.to_string();

            for q in state.zone_values(*zone) {
                line.push(' ');
                line.push_str(&q.to_string());
            }
            writeln!(file, "{}", line)?;
        }
        Ok(())
    }

    pub fn flush(&mut self) -> Result<(), Error> {
        for (_, _, file) in &mut self.files {
            file.flush()?;
        }
        Ok(())
    }

    /**
     * Flush and close every gauge file. Safe to call more than once.
     */
    pub fn close(&mut self) -> Result<(), Error> {
        let result = self.flush();
        if !self.files.is_empty() {
            debug!("closing {} gauge file(s)", self.files.len());
        }
        self.files.clear();
        result
    }
}




// ============================================================================
#[cfg(test)]
mod test {

    use super::{Gauge, GaugeFiles};
    use crate::grid::{Dimension, Grid};
    use crate::io::test::scratch_dir;
    use crate::solution::Solution;
    use crate::state::State;

    fn solution() -> Solution {
        let grid = Grid::new(vec![Dimension::new("x", 0.0, 1.0, 2), Dimension::new("y", 0.0, 1.0, 2)]);
        Solution::new(State::from_function(grid, 2, |x, q| {
            q[0] = x[0];
            q[1] = x[1];
        }))
    }

    #[test]
    fn gauges_record_time_series() {
        let dir = scratch_dir("gauges");
        let mut solution = solution();
        let mut gauges = GaugeFiles::open(&dir, &[Gauge::new(1, vec![1, 0])], &solution).unwrap();

        gauges.record(&solution).unwrap();
        solution.set_t(0.5);
        gauges.record(&solution).unwrap();
        gauges.close().unwrap();
        gauges.close().unwrap();

        let text = std::fs::read_to_string(dir.join("gauge00001.txt")).unwrap();
        assert_eq!(text, "0 0.75 0.25\n0.5 0.75 0.25\n");
        std::fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn gauge_outside_grid_is_refused() {
        let dir = scratch_dir("gauges-outside");
        assert!(GaugeFiles::open(&dir, &[Gauge::new(0, vec![2, 0])], &solution()).is_err());
        assert!(GaugeFiles::open(&dir, &[Gauge::new(0, vec![0])], &solution()).is_err());
    }
}
