use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use crate::error::Error;




/**
 * Append-only text file of scalar diagnostics, one line per checkpoint:
 * `<t> <v1> <v2> ...`. The first record of a run truncates the file.
 */
#[derive(Clone, Debug)]
pub struct FunctionalLog {
    path: PathBuf,
    last_time: Option<f64>,
}




// ============================================================================
impl FunctionalLog {

    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            last_time: None,
        }
    }

    /**
     * Start the file over with the initial record of a run.
     */
    pub fn start(&mut self, t: f64, values: &[f64]) -> Result<(), Error> {
        self.last_time = None;
        self.write(t, values, false)
    }

    /**
     * Append a record. Records must be given in non-decreasing time.
     */
    pub fn append(&mut self, t: f64, values: &[f64]) -> Result<(), Error> {
        self.write(t, values, true)
    }

    fn write(&mut self, t: f64, values: &[f64], append: bool) -> Result<(), Error> {
        if let Some(last) = self.last_time {
            if t < last {
                return Err(Error::Persistence(format!("functional record at t={} precedes t={}", t, last)));
            }
        }
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .append(append)
            .truncate(!append)
            .open(&self.path)?;

        let mut line = t.to_string();
        for v in values {
            line.push(' ');
            line.push_str(&v.to_string());
        }
        writeln!(file, "{}", line)?;
        self.last_time = Some(t);
        Ok(())
    }
}




// ============================================================================
#[cfg(test)]
mod test {

    use super::FunctionalLog;
    use crate::io::test::scratch_dir;

    #[test]
    fn functional_log_truncates_then_appends() {
        let dir = scratch_dir("functional");
        let path = dir.join("F.txt");
        let mut log = FunctionalLog::new(&path);

        log.start(0.0, &[1.0, 2.5]).unwrap();
        log.append(0.5, &[3.0]).unwrap();
        log.start(0.0, &[4.0]).unwrap();
        log.append(1.0, &[5.0, 6.0]).unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "0 4\n1 5 6\n");
        std::fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn records_out_of_order_are_refused() {
        let dir = scratch_dir("functional-order");
        let mut log = FunctionalLog::new(dir.join("F.txt"));
        log.start(1.0, &[]).unwrap();
        assert!(log.append(0.5, &[]).is_err());
        std::fs::remove_dir_all(dir).unwrap();
    }
}
