use std::error;
use std::fmt;

#[derive(Debug)]

/**
 * Error to represent invalid solver setup, stability failures of the time
 * stepping, and failures to persist simulation output.
 */
pub enum Error {
    Configuration(String),
    MissingAttributes(Vec<String>),
    InvalidConfiguration(String),
    CflToleranceExceeded { dt: f64, cfl: f64, dt_min: f64 },
    StepLimitExceeded { max_steps: usize, t: f64 },
    Persistence(String),
    Interrupted { t: f64 },
}




// ============================================================================
impl Error {

    /**
     * Whether the run must be aborted. Only persistence failures are
     * reported and survived.
     */
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Error::Persistence(_))
    }
}




// ============================================================================
impl fmt::Display for Error {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        use Error::*;

        match self {
            Configuration(what) => write!(fmt, "configuration error: {}", what),
            MissingAttributes(names) => write!(fmt, "missing required solver attributes: {}", names.join(", ")),
            InvalidConfiguration(what) => write!(fmt, "invalid configuration: {}", what),
            CflToleranceExceeded { dt, cfl, dt_min } => write!(
                fmt,
                "CFL tolerance exceeded: cfl={} at dt={} cannot be reduced below dt_min={}",
                cfl, dt, dt_min
            ),
            StepLimitExceeded { max_steps, t } => write!(
                fmt,
                "step limit exceeded: {} sub-step attempts did not reach the target, stopped at t={}",
                max_steps, t
            ),
            Persistence(what) => write!(fmt, "failed to persist output: {}", what),
            Interrupted { t } => write!(fmt, "interrupted at t={}", t),
        }
    }
}

impl error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Persistence(e.to_string())
    }
}




// ============================================================================
#[cfg(test)]
mod test {

    use super::Error;

    #[test]
    fn only_persistence_is_survivable() {
        assert!(!Error::Persistence("disk full".into()).is_fatal());
        assert!(Error::Configuration("bad".into()).is_fatal());
        assert!(Error::StepLimitExceeded { max_steps: 3, t: 0.0 }.is_fatal());
        assert!(Error::Interrupted { t: 0.5 }.is_fatal());
    }

    #[test]
    fn missing_attributes_are_listed() {
        let e = Error::MissingAttributes(vec!["mwaves".into(), "bc_lower".into()]);
        assert_eq!(e.to_string(), "missing required solver attributes: mwaves, bc_lower");
    }

    #[test]
    fn io_errors_become_persistence_errors() {
        let e: Error = std::io::Error::new(std::io::ErrorKind::Other, "nope").into();
        assert!(matches!(e, Error::Persistence(_)));
    }
}
