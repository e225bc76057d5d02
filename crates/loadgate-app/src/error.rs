//! Component and supervisor error types.

use thiserror::Error;

use loadgate_bus::BusError;
use loadgate_core::error::DomainError;

/// Error from a single pipeline component.
#[derive(Debug, Error)]
pub enum ComponentError {
    /// Line IO against the input or output file failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A domain operation failed.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// A bus operation failed.
    #[error("bus error: {0}")]
    Bus(#[from] BusError),

    /// No `DataWritten` acknowledgment arrived within the budget.
    #[error("timed out waiting for response from write-service")]
    ReportTimeout,
}

/// Composite error naming every component that failed during a run.
#[derive(Debug)]
pub struct RunnerError {
    /// Component name and the error it returned.
    pub failures: Vec<(&'static str, String)>,
}

impl std::error::Error for RunnerError {}

impl std::fmt::Display for RunnerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "some components returned errors:")?;
        for (index, (component, error)) in self.failures.iter().enumerate() {
            if index > 0 {
                writeln!(f)?;
            }
            write!(f, "[{component}]: {error}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runner_error_names_each_failed_component() {
        let error = RunnerError {
            failures: vec![
                ("reader", "io error: boom".to_owned()),
                ("processMgr", "timed out".to_owned()),
            ],
        };

        let rendered = error.to_string();
        assert!(rendered.contains("[reader]: io error: boom"));
        assert!(rendered.contains("[processMgr]: timed out"));
    }
}
