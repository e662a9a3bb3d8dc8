// SPDX-License-Identifier: MIT OR Apache-2.0
//! Compute capability used by media nodes.
//!
//! A compute backend turns inputs into an output and reports how long it
//! took. The engine itself never looks inside; nodes record the cost on the
//! context so hosts can profile a run.

use std::time::{Duration, Instant};

/// Output of a compute call with its elapsed cost
#[derive(Debug, Clone, PartialEq)]
pub struct Computed<T> {
    /// Produced value
    pub output: T,
    /// Time spent producing it
    pub cost: Duration,
}

impl<T> Computed<T> {
    /// Run `f` and time it
    pub fn measure(f: impl FnOnce() -> Result<T, ComputeError>) -> Result<Self, ComputeError> {
        let started = Instant::now();
        let output = f()?;
        Ok(Self {
            output,
            cost: started.elapsed(),
        })
    }

    /// Transform the output, keeping the cost
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Computed<U> {
        Computed {
            output: f(self.output),
            cost: self.cost,
        }
    }
}

/// Unrecoverable compute failures
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ComputeError {
    /// The device backing the computation went away
    #[error("Compute device lost: {0}")]
    DeviceLost(String),

    /// Inputs cannot be processed in the requested format
    #[error("Invalid format: {0}")]
    InvalidFormat(String),
}

/// A backend that computes an output from an input
pub trait Compute: Send {
    /// Input consumed by one call
    type Input;
    /// Output produced by one call
    type Output;

    /// Compute one output
    fn compute(&mut self, input: &Self::Input) -> Result<Computed<Self::Output>, ComputeError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Doubler;

    impl Compute for Doubler {
        type Input = Vec<f32>;
        type Output = Vec<f32>;

        fn compute(&mut self, input: &Vec<f32>) -> Result<Computed<Vec<f32>>, ComputeError> {
            if input.is_empty() {
                return Err(ComputeError::InvalidFormat("empty input".to_string()));
            }
            Computed::measure(|| Ok(input.iter().map(|v| v * 2.0).collect()))
        }
    }

    #[test]
    fn test_compute_reports_output() {
        let computed = Doubler.compute(&vec![1.0, 2.5]).unwrap();
        assert_eq!(computed.output, vec![2.0, 5.0]);

        let summed = computed.map(|v| v.iter().sum::<f32>());
        assert_eq!(summed.output, 7.0);
    }

    #[test]
    fn test_compute_error() {
        assert!(matches!(
            Doubler.compute(&Vec::new()),
            Err(ComputeError::InvalidFormat(_))
        ));
    }
}
