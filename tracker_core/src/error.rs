use thiserror::Error;

/// Errors raised by the estimator.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Invalid configuration: {name} = {value} ({reason})")]
    InvalidConfig {
        name: &'static str,
        value: f64,
        reason: &'static str,
    },

    #[error("Invalid covariance: {0}")]
    InvalidCovariance(String),

    #[error("Measurement is not finite: {0}")]
    NonFiniteMeasurement(f64),

    #[error("Innovation covariance is not strictly positive: S = {0}")]
    DegenerateInnovation(f64),
}

/// Result type for estimator operations
pub type Result<T> = std::result::Result<T, Error>;
