use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum VcuError {
    #[error("bus error: {0}")]
    Bus(String),
    #[error("hardware error: {0}")]
    Hardware(String),
    #[error("timeout waiting for receive path")]
    Timeout,
    #[error("invalid state: {0}")]
    State(String),
    #[error("io error: {0}")]
    Io(String),
}

/// Initialization-time configuration errors. All of these are fatal: the
/// scheduler must not start with a partially valid task table or map.
#[derive(Debug, Error, Clone)]
pub enum ConfigError {
    #[error("task '{0}' registered with zero period")]
    ZeroPeriod(&'static str),
    #[error("task table full ({0} slots)")]
    TaskTableFull(usize),
    #[error("invalid calibration table: {0}")]
    InvalidTable(&'static str),
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
