//! Crate-wide error type.

use thiserror::Error;

/// Errors produced while configuring or running a simulation.
///
/// A `Config` error refuses to start the simulation at all, a `HandlerFault`
/// is caught inside `Engine::advance` and logged without unwinding virtual
/// time, and a `Telemetry` error is logged by the driver without stopping
/// the run.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimError {
    /// An invalid configuration parameter; refused before the simulation starts.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A fault inside an event handler. The engine logs this and proceeds
    /// with the next event; virtual time is never rewound.
    #[error("handler fault: {0}")]
    HandlerFault(String),

    /// The telemetry sink failed to accept a record. The simulation continues.
    #[error("telemetry sink error: {0}")]
    Telemetry(String),
}

/// Convenience alias used throughout the crate.
pub type SimResult<T> = Result<T, SimError>;
