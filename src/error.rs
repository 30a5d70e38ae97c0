//! Error types for tuning loading and vehicle construction.
//!
//! Runtime anomalies (airborne wheels, near-zero speeds) are not errors; they
//! degrade to "no force this tick" inside the models.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TuningError {
    #[error("failed to read tuning file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse tuning: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("gearbox needs at least one forward ratio")]
    NoForwardGears,

    #[error("engine torque map needs at least one sample")]
    EmptyTorqueMap,

    #[error("engine torque map rpm must be strictly increasing (sample {index})")]
    TorqueMapNotIncreasing { index: usize },

    #[error("{name} must be positive, got {value}")]
    NotPositive { name: &'static str, value: f32 },

    #[error("{name} must be within [{min}, {max}], got {value}")]
    OutOfRange {
        name: &'static str,
        value: f32,
        min: f32,
        max: f32,
    },
}

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("chassis body is not a valid dynamic body in the physics world")]
    InvalidChassis,

    #[error("tuning rejected: {0}")]
    InvalidTuning(#[from] TuningError),
}
