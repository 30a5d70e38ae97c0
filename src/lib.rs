//! vehicle-sim: per-tick car dynamics (Pacejka tires, automatic gearbox,
//! aero, anti-roll bars) layered over a raycast-wheel physics engine.

pub mod adapter;
pub mod controller;
pub mod dynamics;
pub mod error;
pub mod input;
pub mod physics;
pub mod telemetry;
pub mod tuning;

pub use adapter::VehicleEngine;
pub use controller::{SharedTransform, Transform, VehicleController};
pub use error::{BuildError, TuningError};
pub use input::DriverInput;
pub use tuning::VehicleTuning;
