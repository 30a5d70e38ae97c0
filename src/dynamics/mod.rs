//! dynamics - engine-agnostic vehicle force models (tire, gearbox, aero, anti-roll)

pub mod types;
pub mod tire;
pub mod gearbox;
pub mod aero;
pub mod anti_roll;

pub use types::*;
