//! Core shared types for `dynamics` (engine-agnostic).
use std::fmt;

use rapier3d::prelude::Real;
use serde::{Deserialize, Serialize};

/// Biases denominators and atan2 arguments away from fuzzy zero.
pub const SMALL_FLOAT: Real = 1e-4;

/// Signed speed (m/s) below which the vehicle counts as stationary.
pub const MOVEMENT_DEADBAND: Real = 0.1;

pub const WHEEL_COUNT: usize = 4;

// ============================================
// Wheel identification
// ============================================

/// Wheel slots as registered with the physics engine: front pair {0, 1},
/// rear pair {2, 3}.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum WheelId { FL, FR, RL, RR }

impl WheelId {
    pub const ALL: [WheelId; WHEEL_COUNT] = [WheelId::FL, WheelId::FR, WheelId::RL, WheelId::RR];

    pub fn index(&self) -> usize {
        match self {
            WheelId::FL => 0,
            WheelId::FR => 1,
            WheelId::RL => 2,
            WheelId::RR => 3,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WheelId::FL => "FL",
            WheelId::FR => "FR",
            WheelId::RL => "RL",
            WheelId::RR => "RR",
        }
    }

    pub fn is_front(&self) -> bool {
        matches!(self, WheelId::FL | WheelId::FR)
    }

    pub fn is_rear(&self) -> bool {
        matches!(self, WheelId::RL | WheelId::RR)
    }
}

impl fmt::Display for WheelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================
// Movement direction
// ============================================

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub enum MovementState {
    #[default]
    Stationary,
    Forward,
    Backward,
}

impl MovementState {
    /// Classifies signed chassis speed (m/s) with a ±0.1 m/s deadband.
    pub fn from_speed(speed: Real) -> Self {
        if speed > MOVEMENT_DEADBAND {
            MovementState::Forward
        } else if speed < -MOVEMENT_DEADBAND {
            MovementState::Backward
        } else {
            MovementState::Stationary
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wheel_indices_round_trip() {
        for id in WheelId::ALL {
            assert_eq!(WheelId::from_index(id.index()), Some(id));
        }
        assert_eq!(WheelId::from_index(4), None);
        assert!(WheelId::FR.is_front() && WheelId::RL.is_rear());
    }

    #[test]
    fn movement_state_has_deadband() {
        assert_eq!(MovementState::from_speed(0.05), MovementState::Stationary);
        assert_eq!(MovementState::from_speed(-0.1), MovementState::Stationary);
        assert_eq!(MovementState::from_speed(0.11), MovementState::Forward);
        assert_eq!(MovementState::from_speed(-3.0), MovementState::Backward);
    }
}
