use rapier3d::prelude::Real;
use serde::{Deserialize, Serialize};

/// Polled, pre-debounced driver controls for one tick.
///
/// Keys and gamepad signals are kept separate; the controller treats either
/// source as a request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverInput {
    pub forward: bool,
    pub backward: bool,
    pub left: bool,
    pub right: bool,

    pub trigger_accelerate: f32, // 0..1
    pub trigger_reverse: f32,    // 0..1
    pub stick_x: f32,            // -1 (left) .. 1 (right)

    pub brake: bool,
}

impl DriverInput {
    /// Keyboard-style snapshot from signed axes: throttle > 0 accelerates,
    /// < 0 reverses, steer < 0 turns left.
    pub fn from_axes(throttle: Real, steer: Real, brake: bool) -> Self {
        Self {
            forward: throttle > 0.0,
            backward: throttle < 0.0,
            left: steer < 0.0,
            right: steer > 0.0,
            brake,
            ..Self::default()
        }
    }

    pub fn accelerate_requested(&self) -> bool {
        self.forward || self.trigger_accelerate != 0.0
    }

    pub fn reverse_requested(&self) -> bool {
        self.backward || self.trigger_reverse != 0.0
    }

    /// Left wins when both directions are held.
    pub fn steering_target(&self, steering_angle_max: Real) -> Real {
        if self.left || self.stick_x < 0.0 {
            -steering_angle_max
        } else if self.right || self.stick_x > 0.0 {
            steering_angle_max
        } else {
            0.0
        }
    }

    pub fn brake_requested(&self) -> bool {
        self.brake
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn triggers_count_as_pedals() {
        let input = DriverInput { trigger_reverse: 0.4, ..DriverInput::default() };
        assert!(input.reverse_requested());
        assert!(!input.accelerate_requested());
    }

    #[test]
    fn steering_target_from_keys_and_stick() {
        let max = 0.7;
        assert_eq!(DriverInput::from_axes(0.0, -1.0, false).steering_target(max), -max);
        assert_eq!(DriverInput { stick_x: 0.2, ..DriverInput::default() }.steering_target(max), max);
        assert_eq!(DriverInput::default().steering_target(max), 0.0);
    }

    #[test]
    fn deserializes_partial_snapshots() {
        let input: DriverInput = serde_json::from_str(r#"{ "forward": true, "stick_x": -0.5 }"#).unwrap();
        assert!(input.accelerate_requested());
        assert!(!input.brake_requested());
        assert_eq!(input.steering_target(1.0), -1.0);
    }
}
