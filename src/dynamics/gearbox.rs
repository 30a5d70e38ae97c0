// ==============================================================================
// gearbox.rs — AUTOMATIC GEARBOX + ENGINE TORQUE
// ------------------------------------------------------------------------------
// Small state machine mapping throttle + wheel angular velocity to:
// - gear index   (-1 reverse, 0 neutral, 1..=N forward)
// - engine rpm   (clamped to [idle, max])
// - engine torque (piecewise-linear torque map, scaled)
//
// Shifting is modeled as an explicit tagged state: while `Shifting`, gear
// selection is frozen and only the countdown runs.
// ==============================================================================

use std::f32::consts::PI;

use rapier3d::prelude::Real;
use serde::Serialize;

use crate::tuning::VehicleTuning;

/// Timer values at or below this count as expired.
const SHIFT_TIMER_EPSILON: Real = 1e-5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum ShiftState {
    Engaged,
    Shifting { remaining: Real }, // s
}

#[derive(Debug, Clone)]
pub struct Gearbox {
    gear: i32,
    gear_ratio: Real,
    engine_rpm: Real,
    shift: ShiftState,
}

impl Gearbox {
    pub fn new(tuning: &VehicleTuning) -> Self {
        Self {
            gear: 0,
            gear_ratio: 0.0,
            engine_rpm: tuning.engine_idle_rpm,
            shift: ShiftState::Engaged,
        }
    }

    pub fn gear(&self) -> i32 {
        self.gear
    }

    pub fn gear_ratio(&self) -> Real {
        self.gear_ratio
    }

    pub fn engine_rpm(&self) -> Real {
        self.engine_rpm
    }

    pub fn is_shifting(&self) -> bool {
        matches!(self.shift, ShiftState::Shifting { .. })
    }

    pub fn shift_timer(&self) -> Real {
        match self.shift {
            ShiftState::Shifting { remaining } => remaining,
            ShiftState::Engaged => 0.0,
        }
    }

    /// Overall ratio (gear * final drive) for a gear index. Neutral is 0.
    pub fn gear_ratio_for(tuning: &VehicleTuning, gear: i32) -> Real {
        match gear {
            -1 => tuning.gearbox_ratio_reverse * tuning.gearbox_final_drive,
            g if g >= 1 => tuning
                .gearbox_ratios
                .get((g - 1) as usize)
                .map_or(0.0, |ratio| ratio * tuning.gearbox_final_drive),
            _ => 0.0,
        }
    }

    /// One tick of gear selection. `reverse_locked` blocks entering reverse
    /// while the vehicle is still coasting forward.
    pub fn update_gear(&mut self, tuning: &VehicleTuning, throttle: Real, reverse_locked: bool, dt: Real) {
        match self.shift {
            ShiftState::Shifting { remaining } => {
                let remaining = remaining - dt;
                self.shift = if remaining <= SHIFT_TIMER_EPSILON {
                    ShiftState::Engaged
                } else {
                    ShiftState::Shifting { remaining }
                };
            }
            ShiftState::Engaged => {
                if throttle < 0.0 && !reverse_locked {
                    self.gear = -1;
                } else if throttle > 0.0 && self.gear <= 0 {
                    self.gear = 1;
                }

                let forward_gears = tuning.forward_gear_count();
                if self.engine_rpm > tuning.gearbox_rpm_upshift && self.gear >= 1 && self.gear < forward_gears {
                    self.gear += 1;
                    self.shift = ShiftState::Shifting { remaining: tuning.gearbox_shift_delay };
                } else if self.engine_rpm < tuning.gearbox_rpm_downshift && self.gear > 1 {
                    self.gear -= 1;
                    self.shift = ShiftState::Shifting { remaining: tuning.gearbox_shift_delay };
                }
            }
        }

        self.gear_ratio = Self::gear_ratio_for(tuning, self.gear);
    }

    /// Engine rpm from the drive wheel angular velocity (rad/s).
    pub fn update_rpm(&mut self, tuning: &VehicleTuning, wheel_angular_velocity: Real) {
        let wheel_rpm = wheel_angular_velocity.abs() * 60.0 / (2.0 * PI);
        let rpm = tuning.engine_idle_rpm + wheel_rpm * self.gear_ratio * tuning.engine_rpm_wheel_coupling;

        self.engine_rpm = if rpm.is_finite() {
            rpm.clamp(tuning.engine_idle_rpm, tuning.engine_max_rpm)
        } else {
            tuning.engine_max_rpm
        };
    }

    /// Normalized torque at `rpm` from the tuning torque map.
    pub fn torque_curve(tuning: &VehicleTuning, rpm: Real) -> Real {
        let map = &tuning.engine_torque_map;
        let (Some(&(x_first, y_first)), Some(&(x_last, y_last))) = (map.first(), map.last()) else {
            return 0.0;
        };

        if rpm < x_first {
            // line through the origin and the first sample; idle rpm gets no special value
            return (y_first * rpm / x_first).max(0.0);
        }
        if rpm >= x_last {
            return y_last.max(0.0);
        }

        for pair in map.windows(2) {
            let (x1, y1) = pair[0];
            let (x2, y2) = pair[1];
            if rpm >= x1 && rpm <= x2 {
                let t = (rpm - x1) / (x2 - x1);
                return (y1 + t * (y2 - y1)).max(0.0);
            }
        }

        0.0
    }

    /// Unsigned engine torque for this tick; the caller applies the sign.
    pub fn compute_torque(
        &mut self,
        tuning: &VehicleTuning,
        throttle: Real,
        reverse_locked: bool,
        wheel_angular_velocity: Real,
        dt: Real,
    ) -> Real {
        self.update_gear(tuning, throttle, reverse_locked, dt);
        self.update_rpm(tuning, wheel_angular_velocity);

        Self::torque_curve(tuning, self.engine_rpm)
            * tuning.engine_torque_curve_scale
            * throttle.abs()
            * tuning.transmission_efficiency
            * tuning.engine_torque_max
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const DT: Real = 1.0 / 60.0;

    #[test]
    fn throttle_selects_first_and_reverse() {
        let tuning = VehicleTuning::ae86();
        let mut gearbox = Gearbox::new(&tuning);
        assert_eq!(gearbox.gear(), 0);

        gearbox.update_gear(&tuning, 1.0, false, DT);
        assert_eq!(gearbox.gear(), 1);
        assert_relative_eq!(gearbox.gear_ratio(), 3.166 * 4.312, epsilon = 1e-4);

        gearbox.update_gear(&tuning, -1.0, true, DT);
        assert_eq!(gearbox.gear(), 1);

        gearbox.update_gear(&tuning, -1.0, false, DT);
        assert_eq!(gearbox.gear(), -1);
        assert_relative_eq!(gearbox.gear_ratio(), 3.25 * 4.312, epsilon = 1e-4);
    }

    #[test]
    fn high_rpm_upshifts_and_freezes_selection() {
        let tuning = VehicleTuning::ae86();
        let mut gearbox = Gearbox::new(&tuning);

        gearbox.update_gear(&tuning, 1.0, false, DT);
        gearbox.update_rpm(&tuning, 1_000.0);
        assert_eq!(gearbox.engine_rpm(), tuning.engine_max_rpm);

        gearbox.update_gear(&tuning, 1.0, false, DT);
        assert_eq!(gearbox.gear(), 2);
        assert!(gearbox.is_shifting());
        assert_relative_eq!(gearbox.shift_timer(), tuning.gearbox_shift_delay);

        // frozen: rpm still above threshold, throttle flips, nothing changes
        let mut previous = gearbox.shift_timer();
        let mut ticks = 0;
        while gearbox.is_shifting() {
            gearbox.update_gear(&tuning, -1.0, false, DT);
            ticks += 1;
            assert_eq!(gearbox.gear(), 2);
            assert!(gearbox.shift_timer() < previous);
            previous = gearbox.shift_timer();
        }

        assert_eq!(ticks, 18);
        assert_eq!(gearbox.shift_timer(), 0.0);
    }

    #[test]
    fn gear_stays_within_bounds() {
        let tuning = VehicleTuning::ae86();
        let mut gearbox = Gearbox::new(&tuning);

        for _ in 0..2_000 {
            gearbox.compute_torque(&tuning, 1.0, false, 10_000.0, DT);
            assert!(gearbox.gear() <= tuning.forward_gear_count());
        }
        assert_eq!(gearbox.gear(), tuning.forward_gear_count());

        for _ in 0..2_000 {
            gearbox.compute_torque(&tuning, -1.0, false, 0.0, DT);
            assert!(gearbox.gear() >= -1);
        }
        assert_eq!(gearbox.gear(), -1);
    }

    #[test]
    fn low_rpm_downshifts() {
        let tuning = VehicleTuning::ae86();
        let mut gearbox = Gearbox::new(&tuning);

        gearbox.update_gear(&tuning, 1.0, false, DT);
        gearbox.update_rpm(&tuning, 1_000.0);
        gearbox.update_gear(&tuning, 1.0, false, DT);
        while gearbox.is_shifting() {
            gearbox.update_gear(&tuning, 1.0, false, DT);
        }
        assert_eq!(gearbox.gear(), 2);

        gearbox.update_rpm(&tuning, 0.0);
        gearbox.update_gear(&tuning, 1.0, false, DT);
        assert_eq!(gearbox.gear(), 1);
    }

    #[test]
    fn neutral_keeps_idle_rpm() {
        let tuning = VehicleTuning::ae86();
        let mut gearbox = Gearbox::new(&tuning);

        gearbox.update_gear(&tuning, 0.0, false, DT);
        gearbox.update_rpm(&tuning, 50.0);
        assert_eq!(gearbox.gear(), 0);
        assert_eq!(gearbox.engine_rpm(), tuning.engine_idle_rpm);
    }

    #[test]
    fn torque_curve_interpolates_and_clamps() {
        let tuning = VehicleTuning::ae86();

        assert_relative_eq!(Gearbox::torque_curve(&tuning, 1_500.0), 0.3, epsilon = 1e-5);
        assert_relative_eq!(Gearbox::torque_curve(&tuning, 5_000.0), 1.0, epsilon = 1e-5);
        assert_relative_eq!(Gearbox::torque_curve(&tuning, 7_600.0), 0.75, epsilon = 1e-5);
        assert_relative_eq!(Gearbox::torque_curve(&tuning, 900.0), 0.18, epsilon = 1e-5);

        // below the first sample: straight line from the origin, idle rpm not special
        assert_eq!(Gearbox::torque_curve(&tuning, 0.0), 0.0);
        assert_relative_eq!(Gearbox::torque_curve(&tuning, 500.0), 0.1, epsilon = 1e-5);
        assert_relative_eq!(Gearbox::torque_curve(&tuning, tuning.engine_idle_rpm), 0.2 * 900.0 / 1000.0, epsilon = 1e-5);
    }

    #[test]
    fn torque_scales_with_throttle_magnitude() {
        let tuning = VehicleTuning::ae86();
        let mut full = Gearbox::new(&tuning);
        let mut half = Gearbox::new(&tuning);

        let full_torque = full.compute_torque(&tuning, 1.0, false, 0.0, DT);
        let half_torque = half.compute_torque(&tuning, 0.5, false, 0.0, DT);

        let expected = 0.18 * 20.0 * 0.98 * 147.1;
        assert_relative_eq!(full_torque, expected, epsilon = 1e-2);
        assert_relative_eq!(half_torque, expected * 0.5, epsilon = 1e-2);
    }
}
