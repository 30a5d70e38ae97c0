//! Aerodynamic drag and downforce as quadratic functions of planar speed.
//!
//! Both return non-negative magnitudes; the controller decides direction.

use rapier3d::prelude::Real;

use crate::tuning::VehicleTuning;

/// Downforce magnitude (N) at `speed` m/s.
#[inline]
pub fn compute_downforce(tuning: &VehicleTuning, speed: Real) -> Real {
    tuning.aerodynamic_downforce * speed * speed
}

/// Drag magnitude (N) at `speed` m/s: 0.5 * Cd * A * rho * v²
#[inline]
pub fn compute_drag(tuning: &VehicleTuning, speed: Real) -> Real {
    0.5 * tuning.aerodynamics_car_drag_coefficient
        * tuning.aerodynamics_car_frontal_area
        * tuning.aerodynamics_air_density
        * speed
        * speed
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn doubling_speed_quadruples_both() {
        let tuning = VehicleTuning::ae86();

        assert_relative_eq!(
            compute_drag(&tuning, 60.0),
            4.0 * compute_drag(&tuning, 30.0),
            max_relative = 1e-5
        );
        assert_relative_eq!(
            compute_downforce(&tuning, 60.0),
            4.0 * compute_downforce(&tuning, 30.0),
            max_relative = 1e-5
        );
    }

    #[test]
    fn magnitudes_match_archetype() {
        let tuning = VehicleTuning::ae86();

        assert_relative_eq!(compute_downforce(&tuning, 30.0), 180.0, epsilon = 1e-3);
        assert_relative_eq!(compute_drag(&tuning, 30.0), 356.1075, epsilon = 1e-2);
        assert!(compute_drag(&tuning, -30.0) > 0.0);
        assert_eq!(compute_drag(&tuning, 0.0), 0.0);
    }
}
