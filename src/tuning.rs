// ==============================================================================
// tuning.rs — VEHICLE ARCHETYPE TUNING TABLE
// ------------------------------------------------------------------------------
// Immutable description of one vehicle archetype: engine, gearbox, suspension,
// anti-roll bars, brakes, steering, aerodynamics and tire curve.
//
// - Units are SI (meters, newtons, seconds, radians) unless the field says rpm.
// - `VehicleTuning::default()` is the AE86 Sprinter Trueno archetype. Where
//   literature was not available the values are approximations.
// - A tuning is validated once and then shared read-only (`Arc<VehicleTuning>`)
//   by every controller simulating that archetype.
// ==============================================================================

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::TuningError;

/// Pacejka '94 coefficients. b0, b2, b4 and b8 shape the curve; the rest are
/// zero for the sample archetype.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PacejkaCoefficients {
    pub b0: f32,  // shape factor C
    pub b1: f32,  // load influence on peak factor
    pub b2: f32,  // peak factor
    pub b3: f32,  // curvature of stiffness/load
    pub b4: f32,  // stiffness/load
    pub b5: f32,  // stiffness decay with load
    pub b6: f32,  // curvature factor (load²)
    pub b7: f32,  // curvature factor (load)
    pub b8: f32,  // curvature factor
    pub b9: f32,  // horizontal shift (load)
    pub b10: f32, // horizontal shift
    pub b11: f32, // vertical shift (load)
    pub b12: f32, // vertical shift
    pub b13: f32, // curvature asymmetry
}

impl Default for PacejkaCoefficients {
    fn default() -> Self {
        Self {
            b0: 1.5,
            b1: 0.0,
            b2: 1.0,
            b3: 0.0,
            b4: 300.0,
            b5: 0.0,
            b6: 0.0,
            b7: 0.0,
            b8: -2.0,
            b9: 0.0,
            b10: 0.0,
            b11: 0.0,
            b12: 0.0,
            b13: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VehicleTuning {
    // --- Engine ---
    pub engine_torque_max: f32,              // N·m
    pub engine_max_rpm: f32,                 // rpm (redline)
    pub engine_idle_rpm: f32,                // rpm
    pub engine_torque_map: Vec<(f32, f32)>,  // (rpm, normalized torque), rpm strictly increasing
    pub engine_torque_curve_scale: f32,      // curve -> absolute torque multiplier
    pub engine_rpm_wheel_coupling: f32,      // wheel rpm * ratio -> engine rpm multiplier

    // --- Gearbox ---
    pub gearbox_ratios: Vec<f32>,            // forward gears, first gear first
    pub gearbox_ratio_reverse: f32,
    pub gearbox_final_drive: f32,
    pub gearbox_rpm_upshift: f32,            // rpm
    pub gearbox_rpm_downshift: f32,          // rpm
    pub gearbox_shift_delay: f32,            // s (human + mechanical shift latency)
    pub transmission_efficiency: f32,        // 0..1 (clutch and flywheel losses)

    // --- Suspension ---
    pub suspension_stiffness: f32,           // N/m per unit chassis mass
    pub suspension_damping: f32,
    pub suspension_compression: f32,
    pub suspension_force_max: f32,           // N
    pub suspension_length: f32,              // m
    pub suspension_rest_length: f32,         // m, spring length at equilibrium
    pub suspension_travel_max: f32,          // m

    // --- Anti-roll bars ---
    pub anti_roll_bar_stiffness_front: f32,  // higher reduces oversteer
    pub anti_roll_bar_stiffness_rear: f32,   // higher reduces understeer

    // --- Brakes ---
    pub brake_force_max: f32,                // N
    pub brake_ramp_speed: f32,               // N/s

    // --- Steering ---
    pub steering_angle_max: f32,             // radians
    pub steering_return_speed: f32,          // 1/s lerp rate

    // --- Aerodynamics ---
    pub aerodynamics_air_density: f32,          // kg/m³
    pub aerodynamics_car_drag_coefficient: f32,
    pub aerodynamics_car_frontal_area: f32,     // m²
    pub aerodynamic_downforce: f32,             // N/(m/s)²

    // --- Tires ---
    pub wheel_radius: f32,                   // m
    pub tire_friction: f32,                  // lateral grip scalar, also the engine friction slip
    pub pacejka: PacejkaCoefficients,

    // --- Wheel layout (chassis space) ---
    pub wheel_extent_forward: f32,           // m, half wheelbase before trims
    pub wheel_extent_sideways: f32,          // m, half track
    pub wheel_trim_front: f32,               // m, pulls the front axle back
    pub wheel_trim_rear: f32,                // m, pulls the rear axle forward

    // --- Chassis ---
    pub chassis_mass: f32,                   // kg
    pub chassis_half_extents: [f32; 3],      // [hx, hy, hz] m
}

impl Default for VehicleTuning {
    fn default() -> Self {
        Self::ae86()
    }
}

impl VehicleTuning {
    /// Toyota AE86 Sprinter Trueno.
    pub fn ae86() -> Self {
        let engine_max_rpm = 7600.0;
        let suspension_length = 0.35;

        Self {
            engine_torque_max: 147.1,
            engine_max_rpm,
            engine_idle_rpm: 900.0,
            engine_torque_map: vec![
                (1000.0, 0.2),
                (2000.0, 0.4),
                (3000.0, 0.65),
                (4000.0, 0.9),
                (5000.0, 1.0), // peak torque
                (6000.0, 0.9),
                (7000.0, 0.75),
            ],
            engine_torque_curve_scale: 20.0,
            engine_rpm_wheel_coupling: 2.0,

            gearbox_ratios: vec![3.166, 1.904, 1.31, 0.969, 0.815],
            gearbox_ratio_reverse: 3.25,
            gearbox_final_drive: 4.312,
            gearbox_rpm_upshift: engine_max_rpm * 0.9,
            gearbox_rpm_downshift: engine_max_rpm * 0.2,
            gearbox_shift_delay: 0.3,
            transmission_efficiency: 0.98,

            suspension_stiffness: 100.0,
            suspension_damping: 2.0,
            suspension_compression: 1.0,
            suspension_force_max: 5000.0,
            suspension_length,
            suspension_rest_length: suspension_length * 0.8,
            suspension_travel_max: suspension_length * 0.5,

            anti_roll_bar_stiffness_front: 500.0,
            anti_roll_bar_stiffness_rear: 300.0,

            brake_force_max: 800.0,
            brake_ramp_speed: 5000.0,

            steering_angle_max: 40.0_f32.to_radians(),
            steering_return_speed: 5.0,

            aerodynamics_air_density: 1.225,
            aerodynamics_car_drag_coefficient: 0.34,
            aerodynamics_car_frontal_area: 1.9,
            aerodynamic_downforce: 0.2,

            wheel_radius: 0.25,
            tire_friction: 2.0,
            pacejka: PacejkaCoefficients::default(),

            wheel_extent_forward: 1.3,
            wheel_extent_sideways: 0.65,
            wheel_trim_front: 0.2,
            wheel_trim_rear: 0.25,

            chassis_mass: 940.0,
            chassis_half_extents: [0.8, 0.3, 2.1],
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, TuningError> {
        let tuning: Self = serde_json::from_str(json)?;
        tuning.validate()?;
        Ok(tuning)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, TuningError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| TuningError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    pub fn forward_gear_count(&self) -> i32 {
        self.gearbox_ratios.len() as i32
    }

    pub fn validate(&self) -> Result<(), TuningError> {
        if self.gearbox_ratios.is_empty() {
            return Err(TuningError::NoForwardGears);
        }
        if self.engine_torque_map.is_empty() {
            return Err(TuningError::EmptyTorqueMap);
        }
        for (index, pair) in self.engine_torque_map.windows(2).enumerate() {
            if pair[1].0 <= pair[0].0 {
                return Err(TuningError::TorqueMapNotIncreasing { index: index + 1 });
            }
        }

        let positive = [
            ("engine_max_rpm", self.engine_max_rpm),
            ("engine_idle_rpm", self.engine_idle_rpm),
            ("gearbox_final_drive", self.gearbox_final_drive),
            ("brake_ramp_speed", self.brake_ramp_speed),
            ("wheel_radius", self.wheel_radius),
            ("suspension_rest_length", self.suspension_rest_length),
            ("chassis_mass", self.chassis_mass),
        ];
        for (name, value) in positive {
            if !(value > 0.0) {
                return Err(TuningError::NotPositive { name, value });
            }
        }

        if self.engine_idle_rpm >= self.engine_max_rpm {
            return Err(TuningError::OutOfRange {
                name: "engine_idle_rpm",
                value: self.engine_idle_rpm,
                min: 0.0,
                max: self.engine_max_rpm,
            });
        }

        let ranged = [
            ("transmission_efficiency", self.transmission_efficiency, 0.0, 1.0),
            ("gearbox_shift_delay", self.gearbox_shift_delay, 0.0, f32::MAX),
            ("brake_force_max", self.brake_force_max, 0.0, f32::MAX),
            ("steering_angle_max", self.steering_angle_max, 0.0, std::f32::consts::FRAC_PI_2),
            ("steering_return_speed", self.steering_return_speed, 0.0, f32::MAX),
        ];
        for (name, value, min, max) in ranged {
            if !(min..=max).contains(&value) {
                return Err(TuningError::OutOfRange { name, value, min, max });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ae86_is_valid() {
        let tuning = VehicleTuning::ae86();
        assert!(tuning.validate().is_ok());
        assert_eq!(tuning.forward_gear_count(), 5);
        assert!((tuning.gearbox_rpm_upshift - 6840.0).abs() < 1e-3);
        assert!((tuning.suspension_rest_length - 0.28).abs() < 1e-6);
    }

    #[test]
    fn rejects_non_increasing_torque_map() {
        let mut tuning = VehicleTuning::ae86();
        tuning.engine_torque_map = vec![(1000.0, 0.2), (3000.0, 0.5), (3000.0, 0.6)];
        assert!(matches!(
            tuning.validate(),
            Err(TuningError::TorqueMapNotIncreasing { index: 2 })
        ));
    }

    #[test]
    fn rejects_missing_gears_and_bad_efficiency() {
        let mut tuning = VehicleTuning::ae86();
        tuning.gearbox_ratios.clear();
        assert!(matches!(tuning.validate(), Err(TuningError::NoForwardGears)));

        let mut tuning = VehicleTuning::ae86();
        tuning.transmission_efficiency = 1.2;
        assert!(matches!(
            tuning.validate(),
            Err(TuningError::OutOfRange { name: "transmission_efficiency", .. })
        ));
    }

    #[test]
    fn partial_json_falls_back_to_archetype() {
        let tuning = VehicleTuning::from_json_str(
            r#"{ "brake_force_max": 1200.0, "gearbox_ratios": [3.0, 2.0, 1.0] }"#,
        )
        .unwrap();

        assert_eq!(tuning.brake_force_max, 1200.0);
        assert_eq!(tuning.forward_gear_count(), 3);
        assert_eq!(tuning.engine_torque_max, 147.1);
        assert_eq!(tuning.pacejka, PacejkaCoefficients::default());
    }

    #[test]
    fn invalid_json_is_a_parse_error() {
        assert!(matches!(
            VehicleTuning::from_json_str("{ not json"),
            Err(TuningError::Parse(_))
        ));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = VehicleTuning::from_json_file("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, TuningError::Io { .. }));
    }
}
