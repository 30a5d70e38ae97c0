// ==============================================================================
// adapter.rs — PHYSICS-ENGINE BOUNDARY
// ------------------------------------------------------------------------------
// Everything the vehicle model needs from (and gives to) the rigid-body /
// raycast-wheel engine goes through `VehicleEngine`. The engine stays a black
// box: it owns suspension raycasts, contacts and integration.
//
// This is also the only place that knows about the handedness mismatch between
// the simulation (X right, Y up, Z forward, left-handed) and the engine's
// right-handed wheel basis. The swizzle lives in `wheel_direction_forward`;
// nothing else in the crate flips axes.
//
// Per build:   VehicleDescriptor (suspension tuning + 4 wheel descriptors)
// Per tick:    ChassisState, WheelState queries
//              steering / engine force / brake commands
//              force-at-point and central force on the chassis
// ==============================================================================

use std::fmt;

use rapier3d::na::UnitQuaternion;
use rapier3d::prelude::{Isometry, Point, Real, Vector};

use crate::dynamics::types::{WHEEL_COUNT, WheelId};
use crate::tuning::VehicleTuning;

// ----------------------------------------------------------------------
// Build-time description
// ----------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WheelDescriptor {
    pub connection_point: Point<Real>,    // chassis space
    pub suspension_direction: Vector<Real>,
    pub axle: Vector<Real>,
    pub rest_length: Real,                // m
    pub radius: Real,                     // m
    pub is_front: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VehicleDescriptor {
    pub suspension_stiffness: Real,
    pub suspension_compression: Real,
    pub suspension_damping: Real,
    pub suspension_force_max: Real,       // N
    pub suspension_travel_max: Real,      // m
    pub friction_slip: Real,

    // coordinate system: X right, Y up, Z forward
    pub index_right_axis: usize,
    pub index_up_axis: usize,
    pub index_forward_axis: usize,

    pub wheels: [WheelDescriptor; WHEEL_COUNT],
}

impl VehicleDescriptor {
    pub fn from_tuning(tuning: &VehicleTuning) -> Self {
        let sideways = tuning.wheel_extent_sideways;
        let forward = tuning.wheel_extent_forward;
        let height = -tuning.suspension_length;

        let wheel = |id: WheelId| {
            let x = if matches!(id, WheelId::FL | WheelId::RL) { -sideways } else { sideways };
            let z = if id.is_front() {
                forward - tuning.wheel_trim_front
            } else {
                -forward + tuning.wheel_trim_rear
            };

            WheelDescriptor {
                connection_point: Point::new(x, height, z),
                suspension_direction: Vector::new(0.0, -1.0, 0.0),
                axle: Vector::new(1.0, 0.0, 0.0),
                rest_length: tuning.suspension_rest_length,
                radius: tuning.wheel_radius,
                is_front: id.is_front(),
            }
        };

        Self {
            suspension_stiffness: tuning.suspension_stiffness,
            suspension_compression: tuning.suspension_compression,
            suspension_damping: tuning.suspension_damping,
            suspension_force_max: tuning.suspension_force_max,
            suspension_travel_max: tuning.suspension_travel_max,
            friction_slip: tuning.tire_friction,
            index_right_axis: 0,
            index_up_axis: 1,
            index_forward_axis: 2,
            wheels: WheelId::ALL.map(wheel),
        }
    }
}

// ----------------------------------------------------------------------
// Per-tick snapshots
// ----------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
pub struct ChassisState {
    pub position: Isometry<Real>,
    pub linvel: Vector<Real>,
    pub angvel: Vector<Real>,
    pub center_of_mass: Point<Real>, // world
}

impl ChassisState {
    /// Velocity of a world-space point rigidly attached to the chassis.
    pub fn velocity_at_point(&self, point: &Point<Real>) -> Vector<Real> {
        self.linvel + self.angvel.cross(&(*point - self.center_of_mass))
    }

    pub fn forward(&self) -> Vector<Real> {
        self.position.rotation * Vector::z()
    }

    pub fn up(&self) -> Vector<Real> {
        self.position.rotation * Vector::y()
    }

    /// Speed magnitude in m/s, negative when moving against the forward axis.
    pub fn signed_speed(&self) -> Real {
        let speed = self.linvel.norm();
        if self.linvel.dot(&self.forward()) < 0.0 { -speed } else { speed }
    }

    pub fn speed_kmh(&self) -> Real {
        self.signed_speed() * 3.6
    }
}

#[derive(Debug, Clone, Copy)]
pub struct WheelState {
    pub world_transform: Isometry<Real>, // engine wheel basis (right-handed)
    pub in_contact: bool,
    pub contact_point: Point<Real>,      // world
    pub suspension_length: Real,         // m
    pub suspension_force: Real,          // N, the tire normal load
    pub steering: Real,                  // rad
    pub rotation: Real,                  // rad, accumulated spin
    pub delta_rotation: Real,            // rad, spin during the last step
    pub engine_force: Real,              // N
    pub axle: Vector<Real>,              // world
    pub radius: Real,                    // m
}

/// Fudge factors for engines whose own friction model is not accurate enough.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineCorrections {
    pub tire_force_scale: Real,
    pub brake_force_scale: Real,
}

impl Default for EngineCorrections {
    fn default() -> Self {
        Self { tire_force_scale: 1.0, brake_force_scale: 0.1 }
    }
}

// ----------------------------------------------------------------------
// Engine trait
// ----------------------------------------------------------------------

pub trait VehicleEngine {
    /// Handle of the rigid body the vehicle is built on.
    type Chassis: Copy + fmt::Debug;
    /// Engine-side vehicle object, exclusively owned by one controller.
    type Vehicle;

    /// None if the chassis handle does not name a usable dynamic body.
    fn create_vehicle(&mut self, chassis: Self::Chassis, descriptor: &VehicleDescriptor) -> Option<Self::Vehicle>;
    fn destroy_vehicle(&mut self, vehicle: Self::Vehicle);

    fn chassis_state(&self, vehicle: &Self::Vehicle) -> Option<ChassisState>;
    fn wheel_count(&self, vehicle: &Self::Vehicle) -> usize;
    fn wheel_state(&self, vehicle: &Self::Vehicle, index: usize) -> Option<WheelState>;

    fn set_steering(&mut self, vehicle: &mut Self::Vehicle, index: usize, steering: Real);
    fn apply_engine_force(&mut self, vehicle: &mut Self::Vehicle, index: usize, force: Real);
    fn set_brake(&mut self, vehicle: &mut Self::Vehicle, index: usize, brake: Real);

    /// `point` is in world space.
    fn apply_force_at_point(&mut self, vehicle: &Self::Vehicle, force: Vector<Real>, point: Point<Real>);
    fn apply_central_force(&mut self, vehicle: &Self::Vehicle, force: Vector<Real>);

    fn corrections(&self) -> EngineCorrections {
        EngineCorrections::default()
    }
}

// ----------------------------------------------------------------------
// Conversions
// ----------------------------------------------------------------------

#[inline]
pub fn planar(v: Vector<Real>) -> Vector<Real> {
    Vector::new(v.x, 0.0, v.z)
}

/// Planar wheel heading from the engine wheel basis. Column 0 of that basis is
/// the negated axle; swizzling it into (z, 0, -x) gives forward.
pub fn wheel_direction_forward(wheel_rotation: &UnitQuaternion<Real>) -> Vector<Real> {
    let column = (wheel_rotation * Vector::x())
        .try_normalize(Real::EPSILON)
        .unwrap_or_else(Vector::x);
    Vector::new(column.z, 0.0, -column.x)
}

pub fn wheel_direction_right(wheel_forward: &Vector<Real>) -> Vector<Real> {
    wheel_forward.cross(&Vector::y())
}

/// Planar velocity at the wheel contact point.
pub fn wheel_velocity(chassis: &ChassisState, wheel: &WheelState) -> Vector<Real> {
    let angular = chassis.angvel.cross(&-wheel.axle) * wheel.radius;
    let linear = chassis.velocity_at_point(&wheel.contact_point);
    planar(angular + linear)
}

#[inline]
pub fn adjust_tire_force(corrections: &EngineCorrections, force: Vector<Real>) -> Vector<Real> {
    force * corrections.tire_force_scale
}

#[inline]
pub fn adjust_brake_force(corrections: &EngineCorrections, brake_force: Real) -> Real {
    brake_force * corrections.brake_force_scale
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rapier3d::na::Translation3;
    use std::f32::consts::{FRAC_PI_2, PI};

    fn chassis(linvel: Vector<Real>, angvel: Vector<Real>) -> ChassisState {
        ChassisState {
            position: Isometry::identity(),
            linvel,
            angvel,
            center_of_mass: Point::origin(),
        }
    }

    #[test]
    fn rest_basis_faces_forward() {
        // (-axle, up, up x axle) with axle +X is a half turn about Y
        let basis = UnitQuaternion::from_axis_angle(&Vector::y_axis(), PI);

        let forward = wheel_direction_forward(&basis);
        assert_relative_eq!(forward, Vector::new(0.0, 0.0, 1.0), epsilon = 1e-6);
        assert_relative_eq!(wheel_direction_right(&forward), Vector::new(-1.0, 0.0, 0.0), epsilon = 1e-6);
    }

    #[test]
    fn steering_turns_forward_toward_positive_x() {
        let steer = 0.3;
        let basis = UnitQuaternion::from_axis_angle(&Vector::y_axis(), steer + PI);

        let forward = wheel_direction_forward(&basis);
        assert_relative_eq!(forward, Vector::new(steer.sin(), 0.0, steer.cos()), epsilon = 1e-6);
        assert_relative_eq!(forward.norm(), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn known_vector_pairs_swizzle() {
        let quarter = UnitQuaternion::from_axis_angle(&Vector::y_axis(), FRAC_PI_2);
        // column 0 = (0, 0, -1) -> forward (-1, 0, 0)
        assert_relative_eq!(wheel_direction_forward(&quarter), Vector::new(-1.0, 0.0, 0.0), epsilon = 1e-6);

        let identity = UnitQuaternion::identity();
        // column 0 = (1, 0, 0) -> forward (0, 0, -1)
        assert_relative_eq!(wheel_direction_forward(&identity), Vector::new(0.0, 0.0, -1.0), epsilon = 1e-6);
    }

    #[test]
    fn wheel_velocity_is_planar_and_includes_yaw() {
        let state = chassis(Vector::new(0.0, 0.5, 10.0), Vector::new(0.0, 1.0, 0.0));
        let wheel = WheelState {
            world_transform: Isometry::identity(),
            in_contact: true,
            contact_point: Point::new(1.0, -0.5, 0.0),
            suspension_length: 0.3,
            suspension_force: 2000.0,
            steering: 0.0,
            rotation: 0.0,
            delta_rotation: 0.0,
            engine_force: 0.0,
            axle: Vector::new(1.0, 0.0, 0.0),
            radius: 0.25,
        };

        let v = wheel_velocity(&state, &wheel);
        // linear: (0, .5, 10) + (0,1,0) x (1,-.5,0) = (0, .5, 9)
        // angular: (0,1,0) x (-1,0,0) * .25 = (0, 0, .25)
        assert_relative_eq!(v, Vector::new(0.0, 0.0, 9.25), epsilon = 1e-5);
    }

    #[test]
    fn signed_speed_follows_chassis_forward() {
        let mut state = chassis(Vector::new(0.0, 0.0, -5.0), Vector::zeros());
        assert_relative_eq!(state.signed_speed(), -5.0);
        assert_relative_eq!(state.speed_kmh(), -18.0, epsilon = 1e-4);

        state.position = Isometry::from_parts(
            Translation3::new(0.0, 1.0, 0.0),
            UnitQuaternion::from_axis_angle(&Vector::y_axis(), PI),
        );
        assert!(state.signed_speed() > 0.0);
    }

    #[test]
    fn descriptor_places_wheels_per_axle() {
        let descriptor = VehicleDescriptor::from_tuning(&VehicleTuning::ae86());

        let fl = descriptor.wheels[WheelId::FL.index()];
        let rr = descriptor.wheels[WheelId::RR.index()];
        assert_relative_eq!(fl.connection_point, Point::new(-0.65, -0.35, 1.1), epsilon = 1e-6);
        assert_relative_eq!(rr.connection_point, Point::new(0.65, -0.35, -1.05), epsilon = 1e-6);
        assert!(fl.is_front && !rr.is_front);
        assert_eq!(descriptor.index_forward_axis, 2);
    }

    #[test]
    fn default_corrections_scale_brake_only() {
        let corrections = EngineCorrections::default();
        assert_eq!(adjust_brake_force(&corrections, 800.0), 80.0);
        assert_eq!(adjust_tire_force(&corrections, Vector::new(1.0, 0.0, 2.0)), Vector::new(1.0, 0.0, 2.0));
    }
}
