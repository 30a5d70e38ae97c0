//! Deterministic in-memory `VehicleEngine` for controller scenarios.
//!
//! The chassis only moves along +Z/-Z: drive wheels push with `-engine_force`
//! (the raycast engine's sign), brakes decelerate toward zero. Every wheel is
//! grounded unless a test says otherwise. Forces submitted by the controller
//! are recorded, not integrated.

#![allow(dead_code)]

use std::f32::consts::PI;

use rapier3d::na::{Translation3, UnitQuaternion};
use rapier3d::prelude::{Isometry, Point, Real, Vector};

use vehicle_sim::adapter::{ChassisState, VehicleDescriptor, VehicleEngine, WheelState};

pub const VALID_CHASSIS: u32 = 1;
pub const GRAVITY: Real = 9.81;

/// Brake newtons (as submitted) -> decelerating force on the chassis.
const BRAKE_GAIN: Real = 20.0;

#[derive(Debug, Clone, Copy)]
pub struct MockWheel {
    pub connection_point: Point<Real>,
    pub radius: Real,
    pub steering: Real,
    pub engine_force: Real,
    pub brake: Real,
    pub rotation: Real,
    pub delta_rotation: Real,
}

#[derive(Debug)]
pub struct MockVehicle {
    pub wheels: Vec<MockWheel>,
}

#[derive(Debug)]
pub struct MockEngine {
    pub mass: Real,
    pub position: Point<Real>,
    pub linvel: Vector<Real>,
    pub in_contact: [bool; 4],
    pub suspension_length: [Real; 4],

    pub created: usize,
    pub destroyed: usize,
    pub commands: usize,
    pub point_forces: Vec<(Vector<Real>, Point<Real>)>,
    pub central_forces: Vec<Vector<Real>>,
}

impl MockEngine {
    pub fn new(mass: Real) -> Self {
        Self {
            mass,
            position: Point::new(0.0, 0.6, 0.0),
            linvel: Vector::zeros(),
            in_contact: [true; 4],
            suspension_length: [0.28; 4],
            created: 0,
            destroyed: 0,
            commands: 0,
            point_forces: Vec::new(),
            central_forces: Vec::new(),
        }
    }

    /// One engine step: integrate drive and brakes, spin the wheels, drop the
    /// recorded forces.
    pub fn advance(&mut self, vehicle: &mut MockVehicle, dt: Real) {
        let drive: Real = vehicle.wheels.iter().map(|w| -w.engine_force).sum();
        let brake: Real = vehicle.wheels.iter().map(|w| w.brake).sum::<Real>() * BRAKE_GAIN;

        let mut speed = self.linvel.z + drive / self.mass * dt;
        let slow_down = brake / self.mass * dt;
        speed = if speed.abs() <= slow_down { 0.0 } else { speed - slow_down * speed.signum() };

        self.linvel = Vector::new(0.0, 0.0, speed);
        self.position += self.linvel * dt;

        for wheel in &mut vehicle.wheels {
            wheel.delta_rotation = speed * dt / wheel.radius;
            wheel.rotation += wheel.delta_rotation;
        }

        self.point_forces.clear();
        self.central_forces.clear();
    }

    pub fn wheel_position(&self, vehicle: &MockVehicle, index: usize) -> Point<Real> {
        let wheel = &vehicle.wheels[index];
        Point::new(
            self.position.x + wheel.connection_point.x,
            self.position.y + wheel.connection_point.y - self.suspension_length[index],
            self.position.z + wheel.connection_point.z,
        )
    }
}

impl VehicleEngine for MockEngine {
    type Chassis = u32;
    type Vehicle = MockVehicle;

    fn create_vehicle(&mut self, chassis: u32, descriptor: &VehicleDescriptor) -> Option<MockVehicle> {
        if chassis != VALID_CHASSIS {
            return None;
        }
        self.created += 1;

        let wheels = descriptor
            .wheels
            .iter()
            .map(|w| MockWheel {
                connection_point: w.connection_point,
                radius: w.radius,
                steering: 0.0,
                engine_force: 0.0,
                brake: 0.0,
                rotation: 0.0,
                delta_rotation: 0.0,
            })
            .collect();
        Some(MockVehicle { wheels })
    }

    fn destroy_vehicle(&mut self, _vehicle: MockVehicle) {
        self.destroyed += 1;
    }

    fn chassis_state(&self, _vehicle: &MockVehicle) -> Option<ChassisState> {
        Some(ChassisState {
            position: Isometry::translation(self.position.x, self.position.y, self.position.z),
            linvel: self.linvel,
            angvel: Vector::zeros(),
            center_of_mass: self.position,
        })
    }

    fn wheel_count(&self, vehicle: &MockVehicle) -> usize {
        vehicle.wheels.len()
    }

    fn wheel_state(&self, vehicle: &MockVehicle, index: usize) -> Option<WheelState> {
        let wheel = vehicle.wheels.get(index)?;
        let center = self.wheel_position(vehicle, index);

        // engine basis at rest is a half turn about up; steering adds to it
        let rotation = UnitQuaternion::from_axis_angle(&Vector::y_axis(), wheel.steering + PI);

        Some(WheelState {
            world_transform: Isometry::from_parts(Translation3::from(center.coords), rotation),
            in_contact: self.in_contact[index],
            contact_point: Point::new(center.x, 0.0, center.z),
            suspension_length: self.suspension_length[index],
            suspension_force: self.mass * GRAVITY / 4.0,
            steering: wheel.steering,
            rotation: wheel.rotation,
            delta_rotation: wheel.delta_rotation,
            engine_force: wheel.engine_force,
            axle: Vector::x(),
            radius: wheel.radius,
        })
    }

    fn set_steering(&mut self, vehicle: &mut MockVehicle, index: usize, steering: Real) {
        self.commands += 1;
        if let Some(wheel) = vehicle.wheels.get_mut(index) {
            wheel.steering = steering;
        }
    }

    fn apply_engine_force(&mut self, vehicle: &mut MockVehicle, index: usize, force: Real) {
        self.commands += 1;
        if let Some(wheel) = vehicle.wheels.get_mut(index) {
            wheel.engine_force = force;
        }
    }

    fn set_brake(&mut self, vehicle: &mut MockVehicle, index: usize, brake: Real) {
        self.commands += 1;
        if let Some(wheel) = vehicle.wheels.get_mut(index) {
            wheel.brake = brake;
        }
    }

    fn apply_force_at_point(&mut self, _vehicle: &MockVehicle, force: Vector<Real>, point: Point<Real>) {
        self.point_forces.push((force, point));
    }

    fn apply_central_force(&mut self, _vehicle: &MockVehicle, force: Vector<Real>) {
        self.central_forces.push(force);
    }
}
