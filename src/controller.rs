// ==============================================================================
// controller.rs — VEHICLE CONTROLLER (PER-TICK ORCHESTRATION)
// ------------------------------------------------------------------------------
// Owns one vehicle's runtime state and its engine-side vehicle object.
//
// build(chassis): tear down any previous vehicle, describe the archetype to the
//                 engine (suspension + 4 wheels), reset runtime state.
//
// tick(input, dt), once per physics step AFTER the engine resolved contacts:
//   1) movement state from signed speed (±0.1 m/s deadband)
//   2) input: throttle intent, coast-to-stop latch, steering lerp
//   3) gearbox: gear, rpm, engine torque
//   4) engine force on the driven wheels (FL, FR)
//   5) tire forces per grounded wheel
//   6) anti-roll bars (front, rear)
//   7) aero downforce + drag
//   8) brake ramp -> all 4 wheels
//   9) wheel + steering-wheel transform write-back, telemetry
//
// Nothing here fails: a missing vehicle, a missing chassis or a bad dt turn
// the tick into a no-op.
// ==============================================================================

use std::sync::{Arc, Mutex};

use log::{info, trace, warn};
use rapier3d::na::UnitQuaternion;
use rapier3d::prelude::{Point, Real, Vector};
use serde::Serialize;

use crate::adapter::{
    ChassisState, VehicleDescriptor, VehicleEngine, adjust_brake_force, adjust_tire_force, planar,
    wheel_direction_forward, wheel_direction_right, wheel_velocity,
};
use crate::dynamics::aero::{compute_drag, compute_downforce};
use crate::dynamics::anti_roll::{AntiRollPair, AntiRollWheel, compute_anti_roll};
use crate::dynamics::gearbox::Gearbox;
use crate::dynamics::tire::{TireForce, TireInput, compute_tire_force};
use crate::dynamics::types::{MOVEMENT_DEADBAND, MovementState, WHEEL_COUNT, WheelId};
use crate::error::BuildError;
use crate::input::DriverInput;
use crate::telemetry::{VehicleTelemetry, WheelTelemetry};
use crate::tuning::VehicleTuning;

const DRIVE_WHEELS: [WheelId; 2] = [WheelId::FL, WheelId::FR];
const STEER_WHEELS: [WheelId; 2] = [WheelId::FL, WheelId::FR];

/// Externally owned scene node the controller writes into.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Point<Real>,
    pub rotation: UnitQuaternion<Real>,
}

impl Default for Transform {
    fn default() -> Self {
        Self { position: Point::origin(), rotation: UnitQuaternion::identity() }
    }
}

pub type SharedTransform = Arc<Mutex<Transform>>;

#[derive(Debug, Clone, Default, Serialize)]
pub struct RuntimeState {
    pub throttle: Real,                    // -1..1, negative = reverse intent
    pub steering_angle: Real,              // rad
    pub brake_force: Real,                 // N, 0..brake_force_max
    pub movement_state: MovementState,
    pub break_until_opposite_torque: bool, // coasting to a stop before reversing
    pub engine_torque: Real,               // N·m, unsigned
    pub aerodynamics_downforce: Real,      // N
    pub aerodynamics_drag: Real,           // N
    pub anti_roll_front: Real,             // N, + pushes the left wheel up
    pub anti_roll_rear: Real,              // N
}

pub struct VehicleController<E: VehicleEngine> {
    tuning: Arc<VehicleTuning>,
    vehicle: Option<E::Vehicle>,
    state: RuntimeState,
    gearbox: Gearbox,
    tire_forces: [Option<TireForce>; WHEEL_COUNT],
    wheel_transforms: [Option<SharedTransform>; WHEEL_COUNT],
    steering_wheel_transform: Option<SharedTransform>,
    telemetry: Option<VehicleTelemetry>,
}

impl<E: VehicleEngine> VehicleController<E> {
    pub fn new(tuning: Arc<VehicleTuning>) -> Self {
        let gearbox = Gearbox::new(&tuning);
        Self {
            tuning,
            vehicle: None,
            state: RuntimeState::default(),
            gearbox,
            tire_forces: [None; WHEEL_COUNT],
            wheel_transforms: Default::default(),
            steering_wheel_transform: None,
            telemetry: None,
        }
    }

    // --------------------------------------------------
    // Lifecycle
    // --------------------------------------------------

    /// (Re)creates the engine vehicle on `chassis`. On error the controller is
    /// left unbuilt and `tick` does nothing until a later build succeeds.
    pub fn build(&mut self, engine: &mut E, chassis: E::Chassis) -> Result<(), BuildError> {
        self.destroy(engine);
        self.tuning.validate()?;

        let descriptor = VehicleDescriptor::from_tuning(&self.tuning);
        let Some(vehicle) = engine.create_vehicle(chassis, &descriptor) else {
            warn!("vehicle build failed: chassis {:?} is not a dynamic body", chassis);
            return Err(BuildError::InvalidChassis);
        };

        if engine.wheel_count(&vehicle) != WHEEL_COUNT {
            warn!("vehicle build failed: engine reported {} wheels", engine.wheel_count(&vehicle));
            engine.destroy_vehicle(vehicle);
            return Err(BuildError::InvalidChassis);
        }

        self.state = RuntimeState::default();
        self.gearbox = Gearbox::new(&self.tuning);
        self.tire_forces = [None; WHEEL_COUNT];
        self.telemetry = None;
        self.vehicle = Some(vehicle);

        info!("vehicle built on chassis {:?}", chassis);
        Ok(())
    }

    pub fn destroy(&mut self, engine: &mut E) {
        if let Some(vehicle) = self.vehicle.take() {
            engine.destroy_vehicle(vehicle);
            info!("vehicle torn down");
        }
    }

    pub fn tick(&mut self, engine: &mut E, input: &DriverInput, dt: Real) {
        if !(dt > 0.0 && dt.is_finite()) {
            return;
        }
        let Some(mut vehicle) = self.vehicle.take() else {
            return;
        };

        if let Some(chassis) = engine.chassis_state(&vehicle) {
            self.state.movement_state = MovementState::from_speed(chassis.signed_speed());
            self.handle_input(engine, &mut vehicle, input, &chassis, dt);
            self.apply_forces(engine, &mut vehicle, input, &chassis, dt);
            self.update_transforms(engine, &vehicle);
            self.update_telemetry(engine, &vehicle, &chassis, dt);
        }

        self.vehicle = Some(vehicle);
    }

    // --------------------------------------------------
    // Input: throttle, latch, steering
    // --------------------------------------------------

    fn handle_input(&mut self, engine: &mut E, vehicle: &mut E::Vehicle, input: &DriverInput, chassis: &ChassisState, dt: Real) {
        let tuning = &*self.tuning;
        let state = &mut self.state;

        if chassis.signed_speed().abs() < MOVEMENT_DEADBAND {
            state.break_until_opposite_torque = false;
        }

        // a pedal against the direction of travel brakes instead of driving;
        // throttle keeps its last value so the gearbox stays in its gear
        if input.accelerate_requested() {
            if state.movement_state == MovementState::Backward {
                state.break_until_opposite_torque = true;
            } else {
                state.throttle = 1.0;
            }
        } else if input.reverse_requested() {
            if state.movement_state == MovementState::Forward {
                state.break_until_opposite_torque = true;
            } else {
                state.throttle = -1.0;
            }
        } else {
            state.throttle = 0.0;
            state.break_until_opposite_torque = false;
        }

        // drive wheel angular velocity from last step's spin
        let wheel_angular_velocity = engine
            .wheel_state(vehicle, WheelId::FL.index())
            .map_or(0.0, |wheel| wheel.delta_rotation / dt);

        state.engine_torque = self.gearbox.compute_torque(
            tuning,
            state.throttle,
            state.break_until_opposite_torque,
            wheel_angular_velocity,
            dt,
        );

        // real wheels don't snap to the target angle
        let target = input.steering_target(tuning.steering_angle_max);
        let t = (tuning.steering_return_speed * dt).clamp(0.0, 1.0);
        state.steering_angle += (target - state.steering_angle) * t;

        for id in STEER_WHEELS {
            engine.set_steering(vehicle, id.index(), state.steering_angle);
        }
    }

    // --------------------------------------------------
    // Forces
    // --------------------------------------------------

    fn apply_forces(&mut self, engine: &mut E, vehicle: &mut E::Vehicle, input: &DriverInput, chassis: &ChassisState, dt: Real) {
        let tuning = &*self.tuning;
        let corrections = engine.corrections();

        // engine (front-wheel drive)
        let engine_force = if self.state.break_until_opposite_torque || self.state.throttle == 0.0 {
            0.0
        } else {
            let sign = if self.state.throttle >= 0.0 { -1.0 } else { 1.0 };
            self.state.engine_torque * sign
        };
        for id in DRIVE_WHEELS {
            engine.apply_engine_force(vehicle, id.index(), engine_force);
        }

        // tires
        let vehicle_velocity = planar(chassis.linvel);
        for id in WheelId::ALL {
            self.tire_forces[id.index()] = None;
            let Some(wheel) = engine.wheel_state(vehicle, id.index()) else { continue };
            if !wheel.in_contact {
                continue;
            }

            let forward = wheel_direction_forward(&wheel.world_transform.rotation);
            let tire = compute_tire_force(
                &tuning.pacejka,
                tuning.tire_friction,
                &TireInput {
                    in_contact: true,
                    forward,
                    right: wheel_direction_right(&forward),
                    wheel_velocity: wheel_velocity(chassis, &wheel),
                    vehicle_velocity,
                    normal_load: wheel.suspension_force,
                    contact_point: wheel.contact_point,
                },
            );

            engine.apply_force_at_point(vehicle, adjust_tire_force(&corrections, tire.force), tire.position);
            self.tire_forces[id.index()] = Some(tire);
        }

        // anti-roll bars
        let mut roll = [0.0; 2];
        for (pair, magnitude) in [AntiRollPair::front(tuning), AntiRollPair::rear(tuning)].iter().zip(&mut roll) {
            let snapshot = |id: WheelId| {
                engine.wheel_state(vehicle, id.index()).map(|w| AntiRollWheel {
                    in_contact: w.in_contact,
                    suspension_length: w.suspension_length,
                    contact_point: w.contact_point,
                })
            };
            let (Some(left), Some(right)) = (snapshot(pair.left_id), snapshot(pair.right_id)) else {
                continue;
            };

            let out = compute_anti_roll(pair, &left, &right);
            *magnitude = out.magnitude;
            for force in out.forces() {
                engine.apply_force_at_point(vehicle, force.force, force.point);
            }
        }
        [self.state.anti_roll_front, self.state.anti_roll_rear] = roll;

        // aerodynamics, chassis local -> world
        let speed = chassis.signed_speed();
        self.state.aerodynamics_downforce = compute_downforce(tuning, speed);
        self.state.aerodynamics_drag = compute_drag(tuning, speed);

        let orientation = chassis.position.rotation;
        let downforce = orientation * Vector::new(0.0, -self.state.aerodynamics_downforce, 0.0);
        let drag = orientation * Vector::new(0.0, 0.0, -self.state.aerodynamics_drag);
        engine.apply_central_force(vehicle, downforce);
        engine.apply_central_force(vehicle, drag);

        // brakes
        let braking: Real = if self.state.break_until_opposite_torque || input.brake_requested() { 1.0 } else { 0.0 };
        let ramp = tuning.brake_ramp_speed * dt;
        let brake_force = if braking > 0.0 {
            self.state.brake_force + ramp * braking
        } else {
            self.state.brake_force - ramp
        };
        self.state.brake_force = brake_force.clamp(0.0, tuning.brake_force_max);

        let submitted = adjust_brake_force(&corrections, self.state.brake_force);
        for id in WheelId::ALL {
            engine.set_brake(vehicle, id.index(), submitted);
        }
    }

    // --------------------------------------------------
    // Transforms + telemetry
    // --------------------------------------------------

    fn update_transforms(&self, engine: &E, vehicle: &E::Vehicle) {
        if let Some(shared) = &self.steering_wheel_transform {
            if let Ok(mut transform) = shared.lock() {
                transform.rotation = UnitQuaternion::from_euler_angles(0.0, 0.0, -self.state.steering_angle);
            }
        }

        for (index, slot) in self.wheel_transforms.iter().enumerate() {
            let Some(shared) = slot else { continue };
            let Some(wheel) = engine.wheel_state(vehicle, index) else { continue };
            let Ok(mut transform) = shared.lock() else { continue };

            // spin about the axle, then steering about up
            transform.position = Point::from(wheel.world_transform.translation.vector);
            transform.rotation = UnitQuaternion::from_euler_angles(wheel.rotation, wheel.steering, 0.0);
        }
    }

    fn update_telemetry(&mut self, engine: &E, vehicle: &E::Vehicle, chassis: &ChassisState, dt: Real) {
        let wheels = WheelId::ALL.map(|id| {
            let tire = self.tire_forces[id.index()];
            engine.wheel_state(vehicle, id.index()).map(|wheel| WheelTelemetry {
                id,
                steering_deg: wheel.steering.to_degrees(),
                angular_velocity: wheel.delta_rotation / dt,
                engine_force: wheel.engine_force,
                suspension_length: wheel.suspension_length,
                in_contact: wheel.in_contact,
                slip_ratio: tire.map_or(0.0, |t| t.slip_ratio),
                slip_angle: tire.map_or(0.0, |t| t.slip_angle),
                tire_force_longitudinal: tire.map_or(0.0, |t| t.force_longitudinal),
                tire_force_lateral: tire.map_or(0.0, |t| t.force_lateral),
            })
        });

        let telemetry = VehicleTelemetry {
            speed_kmh: chassis.speed_kmh(),
            torque: self.state.engine_torque,
            rpm: self.gearbox.engine_rpm(),
            gear: self.gearbox.gear(),
            shift_timer: self.gearbox.shift_timer(),
            downforce: self.state.aerodynamics_downforce,
            drag: self.state.aerodynamics_drag,
            brake_force: self.state.brake_force,
            anti_roll_front: self.state.anti_roll_front,
            anti_roll_rear: self.state.anti_roll_rear,
            wheels,
        };

        trace!(
            "speed {:.2} km/h, gear {}, rpm {:.0}, torque {:.1}, brake {:.1}",
            telemetry.speed_kmh,
            telemetry.gear,
            telemetry.rpm,
            telemetry.torque,
            telemetry.brake_force
        );
        self.telemetry = Some(telemetry);
    }

    // --------------------------------------------------
    // Scene bindings
    // --------------------------------------------------

    /// Binds (or clears) the scene node for one wheel. Indices past the last
    /// wheel are ignored.
    pub fn set_wheel_transform(&mut self, index: usize, transform: Option<SharedTransform>) {
        match self.wheel_transforms.get_mut(index) {
            Some(slot) => *slot = transform,
            None => warn!("wheel index {} out of range, transform ignored", index),
        }
    }

    pub fn set_steering_wheel_transform(&mut self, transform: Option<SharedTransform>) {
        self.steering_wheel_transform = transform;
    }

    // --------------------------------------------------
    // Accessors
    // --------------------------------------------------

    pub fn tuning(&self) -> &Arc<VehicleTuning> {
        &self.tuning
    }

    pub fn is_built(&self) -> bool {
        self.vehicle.is_some()
    }

    pub fn vehicle(&self) -> Option<&E::Vehicle> {
        self.vehicle.as_ref()
    }

    pub fn vehicle_mut(&mut self) -> Option<&mut E::Vehicle> {
        self.vehicle.as_mut()
    }

    pub fn state(&self) -> &RuntimeState {
        &self.state
    }

    pub fn gearbox(&self) -> &Gearbox {
        &self.gearbox
    }

    pub fn throttle(&self) -> Real {
        self.state.throttle
    }

    pub fn steering_angle(&self) -> Real {
        self.state.steering_angle
    }

    pub fn brake_force(&self) -> Real {
        self.state.brake_force
    }

    pub fn movement_state(&self) -> MovementState {
        self.state.movement_state
    }

    pub fn break_until_opposite_torque(&self) -> bool {
        self.state.break_until_opposite_torque
    }

    pub fn engine_torque(&self) -> Real {
        self.state.engine_torque
    }

    pub fn engine_rpm(&self) -> Real {
        self.gearbox.engine_rpm()
    }

    pub fn gear(&self) -> i32 {
        self.gearbox.gear()
    }

    pub fn is_shifting(&self) -> bool {
        self.gearbox.is_shifting()
    }

    /// Signed chassis speed in m/s; 0 when not built.
    pub fn speed_mps(&self, engine: &E) -> Real {
        self.vehicle
            .as_ref()
            .and_then(|vehicle| engine.chassis_state(vehicle))
            .map_or(0.0, |chassis| chassis.signed_speed())
    }

    pub fn speed_kmh(&self, engine: &E) -> Real {
        self.speed_mps(engine) * 3.6
    }

    pub fn telemetry(&self) -> Option<&VehicleTelemetry> {
        self.telemetry.as_ref()
    }
}
