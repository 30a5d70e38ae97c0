// ==============================================================================
// physics.rs — RAPIER WORLD + RAYCAST VEHICLE ENGINE
// ------------------------------------------------------------------------------
// Owns the rapier3d pipeline (ground, chassis bodies) and implements
// `VehicleEngine` on top of rapier's DynamicRayCastVehicleController, which
// plays the black-box suspension / raycast role.
//
// Step order (caller drives it at a fixed rate):
//   1) query pipeline refresh
//   2) per vehicle: suspension raycasts + wheel impulses, spin tracking
//   3) rigid-body step (consumes forces queued by the controllers)
//   4) clear queued user forces (rapier keeps them otherwise)
//   5) safety: reset bodies that blew up
//
// VehicleController::tick runs after step(), reading the fresh wheel state and
// queuing forces for the next step.
// ==============================================================================

use log::{debug, info, warn};
use rapier3d::control::{DynamicRayCastVehicleController, WheelTuning};
use rapier3d::na::{Rotation3, Translation3, Unit, UnitQuaternion};
use rapier3d::prelude::*;

use crate::adapter::{ChassisState, VehicleDescriptor, VehicleEngine, WheelState};
use crate::tuning::VehicleTuning;

const GROUP_GROUND: Group = Group::from_bits_truncate(0b0001);
const GROUP_CHASSIS: Group = Group::from_bits_truncate(0b0010);

/// Bodies past this distance from the origin are considered exploded.
const WORLD_LIMIT: Real = 1_000.0;

// --------------------------------------------------
// Vehicle handle
// --------------------------------------------------

pub struct RapierVehicle {
    controller: DynamicRayCastVehicleController,
    last_rotation: Vec<Real>,
    delta_rotation: Vec<Real>, // rad spun by each wheel during the last step
}

impl RapierVehicle {
    fn new(chassis: RigidBodyHandle, descriptor: &VehicleDescriptor) -> Self {
        let mut controller = DynamicRayCastVehicleController::new(chassis);
        controller.index_up_axis = descriptor.index_up_axis;
        controller.index_forward_axis = descriptor.index_forward_axis;

        let tuning = WheelTuning {
            suspension_stiffness: descriptor.suspension_stiffness,
            suspension_compression: descriptor.suspension_compression,
            suspension_damping: descriptor.suspension_damping,
            max_suspension_travel: descriptor.suspension_travel_max,
            friction_slip: descriptor.friction_slip,
            max_suspension_force: descriptor.suspension_force_max,
            ..WheelTuning::default()
        };

        for wheel in &descriptor.wheels {
            controller.add_wheel(
                wheel.connection_point,
                wheel.suspension_direction,
                wheel.axle,
                wheel.rest_length,
                wheel.radius,
                &tuning,
            );
        }

        let wheel_count = descriptor.wheels.len();
        Self {
            controller,
            last_rotation: vec![0.0; wheel_count],
            delta_rotation: vec![0.0; wheel_count],
        }
    }

    pub fn chassis(&self) -> RigidBodyHandle {
        self.controller.chassis
    }

    /// Suspension raycasts and wheel impulses for one step.
    fn update(&mut self, dt: Real, bodies: &mut RigidBodySet, colliders: &ColliderSet, queries: &QueryPipeline) {
        let filter = QueryFilter::default().exclude_rigid_body(self.controller.chassis);
        self.controller.update_vehicle(dt, bodies, colliders, queries, filter);

        for (i, wheel) in self.controller.wheels().iter().enumerate() {
            self.delta_rotation[i] = wheel.rotation - self.last_rotation[i];
            self.last_rotation[i] = wheel.rotation;
        }
    }
}

// --------------------------------------------------
// World
// --------------------------------------------------

pub struct PhysicsWorld {
    pub gravity: Vector<Real>,               // gravity vector
    pub pipeline: PhysicsPipeline,           // physics pipeline
    pub island_manager: IslandManager,       // manages islands of bodies
    pub broad_phase: DefaultBroadPhase,      // broad-phase collision detection
    pub narrow_phase: NarrowPhase,           // collision detection
    pub bodies: RigidBodySet,                // for rigid bodies
    pub colliders: ColliderSet,              // for collision shapes
    pub joints: ImpulseJointSet,             // for constraints
    pub multibody_joints: MultibodyJointSet, // for articulated bodies
    pub ccd: CCDSolver,                      // continuous collision detection
    pub query_pipeline: QueryPipeline,       // for suspension raycasts
    pub ground: RigidBodyHandle,
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl PhysicsWorld {
    pub fn new() -> Self {
        let gravity = vector![0.0, -9.81, 0.0];

        let mut bodies = RigidBodySet::new();
        let mut colliders = ColliderSet::new();

        // 1000 x 0.2 x 1000 slab centered at y = -0.1, top surface at y = 0
        let ground_rb = RigidBodyBuilder::fixed()
            .translation(vector![0.0, -0.1, 0.0])
            .build();
        let ground = bodies.insert(ground_rb);

        let ground_collider = ColliderBuilder::cuboid(500.0, 0.1, 500.0)
            .collision_groups(InteractionGroups::new(GROUP_GROUND, GROUP_CHASSIS))
            .friction(1.2)
            .restitution(0.0)
            .build();
        colliders.insert_with_parent(ground_collider, ground, &mut bodies);

        debug!("ground inserted, bodies = {}, colliders = {}", bodies.len(), colliders.len());

        Self {
            gravity,
            pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies,
            colliders,
            joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
            ground,
        }
    }

    /// Dynamic box chassis sized and weighted from the tuning.
    pub fn spawn_chassis(&mut self, tuning: &VehicleTuning, position: [f32; 3]) -> RigidBodyHandle {
        let [x, y, z] = position;
        let [hx, hy, hz] = tuning.chassis_half_extents;
        let volume = 8.0 * hx * hy * hz;
        let density = tuning.chassis_mass / volume; // ρ = m / V

        let rb = RigidBodyBuilder::dynamic()
            .translation(vector![x, y, z])
            .ccd_enabled(true)
            .build();

        let collider = ColliderBuilder::cuboid(hx, hy, hz)
            .collision_groups(InteractionGroups::new(GROUP_CHASSIS, GROUP_GROUND))
            .density(density)
            .friction(0.0)
            .restitution(0.0)
            .build();

        let handle = self.bodies.insert(rb);
        self.colliders.insert_with_parent(collider, handle, &mut self.bodies);

        info!("spawned chassis {:?} at {:?} ({} kg)", handle, position, tuning.chassis_mass);
        handle
    }

    pub fn step<'a>(&mut self, dt: Real, vehicles: impl IntoIterator<Item = &'a mut RapierVehicle>) {
        let hooks = ();
        let events = ();

        // 1) + 2) suspension against the current world
        self.query_pipeline.update(&self.colliders);
        for vehicle in vehicles {
            vehicle.update(dt, &mut self.bodies, &self.colliders, &self.query_pipeline);
        }

        // 3) rigid-body step
        self.pipeline.step(
            &self.gravity,
            &IntegrationParameters {
                dt,
                ..IntegrationParameters::default()
            },
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.joints,
            &mut self.multibody_joints,
            &mut self.ccd,
            Some(&mut self.query_pipeline),
            &hooks,
            &events,
        );

        // 4) forces are per step
        for (_, body) in self.bodies.iter_mut() {
            body.reset_forces(false);
            body.reset_torques(false);
        }

        // 5) safety: prevent bodies from exploding to insane coordinates
        for (handle, body) in self.bodies.iter_mut() {
            let pos = *body.translation();
            let bad = !(pos.x.is_finite() && pos.y.is_finite() && pos.z.is_finite())
                || pos.x.abs() > WORLD_LIMIT
                || pos.y.abs() > WORLD_LIMIT
                || pos.z.abs() > WORLD_LIMIT;

            if bad {
                let reset = vector![0.0, 1.5, 0.0];
                body.set_translation(reset, true);
                body.set_rotation(UnitQuaternion::identity(), true);
                body.set_linvel(Vector::zeros(), true);
                body.set_angvel(Vector::zeros(), true);

                warn!("reset exploding body {:?} back to {:?}", handle, reset);
            }
        }
    }

    fn wheel_rotation(chassis: &RigidBody, wheel: &rapier3d::control::Wheel) -> UnitQuaternion<Real> {
        let chassis_rotation = chassis.position().rotation;
        let up = -wheel.suspension();
        let axle = chassis_rotation * wheel.axle_cs;
        let forward = up.cross(&axle);

        let (Some(up_axis), Some(axle_axis)) = (Unit::try_new(up, Real::EPSILON), Unit::try_new(axle, Real::EPSILON))
        else {
            return chassis_rotation;
        };

        let basis = Rotation3::from_basis_unchecked(&[-axle, up, forward]);
        let steering = UnitQuaternion::from_axis_angle(&up_axis, wheel.steering);
        let spin = UnitQuaternion::from_axis_angle(&axle_axis, -wheel.rotation);

        steering * spin * UnitQuaternion::from_rotation_matrix(&basis)
    }
}

impl VehicleEngine for PhysicsWorld {
    type Chassis = RigidBodyHandle;
    type Vehicle = RapierVehicle;

    fn create_vehicle(&mut self, chassis: RigidBodyHandle, descriptor: &VehicleDescriptor) -> Option<RapierVehicle> {
        let body = self.bodies.get(chassis)?;
        if !body.is_dynamic() {
            return None;
        }
        Some(RapierVehicle::new(chassis, descriptor))
    }

    fn destroy_vehicle(&mut self, vehicle: RapierVehicle) {
        debug!("raycast vehicle on {:?} released", vehicle.chassis());
    }

    fn chassis_state(&self, vehicle: &RapierVehicle) -> Option<ChassisState> {
        let body = self.bodies.get(vehicle.chassis())?;
        Some(ChassisState {
            position: *body.position(),
            linvel: *body.linvel(),
            angvel: *body.angvel(),
            center_of_mass: *body.center_of_mass(),
        })
    }

    fn wheel_count(&self, vehicle: &RapierVehicle) -> usize {
        vehicle.controller.wheels().len()
    }

    fn wheel_state(&self, vehicle: &RapierVehicle, index: usize) -> Option<WheelState> {
        let body = self.bodies.get(vehicle.chassis())?;
        let wheel = vehicle.controller.wheels().get(index)?;
        let info = wheel.raycast_info();

        let rotation = Self::wheel_rotation(body, wheel);
        let center = wheel.center();

        Some(WheelState {
            world_transform: Isometry::from_parts(Translation3::from(center.coords), rotation),
            in_contact: info.is_in_contact,
            contact_point: info.contact_point_ws,
            suspension_length: info.suspension_length,
            suspension_force: wheel.wheel_suspension_force,
            steering: wheel.steering,
            rotation: wheel.rotation,
            delta_rotation: vehicle.delta_rotation.get(index).copied().unwrap_or(0.0),
            engine_force: wheel.engine_force,
            axle: body.position().rotation * wheel.axle_cs,
            radius: wheel.radius,
        })
    }

    fn set_steering(&mut self, vehicle: &mut RapierVehicle, index: usize, steering: Real) {
        if let Some(wheel) = vehicle.controller.wheels_mut().get_mut(index) {
            wheel.steering = steering;
        }
    }

    fn apply_engine_force(&mut self, vehicle: &mut RapierVehicle, index: usize, force: Real) {
        if let Some(wheel) = vehicle.controller.wheels_mut().get_mut(index) {
            wheel.engine_force = force;
        }
    }

    fn set_brake(&mut self, vehicle: &mut RapierVehicle, index: usize, brake: Real) {
        if let Some(wheel) = vehicle.controller.wheels_mut().get_mut(index) {
            wheel.brake = brake;
        }
    }

    fn apply_force_at_point(&mut self, vehicle: &RapierVehicle, force: Vector<Real>, point: Point<Real>) {
        if let Some(body) = self.bodies.get_mut(vehicle.chassis()) {
            body.add_force_at_point(force, point, true);
        }
    }

    fn apply_central_force(&mut self, vehicle: &RapierVehicle, force: Vector<Real>) {
        if let Some(body) = self.bodies.get_mut(vehicle.chassis()) {
            body.add_force(force, true);
        }
    }
}
