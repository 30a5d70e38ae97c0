// ==============================================================================
// tire.rs — PACEJKA TIRE FORCE MODEL (WORLD SPACE, PLANAR)
// ------------------------------------------------------------------------------
// The tire model defines most of the handling. Per grounded wheel it computes:
// - slip ratio: wheel surface speed vs chassis speed along the wheel forward axis
// - slip angle: angle between the wheel heading and the chassis travel direction
// - one Pacejka '94 evaluation per axis (longitudinal from slip ratio, lateral
//   from slip angle)
// - the planar force  F = Fx * forward + Fy * right * tire_friction
//
// Notes:
// - All vectors are world space with Y zeroed; the curve only cares about
//   forward and side slip.
// - Stability near zero speed comes from SMALL_FLOAT biasing and clamping,
//   never from branching on speed == 0.
// - Only the lateral term carries the tire friction scalar. Accel/brake grip
//   is intentionally higher than cornering grip.
// ==============================================================================

use std::f32::consts::PI;

use rapier3d::prelude::{Point, Real, Vector};

use crate::dynamics::types::SMALL_FLOAT;
use crate::tuning::PacejkaCoefficients;

/// Per-wheel inputs, already decomposed by the engine adapter.
#[derive(Debug, Clone, Copy)]
pub struct TireInput {
    pub in_contact: bool,
    pub forward: Vector<Real>,          // wheel forward dir (planar, unit)
    pub right: Vector<Real>,            // wheel right dir (planar, unit)
    pub wheel_velocity: Vector<Real>,   // contact point velocity incl. wheel spin (planar)
    pub vehicle_velocity: Vector<Real>, // chassis linear velocity (planar)
    pub normal_load: Real,              // N
    pub contact_point: Point<Real>,     // world
}

#[derive(Debug, Clone, Copy)]
pub struct TireForce {
    pub force: Vector<Real>,
    pub position: Point<Real>,
    pub slip_ratio: Real,
    pub slip_angle: Real,
    pub force_longitudinal: Real,
    pub force_lateral: Real,
}

impl TireForce {
    pub fn zero(position: Point<Real>) -> Self {
        Self {
            force: Vector::zeros(),
            position,
            slip_ratio: 0.0,
            slip_angle: 0.0,
            force_longitudinal: 0.0,
            force_lateral: 0.0,
        }
    }
}

/// Slip ratio in [-1, 1].
///
///  0      rolling without slip
///  0..1   slipping under acceleration
/// -1..0   slipping under braking
/// ±1      full wheelspin / brake lock
pub fn compute_slip_ratio(
    wheel_forward: &Vector<Real>,
    wheel_velocity: &Vector<Real>,
    vehicle_velocity: &Vector<Real>,
) -> Real {
    let velocity_forward = vehicle_velocity.dot(wheel_forward);
    let velocity_wheel = wheel_velocity.dot(wheel_forward);

    // sign-matched bias keeps |denominator| >= SMALL_FLOAT
    let numerator = velocity_wheel - velocity_forward;
    let denominator = velocity_forward + SMALL_FLOAT.copysign(velocity_forward);

    (numerator / denominator).clamp(-1.0, 1.0)
}

/// Slip angle scaled from [-π, π] radians to [-1, 1].
pub fn compute_slip_angle(
    wheel_forward: &Vector<Real>,
    wheel_right: &Vector<Real>,
    vehicle_velocity: &Vector<Real>,
) -> Real {
    let direction = vehicle_velocity
        .try_normalize(Real::EPSILON)
        .unwrap_or_else(Vector::zeros);

    let along_forward = direction.dot(wheel_forward);
    let along_right = direction.dot(wheel_right);
    let slip_angle = (along_right + SMALL_FLOAT).atan2(along_forward + SMALL_FLOAT);

    (slip_angle / PI).clamp(-1.0, 1.0)
}

#[inline]
fn sign(x: Real) -> Real {
    if x > 0.0 {
        1.0
    } else if x < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// Pacejka '94 curve. `slip` is in [-1, 1], `normal_load` in newtons.
pub fn compute_pacejka_force(coefficients: &PacejkaCoefficients, slip: Real, normal_load: Real) -> Real {
    let PacejkaCoefficients { b0, b1, b2, b3, b4, b5, b6, b7, b8, b9, b10, b11, b12, b13 } = *coefficients;

    // the curve expects percent slip and kilonewtons
    let slip = slip.clamp(-1.0, 1.0) * 100.0;
    let fz = (normal_load + SMALL_FLOAT) * 0.001;

    let c = b0;
    let d = fz * (b1 * fz + b2);
    let bcd = (b3 * fz * fz + b4 * fz) * (-b5 * fz).exp();
    let h = b9 * fz + b10;
    let v = b11 * fz + b12;

    let cd = c * d;
    if cd == 0.0 {
        return v;
    }

    let b = bcd / cd;
    let e = (b6 * fz * fz + b7 * fz + b8) * (1.0 - b13 * sign(slip + h));
    let bx = b * (slip + h);

    d * (c * (bx - e * (bx - bx.atan())).atan()).sin() + v
}

/// Planar tire force for one wheel. Airborne wheels yield a zero force; the
/// caller is expected to skip applying it.
pub fn compute_tire_force(
    coefficients: &PacejkaCoefficients,
    tire_friction: Real,
    input: &TireInput,
) -> TireForce {
    if !input.in_contact {
        return TireForce::zero(input.contact_point);
    }

    let slip_ratio = compute_slip_ratio(&input.forward, &input.wheel_velocity, &input.vehicle_velocity);
    let slip_angle = compute_slip_angle(&input.forward, &input.right, &input.vehicle_velocity);

    let force_longitudinal = compute_pacejka_force(coefficients, slip_ratio, input.normal_load);
    let force_lateral = compute_pacejka_force(coefficients, slip_angle, input.normal_load);

    let force = input.forward * force_longitudinal + input.right * force_lateral * tire_friction;

    TireForce {
        force: Vector::new(force.x, 0.0, force.z),
        position: input.contact_point,
        slip_ratio,
        slip_angle,
        force_longitudinal,
        force_lateral,
    }
}
