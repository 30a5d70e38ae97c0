// ==============================================================================
// anti_roll.rs — ANTI-ROLL BAR CORRECTIVE FORCE PAIR
// ------------------------------------------------------------------------------
// One bar per axle (FL/FR, RL/RR). The bar pushes the two contact points
// apart vertically in proportion to their suspension length difference:
//
//   both grounded:   f = (len_left - len_right) * stiffness
//   left airborne:   f = -stiffness
//   right airborne:  f = +stiffness
//   both airborne:   nothing
//
// +f goes up at the left contact point, -f at the right one. Forces are only
// emitted for grounded wheels.
// ==============================================================================

use rapier3d::prelude::{Point, Real, Vector};

use crate::dynamics::types::WheelId;
use crate::tuning::VehicleTuning;

/// One anti-roll bar axle pair (FL/FR or RL/RR)
#[derive(Debug, Clone, Copy)]
pub struct AntiRollPair {
    pub left_id: WheelId,
    pub right_id: WheelId,
    pub stiffness: Real,
}

impl AntiRollPair {
    pub fn front(tuning: &VehicleTuning) -> Self {
        Self { left_id: WheelId::FL, right_id: WheelId::FR, stiffness: tuning.anti_roll_bar_stiffness_front }
    }

    pub fn rear(tuning: &VehicleTuning) -> Self {
        Self { left_id: WheelId::RL, right_id: WheelId::RR, stiffness: tuning.anti_roll_bar_stiffness_rear }
    }
}

/// Suspension snapshot of one wheel of the pair.
#[derive(Debug, Clone, Copy)]
pub struct AntiRollWheel {
    pub in_contact: bool,
    pub suspension_length: Real, // m
    pub contact_point: Point<Real>,
}

/// Force to apply at a single contact point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AntiRollForce {
    pub wheel: WheelId,
    pub force: Vector<Real>,
    pub point: Point<Real>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AntiRollOutput {
    pub magnitude: Real,                // signed, + pushes the left wheel up
    pub left: Option<AntiRollForce>,
    pub right: Option<AntiRollForce>,
}

impl AntiRollOutput {
    pub fn forces(&self) -> impl Iterator<Item = &AntiRollForce> {
        self.left.iter().chain(self.right.iter())
    }
}

pub fn compute_anti_roll(pair: &AntiRollPair, left: &AntiRollWheel, right: &AntiRollWheel) -> AntiRollOutput {
    let magnitude = match (left.in_contact, right.in_contact) {
        (true, true) => (left.suspension_length - right.suspension_length) * pair.stiffness,
        (false, true) => -pair.stiffness,
        (true, false) => pair.stiffness,
        (false, false) => return AntiRollOutput::default(),
    };

    let up = Vector::y();

    AntiRollOutput {
        magnitude,
        left: left.in_contact.then(|| AntiRollForce {
            wheel: pair.left_id,
            force: up * magnitude,
            point: left.contact_point,
        }),
        right: right.in_contact.then(|| AntiRollForce {
            wheel: pair.right_id,
            force: up * -magnitude,
            point: right.contact_point,
        }),
    }
}
