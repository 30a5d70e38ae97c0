//! Per-tick vehicle readouts for debug text and JSON streams.

use std::fmt;

use log::info;
use rapier3d::prelude::Real;
use serde::Serialize;

use crate::dynamics::types::{WHEEL_COUNT, WheelId};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WheelTelemetry {
    pub id: WheelId,
    pub steering_deg: Real,
    pub angular_velocity: Real, // rad/s
    pub engine_force: Real,     // N
    pub suspension_length: Real, // m
    pub in_contact: bool,
    pub slip_ratio: Real,              // -1..1
    pub slip_angle: Real,              // -1..1, fraction of pi
    pub tire_force_longitudinal: Real, // N
    pub tire_force_lateral: Real,      // N, before tire friction
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VehicleTelemetry {
    pub speed_kmh: Real,
    pub torque: Real,    // N·m
    pub rpm: Real,
    pub gear: i32,
    pub shift_timer: Real, // s, 0 when engaged
    pub downforce: Real, // N
    pub drag: Real,      // N
    pub brake_force: Real, // N
    pub anti_roll_front: Real, // N
    pub anti_roll_rear: Real,  // N
    pub wheels: [Option<WheelTelemetry>; WHEEL_COUNT],
}

impl fmt::Display for WheelTelemetry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Wheel: {}", self.id)?;
        writeln!(f, "Steering: {:.2} deg", self.steering_deg)?;
        writeln!(f, "Angular velocity: {:.2} rad/s", self.angular_velocity)?;
        writeln!(f, "Torque: {:.2} N", self.engine_force)?;
        writeln!(f, "Suspension length: {:.2} m", self.suspension_length)?;
        writeln!(f, "Slip ratio: {:.2}", self.slip_ratio)?;
        write!(f, "Slip angle: {:.2}", self.slip_angle)
    }
}

impl fmt::Display for VehicleTelemetry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Speed: {:.2} Km/h", self.speed_kmh.abs())?;
        writeln!(f, "Torque: {:.2} N·m", self.torque)?;
        writeln!(f, "RPM: {:.2} rpm", self.rpm)?;
        writeln!(f, "Gear: {}", self.gear)?;
        writeln!(f, "Shift timer: {:.2} s", self.shift_timer)?;
        writeln!(f, "Downforce: {:.2} N", self.downforce)?;
        writeln!(f, "Drag: {:.2} N", self.drag)?;
        writeln!(f, "Brake: {:.2} N", self.brake_force)?;
        write!(f, "Anti-roll: {:.2} N front, {:.2} N rear", self.anti_roll_front, self.anti_roll_rear)?;

        for wheel in self.wheels.iter().flatten() {
            write!(f, "\n{wheel}")?;
        }
        Ok(())
    }
}

/// One-way consumer of telemetry snapshots.
pub trait TelemetrySink {
    fn publish(&mut self, telemetry: &VehicleTelemetry);
}

/// Writes the text block through the `log` facade.
#[derive(Debug, Default)]
pub struct LogSink;

impl TelemetrySink for LogSink {
    fn publish(&mut self, telemetry: &VehicleTelemetry) {
        info!("\n{telemetry}");
    }
}

impl TelemetrySink for Vec<VehicleTelemetry> {
    fn publish(&mut self, telemetry: &VehicleTelemetry) {
        self.push(telemetry.clone());
    }
}
