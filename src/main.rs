use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use clap::{Parser, ValueEnum};
use log::{LevelFilter, error, info};
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};
use tokio::time::{Duration, MissedTickBehavior, interval};

use vehicle_sim::controller::{SharedTransform, Transform, VehicleController};
use vehicle_sim::input::DriverInput;
use vehicle_sim::physics::PhysicsWorld;
use vehicle_sim::telemetry::{LogSink, TelemetrySink, VehicleTelemetry};
use vehicle_sim::tuning::VehicleTuning;

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Scenario {
    /// Full throttle from rest
    Launch,
    /// Full throttle, steering left/right every 1.5 s
    Slalom,
    /// Accelerate for half the run, then hold reverse (coast-to-stop latch + brakes)
    BrakeTest,
}

#[derive(Parser, Debug)]
#[command(name = "vehicle-sim")]
#[command(about = "Headless raycast-vehicle dynamics demo", long_about = None)]
struct Args {
    /// Number of physics ticks to simulate
    #[arg(short, long, default_value_t = 1200)]
    ticks: u64,

    /// Fixed timestep in seconds
    #[arg(long, default_value_t = 1.0 / 60.0)]
    dt: f32,

    /// JSON tuning file (missing fields fall back to the AE86 archetype)
    #[arg(long)]
    tuning: Option<PathBuf>,

    /// Scripted driver input
    #[arg(long, value_enum, default_value_t = Scenario::Launch)]
    scenario: Scenario,

    /// Emit telemetry every N ticks (0 disables)
    #[arg(long, default_value_t = 30)]
    telemetry_every: u64,

    /// Telemetry as text blocks through the logger instead of JSON lines
    #[arg(long)]
    text: bool,

    /// Pace ticks in wall-clock time
    #[arg(long)]
    realtime: bool,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// One JSON object per line on stdout.
struct JsonLines;

impl TelemetrySink for JsonLines {
    fn publish(&mut self, telemetry: &VehicleTelemetry) {
        match serde_json::to_string(telemetry) {
            Ok(line) => println!("{line}"),
            Err(err) => error!("telemetry serialization failed: {err}"),
        }
    }
}

fn scripted_input(scenario: Scenario, tick: u64, ticks: u64, dt: f32) -> DriverInput {
    let time = tick as f32 * dt;
    match scenario {
        Scenario::Launch => DriverInput::from_axes(1.0, 0.0, false),
        Scenario::Slalom => {
            let steer = if (time / 1.5) as u64 % 2 == 0 { -1.0 } else { 1.0 };
            DriverInput::from_axes(1.0, if time < 2.0 { 0.0 } else { steer }, false)
        }
        Scenario::BrakeTest => {
            let throttle = if tick < ticks / 2 { 1.0 } else { -1.0 };
            DriverInput::from_axes(throttle, 0.0, false)
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let level = match args.verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    TermLogger::init(level, Config::default(), TerminalMode::Stderr, ColorChoice::Auto)?;

    let tuning = match &args.tuning {
        Some(path) => VehicleTuning::from_json_file(path)?,
        None => VehicleTuning::ae86(),
    };
    let tuning = Arc::new(tuning);

    info!("starting {:?} for {} ticks at dt = {:.4} s", args.scenario, args.ticks, args.dt);

    let mut world = PhysicsWorld::new();
    let chassis = world.spawn_chassis(&tuning, [0.0, 1.2, 0.0]);

    let mut car: VehicleController<PhysicsWorld> = VehicleController::new(Arc::clone(&tuning));
    car.build(&mut world, chassis)?;

    let wheels: Vec<SharedTransform> = (0..4).map(|_| Arc::new(Mutex::new(Transform::default()))).collect();
    for (index, wheel) in wheels.iter().enumerate() {
        car.set_wheel_transform(index, Some(Arc::clone(wheel)));
    }
    let steering_wheel: SharedTransform = Arc::new(Mutex::new(Transform::default()));
    car.set_steering_wheel_transform(Some(Arc::clone(&steering_wheel)));

    let mut sink: Box<dyn TelemetrySink> = if args.text { Box::new(LogSink) } else { Box::new(JsonLines) };

    let mut ticker = interval(Duration::from_secs_f32(args.dt.max(1e-3)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    for tick in 0..args.ticks {
        if args.realtime {
            ticker.tick().await;
        }

        // engine first, then the controller reads the resolved contacts
        world.step(args.dt, car.vehicle_mut());

        let input = scripted_input(args.scenario, tick, args.ticks, args.dt);
        car.tick(&mut world, &input, args.dt);

        if args.telemetry_every > 0 && tick % args.telemetry_every == 0 {
            if let Some(telemetry) = car.telemetry() {
                sink.publish(telemetry);
            }
        }
    }

    if let Ok(front_left) = wheels[0].lock() {
        info!(
            "done: {:.1} km/h, gear {}, front-left wheel at [{:.2}, {:.2}, {:.2}]",
            car.speed_kmh(&world),
            car.gear(),
            front_left.position.x,
            front_left.position.y,
            front_left.position.z
        );
    }

    car.destroy(&mut world);
    Ok(())
}
