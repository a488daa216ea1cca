// Odometry demo: drive the perimeter of a square, then ask the odometry
// to take the robot back to where it started.
//
// Usage: cargo run --example drive_square -- --side-mm 300 --speed 30

use clap::Parser;
use tracing::info;

use tachodrive::{
    MotorKind, MoveDifferential, OutputPort, Platform, SpeedValue, Wheel,
};

#[derive(Parser, Debug)]
#[command(about = "Drive a square and return home by odometry")]
struct Args {
    /// Side length of the square in mm
    #[arg(long, default_value_t = 300.0)]
    side_mm: f32,

    /// Drive speed as a percentage of the rated maximum
    #[arg(long, default_value_t = 30.0)]
    speed: f32,

    /// Distance between the wheel contact patches in mm
    #[arg(long, default_value_t = 130.4)]
    wheelbase_mm: f32,

    /// Optional platform description JSON
    #[arg(long)]
    platform: Option<String>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("info".parse().unwrap()),
        )
        .init();

    let args = Args::parse();
    let platform = match &args.platform {
        Some(path) => Platform::from_file(path)?,
        None => Platform::default(),
    };

    let mut mdiff = MoveDifferential::new(
        &platform,
        OutputPort::A,
        OutputPort::B,
        MotorKind::Large,
        Wheel::education_tire(),
        args.wheelbase_mm,
    )?;
    let speed = SpeedValue::percent(args.speed)?;

    mdiff.odometry_start()?;
    info!("start pose: {:?}", mdiff.pose()?);

    for corner in 0..4 {
        mdiff.on_for_distance(speed, args.side_mm, true, true)?;
        mdiff.turn_left(speed, 90.0, true, true)?;
        info!("corner {}: {:?}", corner + 1, mdiff.pose()?);
    }

    // The square should have brought us home already; let the odometry
    // clean up whatever error accumulated.
    mdiff.on_to_coordinates(speed, 0.0, 0.0, true, true)?;
    mdiff.turn_to_angle(speed, 0.0, true, true)?;
    info!("final pose: {:?}", mdiff.pose()?);

    mdiff.odometry_stop();
    mdiff.off(false)?;
    Ok(())
}
