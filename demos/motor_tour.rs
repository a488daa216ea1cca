// Motor tour: careful, step-by-step checkout of one motor
//
// Usage: cargo run --example motor_tour -- [port]
// Example: cargo run --example motor_tour -- B
//
// Safety features:
// - Read-only verification before any command
// - Explicit confirmation before anything moves
// - Very slow test speeds
// - Easy abort with Ctrl+C

use std::io::{self, Write};
use std::thread::sleep;
use std::time::Duration;

use tachodrive::{MotorKind, MotorOptions, OutputPort, Platform, SpeedValue, TachoMotor};

fn confirm(prompt: &str) -> bool {
    print!("{} [y/N]: ", prompt);
    io::stdout().flush().unwrap();
    let mut input = String::new();
    io::stdin().read_line(&mut input).unwrap();
    input.trim().eq_ignore_ascii_case("y")
}

fn parse_port(arg: Option<String>) -> OutputPort {
    match arg.as_deref() {
        Some("B") | Some("b") => OutputPort::B,
        Some("C") | Some("c") => OutputPort::C,
        Some("D") | Some("d") => OutputPort::D,
        _ => OutputPort::A,
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("info".parse().unwrap()),
        )
        .init();

    let port = parse_port(std::env::args().nth(1));

    println!("==============================================================");
    println!("  Motor tour (WILL MOVE THE MOTOR)");
    println!("  Make sure the motor shaft can spin freely!");
    println!("==============================================================");
    println!();
    println!("Output port: {:?}", port);
    println!();

    // ========== STEP 1: Bind and verify (read-only) ==========
    println!("Step 1: Binding the motor (read-only)...");
    let platform = Platform::default();
    let mut motor = TachoMotor::new(&platform, port, MotorKind::Generic)?;

    let spec = motor.spec().clone();
    println!("  driver:        {}", spec.driver_name);
    println!("  address:       {}", spec.address);
    println!("  count_per_rot: {}", spec.count_per_rot);
    println!("  max_speed:     {} counts/sec", spec.max_speed);
    println!("  position:      {} counts", motor.position()?);
    println!("  commands:      {:?}", motor.commands()?);
    println!("  stop actions:  {:?}", motor.stop_actions()?);
    println!();

    // ========== STEP 2: Slow timed run ==========
    println!("Step 2: 10% speed for half a second, then coast.");
    if !confirm("Proceed?") {
        println!("Aborted.");
        return Ok(());
    }

    motor.on_for_seconds(SpeedValue::Percent(10.0), 0.5, false, true)?;
    println!("  done, position now {} counts", motor.position()?);
    sleep(Duration::from_millis(500));
    println!();

    // ========== STEP 3: Position move and hold ==========
    println!("Step 3: One slow rotation forward, then hold.");
    if !confirm("Proceed?") {
        motor.off(false)?;
        return Ok(());
    }

    let before = motor.position()?;
    motor.on_for_rotations(SpeedValue::Percent(15.0), 1.0, true, true)?;
    let after = motor.position()?;
    println!("  traveled {} counts (expected ~{})", after - before, spec.count_per_rot);
    println!("  state: {:?}", motor.state()?);
    sleep(Duration::from_millis(500));
    println!();

    // ========== STEP 4: Back to where we started ==========
    println!("Step 4: Returning to the start position.");
    if !confirm("Proceed?") {
        motor.off(false)?;
        return Ok(());
    }

    motor.on_to_position(SpeedValue::Percent(15.0), before, true, true)?;
    println!("  position now {} counts", motor.position()?);
    println!();

    // ========== FINAL: Release ==========
    motor.off(false)?;
    motor.reset()?;
    println!("Tour complete; motor released.");

    Ok(())
}
