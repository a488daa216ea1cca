// Keyboard teleop: WASD drive, R/F speed, Q quit
//
// Maps the keyboard to a virtual joystick vector and feeds it to the
// joystick drive at ~50 Hz. Releasing the keys recenters the stick after
// a short timeout.

use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode},
};
use std::time::{Duration, Instant};
use tracing::info;

use tachodrive::{MotorKind, MoveJoystick, MoveTank, OutputPort, Platform, SpeedValue};

const SPEEDS: [f32; 3] = [25.0, 50.0, 100.0]; // percent at the stick rim
const RADIUS: f32 = 100.0;
const INPUT_TIMEOUT_MS: u64 = 150; // Recenter the stick after this much time with no input

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let platform = Platform::default();
    let tank = MoveTank::new(&platform, OutputPort::A, OutputPort::B, MotorKind::Large)?;
    let mut joystick = MoveJoystick::new(tank);

    info!("Controls: WASD=drive, R/F=speed, Q=quit");
    info!("Speed: LOW");

    enable_raw_mode()?;
    let result = run_teleop(&mut joystick);
    disable_raw_mode()?;

    joystick.off(false)?;
    result
}

fn run_teleop(joystick: &mut MoveJoystick) -> Result<(), Box<dyn std::error::Error>> {
    let mut speed_idx: usize = 0;

    // Persistent stick state
    let mut x = 0.0f32;
    let mut y = 0.0f32;
    let mut last_input = Instant::now();

    loop {
        // Poll for a key with 20ms timeout (50Hz effective rate)
        if event::poll(Duration::from_millis(20))? {
            if let Event::Key(KeyEvent { code, kind, .. }) = event::read()? {
                let pressed = kind == KeyEventKind::Press || kind == KeyEventKind::Repeat;

                match code {
                    KeyCode::Char('w') if pressed => {
                        y = RADIUS;
                        x = 0.0;
                        last_input = Instant::now();
                    }
                    KeyCode::Char('s') if pressed => {
                        y = -RADIUS;
                        x = 0.0;
                        last_input = Instant::now();
                    }
                    KeyCode::Char('a') if pressed => {
                        x = -RADIUS;
                        y = 0.0;
                        last_input = Instant::now();
                    }
                    KeyCode::Char('d') if pressed => {
                        x = RADIUS;
                        y = 0.0;
                        last_input = Instant::now();
                    }

                    KeyCode::Char('r') if pressed => {
                        speed_idx = (speed_idx + 1).min(2);
                        print_speed(speed_idx);
                    }
                    KeyCode::Char('f') if pressed => {
                        speed_idx = speed_idx.saturating_sub(1);
                        print_speed(speed_idx);
                    }

                    KeyCode::Char('q') | KeyCode::Esc if pressed => break,

                    _ => {}
                }
            }
        }

        // Recenter if no movement input for INPUT_TIMEOUT_MS
        if last_input.elapsed() > Duration::from_millis(INPUT_TIMEOUT_MS) {
            x = 0.0;
            y = 0.0;
        }

        joystick.on(x, y, SpeedValue::Percent(SPEEDS[speed_idx]), RADIUS)?;
    }

    Ok(())
}

fn print_speed(idx: usize) {
    let label = ["LOW", "MED", "HIGH"][idx];
    info!("Speed: {}", label);
}
