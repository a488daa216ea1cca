// Encoder odometry: integrates wheel motion into a world-frame pose.
//
// A dedicated sampling thread reads both encoders on a fixed period and
// dead-reckons (x, y, theta) from the per-wheel travel deltas. The world
// frame is pinned at the robot's pose when the integrator started. A
// transient encoder read failure skips the tick; losing the device stops
// the thread and surfaces on the next pose read.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, warn};

use crate::device::Attribute;
use crate::error::{DriveError, Result};

/// Sampling period of the integrator
pub const ODOMETRY_TICK: Duration = Duration::from_millis(20);

/// World-frame pose: millimeters and degrees.
///
/// theta is counter-clockwise-positive and wraps every 360 degrees; x and
/// y are unbounded.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize)]
pub struct Pose {
    pub x_mm: f32,
    pub y_mm: f32,
    pub theta_deg: f32,
}

impl Pose {
    /// Bearing from this pose to a world point, in degrees [0, 360)
    pub fn bearing_to(&self, x_mm: f32, y_mm: f32) -> f32 {
        (y_mm - self.y_mm)
            .atan2(x_mm - self.x_mm)
            .to_degrees()
            .rem_euclid(360.0)
    }

    /// Straight-line distance from this pose to a world point, in mm
    pub fn distance_to(&self, x_mm: f32, y_mm: f32) -> f32 {
        let dx = x_mm - self.x_mm;
        let dy = y_mm - self.y_mm;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Shortest signed rotation from `from_deg` to `to_deg`, in (-180, 180]
pub(crate) fn shortest_rotation(from_deg: f32, to_deg: f32) -> f32 {
    let mut delta = (to_deg - from_deg).rem_euclid(360.0);
    if delta > 180.0 {
        delta -= 360.0;
    }
    delta
}

/// Advance a pose by one tick of per-wheel travel.
///
/// Heading change comes from the differential travel over the wheelbase;
/// the displacement is applied along the mid-step heading, which keeps the
/// integration exact for constant-curvature ticks.
pub(crate) fn integrate_tick(pose: Pose, d_left_mm: f32, d_right_mm: f32, wheelbase_mm: f32) -> Pose {
    let displacement = (d_left_mm + d_right_mm) / 2.0;
    let d_theta = (d_right_mm - d_left_mm) / wheelbase_mm;

    let theta = pose.theta_deg.to_radians();
    let theta_mid = theta + d_theta / 2.0;

    Pose {
        x_mm: pose.x_mm + displacement * theta_mid.cos(),
        y_mm: pose.y_mm + displacement * theta_mid.sin(),
        theta_deg: (theta + d_theta).to_degrees().rem_euclid(360.0),
    }
}

/// Everything the sampling thread needs to own
pub(crate) struct OdometryInputs {
    /// Fresh position attribute handles, independent of the motor handles
    pub left_position: Attribute,
    pub right_position: Attribute,
    /// Encoder counts at start, subtracted out so the pose begins at zero
    pub initial_left: i32,
    pub initial_right: i32,
    /// Travel per encoder count, `circumference / count_per_rot`
    pub mm_per_count_left: f32,
    pub mm_per_count_right: f32,
    pub wheelbase_mm: f32,
}

/// Handle to a running integrator thread
pub(crate) struct OdometryTask {
    pose: Arc<Mutex<Pose>>,
    failure: Arc<Mutex<Option<DriveError>>>,
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl OdometryTask {
    pub fn spawn(mut inputs: OdometryInputs) -> Self {
        let pose = Arc::new(Mutex::new(Pose::default()));
        let failure = Arc::new(Mutex::new(None));
        let stop = Arc::new(AtomicBool::new(false));

        let thread = {
            let pose = Arc::clone(&pose);
            let failure = Arc::clone(&failure);
            let stop = Arc::clone(&stop);

            std::thread::spawn(move || {
                let mut last_left = inputs.initial_left;
                let mut last_right = inputs.initial_right;
                let mut next_tick = Instant::now() + ODOMETRY_TICK;

                while !stop.load(Ordering::Relaxed) {
                    let now = Instant::now();
                    if now < next_tick {
                        std::thread::sleep(next_tick - now);
                    }
                    next_tick += ODOMETRY_TICK;

                    let (left, right) = match (
                        inputs.left_position.read_int(),
                        inputs.right_position.read_int(),
                    ) {
                        (Ok(left), Ok(right)) => (left, right),
                        (Err(e), _) | (_, Err(e)) => {
                            if matches!(e, DriveError::DeviceNotFound { .. }) {
                                warn!("odometry: encoder lost, stopping: {e}");
                                *failure.lock().expect("odometry failure lock") = Some(e);
                                return;
                            }
                            // Transient glitch, try again next tick
                            warn!("odometry: encoder read failed, skipping tick: {e}");
                            continue;
                        }
                    };

                    let d_left = (left - last_left) as f32 * inputs.mm_per_count_left;
                    let d_right = (right - last_right) as f32 * inputs.mm_per_count_right;
                    last_left = left;
                    last_right = right;

                    let mut pose = pose.lock().expect("odometry pose lock");
                    *pose = integrate_tick(*pose, d_left, d_right, inputs.wheelbase_mm);
                }
                debug!("odometry: stop requested, exiting");
            })
        };

        Self {
            pose,
            failure,
            stop,
            thread: Some(thread),
        }
    }

    /// Snapshot the pose, or surface the error that killed the thread
    pub fn pose(&self) -> Result<Pose> {
        if let Some(failure) = self.failure.lock().expect("odometry failure lock").take() {
            return Err(failure);
        }
        Ok(*self.pose.lock().expect("odometry pose lock"))
    }

    /// Signal the thread and wait for it to exit at the tick boundary
    pub fn stop(mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}
