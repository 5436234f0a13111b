//! Module Exports
//!
//! This file exports the motion-control components of the robot.
//!
//! - `motor`: single DC motor behind an H-bridge driver.
//! - `drivetrain`: four motors composed into a Mecanum chassis.
//! - `pca9685`: motor channels backed by a PCA9685 PWM expander.
//!
//! It also defines the serialized `DriveCommand` and the `DriveController`
//! that applies commands received over `DRIVE_CHANNEL`.

pub mod drivetrain;
pub mod motor;
/// Module for binding motor channels to a PCA9685 over I2C.
pub mod pca9685;

use embassy_sync::{
    blocking_mutex::raw::{CriticalSectionRawMutex, RawMutex},
    channel::Channel,
};
use serde::{Deserialize, Serialize};

pub use drivetrain::{DriveError, Drivetrain};
pub use motor::{Motor, MotorActuator, MotorError, MotorState};

use crate::utils::math::kinematics::ChassisCommand;

/// Duty cycle used when a command carries no speed (~40%).
pub const DEFAULT_SPEED: u8 = 100;
/// Rotation angle used when a rotate command carries none. Not acted on.
pub const DEFAULT_ROTATION_ANGLE: u16 = 90;
/// Number of drive commands that can be queued ahead of the controller.
pub const DRIVE_QUEUE_DEPTH: usize = 16;

/// Channel used to receive drive commands (`DriveCommand` messages).
pub static DRIVE_CHANNEL: Channel<CriticalSectionRawMutex, DriveCommand, DRIVE_QUEUE_DEPTH> =
    Channel::new();

/// Drive command variants, one per chassis motion.
///
/// Serialized as JSON with tag `"dc"`. `s` is the duty cycle (0-255) and `a`
/// the rotation angle in degrees; both fall back to defaults when omitted.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(tag = "dc", rename_all = "snake_case")] // dc = drive command
pub enum DriveCommand {
    /// Forward.
    F { s: Option<u8> },
    /// Backward.
    B { s: Option<u8> },
    /// Strafe left.
    L { s: Option<u8> },
    /// Strafe right.
    R { s: Option<u8> },
    /// Rotate clockwise.
    Cw { s: Option<u8>, a: Option<u16> },
    /// Rotate counter-clockwise.
    Ccw { s: Option<u8>, a: Option<u16> },
    Stop,
}

impl DriveCommand {
    /// Parse a JSON drive command, e.g. `{"dc":"cw","s":90}`.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Chassis motion and duty cycle, with the default speed filled in.
    pub fn chassis(&self) -> (ChassisCommand, u8) {
        let speed = |s: &Option<u8>| s.unwrap_or(DEFAULT_SPEED);
        match self {
            DriveCommand::F { s } => (ChassisCommand::Forward, speed(s)),
            DriveCommand::B { s } => (ChassisCommand::Backward, speed(s)),
            DriveCommand::L { s } => (ChassisCommand::Left, speed(s)),
            DriveCommand::R { s } => (ChassisCommand::Right, speed(s)),
            DriveCommand::Cw { s, .. } => (ChassisCommand::RotateCw, speed(s)),
            DriveCommand::Ccw { s, .. } => (ChassisCommand::RotateCcw, speed(s)),
            DriveCommand::Stop => (ChassisCommand::Stop, 0),
        }
    }

    /// Requested rotation angle for rotate commands, defaulted when omitted.
    pub fn angle(&self) -> Option<u16> {
        match self {
            DriveCommand::Cw { a, .. } | DriveCommand::Ccw { a, .. } => {
                Some(a.unwrap_or(DEFAULT_ROTATION_ANGLE))
            }
            _ => None,
        }
    }
}

/// Single consumer of drive commands, owning the drivetrain.
pub struct DriveController<M> {
    drivetrain: Drivetrain<M>,
}

impl<M> DriveController<M>
where
    M: MotorActuator,
{
    pub fn new(drivetrain: Drivetrain<M>) -> Self {
        DriveController { drivetrain }
    }

    /// Apply one command to the drivetrain.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn execute_command(
        &mut self,
        command: DriveCommand,
    ) -> Result<(), DriveError<M::Error>> {
        if let Some(angle) = command.angle() {
            tracing::debug!(angle, "rotation angle ignored, rotating until stopped");
        }
        let (chassis, speed) = command.chassis();
        self.drivetrain.execute(chassis, speed)
    }

    /// Apply every command already queued on `channel` without waiting.
    ///
    /// Returns how many commands were taken off the queue.
    pub fn drain<R: RawMutex, const N: usize>(
        &mut self,
        channel: &Channel<R, DriveCommand, N>,
    ) -> usize {
        let mut taken = 0;
        while let Ok(command) = channel.try_receive() {
            self.dispatch(command);
            taken += 1;
        }
        taken
    }

    /// Receive and apply commands forever.
    pub async fn drive_ch<R: RawMutex, const N: usize>(
        &mut self,
        channel: &Channel<R, DriveCommand, N>,
    ) -> ! {
        loop {
            let command = channel.receiver().receive().await;
            tracing::info!("Received Drive Command: {:?}", command);
            self.dispatch(command);
        }
    }

    /// Execute `command`; on failure, log and try to bring every wheel to a stop
    /// so the chassis is not left with a partially applied pattern.
    fn dispatch(
        &mut self,
        command: DriveCommand,
    ) {
        match self.execute_command(command) {
            Ok(()) => tracing::debug!("drive command executed successfully"),
            Err(e) => {
                tracing::error!(wheel = ?e.wheel, error = ?e.error, "drive command failed");
                if let Err(e) = self.drivetrain.stop() {
                    tracing::error!(wheel = ?e.wheel, error = ?e.error, "emergency stop failed");
                }
            }
        }
    }

    pub fn drivetrain(&self) -> &Drivetrain<M> {
        &self.drivetrain
    }

    pub fn drivetrain_mut(&mut self) -> &mut Drivetrain<M> {
        &mut self.drivetrain
    }
}
