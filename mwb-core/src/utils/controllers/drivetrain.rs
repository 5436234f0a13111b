//! Four-motor Mecanum drivetrain.
//!
//! `Drivetrain` owns one motor per wheel and turns chassis commands into four
//! motor calls, issued in the order front-left, front-right, back-left,
//! back-right. The per-wheel pattern comes from
//! [`MecanumKinematics`](crate::utils::math::kinematics::MecanumKinematics).

use embedded_hal::{digital::OutputPin, pwm::SetDutyCycle};

use super::motor::{Motor, MotorActuator, MotorError, MotorState};
use crate::utils::math::kinematics::{ChassisCommand, MecanumKinematics, Wheel};

/// A motor call that failed, tagged with the wheel it was addressed to.
///
/// Wheels after the failing one are not driven for that motion command. A stop
/// still reaches every wheel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriveError<E> {
    pub wheel: Wheel,
    pub error: E,
}

/// Mecanum chassis built from four exclusively owned motors.
pub struct Drivetrain<M> {
    motors: [M; 4],
    kinematics: MecanumKinematics,
}

impl<M> Drivetrain<M>
where
    M: MotorActuator,
{
    /// Assemble a drivetrain from already constructed motors.
    pub fn new(
        front_left: M,
        front_right: M,
        back_left: M,
        back_right: M,
        kinematics: MecanumKinematics,
    ) -> Self {
        tracing::info!(
            compensation = kinematics.compensation(),
            "drivetrain assembled"
        );
        Drivetrain {
            motors: [front_left, front_right, back_left, back_right],
            kinematics,
        }
    }

    /// Move the chassis forward. The back-right wheel gets the compensated duty.
    pub fn forward(
        &mut self,
        speed: u8,
    ) -> Result<(), DriveError<M::Error>> {
        self.execute(ChassisCommand::Forward, speed)
    }

    /// Move the chassis backward.
    pub fn backward(
        &mut self,
        speed: u8,
    ) -> Result<(), DriveError<M::Error>> {
        self.execute(ChassisCommand::Backward, speed)
    }

    /// Strafe left without turning.
    pub fn left(
        &mut self,
        speed: u8,
    ) -> Result<(), DriveError<M::Error>> {
        self.execute(ChassisCommand::Left, speed)
    }

    /// Strafe right without turning.
    pub fn right(
        &mut self,
        speed: u8,
    ) -> Result<(), DriveError<M::Error>> {
        self.execute(ChassisCommand::Right, speed)
    }

    /// Rotate clockwise in place until another command is issued.
    ///
    /// `angle` (degrees) is accepted but not acted on: rotation is open loop
    /// and untimed.
    pub fn rot_cw(
        &mut self,
        speed: u8,
        angle: u16,
    ) -> Result<(), DriveError<M::Error>> {
        tracing::debug!(angle, "rotation angle ignored, rotating until stopped");
        self.execute(ChassisCommand::RotateCw, speed)
    }

    /// Rotate counter-clockwise in place until another command is issued.
    ///
    /// `angle` is inert, see [`Drivetrain::rot_cw`].
    pub fn rot_ccw(
        &mut self,
        speed: u8,
        angle: u16,
    ) -> Result<(), DriveError<M::Error>> {
        tracing::debug!(angle, "rotation angle ignored, rotating until stopped");
        self.execute(ChassisCommand::RotateCcw, speed)
    }

    /// Zero every wheel's enable output.
    ///
    /// Every wheel is attempted even when an earlier one fails; the first
    /// failure is returned afterwards.
    pub fn stop(&mut self) -> Result<(), DriveError<M::Error>> {
        tracing::debug!("chassis stop");
        let mut first = None;
        for (wheel, motor) in Wheel::ALL.into_iter().zip(self.motors.iter_mut()) {
            if let Err(error) = motor.stop() {
                tracing::warn!(?wheel, ?error, "wheel did not stop");
                first.get_or_insert(DriveError { wheel, error });
            }
        }
        first.map_or(Ok(()), Err)
    }

    /// Look up `command` in the kinematic table and drive each wheel in order.
    ///
    /// A motion command stops at the first failing wheel. `Stop` goes through
    /// [`Drivetrain::stop`] and reaches all four.
    pub fn execute(
        &mut self,
        command: ChassisCommand,
        speed: u8,
    ) -> Result<(), DriveError<M::Error>> {
        if command == ChassisCommand::Stop {
            return self.stop();
        }
        let drives = self.kinematics.wheel_drives(command, speed);
        tracing::debug!(?command, speed, ?drives, "chassis command");

        for ((wheel, motor), drive) in Wheel::ALL
            .into_iter()
            .zip(self.motors.iter_mut())
            .zip(drives)
        {
            motor
                .drive(drive)
                .map_err(|error| DriveError { wheel, error })?;
        }
        Ok(())
    }

    /// Last command that took effect on each wheel, in wheel order.
    pub fn states(&self) -> [MotorState; 4] {
        [
            self.motors[0].state(),
            self.motors[1].state(),
            self.motors[2].state(),
            self.motors[3].state(),
        ]
    }

    pub fn motor(
        &self,
        wheel: Wheel,
    ) -> &M {
        &self.motors[wheel.index()]
    }

    pub fn kinematics(&self) -> &MecanumKinematics {
        &self.kinematics
    }
}

impl<A, B, EN, PinE, PwmE> Drivetrain<Motor<A, B, EN>>
where
    A: OutputPin<Error = PinE>,
    B: OutputPin<Error = PinE>,
    EN: SetDutyCycle<Error = PwmE>,
    PinE: core::fmt::Debug,
    PwmE: core::fmt::Debug,
{
    /// Build all four motors from their twelve channels.
    ///
    /// Each wheel takes `(forward_select, reverse_select, enable)`. Every motor
    /// is driven to idle as it is constructed.
    #[allow(clippy::too_many_arguments)]
    pub fn from_channels(
        fl_forward: A,
        fl_reverse: B,
        fl_enable: EN,
        fr_forward: A,
        fr_reverse: B,
        fr_enable: EN,
        bl_forward: A,
        bl_reverse: B,
        bl_enable: EN,
        br_forward: A,
        br_reverse: B,
        br_enable: EN,
        kinematics: MecanumKinematics,
    ) -> Result<Self, DriveError<MotorError<PinE, PwmE>>> {
        let bind = |wheel, a, b, en| Motor::new(a, b, en).map_err(|error| DriveError { wheel, error });

        let front_left = bind(Wheel::FrontLeft, fl_forward, fl_reverse, fl_enable)?;
        let front_right = bind(Wheel::FrontRight, fr_forward, fr_reverse, fr_enable)?;
        let back_left = bind(Wheel::BackLeft, bl_forward, bl_reverse, bl_enable)?;
        let back_right = bind(Wheel::BackRight, br_forward, br_reverse, br_enable)?;

        Ok(Self::new(
            front_left,
            front_right,
            back_left,
            back_right,
            kinematics,
        ))
    }
}
