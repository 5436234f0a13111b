//! Kinematics utilities for 4-wheeled Mecanum robots.
//!
//! The `MecanumKinematics` struct maps a chassis-level command onto the
//! direction and duty cycle of each wheel. Wheels are always listed in the order
//! front-left, front-right, back-left, back-right.
//!
//! # Example
//! ```rust
//! use mwb_core::utils::math::kinematics::{ChassisCommand, MecanumKinematics, WheelDrive};
//! let kin = MecanumKinematics::default();
//! let wheels = kin.wheel_drives(ChassisCommand::Right, 120);
//! assert_eq!(wheels[0], WheelDrive::Forward(120));
//! assert_eq!(wheels[1], WheelDrive::Backward(120));
//! ```

/// Back-right duty multiplier applied on forward motion.
///
/// Tuned on the assembled chassis; the back-right wheel loses traction relative
/// to the other three and drifts the robot to the right without it.
pub const BACK_RIGHT_COMPENSATION: f32 = 1.15;

/// Largest duty cycle a wheel can be driven with.
pub const MAX_DUTY: u8 = u8::MAX;

/// Chassis position of a wheel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wheel {
    FrontLeft,
    FrontRight,
    BackLeft,
    BackRight,
}

impl Wheel {
    /// All wheels in actuation order.
    pub const ALL: [Wheel; 4] = [
        Wheel::FrontLeft,
        Wheel::FrontRight,
        Wheel::BackLeft,
        Wheel::BackRight,
    ];

    /// Position of this wheel in a `[_; 4]` wheel array.
    pub const fn index(self) -> usize {
        match self {
            Wheel::FrontLeft => 0,
            Wheel::FrontRight => 1,
            Wheel::BackLeft => 2,
            Wheel::BackRight => 3,
        }
    }
}

/// Wheel-agnostic motion request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChassisCommand {
    Forward,
    Backward,
    /// Strafe left.
    Left,
    /// Strafe right.
    Right,
    /// Rotate clockwise in place.
    RotateCw,
    /// Rotate counter-clockwise in place.
    RotateCcw,
    Stop,
}

/// Direction and duty cycle for a single wheel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WheelDrive {
    Forward(u8),
    Backward(u8),
    Stop,
}

impl WheelDrive {
    /// Same duty, opposite rotational sense. `Stop` stays `Stop`.
    pub const fn reversed(self) -> Self {
        match self {
            WheelDrive::Forward(s) => WheelDrive::Backward(s),
            WheelDrive::Backward(s) => WheelDrive::Forward(s),
            WheelDrive::Stop => WheelDrive::Stop,
        }
    }

    /// Duty cycle this drive applies to the enable channel.
    pub const fn duty(self) -> u8 {
        match self {
            WheelDrive::Forward(s) | WheelDrive::Backward(s) => s,
            WheelDrive::Stop => 0,
        }
    }
}

/// Errors raised while configuring the kinematics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum KinematicsError {
    /// The compensation factor is NaN, infinite, zero or negative.
    InvalidCompensation(f32),
}

/// Open-loop kinematic table of a Mecanum chassis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MecanumKinematics {
    /// Back-right multiplier for forward motion
    compensation: f32,
}

impl Default for MecanumKinematics {
    fn default() -> Self {
        Self {
            compensation: BACK_RIGHT_COMPENSATION,
        }
    }
}

impl MecanumKinematics {
    /// Instantiate with a back-right compensation factor, or
    /// [`BACK_RIGHT_COMPENSATION`] when `None`.
    pub fn new(compensation: Option<f32>) -> Result<Self, KinematicsError> {
        let k = compensation.unwrap_or(BACK_RIGHT_COMPENSATION);
        if !k.is_finite() || k <= 0.0 {
            return Err(KinematicsError::InvalidCompensation(k));
        }
        Ok(Self { compensation: k })
    }

    /// The back-right compensation factor in use.
    pub fn compensation(&self) -> f32 {
        self.compensation
    }

    /// Scale `speed` by the compensation factor.
    ///
    /// Rounds half away from zero, then saturates at [`MAX_DUTY`] so large
    /// inputs never wrap past the duty-cycle domain.
    pub fn compensate(
        &self,
        speed: u8,
    ) -> u8 {
        let scaled = libm::roundf(f32::from(speed) * self.compensation);
        scaled.clamp(0.0, f32::from(MAX_DUTY)) as u8
    }

    /// Compute the drive of every wheel for `command` at `speed`.
    ///
    /// Returns `[front_left, front_right, back_left, back_right]`.
    pub fn wheel_drives(
        &self,
        command: ChassisCommand,
        speed: u8,
    ) -> [WheelDrive; 4] {
        use WheelDrive::{Backward as B, Forward as F};

        match command {
            ChassisCommand::Forward => [F(speed), F(speed), F(speed), F(self.compensate(speed))],
            ChassisCommand::Backward => [B(speed), B(speed), B(speed), B(speed)],
            ChassisCommand::Left => [B(speed), F(speed), F(speed), B(speed)],
            ChassisCommand::Right => [F(speed), B(speed), B(speed), F(speed)],
            ChassisCommand::RotateCw => [F(speed), B(speed), F(speed), B(speed)],
            ChassisCommand::RotateCcw => [B(speed), F(speed), B(speed), F(speed)],
            ChassisCommand::Stop => [WheelDrive::Stop; 4],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::WheelDrive::{Backward as B, Forward as F};

    #[test]
    fn test_strafe_patterns() {
        let kin = MecanumKinematics::default();
        assert_eq!(
            kin.wheel_drives(ChassisCommand::Left, 80),
            [B(80), F(80), F(80), B(80)]
        );
        assert_eq!(
            kin.wheel_drives(ChassisCommand::Right, 80),
            [F(80), B(80), B(80), F(80)]
        );
    }

    #[test]
    fn test_rotations_are_inverse() {
        let kin = MecanumKinematics::default();
        for speed in [0u8, 1, 100, 200, 255] {
            let cw = kin.wheel_drives(ChassisCommand::RotateCw, speed);
            let ccw = kin.wheel_drives(ChassisCommand::RotateCcw, speed);
            for i in 0..4 {
                assert_eq!(cw[i].reversed(), ccw[i], "wheel {} at speed {}", i, speed);
            }
        }
    }

    #[test]
    fn test_backward_is_uncompensated() {
        let kin = MecanumKinematics::default();
        assert_eq!(kin.wheel_drives(ChassisCommand::Backward, 230), [B(230); 4]);
    }

    #[test]
    fn test_forward_compensates_back_right() {
        let kin = MecanumKinematics::default();
        assert_eq!(
            kin.wheel_drives(ChassisCommand::Forward, 100),
            [F(100), F(100), F(100), F(115)]
        );
    }

    #[test]
    fn test_compensation_saturates() {
        let kin = MecanumKinematics::default();
        // 230 * 1.15 = 264.5
        assert_eq!(kin.compensate(230), 255);
        assert_eq!(kin.compensate(255), 255);
        assert_eq!(kin.compensate(0), 0);
        // 222 * 1.15 = 255.3
        assert_eq!(kin.compensate(222), 255);
        // 221 * 1.15 = 254.15
        assert_eq!(kin.compensate(221), 254);
    }

    #[test]
    fn test_compensation_matches_integer_rounding() {
        let kin = MecanumKinematics::default();
        for speed in 0..=u8::MAX {
            // speed * 1.15, half rounded up, saturated
            let expected = ((u16::from(speed) * 115 + 50) / 100).min(255) as u8;
            assert_eq!(kin.compensate(speed), expected, "speed {}", speed);
        }
    }

    #[test]
    fn test_custom_compensation() {
        let kin = MecanumKinematics::new(Some(1.0)).unwrap();
        assert_eq!(kin.wheel_drives(ChassisCommand::Forward, 200), [F(200); 4]);

        let kin = MecanumKinematics::new(Some(0.5)).unwrap();
        // 101 * 0.5 = 50.5 rounds away from zero
        assert_eq!(kin.compensate(101), 51);
    }

    #[test]
    fn test_invalid_compensation_rejected() {
        for k in [0.0, -1.15, f32::NAN, f32::INFINITY] {
            assert!(MecanumKinematics::new(Some(k)).is_err(), "k = {}", k);
        }
        assert_eq!(
            MecanumKinematics::new(None).unwrap().compensation(),
            BACK_RIGHT_COMPENSATION
        );
    }

    #[test]
    fn test_stop_zeroes_every_wheel() {
        let kin = MecanumKinematics::default();
        let wheels = kin.wheel_drives(ChassisCommand::Stop, 200);
        assert!(wheels.iter().all(|w| w.duty() == 0));
    }

    #[test]
    fn test_wheel_index_matches_order() {
        for (i, wheel) in Wheel::ALL.iter().enumerate() {
            assert_eq!(wheel.index(), i);
        }
    }
}
