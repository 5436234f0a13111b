//! DC motor actuation through an H-bridge style driver.
//!
//! Each motor is driven by two direction-select outputs and one PWM enable
//! output (the L298 wiring). Speed is a duty cycle in `0..=255` that is mapped
//! onto whatever resolution the enable channel offers.

use embedded_hal::{digital::OutputPin, pwm::SetDutyCycle};

use crate::utils::math::kinematics::{WheelDrive, MAX_DUTY};

/// Last command that took effect on a motor.
///
/// A direction change that fails partway leaves the motor `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MotorState {
    /// Enable output at zero. The direction lines keep their last level.
    #[default]
    Idle,
    Forward(u8),
    Backward(u8),
}

/// Errors raised while writing a motor's channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotorError<PinE, PwmE> {
    /// A direction-select output rejected the write.
    Pin(PinE),
    /// The enable output rejected the duty cycle.
    Pwm(PwmE),
}

/// Per-wheel actuation primitive driven by the drivetrain.
pub trait MotorActuator {
    type Error: core::fmt::Debug;

    /// Spin forward at `speed` (duty cycle, 0 = stationary, 255 = full).
    fn forward(
        &mut self,
        speed: u8,
    ) -> Result<(), Self::Error>;

    /// Spin backward at `speed`.
    fn backward(
        &mut self,
        speed: u8,
    ) -> Result<(), Self::Error>;

    /// Drop the enable output to zero, whatever the current direction.
    fn stop(&mut self) -> Result<(), Self::Error>;

    /// Last command that took effect.
    fn state(&self) -> MotorState;

    /// Apply one entry of the kinematic table.
    fn drive(
        &mut self,
        drive: WheelDrive,
    ) -> Result<(), Self::Error> {
        match drive {
            WheelDrive::Forward(speed) => self.forward(speed),
            WheelDrive::Backward(speed) => self.backward(speed),
            WheelDrive::Stop => self.stop(),
        }
    }
}

/// A DC motor behind a dual-direction-pin + enable-PWM driver.
pub struct Motor<A, B, EN> {
    forward_select: A,
    reverse_select: B,
    enable: EN,
    state: MotorState,
}

impl<A, B, EN, PinE, PwmE> Motor<A, B, EN>
where
    A: OutputPin<Error = PinE>,
    B: OutputPin<Error = PinE>,
    EN: SetDutyCycle<Error = PwmE>,
{
    /// Bind the three channels and drive them to idle.
    ///
    /// Both direction lines are pulled low and the enable output set to zero
    /// before the motor is handed out.
    pub fn new(
        forward_select: A,
        reverse_select: B,
        enable: EN,
    ) -> Result<Self, MotorError<PinE, PwmE>> {
        let mut motor = Motor {
            forward_select,
            reverse_select,
            enable,
            state: MotorState::Idle,
        };
        motor.forward_select.set_low().map_err(MotorError::Pin)?;
        motor.reverse_select.set_low().map_err(MotorError::Pin)?;
        motor
            .enable
            .set_duty_cycle_fully_off()
            .map_err(MotorError::Pwm)?;
        Ok(motor)
    }

    /// Give the channels back, consuming the motor.
    pub fn release(self) -> (A, B, EN) {
        (self.forward_select, self.reverse_select, self.enable)
    }

    fn set_speed(
        &mut self,
        speed: u8,
    ) -> Result<(), MotorError<PinE, PwmE>> {
        self.enable
            .set_duty_cycle_fraction(u16::from(speed), u16::from(MAX_DUTY))
            .map_err(MotorError::Pwm)
    }
}

impl<A, B, EN, PinE, PwmE> MotorActuator for Motor<A, B, EN>
where
    A: OutputPin<Error = PinE>,
    B: OutputPin<Error = PinE>,
    EN: SetDutyCycle<Error = PwmE>,
    PinE: core::fmt::Debug,
    PwmE: core::fmt::Debug,
{
    type Error = MotorError<PinE, PwmE>;

    fn forward(
        &mut self,
        speed: u8,
    ) -> Result<(), Self::Error> {
        self.state = MotorState::Idle;
        // Release the opposite line first so both are never high together.
        self.reverse_select.set_low().map_err(MotorError::Pin)?;
        self.forward_select.set_high().map_err(MotorError::Pin)?;
        self.set_speed(speed)?;
        self.state = MotorState::Forward(speed);
        Ok(())
    }

    fn backward(
        &mut self,
        speed: u8,
    ) -> Result<(), Self::Error> {
        self.state = MotorState::Idle;
        self.forward_select.set_low().map_err(MotorError::Pin)?;
        self.reverse_select.set_high().map_err(MotorError::Pin)?;
        self.set_speed(speed)?;
        self.state = MotorState::Backward(speed);
        Ok(())
    }

    fn stop(&mut self) -> Result<(), Self::Error> {
        self.enable
            .set_duty_cycle_fully_off()
            .map_err(MotorError::Pwm)?;
        self.state = MotorState::Idle;
        Ok(())
    }

    fn state(&self) -> MotorState {
        self.state
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use core::convert::Infallible;
    use std::vec::Vec;

    use embedded_hal::{digital::ErrorType as PinErrorType, pwm::ErrorType as PwmErrorType};

    use super::*;

    #[derive(Default)]
    struct Line {
        high: bool,
        writes: usize,
        stuck_low: bool,
    }

    impl PinErrorType for Line {
        type Error = ();
    }

    impl OutputPin for Line {
        fn set_low(&mut self) -> Result<(), Self::Error> {
            self.high = false;
            self.writes += 1;
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Self::Error> {
            if self.stuck_low {
                return Err(());
            }
            self.high = true;
            self.writes += 1;
            Ok(())
        }
    }

    struct Pwm {
        max: u16,
        duties: Vec<u16>,
    }

    impl PwmErrorType for Pwm {
        type Error = Infallible;
    }

    impl SetDutyCycle for Pwm {
        fn max_duty_cycle(&self) -> u16 {
            self.max
        }

        fn set_duty_cycle(
            &mut self,
            duty: u16,
        ) -> Result<(), Self::Error> {
            self.duties.push(duty);
            Ok(())
        }
    }

    fn motor(max: u16) -> Motor<Line, Line, Pwm> {
        Motor::new(
            Line::default(),
            Line::default(),
            Pwm {
                max,
                duties: Vec::new(),
            },
        )
        .unwrap()
    }

    #[test]
    fn test_new_is_idle() {
        let m = motor(255);
        assert_eq!(m.state(), MotorState::Idle);
        let (a, b, en) = m.release();
        assert!(!a.high && a.writes == 1);
        assert!(!b.high && b.writes == 1);
        assert_eq!(en.duties, [0]);
    }

    #[test]
    fn test_direction_lines_exclusive() {
        let mut m = motor(255);
        m.forward(10).unwrap();
        assert!(m.forward_select.high && !m.reverse_select.high);
        m.backward(10).unwrap();
        assert!(!m.forward_select.high && m.reverse_select.high);
        m.forward(10).unwrap();
        assert!(m.forward_select.high && !m.reverse_select.high);
    }

    #[test]
    fn test_duty_scaled_to_channel_resolution() {
        let mut m = motor(4095);
        m.forward(255).unwrap();
        m.backward(0).unwrap();
        m.forward(51).unwrap();
        let (_, _, en) = m.release();
        // 51 / 255 of 4095
        assert_eq!(en.duties, [0, 4095, 0, 819]);
    }

    #[test]
    fn test_stop_keeps_direction() {
        let mut m = motor(255);
        m.backward(200).unwrap();
        m.stop().unwrap();
        assert_eq!(m.state(), MotorState::Idle);
        assert!(m.reverse_select.high);
        let (_, _, en) = m.release();
        assert_eq!(en.duties.last(), Some(&0));
    }

    #[test]
    fn test_last_call_wins() {
        let mut m = motor(255);
        m.forward(40).unwrap();
        m.backward(90).unwrap();
        assert_eq!(m.state(), MotorState::Backward(90));
        m.drive(WheelDrive::Forward(7)).unwrap();
        assert_eq!(m.state(), MotorState::Forward(7));
        m.drive(WheelDrive::Stop).unwrap();
        assert_eq!(m.state(), MotorState::Idle);
    }

    #[test]
    fn test_failed_direction_change_leaves_idle() {
        let mut m = motor(255);
        m.forward(120).unwrap();
        m.reverse_select.stuck_low = true;

        assert_eq!(m.backward(60), Err(MotorError::Pin(())));
        assert_eq!(m.state(), MotorState::Idle);
        assert!(!m.forward_select.high && !m.reverse_select.high);
    }
}
