//! Motor channels on a PCA9685 PWM expander.
//!
//! The PCA9685 exposes sixteen 12-bit PWM channels over I2C. A motor uses three
//! of them: two driven fully on or fully off as direction-select lines and one as
//! the enable output. The expander is shared between all twelve channel handles
//! through a `RefCell`, borrowed only for the duration of a single write.

use core::cell::RefCell;

use embedded_hal::{digital, i2c::I2c, pwm};
use pwm_pca9685::{Channel, Error as PwmError, Pca9685};

use super::{
    drivetrain::{DriveError, Drivetrain},
    motor::{Motor, MotorError},
};
use crate::utils::math::kinematics::MecanumKinematics;

/// Counter value at which a channel is fully on.
pub const PCA_MAX_DUTY: u16 = 4095;

/// A failed PCA9685 write.
#[derive(Debug)]
pub struct PcaError<E>(pub PwmError<E>);

impl<E: core::fmt::Debug> digital::Error for PcaError<E> {
    fn kind(&self) -> digital::ErrorKind {
        digital::ErrorKind::Other
    }
}

impl<E: core::fmt::Debug> pwm::Error for PcaError<E> {
    fn kind(&self) -> pwm::ErrorKind {
        pwm::ErrorKind::Other
    }
}

/// Errors detected while binding motor channels to the expander.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WiringError {
    /// The same expander channel was assigned to more than one motor line.
    DuplicateChannel(Channel),
}

/// Errors raised while building a drivetrain on a PCA9685.
#[derive(Debug)]
pub enum PcaSetupError<E> {
    Wiring(WiringError),
    Drive(DriveError<MotorError<PcaError<E>, PcaError<E>>>),
}

/// Direction-select line on a PCA9685 channel.
pub struct PcaOutput<'a, I2C> {
    pca: &'a RefCell<Pca9685<I2C>>,
    channel: Channel,
}

/// Enable output on a PCA9685 channel.
pub struct PcaPwm<'a, I2C> {
    pca: &'a RefCell<Pca9685<I2C>>,
    channel: Channel,
}

/// A motor whose three lines all live on the same PCA9685.
pub type PcaMotor<'a, I2C> = Motor<PcaOutput<'a, I2C>, PcaOutput<'a, I2C>, PcaPwm<'a, I2C>>;

fn write_channel<I2C, E>(
    pca: &RefCell<Pca9685<I2C>>,
    channel: Channel,
    off: u16,
) -> Result<(), PcaError<E>>
where
    I2C: I2c<Error = E>,
{
    pca.borrow_mut()
        .set_channel_on_off(channel, 0, off)
        .map_err(PcaError)
}

impl<'a, I2C> PcaOutput<'a, I2C> {
    pub fn new(
        pca: &'a RefCell<Pca9685<I2C>>,
        channel: Channel,
    ) -> Self {
        Self { pca, channel }
    }
}

impl<'a, I2C> PcaPwm<'a, I2C> {
    pub fn new(
        pca: &'a RefCell<Pca9685<I2C>>,
        channel: Channel,
    ) -> Self {
        Self { pca, channel }
    }
}

impl<I2C, E> digital::ErrorType for PcaOutput<'_, I2C>
where
    I2C: I2c<Error = E>,
    E: core::fmt::Debug,
{
    type Error = PcaError<E>;
}

impl<I2C, E> digital::OutputPin for PcaOutput<'_, I2C>
where
    I2C: I2c<Error = E>,
    E: core::fmt::Debug,
{
    fn set_low(&mut self) -> Result<(), Self::Error> {
        write_channel(self.pca, self.channel, 0)
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        write_channel(self.pca, self.channel, PCA_MAX_DUTY)
    }
}

impl<I2C, E> pwm::ErrorType for PcaPwm<'_, I2C>
where
    I2C: I2c<Error = E>,
    E: core::fmt::Debug,
{
    type Error = PcaError<E>;
}

impl<I2C, E> pwm::SetDutyCycle for PcaPwm<'_, I2C>
where
    I2C: I2c<Error = E>,
    E: core::fmt::Debug,
{
    fn max_duty_cycle(&self) -> u16 {
        PCA_MAX_DUTY
    }

    fn set_duty_cycle(
        &mut self,
        duty: u16,
    ) -> Result<(), Self::Error> {
        write_channel(self.pca, self.channel, duty.min(PCA_MAX_DUTY))
    }
}

/// Reject channel maps that reuse an expander channel.
pub fn check_wiring(channels: &[[Channel; 3]; 4]) -> Result<(), WiringError> {
    let flat = channels.as_flattened();
    for (i, channel) in flat.iter().enumerate() {
        if flat[i + 1..].contains(channel) {
            return Err(WiringError::DuplicateChannel(*channel));
        }
    }
    Ok(())
}

/// Build a drivetrain whose twelve lines are PCA9685 channels.
///
/// `channels` lists `[forward_select, reverse_select, enable]` per wheel, in
/// the order front-left, front-right, back-left, back-right. The map is
/// validated before any channel is written.
pub fn pca_drivetrain<'a, I2C, E>(
    pca: &'a RefCell<Pca9685<I2C>>,
    channels: [[Channel; 3]; 4],
    kinematics: MecanumKinematics,
) -> Result<Drivetrain<PcaMotor<'a, I2C>>, PcaSetupError<E>>
where
    I2C: I2c<Error = E>,
    E: core::fmt::Debug,
{
    check_wiring(&channels).map_err(PcaSetupError::Wiring)?;
    tracing::info!(?channels, "binding motor channels on PCA9685");

    let out = |channel| PcaOutput::new(pca, channel);
    let en = |channel| PcaPwm::new(pca, channel);
    let [[fl_a, fl_b, fl_en], [fr_a, fr_b, fr_en], [bl_a, bl_b, bl_en], [br_a, br_b, br_en]] = channels;

    Drivetrain::from_channels(
        out(fl_a),
        out(fl_b),
        en(fl_en),
        out(fr_a),
        out(fr_b),
        en(fr_en),
        out(bl_a),
        out(bl_b),
        en(bl_en),
        out(br_a),
        out(br_b),
        en(br_en),
        kinematics,
    )
    .map_err(PcaSetupError::Drive)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAP: [[Channel; 3]; 4] = [
        [Channel::C0, Channel::C1, Channel::C2],
        [Channel::C3, Channel::C4, Channel::C5],
        [Channel::C6, Channel::C7, Channel::C8],
        [Channel::C9, Channel::C10, Channel::C11],
    ];

    #[test]
    fn test_distinct_channels_accepted() {
        assert_eq!(check_wiring(&MAP), Ok(()));
    }

    #[test]
    fn test_duplicate_channel_rejected() {
        let mut map = MAP;
        map[3][2] = Channel::C4;
        assert_eq!(
            check_wiring(&map),
            Err(WiringError::DuplicateChannel(Channel::C4))
        );
    }
}
