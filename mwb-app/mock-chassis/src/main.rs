use clap::{Parser, ValueEnum};
use core::cell::RefCell;
use embassy_sync::channel::TrySendError;
use embedded_hal::{digital, i2c, pwm};
use embedded_hal_bus::i2c::RefCellDevice;
use mwb_core::mk_static;
use mwb_core::utils::controllers::pca9685::pca_drivetrain;
use mwb_core::utils::controllers::{
    DriveCommand, DriveController, Drivetrain, Motor, MotorActuator, MotorError,
};
use mwb_core::utils::{DRIVE_CHANNEL, mk};
use pwm_pca9685::{Address as PwmAddress, Channel, Pca9685};
use std::convert::Infallible;
use std::io::BufRead;
use std::process::ExitCode;
use tracing::{error, info, warn};

/// PCA9685 address on the reference board.
const PWM_ADDRESS: u8 = 0x55;

/// `[forward_select, reverse_select, enable]` per wheel: FL, FR, BL, BR.
const PCA_CHANNELS: [[Channel; 3]; 4] = [
    [Channel::C0, Channel::C1, Channel::C2],
    [Channel::C4, Channel::C5, Channel::C6],
    [Channel::C8, Channel::C9, Channel::C10],
    [Channel::C12, Channel::C13, Channel::C14],
];

#[derive(Clone, Copy, ValueEnum)]
enum Backend {
    /// Direction lines and enables that log every write
    Log,
    /// PCA9685 expander on an I2C bus that logs every frame
    Pca,
}

#[derive(Parser)]
#[clap(version = "1.0")]
struct Opts
{
    /// Channel backend the drivetrain is built on
    #[clap(long, value_enum, default_value = "log")]
    backend: Backend,
    /// Back-right compensation factor (defaults to the tuned value)
    #[clap(long)]
    compensation: Option<f32>,
    /// JSON drive commands, e.g. '{"dc":"f","s":120}'. Read from stdin, one
    /// per line, when none are given.
    commands: Vec<String>,
}

/// Direction line that logs to console
struct LogLine(&'static str);

impl digital::ErrorType for LogLine {
    type Error = Infallible;
}

impl digital::OutputPin for LogLine {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        info!("{}: low", self.0);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        info!("{}: high", self.0);
        Ok(())
    }
}

/// Enable output that logs to console
struct LogPwm(&'static str);

impl pwm::ErrorType for LogPwm {
    type Error = Infallible;
}

impl pwm::SetDutyCycle for LogPwm {
    fn max_duty_cycle(&self) -> u16 {
        u8::MAX as u16
    }

    fn set_duty_cycle(&mut self, duty: u16) -> Result<(), Self::Error> {
        info!("{}: duty {}", self.0, duty);
        Ok(())
    }
}

/// I2C bus that logs writes and answers reads with zeros
struct LogI2c;

impl i2c::ErrorType for LogI2c {
    type Error = Infallible;
}

impl i2c::I2c for LogI2c {
    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [i2c::Operation<'_>],
    ) -> Result<(), Self::Error> {
        for op in operations {
            match op {
                i2c::Operation::Write(bytes) => info!("i2c 0x{:02X} <- {:02X?}", address, bytes),
                i2c::Operation::Read(buf) => {
                    buf.fill(0);
                    info!("i2c 0x{:02X} -> {} bytes", address, buf.len());
                }
            }
        }
        Ok(())
    }
}

fn log_drivetrain(kinematics: mk) -> Drivetrain<Motor<LogLine, LogLine, LogPwm>> {
    match Drivetrain::from_channels(
        LogLine("fl.fwd"),
        LogLine("fl.rev"),
        LogPwm("fl.en"),
        LogLine("fr.fwd"),
        LogLine("fr.rev"),
        LogPwm("fr.en"),
        LogLine("bl.fwd"),
        LogLine("bl.rev"),
        LogPwm("bl.en"),
        LogLine("br.fwd"),
        LogLine("br.rev"),
        LogPwm("br.en"),
        kinematics,
    ) {
        Ok(dt) => dt,
        Err(e) => match e.error {
            MotorError::Pin(never) | MotorError::Pwm(never) => match never {},
        },
    }
}

/// Queue every command on `DRIVE_CHANNEL` and let the controller apply them.
fn run<M: MotorActuator>(
    mut ctrl: DriveController<M>,
    commands: impl Iterator<Item = String>,
) {
    for line in commands {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match DriveCommand::from_json(line) {
            Ok(cmd) => {
                if let Err(TrySendError::Full(cmd)) = DRIVE_CHANNEL.try_send(cmd) {
                    warn!(?cmd, "drive queue full, command dropped");
                }
            }
            Err(error) => error!(%error, line, "error deserializing DriveCommand"),
        }
        ctrl.drain(&DRIVE_CHANNEL);
    }

    if let Err(e) = ctrl.drivetrain_mut().stop() {
        error!(wheel = ?e.wheel, error = ?e.error, "final stop failed");
    }
    info!(states = ?ctrl.drivetrain().states(), "chassis stopped");
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
    let opts: Opts = Opts::parse();

    let kinematics = match mk::new(opts.compensation) {
        Ok(k) => k,
        Err(e) => {
            error!(?e, "invalid compensation factor");
            return ExitCode::FAILURE;
        }
    };

    let commands: Box<dyn Iterator<Item = String>> = if opts.commands.is_empty() {
        info!("Reading drive commands from stdin");
        Box::new(std::io::stdin().lock().lines().map_while(Result::ok))
    } else {
        Box::new(opts.commands.into_iter())
    };

    match opts.backend {
        Backend::Log => run(DriveController::new(log_drivetrain(kinematics)), commands),
        Backend::Pca => {
            let i2c_bus: &'static RefCell<LogI2c> = mk_static!(RefCell<LogI2c>, RefCell::new(LogI2c));
            let pwm = match Pca9685::new(RefCellDevice::new(i2c_bus), PwmAddress::from(PWM_ADDRESS)) {
                Ok(pwm) => pwm,
                Err(e) => {
                    error!(?e, "PCA9685 init failed");
                    return ExitCode::FAILURE;
                }
            };
            let pca: &'static RefCell<Pca9685<RefCellDevice<'static, LogI2c>>> = mk_static!(
                RefCell<Pca9685<RefCellDevice<'static, LogI2c>>>,
                RefCell::new(pwm)
            );
            {
                let mut pwm = pca.borrow_mut();
                if pwm.enable().is_err() || pwm.set_prescale(100).is_err() {
                    warn!("PWM configuration failed");
                }
                info!("PWM enabled, prescale set to 60Hz");
            }
            match pca_drivetrain(pca, PCA_CHANNELS, kinematics) {
                Ok(dt) => run(DriveController::new(dt), commands),
                Err(e) => {
                    error!(?e, "drivetrain setup failed");
                    return ExitCode::FAILURE;
                }
            }
        }
    }
    ExitCode::SUCCESS
}
