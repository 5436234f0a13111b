//! Utility re-exports and helper macros for the Mecanum-Wheel Bot.
//!
//! This module re-exports the motion components and kinematics:
//!
//! - `controllers`: motors, the drivetrain, PCA9685 channels and the drive
//!   command controller
//! - `math`: kinematic table for Mecanum motion
//!
//! The `mk_static!` macro simplifies static initialization in no-std contexts.

pub mod controllers;
pub mod math;

pub use controllers::{DriveCommand, DriveController, Drivetrain, Motor, DRIVE_CHANNEL};
pub use math::kinematics::MecanumKinematics as mk;

#[macro_export]
/// Initialize a no-std static cell and write the given value into it.
///
/// This macro creates a `static_cell::StaticCell` for type `$t` and initializes
/// it with `$val`, returning a mutable reference to the stored value.
macro_rules! mk_static {
    ($t:ty, $val:expr) => {{
        static STATIC_CELL: static_cell::StaticCell<$t> = static_cell::StaticCell::new();
        STATIC_CELL.uninit().write($val)
    }};
}
