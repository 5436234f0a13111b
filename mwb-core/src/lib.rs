//! Motion core for the Mecanum-Wheel Bot on no-std embedded platforms.
//!
//! For a host-side run of the whole stack, see the `mock-chassis` binary.
#![no_std]

pub mod utils;
