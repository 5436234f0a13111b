//! Math utilities for the Mecanum-Wheel Bot.
//!
//! This module provides the kinematic table for four-wheeled Mecanum chassis.

pub mod kinematics;
