//! Simulation-wide physical constants.
//!
//! Positions are in meters, angles in radians and rates in meters (or
//! radians) per cycle unless noted otherwise.

use super::units::KTS_TO_MPC;

/// Length of one nominal simulation cycle in milliseconds. All per-cycle
/// rates are expressed against this unit; real elapsed time is folded in
/// through the clock's time-compensation coefficient.
pub const CYCLE_MS: f64 = 1000.0;

/// Default gravity (m/cycle^2).
pub const DEFAULT_GRAVITY: f64 = 9.8;

// ISA sea-level atmosphere, used by the barometric density formula.
pub const ISA_SEA_LEVEL_PRESSURE: f64 = 101_325.0; // Pa
pub const ISA_SEA_LEVEL_TEMP: f64 = 288.15; // K
pub const ISA_TEMP_LAPSE_RATE: f64 = 0.0065; // K/m
pub const ISA_DRY_AIR_MOLAR_MASS: f64 = 0.028_964_4; // kg/mol
pub const ISA_GAS_CONSTANT: f64 = 8.314_47; // J/(mol K)

/// Rotor transverse-flow effect onset and fade-out speeds (m/cycle).
/// The effect ramps in around 5 kt and is gone by 25 kt.
pub const TRANSVERSE_FLOW_START: f64 = 5.0 * KTS_TO_MPC;
pub const TRANSVERSE_FLOW_END: f64 = 25.0 * KTS_TO_MPC;

/// Airspeed at which effective translational lift is fully established
/// (m/cycle, ~24 kt).
pub const ETL_SPEED: f64 = 24.0 * KTS_TO_MPC;
