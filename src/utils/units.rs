//! Scalar unit conversions.
//!
//! Speeds inside the engine are meters per cycle; one cycle is one
//! second of simulated time, so m/cycle and m/s coincide numerically.
//! Each conversion below has a single canonical constant so that the
//! forward and reverse forms are exact inverses.

/// Feet in one meter.
pub const FEET_PER_METER: f64 = 3.280833;

/// Statute miles in one meter.
pub const MILES_PER_METER: f64 = 0.00062137;

/// Meters per cycle in one statute mile per hour.
pub const MPH_TO_MPC: f64 = 1609.347 / 3600.0;

/// Statute miles per hour in one nautical mile per hour.
pub const MPH_PER_KNOT: f64 = 1.15151515;

/// Meters per cycle in one knot.
pub const KTS_TO_MPC: f64 = MPH_PER_KNOT * MPH_TO_MPC;

/// Kilograms in one pound (avoirdupois).
pub const KG_PER_LB: f64 = 0.453592;

#[inline]
pub fn meters_to_feet(m: f64) -> f64 {
    m * FEET_PER_METER
}

#[inline]
pub fn feet_to_meters(feet: f64) -> f64 {
    feet / FEET_PER_METER
}

#[inline]
pub fn meters_to_miles(m: f64) -> f64 {
    m * MILES_PER_METER
}

#[inline]
pub fn miles_to_meters(miles: f64) -> f64 {
    miles / MILES_PER_METER
}

/// Statute miles per hour to meters per cycle.
#[inline]
pub fn mph_to_mpc(mph: f64) -> f64 {
    mph * MPH_TO_MPC
}

/// Meters per cycle to statute miles per hour.
#[inline]
pub fn mpc_to_mph(mpc: f64) -> f64 {
    mpc / MPH_TO_MPC
}

/// Knots to meters per cycle.
#[inline]
pub fn kts_to_mpc(kts: f64) -> f64 {
    kts * KTS_TO_MPC
}

#[inline]
pub fn mph_to_kts(mph: f64) -> f64 {
    mph / MPH_PER_KNOT
}

#[inline]
pub fn kts_to_mph(kts: f64) -> f64 {
    kts * MPH_PER_KNOT
}

/// Meters per cycle to feet per second.
#[inline]
pub fn mpc_to_fps(mpc: f64) -> f64 {
    mpc * FEET_PER_METER
}

/// Meters per cycle to kilometers per hour.
#[inline]
pub fn mpc_to_kph(mpc: f64) -> f64 {
    mpc * 3.6
}

#[inline]
pub fn lbs_to_kg(lbs: f64) -> f64 {
    lbs * KG_PER_LB
}

#[inline]
pub fn kg_to_lbs(kg: f64) -> f64 {
    kg / KG_PER_LB
}
