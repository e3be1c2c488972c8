//! Shared environment: gravity, wind and the atmosphere column.

use bitflags::bitflags;
use nalgebra::Vector3;
use std::f64::consts::PI;

use crate::utils::constants::{
    DEFAULT_GRAVITY, ISA_DRY_AIR_MOLAR_MASS, ISA_GAS_CONSTANT, ISA_SEA_LEVEL_PRESSURE,
    ISA_SEA_LEVEL_TEMP, ISA_TEMP_LAPSE_RATE,
};
use crate::utils::math::hypot2;

bitflags! {
    /// Wind behavior modifiers.
    pub struct WindFlags: u32 {
        /// Superimpose deterministic gusts on the base wind.
        const GUSTS = 1 << 0;
    }
}

/// Wind state: a host-set base vector plus the per-cycle computed
/// vector actually applied to vehicles.
#[derive(Debug, Clone)]
pub struct Wind {
    enabled: bool,
    base: Vector3<f64>,
    flags: WindFlags,
    current: Vector3<f64>,
}

impl Default for Wind {
    fn default() -> Self {
        Self {
            enabled: false,
            base: Vector3::zeros(),
            flags: WindFlags::empty(),
            current: Vector3::zeros(),
        }
    }
}

impl Wind {
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.current = Vector3::zeros();
        }
    }

    pub fn base(&self) -> Vector3<f64> {
        self.base
    }

    /// Set the base wind, m/cycle in world coordinates.
    pub fn set_base(&mut self, base: Vector3<f64>) {
        self.base = base;
        if self.enabled {
            self.current = base;
        }
    }

    pub fn flags(&self) -> WindFlags {
        self.flags
    }

    pub fn set_flags(&mut self, flags: WindFlags) {
        self.flags = flags;
    }

    /// The wind vector in effect this cycle.
    pub fn current(&self) -> Vector3<f64> {
        self.current
    }

    /// Recompute the effective wind for the given accumulated simulated
    /// time.
    ///
    /// Gusts follow a fixed trigonometric profile with a period of
    /// roughly sixty seconds, adding up to ~15 kt and removing up to
    /// ~5 kt from the base wind. Being a pure function of elapsed time
    /// they are deterministic per input.
    pub(crate) fn refresh(&mut self, elapsed_seconds: f64) {
        if !self.enabled {
            self.current = Vector3::zeros();
            return;
        }

        if self.flags.contains(WindFlags::GUSTS) {
            let total_base = hypot2(self.base.x, self.base.y);
            if total_base > 0.0 {
                let t = elapsed_seconds;
                let gusts_value = total_base
                    + 5.0
                    + 6.0 * ((PI / 6.0 * t).cos() + (PI / 10.0 * t).sin() - (PI / 10.0 * t).cos());
                let gusts_coeff = gusts_value / total_base;
                self.current.x = self.base.x * gusts_coeff;
                self.current.y = self.base.y * gusts_coeff;
                self.current.z = self.base.z;
                return;
            }
        }

        self.current = self.base;
    }
}

/// The simulation constants and wind shared by every vehicle in a
/// realm.
#[derive(Debug, Clone)]
pub struct Environment {
    gravity: f64,
    pub wind: Wind,
}

impl Default for Environment {
    fn default() -> Self {
        Self {
            gravity: DEFAULT_GRAVITY,
            wind: Wind::default(),
        }
    }
}

impl Environment {
    /// Gravity magnitude, m/cycle^2.
    pub fn gravity(&self) -> f64 {
        self.gravity
    }

    pub fn set_gravity(&mut self, gravity: f64) {
        self.gravity = gravity.max(0.0);
    }
}

/// Air density at the given altitude above mean sea level, kg/m^3,
/// from the standard barometric formula.
pub fn air_density(altitude_m: f64) -> f64 {
    // rho = (P0 M / R T0) * (1 - L h / T0)^(g M / (R L) - 1)
    let p0m_div_rt0 =
        ISA_SEA_LEVEL_PRESSURE * ISA_DRY_AIR_MOLAR_MASS / (ISA_GAS_CONSTANT * ISA_SEA_LEVEL_TEMP);
    let gm_div_rl = DEFAULT_GRAVITY * ISA_DRY_AIR_MOLAR_MASS
        / (ISA_GAS_CONSTANT * ISA_TEMP_LAPSE_RATE);
    let l_div_t0 = ISA_TEMP_LAPSE_RATE / ISA_SEA_LEVEL_TEMP;

    let base = 1.0 - l_div_t0 * altitude_m;
    if base > 0.0 {
        p0m_div_rt0 * base.powf(gm_div_rl - 1.0)
    } else {
        0.0
    }
}
