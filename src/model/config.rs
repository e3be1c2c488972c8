//! Vehicle parameter configuration.
//!
//! A [`ModelConfig`] is the host-facing description of a vehicle in
//! plain physical units, loadable from YAML or built from a programmed
//! preset, and convertible into a fully defined [`Model`].

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::{Attitude, GearType, Model, ModelPatch, SpeedLimits, VehicleClass};
use crate::utils::errors::ConfigError;
use crate::utils::math::degrees_to_radians;

/// Source for a vehicle configuration: a built-in preset or a YAML file.
#[derive(Debug, Clone)]
pub enum ModelSource {
    Programmed(ModelKind),
    File(PathBuf),
}

/// Built-in vehicle presets.
#[derive(Debug, Clone, Deserialize, Serialize, Hash, PartialEq, Eq)]
pub enum ModelKind {
    /// A medium twin-engine rescue helicopter.
    RescueHelicopter,
    /// A twin-turboprop coastal patrol airplane.
    PatrolAirplane,
    /// An inertialess camera for scene repositioning.
    SlewCamera,
    Custom(String),
}

/// Fuselage and lifting-surface dimensions, meters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeometryConfig {
    pub length: f64,
    pub wingspan: f64,
    /// Undercarriage to center height.
    pub belly_height: f64,
    #[serde(default)]
    pub rotor_diameter: Option<f64>,
}

/// Landing gear parameters. Speeds are m/cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GearConfig {
    pub gear_type: GearType,
    pub height: f64,
    pub brake_coeff: f64,
    pub turn_velocity_optimal: f64,
    pub turn_velocity_max: f64,
    pub turn_rate: f64,
}

/// Attitude change and leveling rates, degrees per cycle in the config
/// file for readability; converted to radians on build.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateConfig {
    pub change_heading: f64,
    pub change_pitch: f64,
    pub change_bank: f64,
    pub level_heading: f64,
    pub level_pitch: f64,
    pub level_bank: f64,
}

/// Full vehicle description in natural units.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub name: String,
    pub class: VehicleClass,
    /// kg.
    pub mass: f64,
    /// kg * m / cycle^2.
    pub engine_power: f64,
    #[serde(default)]
    pub afterburner_power_coeff: Option<f64>,
    /// m/cycle.
    pub speed_stall: f64,
    pub speeds: SpeedLimits,
    /// Minimum drag coefficient fed to the quadratic drag model.
    pub drag_min: f64,
    /// Per-axis thrust response divisors; higher is more sluggish.
    pub accel_responsiveness: [f64; 3],
    /// Meters.
    pub service_ceiling: f64,
    pub geometry: GeometryConfig,
    pub gear: GearConfig,
    pub rates: RateConfig,
    /// m/cycle of vertical velocity tolerated at touch down.
    pub touch_down_crash_resistance: f64,
    /// m/cycle of impact velocity tolerated in a collision.
    pub collision_crash_resistance: f64,
    #[serde(default)]
    pub air_brakes_area: Option<f64>,
    #[serde(default)]
    pub single_main_rotor: Option<bool>,
}

impl ModelConfig {
    pub fn new(source: ModelSource) -> Result<Self, ConfigError> {
        match source {
            ModelSource::Programmed(kind) => Ok(Self::from_programmed(kind)),
            ModelSource::File(path) => Self::from_file(path),
        }
    }

    /// Load a configuration from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    fn from_programmed(kind: ModelKind) -> Self {
        match kind {
            ModelKind::RescueHelicopter | ModelKind::Custom(_) => Self::rescue_helicopter(),
            ModelKind::PatrolAirplane => Self::patrol_airplane(),
            ModelKind::SlewCamera => Self::slew_camera(),
        }
    }

    pub fn rescue_helicopter() -> Self {
        Self {
            name: "RescueHelicopter".to_string(),
            class: VehicleClass::RotaryWing,
            mass: 9200.0,
            engine_power: 120_000.0,
            afterburner_power_coeff: None,
            speed_stall: 0.0,
            speeds: SpeedLimits {
                max: 72.0,
                expected: 80.0,
                overspeed: 88.0,
            },
            drag_min: 0.30,
            // The vertical divisor sets the hover convergence scale;
            // the ground-plane pair tames cyclic translation.
            accel_responsiveness: [1500.0, 1400.0, 3500.0],
            service_ceiling: 5500.0,
            geometry: GeometryConfig {
                length: 19.8,
                wingspan: 4.4,
                belly_height: 1.5,
                rotor_diameter: Some(16.4),
            },
            gear: GearConfig {
                gear_type: GearType::Wheels,
                height: 0.8,
                brake_coeff: 0.6,
                turn_velocity_optimal: 5.0,
                turn_velocity_max: 20.0,
                turn_rate: 0.2,
            },
            rates: RateConfig {
                change_heading: 45.0,
                change_pitch: 40.0,
                change_bank: 40.0,
                level_heading: 0.0,
                level_pitch: 25.0,
                level_bank: 25.0,
            },
            touch_down_crash_resistance: 4.0,
            collision_crash_resistance: 2.0,
            air_brakes_area: None,
            single_main_rotor: Some(true),
        }
    }

    pub fn patrol_airplane() -> Self {
        Self {
            name: "PatrolAirplane".to_string(),
            class: VehicleClass::FixedWing,
            mass: 5700.0,
            engine_power: 62_000.0,
            afterburner_power_coeff: None,
            speed_stall: 28.0,
            speeds: SpeedLimits {
                max: 95.0,
                expected: 105.0,
                overspeed: 118.0,
            },
            drag_min: 0.8,
            // Forward thrust balances quadratic drag near the maximum
            // speed; the small vertical divisor keeps the stall sink
            // rate meaningful.
            accel_responsiveness: [3000.0, 5500.0, 4.0],
            service_ceiling: 7600.0,
            geometry: GeometryConfig {
                length: 15.8,
                wingspan: 19.8,
                belly_height: 1.6,
                rotor_diameter: None,
            },
            gear: GearConfig {
                gear_type: GearType::Wheels,
                height: 1.1,
                brake_coeff: 0.8,
                turn_velocity_optimal: 8.0,
                turn_velocity_max: 30.0,
                turn_rate: 0.2,
            },
            rates: RateConfig {
                change_heading: 20.0,
                change_pitch: 35.0,
                change_bank: 60.0,
                level_heading: 0.0,
                level_pitch: 10.0,
                level_bank: 12.0,
            },
            touch_down_crash_resistance: 3.0,
            collision_crash_resistance: 2.0,
            air_brakes_area: Some(2.5),
            single_main_rotor: None,
        }
    }

    pub fn slew_camera() -> Self {
        Self {
            name: "SlewCamera".to_string(),
            class: VehicleClass::Slew,
            mass: 0.0,
            engine_power: 0.0,
            afterburner_power_coeff: None,
            speed_stall: 0.0,
            speeds: SpeedLimits::default(),
            drag_min: 0.0,
            accel_responsiveness: [1.0, 1.0, 1.0],
            service_ceiling: 0.0,
            geometry: GeometryConfig {
                length: 0.0,
                wingspan: 0.0,
                belly_height: 0.0,
                rotor_diameter: None,
            },
            gear: GearConfig {
                gear_type: GearType::Wheels,
                height: 0.0,
                brake_coeff: 0.0,
                turn_velocity_optimal: 0.0,
                turn_velocity_max: 0.0,
                turn_rate: 0.0,
            },
            rates: RateConfig {
                change_heading: 90.0,
                change_pitch: 90.0,
                change_bank: 90.0,
                level_heading: 0.0,
                level_pitch: 0.0,
                level_bank: 0.0,
            },
            touch_down_crash_resistance: 0.0,
            collision_crash_resistance: 0.0,
            air_brakes_area: None,
            single_main_rotor: None,
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.mass < 0.0 {
            return Err(ConfigError::Validation(format!(
                "{}: mass must be non-negative",
                self.name
            )));
        }
        if self.speeds.max < self.speed_stall {
            return Err(ConfigError::Validation(format!(
                "{}: maximum speed is below stall speed",
                self.name
            )));
        }
        if self.speeds.overspeed < self.speeds.expected {
            return Err(ConfigError::Validation(format!(
                "{}: overspeed is below the expected overspeed threshold",
                self.name
            )));
        }
        Ok(())
    }

    /// The patch that defines every field this configuration covers.
    ///
    /// Kinematic state (position, attitude, velocity, airspeed, landed)
    /// is not part of a configuration; hosts set it separately when
    /// placing the vehicle in the scene.
    pub fn to_patch(&self) -> ModelPatch {
        let d2r = degrees_to_radians;
        let mut patch = ModelPatch::new()
            .class(self.class)
            .total_mass(self.mass)
            .engine_power(self.engine_power)
            .speed_stall(self.speed_stall)
            .speed_limits(self.speeds)
            .drag_min(self.drag_min)
            .accel_responsiveness(Vector3::new(
                self.accel_responsiveness[0],
                self.accel_responsiveness[1],
                self.accel_responsiveness[2],
            ))
            .service_ceiling(self.service_ceiling)
            .length(self.geometry.length)
            .wingspan(self.geometry.wingspan)
            .belly_height(self.geometry.belly_height)
            .gear_type(self.gear.gear_type)
            .gear_height(self.gear.height)
            .gear_brakes(false, self.gear.brake_coeff)
            .gear_turn_velocity_optimal(self.gear.turn_velocity_optimal)
            .gear_turn_velocity_max(self.gear.turn_velocity_max)
            .gear_turn_rate(self.gear.turn_rate)
            .attitude_change_rate(Attitude::new(
                d2r(self.rates.change_heading),
                d2r(self.rates.change_pitch),
                d2r(self.rates.change_bank),
            ))
            .attitude_leveling_rate(Attitude::new(
                d2r(self.rates.level_heading),
                d2r(self.rates.level_pitch),
                d2r(self.rates.level_bank),
            ))
            .touch_down_crash_resistance(self.touch_down_crash_resistance)
            .collision_crash_resistance(self.collision_crash_resistance);

        if let Some(coeff) = self.afterburner_power_coeff {
            patch = patch.afterburner_power_coeff(coeff).afterburner_on(false);
        }
        if let Some(area) = self.air_brakes_area {
            patch = patch.air_brakes_area(area).air_brakes_on(false);
        }
        if let Some(diameter) = self.geometry.rotor_diameter {
            patch = patch.rotor_diameter(diameter);
        }
        if let Some(single) = self.single_main_rotor {
            patch = patch.single_main_rotor(single);
        }
        patch
    }

    /// Build a model with this configuration applied.
    pub fn build(&self) -> Model {
        Model::from_patch(&self.to_patch())
    }
}
