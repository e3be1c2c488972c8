//! Per-vehicle flight dynamics state.
//!
//! A [`Model`] is one simulated vehicle: kinematics, propulsion,
//! landing gear, structural geometry and pilot control inputs. Fields
//! are populated incrementally through [`ModelPatch`]es; a capability
//! mask records which fields currently hold meaningful values, and the
//! force stages skip any computation whose inputs are undefined.

mod config;
mod patch;

pub use config::{GearConfig, GeometryConfig, ModelConfig, ModelKind, ModelSource, RateConfig};
pub use patch::{FieldMask, ModelPatch, SpeedLimits};

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::utils::math::sanitize_radians;

/// Which flight model drives a vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VehicleClass {
    /// Fixed-wing airplane: thrust along the nose, lift tied to speed.
    FixedWing,
    /// Rotary-wing helicopter: thrust opposes weight, attitude vectors it.
    RotaryWing,
    /// Inertialess free movement for direct repositioning.
    Slew,
}

/// Landing gear contact type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GearType {
    Wheels,
    Skis,
    Floats,
}

/// What kind of surface the vehicle is resting on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GroundContact {
    LandUnpaved,
    LandPaved,
    WaterCalm,
    WaterRough,
}

/// Contact shape used by hosts for pairwise crash queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CrashShape {
    Spherical,
    Cylindrical,
}

/// Heading/pitch/bank triple, radians in [0, 2*PI).
///
/// Also reused for per-axis attitude rates, where the fields are
/// radians per cycle instead of absolute angles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Attitude {
    pub heading: f64,
    pub pitch: f64,
    pub bank: f64,
}

impl Attitude {
    pub fn new(heading: f64, pitch: f64, bank: f64) -> Self {
        Self {
            heading,
            pitch,
            bank,
        }
    }

    /// Sanitize all three angles into [0, 2*PI).
    pub fn sanitized(self) -> Self {
        Self {
            heading: sanitize_radians(self.heading),
            pitch: sanitize_radians(self.pitch),
            bank: sanitize_radians(self.bank),
        }
    }

    /// Unit vector of heading and pitch (bank does not contribute).
    pub fn unit_vector(self) -> Vector3<f64> {
        Vector3::new(self.heading.sin(), self.heading.cos(), -self.pitch.sin())
    }
}

/// One simulated vehicle's physical state.
///
/// Positions are meters in the world frame with z up; velocity and
/// airspeed are meters per cycle in the vehicle frame (x lateral,
/// y longitudinal, z vertical); angles are radians.
#[derive(Debug, Clone)]
pub struct Model {
    pub(crate) defined: FieldMask,

    pub(crate) class: VehicleClass,
    pub(crate) position: Vector3<f64>,
    pub(crate) attitude: Attitude,
    pub(crate) velocity: Vector3<f64>,
    pub(crate) airspeed: Vector3<f64>,

    pub(crate) speed_stall: f64,
    pub(crate) stall_coeff: f64,
    pub(crate) drag_min: f64,
    pub(crate) speed_max: f64,
    pub(crate) overspeed_expected: f64,
    pub(crate) overspeed: f64,
    pub(crate) accel_responsiveness: Vector3<f64>,

    pub(crate) ground_elevation: f64,
    pub(crate) service_ceiling: f64,
    pub(crate) length: f64,
    pub(crate) wingspan: f64,
    pub(crate) belly_height: f64,
    pub(crate) rotor_diameter: f64,
    pub(crate) single_main_rotor: bool,

    pub(crate) gear_down: bool,
    pub(crate) gear_type: GearType,
    pub(crate) gear_height: f64,
    pub(crate) gear_brakes_on: bool,
    pub(crate) gear_brakes_coeff: f64,
    pub(crate) gear_turn_velocity_optimal: f64,
    pub(crate) gear_turn_velocity_max: f64,
    pub(crate) gear_turn_rate: f64,

    pub(crate) landed: bool,
    pub(crate) stopped: bool,
    pub(crate) ground_contact: GroundContact,
    /// Center of the vehicle to touchable ground, maintained by the
    /// natural force stage.
    pub(crate) center_to_ground_height: f64,

    pub(crate) heading_control: f64,
    pub(crate) pitch_control: f64,
    pub(crate) bank_control: f64,
    pub(crate) elevator_trim: f64,
    pub(crate) throttle: f64,

    pub(crate) afterburner_on: bool,
    pub(crate) afterburner_power_coeff: f64,
    pub(crate) engine_power: f64,
    pub(crate) total_mass: f64,

    pub(crate) attitude_change_rate: Attitude,
    pub(crate) attitude_leveling_rate: Attitude,

    pub(crate) air_brakes_on: bool,
    pub(crate) air_brakes_area: f64,

    pub(crate) can_crash_into_other: bool,
    pub(crate) can_cause_crash: bool,
    pub(crate) crash_contact_shape: CrashShape,
    pub(crate) crashable_radius: f64,
    pub(crate) crashable_z_min: f64,
    pub(crate) crashable_z_max: f64,
    pub(crate) touch_down_crash_resistance: f64,
    pub(crate) collision_crash_resistance: f64,

    /// Accumulated main-rotor torque reaction, radians per cycle.
    pub(crate) torque_velocity: f64,
}

impl Default for Model {
    fn default() -> Self {
        Self::new()
    }
}

impl Model {
    /// A model with no fields defined. Populate it with
    /// [`Model::apply`] or register it and use
    /// [`Realm::change_values`](crate::Realm::change_values).
    pub fn new() -> Self {
        Self {
            defined: FieldMask::empty(),
            class: VehicleClass::FixedWing,
            position: Vector3::zeros(),
            attitude: Attitude::default(),
            velocity: Vector3::zeros(),
            airspeed: Vector3::zeros(),
            speed_stall: 0.0,
            stall_coeff: 0.0,
            drag_min: 0.0,
            speed_max: 0.0,
            overspeed_expected: 0.0,
            overspeed: 0.0,
            accel_responsiveness: Vector3::zeros(),
            ground_elevation: 0.0,
            service_ceiling: 0.0,
            length: 0.0,
            wingspan: 0.0,
            belly_height: 0.0,
            rotor_diameter: 0.0,
            single_main_rotor: false,
            gear_down: false,
            gear_type: GearType::Wheels,
            gear_height: 0.0,
            gear_brakes_on: false,
            gear_brakes_coeff: 0.0,
            gear_turn_velocity_optimal: 0.0,
            gear_turn_velocity_max: 0.0,
            gear_turn_rate: 0.0,
            landed: false,
            stopped: false,
            ground_contact: GroundContact::LandUnpaved,
            center_to_ground_height: 0.0,
            heading_control: 0.0,
            pitch_control: 0.0,
            bank_control: 0.0,
            elevator_trim: 0.0,
            throttle: 0.0,
            afterburner_on: false,
            afterburner_power_coeff: 0.0,
            engine_power: 0.0,
            total_mass: 0.0,
            attitude_change_rate: Attitude::default(),
            attitude_leveling_rate: Attitude::default(),
            air_brakes_on: false,
            air_brakes_area: 0.0,
            can_crash_into_other: false,
            can_cause_crash: false,
            crash_contact_shape: CrashShape::Spherical,
            crashable_radius: 0.0,
            crashable_z_min: 0.0,
            crashable_z_max: 0.0,
            touch_down_crash_resistance: 0.0,
            collision_crash_resistance: 0.0,
            torque_velocity: 0.0,
        }
    }

    /// Build a model directly from a patch, outside any realm.
    pub fn from_patch(patch: &ModelPatch) -> Self {
        let mut model = Self::new();
        model.apply(patch);
        model
    }

    /// Apply a partial update. Only fields carried by the patch change;
    /// their capability bits are OR-ed into the defined mask.
    pub fn apply(&mut self, patch: &ModelPatch) {
        patch.apply_to(self);
    }

    /// Clear capability bits. The underlying storage is left as-is and
    /// becomes meaningless until the field is assigned again.
    pub fn undefine(&mut self, mask: FieldMask) {
        self.defined.remove(mask);
    }

    /// True when every bit of `mask` is currently defined.
    #[inline]
    pub fn defines(&self, mask: FieldMask) -> bool {
        self.defined.contains(mask)
    }

    /// The current capability mask.
    #[inline]
    pub fn defined(&self) -> FieldMask {
        self.defined
    }

    pub fn class(&self) -> VehicleClass {
        self.class
    }

    pub fn position(&self) -> Vector3<f64> {
        self.position
    }

    pub fn attitude(&self) -> Attitude {
        self.attitude
    }

    /// Unit vector of heading and pitch, derived from the attitude.
    pub fn heading_vector(&self) -> Vector3<f64> {
        self.attitude.unit_vector()
    }

    /// Velocity in the vehicle frame, m/cycle.
    pub fn velocity(&self) -> Vector3<f64> {
        self.velocity
    }

    /// Velocity relative to the local wind, m/cycle.
    pub fn airspeed(&self) -> Vector3<f64> {
        self.airspeed
    }

    pub fn speed_stall(&self) -> f64 {
        self.speed_stall
    }

    /// Current lift-loss coefficient, 0 = flying, 1 = full stall.
    pub fn stall_coeff(&self) -> f64 {
        self.stall_coeff
    }

    pub fn speed_max(&self) -> f64 {
        self.speed_max
    }

    pub fn overspeed_expected(&self) -> f64 {
        self.overspeed_expected
    }

    pub fn overspeed(&self) -> f64 {
        self.overspeed
    }

    pub fn ground_elevation(&self) -> f64 {
        self.ground_elevation
    }

    pub fn service_ceiling(&self) -> f64 {
        self.service_ceiling
    }

    pub fn gear_down(&self) -> bool {
        self.gear_down
    }

    pub fn gear_type(&self) -> GearType {
        self.gear_type
    }

    pub fn gear_height(&self) -> f64 {
        self.gear_height
    }

    pub fn landed(&self) -> bool {
        self.landed
    }

    /// Only meaningful while landed.
    pub fn stopped(&self) -> bool {
        self.stopped
    }

    pub fn ground_contact(&self) -> GroundContact {
        self.ground_contact
    }

    pub fn throttle(&self) -> f64 {
        self.throttle
    }

    pub fn heading_control(&self) -> f64 {
        self.heading_control
    }

    pub fn pitch_control(&self) -> f64 {
        self.pitch_control
    }

    pub fn bank_control(&self) -> f64 {
        self.bank_control
    }

    pub fn elevator_trim(&self) -> f64 {
        self.elevator_trim
    }

    pub fn total_mass(&self) -> f64 {
        self.total_mass
    }

    pub fn engine_power(&self) -> f64 {
        self.engine_power
    }

    pub fn touch_down_crash_resistance(&self) -> f64 {
        self.touch_down_crash_resistance
    }

    pub fn collision_crash_resistance(&self) -> f64 {
        self.collision_crash_resistance
    }

    pub fn gear_turn_rate(&self) -> f64 {
        self.gear_turn_rate
    }

    /// Ground elevation minus position, maintained by the force
    /// stages.
    pub fn center_to_ground_height(&self) -> f64 {
        self.center_to_ground_height
    }

    // Crash geometry, read by hosts running their own pairwise
    // contact queries.

    pub fn can_crash_into_other(&self) -> bool {
        self.can_crash_into_other
    }

    pub fn can_cause_crash(&self) -> bool {
        self.can_cause_crash
    }

    pub fn crash_contact_shape(&self) -> CrashShape {
        self.crash_contact_shape
    }

    pub fn crashable_radius(&self) -> f64 {
        self.crashable_radius
    }

    pub fn crashable_z_min(&self) -> f64 {
        self.crashable_z_min
    }

    pub fn crashable_z_max(&self) -> f64 {
        self.crashable_z_max
    }

    /// Height from the vehicle's center down to its resting point: the
    /// belly, plus the gear when it is down.
    pub(crate) fn center_to_gear_height(&self) -> f64 {
        self.belly_height + if self.gear_down { self.gear_height } else { 0.0 }
    }
}
