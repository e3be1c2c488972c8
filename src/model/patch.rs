//! Partial updates to a [`Model`] and the capability mask tracking
//! which fields are defined.

use bitflags::bitflags;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use super::{Attitude, CrashShape, GearType, GroundContact, Model, VehicleClass};

bitflags! {
    /// One bit per host-settable field group of a [`Model`].
    ///
    /// A force stage treats an unset field as "not applicable" and
    /// skips any computation that depends on it.
    pub struct FieldMask: u64 {
        const CLASS                      = 1 << 0;
        const POSITION                   = 1 << 1;
        const ATTITUDE                   = 1 << 2;
        const VELOCITY                   = 1 << 3;
        const AIRSPEED                   = 1 << 4;
        const SPEED_STALL                = 1 << 5;
        const DRAG_MIN                   = 1 << 6;
        /// Covers maximum speed and both overspeed thresholds.
        const SPEED_MAX                  = 1 << 7;
        const ACCEL_RESPONSIVENESS       = 1 << 8;
        const GROUND_ELEVATION           = 1 << 9;
        const SERVICE_CEILING            = 1 << 10;
        const BELLY_HEIGHT               = 1 << 11;
        const GEAR_STATE                 = 1 << 12;
        const GEAR_TYPE                  = 1 << 13;
        const GEAR_HEIGHT                = 1 << 14;
        const GEAR_BRAKES                = 1 << 15;
        const GEAR_TURN_VELOCITY_OPTIMAL = 1 << 16;
        const GEAR_TURN_VELOCITY_MAX     = 1 << 17;
        const GEAR_TURN_RATE             = 1 << 18;
        const LANDED                     = 1 << 19;
        const GROUND_CONTACT             = 1 << 20;
        const HEADING_CONTROL            = 1 << 21;
        const BANK_CONTROL               = 1 << 22;
        /// Covers the pitch control coefficient and elevator trim.
        const PITCH_CONTROL              = 1 << 23;
        const THROTTLE                   = 1 << 24;
        const AFTERBURNER_STATE          = 1 << 25;
        const AFTERBURNER_POWER          = 1 << 26;
        const ENGINE_POWER               = 1 << 27;
        const TOTAL_MASS                 = 1 << 28;
        const ATTITUDE_CHANGE_RATE       = 1 << 29;
        const ATTITUDE_LEVELING_RATE     = 1 << 30;
        const AIR_BRAKES_STATE           = 1 << 31;
        const AIR_BRAKES_AREA            = 1 << 32;
        const CAN_CRASH_INTO_OTHER       = 1 << 33;
        const CAN_CAUSE_CRASH            = 1 << 34;
        const CRASH_CONTACT_SHAPE        = 1 << 35;
        const CRASHABLE_RADIUS           = 1 << 36;
        const CRASHABLE_Z_MIN            = 1 << 37;
        const CRASHABLE_Z_MAX            = 1 << 38;
        const TOUCH_DOWN_RESISTANCE      = 1 << 39;
        const COLLISION_RESISTANCE       = 1 << 40;
        const STOPPED                    = 1 << 41;
        const LENGTH                     = 1 << 42;
        const WINGSPAN                   = 1 << 43;
        const ROTOR_DIAMETER             = 1 << 44;
        const SINGLE_MAIN_ROTOR          = 1 << 45;
    }
}

/// Maximum speed plus the two overspeed thresholds, all m/cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SpeedLimits {
    /// Maximum expected level-flight speed.
    pub max: f64,
    /// Speed above which the overspeed callback starts firing.
    pub expected: f64,
    /// Speed at which structural damage is assumed.
    pub overspeed: f64,
}

/// A partial update to a [`Model`].
///
/// Every field is optional; applying the patch writes only the fields
/// that are present, clipping control coefficients and non-negative
/// magnitudes as it goes, then ORs the implied bits into the model's
/// capability mask.
#[derive(Debug, Clone, Default)]
pub struct ModelPatch {
    class: Option<VehicleClass>,
    position: Option<Vector3<f64>>,
    attitude: Option<Attitude>,
    velocity: Option<Vector3<f64>>,
    airspeed: Option<Vector3<f64>>,
    speed_stall: Option<f64>,
    drag_min: Option<f64>,
    speed_limits: Option<SpeedLimits>,
    accel_responsiveness: Option<Vector3<f64>>,
    ground_elevation: Option<f64>,
    service_ceiling: Option<f64>,
    belly_height: Option<f64>,
    length: Option<f64>,
    wingspan: Option<f64>,
    rotor_diameter: Option<f64>,
    single_main_rotor: Option<bool>,
    gear_down: Option<bool>,
    gear_type: Option<GearType>,
    gear_height: Option<f64>,
    gear_brakes: Option<(bool, f64)>,
    gear_turn_velocity_optimal: Option<f64>,
    gear_turn_velocity_max: Option<f64>,
    gear_turn_rate: Option<f64>,
    landed: Option<bool>,
    stopped: Option<bool>,
    ground_contact: Option<GroundContact>,
    heading_control: Option<f64>,
    pitch_control: Option<f64>,
    bank_control: Option<f64>,
    elevator_trim: Option<f64>,
    throttle: Option<f64>,
    afterburner_on: Option<bool>,
    afterburner_power_coeff: Option<f64>,
    engine_power: Option<f64>,
    total_mass: Option<f64>,
    attitude_change_rate: Option<Attitude>,
    attitude_leveling_rate: Option<Attitude>,
    air_brakes_on: Option<bool>,
    air_brakes_area: Option<f64>,
    can_crash_into_other: Option<bool>,
    can_cause_crash: Option<bool>,
    crash_contact_shape: Option<CrashShape>,
    crashable_radius: Option<f64>,
    crashable_z_min: Option<f64>,
    crashable_z_max: Option<f64>,
    touch_down_crash_resistance: Option<f64>,
    collision_crash_resistance: Option<f64>,
}

macro_rules! setter {
    ($(#[$doc:meta])* $name:ident: $ty:ty) => {
        $(#[$doc])*
        pub fn $name(mut self, value: $ty) -> Self {
            self.$name = Some(value);
            self
        }
    };
}

impl ModelPatch {
    pub fn new() -> Self {
        Self::default()
    }

    setter!(class: VehicleClass);
    setter!(
        /// World position in meters, z up.
        position: Vector3<f64>
    );
    setter!(velocity: Vector3<f64>);
    setter!(airspeed: Vector3<f64>);
    setter!(speed_stall: f64);
    setter!(drag_min: f64);
    setter!(speed_limits: SpeedLimits);
    setter!(accel_responsiveness: Vector3<f64>);
    setter!(ground_elevation: f64);
    setter!(service_ceiling: f64);
    setter!(belly_height: f64);
    setter!(length: f64);
    setter!(wingspan: f64);
    setter!(rotor_diameter: f64);
    setter!(single_main_rotor: bool);
    setter!(gear_down: bool);
    setter!(gear_type: GearType);
    setter!(gear_height: f64);
    setter!(gear_turn_velocity_optimal: f64);
    setter!(gear_turn_velocity_max: f64);
    setter!(gear_turn_rate: f64);
    setter!(landed: bool);
    setter!(stopped: bool);
    setter!(ground_contact: GroundContact);
    setter!(
        /// Clipped to [-1, 1] on apply.
        heading_control: f64
    );
    setter!(
        /// Clipped to [-1, 1] on apply.
        pitch_control: f64
    );
    setter!(
        /// Clipped to [-1, 1] on apply.
        bank_control: f64
    );
    setter!(
        /// Clipped to [-1, 1] on apply.
        elevator_trim: f64
    );
    setter!(
        /// Clipped to [0, 1] on apply.
        throttle: f64
    );
    setter!(afterburner_on: bool);
    setter!(afterburner_power_coeff: f64);
    setter!(engine_power: f64);
    setter!(total_mass: f64);
    setter!(attitude_change_rate: Attitude);
    setter!(attitude_leveling_rate: Attitude);
    setter!(air_brakes_on: bool);
    setter!(air_brakes_area: f64);
    setter!(can_crash_into_other: bool);
    setter!(can_cause_crash: bool);
    setter!(crash_contact_shape: CrashShape);
    setter!(crashable_radius: f64);
    setter!(crashable_z_min: f64);
    setter!(crashable_z_max: f64);
    setter!(touch_down_crash_resistance: f64);
    setter!(collision_crash_resistance: f64);

    /// Attitude is sanitized into [0, 2*PI) on apply.
    pub fn attitude(mut self, attitude: Attitude) -> Self {
        self.attitude = Some(attitude);
        self
    }

    /// Wheel brake engagement and braking strength coefficient.
    pub fn gear_brakes(mut self, on: bool, coeff: f64) -> Self {
        self.gear_brakes = Some((on, coeff));
        self
    }

    /// The set of capability bits this patch will define.
    pub fn mask(&self) -> FieldMask {
        let mut mask = FieldMask::empty();
        macro_rules! bit {
            ($field:ident, $flag:ident) => {
                if self.$field.is_some() {
                    mask |= FieldMask::$flag;
                }
            };
        }
        bit!(class, CLASS);
        bit!(position, POSITION);
        bit!(attitude, ATTITUDE);
        bit!(velocity, VELOCITY);
        bit!(airspeed, AIRSPEED);
        bit!(speed_stall, SPEED_STALL);
        bit!(drag_min, DRAG_MIN);
        bit!(speed_limits, SPEED_MAX);
        bit!(accel_responsiveness, ACCEL_RESPONSIVENESS);
        bit!(ground_elevation, GROUND_ELEVATION);
        bit!(service_ceiling, SERVICE_CEILING);
        bit!(belly_height, BELLY_HEIGHT);
        bit!(length, LENGTH);
        bit!(wingspan, WINGSPAN);
        bit!(rotor_diameter, ROTOR_DIAMETER);
        bit!(single_main_rotor, SINGLE_MAIN_ROTOR);
        bit!(gear_down, GEAR_STATE);
        bit!(gear_type, GEAR_TYPE);
        bit!(gear_height, GEAR_HEIGHT);
        bit!(gear_brakes, GEAR_BRAKES);
        bit!(gear_turn_velocity_optimal, GEAR_TURN_VELOCITY_OPTIMAL);
        bit!(gear_turn_velocity_max, GEAR_TURN_VELOCITY_MAX);
        bit!(gear_turn_rate, GEAR_TURN_RATE);
        bit!(landed, LANDED);
        bit!(stopped, STOPPED);
        bit!(ground_contact, GROUND_CONTACT);
        bit!(heading_control, HEADING_CONTROL);
        bit!(pitch_control, PITCH_CONTROL);
        bit!(bank_control, BANK_CONTROL);
        bit!(elevator_trim, PITCH_CONTROL);
        bit!(throttle, THROTTLE);
        bit!(afterburner_on, AFTERBURNER_STATE);
        bit!(afterburner_power_coeff, AFTERBURNER_POWER);
        bit!(engine_power, ENGINE_POWER);
        bit!(total_mass, TOTAL_MASS);
        bit!(attitude_change_rate, ATTITUDE_CHANGE_RATE);
        bit!(attitude_leveling_rate, ATTITUDE_LEVELING_RATE);
        bit!(air_brakes_on, AIR_BRAKES_STATE);
        bit!(air_brakes_area, AIR_BRAKES_AREA);
        bit!(can_crash_into_other, CAN_CRASH_INTO_OTHER);
        bit!(can_cause_crash, CAN_CAUSE_CRASH);
        bit!(crash_contact_shape, CRASH_CONTACT_SHAPE);
        bit!(crashable_radius, CRASHABLE_RADIUS);
        bit!(crashable_z_min, CRASHABLE_Z_MIN);
        bit!(crashable_z_max, CRASHABLE_Z_MAX);
        bit!(touch_down_crash_resistance, TOUCH_DOWN_RESISTANCE);
        bit!(collision_crash_resistance, COLLISION_RESISTANCE);
        mask
    }

    pub(crate) fn apply_to(&self, model: &mut Model) {
        if let Some(class) = self.class {
            model.class = class;
        }
        if let Some(position) = self.position {
            model.position = position;
        }
        if let Some(attitude) = self.attitude {
            model.attitude = attitude.sanitized();
        }
        if let Some(velocity) = self.velocity {
            model.velocity = velocity;
        }
        if let Some(airspeed) = self.airspeed {
            model.airspeed = airspeed;
        }
        if let Some(speed_stall) = self.speed_stall {
            model.speed_stall = speed_stall.max(0.0);
        }
        if let Some(drag_min) = self.drag_min {
            model.drag_min = drag_min.max(0.0);
        }
        if let Some(limits) = self.speed_limits {
            model.speed_max = limits.max;
            model.overspeed_expected = limits.expected;
            model.overspeed = limits.overspeed;
        }
        if let Some(ar) = self.accel_responsiveness {
            model.accel_responsiveness = ar;
        }
        if let Some(elev) = self.ground_elevation {
            model.ground_elevation = elev;
        }
        if let Some(ceiling) = self.service_ceiling {
            model.service_ceiling = ceiling;
        }
        if let Some(belly_height) = self.belly_height {
            model.belly_height = belly_height;
        }
        if let Some(length) = self.length {
            model.length = length;
        }
        if let Some(wingspan) = self.wingspan {
            model.wingspan = wingspan;
        }
        if let Some(rotor_diameter) = self.rotor_diameter {
            model.rotor_diameter = rotor_diameter.max(0.0);
        }
        if let Some(single) = self.single_main_rotor {
            model.single_main_rotor = single;
        }
        if let Some(down) = self.gear_down {
            model.gear_down = down;
        }
        if let Some(gear_type) = self.gear_type {
            model.gear_type = gear_type;
        }
        if let Some(height) = self.gear_height {
            model.gear_height = height;
        }
        if let Some((on, coeff)) = self.gear_brakes {
            model.gear_brakes_on = on;
            model.gear_brakes_coeff = coeff;
        }
        if let Some(v) = self.gear_turn_velocity_optimal {
            model.gear_turn_velocity_optimal = v;
        }
        if let Some(v) = self.gear_turn_velocity_max {
            model.gear_turn_velocity_max = v;
        }
        if let Some(rate) = self.gear_turn_rate {
            model.gear_turn_rate = rate;
        }
        if let Some(landed) = self.landed {
            model.landed = landed;
        }
        if let Some(stopped) = self.stopped {
            model.stopped = stopped;
        }
        if let Some(contact) = self.ground_contact {
            model.ground_contact = contact;
        }
        if let Some(c) = self.heading_control {
            model.heading_control = c.clamp(-1.0, 1.0);
        }
        if let Some(c) = self.pitch_control {
            model.pitch_control = c.clamp(-1.0, 1.0);
        }
        if let Some(c) = self.bank_control {
            model.bank_control = c.clamp(-1.0, 1.0);
        }
        if let Some(c) = self.elevator_trim {
            model.elevator_trim = c.clamp(-1.0, 1.0);
        }
        if let Some(c) = self.throttle {
            model.throttle = c.clamp(0.0, 1.0);
        }
        if let Some(on) = self.afterburner_on {
            model.afterburner_on = on;
        }
        if let Some(c) = self.afterburner_power_coeff {
            model.afterburner_power_coeff = c.max(0.0);
        }
        if let Some(power) = self.engine_power {
            model.engine_power = power.max(0.0);
        }
        if let Some(mass) = self.total_mass {
            model.total_mass = mass.max(0.0);
        }
        if let Some(rate) = self.attitude_change_rate {
            model.attitude_change_rate = rate;
        }
        if let Some(rate) = self.attitude_leveling_rate {
            model.attitude_leveling_rate = rate;
        }
        if let Some(on) = self.air_brakes_on {
            model.air_brakes_on = on;
        }
        if let Some(area) = self.air_brakes_area {
            model.air_brakes_area = area.max(0.0);
        }
        if let Some(flag) = self.can_crash_into_other {
            model.can_crash_into_other = flag;
        }
        if let Some(flag) = self.can_cause_crash {
            model.can_cause_crash = flag;
        }
        if let Some(shape) = self.crash_contact_shape {
            model.crash_contact_shape = shape;
        }
        if let Some(radius) = self.crashable_radius {
            model.crashable_radius = radius;
        }
        if let Some(z) = self.crashable_z_min {
            model.crashable_z_min = z;
        }
        if let Some(z) = self.crashable_z_max {
            model.crashable_z_max = z;
        }
        if let Some(resistance) = self.touch_down_crash_resistance {
            model.touch_down_crash_resistance = resistance.max(0.0);
        }
        if let Some(resistance) = self.collision_crash_resistance {
            model.collision_crash_resistance = resistance.max(0.0);
        }

        model.defined |= self.mask();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    #[test]
    fn test_control_coefficients_are_clipped() {
        let model = Model::from_patch(
            &ModelPatch::new()
                .throttle(5.0)
                .pitch_control(-3.0)
                .bank_control(2.0)
                .heading_control(-1.5)
                .elevator_trim(9.0),
        );
        assert_relative_eq!(model.throttle(), 1.0);
        assert_relative_eq!(model.pitch_control(), -1.0);
        assert_relative_eq!(model.bank_control(), 1.0);
        assert_relative_eq!(model.heading_control(), -1.0);
        assert_relative_eq!(model.elevator_trim(), 1.0);
    }

    #[test]
    fn test_magnitudes_clamped_non_negative() {
        let model = Model::from_patch(
            &ModelPatch::new()
                .total_mass(-100.0)
                .engine_power(-5.0)
                .afterburner_power_coeff(-1.0),
        );
        assert_relative_eq!(model.total_mass(), 0.0);
        assert_relative_eq!(model.engine_power(), 0.0);
    }

    #[test]
    fn test_mask_tracks_patched_fields() {
        let patch = ModelPatch::new()
            .class(VehicleClass::RotaryWing)
            .position(Vector3::new(1.0, 2.0, 3.0))
            .throttle(0.3);
        assert_eq!(
            patch.mask(),
            FieldMask::CLASS | FieldMask::POSITION | FieldMask::THROTTLE
        );

        let model = Model::from_patch(&patch);
        assert!(model.defines(FieldMask::CLASS | FieldMask::POSITION));
        assert!(!model.defines(FieldMask::VELOCITY));
    }

    #[test]
    fn test_elevator_trim_rides_pitch_control_bit() {
        let patch = ModelPatch::new().elevator_trim(0.1);
        assert_eq!(patch.mask(), FieldMask::PITCH_CONTROL);
    }

    #[test]
    fn test_attitude_sanitized_on_apply() {
        let model = Model::from_patch(
            &ModelPatch::new().attitude(Attitude::new(-PI / 2.0, 5.0 * PI, 0.0)),
        );
        assert_relative_eq!(model.attitude().heading, 1.5 * PI);
        assert_relative_eq!(model.attitude().pitch, PI);
    }

    #[test]
    fn test_patch_only_touches_carried_fields() {
        let mut model = Model::from_patch(&ModelPatch::new().throttle(0.8));
        model.apply(&ModelPatch::new().speed_stall(20.0));
        assert_relative_eq!(model.throttle(), 0.8);
        assert_relative_eq!(model.speed_stall(), 20.0);
        assert!(model.defines(FieldMask::THROTTLE | FieldMask::SPEED_STALL));
    }
}
