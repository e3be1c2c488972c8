//! Natural force stage: aerodynamic drag, gravity-driven speed
//! exchange, stall pitch dynamics, and passive attitude leveling.
//!
//! Runs before propulsion every cycle. Slew vehicles are untouched by
//! natural forces.

use nalgebra::Vector3;
use std::f64::consts::PI;

use super::StageOutcome;
use crate::environment::air_density;
use crate::model::{FieldMask, GearType, Model, VehicleClass};
use crate::realm::{ModelId, Realm};
use crate::utils::math::{hypot2, hypot3, ortho_rotate_2d, sanitize_radians, speed_for_stall};

/// Pitch-down rate applied while losing lift, radians per cycle.
const PITCH_DROP_RATE: f64 = 0.25 * PI;
/// Pitch-up rate applied as speed builds toward overspeed.
const PITCH_RAISE_RATE: f64 = 0.075 * PI;

/// Lateral ground drag, m/cycle^2; keeps wheels from skidding sideways.
const GROUND_DRAG_LATERAL: f64 = 10.0;
/// Rolling resistance for wheels along the roll axis.
const GROUND_DRAG_ROLLING: f64 = 0.1;
/// Bank leveling rate while on the ground, radians per cycle.
const GROUND_BANK_LEVELING_RATE: f64 = 1.5;

const DRAG_REQUIRED: FieldMask = FieldMask::from_bits_truncate(
    FieldMask::TOTAL_MASS.bits()
        | FieldMask::LANDED.bits()
        | FieldMask::POSITION.bits()
        | FieldMask::ATTITUDE.bits()
        | FieldMask::VELOCITY.bits()
        | FieldMask::AIRSPEED.bits()
        | FieldMask::BELLY_HEIGHT.bits()
        | FieldMask::LENGTH.bits()
        | FieldMask::DRAG_MIN.bits(),
);

const PITCH_DYNAMICS_REQUIRED: FieldMask = FieldMask::from_bits_truncate(
    FieldMask::POSITION.bits()
        | FieldMask::ATTITUDE.bits()
        | FieldMask::VELOCITY.bits()
        | FieldMask::AIRSPEED.bits()
        | FieldMask::SPEED_STALL.bits()
        | FieldMask::SPEED_MAX.bits()
        | FieldMask::LANDED.bits(),
);

const ROTARY_REQUIRED: FieldMask = FieldMask::from_bits_truncate(
    FieldMask::POSITION.bits()
        | FieldMask::ATTITUDE.bits()
        | FieldMask::VELOCITY.bits()
        | FieldMask::AIRSPEED.bits()
        | FieldMask::SPEED_MAX.bits()
        | FieldMask::LANDED.bits(),
);

const LEVELING_REQUIRED: FieldMask = FieldMask::from_bits_truncate(
    FieldMask::ATTITUDE.bits() | FieldMask::VELOCITY.bits() | FieldMask::LANDED.bits(),
);

/// Apply one cycle of natural forces.
///
/// Fires no callbacks; the outcome is [`StageOutcome::Removed`] only
/// when the handle is already stale.
pub fn apply(realm: &mut Realm, id: ModelId) -> StageOutcome {
    let tc_min = realm.clock().compensation_min();
    let scaled = realm.clock().scaled();
    let gravity = realm.environment().gravity();
    let wind = realm.environment().wind.current();

    let Some(model) = realm.model_mut(id) else {
        return StageOutcome::Removed;
    };

    if !model.defines(FieldMask::CLASS) || model.class == VehicleClass::Slew {
        return StageOutcome::Active;
    }

    // Keep the ground clearance current before anything consumes it.
    if model.defines(FieldMask::POSITION | FieldMask::GROUND_ELEVATION) {
        model.center_to_ground_height = model.ground_elevation - model.position.z;
    } else {
        model.center_to_ground_height = 0.0;
    }

    apply_air_drag(model, wind, tc_min);

    match model.class {
        VehicleClass::FixedWing => fixed_wing_pitch_dynamics(model, gravity, tc_min, scaled),
        VehicleClass::RotaryWing => rotary_wing_leveling(model, scaled),
        VehicleClass::Slew => unreachable!(),
    }

    ground_drag_and_bank_leveling(model, tc_min, scaled);

    StageOutcome::Active
}

/// Quadratic aerodynamic drag against the wind-relative velocity.
///
/// The exposed cross-section per axis is approximated from the hull
/// dimensions and the current pitch/bank, then scaled by the local air
/// density from the barometric column.
fn apply_air_drag(model: &mut Model, wind: Vector3<f64>, tc_min: f64) {
    if !model.defines(DRAG_REQUIRED) {
        return;
    }
    if model.class == VehicleClass::FixedWing && !model.defines(FieldMask::WINGSPAN) {
        return;
    }
    if model.total_mass <= 0.0 {
        return;
    }

    let attitude = model.attitude;
    let vel = model.velocity;

    // Wind rotated into the vehicle frame, then made relative to the
    // vehicle's own motion.
    let (wind_x, wind_y) = ortho_rotate_2d(-attitude.heading, wind.x, wind.y);
    let rel_wind = Vector3::new(wind_x - vel.x, wind_y - vel.y, wind.z + vel.z);

    // Rough hull silhouettes: x seen from the side, y from the front,
    // z from above.
    let (surface_x, mut surface_y, surface_z) = match model.class {
        VehicleClass::FixedWing => (
            2.0 * 2.0 * model.belly_height * model.length,
            2.0 * PI * model.belly_height * model.belly_height,
            model.wingspan * model.length / 3.0,
        ),
        _ => (
            2.0 * model.belly_height * model.length,
            PI * model.belly_height * model.belly_height,
            0.5 * 2.0 * model.belly_height * model.length,
        ),
    };

    if model.defines(FieldMask::AIR_BRAKES_STATE | FieldMask::AIR_BRAKES_AREA)
        && model.air_brakes_on
    {
        surface_y += model.air_brakes_area;
    }

    // Project the silhouettes onto the wind axes for the current
    // attitude.
    let (sin_pitch, cos_pitch) = attitude.pitch.sin_cos();
    let (sin_bank, cos_bank) = attitude.bank.sin_cos();
    let area_x = cos_bank.abs() * surface_x + sin_bank.abs() * surface_z;
    let area_y = cos_pitch.abs() * surface_y + sin_pitch.abs() * surface_z;
    let area_z = sin_pitch.abs() * surface_y
        + (cos_pitch * cos_bank).abs() * surface_z
        + (cos_pitch * sin_bank).abs() * surface_x;

    let pc = 0.5 * air_density(model.position.z) * model.drag_min;

    // Sign-preserving v^2 drag per axis.
    let drag_x = pc * area_x * rel_wind.x.abs() * rel_wind.x;
    let mut drag_y = pc * area_y * rel_wind.y.abs() * rel_wind.y;
    let mut drag_z = pc * area_z * rel_wind.z.abs() * rel_wind.z;

    // Without a real lift model the nose-axis drag over-penalizes
    // climbing. Compensate while not stalling: sin*cos peaks at 0.5
    // at 45 degrees of pitch, where gravity and thrust have already
    // traded enough speed to the vertical axis.
    if model.class == VehicleClass::FixedWing && model.stall_coeff == 0.0 {
        let lift_compensation = (sin_pitch * cos_pitch).abs();
        drag_y *= 1.0 - lift_compensation;
        if vel.z > 0.0 {
            drag_z *= 1.0 - 2.0 * lift_compensation;
        }
    }

    // F = ma, integrated into the vehicle-relative velocity.
    model.velocity.x += drag_x / model.total_mass * tc_min;
    model.velocity.y += drag_y / model.total_mass * tc_min;
    model.velocity.z += -drag_z / model.total_mass * tc_min;
}

/// Gravity speed exchange and stall-driven pitch drop/raise for
/// fixed-wing vehicles.
fn fixed_wing_pitch_dynamics(model: &mut Model, gravity: f64, tc_min: f64, scaled: f64) {
    if !model.defines(PITCH_DYNAMICS_REQUIRED) {
        return;
    }

    let (sin_pitch, cos_pitch) = model.attitude.pitch.sin_cos();
    let (sin_bank, cos_bank) = model.attitude.bank.sin_cos();

    let stall_speed = speed_for_stall(model.airspeed.y, model.airspeed.z, model.attitude.pitch);
    let prev_abs_speed = hypot2(model.velocity.y, model.velocity.z);

    // Pitch-drop stays nonzero above stall, fading out toward the
    // expected-overspeed threshold; pitch-raise is its counterpart,
    // zero below stall and approaching cos(bank) near overspeed.
    let (pitch_drop_coeff, pitch_raise_coeff) = if stall_speed > model.speed_stall {
        let sdc = 0.10;
        let sm = model.overspeed_expected - model.speed_stall;
        let sc = stall_speed - model.speed_stall;
        if sm > 0.0 {
            (
                (1.0 - (sc / sm).min(1.0)) * sdc,
                (sc / sm).min(1.0) * cos_bank,
            )
        } else {
            (sdc, 0.0)
        }
    } else {
        let sdc = 0.10;
        let sm = model.speed_stall;
        let sc = stall_speed;
        let drop = if sm > 0.0 {
            (1.0 - (sc / sm).min(1.0)) * (1.0 - sdc) + sdc
        } else {
            1.0
        };
        (drop, 0.0)
    };

    // Gravity trades speed with pitch: fastest gain pointed straight
    // down, fastest loss straight up, nothing when level. A banked
    // attitude hands part of that exchange to the lateral axis.
    let mut gravity_speed_zy =
        prev_abs_speed + gravity * tc_min * (sin_pitch - (sin_bank * cos_pitch).abs());
    if gravity_speed_zy < 0.0 {
        gravity_speed_zy = 0.0;
    }
    let speed_change_coeff = if prev_abs_speed > 0.0 {
        gravity_speed_zy / prev_abs_speed
    } else {
        1.0
    };
    model.velocity.y *= speed_change_coeff;
    model.velocity.z *= speed_change_coeff;
    model.velocity.x += gravity * tc_min * sin_bank * cos_pitch;

    if pitch_drop_coeff > 0.0 && model.defines(FieldMask::ATTITUDE_LEVELING_RATE) {
        let prev_angle = model.attitude.pitch;
        let drop = PITCH_DROP_RATE * scaled * pitch_drop_coeff;

        if model.landed {
            if model.attitude.pitch > PI {
                // Nose up on the ground: settle back toward level.
                model.attitude.pitch = sanitize_radians(model.attitude.pitch + drop);
                if model.attitude.pitch < prev_angle && model.attitude.pitch > 0.0 {
                    model.attitude.pitch = 0.0;
                }
            } else {
                // Nose down while landed does not happen; snap level.
                model.attitude.pitch = 0.0;
            }
        } else if model.attitude.pitch > PI {
            model.attitude.pitch = sanitize_radians(model.attitude.pitch + drop);
            if model.attitude.pitch < prev_angle && model.attitude.pitch > 0.5 * PI {
                model.attitude.pitch = 0.5 * PI;
            }
        } else {
            // Already nose down: keep dropping, capped straight down.
            model.attitude.pitch = sanitize_radians(model.attitude.pitch + drop);
            if model.attitude.pitch > 0.5 * PI {
                model.attitude.pitch = 0.5 * PI;
            }
        }
    }

    if pitch_raise_coeff != 0.0 && model.defines(FieldMask::ATTITUDE_LEVELING_RATE) {
        model.attitude.pitch =
            sanitize_radians(model.attitude.pitch - PITCH_RAISE_RATE * scaled * pitch_raise_coeff);
        resolve_pitch_inversion(model);
    }
}

/// Reflect the attitude when pitch crosses straight up or straight
/// down, so the vehicle rolls through the vertical instead of flipping
/// discontinuously.
pub(crate) fn resolve_pitch_inversion(model: &mut Model) {
    let pitch = model.attitude.pitch;
    if pitch > 0.5 * PI && pitch < 1.5 * PI {
        model.attitude.heading = sanitize_radians(model.attitude.heading + PI);
        model.attitude.bank = sanitize_radians(model.attitude.bank + PI);
        model.attitude.pitch = if pitch > PI {
            sanitize_radians(2.0 * PI - pitch + PI)
        } else {
            sanitize_radians(PI - pitch)
        };
    }
}

/// Helicopter passive pitch handling: ground leveling while landed,
/// displacement-proportional leveling and bank/pitch heading coupling
/// in flight.
fn rotary_wing_leveling(model: &mut Model, scaled: f64) {
    if !model.defines(ROTARY_REQUIRED) {
        return;
    }

    if model.landed {
        if !model.defines(FieldMask::ATTITUDE_LEVELING_RATE) {
            return;
        }
        let pitch_band = 3.0_f64.to_radians();
        let pitch_up_max = 2.0 * PI - pitch_band;
        let pitch_down_max = pitch_band;

        // Outside the controller-reachable band, level hard.
        if model.attitude.pitch < pitch_up_max && model.attitude.pitch > pitch_down_max {
            let rough = 90.0_f64.to_radians() * scaled;
            if model.attitude.pitch > PI {
                model.attitude.pitch = (model.attitude.pitch + rough).min(pitch_up_max);
            } else {
                model.attitude.pitch = (model.attitude.pitch - rough).max(pitch_down_max);
            }
        }
        // Mild leveling the rest of the way to flat.
        let mild = 2.0_f64.to_radians() * scaled;
        if model.attitude.pitch > PI {
            model.attitude.pitch += mild;
            if model.attitude.pitch > 2.0 * PI {
                model.attitude.pitch = 0.0;
            }
        } else {
            model.attitude.pitch -= mild;
            if model.attitude.pitch < 0.0 {
                model.attitude.pitch = 0.0;
            }
        }
        return;
    }

    if model.defines(FieldMask::ATTITUDE_LEVELING_RATE) {
        let rate = model.attitude_leveling_rate.pitch * scaled;
        if model.attitude.pitch > 1.5 * PI {
            let coeff = ((model.attitude.pitch - 1.5 * PI) / (0.5 * PI)).min(1.0);
            model.attitude.pitch = (model.attitude.pitch + coeff * rate).min(2.0 * PI);
            if model.attitude.pitch >= 2.0 * PI {
                model.attitude.pitch = 0.0;
            }
        } else if model.attitude.pitch < 0.5 * PI {
            let coeff = (((0.5 * PI) - model.attitude.pitch) / (0.5 * PI)).max(0.0);
            model.attitude.pitch = (model.attitude.pitch - coeff * rate).max(0.0);
        }
    }

    // Pitching forward while banked walks the heading around. The
    // atan2 term shrinks the effect while hovering, where vertical
    // speed dominates the airspeed; at cruise it sits near 0.8 and
    // gives roughly standard-rate turns.
    let airspeed_3d = hypot3(model.airspeed.x, model.airspeed.y, model.airspeed.z);
    let relative_pitch = model.attitude.pitch.sin()
        + 0.5 * (model.velocity.x.abs() + model.velocity.y.abs()).atan2(airspeed_3d);
    model.attitude.heading = sanitize_radians(
        model.attitude.heading + relative_pitch * model.attitude.bank.sin() * (0.15 * PI) * scaled,
    );
}

/// Ground-contact drag plus bank leveling, applied to every non-slew
/// class.
fn ground_drag_and_bank_leveling(model: &mut Model, tc_min: f64, scaled: f64) {
    if !model.defines(LEVELING_REQUIRED) {
        return;
    }

    if model.landed {
        let lateral_drag = GROUND_DRAG_LATERAL * tc_min;
        let rolling_drag = GROUND_DRAG_ROLLING * tc_min;

        // Wheels down roll freely along the hull axis; anything else
        // scrubs hard in both ground axes.
        let rolling_on_wheels = model.defines(FieldMask::GEAR_STATE | FieldMask::GEAR_TYPE)
            && model.gear_down
            && model.gear_type == GearType::Wheels;

        model.velocity.x = decay_toward_zero(model.velocity.x, lateral_drag);
        model.velocity.y = decay_toward_zero(
            model.velocity.y,
            if rolling_on_wheels {
                rolling_drag
            } else {
                lateral_drag
            },
        );

        if model.defines(FieldMask::ATTITUDE_LEVELING_RATE) {
            let prev_angle = model.attitude.bank;
            let step = GROUND_BANK_LEVELING_RATE * scaled;
            if model.attitude.bank > PI {
                model.attitude.bank = sanitize_radians(model.attitude.bank + step);
                if model.attitude.bank < prev_angle || model.attitude.bank < PI {
                    model.attitude.bank = 0.0;
                }
            } else {
                model.attitude.bank = sanitize_radians(model.attitude.bank - step);
                if model.attitude.bank > prev_angle || model.attitude.bank > PI {
                    model.attitude.bank = 0.0;
                }
            }
        }
    } else if model.defines(FieldMask::ATTITUDE_LEVELING_RATE) {
        // Airborne: drift back toward wings level, faster the farther
        // from level the bank is.
        let rate = model.attitude_leveling_rate.bank * scaled;
        if model.attitude.bank < PI {
            let coeff = (1.0 - model.attitude.bank / (0.5 * PI)).max(0.0);
            model.attitude.bank = (model.attitude.bank - coeff * rate).max(0.0);
        } else {
            let coeff = (1.0 - (2.0 * PI - model.attitude.bank) / (0.5 * PI)).max(0.0);
            model.attitude.bank += coeff * rate;
            if model.attitude.bank >= 2.0 * PI {
                model.attitude.bank = 0.0;
            }
        }
    }
}

fn decay_toward_zero(value: f64, amount: f64) -> f64 {
    if value < 0.0 {
        (value + amount).min(0.0)
    } else {
        (value - amount).max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Attitude, ModelPatch, SpeedLimits};
    use approx::assert_relative_eq;
    use nalgebra::Vector3;

    fn airplane_patch() -> ModelPatch {
        ModelPatch::new()
            .class(VehicleClass::FixedWing)
            .position(Vector3::new(0.0, 0.0, 500.0))
            .attitude(Attitude::default())
            .velocity(Vector3::zeros())
            .airspeed(Vector3::zeros())
            .speed_stall(28.0)
            .speed_limits(SpeedLimits {
                max: 95.0,
                expected: 105.0,
                overspeed: 118.0,
            })
            .drag_min(0.025)
            .total_mass(5700.0)
            .engine_power(62_000.0)
            .ground_elevation(0.0)
            .belly_height(1.6)
            .length(15.8)
            .wingspan(19.8)
            .landed(false)
            .attitude_leveling_rate(Attitude::new(0.0, 0.2, 0.2))
    }

    fn run(realm: &mut Realm, id: ModelId, cycles: usize) {
        for _ in 0..cycles {
            realm.set_timing(1000);
            apply(realm, id);
        }
    }

    #[test]
    fn test_slew_untouched_by_natural_forces() {
        let mut realm = Realm::new();
        let id = realm.add_model(Model::from_patch(
            &airplane_patch().class(VehicleClass::Slew),
        ));
        let before = realm.model(id).unwrap().clone();
        run(&mut realm, id, 5);
        let after = realm.model(id).unwrap();
        assert_relative_eq!(after.velocity().y, before.velocity().y);
        assert_relative_eq!(after.attitude().pitch, before.attitude().pitch);
    }

    #[test]
    fn test_drag_opposes_forward_motion() {
        let mut realm = Realm::new();
        let id = realm.add_model(Model::from_patch(
            &airplane_patch()
                .velocity(Vector3::new(0.0, 80.0, 0.0))
                .airspeed(Vector3::new(0.0, 80.0, 0.0))
                // Pin the stall/pitch machinery out of the way.
                .speed_stall(0.0),
        ));
        realm.set_timing(1000);
        apply(&mut realm, id);
        let vel_y = realm.model(id).unwrap().velocity().y;
        assert!(vel_y < 80.0, "drag should slow the vehicle, got {}", vel_y);
        assert!(vel_y > 0.0);
    }

    #[test]
    fn test_stalled_airplane_drops_its_nose() {
        let mut realm = Realm::new();
        // Hanging in the air below stall speed, nose level.
        let id = realm.add_model(Model::from_patch(
            &airplane_patch()
                .velocity(Vector3::new(0.0, 5.0, 0.0))
                .airspeed(Vector3::new(0.0, 5.0, 0.0)),
        ));
        realm.set_timing(1000);
        apply(&mut realm, id);
        let pitch = realm.model(id).unwrap().attitude().pitch;
        assert!(
            pitch > 0.0 && pitch <= 0.5 * PI,
            "nose should drop toward the ground, pitch = {}",
            pitch
        );
    }

    #[test]
    fn test_pitch_drop_capped_straight_down() {
        let mut realm = Realm::new();
        let id = realm.add_model(Model::from_patch(
            &airplane_patch()
                .attitude(Attitude::new(0.0, 0.4 * PI, 0.0))
                .velocity(Vector3::zeros())
                .airspeed(Vector3::zeros()),
        ));
        run(&mut realm, id, 10);
        let pitch = realm.model(id).unwrap().attitude().pitch;
        assert!(pitch <= 0.5 * PI + 1e-9, "pitch = {}", pitch);
    }

    #[test]
    fn test_landed_airplane_levels_pitch_and_bank() {
        let mut realm = Realm::new();
        let id = realm.add_model(Model::from_patch(
            &airplane_patch()
                .landed(true)
                .gear_down(true)
                .gear_type(GearType::Wheels)
                .attitude(Attitude::new(0.0, 0.3, 0.4))
                .velocity(Vector3::zeros())
                .airspeed(Vector3::zeros()),
        ));
        run(&mut realm, id, 3);
        let attitude = realm.model(id).unwrap().attitude();
        assert_relative_eq!(attitude.pitch, 0.0);
        assert_relative_eq!(attitude.bank, 0.0);
    }

    #[test]
    fn test_landed_ground_drag_stops_sideways_skid() {
        let mut realm = Realm::new();
        let id = realm.add_model(Model::from_patch(
            &airplane_patch()
                .landed(true)
                .gear_down(true)
                .gear_type(GearType::Wheels)
                .velocity(Vector3::new(4.0, 0.0, 0.0))
                .airspeed(Vector3::zeros()),
        ));
        realm.set_timing(1000);
        apply(&mut realm, id);
        assert_relative_eq!(realm.model(id).unwrap().velocity().x, 0.0);
    }

    #[test]
    fn test_airborne_bank_leveling_converges() {
        let mut realm = Realm::new();
        let id = realm.add_model(Model::from_patch(
            &airplane_patch()
                .attitude(Attitude::new(0.0, 0.0, 0.3))
                .velocity(Vector3::new(0.0, 60.0, 0.0))
                .airspeed(Vector3::new(0.0, 60.0, 0.0)),
        ));
        let mut last_bank = 0.3;
        for _ in 0..20 {
            realm.set_timing(1000);
            apply(&mut realm, id);
            let bank = realm.model(id).unwrap().attitude().bank;
            assert!(bank <= last_bank + 1e-12);
            last_bank = bank;
        }
        assert!(last_bank < 0.1, "bank should level out, got {}", last_bank);
    }

    #[test]
    fn test_pitch_inversion_reflects_attitude() {
        let mut model = Model::from_patch(
            &ModelPatch::new().attitude(Attitude::new(0.0, 0.6 * PI, 0.0)),
        );
        resolve_pitch_inversion(&mut model);
        let attitude = model.attitude();
        assert_relative_eq!(attitude.heading, PI);
        assert_relative_eq!(attitude.bank, PI);
        assert_relative_eq!(attitude.pitch, 0.4 * PI, epsilon = 1e-12);
    }

    #[test]
    fn test_angles_stay_sanitized() {
        let mut realm = Realm::new();
        let id = realm.add_model(Model::from_patch(
            &airplane_patch()
                .attitude(Attitude::new(1.0, 1.9 * PI, 5.5))
                .velocity(Vector3::new(1.0, 50.0, -2.0))
                .airspeed(Vector3::new(1.0, 50.0, -2.0)),
        ));
        run(&mut realm, id, 25);
        let attitude = realm.model(id).unwrap().attitude();
        for angle in [attitude.heading, attitude.pitch, attitude.bank] {
            assert!((0.0..2.0 * PI).contains(&angle), "angle = {}", angle);
        }
    }
}
