//! Propulsion and ground-contact stage.
//!
//! Converts throttle and attitude into velocity change, integrates
//! position, and resolves the landed/airborne/stopped state machine.
//! Overspeed, touch-down, airborne and parked callbacks fire from
//! here; after each one the model handle is re-validated before any
//! further work.

use std::f64::consts::PI;

use super::StageOutcome;
use crate::model::{FieldMask, GearType, VehicleClass};
use crate::realm::{FlightPhysicsLevel, ModelId, Realm};
use crate::utils::constants::{ETL_SPEED, TRANSVERSE_FLOW_END, TRANSVERSE_FLOW_START};
use crate::utils::math::{
    hypot2, hypot3, ortho_rotate_2d, rotate_bank, rotate_pitch, sanitize_radians, speed_for_stall,
    stall_coeff,
};

/// Deceleration applied by full wheel brakes, m/cycle^2.
const WHEEL_BRAKE_POWER: f64 = 10.0;

/// Ground-plane speed below which a landed vehicle counts as stopped,
/// and the higher speed at which it counts as moving again. Asymmetric
/// so the state cannot flicker.
const STOP_SPEED: f64 = 0.02;
const RESUME_SPEED: f64 = 0.1;

const FIXED_WING_REQUIRED: FieldMask = FieldMask::from_bits_truncate(
    FieldMask::POSITION.bits()
        | FieldMask::ATTITUDE.bits()
        | FieldMask::VELOCITY.bits()
        | FieldMask::AIRSPEED.bits()
        | FieldMask::SPEED_STALL.bits()
        | FieldMask::SPEED_MAX.bits()
        | FieldMask::ACCEL_RESPONSIVENESS.bits()
        | FieldMask::LANDED.bits(),
);

const ROTARY_WING_REQUIRED: FieldMask = FieldMask::from_bits_truncate(
    FieldMask::POSITION.bits()
        | FieldMask::ATTITUDE.bits()
        | FieldMask::VELOCITY.bits()
        | FieldMask::AIRSPEED.bits()
        | FieldMask::SPEED_MAX.bits()
        | FieldMask::ACCEL_RESPONSIVENESS.bits()
        | FieldMask::LANDED.bits()
        | FieldMask::BELLY_HEIGHT.bits(),
);

const CONTACT_REQUIRED: FieldMask = FieldMask::from_bits_truncate(
    FieldMask::POSITION.bits() | FieldMask::GROUND_ELEVATION.bits() | FieldMask::LANDED.bits(),
);

const THRUST_REQUIRED: FieldMask = FieldMask::from_bits_truncate(
    FieldMask::POSITION.bits()
        | FieldMask::SERVICE_CEILING.bits()
        | FieldMask::THROTTLE.bits()
        | FieldMask::ENGINE_POWER.bits(),
);

enum ContactEvent {
    None,
    /// Genuine touch down with the given impact coefficient.
    TouchDown(f64),
    /// Landed from a pre-existing under-ground state; zero impact.
    TouchDownSoft,
    Airborne,
}

/// Apply one cycle of propulsion and ground-contact forces.
pub fn apply(realm: &mut Realm, id: ModelId) -> StageOutcome {
    let tc_min = realm.clock().compensation_min();
    let scaled = realm.clock().scaled();
    let gravity = realm.environment().gravity();
    let level = realm.physics_level();

    let Some(model) = realm.model_mut(id) else {
        return StageOutcome::Removed;
    };

    if !model.defines(FieldMask::CLASS) || model.class == VehicleClass::Slew {
        // Slew vehicles move only through the control stage.
        return StageOutcome::Active;
    }

    let center_to_gear_height = if model.defines(
        FieldMask::BELLY_HEIGHT
            | FieldMask::GEAR_STATE
            | FieldMask::GEAR_TYPE
            | FieldMask::GEAR_HEIGHT,
    ) {
        model.center_to_gear_height()
    } else {
        0.0
    };

    let net_weight = if model.defines(FieldMask::TOTAL_MASS) {
        (model.total_mass * gravity).max(0.0)
    } else {
        0.0
    };

    // Thrust falls off with altitude: nothing is lost near the ground,
    // everything by 1.35x the service ceiling, with a quartic curve so
    // the last of the climb performance goes quickly.
    let mut thrust_output = 0.0;
    if model.defines(THRUST_REQUIRED) {
        let height_coeff = if model.service_ceiling > 0.0 {
            (model.position.z / (model.service_ceiling * 1.35))
                .min(1.0)
                .max(0.0)
                .powi(4)
        } else {
            0.0
        };
        thrust_output =
            (model.throttle * model.engine_power * (1.0 - height_coeff).max(0.0)).max(0.0);

        if model.defines(FieldMask::AFTERBURNER_STATE | FieldMask::AFTERBURNER_POWER)
            && model.afterburner_on
        {
            thrust_output +=
                model.afterburner_power_coeff * model.engine_power * (1.0 - height_coeff).max(0.0);
        }
    }

    let airspeed_3d = hypot3(model.airspeed.x, model.airspeed.y, model.airspeed.z);
    let airspeed_2d = hypot2(model.airspeed.x, model.airspeed.y);

    // Overspeed warning, every cycle the condition holds.
    if model.defines(FieldMask::SPEED_MAX | FieldMask::AIRSPEED)
        && airspeed_3d > model.overspeed_expected
    {
        let expected = model.overspeed_expected;
        let overspeed = model.overspeed;
        realm.fire_overspeed(id, airspeed_3d, expected, overspeed);
        if !realm.is_registered(id) {
            return StageOutcome::Removed;
        }
    }

    // Vertical position delta for this cycle, settled by the class
    // branch and integrated by the contact resolution below.
    let mut dkc = 0.0;

    let Some(model) = realm.model_mut(id) else {
        return StageOutcome::Removed;
    };

    match model.class {
        VehicleClass::FixedWing => {
            if model.defines(FIXED_WING_REQUIRED) {
                let (sin_pitch, cos_pitch) = model.attitude.pitch.sin_cos();
                let sin_bank = model.attitude.bank.sin();

                let current_speed_for_stall =
                    speed_for_stall(model.airspeed.y, model.airspeed.z, model.attitude.pitch);

                // On the ground only the roll axis counts; in the air
                // the climb component joins in.
                let (prev_airspeed, prev_ground_speed) = if model.landed {
                    (model.airspeed.y.abs(), model.velocity.y.abs())
                } else {
                    (
                        hypot2(model.airspeed.y, model.airspeed.z),
                        hypot2(model.velocity.y, model.velocity.z),
                    )
                };

                // 1.0 standing still, 0.0 at maximum speed.
                let speed_coeff = if model.speed_max > 0.0 {
                    (1.0 - prev_airspeed / model.speed_max).max(0.0)
                } else {
                    0.0
                };

                let mut new_stall_coeff =
                    stall_coeff(current_speed_for_stall, model.speed_stall);

                // A slower stall that starts well above stall speed:
                // gliding close to stall sheds height without being a
                // full stall.
                let safe_stall_coeff =
                    stall_coeff(current_speed_for_stall, model.speed_stall * 1.75);

                // Bank turns the nose; the rate shrinks to nothing as
                // speed approaches the maximum.
                if !model.landed {
                    model.attitude.heading = sanitize_radians(
                        model.attitude.heading + sin_bank * speed_coeff * (0.03 * PI) * scaled,
                    );
                }

                // Thrust splits between forward and climb axes by
                // pitch.
                let vel_thrust_mag =
                    thrust_output * tc_min / model.accel_responsiveness.y.max(1.0);
                let vel_thrust_y = cos_pitch * vel_thrust_mag;
                let vel_thrust_z = -sin_pitch * vel_thrust_mag;

                // Damp stall recovery: letting the stall fall as fast
                // as the speed gain it produces feeds back into a
                // runaway. Getting out of a stall takes time.
                if !model.landed && new_stall_coeff < model.stall_coeff {
                    new_stall_coeff = (model.stall_coeff - 0.1 * tc_min).max(0.0);
                }

                let vel_adjustment = if model.landed { 0.0 } else { new_stall_coeff };

                model.velocity.y =
                    cos_pitch * prev_ground_speed * (1.0 - vel_adjustment) + vel_thrust_y;
                model.velocity.z =
                    -sin_pitch * prev_ground_speed * (1.0 - vel_adjustment) + vel_thrust_z;
                model.stall_coeff = new_stall_coeff;

                // Stalling sheds height beyond what the velocity blend
                // removed.
                model.velocity.z -= model.speed_stall / model.accel_responsiveness.z.max(1.0)
                    * (new_stall_coeff.min(1.0) + 1.75 * safe_stall_coeff.min(1.0));

                // Rotate the ground-plane velocity into world heading
                // and integrate.
                let (dic, djc) = ortho_rotate_2d(
                    model.attitude.heading,
                    model.velocity.x * scaled,
                    model.velocity.y * scaled,
                );
                model.position.x += dic;
                model.position.y += djc;

                dkc = model.velocity.z * scaled;
            }
        }
        VehicleClass::RotaryWing => {
            if model.defines(ROTARY_WING_REQUIRED) {
                let (sin_pitch, cos_pitch) = model.attitude.pitch.sin_cos();
                let (sin_bank, cos_bank) = model.attitude.bank.sin_cos();

                // In ground effect the rotor column pushes against the
                // ground, worth up to 28% of thrust within 1.25 rotor
                // diameters, fading with attitude tilt.
                if model.defines(FieldMask::ROTOR_DIAMETER)
                    && level >= FlightPhysicsLevel::Moderate
                    && model.rotor_diameter > 0.0
                {
                    let horizontality = (cos_pitch.abs() * cos_bank.abs()).powi(2);
                    let ige_height = 1.25 * model.rotor_diameter;
                    let rotor_height =
                        (model.position.z - model.ground_elevation + model.belly_height).abs();
                    let ige_coeff =
                        1.0 - (rotor_height.clamp(0.0, ige_height) / ige_height).powi(2);
                    thrust_output *= 1.0 + 0.28 * ige_coeff * horizontality;
                }

                // Airspeed as the rotor disc sees it: undo bank, then
                // apply pitch. Heading is already implicit in the
                // vehicle-relative airspeed.
                let rotor_airspeed = rotate_pitch(
                    rotate_bank(model.airspeed, -model.attitude.bank),
                    model.attitude.pitch,
                );
                let rotor_airspeed_2d = hypot2(rotor_airspeed.x, rotor_airspeed.y);

                let single_main_rotor =
                    model.defines(FieldMask::SINGLE_MAIN_ROTOR) && model.single_main_rotor;

                // Transverse flow: between ~5 and ~25 kt the front of
                // the disc works clean air while the rear works washed
                // air, rolling the aircraft with a 90 degree phase
                // shift.
                if single_main_rotor
                    && level >= FlightPhysicsLevel::Realistic
                    && !model.landed
                    && rotor_airspeed_2d > 0.0
                {
                    let tf_coeff = ((rotor_airspeed_2d
                        .clamp(TRANSVERSE_FLOW_START, TRANSVERSE_FLOW_END)
                        - TRANSVERSE_FLOW_START)
                        * PI
                        / (TRANSVERSE_FLOW_END - TRANSVERSE_FLOW_START))
                        .sin();
                    let tf_bank = rotor_airspeed.y / rotor_airspeed_2d * tf_coeff;
                    let tf_pitch = -(rotor_airspeed.x / rotor_airspeed_2d) * tf_coeff;
                    model.attitude.pitch =
                        sanitize_radians(model.attitude.pitch + tf_pitch * 0.08 * PI * scaled);
                    model.attitude.bank =
                        sanitize_radians(model.attitude.bank + tf_bank * 0.08 * PI * scaled);
                }

                // Hovering pays a tip-vortex penalty of up to 25%,
                // gone once translational lift is established.
                if level >= FlightPhysicsLevel::Moderate {
                    let etl_thrust_coeff =
                        1.0 - (rotor_airspeed_2d / ETL_SPEED).clamp(0.0, 1.0).powi(2);
                    thrust_output *= 1.0 - 0.25 * etl_thrust_coeff;
                }

                // Entering translational lift also nudges the nose up
                // until the tail catches up.
                if level >= FlightPhysicsLevel::Realistic
                    && !model.landed
                    && rotor_airspeed_2d > 0.0
                {
                    let etl_pitch_bank_coeff =
                        (rotor_airspeed_2d.min(ETL_SPEED) * PI / ETL_SPEED).sin();
                    let etl_bank =
                        -(rotor_airspeed.x / rotor_airspeed_2d) * etl_pitch_bank_coeff;
                    let etl_pitch =
                        -(rotor_airspeed.y / rotor_airspeed_2d) * etl_pitch_bank_coeff;
                    model.attitude.pitch =
                        sanitize_radians(model.attitude.pitch + etl_pitch * 0.03 * PI * scaled);
                    model.attitude.bank =
                        sanitize_radians(model.attitude.bank + etl_bank * 0.03 * PI * scaled);
                }

                // Main-rotor torque yaws the fuselage the other way;
                // strongest in the hover, counteracted by the tail as
                // speed builds.
                if single_main_rotor && level >= FlightPhysicsLevel::Realistic && !model.landed {
                    let torque_coeff = 1.0 - airspeed_2d / ETL_SPEED;
                    // The effect dies off faster than it builds.
                    let torque_accel = torque_coeff * if torque_coeff > 0.0 { 0.2 } else { 0.5 };
                    model.torque_velocity = (model.torque_velocity + torque_accel * scaled).max(0.0);
                    let drift =
                        model.torque_velocity.atan() * 0.1 * model.throttle * scaled;
                    model.attitude.heading = sanitize_radians(model.attitude.heading + drift);
                } else {
                    model.torque_velocity = 0.0;
                }

                // Attitude vectors the thrust across the ground plane.
                let di = model.velocity.x
                    + thrust_output * sin_bank * cos_pitch * tc_min
                        / model.accel_responsiveness.x.max(1.0);
                let dj = model.velocity.y
                    + thrust_output * sin_pitch * cos_bank * tc_min
                        / model.accel_responsiveness.y.max(1.0);
                model.velocity.x = di;
                model.velocity.y = dj;

                let (dic, djc) =
                    ortho_rotate_2d(model.attitude.heading, di * scaled, dj * scaled);
                model.position.x += dic;
                model.position.y += djc;

                // Vertical velocity converges on the thrust-vs-weight
                // target rather than being solved exactly; the floor
                // on the blend fraction guarantees convergence even at
                // very short cycles.
                let dk_prev = model.velocity.z;
                let dk_new = (thrust_output * cos_pitch * cos_bank - net_weight)
                    / model.accel_responsiveness.z.max(1.0);
                let mut dk = dk_prev + (dk_new - dk_prev) * tc_min.max(0.01);

                if dk < 0.0 && model.landed {
                    dk = 0.0;
                }
                dkc = dk * scaled;
                model.velocity.z = dk;
            }
        }
        VehicleClass::Slew => unreachable!(),
    }

    // Integrate altitude and resolve ground contact.
    let mut event = ContactEvent::None;
    if model.defines(CONTACT_REQUIRED) {
        let prev_z = model.position.z;
        model.position.z += dkc;

        let floor = model.ground_elevation + center_to_gear_height;
        if model.position.z <= floor {
            model.position.z = floor;
            if !model.landed {
                model.landed = true;
                event = if prev_z > floor {
                    // Genuine touch down; report the impact severity
                    // even if it is below the crash threshold.
                    let impact = if model.defines(
                        FieldMask::POSITION
                            | FieldMask::VELOCITY
                            | FieldMask::TOUCH_DOWN_RESISTANCE,
                    ) && model.touch_down_crash_resistance > 0.0
                    {
                        (model.velocity.z / -model.touch_down_crash_resistance).max(0.0)
                    } else {
                        0.0
                    };
                    ContactEvent::TouchDown(impact)
                } else {
                    ContactEvent::TouchDownSoft
                };
            }
        } else if (model.position.z - 0.3) > floor && model.landed {
            // Comfortably above the floor; a small tolerance keeps the
            // landed state from flickering on bumps.
            model.landed = false;
            event = ContactEvent::Airborne;
        }
    }

    match event {
        ContactEvent::None => {}
        ContactEvent::TouchDown(impact) => {
            realm.fire_touch_down(id, impact);
            if !realm.is_registered(id) {
                return StageOutcome::Removed;
            }
        }
        ContactEvent::TouchDownSoft => {
            realm.fire_touch_down(id, 0.0);
            if !realm.is_registered(id) {
                return StageOutcome::Removed;
            }
        }
        ContactEvent::Airborne => {
            realm.fire_airborne(id);
            if !realm.is_registered(id) {
                return StageOutcome::Removed;
            }
        }
    }

    let Some(model) = realm.model_mut(id) else {
        return StageOutcome::Removed;
    };

    // Wheel braking.
    if model.defines(
        FieldMask::GEAR_STATE
            | FieldMask::GEAR_TYPE
            | FieldMask::GEAR_BRAKES
            | FieldMask::LANDED,
    ) && model.landed
        && model.gear_down
        && model.gear_type == GearType::Wheels
        && model.gear_brakes_on
    {
        let braking = WHEEL_BRAKE_POWER * model.gear_brakes_coeff * tc_min;
        model.velocity.y = if model.velocity.y < 0.0 {
            (model.velocity.y + braking).min(0.0)
        } else {
            (model.velocity.y - braking).max(0.0)
        };
    }

    // Stopped hysteresis and the parked notification.
    let mut parked = false;
    if model.defines(FieldMask::STOPPED | FieldMask::LANDED) {
        if model.landed {
            let prev_stopped = model.stopped;
            let ground_speed = hypot2(model.velocity.x, model.velocity.y);
            if ground_speed < STOP_SPEED {
                model.stopped = true;
            } else if ground_speed > RESUME_SPEED {
                model.stopped = false;
            }
            parked = model.stopped && !prev_stopped;
        } else {
            model.stopped = false;
        }
    }
    if parked {
        realm.fire_parked(id);
        if !realm.is_registered(id) {
            return StageOutcome::Removed;
        }
    }

    StageOutcome::Active
}
