//! Control force stage: pilot control coefficients become attitude
//! rates. Slew vehicles are translated directly here, the only stage
//! that moves them at all.

use std::f64::consts::PI;

use super::natural::resolve_pitch_inversion;
use super::StageOutcome;
use crate::model::{FieldMask, Model, VehicleClass};
use crate::realm::{ModelId, Realm};
use crate::utils::math::{delta_radians, ortho_rotate_2d, rotate_heading, sanitize_radians};

/// Ground steering rate at the optimal turning speed, radians/cycle.
const GROUND_TURN_RATE: f64 = 0.2 * PI;

/// Slew translation gain applied to the cubed control coefficients.
const SLEW_SPEED: f64 = 10_000.0;
/// Slew heading rate at full deflection, radians/cycle.
const SLEW_TURN_RATE: f64 = 0.5 * PI;

const SLEW_REQUIRED: FieldMask = FieldMask::from_bits_truncate(
    FieldMask::POSITION.bits()
        | FieldMask::ATTITUDE.bits()
        | FieldMask::GROUND_ELEVATION.bits()
        | FieldMask::HEADING_CONTROL.bits()
        | FieldMask::BANK_CONTROL.bits()
        | FieldMask::PITCH_CONTROL.bits()
        | FieldMask::THROTTLE.bits(),
);

const CONTROL_REQUIRED: FieldMask = FieldMask::from_bits_truncate(
    FieldMask::ATTITUDE.bits()
        | FieldMask::VELOCITY.bits()
        | FieldMask::AIRSPEED.bits()
        | FieldMask::HEADING_CONTROL.bits()
        | FieldMask::BANK_CONTROL.bits()
        | FieldMask::PITCH_CONTROL.bits()
        | FieldMask::ATTITUDE_CHANGE_RATE.bits()
        | FieldMask::LANDED.bits(),
);

/// Apply one cycle of control forces. Fires no callbacks.
pub fn apply(realm: &mut Realm, id: ModelId) -> StageOutcome {
    let scaled = realm.clock().scaled();

    let Some(model) = realm.model_mut(id) else {
        return StageOutcome::Removed;
    };

    if !model.defines(FieldMask::CLASS) {
        return StageOutcome::Active;
    }

    if model.class == VehicleClass::Slew {
        apply_slew(model, scaled);
        return StageOutcome::Active;
    }

    if !model.defines(CONTROL_REQUIRED) {
        return StageOutcome::Active;
    }

    let h_con = model.heading_control;
    let p_con = (model.pitch_control + model.elevator_trim).clamp(-1.0, 1.0);
    let b_con = model.bank_control;
    let rates = model.attitude_change_rate;
    let prev_heading = model.attitude.heading;

    if model.landed {
        // On the ground the controls still deflect the airframe, but
        // only a helicopter can bank against its rotor.
        if model.class == VehicleClass::RotaryWing {
            model.attitude.bank =
                sanitize_radians(model.attitude.bank + b_con * rates.bank * scaled);
        }

        pitch_by_pitch_control(model, p_con, rates.pitch, scaled);

        // Ground steering couples through the whole attitude the same
        // way the drag model couples the axes.
        if model.defines(
            FieldMask::GEAR_TURN_VELOCITY_OPTIMAL
                | FieldMask::GEAR_TURN_VELOCITY_MAX
                | FieldMask::GEAR_TURN_RATE,
        ) && model.gear_turn_velocity_optimal > 0.0
            && model.gear_turn_velocity_max > 0.0
        {
            // Steering authority peaks at the optimal taxi speed and
            // decays away toward the maximum turning speed.
            let vel_y = model.velocity.y;
            let mut turn_coeff = vel_y / model.gear_turn_velocity_optimal;
            if vel_y < 0.0 {
                if turn_coeff < -1.0 {
                    turn_coeff = -(1.0 + vel_y / model.gear_turn_velocity_max).max(0.0);
                }
            } else if turn_coeff > 1.0 {
                turn_coeff = (1.0 - vel_y / model.gear_turn_velocity_max).max(0.0);
            }
            turn_coeff *= h_con * GROUND_TURN_RATE;

            let (sin_pitch, _) = model.attitude.pitch.sin_cos();
            let (sin_bank, cos_bank) = model.attitude.bank.sin_cos();
            model.attitude.heading =
                sanitize_radians(model.attitude.heading + cos_bank * turn_coeff * scaled);
            model.attitude.pitch =
                sanitize_radians(model.attitude.pitch + sin_bank * turn_coeff * scaled);
            model.attitude.bank =
                sanitize_radians(model.attitude.bank - sin_pitch * turn_coeff * scaled);
        }
    } else {
        model.attitude.bank = sanitize_radians(model.attitude.bank + b_con * rates.bank * scaled);

        pitch_by_pitch_control(model, p_con, rates.pitch, scaled);

        // Rudder input turns the nose, and through the bank/pitch
        // coupling drags a little adverse pitch and roll with it.
        let (sin_pitch, _) = model.attitude.pitch.sin_cos();
        let (sin_bank, cos_bank) = model.attitude.bank.sin_cos();
        model.attitude.heading = sanitize_radians(
            model.attitude.heading + cos_bank * h_con * rates.heading * scaled,
        );
        model.attitude.pitch =
            sanitize_radians(model.attitude.pitch + sin_bank * h_con * rates.heading * scaled);
        model.attitude.bank =
            sanitize_radians(model.attitude.bank - sin_pitch * h_con * rates.heading * scaled);
    }

    // Velocity is stored vehicle-relative; rotate it by the negative
    // heading delta so it stays consistent with the new orientation.
    let theta = delta_radians(prev_heading, model.attitude.heading);
    if theta != 0.0 {
        model.velocity = rotate_heading(model.velocity, -theta);
    }

    StageOutcome::Active
}

/// Pitch from the pitch control, scaled by the bank so a knife-edge
/// attitude turns elevator input into yaw instead, then the inversion
/// crossing and the heading component of that same input.
fn pitch_by_pitch_control(model: &mut Model, p_con: f64, pitch_rate: f64, scaled: f64) {
    let cos_bank = model.attitude.bank.cos();
    model.attitude.pitch =
        sanitize_radians(model.attitude.pitch + cos_bank * p_con * pitch_rate * scaled);
    resolve_pitch_inversion(model);

    let sin_bank = model.attitude.bank.sin();
    model.attitude.heading =
        sanitize_radians(model.attitude.heading - sin_bank * p_con * pitch_rate * scaled);
}

/// Direct, inertialess repositioning from the control coefficients.
///
/// The pitch/bank coefficients are cubed to bias authority toward fine
/// movement near the stick center; velocity and airspeed state is
/// never touched.
fn apply_slew(model: &mut Model, scaled: f64) {
    if !model.defines(SLEW_REQUIRED) {
        return;
    }

    let b_cubed = model.bank_control.powi(3);
    let p_cubed = model.pitch_control.powi(3);

    let (dx, dy) = ortho_rotate_2d(
        model.attitude.heading,
        b_cubed * SLEW_SPEED * scaled,
        p_cubed * SLEW_SPEED * scaled,
    );
    model.position.x += dx;
    model.position.y += dy;

    if model.position.z < model.ground_elevation {
        model.position.z = model.ground_elevation;
    }

    model.attitude.heading = sanitize_radians(
        model.attitude.heading + model.heading_control * SLEW_TURN_RATE * scaled,
    );

    model.center_to_ground_height = model.ground_elevation - model.position.z;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Attitude, ModelPatch};
    use approx::assert_relative_eq;
    use nalgebra::Vector3;

    fn controllable_patch() -> ModelPatch {
        ModelPatch::new()
            .class(VehicleClass::FixedWing)
            .position(Vector3::new(0.0, 0.0, 1000.0))
            .attitude(Attitude::default())
            .velocity(Vector3::new(0.0, 50.0, 0.0))
            .airspeed(Vector3::new(0.0, 50.0, 0.0))
            .landed(false)
            .heading_control(0.0)
            .pitch_control(0.0)
            .bank_control(0.0)
            .attitude_change_rate(Attitude::new(0.1, 0.3, 0.5))
    }

    #[test]
    fn test_bank_control_banks_the_aircraft() {
        let mut realm = Realm::new();
        let id = realm.add_model(Model::from_patch(&controllable_patch().bank_control(0.5)));
        realm.set_timing(1000);
        apply(&mut realm, id);
        assert_relative_eq!(realm.model(id).unwrap().attitude().bank, 0.25);
    }

    #[test]
    fn test_pitch_control_nose_up() {
        let mut realm = Realm::new();
        let id = realm.add_model(Model::from_patch(&controllable_patch().pitch_control(-1.0)));
        realm.set_timing(1000);
        apply(&mut realm, id);
        // Pulling back winds pitch toward 2*PI (nose up).
        let pitch = realm.model(id).unwrap().attitude().pitch;
        assert_relative_eq!(pitch, 2.0 * PI - 0.3, epsilon = 1e-12);
    }

    #[test]
    fn test_elevator_trim_adds_to_pitch_control() {
        let mut realm = Realm::new();
        let id = realm.add_model(Model::from_patch(
            &controllable_patch().pitch_control(0.0).elevator_trim(-0.2),
        ));
        realm.set_timing(1000);
        apply(&mut realm, id);
        let pitch = realm.model(id).unwrap().attitude().pitch;
        assert_relative_eq!(pitch, 2.0 * PI - 0.06, epsilon = 1e-12);
    }

    #[test]
    fn test_heading_change_rotates_velocity() {
        let mut realm = Realm::new();
        let id = realm.add_model(Model::from_patch(&controllable_patch().heading_control(1.0)));
        realm.set_timing(1000);
        apply(&mut realm, id);
        let model = realm.model(id).unwrap();
        let heading = model.attitude().heading;
        assert_relative_eq!(heading, 0.1, epsilon = 1e-12);
        // The stored velocity is vehicle-relative: after a right turn
        // the old track is slightly to the left of the nose.
        assert!(model.velocity().x < 0.0);
        assert_relative_eq!(model.velocity().norm(), 50.0, epsilon = 1e-9);
    }

    #[test]
    fn test_undefined_controls_do_nothing() {
        let mut realm = Realm::new();
        let id = realm.add_model(Model::from_patch(
            &controllable_patch().attitude(Attitude::new(1.0, 0.0, 0.0)),
        ));
        realm.undefine(id, FieldMask::HEADING_CONTROL);
        realm.set_timing(1000);
        apply(&mut realm, id);
        assert_relative_eq!(realm.model(id).unwrap().attitude().heading, 1.0);
    }

    #[test]
    fn test_ground_turn_peaks_at_optimal_speed() {
        let turn = |speed: f64| -> f64 {
            let mut realm = Realm::new();
            let id = realm.add_model(Model::from_patch(
                &controllable_patch()
                    .landed(true)
                    .velocity(Vector3::new(0.0, speed, 0.0))
                    .airspeed(Vector3::new(0.0, speed, 0.0))
                    .heading_control(1.0)
                    .gear_turn_velocity_optimal(8.0)
                    .gear_turn_velocity_max(30.0)
                    .gear_turn_rate(0.2),
            ));
            realm.set_timing(1000);
            apply(&mut realm, id);
            delta_radians(0.0, realm.model(id).unwrap().attitude().heading).abs()
        };

        let slow = turn(2.0);
        let optimal = turn(8.0);
        let fast = turn(25.0);
        assert!(optimal > slow, "optimal {} vs slow {}", optimal, slow);
        assert!(optimal > fast, "optimal {} vs fast {}", optimal, fast);
        // At the maximum turning speed there is no authority left.
        assert_relative_eq!(turn(30.0), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_slew_with_centered_controls_stays_put() {
        let mut realm = Realm::new();
        let id = realm.add_model(Model::from_patch(
            &ModelPatch::new()
                .class(VehicleClass::Slew)
                .position(Vector3::new(10.0, 20.0, 30.0))
                .attitude(Attitude::new(1.0, 0.0, 0.0))
                .ground_elevation(0.0)
                .heading_control(0.0)
                .pitch_control(0.0)
                .bank_control(0.0)
                .throttle(0.0),
        ));
        for _ in 0..10 {
            realm.set_timing(1000);
            apply(&mut realm, id);
        }
        let model = realm.model(id).unwrap();
        assert_relative_eq!(model.position().x, 10.0);
        assert_relative_eq!(model.position().y, 20.0);
        assert_relative_eq!(model.position().z, 30.0);
        assert_relative_eq!(model.attitude().heading, 1.0);
    }

    #[test]
    fn test_slew_translates_and_turns() {
        let mut realm = Realm::new();
        let id = realm.add_model(Model::from_patch(
            &ModelPatch::new()
                .class(VehicleClass::Slew)
                .position(Vector3::zeros())
                .attitude(Attitude::default())
                .ground_elevation(0.0)
                .heading_control(0.5)
                .pitch_control(0.1)
                .bank_control(0.0)
                .throttle(0.0),
        ));
        realm.set_timing(1000);
        apply(&mut realm, id);
        let model = realm.model(id).unwrap();
        // Heading 0: the pitch coefficient moves the camera north.
        assert_relative_eq!(model.position().y, 0.1_f64.powi(3) * 10_000.0, epsilon = 1e-9);
        assert_relative_eq!(model.attitude().heading, 0.25 * PI, epsilon = 1e-12);
        // Velocity state is never touched in slew.
        assert_relative_eq!(model.velocity().norm(), 0.0);
    }

    #[test]
    fn test_slew_clamped_to_ground() {
        let mut realm = Realm::new();
        let id = realm.add_model(Model::from_patch(
            &ModelPatch::new()
                .class(VehicleClass::Slew)
                .position(Vector3::new(0.0, 0.0, -50.0))
                .attitude(Attitude::default())
                .ground_elevation(12.0)
                .heading_control(0.0)
                .pitch_control(0.0)
                .bank_control(0.0)
                .throttle(0.0),
        ));
        realm.set_timing(1000);
        apply(&mut realm, id);
        assert_relative_eq!(realm.model(id).unwrap().position().z, 12.0);
    }
}
