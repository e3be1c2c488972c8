//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use airdyn::{Attitude, Model, ModelConfig, ModelPatch, Realm, VehicleClass};
use nalgebra::Vector3;
use std::cell::RefCell;
use std::rc::Rc;

/// A patrol airplane in level flight at the given altitude and forward
/// speed, gear up, controls centered.
pub fn flying_airplane(altitude: f64, speed: f64) -> Model {
    let mut model = ModelConfig::patrol_airplane().build();
    model.apply(&kinematics_patch(altitude, speed).gear_down(false));
    model
}

/// A rescue helicopter hovering (or translating) at the given altitude.
pub fn flying_helicopter(altitude: f64, speed: f64) -> Model {
    let mut model = ModelConfig::rescue_helicopter().build();
    model.apply(&kinematics_patch(altitude, speed).gear_down(true));
    model
}

/// A landed, stationary airplane with the gear down.
pub fn parked_airplane() -> Model {
    let mut model = ModelConfig::patrol_airplane().build();
    let gear_height = 1.1 + 1.6; // gear + belly
    model.apply(
        &kinematics_patch(gear_height, 0.0)
            .gear_down(true)
            .landed(true)
            .stopped(true),
    );
    model
}

/// A slew camera parked at the origin with centered controls.
pub fn slew_camera() -> Model {
    let mut model = ModelConfig::slew_camera().build();
    model.apply(
        &ModelPatch::new()
            .position(Vector3::new(0.0, 0.0, 100.0))
            .attitude(Attitude::default())
            .ground_elevation(0.0)
            .heading_control(0.0)
            .pitch_control(0.0)
            .bank_control(0.0)
            .throttle(0.0),
    );
    assert_eq!(model.class(), VehicleClass::Slew);
    model
}

fn kinematics_patch(altitude: f64, speed: f64) -> ModelPatch {
    ModelPatch::new()
        .position(Vector3::new(0.0, 0.0, altitude))
        .attitude(Attitude::default())
        .velocity(Vector3::new(0.0, speed, 0.0))
        .airspeed(Vector3::new(0.0, speed, 0.0))
        .ground_elevation(0.0)
        .landed(false)
        .stopped(false)
        .heading_control(0.0)
        .pitch_control(0.0)
        .bank_control(0.0)
        .throttle(0.0)
}

/// Counters filled in by the notification callbacks, shared between
/// the test body and the hooks through `Rc`.
#[derive(Default)]
pub struct EventLog {
    pub airborne: usize,
    pub touch_downs: Vec<f64>,
    pub parked: usize,
    pub overspeeds: Vec<(f64, f64, f64)>,
    pub added: usize,
    pub removed: usize,
}

pub fn install_recording_hooks(realm: &mut Realm) -> Rc<RefCell<EventLog>> {
    let log = Rc::new(RefCell::new(EventLog::default()));

    let events = log.clone();
    realm.on_airborne(move |_, _| events.borrow_mut().airborne += 1);
    let events = log.clone();
    realm.on_touch_down(move |_, _, impact| events.borrow_mut().touch_downs.push(impact));
    let events = log.clone();
    realm.on_parked(move |_, _| events.borrow_mut().parked += 1);
    let events = log.clone();
    realm.on_overspeed(move |_, _, current, expected, actual| {
        events.borrow_mut().overspeeds.push((current, expected, actual))
    });
    let events = log.clone();
    realm.on_model_added(move |_, _| events.borrow_mut().added += 1);
    let events = log.clone();
    realm.on_model_removed(move |_, _| events.borrow_mut().removed += 1);

    log
}
