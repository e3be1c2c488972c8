//! Registry semantics: handles, patches, and callback reentrancy.

mod common;

use airdyn::systems::propulsion;
use airdyn::{FieldMask, Model, ModelPatch, Realm, StageOutcome};
use approx::assert_relative_eq;
use common::{flying_airplane, install_recording_hooks, slew_camera};
use nalgebra::Vector3;
use std::cell::RefCell;
use std::rc::Rc;

#[test]
fn add_and_remove_fire_their_callbacks() {
    let mut realm = Realm::new();
    let log = install_recording_hooks(&mut realm);

    let id = realm.add_model(Model::new());
    assert_eq!(log.borrow().added, 1);
    assert!(realm.is_registered(id));

    assert!(realm.remove_model(id));
    assert_eq!(log.borrow().removed, 1);
    assert!(!realm.is_registered(id));

    // Stale handle: no-op, no second callback.
    assert!(!realm.remove_model(id));
    assert_eq!(log.borrow().removed, 1);
}

#[test]
fn removed_handle_is_stale_inside_the_removal_callback() {
    let mut realm = Realm::new();
    let observed = Rc::new(RefCell::new(None));

    let seen = observed.clone();
    realm.on_model_removed(move |realm, id| {
        // The model is already gone; the id is identification only.
        *seen.borrow_mut() = Some(realm.is_registered(id));
    });

    let id = realm.add_model(Model::new());
    realm.remove_model(id);
    assert_eq!(*observed.borrow(), Some(false));
}

#[test]
fn slot_reuse_does_not_resurrect_old_handles() {
    let mut realm = Realm::new();
    let first = realm.add_model(slew_camera());
    realm.remove_model(first);

    let second = realm.add_model(slew_camera());
    assert_eq!(first.index(), second.index(), "slot should be reused");
    assert!(!realm.is_registered(first));
    assert!(realm.is_registered(second));
    assert!(realm.model(first).is_none());
}

#[test]
fn change_values_clips_and_respects_staleness() {
    let mut realm = Realm::new();
    let id = realm.add_model(Model::new());

    assert!(realm.change_values(id, &ModelPatch::new().throttle(5.0)));
    assert_relative_eq!(realm.model(id).unwrap().throttle(), 1.0);

    realm.remove_model(id);
    assert!(!realm.change_values(id, &ModelPatch::new().throttle(0.5)));
}

#[test]
fn undefine_disables_dependent_stages() {
    let mut realm = Realm::new();
    let id = realm.add_model(flying_airplane(1000.0, 60.0));

    realm.undefine(id, FieldMask::VELOCITY);
    assert!(!realm.model(id).unwrap().defines(FieldMask::VELOCITY));

    // With velocity undefined the propulsion stage skips the vehicle
    // entirely: position must not change.
    let before = realm.model(id).unwrap().position();
    realm.set_timing(1000);
    propulsion::apply(&mut realm, id);
    let after = realm.model(id).unwrap().position();
    assert_relative_eq!(after.x, before.x);
    assert_relative_eq!(after.y, before.y);
    assert_relative_eq!(after.z, before.z);
}

#[test]
fn removing_from_touch_down_callback_is_safe() {
    let mut realm = Realm::new();
    let checked_inside = Rc::new(RefCell::new(false));

    let flag = checked_inside.clone();
    realm.on_touch_down(move |realm, id, _impact| {
        assert!(realm.remove_model(id));
        // Deregistration is visible before the callback even returns.
        assert!(!realm.is_registered(id));
        *flag.borrow_mut() = true;
    });

    let mut model = flying_airplane(4.0, 40.0);
    model.apply(
        &ModelPatch::new()
            .velocity(Vector3::new(0.0, 40.0, -10.0))
            .airspeed(Vector3::new(0.0, 40.0, -10.0))
            .gear_down(true),
    );
    let id = realm.add_model(model);

    realm.set_timing(1000);
    let outcome = propulsion::apply(&mut realm, id);

    assert!(*checked_inside.borrow(), "touch-down callback must run");
    assert_eq!(
        outcome,
        StageOutcome::Removed,
        "the stage must tell the caller to abandon the model"
    );
    assert!(!realm.is_registered(id));
}

#[test]
fn removing_from_callback_mid_update_skips_later_stages() {
    let mut realm = Realm::new();

    realm.on_touch_down(move |realm, id, _| {
        realm.remove_model(id);
    });

    let mut model = flying_airplane(4.0, 40.0);
    model.apply(
        &ModelPatch::new()
            .velocity(Vector3::new(0.0, 40.0, -10.0))
            .airspeed(Vector3::new(0.0, 40.0, -10.0))
            // Hard rudder input that the control stage would apply if
            // it (incorrectly) ran after the removal.
            .heading_control(1.0)
            .gear_down(true),
    );
    let id = realm.add_model(model);

    // Must not panic or touch the removed model.
    realm.update(1000);
    assert!(!realm.is_registered(id));
    assert!(realm.is_empty());
}

#[test]
fn removing_from_overspeed_callback_is_safe() {
    let mut realm = Realm::new();

    realm.on_overspeed(move |realm, id, _, _, _| {
        realm.remove_model(id);
    });

    let id = realm.add_model(flying_airplane(1000.0, 130.0));
    realm.update(1000);
    assert!(!realm.is_registered(id));
}

#[test]
fn callback_may_add_models_during_update() {
    let mut realm = Realm::new();
    let spawned = Rc::new(RefCell::new(Vec::new()));

    let ids = spawned.clone();
    realm.on_overspeed(move |realm, _, _, _, _| {
        // Only spawn once.
        if ids.borrow().is_empty() {
            let id = realm.add_model(slew_camera());
            ids.borrow_mut().push(id);
        }
    });

    let fast = realm.add_model(flying_airplane(1000.0, 130.0));
    realm.update(1000);

    assert!(realm.is_registered(fast));
    assert_eq!(spawned.borrow().len(), 1);
    assert!(realm.is_registered(spawned.borrow()[0]));
    assert_eq!(realm.len(), 2);
}

#[test]
fn remove_all_models_one_by_one() {
    let mut realm = Realm::new();
    let log = install_recording_hooks(&mut realm);

    let ids: Vec<_> = (0..4).map(|_| realm.add_model(slew_camera())).collect();
    assert_eq!(realm.len(), 4);

    for id in ids {
        assert!(realm.remove_model(id));
    }
    assert!(realm.is_empty());
    assert_eq!(log.borrow().added, 4);
    assert_eq!(log.borrow().removed, 4);
}

#[test]
fn time_compression_scales_motion() {
    let distance_with = |compression: f64| -> f64 {
        let mut realm = Realm::new();
        realm.set_time_compression(compression);
        let id = realm.add_model(slew_camera());
        realm.change_values(id, &ModelPatch::new().pitch_control(0.5));
        realm.update(1000);
        realm.model(id).unwrap().position().y
    };

    let normal = distance_with(1.0);
    let double = distance_with(2.0);
    assert_relative_eq!(double, normal * 2.0, max_relative = 1e-9);
}

#[test]
fn negative_tick_is_treated_as_zero() {
    let mut realm = Realm::new();
    realm.set_timing(-250);
    assert_eq!(realm.clock().lapsed_ms(), 0);
    assert_relative_eq!(realm.clock().compensation(), 0.0);
}
