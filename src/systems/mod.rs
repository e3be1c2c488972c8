//! The per-cycle force stages.
//!
//! Stages never call one another; the realm's update loop (or a host
//! driving stages itself) sequences them as natural forces, airspeed
//! refresh, propulsion/ground contact, then control inputs. Each stage
//! reports whether a notification callback removed the model so the
//! caller can abandon its remaining stages for this cycle.

pub mod control;
pub mod natural;
pub mod propulsion;

use crate::model::FieldMask;
use crate::realm::{ModelId, Realm};
use crate::utils::math::ortho_rotate_2d;

/// What became of a model during a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageOutcome {
    /// Still registered; later stages may proceed.
    Active,
    /// A callback removed the model; it must not be touched again this
    /// cycle.
    Removed,
}

/// Recompute the airspeed vector from the velocity vector and the
/// realm's current wind.
///
/// Velocity is vehicle-relative, so the world wind is rotated by the
/// negative heading before subtraction. Vertical wind is not modeled;
/// the vertical airspeed component is the vertical velocity itself.
pub fn refresh_airspeed(realm: &mut Realm, id: ModelId) {
    let wind = realm.environment().wind.current();
    let Some(model) = realm.model_mut(id) else {
        return;
    };
    if !model.defines(FieldMask::VELOCITY | FieldMask::AIRSPEED) {
        return;
    }

    let (wind_x, wind_y) = ortho_rotate_2d(-model.attitude.heading, wind.x, wind.y);
    model.airspeed.x = model.velocity.x - wind_x;
    model.airspeed.y = model.velocity.y - wind_y;
    model.airspeed.z = model.velocity.z;
}
