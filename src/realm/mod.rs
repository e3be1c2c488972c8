//! The realm: every simulated vehicle plus the shared environment,
//! cycle timing and host callbacks.

mod hooks;
mod registry;

pub use hooks::{CollisionHook, ModelHook, OverspeedHook, TouchDownHook};
pub use registry::ModelId;

use hooks::{fire_hook, RealmHooks};
use log::{debug, trace};
use registry::ModelRegistry;

use crate::environment::Environment;
use crate::model::{FieldMask, Model, ModelPatch};
use crate::systems::{self, StageOutcome};
use crate::utils::constants::CYCLE_MS;

/// How much of the rotor aerodynamics refinements to simulate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FlightPhysicsLevel {
    /// Thrust, drag and ground handling only.
    Simplified,
    /// Adds in-ground-effect lift and the translational-lift thrust
    /// penalty.
    Moderate,
    /// Adds transverse-flow and translational-lift attitude coupling
    /// and main-rotor torque drift.
    Realistic,
}

impl Default for FlightPhysicsLevel {
    fn default() -> Self {
        FlightPhysicsLevel::Moderate
    }
}

/// Cycle timing state.
///
/// The nominal cycle is one second of simulated time; the compensation
/// coefficient expresses how much real time the last tick covered as a
/// fraction of that cycle, and compression scales simulation speed on
/// top of it.
#[derive(Debug, Clone)]
pub struct CycleClock {
    lapsed_ms: i64,
    compensation: f64,
    compression: f64,
    elapsed_ms: i64,
}

impl Default for CycleClock {
    fn default() -> Self {
        Self {
            lapsed_ms: 0,
            compensation: 1.0,
            compression: 1.0,
            elapsed_ms: 0,
        }
    }
}

impl CycleClock {
    /// Duration of the last tick, milliseconds.
    pub fn lapsed_ms(&self) -> i64 {
        self.lapsed_ms
    }

    /// Ratio of the last tick to one nominal cycle.
    pub fn compensation(&self) -> f64 {
        self.compensation
    }

    /// Compensation clamped to at most one cycle, used by integrations
    /// that must not overshoot on a long tick.
    pub fn compensation_min(&self) -> f64 {
        self.compensation.min(1.0)
    }

    /// Simulation speed multiplier, independent of frame rate.
    pub fn compression(&self) -> f64 {
        self.compression
    }

    /// Compensation and compression folded together; the scale factor
    /// for most per-cycle deltas.
    pub fn scaled(&self) -> f64 {
        self.compensation * self.compression
    }

    /// Accumulated simulated time, seconds.
    pub fn elapsed_seconds(&self) -> f64 {
        self.elapsed_ms as f64 / 1000.0
    }

    fn advance(&mut self, lapsed_ms: i64) {
        let lapsed_ms = lapsed_ms.max(0);
        self.lapsed_ms = lapsed_ms;
        self.compensation = lapsed_ms as f64 / CYCLE_MS;
        self.elapsed_ms += lapsed_ms;
    }
}

/// The collection of simulated vehicles plus shared environment,
/// timing and host callbacks.
///
/// Models are advanced once per external tick through three force
/// stages in a fixed order: natural forces, then propulsion and ground
/// contact, then control inputs. Callbacks fire synchronously from
/// within the stages; a callback may remove the model it is being
/// notified about, and every call site re-validates the handle before
/// touching the model again.
#[derive(Default)]
pub struct Realm {
    registry: ModelRegistry,
    environment: Environment,
    clock: CycleClock,
    hooks: RealmHooks,
    physics_level: FlightPhysicsLevel,
}

impl Realm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    pub fn environment_mut(&mut self) -> &mut Environment {
        &mut self.environment
    }

    pub fn clock(&self) -> &CycleClock {
        &self.clock
    }

    pub fn physics_level(&self) -> FlightPhysicsLevel {
        self.physics_level
    }

    pub fn set_physics_level(&mut self, level: FlightPhysicsLevel) {
        self.physics_level = level;
    }

    /// Set the duration of the tick about to be simulated. Also
    /// refreshes the effective wind for the new simulated time.
    pub fn set_timing(&mut self, lapsed_ms: i64) {
        self.clock.advance(lapsed_ms);
        let elapsed = self.clock.elapsed_seconds();
        self.environment.wind.refresh(elapsed);
    }

    /// Simulation speed-up factor, clamped to >= 0.
    pub fn set_time_compression(&mut self, compression: f64) {
        self.clock.compression = compression.max(0.0);
    }

    /// Number of registered models.
    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.len() == 0
    }

    /// Register a model and fire the on-added callback. Returns the
    /// model's handle; note the callback may already have removed it.
    pub fn add_model(&mut self, model: Model) -> ModelId {
        let id = self.registry.insert(model);
        debug!("model {} registered", id.index());
        fire_hook!(self, model_added, |hook| hook(self, id));
        id
    }

    /// Deregister a model. The on-removed callback fires after the
    /// handle has gone stale, for identification only. Returns false
    /// for an already stale handle.
    pub fn remove_model(&mut self, id: ModelId) -> bool {
        if self.registry.remove(id).is_none() {
            return false;
        }
        debug!("model {} removed", id.index());
        fire_hook!(self, model_removed, |hook| hook(self, id));
        true
    }

    /// O(1) membership check; used defensively after any callback.
    #[inline]
    pub fn is_registered(&self, id: ModelId) -> bool {
        self.registry.contains(id)
    }

    pub fn model(&self, id: ModelId) -> Option<&Model> {
        self.registry.get(id)
    }

    pub(crate) fn model_mut(&mut self, id: ModelId) -> Option<&mut Model> {
        self.registry.get_mut(id)
    }

    /// Handles of all registered models, in slot order.
    pub fn model_ids(&self) -> Vec<ModelId> {
        self.registry.ids().collect()
    }

    /// Apply a partial update to a registered model. Control
    /// coefficients and physical magnitudes are clipped as documented
    /// on [`ModelPatch`]. No-op on a stale handle.
    pub fn change_values(&mut self, id: ModelId, patch: &ModelPatch) -> bool {
        match self.registry.get_mut(id) {
            Some(model) => {
                model.apply(patch);
                true
            }
            None => false,
        }
    }

    /// Clear capability bits on a registered model without touching the
    /// underlying storage.
    pub fn undefine(&mut self, id: ModelId, mask: FieldMask) {
        if let Some(model) = self.registry.get_mut(id) {
            model.undefine(mask);
        }
    }

    /// Advance every registered model by one tick of `lapsed_ms`
    /// milliseconds: natural forces, airspeed refresh, propulsion and
    /// ground contact, then control inputs.
    ///
    /// A model removed by a callback mid-update simply skips its
    /// remaining stages. Models added by a callback are first advanced
    /// on the next tick.
    pub fn update(&mut self, lapsed_ms: i64) {
        self.set_timing(lapsed_ms);

        for id in self.model_ids() {
            if !self.is_registered(id) {
                continue;
            }
            if systems::natural::apply(self, id) == StageOutcome::Removed {
                continue;
            }
            systems::refresh_airspeed(self, id);
            if systems::propulsion::apply(self, id) == StageOutcome::Removed {
                continue;
            }
            systems::control::apply(self, id);
        }
    }

    // Hook installers. Each replaces the previous hook in its slot.

    pub fn on_model_added(&mut self, hook: impl FnMut(&mut Realm, ModelId) + 'static) {
        self.hooks.model_added = Some(Box::new(hook));
    }

    pub fn on_model_removed(&mut self, hook: impl FnMut(&mut Realm, ModelId) + 'static) {
        self.hooks.model_removed = Some(Box::new(hook));
    }

    pub fn on_airborne(&mut self, hook: impl FnMut(&mut Realm, ModelId) + 'static) {
        self.hooks.airborne = Some(Box::new(hook));
    }

    pub fn on_touch_down(&mut self, hook: impl FnMut(&mut Realm, ModelId, f64) + 'static) {
        self.hooks.touch_down = Some(Box::new(hook));
    }

    pub fn on_parked(&mut self, hook: impl FnMut(&mut Realm, ModelId) + 'static) {
        self.hooks.parked = Some(Box::new(hook));
    }

    pub fn on_overspeed(&mut self, hook: impl FnMut(&mut Realm, ModelId, f64, f64, f64) + 'static) {
        self.hooks.overspeed = Some(Box::new(hook));
    }

    /// Reserved extension point; no shipped stage fires this.
    pub fn on_collision(&mut self, hook: impl FnMut(&mut Realm, ModelId, ModelId, f64) + 'static) {
        self.hooks.collision = Some(Box::new(hook));
    }

    // Stage-side hook firing. Callers must re-validate `id` afterwards.

    pub(crate) fn fire_airborne(&mut self, id: ModelId) {
        trace!("model {} airborne", id.index());
        fire_hook!(self, airborne, |hook| hook(self, id));
    }

    pub(crate) fn fire_touch_down(&mut self, id: ModelId, impact_coeff: f64) {
        trace!("model {} touched down, impact {:.3}", id.index(), impact_coeff);
        fire_hook!(self, touch_down, |hook| hook(self, id, impact_coeff));
    }

    pub(crate) fn fire_parked(&mut self, id: ModelId) {
        trace!("model {} parked", id.index());
        fire_hook!(self, parked, |hook| hook(self, id));
    }

    pub(crate) fn fire_overspeed(&mut self, id: ModelId, current: f64, expected: f64, actual: f64) {
        fire_hook!(self, overspeed, |hook| hook(self, id, current, expected, actual));
    }
}
