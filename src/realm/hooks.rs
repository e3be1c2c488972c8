//! Host notification callbacks.
//!
//! Each slot holds a boxed closure; host context travels in the
//! closure's captures. Callbacks are invoked synchronously from within
//! a force stage and receive the realm mutably, so a callback may
//! freely mutate models or remove the very model it is being notified
//! about — call sites re-validate the handle afterwards.

use super::{ModelId, Realm};

/// Callback taking the realm and the model concerned.
pub type ModelHook = Box<dyn FnMut(&mut Realm, ModelId)>;

/// Touch-down callback; the third argument is the impact severity
/// coefficient (1.0 = exactly at the crash-resistance threshold).
pub type TouchDownHook = Box<dyn FnMut(&mut Realm, ModelId, f64)>;

/// Overspeed callback; arguments are current speed, the expected
/// overspeed threshold and the structural overspeed limit, m/cycle.
pub type OverspeedHook = Box<dyn FnMut(&mut Realm, ModelId, f64, f64, f64)>;

/// Collision callback between two models, with an impact coefficient.
/// Reserved: no shipped stage fires it.
pub type CollisionHook = Box<dyn FnMut(&mut Realm, ModelId, ModelId, f64)>;

#[derive(Default)]
pub(crate) struct RealmHooks {
    pub model_added: Option<ModelHook>,
    /// Fired after removal; the handle is already stale and is passed
    /// for identification only.
    pub model_removed: Option<ModelHook>,
    pub airborne: Option<ModelHook>,
    pub touch_down: Option<TouchDownHook>,
    /// Fired when a landed model comes to rest.
    pub parked: Option<ModelHook>,
    pub overspeed: Option<OverspeedHook>,
    /// Installed through [`Realm::on_collision`]; reserved for hosts
    /// that resolve pairwise contact themselves.
    #[allow(dead_code)]
    pub collision: Option<CollisionHook>,
}

/// Take a hook slot, run it against the realm, and restore it unless
/// the callback installed a replacement while it ran.
macro_rules! fire_hook {
    ($realm:expr, $slot:ident, |$hook:ident| $call:expr) => {
        if let Some(mut $hook) = $realm.hooks.$slot.take() {
            $call;
            if $realm.hooks.$slot.is_none() {
                $realm.hooks.$slot = Some($hook);
            }
        }
    };
}

pub(crate) use fire_hook;
