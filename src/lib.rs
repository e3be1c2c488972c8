//! A flight dynamics simulation engine for multi-vehicle flying games.
//!
//! The [`Realm`] owns a set of simulated vehicles ([`Model`]s) plus the
//! shared environment, cycle timing and host callbacks. Each external
//! tick advances every model through three force stages in order:
//! natural forces (drag, gravity exchange, leveling), propulsion and
//! ground contact, then pilot control inputs.
//!
//! ```
//! use airdyn::{Attitude, ModelConfig, ModelPatch, Realm};
//! use nalgebra::Vector3;
//!
//! let mut realm = Realm::new();
//! realm.on_touch_down(|_, id, impact| {
//!     println!("model {} touched down at {:.2}", id.index(), impact);
//! });
//!
//! let mut model = ModelConfig::patrol_airplane().build();
//! model.apply(
//!     &ModelPatch::new()
//!         .position(Vector3::new(0.0, 0.0, 900.0))
//!         .attitude(Attitude::default())
//!         .velocity(Vector3::new(0.0, 60.0, 0.0))
//!         .airspeed(Vector3::new(0.0, 60.0, 0.0))
//!         .ground_elevation(0.0)
//!         .landed(false)
//!         .stopped(false)
//!         .gear_down(true)
//!         .heading_control(0.0)
//!         .pitch_control(0.0)
//!         .bank_control(0.0)
//!         .throttle(0.7),
//! );
//! let id = realm.add_model(model);
//!
//! // One 16 ms frame.
//! realm.update(16);
//! assert!(realm.is_registered(id));
//! ```

pub mod environment;
pub mod model;
pub mod realm;
pub mod systems;
pub mod utils;

pub use environment::{air_density, Environment, Wind, WindFlags};
pub use model::{
    Attitude, CrashShape, FieldMask, GearType, GroundContact, Model, ModelConfig, ModelKind,
    ModelPatch, ModelSource, SpeedLimits, VehicleClass,
};
pub use realm::{CycleClock, FlightPhysicsLevel, ModelId, Realm};
pub use systems::{refresh_airspeed, StageOutcome};
pub use utils::ConfigError;
