pub use cgmath;
pub use policy::{DecisionInput, DefaultPolicy, Policy};
pub use sensor::{SensorArray, SensorReadings};
pub use simulation::Simulation;
use slotmap::{new_key_type, SlotMap};
pub use slotmap::{Key, KeyData};
pub use track::{Track, TrackError};
pub use util::Interval;
pub use vehicle::{StepError, StepOutcome, Utility, Vehicle, VehicleAttributes};

mod debug;
pub mod math;
mod policy;
mod sensor;
mod simulation;
mod track;
mod util;
mod vehicle;

new_key_type! {
    /// Unique ID of a [Vehicle].
    pub struct VehicleId;
}

type VehicleSet = SlotMap<VehicleId, Vehicle>;
