pub mod beacon;
pub mod check;
pub mod types;

pub use beacon::{BeaconReading, BeaconRole, Ring, NON_CONTROL_BEACONS, TOTAL_BEACONS};
pub use check::{Technique, ViewabilityCheck, ViewabilityState};
pub use types::{Point, Rect, Viewport};
