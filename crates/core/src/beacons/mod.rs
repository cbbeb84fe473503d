//! Beacon pattern measurement: probe layout geometry and the tri-state
//! classifier that infers viewability from a fixed constellation of 13
//! sampled visibility points (plus one off-screen control point).

pub mod classify;
pub mod layout;

pub use classify::{Classification, DiagonalRule, classify};
pub use layout::{CONTROL_OFFSCREEN, beacon_positions};

use sightline_protocol::{BeaconReading, BeaconRole, TOTAL_BEACONS};

/// Readings for the whole constellation, ordered by role index.
pub type BeaconReadings = [BeaconReading; TOTAL_BEACONS];

/// Outer-corner pairs sharing an edge of the player (top, left, right,
/// bottom). Two visible adjacent corners plus a visible center imply the
/// half of the player between them is on screen.
pub(crate) const ADJACENT_OUTER_PAIRS: [(BeaconRole, BeaconRole); 4] = [
    (BeaconRole::OuterTopLeft, BeaconRole::OuterTopRight),
    (BeaconRole::OuterTopLeft, BeaconRole::OuterBottomLeft),
    (BeaconRole::OuterTopRight, BeaconRole::OuterBottomRight),
    (BeaconRole::OuterBottomLeft, BeaconRole::OuterBottomRight),
];
