use serde::{Deserialize, Serialize};

use crate::beacon::{BeaconReading, TOTAL_BEACONS};

/// Verdict of a viewability check.
///
/// `Viewable` means at least 50% of the player's area intersected the
/// viewport; `Unviewable` means less than 50%; `Unmeasurable` means no
/// determination could be made; `NotReady` means the beacon technique was
/// selected but not all beacons had reported ready yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewabilityState {
    NotReady,
    Viewable,
    Unviewable,
    Unmeasurable,
}

/// Which measurement technique produced the verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Technique {
    #[serde(rename = "geometry")]
    Geometry,
    #[serde(rename = "beacon")]
    Beacon,
    /// No single technique: either the check failed before one was chosen,
    /// or comparison mode ran both.
    #[default]
    #[serde(rename = "")]
    None,
}

/// Immutable snapshot of one viewability check.
///
/// Numeric fields default to -1 when they could not be computed, and
/// `error` is empty when no failure occurred. The `beacons` array is
/// ordered by beacon role index; index 0 is the control beacon and is
/// expected to read invisible.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewabilityCheck {
    /// Identifier of the measured asset.
    pub id: String,
    /// Resolved viewport width, or -1.
    pub client_width: f64,
    /// Resolved viewport height, or -1.
    pub client_height: f64,
    /// Player rectangle edges relative to the viewport, or -1 each.
    pub obj_top: f64,
    pub obj_left: f64,
    pub obj_bottom: f64,
    pub obj_right: f64,
    /// Percentage of the player inside the viewport, in [0, 100], or -1
    /// when not computed.
    pub percent_viewable: i32,
    pub viewability_state: ViewabilityState,
    pub technique: Technique,
    /// Per-beacon readings, ordered by role index.
    pub beacons: [BeaconReading; TOTAL_BEACONS],
    /// Description of any failure; empty when none.
    pub error: String,
    /// Whether the hosting page had focus, when known.
    pub focus: Option<bool>,
    /// Whether the asset is embedded in a foreign context (e.g. an iframe).
    pub in_context: bool,
    pub geometry_supported: Option<bool>,
    pub beacons_supported: Option<bool>,
    /// Geometry technique sub-result; populated in comparison mode only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geometry_viewability_state: Option<ViewabilityState>,
    /// Beacon technique sub-result; populated in comparison mode only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub beacon_viewability_state: Option<ViewabilityState>,
}

impl ViewabilityCheck {
    /// A fresh snapshot for an asset, with every measurement unset.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            client_width: -1.0,
            client_height: -1.0,
            obj_top: -1.0,
            obj_left: -1.0,
            obj_bottom: -1.0,
            obj_right: -1.0,
            percent_viewable: -1,
            viewability_state: ViewabilityState::Unmeasurable,
            technique: Technique::None,
            beacons: [BeaconReading::Unknown; TOTAL_BEACONS],
            error: String::new(),
            focus: None,
            in_context: false,
            geometry_supported: None,
            beacons_supported: None,
            geometry_viewability_state: None,
            beacon_viewability_state: None,
        }
    }
}
