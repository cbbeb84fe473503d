use sightline_protocol::{BeaconRole, Point, Rect};

use crate::geometry::ViewportCandidates;

/// State of one sample probe as reported by the embedding page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProbeState {
    /// Result of the probe's own visibility query, or `None` when the call
    /// failed. A failed call is treated as not viewable.
    pub viewable: Option<bool>,
    /// Whether the probe's container intersects the viewport at all.
    pub on_screen: bool,
}

impl ProbeState {
    pub fn new(viewable: Option<bool>, on_screen: bool) -> Self {
        Self { viewable, on_screen }
    }

    /// Visibility with a failed query treated as false.
    pub fn is_viewable(&self) -> bool {
        self.viewable.unwrap_or(false)
    }
}

/// Services the embedding page provides to the measurement core.
///
/// Probe creation, capability sniffing, and timer wiring all live on the
/// other side of this trait; the core only reads state through it and
/// signals disposal and impression start back through the hooks.
pub trait SamplingContext {
    /// Whether the asset is embedded in a foreign context (e.g. a
    /// cross-origin iframe). Geometry inspection is blocked when embedded.
    fn in_context(&self) -> bool;

    /// Whether the hosting page currently has focus, when determinable.
    fn page_in_focus(&self) -> Option<bool>;

    /// Whether the environment is capable of hosting sample probes at all.
    fn beacons_available(&self) -> bool;

    /// Raw viewport measurements from every available source.
    fn viewport_candidates(&self) -> ViewportCandidates;

    /// Bounding rectangle of the asset's player element, or `None` when the
    /// element cannot be resolved.
    fn player_rect(&self, asset_id: &str) -> Option<Rect>;

    /// Current state of one of the asset's probes, or `None` when the probe
    /// does not exist or cannot be reached.
    fn probe_state(&self, asset_id: &str, role: BeaconRole) -> Option<ProbeState>;

    /// Current page scroll offset, used when positioning probes.
    fn scroll_offset(&self) -> Point {
        Point::new(0.0, 0.0)
    }

    /// Remove the asset's probes from the page. Invoked during disposal.
    fn remove_probes(&self, _asset_id: &str) {}

    /// Impression timer hook, invoked once when the last measurement beacon
    /// reports ready.
    fn start_impression_timer(&self, _asset_id: &str) {}
}
