use sightline_protocol::{NON_CONTROL_BEACONS, Rect};

/// A tracked ad placement.
///
/// Identifiers are externally assigned and assumed globally unique. The
/// asset records how many of its measurement beacons have reported ready
/// and the last player rectangle observed during probe placement, which is
/// used to decide whether probes need repositioning.
#[derive(Debug, Clone)]
pub struct Asset {
    id: String,
    beacons_started: usize,
    last_player_location: Option<Rect>,
    disposed: bool,
}

impl Asset {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            beacons_started: 0,
            last_player_location: None,
            disposed: false,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Number of non-control beacons that have reported ready.
    pub fn beacons_started(&self) -> usize {
        self.beacons_started
    }

    /// Whether every measurement beacon has reported ready at least once.
    pub fn beacons_ready(&self) -> bool {
        self.beacons_started >= NON_CONTROL_BEACONS
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub(crate) fn record_beacon_started(&mut self) -> usize {
        self.beacons_started += 1;
        self.beacons_started
    }

    /// Record the player's current location. Returns true when it differs
    /// from the last recorded one (probes need repositioning).
    pub(crate) fn update_player_location(&mut self, rect: Rect) -> bool {
        if self.last_player_location == Some(rect) {
            return false;
        }
        self.last_player_location = Some(rect);
        true
    }

    pub(crate) fn mark_disposed(&mut self) {
        self.disposed = true;
    }
}
