use serde::{Deserialize, Serialize};

/// Number of measurement beacons (everything except the control beacon).
pub const NON_CONTROL_BEACONS: usize = 13;

/// Total beacon count including the off-screen control beacon.
pub const TOTAL_BEACONS: usize = 14;

/// One of the three concentric rings of corner beacons around the player.
///
/// The middle ring bounds a region covering 50% of the player's area; the
/// inner ring bounds a region such that the area outside two of its sides
/// is 50% of the player's area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Ring {
    Outer,
    Middle,
    Inner,
}

/// Fixed role of a sample beacon within the measurement constellation.
///
/// Indices are part of the wire protocol: the `beacons` array on a
/// [`ViewabilityCheck`](crate::ViewabilityCheck) is ordered by role index,
/// with index 0 reserved for the control beacon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BeaconRole {
    /// Placed far off screen; expected to never be viewable. Validates
    /// that the sampling technique itself behaves correctly.
    Control,
    /// Placed at the player's centroid.
    Center,
    OuterTopLeft,
    OuterTopRight,
    OuterBottomLeft,
    OuterBottomRight,
    MiddleTopLeft,
    MiddleTopRight,
    MiddleBottomLeft,
    MiddleBottomRight,
    InnerTopLeft,
    InnerTopRight,
    InnerBottomLeft,
    InnerBottomRight,
}

impl BeaconRole {
    /// All roles in index order.
    pub const ALL: [BeaconRole; TOTAL_BEACONS] = [
        BeaconRole::Control,
        BeaconRole::Center,
        BeaconRole::OuterTopLeft,
        BeaconRole::OuterTopRight,
        BeaconRole::OuterBottomLeft,
        BeaconRole::OuterBottomRight,
        BeaconRole::MiddleTopLeft,
        BeaconRole::MiddleTopRight,
        BeaconRole::MiddleBottomLeft,
        BeaconRole::MiddleBottomRight,
        BeaconRole::InnerTopLeft,
        BeaconRole::InnerTopRight,
        BeaconRole::InnerBottomLeft,
        BeaconRole::InnerBottomRight,
    ];

    /// Stable wire index of this role.
    pub fn index(self) -> usize {
        match self {
            BeaconRole::Control => 0,
            BeaconRole::Center => 1,
            BeaconRole::OuterTopLeft => 2,
            BeaconRole::OuterTopRight => 3,
            BeaconRole::OuterBottomLeft => 4,
            BeaconRole::OuterBottomRight => 5,
            BeaconRole::MiddleTopLeft => 6,
            BeaconRole::MiddleTopRight => 7,
            BeaconRole::MiddleBottomLeft => 8,
            BeaconRole::MiddleBottomRight => 9,
            BeaconRole::InnerTopLeft => 10,
            BeaconRole::InnerTopRight => 11,
            BeaconRole::InnerBottomLeft => 12,
            BeaconRole::InnerBottomRight => 13,
        }
    }

    /// Role for a wire index, if in range.
    pub fn from_index(index: usize) -> Option<BeaconRole> {
        BeaconRole::ALL.get(index).copied()
    }

    /// Which ring this role belongs to, if it is a corner beacon.
    pub fn ring(self) -> Option<Ring> {
        match self {
            BeaconRole::Control | BeaconRole::Center => None,
            BeaconRole::OuterTopLeft
            | BeaconRole::OuterTopRight
            | BeaconRole::OuterBottomLeft
            | BeaconRole::OuterBottomRight => Some(Ring::Outer),
            BeaconRole::MiddleTopLeft
            | BeaconRole::MiddleTopRight
            | BeaconRole::MiddleBottomLeft
            | BeaconRole::MiddleBottomRight => Some(Ring::Middle),
            BeaconRole::InnerTopLeft
            | BeaconRole::InnerTopRight
            | BeaconRole::InnerBottomLeft
            | BeaconRole::InnerBottomRight => Some(Ring::Inner),
        }
    }
}

/// Visibility reading of a single beacon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BeaconReading {
    Visible,
    Invisible,
    /// The beacon has not reported ready yet.
    #[default]
    Unknown,
}

impl BeaconReading {
    pub fn is_visible(self) -> bool {
        self == BeaconReading::Visible
    }

    pub fn is_known(self) -> bool {
        self != BeaconReading::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_indices_round_trip() {
        for (i, role) in BeaconRole::ALL.iter().enumerate() {
            assert_eq!(role.index(), i);
            assert_eq!(BeaconRole::from_index(i), Some(*role));
        }
        assert_eq!(BeaconRole::from_index(TOTAL_BEACONS), None);
    }

    #[test]
    fn ring_membership() {
        assert_eq!(BeaconRole::Control.ring(), None);
        assert_eq!(BeaconRole::Center.ring(), None);
        assert_eq!(BeaconRole::OuterBottomRight.ring(), Some(Ring::Outer));
        assert_eq!(BeaconRole::MiddleTopLeft.ring(), Some(Ring::Middle));
        assert_eq!(BeaconRole::InnerBottomLeft.ring(), Some(Ring::Inner));
        let corners = BeaconRole::ALL.iter().filter(|r| r.ring().is_some()).count();
        assert_eq!(corners, 12);
    }
}
