use sightline_protocol::{BeaconRole, NON_CONTROL_BEACONS, Ring};

use super::{ADJACENT_OUTER_PAIRS, BeaconReadings};

/// How to evaluate the inner-top-left term of the top-left/bottom-right
/// diagonal coverage test.
///
/// Deployed measurements historically left that term vacuous (it could
/// never contribute to an unmeasurable verdict), and downstream consumers
/// may depend on the verdicts it produces. `Literal` reproduces that
/// behavior; `Corrected` tests the actual reading, symmetric with the
/// other diagonal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DiagonalRule {
    #[default]
    Literal,
    Corrected,
}

/// Verdict of the pattern classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Not every measurement beacon has reported ready.
    NotReady,
    Viewable,
    Unviewable,
    /// The constellation is contradictory; no determination possible.
    Unmeasurable,
}

/// Infer viewability from the beacon constellation.
///
/// Decision order, after the readiness precondition:
/// 1. All 13 measurement points visible → viewable.
/// 2. Center invisible: three or more visible corners within any single
///    ring contradict it → unmeasurable; otherwise unviewable.
/// 3. Center visible: two visible adjacent outer corners, or all four
///    middle corners, → viewable.
/// 4. A visible diagonal outer pair whose crossing five-point run
///    (matching middle, matching inner, center, opposite inner, opposite
///    middle) is not fully visible → unmeasurable.
/// 5. Otherwise unviewable.
pub fn classify(readings: &BeaconReadings, rule: DiagonalRule) -> Classification {
    if BeaconRole::ALL
        .iter()
        .skip(1)
        .any(|role| !readings[role.index()].is_known())
    {
        return Classification::NotReady;
    }

    let visible = |role: BeaconRole| readings[role.index()].is_visible();
    let ring_visible = |ring: Ring| {
        BeaconRole::ALL
            .iter()
            .filter(|role| role.ring() == Some(ring) && visible(**role))
            .count()
    };

    let visible_count = BeaconRole::ALL
        .iter()
        .skip(1)
        .filter(|role| visible(**role))
        .count();
    if visible_count == NON_CONTROL_BEACONS {
        return Classification::Viewable;
    }

    if !visible(BeaconRole::Center) {
        if ring_visible(Ring::Inner) >= 3
            || ring_visible(Ring::Middle) >= 3
            || ring_visible(Ring::Outer) >= 3
        {
            return Classification::Unmeasurable;
        }
        return Classification::Unviewable;
    }

    // Center is visible from here on.

    if ADJACENT_OUTER_PAIRS
        .iter()
        .any(|(a, b)| visible(*a) && visible(*b))
    {
        return Classification::Viewable;
    }

    if ring_visible(Ring::Middle) == 4 {
        return Classification::Viewable;
    }

    // Top-left / bottom-right diagonal with a gap along its run.
    if visible(BeaconRole::OuterTopLeft) && visible(BeaconRole::OuterBottomRight) {
        let inner_top_left_covered = match rule {
            // Vacuous under the literal rule; see DiagonalRule.
            DiagonalRule::Literal => false,
            DiagonalRule::Corrected => !visible(BeaconRole::InnerTopLeft),
        };
        if !visible(BeaconRole::MiddleTopLeft)
            || inner_top_left_covered
            || !visible(BeaconRole::Center)
            || !visible(BeaconRole::InnerBottomRight)
            || !visible(BeaconRole::MiddleBottomRight)
        {
            return Classification::Unmeasurable;
        }
    }

    // Bottom-left / top-right diagonal with a gap along its run.
    if visible(BeaconRole::OuterBottomLeft)
        && visible(BeaconRole::OuterTopRight)
        && (!visible(BeaconRole::MiddleBottomLeft)
            || !visible(BeaconRole::InnerBottomLeft)
            || !visible(BeaconRole::Center)
            || !visible(BeaconRole::InnerTopRight)
            || !visible(BeaconRole::MiddleTopRight))
    {
        return Classification::Unmeasurable;
    }

    Classification::Unviewable
}
