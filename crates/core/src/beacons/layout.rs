use sightline_protocol::{BeaconRole, Point, Rect, Ring, TOTAL_BEACONS};

/// Where the control probe is parked. Far enough off screen that it can
/// never be viewable in any sane environment.
pub const CONTROL_OFFSCREEN: Point = Point {
    x: -100_000.0,
    y: -100_000.0,
};

const SQRT_2: f64 = std::f64::consts::SQRT_2;

/// Target positions for every probe, in page coordinates.
///
/// The middle ring's corners sit on a square scaled by `1/√2` centered on
/// the player (bounding 50% of its area); the inner ring's on a square
/// scaled by `1/(1+√2)`. Outer probes are tucked inside the player's
/// bounding box; middle and inner probes are shifted by half the probe
/// footprint so the footprint is centered on its target point.
pub fn beacon_positions(player: Rect, scroll: Point, probe_size: f64) -> [Point; TOTAL_BEACONS] {
    let width = player.width();
    let height = player.height();

    let middle_width = width / SQRT_2;
    let middle_height = height / SQRT_2;
    let inner_width = width / (1.0 + SQRT_2);
    let inner_height = height / (1.0 + SQRT_2);

    let base_left = player.left + scroll.x;
    let base_top = player.top + scroll.y;

    BeaconRole::ALL.map(|role| {
        let (mut left, mut top) = match role {
            BeaconRole::Control => return CONTROL_OFFSCREEN,
            BeaconRole::Center => (
                base_left + (width - probe_size) / 2.0,
                base_top + (height - probe_size) / 2.0,
            ),
            BeaconRole::OuterTopLeft => (base_left, base_top),
            BeaconRole::OuterTopRight => (base_left + width - probe_size, base_top),
            BeaconRole::OuterBottomLeft => (base_left, base_top + height - probe_size),
            BeaconRole::OuterBottomRight => (
                base_left + width - probe_size,
                base_top + height - probe_size,
            ),
            BeaconRole::MiddleTopLeft => (
                base_left + (width - middle_width) / 2.0,
                base_top + (height - middle_height) / 2.0,
            ),
            BeaconRole::MiddleTopRight => (
                base_left + (width - middle_width) / 2.0 + middle_width,
                base_top + (height - middle_height) / 2.0,
            ),
            BeaconRole::MiddleBottomLeft => (
                base_left + (width - middle_width) / 2.0,
                base_top + (height - middle_height) / 2.0 + middle_height,
            ),
            BeaconRole::MiddleBottomRight => (
                base_left + (width - middle_width) / 2.0 + middle_width,
                base_top + (height - middle_height) / 2.0 + middle_height,
            ),
            BeaconRole::InnerTopLeft => (
                base_left + (width - inner_width) / 2.0,
                base_top + (height - inner_height) / 2.0,
            ),
            BeaconRole::InnerTopRight => (
                base_left + (width - inner_width) / 2.0 + inner_width,
                base_top + (height - inner_height) / 2.0,
            ),
            BeaconRole::InnerBottomLeft => (
                base_left + (width - inner_width) / 2.0,
                base_top + (height - inner_height) / 2.0 + inner_height,
            ),
            BeaconRole::InnerBottomRight => (
                base_left + (width - inner_width) / 2.0 + inner_width,
                base_top + (height - inner_height) / 2.0 + inner_height,
            ),
        };

        // Middle and inner probes target a geometric point, not a corner of
        // the box, so the footprint is centered on it.
        if matches!(role.ring(), Some(Ring::Middle | Ring::Inner)) {
            left -= probe_size / 2.0;
            top -= probe_size / 2.0;
        }

        Point::new(left, top)
    })
}
