use serde::{Deserialize, Serialize};
use sightline_protocol::{Rect, Viewport};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GeometryError {
    #[error("Failed to determine viewport")]
    ViewportUndetermined,
}

/// Raw viewport measurements from every source the page exposes.
///
/// Browsers disagree on which box represents the viewport: the body box,
/// the root element box, and the window-inner box can each be authoritative
/// depending on rendering mode, and the window-inner box may be inflated by
/// scrollbars. Any measurement may be absent or garbage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ViewportCandidates {
    pub body_width: Option<f64>,
    pub body_height: Option<f64>,
    pub root_width: Option<f64>,
    pub root_height: Option<f64>,
    pub inner_width: Option<f64>,
    pub inner_height: Option<f64>,
}

impl ViewportCandidates {
    /// Candidates with a single authoritative measurement, for embedders
    /// that already know their viewport exactly.
    pub fn exact(width: f64, height: f64) -> Self {
        Self {
            inner_width: Some(width),
            inner_height: Some(height),
            ..Self::default()
        }
    }
}

/// Result of a geometry measurement: the resolved viewport and the percent
/// of the object's area inside it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeometrySample {
    pub viewport: Viewport,
    pub percent_viewable: i32,
}

/// Resolve the viewport from candidate measurements.
///
/// The body box and then the root element box each override the running
/// value when finite and positive; the window-inner box is combined by
/// minimum, which discards scrollbar-inflated values. Width and height
/// resolve independently. Fails when no valid measurement exists for
/// either dimension.
pub fn resolve_viewport(candidates: &ViewportCandidates) -> Result<Viewport, GeometryError> {
    let mut width = f64::INFINITY;
    let mut height = f64::INFINITY;

    if let Some(v) = valid(candidates.body_width) {
        width = v;
    }
    if let Some(v) = valid(candidates.body_height) {
        height = v;
    }
    if let Some(v) = valid(candidates.root_width) {
        width = v;
    }
    if let Some(v) = valid(candidates.root_height) {
        height = v;
    }
    if let Some(v) = valid(candidates.inner_width) {
        width = width.min(v);
    }
    if let Some(v) = valid(candidates.inner_height) {
        height = height.min(v);
    }

    if width.is_infinite() || height.is_infinite() {
        return Err(GeometryError::ViewportUndetermined);
    }
    Ok(Viewport::new(width, height))
}

fn valid(candidate: Option<f64>) -> Option<f64> {
    candidate.filter(|v| v.is_finite() && *v > 0.0)
}

/// Percentage of `object`'s area inside the viewport, in [0, 100].
///
/// An object entirely outside the viewport short-circuits to 0 without any
/// area arithmetic. Otherwise the object is clamped to the viewport on
/// whole-pixel boundaries (ceil on the near edges, floor on the far edges,
/// edges inclusive) and the visible share is floored to an integer percent.
pub fn percent_viewable(viewport: Viewport, object: Rect) -> i32 {
    if object.bottom < 0.0
        || object.right < 0.0
        || object.top > viewport.height
        || object.left > viewport.width
    {
        return 0;
    }

    let total_area = object.area();
    if total_area <= 0.0 {
        return 0;
    }

    let x_min = object.left.max(0.0).ceil();
    let x_max = object.right.min(viewport.width).floor();
    let y_min = object.top.max(0.0).ceil();
    let y_max = object.bottom.min(viewport.height).floor();
    let visible_area = (x_max - x_min + 1.0) * (y_max - y_min + 1.0);

    let percent = (visible_area / total_area * 100.0).floor() as i32;
    percent.clamp(0, 100)
}

/// Full geometry technique: resolve the viewport, then measure the object
/// against it.
pub fn compute_visibility(
    candidates: &ViewportCandidates,
    object: Rect,
) -> Result<GeometrySample, GeometryError> {
    let viewport = resolve_viewport(candidates)?;
    Ok(GeometrySample {
        viewport,
        percent_viewable: percent_viewable(viewport, object),
    })
}
