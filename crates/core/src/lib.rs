//! Viewability measurement for embedded ad players.
//!
//! Determines whether a rectangular player is "viewable" — at least 50% of
//! its area intersecting the visible viewport — using two independent
//! techniques: direct geometric intersection when the player's rectangle can
//! be inspected, and a 13-point beacon pattern classifier when it cannot
//! (e.g. cross-context embedding). Results are immutable snapshots published
//! over an event bus with bounded replay buffering so loosely coupled
//! observers can poll or subscribe.
//!
//! The embedding page supplies probes, element rectangles, and focus state
//! through the [`SamplingContext`] trait; everything here is synchronous and
//! single-threaded, driven by external polling.

pub mod asset;
pub mod beacons;
pub mod bus;
pub mod context;
pub mod geometry;
pub mod orchestrator;
pub mod registry;
pub mod tracker;

pub use asset::Asset;
pub use beacons::{Classification, DiagonalRule};
pub use bus::{Event, EventBus};
pub use context::{ProbeState, SamplingContext};
pub use geometry::ViewportCandidates;
pub use orchestrator::{CheckConfig, Orchestrator};
pub use registry::AssetRegistry;
pub use tracker::{CHECK_EVENT, Tracker};
