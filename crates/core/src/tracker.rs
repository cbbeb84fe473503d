use std::cell::RefCell;

use serde_json::Value;
use sightline_protocol::{BeaconRole, Point, TOTAL_BEACONS, ViewabilityCheck};

use crate::asset::Asset;
use crate::bus::{Callback, EventBus};
use crate::context::SamplingContext;
use crate::orchestrator::{CheckConfig, Orchestrator};
use crate::registry::{AssetRegistry, SharedAsset};

/// Event kind published after every viewability check, carrying the
/// serialized snapshot as payload.
pub const CHECK_EVENT: &str = "check";

/// Session-scoped context object owning the event bus, the asset registry,
/// and the orchestrator.
///
/// One tracker corresponds to one hosting page; embedders hold it for the
/// page's lifetime and drive it from their polling loop. All methods are
/// synchronous and re-entrancy safe (a bus callback may call back into the
/// tracker).
pub struct Tracker {
    bus: EventBus,
    registry: RefCell<AssetRegistry>,
    orchestrator: Orchestrator,
}

impl Tracker {
    pub fn new(config: CheckConfig) -> Self {
        Self {
            bus: EventBus::new(),
            registry: RefCell::new(AssetRegistry::new()),
            orchestrator: Orchestrator::new(config),
        }
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Register an asset for tracking. Idempotent per id: re-registering
    /// an existing id returns the original asset unchanged.
    pub fn add_asset(&self, asset: Asset) -> SharedAsset {
        self.registry.borrow_mut().add(asset)
    }

    pub fn remove_asset(&self, id: &str) -> Option<SharedAsset> {
        self.registry.borrow_mut().remove(id)
    }

    pub fn asset_by_id(&self, id: &str) -> Option<SharedAsset> {
        self.registry.borrow().get(id)
    }

    /// The most recently registered asset, for callers that track a single
    /// placement.
    pub fn most_recent_asset(&self) -> Option<SharedAsset> {
        self.registry.borrow().most_recent()
    }

    /// Snapshot of every tracked asset; a fresh container each call.
    pub fn assets(&self) -> Vec<SharedAsset> {
        self.registry.borrow().all()
    }

    /// Subscribe to event kinds for one asset. See [`EventBus::subscribe`].
    pub fn subscribe(&self, kinds: &[&str], asset_id: &str, callback: Callback, replay: bool) {
        self.bus.subscribe(kinds, asset_id, callback, replay);
    }

    /// Publish an event for one asset. See [`EventBus::publish`].
    pub fn publish(&self, kind: &str, asset_id: &str, payload: Value) {
        self.bus.publish(kind, asset_id, payload);
    }

    /// Run a viewability check for an asset and publish the snapshot on
    /// the bus under [`CHECK_EVENT`]. `None` when the id is unknown.
    pub fn check_viewability(
        &self,
        id: &str,
        ctx: &dyn SamplingContext,
    ) -> Option<ViewabilityCheck> {
        let asset = self.asset_by_id(id)?;
        let check = {
            let asset = asset.borrow();
            self.orchestrator.check(&asset, ctx)
        };
        let payload = serde_json::to_value(&check).unwrap_or(Value::Null);
        self.bus.publish(CHECK_EVENT, id, payload);
        Some(check)
    }

    /// Probe-readiness notification for an asset's beacon.
    pub fn beacon_started(&self, id: &str, role: BeaconRole, ctx: &dyn SamplingContext) {
        if let Some(asset) = self.asset_by_id(id) {
            self.orchestrator
                .beacon_started(&mut asset.borrow_mut(), role, ctx);
        }
    }

    /// Probe positions to apply if the asset's player moved since the last
    /// placement. See [`Orchestrator::reposition`].
    pub fn reposition_probes(
        &self,
        id: &str,
        ctx: &dyn SamplingContext,
        probe_size: f64,
    ) -> Option<[Point; TOTAL_BEACONS]> {
        let asset = self.asset_by_id(id)?;
        let mut asset = asset.borrow_mut();
        self.orchestrator.reposition(&mut asset, ctx, probe_size)
    }

    /// Dispose an asset: tear down its probes and stop tracking it.
    /// Idempotent; unknown ids are ignored.
    pub fn dispose(&self, id: &str, ctx: &dyn SamplingContext) {
        if let Some(asset) = self.asset_by_id(id) {
            let mut registry = self.registry.borrow_mut();
            self.orchestrator
                .dispose(&mut asset.borrow_mut(), ctx, &mut registry);
        }
    }
}
