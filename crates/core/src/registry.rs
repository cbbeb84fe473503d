use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::asset::Asset;

/// Shared handle to a tracked asset. Single-threaded interior mutability:
/// probe-readiness notifications mutate the asset while the registry and
/// subscribers hold handles to it.
pub type SharedAsset = Rc<RefCell<Asset>>;

/// Every asset known to the tracker, keyed by id, plus a convenience
/// handle to the most recently registered one.
#[derive(Default)]
pub struct AssetRegistry {
    assets: HashMap<String, SharedAsset>,
    most_recent: Option<SharedAsset>,
}

impl AssetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an asset. Duplicate registration with the same id is a
    /// no-op: the originally registered asset stays in place and is
    /// returned, and the most-recent handle is left untouched.
    pub fn add(&mut self, asset: Asset) -> SharedAsset {
        if let Some(existing) = self.assets.get(asset.id()) {
            return existing.clone();
        }
        let id = asset.id().to_string();
        let shared = Rc::new(RefCell::new(asset));
        self.assets.insert(id, shared.clone());
        self.most_recent = Some(shared.clone());
        shared
    }

    /// Remove an asset by id, clearing the most-recent handle if it
    /// pointed at the removed asset.
    pub fn remove(&mut self, id: &str) -> Option<SharedAsset> {
        let removed = self.assets.remove(id);
        if let Some(removed_asset) = &removed
            && self
                .most_recent
                .as_ref()
                .is_some_and(|asset| Rc::ptr_eq(asset, removed_asset))
        {
            self.most_recent = None;
        }
        removed
    }

    pub fn get(&self, id: &str) -> Option<SharedAsset> {
        self.assets.get(id).cloned()
    }

    /// Handle to the most recently registered asset.
    pub fn most_recent(&self) -> Option<SharedAsset> {
        self.most_recent.clone()
    }

    /// Snapshot of all tracked assets. A fresh container on every call, so
    /// callers can iterate while the registry is mutated.
    pub fn all(&self) -> Vec<SharedAsset> {
        self.assets.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}
