use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use crate::error::GatewayError;
use crate::gateways::IssueGateway;
use crate::models::{ItemDetail, ItemReference};

/// Thread-safe in-memory issue tracker for tests and offline runs
#[derive(Debug, Clone, Default)]
pub struct InMemoryTracker {
    state: Arc<RwLock<TrackerState>>,
}

#[derive(Debug, Default)]
struct TrackerState {
    items: HashMap<ItemReference, ItemDetail>,
    fetch_counts: HashMap<ItemReference, usize>,
    fetch_failures: HashMap<ItemReference, GatewayError>,
    append_failures: HashMap<ItemReference, GatewayError>,
    appended: Vec<(ItemReference, String)>,
}

impl InMemoryTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`insert`](Self::insert)
    pub fn with_item(self, reference: ItemReference, detail: ItemDetail) -> Self {
        self.insert(reference, detail);
        self
    }

    pub fn insert(&self, reference: ItemReference, detail: ItemDetail) {
        self.write().items.insert(reference, detail);
    }

    /// Make every fetch of `reference` fail with `error`
    pub fn fail_fetch(&self, reference: ItemReference, error: GatewayError) {
        self.write().fetch_failures.insert(reference, error);
    }

    /// Make every append to `reference` fail with `error`
    pub fn fail_append(&self, reference: ItemReference, error: GatewayError) {
        self.write().append_failures.insert(reference, error);
    }

    /// Current detail of an item, including appended comments
    pub fn detail(&self, reference: &ItemReference) -> Option<ItemDetail> {
        self.read().items.get(reference).cloned()
    }

    /// Number of fetch attempts for `reference`, failed ones included
    pub fn fetch_count(&self, reference: &ItemReference) -> usize {
        self.read().fetch_counts.get(reference).copied().unwrap_or(0)
    }

    /// Every successful append, in call order
    pub fn appended(&self) -> Vec<(ItemReference, String)> {
        self.read().appended.clone()
    }

    fn read(&self) -> RwLockReadGuard<'_, TrackerState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, TrackerState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl IssueGateway for InMemoryTracker {
    async fn fetch_detail(&self, reference: &ItemReference) -> Result<ItemDetail, GatewayError> {
        let mut state = self.write();
        *state.fetch_counts.entry(reference.clone()).or_default() += 1;

        if let Some(error) = state.fetch_failures.get(reference) {
            return Err(error.clone());
        }

        state
            .items
            .get(reference)
            .cloned()
            .ok_or_else(|| GatewayError::NotFound(reference.to_string()))
    }

    async fn append_comment(
        &self,
        reference: &ItemReference,
        text: &str,
    ) -> Result<(), GatewayError> {
        let mut state = self.write();

        if let Some(error) = state.append_failures.get(reference) {
            return Err(error.clone());
        }

        let item = state
            .items
            .get_mut(reference)
            .ok_or_else(|| GatewayError::NotFound(reference.to_string()))?;
        item.comments.push(text.to_string());

        state.appended.push((reference.clone(), text.to_string()));
        Ok(())
    }
}
