//! Shared application state.

use std::sync::Arc;

use engine::{OrderEngine, RestockEngine};
use store::Store;

/// Shared application state accessible from all handlers.
///
/// Both engines wrap clones of the same store handle; the store is the only
/// point of coordination between concurrent requests.
pub struct AppState<S: Store> {
    pub store: S,
    pub orders: OrderEngine<S>,
    pub restock: RestockEngine<S>,
}

impl<S: Store + Clone> AppState<S> {
    pub fn new(store: S, checkout_conflict_retries: u32) -> Arc<Self> {
        Arc::new(Self {
            orders: OrderEngine::new(store.clone())
                .with_conflict_retries(checkout_conflict_retries),
            restock: RestockEngine::new(store.clone()),
            store,
        })
    }
}
