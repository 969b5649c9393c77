use std::sync::Arc;

use shared::domain::RestaurantDirectory;
use storage::Storage;
use tokio::sync::watch;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) storage: Storage,
    /// Latest directory snapshot, republished by the refresh task.
    pub(crate) directory: watch::Receiver<Arc<RestaurantDirectory>>,
}

impl AppState {
    pub(crate) fn directory(&self) -> Arc<RestaurantDirectory> {
        self.directory.borrow().clone()
    }
}
