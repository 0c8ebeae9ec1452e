use std::sync::Arc;

use waggle_db::Database;
use waggle_gateway::dispatcher::Dispatcher;
use waggle_storage::Storage;

pub type AppState = Arc<AppStateInner>;

/// Shared state handed to every handler.
pub struct AppStateInner {
    pub db: Arc<Database>,
    pub storage: Storage,
    pub dispatcher: Dispatcher,
    /// Days before a passed profile shows up in discovery again.
    pub reappear_days: u32,
}
