// ABOUTME: A deployment target: name, connection type, opaque transport settings.
// ABOUTME: Caches at most one live connection adapter per host per process.

use crate::connection::ConnectionAdapter;
use parking_lot::Mutex;
use std::sync::Arc;

/// One deployment target reachable through a single connection type.
///
/// The adapter is created lazily by the `ConnectionManager` on first use and
/// cached here; it stays attached until an explicit disconnect or process
/// exit, never reconnecting mid-pipeline implicitly.
pub struct Host {
    name: String,
    connection_type: String,
    settings: serde_yaml::Value,
    connection: Mutex<Option<Arc<dyn ConnectionAdapter>>>,
}

impl std::fmt::Debug for Host {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Host")
            .field("name", &self.name)
            .field("connection_type", &self.connection_type)
            .field("has_connection", &self.has_connection())
            .finish()
    }
}

impl Host {
    pub fn new(
        name: impl Into<String>,
        connection_type: impl Into<String>,
        settings: serde_yaml::Value,
    ) -> Self {
        Self {
            name: name.into(),
            connection_type: connection_type.into(),
            settings,
            connection: Mutex::new(None),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn connection_type(&self) -> &str {
        &self.connection_type
    }

    /// Transport-specific settings, opaque to the pipeline core.
    pub fn settings(&self) -> &serde_yaml::Value {
        &self.settings
    }

    /// Pure query: never triggers connection establishment.
    pub fn has_connection(&self) -> bool {
        self.connection.lock().is_some()
    }

    pub fn connection(&self) -> Option<Arc<dyn ConnectionAdapter>> {
        self.connection.lock().as_ref().map(Arc::clone)
    }

    pub(crate) fn set_connection(&self, adapter: Arc<dyn ConnectionAdapter>) {
        *self.connection.lock() = Some(adapter);
    }

    /// Detaches the cached adapter, returning it for teardown.
    pub fn take_connection(&self) -> Option<Arc<dyn ConnectionAdapter>> {
        self.connection.lock().take()
    }
}
