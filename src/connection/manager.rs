// ABOUTME: Registry mapping connection-type identifiers to adapter factories.
// ABOUTME: Resolves and caches one adapter instance per host.

use super::adapter::ConnectionAdapter;
use super::error::{ConnectionError, Result};
use crate::deployment::Host;
use std::collections::HashMap;
use std::sync::Arc;

type AdapterFactory = Box<dyn Fn(&Host) -> Result<Arc<dyn ConnectionAdapter>> + Send + Sync>;

/// Maps connection-type identifiers ("ssh", "local") to adapter factories
/// and hands out one cached adapter instance per host.
///
/// Registration happens once at startup, before any dispatch; the registry
/// is read-only afterwards.
#[derive(Default)]
pub struct ConnectionManager {
    factories: HashMap<String, AdapterFactory>,
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("types", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Associates a connection type with an adapter factory.
    ///
    /// Registering the same type twice overwrites the prior registration;
    /// the last write wins.
    pub fn register_connection_adapter<F>(&mut self, connection_type: impl Into<String>, factory: F)
    where
        F: Fn(&Host) -> Result<Arc<dyn ConnectionAdapter>> + Send + Sync + 'static,
    {
        self.factories
            .insert(connection_type.into(), Box::new(factory));
    }

    /// Whether a factory is registered for the given connection type.
    pub fn supports(&self, connection_type: &str) -> bool {
        self.factories.contains_key(connection_type)
    }

    /// Returns the host's cached adapter, constructing and caching one via
    /// the registered factory on first use.
    ///
    /// # Errors
    ///
    /// Returns `ConnectionError::UnknownConnectionType` when no factory is
    /// registered for the host's connection type. No partial adapter is
    /// constructed in that case.
    pub fn connection_adapter(&self, host: &Host) -> Result<Arc<dyn ConnectionAdapter>> {
        if let Some(adapter) = host.connection() {
            return Ok(adapter);
        }

        let factory = self.factories.get(host.connection_type()).ok_or_else(|| {
            ConnectionError::UnknownConnectionType(host.connection_type().to_string())
        })?;

        let adapter = factory(host)?;
        host.set_connection(Arc::clone(&adapter));
        Ok(adapter)
    }
}
