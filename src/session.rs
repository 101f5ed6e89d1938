//! MCP session management.
//!
//! Holds one record store per configured ServiceNow instance and routes each
//! tool call to the instance it names, or to the default instance.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::{Config, InstanceName};
use crate::error::{McpError, Result};
use crate::store::{RecordStore, RestStore};

/// MCP session state.
///
/// Everything here is fixed at startup; tool calls only read it, so a session
/// can be shared across concurrent invocations.
pub struct McpSession {
    /// Record store per configured instance
    stores: BTreeMap<InstanceName, Arc<dyn RecordStore>>,
    /// Instance used when a call names none
    default_instance: InstanceName,
    /// Whether create/update/delete are refused
    read_only: bool,
}

impl McpSession {
    /// Create a session with a single store serving as the `dev` default instance.
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        let mut stores = BTreeMap::new();
        stores.insert(InstanceName::Dev, store);
        Self {
            stores,
            default_instance: InstanceName::Dev,
            read_only: false,
        }
    }

    /// Build REST stores for every configured instance.
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;

        let mut stores: BTreeMap<InstanceName, Arc<dyn RecordStore>> = BTreeMap::new();
        for (name, instance) in &config.instances {
            let store = RestStore::new(&instance.url, instance.auth.clone(), config.timeout)
                .map_err(|e| McpError::store("connect", &instance.url, e))?;
            tracing::info!(instance = %name, url = %instance.url, "instance configured");
            stores.insert(*name, Arc::new(store));
        }

        Ok(Self {
            stores,
            default_instance: config.default_instance,
            read_only: config.read_only,
        })
    }

    /// Add or replace the store behind `name`.
    pub fn with_instance(mut self, name: InstanceName, store: Arc<dyn RecordStore>) -> Self {
        self.stores.insert(name, store);
        self
    }

    /// Route calls without an `instance` field to `name`.
    pub fn with_default_instance(mut self, name: InstanceName) -> Self {
        self.default_instance = name;
        self
    }

    /// Refuse write operations.
    pub fn with_read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    /// Returns `true` if write tools are disabled.
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Reject write operations when the session is read-only.
    pub fn check_write_access(&self, operation: &str) -> Result<()> {
        if self.read_only {
            return Err(McpError::AccessDenied(operation.to_string()));
        }
        Ok(())
    }

    /// Get the default instance name.
    pub fn default_instance(&self) -> InstanceName {
        self.default_instance
    }

    /// Names of all configured instances.
    pub fn instances(&self) -> impl Iterator<Item = InstanceName> + '_ {
        self.stores.keys().copied()
    }

    /// Store for `instance`, or for the default instance when `None`.
    pub fn store(
        &self,
        instance: Option<InstanceName>,
    ) -> Result<(InstanceName, &dyn RecordStore)> {
        let name = instance.unwrap_or(self.default_instance);
        self.stores
            .get(&name)
            .map(|store| (name, store.as_ref()))
            .ok_or(McpError::InstanceNotConfigured(name))
    }
}
