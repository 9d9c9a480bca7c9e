//! Plugin registry: one composed instance per site, keyed by identifier.
//!
//! Built once by the process entry point and passed by reference to every
//! consumer; read-only afterwards, so concurrent lookups need no locking.

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::engine::compose::{Capability, Plugin, PluginDef};
use crate::engine::Services;
use crate::model::PluginDescriptor;

/// Admission failures at registry construction.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Duplicate plugin identifier: {id}")]
    DuplicateId { id: String },

    #[error("Plugin {id} does not bind the full capability contract; missing: {}",
        missing.iter().map(|c| c.name()).collect::<Vec<_>>().join(", "))]
    MissingCapabilities {
        id: String,
        missing: Vec<Capability>,
    },
}

/// Immutable registry of composed plugins. Enumeration order is catalog
/// order, stable across runs.
pub struct Registry {
    plugins: Vec<Arc<Plugin>>,
    index: HashMap<String, usize>,
}

impl Registry {
    /// Instantiate every definition exactly once. A definition with a
    /// duplicate identifier or an incomplete capability set is rejected and
    /// the whole build fails.
    pub fn build(defs: Vec<PluginDef>, services: &Services) -> Result<Self, RegistryError> {
        let mut plugins = Vec::with_capacity(defs.len());
        let mut index = HashMap::with_capacity(defs.len());
        for def in defs {
            let id = def.info.id.clone();
            if index.contains_key(&id) {
                return Err(RegistryError::DuplicateId { id });
            }
            let missing = def.capabilities().missing();
            if !missing.is_empty() {
                return Err(RegistryError::MissingCapabilities { id, missing });
            }
            let plugin = Arc::new(def.compose(services));
            index.insert(id, plugins.len());
            plugins.push(plugin);
        }
        info!(count = plugins.len(), "plugin registry built");
        Ok(Self { plugins, index })
    }

    /// Descriptors of all registered plugins, in registration order.
    pub fn list(&self) -> Vec<PluginDescriptor> {
        self.plugins.iter().map(|p| p.descriptor()).collect()
    }

    /// Look up one plugin by identifier. Total for every id returned by
    /// `list`.
    pub fn get(&self, id: &str) -> Option<&Arc<Plugin>> {
        self.index.get(id).map(|&i| &self.plugins[i])
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}
