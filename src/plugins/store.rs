use chrono::Utc;

use crate::error::{PluginError, Result};

use super::dto::{EnablementRecord, PluginEnablementStatus};

pub const ENABLEMENT_TREE: &str = "plugin_enablement";

/// Persisted enable/disable decisions, keyed by plugin name.
#[derive(Clone)]
pub struct EnablementStore {
    tree: sled::Tree,
}

impl EnablementStore {
    pub fn new(tree: sled::Tree) -> Self {
        Self { tree }
    }

    /// Opens a store backed by a throwaway database.
    pub fn temporary() -> Result<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Ok(Self::new(db.open_tree(ENABLEMENT_TREE)?))
    }

    pub fn open(path: &str) -> Result<Self> {
        let db = sled::open(path)?;
        Ok(Self::new(db.open_tree(ENABLEMENT_TREE)?))
    }

    pub fn get(&self, plugin: &str) -> Result<Option<EnablementRecord>> {
        let value = self.tree.get(plugin.as_bytes()).map_err(PluginError::from)?;
        match value {
            Some(bytes) => {
                let record = serde_json::from_slice::<EnablementRecord>(&bytes).map_err(|e| {
                    PluginError::internal(format!("Failed to parse enablement record: {}", e))
                })?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    pub fn set(&self, plugin: &str, enabled: bool) -> Result<PluginEnablementStatus> {
        let record = EnablementRecord {
            enabled,
            updated_at: Utc::now().timestamp(),
        };
        let encoded = serde_json::to_vec(&record).map_err(|e| {
            PluginError::internal(format!("Failed to encode enablement record: {}", e))
        })?;
        self.tree
            .insert(plugin.as_bytes(), encoded)
            .map_err(PluginError::from)?;
        self.tree.flush().map_err(PluginError::from)?;

        Ok(PluginEnablementStatus {
            plugin: plugin.to_string(),
            enabled: record.enabled,
            updated_at: record.updated_at,
        })
    }

    pub fn remove(&self, plugin: &str) -> Result<()> {
        self.tree
            .remove(plugin.as_bytes())
            .map_err(PluginError::from)?;
        self.tree.flush().map_err(PluginError::from)?;
        Ok(())
    }
}
