//! Cluster settings provisioner.

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use aos_provision_client::RequestBody;

use crate::config::{DestructiveOperation, ProvisionAction, ProvisionerConfiguration};
use crate::error::Result;
use crate::files::ConfigurationFile;

use super::{EntityType, Provisioner};

/// Applies a single in-memory settings map to `/_cluster/settings`.
///
/// No configuration files are read, Update is a full re-apply of the same
/// map, and settings are never rolled back on Delete.
pub struct ClusterSettingsProvisioner {
    configuration: ProvisionerConfiguration,
    cluster_settings: Option<Value>,
}

impl ClusterSettingsProvisioner {
    pub fn new(configuration: ProvisionerConfiguration, cluster_settings: Option<Value>) -> Self {
        Self {
            configuration,
            cluster_settings,
        }
    }

    async fn put_settings(&self) -> Result<()> {
        let Some(settings) = &self.cluster_settings else {
            debug!("No cluster settings supplied, skipping");
            return Ok(());
        };

        self.configuration
            .client
            .put("/_cluster/settings", RequestBody::Json(settings.clone()), None)
            .await?;

        Ok(())
    }
}

#[async_trait]
impl Provisioner for ClusterSettingsProvisioner {
    fn entity_type(&self) -> EntityType {
        EntityType::ClusterSettings
    }

    fn configuration(&self) -> &ProvisionerConfiguration {
        &self.configuration
    }

    /// Operates on the supplied settings map instead of configuration files.
    async fn run(&self) -> Result<()> {
        match self.configuration.action {
            ProvisionAction::Create => self.put_settings().await,
            ProvisionAction::Update => {
                if DestructiveOperation::permits_update(
                    self.configuration.allow_destructive_operations,
                ) {
                    self.put_settings().await
                } else {
                    Ok(())
                }
            }
            // Cluster settings are never rolled back.
            ProvisionAction::Delete => Ok(()),
        }
    }

    async fn create(&self, _entity: &ConfigurationFile) -> Result<()> {
        self.put_settings().await
    }

    async fn update(&self, _entity: &ConfigurationFile) -> Result<()> {
        self.put_settings().await
    }

    async fn delete(&self, _entity: &ConfigurationFile) -> Result<()> {
        Ok(())
    }
}
