//! Component and index template provisioner.

use async_trait::async_trait;
use tracing::{info, warn};

use aos_provision_client::RequestBody;

use crate::config::ProvisionerConfiguration;
use crate::error::{ProvisionError, Result};
use crate::files::ConfigurationFile;

use super::{parse_contents, EntityType, Provisioner};

/// Flavor of template managed by a [`TemplateProvisioner`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateType {
    Component,
    Index,
}

impl TemplateType {
    fn as_str(self) -> &'static str {
        match self {
            Self::Component => "component",
            Self::Index => "index",
        }
    }

    fn entity_type(self) -> EntityType {
        match self {
            Self::Component => EntityType::ComponentTemplates,
            Self::Index => EntityType::IndexTemplates,
        }
    }
}

/// Shared provisioner for component and index templates.
///
/// Templates are never force-overwritten once present (Update has the same
/// existence-check semantics as Create), and a failed delete is only a
/// warning.
pub struct TemplateProvisioner {
    configuration: ProvisionerConfiguration,
    template_type: TemplateType,
}

impl TemplateProvisioner {
    pub fn new(configuration: ProvisionerConfiguration, template_type: TemplateType) -> Self {
        Self {
            configuration,
            template_type,
        }
    }

    fn template_path(&self, name: &str) -> String {
        format!("/_{}_template/{}", self.template_type.as_str(), name)
    }
}

#[async_trait]
impl Provisioner for TemplateProvisioner {
    fn entity_type(&self) -> EntityType {
        self.template_type.entity_type()
    }

    fn configuration(&self) -> &ProvisionerConfiguration {
        &self.configuration
    }

    async fn create(&self, entity: &ConfigurationFile) -> Result<()> {
        let current = self
            .configuration
            .client
            .head(&self.template_path(&entity.name))
            .await?;

        match current.status_code {
            200 => {
                info!(
                    "Template {} already exists, skipping creation/update",
                    entity.name
                );
                Ok(())
            }
            404 => {
                self.configuration
                    .client
                    .put(
                        &self.template_path(&entity.name),
                        RequestBody::Json(parse_contents(entity)?),
                        None,
                    )
                    .await?;
                Ok(())
            }
            status => Err(ProvisionError::UnknownTemplateState {
                template_type: self.template_type.as_str(),
                name: entity.name.clone(),
                status,
            }),
        }
    }

    async fn update(&self, entity: &ConfigurationFile) -> Result<()> {
        self.create(entity).await
    }

    async fn delete(&self, entity: &ConfigurationFile) -> Result<()> {
        let response = self
            .configuration
            .client
            .delete(&self.template_path(&entity.name))
            .await?;

        if response.status_code != 200 {
            warn!(
                "Failed to delete {} template {}: status {}",
                self.template_type.as_str(),
                entity.name,
                response.status_code
            );
        }

        Ok(())
    }
}
