//! Entity provisioners and the ordering orchestrator.

mod cluster_settings;
mod index;
mod ism_policy;
mod role;
mod role_mapping;
mod saved_object;
mod template;

pub use cluster_settings::ClusterSettingsProvisioner;
pub use index::IndexProvisioner;
pub use ism_policy::IsmPolicyProvisioner;
pub use role::RoleProvisioner;
pub use role_mapping::{DynamicRoleMappings, RoleMappingProvisioner};
pub use saved_object::SavedObjectProvisioner;
pub use template::{TemplateProvisioner, TemplateType};

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::config::{DestructiveOperation, ProvisionAction, ProvisionerConfiguration};
use crate::error::{ProvisionError, Result};
use crate::files::{self, ConfigurationFile};

/// Category of provisionable entity; names the asset subdirectory it scans.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityType {
    ClusterSettings,
    SavedObjects,
    Roles,
    RoleMappings,
    Indices,
    IsmPolicies,
    ComponentTemplates,
    IndexTemplates,
}

impl EntityType {
    /// Subdirectory of the configuration asset owned by this entity type.
    pub fn subdirectory(self) -> &'static str {
        match self {
            Self::ClusterSettings => "cluster-settings",
            Self::SavedObjects => "saved-objects",
            Self::Roles => "roles",
            Self::RoleMappings => "role-mappings",
            Self::Indices => "indices",
            Self::IsmPolicies => "ism-policies",
            Self::ComponentTemplates => "templates/component",
            Self::IndexTemplates => "templates/index",
        }
    }
}

/// Parses a configuration file's contents as JSON.
pub(crate) fn parse_contents(entity: &ConfigurationFile) -> Result<Value> {
    serde_json::from_str(&entity.contents).map_err(|source| ProvisionError::InvalidEntity {
        name: entity.name.clone(),
        source,
    })
}

/// Reconciles all configuration files of one entity type against the domain.
///
/// `run` walks the entity's asset subdirectory and applies the configured
/// action to every file. Provisioners with no file-driven state
/// (cluster settings, dynamic role mappings) override it.
#[async_trait]
pub trait Provisioner: Send + Sync {
    /// Type of entity this provisioner is responsible for handling.
    fn entity_type(&self) -> EntityType;

    /// Shared run configuration.
    fn configuration(&self) -> &ProvisionerConfiguration;

    /// Handles creating the entity described by a configuration file.
    async fn create(&self, entity: &ConfigurationFile) -> Result<()>;

    /// Handles updating the entity described by a configuration file.
    async fn update(&self, entity: &ConfigurationFile) -> Result<()>;

    /// Handles deleting the entity described by a configuration file.
    async fn delete(&self, entity: &ConfigurationFile) -> Result<()>;

    /// Executes the provisioner over all of its configuration files.
    async fn run(&self) -> Result<()> {
        let root = self
            .configuration()
            .asset_path
            .join(self.entity_type().subdirectory());

        for path in files::list_files(&root)? {
            let entity = files::load_file(&path)?;
            self.apply(&entity).await?;
        }

        Ok(())
    }

    /// Applies the configured action to one entity, honoring the
    /// destructive-operation allow-list.
    async fn apply(&self, entity: &ConfigurationFile) -> Result<()> {
        let config = self.configuration();
        match config.action {
            ProvisionAction::Create => self.create(entity).await,
            ProvisionAction::Update => {
                if DestructiveOperation::permits_update(config.allow_destructive_operations) {
                    self.update(entity).await
                } else {
                    debug!("Update of {} not allowed, skipping", entity.name);
                    Ok(())
                }
            }
            ProvisionAction::Delete => {
                if DestructiveOperation::permits_delete(config.allow_destructive_operations) {
                    self.delete(entity).await
                } else {
                    debug!("Delete of {} not allowed, skipping", entity.name);
                    Ok(())
                }
            }
        }
    }
}

/// Builds the ordered provisioner list for one run.
///
/// The order encodes dependency: cluster-level settings and lifecycle
/// policies before templates (templates may reference policies), templates
/// before concrete indices, and security roles and mappings before dashboard
/// imports. A Delete action runs the same list in reverse so teardown
/// proceeds in the opposite dependency direction.
pub fn provisioners_for(
    config: &ProvisionerConfiguration,
    cluster_settings: Option<Value>,
    dynamic_role_mappings: Option<DynamicRoleMappings>,
) -> Vec<Box<dyn Provisioner>> {
    let mut provisioners: Vec<Box<dyn Provisioner>> = vec![
        Box::new(ClusterSettingsProvisioner::new(
            config.clone(),
            cluster_settings,
        )),
        Box::new(IsmPolicyProvisioner::new(config.clone())),
        Box::new(TemplateProvisioner::new(
            config.clone(),
            TemplateType::Component,
        )),
        Box::new(TemplateProvisioner::new(config.clone(), TemplateType::Index)),
        Box::new(IndexProvisioner::new(config.clone())),
        Box::new(RoleProvisioner::new(config.clone())),
        Box::new(RoleMappingProvisioner::new(
            config.clone(),
            dynamic_role_mappings,
        )),
        Box::new(SavedObjectProvisioner::new(config.clone())),
    ];

    if config.action == ProvisionAction::Delete {
        provisioners.reverse();
    }

    provisioners
}

/// Runs each provisioner to completion in order.
///
/// The first error aborts the remaining provisioners; there is no
/// partial-success continuation.
pub async fn run_provisioners(provisioners: &[Box<dyn Provisioner>]) -> Result<()> {
    for provisioner in provisioners {
        provisioner.run().await?;
    }

    Ok(())
}


#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::test_support::{configuration, write_entities};
    use super::*;
    use crate::config::DomainType;
    use crate::testing::MockHttpClient;

    const CREATE_ORDER: [EntityType; 8] = [
        EntityType::ClusterSettings,
        EntityType::IsmPolicies,
        EntityType::ComponentTemplates,
        EntityType::IndexTemplates,
        EntityType::Indices,
        EntityType::Roles,
        EntityType::RoleMappings,
        EntityType::SavedObjects,
    ];

    #[test]
    fn create_orders_provisioners_by_dependency() {
        let client = Arc::new(MockHttpClient::new());
        let dir = tempfile::tempdir().unwrap();
        let config = configuration(&client, dir.path(), ProvisionAction::Create, None);

        let provisioners = provisioners_for(&config, None, None);
        let order: Vec<_> = provisioners.iter().map(|p| p.entity_type()).collect();
        assert_eq!(order, CREATE_ORDER);
    }

    #[test]
    fn delete_reverses_the_order() {
        let client = Arc::new(MockHttpClient::new());
        let dir = tempfile::tempdir().unwrap();
        let config = configuration(&client, dir.path(), ProvisionAction::Delete, None);

        let provisioners = provisioners_for(&config, None, None);
        let order: Vec<_> = provisioners.iter().map(|p| p.entity_type()).collect();
        let mut expected = CREATE_ORDER.to_vec();
        expected.reverse();
        assert_eq!(order, expected);
    }

    #[tokio::test]
    async fn update_without_allow_list_makes_no_mutating_calls() {
        let client = Arc::new(MockHttpClient::new());
        let dir = tempfile::tempdir().unwrap();
        for entity_type in CREATE_ORDER {
            write_entities(dir.path(), entity_type, &[("entity.json", "{}")]);
        }
        let config = configuration(&client, dir.path(), ProvisionAction::Update, None);

        let provisioners = provisioners_for(&config, None, None);
        run_provisioners(&provisioners).await.unwrap();

        assert!(client.mutating_calls().is_empty());
    }

    #[tokio::test]
    async fn update_with_allow_list_updates_each_file_once() {
        let client = Arc::new(MockHttpClient::new());
        let dir = tempfile::tempdir().unwrap();
        write_entities(
            dir.path(),
            EntityType::Roles,
            &[("reader.json", "{}"), ("writer.json", "{}")],
        );
        let config = configuration(
            &client,
            dir.path(),
            ProvisionAction::Update,
            Some(DestructiveOperation::Update),
        );

        RoleProvisioner::new(config).run().await.unwrap();

        let puts = client.mutating_calls();
        assert_eq!(puts.len(), 2);
        assert_eq!(puts[0].path, "/_plugins/_security/api/roles/reader");
        assert_eq!(puts[1].path, "/_plugins/_security/api/roles/writer");
    }

    #[tokio::test]
    async fn delete_without_allow_list_skips_silently() {
        let client = Arc::new(MockHttpClient::new());
        let dir = tempfile::tempdir().unwrap();
        write_entities(dir.path(), EntityType::Indices, &[("app-logs.json", "{}")]);
        let config = configuration(&client, dir.path(), ProvisionAction::Delete, None);

        IndexProvisioner::new(config).run().await.unwrap();

        assert!(client.calls().is_empty());
    }

    #[tokio::test]
    async fn a_failing_provisioner_aborts_the_remainder() {
        let client = Arc::new(MockHttpClient::new());
        let dir = tempfile::tempdir().unwrap();
        // Only the indices directory exists; the ISM walk fails first and the
        // index provisioner must never run.
        write_entities(dir.path(), EntityType::Indices, &[("app-logs.json", "{}")]);
        let config = ProvisionerConfiguration {
            client: client.clone(),
            asset_path: dir.path().to_path_buf(),
            action: ProvisionAction::Create,
            allow_destructive_operations: None,
            domain_type: DomainType::OpenSearch,
        };

        let provisioners: Vec<Box<dyn Provisioner>> = vec![
            Box::new(IsmPolicyProvisioner::new(config.clone())),
            Box::new(IndexProvisioner::new(config.clone())),
        ];
        let error = run_provisioners(&provisioners).await.unwrap_err();

        assert!(matches!(error, ProvisionError::InvalidDirectoryPath(_)));
        assert!(client.calls().is_empty());
    }
}
