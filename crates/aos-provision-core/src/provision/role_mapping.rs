//! Role-mapping provisioner.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::json;

use aos_provision_client::RequestBody;

use crate::config::{DestructiveOperation, ProvisionAction, ProvisionerConfiguration};
use crate::error::Result;
use crate::files::{self, ConfigurationFile};

use super::{EntityType, Provisioner};

/// Role name to backend-role identifiers (IAM role ARNs, LDAP DNs, ...),
/// supplied directly on the invocation instead of via configuration files.
pub type DynamicRoleMappings = BTreeMap<String, Vec<String>>;

/// Provisioner for role mappings.
///
/// Backend roles come from configuration files (one backend role per line)
/// and from dynamically supplied mappings; both sources are merged per role
/// name. When no files exist, the dynamic mappings alone drive the run.
pub struct RoleMappingProvisioner {
    configuration: ProvisionerConfiguration,
    dynamic_mappings: Option<DynamicRoleMappings>,
}

impl RoleMappingProvisioner {
    pub fn new(
        configuration: ProvisionerConfiguration,
        dynamic_mappings: Option<DynamicRoleMappings>,
    ) -> Self {
        Self {
            configuration,
            dynamic_mappings,
        }
    }

    fn mapping_path(&self, name: &str) -> String {
        format!(
            "/{}/{}",
            self.configuration.domain_type.role_mapping_endpoint(),
            name
        )
    }

    /// Maps backend roles to an internal role in the domain.
    async fn map_backend_roles(&self, role: &str, backend_roles: &[String]) -> Result<()> {
        self.configuration
            .client
            .put(
                &self.mapping_path(role),
                RequestBody::Json(json!({ "backend_roles": backend_roles })),
                None,
            )
            .await?;
        Ok(())
    }

    async fn remove_mapping(&self, role: &str) -> Result<()> {
        self.configuration
            .client
            .delete(&self.mapping_path(role))
            .await?;
        Ok(())
    }

    /// Backend roles from the file contents, merged with any dynamic entries
    /// for the same role name.
    fn all_backend_roles(&self, entity: &ConfigurationFile) -> Vec<String> {
        let mut roles: Vec<String> = entity.contents.lines().map(str::to_string).collect();

        if let Some(dynamic) = self
            .dynamic_mappings
            .as_ref()
            .and_then(|mappings| mappings.get(&entity.name))
        {
            roles.extend(dynamic.iter().cloned());
        }

        roles
    }

    /// Applies the dynamic mappings directly when no files exist.
    async fn run_dynamic(&self) -> Result<()> {
        let Some(dynamic) = &self.dynamic_mappings else {
            return Ok(());
        };

        for (role, backend_roles) in dynamic {
            match self.configuration.action {
                ProvisionAction::Create => self.map_backend_roles(role, backend_roles).await?,
                ProvisionAction::Update => {
                    if DestructiveOperation::permits_update(
                        self.configuration.allow_destructive_operations,
                    ) {
                        self.map_backend_roles(role, backend_roles).await?;
                    }
                }
                ProvisionAction::Delete => {
                    if DestructiveOperation::permits_delete(
                        self.configuration.allow_destructive_operations,
                    ) {
                        self.remove_mapping(role).await?;
                    }
                }
            }
        }

        Ok(())
    }
}

#[async_trait]
impl Provisioner for RoleMappingProvisioner {
    fn entity_type(&self) -> EntityType {
        EntityType::RoleMappings
    }

    fn configuration(&self) -> &ProvisionerConfiguration {
        &self.configuration
    }

    /// Falls back to the dynamic mappings when no configuration files exist.
    async fn run(&self) -> Result<()> {
        let root = self
            .configuration
            .asset_path
            .join(self.entity_type().subdirectory());
        let paths = files::list_files(&root)?;

        if paths.is_empty() {
            return self.run_dynamic().await;
        }

        for path in &paths {
            let entity = files::load_file(path)?;
            self.apply(&entity).await?;
        }

        Ok(())
    }

    async fn create(&self, entity: &ConfigurationFile) -> Result<()> {
        let backend_roles = self.all_backend_roles(entity);
        self.map_backend_roles(&entity.name, &backend_roles).await
    }

    async fn update(&self, entity: &ConfigurationFile) -> Result<()> {
        self.create(entity).await
    }

    async fn delete(&self, entity: &ConfigurationFile) -> Result<()> {
        self.remove_mapping(&entity.name).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::super::test_support::{configuration, write_entities};
    use super::*;
    use crate::config::DomainType;
    use crate::testing::MockHttpClient;

    fn dynamic(entries: &[(&str, &[&str])]) -> DynamicRoleMappings {
        entries
            .iter()
            .map(|(role, backend)| {
                (
                    role.to_string(),
                    backend.iter().map(|b| b.to_string()).collect(),
                )
            })
            .collect()
    }

    #[tokio::test]
    async fn file_and_dynamic_backend_roles_are_merged() {
        let client = Arc::new(MockHttpClient::new());
        let dir = tempfile::tempdir().unwrap();
        write_entities(
            dir.path(),
            EntityType::RoleMappings,
            &[("admin-role", "roleA\nroleB")],
        );
        let config = configuration(&client, dir.path(), ProvisionAction::Create, None);

        RoleMappingProvisioner::new(config, Some(dynamic(&[("admin-role", &["roleC"])])))
            .run()
            .await
            .unwrap();

        let calls = client.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(
            calls[0].path,
            "/_plugins/_security/api/rolesmapping/admin-role"
        );
        assert_eq!(
            calls[0].json_body(),
            Some(&json!({"backend_roles": ["roleA", "roleB", "roleC"]}))
        );
    }

    #[tokio::test]
    async fn dynamic_mappings_alone_drive_the_run_without_files() {
        let client = Arc::new(MockHttpClient::new());
        let dir = tempfile::tempdir().unwrap();
        // Directory exists but holds no mapping files.
        write_entities(dir.path(), EntityType::RoleMappings, &[(".gitkeep", "")]);
        let config = configuration(&client, dir.path(), ProvisionAction::Create, None);

        RoleMappingProvisioner::new(
            config,
            Some(dynamic(&[(
                "admin-role",
                &["arn:aws:iam::123456789012:role/admin"],
            )])),
        )
        .run()
        .await
        .unwrap();

        let calls = client.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(
            calls[0].json_body(),
            Some(&json!({"backend_roles": ["arn:aws:iam::123456789012:role/admin"]}))
        );
    }

    #[tokio::test]
    async fn dynamic_delete_honors_the_allow_list() {
        let client = Arc::new(MockHttpClient::new());
        let dir = tempfile::tempdir().unwrap();
        write_entities(dir.path(), EntityType::RoleMappings, &[(".gitkeep", "")]);

        let gated = configuration(&client, dir.path(), ProvisionAction::Delete, None);
        RoleMappingProvisioner::new(gated, Some(dynamic(&[("admin-role", &["roleA"])])))
            .run()
            .await
            .unwrap();
        assert!(client.calls().is_empty());

        let allowed = configuration(
            &client,
            dir.path(),
            ProvisionAction::Delete,
            Some(DestructiveOperation::Delete),
        );
        RoleMappingProvisioner::new(allowed, Some(dynamic(&[("admin-role", &["roleA"])])))
            .run()
            .await
            .unwrap();

        let calls = client.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].method, "DELETE");
    }

    #[tokio::test]
    async fn elasticsearch_uses_the_native_mapping_endpoint() {
        let client = Arc::new(MockHttpClient::new());
        let dir = tempfile::tempdir().unwrap();
        write_entities(
            dir.path(),
            EntityType::RoleMappings,
            &[("admin-role", "roleA")],
        );
        let mut config = configuration(&client, dir.path(), ProvisionAction::Create, None);
        config.domain_type = DomainType::Elasticsearch;

        RoleMappingProvisioner::new(config, None).run().await.unwrap();

        assert_eq!(client.calls()[0].path, "/_security/role_mapping/admin-role");
    }
}
