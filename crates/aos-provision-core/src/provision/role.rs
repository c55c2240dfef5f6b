//! Security role provisioner.

use async_trait::async_trait;

use aos_provision_client::RequestBody;

use crate::config::ProvisionerConfiguration;
use crate::error::Result;
use crate::files::ConfigurationFile;

use super::{parse_contents, EntityType, Provisioner};

/// Provisioner for security roles.
///
/// Create and update are the same unconditional overwrite; there is no
/// existence check.
pub struct RoleProvisioner {
    configuration: ProvisionerConfiguration,
}

impl RoleProvisioner {
    pub fn new(configuration: ProvisionerConfiguration) -> Self {
        Self { configuration }
    }

    fn role_path(&self, name: &str) -> String {
        format!("/{}/{}", self.configuration.domain_type.role_endpoint(), name)
    }
}

#[async_trait]
impl Provisioner for RoleProvisioner {
    fn entity_type(&self) -> EntityType {
        EntityType::Roles
    }

    fn configuration(&self) -> &ProvisionerConfiguration {
        &self.configuration
    }

    async fn create(&self, entity: &ConfigurationFile) -> Result<()> {
        self.configuration
            .client
            .put(
                &self.role_path(&entity.name),
                RequestBody::Json(parse_contents(entity)?),
                None,
            )
            .await?;
        Ok(())
    }

    async fn update(&self, entity: &ConfigurationFile) -> Result<()> {
        self.create(entity).await
    }

    async fn delete(&self, entity: &ConfigurationFile) -> Result<()> {
        self.configuration
            .client
            .delete(&self.role_path(&entity.name))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::super::test_support::{configuration, write_entities};
    use super::*;
    use crate::config::{DestructiveOperation, DomainType, ProvisionAction};
    use crate::testing::MockHttpClient;

    #[tokio::test]
    async fn create_overwrites_unconditionally() {
        let client = Arc::new(MockHttpClient::new());
        let dir = tempfile::tempdir().unwrap();
        write_entities(
            dir.path(),
            EntityType::Roles,
            &[("log-reader.json", r#"{"cluster_permissions":[]}"#)],
        );
        let config = configuration(&client, dir.path(), ProvisionAction::Create, None);

        RoleProvisioner::new(config).run().await.unwrap();

        let calls = client.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].method, "PUT");
        assert_eq!(calls[0].path, "/_plugins/_security/api/roles/log-reader");
        assert_eq!(
            calls[0].json_body(),
            Some(&json!({"cluster_permissions": []}))
        );
    }

    #[tokio::test]
    async fn elasticsearch_uses_the_native_security_endpoint() {
        let client = Arc::new(MockHttpClient::new());
        let dir = tempfile::tempdir().unwrap();
        write_entities(
            dir.path(),
            EntityType::Roles,
            &[("log-reader.json", "{}")],
        );
        let mut config = configuration(
            &client,
            dir.path(),
            ProvisionAction::Delete,
            Some(DestructiveOperation::Delete),
        );
        config.domain_type = DomainType::Elasticsearch;

        RoleProvisioner::new(config).run().await.unwrap();

        let calls = client.calls();
        assert_eq!(calls[0].path, "/_security/role/log-reader");
    }
}
