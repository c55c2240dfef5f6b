//! Index provisioner.

use async_trait::async_trait;
use tracing::info;

use aos_provision_client::RequestBody;

use crate::config::ProvisionerConfiguration;
use crate::error::{ProvisionError, Result};
use crate::files::ConfigurationFile;

use super::{parse_contents, EntityType, Provisioner};

/// Provisioner for indices.
///
/// Creation is existence-checked and idempotent; indices that already exist
/// are never mutated by this provisioner.
pub struct IndexProvisioner {
    configuration: ProvisionerConfiguration,
}

impl IndexProvisioner {
    pub fn new(configuration: ProvisionerConfiguration) -> Self {
        Self { configuration }
    }
}

#[async_trait]
impl Provisioner for IndexProvisioner {
    fn entity_type(&self) -> EntityType {
        EntityType::Indices
    }

    fn configuration(&self) -> &ProvisionerConfiguration {
        &self.configuration
    }

    async fn create(&self, entity: &ConfigurationFile) -> Result<()> {
        let current = self
            .configuration
            .client
            .get(&format!("/{}", entity.name))
            .await?;

        match current.status_code {
            200 => {
                info!("Index {} already exists, skipping", entity.name);
                Ok(())
            }
            404 => {
                self.configuration
                    .client
                    .put(
                        &format!("/{}", entity.name),
                        RequestBody::Json(parse_contents(entity)?),
                        None,
                    )
                    .await?;
                Ok(())
            }
            status => Err(ProvisionError::UnknownIndexState {
                name: entity.name.clone(),
                status,
            }),
        }
    }

    async fn update(&self, _entity: &ConfigurationFile) -> Result<()> {
        // Existing indices are never mutated here.
        Ok(())
    }

    async fn delete(&self, entity: &ConfigurationFile) -> Result<()> {
        self.configuration
            .client
            .delete(&format!("/{}", entity.name))
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
    use crate::config::{DestructiveOperation, ProvisionAction};
    use crate::testing::MockHttpClient;

    const INDEX_BODY: &str = r#"{"settings":{"index":{"number_of_shards":"2"}}}"#;

    #[tokio::test]
    async fn create_skips_an_existing_index() {
        let client = Arc::new(MockHttpClient::new());
        let dir = tempfile::tempdir().unwrap();
        write_entities(
            dir.path(),
            EntityType::Indices,
            &[("app-logs.json", INDEX_BODY)],
        );
        client.stub_status("GET", "/app-logs", 200);
        let config = configuration(&client, dir.path(), ProvisionAction::Create, None);

        IndexProvisioner::new(config).run().await.unwrap();

        assert!(client.mutating_calls().is_empty());
    }

    #[tokio::test]
    async fn create_puts_a_missing_index() {
        let client = Arc::new(MockHttpClient::new());
        let dir = tempfile::tempdir().unwrap();
        write_entities(
            dir.path(),
            EntityType::Indices,
            &[("app-logs.json", INDEX_BODY)],
        );
        client.stub_status("GET", "/app-logs", 404);
        let config = configuration(&client, dir.path(), ProvisionAction::Create, None);

        IndexProvisioner::new(config).run().await.unwrap();

        let puts = client.mutating_calls();
        assert_eq!(puts.len(), 1);
        assert_eq!(puts[0].path, "/app-logs");
        assert_eq!(
            puts[0].json_body(),
            Some(&json!({"settings": {"index": {"number_of_shards": "2"}}}))
        );
    }

    #[tokio::test]
    async fn ambiguous_index_state_is_fatal() {
        let client = Arc::new(MockHttpClient::new());
        let dir = tempfile::tempdir().unwrap();
        write_entities(
            dir.path(),
            EntityType::Indices,
            &[("app-logs.json", INDEX_BODY)],
        );
        client.stub_status("GET", "/app-logs", 503);
        let config = configuration(&client, dir.path(), ProvisionAction::Create, None);

        let error = IndexProvisioner::new(config).run().await.unwrap_err();

        assert!(matches!(
            error,
            ProvisionError::UnknownIndexState { status: 503, .. }
        ));
    }

    #[tokio::test]
    async fn delete_is_unconditional() {
        let client = Arc::new(MockHttpClient::new());
        let dir = tempfile::tempdir().unwrap();
        write_entities(
            dir.path(),
            EntityType::Indices,
            &[("app-logs.json", INDEX_BODY)],
        );
        let config = configuration(
            &client,
            dir.path(),
            ProvisionAction::Delete,
            Some(DestructiveOperation::Delete),
        );

        IndexProvisioner::new(config).run().await.unwrap();

        let calls = client.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].method, "DELETE");
        assert_eq!(calls[0].path, "/app-logs");
    }
}
