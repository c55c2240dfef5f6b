//! Index State Management policy provisioner.

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::info;

use aos_provision_client::{RequestBody, RequestOptions};

use crate::config::{DomainType, ProvisionerConfiguration};
use crate::error::{ProvisionError, Result};
use crate::files::ConfigurationFile;

use super::{parse_contents, EntityType, Provisioner};

/// Provisioner for index lifecycle policies (ISM on OpenSearch, ILM on
/// Elasticsearch).
pub struct IsmPolicyProvisioner {
    configuration: ProvisionerConfiguration,
}

impl IsmPolicyProvisioner {
    pub fn new(configuration: ProvisionerConfiguration) -> Self {
        Self { configuration }
    }

    fn policy_path(&self, name: &str) -> String {
        format!(
            "/{}/{}",
            self.configuration.domain_type.ism_policy_endpoint(),
            name
        )
    }
}

#[async_trait]
impl Provisioner for IsmPolicyProvisioner {
    fn entity_type(&self) -> EntityType {
        EntityType::IsmPolicies
    }

    fn configuration(&self) -> &ProvisionerConfiguration {
        &self.configuration
    }

    async fn create(&self, entity: &ConfigurationFile) -> Result<()> {
        let current = self
            .configuration
            .client
            .head(&self.policy_path(&entity.name))
            .await?;

        match current.status_code {
            200 => {
                info!("Policy {} already exists, skipping creation", entity.name);
                Ok(())
            }
            404 => {
                self.configuration
                    .client
                    .put(
                        &self.policy_path(&entity.name),
                        RequestBody::Json(parse_contents(entity)?),
                        None,
                    )
                    .await?;
                Ok(())
            }
            status => Err(ProvisionError::UnknownPolicyState {
                name: entity.name.clone(),
                status,
            }),
        }
    }

    async fn update(&self, entity: &ConfigurationFile) -> Result<()> {
        let current = self
            .configuration
            .client
            .get(&self.policy_path(&entity.name))
            .await?;

        if current.status_code == 404 {
            return self.create(entity).await;
        }

        let body = parse_contents(entity)?;

        // The ISM plugin requires optimistic concurrency control; the ILM
        // variant on Elasticsearch has no such parameters.
        let options = if self.configuration.domain_type == DomainType::OpenSearch {
            Some(RequestOptions {
                params: vec![
                    ("if_seq_no".to_string(), current.data["_seq_no"].to_string()),
                    (
                        "if_primary_term".to_string(),
                        current.data["_primary_term"].to_string(),
                    ),
                ],
                ..Default::default()
            })
        } else {
            None
        };

        let updated = self
            .configuration
            .client
            .put(
                &self.policy_path(&entity.name),
                RequestBody::Json(body.clone()),
                options,
            )
            .await?;

        if updated.status_code != 200 {
            return Err(ProvisionError::UpdateFailed {
                name: entity.name.clone(),
            });
        }

        if self.configuration.domain_type == DomainType::OpenSearch {
            // Indices already managed by the policy keep the old version
            // unless they are explicitly re-associated.
            let patterns = body["policy"]["ism_template"]["index_patterns"]
                .as_array()
                .cloned()
                .unwrap_or_default();

            for pattern in patterns.iter().filter_map(Value::as_str) {
                self.configuration
                    .client
                    .post(
                        &format!("/_plugins/_ism/change_policy/{}", pattern),
                        RequestBody::Json(json!({ "policy_id": entity.name })),
                        None,
                    )
                    .await?;
            }
        }

        Ok(())
    }

    async fn delete(&self, entity: &ConfigurationFile) -> Result<()> {
        self.configuration
            .client
            .delete(&self.policy_path(&entity.name))
            .await?;
        Ok(())
    }
}
