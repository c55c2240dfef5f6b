//! Dashboard saved-object provisioner.

use async_trait::async_trait;
use rand::RngCore;

use aos_provision_client::{RequestBody, RequestOptions};

use crate::config::ProvisionerConfiguration;
use crate::error::Result;
use crate::files::ConfigurationFile;

use super::{EntityType, Provisioner};

/// Generates the delimiter for a multipart form submission.
fn multipart_boundary() -> String {
    let mut tail = [0u8; 24];
    rand::thread_rng().fill_bytes(&mut tail);
    format!("{}{}", "-".repeat(26), hex::encode(tail))
}

/// Provisioner for dashboard saved objects.
///
/// Objects are import-only: the bulk-import endpoint overwrites on conflict,
/// and nothing is updated or removed afterwards.
pub struct SavedObjectProvisioner {
    configuration: ProvisionerConfiguration,
}

impl SavedObjectProvisioner {
    pub fn new(configuration: ProvisionerConfiguration) -> Self {
        Self { configuration }
    }
}

#[async_trait]
impl Provisioner for SavedObjectProvisioner {
    fn entity_type(&self) -> EntityType {
        EntityType::SavedObjects
    }

    fn configuration(&self) -> &ProvisionerConfiguration {
        &self.configuration
    }

    async fn create(&self, entity: &ConfigurationFile) -> Result<()> {
        let boundary = multipart_boundary();
        let body = [
            format!("--{boundary}"),
            format!(
                "Content-Disposition: form-data; name=\"file\"; filename=\"{}.ndjson\"",
                entity.name
            ),
            "Content-Type: application/x-ndjson".to_string(),
            String::new(),
            entity.contents.clone(),
            format!("--{boundary}--"),
        ]
        .join("\r\n");

        let domain_type = self.configuration.domain_type;
        let mut options = RequestOptions::default();
        options.headers.insert(
            "content-type".to_string(),
            format!("multipart/form-data; boundary={boundary}"),
        );
        options
            .headers
            .insert(domain_type.xsrf_header().to_string(), "true".to_string());

        self.configuration
            .client
            .post(
                &format!(
                    "/{}/api/saved_objects/_import?overwrite=true",
                    domain_type.dashboard_endpoint()
                ),
                RequestBody::Raw(body),
                Some(options),
            )
            .await?;

        Ok(())
    }

    async fn update(&self, _entity: &ConfigurationFile) -> Result<()> {
        Ok(())
    }

    async fn delete(&self, _entity: &ConfigurationFile) -> Result<()> {
        Ok(())
    }
}
