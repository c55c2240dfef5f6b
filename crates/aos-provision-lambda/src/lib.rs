// CloudFormation custom-resource handler that provisions an Amazon
// OpenSearch Service domain from a zip asset of configuration files.
//
// Philosophy: Use lambda_runtime's provided tokio
// We don't add our own tokio - lambda_runtime provides it

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use lambda_runtime::{service_fn, Error, LambdaEvent};
use tracing::{info, warn};

use aos_provision_client::{AwsHttpClient, AwsHttpClientOptions, HttpClient};
use aos_provision_core::detect::detect_domain_type;
use aos_provision_core::probe::{self, wait_for_availability};
use aos_provision_core::provision::{provisioners_for, run_provisioners};
use aos_provision_core::{ProvisionAction, ProvisionerConfiguration};

mod asset;
mod event;

pub use event::{CustomResourceEvent, CustomResourceResponse, ResourceProperties};

/// Request timeout toward the domain. Longer than the client default because
/// dashboard imports can be slow.
const DOMAIN_REQUEST_TIMEOUT: Duration = Duration::from_secs(45);

/// Builds the signed client bound to the target domain and its admin role.
fn domain_client(properties: &ResourceProperties) -> Result<AwsHttpClient> {
    let client = AwsHttpClient::new(AwsHttpClientOptions {
        service: "es".to_string(),
        base_url: Some(format!("https://{}", properties.domain_endpoint)),
        role_arn: Some(properties.admin_role_arn.clone()),
        timeout: DOMAIN_REQUEST_TIMEOUT,
        pass_non_successful_status_codes: true,
        ..Default::default()
    })?;

    Ok(client)
}

/// Downloads the configuration asset and reconciles the domain against it.
///
/// Returns the asset's ETag, which identifies the provisioned configuration.
async fn provision(action: ProvisionAction, properties: &ResourceProperties) -> Result<String> {
    let asset = asset::download_and_extract(&properties.asset_s3_uri).await?;

    let client: Arc<dyn HttpClient> = Arc::new(domain_client(properties)?);

    wait_for_availability(
        client.as_ref(),
        probe::DEFAULT_MAX_ATTEMPTS,
        probe::DEFAULT_RETRY_INTERVAL,
    )
    .await?;

    let domain_type = match properties.domain_type {
        Some(domain_type) => domain_type,
        None => detect_domain_type(client.as_ref()).await,
    };
    info!("Provisioning {:?} domain at {}", domain_type, properties.domain_endpoint);

    let config = ProvisionerConfiguration {
        client,
        asset_path: asset.path.clone(),
        action,
        allow_destructive_operations: properties.allow_destructive_operations,
        domain_type,
    };

    let provisioners = provisioners_for(
        &config,
        properties.cluster_settings.clone(),
        properties.dynamic_role_mappings.clone(),
    );
    run_provisioners(&provisioners).await?;

    Ok(asset.etag)
}

/// Handles one custom-resource lifecycle event.
pub async fn handle_event(event: CustomResourceEvent) -> Result<CustomResourceResponse> {
    match event.request_type {
        ProvisionAction::Create => {
            let etag = provision(ProvisionAction::Create, &event.resource_properties).await?;
            Ok(CustomResourceResponse {
                physical_resource_id: etag,
            })
        }
        ProvisionAction::Update => {
            // In-place updates are not applied against the cluster; the
            // existing asset identity passes through unchanged.
            warn!("Update requested; no provisioning changes are applied to the domain");
            let physical_resource_id = event
                .physical_resource_id
                .context("Update event is missing a physical resource id")?;
            Ok(CustomResourceResponse {
                physical_resource_id,
            })
        }
        ProvisionAction::Delete => {
            let etag = provision(ProvisionAction::Delete, &event.resource_properties).await?;
            Ok(CustomResourceResponse {
                physical_resource_id: etag,
            })
        }
    }
}

/// Lambda runtime entry point.
pub async fn run() -> Result<(), Error> {
    init_tracing();

    lambda_runtime::run(service_fn(|event: LambdaEvent<CustomResourceEvent>| async move {
        let (event, _context) = event.into_parts();
        info!("Handling {:?} event", event.request_type);
        handle_event(event).await.map_err(Error::from)
    }))
    .await
}

fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer())
        .init();
}
