//! Domain engine detection.

use tracing::warn;

use aos_provision_client::HttpClient;

use crate::config::DomainType;

/// Classifies the remote domain from its root endpoint version metadata.
///
/// Never fails the caller: any request or parse problem is logged and
/// OpenSearch is assumed.
pub async fn detect_domain_type(client: &dyn HttpClient) -> DomainType {
    let response = match client.get("/").await {
        Ok(response) if response.status_code == 200 => response,
        Ok(response) => {
            warn!(
                "Failed to detect domain type (status {}), defaulting to OpenSearch",
                response.status_code
            );
            return DomainType::OpenSearch;
        }
        Err(error) => {
            warn!(
                "Failed to detect domain type, defaulting to OpenSearch: {}",
                error
            );
            return DomainType::OpenSearch;
        }
    };

    let Some(version) = response.data.get("version") else {
        warn!("Root endpoint returned no version metadata, defaulting to OpenSearch");
        return DomainType::OpenSearch;
    };

    let distribution = version.get("distribution").and_then(|v| v.as_str());
    let number = version
        .get("number")
        .and_then(|v| v.as_str())
        .unwrap_or_default();

    // Elasticsearch forks report no distribution field and 7.x version
    // numbers; OpenSearch reports its own distribution and 1.x/2.x numbers.
    if distribution == Some("opensearch") || number.starts_with("1.") || number.starts_with("2.") {
        DomainType::OpenSearch
    } else {
        DomainType::Elasticsearch
    }
}
