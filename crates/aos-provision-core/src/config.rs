//! Shared configuration types for one provisioning run.

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use aos_provision_client::HttpClient;

/// Infrastructure lifecycle event driving a provisioning run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProvisionAction {
    Create,
    Update,
    Delete,
}

/// Explicit allow-list for operations that mutate or remove existing state.
///
/// When absent, only a Create action touches the domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DestructiveOperation {
    Update,
    Delete,
    All,
}

impl DestructiveOperation {
    /// Whether the allow-list permits Update operations.
    pub fn permits_update(allowed: Option<DestructiveOperation>) -> bool {
        matches!(allowed, Some(Self::Update) | Some(Self::All))
    }

    /// Whether the allow-list permits Delete operations.
    pub fn permits_delete(allowed: Option<DestructiveOperation>) -> bool {
        matches!(allowed, Some(Self::Delete) | Some(Self::All))
    }
}

/// Engine flavor of the target domain, selecting REST endpoint variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DomainType {
    OpenSearch,
    Elasticsearch,
}

impl DomainType {
    /// Partial endpoint for index lifecycle policies.
    pub fn ism_policy_endpoint(self) -> &'static str {
        match self {
            Self::OpenSearch => "_plugins/_ism/policies",
            Self::Elasticsearch => "_ilm/policy",
        }
    }

    /// Partial endpoint for the security tool's roles.
    pub fn role_endpoint(self) -> &'static str {
        match self {
            Self::OpenSearch => "_plugins/_security/api/roles",
            Self::Elasticsearch => "_security/role",
        }
    }

    /// Partial endpoint for the security tool's role mappings.
    pub fn role_mapping_endpoint(self) -> &'static str {
        match self {
            Self::OpenSearch => "_plugins/_security/api/rolesmapping",
            Self::Elasticsearch => "_security/role_mapping",
        }
    }

    /// Partial endpoint for the visualization tool.
    pub fn dashboard_endpoint(self) -> &'static str {
        match self {
            Self::OpenSearch => "_dashboards",
            Self::Elasticsearch => "_kibana",
        }
    }

    /// XSRF header required by the visualization tool's API.
    pub fn xsrf_header(self) -> &'static str {
        match self {
            Self::OpenSearch => "osd-xsrf",
            Self::Elasticsearch => "kbn-xsrf",
        }
    }
}

/// Shared, read-only configuration for one provisioning run.
///
/// Constructed once per invocation; every provisioner observes the same
/// action, allow-list, and domain type.
#[derive(Clone)]
pub struct ProvisionerConfiguration {
    /// Client used to make authenticated calls to the domain.
    pub client: Arc<dyn HttpClient>,
    /// Root of the extracted provisioning configuration files.
    pub asset_path: PathBuf,
    /// Lifecycle action being handled.
    pub action: ProvisionAction,
    /// Which destructive operations, if any, should be handled.
    pub allow_destructive_operations: Option<DestructiveOperation>,
    /// Engine flavor of the target domain.
    pub domain_type: DomainType,
}
