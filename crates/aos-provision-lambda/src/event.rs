//! CloudFormation custom-resource event and response types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use aos_provision_core::provision::DynamicRoleMappings;
use aos_provision_core::{DestructiveOperation, DomainType, ProvisionAction};

/// Invocation properties for the custom resource.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ResourceProperties {
    /// Endpoint of the target domain (host name, no scheme).
    pub domain_endpoint: String,

    /// Engine flavor of the domain; detected from the domain when absent.
    #[serde(default)]
    pub domain_type: Option<DomainType>,

    /// IAM role that is an administrative user for the domain, assumed for
    /// all provisioning calls.
    pub admin_role_arn: String,

    /// URI of the zip asset holding the provisioning configuration files.
    #[serde(rename = "AssetS3Uri")]
    pub asset_s3_uri: String,

    /// Which destructive operations the resource handles. When absent, only
    /// a Create call modifies the domain.
    #[serde(default)]
    pub allow_destructive_operations: Option<DestructiveOperation>,

    /// Role mappings supplied directly on the invocation: role name to
    /// backend-role identifiers (IAM role ARNs, LDAP DNs, ...).
    #[serde(default)]
    pub dynamic_role_mappings: Option<DynamicRoleMappings>,

    /// Settings sent to the `/_cluster/settings` API.
    #[serde(default)]
    pub cluster_settings: Option<Value>,
}

/// CloudFormation custom-resource lifecycle event.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CustomResourceEvent {
    pub request_type: ProvisionAction,
    pub resource_properties: ResourceProperties,
    #[serde(default)]
    pub physical_resource_id: Option<String>,
}

/// Completion signal returned to the custom-resource framework.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CustomResourceResponse {
    pub physical_resource_id: String,
}
