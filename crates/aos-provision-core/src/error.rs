//! Error types for the provisioning engine

use std::path::PathBuf;

use thiserror::Error;

use aos_provision_client::ClientError;

/// Errors raised while provisioning a domain
#[derive(Debug, Error)]
pub enum ProvisionError {
    /// Underlying HTTP client failure
    #[error(transparent)]
    Client(#[from] ClientError),

    /// An entity subdirectory is missing or not a directory
    #[error("invalid directory path: {}", .0.display())]
    InvalidDirectoryPath(PathBuf),

    /// A listed configuration file is missing or unreadable
    #[error("invalid file path: {}", .0.display())]
    InvalidFilePath(PathBuf),

    /// A configuration file does not hold the JSON its entity type expects
    #[error("invalid contents for entity {name}: {source}")]
    InvalidEntity {
        name: String,
        #[source]
        source: serde_json::Error,
    },

    /// An index existence check returned neither 200 nor 404
    #[error("unknown state of index {name}: query returned {status}")]
    UnknownIndexState { name: String, status: u16 },

    /// A policy existence check returned neither 200 nor 404
    #[error("unknown state of policy {name}: query returned {status}")]
    UnknownPolicyState { name: String, status: u16 },

    /// A template existence check returned neither 200 nor 404
    #[error("unknown state of {template_type} template {name}: query returned {status}")]
    UnknownTemplateState {
        template_type: &'static str,
        name: String,
        status: u16,
    },

    /// A policy update was rejected by the domain
    #[error("failed to update policy {name}")]
    UpdateFailed { name: String },

    /// The domain never became reachable within the attempt budget
    #[error("domain is not available after {attempts} attempts")]
    AvailabilityTimeout { attempts: u32 },
}

pub type Result<T> = std::result::Result<T, ProvisionError>;
