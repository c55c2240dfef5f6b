//! Domain availability probing.

use std::time::Duration;

use tracing::info;

use aos_provision_client::HttpClient;

use crate::error::{ProvisionError, Result};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 15;
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(60);

/// Polls the domain until it is ready to accept requests.
///
/// An attempt succeeds only when both the root endpoint and
/// `/_cluster/health` answer with HTTP 200. Attempts are spaced by a fixed
/// interval; exhausting the budget fails with
/// [`ProvisionError::AvailabilityTimeout`].
pub async fn wait_for_availability(
    client: &dyn HttpClient,
    max_attempts: u32,
    retry_interval: Duration,
) -> Result<()> {
    for attempt in 0..max_attempts {
        match check_once(client).await {
            Ok(()) => {
                info!("Domain is available and ready");
                return Ok(());
            }
            Err(reason) => {
                info!(
                    "Domain not ready (attempt {}/{}): {}",
                    attempt + 1,
                    max_attempts,
                    reason
                );

                if attempt == max_attempts - 1 {
                    return Err(ProvisionError::AvailabilityTimeout {
                        attempts: max_attempts,
                    });
                }

                tokio::time::sleep(retry_interval).await;
            }
        }
    }

    Err(ProvisionError::AvailabilityTimeout {
        attempts: max_attempts,
    })
}

async fn check_once(client: &dyn HttpClient) -> std::result::Result<(), String> {
    let root = client.get("/").await.map_err(|e| e.to_string())?;
    if root.status_code != 200 {
        return Err(format!("root endpoint returned {}", root.status_code));
    }

    let health = client
        .get("/_cluster/health")
        .await
        .map_err(|e| e.to_string())?;
    if health.status_code != 200 {
        return Err(format!("cluster health returned {}", health.status_code));
    }

    Ok(())
}
